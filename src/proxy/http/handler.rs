use std::net::SocketAddr;
use std::time::Instant;

use anyhow::{Context, Result};
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, warn};

use crate::logging::AccessLogBuilder;
use crate::proxy::AppContext;
use crate::proxy::cache::CacheKey;
use crate::proxy::request::{ParsedRequest, RequestLine};
use crate::proxy::upstream::{fetch_origin, response_status};

use super::codec::{ExtraHeaders, read_extra_headers, read_request_line};
use super::forward::build_origin_request;
use super::respond::{ErrorPage, send_error_page, shutdown_stream};

/// Serves exactly one request on a client connection: read it, reject what
/// the proxy does not handle, answer from the cache or relay from the origin.
pub(super) struct ProxyRequestHandler<'a, S> {
    reader: BufReader<S>,
    app: &'a AppContext,
    peer: SocketAddr,
    start: Instant,
}

impl<'a, S> ProxyRequestHandler<'a, S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub(super) fn new(stream: S, peer: SocketAddr, app: &'a AppContext) -> Self {
        Self {
            reader: BufReader::new(stream),
            app,
            peer,
            start: Instant::now(),
        }
    }

    pub(super) async fn run(mut self) -> Result<()> {
        let max_line_len = self.app.settings.max_line_len;
        let Some(line) = read_request_line(&mut self.reader, self.peer, max_line_len).await?
        else {
            return Ok(());
        };
        let log = AccessLogBuilder::new(self.peer)
            .method(line.method.as_str())
            .version(line.version.as_str());

        if !line.is_get() {
            debug!(peer = %self.peer, method = %line.method, "rejecting unsupported method");
            let page = ErrorPage::not_implemented(&line.method);
            return self.respond_error(page, log.outcome("REJECT")).await;
        }

        let request = match parse_target(&line) {
            Ok(request) => request,
            Err(page) => {
                debug!(peer = %self.peer, target = %line.target, "rejecting request target");
                let log = log.outcome("REJECT").error_reason("bad_target");
                return self.respond_error(page, log).await;
            }
        };
        let log = log
            .host(request.host.as_str())
            .path(request.path.as_str());

        let headers = read_extra_headers(&mut self.reader, self.peer, max_line_len).await?;
        debug!(
            peer = %self.peer,
            dropped = headers.dropped(),
            "replacing proxy-owned request headers"
        );
        let key = request.cache_key();

        if let Some(payload) = self.app.cache.lookup(key.as_str()) {
            crate::metrics::record_cache_lookup(true);
            return self.respond_cached(payload, log).await;
        }
        crate::metrics::record_cache_lookup(false);
        self.fetch_and_store(&request, &headers, &key, log.cache_lookup("miss"))
            .await
    }

    async fn respond_cached(&mut self, payload: Bytes, log: AccessLogBuilder) -> Result<()> {
        let client = self.reader.get_mut();
        client
            .write_all(&payload)
            .await
            .context("writing cached response")?;
        shutdown_stream(client).await?;

        let mut log = log
            .cache_lookup("hit")
            .outcome("HIT")
            .bytes_out(payload.len() as u64)
            .elapsed(self.start.elapsed());
        if let Some(status) = response_status(&payload) {
            log = log.status(status);
        }
        log.log();
        Ok(())
    }

    async fn fetch_and_store(
        &mut self,
        request: &ParsedRequest,
        headers: &ExtraHeaders,
        key: &CacheKey,
        log: AccessLogBuilder,
    ) -> Result<()> {
        let app = self.app;
        let settings = &app.settings;
        let forwarded = build_origin_request(request, headers, settings);

        let fetched = match fetch_origin(
            &request.host,
            &request.port,
            &forwarded,
            self.reader.get_mut(),
            settings.read_chunk_size,
            settings.max_object_size,
        )
        .await
        {
            Ok(fetched) => fetched,
            Err(err) => {
                warn!(
                    peer = %self.peer,
                    host = %err.host,
                    port = %err.port,
                    error = %err.source,
                    "origin connection failed"
                );
                crate::metrics::record_origin_error();
                let page = ErrorPage::origin_unreachable(settings.unreachable_status(), &err.host);
                let log = log
                    .outcome("ERROR")
                    .error_reason("origin_unreachable")
                    .error_detail(err.source.to_string());
                return self.respond_error(page, log).await;
            }
        };

        let cache_store = match fetched.cacheable_body(settings.max_object_size) {
            Some(body) => {
                let outcome = app.cache.insert(key.as_str(), body);
                crate::metrics::record_cache_store();
                if outcome.evicted {
                    crate::metrics::record_cache_eviction();
                    debug!(slot = outcome.slot, key = %key, "evicted cache slot");
                }
                "stored"
            }
            None if fetched.interrupted.is_some() => {
                crate::metrics::record_cache_store_skipped("incomplete");
                "incomplete"
            }
            None => {
                crate::metrics::record_cache_store_skipped("too_large");
                "too_large"
            }
        };

        if fetched.interrupted.is_none() {
            shutdown_stream(self.reader.get_mut()).await?;
        }

        let mut log = log
            .outcome("MISS")
            .cache_store(cache_store)
            .bytes_out(fetched.total_len as u64)
            .elapsed(self.start.elapsed());
        if let Some(status) = fetched.status {
            log = log.status(status);
        }
        if let Some(addr) = fetched.upstream_addr {
            log = log.upstream_addr(addr.to_string());
        }
        if let Some(interrupted) = fetched.interrupted {
            log = log.error_reason(interrupted.as_str());
        }
        log.log();
        Ok(())
    }

    async fn respond_error(&mut self, page: ErrorPage, log: AccessLogBuilder) -> Result<()> {
        let client = self.reader.get_mut();
        let written = send_error_page(client, &page).await?;
        shutdown_stream(client).await?;
        log.status(page.status.as_u16())
            .bytes_out(written as u64)
            .elapsed(self.start.elapsed())
            .log();
        Ok(())
    }
}

fn parse_target(line: &RequestLine) -> Result<ParsedRequest, ErrorPage> {
    ParsedRequest::from_line(line).map_err(|err| ErrorPage::bad_request(&err.target))
}
