use thiserror::Error;

use crate::proxy::cache::CacheKey;

const SCHEME_PREFIX: &str = "http://";
const DEFAULT_PORT: &str = "80";
const HTTP_11: &str = "HTTP/1.1";
const HTTP_10: &str = "HTTP/1.0";

/// The three whitespace-separated tokens of a request line. Missing tokens
/// are left empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestLine {
    pub method: String,
    pub target: String,
    pub version: String,
}

impl RequestLine {
    pub fn parse(line: &str) -> Self {
        let mut parts = line.split_whitespace();
        let mut next = || parts.next().unwrap_or_default().to_string();
        let method = next();
        let target = next();
        let version = next();
        Self {
            method,
            target,
            version,
        }
    }

    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }

    /// `HTTP/1.1` (any case) is kept as sent; every other token becomes `HTTP/1.0`.
    pub fn forwarded_version(&self) -> &str {
        if self.version.eq_ignore_ascii_case(HTTP_11) {
            &self.version
        } else {
            HTTP_10
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("request target '{target}' is not an absolute http:// URL")]
pub struct NotAbsoluteForm {
    pub target: String,
}

/// A GET request after target parsing, owned by a single connection handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRequest {
    pub version: String,
    pub host: String,
    pub port: String,
    pub path: String,
}

impl ParsedRequest {
    pub fn from_line(line: &RequestLine) -> Result<Self, NotAbsoluteForm> {
        let target = parse_absolute_target(&line.target)?;
        Ok(Self {
            version: line.forwarded_version().to_string(),
            host: target.host,
            port: target.port,
            path: target.path,
        })
    }

    pub fn cache_key(&self) -> CacheKey {
        CacheKey::new(&self.host, &self.path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbsoluteTarget {
    pub host: String,
    pub port: String,
    pub path: String,
}

/// Split `http://host[:port][/path]` into its parts. The path starts at the
/// first `/` after the scheme and defaults to `/`; the port is whatever follows
/// the first `:` of the host segment and defaults to `80`.
pub fn parse_absolute_target(target: &str) -> Result<AbsoluteTarget, NotAbsoluteForm> {
    let rest = target
        .get(..SCHEME_PREFIX.len())
        .filter(|prefix| prefix.eq_ignore_ascii_case(SCHEME_PREFIX))
        .map(|_| &target[SCHEME_PREFIX.len()..])
        .ok_or_else(|| NotAbsoluteForm {
            target: target.to_string(),
        })?;

    let (authority, path) = match rest.find('/') {
        Some(idx) => rest.split_at(idx),
        None => (rest, "/"),
    };
    let (host, port) = match authority.split_once(':') {
        Some((host, port)) => (host, port),
        None => (authority, DEFAULT_PORT),
    };

    Ok(AbsoluteTarget {
        host: host.to_string(),
        port: port.to_string(),
        path: path.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(host: &str, port: &str, path: &str) -> AbsoluteTarget {
        AbsoluteTarget {
            host: host.to_string(),
            port: port.to_string(),
            path: path.to_string(),
        }
    }

    #[test]
    fn request_line_tokens() {
        let line = RequestLine::parse("GET http://example.com/a HTTP/1.1\r\n");
        assert_eq!(line.method, "GET");
        assert_eq!(line.target, "http://example.com/a");
        assert_eq!(line.version, "HTTP/1.1");
        assert!(line.is_get());
    }

    #[test]
    fn missing_tokens_are_empty() {
        let line = RequestLine::parse("\r\n");
        assert_eq!(line, RequestLine::default());
        assert!(!line.is_get());

        let line = RequestLine::parse("get http://example.com/");
        assert!(line.is_get());
        assert_eq!(line.version, "");
    }

    #[test]
    fn version_is_normalized() {
        let version = |token: &str| {
            RequestLine {
                version: token.to_string(),
                ..RequestLine::default()
            }
            .forwarded_version()
            .to_string()
        };
        assert_eq!(version("HTTP/1.1"), "HTTP/1.1");
        assert_eq!(version("http/1.1"), "http/1.1");
        assert_eq!(version("HTTP/1.0"), "HTTP/1.0");
        assert_eq!(version("HTTP/2"), "HTTP/1.0");
        assert_eq!(version("garbage"), "HTTP/1.0");
        assert_eq!(version(""), "HTTP/1.0");
    }

    #[test]
    fn target_without_path_defaults_to_root() {
        assert_eq!(
            parse_absolute_target("http://example.com").unwrap(),
            target("example.com", "80", "/")
        );
    }

    #[test]
    fn target_with_port_and_path() {
        assert_eq!(
            parse_absolute_target("http://example.com:8080/a/b?c=d").unwrap(),
            target("example.com", "8080", "/a/b?c=d")
        );
    }

    #[test]
    fn colon_after_path_boundary_is_part_of_path() {
        assert_eq!(
            parse_absolute_target("http://example.com/a:b").unwrap(),
            target("example.com", "80", "/a:b")
        );
    }

    #[test]
    fn scheme_match_ignores_case() {
        assert_eq!(
            parse_absolute_target("HTTP://Example.com/").unwrap(),
            target("Example.com", "80", "/")
        );
    }

    #[test]
    fn rejects_origin_form_and_other_schemes() {
        for bad in ["/index.html", "https://example.com/", "http:/", ""] {
            let err = parse_absolute_target(bad).unwrap_err();
            assert_eq!(err.target, bad);
        }
    }

    #[test]
    fn parsed_request_builds_cache_key_without_port() {
        let line = RequestLine::parse("GET http://example.com:81/x HTTP/1.0");
        let parsed = ParsedRequest::from_line(&line).unwrap();
        assert_eq!(parsed.version, "HTTP/1.0");
        assert_eq!(parsed.cache_key().as_str(), "example.com/x");
        assert_eq!(parsed.host, "example.com");
        assert_eq!(parsed.port, "81");
    }
}
