use crate::proxy::request::ParsedRequest;
use crate::settings::Settings;

use super::codec::ExtraHeaders;

/// Rebuilds the origin-form request: fixed header set first, then the
/// client's surviving headers, then the blank line.
pub(crate) fn build_origin_request(
    request: &ParsedRequest,
    headers: &ExtraHeaders,
    settings: &Settings,
) -> Vec<u8> {
    let mut out = String::with_capacity(256 + headers.as_str().len());
    out.push_str(&format!("GET {} {}\r\n", request.path, request.version));
    out.push_str(&format!("Host: {}\r\n", request.host));
    out.push_str(settings.user_agent_header);
    out.push_str(settings.accept_header);
    out.push_str(settings.accept_encoding_header);
    out.push_str("Connection: close\r\n");
    out.push_str("Proxy-Connection: close\r\n");
    out.push_str(headers.as_str());
    out.push_str("\r\n");
    out.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::request::RequestLine;

    fn settings() -> Settings {
        Settings::with_listen("127.0.0.1:0".parse().unwrap())
    }

    #[test]
    fn rebuilds_request_with_fixed_headers() {
        let line = RequestLine::parse("GET http://example.com:8080/a?b HTTP/1.1");
        let request = ParsedRequest::from_line(&line).unwrap();
        let mut headers = ExtraHeaders::new();
        headers.push_line("Host: ignored.example\r\n");
        headers.push_line("X-Forwarded-For: 10.0.0.1\r\n");

        let text = String::from_utf8(build_origin_request(&request, &headers, &settings())).unwrap();
        let lines: Vec<_> = text.split("\r\n").collect();
        assert_eq!(lines[0], "GET /a?b HTTP/1.1");
        assert_eq!(lines[1], "Host: example.com");
        assert!(lines[2].starts_with("User-Agent: Mozilla/5.0"));
        assert!(lines[3].starts_with("Accept: text/html"));
        assert_eq!(lines[4], "Accept-Encoding: gzip, deflate");
        assert_eq!(lines[5], "Connection: close");
        assert_eq!(lines[6], "Proxy-Connection: close");
        assert_eq!(lines[7], "X-Forwarded-For: 10.0.0.1");
        assert!(text.ends_with("X-Forwarded-For: 10.0.0.1\r\n\r\n"));
        assert!(!text.contains("ignored.example"));
    }

    #[test]
    fn downgrades_unknown_versions() {
        let line = RequestLine::parse("GET http://example.com HTTP/2.0");
        let request = ParsedRequest::from_line(&line).unwrap();
        let text = String::from_utf8(build_origin_request(
            &request,
            &ExtraHeaders::new(),
            &settings(),
        ))
        .unwrap();
        assert!(text.starts_with("GET / HTTP/1.0\r\nHost: example.com\r\n"));
        assert!(text.ends_with("Proxy-Connection: close\r\n\r\n"));
    }
}
