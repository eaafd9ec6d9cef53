/// Header names the proxy always writes itself; client copies are dropped.
const PROXY_OWNED_HEADERS: [&str; 6] = [
    "Host",
    "User-Agent",
    "Accept",
    "Accept-Encoding",
    "Connection",
    "Proxy-Connection",
];

/// Client header lines that survive into the forwarded request, kept verbatim
/// and in arrival order.
#[derive(Debug, Default, Clone)]
pub(crate) struct ExtraHeaders {
    block: String,
    dropped: usize,
}

impl ExtraHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one raw header line. Returns `false` for the blank line that
    /// ends the header block.
    pub fn push_line(&mut self, line: &str) -> bool {
        if line.trim_end_matches(['\r', '\n']).is_empty() {
            return false;
        }
        if is_proxy_owned(line) {
            self.dropped += 1;
            return true;
        }
        self.block.push_str(line);
        if !line.ends_with('\n') {
            self.block.push_str("\r\n");
        }
        true
    }

    pub fn as_str(&self) -> &str {
        &self.block
    }

    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

fn is_proxy_owned(line: &str) -> bool {
    let Some((name, _)) = line.split_once(':') else {
        return false;
    };
    PROXY_OWNED_HEADERS
        .iter()
        .any(|owned| owned.eq_ignore_ascii_case(name))
}
