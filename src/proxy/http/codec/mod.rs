mod headers;
mod line;
mod request;

pub(crate) use headers::ExtraHeaders;
pub(crate) use line::read_line;
pub(crate) use request::{read_extra_headers, read_request_line};
