mod http;
mod settings;

pub use http::HttpScanTransport;
pub use settings::{parse_timeout, ServiceSettings};
