mod byte_source;
mod http_transport;

pub use byte_source::{ByteSource, FetchResponse, Transport};
pub use http_transport::{
    HttpBodySource, HttpTransport, DEFAULT_CONNECT_TIMEOUT, DEFAULT_PROBE_TIMEOUT,
};
