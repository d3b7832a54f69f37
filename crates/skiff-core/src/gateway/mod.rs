//! Gateway implementations.

pub mod http;

pub use self::http::HttpGateway;
