//! HTTP middleware module

pub mod limit;
pub mod logging;

pub use limit::payload_limit_middleware;
pub use logging::request_logging_middleware;
