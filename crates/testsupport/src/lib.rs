pub mod fixtures;
pub mod http;

pub use fixtures::*;
pub use http::*;
