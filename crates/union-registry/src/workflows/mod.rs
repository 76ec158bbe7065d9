pub mod access;
pub mod http;
pub mod membership;
pub mod organizations;
pub mod signing;
pub mod storage;

pub use http::ErrorDisclosure;
