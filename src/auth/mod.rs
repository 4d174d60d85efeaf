pub mod http;
pub mod oauth;
