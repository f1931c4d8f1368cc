pub mod material;
pub mod quote_request;
pub mod session;
