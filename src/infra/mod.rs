pub mod http_api;
pub mod json_store;
