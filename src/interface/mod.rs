pub mod mcp;
pub mod routes;
