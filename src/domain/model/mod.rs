pub mod book;
pub mod facet;
pub mod filter;
pub mod id;
pub mod page;
pub mod session;
