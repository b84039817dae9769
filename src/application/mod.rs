pub mod error;
pub mod generation;
pub mod library;
pub mod render;
pub mod session;
