//! Request handlers for the ragline HTTP API

pub mod documents;
pub mod embed;
pub mod generate;
pub mod health;
pub mod retrieve;

pub use documents::documents_router;
pub use embed::embed_router;
pub use generate::generate_router;
pub use health::health_router;
pub use retrieve::retrieve_router;
