pub mod config;
pub mod decoder;
pub mod error;
pub mod filter;
pub mod logging;
pub mod manager;
pub mod models;
pub mod render;
pub mod shape;
pub mod sources;
pub mod store;
pub mod tree;
pub mod xml;

pub use config::Config;
pub use decoder::decode;
pub use error::{AdvisoryError, Result};
pub use manager::AdvisoryManager;
pub use models::Advisory;
