/// Configuration module - Load and validate licensor configuration
pub mod schema;
pub mod loader;

pub use schema::{Config, LOG_LEVELS};
pub use loader::{load_config, load_from};
