/// Utility modules
pub mod platform;
