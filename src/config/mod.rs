/// Database connection and table creation
pub mod database;

/// Engine settings loading from config.toml
pub mod engine;
