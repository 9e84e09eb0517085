/// Database configuration, table creation, and reference-data seeding
pub mod database;

/// Reward catalog loading from catalog.toml
pub mod catalog;
