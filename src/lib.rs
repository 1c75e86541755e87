pub mod analyzer;
pub mod config;
pub mod corpus;
pub mod dataset;
pub mod events;
pub mod model;
pub mod predict;
pub mod scanner;
pub mod schema;

/// Audio file extensions we support
pub const SUPPORTED_EXTENSIONS: &[&str] = &["wav"];

/// Application name for XDG paths
pub const APP_NAME: &str = "genrekit";
