pub mod types;
pub mod config;
pub mod error;
pub mod logging;
pub mod utils;
