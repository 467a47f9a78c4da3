pub mod app;
pub mod archive;
pub mod cli;
pub mod config;
pub mod credentials;
pub mod error;
pub mod gmail_api;
pub mod types;

pub use error::{ConfigError, Error};
