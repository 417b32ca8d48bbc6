pub mod ai;
pub mod app;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use app::App;
pub use config::Config;
pub use error::{AppError, ErrorKind, ProviderError, Result};
