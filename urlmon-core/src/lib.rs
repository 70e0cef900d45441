pub mod models;
pub mod config;
pub mod error;
pub mod db;
pub mod store;
pub mod logging;

pub use config::Config;
pub use error::{Error, Result};
