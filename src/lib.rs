pub mod cli;
pub mod config;
pub mod distance;
pub mod error;
pub mod hash;
pub mod imdb;
pub mod matcher;
mod metrics;
pub mod record;
pub mod server;
pub mod store;
pub mod utils;

pub use config::Opts;
pub use error::{Error, Result};
pub use imdb::IMDB;
