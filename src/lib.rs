pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod model;
pub mod notify;
pub mod refresh;
pub mod sink;
pub mod utils;
pub mod watchlist;

pub use error::{AppError, Result};
