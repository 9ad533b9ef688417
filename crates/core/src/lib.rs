pub mod config;
pub mod domain;
pub mod error;
pub mod filter;
pub mod model;
pub mod query;
pub mod tags;
pub mod time;

pub use error::{FrostError, Result};
