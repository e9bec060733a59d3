//! huestatus — show a cluster's health status on Hue light groups.

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod monitor;
pub mod palette;
pub mod protocol;
pub mod resolver;
pub mod store;
pub mod transport;

pub use error::HueStatusError;
