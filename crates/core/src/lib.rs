pub mod config;
pub mod entity;
pub mod error;

pub use config::{Config, StoreConfig};
pub use entity::*;
pub use error::*;
