pub mod config;
pub mod error;
pub mod store;
pub mod types;

pub use config::AnimeConfig;
pub use error::{AnimeError, Result};
pub use store::{BoundQuery, StoreError, TableStore};
pub use types::*;
