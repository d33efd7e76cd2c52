//! Reading Store
//!
//! SQLite persistence for sensor readings. Every reading served by the
//! sensor API is stored here; history and export queries read it back.
//!
//! ```rust,no_run
//! use sensorboard::storage::ReadingStore;
//! use sensorboard::reading::Reading;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = ReadingStore::open("iot_data.db")?;
//!     store.insert(Reading::new(22.5, 48.0, 61, chrono::Utc::now())).await?;
//!
//!     let history = store.latest(50).await?;
//!     println!("{} readings", history.len());
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod store;

pub use error::{StorageError, StorageResult};
pub use store::ReadingStore;
