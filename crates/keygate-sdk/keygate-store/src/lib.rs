mod error;
mod models;
mod schema;
mod store;

pub use error::StoreError;
pub use store::{KeygateStore, open_key_store};

pub type Result<T> = std::result::Result<T, StoreError>;
