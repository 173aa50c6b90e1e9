pub mod error;
mod models;
pub mod requests;

pub use error::{ErrorKind, ErrorPayload, StorageError};
pub use models::*;
