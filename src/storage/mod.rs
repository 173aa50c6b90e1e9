mod backend;
pub mod executor;
mod in_memory;
mod s3;

pub use backend::{DEFAULT_PAGE_SIZE, ObjectStore};
pub use executor::{Executor, RawResponse, ResponseBody, Timeout, Timeouts};
pub use in_memory::InMemoryStore;
pub use s3::S3Client;
