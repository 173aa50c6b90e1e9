// Library exports for integration tests and embedding callers
pub mod auth;
pub mod config;
pub mod listing;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use auth::{Credentials, SignableRequest, SignedRequest, sign};
pub use config::Config;
pub use listing::{Aggregator, parse_bucket_names, parse_listing};
pub use storage::{Executor, InMemoryStore, ObjectStore, ResponseBody, S3Client, Timeout, Timeouts};
pub use types::{
    AggregateResult, BucketStats, ErrorKind, ErrorPayload, ListingPage, ObjectEntry, StorageError,
};
