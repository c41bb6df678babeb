//! # idmapper sources
//!
//! Concrete [`SnapshotSource`](idmapper_core::SnapshotSource) implementations.
//!
//! - [`HttpSource`]: a JSON array of `{"id", "name"}` records served over HTTP
//! - [`PgSource`]: an `id, name` query run through a PostgreSQL pool
//! - [`RedisSource`]: a Redis hash read with `HGETALL`
//! - [`FileSource`]: a local JSON or YAML document

pub mod file;
pub mod http;
pub mod pgsql;
pub mod record;
pub mod redis;

// Re-exports
pub use file::{FileFormat, FileSource};
pub use http::HttpSource;
pub use pgsql::PgSource;
pub use record::IdName;
pub use redis::RedisSource;
