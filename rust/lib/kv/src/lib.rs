//! Key-value storage for the Lumigram feed backend.
//!
//! Posts and favorite relationships are stored under namespaced string keys
//! (`post:{id}`, `favorite:{user_id}:{post_id}`). Two backends implement
//! [`KVStore`]: [`RedbStore`] on disk and [`MemoryKV`] in process.

pub mod error;
pub mod memory;
pub mod redb;
pub mod traits;

pub use error::KVError;
pub use memory::MemoryKV;
pub use self::redb::RedbStore;
pub use traits::KVStore;
