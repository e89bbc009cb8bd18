//! 持久化层：Postgres 实现与内存实现
//! Persistence layer: Postgres and in-memory implementations of the repository traits

pub mod error;
pub mod memory;
pub mod postgres;

pub use error::StoreError;
pub use memory::MemoryStore;
