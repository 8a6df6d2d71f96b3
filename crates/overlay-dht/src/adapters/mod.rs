//! # Adapters Layer
//!
//! Concrete implementations of the outbound ports.
//!
//! - `memory`: ordered in-memory store
//! - `time`: system clock
//! - `ids`: random node identifiers
//! - `config`: static and TOML configuration providers (TOML needs feature `config`)
//! - `rocksdb`: persistent store (feature `rocksdb`)

pub mod config;
pub mod ids;
pub mod memory;
#[cfg(feature = "rocksdb")]
pub mod rocksdb;
pub mod time;

pub use config::StaticConfigProvider;
#[cfg(feature = "config")]
pub use config::{ConfigError, TomlConfigProvider};
pub use ids::RandomNodeIdGenerator;
pub use memory::InMemoryKVStore;
#[cfg(feature = "rocksdb")]
pub use self::rocksdb::{RocksDbConfig, RocksDbStore};
pub use time::SystemTimeSource;
