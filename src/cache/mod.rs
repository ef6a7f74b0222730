//! Rate cache subsystem.
//!
//! # Data Flow
//! ```text
//! RateService
//!     → rate_cache.rs (key "{CURRENCY}:exchange-rates", JSON, fault absorption)
//!     → store.rs KeyValueStore (GET / SETEX / DEL)
//!         ├── MemoryStore (dashmap, lazy expiry)
//!         └── RedisStore (`redis` feature, ConnectionManager)
//! ```
//!
//! # Design Decisions
//! - The store owns expiry; entries never outlive their TTL
//! - Cache faults never reach the caller
//! - No single-flight: concurrent misses each go upstream

pub mod rate_cache;
#[cfg(feature = "redis")]
pub mod redis;
pub mod store;

pub use rate_cache::{key_for, CacheError, RateCache};
#[cfg(feature = "redis")]
pub use self::redis::RedisStore;
pub use store::{KeyValueStore, MemoryStore, StoreError};
