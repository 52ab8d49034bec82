//! # imgstash
//!
//! Two-tier (memory + disk) image cache with a sanitized key space.
//!
//! Lookups check a concurrent in-memory map first, then a flat directory of
//! PNG files, promoting disk hits back into memory. The cache is best-effort
//! by contract: a miss is always a valid outcome, and no failure ever
//! propagates to the caller — disk and codec errors degrade to logged
//! misses and no-ops.
//!
//! ## Features
//!
//! - **Two tiers**: sharded concurrent memory map over a durable PNG-file
//!   disk tier, with disk-hit promotion
//! - **Sanitized key space**: arbitrary caller keys (URLs included) map to
//!   flat, filesystem-safe file names
//! - **Best-effort contract**: optionality is visible in the signatures
//!   (`Option` returns, `bool` outcomes), never an error type
//! - **Atomic persistence**: entries land via temp-file-and-rename, so a
//!   truncated file is never visible at the canonical path
//!
//! ```no_run
//! use imgstash::TieredCache;
//!
//! let cache = TieredCache::new("/var/cache/posters")?;
//! let poster = image::open("poster.png")?;
//! cache.put("http://example.com/poster.png", poster);
//!
//! if let Some(hit) = cache.get("http://example.com/poster.png") {
//!     let rgba = hit.to_rgba8();
//!     println!("{}x{}", rgba.width(), rgba.height());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cache;
pub mod error;
pub mod key;
pub mod metrics;

mod disk;
mod memory;

pub use cache::{CacheConfig, PngCompression, TieredCache};
pub use error::CacheError;
pub use key::StorageKey;
pub use metrics::CacheStats;

/// Re-export commonly used types
pub type Result<T> = std::result::Result<T, CacheError>;
