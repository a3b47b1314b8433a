//! Hivesight Store
//!
//! In-memory, retention-bounded state shared by every component:
//!
//! - **types**: Core data structures (Observation, TimeRange, metric names)
//! - **clock**: Injected time sources (system and manual)
//! - **ttl**: Per-key append log with lazy eviction
//!
//! # Example
//!
//! ```rust
//! use hivesight::store::{Observation, Retention, SystemClock, TtlKeyedStore, BEE_COUNT};
//! use std::sync::Arc;
//!
//! let clock = Arc::new(SystemClock);
//! let history: TtlKeyedStore<String, Observation> =
//!     TtlKeyedStore::new("history", Retention::days(365), clock);
//!
//! let now = chrono::Utc::now();
//! history.append("hive-1".to_string(), Observation::new("hive-1", now).metric(BEE_COUNT, 30.0), now);
//! assert_eq!(history.get("hive-1", None).len(), 1);
//! ```

pub mod clock;
pub mod ttl;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use ttl::{Entry, Retention, TtlKeyedStore};
pub use types::{
    Observation, TimeRange, BEE_COUNT, HONEY_YIELD, HUMIDITY, RAINFALL, TEMPERATURE,
    WATER_DISTANCE,
};
