//! Session State
//!
//! Three specializations of the TTL store guarding the edge of the core:
//!
//! - **SessionRegistry**: one inactivity-bounded session per user
//! - **RateLimiter**: sliding-window admission per user
//! - **TokenDenylist**: revoked tokens held until they expire

pub mod denylist;
pub mod rate_limit;
pub mod registry;

pub use denylist::TokenDenylist;
pub use rate_limit::{RateDecision, RateLimiter};
pub use registry::{Session, SessionRegistry, SessionSummary};
