//! Analysis Progress
//!
//! Tracks long-running analysis jobs and notifies observers (the transport
//! layer) on every transition.

pub mod events;
pub mod tracker;

pub use events::{ChannelObserver, ProgressEvent, ProgressObserver};
pub use tracker::{JobStatus, ProgressJob, ProgressTracker};
