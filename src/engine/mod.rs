//! Background engine: feed refresh, collection runs, session heartbeat.
//!
//! - `refresher`: concurrent fetch of every research stream into one snapshot
//! - `collection`: trigger → poll → complete/timeout state machine
//! - `heartbeat`: periodic read of the trading session
//! - `task`: cancellable fixed-interval loops that drive the above

pub mod collection;
pub mod heartbeat;
pub mod refresher;
pub mod task;

pub use collection::{CollectionOutcome, CollectionPhase, CollectionPoller, CollectionState, PollerSettings};
pub use heartbeat::SessionHeartbeat;
pub use refresher::{FeedRefresher, RefreshReport};
pub use task::PollingTask;
