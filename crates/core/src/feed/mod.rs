//! Polled data feeds.
//!
//! One [`PollingDataSource`] per backend feed; each keeps the newest accepted
//! [`PollSnapshot`] and drops responses that resolve out of order.

pub mod source;
pub mod state;

pub use source::{FetchFn, PollingDataSource, Schedule};
pub use state::{FeedState, PollSnapshot, Resolution, Ticket};
