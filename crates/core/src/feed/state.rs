//! Per-feed bookkeeping: sequence numbers, the accepted snapshot and the
//! failure record.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use transight_transit::{Result, TransitError};

/// Identifies one request of one activation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ticket {
    pub generation: u64,
    pub seq: u64,
    pub requested_at: DateTime<Utc>,
}

/// Data accepted from one resolved request
#[derive(Debug)]
pub struct PollSnapshot<T> {
    pub seq: u64,
    pub requested_at: DateTime<Utc>,
    pub resolved_at: DateTime<Utc>,
    pub data: T,
}

/// What happened to a resolved request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// Newest response so far; now the visible snapshot
    Applied,
    /// Request failed; the previous snapshot stays visible
    Failed,
    /// A later request already resolved; response dropped
    Stale,
    /// The activation that issued the request has ended; response dropped
    Superseded,
}

impl Resolution {
    /// Whether observers of the feed should be notified
    pub fn is_visible(self) -> bool {
        matches!(self, Self::Applied | Self::Failed)
    }
}

#[derive(Debug)]
pub struct FeedState<T> {
    generation: u64,
    next_seq: u64,
    /// Highest sequence number resolved in this generation, failed or not
    resolved_seq: u64,
    snapshot: Option<Arc<PollSnapshot<T>>>,
    last_error: Option<TransitError>,
    consecutive_failures: u32,
}

impl<T> Default for FeedState<T> {
    fn default() -> Self {
        Self {
            generation: 0,
            next_seq: 1,
            resolved_seq: 0,
            snapshot: None,
            last_error: None,
            consecutive_failures: 0,
        }
    }
}

impl<T> Clone for FeedState<T> {
    fn clone(&self) -> Self {
        Self {
            generation: self.generation,
            next_seq: self.next_seq,
            resolved_seq: self.resolved_seq,
            snapshot: self.snapshot.clone(),
            last_error: self.last_error.clone(),
            consecutive_failures: self.consecutive_failures,
        }
    }
}

impl<T> FeedState<T> {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn snapshot(&self) -> Option<&Arc<PollSnapshot<T>>> {
        self.snapshot.as_ref()
    }

    pub fn data(&self) -> Option<&T> {
        self.snapshot.as_deref().map(|s| &s.data)
    }

    pub fn last_error(&self) -> Option<&TransitError> {
        self.last_error.as_ref()
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Nothing accepted yet and nothing failed yet
    pub fn is_loading(&self) -> bool {
        self.snapshot.is_none() && self.last_error.is_none()
    }

    /// Start a new activation. Requests from earlier generations are
    /// superseded from here on. `clear` drops the visible snapshot, used when
    /// the feed parameters change so old data cannot leak into the new view.
    pub fn begin_generation(&mut self, clear: bool) -> u64 {
        self.generation += 1;
        if clear {
            self.snapshot = None;
            self.last_error = None;
            self.consecutive_failures = 0;
        }
        self.generation
    }

    /// Sequence numbers keep increasing across generations.
    pub fn issue(&mut self, now: DateTime<Utc>) -> Ticket {
        let seq = self.next_seq;
        self.next_seq += 1;
        Ticket {
            generation: self.generation,
            seq,
            requested_at: now,
        }
    }

    pub fn resolve(&mut self, ticket: Ticket, result: Result<T>, now: DateTime<Utc>) -> Resolution {
        if ticket.generation != self.generation {
            return Resolution::Superseded;
        }
        if ticket.seq <= self.resolved_seq {
            return Resolution::Stale;
        }
        self.resolved_seq = ticket.seq;

        match result {
            Ok(data) => {
                self.snapshot = Some(Arc::new(PollSnapshot {
                    seq: ticket.seq,
                    requested_at: ticket.requested_at,
                    resolved_at: now,
                    data,
                }));
                self.last_error = None;
                self.consecutive_failures = 0;
                Resolution::Applied
            }
            Err(error) => {
                self.last_error = Some(error);
                self.consecutive_failures += 1;
                Resolution::Failed
            }
        }
    }
}
