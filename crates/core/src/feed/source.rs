use std::fmt;
use std::future::pending;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::future::BoxFuture;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{self, Interval, MissedTickBehavior};
use tracing::{debug, warn};
use transight_transit::Result;

use crate::feed::state::{FeedState, PollSnapshot, Resolution, Ticket};

pub type FetchFn<P, T> = Arc<dyn Fn(P) -> BoxFuture<'static, Result<T>> + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Schedule {
    /// Fetch once per activation
    Once,
    /// Fetch on activation, then every period while active
    Every(Duration),
}

struct Activation<P> {
    params: P,
    task: JoinHandle<()>,
}

/// Periodic fetcher for one feed.
///
/// The poll task is the only writer of the feed state; readers hold
/// [`watch::Receiver`]s. Changing the parameters aborts the running task,
/// clears the published snapshot and starts a new generation, so a response
/// for the old parameters can never be shown under the new ones.
pub struct PollingDataSource<P, T> {
    feed: &'static str,
    schedule: Schedule,
    fetch: FetchFn<P, T>,
    state: Arc<watch::Sender<FeedState<T>>>,
    active: Option<Activation<P>>,
}

impl<P, T> PollingDataSource<P, T>
where
    P: Clone + PartialEq + fmt::Debug + Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    pub fn new<F>(feed: &'static str, schedule: Schedule, fetch: F) -> Self
    where
        F: Fn(P) -> BoxFuture<'static, Result<T>> + Send + Sync + 'static,
    {
        let (state, _) = watch::channel(FeedState::default());
        Self {
            feed,
            schedule,
            fetch: Arc::new(fetch),
            state: Arc::new(state),
            active: None,
        }
    }

    pub fn feed(&self) -> &'static str {
        self.feed
    }

    pub fn params(&self) -> Option<&P> {
        self.active.as_ref().map(|a| &a.params)
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Start polling with `params`. Returns false (and does nothing) when the
    /// feed is already active with equal parameters.
    ///
    /// Must be called from within a tokio runtime.
    pub fn activate(&mut self, params: P) -> bool {
        if self.params() == Some(&params) {
            return false;
        }
        self.start(params, true);
        true
    }

    /// Fetch again now with the current parameters, keeping the visible data.
    pub fn refresh(&mut self) -> bool {
        let Some(params) = self.params().cloned() else {
            return false;
        };
        self.start(params, false);
        true
    }

    /// Stop polling and clear the published snapshot.
    pub fn deactivate(&mut self) {
        if let Some(activation) = self.active.take() {
            activation.task.abort();
            self.state.send_modify(|state| {
                state.begin_generation(true);
            });
            debug!(feed = self.feed, "feed deactivated");
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<FeedState<T>> {
        self.state.subscribe()
    }

    pub fn state(&self) -> FeedState<T> {
        self.state.borrow().clone()
    }

    pub fn latest(&self) -> Option<Arc<PollSnapshot<T>>> {
        self.state.borrow().snapshot().cloned()
    }

    fn start(&mut self, params: P, clear: bool) {
        if let Some(previous) = self.active.take() {
            previous.task.abort();
        }

        let mut generation = 0;
        self.state.send_modify(|state| generation = state.begin_generation(clear));
        debug!(feed = self.feed, generation, ?params, "feed activated");

        let task = tokio::spawn(run_feed(
            self.feed,
            generation,
            params.clone(),
            self.schedule,
            Arc::clone(&self.fetch),
            Arc::clone(&self.state),
        ));
        self.active = Some(Activation { params, task });
    }
}

impl<P, T> Drop for PollingDataSource<P, T> {
    fn drop(&mut self) {
        if let Some(activation) = self.active.take() {
            activation.task.abort();
        }
    }
}

async fn run_feed<P, T>(
    feed: &'static str,
    generation: u64,
    params: P,
    schedule: Schedule,
    fetch: FetchFn<P, T>,
    state: Arc<watch::Sender<FeedState<T>>>,
) where
    P: Clone + Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    let mut ticker = match schedule {
        Schedule::Every(period) => {
            let mut ticker = time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            Some(ticker)
        }
        Schedule::Once => None,
    };
    let periodic = ticker.is_some();
    let mut in_flight: JoinSet<(Ticket, Result<T>)> = JoinSet::new();

    if !periodic && !issue_request(generation, &params, &fetch, &state, &mut in_flight) {
        return;
    }

    loop {
        tokio::select! {
            _ = next_tick(&mut ticker), if periodic => {
                if !issue_request(generation, &params, &fetch, &state, &mut in_flight) {
                    break;
                }
            }
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => match joined {
                Ok((ticket, result)) => apply(feed, &state, ticket, result),
                Err(error) if error.is_cancelled() => {}
                Err(error) => warn!(feed, %error, "fetch task panicked"),
            },
            else => break,
        }
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => pending::<()>().await,
    }
}

/// Returns false when this generation has been superseded.
fn issue_request<P, T>(
    generation: u64,
    params: &P,
    fetch: &FetchFn<P, T>,
    state: &watch::Sender<FeedState<T>>,
    in_flight: &mut JoinSet<(Ticket, Result<T>)>,
) -> bool
where
    P: Clone,
    T: Send + 'static,
{
    let mut ticket = None;
    state.send_if_modified(|state| {
        if state.generation() == generation {
            ticket = Some(state.issue(Utc::now()));
        }
        false
    });
    let Some(ticket) = ticket else {
        return false;
    };

    let request = fetch(params.clone());
    in_flight.spawn(async move { (ticket, request.await) });
    true
}

fn apply<T>(
    feed: &'static str,
    state: &watch::Sender<FeedState<T>>,
    ticket: Ticket,
    result: Result<T>,
) {
    let mut resolution = Resolution::Superseded;
    let mut failure = None;
    state.send_if_modified(|state| {
        if let Err(error) = &result {
            failure = Some(error.to_string());
        }
        resolution = state.resolve(ticket, result, Utc::now());
        resolution.is_visible()
    });

    match resolution {
        Resolution::Applied => debug!(feed, seq = ticket.seq, "poll applied"),
        Resolution::Failed => warn!(
            feed,
            seq = ticket.seq,
            error = failure.as_deref().unwrap_or_default(),
            "poll failed, keeping last data"
        ),
        Resolution::Stale => debug!(feed, seq = ticket.seq, "discarded stale response"),
        Resolution::Superseded => debug!(feed, seq = ticket.seq, "discarded superseded response"),
    }
}
