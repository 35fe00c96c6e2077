//! Nearby stops with a widening search radius.
//!
//! The nearby feed runs inside its own task. Whenever a query comes back
//! empty the task re-activates the feed with the next radius of the ladder,
//! without waiting for anyone to read the result.

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::info;
use transight_transit::{Position, Stop};

use crate::feed::{FeedState, PollingDataSource};

/// Parameters of the area feeds (nearby stops, vehicles near the user)
#[derive(Clone, Debug, PartialEq)]
pub struct AreaQuery {
    pub around: Position,
    pub radius_km: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct RadiusProgress {
    /// Radius of the running query
    pub radius_km: Option<f64>,
    /// Largest radius that came back empty for the current centre
    pub empty_radius: Option<f64>,
}

enum Command {
    Centre(Position),
    Refresh,
}

/// Handle to the nearby-stops task. Dropping it stops the feed.
pub struct NearbyStops {
    commands: mpsc::UnboundedSender<Command>,
    feed: watch::Receiver<FeedState<Vec<Stop>>>,
    progress: watch::Receiver<RadiusProgress>,
    task: JoinHandle<()>,
}

impl NearbyStops {
    /// `ladder` must be non-empty and increasing, as `ClientConfig::validate`
    /// enforces. Must be called from within a tokio runtime.
    pub fn spawn(source: PollingDataSource<AreaQuery, Vec<Stop>>, ladder: Vec<f64>) -> Self {
        let (commands, commands_rx) = mpsc::unbounded_channel();
        let (progress_tx, progress) = watch::channel(RadiusProgress::default());
        let feed = source.subscribe();
        let task = tokio::spawn(run(source, ladder, commands_rx, progress_tx));
        Self {
            commands,
            feed,
            progress,
            task,
        }
    }

    /// Search around `around`, starting again from the smallest radius.
    pub fn centre(&self, around: Position) {
        let _ = self.commands.send(Command::Centre(around));
    }

    pub fn refresh(&self) {
        let _ = self.commands.send(Command::Refresh);
    }

    pub fn state(&self) -> FeedState<Vec<Stop>> {
        self.feed.borrow().clone()
    }

    pub fn progress(&self) -> RadiusProgress {
        *self.progress.borrow()
    }
}

impl Drop for NearbyStops {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run(
    mut source: PollingDataSource<AreaQuery, Vec<Stop>>,
    ladder: Vec<f64>,
    mut commands: mpsc::UnboundedReceiver<Command>,
    progress: watch::Sender<RadiusProgress>,
) {
    let mut feed = source.subscribe();
    let mut step = 0;

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(Command::Centre(around)) => {
                    step = 0;
                    let radius_km = ladder.first().copied().unwrap_or(1.0);
                    source.activate(AreaQuery { around, radius_km });
                    progress.send_replace(RadiusProgress {
                        radius_km: Some(radius_km),
                        empty_radius: None,
                    });
                }
                Some(Command::Refresh) => {
                    source.refresh();
                }
                None => break,
            },
            changed = feed.changed() => {
                if changed.is_err() {
                    break;
                }
                let empty = feed.borrow_and_update().data().is_some_and(Vec::is_empty);
                let Some(query) = source.params().cloned().filter(|_| empty) else {
                    continue;
                };

                progress.send_modify(|p| p.empty_radius = Some(query.radius_km));
                if let Some(&radius_km) = ladder.get(step + 1) {
                    step += 1;
                    info!(radius_km, "no stops nearby, widening search");
                    source.activate(AreaQuery {
                        around: query.around,
                        radius_km,
                    });
                    progress.send_modify(|p| p.radius_km = Some(radius_km));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use futures_util::FutureExt;
    use tokio::time::sleep;
    use transight_transit::{StaticTransitProvider, StopIdentifier, TransitBackend};

    use super::*;
    use crate::feed::Schedule;

    const USER: Position = Position::new(51.4545, -2.5879);

    fn provider() -> StaticTransitProvider {
        // 1.5 km north of the user
        let stop = Stop {
            id: StopIdentifier::new("s_north"),
            name: "Cotham Hill".into(),
            locality: "Bristol".into(),
            indicator: "".into(),
            position: Position::new(51.4680, -2.5879),
            distance_km: None,
        };
        StaticTransitProvider::from_data(vec![stop], vec![], vec![])
    }

    /// Every query takes a second and records its radius
    fn nearby(radii: Arc<Mutex<Vec<f64>>>) -> NearbyStops {
        let backend = Arc::new(provider());
        let source = PollingDataSource::new("nearby_stops", Schedule::Once, move |q: AreaQuery| {
            let backend = Arc::clone(&backend);
            radii.lock().unwrap().push(q.radius_km);
            async move {
                sleep(Duration::from_secs(1)).await;
                backend.nearby_stops(q.around, q.radius_km).await
            }
            .boxed()
        });
        NearbyStops::spawn(source, vec![1.0, 2.0, 5.0])
    }

    #[tokio::test(start_paused = true)]
    async fn widens_without_being_read() {
        let radii = Arc::new(Mutex::new(Vec::new()));
        let nearby = nearby(Arc::clone(&radii));
        nearby.centre(USER);

        sleep(Duration::from_millis(1500)).await;
        let progress = nearby.progress();
        assert_eq!(progress.empty_radius, Some(1.0));
        assert_eq!(progress.radius_km, Some(2.0));
        assert!(nearby.state().data().is_none());

        sleep(Duration::from_secs(1)).await;
        assert_eq!(nearby.state().data().map(Vec::len), Some(1));
        assert_eq!(*radii.lock().unwrap(), vec![1.0, 2.0]);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_at_the_last_radius() {
        let radii = Arc::new(Mutex::new(Vec::new()));
        let nearby = nearby(Arc::clone(&radii));
        nearby.centre(Position::new(51.60, -2.90));

        sleep(Duration::from_secs(10)).await;
        assert_eq!(*radii.lock().unwrap(), vec![1.0, 2.0, 5.0]);
        assert_eq!(nearby.progress().empty_radius, Some(5.0));
        assert_eq!(nearby.state().data().map(Vec::len), Some(0));
    }

    #[tokio::test(start_paused = true)]
    async fn new_centre_restarts_the_ladder() {
        let radii = Arc::new(Mutex::new(Vec::new()));
        let nearby = nearby(Arc::clone(&radii));
        nearby.centre(USER);
        sleep(Duration::from_secs(5)).await;

        nearby.centre(Position::new(51.4680, -2.5880));
        sleep(Duration::from_millis(1)).await;
        assert_eq!(nearby.progress(), RadiusProgress {
            radius_km: Some(1.0),
            empty_radius: None,
        });

        sleep(Duration::from_secs(2)).await;
        assert_eq!(*radii.lock().unwrap(), vec![1.0, 2.0, 1.0]);
        assert_eq!(nearby.state().data().map(Vec::len), Some(1));
    }
}
