use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use transight_transit::Vehicle;

use crate::feed::FeedState;
use crate::markers::interpolate::{Marker, MarkerInterpolator};

/// Which vehicle feed the map is drawing
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, strum::Display)]
pub enum VehicleLayer {
    #[default]
    NearUser,
    AtStop,
    Route,
}

/// Receivers for every vehicle feed the scheduler can switch between
#[derive(Clone)]
pub struct VehicleFeeds {
    pub near_user: watch::Receiver<FeedState<Vec<Vehicle>>>,
    pub at_stop: watch::Receiver<FeedState<Vec<Vehicle>>>,
    pub route: watch::Receiver<FeedState<Vec<Vehicle>>>,
}

impl VehicleFeeds {
    fn receiver(&self, layer: VehicleLayer) -> watch::Receiver<FeedState<Vec<Vehicle>>> {
        match layer {
            VehicleLayer::NearUser => self.near_user.clone(),
            VehicleLayer::AtStop => self.at_stop.clone(),
            VehicleLayer::Route => self.route.clone(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MarkerFrame {
    pub layer: VehicleLayer,
    pub markers: Vec<Marker>,
    pub animating: bool,
}

/// Tracks which snapshot of the current layer the interpolator has seen
struct Cursor {
    receiver: watch::Receiver<FeedState<Vec<Vehicle>>>,
    seq: Option<u64>,
}

impl Cursor {
    fn new(receiver: watch::Receiver<FeedState<Vec<Vehicle>>>) -> Self {
        Self { receiver, seq: None }
    }

    /// Feed the newest snapshot to the interpolator if it has not seen it yet.
    fn sync(&mut self, interpolator: &mut MarkerInterpolator) {
        let snapshot = self.receiver.borrow_and_update().snapshot().cloned();
        match snapshot {
            Some(snapshot) if Some(snapshot.seq) != self.seq => {
                interpolator.apply_snapshot(&snapshot.data);
                self.seq = Some(snapshot.seq);
            }
            Some(_) => {}
            None => {
                interpolator.clear();
                self.seq = None;
            }
        }
    }
}

/// Spawn the one task that owns the marker interpolator.
///
/// It follows `layer` to pick a vehicle feed, feeds each newly accepted
/// snapshot to the interpolator, ticks it every `frame_interval` while
/// something is moving and publishes the result. The task ends when the
/// layer sender is dropped.
pub fn spawn_animation(
    mut interpolator: MarkerInterpolator,
    feeds: VehicleFeeds,
    mut layer: watch::Receiver<VehicleLayer>,
    frame_interval: Duration,
) -> (JoinHandle<()>, watch::Receiver<MarkerFrame>) {
    let (frames, frames_rx) = watch::channel(MarkerFrame::default());

    let task = tokio::spawn(async move {
        let mut ticker = time::interval(frame_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut current = *layer.borrow_and_update();
        let mut cursor = Cursor::new(feeds.receiver(current));
        cursor.sync(&mut interpolator);
        let mut animating = publish(&frames, current, &interpolator);

        loop {
            tokio::select! {
                changed = layer.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let next = *layer.borrow_and_update();
                    if next != current {
                        tracing::debug!(from = %current, to = %next, "vehicle layer switched");
                        current = next;
                        interpolator.clear();
                        cursor = Cursor::new(feeds.receiver(current));
                    }
                    cursor.sync(&mut interpolator);
                    animating = publish(&frames, current, &interpolator);
                }
                changed = cursor.receiver.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    cursor.sync(&mut interpolator);
                    animating = publish(&frames, current, &interpolator);
                }
                _ = ticker.tick(), if animating => {
                    interpolator.tick();
                    animating = publish(&frames, current, &interpolator);
                }
            }
        }
        tracing::debug!("marker animation stopped");
    });

    (task, frames_rx)
}

fn publish(
    frames: &watch::Sender<MarkerFrame>,
    layer: VehicleLayer,
    interpolator: &MarkerInterpolator,
) -> bool {
    let animating = interpolator.is_animating();
    frames.send_replace(MarkerFrame {
        layer,
        markers: interpolator.markers(),
        animating,
    });
    animating
}
