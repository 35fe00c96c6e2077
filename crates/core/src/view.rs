//! Navigation between the stop list, the buses at one stop, and one tracked bus.

use transight_transit::{Stop, StopIdentifier, Vehicle};

/// Which panel the user is looking at
#[derive(Clone, Debug, PartialEq)]
pub enum ViewState {
    Stops,
    BusList { stop: Stop },
    BusDetail { stop: Stop, bus: Vehicle },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::IntoStaticStr)]
pub enum ViewLevel {
    Stops,
    BusList,
    BusDetail,
}

impl ViewState {
    pub fn level(&self) -> ViewLevel {
        match self {
            Self::Stops => ViewLevel::Stops,
            Self::BusList { .. } => ViewLevel::BusList,
            Self::BusDetail { .. } => ViewLevel::BusDetail,
        }
    }

    pub fn stop(&self) -> Option<&Stop> {
        match self {
            Self::Stops => None,
            Self::BusList { stop } | Self::BusDetail { stop, .. } => Some(stop),
        }
    }

    pub fn bus(&self) -> Option<&Vehicle> {
        match self {
            Self::BusDetail { bus, .. } => Some(bus),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
pub enum ViewEvent {
    SelectStop,
    SelectBus,
    SelectSearchResult,
    Back,
}

#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    #[error("{event} is not possible from {from}")]
    InvalidTransition { from: ViewLevel, event: ViewEvent },
}

/// Result of an accepted event
#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    pub event: ViewEvent,
    pub from: ViewState,
    pub to: ViewState,
}

impl Transition {
    /// The selected stop changed identity, so anything fetched for the old
    /// stop must go.
    pub fn changes_stop(&self) -> bool {
        self.from.stop().map(|s| &s.id) != self.to.stop().map(|s| &s.id)
    }

    /// The tracked bus changed identity
    pub fn changes_bus(&self) -> bool {
        self.from.bus().map(|b| &b.id) != self.to.bus().map(|b| &b.id)
    }
}

/// Owner of the active [`ViewState`].
///
/// | From              | Event                 | To                  |
/// |-------------------|-----------------------|---------------------|
/// | any               | select_stop(s)        | BusList{s}          |
/// | any               | select_search_result  | BusList{s}          |
/// | BusList{s}        | select_bus(b)         | BusDetail{s,b}      |
/// | BusDetail{s,_}    | select_bus(b)         | BusDetail{s,b}      |
/// | BusList{s}        | back                  | Stops               |
/// | BusDetail{s,b}    | back                  | BusList{s}          |
///
/// Anything else is rejected and leaves the state untouched.
#[derive(Debug)]
pub struct ViewStateMachine {
    state: ViewState,
}

impl Default for ViewStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewStateMachine {
    pub fn new() -> Self {
        Self {
            state: ViewState::Stops,
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn selected_stop(&self) -> Option<&StopIdentifier> {
        self.state.stop().map(|s| &s.id)
    }

    pub fn select_stop(&mut self, stop: Stop) -> Transition {
        self.enter(ViewEvent::SelectStop, ViewState::BusList { stop })
    }

    /// Picking a search hit jumps straight to its bus list, whatever the
    /// current level.
    pub fn select_search_result(&mut self, stop: Stop) -> Transition {
        self.enter(ViewEvent::SelectSearchResult, ViewState::BusList { stop })
    }

    pub fn select_bus(&mut self, bus: Vehicle) -> Result<Transition, ViewError> {
        let stop = match &self.state {
            ViewState::BusList { stop } | ViewState::BusDetail { stop, .. } => stop.clone(),
            ViewState::Stops => return Err(self.invalid(ViewEvent::SelectBus)),
        };
        Ok(self.enter(ViewEvent::SelectBus, ViewState::BusDetail { stop, bus }))
    }

    pub fn back(&mut self) -> Result<Transition, ViewError> {
        let parent = match &self.state {
            ViewState::Stops => return Err(self.invalid(ViewEvent::Back)),
            ViewState::BusList { .. } => ViewState::Stops,
            ViewState::BusDetail { stop, .. } => ViewState::BusList { stop: stop.clone() },
        };
        Ok(self.enter(ViewEvent::Back, parent))
    }

    fn enter(&mut self, event: ViewEvent, to: ViewState) -> Transition {
        let from = std::mem::replace(&mut self.state, to.clone());
        tracing::info!(%event, from = %from.level(), to = %to.level(), "view transition");
        Transition { event, from, to }
    }

    fn invalid(&self, event: ViewEvent) -> ViewError {
        ViewError::InvalidTransition {
            from: self.state.level(),
            event,
        }
    }
}
