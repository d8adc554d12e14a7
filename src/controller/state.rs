use crate::animation::Direction;

/// Where the overlay sits when no slide is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Hidden,
    Visible,
}

impl Visibility {
    /// Direction of the slide that produced this resting state.
    pub fn arrived_by(self) -> Direction {
        match self {
            Visibility::Hidden => Direction::Up,
            Visibility::Visible => Direction::Down,
        }
    }
}

impl From<Direction> for Visibility {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Up => Visibility::Hidden,
            Direction::Down => Visibility::Visible,
        }
    }
}

/// Progress of the current terminal spawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnState {
    /// No spawn in flight; notifications may start one.
    Idle,
    /// Old terminal is being retired before the new one is launched.
    SpawnRequested,
    /// Launched, waiting for its window to be reparented into the overlay.
    AwaitingReparent,
}

/// What started a spawn. Startup bypasses the in-flight guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnTrigger {
    Startup,
    Notification,
}
