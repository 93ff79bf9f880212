//! Run lifecycle.

use std::fmt;

/// Phase of a [`crate::Runner`]. Phases only move forward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RunState {
    /// Created, nothing contacted yet.
    #[default]
    NotStarted,
    /// Connecting, building the pool and deploying contracts.
    Initializing,
    /// Pre-funding sending accounts.
    Funding,
    /// Workers are sending.
    Running,
    /// Waiting for the node to mine everything that was sent.
    Draining,
    /// Building and writing reports, returning funds.
    Summarizing,
    /// Finished.
    Done,
}

impl RunState {
    /// The phase after this one. `Done` is terminal.
    pub const fn next(self) -> Self {
        match self {
            Self::NotStarted => Self::Initializing,
            Self::Initializing => Self::Funding,
            Self::Funding => Self::Running,
            Self::Running => Self::Draining,
            Self::Draining => Self::Summarizing,
            Self::Summarizing | Self::Done => Self::Done,
        }
    }

    /// Whether `to` is the next phase, or `Done` reached early.
    pub fn can_move_to(self, to: Self) -> bool {
        to == self.next() || (to == Self::Done && self != Self::Done)
    }

    /// Human readable name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not-started",
            Self::Initializing => "initializing",
            Self::Funding => "funding",
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Summarizing => "summarizing",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
