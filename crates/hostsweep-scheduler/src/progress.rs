//! Run phase and progress snapshots.

use std::fmt;

use hostsweep_core::{Hostname, TaskState};

/// Phase of the whole run (not of a single host).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    /// No hosts known yet, or some known host still lacks a task.
    Collecting,
    /// Every known host has a task; waiting for completions. A new host in
    /// a later batch moves the run back to `Collecting`.
    Draining,
    /// Every known host completed. Terminal.
    Done,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RunPhase::Collecting => "collecting",
            RunPhase::Draining => "draining",
            RunPhase::Done => "done",
        })
    }
}

/// Point-in-time view of a run, published after every event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub phase: RunPhase,
    pub known: usize,
    pub serviced: usize,
    pub completed: usize,
    /// Known hosts still waiting for an offer.
    pub unserviced: Vec<Hostname>,
    /// Hosts with a task in flight.
    pub pending: Vec<Hostname>,
    /// Hosts whose task ended without success.
    pub stalled: Vec<(Hostname, TaskState)>,
}

impl Progress {
    pub fn initial() -> Self {
        Self {
            phase: RunPhase::Collecting,
            known: 0,
            serviced: 0,
            completed: 0,
            unserviced: Vec::new(),
            pending: Vec::new(),
            stalled: Vec::new(),
        }
    }

    pub fn is_done(&self) -> bool {
        self.phase == RunPhase::Done
    }

    /// True when no remaining host can complete on its own: nothing is in
    /// flight or waiting for an offer, yet the run is not done.
    pub fn is_blocked(&self) -> bool {
        !self.is_done()
            && self.pending.is_empty()
            && self.unserviced.is_empty()
            && !self.stalled.is_empty()
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::initial()
    }
}
