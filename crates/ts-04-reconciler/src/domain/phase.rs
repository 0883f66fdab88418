//! # Lifecycle Phases
//!
//! Every Create/Delete runs through
//! `Pending → Broadcasting → Polling → Confirmed | Failed | Deleted`.

use super::errors::ReconcileError;
use super::resources::ResourceKind;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Phase of one resource operation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Nothing sent yet.
    #[default]
    Pending,
    /// Message or upload in flight.
    Broadcasting,
    /// Waiting on the index or the scheduler.
    Polling,
    /// Remote resource is visible and ready.
    Confirmed,
    /// Operation gave up.
    Failed,
    /// Remote resource is forgotten or was already gone.
    Deleted,
}

impl Phase {
    /// Check if transition is valid.
    pub fn can_transition_to(&self, next: Phase) -> bool {
        match (self, next) {
            (Self::Pending, Self::Broadcasting) => true,
            (Self::Pending, Self::Deleted) => true, // Already gone
            (Self::Broadcasting, Self::Polling) => true,
            (Self::Broadcasting, Self::Deleted) => true, // Forget sent
            (Self::Polling, Self::Confirmed) => true,
            (from, Self::Failed) => !from.is_terminal(),
            _ => false,
        }
    }

    /// Check if terminal phase.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Confirmed | Self::Failed | Self::Deleted)
    }
}

/// Tracks and traces the phase of one operation on one resource.
#[derive(Debug)]
pub struct PhaseTracker {
    urn: String,
    kind: ResourceKind,
    phase: Phase,
}

impl PhaseTracker {
    pub fn new(urn: &str, kind: ResourceKind) -> Self {
        Self {
            urn: urn.to_string(),
            kind,
            phase: Phase::Pending,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Move to `next`, rejecting transitions the lifecycle does not allow.
    pub fn transition_to(&mut self, next: Phase) -> Result<(), ReconcileError> {
        if !self.phase.can_transition_to(next) {
            return Err(ReconcileError::InvalidTransition {
                from: self.phase,
                to: next,
            });
        }

        info!(
            urn = %self.urn,
            kind = %self.kind,
            from = ?self.phase,
            to = ?next,
            "Phase transition"
        );
        self.phase = next;
        Ok(())
    }

    /// Record a failure and hand the error back.
    pub fn fail(&mut self, error: ReconcileError) -> ReconcileError {
        warn!(urn = %self.urn, kind = %self.kind, phase = ?self.phase, error = %error, "Operation failed");
        if !self.phase.is_terminal() {
            self.phase = Phase::Failed;
        }
        error
    }
}
