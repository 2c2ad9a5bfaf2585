use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Where a pipeline run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum PipelineState {
    #[default]
    Idle,
    Downloading,
    Segmenting,
    Detecting,
    Reconciling,
    Cutting,
    Done,
    Failed,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Illegal pipeline transition {from} -> {to}")]
pub struct StateTransitionError {
    pub from: PipelineState,
    pub to: PipelineState,
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed)
    }

    /// Move to `next`.
    ///
    /// Stages only move forward, `Failed` is reachable from any non-terminal
    /// state, and terminal states never change. Skipping ahead is allowed
    /// because progress notifications may arrive late.
    pub fn advance(self, next: PipelineState) -> Result<PipelineState, StateTransitionError> {
        let legal = !self.is_terminal() && (next == PipelineState::Failed || next > self);
        if legal {
            Ok(next)
        } else {
            Err(StateTransitionError {
                from: self,
                to: next,
            })
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PipelineState::Idle => "idle",
            PipelineState::Downloading => "downloading",
            PipelineState::Segmenting => "segmenting",
            PipelineState::Detecting => "detecting shots",
            PipelineState::Reconciling => "reconciling timeline",
            PipelineState::Cutting => "cutting clips",
            PipelineState::Done => "done",
            PipelineState::Failed => "failed",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
