use crate::CoreError;
use serde::Serialize;
use std::fmt;

/// One step of a lifecycle pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Stop,
    CleanAutosaves,
    SyncMods,
    Start,
}

/// What a phase failure does to the rest of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Enter `Failed`; later phases never run.
    Abort,
    /// Record a warning and carry on.
    Continue,
}

impl Phase {
    /// The fatal/non-fatal table. Container control failures abort; save
    /// cleanup and mod sync never block the server from starting.
    pub const fn failure_policy(self) -> FailurePolicy {
        match self {
            Phase::Stop | Phase::Start => FailurePolicy::Abort,
            Phase::CleanAutosaves | Phase::SyncMods => FailurePolicy::Continue,
        }
    }

    pub const fn state(self) -> PipelineState {
        match self {
            Phase::Stop => PipelineState::Stopping,
            Phase::CleanAutosaves => PipelineState::CleaningAutosaves,
            Phase::SyncMods => PipelineState::SyncingMods,
            Phase::Start => PipelineState::Starting,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Stop => "stop",
            Phase::CleanAutosaves => "clean_autosaves",
            Phase::SyncMods => "sync_mods",
            Phase::Start => "start",
        };
        f.write_str(s)
    }
}

/// The two pipeline shapes an operator can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineKind {
    /// Stop, clean, sync, start.
    Restart,
    /// Clean, sync, start; the container is assumed to be stopped.
    Start,
}

impl PipelineKind {
    pub const fn phases(self) -> &'static [Phase] {
        match self {
            PipelineKind::Restart => &[
                Phase::Stop,
                Phase::CleanAutosaves,
                Phase::SyncMods,
                Phase::Start,
            ],
            PipelineKind::Start => &[Phase::CleanAutosaves, Phase::SyncMods, Phase::Start],
        }
    }
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineKind::Restart => f.write_str("restart"),
            PipelineKind::Start => f.write_str("start"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    Stopping,
    CleaningAutosaves,
    SyncingMods,
    Starting,
    Done,
    Failed,
}

impl PipelineState {
    pub const fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PipelineState::Idle => "idle",
            PipelineState::Stopping => "stopping",
            PipelineState::CleaningAutosaves => "cleaning_autosaves",
            PipelineState::SyncingMods => "syncing_mods",
            PipelineState::Starting => "starting",
            PipelineState::Done => "done",
            PipelineState::Failed => "failed",
        };
        f.write_str(s)
    }
}

pub fn validate_transition(from: PipelineState, to: PipelineState) -> Result<(), CoreError> {
    let valid = matches!(
        (from, to),
        (
            PipelineState::Idle,
            PipelineState::Stopping | PipelineState::CleaningAutosaves
        ) | (PipelineState::Stopping, PipelineState::CleaningAutosaves)
            | (PipelineState::CleaningAutosaves, PipelineState::SyncingMods)
            | (PipelineState::SyncingMods, PipelineState::Starting)
            | (PipelineState::Starting, PipelineState::Done)
            | (
                PipelineState::Stopping | PipelineState::Starting,
                PipelineState::Failed
            )
    );

    if valid {
        Ok(())
    } else {
        Err(CoreError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_transitions() {
        use PipelineState::{CleaningAutosaves, Done, Failed, Idle, Starting, Stopping, SyncingMods};
        assert!(validate_transition(Idle, Stopping).is_ok());
        assert!(validate_transition(Idle, CleaningAutosaves).is_ok()); // start-only
        assert!(validate_transition(Stopping, CleaningAutosaves).is_ok());
        assert!(validate_transition(CleaningAutosaves, SyncingMods).is_ok());
        assert!(validate_transition(SyncingMods, Starting).is_ok());
        assert!(validate_transition(Starting, Done).is_ok());
        assert!(validate_transition(Stopping, Failed).is_ok());
        assert!(validate_transition(Starting, Failed).is_ok());
    }

    #[test]
    fn invalid_transitions() {
        use PipelineState::{CleaningAutosaves, Done, Failed, Idle, Starting, Stopping, SyncingMods};
        assert!(validate_transition(Idle, Starting).is_err());
        assert!(validate_transition(CleaningAutosaves, Failed).is_err());
        assert!(validate_transition(SyncingMods, Failed).is_err());
        assert!(validate_transition(Stopping, SyncingMods).is_err());
        assert!(validate_transition(Done, Stopping).is_err());
        assert!(validate_transition(Failed, Starting).is_err());
    }

    #[test]
    fn every_pipeline_walks_a_valid_path() {
        for kind in [PipelineKind::Restart, PipelineKind::Start] {
            let mut state = PipelineState::Idle;
            for phase in kind.phases() {
                validate_transition(state, phase.state()).unwrap();
                state = phase.state();
            }
            validate_transition(state, PipelineState::Done).unwrap();
        }
    }

    #[test]
    fn abort_phases_can_reach_failed() {
        for phase in [Phase::Stop, Phase::CleanAutosaves, Phase::SyncMods, Phase::Start] {
            let can_fail = validate_transition(phase.state(), PipelineState::Failed).is_ok();
            assert_eq!(can_fail, phase.failure_policy() == FailurePolicy::Abort, "{phase}");
        }
    }

    #[test]
    fn start_pipeline_skips_stop() {
        assert_eq!(
            PipelineKind::Start.phases(),
            [Phase::CleanAutosaves, Phase::SyncMods, Phase::Start]
        );
        assert_eq!(PipelineKind::Restart.phases()[0], Phase::Stop);
    }
}
