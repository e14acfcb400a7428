use serde::Serialize;

/// Controller-side view of whether the program is executing.
///
/// The two `*Requested` states exist because the interpreter only honours
/// a request at a step boundary; until then the run is still in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RunningState {
    #[default]
    Stopped,
    Running,
    Paused,
    PauseRequested,
    StopRequested,
}

impl RunningState {
    /// Running → PauseRequested. Anything else is unchanged.
    pub fn request_pause(self) -> RunningState {
        match self {
            RunningState::Running => RunningState::PauseRequested,
            other => other,
        }
    }

    pub fn request_stop(self) -> RunningState {
        match self {
            RunningState::Running | RunningState::Paused | RunningState::PauseRequested => RunningState::StopRequested,
            other => other,
        }
    }

    pub fn play(self) -> RunningState {
        match self {
            RunningState::Stopped | RunningState::Paused => RunningState::Running,
            other => other,
        }
    }

    /// Settle a pending request once the in-flight step has finished.
    pub fn step_boundary(self) -> RunningState {
        match self {
            RunningState::PauseRequested => RunningState::Paused,
            RunningState::StopRequested => RunningState::Stopped,
            other => other,
        }
    }

    pub fn finished(self) -> RunningState {
        RunningState::Stopped
    }

    /// Whether the interpreter is (still) executing steps.
    pub fn is_in_flight(self) -> bool {
        matches!(
            self,
            RunningState::Running | RunningState::PauseRequested | RunningState::StopRequested
        )
    }

    pub fn is_editable(self) -> bool {
        matches!(self, RunningState::Stopped | RunningState::Paused)
    }
}

impl std::fmt::Display for RunningState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunningState::Stopped => "stopped",
            RunningState::Running => "running",
            RunningState::Paused => "paused",
            RunningState::PauseRequested => "pause requested",
            RunningState::StopRequested => "stop requested",
        };
        f.write_str(s)
    }
}
