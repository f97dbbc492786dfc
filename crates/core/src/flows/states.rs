use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowType {
    DocumentPreparation,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowPhase {
    #[default]
    Idle,
    Starting,
    Processing,
    AwaitingUserInput,
    Completed,
    Error,
}

impl WorkflowPhase {
    /// Phases in which no request is outstanding and nothing is scheduled.
    pub fn is_settled(self) -> bool {
        matches!(self, Self::Idle | Self::AwaitingUserInput | Self::Completed | Self::Error)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::Processing => "processing",
            Self::AwaitingUserInput => "awaiting_user_input",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowEvent {
    StartRequested,
    StartAccepted,
    StartRejected,
    FallbackSubstituted,
    StatusProcessing,
    InputRequested,
    AnswersSubmitted,
    DocumentReady,
    WorkflowFailed,
    PollingExhausted,
    TransportFailed,
    Reset,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FlowContext {
    pub unanswered_questions: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowAction {
    CancelPolling,
    PostStart,
    SchedulePoll,
    PresentQuestions,
    PostAnswers,
    StoreDocument,
    SurfaceError,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: WorkflowPhase,
    pub to: WorkflowPhase,
    pub event: FlowEvent,
    pub actions: Vec<FlowAction>,
}
