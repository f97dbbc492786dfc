use thiserror::Error;

use crate::flows::states::{
    FlowAction, FlowContext, FlowEvent, FlowType, TransitionOutcome, WorkflowPhase,
};

pub trait FlowDefinition {
    fn flow_type(&self) -> FlowType;
    fn initial_state(&self) -> WorkflowPhase;
    fn transition(
        &self,
        current: &WorkflowPhase,
        event: &FlowEvent,
        context: &FlowContext,
    ) -> Result<TransitionOutcome, FlowTransitionError>;
}

#[derive(Clone, Debug, Default)]
pub struct DocPrepFlow;

impl FlowDefinition for DocPrepFlow {
    fn flow_type(&self) -> FlowType {
        FlowType::DocumentPreparation
    }

    fn initial_state(&self) -> WorkflowPhase {
        WorkflowPhase::Idle
    }

    fn transition(
        &self,
        current: &WorkflowPhase,
        event: &FlowEvent,
        context: &FlowContext,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        transition_doc_prep(current, event, context)
    }
}

#[derive(Clone, Debug)]
pub struct FlowEngine<F> {
    flow: F,
}

impl<F> FlowEngine<F>
where
    F: FlowDefinition,
{
    pub fn new(flow: F) -> Self {
        Self { flow }
    }

    pub fn flow_type(&self) -> FlowType {
        self.flow.flow_type()
    }

    pub fn initial_state(&self) -> WorkflowPhase {
        self.flow.initial_state()
    }

    pub fn apply(
        &self,
        current: &WorkflowPhase,
        event: &FlowEvent,
        context: &FlowContext,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        self.flow.transition(current, event, context)
    }
}

impl Default for FlowEngine<DocPrepFlow> {
    fn default() -> Self {
        Self::new(DocPrepFlow)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FlowTransitionError {
    #[error("unanswered questions before transition from {state:?}: {questions:?}")]
    UnansweredQuestions { state: WorkflowPhase, questions: Vec<String> },
    #[error("invalid transition from {state:?} using event {event:?}")]
    InvalidTransition { state: WorkflowPhase, event: FlowEvent },
}

fn transition_doc_prep(
    current: &WorkflowPhase,
    event: &FlowEvent,
    context: &FlowContext,
) -> Result<TransitionOutcome, FlowTransitionError> {
    use FlowAction::{
        CancelPolling, PostAnswers, PostStart, PresentQuestions, SchedulePoll, StoreDocument,
        SurfaceError,
    };
    use FlowEvent::{
        AnswersSubmitted, DocumentReady, FallbackSubstituted, InputRequested, PollingExhausted,
        Reset, StartAccepted, StartRejected, StartRequested, StatusProcessing, TransportFailed,
        WorkflowFailed,
    };
    use WorkflowPhase::{AwaitingUserInput, Completed, Error, Idle, Processing, Starting};
    let (to, actions) = match (current, event) {
        (_, StartRequested) => (Starting, vec![CancelPolling, PostStart]),
        (Starting, StartAccepted) => (Processing, vec![SchedulePoll]),
        (Starting, StartRejected) => (Error, vec![SurfaceError]),
        (Starting, FallbackSubstituted) => (Completed, vec![StoreDocument]),
        (Processing, StatusProcessing) => (Processing, vec![SchedulePoll]),
        (Processing, InputRequested) => (AwaitingUserInput, vec![PresentQuestions]),
        (Processing, DocumentReady) => (Completed, vec![StoreDocument]),
        (Processing, WorkflowFailed) | (Processing, PollingExhausted) => {
            (Error, vec![SurfaceError])
        }
        (AwaitingUserInput, AnswersSubmitted) => {
            if !context.unanswered_questions.is_empty() {
                return Err(FlowTransitionError::UnansweredQuestions {
                    state: *current,
                    questions: context.unanswered_questions.clone(),
                });
            }
            (Processing, vec![PostAnswers, SchedulePoll])
        }
        (Starting, TransportFailed)
        | (Processing, TransportFailed)
        | (AwaitingUserInput, TransportFailed) => (Error, vec![CancelPolling, SurfaceError]),
        (_, Reset) => (Idle, vec![CancelPolling]),
        _ => {
            return Err(FlowTransitionError::InvalidTransition {
                state: *current,
                event: event.clone(),
            });
        }
    };

    Ok(TransitionOutcome { from: *current, to, event: event.clone(), actions })
}

#[cfg(test)]
mod tests {
    use crate::flows::engine::{DocPrepFlow, FlowDefinition, FlowEngine, FlowTransitionError};
    use crate::flows::states::{FlowAction, FlowContext, FlowEvent, FlowType, WorkflowPhase};

    #[test]
    fn doc_prep_happy_path_with_follow_up_questions() {
        let engine = FlowEngine::new(DocPrepFlow);
        let context = FlowContext::default();
        let mut state = engine.initial_state();

        state = engine
            .apply(&state, &FlowEvent::StartRequested, &context)
            .expect("idle -> starting")
            .to;
        state = engine
            .apply(&state, &FlowEvent::StartAccepted, &context)
            .expect("starting -> processing")
            .to;
        state = engine
            .apply(&state, &FlowEvent::StatusProcessing, &context)
            .expect("processing -> processing")
            .to;
        let awaiting = engine
            .apply(&state, &FlowEvent::InputRequested, &context)
            .expect("processing -> awaiting");
        assert_eq!(awaiting.to, WorkflowPhase::AwaitingUserInput);
        assert_eq!(awaiting.actions, vec![FlowAction::PresentQuestions]);

        let resumed = engine
            .apply(&awaiting.to, &FlowEvent::AnswersSubmitted, &context)
            .expect("awaiting -> processing");
        assert!(resumed.actions.contains(&FlowAction::SchedulePoll));

        let completed = engine
            .apply(&resumed.to, &FlowEvent::DocumentReady, &context)
            .expect("processing -> completed");
        assert_eq!(completed.to, WorkflowPhase::Completed);
        assert!(completed.to.is_settled());
    }

    #[test]
    fn unanswered_questions_block_resume() {
        let engine = FlowEngine::default();
        let error = engine
            .apply(
                &WorkflowPhase::AwaitingUserInput,
                &FlowEvent::AnswersSubmitted,
                &FlowContext { unanswered_questions: vec!["Intended use?".to_string()] },
            )
            .expect_err("must reject unanswered questions");

        assert!(matches!(error, FlowTransitionError::UnansweredQuestions { .. }));
    }

    #[test]
    fn transport_failure_reaches_error_from_active_phases_only() {
        let engine = FlowEngine::default();
        let context = FlowContext::default();

        for phase in
            [WorkflowPhase::Starting, WorkflowPhase::Processing, WorkflowPhase::AwaitingUserInput]
        {
            let outcome = engine
                .apply(&phase, &FlowEvent::TransportFailed, &context)
                .expect("active phase may fail");
            assert_eq!(outcome.to, WorkflowPhase::Error);
            assert!(outcome.actions.contains(&FlowAction::CancelPolling));
        }

        let error = engine
            .apply(&WorkflowPhase::Completed, &FlowEvent::TransportFailed, &context)
            .expect_err("completed workflows cannot fail");
        assert!(matches!(error, FlowTransitionError::InvalidTransition { .. }));
    }

    #[test]
    fn status_updates_are_rejected_outside_processing() {
        let engine = FlowEngine::default();
        let error = engine
            .apply(&WorkflowPhase::Idle, &FlowEvent::DocumentReady, &FlowContext::default())
            .expect_err("idle workflow cannot complete");

        assert!(matches!(
            error,
            FlowTransitionError::InvalidTransition {
                state: WorkflowPhase::Idle,
                event: FlowEvent::DocumentReady
            }
        ));
    }

    #[test]
    fn restart_and_reset_are_always_allowed() {
        let engine = FlowEngine::default();
        let context = FlowContext::default();

        for phase in [WorkflowPhase::Completed, WorkflowPhase::Error, WorkflowPhase::Processing] {
            let restart = engine
                .apply(&phase, &FlowEvent::StartRequested, &context)
                .expect("restart allowed");
            assert_eq!(restart.to, WorkflowPhase::Starting);
            assert_eq!(restart.actions[0], FlowAction::CancelPolling);

            let reset = engine.apply(&phase, &FlowEvent::Reset, &context).expect("reset allowed");
            assert_eq!(reset.to, WorkflowPhase::Idle);
        }
        assert_eq!(DocPrepFlow.flow_type(), FlowType::DocumentPreparation);
    }
}
