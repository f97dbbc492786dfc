pub mod engine;
pub mod states;

pub use engine::{DocPrepFlow, FlowDefinition, FlowEngine, FlowTransitionError};
pub use states::{FlowAction, FlowContext, FlowEvent, FlowType, TransitionOutcome, WorkflowPhase};
