pub mod engine;
pub mod states;

pub use engine::{FlowEngine, FlowTransitionError, NextStep, StepSpec, STEP_TABLE};
pub use states::{
    ActiveFlow, ConversationState, FlowAction, FlowKind, SlotMap, Step, StepOutcome,
};
