//! Conversation core for the SecureBank assistant.
//!
//! Everything here is synchronous and side-effect free apart from audit
//! emission: input validators, the intent router, the per-flow step table and
//! the conversation/transcript model. The async controller that drives these
//! pieces against a banking backend lives in `securebank-agent`.

pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod flows;
pub mod intent;
pub mod replies;
pub mod validators;

pub use domain::banking::{CardBlockRequest, LoanApplication};
pub use domain::message::{Message, MessageId, Sender, Transcript};
pub use errors::{ApplicationError, BackendError, DomainError};
pub use flows::{ConversationState, FlowAction, FlowEngine, FlowKind, Step, StepOutcome};
pub use intent::{is_reset_command, IntentRouter};
