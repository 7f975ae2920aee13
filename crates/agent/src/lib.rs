//! Conversation runtime for the SecureBank assistant.
//!
//! This crate wires the synchronous pieces of `securebank-core` (validators,
//! intent router, flow table) to the asynchronous banking backend:
//!
//! 1. **Controller** (`runtime`) - `ConversationController` handles one user
//!    turn at a time, routing it to the intent router or the active flow.
//! 2. **Backend** (`backend`) - the `BankBackend` contract and a simulated
//!    implementation with artificial latency.
//! 3. **Sessions** (`sessions`) - a registry of independent controllers.
//!
//! Slot values collected from the user never leave the controller except as
//! the typed request handed to the backend.

pub mod audit;
pub mod backend;
pub mod runtime;
pub mod sessions;

pub use audit::TracingAuditSink;
pub use backend::{BankBackend, SimulatedBankBackend};
pub use runtime::{BusyFlag, ConversationController};
pub use sessions::{SessionError, SessionId, SessionManager};
