use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::banking::{CardBlockRequest, LoanApplication};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlowKind {
    LoanApplication,
    CardBlock,
    AccountQuery,
    LoanStatus,
}

impl FlowKind {
    pub const ALL: [FlowKind; 4] =
        [Self::LoanApplication, Self::CardBlock, Self::AccountQuery, Self::LoanStatus];

    pub fn initial_step(self) -> Step {
        match self {
            Self::LoanApplication => Step::Amount,
            Self::CardBlock => Step::CardNumber,
            Self::AccountQuery => Step::AccountNumber,
            Self::LoanStatus => Step::LoanId,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::LoanApplication => "loan_application",
            Self::CardBlock => "card_block",
            Self::AccountQuery => "account_query",
            Self::LoanStatus => "loan_status",
        }
    }
}

impl fmt::Display for FlowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The slot currently being collected. The step name doubles as the slot key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Step {
    Amount,
    Id,
    CardNumber,
    Name,
    AccountNumber,
    QueryType,
    LoanId,
}

impl Step {
    pub fn slot_name(self) -> &'static str {
        match self {
            Self::Amount => "amount",
            Self::Id => "id",
            Self::CardNumber => "cardNumber",
            Self::Name => "name",
            Self::AccountNumber => "accountNumber",
            Self::QueryType => "queryType",
            Self::LoanId => "loanId",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slot_name())
    }
}

pub type SlotMap = BTreeMap<String, String>;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveFlow {
    pub kind: FlowKind,
    pub step: Step,
    pub slots: SlotMap,
}

impl ActiveFlow {
    pub fn new(kind: FlowKind) -> Self {
        Self { kind, step: kind.initial_step(), slots: SlotMap::new() }
    }

    pub fn slot(&self, name: &str) -> Option<&str> {
        self.slots.get(name).map(String::as_str)
    }
}

/// Per-session conversation state. `None` means no flow is active and the
/// next turn goes to the intent router.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationState {
    active: Option<ActiveFlow>,
}

impl ConversationState {
    pub fn idle() -> Self {
        Self::default()
    }

    /// Replaces any active flow. Slots from a previous flow are dropped.
    pub fn start(&mut self, kind: FlowKind) -> &ActiveFlow {
        self.active.insert(ActiveFlow::new(kind))
    }

    pub fn reset(&mut self) {
        self.active = None;
    }

    pub fn is_idle(&self) -> bool {
        self.active.is_none()
    }

    pub fn active(&self) -> Option<&ActiveFlow> {
        self.active.as_ref()
    }

    pub fn flow_kind(&self) -> Option<FlowKind> {
        self.active.as_ref().map(|flow| flow.kind)
    }

    pub fn step(&self) -> Option<Step> {
        self.active.as_ref().map(|flow| flow.step)
    }

    pub fn slot(&self, name: &str) -> Option<&str> {
        self.active.as_ref().and_then(|flow| flow.slot(name))
    }

    /// Stores an accepted slot value and moves to `next`. No-op when idle.
    pub fn record(&mut self, slot: &str, value: String, next: Step) {
        if let Some(flow) = self.active.as_mut() {
            flow.slots.insert(slot.to_string(), value);
            flow.step = next;
        }
    }
}

/// Backend operation invoked once a flow has collected all of its slots.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowAction {
    SubmitLoan(LoanApplication),
    BlockCard(CardBlockRequest),
    GetBalance { account_number: String },
    GetMiniStatement { account_number: String },
    GetLoanStatus { loan_id: String },
}

impl FlowAction {
    pub fn operation(&self) -> &'static str {
        match self {
            Self::SubmitLoan(_) => "submit_loan",
            Self::BlockCard(_) => "block_card",
            Self::GetBalance { .. } => "get_balance",
            Self::GetMiniStatement { .. } => "get_mini_statement",
            Self::GetLoanStatus { .. } => "get_loan_status",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// Input failed validation; state must not change.
    Rejected { step: Step, guidance: &'static str },
    Advanced { slot: &'static str, value: String, next: Step },
    Completed { slot: &'static str, value: String, action: FlowAction },
}
