//! Agent-side message texts.

use crate::flows::states::{FlowAction, FlowKind, SlotMap, Step};

pub const WELCOME: &str = "👋 Welcome to SecureBank AI Assistant!\n\nI can help you with:\n• Loan applications\n• Card blocking\n• Account balance & statements\n• Loan status inquiries\n\nHow may I assist you today?";

pub const HELP_MENU: &str = "👋 How can I help you today?\n\n• Loan applications\n• Card blocking\n• Account balance & statements\n• Loan status inquiries";

pub const UNMATCHED_INTENT: &str = "I'd be happy to help! Please let me know what you need:\n\n• Type 'apply for loan' for loan applications\n• Type 'block card' to block your card\n• Type 'check balance' for account queries\n• Type 'loan status' to check loan status\n\nOr simply describe what you need help with.";

pub const REPROMPT_AMOUNT: &str =
    "Please enter a valid loan amount (minimum $1,000). For example: 5000";
pub const REPROMPT_ID: &str = "Please provide a valid ID number (at least 6 characters):";
pub const REPROMPT_CARD_NUMBER: &str =
    "Please enter a valid 12-16 digit card number (numbers only):";
pub const REPROMPT_NAME: &str =
    "Please provide a valid name (letters and spaces only, at least 2 characters):";
pub const REPROMPT_ACCOUNT_NUMBER: &str =
    "Please provide a valid account number (at least 8 digits):";
pub const REPROMPT_QUERY_TYPE: &str = "Please type 'balance' or 'statement' to proceed:";
pub const REPROMPT_LOAN_ID: &str =
    "Please provide a valid loan reference ID (at least 6 characters, letters and numbers):";

const ANYTHING_ELSE: &str =
    "Is there anything else I can help you with?\n\nType 'help' to see available options.";

pub fn flow_entry_prompt(kind: FlowKind) -> &'static str {
    match kind {
        FlowKind::LoanApplication => "💰 I'll help you apply for a loan!\n\nWhat loan amount are you looking for? (Please enter the amount in dollars, e.g., 5000)",
        FlowKind::CardBlock => "🔒 I'll help you block your card immediately for security.\n\nPlease provide your 16-digit card number:",
        FlowKind::AccountQuery => "🏦 I can help you check your account details.\n\nPlease provide your account number:",
        FlowKind::LoanStatus => "📋 I'll check your loan status.\n\nPlease provide your loan reference ID:",
    }
}

/// Prompt shown after the flow advanced to `step`. Entry steps use
/// [`flow_entry_prompt`] instead.
pub fn step_prompt(step: Step, slots: &SlotMap) -> String {
    match step {
        Step::Id => {
            let amount = slots
                .get(Step::Amount.slot_name())
                .and_then(|amount| amount.parse::<u64>().ok())
                .unwrap_or(0);
            format!(
                "Great! You're applying for ${}.\n\nFor verification, please provide your government-issued ID number:",
                group_thousands(amount)
            )
        }
        Step::Name => "For security verification, please provide the name on the card (as it appears on your card):".to_string(),
        Step::QueryType => "What would you like to check?\n\n• Type 'balance' for account balance\n• Type 'statement' for mini statement".to_string(),
        Step::Amount => flow_entry_prompt(FlowKind::LoanApplication).to_string(),
        Step::CardNumber => flow_entry_prompt(FlowKind::CardBlock).to_string(),
        Step::AccountNumber => flow_entry_prompt(FlowKind::AccountQuery).to_string(),
        Step::LoanId => flow_entry_prompt(FlowKind::LoanStatus).to_string(),
    }
}

pub fn processing_notice(action: &FlowAction) -> &'static str {
    match action {
        FlowAction::SubmitLoan(_) => {
            "🔄 Processing your loan application...\n\nThis may take a moment."
        }
        FlowAction::BlockCard(_) => {
            "🔄 Processing your card block request...\n\nSecuring your account..."
        }
        FlowAction::GetBalance { .. } => "🔄 Fetching your account balance...",
        FlowAction::GetMiniStatement { .. } => "🔄 Retrieving your mini statement...",
        FlowAction::GetLoanStatus { .. } => "🔄 Checking your loan status...",
    }
}

pub fn follow_up(action: &FlowAction) -> &'static str {
    match action {
        FlowAction::SubmitLoan(_) => {
            "Is there anything else I can help you with today?\n\nType 'help' to see available options."
        }
        FlowAction::BlockCard(_) => {
            "Your card has been secured. Is there anything else I can help you with?\n\nType 'help' to see available options."
        }
        _ => ANYTHING_ELSE,
    }
}

pub fn error_message(detail: &str) -> String {
    format!("❌ An error occurred: {detail}\n\nType 'help' to start over.")
}

/// Formats an amount with comma thousands separators (5000 -> "5,000").
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let len = digits.len();
    let mut grouped = String::with_capacity(len + len / 3);
    for (index, character) in digits.chars().enumerate() {
        if index > 0 && (len - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(character);
    }
    grouped
}
