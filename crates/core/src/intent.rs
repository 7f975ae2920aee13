//! Reset-command detection and keyword intent routing for idle conversations.

use std::sync::LazyLock;

use regex::Regex;

use crate::flows::states::FlowKind;

static RESET_COMMAND_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(start over|reset|new|help|menu)$").expect("invalid reset command regex")
});

static INTENT_PATTERNS: LazyLock<Vec<(FlowKind, Regex)>> = LazyLock::new(|| {
    [
        (FlowKind::LoanApplication, r"(?i)loan.*apply|apply.*loan|need.*loan|want.*loan"),
        (FlowKind::CardBlock, r"(?i)block.*card|card.*block|lost.*card|stolen.*card|freeze.*card"),
        (FlowKind::AccountQuery, r"(?i)balance|statement|account.*query|mini.*statement|transaction"),
        (FlowKind::LoanStatus, r"(?i)loan.*status|status.*loan|check.*loan|loan.*inquiry"),
    ]
    .into_iter()
    .map(|(kind, pattern)| (kind, Regex::new(pattern).expect("invalid intent regex")))
    .collect()
});

/// True when the whole trimmed input is one of the reset commands. Embedded
/// occurrences ("please reset now") do not count.
pub fn is_reset_command(text: &str) -> bool {
    RESET_COMMAND_RE.is_match(text.trim())
}

#[derive(Clone, Debug, Default)]
pub struct IntentRouter;

impl IntentRouter {
    pub fn new() -> Self {
        Self
    }

    /// Patterns are tried in declaration order and the first match wins.
    pub fn classify(&self, text: &str) -> Option<FlowKind> {
        INTENT_PATTERNS
            .iter()
            .find(|(_, pattern)| pattern.is_match(text))
            .map(|(kind, _)| *kind)
    }
}
