//! Per-slot input validators.
//!
//! Every validator takes the raw user text and returns `Some(normalized)` when
//! the input is acceptable for its slot, or `None` when the user has to be
//! re-prompted. Validators are pure and never fail in any other way.

use std::sync::LazyLock;

use regex::Regex;

pub type Validator = fn(&str) -> Option<String>;

pub const MIN_LOAN_AMOUNT: u64 = 1_000;

// `\d` and `\w` are Unicode-aware in `regex`; slot values must be ASCII.
static DIGITS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+$").expect("invalid digits regex"));
static IDENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]{6,}$").expect("invalid identity regex"));
static CARD_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{12,16}$").expect("invalid card number regex"));
static CARDHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z\s]{2,}$").expect("invalid cardholder regex"));
static ACCOUNT_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{8,}$").expect("invalid account number regex"));
static LOAN_REFERENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]{6,}$").expect("invalid loan reference regex"));

/// Accepts whole-dollar amounts of at least [`MIN_LOAN_AMOUNT`]; `$` and `,`
/// are stripped first, so "$5,000" normalizes to "5000".
pub fn loan_amount(raw: &str) -> Option<String> {
    let stripped = raw.replace(['$', ','], "");
    let amount = stripped.trim();
    if !DIGITS_RE.is_match(amount) {
        return None;
    }

    let value = amount.parse::<u64>().ok()?;
    (value >= MIN_LOAN_AMOUNT).then(|| amount.to_string())
}

pub fn identity_document(raw: &str) -> Option<String> {
    accept_trimmed(raw, &IDENTITY_RE)
}

/// Only whitespace is stripped. Hyphenated card numbers are rejected.
pub fn card_number(raw: &str) -> Option<String> {
    let compact = raw.chars().filter(|character| !character.is_whitespace()).collect::<String>();
    CARD_NUMBER_RE.is_match(&compact).then_some(compact)
}

pub fn cardholder_name(raw: &str) -> Option<String> {
    accept_trimmed(raw, &CARDHOLDER_RE)
}

pub fn account_number(raw: &str) -> Option<String> {
    accept_trimmed(raw, &ACCOUNT_NUMBER_RE)
}

pub fn loan_reference(raw: &str) -> Option<String> {
    accept_trimmed(raw, &LOAN_REFERENCE_RE)
}

/// Resolves free text to `"balance"` or `"statement"`. Balance wins when both
/// words appear.
pub fn query_type(raw: &str) -> Option<String> {
    let normalized = raw.trim().to_lowercase();
    if normalized.contains("balance") {
        Some("balance".to_string())
    } else if normalized.contains("statement") {
        Some("statement".to_string())
    } else {
        None
    }
}

fn accept_trimmed(raw: &str, pattern: &Regex) -> Option<String> {
    let trimmed = raw.trim();
    pattern.is_match(trimmed).then(|| trimmed.to_string())
}
