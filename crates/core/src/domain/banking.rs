use serde::{Deserialize, Serialize};

/// Loan submission payload. `amount` is the normalized whole-dollar digit string.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanApplication {
    pub amount: String,
    pub id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardBlockRequest {
    pub card_number: String,
    pub name: String,
}

impl CardBlockRequest {
    pub fn last_four(&self) -> &str {
        let len = self.card_number.len();
        self.card_number.get(len.saturating_sub(4)..).unwrap_or_default()
    }
}
