use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Local;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use securebank_core::config::BackendConfig;
use securebank_core::{BackendError, CardBlockRequest, FlowAction, LoanApplication};

/// Banking operations the conversation depends on. Replies are human-readable
/// text that the controller forwards verbatim.
#[async_trait]
pub trait BankBackend: Send + Sync {
    async fn submit_loan(&self, request: &LoanApplication) -> Result<String, BackendError>;
    async fn block_card(&self, request: &CardBlockRequest) -> Result<String, BackendError>;
    async fn get_balance(&self, account_number: &str) -> Result<String, BackendError>;
    async fn get_mini_statement(&self, account_number: &str) -> Result<String, BackendError>;
    async fn get_loan_status(&self, loan_id: &str) -> Result<String, BackendError>;
}

/// Runs a flow's terminal action against `backend`.
pub async fn execute<B>(backend: &B, action: &FlowAction) -> Result<String, BackendError>
where
    B: BankBackend + ?Sized,
{
    match action {
        FlowAction::SubmitLoan(request) => backend.submit_loan(request).await,
        FlowAction::BlockCard(request) => backend.block_card(request).await,
        FlowAction::GetBalance { account_number } => backend.get_balance(account_number).await,
        FlowAction::GetMiniStatement { account_number } => {
            backend.get_mini_statement(account_number).await
        }
        FlowAction::GetLoanStatus { loan_id } => backend.get_loan_status(loan_id).await,
    }
}

const REFERENCE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const REFERENCE_LEN: usize = 9;

const BALANCES: [&str; 4] = ["$2,345.67", "$15,892.34", "$567.89", "$8,234.12"];

const RECENT_TRANSACTIONS: [&str; 5] = [
    "- $50.00 | Grocery Store | Dec 15",
    "- $25.00 | Coffee Shop | Dec 14",
    "- $100.00 | ATM Withdrawal | Dec 13",
    "- $75.50 | Gas Station | Dec 12",
    "+ $2,500.00 | Salary Credit | Dec 10",
];

const LOAN_STATUSES: [&str; 4] = [
    "Under Review - Expected decision in 2-3 days",
    "Approved - Documents sent to your email",
    "Additional documents required - Check your email",
    "Disbursed - Amount credited to your account",
];

/// In-process stand-in for the bank's services: fixed latencies, canned
/// replies and random reference numbers. Seeding makes replies reproducible.
#[derive(Clone)]
pub struct SimulatedBankBackend {
    config: BackendConfig,
    rng: Arc<Mutex<StdRng>>,
}

impl Default for SimulatedBankBackend {
    fn default() -> Self {
        Self::new(BackendConfig::default())
    }
}

impl SimulatedBankBackend {
    pub fn new(config: BackendConfig) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { config, rng: Arc::new(Mutex::new(rng)) }
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    async fn pause(&self, millis: u64) {
        if millis > 0 {
            tokio::time::sleep(Duration::from_millis(millis)).await;
        }
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        match self.rng.lock() {
            Ok(mut rng) => f(&mut rng),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }

    fn reference(&self, prefix: &str) -> String {
        self.with_rng(|rng| {
            let suffix = (0..REFERENCE_LEN)
                .map(|_| char::from(REFERENCE_ALPHABET[rng.gen_range(0..REFERENCE_ALPHABET.len())]))
                .collect::<String>();
            format!("{prefix}{suffix}")
        })
    }

    fn pick<'a>(&self, options: &[&'a str]) -> &'a str {
        self.with_rng(|rng| options[rng.gen_range(0..options.len())])
    }
}

#[async_trait]
impl BankBackend for SimulatedBankBackend {
    async fn submit_loan(&self, request: &LoanApplication) -> Result<String, BackendError> {
        self.pause(self.config.loan_latency_ms).await;
        if request.amount.is_empty() || request.id.is_empty() {
            return Err(BackendError::InvalidRequest("Invalid loan data provided.".to_owned()));
        }

        let amount = request
            .amount
            .parse::<u64>()
            .map_err(|_| BackendError::InvalidRequest("Invalid loan data provided.".to_owned()))?;
        if amount > self.config.manual_review_threshold {
            return Ok(format!(
                "Your loan application for ${} requires additional verification. Our team will contact you within 2-3 business days.",
                request.amount
            ));
        }

        Ok(format!(
            "Great news! Your loan application for ${} has been pre-approved. Reference ID: {}",
            request.amount,
            self.reference("LN")
        ))
    }

    async fn block_card(&self, request: &CardBlockRequest) -> Result<String, BackendError> {
        self.pause(self.config.card_latency_ms).await;
        if request.card_number.is_empty() || request.name.is_empty() {
            return Err(BackendError::InvalidRequest(
                "Invalid card block data provided.".to_owned(),
            ));
        }

        Ok(format!(
            "✅ Your card ending with {} has been successfully blocked for security. A replacement card will be sent to your registered address within 5-7 business days. Reference ID: {}",
            request.last_four(),
            self.reference("CB")
        ))
    }

    async fn get_balance(&self, account_number: &str) -> Result<String, BackendError> {
        self.pause(self.config.balance_latency_ms).await;
        if account_number.is_empty() {
            return Err(BackendError::InvalidRequest("Account number is required.".to_owned()));
        }

        let balance = self.pick(&BALANCES);
        let updated = Local::now().format("%-m/%-d/%Y, %-I:%M:%S %p");
        Ok(format!(
            "💰 Account Balance for {account_number}: {balance}\n\nAvailable Balance: {balance}\nLast Updated: {updated}"
        ))
    }

    async fn get_mini_statement(&self, account_number: &str) -> Result<String, BackendError> {
        self.pause(self.config.statement_latency_ms).await;
        if account_number.is_empty() {
            return Err(BackendError::InvalidRequest("Account number is required.".to_owned()));
        }

        Ok(format!(
            "📄 Mini Statement for {account_number}:\n\nRecent Transactions:\n{}\n\nFor detailed statement, visit our website or nearest branch.",
            RECENT_TRANSACTIONS.join("\n")
        ))
    }

    async fn get_loan_status(&self, loan_id: &str) -> Result<String, BackendError> {
        self.pause(self.config.loan_status_latency_ms).await;
        if loan_id.is_empty() {
            return Err(BackendError::InvalidRequest("Loan ID is required.".to_owned()));
        }

        Ok(format!("📋 Loan Status for {loan_id}: {}", self.pick(&LOAN_STATUSES)))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use securebank_core::config::BackendConfig;
    use securebank_core::{BackendError, CardBlockRequest, FlowAction, LoanApplication};

    use super::{execute, BankBackend, SimulatedBankBackend, LOAN_STATUSES};

    fn instant_backend(seed: u64) -> SimulatedBankBackend {
        SimulatedBankBackend::new(
            BackendConfig { rng_seed: Some(seed), ..BackendConfig::default() }.without_latency(),
        )
    }

    fn loan(amount: &str, id: &str) -> LoanApplication {
        LoanApplication { amount: amount.to_owned(), id: id.to_owned() }
    }

    #[tokio::test]
    async fn small_loans_are_pre_approved_with_reference() {
        let backend = instant_backend(1);
        let reply = backend.submit_loan(&loan("5000", "ABC123")).await.expect("loan reply");

        assert!(reply.starts_with("Great news! Your loan application for $5000 has been pre-approved."));
        let reference = reply.rsplit("Reference ID: ").next().unwrap_or_default();
        assert_eq!(reference.len(), 11);
        assert!(reference.starts_with("LN"));
        assert!(reference[2..].chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }

    #[tokio::test]
    async fn loans_above_threshold_need_verification() {
        let backend = instant_backend(1);

        let at_threshold = backend.submit_loan(&loan("100000", "ABC123")).await.expect("reply");
        assert!(at_threshold.contains("pre-approved"));

        let above = backend.submit_loan(&loan("100001", "ABC123")).await.expect("reply");
        assert!(above.contains("requires additional verification"));
    }

    #[tokio::test]
    async fn missing_fields_are_invalid_requests() {
        let backend = instant_backend(1);

        assert_eq!(
            backend.submit_loan(&loan("", "ABC123")).await,
            Err(BackendError::InvalidRequest("Invalid loan data provided.".to_owned()))
        );
        assert_eq!(
            backend
                .block_card(&CardBlockRequest { card_number: String::new(), name: "Jane".to_owned() })
                .await,
            Err(BackendError::InvalidRequest("Invalid card block data provided.".to_owned()))
        );
        assert!(matches!(backend.get_balance("").await, Err(BackendError::InvalidRequest(_))));
        assert!(matches!(backend.get_mini_statement("").await, Err(BackendError::InvalidRequest(_))));
        assert_eq!(
            backend.get_loan_status("").await,
            Err(BackendError::InvalidRequest("Loan ID is required.".to_owned()))
        );
    }

    #[tokio::test]
    async fn card_block_reply_mentions_last_four_digits() {
        let backend = instant_backend(3);
        let reply = backend
            .block_card(&CardBlockRequest {
                card_number: "1234567890123456".to_owned(),
                name: "Jane Doe".to_owned(),
            })
            .await
            .expect("card block reply");

        assert!(reply.contains("card ending with 3456"));
        assert!(reply.contains("Reference ID: CB"));
    }

    #[tokio::test]
    async fn seeded_backends_reply_identically() {
        let first = instant_backend(99);
        let second = instant_backend(99);

        for _ in 0..3 {
            assert_eq!(
                first.get_loan_status("LN12345").await.expect("status"),
                second.get_loan_status("LN12345").await.expect("status")
            );
        }
        let status = first.get_loan_status("LN12345").await.expect("status");
        assert!(LOAN_STATUSES.iter().any(|candidate| status.ends_with(candidate)));
    }

    #[tokio::test]
    async fn execute_dispatches_each_action() {
        let backend = instant_backend(5);

        let statement = execute(
            &backend,
            &FlowAction::GetMiniStatement { account_number: "12345678".to_owned() },
        )
        .await
        .expect("statement");
        assert!(statement.starts_with("📄 Mini Statement for 12345678:"));
        assert!(statement.contains("+ $2,500.00 | Salary Credit | Dec 10"));

        let balance =
            execute(&backend, &FlowAction::GetBalance { account_number: "12345678".to_owned() })
                .await
                .expect("balance");
        assert!(balance.starts_with("💰 Account Balance for 12345678: $"));
    }

    #[tokio::test(start_paused = true)]
    async fn simulated_latency_is_applied() {
        let backend = SimulatedBankBackend::new(BackendConfig {
            rng_seed: Some(1),
            ..BackendConfig::default()
        });

        let started = tokio::time::Instant::now();
        backend.get_balance("12345678").await.expect("balance");

        assert!(started.elapsed() >= Duration::from_millis(800));
    }
}
