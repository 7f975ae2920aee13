use thiserror::Error;

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::domain::banking::{CardBlockRequest, LoanApplication};
use crate::flows::states::{ActiveFlow, FlowAction, FlowKind, SlotMap, Step, StepOutcome};
use crate::replies;
use crate::validators::{self, Validator};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NextStep {
    Collect(Step),
    Terminal,
}

/// One row of the step table: how to validate a step and where it leads.
#[derive(Clone, Copy)]
pub struct StepSpec {
    pub flow: FlowKind,
    pub step: Step,
    pub validator: Validator,
    pub reprompt: &'static str,
    pub next: NextStep,
}

impl StepSpec {
    pub fn slot_name(&self) -> &'static str {
        self.step.slot_name()
    }
}

pub static STEP_TABLE: &[StepSpec] = &[
    StepSpec {
        flow: FlowKind::LoanApplication,
        step: Step::Amount,
        validator: validators::loan_amount,
        reprompt: replies::REPROMPT_AMOUNT,
        next: NextStep::Collect(Step::Id),
    },
    StepSpec {
        flow: FlowKind::LoanApplication,
        step: Step::Id,
        validator: validators::identity_document,
        reprompt: replies::REPROMPT_ID,
        next: NextStep::Terminal,
    },
    StepSpec {
        flow: FlowKind::CardBlock,
        step: Step::CardNumber,
        validator: validators::card_number,
        reprompt: replies::REPROMPT_CARD_NUMBER,
        next: NextStep::Collect(Step::Name),
    },
    StepSpec {
        flow: FlowKind::CardBlock,
        step: Step::Name,
        validator: validators::cardholder_name,
        reprompt: replies::REPROMPT_NAME,
        next: NextStep::Terminal,
    },
    StepSpec {
        flow: FlowKind::AccountQuery,
        step: Step::AccountNumber,
        validator: validators::account_number,
        reprompt: replies::REPROMPT_ACCOUNT_NUMBER,
        next: NextStep::Collect(Step::QueryType),
    },
    StepSpec {
        flow: FlowKind::AccountQuery,
        step: Step::QueryType,
        validator: validators::query_type,
        reprompt: replies::REPROMPT_QUERY_TYPE,
        next: NextStep::Terminal,
    },
    StepSpec {
        flow: FlowKind::LoanStatus,
        step: Step::LoanId,
        validator: validators::loan_reference,
        reprompt: replies::REPROMPT_LOAN_ID,
        next: NextStep::Terminal,
    },
];

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FlowTransitionError {
    #[error("missing required fields before completing {flow}: {missing_fields:?}")]
    MissingRequiredFields { flow: FlowKind, missing_fields: Vec<String> },
    #[error("step `{step}` is not part of the {flow} flow")]
    UnknownStep { flow: FlowKind, step: Step },
    #[error("unsupported value for `{slot}` in the {flow} flow")]
    InvalidSlotValue { flow: FlowKind, slot: String },
}

pub struct FlowEngine {
    table: &'static [StepSpec],
}

impl Default for FlowEngine {
    fn default() -> Self {
        Self::new(STEP_TABLE)
    }
}

impl FlowEngine {
    pub fn new(table: &'static [StepSpec]) -> Self {
        Self { table }
    }

    pub fn spec(&self, flow: FlowKind, step: Step) -> Option<&'static StepSpec> {
        self.table.iter().find(|spec| spec.flow == flow && spec.step == step)
    }

    /// Ordered steps of `flow`, following `next` links from its first step.
    pub fn steps(&self, flow: FlowKind) -> Vec<Step> {
        let mut steps = Vec::new();
        let mut current = Some(flow.initial_step());
        while let Some(step) = current {
            let Some(spec) = self.spec(flow, step) else {
                break;
            };
            steps.push(step);
            current = match spec.next {
                NextStep::Collect(next) if !steps.contains(&next) => Some(next),
                _ => None,
            };
        }
        steps
    }

    /// Evaluates one user input against the active step. Never mutates state.
    pub fn apply(
        &self,
        flow: &ActiveFlow,
        input: &str,
    ) -> Result<StepOutcome, FlowTransitionError> {
        let spec = self
            .spec(flow.kind, flow.step)
            .ok_or(FlowTransitionError::UnknownStep { flow: flow.kind, step: flow.step })?;

        let Some(value) = (spec.validator)(input) else {
            return Ok(StepOutcome::Rejected { step: spec.step, guidance: spec.reprompt });
        };

        match spec.next {
            NextStep::Collect(next) => {
                Ok(StepOutcome::Advanced { slot: spec.slot_name(), value, next })
            }
            NextStep::Terminal => {
                let mut slots = flow.slots.clone();
                slots.insert(spec.slot_name().to_string(), value.clone());
                let action = terminal_action(self, flow.kind, &slots)?;
                Ok(StepOutcome::Completed { slot: spec.slot_name(), value, action })
            }
        }
    }

    pub fn apply_with_audit<S>(
        &self,
        flow: &ActiveFlow,
        input: &str,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<StepOutcome, FlowTransitionError>
    where
        S: AuditSink + ?Sized,
    {
        let result = self.apply(flow, input);
        let event = match &result {
            Ok(StepOutcome::Rejected { step, .. }) => AuditEvent::new(
                audit,
                "flow.step_rejected",
                AuditCategory::Flow,
                AuditOutcome::Rejected,
            )
            .with_metadata("step", step.slot_name()),
            Ok(StepOutcome::Advanced { slot, next, .. }) => AuditEvent::new(
                audit,
                "flow.step_accepted",
                AuditCategory::Flow,
                AuditOutcome::Success,
            )
            .with_metadata("slot", *slot)
            .with_metadata("next_step", next.slot_name()),
            Ok(StepOutcome::Completed { slot, action, .. }) => AuditEvent::new(
                audit,
                "flow.step_accepted",
                AuditCategory::Flow,
                AuditOutcome::Success,
            )
            .with_metadata("slot", *slot)
            .with_metadata("terminal_action", action.operation()),
            Err(error) => AuditEvent::new(
                audit,
                "flow.transition_failed",
                AuditCategory::Flow,
                AuditOutcome::Failed,
            )
            .with_metadata("error", error.to_string()),
        };
        sink.emit(event.with_flow(flow.kind));
        result
    }
}

fn terminal_action(
    engine: &FlowEngine,
    flow: FlowKind,
    slots: &SlotMap,
) -> Result<FlowAction, FlowTransitionError> {
    let missing_fields = engine
        .steps(flow)
        .into_iter()
        .map(Step::slot_name)
        .filter(|name| slots.get(*name).map_or(true, String::is_empty))
        .map(str::to_string)
        .collect::<Vec<_>>();
    if !missing_fields.is_empty() {
        return Err(FlowTransitionError::MissingRequiredFields { flow, missing_fields });
    }

    let slot = |step: Step| slots.get(step.slot_name()).cloned().unwrap_or_default();
    match flow {
        FlowKind::LoanApplication => Ok(FlowAction::SubmitLoan(LoanApplication {
            amount: slot(Step::Amount),
            id: slot(Step::Id),
        })),
        FlowKind::CardBlock => Ok(FlowAction::BlockCard(CardBlockRequest {
            card_number: slot(Step::CardNumber),
            name: slot(Step::Name),
        })),
        FlowKind::AccountQuery => {
            let account_number = slot(Step::AccountNumber);
            match slot(Step::QueryType).as_str() {
                "balance" => Ok(FlowAction::GetBalance { account_number }),
                "statement" => Ok(FlowAction::GetMiniStatement { account_number }),
                _ => Err(FlowTransitionError::InvalidSlotValue {
                    flow,
                    slot: Step::QueryType.slot_name().to_string(),
                }),
            }
        }
        FlowKind::LoanStatus => Ok(FlowAction::GetLoanStatus { loan_id: slot(Step::LoanId) }),
    }
}

#[cfg(test)]
mod tests {
    use crate::audit::{AuditContext, InMemoryAuditSink};
    use crate::domain::banking::{CardBlockRequest, LoanApplication};
    use crate::flows::engine::{FlowEngine, FlowTransitionError, NextStep, STEP_TABLE};
    use crate::flows::states::{ActiveFlow, FlowAction, FlowKind, Step, StepOutcome};

    fn flow_at(kind: FlowKind, step: Step, slots: &[(&str, &str)]) -> ActiveFlow {
        let mut flow = ActiveFlow::new(kind);
        flow.step = step;
        for (name, value) in slots {
            flow.slots.insert((*name).to_string(), (*value).to_string());
        }
        flow
    }

    #[test]
    fn every_flow_has_a_linear_step_sequence() {
        let engine = FlowEngine::default();

        assert_eq!(engine.steps(FlowKind::LoanApplication), vec![Step::Amount, Step::Id]);
        assert_eq!(engine.steps(FlowKind::CardBlock), vec![Step::CardNumber, Step::Name]);
        assert_eq!(
            engine.steps(FlowKind::AccountQuery),
            vec![Step::AccountNumber, Step::QueryType]
        );
        assert_eq!(engine.steps(FlowKind::LoanStatus), vec![Step::LoanId]);
    }

    #[test]
    fn every_flow_ends_in_exactly_one_terminal_step() {
        for kind in FlowKind::ALL {
            let terminals = STEP_TABLE
                .iter()
                .filter(|spec| spec.flow == kind && spec.next == NextStep::Terminal)
                .count();
            assert_eq!(terminals, 1, "{kind} should have one terminal step");
        }
    }

    #[test]
    fn invalid_input_is_rejected_with_step_guidance() {
        let engine = FlowEngine::default();
        let flow = ActiveFlow::new(FlowKind::LoanApplication);

        let outcome = engine.apply(&flow, "500").expect("rejection is not an error");
        assert!(matches!(
            outcome,
            StepOutcome::Rejected { step: Step::Amount, guidance } if guidance.contains("minimum $1,000")
        ));
    }

    #[test]
    fn valid_input_advances_with_normalized_value() {
        let engine = FlowEngine::default();
        let flow = ActiveFlow::new(FlowKind::LoanApplication);

        let outcome = engine.apply(&flow, "$5,000").expect("amount should be accepted");
        assert_eq!(
            outcome,
            StepOutcome::Advanced { slot: "amount", value: "5000".to_string(), next: Step::Id }
        );
    }

    #[test]
    fn last_step_builds_terminal_action_from_slots() {
        let engine = FlowEngine::default();

        let loan = flow_at(FlowKind::LoanApplication, Step::Id, &[("amount", "5000")]);
        let outcome = engine.apply(&loan, "ABC123").expect("loan should complete");
        assert_eq!(
            outcome,
            StepOutcome::Completed {
                slot: "id",
                value: "ABC123".to_string(),
                action: FlowAction::SubmitLoan(LoanApplication {
                    amount: "5000".to_string(),
                    id: "ABC123".to_string(),
                }),
            }
        );

        let card = flow_at(FlowKind::CardBlock, Step::Name, &[("cardNumber", "1234567890123456")]);
        let outcome = engine.apply(&card, " Jane Doe ").expect("card block should complete");
        assert!(matches!(
            outcome,
            StepOutcome::Completed { action: FlowAction::BlockCard(CardBlockRequest { ref name, .. }), .. }
                if name == "Jane Doe"
        ));
    }

    #[test]
    fn account_query_selects_operation_from_query_type() {
        let engine = FlowEngine::default();
        let flow =
            flow_at(FlowKind::AccountQuery, Step::QueryType, &[("accountNumber", "12345678")]);

        let balance = engine.apply(&flow, "my BALANCE").expect("balance should complete");
        assert!(matches!(
            balance,
            StepOutcome::Completed { action: FlowAction::GetBalance { ref account_number }, .. }
                if account_number == "12345678"
        ));

        let statement = engine.apply(&flow, "statement").expect("statement should complete");
        assert!(matches!(
            statement,
            StepOutcome::Completed { action: FlowAction::GetMiniStatement { .. }, .. }
        ));

        let neither = engine.apply(&flow, "transfer").expect("rejection is not an error");
        assert!(matches!(neither, StepOutcome::Rejected { step: Step::QueryType, .. }));
    }

    #[test]
    fn missing_slots_fail_the_terminal_action() {
        let engine = FlowEngine::default();
        let flow = flow_at(FlowKind::LoanApplication, Step::Id, &[]);

        let error = engine.apply(&flow, "ABC123").expect_err("amount was never collected");
        assert_eq!(
            error,
            FlowTransitionError::MissingRequiredFields {
                flow: FlowKind::LoanApplication,
                missing_fields: vec!["amount".to_string()],
            }
        );
    }

    #[test]
    fn step_outside_the_flow_is_rejected() {
        let engine = FlowEngine::default();
        let flow = flow_at(FlowKind::LoanStatus, Step::Amount, &[]);

        let error = engine.apply(&flow, "5000").expect_err("amount is not a loan status step");
        assert!(matches!(error, FlowTransitionError::UnknownStep { flow: FlowKind::LoanStatus, .. }));
    }

    #[test]
    fn audit_records_step_names_but_not_values() {
        let engine = FlowEngine::default();
        let sink = InMemoryAuditSink::default();
        let audit = AuditContext::new("session-1", "turn-1", "flow-engine");
        let flow = ActiveFlow::new(FlowKind::CardBlock);

        engine
            .apply_with_audit(&flow, "1234 5678 9012 3456", &sink, &audit)
            .expect("card number should be accepted");
        engine.apply_with_audit(&flow, "12-34", &sink, &audit).expect("rejection is not an error");

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, "flow.step_accepted");
        assert_eq!(events[0].metadata.get("slot").map(String::as_str), Some("cardNumber"));
        assert_eq!(events[1].event_type, "flow.step_rejected");
        assert!(events
            .iter()
            .flat_map(|event| event.metadata.values())
            .all(|value| !value.contains("1234567890123456")));
    }
}
