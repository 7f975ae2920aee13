use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use securebank_core::audit::{
    AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink, NoopAuditSink,
};
use securebank_core::config::SessionConfig;
use securebank_core::{
    is_reset_command, replies, ApplicationError, ConversationState, FlowAction, FlowEngine,
    IntentRouter, Message, StepOutcome, Transcript,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::backend::{self, BankBackend};

/// Read-only view of whether a session is waiting on a backend call.
#[derive(Clone, Debug, Default)]
pub struct BusyFlag(Arc<AtomicBool>);

impl BusyFlag {
    pub fn is_busy(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn mark(&self) -> BusyGuard {
        self.0.store(true, Ordering::Release);
        BusyGuard(self.clone())
    }
}

struct BusyGuard(BusyFlag);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        (self.0).0.store(false, Ordering::Release);
    }
}

/// Drives a single conversation: owns its state and transcript, routes each
/// user turn to the intent router or the active flow, and runs terminal
/// actions against the backend.
///
/// Turns are handled strictly one at a time; `handle_turn` takes `&mut self`
/// and finishes every state mutation before returning.
pub struct ConversationController<B: ?Sized> {
    session_id: String,
    state: ConversationState,
    transcript: Transcript,
    busy: BusyFlag,
    turns: u64,
    router: IntentRouter,
    engine: FlowEngine,
    audit: Arc<dyn AuditSink>,
    backend: Arc<B>,
}

impl<B> ConversationController<B>
where
    B: BankBackend + ?Sized,
{
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            state: ConversationState::idle(),
            transcript: Transcript::new(),
            busy: BusyFlag::default(),
            turns: 0,
            router: IntentRouter::new(),
            engine: FlowEngine::default(),
            audit: Arc::new(NoopAuditSink),
            backend,
        }
    }

    pub fn from_config(backend: Arc<B>, session: &SessionConfig) -> Self {
        let controller = Self::new(backend);
        if session.greeting {
            controller.with_greeting()
        } else {
            controller
        }
    }

    /// Seeds the transcript with the welcome message.
    pub fn with_greeting(mut self) -> Self {
        self.transcript.push(Message::agent(replies::WELCOME));
        self
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }

    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = sink;
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn is_busy(&self) -> bool {
        self.busy.is_busy()
    }

    pub fn busy_flag(&self) -> BusyFlag {
        self.busy.clone()
    }

    /// Entry point for the presentation layer. Blank input is ignored.
    pub async fn submit(&mut self, text: &str) -> Vec<Message> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        self.handle_turn(text).await
    }

    /// Handles one user turn and returns the agent messages it produced, in
    /// order. The user message is appended to the transcript first.
    pub async fn handle_turn(&mut self, raw: &str) -> Vec<Message> {
        self.turns += 1;
        let turn = self.turns;
        let audit = AuditContext::new(
            self.session_id.clone(),
            format!("{}-turn-{turn}", self.session_id),
            "conversation-controller",
        );
        debug!(
            event_name = "conversation.turn_received",
            session_id = %self.session_id,
            turn,
            flow = ?self.state.flow_kind(),
            step = ?self.state.step(),
            "user turn received"
        );

        self.transcript.push(Message::user(raw));
        let mut outbound = Vec::new();

        if is_reset_command(raw) {
            self.state.reset();
            self.audit.emit(AuditEvent::new(
                &audit,
                "conversation.reset",
                AuditCategory::Ingress,
                AuditOutcome::Success,
            ));
            info!(
                event_name = "conversation.reset",
                session_id = %self.session_id,
                "conversation reset by user command"
            );
            self.reply(&mut outbound, Message::agent(replies::HELP_MENU));
            return outbound;
        }

        if let Err(error) = self.dispatch(raw, &mut outbound, &audit).await {
            warn!(
                event_name = "conversation.turn_failed",
                session_id = %self.session_id,
                flow = ?self.state.flow_kind(),
                error_class = error.error_class(),
                error = %error,
                "turn failed, resetting conversation"
            );
            let category = match error {
                ApplicationError::Domain(_) => AuditCategory::Flow,
                ApplicationError::Backend(_) => AuditCategory::Backend,
            };
            let mut event = AuditEvent::new(&audit, "flow.failed", category, AuditOutcome::Failed)
            .with_metadata("error_class", error.error_class());
            if let Some(kind) = self.state.flow_kind() {
                event = event.with_flow(kind);
            }
            self.audit.emit(event);

            self.reply(&mut outbound, Message::agent_error(replies::error_message(&error.user_message())));
            self.state.reset();
        }

        outbound
    }

    async fn dispatch(
        &mut self,
        raw: &str,
        outbound: &mut Vec<Message>,
        audit: &AuditContext,
    ) -> Result<(), ApplicationError> {
        let Some(active) = self.state.active() else {
            self.route(raw, outbound, audit);
            return Ok(());
        };

        let outcome = self.engine.apply_with_audit(active, raw, self.audit.as_ref(), audit)?;
        match outcome {
            StepOutcome::Rejected { guidance, .. } => {
                self.reply(outbound, Message::agent(guidance));
            }
            StepOutcome::Advanced { slot, value, next } => {
                self.state.record(slot, value, next);
                let prompt = self
                    .state
                    .active()
                    .map(|flow| replies::step_prompt(next, &flow.slots))
                    .unwrap_or_default();
                self.reply(outbound, Message::agent(prompt));
            }
            StepOutcome::Completed { slot, value, action } => {
                if let Some(step) = self.state.step() {
                    self.state.record(slot, value, step);
                }
                self.complete(&action, outbound, audit).await?;
            }
        }

        Ok(())
    }

    fn route(&mut self, raw: &str, outbound: &mut Vec<Message>, audit: &AuditContext) {
        match self.router.classify(raw) {
            Some(kind) => {
                self.state.start(kind);
                self.audit.emit(
                    AuditEvent::new(
                        audit,
                        "conversation.flow_started",
                        AuditCategory::Routing,
                        AuditOutcome::Success,
                    )
                    .with_flow(kind)
                    .with_metadata("step", kind.initial_step().slot_name()),
                );
                info!(
                    event_name = "conversation.flow_started",
                    session_id = %self.session_id,
                    flow = %kind,
                    "intent matched"
                );
                self.reply(outbound, Message::agent(replies::flow_entry_prompt(kind)));
            }
            None => {
                self.audit.emit(AuditEvent::new(
                    audit,
                    "conversation.intent_unmatched",
                    AuditCategory::Routing,
                    AuditOutcome::Rejected,
                ));
                self.reply(outbound, Message::agent(replies::UNMATCHED_INTENT));
            }
        }
    }

    async fn complete(
        &mut self,
        action: &FlowAction,
        outbound: &mut Vec<Message>,
        audit: &AuditContext,
    ) -> Result<(), ApplicationError> {
        self.reply(outbound, Message::agent(replies::processing_notice(action)));

        info!(
            event_name = "backend.request_started",
            session_id = %self.session_id,
            operation = action.operation(),
            "invoking backend operation"
        );
        let result = {
            let _busy = self.busy.mark();
            backend::execute(self.backend.as_ref(), action).await
        };
        let response = result?;

        let mut event = AuditEvent::new(
            audit,
            "flow.completed",
            AuditCategory::Backend,
            AuditOutcome::Success,
        )
        .with_metadata("operation", action.operation());
        if let Some(kind) = self.state.flow_kind() {
            event = event.with_flow(kind);
        }
        self.audit.emit(event);

        self.reply(outbound, Message::agent(response));
        self.reply(outbound, Message::agent(replies::follow_up(action)));
        self.state.reset();
        Ok(())
    }

    fn reply(&mut self, outbound: &mut Vec<Message>, message: Message) {
        self.transcript.push(message.clone());
        outbound.push(message);
    }
}
