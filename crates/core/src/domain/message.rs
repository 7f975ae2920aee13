use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub Uuid);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Agent,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub sender: Sender,
    pub text: String,
    pub is_error: bool,
    pub created_at: DateTime<Utc>,
}

impl Message {
    fn new(sender: Sender, text: impl Into<String>, is_error: bool) -> Self {
        Self {
            id: MessageId(Uuid::new_v4()),
            sender,
            text: text.into(),
            is_error,
            created_at: Utc::now(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Sender::User, text, false)
    }

    pub fn agent(text: impl Into<String>) -> Self {
        Self::new(Sender::Agent, text, false)
    }

    pub fn agent_error(text: impl Into<String>) -> Self {
        Self::new(Sender::Agent, text, true)
    }
}

/// Append-only, insertion-ordered message log for one session.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{Message, Sender, Transcript};

    #[test]
    fn transcript_preserves_insertion_order() {
        let mut transcript = Transcript::new();
        transcript.push(Message::user("block my card"));
        transcript.push(Message::agent("Please provide your 16-digit card number:"));
        transcript.push(Message::agent_error("boom"));

        let senders = transcript.messages().iter().map(|message| message.sender).collect::<Vec<_>>();
        assert_eq!(senders, vec![Sender::User, Sender::Agent, Sender::Agent]);
        assert_eq!(transcript.len(), 3);
        assert!(transcript.last().map(|message| message.is_error).unwrap_or(false));
    }

    #[test]
    fn message_ids_are_unique() {
        let first = Message::user("reset");
        let second = Message::user("reset");
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn message_serializes_with_snake_case_sender() {
        let message = Message::agent("hello");
        let json = serde_json::to_value(&message).expect("message should serialize");

        assert_eq!(json["sender"], "agent");
        assert_eq!(json["is_error"], false);
        assert_eq!(json["text"], "hello");
    }
}
