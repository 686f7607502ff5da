//! Messages between staff and guardians.

use crate::model::validation::{require_text, ValidationError};
use crate::model::{new_record_id, now_epoch_ms, Record, RecordId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: RecordId,
    /// Staff or guardian ID.
    pub sender_id: RecordId,
    pub recipient_ids: Vec<RecordId>,
    pub subject: String,
    pub body: String,
    /// Unix epoch milliseconds.
    pub sent_at: i64,
    /// Recipients that opened the message.
    #[serde(default)]
    pub read_by: Vec<RecordId>,
    /// ID of the first message in the conversation; `None` on that message.
    pub thread_id: Option<RecordId>,
}

impl Message {
    pub fn new(
        sender_id: RecordId,
        recipient_ids: Vec<RecordId>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id: new_record_id(),
            sender_id,
            recipient_ids,
            subject: subject.into(),
            body: body.into(),
            sent_at: now_epoch_ms(),
            read_by: Vec::new(),
            thread_id: None,
        }
    }

    /// Conversation root: `thread_id`, or this message when it starts one.
    pub fn thread_root(&self) -> RecordId {
        self.thread_id.unwrap_or(self.id)
    }

    pub fn is_read_by(&self, reader_id: RecordId) -> bool {
        self.read_by.contains(&reader_id)
    }

    pub fn involves(&self, participant_id: RecordId) -> bool {
        self.sender_id == participant_id || self.recipient_ids.contains(&participant_id)
    }
}

impl Record for Message {
    const COLLECTION: &'static str = "messages";

    fn id(&self) -> RecordId {
        self.id
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_text("subject", &self.subject)?;
        require_text("body", &self.body)?;
        if self.recipient_ids.is_empty() {
            return Err(ValidationError::MissingField("recipient_ids"));
        }
        if self.recipient_ids.contains(&self.sender_id) {
            return Err(ValidationError::invalid(
                "recipient_ids",
                "sender cannot be a recipient",
            ));
        }
        Ok(())
    }
}
