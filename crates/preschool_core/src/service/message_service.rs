//! Messaging use-cases between staff and guardians.
//!
//! # Invariants
//! - A sender is never among its own message's recipients.
//! - Replies carry the thread root id of the message they answer.
//! - Only recipients can mark a message read.

use crate::model::message::Message;
use crate::model::{OrganizationId, RecordId};
use crate::repo::document_store::{DocumentQuery, DocumentStore, Filter, OrderDirection};
use crate::repo::record_store::RecordStore;
use crate::service::error::{read_back, require_record, ServiceError, ServiceResult};
use log::info;

const REPLY_PREFIX: &str = "Re: ";

/// Input for a new top-level message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendMessageRequest {
    pub sender_id: RecordId,
    pub recipient_ids: Vec<RecordId>,
    pub subject: String,
    pub body: String,
}

pub struct MessageService<S: DocumentStore> {
    store: S,
    organization_id: OrganizationId,
}

impl<S: DocumentStore> MessageService<S> {
    pub fn new(store: S, organization_id: OrganizationId) -> Self {
        Self {
            store,
            organization_id,
        }
    }

    /// Sends a new message. Duplicate recipients are collapsed.
    pub fn send_message(&self, request: &SendMessageRequest) -> ServiceResult<Message> {
        let message = Message::new(
            request.sender_id,
            unique_participants(request.recipient_ids.iter().copied()),
            request.subject.trim(),
            request.body.as_str(),
        );
        self.store_message(&message)
    }

    /// Replies to everyone on a message except the replier.
    ///
    /// # Errors
    /// - `InvalidState` when the replier is not a participant of the message.
    pub fn reply(
        &self,
        message_id: RecordId,
        sender_id: RecordId,
        body: impl Into<String>,
    ) -> ServiceResult<Message> {
        let original: Message = require_record(&self.store, self.organization_id, message_id)?;
        if !original.involves(sender_id) {
            return Err(ServiceError::InvalidState(format!(
                "participant {sender_id} is not part of message {message_id}"
            )));
        }

        let recipients = unique_participants(
            std::iter::once(original.sender_id)
                .chain(original.recipient_ids.iter().copied())
                .filter(|participant| *participant != sender_id),
        );
        let subject = if original.subject.starts_with(REPLY_PREFIX) {
            original.subject.clone()
        } else {
            format!("{REPLY_PREFIX}{}", original.subject)
        };

        let mut reply = Message::new(sender_id, recipients, subject, body);
        reply.thread_id = Some(original.thread_root());
        self.store_message(&reply)
    }

    pub fn get_message(&self, id: RecordId) -> ServiceResult<Option<Message>> {
        Ok(self.store.get_record(self.organization_id, id)?)
    }

    /// Messages addressed to `participant_id`, newest first.
    pub fn inbox(&self, participant_id: RecordId) -> ServiceResult<Vec<Message>> {
        let query = DocumentQuery::new()
            .filter(Filter::contains("recipient_ids", participant_id.to_string()))
            .order_by("sent_at", OrderDirection::Desc);
        Ok(self.store.list_records(self.organization_id, &query)?)
    }

    /// Messages sent by `participant_id`, newest first.
    pub fn sent(&self, participant_id: RecordId) -> ServiceResult<Vec<Message>> {
        let query = DocumentQuery::new()
            .filter(Filter::eq("sender_id", participant_id.to_string()))
            .order_by("sent_at", OrderDirection::Desc);
        Ok(self.store.list_records(self.organization_id, &query)?)
    }

    /// Root message followed by its replies in send order.
    ///
    /// Accepts the id of any message in the thread.
    pub fn thread(&self, message_id: RecordId) -> ServiceResult<Vec<Message>> {
        let message: Message = require_record(&self.store, self.organization_id, message_id)?;
        let root_id = message.thread_root();
        let root: Message = if root_id == message.id {
            message
        } else {
            require_record(&self.store, self.organization_id, root_id)?
        };

        let query = DocumentQuery::new()
            .filter(Filter::eq("thread_id", root_id.to_string()))
            .order_by("sent_at", OrderDirection::Asc);
        let replies: Vec<Message> = self.store.list_records(self.organization_id, &query)?;

        let mut thread = Vec::with_capacity(replies.len() + 1);
        thread.push(root);
        thread.extend(replies);
        Ok(thread)
    }

    /// Marks a message read for one recipient. Marking twice is a no-op.
    pub fn mark_read(&self, message_id: RecordId, reader_id: RecordId) -> ServiceResult<Message> {
        let mut message: Message = require_record(&self.store, self.organization_id, message_id)?;
        if !message.recipient_ids.contains(&reader_id) {
            return Err(ServiceError::InvalidState(format!(
                "participant {reader_id} is not a recipient of message {message_id}"
            )));
        }
        if message.is_read_by(reader_id) {
            return Ok(message);
        }
        message.read_by.push(reader_id);
        self.store.update_record(self.organization_id, &message)?;
        read_back(
            &self.store,
            self.organization_id,
            message_id,
            "read message not found in read-back",
        )
    }

    pub fn unread_count(&self, participant_id: RecordId) -> ServiceResult<u32> {
        let unread = self
            .inbox(participant_id)?
            .iter()
            .filter(|message| !message.is_read_by(participant_id))
            .count();
        Ok(u32::try_from(unread).unwrap_or(u32::MAX))
    }

    pub fn delete_message(&self, id: RecordId) -> ServiceResult<()> {
        self.store.delete_record::<Message>(self.organization_id, id)?;
        info!(
            "event=message_delete module=service status=ok organization_id={} message_id={id}",
            self.organization_id
        );
        Ok(())
    }

    fn store_message(&self, message: &Message) -> ServiceResult<Message> {
        let id = self.store.create_record(self.organization_id, message)?;
        info!(
            "event=message_send module=service status=ok organization_id={} message_id={id} recipients={} threaded={}",
            self.organization_id,
            message.recipient_ids.len(),
            message.thread_id.is_some()
        );
        read_back(
            &self.store,
            self.organization_id,
            id,
            "sent message not found in read-back",
        )
    }
}

fn unique_participants(ids: impl Iterator<Item = RecordId>) -> Vec<RecordId> {
    let mut unique: Vec<RecordId> = Vec::new();
    for id in ids {
        if !unique.contains(&id) {
            unique.push(id);
        }
    }
    unique
}
