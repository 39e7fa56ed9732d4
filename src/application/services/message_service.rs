//! Message Service
//!
//! Message ingest over the live connection: authorize, persist, then fan the
//! populated message out to every participant of the chat. Read receipts go
//! through the same authorize-persist-fanout path.

use std::sync::Arc;

use validator::Validate;

use super::gateway::Gateway;
use crate::application::dto::{
    MarkReadPayload, MessageReadReceipt, MessageView, ReplyPreview, ReplySender,
    SendMessagePayload, ServerEvent,
};
use crate::domain::{Chat, ChatId, MessageId, NewMessage, Repositories, UserId};
use crate::shared::error::AppError;
use crate::shared::validation::validation_error;

/// Message service errors
///
/// Everything except `Store` is an expected, silent drop for the client.
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    #[error("Message not found")]
    NotFound,

    #[error("Chat not found")]
    ChatNotFound,

    #[error("Sender not found")]
    SenderNotFound,

    #[error("Not a participant")]
    Forbidden,

    #[error("Invalid message: {0}")]
    Invalid(String),

    #[error(transparent)]
    Store(#[from] AppError),
}

pub struct MessageService {
    gateway: Arc<Gateway>,
    repos: Repositories,
}

impl MessageService {
    pub fn new(gateway: Arc<Gateway>, repos: Repositories) -> Self {
        Self { gateway, repos }
    }

    /// `message:send`: persist and deliver to every participant, sender included.
    pub async fn send(
        &self,
        sender_id: UserId,
        payload: SendMessagePayload,
    ) -> Result<MessageView, MessageError> {
        let payload = payload.normalized();
        payload
            .validate()
            .map_err(|e| MessageError::Invalid(validation_error(e).to_string()))?;

        let chat = self.participant_chat(sender_id, payload.chat_id).await?;

        let sender = self
            .repos
            .users
            .find_by_id(sender_id)
            .await?
            .ok_or(MessageError::SenderNotFound)?;

        let reply_preview = match payload.reply_to {
            Some(reply_id) => self.reply_preview(chat.id, reply_id).await?,
            None => None,
        };

        let message = self
            .repos
            .messages
            .create(NewMessage {
                chat_id: chat.id,
                sender_id,
                content: payload.content,
                message_type: payload.message_type,
                file_url: payload.file_url.unwrap_or_default(),
                reply_to: reply_preview.as_ref().map(|reply| reply.id),
            })
            .await?;

        self.repos
            .chats
            .set_last_message(chat.id, message.id)
            .await?;

        let view = MessageView::new(message, &sender, reply_preview);
        let delivered = self
            .gateway
            .deliver(&ServerEvent::MessageNew(view.clone()), &chat.participants);

        tracing::info!(
            message_id = %view.id,
            chat_id = %chat.id,
            user_id = %sender_id,
            delivered,
            "Message sent"
        );

        Ok(view)
    }

    /// `message:read`: record the receipt. Returns `false` when it was already
    /// recorded, in which case nothing is broadcast.
    pub async fn mark_read(
        &self,
        reader_id: UserId,
        payload: MarkReadPayload,
    ) -> Result<bool, MessageError> {
        let message = self
            .repos
            .messages
            .find_by_id(payload.message_id)
            .await?
            .ok_or(MessageError::NotFound)?;

        let chat = self.participant_chat(reader_id, message.chat_id).await?;

        let newly_read = self.repos.messages.mark_read(message.id, reader_id).await?;
        if !newly_read {
            tracing::debug!(message_id = %message.id, user_id = %reader_id, "Already read");
            return Ok(false);
        }

        let receipt = ServerEvent::MessageRead(MessageReadReceipt {
            message_id: message.id,
            user_id: reader_id,
        });
        self.gateway.deliver(&receipt, &chat.participants);

        Ok(true)
    }

    /// The quoted message, if it exists and belongs to the same chat.
    async fn reply_preview(
        &self,
        chat_id: ChatId,
        reply_id: MessageId,
    ) -> Result<Option<ReplyPreview>, MessageError> {
        let Some(quoted) = self.repos.messages.find_by_id(reply_id).await? else {
            tracing::debug!(chat_id = %chat_id, reply_to = %reply_id, "Reply target not found, dropped");
            return Ok(None);
        };
        if quoted.chat_id != chat_id {
            tracing::debug!(chat_id = %chat_id, reply_to = %reply_id, "Reply target in another chat, dropped");
            return Ok(None);
        }

        let author = self.repos.users.find_by_id(quoted.sender_id).await?;

        Ok(Some(ReplyPreview {
            id: quoted.id,
            content: quoted.content,
            message_type: quoted.message_type,
            sender_id: author.map(|user| ReplySender {
                id: user.id,
                username: user.username,
            }),
        }))
    }

    async fn participant_chat(&self, user_id: UserId, chat_id: ChatId) -> Result<Chat, MessageError> {
        let chat = self
            .repos
            .chats
            .find_by_id(chat_id)
            .await?
            .ok_or(MessageError::ChatNotFound)?;

        if !chat.is_participant(user_id) {
            return Err(MessageError::Forbidden);
        }
        Ok(chat)
    }
}
