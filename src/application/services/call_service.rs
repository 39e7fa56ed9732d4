//! Call Service
//!
//! Signaling for one-to-one and group calls.
//!
//! One-to-one calls are a pure relay: the hub forwards offers, answers, ICE
//! candidates and accept/reject/hangup notices to the named peer and keeps no
//! state. Group calls are tracked: one [`GroupCallSession`] per chat holds the
//! members and the media kind chosen at creation. Peers of a group call build
//! a full mesh among themselves over `call:signal`.
//!
//! Sessions live behind a mutex that is never held across an `.await`. Every
//! handler re-reads the session map after its last store round trip.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

use super::gateway::Gateway;
use crate::application::dto::{
    CallAccepted, CallEnded, CallHangupPayload, CallIncoming, CallParticipant, CallReplyPayload,
    CallSignal, CallSignalPayload, CallStartPayload, CallerProfile, ChatNotice, GroupCallState,
    ServerEvent,
};
use crate::domain::{Chat, ChatId, ChatRepository, ChatType, UserId, UserRepository};
use crate::infrastructure::metrics;
use crate::shared::error::AppError;

/// An active multi-party call bound to a chat
#[derive(Debug, Clone, PartialEq)]
pub struct GroupCallSession {
    pub chat_id: ChatId,
    /// Join order, no duplicates
    participants: Vec<UserId>,
    pub is_video: bool,
    pub initiator_id: UserId,
    pub started_at: DateTime<Utc>,
}

impl GroupCallSession {
    fn new(chat_id: ChatId, initiator_id: UserId, is_video: bool) -> Self {
        Self {
            chat_id,
            participants: vec![initiator_id],
            is_video,
            initiator_id,
            started_at: Utc::now(),
        }
    }

    pub fn participants(&self) -> &[UserId] {
        &self.participants
    }

    pub fn contains(&self, user_id: UserId) -> bool {
        self.participants.contains(&user_id)
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    fn add(&mut self, user_id: UserId) -> bool {
        if self.contains(user_id) {
            return false;
        }
        self.participants.push(user_id);
        true
    }

    fn remove(&mut self, user_id: UserId) -> bool {
        let before = self.participants.len();
        self.participants.retain(|id| *id != user_id);
        self.participants.len() != before
    }

    fn others(&self, user_id: UserId) -> Vec<UserId> {
        self.participants
            .iter()
            .copied()
            .filter(|id| *id != user_id)
            .collect()
    }

    fn state(&self, participants: Vec<UserId>) -> GroupCallState {
        GroupCallState {
            chat_id: self.chat_id,
            participants,
            initiator_id: Some(self.initiator_id),
            is_video: self.is_video,
        }
    }
}

/// Live-call indicator for chat lists
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveGroupCall {
    pub chat_id: ChatId,
    pub participants: Vec<UserId>,
    pub is_video: bool,
}

/// What is left of a session after someone departed
#[derive(Debug)]
struct Departure {
    chat_id: ChatId,
    remaining: Vec<UserId>,
}

pub struct CallService {
    gateway: Arc<Gateway>,
    chats: Arc<dyn ChatRepository>,
    users: Arc<dyn UserRepository>,
    sessions: Mutex<HashMap<ChatId, GroupCallSession>>,
}

impl CallService {
    pub fn new(
        gateway: Arc<Gateway>,
        chats: Arc<dyn ChatRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            gateway,
            chats,
            users,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// `call:start`: ring a peer in a private chat, or open/join a group call.
    pub async fn start(&self, caller: UserId, payload: CallStartPayload) -> Result<(), AppError> {
        let Some(chat) = self.participant_chat(caller, payload.chat_id).await? else {
            return Ok(());
        };

        match (chat.chat_type, payload.target_user_id) {
            (ChatType::Group, None) => {
                self.start_group(caller, &chat, payload.is_video);
                Ok(())
            }
            (ChatType::Private, Some(target)) => {
                self.ring(caller, &chat, target, payload.is_video).await
            }
            (chat_type, target) => {
                tracing::debug!(
                    user_id = %caller,
                    chat_id = %chat.id,
                    chat_type = %chat_type,
                    has_target = target.is_some(),
                    "call:start shape does not match chat type, ignored"
                );
                Ok(())
            }
        }
    }

    async fn ring(
        &self,
        caller: UserId,
        chat: &Chat,
        target: UserId,
        is_video: bool,
    ) -> Result<(), AppError> {
        if !chat.is_participant(target) {
            tracing::debug!(
                user_id = %caller,
                target_user_id = %target,
                chat_id = %chat.id,
                "Call target is not a participant, ignored"
            );
            return Ok(());
        }

        if !self.gateway.is_online(target) {
            self.unavailable(caller, chat.id);
            return Ok(());
        }

        let caller_profile = self.users.find_by_id(caller).await?;

        let incoming = ServerEvent::CallIncoming(CallIncoming {
            from_user_id: caller,
            chat_id: chat.id,
            is_video,
            caller: caller_profile.as_ref().map(CallerProfile::from),
        });
        // The target may have dropped while the profile was loading.
        if !self.gateway.send_to_user(target, incoming) {
            self.unavailable(caller, chat.id);
            return Ok(());
        }

        tracing::info!(
            user_id = %caller,
            target_user_id = %target,
            chat_id = %chat.id,
            is_video,
            "Ringing"
        );
        Ok(())
    }

    fn unavailable(&self, caller: UserId, chat_id: ChatId) {
        tracing::debug!(user_id = %caller, chat_id = %chat_id, "Call target unavailable");
        self.gateway
            .send_to_user(caller, ServerEvent::CallUnavailable(ChatNotice { chat_id }));
    }

    /// `call:accept`, relayed to the caller
    pub fn accept(&self, callee: UserId, payload: CallReplyPayload) {
        self.gateway.send_to_user(
            payload.from_user_id,
            ServerEvent::CallAccepted(CallAccepted {
                chat_id: payload.chat_id,
                accepted_by_user_id: callee,
            }),
        );
    }

    /// `call:reject`, relayed to the caller
    pub fn reject(&self, _callee: UserId, payload: CallReplyPayload) {
        self.gateway.send_to_user(
            payload.from_user_id,
            ServerEvent::CallRejected(ChatNotice {
                chat_id: payload.chat_id,
            }),
        );
    }

    /// `call:hangup`, relayed to the peer
    pub fn hangup(&self, user_id: UserId, payload: CallHangupPayload) {
        self.gateway.send_to_user(
            payload.target_user_id,
            ServerEvent::CallEnded(CallEnded {
                by_user_id: Some(user_id),
            }),
        );
    }

    /// `call:signal`, relayed untouched
    pub fn signal(&self, user_id: UserId, payload: CallSignalPayload) {
        self.gateway.send_to_user(
            payload.target_user_id,
            ServerEvent::CallSignal(CallSignal {
                from_user_id: user_id,
                signal: payload.signal,
            }),
        );
    }

    fn start_group(&self, caller: UserId, chat: &Chat, is_video: bool) {
        let created = {
            let mut sessions = self.sessions.lock();
            if sessions.contains_key(&chat.id) {
                None
            } else {
                let session = GroupCallSession::new(chat.id, caller, is_video);
                sessions.insert(chat.id, session.clone());
                metrics::set_group_calls(sessions.len());
                Some(session)
            }
        };

        let Some(session) = created else {
            // Someone else opened the call first; behave like call:join.
            self.join_session(caller, chat.id);
            return;
        };

        tracing::info!(
            user_id = %caller,
            chat_id = %chat.id,
            is_video,
            "Group call started"
        );

        self.gateway
            .send_to_user(caller, ServerEvent::CallJoined(session.state(Vec::new())));

        let started = ServerEvent::CallStarted(session.state(vec![caller]));
        let others = chat.participants.iter().filter(|id| **id != caller);
        self.gateway.deliver(&started, others);
    }

    /// `call:join`: enter an existing group call.
    pub async fn join(&self, user_id: UserId, chat_id: ChatId) -> Result<(), AppError> {
        let Some(chat) = self.participant_chat(user_id, chat_id).await? else {
            return Ok(());
        };
        if !chat.is_group() {
            tracing::debug!(user_id = %user_id, chat_id = %chat_id, "call:join on a private chat, ignored");
            return Ok(());
        }
        self.join_session(user_id, chat_id);
        Ok(())
    }

    fn join_session(&self, user_id: UserId, chat_id: ChatId) {
        let joined = {
            let mut sessions = self.sessions.lock();
            match sessions.get_mut(&chat_id) {
                None => {
                    tracing::debug!(user_id = %user_id, chat_id = %chat_id, "No active call to join");
                    return;
                }
                Some(session) => {
                    if !session.add(user_id) {
                        tracing::debug!(user_id = %user_id, chat_id = %chat_id, "Already in call");
                        return;
                    }
                    session.clone()
                }
            }
        };

        let others = joined.others(user_id);
        tracing::info!(
            user_id = %user_id,
            chat_id = %chat_id,
            participants = joined.len(),
            "Joined group call"
        );

        self.gateway
            .send_to_user(user_id, ServerEvent::CallJoined(joined.state(others.clone())));
        self.gateway.deliver(
            &ServerEvent::ParticipantJoined(CallParticipant { chat_id, user_id }),
            &others,
        );
    }

    /// `call:leave`: leave one chat's group call. No-op when not a member.
    pub fn leave(&self, user_id: UserId, chat_id: ChatId) {
        let departure = {
            let mut sessions = self.sessions.lock();
            Self::depart(&mut sessions, user_id, chat_id)
        };
        if let Some(departure) = departure {
            self.announce_departure(user_id, departure);
        }
    }

    /// Leave every group call, used on disconnect. Returns the affected chats.
    pub fn leave_all(&self, user_id: UserId) -> Vec<ChatId> {
        let departures: Vec<Departure> = {
            let mut sessions = self.sessions.lock();
            let chat_ids: Vec<ChatId> = sessions
                .values()
                .filter(|session| session.contains(user_id))
                .map(|session| session.chat_id)
                .collect();
            chat_ids
                .into_iter()
                .filter_map(|chat_id| Self::depart(&mut sessions, user_id, chat_id))
                .collect()
        };

        let chat_ids = departures.iter().map(|d| d.chat_id).collect();
        for departure in departures {
            self.announce_departure(user_id, departure);
        }
        chat_ids
    }

    /// Remove `user_id` from the chat's session and tear the session down when
    /// fewer than two members remain.
    fn depart(
        sessions: &mut HashMap<ChatId, GroupCallSession>,
        user_id: UserId,
        chat_id: ChatId,
    ) -> Option<Departure> {
        let session = sessions.get_mut(&chat_id)?;
        if !session.remove(user_id) {
            return None;
        }

        let remaining = session.participants().to_vec();
        if remaining.len() <= 1 {
            sessions.remove(&chat_id);
            metrics::set_group_calls(sessions.len());
        }
        Some(Departure { chat_id, remaining })
    }

    fn announce_departure(&self, user_id: UserId, departure: Departure) {
        let Departure { chat_id, remaining } = departure;

        self.gateway.deliver(
            &ServerEvent::ParticipantLeft(CallParticipant { chat_id, user_id }),
            &remaining,
        );

        match remaining.as_slice() {
            [] => tracing::info!(chat_id = %chat_id, "Group call ended, no participants left"),
            [last] => {
                tracing::info!(
                    chat_id = %chat_id,
                    user_id = %last,
                    "Group call ended, one participant left"
                );
                self.gateway
                    .send_to_user(*last, ServerEvent::CallEnded(CallEnded::default()));
            }
            _ => tracing::info!(
                chat_id = %chat_id,
                user_id = %user_id,
                participants = remaining.len(),
                "Left group call"
            ),
        }
    }

    /// Replay `call:started` for every active call in the user's group chats.
    pub async fn sync_active_calls(&self, user_id: UserId) -> Result<usize, AppError> {
        let chats = self.chats.find_groups_for_user(user_id).await?;

        let active: Vec<GroupCallState> = {
            let sessions = self.sessions.lock();
            chats
                .iter()
                .filter_map(|chat| sessions.get(&chat.id))
                .filter(|session| !session.is_empty())
                .map(|session| session.state(session.participants().to_vec()))
                .collect()
        };

        let count = active.len();
        for state in active {
            self.gateway.send_to_user(user_id, ServerEvent::CallStarted(state));
        }
        Ok(count)
    }

    /// Active calls among `chat_ids`, in the order given.
    pub fn active_group_calls(&self, chat_ids: &[ChatId]) -> Vec<ActiveGroupCall> {
        let sessions = self.sessions.lock();
        chat_ids
            .iter()
            .filter_map(|chat_id| sessions.get(chat_id))
            .filter(|session| !session.is_empty())
            .map(|session| ActiveGroupCall {
                chat_id: session.chat_id,
                participants: session.participants().to_vec(),
                is_video: session.is_video,
            })
            .collect()
    }

    pub fn session(&self, chat_id: ChatId) -> Option<GroupCallSession> {
        self.sessions.lock().get(&chat_id).cloned()
    }

    pub fn active_call_count(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Load the chat and check membership. `None` means: silently ignore.
    async fn participant_chat(
        &self,
        user_id: UserId,
        chat_id: ChatId,
    ) -> Result<Option<Chat>, AppError> {
        let Some(chat) = self.chats.find_by_id(chat_id).await? else {
            tracing::debug!(user_id = %user_id, chat_id = %chat_id, "Chat not found, ignored");
            return Ok(None);
        };
        if !chat.is_participant(user_id) {
            tracing::debug!(user_id = %user_id, chat_id = %chat_id, "Not a participant, ignored");
            return Ok(None);
        }
        Ok(Some(chat))
    }
}
