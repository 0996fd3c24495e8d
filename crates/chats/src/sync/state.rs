//! Reconciliation state of the chat session.
//!
//! `ChatState` is a plain value mutated by exactly one owner (the session
//! task). Every asynchronous source (page fetches, mutation completions, push
//! events) funnels into one of its methods, which keep the message buffer of
//! the selected conversation free of duplicates whatever order those sources
//! arrive in.

use std::collections::HashSet;

use tracing::debug;

use super::snapshot::{
    ChatSnapshot, MutationKind, MutationStatuses, QueryStatuses, RequestStatus, SyncPhase,
};
use crate::entities::{is_temporary_id, Conversation, Member, Message, Viewer};
use crate::types::{
    ChatError, ChatResult, ConversationId, DeleteMessageRequest, ListMessagesRequest, MessageId,
    MessagePage, PushEvent, SendMessageRequest, UpdateMessageRequest, UserId,
};

/// Fetch epoch of the selection; bumped on every selection change and full refetch
pub type Generation = u64;

/// A page fetch tagged with the generation it was launched in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub generation: Generation,
    pub request: ListMessagesRequest,
}

/// An optimistic send waiting for its mutation to complete
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendTicket {
    pub conversation_id: ConversationId,
    pub temp_id: MessageId,
    pub request: SendMessageRequest,
}

impl SendTicket {
    pub fn client_id(&self) -> Option<&str> {
        self.request.client_id.as_deref()
    }
}

/// Effect of a push event on the state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PushOutcome {
    /// The message buffer changed
    pub changed: bool,
    /// The conversation list should be refetched
    pub refresh_conversations: bool,
}

#[derive(Debug, Clone)]
pub struct ChatState {
    viewer: Option<Viewer>,
    page_size: u32,
    conversations: Vec<Conversation>,
    selected: Option<ConversationId>,
    conversation: Option<Conversation>,
    phase: SyncPhase,
    messages: Vec<Message>,
    cursor: Option<String>,
    loading_more: bool,
    generation: Generation,
    /// Server messages learned outside the page fetch in flight
    arrived: HashSet<MessageId>,
    /// Messages the server reported deleted while that fetch was in flight
    removed: HashSet<MessageId>,
    sends_in_flight: usize,
    queries: QueryStatuses,
    mutations: MutationStatuses,
}

impl ChatState {
    pub fn new(viewer: Option<Viewer>, page_size: u32) -> Self {
        Self {
            viewer,
            page_size: page_size.max(1),
            conversations: Vec::new(),
            selected: None,
            conversation: None,
            phase: SyncPhase::Unselected,
            messages: Vec::new(),
            cursor: None,
            loading_more: false,
            generation: 0,
            arrived: HashSet::new(),
            removed: HashSet::new(),
            sends_in_flight: 0,
            queries: QueryStatuses::default(),
            mutations: MutationStatuses::default(),
        }
    }

    pub fn viewer(&self) -> Option<&Viewer> {
        self.viewer.as_ref()
    }

    fn viewer_id(&self) -> Option<String> {
        self.viewer.as_ref().map(|viewer| viewer.user_id.clone())
    }

    pub fn selected_conversation_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    fn is_selected(&self, conversation_id: &str) -> bool {
        self.selected.as_deref() == Some(conversation_id)
    }

    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn is_loading_more(&self) -> bool {
        self.loading_more
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn mutations(&self) -> &MutationStatuses {
        &self.mutations
    }

    pub fn queries(&self) -> &QueryStatuses {
        &self.queries
    }

    pub fn record_mutation(&mut self, kind: MutationKind, status: RequestStatus) {
        self.mutations.set(kind, status);
    }

    /// Clear a reported failure of `kind`; other statuses are left alone
    pub fn acknowledge_mutation(&mut self, kind: MutationKind) {
        if self.mutations.get(kind).error().is_none() {
            return;
        }
        let status = if kind == MutationKind::Send && self.sends_in_flight > 0 {
            RequestStatus::Pending
        } else {
            RequestStatus::Idle
        };
        self.mutations.set(kind, status);
    }

    fn position(&self, message_id: &str) -> Option<usize> {
        self.messages.iter().position(|message| message.id == message_id)
    }

    // -- selection -------------------------------------------------------

    /// Make `conversation_id` the active conversation and clear the buffer.
    ///
    /// Returns the first page fetch to run, or `None` when it is already selected.
    pub fn select_conversation(&mut self, conversation_id: &str) -> Option<PageRequest> {
        if self.is_selected(conversation_id) {
            return None;
        }

        self.selected = Some(conversation_id.to_string());
        self.conversation = self
            .conversations
            .iter()
            .find(|conversation| conversation.id == conversation_id)
            .cloned();
        self.messages.clear();
        self.cursor = None;
        self.loading_more = false;
        self.phase = SyncPhase::Loading;
        self.generation += 1;
        self.forget_interim();
        self.queries.conversation = RequestStatus::Pending;
        self.queries.messages = RequestStatus::Pending;
        self.queries.older_messages = RequestStatus::Idle;

        Some(self.first_page_request(conversation_id))
    }

    /// Drop the selection entirely
    pub fn deselect(&mut self) -> bool {
        if self.selected.is_none() {
            return false;
        }

        self.selected = None;
        self.conversation = None;
        self.messages.clear();
        self.cursor = None;
        self.loading_more = false;
        self.phase = SyncPhase::Unselected;
        self.generation += 1;
        self.forget_interim();
        self.queries.conversation = RequestStatus::Idle;
        self.queries.messages = RequestStatus::Idle;
        self.queries.older_messages = RequestStatus::Idle;
        true
    }

    /// Start a full refetch of the newest page; older pages already held are dropped when it lands
    pub fn begin_reload(&mut self) -> Option<PageRequest> {
        let conversation_id = self.selected.clone()?;
        self.generation += 1;
        self.forget_interim();
        self.loading_more = false;
        self.queries.messages = RequestStatus::Pending;
        Some(self.first_page_request(&conversation_id))
    }

    fn forget_interim(&mut self) {
        self.arrived.clear();
        self.removed.clear();
    }

    fn first_page_request(&self, conversation_id: &str) -> PageRequest {
        PageRequest {
            generation: self.generation,
            request: ListMessagesRequest {
                conversation_id: conversation_id.to_string(),
                cursor: None,
                limit: self.page_size,
            },
        }
    }

    // -- queries ---------------------------------------------------------

    pub fn begin_conversations_refresh(&mut self) {
        self.queries.conversations = RequestStatus::Pending;
    }

    pub fn apply_conversations(&mut self, result: ChatResult<Vec<Conversation>>) {
        match result {
            Ok(conversations) => {
                self.conversations = conversations;
                self.queries.conversations = RequestStatus::Success;
            }
            Err(error) => {
                self.queries.conversations = RequestStatus::Error(error.to_string());
            }
        }
    }

    /// Store the details of the selected conversation; stale answers are dropped
    pub fn apply_conversation(
        &mut self,
        conversation_id: &str,
        result: ChatResult<Conversation>,
    ) -> bool {
        if !self.is_selected(conversation_id) {
            debug!(conversation_id, "discarding details of a conversation no longer selected");
            return false;
        }

        match result {
            Ok(conversation) => {
                self.conversation = Some(conversation);
                self.queries.conversation = RequestStatus::Success;
            }
            Err(error) => {
                self.queries.conversation = RequestStatus::Error(error.to_string());
            }
        }
        true
    }

    /// Replace the buffer with the newest page.
    ///
    /// The page may predate events seen while it was in flight: messages that
    /// arrived since are kept after it, messages deleted since are dropped from
    /// it, and placeholders of sends still in flight come last.
    pub fn apply_first_page(&mut self, generation: Generation, result: ChatResult<MessagePage>) -> bool {
        if generation != self.generation {
            debug!(generation, current = self.generation, "discarding stale message page");
            return false;
        }

        match result {
            Ok(page) => {
                let viewer_id = self.viewer_id();
                let removed = &self.removed;
                let mut messages: Vec<Message> = page
                    .messages
                    .into_iter()
                    .filter(|message| !removed.contains(&message.id))
                    .map(|message| message.with_viewer(viewer_id.as_deref()))
                    .collect();

                let (pending, confirmed): (Vec<Message>, Vec<Message>) =
                    self.messages.drain(..).partition(Message::is_temporary);

                let arrived: Vec<Message> = confirmed
                    .into_iter()
                    .filter(|held| self.arrived.contains(&held.id))
                    .filter(|held| !messages.iter().any(|listed| listed.id == held.id))
                    .collect();
                if !arrived.is_empty() {
                    debug!(count = arrived.len(), "keeping messages newer than the page");
                }
                messages.extend(arrived);

                let pending: Vec<Message> = pending
                    .into_iter()
                    .filter(|held| {
                        !messages.iter().any(|confirmed| {
                            confirmed.client_id.is_some() && confirmed.client_id == held.client_id
                        })
                    })
                    .collect();
                messages.extend(pending);

                self.messages = messages;
                self.forget_interim();
                self.cursor = page.next_cursor;
                self.phase = SyncPhase::Ready;
                self.queries.messages = RequestStatus::Success;
            }
            Err(error) => {
                self.queries.messages = RequestStatus::Error(error.to_string());
            }
        }
        true
    }

    /// Start fetching the next older page, if there is one and none is in flight
    pub fn begin_load_more(&mut self) -> Option<PageRequest> {
        if self.loading_more || self.phase != SyncPhase::Ready {
            return None;
        }
        let cursor = self.cursor.clone()?;
        let conversation_id = self.selected.clone()?;

        self.loading_more = true;
        self.queries.older_messages = RequestStatus::Pending;

        Some(PageRequest {
            generation: self.generation,
            request: ListMessagesRequest {
                conversation_id,
                cursor: Some(cursor),
                limit: self.page_size,
            },
        })
    }

    /// Prepend an older page before everything currently held
    pub fn apply_older_page(&mut self, generation: Generation, result: ChatResult<MessagePage>) -> bool {
        if generation != self.generation {
            debug!(generation, current = self.generation, "discarding stale older page");
            return false;
        }

        self.loading_more = false;
        match result {
            Ok(page) => {
                let viewer_id = self.viewer_id();
                let held = &self.messages;
                let older: Vec<Message> = page
                    .messages
                    .into_iter()
                    .filter(|message| !held.iter().any(|existing| existing.id == message.id))
                    .map(|message| message.with_viewer(viewer_id.as_deref()))
                    .collect();

                self.messages.splice(0..0, older);
                self.cursor = page.next_cursor;
                self.queries.older_messages = RequestStatus::Success;
            }
            Err(error) => {
                self.queries.older_messages = RequestStatus::Error(error.to_string());
            }
        }
        true
    }

    // -- sending ---------------------------------------------------------

    /// Append a placeholder for an outgoing message and describe the mutation to run
    pub fn begin_send(&mut self, content: String, mentions: Vec<UserId>) -> ChatResult<SendTicket> {
        let conversation_id = self
            .selected
            .clone()
            .ok_or(ChatError::NoConversationSelected)?;
        let viewer = self.viewer.clone().ok_or(ChatError::Unauthenticated)?;

        let client_id = Message::new_client_id();
        let request = SendMessageRequest {
            conversation_id: conversation_id.clone(),
            content,
            mentioned_user_ids: mentions,
            client_id: Some(client_id.clone()),
        };
        request.validate()?;

        let placeholder = Message::placeholder(
            conversation_id.clone(),
            request.content.clone(),
            request.mentioned_user_ids.clone(),
            self.sender_snapshot(&viewer),
            &client_id,
        )
        .with_viewer(Some(&viewer.user_id));
        let temp_id = placeholder.id.clone();

        self.messages.push(placeholder);
        self.sends_in_flight += 1;
        if self.mutations.send.error().is_none() {
            self.mutations.send = RequestStatus::Pending;
        }

        Ok(SendTicket {
            conversation_id,
            temp_id,
            request,
        })
    }

    /// Best known profile of the viewer: loaded members first, then a stub
    fn sender_snapshot(&self, viewer: &Viewer) -> Member {
        let selected = self.selected.as_deref();
        self.conversation
            .iter()
            .chain(self.conversations.iter())
            .filter(|conversation| Some(conversation.id.as_str()) == selected)
            .find_map(|conversation| conversation.member(&viewer.user_id))
            .cloned()
            .unwrap_or_else(|| viewer.stub_member())
    }

    /// Swap the ticket's placeholder for the server-confirmed message.
    ///
    /// A failure of another send stays reported until acknowledged.
    pub fn confirm_send(&mut self, ticket: &SendTicket, message: Message) -> bool {
        self.sends_in_flight = self.sends_in_flight.saturating_sub(1);
        if self.mutations.send.error().is_none() {
            self.mutations.send = if self.sends_in_flight == 0 {
                RequestStatus::Success
            } else {
                RequestStatus::Pending
            };
        }

        if !self.is_selected(&ticket.conversation_id) {
            debug!(
                conversation_id = %ticket.conversation_id,
                "send confirmed after the conversation was left"
            );
            return false;
        }

        let confirmed = message.with_viewer(self.viewer_id().as_deref());
        self.arrived.insert(confirmed.id.clone());
        let own = self.position(&ticket.temp_id);
        let existing = self.position(&confirmed.id);

        match (existing, own) {
            (Some(existing), Some(own)) => {
                self.messages[existing] = confirmed;
                self.messages.remove(own);
            }
            (Some(existing), None) => {
                if self.messages[existing] == confirmed {
                    return false;
                }
                self.messages[existing] = confirmed;
            }
            (None, Some(own)) => self.messages[own] = confirmed,
            (None, None) => self.messages.push(confirmed),
        }
        true
    }

    /// Roll back the ticket's placeholder; other in-flight sends are untouched
    pub fn fail_send(&mut self, ticket: &SendTicket, error: &ChatError) -> bool {
        self.sends_in_flight = self.sends_in_flight.saturating_sub(1);
        self.mutations.send = RequestStatus::Error(error.to_string());

        let before = self.messages.len();
        self.messages.retain(|message| message.id != ticket.temp_id);
        before != self.messages.len()
    }

    // -- editing ---------------------------------------------------------

    /// Rewrite a message locally and describe the update mutation to run
    pub fn begin_update(
        &mut self,
        message_id: &str,
        content: String,
        mentions: Vec<UserId>,
    ) -> ChatResult<(ConversationId, UpdateMessageRequest)> {
        let conversation_id = self
            .selected
            .clone()
            .ok_or(ChatError::NoConversationSelected)?;
        if is_temporary_id(message_id) {
            return Err(ChatError::validation("Message is still being sent"));
        }

        let request = UpdateMessageRequest {
            message_id: message_id.to_string(),
            content,
            mentioned_user_ids: mentions,
        };
        request.validate()?;

        let viewer_id = self.viewer_id();
        let message = self
            .messages
            .iter_mut()
            .find(|message| message.id == message_id)
            .ok_or_else(|| ChatError::message_not_found(message_id))?;
        message.content = request.content.clone();
        message.mentions = request.mentioned_user_ids.clone();
        message.refresh_mentions_me(viewer_id.as_deref());

        self.mutations.update = RequestStatus::Pending;
        Ok((conversation_id, request))
    }

    /// Remove a message locally and describe the delete mutation to run
    pub fn begin_delete(
        &mut self,
        message_id: &str,
    ) -> ChatResult<(ConversationId, DeleteMessageRequest)> {
        let conversation_id = self
            .selected
            .clone()
            .ok_or(ChatError::NoConversationSelected)?;
        if is_temporary_id(message_id) {
            return Err(ChatError::validation("Message is still being sent"));
        }
        if !self.remove_message(message_id) {
            return Err(ChatError::message_not_found(message_id));
        }

        self.mutations.delete = RequestStatus::Pending;
        Ok((
            conversation_id,
            DeleteMessageRequest {
                message_id: message_id.to_string(),
            },
        ))
    }

    fn remove_message(&mut self, message_id: &str) -> bool {
        let before = self.messages.len();
        self.messages.retain(|message| message.id != message_id);
        before != self.messages.len()
    }

    // -- push events -----------------------------------------------------

    /// Fold a push event into the state
    pub fn apply_push(&mut self, event: PushEvent) -> PushOutcome {
        let active = self.is_selected(event.conversation_id());

        match event {
            PushEvent::NewMessage(payload) => PushOutcome {
                changed: active && self.reconcile_incoming(payload.into_message()),
                refresh_conversations: true,
            },
            PushEvent::MessageUpdated(payload) => PushOutcome {
                changed: active
                    && self.apply_remote_edit(&payload.id, payload.content, payload.mentioned_user_ids),
                refresh_conversations: false,
            },
            PushEvent::MessageDeleted(payload) => {
                if active {
                    self.removed.insert(payload.message_id.clone());
                }
                PushOutcome {
                    changed: active && self.remove_message(&payload.message_id),
                    refresh_conversations: false,
                }
            }
            PushEvent::ConversationViewed(_) | PushEvent::MentionsViewed(_) => PushOutcome {
                changed: false,
                refresh_conversations: true,
            },
        }
    }

    /// Upgrade an equivalent entry in place, or append.
    ///
    /// Equivalent means: same server id; else the placeholder carrying the
    /// echoed correlation id; else, when nothing was echoed, a placeholder with
    /// the same sender and content.
    fn reconcile_incoming(&mut self, incoming: Message) -> bool {
        let incoming = incoming.with_viewer(self.viewer_id().as_deref());
        self.arrived.insert(incoming.id.clone());

        let slot = self.position(&incoming.id).or_else(|| match incoming.client_id.as_deref() {
            Some(client_id) => self.messages.iter().position(|held| {
                held.is_temporary() && held.client_id.as_deref() == Some(client_id)
            }),
            None => self
                .messages
                .iter()
                .position(|held| held.is_placeholder_for(&incoming.sender.user_id, &incoming.content)),
        });

        match slot {
            Some(index) if self.messages[index] == incoming => false,
            Some(index) => {
                self.messages[index] = incoming;
                true
            }
            None => {
                self.messages.push(incoming);
                true
            }
        }
    }

    /// Apply an edit from the server, skipping the write when nothing differs
    fn apply_remote_edit(
        &mut self,
        message_id: &str,
        content: String,
        mentions: Option<Vec<UserId>>,
    ) -> bool {
        let viewer_id = self.viewer_id();
        let Some(message) = self.messages.iter_mut().find(|message| message.id == message_id) else {
            return false;
        };

        let mentions_changed = mentions
            .as_ref()
            .map_or(false, |mentions| *mentions != message.mentions);
        if message.content == content && !mentions_changed {
            return false;
        }

        message.content = content;
        if let Some(mentions) = mentions {
            message.mentions = mentions;
        }
        message.refresh_mentions_me(viewer_id.as_deref());
        true
    }

    // -- view ------------------------------------------------------------

    pub fn snapshot(&self) -> ChatSnapshot {
        ChatSnapshot {
            viewer: self.viewer.clone(),
            conversations: self.conversations.clone(),
            selected_conversation_id: self.selected.clone(),
            conversation: self.conversation.clone(),
            phase: self.phase,
            messages: self.messages.clone(),
            has_more: self.cursor.is_some(),
            loading_more: self.loading_more,
            queries: self.queries.clone(),
            mutations: self.mutations.clone(),
        }
    }
}
