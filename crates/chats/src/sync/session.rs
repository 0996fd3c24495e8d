//! The session task driving a [`ChatState`].
//!
//! Commands from any number of [`ChatHandle`]s, completions of the queries and
//! mutations it spawned, and push events are applied one at a time. After each
//! step a new [`ChatSnapshot`] is published if anything visible changed.

use std::future::Future;
use std::ops::ControlFlow;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::snapshot::{ChatSnapshot, MutationKind, RequestStatus};
use super::state::{ChatState, Generation, PageRequest, SendTicket};
use crate::api::ChatApi;
use crate::entities::{Conversation, Message, Viewer};
use crate::push::{conversation_channel, user_channel, PushTransport, Subscription};
use crate::types::{
    ChatError, ChatResult, ConversationId, CreateConversationRequest, MessageId, MessagePage,
    PushEvent, UserId,
};
use crate::utils::Validator;

/// Settings of one session
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub viewer: Option<Viewer>,
    pub page_size: u32,
}

impl SessionOptions {
    pub fn new(viewer: Option<Viewer>, page_size: u32) -> Self {
        Self { viewer, page_size }
    }
}

/// Requests accepted by the session task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    SelectConversation(ConversationId),
    Deselect,
    SendMessage {
        content: String,
        mentions: Vec<UserId>,
    },
    UpdateMessage {
        message_id: MessageId,
        content: String,
        mentions: Vec<UserId>,
    },
    DeleteMessage {
        message_id: MessageId,
    },
    LoadMoreMessages,
    MarkConversationRead,
    MarkMentionsRead,
    CreateConversation(CreateConversationRequest),
    RefreshConversations,
    /// Clear a failed status so the next error of that kind is visible again
    AcknowledgeMutation(MutationKind),
    Shutdown,
}

/// Outcome of a spawned query or mutation
#[derive(Debug)]
enum Completion {
    Conversations {
        sequence: u64,
        result: ChatResult<Vec<Conversation>>,
    },
    Conversation {
        conversation_id: ConversationId,
        result: ChatResult<Conversation>,
    },
    FirstPage {
        generation: Generation,
        result: ChatResult<MessagePage>,
    },
    OlderPage {
        generation: Generation,
        result: ChatResult<MessagePage>,
    },
    Sent {
        ticket: SendTicket,
        result: ChatResult<Message>,
    },
    Edited {
        kind: MutationKind,
        conversation_id: ConversationId,
        result: ChatResult<()>,
    },
    MarkedRead {
        kind: MutationKind,
        result: ChatResult<()>,
    },
    Created(ChatResult<Conversation>),
    Subscribed {
        target: PushTarget,
        result: ChatResult<Subscription>,
    },
}

/// Which slot a finished subscribe belongs to
#[derive(Debug)]
enum PushTarget {
    Conversation {
        conversation_id: ConversationId,
        binding: u64,
    },
    Viewer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PushSource {
    Conversation,
    Viewer,
}

enum Wake {
    Command(ChatCommand),
    Completion(Completion),
    Push(PushSource, Option<PushEvent>),
    Closed,
}

/// Cloneable front of a running session
#[derive(Debug, Clone)]
pub struct ChatHandle {
    commands: mpsc::UnboundedSender<ChatCommand>,
    snapshots: watch::Receiver<ChatSnapshot>,
}

impl ChatHandle {
    fn dispatch(&self, command: ChatCommand) -> ChatResult<()> {
        self.commands
            .send(command)
            .map_err(|_| ChatError::SessionClosed)
    }

    pub fn select_conversation(&self, conversation_id: impl Into<ConversationId>) -> ChatResult<()> {
        self.dispatch(ChatCommand::SelectConversation(conversation_id.into()))
    }

    pub fn deselect(&self) -> ChatResult<()> {
        self.dispatch(ChatCommand::Deselect)
    }

    pub fn send_message(&self, content: impl Into<String>, mentions: Vec<UserId>) -> ChatResult<()> {
        self.dispatch(ChatCommand::SendMessage {
            content: content.into(),
            mentions,
        })
    }

    pub fn update_message(
        &self,
        message_id: impl Into<MessageId>,
        content: impl Into<String>,
        mentions: Vec<UserId>,
    ) -> ChatResult<()> {
        self.dispatch(ChatCommand::UpdateMessage {
            message_id: message_id.into(),
            content: content.into(),
            mentions,
        })
    }

    pub fn delete_message(&self, message_id: impl Into<MessageId>) -> ChatResult<()> {
        self.dispatch(ChatCommand::DeleteMessage {
            message_id: message_id.into(),
        })
    }

    pub fn load_more_messages(&self) -> ChatResult<()> {
        self.dispatch(ChatCommand::LoadMoreMessages)
    }

    pub fn mark_conversation_read(&self) -> ChatResult<()> {
        self.dispatch(ChatCommand::MarkConversationRead)
    }

    pub fn mark_mentions_read(&self) -> ChatResult<()> {
        self.dispatch(ChatCommand::MarkMentionsRead)
    }

    pub fn create_conversation(&self, request: CreateConversationRequest) -> ChatResult<()> {
        self.dispatch(ChatCommand::CreateConversation(request))
    }

    pub fn refresh_conversations(&self) -> ChatResult<()> {
        self.dispatch(ChatCommand::RefreshConversations)
    }

    pub fn acknowledge_mutation(&self, kind: MutationKind) -> ChatResult<()> {
        self.dispatch(ChatCommand::AcknowledgeMutation(kind))
    }

    /// Ask the session task to stop; pending completions are dropped
    pub fn shutdown(&self) -> ChatResult<()> {
        self.dispatch(ChatCommand::Shutdown)
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> ChatSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver notified on every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<ChatSnapshot> {
        self.snapshots.clone()
    }

    /// Wait for the first snapshot satisfying `predicate`
    pub async fn wait_until<F>(&self, predicate: F) -> ChatResult<ChatSnapshot>
    where
        F: FnMut(&ChatSnapshot) -> bool,
    {
        let mut snapshots = self.snapshots.clone();
        let snapshot = snapshots
            .wait_for(predicate)
            .await
            .map_err(|_| ChatError::SessionClosed)?;
        Ok(snapshot.clone())
    }
}

pub struct ChatSession {
    api: Arc<dyn ChatApi>,
    push: Arc<dyn PushTransport>,
    state: ChatState,
    commands: mpsc::UnboundedReceiver<ChatCommand>,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions: mpsc::UnboundedReceiver<Completion>,
    conversation_sub: Option<Subscription>,
    viewer_sub: Option<Subscription>,
    conversation_binding: u64,
    conversations_sequence: u64,
    snapshots: watch::Sender<ChatSnapshot>,
}

impl ChatSession {
    pub fn new(
        api: Arc<dyn ChatApi>,
        push: Arc<dyn PushTransport>,
        options: SessionOptions,
    ) -> (Self, ChatHandle) {
        let state = ChatState::new(options.viewer, options.page_size);
        let (commands_tx, commands) = mpsc::unbounded_channel();
        let (completions_tx, completions) = mpsc::unbounded_channel();
        let (snapshots, snapshots_rx) = watch::channel(state.snapshot());

        let session = Self {
            api,
            push,
            state,
            commands,
            completions_tx,
            completions,
            conversation_sub: None,
            viewer_sub: None,
            conversation_binding: 0,
            conversations_sequence: 0,
            snapshots,
        };
        let handle = ChatHandle {
            commands: commands_tx,
            snapshots: snapshots_rx,
        };
        (session, handle)
    }

    /// Create a session and run it on the current tokio runtime
    pub fn spawn(
        api: Arc<dyn ChatApi>,
        push: Arc<dyn PushTransport>,
        options: SessionOptions,
    ) -> (ChatHandle, JoinHandle<()>) {
        let (session, handle) = Self::new(api, push, options);
        (handle, tokio::spawn(session.run()))
    }

    pub async fn run(mut self) {
        info!(
            viewer = self.state.viewer().map(|viewer| viewer.user_id.as_str()),
            "chat session started"
        );

        self.subscribe_viewer();
        self.refresh_conversations();
        self.publish();

        loop {
            let wake = tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => Wake::Command(command),
                    None => Wake::Closed,
                },
                Some(completion) = self.completions.recv() => Wake::Completion(completion),
                event = next_event(&mut self.conversation_sub) => Wake::Push(PushSource::Conversation, event),
                event = next_event(&mut self.viewer_sub) => Wake::Push(PushSource::Viewer, event),
            };

            match wake {
                Wake::Closed => break,
                Wake::Command(command) => {
                    if self.handle_command(command).is_break() {
                        break;
                    }
                }
                Wake::Completion(completion) => self.handle_completion(completion),
                Wake::Push(source, Some(event)) => self.handle_push(source, event),
                Wake::Push(source, None) => {
                    warn!(?source, "push subscription ended");
                    match source {
                        PushSource::Conversation => self.conversation_sub = None,
                        PushSource::Viewer => self.viewer_sub = None,
                    }
                }
            }

            self.publish();
        }

        self.conversation_sub = None;
        self.viewer_sub = None;
        info!("chat session stopped");
    }

    fn publish(&self) {
        let state = &self.state;
        self.snapshots.send_if_modified(|current| {
            let next = state.snapshot();
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }

    fn spawn_task<F>(&self, task: F)
    where
        F: Future<Output = Completion> + Send + 'static,
    {
        let completions = self.completions_tx.clone();
        tokio::spawn(async move {
            // The session may already be gone; its completions no longer matter.
            let _ = completions.send(task.await);
        });
    }

    fn subscribe(&self, channel: String, target: PushTarget) {
        let push = Arc::clone(&self.push);
        self.spawn_task(async move {
            Completion::Subscribed {
                target,
                result: push.subscribe(&channel).await,
            }
        });
    }

    fn subscribe_viewer(&self) {
        if let Some(viewer) = self.state.viewer() {
            self.subscribe(user_channel(&viewer.user_id), PushTarget::Viewer);
        }
    }

    fn bind_conversation(&mut self, conversation_id: &str) {
        // Release before acquiring so only one conversation channel is ever held.
        self.release_conversation();
        self.subscribe(
            conversation_channel(conversation_id),
            PushTarget::Conversation {
                conversation_id: conversation_id.to_string(),
                binding: self.conversation_binding,
            },
        );
    }

    fn release_conversation(&mut self) {
        self.conversation_sub = None;
        self.conversation_binding += 1;
    }

    fn apply_subscription(&mut self, target: PushTarget, result: ChatResult<Subscription>) {
        match (target, result) {
            (PushTarget::Viewer, Ok(subscription)) => {
                debug!(channel = subscription.channel(), "subscribed to viewer channel");
                self.viewer_sub = Some(subscription);
            }
            (PushTarget::Viewer, Err(error)) => {
                warn!(%error, "failed to subscribe to viewer channel");
            }
            (
                PushTarget::Conversation {
                    conversation_id,
                    binding,
                },
                result,
            ) => {
                let current = binding == self.conversation_binding
                    && self.state.selected_conversation_id() == Some(conversation_id.as_str());
                match result {
                    Ok(subscription) if current => {
                        debug!(channel = subscription.channel(), "subscribed to conversation channel");
                        self.conversation_sub = Some(subscription);
                    }
                    Ok(subscription) => {
                        debug!(channel = subscription.channel(), "dropping superseded subscription");
                    }
                    Err(error) => {
                        warn!(%conversation_id, %error, "failed to subscribe to conversation channel");
                    }
                }
            }
        }
    }

    // -- commands --------------------------------------------------------

    fn handle_command(&mut self, command: ChatCommand) -> ControlFlow<()> {
        match command {
            ChatCommand::SelectConversation(conversation_id) => self.select(&conversation_id),
            ChatCommand::Deselect => {
                if self.state.deselect() {
                    self.release_conversation();
                }
            }
            ChatCommand::SendMessage { content, mentions } => self.send(content, mentions),
            ChatCommand::UpdateMessage {
                message_id,
                content,
                mentions,
            } => self.update(&message_id, content, mentions),
            ChatCommand::DeleteMessage { message_id } => self.delete(&message_id),
            ChatCommand::LoadMoreMessages => {
                if let Some(page) = self.state.begin_load_more() {
                    self.fetch_older_page(page);
                }
            }
            ChatCommand::MarkConversationRead => self.mark_read(MutationKind::MarkRead),
            ChatCommand::MarkMentionsRead => self.mark_read(MutationKind::MarkMentionsRead),
            ChatCommand::CreateConversation(request) => self.create_conversation(request),
            ChatCommand::RefreshConversations => self.refresh_conversations(),
            ChatCommand::AcknowledgeMutation(kind) => self.state.acknowledge_mutation(kind),
            ChatCommand::Shutdown => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    fn select(&mut self, conversation_id: &str) {
        if let Err(error) = Validator::id(conversation_id) {
            debug!(%error, "ignoring selection");
            return;
        }
        let Some(page) = self.state.select_conversation(conversation_id) else {
            debug!(conversation_id, "conversation already selected");
            return;
        };

        self.bind_conversation(conversation_id);
        self.fetch_conversation(conversation_id);
        self.fetch_first_page(page);
    }

    fn send(&mut self, content: String, mentions: Vec<UserId>) {
        let ticket = match self.state.begin_send(content, mentions) {
            Ok(ticket) => ticket,
            Err(error @ ChatError::Validation { .. }) => {
                self.state
                    .record_mutation(MutationKind::Send, RequestStatus::Error(error.to_string()));
                return;
            }
            Err(error) => {
                debug!(%error, "send ignored");
                return;
            }
        };

        debug!(
            conversation_id = %ticket.conversation_id,
            temp_id = %ticket.temp_id,
            "sending message"
        );
        let api = Arc::clone(&self.api);
        self.spawn_task(async move {
            let result = api.send_message(&ticket.request).await;
            Completion::Sent { ticket, result }
        });
    }

    fn update(&mut self, message_id: &str, content: String, mentions: Vec<UserId>) {
        match self.state.begin_update(message_id, content, mentions) {
            Ok((conversation_id, request)) => {
                let api = Arc::clone(&self.api);
                self.spawn_task(async move {
                    let result = api.update_message(&request).await.map(|_| ());
                    Completion::Edited {
                        kind: MutationKind::Update,
                        conversation_id,
                        result,
                    }
                });
            }
            Err(error) => {
                self.state
                    .record_mutation(MutationKind::Update, RequestStatus::Error(error.to_string()));
            }
        }
    }

    fn delete(&mut self, message_id: &str) {
        match self.state.begin_delete(message_id) {
            Ok((conversation_id, request)) => {
                let api = Arc::clone(&self.api);
                self.spawn_task(async move {
                    let result = api.delete_message(&request.message_id).await;
                    Completion::Edited {
                        kind: MutationKind::Delete,
                        conversation_id,
                        result,
                    }
                });
            }
            Err(error) => {
                self.state
                    .record_mutation(MutationKind::Delete, RequestStatus::Error(error.to_string()));
            }
        }
    }

    fn mark_read(&mut self, kind: MutationKind) {
        let Some(conversation_id) = self.state.selected_conversation_id().map(str::to_string) else {
            debug!(mutation = kind.name(), "nothing selected to mark as read");
            return;
        };

        self.state.record_mutation(kind, RequestStatus::Pending);
        let api = Arc::clone(&self.api);
        self.spawn_task(async move {
            let result = match kind {
                MutationKind::MarkMentionsRead => api.mark_mentions_read(&conversation_id).await,
                _ => api.mark_conversation_read(&conversation_id).await,
            };
            Completion::MarkedRead { kind, result }
        });
    }

    fn create_conversation(&mut self, request: CreateConversationRequest) {
        if let Err(error) = request.validate() {
            self.state.record_mutation(
                MutationKind::CreateConversation,
                RequestStatus::Error(error.to_string()),
            );
            return;
        }

        self.state
            .record_mutation(MutationKind::CreateConversation, RequestStatus::Pending);
        let api = Arc::clone(&self.api);
        self.spawn_task(async move { Completion::Created(api.create_conversation(&request).await) });
    }

    // -- queries ---------------------------------------------------------

    fn refresh_conversations(&mut self) {
        self.conversations_sequence += 1;
        self.state.begin_conversations_refresh();

        let sequence = self.conversations_sequence;
        let api = Arc::clone(&self.api);
        self.spawn_task(async move {
            Completion::Conversations {
                sequence,
                result: api.list_conversations().await,
            }
        });
    }

    fn fetch_conversation(&self, conversation_id: &str) {
        let conversation_id = conversation_id.to_string();
        let api = Arc::clone(&self.api);
        self.spawn_task(async move {
            let result = api.get_conversation(&conversation_id).await;
            Completion::Conversation {
                conversation_id,
                result,
            }
        });
    }

    fn fetch_first_page(&self, page: PageRequest) {
        let api = Arc::clone(&self.api);
        self.spawn_task(async move {
            Completion::FirstPage {
                generation: page.generation,
                result: api.list_messages(&page.request).await,
            }
        });
    }

    fn fetch_older_page(&self, page: PageRequest) {
        let api = Arc::clone(&self.api);
        self.spawn_task(async move {
            Completion::OlderPage {
                generation: page.generation,
                result: api.list_messages(&page.request).await,
            }
        });
    }

    // -- completions -----------------------------------------------------

    fn handle_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Conversations { sequence, result } => {
                if sequence != self.conversations_sequence {
                    debug!(sequence, "discarding superseded conversation list");
                    return;
                }
                if let Err(error) = &result {
                    warn!(%error, "failed to load conversations");
                }
                self.state.apply_conversations(result);
            }
            Completion::Conversation {
                conversation_id,
                result,
            } => {
                self.state.apply_conversation(&conversation_id, result);
            }
            Completion::FirstPage { generation, result } => {
                if let Err(error) = &result {
                    warn!(%error, generation, "failed to load messages");
                }
                self.state.apply_first_page(generation, result);
            }
            Completion::OlderPage { generation, result } => {
                self.state.apply_older_page(generation, result);
            }
            Completion::Sent { ticket, result } => match result {
                Ok(message) => {
                    debug!(message_id = %message.id, temp_id = %ticket.temp_id, "send confirmed");
                    self.state.confirm_send(&ticket, message);
                    self.refresh_conversations();
                }
                Err(error) => {
                    warn!(%error, temp_id = %ticket.temp_id, "send failed, removing placeholder");
                    self.state.fail_send(&ticket, &error);
                }
            },
            Completion::Edited {
                kind,
                conversation_id,
                result,
            } => match result {
                Ok(()) => self.state.record_mutation(kind, RequestStatus::Success),
                Err(error) => {
                    warn!(%error, mutation = kind.name(), "mutation failed, refetching messages");
                    self.state
                        .record_mutation(kind, RequestStatus::Error(error.to_string()));
                    if self.state.selected_conversation_id() == Some(conversation_id.as_str()) {
                        if let Some(page) = self.state.begin_reload() {
                            self.fetch_first_page(page);
                        }
                    }
                }
            },
            Completion::MarkedRead { kind, result } => match result {
                Ok(()) => {
                    self.state.record_mutation(kind, RequestStatus::Success);
                    self.refresh_conversations();
                }
                Err(error) => {
                    self.state
                        .record_mutation(kind, RequestStatus::Error(error.to_string()));
                }
            },
            Completion::Created(result) => match result {
                Ok(conversation) => {
                    info!(conversation_id = %conversation.id, "conversation created");
                    self.state
                        .record_mutation(MutationKind::CreateConversation, RequestStatus::Success);
                    self.refresh_conversations();
                    self.select(&conversation.id);
                }
                Err(error) => {
                    self.state.record_mutation(
                        MutationKind::CreateConversation,
                        RequestStatus::Error(error.to_string()),
                    );
                }
            },
            Completion::Subscribed { target, result } => self.apply_subscription(target, result),
        }
    }

    // -- push ------------------------------------------------------------

    fn handle_push(&mut self, source: PushSource, event: PushEvent) {
        let active = self.state.selected_conversation_id() == Some(event.conversation_id());
        let duplicated = active && self.conversation_sub.is_some() && !event.is_read_state();
        if source == PushSource::Viewer && duplicated {
            // Delivered on the conversation channel as well.
            return;
        }

        debug!(
            event = event.event_name(),
            conversation_id = event.conversation_id(),
            ?source,
            "push event"
        );
        let outcome = self.state.apply_push(event);
        if outcome.refresh_conversations {
            self.refresh_conversations();
        }
    }
}

async fn next_event(subscription: &mut Option<Subscription>) -> Option<PushEvent> {
    match subscription {
        Some(subscription) => subscription.recv().await,
        None => std::future::pending().await,
    }
}
