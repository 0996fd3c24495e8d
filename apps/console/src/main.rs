mod commands;
mod render;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use classroom_chats::{
    ChatHandle, ChatSnapshot, Conversation, ConversationType, CreateConversationRequest,
    InMemoryChatApi, LocalPushHub, Member, MutationKind, RequestStatus, SessionOptions, SyncPhase,
    Viewer,
};
use classroom_config::load as load_config;
use classroom_runtime::{shutdown_signal, telemetry, ClientServices};
use colored::Colorize;
use commands::{extract_mentions, parse, ConsoleCommand, HELP};
use render::{conversation_line, message_line, Line, Printer};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "classroom-chat")]
#[command(about = "Classroom chat client (console by default)")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List conversations with unread counters
    Conversations,
    /// Print the latest messages of a conversation
    Messages {
        conversation_id: String,
        /// Page back to the first message
        #[arg(long)]
        all: bool,
    },
    /// Send one message and wait for the server to confirm it
    Send {
        conversation_id: String,
        content: String,
        /// User id to mention (repeatable)
        #[arg(long = "mention")]
        mentions: Vec<String>,
    },
    /// Follow a conversation until interrupted
    Watch { conversation_id: String },
    /// Start interactive console (default)
    Console,
    /// Interactive console against an in-memory classroom
    Demo,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Console) {
        Commands::Conversations => list_conversations().await,
        Commands::Messages {
            conversation_id,
            all,
        } => print_messages(&conversation_id, all).await,
        Commands::Send {
            conversation_id,
            content,
            mentions,
        } => send_message(&conversation_id, &content, mentions).await,
        Commands::Watch { conversation_id } => watch(&conversation_id).await,
        Commands::Console => run_console().await,
        Commands::Demo => run_demo().await,
    }
}

async fn connect() -> anyhow::Result<ClientServices> {
    telemetry::init_tracing().context("failed to initialise tracing")?;

    let config = load_config().context("failed to load configuration")?;

    ClientServices::initialise(&config).context("failed to initialise client services")
}

fn viewer_id(snapshot: &ChatSnapshot) -> Option<&str> {
    snapshot.viewer.as_ref().map(|viewer| viewer.user_id.as_str())
}

fn print_lines(lines: Vec<Line>) {
    for line in lines {
        match line {
            Line::Message(text) => println!("{text}"),
            Line::Notice(text) => println!("{}", text.dimmed()),
            Line::Error(text) => eprintln!("{}", text.red()),
        }
    }
}

fn print_conversations(snapshot: &ChatSnapshot) {
    if snapshot.conversations.is_empty() {
        println!("No conversations found");
        return;
    }
    for conversation in &snapshot.conversations {
        let selected =
            snapshot.selected_conversation_id.as_deref() == Some(conversation.id.as_str());
        let line = conversation_line(conversation, viewer_id(snapshot), selected);
        if conversation.has_unread() {
            println!("{}", line.bold());
        } else {
            println!("{line}");
        }
    }
}

/// Print every snapshot change until the session closes
fn spawn_printer(handle: &ChatHandle) -> JoinHandle<()> {
    let mut updates = handle.subscribe();
    tokio::spawn(async move {
        let mut printer = Printer::default();
        loop {
            let lines = printer.update(&updates.borrow_and_update());
            print_lines(lines);
            if updates.changed().await.is_err() {
                break;
            }
        }
    })
}

async fn open(handle: &ChatHandle, conversation_id: &str) -> anyhow::Result<ChatSnapshot> {
    handle.select_conversation(conversation_id)?;
    let snapshot = handle
        .wait_until(|s| {
            s.selected_conversation_id.as_deref() == Some(conversation_id)
                && (s.phase == SyncPhase::Ready || s.queries.messages.error().is_some())
        })
        .await?;

    if let Some(error) = snapshot.queries.messages.error() {
        bail!("failed to load conversation {conversation_id}: {error}");
    }
    Ok(snapshot)
}

async fn list_conversations() -> anyhow::Result<()> {
    let services = connect().await?;
    let (handle, task) = services.start_session();

    let snapshot = handle
        .wait_until(|s| {
            matches!(
                s.queries.conversations,
                RequestStatus::Success | RequestStatus::Error(_)
            )
        })
        .await?;
    handle.shutdown()?;
    task.await.context("chat session panicked")?;

    if let Some(error) = snapshot.queries.conversations.error() {
        bail!("failed to list conversations: {error}");
    }
    print_conversations(&snapshot);
    println!("{} unread in total", snapshot.total_unread());
    Ok(())
}

async fn print_messages(conversation_id: &str, all: bool) -> anyhow::Result<()> {
    let services = connect().await?;
    let (handle, task) = services.start_session();

    let mut snapshot = open(&handle, conversation_id).await?;
    while all && snapshot.has_more {
        let before = snapshot.messages.len();
        handle.load_more_messages()?;
        snapshot = handle
            .wait_until(|s| {
                !s.loading_more
                    && (s.messages.len() > before
                        || !s.has_more
                        || s.queries.older_messages.error().is_some())
            })
            .await?;
        if let Some(error) = snapshot.queries.older_messages.error() {
            bail!("failed to load older messages: {error}");
        }
    }

    handle.shutdown()?;
    task.await.context("chat session panicked")?;

    for message in &snapshot.messages {
        println!("{}", message_line(message));
    }
    if snapshot.has_more {
        println!("{}", "(older messages available, use --all)".dimmed());
    }
    Ok(())
}

async fn send_message(
    conversation_id: &str,
    content: &str,
    mentions: Vec<String>,
) -> anyhow::Result<()> {
    let services = connect().await?;
    if services.viewer().is_none() {
        bail!("sending requires viewer.user_id in the configuration");
    }
    let (handle, task) = services.start_session();

    open(&handle, conversation_id).await?;
    handle.send_message(content, mentions)?;
    let snapshot = handle
        .wait_until(|s| {
            s.pending_sends() == 0
                && matches!(
                    s.mutations.send,
                    RequestStatus::Success | RequestStatus::Error(_)
                )
        })
        .await?;

    handle.shutdown()?;
    task.await.context("chat session panicked")?;

    if let Some(error) = snapshot.mutations.send.error() {
        bail!("failed to send message: {error}");
    }
    if let Some(message) = snapshot.messages.iter().rev().find(|m| m.content == content) {
        println!("sent {}", message.id.green());
    }
    Ok(())
}

async fn watch(conversation_id: &str) -> anyhow::Result<()> {
    let services = connect().await?;
    let (handle, task) = services.start_session();

    open(&handle, conversation_id).await?;
    info!(conversation_id, "watching conversation");
    let printer = spawn_printer(&handle);

    tokio::select! {
        _ = shutdown_signal() => {}
        _ = printer => warn!("chat session ended"),
    }

    // Already closed when the printer finished first
    let _ = handle.shutdown();
    task.await.context("chat session panicked")?;
    Ok(())
}

async fn run_console() -> anyhow::Result<()> {
    let services = connect().await?;
    info!("starting interactive console");
    interact(services, "Classroom Chat Console").await
}

async fn interact(services: ClientServices, title: &str) -> anyhow::Result<()> {
    let (handle, task) = services.start_session();
    let printer = spawn_printer(&handle);

    println!("{}", title.bold());
    println!("Type '/help' for commands, plain text sends to the open conversation");
    println!("Use Ctrl+C or '/quit' to exit");
    println!("---");

    let stdin = tokio::io::stdin();
    let mut reader = BufReader::new(stdin);
    let mut line = String::new();

    loop {
        print!("> ");
        std::io::Write::flush(&mut std::io::stdout())?;

        line.clear();
        let bytes_read = tokio::select! {
            read = reader.read_line(&mut line) => read?,
            _ = shutdown_signal() => 0,
        };
        if bytes_read == 0 {
            break; // EOF
        }

        let snapshot = handle.snapshot();
        match parse(&line) {
            ConsoleCommand::Empty => {}
            ConsoleCommand::Quit => {
                println!("Goodbye!");
                break;
            }
            ConsoleCommand::Help => {
                println!("Available commands:");
                for (usage, description) in HELP {
                    println!("  {usage:<28} - {description}");
                }
            }
            ConsoleCommand::Conversations => print_conversations(&snapshot),
            ConsoleCommand::Refresh => handle.refresh_conversations()?,
            ConsoleCommand::Open(conversation_id) => handle.select_conversation(conversation_id)?,
            ConsoleCommand::Close => handle.deselect()?,
            ConsoleCommand::More if !snapshot.has_more => println!("No older messages"),
            ConsoleCommand::More => handle.load_more_messages()?,
            ConsoleCommand::Read => handle.mark_conversation_read()?,
            ConsoleCommand::MentionsRead => handle.mark_mentions_read()?,
            ConsoleCommand::Edit {
                message_id,
                content,
            } => {
                let mentions = extract_mentions(&content, open_members(&snapshot));
                handle.update_message(message_id, content, mentions)?;
            }
            ConsoleCommand::Delete(message_id) => handle.delete_message(message_id)?,
            ConsoleCommand::NewDirect(user_id) => {
                handle.create_conversation(CreateConversationRequest::direct(user_id))?
            }
            ConsoleCommand::NewGroup { name, members } => {
                handle.create_conversation(CreateConversationRequest::group(name, members))?
            }
            ConsoleCommand::Say(_) if snapshot.selected_conversation_id.is_none() => {
                println!("Open a conversation first (/open <id>)");
            }
            ConsoleCommand::Say(content) => {
                // Already printed; clear it so a failure of this send shows up too.
                if snapshot.mutations.send.error().is_some() {
                    handle.acknowledge_mutation(MutationKind::Send)?;
                }
                let mentions = extract_mentions(&content, open_members(&snapshot));
                handle.send_message(content, mentions)?;
            }
            ConsoleCommand::Unknown(input) => {
                println!("Unknown command: {input}. Type '/help' for available commands.");
            }
        }
    }

    handle.shutdown()?;
    task.await.context("chat session panicked")?;
    printer.await.context("printer task panicked")?;
    Ok(())
}

/// Members of the open conversation, for resolving `@name` mentions
fn open_members(snapshot: &ChatSnapshot) -> &[Member] {
    if let Some(conversation) = &snapshot.conversation {
        return &conversation.members;
    }
    snapshot
        .selected_conversation_id
        .as_deref()
        .and_then(|id| snapshot.conversations.iter().find(|c| c.id == id))
        .map(|conversation| conversation.members.as_slice())
        .unwrap_or_default()
}

fn demo_conversation(
    id: &str,
    kind: ConversationType,
    name: Option<&str>,
    members: Vec<Member>,
) -> Conversation {
    Conversation {
        id: id.to_string(),
        kind,
        name: name.map(str::to_string),
        members,
        last_message: None,
        unread_count: 0,
        mention_count: 0,
    }
}

async fn run_demo() -> anyhow::Result<()> {
    telemetry::init_tracing_with("warn").context("failed to initialise tracing")?;

    let you = Member::new("u1", "you").with_display_name("You");
    let classmates = vec![
        Member::new("u2", "grace").with_display_name("Grace"),
        Member::new("u3", "linus").with_display_name("Linus"),
    ];

    let hub = LocalPushHub::new();
    let api = InMemoryChatApi::new(you.clone()).with_push(hub.clone());

    let mut everyone = vec![you.clone()];
    everyone.extend(classmates.iter().cloned());
    api.add_conversation(demo_conversation(
        "biology",
        ConversationType::Group,
        Some("Biology 101"),
        everyone,
    ))
    .await;
    api.add_conversation(demo_conversation(
        "grace",
        ConversationType::Dm,
        None,
        vec![you.clone(), classmates[0].clone()],
    ))
    .await;
    api.seed_messages("biology", &classmates[1], 75).await;
    api.seed_messages("grace", &classmates[0], 3).await;

    let chatter = spawn_classmates(api.clone(), classmates, you.user_id.clone());

    let viewer = Viewer::new(you.user_id.clone(), Some(you.username.clone()));
    let services = ClientServices::from_parts(
        Arc::new(api),
        Arc::new(hub),
        SessionOptions::new(Some(viewer), 50),
    );

    let result = interact(services, "Classroom Chat Demo (try /open biology)").await;
    chatter.abort();
    result
}

/// Post a classmate message into the group every few seconds
fn spawn_classmates(
    api: InMemoryChatApi,
    classmates: Vec<Member>,
    viewer_id: String,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(15));
        ticker.tick().await;

        for round in 1usize.. {
            ticker.tick().await;
            let sender = &classmates[round % classmates.len()];
            let (content, mentions) = if round % 3 == 0 {
                (format!("@you can you check question {round}?"), vec![viewer_id.clone()])
            } else {
                (format!("working on question {round}"), Vec::new())
            };

            if let Err(error) = api.inject_message("biology", sender, &content, mentions).await {
                warn!(%error, "demo message failed");
            }
        }
    })
}
