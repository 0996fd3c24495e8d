//! Parsing of interactive console input.

use classroom_chats::types::UserId;
use classroom_chats::Member;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Empty,
    Help,
    Quit,
    Conversations,
    Refresh,
    Open(String),
    Close,
    More,
    Read,
    MentionsRead,
    Edit { message_id: String, content: String },
    Delete(String),
    NewDirect(String),
    NewGroup { name: String, members: Vec<String> },
    Say(String),
    Unknown(String),
}

pub const HELP: &[(&str, &str)] = &[
    ("/help, /h", "Show this help"),
    ("/conversations, /c", "List conversations"),
    ("/refresh, /r", "Refetch the conversation list"),
    ("/open <id>, /o", "Open a conversation"),
    ("/close", "Leave the open conversation"),
    ("/more, /m", "Load older messages"),
    ("/edit <message-id> <text>", "Edit one of your messages"),
    ("/delete <message-id>", "Delete one of your messages"),
    ("/read", "Mark the open conversation as read"),
    ("/mentions-read", "Mark mentions in the open conversation as read"),
    ("/dm <user-id>", "Start a direct conversation"),
    ("/group <name> <user-id>...", "Start a group conversation"),
    ("/quit, /exit, /q", "Exit console"),
    ("<text>", "Send a message; @username mentions a member"),
];

/// Split off the first whitespace separated word
fn split_word(input: &str) -> (&str, &str) {
    let input = input.trim();
    match input.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (input, ""),
    }
}

pub fn parse(line: &str) -> ConsoleCommand {
    let line = line.trim();
    if line.is_empty() {
        return ConsoleCommand::Empty;
    }
    if !line.starts_with('/') {
        return ConsoleCommand::Say(line.to_string());
    }

    let (command, rest) = split_word(line);
    match (command, rest) {
        ("/quit" | "/exit" | "/q", _) => ConsoleCommand::Quit,
        ("/help" | "/h", _) => ConsoleCommand::Help,
        ("/conversations" | "/c", _) => ConsoleCommand::Conversations,
        ("/refresh" | "/r", _) => ConsoleCommand::Refresh,
        ("/open" | "/o", id) if !id.is_empty() => ConsoleCommand::Open(split_word(id).0.to_string()),
        ("/close", _) => ConsoleCommand::Close,
        ("/more" | "/m", _) => ConsoleCommand::More,
        ("/read", _) => ConsoleCommand::Read,
        ("/mentions-read", _) => ConsoleCommand::MentionsRead,
        ("/edit", rest) => match split_word(rest) {
            (message_id, content) if !message_id.is_empty() && !content.is_empty() => {
                ConsoleCommand::Edit {
                    message_id: message_id.to_string(),
                    content: content.to_string(),
                }
            }
            _ => ConsoleCommand::Unknown(line.to_string()),
        },
        ("/delete", id) if !id.is_empty() => ConsoleCommand::Delete(split_word(id).0.to_string()),
        ("/dm", id) if !id.is_empty() => ConsoleCommand::NewDirect(split_word(id).0.to_string()),
        ("/group", rest) => {
            let mut words = rest.split_whitespace();
            match words.next() {
                Some(name) => ConsoleCommand::NewGroup {
                    name: name.to_string(),
                    members: words.map(str::to_string).collect(),
                },
                None => ConsoleCommand::Unknown(line.to_string()),
            }
        }
        _ => ConsoleCommand::Unknown(line.to_string()),
    }
}

/// Resolve `@name` tokens against the members of a conversation.
///
/// A token matches a member's username or user id; unknown names are skipped.
pub fn extract_mentions(content: &str, members: &[Member]) -> Vec<UserId> {
    let mut mentions: Vec<UserId> = Vec::new();
    for token in content.split_whitespace() {
        let Some(name) = token.strip_prefix('@') else {
            continue;
        };
        let name = name.trim_end_matches(|c: char| !c.is_alphanumeric() && c != '_' && c != '-');
        if let Some(member) = members
            .iter()
            .find(|member| member.username == name || member.user_id == name)
        {
            if !mentions.contains(&member.user_id) {
                mentions.push(member.user_id.clone());
            }
        }
    }
    mentions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_a_message() {
        assert_eq!(parse("  hello there "), ConsoleCommand::Say("hello there".into()));
        assert_eq!(parse("   "), ConsoleCommand::Empty);
    }

    #[test]
    fn test_command_aliases() {
        assert_eq!(parse("/q"), ConsoleCommand::Quit);
        assert_eq!(parse("/c"), ConsoleCommand::Conversations);
        assert_eq!(parse("/o c1"), ConsoleCommand::Open("c1".into()));
        assert_eq!(parse("/open"), ConsoleCommand::Unknown("/open".into()));
        assert_eq!(parse("/m"), ConsoleCommand::More);
    }

    #[test]
    fn test_edit_requires_id_and_text() {
        assert_eq!(
            parse("/edit m1 fixed typo"),
            ConsoleCommand::Edit {
                message_id: "m1".into(),
                content: "fixed typo".into()
            }
        );
        assert_eq!(parse("/edit m1"), ConsoleCommand::Unknown("/edit m1".into()));
    }

    #[test]
    fn test_new_conversation_commands() {
        assert_eq!(parse("/dm u2"), ConsoleCommand::NewDirect("u2".into()));
        assert_eq!(
            parse("/group biology u2 u3"),
            ConsoleCommand::NewGroup {
                name: "biology".into(),
                members: vec!["u2".into(), "u3".into()]
            }
        );
        assert_eq!(parse("/group"), ConsoleCommand::Unknown("/group".into()));
    }

    #[test]
    fn test_extract_mentions() {
        let members = vec![Member::new("u1", "ada"), Member::new("u2", "grace")];
        assert_eq!(
            extract_mentions("@grace, see @ada and @grace again @nobody", &members),
            vec!["u2".to_string(), "u1".to_string()]
        );
        assert!(extract_mentions("no mentions", &members).is_empty());
        assert_eq!(extract_mentions("ping @u2", &members), vec!["u2".to_string()]);
    }
}
