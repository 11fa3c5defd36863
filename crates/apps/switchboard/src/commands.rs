//! Command parsing and dispatch onto the inbox

use anyhow::{Context, Result, bail};
use serde_json::Value;

use sms::inbox::{PushEvent, Ticket};
use sms::{Inbox, LinkTarget, MessageId, PhoneNumber, RecordType, SmsError};

pub const HELP: &str = "\
Commands:
  list                        show conversations
  open <number>               open a conversation
  search <text>               filter conversations (empty clears)
  select | cancel             enter / leave selection mode
  check <id> | uncheck <id>   select / deselect a message
  attach <Type> <name>        attach selected messages to a record
  attach-all <Type> <name>    attach the open conversation to a record
  reply <text>                reply in the open conversation
  contact <name>              start a new message to a contact
  new <number|-> <text>       send a new message (- keeps the contact's number)
  unread <number>             mark a conversation unread
  refresh                     reload list and open conversation
  push <event> <json>         feed a realtime event
  receive <number> <text>     simulate an inbound SMS (offline only)
  help | quit";

/// A parsed input line
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    List,
    Open(PhoneNumber),
    Search(String),
    Select,
    Cancel,
    Check(MessageId),
    Uncheck(MessageId),
    Attach(LinkTarget),
    AttachAll(LinkTarget),
    Reply(String),
    Contact(String),
    New { phone: Option<String>, text: String },
    Unread(PhoneNumber),
    Refresh,
    Push { event: String, payload: Value },
    Receive { from: String, text: String },
    Help,
    Quit,
    Nothing,
}

/// Split off the first whitespace-delimited word
fn split_word(input: &str) -> (&str, &str) {
    let input = input.trim();
    match input.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (input, ""),
    }
}

/// Everything after the command word and its single separator, untrimmed
fn raw_argument(line: &str) -> &str {
    let line = line.trim_start();
    match line.find(char::is_whitespace) {
        Some(at) => {
            let mut rest = line[at..].chars();
            rest.next();
            rest.as_str()
        }
        None => "",
    }
}

fn required<'a>(value: &'a str, usage: &str) -> Result<&'a str> {
    if value.is_empty() {
        bail!("usage: {usage}");
    }
    Ok(value)
}

fn parse_target(args: &str, usage: &str) -> Result<LinkTarget> {
    let (kind, name) = split_word(required(args, usage)?);
    let record_type: RecordType = kind.parse()?;
    Ok(LinkTarget::new(record_type, required(name, usage)?)?)
}

pub fn parse(line: &str) -> Result<Command> {
    let (word, rest) = split_word(line);
    let command = match word.to_lowercase().as_str() {
        "" => Command::Nothing,
        "list" | "ls" => Command::List,
        "open" => Command::Open(PhoneNumber::new(required(rest, "open <number>")?)),
        "search" => Command::Search(raw_argument(line).to_string()),
        "select" => Command::Select,
        "cancel" => Command::Cancel,
        "check" => Command::Check(MessageId::new(required(rest, "check <id>")?)),
        "uncheck" => Command::Uncheck(MessageId::new(required(rest, "uncheck <id>")?)),
        "attach" => Command::Attach(parse_target(rest, "attach <Type> <name>")?),
        "attach-all" => Command::AttachAll(parse_target(rest, "attach-all <Type> <name>")?),
        "reply" => Command::Reply(required(rest, "reply <text>")?.to_string()),
        "contact" => Command::Contact(required(rest, "contact <name>")?.to_string()),
        "new" => {
            let (phone, text) = split_word(required(rest, "new <number|-> <text>")?);
            Command::New {
                phone: (phone != "-").then(|| phone.to_string()),
                text: required(text, "new <number|-> <text>")?.to_string(),
            }
        }
        "unread" => Command::Unread(PhoneNumber::new(required(rest, "unread <number>")?)),
        "refresh" => Command::Refresh,
        "push" => {
            let (event, json) = split_word(required(rest, "push <event> <json>")?);
            let payload = serde_json::from_str(required(json, "push <event> <json>")?)
                .context("push payload is not valid JSON")?;
            Command::Push {
                event: event.to_string(),
                payload,
            }
        }
        "receive" => {
            let (from, text) = split_word(required(rest, "receive <number> <text>")?);
            Command::Receive {
                from: from.to_string(),
                text: required(text, "receive <number> <text>")?.to_string(),
            }
        }
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => bail!("unknown command {other:?}; type help"),
    };
    Ok(command)
}

/// Apply a command to the inbox, returning the tickets it issued
///
/// `List`, `Receive`, `Help`, `Quit` and `Nothing` are handled by the caller.
pub fn apply(inbox: &mut Inbox, command: Command) -> Result<Vec<Ticket>, SmsError> {
    let tickets = match command {
        Command::Open(phone) => inbox.open(&phone)?,
        Command::Search(text) => {
            inbox.set_search_filter(&text);
            Vec::new()
        }
        Command::Select => {
            inbox.toggle_selection(Some(true));
            Vec::new()
        }
        Command::Cancel => {
            inbox.toggle_selection(Some(false));
            Vec::new()
        }
        Command::Check(id) => {
            inbox.set_message_selected(&id, true);
            Vec::new()
        }
        Command::Uncheck(id) => {
            inbox.set_message_selected(&id, false);
            Vec::new()
        }
        Command::Attach(target) => {
            let tickets = inbox.attach_selected(target);
            if tickets.is_empty() {
                return Err(SmsError::invalid_input("Select at least one message first"));
            }
            tickets
        }
        Command::AttachAll(target) => {
            let phone = inbox
                .store()
                .current_phone()
                .cloned()
                .ok_or_else(|| SmsError::invalid_input("Open a conversation first"))?;
            inbox.attach_conversation(&phone, target)
        }
        Command::Reply(text) => {
            if inbox.store().current().is_none() {
                return Err(SmsError::invalid_input("Open a conversation first"));
            }
            inbox.set_draft(text);
            inbox.send_reply()
        }
        Command::Contact(name) => {
            if !inbox.new_message_form().is_open() {
                inbox.open_new_message();
            }
            inbox.choose_contact(&name)
        }
        Command::New { phone, text } => {
            if !inbox.new_message_form().is_open() {
                inbox.open_new_message();
            }
            if let Some(phone) = phone {
                inbox.set_new_message_phone(phone);
            }
            inbox.set_new_message_body(text);
            inbox.submit_new_message()?
        }
        Command::Unread(phone) => inbox.mark_unread(&phone),
        Command::Refresh => inbox.refresh(),
        Command::Push { event, payload } => {
            let event = PushEvent::parse(&event, &payload)?;
            inbox.handle_push(&event)
        }
        Command::List
        | Command::Receive { .. }
        | Command::Help
        | Command::Quit
        | Command::Nothing => Vec::new(),
    };
    Ok(tickets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;
    use serde_json::json;
    use sms::inbox::Request;
    use sms::Badge;
    use std::sync::Arc;

    fn inbox() -> Inbox {
        Inbox::new(
            Arc::new(Badge::new(0)),
            Local,
            "+61",
        )
    }

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(parse("").unwrap(), Command::Nothing);
        assert_eq!(parse("  LIST ").unwrap(), Command::List);
        assert_eq!(
            parse("open +1555").unwrap(),
            Command::Open(PhoneNumber::new("+1555"))
        );
        assert_eq!(parse("search").unwrap(), Command::Search(String::new()));
        assert_eq!(
            parse("search Jane ").unwrap(),
            Command::Search("Jane ".into())
        );
        assert_eq!(
            parse("reply see you at 8").unwrap(),
            Command::Reply("see you at 8".into())
        );
        assert!(parse("open").is_err());
        assert!(parse("frobnicate").is_err());
    }

    #[test]
    fn test_parse_attach_target() {
        let cmd = parse("attach customer CUST-001").unwrap();
        assert_eq!(
            cmd,
            Command::Attach(LinkTarget::new(RecordType::Customer, "CUST-001").unwrap())
        );
        assert!(parse("attach Invoice INV-1").is_err());
        assert!(parse("attach-all Lead").is_err());
    }

    #[test]
    fn test_parse_new_and_push() {
        assert_eq!(
            parse("new - hello there").unwrap(),
            Command::New {
                phone: None,
                text: "hello there".into()
            }
        );
        assert_eq!(
            parse("push sms_unread_count_update {\"new_count\": 2}").unwrap(),
            Command::Push {
                event: "sms_unread_count_update".into(),
                payload: json!({ "new_count": 2 })
            }
        );
        assert!(parse("push new_sms {oops").is_err());
    }

    #[test]
    fn test_apply_requires_open_conversation() {
        let mut inbox = inbox();
        let target = LinkTarget::new(RecordType::Lead, "LEAD-1").unwrap();
        assert!(apply(&mut inbox, Command::AttachAll(target.clone())).is_err());
        assert!(apply(&mut inbox, Command::Attach(target)).is_err());
        assert!(apply(&mut inbox, Command::Reply("hi".into())).is_err());
    }

    #[test]
    fn test_apply_push_updates_badge() {
        let mut inbox = inbox();
        let tickets = apply(
            &mut inbox,
            Command::Push {
                event: "new_sms".into(),
                payload: json!({ "phone": "+1555", "new_count": 4, "sender": "Jane", "preview": "hi" }),
            },
        )
        .unwrap();
        assert_eq!(inbox.badge().count(), 4);
        assert_eq!(tickets[0].request, Request::ListConversations);
    }

    #[test]
    fn test_apply_new_message_validates() {
        let mut inbox = inbox();
        let err = apply(
            &mut inbox,
            Command::New {
                phone: None,
                text: "hello".into(),
            },
        )
        .unwrap_err();
        assert_eq!(err.user_message(), "Phone Number is required");
    }
}
