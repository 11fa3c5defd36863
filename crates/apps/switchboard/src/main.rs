//! Switchboard - line-driven host for the SMS inbox
//!
//! Reads commands from stdin, runs backend calls on blocking workers and
//! feeds their responses back into the inbox through a channel.

mod commands;
mod display;

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Duration, Local, Utc};
use log::{debug, error, info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use sms::inbox::{NEW_SMS_EVENT, Outcome, PushEvent, badge};
use sms::{
    Direction, FrappeClient, InMemoryBackend, Inbox, Message, MessageId, PhoneNumber, Response,
    Settings, SmsBackend, Ticket, execute,
};

use commands::Command;

const OFFLINE_FLAG: &str = "--offline";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    if let Err(e) = config::init() {
        error!("Failed to initialize config directory: {}", e);
    }

    let offline = std::env::args().any(|arg| arg == OFFLINE_FLAG);
    let (backend, simulator, country_code) = if offline {
        let memory = Arc::new(demo_backend());
        let backend: Arc<dyn SmsBackend> = memory.clone();
        info!("Running against the in-memory backend");
        (backend, Some(memory), sms::DEFAULT_COUNTRY_CODE.to_string())
    } else {
        let settings = Settings::load().inspect_err(|_| {
            if let Some(path) = Settings::default_settings_path() {
                warn!(
                    "Create {} or set SMS_INBOX_URL (or pass {})",
                    path.display(),
                    OFFLINE_FLAG
                );
            }
        })?;
        let client = FrappeClient::new(&settings).context("Failed to create backend client")?;
        info!("Connected to {}", settings.base_url);
        let backend: Arc<dyn SmsBackend> = Arc::new(client);
        (backend, None, settings.default_country_code)
    };

    let initial = {
        let backend = Arc::clone(&backend);
        tokio::task::spawn_blocking(move || backend.unread_count())
            .await?
            .unwrap_or_else(|e| {
                warn!("Initial unread count unavailable: {}", e);
                0
            })
    };
    let badge = badge::install(initial);
    if badge.mount() {
        display::print_badge(&badge.view());
    }

    let mut inbox = Inbox::new(badge, Local, country_code);
    let (tx, mut rx) = mpsc::unbounded_channel::<Response>();
    dispatch(&backend, &tx, inbox.load_conversations());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("Type help for commands.");

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let command = match commands::parse(&line) {
                    Ok(command) => command,
                    Err(e) => {
                        println!("{:#}", e);
                        continue;
                    }
                };
                match command {
                    Command::Quit => break,
                    Command::Nothing => continue,
                    Command::Help => println!("{}", commands::HELP),
                    Command::List => display::print_list(&inbox.conversation_list(Utc::now())),
                    Command::Receive { from, text } => match &simulator {
                        Some(memory) => {
                            let payload = memory.receive(&from, &text, Utc::now());
                            match PushEvent::parse(NEW_SMS_EVENT, &payload) {
                                Ok(event) => {
                                    dispatch(&backend, &tx, inbox.handle_push(&event));
                                    show(&inbox);
                                }
                                Err(e) => warn!("Dropping simulated push: {}", e),
                            }
                        }
                        None => println!("receive is only available with {}", OFFLINE_FLAG),
                    },
                    command => match commands::apply(&mut inbox, command) {
                        Ok(tickets) => {
                            dispatch(&backend, &tx, tickets);
                            show(&inbox);
                        }
                        Err(e) => println!("!! {}", e.user_message()),
                    },
                }
            }
            Some(response) = rx.recv() => {
                let reaction = inbox.handle_response(response);
                dispatch(&backend, &tx, reaction.requests);
                if reaction.outcome != Outcome::Discarded {
                    show(&inbox);
                }
            }
        }
        if inbox.has_notices() {
            display::print_notices(&inbox.drain_notices());
        }
    }

    debug!("{} requests still pending at exit", inbox.pending_requests());
    Ok(())
}

/// Run each ticket on a blocking worker and send its response back
fn dispatch(
    backend: &Arc<dyn SmsBackend>,
    tx: &mpsc::UnboundedSender<Response>,
    tickets: Vec<Ticket>,
) {
    for ticket in tickets {
        debug!("Dispatching {} {}", ticket.id, ticket.request.kind());
        let backend = Arc::clone(backend);
        let tx = tx.clone();
        tokio::task::spawn_blocking(move || {
            let response = execute(backend.as_ref(), &ticket);
            if tx.send(response).is_err() {
                debug!("Inbox closed before {} completed", ticket.id);
            }
        });
    }
}

fn show(inbox: &Inbox) {
    display::print_badge(&inbox.badge().view());
    match inbox.thread_view() {
        Some(thread) => display::print_thread(&thread),
        None => display::print_list(&inbox.conversation_list(Utc::now())),
    }
    if inbox.new_message_form().is_open() {
        let form = inbox.new_message_form();
        println!(
            "New message: contact={} phone={}",
            form.contact().unwrap_or("-"),
            if form.phone().is_empty() { "-" } else { form.phone() }
        );
    }
}

/// A small sample inbox for running without a server
fn demo_backend() -> InMemoryBackend {
    let backend = InMemoryBackend::new();
    backend.enable_sending("+61400000000");

    let now = Utc::now();
    let jane = PhoneNumber::new("+61412345678");
    let samples = [
        ("d1", &jane, Direction::Inbound, "Is the quote ready?", Duration::days(1)),
        ("d2", &jane, Direction::Outbound, "Sending it this afternoon", Duration::hours(20)),
        ("d3", &jane, Direction::Inbound, "Thanks!", Duration::minutes(5)),
    ];
    for (id, phone, direction, body, age) in samples {
        let mut builder = Message::builder(MessageId::new(id), phone.clone())
            .body(body)
            .direction(direction)
            .sent_at(now - age);
        if direction == Direction::Outbound {
            builder = builder.sender_name("Administrator");
        }
        backend.add_message(builder.build(), id != "d3");
    }
    backend.set_contact_name(&jane, "Jane Builder");
    backend.add_contact("Jane Builder", Some("0412345678"), None);
    backend
}
