//! `atlas chat`: interactive terminal client.
//!
//! Replies are printed fragment by fragment as they stream in. Ctrl-C cancels
//! the reply in progress; `/quit` or end of input leaves.

use std::io::stdout;

use anyhow::{Context, Result};
use futures::StreamExt;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, warn};

use atlas_client::{
    ChatSession, ChatTransport, ClientError, FailureReason, HttpTransport, SessionEvent,
    StreamState,
};
use atlas_core::{catalog, find_property, ChatRole, Property};

use crate::terminal_output::{note_info, note_warn, stream_write, styled, BOLD, DIM};

pub struct ChatOptions {
    pub server_url: String,
    pub history_window: usize,
    pub property: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Empty,
    Quit,
    Help,
    Properties,
    Focus(String),
    Message(String),
}

fn parse_command(line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Empty;
    }
    let (head, rest) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(head, rest)| (head, rest.trim()));
    match (head, rest) {
        ("/quit" | "/exit", _) => Command::Quit,
        ("/help", _) => Command::Help,
        ("/properties", _) => Command::Properties,
        ("/focus", "") => Command::Help,
        ("/focus", id) => Command::Focus(id.to_string()),
        _ => Command::Message(line.to_string()),
    }
}

pub async fn run(options: ChatOptions) -> Result<()> {
    let initial = initial_property(options.property.as_deref())?;

    let transport = HttpTransport::new(&options.server_url);
    let mut session = ChatSession::new(transport).with_history_window(options.history_window);
    let mut events = BroadcastStream::new(session.subscribe());

    let cancel = session.cancel_handle();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    note_info(&format!(
        "Connected to {}. Type /help for commands.",
        options.server_url
    ));
    focus(&mut session, &initial);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        stream_write(&mut stdout(), &styled(BOLD, "you › "))?;
        let Some(line) = lines.next_line().await.context("Failed to read input")? else {
            println!();
            break;
        };

        match parse_command(&line) {
            Command::Empty => {}
            Command::Quit => break,
            Command::Help => print_help(),
            Command::Properties => {
                for property in catalog() {
                    println!("  {:<26} {}", property.id, property.title);
                }
            }
            Command::Focus(id) => match find_property(&id) {
                Some(property) => focus(&mut session, &property),
                None => note_warn(&format!("Unknown property: {id}. Try /properties.")),
            },
            Command::Message(text) => {
                let (result, ()) = tokio::join!(session.submit(&text), render_turn(&mut events));
                match result {
                    Ok(_) => {}
                    Err(ClientError::EmptyInput) => {}
                    // Already shown in the transcript.
                    Err(e) => debug!(error = %e, "Turn ended without a full reply"),
                }
            }
        }
    }
    Ok(())
}

fn initial_property(id: Option<&str>) -> Result<Property> {
    match id {
        Some(id) => find_property(id).with_context(|| format!("Unknown property: {id}")),
        None => catalog()
            .into_iter()
            .next()
            .context("Property catalog is empty"),
    }
}

fn focus<T: ChatTransport>(session: &mut ChatSession<T>, property: &Property) {
    if session.set_focus(Some(property.focus())) {
        if let Some(announcement) = session.messages().last() {
            print_assistant(&announcement.content);
        }
    } else {
        note_info(&format!("Focus: {}", property.title));
    }
}

/// Print one turn's events until it settles.
///
/// Events from before the turn (focus announcements) are skipped.
async fn render_turn(events: &mut BroadcastStream<SessionEvent>) {
    let mut started = false;
    let mut streaming = false;

    while let Some(event) = events.next().await {
        let event = match event {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "Missed chat events");
                continue;
            }
        };

        match event {
            SessionEvent::StateChanged(StreamState::Awaiting) => started = true,
            _ if !started => {}
            SessionEvent::MessageAppended(message) if message.role == ChatRole::Assistant => {
                if message.content.is_empty() {
                    streaming = true;
                    let _ = stream_write(&mut stdout(), &styled(BOLD, "atlas › "));
                } else {
                    if streaming {
                        println!();
                        streaming = false;
                    }
                    print_assistant(&message.content);
                }
            }
            SessionEvent::MessageGrew { fragment, .. } => {
                let _ = stream_write(&mut stdout(), &fragment);
            }
            SessionEvent::StateChanged(state) if !state.is_in_flight() => {
                if streaming {
                    println!();
                }
                if state == StreamState::Failed(FailureReason::Cancelled) {
                    note_info("Reply cancelled.");
                }
                return;
            }
            _ => {}
        }
    }
}

fn print_assistant(content: &str) {
    println!("{}{}", styled(BOLD, "atlas › "), content);
}

fn print_help() {
    println!(
        "{}",
        styled(
            DIM,
            "  /focus <id>    switch the property under discussion\n  \
/properties    list property ids\n  \
/quit          leave (Ctrl-D works too)\n  \
Ctrl-C         cancel the reply in progress"
        )
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_command("   "), Command::Empty);
        assert_eq!(parse_command("/quit"), Command::Quit);
        assert_eq!(parse_command(" /exit "), Command::Quit);
        assert_eq!(parse_command("/help"), Command::Help);
        assert_eq!(parse_command("/focus"), Command::Help);
        assert_eq!(
            parse_command("/focus  mission-bay-loft "),
            Command::Focus("mission-bay-loft".into())
        );
        assert_eq!(
            parse_command("  what are the HOA dues? "),
            Command::Message("what are the HOA dues?".into())
        );
        assert_eq!(
            parse_command("/unknown thing"),
            Command::Message("/unknown thing".into())
        );
    }

    #[test]
    fn test_initial_property() {
        assert_eq!(initial_property(None).unwrap().id, catalog()[0].id);
        assert_eq!(
            initial_property(Some("noe-valley-craftsman")).unwrap().title,
            "Noe Valley Craftsman"
        );
        assert!(initial_property(Some("nowhere")).is_err());
    }
}
