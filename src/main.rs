//! Helix console client
//!
//! Connects to the recruiting assistant service and drives one session from
//! stdin. Logs go to stderr as JSON; the conversation goes to stdout.

use helix_client::console::{self, Outcome};
use helix_client::{ClientConfig, ConnectionManager, SessionRuntime, SessionState, SessionUpdate};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, watch};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "helix_client=info,helix=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr),
        )
        .init();

    // Configuration
    let config = ClientConfig::from_env()?;
    tracing::info!(
        endpoint = %config.endpoint,
        transports = ?config.transports,
        authenticated = config.credentials.is_some(),
        "Starting Helix client"
    );

    let (connection, channel_events) =
        ConnectionManager::connect(config.endpoint.clone(), config.connect_options());
    let (runtime, session) = SessionRuntime::new(SessionState::new(), connection.clone(), channel_events);
    let runtime_task = tokio::spawn(runtime.run());

    tokio::spawn(print_session(session.watch_state()));
    tokio::spawn(print_updates(session.subscribe()));

    if let Some(persona) = &config.persona {
        if let Err(e) = session.choose_persona(persona.as_str()).await {
            println!("! {e}");
        }
    } else {
        println!("{}\n\nChoose one with :persona <id> (:help for more)", console::render_personas());
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let directive = match console::parse_line(&line) {
            Ok(directive) => directive,
            Err(e) => {
                println!("! {e}");
                continue;
            }
        };
        match console::execute(&session, directive).await {
            Ok(Outcome::Continue) => {}
            Ok(Outcome::Print(text)) => println!("{text}"),
            Ok(Outcome::Quit) => break,
            // Already reported through the update stream
            Err(e) => tracing::debug!(error = %e, "Action rejected"),
        }
    }

    connection.close();
    drop(session);
    let _ = runtime_task.await;
    tracing::info!("Helix client stopped");
    Ok(())
}

/// Print new conversation turns, connectivity changes and fresh sequences
async fn print_session(mut state_rx: watch::Receiver<SessionState>) {
    let mut shown_messages = 0;
    let mut shown_status = String::new();
    let mut shown_update = None;
    let mut shown_persona = None;

    loop {
        let state = state_rx.borrow_and_update().clone();

        let status = console::render_connectivity(&state);
        if status != shown_status {
            println!("[{status}]");
            shown_status = status;
        }

        // Persona switch resets the conversation
        let persona = state.is_active().then(|| state.persona.id.clone());
        if persona != shown_persona || state.conversation.len() < shown_messages {
            shown_messages = 0;
            shown_persona = persona;
        }
        for message in &state.conversation[shown_messages..] {
            println!("{}", console::render_message(message));
        }
        shown_messages = state.conversation.len();

        if state.last_update != shown_update {
            let applied = state
                .last_update
                .as_ref()
                .is_some_and(|update| update.content == state.document);
            if applied {
                println!("{}", console::render_document(&state));
            }
            shown_update = state.last_update;
        }

        if state_rx.changed().await.is_err() {
            break;
        }
    }
}

async fn print_updates(mut updates: broadcast::Receiver<SessionUpdate>) {
    loop {
        match updates.recv().await {
            Ok(SessionUpdate::Error { message }) => println!("! {message}"),
            Ok(SessionUpdate::Notice { message }) => println!("* {message}"),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Dropped session updates");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
