//! Chat funnel - terminal front end
//!
//! Renders the conversation on stdout and reads answers from stdin. Logs go
//! to stderr so they do not interleave with the chat.

use chat_funnel::config::FunnelConfig;
use chat_funnel::message::{DeliveryState, Message, Origin};
use chat_funnel::runtime::{SessionHandle, TracingSink, TracingSound};
use chat_funnel::script::{ResponseKind, Script};
use chat_funnel::state_machine::Snapshot;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chat_funnel=info".into()),
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
    let config = FunnelConfig::from_env()?;
    let context = config.flow_context()?;
    tracing::info!(
        typing_ms = config.timing.typing.as_millis(),
        steps = context.script.terminal_step(),
        "Configuration loaded"
    );

    let script = Arc::clone(&context.script);
    let session = SessionHandle::spawn(
        context,
        TracingSink,
        TracingSound,
        Some(config.handoff_uri.clone()),
    );
    let mut snapshots = session.snapshots.clone();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut renderer = Renderer::default();

    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                renderer.render(&snapshot);
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                let snapshot = snapshots.borrow().clone();
                handle_line(&session, &script, &snapshot, line.trim()).await;
            }
        }
    }

    session.teardown().await;
    Ok(())
}

/// Map a line of input to a surface command
async fn handle_line(session: &SessionHandle, script: &Script, snapshot: &Snapshot, line: &str) {
    match script.expected_response(snapshot.step) {
        ResponseKind::None => {
            if let Some(uri) = session.activate_call_to_action().await {
                println!(">> {uri}");
            }
        }
        ResponseKind::Choice => {
            // A number picks a button; anything else is sent as typed
            let picked = line
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|i| snapshot.pending_choices().get(i));
            match picked {
                Some(label) => session.submit_choice(label.clone()).await,
                None => session.submit_text(line).await,
            };
        }
        ResponseKind::FreeText => {
            session.submit_text(line).await;
        }
    }
}

/// Prints only what changed between snapshots
#[derive(Default)]
struct Renderer {
    printed: usize,
    read: HashSet<String>,
    composing: bool,
}

impl Renderer {
    fn render(&mut self, snapshot: &Snapshot) {
        if snapshot.is_composing && !self.composing {
            println!("   digitando...");
        }
        self.composing = snapshot.is_composing;

        for message in snapshot.timeline.iter().skip(self.printed) {
            print_message(message);
        }
        self.printed = snapshot.timeline.len();

        for message in &snapshot.timeline {
            if message.delivery_state == Some(DeliveryState::Read)
                && self.read.insert(message.id.clone())
            {
                println!("   ✓✓ {}", message.created_at);
            }
        }
    }
}

fn print_message(message: &Message) {
    match message.origin {
        Origin::Bot => println!("[{}] {}", message.created_at, message.text),
        Origin::Visitor => println!("[{}] você: {} ✓", message.created_at, message.text),
    }
    for (i, option) in message.choices().iter().enumerate() {
        println!("   {}) {option}", i + 1);
    }
    if let Some(label) = message.call_to_action_label() {
        println!("   [ {label} ] (pressione Enter)");
    }
}
