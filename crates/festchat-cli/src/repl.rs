//! Plain line-based REPL mode.
//!
//! A background task follows the session view and prints the streaming
//! bot reply as it grows; the foreground loop reads user lines.

use std::io::Write;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::warn;

use festchat_core::{ChatMessage, ChatRole, MessageId};
use festchat_renderer::ChatSession;
use festchat_transport::{ChatClient, Conversation};

pub async fn run(
    client: ChatClient,
    session: ChatSession,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut conversation = Conversation::new();

    tokio::spawn(follow_view(session.subscribe()));
    session.push_greeting(crate::GREETING);
    wait_idle(&session).await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("you> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        match line.trim() {
            "" => continue,
            "/quit" | "/exit" => break,
            "/clear" => {
                session.reset();
                conversation = Conversation::new();
                println!("(conversation cleared)");
            }
            text => {
                if let Err(e) = client.send_message(&mut conversation, &session, text).await {
                    warn!(error = %e, "failed to send message");
                }
                // Let the typewriter finish before the next prompt.
                wait_idle(&session).await;
            }
        }
    }

    Ok(())
}

/// Block until no message in the session is still streaming.
async fn wait_idle(session: &ChatSession) {
    let mut rx = session.subscribe();
    loop {
        if rx.borrow().iter().all(|m| !m.streaming) {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}

/// Print the growing content of the latest bot message. Only the suffix
/// appended since the previous snapshot is written, so the reply appears
/// to type itself onto the line.
async fn follow_view(mut rx: watch::Receiver<Vec<ChatMessage>>) {
    // (message id, bytes already printed, newline emitted)
    let mut current: Option<(MessageId, usize, bool)> = None;

    loop {
        if rx.changed().await.is_err() {
            return;
        }
        let last: Option<ChatMessage> = rx
            .borrow()
            .iter()
            .rev()
            .find(|m| m.role == ChatRole::Bot)
            .cloned();
        let Some(last) = last else {
            current = None;
            continue;
        };

        match &mut current {
            Some((id, printed, finalized)) if *id == last.id => {
                if last.content.len() > *printed {
                    print!("{}", &last.content[*printed..]);
                    std::io::stdout().flush().ok();
                    *printed = last.content.len();
                }
                if !last.streaming && !*finalized {
                    println!();
                    *finalized = true;
                }
            }
            _ => {
                print!("bot> {}", last.content);
                std::io::stdout().flush().ok();
                if !last.streaming {
                    println!();
                }
                current = Some((last.id.clone(), last.content.len(), !last.streaming));
            }
        }
    }
}
