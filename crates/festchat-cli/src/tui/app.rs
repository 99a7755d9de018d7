//! TUI event loop: terminal setup, key handling, view-driven redraws.

use std::io;
use std::sync::Arc;

use crossterm::event::{Event, EventStream, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tokio_stream::StreamExt;
use tracing::warn;

use festchat_renderer::ChatSession;
use festchat_transport::{ChatClient, Conversation};

use super::ui;

type Term = Terminal<CrosstermBackend<io::Stdout>>;

pub async fn run(
    client: ChatClient,
    session: ChatSession,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut terminal = setup_terminal()?;
    let result = run_app(&mut terminal, client, session).await;
    restore_terminal(&mut terminal)?;
    result
}

fn setup_terminal() -> Result<Term, Box<dyn std::error::Error>> {
    crossterm::terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    crossterm::execute!(stdout, EnterAlternateScreen)?;
    Ok(Terminal::new(CrosstermBackend::new(stdout))?)
}

fn restore_terminal(terminal: &mut Term) -> Result<(), Box<dyn std::error::Error>> {
    crossterm::terminal::disable_raw_mode()?;
    crossterm::execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

struct App {
    client: Arc<ChatClient>,
    session: ChatSession,
    conversation: Arc<tokio::sync::Mutex<Conversation>>,
    input: String,
    should_quit: bool,
}

impl App {
    fn new(client: ChatClient, session: ChatSession) -> Self {
        Self {
            client: Arc::new(client),
            session,
            conversation: Arc::new(tokio::sync::Mutex::new(Conversation::new())),
            input: String::new(),
            should_quit: false,
        }
    }

    fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) {
        match (code, modifiers) {
            (KeyCode::Esc, _) => self.should_quit = true,
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => self.should_quit = true,
            (KeyCode::Char('l'), KeyModifiers::CONTROL) => self.clear_conversation(),
            (KeyCode::Enter, _) => self.submit(),
            (KeyCode::Backspace, _) => {
                self.input.pop();
            }
            (KeyCode::Char(c), _) => self.input.push(c),
            _ => {}
        }
    }

    fn clear_conversation(&mut self) {
        self.session.reset();
        // A cleared chat starts a fresh session (new id, context re-sent).
        if let Ok(mut conversation) = self.conversation.try_lock() {
            *conversation = Conversation::new();
        }
        self.session.push_greeting(crate::GREETING);
    }

    fn submit(&mut self) {
        let text = std::mem::take(&mut self.input);
        if text.trim().is_empty() {
            return;
        }

        // Send in the background so the typewriter keeps the UI live.
        let client = Arc::clone(&self.client);
        let session = self.session.clone();
        let conversation = Arc::clone(&self.conversation);
        tokio::spawn(async move {
            let mut conversation = conversation.lock().await;
            if let Err(e) = client.send_message(&mut conversation, &session, &text).await {
                warn!(error = %e, "failed to send message");
            }
        });
    }
}

async fn run_app(
    terminal: &mut Term,
    client: ChatClient,
    session: ChatSession,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut app = App::new(client, session);
    app.session.push_greeting(crate::GREETING);

    let mut view_rx = app.session.subscribe();
    let mut events = EventStream::new();

    loop {
        {
            let messages = view_rx.borrow_and_update().clone();
            terminal.draw(|frame| ui::draw(frame, &app.input, &messages))?;
        }

        tokio::select! {
            changed = view_rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            maybe_event = events.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        app.handle_key(key.code, key.modifiers);
                    }
                    Some(Ok(_)) => {} // resize etc: redraw on next pass
                    Some(Err(_)) | None => break,
                }
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
