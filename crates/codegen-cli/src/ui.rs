//! TUI implementation for codegen

use std::io::{self, Stdout};
use std::time::Instant;

use codegen_ai::UsageQuota;
use codegen_ai::Message;
use codegen_session::{ConversationState, RequestCoordinator, SessionEvent, TranscriptStore};
use codegen_tui::{
    Theme,
    input::{Action, event_to_action},
    widgets::{EmptyState, Spinner, TranscriptView, spinner::FRAME_INTERVAL},
};
use crossterm::event::{Event, EventStream};
use futures::StreamExt;
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState},
};
use tokio::sync::mpsc;

use crate::form::{FormError, PromptForm};

/// Messages delivered to the UI from outside the session
#[derive(Debug)]
pub enum UiMessage {
    /// Fresh usage numbers
    Quota(UsageQuota),
}

/// Left side of the status bar
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Ready,
    /// Submit was rejected by the form
    Invalid(String),
    Failed(String),
    Cancelling,
    Cancelled,
}

/// What the event loop should do after an input
#[derive(Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Submit(String),
    Abort,
    Quit,
}

/// TUI application state
pub struct TuiState {
    /// Shared with the coordinator, read on every frame
    transcript: TranscriptStore,
    form: PromptForm,
    pending: bool,
    /// Lines skipped from the top (the newest end)
    scroll: usize,
    /// Height of the transcript area at the last render
    page: usize,
    status: Status,
    quota: Option<UsageQuota>,
    title: String,
    theme: Theme,
    spinner_start: Instant,
}

impl TuiState {
    pub fn new(transcript: TranscriptStore, title: impl Into<String>, theme: Theme) -> Self {
        Self {
            transcript,
            form: PromptForm::new(),
            pending: false,
            scroll: 0,
            page: 10,
            status: Status::Ready,
            quota: None,
            title: title.into(),
            theme,
            spinner_start: Instant::now(),
        }
    }

    /// What the transcript area shows this frame
    fn snapshot(&self) -> ConversationState {
        self.transcript.snapshot(self.pending)
    }

    /// Handle a terminal event
    pub fn handle_event(&mut self, event: Event, width: u16) -> Flow {
        match event_to_action(event) {
            Some(action) => self.handle_action(action, width),
            None => Flow::Continue,
        }
    }

    /// Handle keyboard action
    pub fn handle_action(&mut self, action: Action, width: u16) -> Flow {
        match action {
            Action::Submit => match self.form.submit() {
                Ok(prompt) => {
                    self.status = Status::Ready;
                    Flow::Submit(prompt.into_string())
                }
                Err(FormError::Disabled) => Flow::Continue,
                Err(e @ FormError::Validation(_)) => {
                    self.status = Status::Invalid(e.to_string());
                    Flow::Continue
                }
            },
            Action::Quit => Flow::Quit,
            Action::Interrupt | Action::Escape => {
                if self.pending {
                    self.status = Status::Cancelling;
                    Flow::Abort
                } else {
                    Flow::Quit
                }
            }
            Action::PageUp => {
                self.scroll = self.scroll.saturating_sub(self.page.max(1));
                Flow::Continue
            }
            Action::PageDown => {
                self.scroll = self.scroll.saturating_add(self.page.max(1));
                Flow::Continue
            }
            action => {
                if self.form.handle_action(&action, width)
                    && matches!(self.status, Status::Invalid(_))
                {
                    self.status = Status::Ready;
                }
                Flow::Continue
            }
        }
    }

    pub fn handle_session_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::PendingChanged { pending } => {
                self.pending = pending;
                self.form.set_pending(pending);
                if pending {
                    self.spinner_start = Instant::now();
                    self.status = Status::Ready;
                }
            }
            SessionEvent::MessagesAppended { .. } => {
                // newest reply is at the top
                self.scroll = 0;
            }
            SessionEvent::RequestFailed { kind, message } => {
                self.status = Status::Failed(format!("Request failed ({}): {}", kind, message));
            }
            SessionEvent::RequestCancelled => {
                self.status = Status::Cancelled;
            }
        }
    }

    pub fn handle_message(&mut self, msg: UiMessage) {
        match msg {
            UiMessage::Quota(quota) => self.quota = Some(quota),
        }
    }

    /// Render the UI
    pub fn render(&mut self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(1),    // Transcript
                Constraint::Length(1), // Status
                Constraint::Length(3), // Prompt
            ])
            .split(frame.area());

        self.render_transcript(frame, chunks[0]);
        self.render_status(frame, chunks[1]);
        self.form.render(chunks[2], frame.buffer_mut(), &self.theme);
    }

    fn render_transcript(&mut self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(self.theme.border_style())
            .title(format!(" codegen │ {} ", self.title));

        let mut inner = block.inner(area);
        frame.render_widget(block, area);

        if inner.height == 0 {
            return;
        }

        let snapshot = self.snapshot();
        if snapshot.shows_placeholder() {
            frame.render_widget(EmptyState::new(&self.theme), inner);
            return;
        }

        if self.pending {
            let rows = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(1), Constraint::Min(0)])
                .split(inner);
            let spinner = Spinner::new("Thinking...", &self.theme)
                .with_start_time(self.spinner_start);
            frame.render_widget(spinner, rows[0]);
            inner = rows[1];
        }

        let newest: Vec<Message> = snapshot.newest_first().cloned().collect();
        let view = TranscriptView::new(&newest, &self.theme);
        let content_height = view.line_count(inner.width as usize);
        let visible = inner.height as usize;

        self.page = visible;
        self.scroll = self.scroll.min(content_height.saturating_sub(visible));
        frame.render_widget(view.scroll(self.scroll), inner);

        if content_height > visible {
            let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .begin_symbol(Some("↑"))
                .end_symbol(Some("↓"))
                .track_symbol(Some("│"))
                .thumb_symbol("█");

            let mut scrollbar_state = ScrollbarState::new(content_height)
                .position(self.scroll)
                .viewport_content_length(visible);

            frame.render_stateful_widget(scrollbar, inner, &mut scrollbar_state);
        }
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        let (left, left_style): (&str, Style) = match &self.status {
            Status::Ready if self.pending => ("Generating...", self.theme.dim_style()),
            Status::Ready => ("Ready", self.theme.dim_style()),
            Status::Invalid(msg) => (msg, self.theme.warning_style()),
            Status::Failed(msg) => (msg, self.theme.error_style()),
            Status::Cancelling => ("Cancelling...", self.theme.warning_style()),
            Status::Cancelled => ("Request cancelled", self.theme.dim_style()),
        };

        let keys = if self.pending {
            "Esc: abort │ Ctrl+Q: quit"
        } else {
            "Enter: send │ Esc: quit"
        };
        let right = match self.quota {
            Some(quota) => format!("{} │ {}", quota, keys),
            None => keys.to_string(),
        };
        let right_style = match self.quota {
            Some(quota) if quota.is_exhausted() => self.theme.warning_style(),
            _ => self.theme.dim_style(),
        };

        let left_width = left.chars().count();
        let right_width = right.chars().count();
        let available = area.width as usize;

        let line = if left_width + right_width + 2 <= available {
            let spacing = available - left_width - right_width;
            Line::from(vec![
                Span::styled(left, left_style),
                Span::raw(" ".repeat(spacing)),
                Span::styled(right, right_style),
            ])
        } else {
            Line::from(Span::styled(left, left_style))
        };

        frame.render_widget(Paragraph::new(line), area);
    }
}

type Term = Terminal<CrosstermBackend<Stdout>>;

/// Run the TUI application until the user quits
pub async fn run_tui(
    coordinator: &RequestCoordinator,
    ui_rx: mpsc::UnboundedReceiver<UiMessage>,
    title: &str,
    theme: Theme,
) -> anyhow::Result<()> {
    use crossterm::{
        execute,
        terminal::{EnterAlternateScreen, enable_raw_mode},
    };

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let state = TuiState::new(coordinator.transcript().clone(), title, theme);
    let result = event_loop(&mut terminal, coordinator, ui_rx, state).await;

    restore_terminal(&mut terminal)?;
    result
}

fn restore_terminal(terminal: &mut Term) -> anyhow::Result<()> {
    use crossterm::{
        execute,
        terminal::{LeaveAlternateScreen, disable_raw_mode},
    };

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

async fn event_loop(
    terminal: &mut Term,
    coordinator: &RequestCoordinator,
    mut ui_rx: mpsc::UnboundedReceiver<UiMessage>,
    mut state: TuiState,
) -> anyhow::Result<()> {
    let mut session_rx = coordinator.subscribe();
    // abort without borrowing the coordinator while a submit is running
    let handle = coordinator.handle();
    let mut event_stream = EventStream::new();
    let mut tick_interval = tokio::time::interval(FRAME_INTERVAL);
    let mut queued: Option<String> = None;

    loop {
        if let Some(prompt) = queued.take() {
            let mut submit = std::pin::pin!(coordinator.submit(&prompt));

            loop {
                terminal.draw(|frame| state.render(frame))?;
                let width = terminal.size()?.width;

                tokio::select! {
                    biased;

                    outcome = &mut submit => {
                        tracing::debug!(?outcome, "submit settled");
                        break;
                    }

                    Ok(event) = session_rx.recv() => {
                        state.handle_session_event(event);
                    }

                    event = event_stream.next() => {
                        match event {
                            Some(Ok(event)) => match state.handle_event(event, width) {
                                Flow::Abort => handle.abort(),
                                Flow::Quit => return Ok(()),
                                Flow::Submit(_) | Flow::Continue => {}
                            },
                            Some(Err(e)) => return Err(e.into()),
                            None => return Ok(()),
                        }
                    }

                    Some(msg) = ui_rx.recv() => {
                        state.handle_message(msg);
                    }

                    _ = tick_interval.tick() => {}
                }
            }

            while let Ok(event) = session_rx.try_recv() {
                state.handle_session_event(event);
            }
            continue;
        }

        terminal.draw(|frame| state.render(frame))?;
        let width = terminal.size()?.width;

        tokio::select! {
            biased;

            Ok(event) = session_rx.recv() => {
                state.handle_session_event(event);
            }

            event = event_stream.next() => {
                match event {
                    Some(Ok(event)) => match state.handle_event(event, width) {
                        Flow::Submit(prompt) => queued = Some(prompt),
                        Flow::Abort => handle.abort(),
                        Flow::Quit => return Ok(()),
                        Flow::Continue => {}
                    },
                    Some(Err(e)) => return Err(e.into()),
                    None => return Ok(()),
                }
            }

            Some(msg) = ui_rx.recv() => {
                state.handle_message(msg);
            }

            // only the spinner animates, so idle frames need no tick
        }
    }
}
