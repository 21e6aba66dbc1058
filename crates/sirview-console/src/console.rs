//! Interactive terminal viewer.
//!
//! Left: the agent canvas for the current frame. Right: the S/I/R chart
//! over the sample history and the console output. Bottom: a slash-command
//! input with history.
//!
//! Launch with `sirview` or `sirview console`.

use std::io::{self, Stdout};
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame, Terminal,
};

use tokio::sync::mpsc;

use sirview_state::{DataSource, RunMode, SourceEvent, SourceOutcome, Tagged, TaskGuard};

use crate::render::{FrameRenderer, StatsChart};
use crate::session::Session;

const MAX_MESSAGES: usize = 500;

/// Redraw and input poll period while idle.
const FRAME_PERIOD: Duration = Duration::from_millis(20);

pub struct ViewerConsole {
    session: Session,
    renderer: FrameRenderer,
    chart: StatsChart,
    /// Current text in the input field.
    input: String,
    /// Cursor position within the input field, in chars.
    cursor_pos: usize,
    /// Command history for up/down arrow navigation.
    history: Vec<String>,
    history_pos: Option<usize>,
    console_messages: Vec<(chrono::DateTime<chrono::Utc>, String, Color)>,
    /// Replies from commands that run in the background.
    replies: mpsc::UnboundedSender<(String, Color)>,
    reply_rx: mpsc::UnboundedReceiver<(String, Color)>,
    health_check: Option<TaskGuard>,
    quit: bool,
}

impl ViewerConsole {
    pub fn new(session: Session, renderer: FrameRenderer) -> Self {
        let (replies, reply_rx) = mpsc::unbounded_channel();
        let mut console = Self {
            session,
            renderer,
            chart: StatsChart,
            input: String::new(),
            cursor_pos: 0,
            history: Vec::new(),
            history_pos: None,
            console_messages: Vec::new(),
            replies,
            reply_rx,
            health_check: None,
            quit: false,
        };
        console.add_message("SIR simulation viewer ready.", Color::Cyan);
        console.add_message(
            "Commands: /batch, /live, /stop, /pause, /play, /reset, /set, /params, /health, /help, /quit",
            Color::DarkGray,
        );
        console
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.console_messages.iter().map(|(_, m, _)| m.as_str())
    }

    /// Feed one background event to the session and report what it did.
    pub fn apply(&mut self, event: Tagged<SourceEvent>) {
        let mode = self.session.mode();
        match self.session.handle(event) {
            SourceOutcome::Ignored | SourceOutcome::Applied => {}
            SourceOutcome::Started { frames: Some(n) } => {
                self.add_message(&format!("Loaded {n} frames, playing."), Color::Green);
            }
            SourceOutcome::Started { frames: None } => {
                self.add_message("Live stream connected.", Color::Green);
            }
            SourceOutcome::Finished => match mode {
                Some(RunMode::Live) => self.add_message("Live stream ended.", Color::Yellow),
                _ => {
                    let step = self
                        .session
                        .view()
                        .current_frame()
                        .map(|f| f.step)
                        .unwrap_or_default();
                    self.add_message(
                        &format!("Playback finished at step {step}. /reset to replay."),
                        Color::Cyan,
                    );
                }
            },
            SourceOutcome::Dropped(e) => {
                self.add_message(&format!("Skipped a stream message: {e}"), Color::Yellow);
            }
            SourceOutcome::Failed(e) => {
                self.add_message(&format!("Run failed: {e}"), Color::Red);
            }
        }
    }

    /// Post the replies of background commands that have completed.
    pub fn collect_replies(&mut self) {
        while let Ok((msg, color)) = self.reply_rx.try_recv() {
            self.add_message(&msg, color);
        }
    }

    /// Submit the current input line.
    pub fn process_input(&mut self) {
        let input = self.input.trim().to_string();
        self.input.clear();
        self.cursor_pos = 0;
        if input.is_empty() {
            return;
        }

        self.history.push(input.clone());
        self.history_pos = None;

        if input.starts_with('/') {
            self.process_command(&input);
        } else {
            self.add_message(
                &format!("Unknown input '{input}'. Commands start with '/', try /help."),
                Color::Yellow,
            );
        }
    }

    fn process_command(&mut self, cmd: &str) {
        let mut parts = cmd.split_whitespace();
        let command = parts.next().unwrap_or_default();
        let args: Vec<&str> = parts.collect();

        match command {
            "/help" => {
                self.add_message("Available commands:", Color::Cyan);
                for line in [
                    "  /batch               - Fetch a complete run and replay it",
                    "  /live                - Follow the live stream",
                    "  /stop                - Stop the current run, keep the picture",
                    "  /pause, /play        - Control batch playback",
                    "  /reset               - Rewind batch playback to step 0",
                    "  /set <field> <value> - population, duration, transmission, recovery, speed",
                    "  /params              - Show the parameters for the next run",
                    "  /health              - Ping the simulation service",
                    "  /quit                - Exit",
                ] {
                    self.add_message(line, Color::White);
                }
            }
            "/batch" | "/run" => {
                let generation = self.session.start_batch();
                self.add_message(
                    &format!("Requesting batch run {generation}..."),
                    Color::White,
                );
            }
            "/live" | "/stream" => {
                let generation = self.session.start_live();
                self.add_message(&format!("Connecting live run {generation}..."), Color::White);
            }
            "/stop" => {
                self.session.stop();
                self.add_message("Stopped.", Color::White);
            }
            "/pause" => match self.session.pause() {
                Ok(()) => self.add_message("Paused.", Color::White),
                Err(e) => self.add_message(&format!("Cannot pause: {e}"), Color::Yellow),
            },
            "/play" | "/resume" => match self.session.play() {
                Ok(()) => self.add_message("Playing.", Color::White),
                Err(e) => self.add_message(&format!("Cannot play: {e}"), Color::Yellow),
            },
            "/reset" => match self.session.reset() {
                Ok(()) => self.add_message("Rewound to step 0.", Color::White),
                Err(e) => self.add_message(&format!("Cannot reset: {e}"), Color::Yellow),
            },
            "/set" => match args.as_slice() {
                [field, value] => match self.session.set_param(field, value) {
                    Ok(()) => self.add_message(
                        &format!("{field} = {value} (applies to the next run)"),
                        Color::Green,
                    ),
                    Err(e) => self.add_message(&e.to_string(), Color::Red),
                },
                _ => self.add_message("Usage: /set <field> <value>", Color::Yellow),
            },
            "/params" => {
                let p = self.session.params().clone();
                self.add_message(
                    &format!(
                        "population={} duration={} transmission={} recovery={} speed={}",
                        p.population_size,
                        p.duration,
                        p.transmission_rate,
                        p.recovery_rate,
                        p.movement_speed
                    ),
                    Color::White,
                );
            }
            "/health" => {
                if self.health_check.as_ref().is_some_and(|t| !t.is_finished()) {
                    self.add_message("A health check is already running.", Color::Yellow);
                    return;
                }
                let client = self.session.client().clone();
                let replies = self.replies.clone();
                let task = tokio::spawn(async move {
                    let reply = match client.health().await {
                        Ok(body) => (format!("Service: {}", body.trim()), Color::Green),
                        Err(e) => (format!("Health check failed: {e}"), Color::Red),
                    };
                    let _ = replies.send(reply);
                });
                self.health_check = Some(TaskGuard::new(task.abort_handle()));
                self.add_message("Checking service health...", Color::DarkGray);
            }
            "/quit" | "/exit" | "/q" => {
                self.quit = true;
            }
            other => {
                self.add_message(
                    &format!("Unknown command: {other}. Type /help for available commands."),
                    Color::Yellow,
                );
            }
        }
    }

    fn add_message(&mut self, msg: &str, color: Color) {
        self.console_messages
            .push((chrono::Utc::now(), msg.to_string(), color));
        if self.console_messages.len() > MAX_MESSAGES {
            self.console_messages.remove(0);
        }
    }

    // -----------------------------------------------------------------------
    // Rendering
    // -----------------------------------------------------------------------

    pub fn render(&self, frame: &mut Frame) {
        let outer = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Status bar
                Constraint::Min(10),   // Canvas + chart + output
                Constraint::Length(4), // Input
            ])
            .split(frame.area());

        self.render_status_bar(frame, outer[0]);
        self.render_main_area(frame, outer[1]);
        self.render_input(frame, outer[2]);
    }

    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .title(" SIR Simulation Viewer ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));

        let source = self.session.active();
        let mode = source.map_or("-".to_string(), |s| s.mode().to_string());
        let phase = source.map_or("idle", |s| s.phase_name());
        let phase_color = match phase {
            "playing" | "streaming" => Color::Green,
            "loading" | "connecting" => Color::Yellow,
            "paused" => Color::Cyan,
            _ => Color::DarkGray,
        };
        let step = self
            .session
            .view()
            .current_frame()
            .map_or("-".to_string(), |f| f.step.to_string());
        let position = match (source.and_then(|s| s.progress()), self.session.mode()) {
            (Some((index, total)), _) => format!("{}/{}", index + 1, total),
            (None, Some(RunMode::Live)) => format!(
                "{} recv, {} dropped",
                self.session.live().received(),
                self.session.live().dropped()
            ),
            _ => "-".to_string(),
        };

        let status_line = Line::from(vec![
            Span::styled("  Server: ", Style::default().fg(Color::Gray)),
            Span::styled(
                self.session.client().config().base_url.clone(),
                Style::default().fg(Color::White),
            ),
            Span::styled("  |  Mode: ", Style::default().fg(Color::Gray)),
            Span::styled(mode, Style::default().fg(Color::Magenta)),
            Span::styled("  |  State: ", Style::default().fg(Color::Gray)),
            Span::styled(phase, Style::default().fg(phase_color)),
            Span::styled("  |  Step: ", Style::default().fg(Color::Gray)),
            Span::styled(step, Style::default().fg(Color::White)),
            Span::styled("  |  Frame: ", Style::default().fg(Color::Gray)),
            Span::styled(position, Style::default().fg(Color::LightCyan)),
        ]);

        frame.render_widget(Paragraph::new(status_line).block(block), area);
    }

    fn render_main_area(&self, frame: &mut Frame, area: Rect) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(area);

        self.renderer
            .render(frame, columns[0], self.session.view().current_frame());

        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(8), Constraint::Length(10)])
            .split(columns[1]);

        self.chart
            .render(frame, right[0], self.session.view().history());
        self.render_console_output(frame, right[1]);
    }

    fn render_console_output(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .title(" Console Output ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White));

        let inner_height = area.height.saturating_sub(2) as usize;
        let start = self.console_messages.len().saturating_sub(inner_height);
        let lines: Vec<Line> = self.console_messages[start..]
            .iter()
            .map(|(ts, msg, color)| {
                Line::from(vec![
                    Span::styled(
                        format!(" [{}] ", ts.format("%H:%M:%S")),
                        Style::default().fg(Color::DarkGray),
                    ),
                    Span::styled(msg.as_str(), Style::default().fg(*color)),
                ])
            })
            .collect();

        frame.render_widget(Paragraph::new(lines).block(block), area);
    }

    fn render_input(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .title(" Command (/help for commands, /quit or Ctrl+C to exit) ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Green));

        let input_line = if self.input.is_empty() {
            Line::from(vec![
                Span::styled("  > ", Style::default().fg(Color::Green)),
                Span::styled("/batch, /live, /pause ...", Style::default().fg(Color::DarkGray)),
            ])
        } else {
            Line::from(vec![
                Span::styled("  > ", Style::default().fg(Color::Green)),
                Span::styled(self.input.as_str(), Style::default().fg(Color::White)),
            ])
        };
        let hint_line = Line::from(Span::styled(
            "  Up/Down for history  |  Enter to submit",
            Style::default().fg(Color::DarkGray),
        ));

        frame.render_widget(
            Paragraph::new(vec![input_line, hint_line]).block(block),
            area,
        );

        let cursor_x = area.x + 5 + self.cursor_pos as u16;
        frame.set_cursor_position((cursor_x, area.y + 1));
    }

    // -----------------------------------------------------------------------
    // Keyboard
    // -----------------------------------------------------------------------

    fn byte_index(&self) -> usize {
        self.input
            .char_indices()
            .nth(self.cursor_pos)
            .map_or(self.input.len(), |(i, _)| i)
    }

    /// Handle an editing key. Returns `true` if the console should exit.
    pub fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> bool {
        let char_len = self.input.chars().count();
        match (code, modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => return true,
            (KeyCode::Char(c), _) => {
                let at = self.byte_index();
                self.input.insert(at, c);
                self.cursor_pos += 1;
            }
            (KeyCode::Backspace, _) => {
                if self.cursor_pos > 0 {
                    self.cursor_pos -= 1;
                    let at = self.byte_index();
                    self.input.remove(at);
                }
            }
            (KeyCode::Delete, _) => {
                if self.cursor_pos < char_len {
                    let at = self.byte_index();
                    self.input.remove(at);
                }
            }
            (KeyCode::Left, _) => {
                self.cursor_pos = self.cursor_pos.saturating_sub(1);
            }
            (KeyCode::Right, _) => {
                if self.cursor_pos < char_len {
                    self.cursor_pos += 1;
                }
            }
            (KeyCode::Home, _) => self.cursor_pos = 0,
            (KeyCode::End, _) => self.cursor_pos = char_len,
            (KeyCode::Esc, _) => {
                self.input.clear();
                self.cursor_pos = 0;
                self.history_pos = None;
            }
            (KeyCode::Up, _) => {
                if !self.history.is_empty() {
                    let pos = match self.history_pos {
                        Some(p) => p.saturating_sub(1),
                        None => self.history.len() - 1,
                    };
                    self.history_pos = Some(pos);
                    self.input = self.history[pos].clone();
                    self.cursor_pos = self.input.chars().count();
                }
            }
            (KeyCode::Down, _) => {
                if let Some(pos) = self.history_pos {
                    if pos + 1 < self.history.len() {
                        self.history_pos = Some(pos + 1);
                        self.input = self.history[pos + 1].clone();
                        self.cursor_pos = self.input.chars().count();
                    } else {
                        self.history_pos = None;
                        self.input.clear();
                        self.cursor_pos = 0;
                    }
                }
            }
            _ => {}
        }
        false
    }
}

fn setup_terminal() -> io::Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    Terminal::new(CrosstermBackend::new(stdout))
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Run the interactive viewer until the user quits.
pub async fn run_console(
    console: ViewerConsole,
    events: sirview_state::EventReceiver,
) -> Result<(), anyhow::Error> {
    use std::io::IsTerminal;
    if !io::stdin().is_terminal() || !io::stdout().is_terminal() {
        return Err(anyhow::anyhow!(
            "The console requires a terminal (TTY). Use `sirview run` or `sirview stream` instead."
        ));
    }

    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    let mut terminal = setup_terminal()?;
    let result = event_loop(&mut terminal, console, events).await;
    restore_terminal(&mut terminal)?;
    result
}

async fn event_loop<B: Backend>(
    terminal: &mut Terminal<B>,
    mut console: ViewerConsole,
    mut events: sirview_state::EventReceiver,
) -> Result<(), anyhow::Error> {
    loop {
        // Apply everything that arrived since the last draw, in order.
        while let Ok(event) = events.try_recv() {
            console.apply(event);
        }
        console.collect_replies();

        terminal.draw(|frame| console.render(frame))?;

        if event::poll(FRAME_PERIOD)? {
            if let Event::Key(key_event) = event::read()? {
                if key_event.kind == KeyEventKind::Press {
                    if key_event.code == KeyCode::Enter {
                        console.process_input();
                    } else if console.handle_key(key_event.code, key_event.modifiers) {
                        break;
                    }
                }
            }
        }
        if console.should_quit() {
            break;
        }
        // Let spawned request and stream tasks make progress between polls.
        tokio::task::yield_now().await;
    }

    console.session.stop();
    Ok(())
}
