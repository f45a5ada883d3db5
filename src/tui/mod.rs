mod export;
mod help;
mod state;

use crate::cli::{read_code, Cli};
use crate::config::Settings;
use crate::engine::HttpBackend;
use crate::model::{ExecutionRequest, Language, RunState};
use crate::orchestrator::{self, SubmissionController, UiCommand};
use crate::presenter::{View, DOCUMENT_SANDBOX};
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use export::{copy_saved_path, save_current_artifact};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Terminal,
};
use state::{CodeBuffer, UiState};
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::sync::watch;

/// What the event loop should do after a key press.
#[derive(Debug, PartialEq)]
enum KeyAction {
    None,
    Submit(ExecutionRequest),
    Save,
    CopyPath,
    Quit,
}

pub async fn run(args: Cli, settings: Settings) -> Result<()> {
    let initial_code = read_code(&args, false)?.unwrap_or_default();
    let backend = HttpBackend::new(settings.endpoint.clone(), &settings.user_agent)?;
    let controller = SubmissionController::new(backend);
    let state_rx = controller.subscribe();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    tracing::info!(endpoint = %settings.endpoint, "starting interactive session");

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let ui_handle =
        std::thread::spawn(move || run_threaded(settings, initial_code, state_rx, cmd_tx));

    let res = orchestrator::run_controller(controller, cmd_rx).await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    res
}

/// Run the TUI loop on a dedicated thread. Reads run state, never writes it.
fn run_threaded(
    settings: Settings,
    initial_code: String,
    mut state_rx: watch::Receiver<RunState>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    let mut state = UiState::default();
    state.language = settings.language;
    state.editor = CodeBuffer::from_text(&initial_code);
    state.endpoint = settings.endpoint;
    state.save_dir = settings.save_dir;

    let tick_rate = Duration::from_millis(50);
    let mut last_tick = Instant::now();
    let mut dirty = true;

    let res = loop {
        if state_rx.has_changed().unwrap_or(false) {
            let snapshot = state_rx.borrow_and_update().clone();
            state.observe(snapshot);
            dirty = true;
        }

        if dirty || last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &state)).ok();
            last_tick = Instant::now();
            dirty = false;
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                dirty = true;
                match handle_key(&mut state, k) {
                    KeyAction::None => {}
                    KeyAction::Submit(request) => {
                        if cmd_tx.send(UiCommand::Submit(request)).is_err() {
                            break Err(anyhow::anyhow!("submission controller stopped"));
                        }
                    }
                    KeyAction::Save => save_current_artifact(&mut state),
                    KeyAction::CopyPath => copy_saved_path(&mut state),
                    KeyAction::Quit => {
                        let _ = cmd_tx.send(UiCommand::Quit);
                        break Ok(());
                    }
                }
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

fn handle_key(state: &mut UiState, k: KeyEvent) -> KeyAction {
    let ctrl = k.modifiers.contains(KeyModifiers::CONTROL);
    match k.code {
        KeyCode::Esc => KeyAction::Quit,
        KeyCode::Char('c') if ctrl => KeyAction::Quit,
        KeyCode::Char('r') if ctrl => submit(state),
        KeyCode::F(5) => submit(state),
        KeyCode::Char('l') if ctrl => {
            state.cycle_language();
            KeyAction::None
        }
        KeyCode::F(2) => {
            state.cycle_language();
            KeyAction::None
        }
        KeyCode::Char('w') if ctrl => {
            state.toggle_wrap();
            KeyAction::None
        }
        KeyCode::Char('s') if ctrl => KeyAction::Save,
        KeyCode::Char('y') if ctrl => KeyAction::CopyPath,
        KeyCode::F(1) => {
            state.show_help = !state.show_help;
            KeyAction::None
        }
        KeyCode::Enter => {
            state.editor.insert_newline();
            KeyAction::None
        }
        KeyCode::Backspace => {
            state.editor.backspace();
            KeyAction::None
        }
        KeyCode::Delete => {
            state.editor.delete();
            KeyAction::None
        }
        KeyCode::Left => {
            state.editor.move_left();
            KeyAction::None
        }
        KeyCode::Right => {
            state.editor.move_right();
            KeyAction::None
        }
        KeyCode::Up => {
            state.editor.move_up();
            KeyAction::None
        }
        KeyCode::Down => {
            state.editor.move_down();
            KeyAction::None
        }
        KeyCode::Home => {
            state.editor.home();
            KeyAction::None
        }
        KeyCode::End => {
            state.editor.end();
            KeyAction::None
        }
        KeyCode::Tab => {
            state.editor.insert_str("    ");
            KeyAction::None
        }
        KeyCode::Char(c) if !ctrl && !k.modifiers.contains(KeyModifiers::ALT) => {
            state.editor.insert_char(c);
            KeyAction::None
        }
        _ => KeyAction::None,
    }
}

fn submit(state: &mut UiState) -> KeyAction {
    match state.begin_submit() {
        Some(request) => KeyAction::Submit(request),
        None => KeyAction::None,
    }
}

fn push_wrapped_status_kv(
    out: &mut Vec<Line<'static>>,
    label: &str,
    value: &str,
    status_area_width: u16,
) {
    let value = value.trim();
    if value.is_empty() {
        return;
    }

    // Account for borders (2 chars on each side)
    let usable_width = status_area_width.saturating_sub(4).max(1);
    let label_text = format!("{label}:");
    let label_width = label_text.chars().count() as u16;

    let value_chars: Vec<char> = value.chars().collect();
    let mut remaining = value_chars.as_slice();
    let mut first = true;

    while !remaining.is_empty() {
        let line_width = if first {
            usable_width.saturating_sub(label_width + 1).max(1)
        } else {
            usable_width.saturating_sub(2).max(1)
        };

        let chars_to_take = remaining.len().min(line_width as usize);
        let (line_chars, rest) = remaining.split_at(chars_to_take);
        let line_text: String = line_chars.iter().collect();

        if first {
            out.push(Line::from(vec![
                Span::styled(label_text.clone(), Style::default().fg(Color::Gray)),
                Span::raw(" "),
                Span::raw(line_text),
            ]));
            first = false;
        } else {
            out.push(Line::from(vec![Span::raw("  "), Span::raw(line_text)]));
        }

        remaining = rest;
    }
}

fn format_size(bytes: usize) -> String {
    const KIB: f64 = 1024.0;
    let b = bytes as f64;
    if b >= KIB * KIB {
        format!("{:.1} MiB", b / (KIB * KIB))
    } else if b >= KIB {
        format!("{:.1} KiB", b / KIB)
    } else {
        format!("{bytes} B")
    }
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let main = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Percentage(45),
            Constraint::Length(3),
            Constraint::Min(6),
            Constraint::Length(4),
        ])
        .split(area);

    draw_language(main[0], f, state);
    draw_editor(main[1], f, state);
    draw_submit(main[2], f, state);
    if state.show_help {
        help::draw_help(main[3], f);
    } else {
        draw_result(main[3], f, state.view());
    }
    draw_status(main[4], f, state);
}

fn draw_language(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let mut spans = vec![Span::styled(
        "Language: ",
        Style::default().fg(Color::Gray),
    )];
    for lang in Language::ALL {
        let style = if lang == state.language {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(format!(" {} ", lang.label()), style));
        spans.push(Span::raw(" "));
    }
    spans.push(Span::styled(
        "  (Ctrl-L to switch)",
        Style::default().fg(Color::DarkGray),
    ));

    let p = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL).title("vizrun"));
    f.render_widget(p, area);
}

fn draw_editor(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let title = format!("Code ({})", state.language.as_str());
    let block = Block::default().borders(Borders::ALL).title(title);
    let inner_h = area.height.saturating_sub(2).max(1) as usize;
    let inner_w = area.width.saturating_sub(2).max(1) as usize;
    let (row, col) = state.editor.cursor();

    let buffer_empty = state.editor.lines().len() == 1 && state.editor.lines()[0].is_empty();
    if buffer_empty {
        let p = Paragraph::new(Line::from(Span::styled(
            "Enter your visualization code here...",
            Style::default().fg(Color::DarkGray),
        )))
        .block(block);
        f.render_widget(p, area);
        f.set_cursor_position((area.x + 1, area.y + 1));
        return;
    }

    let lines: Vec<Line> = state
        .editor
        .lines()
        .iter()
        .map(|l| Line::from(l.as_str()))
        .collect();

    let row_off = row.saturating_sub(inner_h - 1);
    if state.wrap {
        // Cursor placement under soft wrap is not tracked; keep the cursor hidden.
        let p = Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: false })
            .scroll((row_off as u16, 0));
        f.render_widget(p, area);
    } else {
        let col_off = col.saturating_sub(inner_w - 1);
        let p = Paragraph::new(lines)
            .block(block)
            .scroll((row_off as u16, col_off as u16));
        f.render_widget(p, area);
        f.set_cursor_position((
            area.x + 1 + (col - col_off) as u16,
            area.y + 1 + (row - row_off) as u16,
        ));
    }
}

fn draw_submit(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let view = state.view();
    let button_style = if state.can_submit() {
        Style::default()
            .fg(Color::Black)
            .bg(Color::Green)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Gray).bg(Color::DarkGray)
    };
    let line = Line::from(vec![
        Span::styled(format!(" {} ", view.submit_label()), button_style),
        Span::raw("  "),
        Span::styled(
            "Ctrl-R run · Ctrl-S save · F1 help · Esc quit",
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
    f.render_widget(p, area);
}

fn draw_result(area: Rect, f: &mut ratatui::Frame, view: &View) {
    let gray = Style::default().fg(Color::Gray);
    let block = Block::default().borders(Borders::ALL).title(view.title());

    let p = match view {
        View::Idle => Paragraph::new(Line::from(Span::styled(
            "No visualization yet. Write some code and press Ctrl-R.",
            Style::default().fg(Color::DarkGray),
        ))),
        View::Pending => Paragraph::new(Line::from(Span::styled(
            "Waiting for the execution service…",
            Style::default().fg(Color::Yellow),
        ))),
        View::Image(img) => {
            let mut lines = vec![
                Line::from(vec![
                    Span::styled("Type: ", gray),
                    Span::raw(img.mime_type.clone()),
                ]),
                Line::from(vec![
                    Span::styled("Size: ", gray),
                    Span::raw(format_size(img.size_bytes)),
                ]),
            ];
            if let Some((w, h)) = img.dimensions {
                lines.push(Line::from(vec![
                    Span::styled("Dimensions: ", gray),
                    Span::raw(format!("{w} x {h} px")),
                ]));
            }
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                "Press Ctrl-S to save the image.",
                Style::default().fg(Color::Cyan),
            )));
            Paragraph::new(lines)
        }
        View::Document(doc) => Paragraph::new(vec![
            Line::from(vec![
                Span::styled("Type: ", gray),
                Span::raw("text/html"),
            ]),
            Line::from(vec![
                Span::styled("Size: ", gray),
                Span::raw(format_size(doc.markup_bytes)),
            ]),
            Line::from(vec![
                Span::styled("Isolation: ", gray),
                Span::raw(format!("sandboxed frame (sandbox=\"{DOCUMENT_SANDBOX}\")")),
            ]),
            Line::from(""),
            Line::from(Span::styled(
                "Press Ctrl-S to save the sandboxed page, then open it in a browser.",
                Style::default().fg(Color::Cyan),
            )),
        ])
        .wrap(Wrap { trim: true }),
        View::Error(notice) => Paragraph::new(Line::from(Span::styled(
            notice.message.clone(),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )))
        .wrap(Wrap { trim: true }),
    };

    f.render_widget(p.block(block), area);
}

fn draw_status(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let mut lines = vec![Line::from(vec![
        Span::styled("Endpoint: ", Style::default().fg(Color::Gray)),
        Span::raw(state.endpoint.clone()),
        Span::raw("   "),
        Span::styled("Wrap: ", Style::default().fg(Color::Gray)),
        Span::styled(
            if state.wrap { "ON" } else { "OFF" },
            if state.wrap {
                Style::default().fg(Color::Green)
            } else {
                Style::default().fg(Color::Red)
            },
        ),
    ])];
    push_wrapped_status_kv(&mut lines, "Info", &state.info, area.width);

    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(p, area);
}
