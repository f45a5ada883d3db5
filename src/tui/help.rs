use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

const KEYBINDS: &[(&str, &str)] = &[
    ("Ctrl-R / F5", "Generate (submit code)"),
    ("Ctrl-L / F2", "Switch language"),
    ("Ctrl-S", "Save visualization"),
    ("Ctrl-Y", "Copy saved path to clipboard"),
    ("Ctrl-W", "Toggle line wrap"),
    ("F1", "Toggle this help"),
    ("Esc / Ctrl-C", "Quit"),
];

fn keybind_line(key: &str, action: &str) -> Line<'static> {
    Line::from(vec![
        Span::raw("  "),
        Span::styled(format!("{key:<14}"), Style::default().fg(Color::Magenta)),
        Span::raw(action.to_string()),
    ])
}

pub fn draw_help(area: Rect, f: &mut Frame) {
    let mut lines = vec![Line::from("Keybinds:")];
    lines.extend(KEYBINDS.iter().map(|(k, a)| keybind_line(k, a)));
    lines.extend([
        Line::from(""),
        Line::from("Editor:"),
        keybind_line("arrows", "Move cursor"),
        keybind_line("Home / End", "Start / end of line"),
        keybind_line("Tab", "Insert four spaces"),
        Line::from(""),
        Line::from("Results:"),
        Line::from("  PNG images are saved as-is."),
        Line::from("  HTML output is only ever saved inside a sandboxed frame"),
        Line::from("  (scripts allowed, no access to the host page or its storage)."),
    ]);

    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(p, area);
}
