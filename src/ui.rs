use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};

use crate::{
    data::flag_path,
    machine::{Mode, Panel},
    state::AppState,
};

/// Splits the frame into map and side panel.
fn columns(area: Rect) -> [Rect; 2] {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(75), Constraint::Percentage(25)].as_ref())
        .split(area);
    [chunks[0], chunks[1]]
}

/// Inner area of the map block for a frame of this size.
pub fn map_area(area: Rect) -> Rect {
    Block::default().borders(Borders::ALL).inner(columns(area)[0])
}

pub fn draw(f: &mut Frame<'_>, state: &mut AppState) {
    let [map_chunk, side] = columns(f.area());
    state.set_map_area(map_area(f.area()));

    // Map
    let mut title = match state.machine.mode() {
        Mode::Selection => "Globe – selection".to_string(),
        Mode::Test | Mode::Interim => "Globe – test".to_string(),
    };
    let zoom = state.map.view().scale;
    if zoom > 1.0 {
        title.push_str(&format!(" (x{zoom:.1})"));
    }
    state.map.render(f, map_chunk, &title);

    // Side panel: tools for the current mode + help
    let side_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(6), Constraint::Length(8)].as_ref())
        .split(side);

    match state.machine.panel() {
        Panel::SelectionTools => draw_selection_tools(f, state, side_chunks[0]),
        Panel::TestTools => draw_test_tools(f, state, side_chunks[0]),
    }

    let help = Paragraph::new(format!("{}\n\n{}", state.status, AppState::HELP_TEXT))
        .block(Block::default().borders(Borders::ALL).title("Help"))
        .wrap(Wrap { trim: true });
    f.render_widget(help, side_chunks[1]);

    draw_tooltip(f, state);
}

fn draw_selection_tools(f: &mut Frame<'_>, state: &AppState, area: Rect) {
    let selection = state.machine.selection();
    let items: Vec<ListItem> = if selection.is_empty() {
        let hint = Style::default().fg(Color::DarkGray);
        vec![ListItem::new("click countries to add them").style(hint)]
    } else {
        selection
            .entries()
            .iter()
            .map(|e| ListItem::new(format!("{}  {}", e.a3, e.name)))
            .collect()
    };

    let start_style = if state.machine.start_enabled() {
        Style::default().fg(Color::LightGreen).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let title = Line::from(vec![
        Span::raw(format!("Selected ({}) ", selection.len())),
        Span::styled("[t] start test", start_style),
    ]);
    let list = List::new(items).block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(list, area);
}

fn draw_test_tools(f: &mut Frame<'_>, state: &AppState, area: Rect) {
    let quiz = state.machine.quiz();
    let mut lines = Vec::new();
    match state.machine.prompt() {
        Some(p) => {
            lines.push(Line::from(vec![
                Span::raw("Find: "),
                Span::styled(p.name.clone(), Style::default().add_modifier(Modifier::BOLD)),
            ]));
            let flag = flag_path(&state.flags_dir, &p.a3);
            lines.push(Line::from(format!("flag: {}", flag.display())));
        }
        None => lines.push(Line::from("")),
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        format!("Right: {}", quiz.right()),
        Style::default().fg(Color::LightGreen),
    )));
    lines.push(Line::from(Span::styled(
        format!("Wrong: {}", quiz.wrong()),
        Style::default().fg(Color::LightRed),
    )));
    if state.machine.mode() == Mode::Interim {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled("Correct!", Style::default().fg(Color::LightGreen))));
    }

    let panel = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Test – [s] back to selection"))
        .wrap(Wrap { trim: true });
    f.render_widget(panel, area);
}

/// Flag and name next to the cell that was clicked.
fn draw_tooltip(f: &mut Frame<'_>, state: &AppState) {
    let Some(tip) = state.machine.tooltip() else {
        return;
    };
    let flag = flag_path(&state.flags_dir, &tip.entry.a3);
    let text = vec![
        Line::from(Span::styled(
            tip.entry.name.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(format!("[{}] {}", tip.entry.a3, flag.display())),
    ];
    let width = text.iter().map(Line::width).max().unwrap_or(0) as u16 + 2;
    let frame = f.area();
    let x = (tip.anchor.0 + 1).min(frame.right().saturating_sub(width));
    let y = (tip.anchor.1 + 1).min(frame.bottom().saturating_sub(4));
    let popup = Rect::new(x, y, width.min(frame.width), 4.min(frame.height)).intersection(frame);

    f.render_widget(Clear, popup);
    f.render_widget(
        Paragraph::new(text).block(Block::default().borders(Borders::ALL)),
        popup,
    );
}
