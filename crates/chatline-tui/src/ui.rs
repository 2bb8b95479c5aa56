use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};
use chatline_core::{Role, SessionView};
use crate::app::{App, InputMode};

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find("**") {
        let after_open = &rest[open + 2..];
        match after_open.find("**") {
            Some(close) if close > 0 => {
                if open > 0 {
                    spans.push(Span::raw(rest[..open].to_string()));
                }
                spans.push(Span::styled(
                    after_open[..close].to_string(),
                    Style::default().add_modifier(Modifier::BOLD),
                ));
                rest = &after_open[close + 2..];
            }
            // No closing **, treat the remainder as literal
            _ => break,
        }
    }

    if !rest.is_empty() {
        spans.push(Span::raw(rest.to_string()));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();
    let view = app.view();

    // Main layout: header, transcript, input, footer
    let [header_area, transcript_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, &view, frame, header_area);
    render_transcript(app, &view, frame, transcript_area);
    render_input(app, &view, frame, input_area);
    render_footer(app, &view, frame, footer_area);

    // Render popups (in order of priority)
    if let Some(error) = &view.error {
        render_error_popup(error, frame, area);
    } else if app.show_model_picker {
        render_model_picker(app, &view, frame, area);
    }
}

fn render_header(app: &App, view: &SessionView, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" chatline ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(app.endpoint.clone(), Style::default().fg(Color::Gray)),
        Span::raw("  "),
        Span::styled(
            format!("{} · temp {:.1}", view.model, view.temperature),
            Style::default().fg(Color::White),
        ),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn role_label(role: Role) -> (&'static str, Color) {
    match role {
        Role::User => ("You", Color::Cyan),
        Role::Assistant => ("AI", Color::Yellow),
    }
}

fn render_transcript(app: &mut App, view: &SessionView, frame: &mut Frame, area: Rect) {
    // Store area for mouse hit-testing and its inner size for scroll calculations
    app.transcript_area = Some(area);
    app.transcript_height = area.height.saturating_sub(2);
    app.transcript_width = area.width.saturating_sub(2);

    let border_color = if app.input_mode == InputMode::Normal {
        Color::Cyan
    } else {
        Color::DarkGray
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Chat ");

    let text = if view.transcript.is_empty() && !view.loading {
        Text::from(Span::styled(
            "Type a message below to start chatting...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let mut lines: Vec<Line> = Vec::new();

        for record in &view.transcript {
            let (label, color) = role_label(record.role);
            lines.push(Line::from(vec![
                Span::styled(
                    format!("{}:", label),
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!(" {}", record.formatted_timestamp),
                    Style::default().fg(Color::DarkGray),
                ),
            ]));
            match record.role {
                Role::User => {
                    for line in record.escaped_content.lines() {
                        lines.push(Line::from(line.to_string()));
                    }
                }
                Role::Assistant => {
                    for line in record.escaped_content.lines() {
                        lines.push(parse_markdown_line(line));
                    }
                }
            }
            lines.push(Line::default());
        }

        if view.loading {
            lines.push(Line::from(Span::styled(
                "AI:",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )));
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat(app.animation_frame as usize + 1);
            lines.push(Line::from(Span::styled(
                format!("Thinking{}", dots),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }

        Text::from(lines)
    };

    let transcript = Paragraph::new(text)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.transcript_scroll, 0));

    frame.render_widget(transcript, area);
}

fn render_input(app: &App, view: &SessionView, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing;
    let border_color = if editing { Color::Yellow } else { Color::DarkGray };
    let count_color = if view.submit_enabled { Color::Green } else { Color::DarkGray };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Message ")
        .title_bottom(
            Line::from(Span::styled(
                format!(" {} ", view.count_label),
                Style::default().fg(count_color),
            ))
            .right_aligned(),
        );

    // Show the line under the cursor, scrolled horizontally to keep the cursor visible.
    // Inner width = total width - 2 (for borders)
    let inner_width = area.width.saturating_sub(2) as usize;
    let before_cursor: String = view.input_text.chars().take(view.input_cursor).collect();
    let line_start = before_cursor.rfind('\n').map(|i| i + 1).unwrap_or(0);
    let cursor_col = before_cursor[line_start..].chars().count();
    let current_line: &str = view.input_text[line_start..]
        .split('\n')
        .next()
        .unwrap_or_default();

    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_col >= inner_width {
        cursor_col - inner_width + 1
    } else {
        0
    };

    let visible_text: String = current_line
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(block);

    frame.render_widget(input, area);

    // Show cursor when editing
    if editing && view.error.is_none() && !app.show_model_picker {
        let cursor_x = (cursor_col - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_footer(app: &App, view: &SessionView, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };
    let mode_text = match app.input_mode {
        InputMode::Normal => " NORMAL ",
        InputMode::Editing => " INSERT ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let mut spans = vec![Span::styled(mode_text, mode_style), Span::raw(" ")];

    if let Some(notice) = &app.notice {
        spans.push(Span::styled(notice.clone(), Style::default().fg(Color::Yellow)));
    } else if view.loading {
        spans.push(Span::styled(
            "Waiting for reply...",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        ));
    } else {
        let hints: &[(&str, &str)] = match app.input_mode {
            InputMode::Editing => &[
                ("Enter", "send"),
                ("Alt+Enter", "newline"),
                ("Esc", "normal"),
                ("^L", "clear"),
                ("^C", "quit"),
            ],
            InputMode::Normal => &[
                ("j/k", "scroll"),
                ("i", "type"),
                ("m", "model"),
                ("+/-", "temp"),
                ("^L", "clear"),
                ("q", "quit"),
            ],
        };
        for (key, label) in hints {
            spans.push(Span::styled(format!(" {} ", key), key_style));
            spans.push(Span::styled(format!(" {} ", label), label_style));
        }
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Rect of the given size centered in `area`
fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(4));
    let height = height.min(area.height.saturating_sub(4));
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

fn render_error_popup(error: &str, frame: &mut Frame, area: Rect) {
    let popup_area = centered(area, 60, 7);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red))
        .title(" Error (Esc to close) ");

    let text = Text::from(vec![
        Line::from(Span::styled(error.to_string(), Style::default().fg(Color::White))),
        Line::default(),
        Line::from(Span::styled(
            "Your message was not answered. Edit and send it again.",
            Style::default().fg(Color::DarkGray),
        )),
    ]);

    let popup = Paragraph::new(text).block(block).wrap(Wrap { trim: true });
    frame.render_widget(popup, popup_area);
}

fn render_model_picker(app: &mut App, view: &SessionView, frame: &mut Frame, area: Rect) {
    let rows = app.available_models.len().max(1) as u16;
    let popup_area = centered(area, 40, rows + 2);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Select Model (Enter to select, Esc to cancel) ");

    if app.available_models.is_empty() {
        let message = if app.models_loading {
            "Loading models..."
        } else {
            "No models available"
        };
        let placeholder = Paragraph::new(message)
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(placeholder, popup_area);
        return;
    }

    let items: Vec<ListItem> = app
        .available_models
        .iter()
        .map(|model| {
            let style = if *model == view.model {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(format!(" {} ", model)).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, popup_area, &mut app.model_picker_state);
}
