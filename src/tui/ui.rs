use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{
        Bar, BarChart, BarGroup, Block, Borders, Cell, Clear, List, ListItem, ListState,
        Paragraph, Row, Table, Wrap,
    },
    Frame,
};

use crate::designer::Slot;
use crate::output::render_structure;

use super::app::{App, DialogKind, Focus, MenuItem, Mode, Screen};

const SERIES_COLORS: [Color; 6] = [
    Color::Cyan,
    Color::Yellow,
    Color::Green,
    Color::Magenta,
    Color::Blue,
    Color::Red,
];

pub fn draw(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Header
            Constraint::Min(5),    // Body
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    draw_header(frame, app, chunks[0]);

    match app.screen {
        Screen::Menu => draw_menu(frame, app, chunks[1]),
        Screen::Designer => draw_designer(frame, app, chunks[1]),
        Screen::Structure => draw_structure(frame, app, chunks[1]),
        Screen::Query => {
            let body = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(7), Constraint::Min(3)])
                .split(chunks[1]);
            draw_query_editor(frame, app, body[0]);
            draw_results(frame, app, body[1]);
        }
        Screen::Chart => draw_chart(frame, app, chunks[1]),
    }

    draw_status_bar(frame, app, chunks[2]);

    if app.screen == Screen::Query && app.mode == Mode::Command {
        draw_command_line(frame, app);
    }
    if app.prompt.is_some() {
        draw_prompt(frame, app);
    }
    if app.dialog.is_some() {
        draw_dialog(frame, app);
    }
}

fn draw_header(frame: &mut Frame, app: &App, area: Rect) {
    let database = app
        .session
        .path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "no database open".to_string());

    let header = Line::from(vec![
        Span::styled("  ", Style::default()),
        Span::styled(
            "tabledesk",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::styled(" | ", Style::default().fg(Color::DarkGray)),
        Span::styled(database, Style::default().fg(Color::DarkGray)),
    ]);

    let paragraph = Paragraph::new(header).style(Style::default().bg(Color::Black));
    frame.render_widget(paragraph, area);
}

fn draw_menu(frame: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = MenuItem::ALL
        .iter()
        .enumerate()
        .map(|(i, item)| ListItem::new(format!("{}. {}", i + 1, item.label())))
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .title(" Choose an action ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("> ");

    let mut state = ListState::default().with_selected(Some(app.menu_index));
    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_designer(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Create tables (Ctrl+T: add table, Ctrl+F: add field, Ctrl+S: create) ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let focused = Style::default().add_modifier(Modifier::REVERSED);
    let label = Style::default().fg(Color::DarkGray);
    let focus = app.designer.focus;

    let mut lines: Vec<Line> = Vec::new();
    let mut focus_line = 0;

    for (t, table) in app.designer.tables.iter().enumerate() {
        let name_focused = focus.table == t && focus.slot == Slot::TableName;
        if name_focused {
            focus_line = lines.len();
        }
        lines.push(Line::from(vec![
            Span::styled(format!("Table {} name: ", t + 1), label),
            field_span(&table.name, 24, name_focused, focused),
        ]));

        for (f, field) in table.fields.iter().enumerate() {
            let name_focused = focus.table == t && focus.slot == Slot::FieldName(f);
            let type_focused = focus.table == t && focus.slot == Slot::FieldType(f);
            if name_focused || type_focused {
                focus_line = lines.len();
            }
            lines.push(Line::from(vec![
                Span::styled(format!("  Field {}: ", f + 1), label),
                field_span(&field.name, 20, name_focused, focused),
                Span::raw("  "),
                Span::styled(
                    format!("< {:<7} >", field.declared_type.as_str()),
                    if type_focused {
                        focused
                    } else {
                        Style::default().fg(Color::Yellow)
                    },
                ),
            ]));
        }
        lines.push(Line::from(""));
    }

    let scroll = focus_line.saturating_sub(inner.height.saturating_sub(1) as usize);
    let paragraph = Paragraph::new(lines).scroll((scroll as u16, 0));
    frame.render_widget(paragraph, inner);
}

fn field_span<'a>(text: &str, width: usize, is_focused: bool, focused: Style) -> Span<'a> {
    let shown = if is_focused {
        format!("{}_", text)
    } else {
        text.to_string()
    };
    let style = if is_focused {
        focused
    } else {
        Style::default().add_modifier(Modifier::UNDERLINED)
    };
    Span::styled(format!("{:<width$}", shown, width = width), style)
}

fn draw_structure(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(format!(" Table structure ({} tables) ", app.structure.len()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let text = render_structure(&app.structure);
    let lines: Vec<Line> = text
        .lines()
        .map(|line| {
            if line.starts_with("Table:") {
                Line::from(Span::styled(
                    line.to_string(),
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                ))
            } else {
                Line::from(line.to_string())
            }
        })
        .collect();

    let paragraph = Paragraph::new(lines)
        .block(block)
        .scroll((app.structure_scroll as u16, 0));
    frame.render_widget(paragraph, area);
}

fn draw_chart(frame: &mut Frame, app: &App, area: Rect) {
    let Some(chart) = app.chart.as_ref() else {
        return;
    };

    let legend: Vec<Span> = chart
        .series
        .iter()
        .enumerate()
        .flat_map(|(i, name)| {
            vec![
                Span::styled(
                    "■ ",
                    Style::default().fg(SERIES_COLORS[i % SERIES_COLORS.len()]),
                ),
                Span::raw(format!("{}  ", name)),
            ]
        })
        .collect();

    let block = Block::default()
        .title(format!(" {} ", chart.title))
        .title_bottom(Line::from(legend))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    // Bars hold integers, so values are scaled against the largest one.
    let max = chart.max_value();
    let scale = if max > 0.0 { 1000.0 / max } else { 0.0 };

    let mut widget = BarChart::default()
        .block(block)
        .bar_width(6)
        .bar_gap(1)
        .group_gap(3)
        .max(1000);

    for group in &chart.groups {
        let bars: Vec<Bar> = group
            .bars
            .iter()
            .map(|(series, value)| {
                Bar::default()
                    .value((value.max(0.0) * scale).round() as u64)
                    .text_value(format_number(*value))
                    .style(Style::default().fg(SERIES_COLORS[series % SERIES_COLORS.len()]))
            })
            .collect();
        widget = widget.data(
            BarGroup::default()
                .label(Line::from(group.label.clone()))
                .bars(&bars),
        );
    }

    frame.render_widget(widget, area);
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{:.2}", value)
    }
}

fn draw_query_editor(frame: &mut Frame, app: &App, area: Rect) {
    let is_focused = app.focus == Focus::Query;
    let border_color = if is_focused {
        Color::Cyan
    } else {
        Color::DarkGray
    };

    let block = Block::default()
        .title(" SQL (i: insert, Enter: run, :chart: plot, :w: save) ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let highlighted_lines: Vec<Line> = app.query.text.split('\n').map(highlight_sql_line).collect();
    let paragraph = Paragraph::new(highlighted_lines).wrap(Wrap { trim: false });
    frame.render_widget(paragraph, inner);

    if app.mode == Mode::Insert && is_focused && app.prompt.is_none() && app.dialog.is_none() {
        let (row, col) = app.query.cursor_row_col();
        frame.set_cursor_position((inner.x + col as u16, inner.y + row as u16));
    }
}

fn highlight_sql_line(query: &str) -> Line<'static> {
    let keywords = [
        "SELECT", "FROM", "WHERE", "AND", "OR", "NOT", "JOIN", "INNER", "LEFT", "ON", "GROUP",
        "BY", "HAVING", "ORDER", "ASC", "DESC", "LIMIT", "OFFSET", "AS", "DISTINCT", "COUNT",
        "SUM", "AVG", "MIN", "MAX", "NULL", "IS", "IN", "LIKE", "BETWEEN", "CASE", "WHEN",
        "THEN", "ELSE", "END", "WITH", "UNION", "ALL", "EXISTS", "CREATE", "TABLE", "IF",
        "INSERT", "INTO", "VALUES", "UPDATE", "SET", "DELETE", "DROP", "ALTER", "PRAGMA",
        "TEXT", "INTEGER", "REAL", "BLOB", "PRIMARY", "KEY",
    ];

    let mut spans = Vec::new();
    let mut current = String::new();
    let mut in_string = false;
    let mut string_char = ' ';

    for c in query.chars() {
        if in_string {
            current.push(c);
            if c == string_char {
                spans.push(Span::styled(current.clone(), Style::default().fg(Color::Green)));
                current.clear();
                in_string = false;
            }
        } else if c == '\'' || c == '"' {
            if !current.is_empty() {
                spans.push(colorize_word(&current, &keywords));
                current.clear();
            }
            current.push(c);
            in_string = true;
            string_char = c;
        } else if c.is_alphanumeric() || c == '_' {
            current.push(c);
        } else {
            if !current.is_empty() {
                spans.push(colorize_word(&current, &keywords));
                current.clear();
            }
            let style = match c {
                '(' | ')' | ',' | ';' => Style::default().fg(Color::Yellow),
                '=' | '<' | '>' | '!' | '+' | '-' | '*' | '/' | '%' => {
                    Style::default().fg(Color::Magenta)
                }
                _ => Style::default(),
            };
            spans.push(Span::styled(c.to_string(), style));
        }
    }

    if !current.is_empty() {
        if in_string {
            spans.push(Span::styled(current, Style::default().fg(Color::Green)));
        } else {
            spans.push(colorize_word(&current, &keywords));
        }
    }

    Line::from(spans)
}

fn colorize_word(word: &str, keywords: &[&str]) -> Span<'static> {
    let upper = word.to_uppercase();
    if keywords.contains(&upper.as_str()) {
        Span::styled(
            word.to_string(),
            Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
        )
    } else if word.chars().all(|c| c.is_ascii_digit() || c == '.') {
        Span::styled(word.to_string(), Style::default().fg(Color::Cyan))
    } else {
        Span::raw(word.to_string())
    }
}

fn draw_results(frame: &mut Frame, app: &App, area: Rect) {
    let is_focused = app.focus == Focus::Results;
    let border_color = if is_focused {
        Color::Cyan
    } else {
        Color::DarkGray
    };

    let title = match app.result {
        Some(ref dataset) => format!(" Results ({} rows) ", dataset.row_count()),
        None => " Results ".to_string(),
    };

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(ref dataset) = app.result else {
        let help = Paragraph::new("Enter a SQL statement and press Enter to run it")
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(help, inner);
        return;
    };

    if dataset.row_count() == 0 {
        frame.render_widget(Paragraph::new("No results"), inner);
        return;
    }

    let header_cells: Vec<Cell> = dataset
        .schema
        .columns
        .iter()
        .enumerate()
        .skip(app.result_horizontal_scroll)
        .map(|(i, col)| {
            let width = app.column_widths.get(i).copied().unwrap_or(10);
            Cell::from(truncate_string(&col.name, width))
                .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
        })
        .collect();
    let header = Row::new(header_cells).height(1);

    let visible_height = inner.height.saturating_sub(2) as usize;
    let rows: Vec<Row> = dataset
        .rows
        .iter()
        .skip(app.result_scroll)
        .take(visible_height)
        .map(|row| {
            let cells: Vec<Cell> = row
                .values
                .iter()
                .enumerate()
                .skip(app.result_horizontal_scroll)
                .map(|(i, val)| {
                    let width = app.column_widths.get(i).copied().unwrap_or(10);
                    Cell::from(truncate_string(&val.to_string(), width))
                })
                .collect();
            Row::new(cells)
        })
        .collect();

    let widths: Vec<Constraint> = app
        .column_widths
        .iter()
        .skip(app.result_horizontal_scroll)
        .map(|&w| Constraint::Length(w as u16 + 2))
        .collect();

    frame.render_widget(Table::new(rows, widths).header(header), inner);
}

/// Shortens to `max_len` characters, ending in "..." when cut.
fn truncate_string(s: &str, max_len: usize) -> String {
    let count = s.chars().count();
    if count <= max_len {
        s.to_string()
    } else if max_len > 3 {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{}...", kept)
    } else {
        s.chars().take(max_len).collect()
    }
}

fn draw_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let (label, color) = if app.prompt.is_some() {
        ("PROMPT", Color::Yellow)
    } else {
        match app.screen {
            Screen::Menu => ("MENU", Color::Blue),
            Screen::Designer => ("DESIGN", Color::Magenta),
            Screen::Structure => ("SCHEMA", Color::Blue),
            Screen::Chart => ("CHART", Color::Green),
            Screen::Query => match app.mode {
                Mode::Normal => ("NORMAL", Color::Blue),
                Mode::Insert => ("INSERT", Color::Green),
                Mode::Command => ("COMMAND", Color::Yellow),
            },
        }
    };

    let help = if app.dialog.is_some() {
        "any key: close"
    } else if app.prompt.is_some() {
        "Enter: confirm  Esc: cancel"
    } else {
        match app.screen {
            Screen::Menu => "j/k: move  Enter or 1-7: select  q: quit",
            Screen::Designer => "Tab/Shift+Tab: next/prev  Left/Right: type  Esc: back",
            Screen::Structure => "j/k: scroll  Esc: back",
            Screen::Chart => "Esc: back to SQL",
            Screen::Query => match app.mode {
                Mode::Normal => "i: insert  j/k: scroll  Tab: focus  Enter: run  :: command  q: menu",
                Mode::Insert => "Esc: normal  Enter: run  Alt+Enter: newline  Ctrl+G: chart",
                Mode::Command => "e: run  chart: plot  w: save  q: menu  Esc: cancel",
            },
        }
    };

    let status = Line::from(vec![
        Span::styled(
            format!(" {} ", label),
            Style::default().fg(Color::Black).bg(color),
        ),
        Span::raw(" "),
        Span::styled(help, Style::default().fg(Color::DarkGray)),
    ]);

    frame.render_widget(Paragraph::new(status), area);
}

fn draw_command_line(frame: &mut Frame, app: &App) {
    let area = frame.area();
    let line_area = Rect {
        x: 0,
        y: area.height.saturating_sub(1),
        width: area.width,
        height: 1,
    };

    frame.render_widget(Clear, line_area);
    let command_line = Paragraph::new(format!(":{}", app.command_buffer))
        .style(Style::default().fg(Color::White));
    frame.render_widget(command_line, line_area);

    if app.dialog.is_none() {
        frame.set_cursor_position((1 + app.command_buffer.chars().count() as u16, line_area.y));
    }
}

fn draw_prompt(frame: &mut Frame, app: &App) {
    let Some(prompt) = app.prompt.as_ref() else {
        return;
    };

    let area = centered_rect(70, 3, frame.area());
    frame.render_widget(Clear, area);

    let block = Block::default()
        .title(prompt.title(app.session.formats()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));
    let inner = block.inner(area);
    frame.render_widget(Paragraph::new(prompt.input.text.as_str()).block(block), area);

    if app.dialog.is_none() {
        let (_, col) = prompt.input.cursor_row_col();
        frame.set_cursor_position((inner.x + col as u16, inner.y));
    }
}

fn draw_dialog(frame: &mut Frame, app: &App) {
    let Some(dialog) = app.dialog.as_ref() else {
        return;
    };

    let color = match dialog.kind {
        DialogKind::Info => Color::Green,
        DialogKind::Error => Color::Red,
    };
    let height = (dialog.message.lines().count() as u16 + 4).min(frame.area().height);
    let area = centered_rect(60, height, frame.area());
    frame.render_widget(Clear, area);

    let paragraph = Paragraph::new(dialog.message.as_str())
        .block(
            Block::default()
                .title(format!(" {} ", dialog.title))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color)),
        )
        .style(Style::default().fg(color))
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn centered_rect(percent_x: u16, height: u16, r: Rect) -> Rect {
    let width = r.width * percent_x / 100;
    Rect {
        x: r.x + (r.width - width) / 2,
        y: r.y + r.height.saturating_sub(height) / 2,
        width,
        height: height.min(r.height),
    }
}
