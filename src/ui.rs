use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::Span,
    widgets::{
        Axis, Block, Borders, Cell, Chart, Dataset, Gauge, GraphType, List, ListItem, ListState,
        Paragraph, Row, Table,
    },
    Frame,
};

use crate::model::{Dashboard, ProgressView, SelectBox, TimelineChart, ViewMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    Ip,
    Protocol,
}

impl Focus {
    pub fn next(self) -> Self {
        match self {
            Focus::Ip => Focus::Protocol,
            Focus::Protocol => Focus::Ip,
        }
    }
}

/// Backend strings are shown as plain text: control characters would let a
/// hostile capture drive the terminal.
pub fn sanitize(s: &str) -> String {
    s.chars().filter(|c| !c.is_control()).collect()
}

/// Runs `restore` when dropped.
pub struct Restore<F: FnMut()> {
    restore: F,
}

impl<F: FnMut()> Restore<F> {
    pub fn new(restore: F) -> Self {
        Self { restore }
    }
}

impl<F: FnMut()> Drop for Restore<F> {
    fn drop(&mut self) {
        (self.restore)();
    }
}

fn chart_rows(chart: &TimelineChart) -> u16 {
    chart.height_px / 20
}

pub fn draw(f: &mut Frame, dashboard: &Dashboard, focus: Focus) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(f.size());

    draw_progress(f, rows[0], &dashboard.progress);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
        .split(rows[1]);

    let sidebar = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(50),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(body[0]);

    draw_select(f, sidebar[0], " IP ", &dashboard.ip_select, focus == Focus::Ip);
    draw_select(
        f,
        sidebar[1],
        " Protocol ",
        &dashboard.protocol_select,
        focus == Focus::Protocol,
    );

    let mode = match dashboard.view_mode {
        ViewMode::Summarized => "Summarized (per minute)",
        ViewMode::Complete => "Complete (per second)",
    };
    f.render_widget(
        Paragraph::new(mode).block(Block::default().title(" View [v] ").borders(Borders::ALL)),
        sidebar[2],
    );

    let main = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(chart_rows(&dashboard.chart)),
            Constraint::Min(0),
        ])
        .split(body[1]);

    draw_chart(f, main[0], &dashboard.chart);
    draw_events(f, main[1], dashboard);

    f.render_widget(
        Paragraph::new(" q quit | Tab switch list | Up/Down select | v toggle view ")
            .style(Style::default().fg(Color::DarkGray)),
        rows[2],
    );
}

fn draw_progress(f: &mut Frame, area: Rect, progress: &ProgressView) {
    let block = Block::default().title(" Capture ").borders(Borders::ALL);
    match progress {
        ProgressView::Running { value, text } => {
            let gauge = Gauge::default()
                .block(block)
                .gauge_style(Style::default().fg(Color::Cyan))
                .ratio((value / 100.0).clamp(0.0, 1.0))
                .label(text.as_str());
            f.render_widget(gauge, area);
        }
        ProgressView::Completed => {
            let done = Paragraph::new("Processing complete")
                .style(Style::default().fg(Color::Green))
                .block(block);
            f.render_widget(done, area);
        }
        ProgressView::Idle => {
            f.render_widget(Paragraph::new("No capture in progress").block(block), area);
        }
        ProgressView::Pending => f.render_widget(block, area),
    }
}

fn draw_select(f: &mut Frame, area: Rect, title: &str, select: &SelectBox, focused: bool) {
    let items: Vec<ListItem> = select
        .options()
        .iter()
        .map(|o| ListItem::new(sanitize(&o.text)).style(Style::default().fg(Color::Cyan)))
        .collect();

    let title_style = if focused {
        Style::default().add_modifier(Modifier::BOLD).fg(Color::Yellow)
    } else {
        Style::default()
    };
    let list = List::new(items)
        .block(
            Block::default()
                .title(Span::styled(title.to_string(), title_style))
                .borders(Borders::ALL),
        )
        .highlight_style(Style::default().add_modifier(Modifier::BOLD).fg(Color::Yellow))
        .highlight_symbol(">> ");

    let mut state = ListState::default();
    state.select(Some(select.selected_index()));
    f.render_stateful_widget(list, area, &mut state);
}

fn draw_chart(f: &mut Frame, area: Rect, chart: &TimelineChart) {
    let points: Vec<(f64, f64)> = chart
        .data
        .iter()
        .enumerate()
        .map(|(i, count)| (i as f64, *count as f64))
        .collect();
    let max_x = (points.len().saturating_sub(1)).max(1) as f64;
    let max_y = chart.data.iter().copied().max().unwrap_or(0).max(1) as f64;

    let x_labels: Vec<Span> = match (chart.labels.first(), chart.labels.last()) {
        (Some(first), Some(last)) => vec![Span::raw(sanitize(first)), Span::raw(sanitize(last))],
        _ => Vec::new(),
    };

    let datasets = vec![Dataset::default()
        .name("events")
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Blue))
        .data(&points)];

    let widget = Chart::new(datasets)
        .block(Block::default().title(" Timeline ").borders(Borders::ALL))
        .x_axis(
            Axis::default()
                .title(format!("time ({})", chart.unit.as_str()))
                .bounds([0.0, max_x])
                .labels(x_labels),
        )
        .y_axis(
            Axis::default()
                .title("events")
                .bounds([0.0, max_y])
                .labels(vec![Span::raw("0"), Span::raw(format!("{}", max_y as u64))]),
        );
    f.render_widget(widget, area);
}

fn draw_events(f: &mut Frame, area: Rect, dashboard: &Dashboard) {
    let rows: Vec<Row> = dashboard
        .events
        .iter()
        .map(|e| {
            Row::new(vec![
                Cell::from(sanitize(&e.timestamp)),
                Cell::from(sanitize(&e.ip)),
                Cell::from(sanitize(&e.protocol)),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Percentage(50),
            Constraint::Percentage(30),
            Constraint::Percentage(20),
        ],
    )
    .header(
        Row::new(vec!["Timestamp", "IP", "Protocol"])
            .style(Style::default().add_modifier(Modifier::BOLD)),
    )
    .block(
        Block::default()
            .title(format!(" Events ({}) ", dashboard.events.len()))
            .borders(Borders::ALL),
    );
    f.render_widget(table, area);
}
