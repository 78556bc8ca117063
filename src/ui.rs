use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Position, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget},
    Frame,
};

use crate::app::{App, LoadState, Regions, SortDirection};
use crate::braille::BrailleCanvas;
use crate::chart::bars;
use crate::chart::trend::TrendView;
use crate::map::MapFrame;
use crate::{YEAR_MAX, YEAR_MIN};

/// Columns per year button: four digits plus a separating space.
pub const YEAR_CELL: u16 = 5;

const TREND_COLOR: Color = Color::Rgb(70, 130, 180);
const SORT_PREFIX: &str = "Sort: ";
const SORT_ASC_LABEL: &str = "[A]scending";
const SORT_DESC_LABEL: &str = "[D]escending";
const POPUP_CLOSE_LABEL: &str = "[x] Close";

/// Render the UI and refresh the hit-test regions for this frame.
pub fn render(frame: &mut Frame, app: &mut App) {
    app.regions = Regions::default();
    let area = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(year_rows(area.width) + 1), // Year buttons + sort row
            Constraint::Min(8),                            // Panels
            Constraint::Length(1),                         // Status bar
        ])
        .split(area);

    render_controls(frame, app, chunks[0]);

    let panels = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(chunks[1]);
    render_bars(frame, app, panels[0]);
    render_map(frame, app, panels[1]);

    render_status_bar(frame, app, chunks[2]);
    render_trend_popup(frame, app, area);
    render_tooltip(frame, app, area);
}

/// Rows needed for the year-button strip at the given width.
pub fn year_rows(width: u16) -> u16 {
    let per_row = (width / YEAR_CELL).max(1);
    let count = YEAR_MAX - YEAR_MIN + 1;
    count.div_ceil(per_row)
}

/// Year button under a terminal cell, if the cell sits on a button label.
pub fn year_at(strip: Rect, col: u16, row: u16) -> Option<u16> {
    if !strip.contains(Position::new(col, row)) {
        return None;
    }
    let per_row = (strip.width / YEAR_CELL).max(1);
    if (col - strip.x) % YEAR_CELL >= YEAR_CELL - 1 {
        return None; // separating space
    }
    let slot = (col - strip.x) / YEAR_CELL;
    if slot >= per_row {
        return None; // leftover columns past the last button of the row
    }
    let year = YEAR_MIN + (row - strip.y) * per_row + slot;
    (year <= YEAR_MAX).then_some(year)
}

fn render_controls(frame: &mut Frame, app: &mut App, area: Rect) {
    let strip = Rect {
        height: year_rows(area.width).min(area.height),
        ..area
    };
    app.regions.years = strip;

    let per_row = (strip.width / YEAR_CELL).max(1) as usize;
    let years: Vec<u16> = (YEAR_MIN..=YEAR_MAX).collect();
    let lines: Vec<Line> = years
        .chunks(per_row)
        .map(|chunk| {
            let mut spans = Vec::with_capacity(chunk.len() * 2);
            for &year in chunk {
                let style = if year == app.selection.year {
                    Style::default()
                        .fg(Color::Black)
                        .bg(Color::Yellow)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::Gray)
                };
                spans.push(Span::styled(format!("{year}"), style));
                spans.push(Span::raw(" "));
            }
            Line::from(spans)
        })
        .collect();
    frame.render_widget(Paragraph::new(lines), strip);

    // Sort toggles on the line below the strip
    let sort_y = strip.y + strip.height;
    if sort_y >= area.y + area.height {
        return;
    }
    let toggle = |active: bool| {
        Style::default().fg(if active { Color::Green } else { Color::DarkGray })
    };
    let line = Line::from(vec![
        Span::styled(SORT_PREFIX, Style::default().fg(Color::DarkGray)),
        Span::styled(
            SORT_ASC_LABEL,
            toggle(app.selection.sort == SortDirection::Ascending),
        ),
        Span::raw(" "),
        Span::styled(
            SORT_DESC_LABEL,
            toggle(app.selection.sort == SortDirection::Descending),
        ),
    ]);
    let sort_row = Rect {
        y: sort_y,
        height: 1,
        ..area
    };
    frame.render_widget(Paragraph::new(line), sort_row);

    let prefix = SORT_PREFIX.len() as u16;
    app.regions.sort_asc = Rect {
        x: area.x + prefix,
        y: sort_y,
        width: SORT_ASC_LABEL.len() as u16,
        height: 1,
    };
    app.regions.sort_desc = Rect {
        x: area.x + prefix + SORT_ASC_LABEL.len() as u16 + 1,
        y: sort_y,
        width: SORT_DESC_LABEL.len() as u16,
        height: 1,
    };
}

fn render_bars(frame: &mut Frame, app: &mut App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            format!(" Injuries Per Million {} ", app.selection.year),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ));
    let inner = block.inner(area);
    frame.render_widget(block, area);
    app.regions.bars = inner;

    match app.loaded() {
        Some(loaded) => {
            let chart = bars::chart(&loaded.dataset, &loaded.bar_order, inner.width);
            frame.render_widget(chart, inner);
        }
        None => render_not_loaded(frame, &app.state, inner),
    }
}

fn render_map(frame: &mut Frame, app: &mut App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            " World Map ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ));
    let inner = block.inner(area);
    frame.render_widget(block, area);
    app.regions.map = inner;

    // Braille gives 2x4 pixels per character cell
    app.viewport.width = inner.width as usize * 2;
    app.viewport.height = inner.height as usize * 4;
    let viewport = app.viewport.clone();
    let year = app.selection.year;

    match &mut app.state {
        LoadState::Ready(loaded) => {
            let map_frame = loaded.map.render(
                &viewport,
                &loaded.dataset,
                &loaded.scale,
                year,
                inner.width as usize,
                inner.height as usize,
            );
            frame.render_widget(ChoroplethWidget { frame: map_frame }, inner);
        }
        state @ LoadState::NotLoaded { .. } => render_not_loaded(frame, state, inner),
    }
}

fn render_not_loaded(frame: &mut Frame, state: &LoadState, area: Rect) {
    let message = match state {
        LoadState::NotLoaded { error: Some(err) } => {
            format!("Load failed: {err}\n\nPress r to reload.")
        }
        _ => "No data loaded.\n\nPress r to load.".to_string(),
    };
    frame.render_widget(
        Paragraph::new(message).style(Style::default().fg(Color::DarkGray)),
        area,
    );
}

/// Cell-background choropleth fill with braille border art on top. Water
/// cells keep the terminal default background.
struct ChoroplethWidget<'a> {
    frame: MapFrame<'a>,
}

impl Widget for ChoroplethWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let rows = self.frame.rows.min(area.height as usize);
        let cols = self.frame.cols.min(area.width as usize);
        for cy in 0..rows {
            for cx in 0..cols {
                let pos = (area.x + cx as u16, area.y + cy as u16);
                if let Some(color) = self.frame.fill[cy * self.frame.cols + cx] {
                    buf[pos].set_bg(color);
                }
                if let Some(ch) = self.frame.borders.cell(cx, cy) {
                    buf[pos].set_char(ch).set_fg(Color::DarkGray);
                }
            }
        }
    }
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let sort = match app.selection.sort {
        SortDirection::Ascending => "asc",
        SortDirection::Descending => "desc",
    };
    let status = Line::from(vec![
        Span::styled(" Year: ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            app.selection.year.to_string(),
            Style::default().fg(Color::Yellow),
        ),
        Span::styled(" | Sort: ", Style::default().fg(Color::DarkGray)),
        Span::styled(sort, Style::default().fg(Color::Yellow)),
        Span::styled(" | Zoom: ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            format!("{:.1}x", app.viewport.zoom),
            Style::default().fg(Color::Yellow),
        ),
        Span::styled(" | ", Style::default().fg(Color::DarkGray)),
        Span::styled(center_coords(app), Style::default().fg(Color::Cyan)),
        Span::styled(
            " | \u{2190}/\u{2192}:year a/d:sort hjkl:pan +/-:zoom r:reload q:quit",
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    frame.render_widget(Paragraph::new(status), area);
}

fn center_coords(app: &App) -> String {
    let lat = app.viewport.center_lat;
    let lon = app.viewport.center_lon;
    format!(
        "{:.1}\u{b0}{}, {:.1}\u{b0}{}",
        lat.abs(),
        if lat >= 0.0 { "N" } else { "S" },
        lon.abs(),
        if lon >= 0.0 { "E" } else { "W" },
    )
}

fn render_trend_popup(frame: &mut Frame, app: &mut App, area: Rect) {
    if !app.trend_open() {
        return;
    }
    let popup = centered_rect(60, 60, area);
    app.regions.popup = popup;

    frame.render_widget(Clear, popup);
    let Some(loaded) = app.loaded() else { return };
    let Some(trend) = loaded.trend.as_ref() else {
        return;
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Span::styled(
            format!(" {} ", trend.title()),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ));
    let inner = block.inner(popup);
    frame.render_widget(block, popup);
    if inner.height < 4 || inner.width < 12 {
        return;
    }

    // Bottom line hosts the close control; the line above it the x labels
    let footer_y = inner.y + inner.height - 1;
    let close = Rect {
        x: inner.x + inner.width - POPUP_CLOSE_LABEL.len() as u16,
        y: footer_y,
        width: POPUP_CLOSE_LABEL.len() as u16,
        height: 1,
    };
    frame.render_widget(
        Paragraph::new(Span::styled(
            POPUP_CLOSE_LABEL,
            Style::default().fg(Color::Red),
        )),
        close,
    );

    if trend.series().is_empty() {
        frame.render_widget(
            Paragraph::new(format!("No data for {} since {YEAR_MIN}.", trend.country))
                .style(Style::default().fg(Color::DarkGray)),
            Rect {
                height: 1,
                ..inner
            },
        );
    } else {
        render_trend_chart(frame, trend, inner);
    }

    // Recorded last: borrow of `loaded` must end before regions mutate
    app.regions.popup_close = close;
}

fn render_trend_chart(frame: &mut Frame, trend: &TrendView, inner: Rect) {
    const Y_LABELS: u16 = 8;
    let chart = Rect {
        x: inner.x + Y_LABELS,
        y: inner.y,
        width: inner.width - Y_LABELS,
        height: inner.height - 2,
    };

    let canvas = trend.polyline(chart.width as usize, chart.height as usize);
    blit_braille(frame.buffer_mut(), &canvas, chart, TREND_COLOR);

    // Y axis: series max at the top, zero at the bottom
    let y_label = |value: f64| format!("{value:>7.0} ");
    frame.render_widget(
        Paragraph::new(y_label(trend.max_rate())).style(Style::default().fg(Color::DarkGray)),
        Rect {
            x: inner.x,
            y: chart.y,
            width: Y_LABELS,
            height: 1,
        },
    );
    frame.render_widget(
        Paragraph::new(y_label(0.0)).style(Style::default().fg(Color::DarkGray)),
        Rect {
            x: inner.x,
            y: chart.y + chart.height - 1,
            width: Y_LABELS,
            height: 1,
        },
    );

    // X axis: first and last year under the chart
    if let Some((first, last)) = trend.year_span() {
        let labels = Line::from(vec![
            Span::styled(first.to_string(), Style::default().fg(Color::DarkGray)),
            Span::raw(" ".repeat((chart.width as usize).saturating_sub(8))),
            Span::styled(last.to_string(), Style::default().fg(Color::DarkGray)),
        ]);
        frame.render_widget(
            Paragraph::new(labels),
            Rect {
                x: chart.x,
                y: chart.y + chart.height,
                width: chart.width,
                height: 1,
            },
        );
    }
}

fn blit_braille(buf: &mut Buffer, canvas: &BrailleCanvas, area: Rect, color: Color) {
    for cy in 0..canvas.height().min(area.height as usize) {
        for cx in 0..canvas.width().min(area.width as usize) {
            if let Some(ch) = canvas.cell(cx, cy) {
                buf[(area.x + cx as u16, area.y + cy as u16)]
                    .set_char(ch)
                    .set_fg(color);
            }
        }
    }
}

/// Hover tooltip for bars and map, in the source dashboard's wording.
fn render_tooltip(frame: &mut Frame, app: &App, area: Rect) {
    let Some((col, row)) = app.mouse_pos else { return };
    if app.trend_open() && app.regions.popup.contains(Position::new(col, row)) {
        return;
    }
    let Some(text) = tooltip_text(app, col, row) else {
        return;
    };

    let width = (text.chars().count() as u16 + 2).min(area.width);
    let x = (col + 2).min(area.x + area.width.saturating_sub(width));
    let y = if row + 1 < area.y + area.height {
        row + 1
    } else {
        row.saturating_sub(1)
    };
    let tip = Rect {
        x,
        y,
        width,
        height: 1,
    };
    frame.render_widget(Clear, tip);
    frame.render_widget(
        Paragraph::new(format!(" {text} "))
            .style(Style::default().fg(Color::Black).bg(Color::Gray)),
        tip,
    );
}

fn tooltip_text(app: &App, col: u16, row: u16) -> Option<String> {
    let loaded = app.loaded()?;
    let pos = Position::new(col, row);

    if app.regions.bars.contains(pos) {
        let x = col - app.regions.bars.x;
        let slot = bars::bar_at(x, loaded.bar_order.len(), app.regions.bars.width)?;
        let record = &loaded.dataset.records()[loaded.bar_order[slot]];
        return Some(format!(
            "{}: {} Injuries Per Million",
            record.country, record.injuries_per_million
        ));
    }

    if app.regions.map.contains(pos) {
        let (px, py) = app.map_pixel(col, row)?;
        let (lon, lat) = app.viewport.unproject(px, py);
        let hit = loaded.map.hit_test(lon, lat)?;
        return Some(match loaded.dataset.rate(hit.canonical, app.selection.year) {
            Some(rate) => format!("{}: {} Injuries Per Million", hit.raw, rate),
            None => format!("{}: No data", hit.raw),
        });
    }

    None
}

/// Centered overlay rect as a percentage of the full area.
fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);
    horizontal[1]
}
