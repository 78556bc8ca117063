use std::cmp::Ordering;

use ratatui::style::{Color, Style};
use ratatui::text::Line;
use ratatui::widgets::{Bar, BarChart, BarGroup};

use crate::app::SortDirection;
use crate::data::Dataset;

/// Bar fill, matching the source dashboard's steelblue.
const BAR_COLOR: Color = Color::Rgb(70, 130, 180);

pub const BAR_GAP: u16 = 1;
const BAR_WIDTH_MAX: u16 = 8;

/// Record indices (into `dataset.records()`) for one year, ordered by rate
/// per the sort direction.
///
/// The base record order is alphabetical by country, and the sort is
/// stable, so countries with equal rates keep alphabetical order in both
/// directions.
pub fn order(dataset: &Dataset, year: u16, sort: SortDirection) -> Vec<usize> {
    let mut indices: Vec<usize> = dataset
        .records()
        .iter()
        .enumerate()
        .filter(|(_, r)| r.year == year)
        .map(|(idx, _)| idx)
        .collect();

    let rate = |&idx: &usize| dataset.records()[idx].injuries_per_million;
    indices.sort_by(|a, b| {
        let ord = rate(a).partial_cmp(&rate(b)).unwrap_or(Ordering::Equal);
        match sort {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
    });
    indices
}

/// Bar width for `count` bars across `width` cells, between 1 and
/// [`BAR_WIDTH_MAX`]. Bars that still do not fit are clipped by the widget.
pub fn bar_width(count: usize, width: u16) -> u16 {
    if count == 0 {
        return 1;
    }
    let slots = width.saturating_add(BAR_GAP) / count as u16;
    slots.saturating_sub(BAR_GAP).clamp(1, BAR_WIDTH_MAX)
}

/// Which bar covers column `x` (relative to the chart's left edge), if any.
pub fn bar_at(x: u16, count: usize, width: u16) -> Option<usize> {
    let bw = bar_width(count, width);
    let slot = bw + BAR_GAP;
    let idx = (x / slot) as usize;
    if x % slot < bw && idx < count {
        Some(idx)
    } else {
        None
    }
}

/// Build the bar chart for the given record order. An empty order yields
/// an empty chart, not an error. The y domain is the filtered set's own
/// maximum, so bar heights rescale per year.
pub fn chart<'a>(dataset: &'a Dataset, order: &[usize], width: u16) -> BarChart<'a> {
    let bw = bar_width(order.len(), width);
    let mut max = 0u64;
    let bars: Vec<Bar> = order
        .iter()
        .map(|&idx| {
            let record = &dataset.records()[idx];
            let value = record.injuries_per_million.round() as u64;
            max = max.max(value);
            let label: String = record.country.chars().take(bw as usize).collect();
            Bar::default()
                .value(value)
                .text_value(String::new())
                .label(Line::from(label))
        })
        .collect();

    BarChart::default()
        .max(max.max(1))
        .bar_width(bw)
        .bar_gap(BAR_GAP)
        .bar_style(Style::default().fg(BAR_COLOR))
        .data(BarGroup::default().bars(&bars))
}
