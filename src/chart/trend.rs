use crate::braille::BrailleCanvas;
use crate::data::{Dataset, YearRate};
use crate::map::geometry::{draw_line, draw_marker};
use crate::YEAR_MIN;

/// One country's rate trend, shown in the popup overlay. At most one exists
/// at a time; opening another country replaces the whole value, so nothing
/// from a previous popup can leak into the next.
pub struct TrendView {
    pub country: String,
    series: Vec<YearRate>,
    max_rate: f64,
}

impl TrendView {
    /// Build from an arbitrary series: drops years before [`YEAR_MIN`] and
    /// sorts ascending by year.
    pub fn new(country: &str, series: impl IntoIterator<Item = YearRate>) -> Self {
        let mut series: Vec<YearRate> =
            series.into_iter().filter(|yr| yr.year >= YEAR_MIN).collect();
        series.sort_by_key(|yr| yr.year);
        let max_rate = series.iter().fold(0.0f64, |max, yr| max.max(yr.rate));
        Self {
            country: country.to_string(),
            series,
            max_rate,
        }
    }

    /// Open the trend for one country. A country absent from the dataset
    /// yields an empty series, rendered as an empty chart.
    pub fn open(dataset: &Dataset, country: &str) -> Self {
        Self::new(
            country,
            dataset.series(country).unwrap_or(&[]).iter().copied(),
        )
    }

    pub fn title(&self) -> String {
        format!("Injuries Per Million for {}", self.country)
    }

    pub fn series(&self) -> &[YearRate] {
        &self.series
    }

    /// Y-axis upper bound: the series' own maximum (the popup is a
    /// per-country view, unlike the cross-country choropleth domain).
    pub fn max_rate(&self) -> f64 {
        self.max_rate
    }

    /// First and last year of the series, for the x-axis labels.
    pub fn year_span(&self) -> Option<(u16, u16)> {
        Some((self.series.first()?.year, self.series.last()?.year))
    }

    /// Render the connected trend path with a marker per observation.
    pub fn polyline(&self, cols: usize, rows: usize) -> BrailleCanvas {
        let mut canvas = BrailleCanvas::new(cols, rows);
        let (width, height) = (cols * 2, rows * 4);
        if width == 0 || height == 0 || self.series.is_empty() {
            return canvas;
        }

        let (first, last) = (self.series[0].year, self.series[self.series.len() - 1].year);
        let x_span = (last - first).max(1) as f64;
        let y_max = if self.max_rate > 0.0 { self.max_rate } else { 1.0 };

        let project = |yr: &YearRate| {
            let x = (yr.year - first) as f64 / x_span * (width - 1) as f64;
            let y = (1.0 - yr.rate / y_max) * (height - 1) as f64;
            (x.round() as i32, y.round() as i32)
        };

        let mut prev: Option<(i32, i32)> = None;
        for yr in &self.series {
            let (x, y) = project(yr);
            if let Some((px, py)) = prev {
                draw_line(&mut canvas, px, py, x, y);
            }
            draw_marker(&mut canvas, x, y, 1);
            prev = Some((x, y));
        }
        canvas
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn yr(year: u16, rate: f64) -> YearRate {
        YearRate { year, rate }
    }

    #[test]
    fn series_is_year_ascending_from_year_min() {
        let view = TrendView::new(
            "Germany",
            [yr(2003, 30.0), yr(1998, 99.0), yr(2000, 10.0), yr(2001, 20.0)],
        );
        let years: Vec<_> = view.series().iter().map(|p| p.year).collect();
        assert_eq!(years, [2000, 2001, 2003]);
        assert_eq!(view.max_rate(), 30.0);
        assert_eq!(view.year_span(), Some((2000, 2003)));
    }

    #[test]
    fn open_reads_full_country_series() {
        let csv = "Country,Year,InjuriesPerMillion\n\
                   Germany,2001,60\n\
                   Germany,2000,40\n\
                   France,2000,50\n";
        let dataset = Dataset::from_reader(Cursor::new(csv)).unwrap();
        let view = TrendView::open(&dataset, "Germany");
        assert_eq!(view.title(), "Injuries Per Million for Germany");
        assert_eq!(view.series().len(), 2);
        assert_eq!(view.series()[0], yr(2000, 40.0));
    }

    #[test]
    fn unknown_country_is_empty_not_an_error() {
        let csv = "Country,Year,InjuriesPerMillion\nFrance,2000,50\n";
        let dataset = Dataset::from_reader(Cursor::new(csv)).unwrap();
        let view = TrendView::open(&dataset, "Atlantis");
        assert!(view.series().is_empty());
        assert_eq!(view.year_span(), None);
        // Rendering the empty series must not panic
        let canvas = view.polyline(20, 5);
        assert!((0..20).all(|cx| canvas.cell(cx, 0).is_none()));
    }

    #[test]
    fn polyline_touches_both_ends() {
        let view = TrendView::new("France", [yr(2000, 0.0), yr(2023, 100.0)]);
        let canvas = view.polyline(20, 5);
        // Rising series: bottom-left start, top-right end
        assert!(canvas.cell(0, 4).is_some());
        assert!(canvas.cell(19, 0).is_some());
    }

    #[test]
    fn flat_single_point_renders_a_marker() {
        let view = TrendView::new("Malta", [yr(2010, 5.0)]);
        let canvas = view.polyline(10, 4);
        let drawn = (0..4)
            .flat_map(|cy| (0..10).map(move |cx| (cx, cy)))
            .any(|(cx, cy)| canvas.cell(cx, cy).is_some());
        assert!(drawn);
    }
}
