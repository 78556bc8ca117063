use std::path::PathBuf;

use log::warn;
use ratatui::layout::Rect;

use crate::chart::bars;
use crate::chart::trend::TrendView;
use crate::data::{DataError, Dataset, WorldMap};
use crate::map::color::ColorScale;
use crate::map::{Choropleth, Viewport};
use crate::names::NameReconciler;
use crate::{YEAR_MAX, YEAR_MIN};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// The shared view state every panel renders from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub year: u16,
    pub sort: SortDirection,
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            year: YEAR_MIN,
            sort: SortDirection::Ascending,
        }
    }
}

/// A selection mutation. All view-state changes flow through
/// [`App::apply`] so the dependent recomputes cannot be skipped.
#[derive(Debug, Clone, Copy)]
pub enum SelectionChange {
    Year(u16),
    Sort(SortDirection),
}

/// Everything that exists only after a successful load.
pub struct Loaded {
    pub dataset: Dataset,
    pub map: Choropleth,
    pub scale: ColorScale,
    /// Bar chart record order for the current selection, kept in sync by
    /// [`App::apply`].
    pub bar_order: Vec<usize>,
    pub trend: Option<TrendView>,
}

impl Loaded {
    pub fn new(dataset: Dataset, world: WorldMap, selection: Selection) -> Result<Self, DataError> {
        let names = NameReconciler::new()?;
        let scale = ColorScale::fixed(dataset.max_rate());
        let map = Choropleth::new(world, &names);
        let bar_order = bars::order(&dataset, selection.year, selection.sort);
        Ok(Self {
            dataset,
            map,
            scale,
            bar_order,
            trend: None,
        })
    }
}

/// Load lifecycle. Views are not wired to interactions until `Ready`;
/// a failed load keeps the message for the placeholder screen and waits
/// for a manual reload.
pub enum LoadState {
    NotLoaded { error: Option<String> },
    Ready(Box<Loaded>),
}

/// Screen areas recorded during the last render, for mouse hit-testing.
/// A zero-sized rect means the element was not drawn.
#[derive(Debug, Default, Clone, Copy)]
pub struct Regions {
    pub years: Rect,
    pub sort_asc: Rect,
    pub sort_desc: Rect,
    /// Bar chart plot area (block border excluded).
    pub bars: Rect,
    /// Map plot area (block border excluded).
    pub map: Rect,
    pub popup: Rect,
    pub popup_close: Rect,
}

/// Application state.
pub struct App {
    pub state: LoadState,
    pub selection: Selection,
    pub viewport: Viewport,
    pub regions: Regions,
    /// Current mouse position for hover tooltips.
    pub mouse_pos: Option<(u16, u16)>,
    /// Last mouse position while dragging the map.
    pub last_mouse: Option<(u16, u16)>,
    pub should_quit: bool,
    data_dir: PathBuf,
}

impl App {
    pub fn new(data_dir: PathBuf, width: usize, height: usize) -> Self {
        Self {
            state: LoadState::NotLoaded { error: None },
            selection: Selection::default(),
            // The render pass resizes this to the map panel every frame
            viewport: Viewport::world(width.saturating_mul(2), height.saturating_mul(4)),
            regions: Regions::default(),
            mouse_pos: None,
            last_mouse: None,
            should_quit: false,
            data_dir,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, LoadState::Ready(_))
    }

    pub fn loaded(&self) -> Option<&Loaded> {
        match &self.state {
            LoadState::Ready(loaded) => Some(loaded),
            LoadState::NotLoaded { .. } => None,
        }
    }

    pub fn loaded_mut(&mut self) -> Option<&mut Loaded> {
        match &mut self.state {
            LoadState::Ready(loaded) => Some(loaded),
            LoadState::NotLoaded { .. } => None,
        }
    }

    /// Load (or reload) both input files. Failure is non-fatal: the app
    /// stays usable in the not-loaded state and `r` retries.
    pub fn load(&mut self) {
        match self.try_load() {
            Ok(loaded) => self.state = LoadState::Ready(Box::new(loaded)),
            Err(err) => {
                warn!("load failed: {err}");
                self.state = LoadState::NotLoaded {
                    error: Some(err.to_string()),
                };
            }
        }
    }

    fn try_load(&self) -> Result<Loaded, DataError> {
        let dataset = Dataset::from_path(&self.data_dir.join("datacleaned.csv"))?;
        let world = WorldMap::from_path(&self.data_dir.join("world.geojson"))?;
        Loaded::new(dataset, world, self.selection)
    }

    /// Apply a selection change and synchronously update what depends on
    /// it: recompute the bar order, and on year changes (including a
    /// re-selection of the current year) mark the choropleth fill stale so
    /// the next frame repaints it for the selected year. Sort direction
    /// never touches the fill.
    ///
    /// Ignored until the load completes.
    pub fn apply(&mut self, change: SelectionChange) {
        let LoadState::Ready(loaded) = &mut self.state else {
            return;
        };

        let year_changed = match change {
            SelectionChange::Year(year) => {
                self.selection.year = year.clamp(YEAR_MIN, YEAR_MAX);
                true
            }
            SelectionChange::Sort(sort) => {
                self.selection.sort = sort;
                false
            }
        };
        loaded.bar_order = bars::order(&loaded.dataset, self.selection.year, self.selection.sort);
        if year_changed {
            loaded.map.invalidate_fill();
        }
    }

    /// Step the selected year, saturating at the range ends.
    pub fn step_year(&mut self, delta: i32) {
        let year = (self.selection.year as i32 + delta)
            .clamp(YEAR_MIN as i32, YEAR_MAX as i32) as u16;
        self.apply(SelectionChange::Year(year));
    }

    /// Open the trend popup for a country, replacing any open popup
    /// in place.
    pub fn open_trend(&mut self, country: &str) {
        if let Some(loaded) = self.loaded_mut() {
            let view = TrendView::open(&loaded.dataset, country);
            loaded.trend = Some(view);
        }
    }

    pub fn close_trend(&mut self) {
        if let Some(loaded) = self.loaded_mut() {
            loaded.trend = None;
        }
    }

    pub fn trend_open(&self) -> bool {
        self.loaded().is_some_and(|l| l.trend.is_some())
    }

    /// Open the trend for the bar at chart column `x` (if any).
    pub fn click_bar(&mut self, x: u16) {
        let Some(loaded) = self.loaded() else { return };
        let Some(slot) = bars::bar_at(x, loaded.bar_order.len(), self.regions.bars.width) else {
            return;
        };
        let country = loaded.dataset.records()[loaded.bar_order[slot]].country.clone();
        self.open_trend(&country);
    }

    pub fn pan(&mut self, dx: i32, dy: i32) {
        self.viewport.pan(dx, dy);
    }

    pub fn zoom_in(&mut self) {
        self.viewport.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.viewport.zoom_out();
    }

    /// Map a terminal cell inside the map panel to braille pixel
    /// coordinates in the viewport.
    pub fn map_pixel(&self, col: u16, row: u16) -> Option<(i32, i32)> {
        let map = self.regions.map;
        if col < map.x || col >= map.x + map.width || row < map.y || row >= map.y + map.height {
            return None;
        }
        Some((
            (col - map.x) as i32 * 2 + 1,
            (row - map.y) as i32 * 4 + 2,
        ))
    }

    pub fn zoom_in_at(&mut self, col: u16, row: u16) {
        if let Some((px, py)) = self.map_pixel(col, row) {
            self.viewport.zoom_in_at(px, py);
        }
    }

    pub fn zoom_out_at(&mut self, col: u16, row: u16) {
        if let Some((px, py)) = self.map_pixel(col, row) {
            self.viewport.zoom_out_at(px, py);
        }
    }

    pub fn set_mouse_pos(&mut self, col: u16, row: u16) {
        self.mouse_pos = Some((col, row));
    }

    /// Drag the map: pan opposite the cursor delta so the surface follows it.
    pub fn handle_drag(&mut self, col: u16, row: u16) {
        if let Some((last_col, last_row)) = self.last_mouse {
            let dx = (last_col as i32 - col as i32) * 2;
            let dy = (last_row as i32 - row as i32) * 4;
            self.pan(dx, dy);
        }
        self.last_mouse = Some((col, row));
    }

    pub fn end_drag(&mut self) {
        self.last_mouse = None;
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }
}
