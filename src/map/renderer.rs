use ratatui::style::Color;
use rayon::prelude::*;

use crate::braille::BrailleCanvas;
use crate::data::{Dataset, WorldMap};
use crate::map::color::{ColorScale, NO_DATA};
use crate::map::geometry::{draw_line, point_in_rings};
use crate::map::projection::Viewport;
use crate::map::spatial::ShapeGrid;
use crate::names::NameReconciler;

/// Grid cell size in degrees; coarse enough that most cells hold a handful
/// of candidate countries.
const GRID_CELL_DEGREES: f64 = 10.0;

/// One rendered map frame: per-cell fill colors plus a border overlay.
/// `fill` is row-major, `cols * rows`; `None` means water (terminal default).
pub struct MapFrame<'a> {
    pub fill: &'a [Option<Color>],
    pub cols: usize,
    pub rows: usize,
    pub borders: BrailleCanvas,
}

/// A country under the cursor: the raw GeoJSON spelling for display and
/// the canonical spelling for dataset lookups.
pub struct Hit<'a> {
    pub raw: &'a str,
    pub canonical: &'a str,
}

#[derive(PartialEq)]
struct FillKey {
    cols: usize,
    rows: usize,
    year: u16,
    center_lon: u64,
    center_lat: u64,
    zoom: u64,
}

/// Choropleth renderer over the loaded world geometry.
///
/// The fill raster samples each cell center: unproject to lon/lat, find the
/// containing country, join it to the dataset through the name reconciler,
/// and color by the fixed-domain scale. The raster is cached and recomputed
/// only when the year, viewport, or panel size changes.
pub struct Choropleth {
    world: WorldMap,
    canonical: Vec<String>,
    grid: ShapeGrid,
    fill: Vec<Option<Color>>,
    fill_key: Option<FillKey>,
}

impl Choropleth {
    pub fn new(world: WorldMap, names: &NameReconciler) -> Self {
        let canonical = world
            .shapes
            .iter()
            .map(|s| names.canonicalize(&s.name).to_string())
            .collect();
        let grid = ShapeGrid::build(world.shapes.iter().map(|s| s.bbox), GRID_CELL_DEGREES);
        Self {
            world,
            canonical,
            grid,
            fill: Vec::new(),
            fill_key: None,
        }
    }

    /// Drop the cached fill raster (selected year changed).
    pub fn invalidate_fill(&mut self) {
        self.fill_key = None;
    }

    /// Whether a fill recompute is pending for the given frame parameters.
    pub fn fill_stale(&self, viewport: &Viewport, year: u16, cols: usize, rows: usize) -> bool {
        self.fill_key
            .as_ref()
            .map_or(true, |key| *key != fill_key(viewport, year, cols, rows))
    }

    /// Index of the country containing the point, if any.
    fn shape_at(&self, lon: f64, lat: f64) -> Option<usize> {
        self.grid
            .candidates(lon, lat)
            .iter()
            .copied()
            .find(|&idx| {
                let shape = &self.world.shapes[idx];
                bbox_contains(shape.bbox, lon, lat) && point_in_rings(lon, lat, &shape.rings)
            })
    }

    /// Country under a geographic point, for hover tooltips.
    pub fn hit_test(&self, lon: f64, lat: f64) -> Option<Hit<'_>> {
        let idx = self.shape_at(lon, lat)?;
        Some(Hit {
            raw: &self.world.shapes[idx].name,
            canonical: &self.canonical[idx],
        })
    }

    /// Produce the frame for the current selection, reusing the cached fill
    /// when nothing it depends on has changed.
    pub fn render(
        &mut self,
        viewport: &Viewport,
        dataset: &Dataset,
        scale: &ColorScale,
        year: u16,
        cols: usize,
        rows: usize,
    ) -> MapFrame<'_> {
        let key = fill_key(viewport, year, cols, rows);
        if self.fill_key.as_ref() != Some(&key) {
            self.fill = self.rasterize(viewport, dataset, scale, year, cols, rows);
            self.fill_key = Some(key);
        }

        let mut borders = BrailleCanvas::new(cols, rows);
        self.draw_borders(&mut borders, viewport);

        MapFrame {
            fill: &self.fill,
            cols,
            rows,
            borders,
        }
    }

    fn rasterize(
        &self,
        viewport: &Viewport,
        dataset: &Dataset,
        scale: &ColorScale,
        year: u16,
        cols: usize,
        rows: usize,
    ) -> Vec<Option<Color>> {
        let mut cells = vec![None; cols * rows];
        cells
            .par_chunks_mut(cols.max(1))
            .enumerate()
            .for_each(|(cy, row)| {
                for (cx, cell) in row.iter_mut().enumerate() {
                    // Sample the center of the cell's 2x4 braille block
                    let (lon, lat) = viewport.unproject(cx as i32 * 2 + 1, cy as i32 * 4 + 2);
                    if !(-90.0..=90.0).contains(&lat) {
                        continue;
                    }
                    if let Some(idx) = self.shape_at(lon, lat) {
                        *cell = Some(match dataset.rate(&self.canonical[idx], year) {
                            Some(rate) => scale.color(rate),
                            None => NO_DATA,
                        });
                    }
                }
            });
        cells
    }

    fn draw_borders(&self, canvas: &mut BrailleCanvas, viewport: &Viewport) {
        for shape in &self.world.shapes {
            for ring in &shape.rings {
                self.draw_ring(canvas, ring, viewport);
            }
        }
    }

    /// Project and draw one ring with viewport culling, skipping segments
    /// that span more than a screen width (antimeridian wraps).
    fn draw_ring(&self, canvas: &mut BrailleCanvas, ring: &[(f64, f64)], viewport: &Viewport) {
        let mut prev: Option<(i32, i32)> = None;
        for &(lon, lat) in ring {
            let (px, py) = viewport.project(lon, lat);
            if let Some((prev_x, prev_y)) = prev {
                let dist = ((px - prev_x).abs() + (py - prev_y).abs()) as usize;
                if dist < viewport.width && viewport.segment_visible((prev_x, prev_y), (px, py)) {
                    draw_line(canvas, prev_x, prev_y, px, py);
                }
            }
            prev = Some((px, py));
        }
    }
}

fn fill_key(viewport: &Viewport, year: u16, cols: usize, rows: usize) -> FillKey {
    FillKey {
        cols,
        rows,
        year,
        center_lon: viewport.center_lon.to_bits(),
        center_lat: viewport.center_lat.to_bits(),
        zoom: viewport.zoom.to_bits(),
    }
}

#[inline]
fn bbox_contains(bbox: (f64, f64, f64, f64), lon: f64, lat: f64) -> bool {
    lon >= bbox.0 && lon <= bbox.2 && lat >= bbox.1 && lat <= bbox.3
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Dataset;
    use std::io::Cursor;

    fn square_feature(name: &str, min: f64, max: f64) -> String {
        format!(
            r#"{{
                "type": "Feature",
                "properties": {{ "name": "{name}" }},
                "geometry": {{
                    "type": "Polygon",
                    "coordinates": [[[{min}, {min}], [{max}, {min}], [{max}, {max}], [{min}, {max}], [{min}, {min}]]]
                }}
            }}"#
        )
    }

    fn test_world() -> WorldMap {
        let geojson = format!(
            r#"{{ "type": "FeatureCollection", "features": [{}, {}] }}"#,
            square_feature("United States of America", 0.0, 10.0),
            square_feature("Atlantis", 20.0, 30.0),
        );
        WorldMap::from_str(&geojson).unwrap()
    }

    fn test_dataset() -> Dataset {
        let csv = "Country,Year,InjuriesPerMillion\n\
                   United States,2000,100\n\
                   United States,2001,200\n\
                   France,2000,50\n";
        Dataset::from_reader(Cursor::new(csv)).unwrap()
    }

    fn choropleth() -> Choropleth {
        Choropleth::new(test_world(), &NameReconciler::new().unwrap())
    }

    /// Fill cell index containing the projection of a geographic point.
    fn cell_for(viewport: &Viewport, cols: usize, lon: f64, lat: f64) -> usize {
        let (px, py) = viewport.project(lon, lat);
        (py as usize / 4) * cols + px as usize / 2
    }

    #[test]
    fn hit_test_reconciles_raw_spelling() {
        let map = choropleth();
        let hit = map.hit_test(5.0, 5.0).unwrap();
        assert_eq!(hit.raw, "United States of America");
        assert_eq!(hit.canonical, "United States");
        assert!(map.hit_test(15.0, 15.0).is_none());
    }

    #[test]
    fn fill_joins_through_reconciler() {
        let mut map = choropleth();
        let dataset = test_dataset();
        let scale = ColorScale::fixed(dataset.max_rate());
        let (cols, rows) = (40, 20);
        let viewport = Viewport::new(15.0, 5.0, 2.0, cols * 2, rows * 4);

        let frame = map.render(&viewport, &dataset, &scale, 2000, cols, rows);
        let us = frame.fill[cell_for(&viewport, cols, 5.0, 5.0)];
        assert_eq!(us, Some(scale.color(100.0)));
    }

    #[test]
    fn fill_color_uses_global_domain_not_per_year() {
        let mut map = choropleth();
        let dataset = test_dataset();
        // Domain must come from the whole dataset (max 200 in 2001), even
        // when rendering 2000 whose own max is 100.
        let scale = ColorScale::fixed(dataset.max_rate());
        let (cols, rows) = (40, 20);
        let viewport = Viewport::new(15.0, 5.0, 2.0, cols * 2, rows * 4);

        let frame = map.render(&viewport, &dataset, &scale, 2000, cols, rows);
        let us = frame.fill[cell_for(&viewport, cols, 5.0, 5.0)].unwrap();
        assert_eq!(us, ColorScale::fixed(200.0).color(100.0));
        assert_ne!(us, ColorScale::fixed(100.0).color(100.0));
    }

    #[test]
    fn unmapped_country_is_no_data_every_year() {
        let mut map = choropleth();
        let dataset = test_dataset();
        let scale = ColorScale::fixed(dataset.max_rate());
        let (cols, rows) = (40, 20);
        let viewport = Viewport::new(15.0, 5.0, 2.0, cols * 2, rows * 4);

        for year in [2000, 2001, 2010] {
            map.invalidate_fill();
            let frame = map.render(&viewport, &dataset, &scale, year, cols, rows);
            let atlantis = frame.fill[cell_for(&viewport, cols, 25.0, 25.0)];
            assert_eq!(atlantis, Some(NO_DATA));
        }
    }

    #[test]
    fn year_without_records_is_no_data() {
        let mut map = choropleth();
        let dataset = test_dataset();
        let scale = ColorScale::fixed(dataset.max_rate());
        let (cols, rows) = (40, 20);
        let viewport = Viewport::new(15.0, 5.0, 2.0, cols * 2, rows * 4);

        let frame = map.render(&viewport, &dataset, &scale, 2005, cols, rows);
        let us = frame.fill[cell_for(&viewport, cols, 5.0, 5.0)];
        assert_eq!(us, Some(NO_DATA));
    }

    #[test]
    fn water_cells_stay_unfilled() {
        let mut map = choropleth();
        let dataset = test_dataset();
        let scale = ColorScale::fixed(dataset.max_rate());
        let (cols, rows) = (40, 20);
        let viewport = Viewport::new(15.0, 5.0, 2.0, cols * 2, rows * 4);

        let frame = map.render(&viewport, &dataset, &scale, 2000, cols, rows);
        let sea = frame.fill[cell_for(&viewport, cols, 15.0, -20.0)];
        assert_eq!(sea, None);
    }

    #[test]
    fn fill_cache_tracks_year_and_viewport() {
        let mut map = choropleth();
        let (cols, rows) = (40, 20);
        let viewport = Viewport::new(15.0, 5.0, 2.0, cols * 2, rows * 4);
        let dataset = test_dataset();
        let scale = ColorScale::fixed(dataset.max_rate());

        assert!(map.fill_stale(&viewport, 2000, cols, rows));
        map.render(&viewport, &dataset, &scale, 2000, cols, rows);
        assert!(!map.fill_stale(&viewport, 2000, cols, rows));
        // Year change alone makes it stale again
        assert!(map.fill_stale(&viewport, 2001, cols, rows));

        let mut moved = viewport.clone();
        moved.pan(10, 0);
        assert!(map.fill_stale(&moved, 2000, cols, rows));

        map.invalidate_fill();
        assert!(map.fill_stale(&viewport, 2000, cols, rows));
    }

    #[test]
    fn borders_drawn_for_visible_shapes() {
        let mut map = choropleth();
        let dataset = test_dataset();
        let scale = ColorScale::fixed(dataset.max_rate());
        let (cols, rows) = (40, 20);
        let viewport = Viewport::new(15.0, 5.0, 2.0, cols * 2, rows * 4);

        let frame = map.render(&viewport, &dataset, &scale, 2000, cols, rows);
        let drawn = (0..rows)
            .flat_map(|cy| (0..cols).map(move |cx| (cx, cy)))
            .filter(|&(cx, cy)| frame.borders.cell(cx, cy).is_some())
            .count();
        assert!(drawn > 0);
    }
}
