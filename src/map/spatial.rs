use std::collections::HashMap;

/// Spatial hash grid over country bounding boxes.
///
/// Conservative approximation: each shape is inserted into every cell its
/// bbox overlaps, so a point query can return false positives (eliminated
/// by the point-in-polygon test downstream) but never false negatives.
pub struct ShapeGrid {
    cells: HashMap<(i32, i32), Vec<usize>>,
    cell_size: f64,
}

impl ShapeGrid {
    #[inline(always)]
    fn to_cell(cell_size: f64, lon: f64, lat: f64) -> (i32, i32) {
        (
            (lon / cell_size).floor() as i32,
            (lat / cell_size).floor() as i32,
        )
    }

    /// Build from shape bounding boxes `(min_lon, min_lat, max_lon, max_lat)`,
    /// indexed in iteration order.
    pub fn build(bboxes: impl Iterator<Item = (f64, f64, f64, f64)>, cell_size: f64) -> Self {
        let mut cells: HashMap<(i32, i32), Vec<usize>> = HashMap::new();
        for (idx, (min_lon, min_lat, max_lon, max_lat)) in bboxes.enumerate() {
            let min_cell = Self::to_cell(cell_size, min_lon, min_lat);
            let max_cell = Self::to_cell(cell_size, max_lon, max_lat);
            for y in min_cell.1..=max_cell.1 {
                for x in min_cell.0..=max_cell.0 {
                    cells.entry((x, y)).or_default().push(idx);
                }
            }
        }
        Self { cells, cell_size }
    }

    /// Indices of shapes whose bbox may contain the point.
    pub fn candidates(&self, lon: f64, lat: f64) -> &[usize] {
        self.cells
            .get(&Self::to_cell(self.cell_size, lon, lat))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_query_finds_overlapping_bboxes() {
        let bboxes = vec![
            (0.0, 0.0, 10.0, 10.0),   // 0
            (5.0, 5.0, 15.0, 15.0),   // 1
            (50.0, 50.0, 60.0, 60.0), // 2
        ];
        let grid = ShapeGrid::build(bboxes.into_iter(), 5.0);

        let hits = grid.candidates(7.0, 7.0);
        assert!(hits.contains(&0));
        assert!(hits.contains(&1));
        assert!(!hits.contains(&2));

        assert!(grid.candidates(55.0, 55.0).contains(&2));
        assert!(grid.candidates(-40.0, -40.0).is_empty());
    }

    #[test]
    fn negative_coordinates_index_correctly() {
        let grid = ShapeGrid::build(std::iter::once((-10.0, -10.0, -1.0, -1.0)), 5.0);
        assert!(grid.candidates(-5.0, -5.0).contains(&0));
        assert!(grid.candidates(5.0, 5.0).is_empty());
    }
}
