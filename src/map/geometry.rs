use crate::braille::BrailleCanvas;
use crate::data::Ring;

/// Draw a line using Bresenham's algorithm.
pub fn draw_line(canvas: &mut BrailleCanvas, x0: i32, y0: i32, x1: i32, y1: i32) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    let mut x = x0;
    let mut y = y0;

    loop {
        canvas.set_pixel_signed(x, y);

        if x == x1 && y == y1 {
            break;
        }

        let e2 = 2 * err;

        if e2 >= dy {
            if x == x1 {
                break;
            }
            err += dy;
            x += sx;
        }

        if e2 <= dx {
            if y == y1 {
                break;
            }
            err += dx;
            y += sy;
        }
    }
}

/// Draw a small cross marker (trend data points).
pub fn draw_marker(canvas: &mut BrailleCanvas, x: i32, y: i32, size: i32) {
    for i in -size..=size {
        canvas.set_pixel_signed(x + i, y);
        canvas.set_pixel_signed(x, y + i);
    }
}

/// Even-odd containment test over a feature's flattened rings.
/// A point inside an exterior ring and inside one of its holes crosses an
/// even number of edges and is correctly reported outside, so exteriors
/// and holes need no separate handling.
pub fn point_in_rings(lon: f64, lat: f64, rings: &[Ring]) -> bool {
    let mut inside = false;
    for ring in rings {
        let n = ring.len();
        if n < 3 {
            continue;
        }
        let mut j = n - 1;
        for i in 0..n {
            let (xi, yi) = ring[i];
            let (xj, yj) = ring[j];
            if (yi > lat) != (yj > lat)
                && lon < (xj - xi) * (lat - yi) / (yj - yi) + xi
            {
                inside = !inside;
            }
            j = i;
        }
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(min: f64, max: f64) -> Ring {
        vec![(min, min), (max, min), (max, max), (min, max), (min, min)]
    }

    #[test]
    fn point_in_simple_square() {
        let rings = vec![square(0.0, 10.0)];
        assert!(point_in_rings(5.0, 5.0, &rings));
        assert!(!point_in_rings(15.0, 5.0, &rings));
        assert!(!point_in_rings(-1.0, -1.0, &rings));
    }

    #[test]
    fn hole_is_outside() {
        let rings = vec![square(0.0, 10.0), square(4.0, 6.0)];
        assert!(point_in_rings(2.0, 2.0, &rings));
        assert!(!point_in_rings(5.0, 5.0, &rings));
    }

    #[test]
    fn disjoint_polygons_both_inside() {
        let rings = vec![square(0.0, 10.0), square(20.0, 30.0)];
        assert!(point_in_rings(5.0, 5.0, &rings));
        assert!(point_in_rings(25.0, 25.0, &rings));
        assert!(!point_in_rings(15.0, 15.0, &rings));
    }

    #[test]
    fn horizontal_line_sets_pixels() {
        let mut canvas = BrailleCanvas::new(5, 1);
        draw_line(&mut canvas, 0, 0, 9, 0);
        for cx in 0..5 {
            assert!(canvas.cell(cx, 0).is_some());
        }
    }

    #[test]
    fn vertical_line_sets_pixels() {
        let mut canvas = BrailleCanvas::new(1, 2);
        draw_line(&mut canvas, 0, 0, 0, 7);
        assert!(canvas.cell(0, 0).is_some());
        assert!(canvas.cell(0, 1).is_some());
    }

    #[test]
    fn marker_is_centered() {
        let mut canvas = BrailleCanvas::new(3, 2);
        draw_marker(&mut canvas, 2, 2, 1);
        assert!(canvas.cell(1, 0).is_some());
    }
}
