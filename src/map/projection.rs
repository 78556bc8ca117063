use std::f64::consts::PI;

const ZOOM_MIN: f64 = 0.5;
const ZOOM_MAX: f64 = 60.0;
const ZOOM_STEP: f64 = 1.5;

/// Web-Mercator normalized coordinates in [0, 1] x [0, 1].
#[inline]
fn mercator(lon: f64, lat: f64) -> (f64, f64) {
    let x = (lon + 180.0) / 360.0;
    let lat_rad = lat * PI / 180.0;
    let y = (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0;
    (x, y)
}

/// The visible map window: center, zoom, and canvas pixel dimensions.
/// Pixels are braille pixels (2 per cell horizontally, 4 vertically).
#[derive(Clone)]
pub struct Viewport {
    pub center_lon: f64,
    pub center_lat: f64,
    pub zoom: f64,
    pub width: usize,
    pub height: usize,
}

impl Viewport {
    pub fn new(center_lon: f64, center_lat: f64, zoom: f64, width: usize, height: usize) -> Self {
        Self {
            center_lon,
            center_lat,
            zoom,
            width,
            height,
        }
    }

    /// Whole-world view, biased north where most landmass sits.
    pub fn world(width: usize, height: usize) -> Self {
        Self::new(0.0, 20.0, 1.0, width, height)
    }

    fn scale(&self) -> f64 {
        self.zoom * self.width as f64
    }

    /// Project lon/lat to canvas pixel coordinates.
    pub fn project(&self, lon: f64, lat: f64) -> (i32, i32) {
        let (x, y) = mercator(lon, lat);
        let (cx, cy) = mercator(self.center_lon, self.center_lat);
        let scale = self.scale();
        let px = ((x - cx) * scale + self.width as f64 / 2.0) as i32;
        let py = ((y - cy) * scale + self.height as f64 / 2.0) as i32;
        (px, py)
    }

    /// Inverse of [`project`](Self::project).
    pub fn unproject(&self, px: i32, py: i32) -> (f64, f64) {
        let (cx, cy) = mercator(self.center_lon, self.center_lat);
        let scale = self.scale();
        let x = (px as f64 - self.width as f64 / 2.0) / scale + cx;
        let y = (py as f64 - self.height as f64 / 2.0) / scale + cy;

        let lon = x * 360.0 - 180.0;
        let lat = (PI * (1.0 - 2.0 * y)).sinh().atan() * 180.0 / PI;
        (lon, lat)
    }

    /// Pan by a pixel delta, wrapping longitude and clamping latitude
    /// short of the Mercator poles.
    pub fn pan(&mut self, dx: i32, dy: i32) {
        let degrees_per_px = 360.0 / self.scale();
        self.center_lon += dx as f64 * degrees_per_px;
        self.center_lat -= dy as f64 * degrees_per_px * 0.5;

        if self.center_lon > 180.0 {
            self.center_lon -= 360.0;
        } else if self.center_lon < -180.0 {
            self.center_lon += 360.0;
        }
        self.center_lat = self.center_lat.clamp(-85.0, 85.0);
    }

    pub fn zoom_in(&mut self) {
        self.zoom = (self.zoom * ZOOM_STEP).min(ZOOM_MAX);
    }

    pub fn zoom_out(&mut self) {
        self.zoom = (self.zoom / ZOOM_STEP).max(ZOOM_MIN);
    }

    /// Zoom by a factor keeping the geography under (px, py) fixed.
    fn zoom_at(&mut self, px: i32, py: i32, factor: f64) {
        let (lon, lat) = self.unproject(px, py);
        self.zoom = (self.zoom * factor).clamp(ZOOM_MIN, ZOOM_MAX);
        let (new_px, new_py) = self.project(lon, lat);
        self.pan(new_px - px, new_py - py);
    }

    pub fn zoom_in_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, ZOOM_STEP);
    }

    pub fn zoom_out_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, 1.0 / ZOOM_STEP);
    }

    /// Rough bounding-box visibility check for a projected segment.
    pub fn segment_visible(&self, p1: (i32, i32), p2: (i32, i32)) -> bool {
        p1.0.max(p2.0) >= 0
            && p1.0.min(p2.0) < self.width as i32
            && p1.1.max(p2.1) >= 0
            && p1.1.min(p2.1) < self.height as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projects_center_to_canvas_center() {
        let vp = Viewport::new(0.0, 0.0, 1.0, 100, 100);
        assert_eq!(vp.project(0.0, 0.0), (50, 50));
    }

    #[test]
    fn unproject_inverts_project() {
        let vp = Viewport::new(12.0, 48.0, 4.0, 200, 120);
        let (px, py) = vp.project(2.35, 48.85);
        let (lon, lat) = vp.unproject(px, py);
        assert!((lon - 2.35).abs() < 1.0);
        assert!((lat - 48.85).abs() < 1.0);
    }

    #[test]
    fn pan_east_moves_center_east() {
        let mut vp = Viewport::new(0.0, 0.0, 1.0, 100, 100);
        vp.pan(10, 0);
        assert!(vp.center_lon > 0.0);
    }

    #[test]
    fn pan_wraps_longitude() {
        let mut vp = Viewport::new(179.0, 0.0, 1.0, 100, 100);
        vp.pan(50, 0);
        assert!(vp.center_lon < 0.0);
    }

    #[test]
    fn zoom_is_clamped() {
        let mut vp = Viewport::world(100, 100);
        for _ in 0..100 {
            vp.zoom_out();
        }
        assert_eq!(vp.zoom, ZOOM_MIN);
        for _ in 0..100 {
            vp.zoom_in();
        }
        assert_eq!(vp.zoom, ZOOM_MAX);
    }

    #[test]
    fn zoom_at_keeps_point_fixed() {
        let mut vp = Viewport::world(200, 120);
        let (lon0, lat0) = vp.unproject(30, 40);
        vp.zoom_in_at(30, 40);
        let (lon1, lat1) = vp.unproject(30, 40);
        assert!((lon0 - lon1).abs() < 2.0);
        assert!((lat0 - lat1).abs() < 2.0);
    }
}
