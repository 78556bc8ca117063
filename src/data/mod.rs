use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use csv::ReaderBuilder;
use geojson::{GeoJson, Value};
use log::info;
use thiserror::Error;

use crate::{YEAR_MAX, YEAR_MIN};

/// Errors from loading the two static input files.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),
    /// One bad row fails the whole load; no partial dataset is exposed.
    #[error("malformed record at data row {row}: {detail}")]
    MalformedRecord { row: usize, detail: String },
    #[error("column {0:?} missing from CSV header")]
    MissingColumn(String),
    #[error("invalid GeoJSON: {0}")]
    Geo(#[from] geojson::Error),
    #[error("world file is not a FeatureCollection")]
    NotAFeatureCollection,
    #[error("invalid name table: {0}")]
    InvalidNameTable(String),
}

/// One country-year observation. Immutable after load.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub country: String,
    pub year: u16,
    pub injuries_per_million: f64,
}

/// One point of a per-country series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YearRate {
    pub year: u16,
    pub rate: f64,
}

/// The full injury dataset plus its per-country index.
///
/// Records are ordered alphabetically by country (then year), which is the
/// tie-break order the bar chart's stable sort relies on. The `by_country`
/// index is built eagerly so tooltip and trend lookups never rescan the
/// record list.
#[derive(Debug)]
pub struct Dataset {
    records: Vec<Record>,
    by_country: HashMap<String, Vec<YearRate>>,
    max_rate: f64,
}

impl Dataset {
    pub fn from_reader(reader: impl io::Read) -> Result<Self, DataError> {
        let mut rdr = ReaderBuilder::new().from_reader(reader);
        let headers = rdr.headers()?.clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| DataError::MissingColumn(name.to_string()))
        };
        let country_col = column("Country")?;
        let year_col = column("Year")?;
        let rate_col = column("InjuriesPerMillion")?;

        let mut records = Vec::new();
        for (idx, result) in rdr.records().enumerate() {
            let row = idx + 1;
            let raw = result?;
            let field = |col: usize| raw.get(col).unwrap_or("").trim();

            let country = field(country_col);
            if country.is_empty() {
                return Err(DataError::MalformedRecord {
                    row,
                    detail: "empty Country".to_string(),
                });
            }
            let year: u16 = field(year_col).parse().map_err(|_| DataError::MalformedRecord {
                row,
                detail: format!("Year {:?} is not a number", field(year_col)),
            })?;
            if !(YEAR_MIN..=YEAR_MAX).contains(&year) {
                return Err(DataError::MalformedRecord {
                    row,
                    detail: format!("Year {year} outside {YEAR_MIN}..={YEAR_MAX}"),
                });
            }
            let rate: f64 = field(rate_col).parse().map_err(|_| DataError::MalformedRecord {
                row,
                detail: format!("InjuriesPerMillion {:?} is not a number", field(rate_col)),
            })?;
            if !rate.is_finite() || rate < 0.0 {
                return Err(DataError::MalformedRecord {
                    row,
                    detail: format!("InjuriesPerMillion {rate} is negative or not finite"),
                });
            }

            records.push(Record {
                country: country.to_string(),
                year,
                injuries_per_million: rate,
            });
        }

        records.sort_by(|a, b| a.country.cmp(&b.country).then(a.year.cmp(&b.year)));

        let mut by_country: HashMap<String, Vec<YearRate>> = HashMap::new();
        let mut max_rate = 0.0f64;
        for r in &records {
            by_country
                .entry(r.country.clone())
                .or_default()
                .push(YearRate {
                    year: r.year,
                    rate: r.injuries_per_million,
                });
            max_rate = max_rate.max(r.injuries_per_million);
        }

        Ok(Self {
            records,
            by_country,
            max_rate,
        })
    }

    pub fn from_path(path: &Path) -> Result<Self, DataError> {
        let file = fs::File::open(path).map_err(|source| DataError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let dataset = Self::from_reader(io::BufReader::new(file))?;
        info!(
            "loaded {} records for {} countries from {}",
            dataset.records.len(),
            dataset.by_country.len(),
            path.display()
        );
        Ok(dataset)
    }

    /// All records, alphabetical by country then year.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Records for one year, preserving alphabetical country order.
    pub fn by_year(&self, year: u16) -> impl Iterator<Item = &Record> {
        self.records.iter().filter(move |r| r.year == year)
    }

    /// Year-ascending series for a canonical country name.
    pub fn series(&self, country: &str) -> Option<&[YearRate]> {
        self.by_country.get(country).map(Vec::as_slice)
    }

    /// Rate for one country-year, if observed.
    pub fn rate(&self, country: &str, year: u16) -> Option<f64> {
        self.series(country)?
            .iter()
            .find(|yr| yr.year == year)
            .map(|yr| yr.rate)
    }

    /// Maximum rate across the entire dataset. This is the choropleth's
    /// fixed color-domain upper bound, independent of the selected year.
    pub fn max_rate(&self) -> f64 {
        self.max_rate
    }
}

/// A closed polygon ring in lon/lat order.
pub type Ring = Vec<(f64, f64)>;

/// One GeoJSON country feature: raw source spelling, flattened rings
/// (exteriors and holes together, resolved by even-odd containment), and
/// a lon/lat bounding box for the spatial grid.
pub struct CountryShape {
    pub name: String,
    pub rings: Vec<Ring>,
    pub bbox: (f64, f64, f64, f64),
}

/// The world boundary collection, loaded once and held for process lifetime.
pub struct WorldMap {
    pub shapes: Vec<CountryShape>,
}

impl WorldMap {
    pub fn from_str(content: &str) -> Result<Self, DataError> {
        let geojson: GeoJson = content.parse()?;
        let GeoJson::FeatureCollection(fc) = geojson else {
            return Err(DataError::NotAFeatureCollection);
        };

        let mut shapes = Vec::new();
        for feature in fc.features {
            let name = match feature.properties.as_ref().and_then(|p| p.get("name")) {
                Some(serde_json::Value::String(s)) => s.clone(),
                _ => "Unknown".to_string(),
            };

            let mut rings: Vec<Ring> = Vec::new();
            if let Some(geometry) = feature.geometry {
                match geometry.value {
                    Value::Polygon(polygon) => collect_rings(&polygon, &mut rings),
                    Value::MultiPolygon(polygons) => {
                        for polygon in &polygons {
                            collect_rings(polygon, &mut rings);
                        }
                    }
                    // Points and lines carry no fillable area
                    _ => {}
                }
            }
            if rings.is_empty() {
                continue;
            }

            let bbox = rings_bbox(&rings);
            shapes.push(CountryShape { name, rings, bbox });
        }

        Ok(Self { shapes })
    }

    pub fn from_path(path: &Path) -> Result<Self, DataError> {
        let content = fs::read_to_string(path).map_err(|source| DataError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let world = Self::from_str(&content)?;
        info!(
            "loaded {} country shapes from {}",
            world.shapes.len(),
            path.display()
        );
        Ok(world)
    }
}

fn collect_rings(polygon: &[Vec<Vec<f64>>], out: &mut Vec<Ring>) {
    for ring in polygon {
        let points: Ring = ring
            .iter()
            .filter(|pos| pos.len() >= 2)
            .map(|pos| (pos[0], pos[1]))
            .collect();
        if points.len() >= 3 {
            out.push(points);
        }
    }
}

fn rings_bbox(rings: &[Ring]) -> (f64, f64, f64, f64) {
    let mut bbox = (f64::MAX, f64::MAX, f64::MIN, f64::MIN);
    for ring in rings {
        for &(lon, lat) in ring {
            bbox.0 = bbox.0.min(lon);
            bbox.1 = bbox.1.min(lat);
            bbox.2 = bbox.2.max(lon);
            bbox.3 = bbox.3.max(lat);
        }
    }
    bbox
}
