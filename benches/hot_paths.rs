use std::fmt::Write;
use std::io::Cursor;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use crashmap::app::SortDirection;
use crashmap::chart::bars;
use crashmap::data::{Dataset, WorldMap};
use crashmap::map::color::ColorScale;
use crashmap::map::{Choropleth, Viewport};
use crashmap::names::NameReconciler;

/// Synthetic dataset: `countries` countries, full 2000-2023 coverage,
/// deterministic rates.
fn synthetic_dataset(countries: usize) -> Dataset {
    let mut csv = String::from("Country,Year,InjuriesPerMillion\n");
    for i in 0..countries {
        for year in 2000..=2023u16 {
            let rate = (i * 37 + year as usize * 13) % 500;
            writeln!(csv, "Country{i:03},{year},{rate}").unwrap();
        }
    }
    Dataset::from_reader(Cursor::new(csv)).unwrap()
}

/// Synthetic world: a grid of square countries named to join the dataset.
fn synthetic_world(countries: usize) -> WorldMap {
    let features: Vec<String> = (0..countries)
        .map(|i| {
            let lon = -170.0 + (i % 10) as f64 * 30.0;
            let lat = -75.0 + (i / 10) as f64 * 15.0;
            format!(
                r#"{{
                    "type": "Feature",
                    "properties": {{ "name": "Country{i:03}" }},
                    "geometry": {{
                        "type": "Polygon",
                        "coordinates": [[[{a}, {b}], [{c}, {b}], [{c}, {d}], [{a}, {d}], [{a}, {b}]]]
                    }}
                }}"#,
                a = lon,
                b = lat,
                c = lon + 12.0,
                d = lat + 10.0,
            )
        })
        .collect();
    let geojson = format!(
        r#"{{ "type": "FeatureCollection", "features": [{}] }}"#,
        features.join(",")
    );
    WorldMap::from_str(&geojson).unwrap()
}

fn bench_choropleth_fill(c: &mut Criterion) {
    let names = NameReconciler::new().unwrap();
    let mut map = Choropleth::new(synthetic_world(100), &names);
    let dataset = synthetic_dataset(100);
    let scale = ColorScale::fixed(dataset.max_rate());
    let (cols, rows) = (120usize, 40usize);
    let viewport = Viewport::world(cols * 2, rows * 4);

    c.bench_function("choropleth_fill_120x40", |b| {
        b.iter(|| {
            map.invalidate_fill();
            let frame = map.render(&viewport, &dataset, &scale, 2010, cols, rows);
            black_box(frame.fill.len())
        })
    });
}

fn bench_bar_order(c: &mut Criterion) {
    let dataset = synthetic_dataset(200);

    c.bench_function("bar_order_desc_200", |b| {
        b.iter(|| bars::order(black_box(&dataset), 2010, SortDirection::Descending))
    });
}

criterion_group!(benches, bench_choropleth_fill, bench_bar_order);
criterion_main!(benches);
