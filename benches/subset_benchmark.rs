use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ndarray::{Array, IxDyn};

use e5subset::appconfig::SubsetConfigBuilder;
use e5subset::grid::memory::{MemoryGrid, MemorySource};
use e5subset::{Reduction, Region, SubsetRequestBuilder, Subsetter, TimeSelection};

/// Eight daily files of 6-hourly data on a one degree global grid
fn era5_like() -> Subsetter<MemorySource> {
    let levels = vec![500.0, 850.0];
    let lat: Vec<f64> = (0..181).map(|ii| 90.0 - ii as f64).collect();
    let lon: Vec<f64> = (0..360).map(|ii| ii as f64).collect();

    let mut source = MemorySource::new();
    for day in 0..8 {
        let times: Vec<f64> = (0..4).map(|ii| (day * 24 + ii * 6) as f64).collect();
        let shape = [times.len(), levels.len(), lat.len(), lon.len()];
        let t = Array::from_shape_fn(IxDyn(&shape), |ix| {
            250.0 + times[ix[0]] * 0.01 + ix[1] as f64 * 20.0 - lat[ix[2]].abs() * 0.5
                + (lon[ix[3]].to_radians()).sin()
        });
        let grid = MemoryGrid::new()
            .with_coordinate("time", times, Some("hours since 2020-01-01 00:00:00"))
            .with_coordinate("level", levels.clone(), Some("millibars"))
            .with_coordinate("latitude", lat.clone(), Some("degrees_north"))
            .with_coordinate("longitude", lon.clone(), Some("degrees_east"))
            .with_variable("t", t, Some("K"));
        source.insert(format!("/era5/e5_pl_t_202001{:02}.nc", day + 1), grid);
    }
    let config = SubsetConfigBuilder::default()
        .data_dir("/era5".into())
        .file_id("e5_pl_t_".into())
        .build()
        .unwrap();
    Subsetter::new(source, config)
}

fn subset_benchmark(c: &mut Criterion) {
    let subsetter = era5_like();

    let range = SubsetRequestBuilder::default()
        .variable("t")
        .time(TimeSelection::Range {
            start: "2020-01-02 06".into(),
            end: "2020-01-07 12".into(),
        })
        .region(Region::Box {
            lat_min: 30.0,
            lat_max: 70.0,
            lon_min: -40.0,
            lon_max: 40.0,
        })
        .reduction(Reduction::LevelMean)
        .build()
        .unwrap();

    let point = SubsetRequestBuilder::default()
        .variable("t")
        .time(TimeSelection::Instant("2020-01-04 21:30".into()))
        .region(Region::Centered {
            lon: 151.2,
            lat: -33.9,
            half_width: 5.0,
        })
        .levels((500.0, 850.0))
        .reduction(Reduction::LevelDifference)
        .build()
        .unwrap();

    c.bench_function("multi-file wraparound range", |b| {
        b.iter(|| subsetter.subset(black_box(&range)).unwrap())
    });

    c.bench_function("interpolated instant across files", |b| {
        b.iter(|| subsetter.subset(black_box(&point)).unwrap())
    });
}

criterion_group!(benches, subset_benchmark);
criterion_main!(benches);
