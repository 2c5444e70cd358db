/// These are the main top-level driver functions
use std::fs;

use anyhow::{Context, Result};
use itertools::Itertools;
use log::info;

use crate::appconfig::{SubsetConfig, SubsetConfigBuilder};
use crate::cmdline::*;
use crate::grid::nc::NetcdfSource;
use crate::query::{
    Region, SubsetRequest, SubsetRequestBuilder, SubsetResult, Subsetter, TimeSelection,
};

fn create_template(cmd_args: &TemplateArgs) -> Result<()> {
    info!("Writing template to {}", cmd_args.template_dir.display());

    let config = SubsetConfigBuilder::default().build()?;
    let config_str = toml::to_string(&config)?;

    let config_fname = cmd_args.template_dir.join("config.toml");
    info!(
        "Writing example configuration file to {}",
        config_fname.display()
    );
    fs::write(&config_fname, config_str)?;

    println!(
        "Template created.  Edit data_dir and file_id in {} then run, for example:\n> e5subset point --config {} --variable t --time \"2020-01-01 09\" --lon 151.2 --lat -33.9 --half-width 2",
        config_fname.display(),
        config_fname.display()
    );
    Ok(())
}

fn load_config(args: &QueryArgs) -> Result<SubsetConfig> {
    info!("Loading configuration from {}", args.config.display());
    let raw_toml = fs::read_to_string(&args.config)
        .with_context(|| format!("reading {}", args.config.display()))?;
    let config: SubsetConfig = toml::from_str(raw_toml.as_str())?;
    Ok(config)
}

fn base_request(args: &QueryArgs) -> SubsetRequestBuilder {
    let mut b = SubsetRequestBuilder::default();
    b.variable(args.variable.as_str())
        .levels(args.levels())
        .reduction(args.reduce);
    b
}

fn range_request(args: &RangeArgs) -> Result<SubsetRequest> {
    Ok(base_request(&args.query)
        .time(TimeSelection::Range {
            start: args.start.clone(),
            end: args.end.clone(),
        })
        .region(Region::Box {
            lat_min: args.lat_min,
            lat_max: args.lat_max,
            lon_min: args.lon_min,
            lon_max: args.lon_max,
        })
        .build()?)
}

fn point_request(args: &PointArgs) -> Result<SubsetRequest> {
    Ok(base_request(&args.query)
        .time(TimeSelection::Instant(args.time.clone()))
        .region(Region::Centered {
            lon: args.lon,
            lat: args.lat,
            half_width: args.half_width,
        })
        .build()?)
}

fn extent(values: &[f64]) -> String {
    match (values.first(), values.last()) {
        (Some(a), Some(b)) => format!("{} .. {} ({} values)", a, b, values.len()),
        _ => "empty".to_string(),
    }
}

/// Human-readable description of a subset
pub fn summarise(result: &SubsetResult) -> String {
    let finite = result.data.iter().copied().filter(|x| x.is_finite());
    let (count, sum, min, max) = finite.fold(
        (0usize, 0.0, f64::INFINITY, f64::NEG_INFINITY),
        |(n, s, lo, hi), x| (n + 1, s + x, lo.min(x), hi.max(x)),
    );

    let mut lines = vec![format!(
        "shape: {:?} ({})",
        result.data.shape(),
        result.dims.iter().map(|d| format!("{:?}", d).to_lowercase()).join(", ")
    )];
    match result.datetimes() {
        Ok(t) if !t.is_empty() => lines.push(format!(
            "time: {} .. {} ({} values)",
            t[0],
            t[t.len() - 1],
            t.len()
        )),
        _ => lines.push(format!("time: {}", extent(&result.times))),
    }
    if let Some(levels) = &result.levels {
        lines.push(format!("level: {}", extent(levels)));
    }
    lines.push(format!("latitude: {}", extent(&result.latitudes)));
    lines.push(format!("longitude: {}", extent(&result.longitudes)));
    if count > 0 {
        lines.push(format!(
            "min {} max {} mean {} ({} of {} values finite)",
            min,
            max,
            sum / count as f64,
            count,
            result.data.len()
        ));
    } else {
        lines.push("no finite values".to_string());
    }
    lines.join("\n")
}

fn run_query(args: &QueryArgs, request: SubsetRequest) -> Result<SubsetResult> {
    let config = load_config(args)?;
    let subsetter = Subsetter::new(NetcdfSource, config);
    let result = subsetter.subset(&request)?;
    println!("{}", summarise(&result));
    Ok(result)
}

pub fn main_body(program_args: E5SubsetArgs) -> Result<()> {
    match &program_args.command {
        Commands::Template(cmd_args) => {
            create_template(cmd_args)?;
        }
        Commands::Range(cmd_args) => {
            run_query(&cmd_args.query, range_request(cmd_args)?)?;
        }
        Commands::Point(cmd_args) => {
            run_query(&cmd_args.query, point_request(cmd_args)?)?;
        }
    }
    Ok(())
}
