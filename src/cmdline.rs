use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use std::{
    env, fs,
    path::{Path, PathBuf},
};

use crate::stitch::Reduction;

/// Extract time, level and lat/lon subsets from a series of ERA5 files
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct E5SubsetArgs {
    #[command(subcommand)]
    pub command: Commands,
}

fn get_default_dir() -> PathBuf {
    env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Creates a template configuration file
    Template(TemplateArgs),
    /// Subset every stored time between two timestamps
    Range(RangeArgs),
    /// Subset around a point at a single time, interpolating in time if needed
    Point(PointArgs),
}

#[derive(Args, Debug)]
pub struct TemplateArgs {
    /// Where to create the template
    #[arg(short, long, value_name = "DIR", default_value=get_default_dir().join("e5subset-config").into_os_string())]
    pub template_dir: PathBuf,
}

/// Arguments shared by the query commands
#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Sets the config file
    #[arg(short, long, value_name = "FILE")]
    pub config: PathBuf,

    /// Variable to extract
    #[arg(short, long)]
    pub variable: String,

    /// Lower level bound, e.g. 500 (hPa)
    #[arg(long, requires = "level_max", allow_negative_numbers = true)]
    pub level_min: Option<f64>,

    /// Upper level bound
    #[arg(long, requires = "level_min", allow_negative_numbers = true)]
    pub level_max: Option<f64>,

    /// What to do with the level axis
    #[arg(long, value_enum, default_value_t = Reduction::Raw)]
    pub reduce: Reduction,
}

impl QueryArgs {
    pub fn levels(&self) -> Option<(f64, f64)> {
        self.level_min.zip(self.level_max)
    }
}

#[derive(Args, Debug)]
pub struct RangeArgs {
    #[command(flatten)]
    pub query: QueryArgs,

    /// First time, "YYYY-MM-DD hh" or "YYYY-MM-DD hh:mm:ss"
    #[arg(long)]
    pub start: String,

    /// Last time
    #[arg(long)]
    pub end: String,

    #[arg(long, allow_negative_numbers = true)]
    pub lat_min: f64,

    #[arg(long, allow_negative_numbers = true)]
    pub lat_max: f64,

    #[arg(long, allow_negative_numbers = true)]
    pub lon_min: f64,

    #[arg(long, allow_negative_numbers = true)]
    pub lon_max: f64,
}

#[derive(Args, Debug)]
pub struct PointArgs {
    #[command(flatten)]
    pub query: QueryArgs,

    /// "YYYY-MM-DD hh" or "YYYY-MM-DD hh:mm:ss"
    #[arg(long)]
    pub time: String,

    #[arg(long, allow_negative_numbers = true)]
    pub lon: f64,

    #[arg(long, allow_negative_numbers = true)]
    pub lat: f64,

    /// Degrees either side of the point
    #[arg(long)]
    pub half_width: f64,
}

fn check_config(config: &Path) -> Result<()> {
    if !config.exists() {
        return Err(anyhow!(
            "Configuration file \"{0}\" not found",
            config.display()
        ));
    }
    Ok(())
}

pub fn parse_cmdline() -> Result<E5SubsetArgs> {
    let args = E5SubsetArgs::parse_from(wild::args());
    check_args(&args)?;
    Ok(args)
}

pub fn check_args(args: &E5SubsetArgs) -> Result<()> {
    match &args.command {
        Commands::Template(TemplateArgs { template_dir }) => {
            if template_dir.exists() {
                if !template_dir.is_dir() {
                    return Err(anyhow!(
                        "Template directory path \"{0}\" is not a directory",
                        template_dir.display()
                    ));
                }
                let is_empty = template_dir.read_dir()?.next().is_none();
                if !is_empty {
                    return Err(anyhow!(
                        "Template directory \"{0}\" is not empty",
                        template_dir.display()
                    ));
                }
            } else {
                fs::create_dir_all(template_dir)?;
            }
        }
        Commands::Range(a) => check_config(&a.query.config)?,
        Commands::Point(a) => check_config(&a.query.config)?,
    }
    Ok(())
}

#[test]
fn verify_cli() {
    use clap::CommandFactory;
    E5SubsetArgs::command().debug_assert()
}

#[test]
fn parses_negative_bounds() {
    let args = E5SubsetArgs::parse_from([
        "e5subset",
        "range",
        "-c",
        "config.toml",
        "-v",
        "t",
        "--start",
        "2020-01-01 00",
        "--end",
        "2020-01-01 18",
        "--lat-min",
        "-45",
        "--lat-max",
        "-10",
        "--lon-min",
        "-20",
        "--lon-max",
        "15",
        "--level-min",
        "500",
        "--level-max",
        "850",
        "--reduce",
        "level-difference",
    ]);
    match args.command {
        Commands::Range(a) => {
            assert_eq!(a.lat_min, -45.0);
            assert_eq!(a.lon_min, -20.0);
            assert_eq!(a.query.levels(), Some((500.0, 850.0)));
            assert_eq!(a.query.reduce, Reduction::LevelDifference);
        }
        other => panic!("parsed as {:?}", other),
    }
}
