//! Defines command-line interface options using `clap` for the zonal-stats application.

use clap::Parser;
use std::path::PathBuf;
use zonal_stats::{BoundaryRule, MembershipPolicy, StatOperation};

/// Zonal statistics of a NetCDF grid over shapefile regions
#[derive(Parser, Debug)]
#[command(
    version,
    name = "zonal-stats",
    about = "Aggregate gridded NetCDF variables over polygon regions"
)]
pub struct Args {
    /// Path to the NetCDF file holding the grid
    #[arg(short, long)]
    pub grid: PathBuf,

    /// Grid variable to aggregate
    #[arg(short = 'n', long)]
    pub variable: String,

    /// Path to the polygon shapefile (.shp)
    #[arg(short, long, required_unless_present = "describe")]
    pub regions: Option<PathBuf>,

    /// Attribute field used as the first (state) label column
    #[arg(long, default_value = "state")]
    pub state_field: String,

    /// Attribute field used as the second (district) label column
    #[arg(long, default_value = "district")]
    pub district_field: String,

    /// Statistic to compute: mean, sum, min, max, median, count or std
    #[arg(short, long, default_value = "mean", value_parser = parse_stat_arg)]
    pub stat: StatOperation,

    /// Weight cells by the fraction of their area inside each region
    #[arg(long, default_value_t = false)]
    pub fractional: bool,

    /// Treatment of cell centres on a region edge: inclusive or exclusive
    #[arg(long, default_value = "inclusive", value_parser = parse_boundary_arg)]
    pub boundary: BoundaryRule,

    /// Pass missing cells to the statistic instead of dropping them
    #[arg(long, default_value_t = false)]
    pub keep_missing: bool,

    /// Path to save the result table as CSV. If not set, prints to terminal.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Number of threads to use for parallel processing. Defaults to number of CPU cores.
    #[arg(short = 't', long)]
    pub threads: Option<usize>,

    /// Print the grid variable's metadata while loading
    #[arg(long, default_value_t = false)]
    pub describe: bool,

    /// Enable verbose output.
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl Args {
    /// Membership policy selected by `--fractional` and `--boundary`
    pub fn policy(&self) -> MembershipPolicy {
        if self.fractional {
            MembershipPolicy::Fractional
        } else {
            MembershipPolicy::Centroid(self.boundary)
        }
    }
}

fn parse_stat_arg(s: &str) -> Result<StatOperation, String> {
    s.parse::<StatOperation>().map_err(|e| e.to_string())
}

fn parse_boundary_arg(s: &str) -> Result<BoundaryRule, String> {
    match s.to_ascii_lowercase().as_str() {
        "inclusive" => Ok(BoundaryRule::Inclusive),
        "exclusive" => Ok(BoundaryRule::Exclusive),
        _ => Err("Invalid boundary rule: expected 'inclusive' or 'exclusive'.".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_invocation() {
        let args = Args::try_parse_from([
            "zonal-stats",
            "--grid",
            "rain.nc",
            "--variable",
            "precip",
            "--regions",
            "districts.shp",
            "--stat",
            "sum",
            "--fractional",
            "--output",
            "out.csv",
        ])
        .unwrap();
        assert_eq!(args.stat, StatOperation::Sum);
        assert_eq!(args.policy(), MembershipPolicy::Fractional);
        assert_eq!(args.state_field, "state");
        assert!(!args.keep_missing);
    }

    #[test]
    fn boundary_and_describe_only() {
        let args = Args::try_parse_from([
            "zonal-stats",
            "-g",
            "rain.nc",
            "-n",
            "precip",
            "--describe",
            "--boundary",
            "exclusive",
        ])
        .unwrap();
        assert!(args.regions.is_none());
        assert_eq!(args.policy(), MembershipPolicy::Centroid(BoundaryRule::Exclusive));

        assert!(Args::try_parse_from(["zonal-stats", "-g", "a.nc", "-n", "v"]).is_err());
        assert!(parse_boundary_arg("edge").is_err());
    }
}
