//! Entry point for the zonal-stats application.
//! Handles CLI parsing, loading the grid and regions, running the extraction, and
//! writing or printing the resulting table.

use clap::Parser;
use tracing_subscriber::EnvFilter;
use zonal_stats::{
    export_table, extract, get_parallel_info, load_grid_with_diagnostics, load_region_set,
    print_metadata, ExtractOptions, ParallelConfig, ZonalValue,
};

mod cli;

use cli::Args;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command-line arguments
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    ParallelConfig::new(args.threads).setup_global_pool()?;
    if args.verbose {
        get_parallel_info().log();
    }

    if args.describe {
        let file = netcdf::open(&args.grid)?;
        print_metadata(&file)?;
    }

    // Open the grid, printing its metadata on request
    let grid = load_grid_with_diagnostics(&args.grid, &args.variable, |metadata| {
        if args.describe {
            metadata.print();
        }
    })?;
    println!(
        "Loaded '{}' from {}: {} layer(s) of {} x {} cells",
        args.variable,
        args.grid.display(),
        grid.layer_count(),
        grid.rows(),
        grid.cols()
    );

    let Some(regions_path) = &args.regions else {
        return Ok(());
    };

    let regions = load_region_set(regions_path, &args.state_field, &args.district_field)?;
    println!(
        "Loaded {} region(s) from {}",
        regions.len(),
        regions_path.display()
    );

    let aggregation = if args.fractional {
        args.stat.weighted()
    } else {
        args.stat.unweighted()
    };
    let options = ExtractOptions::new(aggregation)
        .with_remove_missing(!args.keep_missing)
        .with_policy(args.policy());

    println!(
        "Computing {} per region using {} membership",
        args.stat,
        options.policy.as_str()
    );
    let table = extract(
        &grid,
        &regions,
        &args.state_field,
        &args.district_field,
        &options,
    )?;

    if export_table(&table, args.output.as_deref())? {
        if let Some(output) = &args.output {
            println!("✅ Saved result to {}", output.display());
        }
    } else {
        println!("{}", table.column_names().join("\t"));
        for row in &table.rows {
            let values: Vec<String> = row.values.iter().map(ZonalValue::to_string).collect();
            println!("{}\t{}\t{}", row.state, row.district, values.join("\t"));
        }
    }

    Ok(())
}
