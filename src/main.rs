//! gridconf CLI
//!
//! Entry point for the `gridconf` command-line tool.

use clap::{Parser, Subcommand};
use gridconf::{ExpansionManifest, Grid};
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(name = "gridconf")]
#[command(about = "Grid-search configuration expansion", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Expand a configuration document into its configurations
    Expand {
        /// Path to the experiment configuration file
        config: PathBuf,

        /// Print the expansion manifest as JSON instead of YAML documents
        #[arg(long)]
        json: bool,

        /// Write the expansion manifest here instead of printing
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Print the number of configurations a document expands to
    Count {
        /// Path to the experiment configuration file
        config: PathBuf,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Print a single resolved configuration
    Show {
        /// Path to the experiment configuration file
        config: PathBuf,

        /// Zero-based index into the expansion
        index: usize,

        /// Output in JSON format instead of YAML
        #[arg(long)]
        json: bool,
    },

    /// Validate a configuration document and summarize its expansion
    Verify {
        /// Path to the experiment configuration file
        config: PathBuf,

        /// Also check a manifest produced by `expand` for drift
        #[arg(long, short = 'm')]
        manifest: Option<PathBuf>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Expand {
            config,
            json,
            output,
        } => {
            run_expand(&config, json, output);
        }
        Commands::Count { config, json } => {
            run_count(&config, json);
        }
        Commands::Show {
            config,
            index,
            json,
        } => {
            run_show(&config, index, json);
        }
        Commands::Verify {
            config,
            manifest,
            json,
        } => {
            run_verify(&config, manifest, json);
        }
    }
}

fn load_grid(config_path: &Path) -> Grid {
    match Grid::from_file(config_path) {
        Ok(grid) => grid,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            process::exit(1);
        }
    }
}

fn run_expand(config_path: &Path, json_output: bool, output: Option<PathBuf>) {
    let grid = load_grid(config_path);

    for key in grid.overridden_keys() {
        eprintln!("Warning: grid key '{}' overwritten by shared metadata", key);
    }

    if let Some(path) = output {
        let manifest = ExpansionManifest::from_grid(&grid);
        if let Err(e) = manifest.write_to_file(&path) {
            eprintln!("Error writing manifest: {}", e);
            process::exit(1);
        }
        println!(
            "Expanded {} configurations: {}",
            grid.len(),
            grid.experiment_name()
        );
        println!("Manifest written: {}", path.display());
        return;
    }

    if json_output {
        match ExpansionManifest::from_grid(&grid).to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing manifest: {}", e);
                process::exit(1);
            }
        }
    } else {
        // one YAML document per configuration
        for config in &grid {
            match serde_yaml::to_string(config.mapping()) {
                Ok(yaml) => {
                    println!("---");
                    print!("{}", yaml);
                }
                Err(e) => {
                    eprintln!("Error serializing config: {}", e);
                    process::exit(1);
                }
            }
        }
    }
}

fn run_count(config_path: &Path, json_output: bool) {
    let grid = load_grid(config_path);

    if json_output {
        let output = serde_json::json!({
            "exp_name": grid.experiment_name(),
            "dataset_name": grid.metadata().dataset_name,
            "num_configs": grid.len(),
        });
        match serde_json::to_string_pretty(&output) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing output: {}", e);
                process::exit(1);
            }
        }
    } else {
        println!("{}", grid.len());
    }
}

fn run_show(config_path: &Path, index: usize, json_output: bool) {
    let grid = load_grid(config_path);

    let config = match grid.get(index) {
        Some(config) => config,
        None => {
            eprintln!(
                "Config index {} out of range: grid has {} configurations",
                index,
                grid.len()
            );
            process::exit(1);
        }
    };

    if json_output {
        match serde_json::to_string_pretty(config.mapping()) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing config: {}", e);
                process::exit(1);
            }
        }
    } else {
        match serde_yaml::to_string(config.mapping()) {
            Ok(yaml) => print!("{}", yaml),
            Err(e) => {
                eprintln!("Error serializing config: {}", e);
                process::exit(1);
            }
        }
    }
}

fn run_verify(config_path: &Path, manifest_path: Option<PathBuf>, json_output: bool) {
    let grid = load_grid(config_path);

    let mismatches = manifest_path.map(|path| {
        let manifest = match ExpansionManifest::from_file(&path) {
            Ok(manifest) => manifest,
            Err(e) => {
                eprintln!("Error loading manifest: {}", e);
                process::exit(1);
            }
        };
        manifest.verify_against(&grid)
    });

    if json_output {
        let mut output = serde_json::json!({
            "valid": true,
            "exp_name": grid.experiment_name(),
            "dataset_name": grid.metadata().dataset_name,
            "device": grid.metadata().device,
            "num_configs": grid.len(),
            "overridden_keys": grid.overridden_keys(),
        });
        if let Some(ref mismatches) = mismatches {
            output["manifest_matches"] = serde_json::json!(mismatches.is_empty());
            output["mismatches"] = serde_json::json!(mismatches);
        }
        match serde_json::to_string_pretty(&output) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing output: {}", e);
                process::exit(1);
            }
        }
    } else {
        println!("Configuration valid: {}", config_path.display());
        println!();
        println!("  Experiment: {}", grid.experiment_name());
        println!("  Dataset: {}", grid.metadata().dataset_name);
        println!("  Device: {}", grid.metadata().device);
        println!("  Configurations: {}", grid.len());
        if let Some(loader) = &grid.metadata().data_loader {
            println!("  Data loader: {}", loader.class_name);
        }
        for key in grid.overridden_keys() {
            println!("  Warning: grid key '{}' overwritten by shared metadata", key);
        }
        if let Some(ref mismatches) = mismatches {
            println!();
            if mismatches.is_empty() {
                println!("Manifest matches: {} configurations.", grid.len());
            } else {
                println!("Manifest drift detected:");
                for line in mismatches {
                    println!("  - {}", line);
                }
            }
        }
    }

    if let Some(mismatches) = mismatches {
        if !mismatches.is_empty() {
            process::exit(1);
        }
    }
}
