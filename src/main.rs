//! # cellscape Inspector
//!
//! A command-line tool for inspecting single-cell datasets before loading
//! them into the exploration front-end.
//!
//! ## Usage
//!
//! ```bash
//! # Summarize a dataset
//! cellscape info data.h5ad
//!
//! # List categorical annotation fields
//! cellscape fields data.h5ad
//!
//! # Show precomputed marker genes for one field
//! cellscape markers data.h5ad --field cell_ontology_class
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use cellscape::container::Hdf5Container;
use cellscape::dataset::Dataset;

/// cellscape - Single-Cell Dataset Inspector
#[derive(Parser)]
#[command(name = "cellscape")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display a summary of a dataset
    Info {
        /// Input HDF5 dataset path
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Emit the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// List categorical annotation fields
    Fields {
        /// Input HDF5 dataset path
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Show precomputed marker genes for an annotation field
    Markers {
        /// Input HDF5 dataset path
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Annotation field name
        #[arg(short, long)]
        field: String,

        /// Restrict output to one category label
        #[arg(short, long)]
        category: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    match cli.command {
        Commands::Info { file, json } => run_info(file, json),
        Commands::Fields { file } => run_fields(file),
        Commands::Markers {
            file,
            field,
            category,
        } => run_markers(file, field, category),
    }
}

fn open_dataset(file: &PathBuf) -> Result<Dataset<Hdf5Container>> {
    let container = Hdf5Container::open(file)
        .with_context(|| format!("Failed to open {}", file.display()))?;
    Dataset::open(container).context("Failed to load dataset")
}

/// Display a dataset summary
fn run_info(file: PathBuf, json: bool) -> Result<()> {
    let dataset = open_dataset(&file)?;
    let summary = dataset.summary();

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("cellscape Dataset Information");
    println!("=============================");
    println!("File: {}", file.display());
    println!();
    println!("Cells:             {}", summary.n_cells);
    println!("Genes:             {}", summary.n_genes);
    println!("Non-zero entries:  {}", summary.nnz);
    println!("Informative genes: {}", summary.n_informative_genes);
    println!();
    println!("Annotation fields: {}", summary.annotation_fields.len());
    if let Some(default) = &summary.default_field {
        println!("Default field:     {default}");
    }

    Ok(())
}

/// List categorical annotation fields and their cardinality
fn run_fields(file: PathBuf) -> Result<()> {
    let dataset = open_dataset(&file)?;

    println!("Annotation Fields");
    println!("=================");
    for field in dataset.annotations().fields() {
        let marker = if field.color_encodable { "" } else { " (metadata only)" };
        println!(
            "  {} - {} categories{marker}",
            field.name,
            field.categories.len()
        );
    }

    Ok(())
}

/// Show precomputed marker genes for one field
fn run_markers(file: PathBuf, field: String, category: Option<String>) -> Result<()> {
    let dataset = open_dataset(&file)?;

    let field_index = dataset
        .annotations()
        .fields()
        .iter()
        .position(|f| f.name == field)
        .with_context(|| format!("No annotation field named '{field}'"))?;

    let categories = dataset.categories_for(field_index)?.to_vec();
    let category_index = match &category {
        Some(label) => Some(
            categories
                .iter()
                .position(|c| c == label)
                .with_context(|| format!("No category labeled '{label}' in '{field}'"))?,
        ),
        None => None,
    };

    let table = dataset.marker_table(field_index, category_index)?;
    if table.is_absent() {
        println!("No precomputed marker table for field '{field}'");
        return Ok(());
    }

    let shown: Vec<usize> = match category_index {
        Some(c) => vec![c],
        None => (0..table.n_categories).collect(),
    };
    for (slot, &cat) in shown.iter().enumerate() {
        println!("{}:", categories[cat]);
        for (name, p) in table.names[slot].iter().zip(&table.p_values[slot]) {
            println!("  {name}  (p={p:.3e})");
        }
    }

    Ok(())
}
