use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use ifc_reader::export::{export_csv, export_json};
use ifc_reader::model::{ParsingResult, SpatialElement};
use ifc_reader::parser::{IfcParser, ParserOptions};

#[derive(Parser, Debug)]
#[command(name = "ifc-reader")]
#[command(about = "IFC Reader - extract elements, spatial structure and properties from IFC files")]
#[command(version)]
struct Args {
    /// Path to IFC file
    #[arg(required = true)]
    file: PathBuf,

    /// Export elements to CSV
    #[arg(long, value_name = "FILE")]
    csv: Option<PathBuf>,

    /// Export the full result to JSON
    #[arg(long, value_name = "FILE")]
    json: Option<PathBuf>,

    /// Print the spatial hierarchy
    #[arg(long)]
    tree: bool,

    /// Print every recoverable error
    #[arg(long)]
    errors: bool,

    /// Deepest spatial level that may still receive children
    #[arg(long, value_name = "N", default_value_t = ParserOptions::default().max_hierarchy_depth)]
    max_depth: usize,

    /// Skip reading placeholder shapes
    #[arg(long)]
    no_shapes: bool,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let parser = IfcParser::with_options(ParserOptions {
        max_hierarchy_depth: args.max_depth,
        extract_shapes: !args.no_shapes,
        ..ParserOptions::default()
    });

    let result = parser.parse_file(&args.file)?;

    print_summary(&result);
    if args.tree {
        println!();
        print_tree(&result.spatial_structure, 0);
    }
    if args.errors {
        println!();
        for error in &result.errors {
            println!("{error}");
        }
    }

    if let Some(csv_path) = &args.csv {
        export_csv(&result, csv_path)?;
        println!("Exported to CSV: {}", csv_path.display());
    }

    if let Some(json_path) = &args.json {
        export_json(&result, json_path)?;
        println!("Exported to JSON: {}", json_path.display());
    }

    Ok(())
}

fn print_summary(result: &ParsingResult) {
    println!("Project:  {}", result.project_name());
    println!("Schema:   {}", result.schema());
    if !result.header.originating_system.is_empty() {
        println!("Source:   {}", result.header.originating_system);
    }
    println!("Elements: {}", result.elements.len());
    for (discipline, count) in result.discipline_counts() {
        println!("  {discipline:<14} {count}");
    }
    println!("Property sets: {}", result.property_sets.len());
    println!("Errors:   {}", result.errors.len());
}

fn print_tree(node: &SpatialElement, indent: usize) {
    let elevation = node
        .elevation
        .map(|e| format!(" @ {e:.2}"))
        .unwrap_or_default();
    println!(
        "{:indent$}{:?} {}{} ({} elements)",
        "",
        node.kind,
        node.name,
        elevation,
        node.contained_elements.len(),
        indent = indent * 2
    );
    for child in &node.children {
        print_tree(child, indent + 1);
    }
}
