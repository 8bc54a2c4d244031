//! Treescope: prepares the London street-tree list for a tree height predictor
//!
//! This is the main entrypoint that orchestrates loading, the optional tree
//! type filter, the train/test split and the figures.

use anyhow::Result;
use clap::Parser;
use std::time::Instant;
use treescope::{
    choose_plot, load_trees, select_tree_type, show, split, Args, BitmapSink, ConsolePrompter,
    View,
};

fn main() -> Result<()> {
    env_logger::init();

    // Parse command-line arguments
    let args = Args::parse();

    if args.verbose {
        println!("Treescope - London street trees");
        println!("===============================\n");
    }

    run_pipeline(&args)
}

fn run_pipeline(args: &Args) -> Result<()> {
    let start_time = Instant::now();
    let mut prompter = ConsolePrompter;
    let mut sink = BitmapSink::new(&args.output_dir);
    if !args.no_wait {
        sink = sink.wait_with(Box::new(ConsolePrompter));
    }

    // Step 1: Load and clean data
    if args.verbose {
        println!("Step 1: Loading and cleaning data");
        println!("  Input file: {}", args.input.display());
    }

    let load_start = Instant::now();
    let mut trees = load_trees(&args.input)?;
    println!("✓ Data loaded: {} trees", trees.height());
    if args.verbose {
        println!("  Processing time: {:.2}s", load_start.elapsed().as_secs_f64());
        println!("  Columns: {:?}", trees.get_column_names());
    }

    // Step 2: Optional tree type filter and plot menu
    if args.verbose {
        println!("\nStep 2: Choosing what to analyse");
        println!("  Tree type prompt: {}", if args.choose_tree { "on" } else { "off" });
        println!("  Plot menu: {}", if args.menu { "on" } else { "off" });
    }

    if args.choose_tree {
        trees = select_tree_type(trees, &mut prompter, &args.default_tree)?;
    }
    if args.menu {
        if let Some(view) = choose_plot(&mut prompter)? {
            show(view, &trees, &mut sink)?;
        }
    }

    // Step 3: Split off the test set
    if args.verbose {
        println!("\nStep 3: Splitting off the test set");
        println!("  Strategy: {:?}", args.strategy);
        println!("  Test ratio: {}", args.test_ratio);
        println!("  Seed: {}", args.seed);
    }

    let sets = split(&trees, args.strategy, &args.split_config())?;
    println!(
        "✓ Split: {} training trees, {} test trees",
        sets.train.height(),
        sets.test.height()
    );

    // Step 4: Render the requested figure
    if args.verbose {
        println!("\nStep 4: Rendering figures");
        println!("  View: {:?}", args.view);
        println!("  Output directory: {}", args.output_dir.display());
    }

    let view_data = match args.view {
        View::Sized => &sets.train,
        _ => &trees,
    };
    if show(args.view, view_data, &mut sink)? {
        println!("✓ Figure rendered");
    }

    println!("\n=== Pipeline Complete ===");
    println!(
        "Total processing time: {:.2}s",
        start_time.elapsed().as_secs_f64()
    );

    Ok(())
}
