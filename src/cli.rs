//! Command-line interface definitions and argument parsing

use clap::Parser;
use std::path::PathBuf;

use crate::split::{SplitConfig, SplitStrategy};
use crate::viz::View;

/// Clean the London street-tree list, split it for modelling and plot it
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the borough tree list CSV file
    #[arg(short, long, default_value = "Borough_tree_list_2021July.csv")]
    pub input: PathBuf,

    /// Directory the rendered figures are written to
    #[arg(short, long, default_value = "plots")]
    pub output_dir: PathBuf,

    /// How the held-out test set is drawn
    #[arg(long, value_enum, default_value_t = SplitStrategy::Uniform)]
    pub strategy: SplitStrategy,

    /// Figure to render after the split
    #[arg(long, value_enum, default_value_t = View::Correlations)]
    pub view: View,

    /// Ask which tree type to analyse before splitting
    #[arg(long)]
    pub choose_tree: bool,

    /// Offer the map / histogram menu before splitting
    #[arg(long)]
    pub menu: bool,

    /// Seed for the split's random number generator
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Fraction of rows held out for testing
    #[arg(long, default_value = "0.2")]
    pub test_ratio: f64,

    /// Tree type the analysis is announced for
    #[arg(long, default_value = "London plane")]
    pub default_tree: String,

    /// Do not wait for <ENTER> after each figure
    #[arg(long)]
    pub no_wait: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    pub fn split_config(&self) -> SplitConfig {
        SplitConfig {
            test_ratio: self.test_ratio,
            seed: self.seed,
        }
    }
}
