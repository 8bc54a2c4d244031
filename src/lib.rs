//! Treescope: cleaning, splitting and plotting the London street-tree list
//!
//! The pipeline loads the borough tree list CSV, drops columns and incomplete
//! rows, optionally narrows it to one tree type, splits it into training and
//! test sets, and renders exploratory figures.

pub mod cli;
pub mod data;
pub mod error;
pub mod filter;
pub mod prompt;
pub mod render;
pub mod split;
pub mod viz;

// Re-export public items for easier access
pub use cli::Args;
pub use data::{clean_trees, load_trees};
pub use error::TreeError;
pub use filter::{choose_plot, filter_by_name, select_tree_type};
pub use prompt::{ConsolePrompter, Prompter, ScriptedPrompter};
pub use render::{show, BitmapSink, RecordingSink, RenderSink};
pub use split::{split, split_stratified, split_uniform, SplitConfig, SplitStrategy, TrainTestSplit};
pub use viz::{Figure, View};

/// Common result type used throughout the application
pub type Result<T> = anyhow::Result<T>;
