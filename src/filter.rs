//! Interactive narrowing of the table to one tree type, and the plot menu

use polars::prelude::*;

use crate::data::{distinct_names, head, print_info, print_summary, COMMON_NAME};
use crate::prompt::Prompter;
use crate::viz::View;

/// Keep only the trees whose common name is exactly `name`
///
/// An unknown name is not an error, it gives an empty table.
pub fn filter_by_name(df: &DataFrame, name: &str) -> crate::Result<DataFrame> {
    let filtered = df
        .clone()
        .lazy()
        .filter(col(COMMON_NAME).eq(lit(name)))
        .collect()?;

    if filtered.height() == 0 {
        log::warn!("no trees named '{}' in the dataset", name);
    }

    Ok(filtered)
}

/// Offer to change the analysed tree type
///
/// Answering anything but `y` returns `df` unchanged. Otherwise the distinct
/// names are listed, one is read back without validation, and the sample rows,
/// schema and summary statistics of the narrowed table are printed.
pub fn select_tree_type<P: Prompter + ?Sized>(
    df: DataFrame,
    prompter: &mut P,
    default_name: &str,
) -> crate::Result<DataFrame> {
    println!(
        "The data will be prepared for {} trees\n\nIf you wish to look at a different type of tree,",
        default_name
    );
    let change = prompter.ask("type 'y'. Otherwise, <ENTER> ")?;
    if change != "y" {
        return Ok(df);
    }

    let names = distinct_names(&df)?;
    println!("Here are all the trees {:?}", names);
    let chosen = prompter.ask("\n\nChoose one tree: ")?;

    let filtered = filter_by_name(&df, &chosen)?;
    log::info!("narrowed to {} '{}' trees", filtered.height(), chosen);

    println!("{}", head(&filtered, 10));
    print_info(&filtered);
    print_summary(&filtered)?;

    Ok(filtered)
}

/// Ask whether to see the tree map or the histograms; anything else skips
pub fn choose_plot<P: Prompter + ?Sized>(prompter: &mut P) -> crate::Result<Option<View>> {
    println!("\n\nWould you like to see a map or histogram?\n");
    println!("To see a map, type 'm':");
    println!("For a histogram, its 'h':");

    let view = match prompter.ask("Or press <ENTER> to skip: ")?.as_str() {
        "m" => Some(View::Map),
        "h" => Some(View::Histograms),
        _ => None,
    };

    Ok(view)
}
