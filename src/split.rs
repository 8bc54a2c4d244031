//! Train/test partitioning of the tree table
//!
//! Two strategies are offered. The uniform split shuffles every row with a
//! seeded generator. The stratified split first buckets trunk diameter into
//! three equal-width ranges and samples each bucket separately, so the share
//! of thin, medium and thick trunks matches on both sides.
//!
//! The stratified split does not work on the real borough tree list: trunk
//! diameters are heavy-tailed, so equal-width buckets leave the upper ranges
//! with zero or one tree, and a bucket of one cannot appear on both sides.
//! The split is refused with [`TreeError::SparseStratum`] in that case.

use polars::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::data::{float_values, DIAMETER};
use crate::error::TreeError;

/// Number of diameter buckets used by the stratified split
pub const BUCKETS: usize = 3;

/// How the held-out set is drawn
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitStrategy {
    /// Shuffle all rows, no balance guarantee
    Uniform,
    /// Preserve the share of each trunk-diameter bucket
    Stratified,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitConfig {
    /// Fraction of rows held out, in `(0, 1)`
    pub test_ratio: f64,
    pub seed: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_ratio: 0.2,
            seed: 42,
        }
    }
}

impl SplitConfig {
    /// `(train, test)` sizes for a table of `n` rows; the test side is rounded up
    pub fn sizes(&self, n: usize) -> Result<(usize, usize), TreeError> {
        if !(self.test_ratio > 0.0 && self.test_ratio < 1.0) {
            return Err(TreeError::InvalidSplit(format!(
                "test ratio {} is not between 0 and 1",
                self.test_ratio
            )));
        }
        if n == 0 {
            return Err(TreeError::InvalidSplit("the table has no rows".to_string()));
        }

        let n_test = (self.test_ratio * n as f64).ceil() as usize;
        let n_train = n - n_test;
        if n_train == 0 {
            return Err(TreeError::InvalidSplit(format!(
                "a test ratio of {} leaves no training rows out of {}",
                self.test_ratio, n
            )));
        }

        Ok((n_train, n_test))
    }
}

/// Two disjoint tables covering the input
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub train: DataFrame,
    pub test: DataFrame,
}

/// Split with the chosen strategy
pub fn split(
    df: &DataFrame,
    strategy: SplitStrategy,
    config: &SplitConfig,
) -> crate::Result<TrainTestSplit> {
    let result = match strategy {
        SplitStrategy::Uniform => split_uniform(df, config)?,
        SplitStrategy::Stratified => split_stratified(df, config)?,
    };

    log::info!(
        "{:?} split: {} train rows, {} test rows",
        strategy,
        result.train.height(),
        result.test.height()
    );

    Ok(result)
}

/// Randomly hold out `test_ratio` of the rows
pub fn split_uniform(df: &DataFrame, config: &SplitConfig) -> crate::Result<TrainTestSplit> {
    let (_, n_test) = config.sizes(df.height())?;

    let mut rows: Vec<IdxSize> = (0..df.height() as IdxSize).collect();
    let mut rng = StdRng::seed_from_u64(config.seed);
    rows.shuffle(&mut rng);

    let (test, train) = rows.split_at(n_test);
    take_rows(df, train.to_vec(), test.to_vec())
}

/// Hold out `test_ratio` of every trunk-diameter bucket
pub fn split_stratified(df: &DataFrame, config: &SplitConfig) -> crate::Result<TrainTestSplit> {
    let (n_train, n_test) = config.sizes(df.height())?;

    let bins = DiameterBins::fit(df)?;
    let mut members: [Vec<IdxSize>; BUCKETS] = Default::default();
    for (row, bucket) in bins.assign(df)?.into_iter().enumerate() {
        members[usize::from(bucket) - 1].push(row as IdxSize);
    }

    let counts: Vec<usize> = members.iter().map(Vec::len).collect();
    log::debug!(
        "diameter bucket sizes {:?} for edges {:?}",
        counts,
        bins.edges()
    );

    if let Some(index) = counts.iter().position(|&count| count == 1) {
        return Err(TreeError::SparseStratum {
            bucket: index as u8 + 1,
        }
        .into());
    }
    let occupied = counts.iter().filter(|&&count| count > 0).count();
    for (side, size) in [("train", n_train), ("test", n_test)] {
        if size < occupied {
            return Err(TreeError::TooFewRows {
                side,
                size,
                buckets: occupied,
            }
            .into());
        }
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut train = Vec::with_capacity(n_train);
    let mut test = Vec::with_capacity(n_test);
    for (rows, share) in members.iter_mut().zip(apportion(&counts, n_train)) {
        rows.shuffle(&mut rng);
        let (left, right) = rows.split_at(share);
        train.extend_from_slice(left);
        test.extend_from_slice(right);
    }
    train.shuffle(&mut rng);
    test.shuffle(&mut rng);

    take_rows(df, train, test)
}

fn take_rows(df: &DataFrame, train: Vec<IdxSize>, test: Vec<IdxSize>) -> crate::Result<TrainTestSplit> {
    Ok(TrainTestSplit {
        train: df.take(&IdxCa::from_vec("train".into(), train))?,
        test: df.take(&IdxCa::from_vec("test".into(), test))?,
    })
}

/// Largest-remainder apportionment of `total` over `counts`
fn apportion(counts: &[usize], total: usize) -> Vec<usize> {
    let n: usize = counts.iter().sum();
    let exact: Vec<f64> = counts
        .iter()
        .map(|&count| count as f64 * total as f64 / n as f64)
        .collect();
    let mut shares: Vec<usize> = exact.iter().map(|e| e.floor() as usize).collect();

    let mut order: Vec<usize> = (0..counts.len()).collect();
    order.sort_by(|&a, &b| (exact[b] - exact[b].floor()).total_cmp(&(exact[a] - exact[a].floor())));

    let missing = total.saturating_sub(shares.iter().sum());
    for &i in order.iter().take(missing) {
        shares[i] += 1;
    }

    shares
}

/// Three equal-width, right-inclusive diameter ranges labelled 1, 2 and 3
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiameterBins {
    min: f64,
    max: f64,
}

impl DiameterBins {
    /// Fit the ranges to the smallest and largest diameter of `df`
    pub fn fit(df: &DataFrame) -> crate::Result<Self> {
        let (min, max) = float_values(df, DIAMETER)?
            .into_iter()
            .flatten()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));

        if min > max {
            return Err(TreeError::InvalidSplit("no trunk diameters to bucket".to_string()).into());
        }

        Ok(Self { min, max })
    }

    /// Inner edges between buckets 1|2 and 2|3
    pub fn edges(&self) -> [f64; 2] {
        let width = (self.max - self.min) / BUCKETS as f64;
        [self.min + width, self.min + 2.0 * width]
    }

    /// Bucket label of one diameter; a zero-width range puts everything in 2
    pub fn bucket(&self, diameter: f64) -> u8 {
        if self.max == self.min {
            return 2;
        }

        let [first, second] = self.edges();
        if diameter <= first {
            1
        } else if diameter <= second {
            2
        } else {
            3
        }
    }

    /// Bucket label of every row of `df`
    pub fn assign(&self, df: &DataFrame) -> crate::Result<Vec<u8>> {
        float_values(df, DIAMETER)?
            .into_iter()
            .enumerate()
            .map(|(row, value)| match value {
                Some(diameter) => Ok(self.bucket(diameter)),
                None => Err(anyhow::Error::from(TreeError::InvalidSplit(format!(
                    "row {} has no trunk diameter",
                    row
                )))),
            })
            .collect()
    }

    /// Share of the rows of `df` in each bucket
    pub fn proportions(&self, df: &DataFrame) -> crate::Result<[f64; BUCKETS]> {
        let mut counts = [0usize; BUCKETS];
        for bucket in self.assign(df)? {
            counts[usize::from(bucket) - 1] += 1;
        }

        let total = df.height().max(1) as f64;
        Ok(counts.map(|count| count as f64 / total))
    }
}

/// Largest difference in bucket share between two tables
pub fn proportion_gap(bins: &DiameterBins, train: &DataFrame, test: &DataFrame) -> crate::Result<f64> {
    let train = bins.proportions(train)?;
    let test = bins.proportions(test)?;

    Ok(train
        .iter()
        .zip(test.iter())
        .map(|(a, b)| (a - b).abs())
        .fold(0.0, f64::max))
}
