//! Seeded train/test splitting
//!
//! Two flavours share the sizing rule `n_test = ceil(test_size * n)`:
//! a plain shuffled split and a split stratified by class label.

use mlops_core::LcgRng;
use std::collections::BTreeMap;
use thiserror::Error;

/// Why a split could not be produced
#[derive(Debug, Error, PartialEq)]
pub enum SplitError {
    #[error("cannot split {n} rows with test_size {test_size}: one partition would be empty")]
    EmptyPartition { n: usize, test_size: f64 },

    #[error("class {class} has {count} row(s); stratification needs at least 2 per class")]
    ClassTooSmall { class: u32, count: usize },

    #[error("{partition} partition of {size} rows cannot hold all {classes} classes")]
    PartitionTooSmall {
        partition: &'static str,
        size: usize,
        classes: usize,
    },
}

/// Row indices of both partitions, in output order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Partition sizes `(n_train, n_test)` for `n` rows
pub fn partition_sizes(n: usize, test_size: f64) -> Result<(usize, usize), SplitError> {
    let n_test = (test_size * n as f64).ceil() as usize;
    let n_train = n.saturating_sub(n_test);
    if n_test == 0 || n_train == 0 {
        return Err(SplitError::EmptyPartition { n, test_size });
    }
    Ok((n_train, n_test))
}

/// Shuffled split that ignores labels
pub fn shuffle_split(n: usize, test_size: f64, seed: u64) -> Result<SplitIndices, SplitError> {
    let (_, n_test) = partition_sizes(n, test_size)?;
    let perm = LcgRng::new(seed).permutation(n);
    Ok(SplitIndices {
        test: perm[..n_test].to_vec(),
        train: perm[n_test..].to_vec(),
    })
}

/// Split whose partitions keep the class proportions of `labels`
pub fn stratified_split(labels: &[u32], test_size: f64, seed: u64) -> Result<SplitIndices, SplitError> {
    let n = labels.len();
    let (n_train, n_test) = partition_sizes(n, test_size)?;

    let mut by_class: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
    for (idx, &label) in labels.iter().enumerate() {
        by_class.entry(label).or_default().push(idx);
    }
    if let Some((&class, rows)) = by_class.iter().find(|(_, rows)| rows.len() < 2) {
        return Err(SplitError::ClassTooSmall {
            class,
            count: rows.len(),
        });
    }
    let classes = by_class.len();
    if n_test < classes {
        return Err(SplitError::PartitionTooSmall {
            partition: "test",
            size: n_test,
            classes,
        });
    }
    if n_train < classes {
        return Err(SplitError::PartitionTooSmall {
            partition: "train",
            size: n_train,
            classes,
        });
    }

    let counts: Vec<usize> = by_class.values().map(Vec::len).collect();
    let test_alloc = allocate(&counts, n_test);

    let mut rng = LcgRng::new(seed);
    let mut train = Vec::with_capacity(n_train);
    let mut test = Vec::with_capacity(n_test);
    for (mut rows, take) in by_class.into_values().zip(test_alloc) {
        rng.shuffle(&mut rows);
        test.extend_from_slice(&rows[..take]);
        train.extend_from_slice(&rows[take..]);
    }
    rng.shuffle(&mut train);
    rng.shuffle(&mut test);

    Ok(SplitIndices { train, test })
}

/// Largest-remainder apportionment of `total` draws across classes
fn allocate(counts: &[usize], total: usize) -> Vec<usize> {
    let n: usize = counts.iter().sum();
    let exact: Vec<f64> = counts
        .iter()
        .map(|&c| total as f64 * c as f64 / n as f64)
        .collect();
    let mut alloc: Vec<usize> = exact.iter().map(|e| e.floor() as usize).collect();

    let mut order: Vec<usize> = (0..counts.len()).collect();
    // stable: equal remainders keep class order
    order.sort_by(|&a, &b| {
        let ra = exact[a] - exact[a].floor();
        let rb = exact[b] - exact[b].floor();
        rb.partial_cmp(&ra).unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut missing = total - alloc.iter().sum::<usize>();
    for &class in order.iter().cycle() {
        if missing == 0 {
            break;
        }
        if alloc[class] < counts[class] {
            alloc[class] += 1;
            missing -= 1;
        }
    }
    alloc
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn labels(zeros: usize, ones: usize) -> Vec<u32> {
        let mut y = vec![0u32; zeros];
        y.extend(std::iter::repeat(1).take(ones));
        y
    }

    #[test]
    fn test_sizes_round_test_up() {
        assert_eq!(partition_sizes(1000, 0.2), Ok((800, 200)));
        assert_eq!(partition_sizes(11, 0.2), Ok((8, 3)));
    }

    #[test]
    fn test_empty_input_fails() {
        assert!(matches!(
            partition_sizes(0, 0.2),
            Err(SplitError::EmptyPartition { n: 0, .. })
        ));
        assert!(shuffle_split(1, 0.2, 42).is_err());
    }

    #[test]
    fn test_shuffle_split_determinism() {
        let a = shuffle_split(100, 0.2, 42).unwrap();
        let b = shuffle_split(100, 0.2, 42).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, shuffle_split(100, 0.2, 7).unwrap());
    }

    #[test]
    fn test_stratified_keeps_proportions() {
        let y = labels(600, 400);
        let split = stratified_split(&y, 0.2, 42).unwrap();
        assert_eq!(split.train.len(), 800);
        assert_eq!(split.test.len(), 200);

        let test_ones = split.test.iter().filter(|&&i| y[i] == 1).count();
        assert_eq!(test_ones, 80);
    }

    #[test]
    fn test_singleton_class_rejected() {
        let mut y = labels(10, 0);
        y.push(1);
        assert_eq!(
            stratified_split(&y, 0.2, 42),
            Err(SplitError::ClassTooSmall { class: 1, count: 1 })
        );
    }

    #[test]
    fn test_allocation_largest_remainder() {
        // 3 draws over 1/3 each: one each
        assert_eq!(allocate(&[5, 5, 5], 3), vec![1, 1, 1]);
        // 7 * 0.6 = 4.2, 7 * 0.4 = 2.8 -> 4, 3
        assert_eq!(allocate(&[6, 4], 7), vec![4, 3]);
    }

    proptest! {
        #[test]
        fn prop_split_covers_every_row_once(n in 5usize..400, test_size in 0.05f64..0.6, seed in any::<u64>()) {
            let split = shuffle_split(n, test_size, seed).unwrap();
            prop_assert_eq!(split.train.len() + split.test.len(), n);
            prop_assert_eq!(split.test.len(), (test_size * n as f64).ceil() as usize);

            let mut all: Vec<usize> = split.train.iter().chain(&split.test).copied().collect();
            all.sort_unstable();
            prop_assert_eq!(all, (0..n).collect::<Vec<_>>());
        }

        #[test]
        fn prop_stratified_within_one_row(zeros in 10usize..300, ones in 10usize..300, seed in any::<u64>()) {
            let y = labels(zeros, ones);
            let split = stratified_split(&y, 0.2, seed).unwrap();
            prop_assert_eq!(split.train.len() + split.test.len(), y.len());

            let expected = split.test.len() as f64 * ones as f64 / y.len() as f64;
            let test_ones = split.test.iter().filter(|&&i| y[i] == 1).count() as f64;
            prop_assert!((test_ones - expected).abs() <= 1.0);
        }
    }
}
