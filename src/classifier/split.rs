use rand::{seq::SliceRandom, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowSplit {
    pub training: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffles `0..rows` with the given seed and holds out the first `test_amount` rows.
pub fn split_rows(rows: usize, test_amount: usize, random_state: u64) -> Result<RowSplit> {
    if test_amount == 0 || test_amount >= rows {
        return Err(Error::NotEnoughTrainingRows {
            held_out: test_amount,
            available: rows,
        });
    }

    let mut indices: Vec<_> = (0..rows).collect();
    indices.shuffle(&mut Xoshiro256PlusPlus::seed_from_u64(random_state));
    let training = indices.split_off(test_amount);

    Ok(RowSplit {
        training,
        test: indices,
    })
}

pub fn test_amount_for_ratio(rows: usize, ratio: f64) -> usize {
    (ratio * rows as f64).ceil() as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_is_a_partition() {
        let split = split_rows(20, 6, 64).unwrap();
        assert_eq!(split.test.len(), 6);
        assert_eq!(split.training.len(), 14);

        let mut all: Vec<_> = split.training.iter().chain(&split.test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn split_is_reproducible() {
        assert_eq!(split_rows(50, 10, 7).unwrap(), split_rows(50, 10, 7).unwrap());
    }

    #[test]
    fn degenerate_splits_are_rejected() {
        assert!(split_rows(5, 0, 1).is_err());
        assert!(split_rows(5, 5, 1).is_err());
        assert!(split_rows(5, 4, 1).is_ok());
    }

    #[test]
    fn ratio_rounds_up() {
        assert_eq!(test_amount_for_ratio(10, 0.2), 2);
        assert_eq!(test_amount_for_ratio(11, 0.2), 3);
        assert_eq!(test_amount_for_ratio(3, 0.01), 1);
    }
}
