/*!
Turns the raw counts of two partitions into proportions.
*/
use ndarray::{Array1, ArrayView1, Zip};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
/// Share of each entity type held by the train and the test partitions, and the shift in share
/// caused by moving exactly one occurrence. Entity types without any occurrence have all three
/// values set to 0.
pub struct Distribution {
    pub prop_train: Array1<f64>,
    pub prop_test: Array1<f64>,
    pub unit_weight: Array1<f64>,
}

impl Distribution {
    pub fn len(&self) -> usize {
        self.prop_train.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prop_train.is_empty()
    }
}

/// Computes the `Distribution` of the counts. Both views must have the same length: the `i`-th
/// element of each is the count of the same entity type.
///
/// # Panics
/// Panics if the lengths of the views differ.
pub fn analyze(counts_train: ArrayView1<usize>, counts_test: ArrayView1<usize>) -> Distribution {
    let totals = &counts_train + &counts_test;
    let prop_train = Zip::from(&counts_train)
        .and(&totals)
        .map_collect(|&count, &total| ratio(count, total));
    let prop_test = Zip::from(&prop_train)
        .and(&totals)
        .map_collect(|&p, &total| if total > 0 { 1.0 - p } else { 0.0 });
    let unit_weight = totals.mapv(|total| ratio(1, total));
    Distribution {
        prop_train,
        prop_test,
        unit_weight,
    }
}

#[inline]
fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_analyze() {
        let train = array![90, 3, 0, 0];
        let test = array![10, 1, 5, 0];
        let actual = analyze(train.view(), test.view());
        let expected = Distribution {
            prop_train: array![0.9, 0.75, 0.0, 0.0],
            prop_test: array![1.0 - 0.9, 0.25, 1.0, 0.0],
            unit_weight: array![0.01, 0.25, 0.2, 0.0],
        };
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_analyze_empty() {
        let empty: Array1<usize> = array![];
        let actual = analyze(empty.view(), empty.view());
        assert!(actual.is_empty());
    }

    #[test]
    fn test_proportions_sum_to_one() {
        let train = array![7, 13, 1, 250];
        let test = array![2, 0, 40, 3];
        let actual = analyze(train.view(), test.view());
        for (p_train, p_test) in actual.prop_train.iter().zip(actual.prop_test.iter()) {
            assert!((p_train + p_test - 1.0).abs() < 1e-12);
        }
    }
}
