use std::collections::BTreeMap;
use super::FitError;

/// Distinct class labels of a training set together with their
/// occurrence counts. A valid label set covers exactly the contiguous
/// range 0..k, so the count of class i lives at position i.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelSet {
    counts : Vec<usize>
}

impl LabelSet {

    /// Collects the distinct labels and their counts, then verifies that they
    /// form the range 0..k with k >= 2 and that the sample size n exceeds k.
    pub fn validate(y : &[i64], n : usize) -> Result<Self, FitError> {
        if y.len() != n {
            return Err(FitError::LabelCount { rows : n, labels : y.len() });
        }

        // Sorted by construction.
        let mut label_map : BTreeMap<i64, usize> = BTreeMap::new();
        for label in y.iter() {
            *label_map.entry(*label).or_insert(0) += 1;
        }

        let labels : Vec<i64> = label_map.keys().cloned().collect();
        if labels.is_empty() {
            return Err(FitError::Empty);
        }
        if let Some(neg) = labels.iter().find(|l| **l < 0) {
            return Err(FitError::NegativeLabel(*neg));
        }
        if labels[0] != 0 {
            return Err(FitError::LabelOrigin(labels[0]));
        }
        for pair in labels.windows(2) {
            if pair[1] - pair[0] > 1 {
                return Err(FitError::MissingClass(pair[0] + 1));
            }
        }

        let k = labels.len();
        if k < 2 {
            return Err(FitError::SingleClass);
        }
        if n <= k {
            return Err(FitError::SampleSize { n, k });
        }
        Ok(Self { counts : label_map.values().cloned().collect() })
    }

    /// Number of classes k.
    pub fn k(&self) -> usize {
        self.counts.len()
    }

    /// Sample count of each class, indexed by label.
    pub fn counts(&self) -> &[usize] {
        &self.counts[..]
    }

}

#[test]
fn counts_follow_label_order() {
    let set = LabelSet::validate(&[2, 0, 1, 1, 0, 1], 6).unwrap();
    assert_eq!(set.k(), 3);
    assert_eq!(set.counts(), &[2, 3, 1]);
}

#[test]
fn rejects_malformed_labels() {
    assert_eq!(LabelSet::validate(&[0, 1], 3), Err(FitError::LabelCount { rows : 3, labels : 2 }));
    assert_eq!(LabelSet::validate(&[], 0), Err(FitError::Empty));
    assert_eq!(LabelSet::validate(&[-1, 0, 1, 1], 4), Err(FitError::NegativeLabel(-1)));
    assert_eq!(LabelSet::validate(&[1, 2, 2, 1], 4), Err(FitError::LabelOrigin(1)));
    assert_eq!(LabelSet::validate(&[0, 2, 2, 0], 4), Err(FitError::MissingClass(1)));
    assert_eq!(LabelSet::validate(&[0, 0, 0], 3), Err(FitError::SingleClass));
}

#[test]
fn sample_size_must_exceed_class_count() {
    assert_eq!(LabelSet::validate(&[0, 1], 2), Err(FitError::SampleSize { n : 2, k : 2 }));
    assert!(LabelSet::validate(&[0, 1, 1], 3).is_ok());
}
