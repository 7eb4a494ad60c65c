use std::cmp::Ordering;

use rayon::prelude::*;

use crate::error::{AiError, Result};

use super::data::Evidence;

/// Batches at least this large are predicted on the rayon pool.
const PARALLEL_THRESHOLD: usize = 256;

/// k-nearest-neighbour classifier configuration.
#[derive(Debug, Clone, Copy)]
pub struct KNearestNeighbors {
    k: usize,
}

impl Default for KNearestNeighbors {
    fn default() -> Self {
        Self { k: 1 }
    }
}

impl KNearestNeighbors {
    /// # Errors
    /// [`AiError::InvalidParameter`] if `k` is zero.
    pub fn new(k: usize) -> Result<Self> {
        if k == 0 {
            return Err(AiError::InvalidParameter(
                "k must be at least 1".to_string(),
            ));
        }
        Ok(Self { k })
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Memorize the training set.
    ///
    /// # Errors
    /// [`AiError::InvalidParameter`] if lengths differ or there are fewer
    /// than `k` training sessions.
    pub fn fit(&self, evidence: &[Evidence], labels: &[bool]) -> Result<FittedKnn> {
        if evidence.len() != labels.len() {
            return Err(AiError::InvalidParameter(format!(
                "{} evidence rows but {} labels",
                evidence.len(),
                labels.len()
            )));
        }
        if evidence.len() < self.k {
            return Err(AiError::InvalidParameter(format!(
                "need at least k = {} training sessions, got {}",
                self.k,
                evidence.len()
            )));
        }
        log::debug!("fitted {}-NN on {} sessions", self.k, evidence.len());
        Ok(FittedKnn {
            k: self.k,
            evidence: evidence.to_vec(),
            labels: labels.to_vec(),
        })
    }
}

/// A k-NN classifier holding its training set.
#[derive(Debug, Clone)]
pub struct FittedKnn {
    k: usize,
    evidence: Vec<Evidence>,
    labels: Vec<bool>,
}

impl FittedKnn {
    /// Label for one session by majority vote of the `k` nearest training
    /// sessions (Euclidean distance).
    ///
    /// Equal distances go to the earlier training session. A tied vote goes
    /// to the label of the single nearest neighbour.
    pub fn predict_one(&self, query: &Evidence) -> bool {
        let mut neighbours: Vec<(f64, usize)> = self
            .evidence
            .iter()
            .enumerate()
            .map(|(i, e)| (squared_distance(e, query), i))
            .collect();

        let by_distance = |a: &(f64, usize), b: &(f64, usize)| -> Ordering {
            a.0.total_cmp(&b.0).then(a.1.cmp(&b.1))
        };
        if self.k < neighbours.len() {
            neighbours.select_nth_unstable_by(self.k - 1, by_distance);
            neighbours.truncate(self.k);
        }
        neighbours.sort_unstable_by(by_distance);

        let positives = neighbours.iter().filter(|(_, i)| self.labels[*i]).count();
        let negatives = neighbours.len() - positives;
        match positives.cmp(&negatives) {
            Ordering::Greater => true,
            Ordering::Less => false,
            Ordering::Equal => self.labels[neighbours[0].1],
        }
    }

    /// Labels for a batch of sessions.
    pub fn predict(&self, queries: &[Evidence]) -> Vec<bool> {
        if queries.len() >= PARALLEL_THRESHOLD {
            queries.par_iter().map(|q| self.predict_one(q)).collect()
        } else {
            queries.iter().map(|q| self.predict_one(q)).collect()
        }
    }
}

fn squared_distance(a: &Evidence, b: &Evidence) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Classifier quality on a labelled test set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub correct: usize,
    pub incorrect: usize,
    /// True positive rate.
    pub sensitivity: f64,
    /// True negative rate.
    pub specificity: f64,
}

/// Compare predictions against actual labels.
///
/// # Errors
/// [`AiError::InvalidParameter`] if lengths differ;
/// [`AiError::Evaluation`] if either class is absent from `labels`, which
/// leaves one rate undefined.
pub fn evaluate(labels: &[bool], predictions: &[bool]) -> Result<Evaluation> {
    if labels.len() != predictions.len() {
        return Err(AiError::InvalidParameter(format!(
            "{} labels but {} predictions",
            labels.len(),
            predictions.len()
        )));
    }

    let (mut positives, mut true_positives) = (0usize, 0usize);
    let (mut negatives, mut true_negatives) = (0usize, 0usize);
    for (&actual, &predicted) in labels.iter().zip(predictions) {
        if actual {
            positives += 1;
            true_positives += usize::from(predicted);
        } else {
            negatives += 1;
            true_negatives += usize::from(!predicted);
        }
    }

    if positives == 0 || negatives == 0 {
        return Err(AiError::Evaluation(format!(
            "need both classes in the labels ({} positive, {} negative)",
            positives, negatives
        )));
    }

    let correct = true_positives + true_negatives;
    Ok(Evaluation {
        correct,
        incorrect: labels.len() - correct,
        sensitivity: true_positives as f64 / positives as f64,
        specificity: true_negatives as f64 / negatives as f64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shopping::data::N_FEATURES;
    use approx::assert_relative_eq;

    fn point(x: f64, y: f64) -> Evidence {
        let mut e = [0.0; N_FEATURES];
        e[0] = x;
        e[1] = y;
        e
    }

    #[test]
    fn test_one_nn_picks_closest() {
        let train = vec![point(0.0, 0.0), point(10.0, 10.0)];
        let model = KNearestNeighbors::default()
            .fit(&train, &[false, true])
            .unwrap();
        assert!(!model.predict_one(&point(1.0, 2.0)));
        assert!(model.predict_one(&point(9.0, 8.0)));
    }

    #[test]
    fn test_equal_distance_prefers_earlier_session() {
        let train = vec![point(-1.0, 0.0), point(1.0, 0.0)];
        let model = KNearestNeighbors::default().fit(&train, &[true, false]).unwrap();
        assert!(model.predict_one(&point(0.0, 0.0)));
    }

    #[test]
    fn test_majority_vote() {
        let train = vec![
            point(0.0, 0.0),
            point(0.5, 0.0),
            point(0.0, 0.5),
            point(0.2, 0.2),
        ];
        let labels = [true, false, false, true];
        let model = KNearestNeighbors::new(3).unwrap().fit(&train, &labels).unwrap();
        // Nearest three to (0.4, 0.1): (0.5,0), (0.2,0.2), (0,0) -> 2 true vs 1 false.
        assert!(model.predict_one(&point(0.4, 0.1)));
    }

    #[test]
    fn test_tied_vote_uses_nearest() {
        let train = vec![point(0.0, 0.0), point(3.0, 0.0)];
        let model = KNearestNeighbors::new(2).unwrap().fit(&train, &[false, true]).unwrap();
        assert!(model.predict_one(&point(2.5, 0.0)));
        assert!(!model.predict_one(&point(0.5, 0.0)));
    }

    #[test]
    fn test_batch_prediction_parallel_matches_serial() {
        let train: Vec<Evidence> = (0..50).map(|i| point(i as f64, (i % 7) as f64)).collect();
        let labels: Vec<bool> = (0..50).map(|i| i % 3 == 0).collect();
        let model = KNearestNeighbors::default().fit(&train, &labels).unwrap();

        let queries: Vec<Evidence> = (0..PARALLEL_THRESHOLD + 10)
            .map(|i| point(i as f64 * 0.2, (i % 5) as f64))
            .collect();
        let batch = model.predict(&queries);
        let serial: Vec<bool> = queries.iter().map(|q| model.predict_one(q)).collect();
        assert_eq!(batch, serial);
    }

    #[test]
    fn test_fit_validation() {
        assert!(KNearestNeighbors::new(0).is_err());
        let train = vec![point(0.0, 0.0)];
        assert!(KNearestNeighbors::default().fit(&train, &[true, false]).is_err());
        assert!(KNearestNeighbors::new(2).unwrap().fit(&train, &[true]).is_err());
    }

    #[test]
    fn test_evaluate_rates() {
        let labels = [true, true, true, true, false, false];
        let predictions = [true, true, true, false, false, true];
        let eval = evaluate(&labels, &predictions).unwrap();
        assert_eq!(eval.correct, 4);
        assert_eq!(eval.incorrect, 2);
        assert_relative_eq!(eval.sensitivity, 0.75, epsilon = 1e-12);
        assert_relative_eq!(eval.specificity, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_evaluate_requires_both_classes() {
        assert!(matches!(
            evaluate(&[true, true], &[true, false]),
            Err(AiError::Evaluation(_))
        ));
        assert!(matches!(
            evaluate(&[true], &[true, false]),
            Err(AiError::InvalidParameter(_))
        ));
    }
}
