//! Classification metrics

use serde::Serialize;

/// Counts of (truth, prediction) pairs; rows are truth, columns prediction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfusionMatrix {
    pub labels: Vec<String>,
    pub counts: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    /// Build from paired truth/prediction labels. The label set is the
    /// sorted union of both sides so unseen truth classes still show up.
    pub fn from_labels(truth: &[String], predicted: &[String]) -> Self {
        let mut labels: Vec<String> = truth.iter().chain(predicted).cloned().collect();
        labels.sort();
        labels.dedup();

        let mut counts = vec![vec![0usize; labels.len()]; labels.len()];
        for (t, p) in truth.iter().zip(predicted) {
            let (Ok(i), Ok(j)) = (labels.binary_search(t), labels.binary_search(p)) else {
                continue;
            };
            counts[i][j] += 1;
        }
        Self { labels, counts }
    }

    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    pub fn correct(&self) -> usize {
        (0..self.labels.len()).map(|i| self.counts[i][i]).sum()
    }
}

/// Fraction of exact matches; 0 for empty input.
pub fn accuracy(truth: &[String], predicted: &[String]) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    let correct = truth.iter().zip(predicted).filter(|(t, p)| t == p).count();
    correct as f64 / truth.len() as f64
}

/// Result of scoring a fitted model against labelled rows.
#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    pub accuracy: f64,
    pub n: usize,
    pub correct: usize,
    pub confusion: ConfusionMatrix,
}

impl Evaluation {
    pub fn from_labels(truth: &[String], predicted: &[String]) -> Self {
        let confusion = ConfusionMatrix::from_labels(truth, predicted);
        Self {
            accuracy: accuracy(truth, predicted),
            n: truth.len(),
            correct: confusion.correct(),
            confusion,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &[&str]) -> Vec<String> {
        v.iter().map(|x| x.to_string()).collect()
    }

    #[test]
    fn test_accuracy() {
        let truth = s(&["yes", "no", "no", "yes"]);
        let predicted = s(&["yes", "no", "yes", "no"]);
        assert_eq!(accuracy(&truth, &predicted), 0.5);
        assert_eq!(accuracy(&[], &[]), 0.0);
    }

    #[test]
    fn test_confusion_matrix() {
        let truth = s(&["yes", "no", "no", "yes", "no"]);
        let predicted = s(&["yes", "no", "yes", "no", "no"]);
        let cm = ConfusionMatrix::from_labels(&truth, &predicted);

        assert_eq!(cm.labels, s(&["no", "yes"]));
        assert_eq!(cm.counts, vec![vec![2, 1], vec![1, 1]]);
        assert_eq!(cm.total(), 5);
        assert_eq!(cm.correct(), 3);
    }

    #[test]
    fn test_evaluation_agrees_with_confusion() {
        let truth = s(&["a", "b", "c"]);
        let predicted = s(&["a", "b", "b"]);
        let eval = Evaluation::from_labels(&truth, &predicted);
        assert_eq!(eval.n, 3);
        assert_eq!(eval.correct, 2);
        assert!((eval.accuracy - 2.0 / 3.0).abs() < 1e-12);
    }
}
