//! CART classification tree
//!
//! Splits minimise weighted Gini impurity. Growth stops at `tree_depth`,
//! when a node holds fewer than `min_n` rows, when it is pure, or when the
//! best split improves the overall impurity by less than `cost_complexity`
//! times the root impurity.

use serde::Serialize;
use tracing::debug;

use super::error::ModelError;

/// Decision tree hyperparameters.
///
/// | Parameter         | Default |
/// |-------------------|---------|
/// | `tree_depth`      | 30      |
/// | `min_n`           | 2       |
/// | `cost_complexity` | 0.01    |
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TreeSpec {
    /// Maximum depth; the root sits at depth 0, so a depth of 1 is a stump
    pub tree_depth: usize,
    /// Minimum rows a node needs before a split is attempted
    pub min_n: usize,
    /// Minimum relative impurity improvement a split must bring
    pub cost_complexity: f64,
}

impl Default for TreeSpec {
    fn default() -> Self {
        Self {
            tree_depth: 30,
            min_n: 2,
            cost_complexity: 0.01,
        }
    }
}

impl TreeSpec {
    #[must_use]
    pub fn with_tree_depth(mut self, tree_depth: usize) -> Self {
        self.tree_depth = tree_depth;
        self
    }

    #[must_use]
    pub fn with_min_n(mut self, min_n: usize) -> Self {
        self.min_n = min_n;
        self
    }

    #[must_use]
    pub fn with_cost_complexity(mut self, cost_complexity: f64) -> Self {
        self.cost_complexity = cost_complexity;
        self
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.tree_depth == 0 {
            return Err(ModelError::InvalidParameter {
                name: "tree_depth",
                value: self.tree_depth.to_string(),
                reason: "must be at least 1",
            });
        }
        if self.min_n < 2 {
            return Err(ModelError::InvalidParameter {
                name: "min_n",
                value: self.min_n.to_string(),
                reason: "must be at least 2",
            });
        }
        if !self.cost_complexity.is_finite() || self.cost_complexity < 0.0 {
            return Err(ModelError::InvalidParameter {
                name: "cost_complexity",
                value: self.cost_complexity.to_string(),
                reason: "must be a non-negative number",
            });
        }
        Ok(())
    }

    /// Smallest leaf a split may create: a third of `min_n`, at least one row.
    fn min_leaf(&self) -> usize {
        ((self.min_n as f64 / 3.0).round() as usize).max(1)
    }

    /// Grow a tree on row-major `features` with zero-based class `labels`.
    pub fn fit(
        &self,
        features: &[Vec<f64>],
        labels: &[usize],
        n_classes: usize,
    ) -> Result<DecisionTree, ModelError> {
        self.validate()?;

        if features.is_empty() || labels.is_empty() {
            return Err(ModelError::EmptyDataset);
        }
        if features.len() != labels.len() {
            return Err(ModelError::FeatureCountMismatch {
                expected: features.len(),
                got: labels.len(),
            });
        }

        let n_features = features[0].len();
        if let Some(row) = features.iter().find(|row| row.len() != n_features) {
            return Err(ModelError::FeatureCountMismatch {
                expected: n_features,
                got: row.len(),
            });
        }
        let n_classes = n_classes.max(labels.iter().max().map_or(0, |&m| m + 1));

        // Column-major copy so each split scan walks one contiguous feature
        let columns: Vec<Vec<f64>> = (0..n_features)
            .map(|j| features.iter().map(|row| row[j]).collect())
            .collect();

        let all: Vec<usize> = (0..labels.len()).collect();
        let root_counts = class_counts(labels, &all, n_classes);
        let root_risk = gini(&root_counts, labels.len()) * labels.len() as f64;

        let mut builder = Builder {
            columns: &columns,
            labels,
            n_classes,
            spec: self,
            min_leaf: self.min_leaf(),
            root_risk,
            nodes: Vec::new(),
        };
        builder.grow(all, 0);

        let tree = DecisionTree {
            nodes: builder.nodes,
            n_features,
            n_classes,
        };
        debug!(
            n_samples = labels.len(),
            n_features,
            n_nodes = tree.n_nodes(),
            depth = tree.depth(),
            "decision tree fitted"
        );
        Ok(tree)
    }
}

/// Interior node: rows with `feature <= threshold` go left.
#[derive(Debug, Clone, Serialize)]
pub struct SplitNode {
    pub feature: usize,
    pub threshold: f64,
    pub left: usize,
    pub right: usize,
    pub n_samples: usize,
    pub impurity_decrease: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LeafNode {
    pub prediction: usize,
    pub distribution: Vec<f64>,
    pub n_samples: usize,
}

#[derive(Debug, Clone, Serialize)]
pub enum Node {
    Split(SplitNode),
    Leaf(LeafNode),
}

/// A fitted tree stored as an arena; index 0 is the root.
#[derive(Debug, Clone, Serialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
    n_features: usize,
    n_classes: usize,
}

impl DecisionTree {
    pub fn predict(&self, sample: &[f64]) -> Result<usize, ModelError> {
        Ok(self.leaf(sample)?.prediction)
    }

    /// Class distribution of the leaf `sample` lands in.
    pub fn predict_proba(&self, sample: &[f64]) -> Result<Vec<f64>, ModelError> {
        Ok(self.leaf(sample)?.distribution.clone())
    }

    pub fn predict_batch(&self, samples: &[Vec<f64>]) -> Result<Vec<usize>, ModelError> {
        samples.iter().map(|s| self.predict(s)).collect()
    }

    fn leaf(&self, sample: &[f64]) -> Result<&LeafNode, ModelError> {
        if sample.len() != self.n_features {
            return Err(ModelError::FeatureCountMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf(leaf) => return Ok(leaf),
                Node::Split(split) => {
                    idx = if sample[split.feature] <= split.threshold {
                        split.left
                    } else {
                        split.right
                    };
                }
            }
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf(_)))
            .count()
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Longest root-to-leaf path; a lone root leaf has depth 0.
    pub fn depth(&self) -> usize {
        let mut max_depth = 0;
        let mut stack = vec![(0usize, 0usize)];
        while let Some((idx, depth)) = stack.pop() {
            max_depth = max_depth.max(depth);
            if let Some(Node::Split(split)) = self.nodes.get(idx) {
                stack.push((split.left, depth + 1));
                stack.push((split.right, depth + 1));
            }
        }
        max_depth
    }
}

struct Builder<'a> {
    columns: &'a [Vec<f64>],
    labels: &'a [usize],
    n_classes: usize,
    spec: &'a TreeSpec,
    min_leaf: usize,
    root_risk: f64,
    nodes: Vec<Node>,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    decrease: f64,
}

impl Builder<'_> {
    /// Grow the subtree for `samples` and return its arena index.
    fn grow(&mut self, samples: Vec<usize>, depth: usize) -> usize {
        let n = samples.len();
        let counts = class_counts(self.labels, &samples, self.n_classes);
        let impurity = gini(&counts, n);

        let stop = depth >= self.spec.tree_depth || n < self.spec.min_n || impurity == 0.0;
        let best = if stop {
            None
        } else {
            self.best_split(&samples, &counts, impurity)
        };

        let Some(best) = best else {
            return self.push_leaf(&counts, n);
        };

        let (left, right): (Vec<usize>, Vec<usize>) = samples
            .iter()
            .copied()
            .partition(|&s| self.columns[best.feature][s] <= best.threshold);

        // Reserve this node's slot before the children claim theirs
        let idx = self.nodes.len();
        self.push_leaf(&counts, n);
        let left_idx = self.grow(left, depth + 1);
        let right_idx = self.grow(right, depth + 1);

        self.nodes[idx] = Node::Split(SplitNode {
            feature: best.feature,
            threshold: best.threshold,
            left: left_idx,
            right: right_idx,
            n_samples: n,
            impurity_decrease: best.decrease,
        });
        idx
    }

    fn best_split(&self, samples: &[usize], counts: &[usize], impurity: f64) -> Option<BestSplit> {
        let n = samples.len();
        let parent_risk = impurity * n as f64;
        let mut best: Option<BestSplit> = None;

        for (feature, column) in self.columns.iter().enumerate() {
            let mut order = samples.to_vec();
            order.sort_by(|&a, &b| column[a].total_cmp(&column[b]));

            let mut left = vec![0usize; self.n_classes];
            let mut right = counts.to_vec();

            for i in 0..n - 1 {
                let label = self.labels[order[i]];
                left[label] += 1;
                right[label] -= 1;

                let n_left = i + 1;
                let n_right = n - n_left;
                if n_left < self.min_leaf || n_right < self.min_leaf {
                    continue;
                }

                let value = column[order[i]];
                let next = column[order[i + 1]];
                if value == next {
                    continue;
                }

                let child_risk =
                    gini(&left, n_left) * n_left as f64 + gini(&right, n_right) * n_right as f64;
                let decrease = parent_risk - child_risk;
                if best.as_ref().map_or(true, |b| decrease > b.decrease + 1e-12) {
                    best = Some(BestSplit {
                        feature,
                        threshold: value + (next - value) / 2.0,
                        decrease,
                    });
                }
            }
        }

        best.filter(|b| {
            b.decrease > 0.0 && self.root_risk > 0.0 && b.decrease / self.root_risk >= self.spec.cost_complexity
        })
    }

    fn push_leaf(&mut self, counts: &[usize], n: usize) -> usize {
        let total = n.max(1) as f64;
        let mut prediction = 0;
        for (class, &count) in counts.iter().enumerate() {
            if count > counts[prediction] {
                prediction = class;
            }
        }
        self.nodes.push(Node::Leaf(LeafNode {
            prediction,
            distribution: counts.iter().map(|&c| c as f64 / total).collect(),
            n_samples: n,
        }));
        self.nodes.len() - 1
    }
}

fn class_counts(labels: &[usize], samples: &[usize], n_classes: usize) -> Vec<usize> {
    let mut counts = vec![0usize; n_classes];
    for &s in samples {
        counts[labels[s]] += 1;
    }
    counts
}

/// Gini impurity `1 - Σ p_i²`; zero for an empty node.
fn gini(counts: &[usize], n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let n = n as f64;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f64 / n;
            p * p
        })
        .sum::<f64>()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable() -> (Vec<Vec<f64>>, Vec<usize>) {
        let mut features = Vec::new();
        let mut labels = Vec::new();
        for i in 0..20 {
            features.push(vec![i as f64, 1.0]);
            labels.push(if i < 10 { 0 } else { 1 });
        }
        (features, labels)
    }

    #[test]
    fn test_gini_impurity() {
        assert_eq!(gini(&[5, 5], 10), 0.5);
        assert_eq!(gini(&[10, 0], 10), 0.0);
        assert_eq!(gini(&[0, 0], 0), 0.0);
    }

    #[test]
    fn test_fits_separable_data_with_one_split() {
        let (features, labels) = separable();
        let tree = TreeSpec::default().fit(&features, &labels, 2).unwrap();

        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.n_leaves(), 2);
        match &tree.nodes()[0] {
            Node::Split(split) => {
                assert_eq!(split.feature, 0);
                assert_eq!(split.threshold, 9.5);
            }
            Node::Leaf(_) => panic!("Root should be a split"),
        }

        let predictions = tree.predict_batch(&features).unwrap();
        assert_eq!(predictions, labels);
    }

    #[test]
    fn test_depth_limit_is_respected() {
        // Alternating labels need many splits to separate
        let features: Vec<Vec<f64>> = (0..32).map(|i| vec![i as f64]).collect();
        let labels: Vec<usize> = (0..32).map(|i| (i / 2) % 2).collect();

        for depth in 1..=4 {
            let tree = TreeSpec::default()
                .with_tree_depth(depth)
                .with_cost_complexity(0.0)
                .fit(&features, &labels, 2)
                .unwrap();
            assert!(tree.depth() <= depth, "depth {} exceeded limit {}", tree.depth(), depth);
            assert!(tree.n_leaves() <= 1 << depth);
        }
    }

    #[test]
    fn test_pure_labels_give_single_leaf() {
        let features = vec![vec![1.0], vec![2.0], vec![3.0]];
        let labels = vec![1, 1, 1];
        let tree = TreeSpec::default().fit(&features, &labels, 2).unwrap();

        assert_eq!(tree.n_nodes(), 1);
        assert_eq!(tree.predict(&[10.0]).unwrap(), 1);
        assert_eq!(tree.predict_proba(&[10.0]).unwrap(), vec![0.0, 1.0]);
    }

    #[test]
    fn test_high_cost_complexity_prunes_everything() {
        let features: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64]).collect();
        // Noisy labels: any split improves impurity only slightly
        let labels: Vec<usize> = (0..20).map(|i| usize::from(i % 3 == 0)).collect();
        let tree = TreeSpec::default()
            .with_cost_complexity(0.9)
            .fit(&features, &labels, 2)
            .unwrap();
        assert_eq!(tree.n_nodes(), 1);
    }

    #[test]
    fn test_min_n_blocks_small_splits() {
        let (features, labels) = separable();
        let tree = TreeSpec::default()
            .with_min_n(21)
            .fit(&features, &labels, 2)
            .unwrap();
        assert_eq!(tree.n_nodes(), 1);
    }

    #[test]
    fn test_invalid_specs() {
        let (features, labels) = separable();
        assert!(TreeSpec::default().with_tree_depth(0).fit(&features, &labels, 2).is_err());
        assert!(TreeSpec::default().with_min_n(1).fit(&features, &labels, 2).is_err());
        assert!(TreeSpec::default()
            .with_cost_complexity(-0.5)
            .fit(&features, &labels, 2)
            .is_err());
    }

    #[test]
    fn test_empty_input_is_rejected() {
        let err = TreeSpec::default().fit(&[], &[], 2).unwrap_err();
        assert!(matches!(err, ModelError::EmptyDataset));
    }

    #[test]
    fn test_predict_feature_mismatch() {
        let (features, labels) = separable();
        let tree = TreeSpec::default().fit(&features, &labels, 2).unwrap();
        let err = tree.predict(&[1.0]).unwrap_err();
        assert!(matches!(err, ModelError::FeatureCountMismatch { expected: 2, got: 1 }));
    }

    #[test]
    fn test_tied_values_are_never_split_apart() {
        let features = vec![vec![1.0], vec![1.0], vec![1.0], vec![1.0]];
        let labels = vec![0, 1, 0, 1];
        let tree = TreeSpec::default().fit(&features, &labels, 2).unwrap();
        assert_eq!(tree.n_nodes(), 1);
    }
}
