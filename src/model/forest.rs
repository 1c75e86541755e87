//! Random forest of CART classification trees.
//!
//! Each tree is grown on a bootstrap sample with Gini impurity, considering a
//! random subset of √d features per split. Trees are stored as flat node
//! arenas so artifacts serialize without deep nesting. Tree `t` draws from
//! its own RNG seeded from `(seed, t)`, so a forest is reproducible regardless
//! of how many threads fit it.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Leaf {
        /// Class fractions of the training samples that reached this leaf.
        distribution: Vec<f64>,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub max_features: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

struct Candidate {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

fn gini(counts: &[usize], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let t = total as f64;
    1.0 - counts.iter().map(|&c| (c as f64 / t).powi(2)).sum::<f64>()
}

fn class_counts(y: &[usize], idx: &[usize], n_classes: usize) -> Vec<usize> {
    let mut counts = vec![0usize; n_classes];
    for &i in idx {
        counts[y[i]] += 1;
    }
    counts
}

impl DecisionTree {
    /// Grow a tree over the rows listed in `idx` (duplicates allowed).
    pub fn fit(
        x: &[Vec<f64>],
        y: &[usize],
        idx: Vec<usize>,
        n_classes: usize,
        params: TreeParams,
        rng: &mut StdRng,
    ) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.grow(x, y, idx, n_classes, params, rng, 0);
        tree
    }

    #[allow(clippy::too_many_arguments)]
    fn grow(
        &mut self,
        x: &[Vec<f64>],
        y: &[usize],
        idx: Vec<usize>,
        n_classes: usize,
        params: TreeParams,
        rng: &mut StdRng,
        depth: usize,
    ) -> usize {
        let counts = class_counts(y, &idx, n_classes);
        let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;

        let split = if pure || depth >= params.max_depth || idx.len() < params.min_samples_split {
            None
        } else {
            best_split(x, y, &idx, &counts, n_classes, params.max_features, rng)
        };

        let Some(split) = split else {
            let total = idx.len().max(1) as f64;
            self.nodes.push(Node::Leaf {
                distribution: counts.iter().map(|&c| c as f64 / total).collect(),
            });
            return self.nodes.len() - 1;
        };

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = idx
            .iter()
            .partition(|&&i| x[i][split.feature] <= split.threshold);

        let node = self.nodes.len();
        self.nodes.push(Node::Leaf { distribution: Vec::new() });
        let left = self.grow(x, y, left_idx, n_classes, params, rng, depth + 1);
        let right = self.grow(x, y, right_idx, n_classes, params, rng, depth + 1);
        self.nodes[node] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        node
    }

    /// Class distribution of the leaf that `row` lands in.
    pub fn leaf_distribution(&self, row: &[f64]) -> &[f64] {
        let mut i = 0;
        loop {
            match &self.nodes[i] {
                Node::Leaf { distribution } => return distribution,
                Node::Split { feature, threshold, left, right } => {
                    i = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Structural sanity check for trees read from disk.
    pub fn is_well_formed(&self, n_features: usize, n_classes: usize) -> bool {
        !self.nodes.is_empty()
            && self.nodes.iter().enumerate().all(|(i, node)| match node {
                Node::Leaf { distribution } => distribution.len() == n_classes,
                Node::Split { feature, left, right, .. } => {
                    *feature < n_features
                        && *left > i
                        && *right > i
                        && *left < self.nodes.len()
                        && *right < self.nodes.len()
                }
            })
    }
}

/// Lowest weighted Gini split over a random feature subset.
///
/// Features are tried in random order; after `max_features` have been
/// examined the search stops as soon as any valid split has been seen.
fn best_split(
    x: &[Vec<f64>],
    y: &[usize],
    idx: &[usize],
    counts: &[usize],
    n_classes: usize,
    max_features: usize,
    rng: &mut StdRng,
) -> Option<Candidate> {
    let n = idx.len();
    let parent = gini(counts, n);
    let n_features = x.first().map(|r| r.len()).unwrap_or(0);

    let mut features: Vec<usize> = (0..n_features).collect();
    features.shuffle(rng);

    let mut best: Option<Candidate> = None;
    let mut sorted = idx.to_vec();

    for (tried, &f) in features.iter().enumerate() {
        if tried >= max_features && best.is_some() {
            break;
        }

        sorted.sort_by(|&a, &b| x[a][f].total_cmp(&x[b][f]));

        let mut left = vec![0usize; n_classes];
        let mut right = counts.to_vec();
        for pos in 0..n - 1 {
            let c = y[sorted[pos]];
            left[c] += 1;
            right[c] -= 1;

            let (lo, hi) = (x[sorted[pos]][f], x[sorted[pos + 1]][f]);
            if lo == hi {
                continue;
            }

            let nl = pos + 1;
            let nr = n - nl;
            let impurity = (nl as f64 * gini(&left, nl) + nr as f64 * gini(&right, nr)) / n as f64;
            if impurity < parent - 1e-12 && best.as_ref().is_none_or(|b| impurity < b.impurity) {
                let mid = lo / 2.0 + hi / 2.0;
                best = Some(Candidate {
                    feature: f,
                    threshold: if mid < hi { mid } else { lo },
                    impurity,
                });
            }
        }
    }
    best
}

#[derive(Debug, Clone, Copy)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_depth: usize,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 200,
            max_depth: 10,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    /// Sorted class labels; leaf distributions are indexed by position here.
    pub classes: Vec<String>,
    pub n_features: usize,
    trees: Vec<DecisionTree>,
}

fn tree_seed(seed: u64, tree: usize) -> u64 {
    seed ^ (tree as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

impl RandomForest {
    /// Fit on rows `x` with string labels. `x` must be non-empty.
    pub fn fit(x: &[Vec<f64>], labels: &[String], params: ForestParams) -> Self {
        let mut classes: Vec<String> = labels.to_vec();
        classes.sort();
        classes.dedup();

        let y: Vec<usize> = labels
            .iter()
            .map(|l| classes.binary_search(l).unwrap_or(0))
            .collect();

        let n = x.len();
        let n_features = x.first().map(|r| r.len()).unwrap_or(0);
        let tree_params = TreeParams {
            max_depth: params.max_depth,
            min_samples_split: 2,
            max_features: ((n_features as f64).sqrt() as usize).max(1),
        };
        let n_classes = classes.len();

        let trees = (0..params.n_trees.max(1))
            .into_par_iter()
            .map(|t| {
                let mut rng = StdRng::seed_from_u64(tree_seed(params.seed, t));
                let bootstrap: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                DecisionTree::fit(x, &y, bootstrap, n_classes, tree_params, &mut rng)
            })
            .collect();

        Self {
            classes,
            n_features,
            trees,
        }
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    /// Mean leaf distribution across trees, aligned with `classes`.
    pub fn predict_proba(&self, row: &[f64]) -> Vec<f64> {
        let mut proba = vec![0.0_f64; self.classes.len()];
        for tree in &self.trees {
            for (p, d) in proba.iter_mut().zip(tree.leaf_distribution(row)) {
                *p += d;
            }
        }
        let n = self.trees.len().max(1) as f64;
        proba.iter_mut().for_each(|p| *p /= n);
        proba
    }

    /// Most probable class; ties go to the earliest (lexicographically
    /// smallest) label.
    pub fn predict(&self, row: &[f64]) -> &str {
        let proba = self.predict_proba(row);
        let mut best = 0;
        for (i, &p) in proba.iter().enumerate() {
            if p > proba[best] {
                best = i;
            }
        }
        &self.classes[best]
    }
}
