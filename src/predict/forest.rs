//! Random forest of Gini classification trees.
//!
//! Each tree is grown on a bootstrap sample of the rows, considering a random
//! subset of √p features at every split. Trees are grown in parallel; tree
//! `t` draws from its own generator seeded with `seed + t`, so the forest is
//! reproducible regardless of thread scheduling.
//!
//! Feature importance is the mean decrease in Gini impurity, normalized per
//! tree, averaged over trees and normalized again.

use super::{check_training_set, normalize_importance, Classifier, FittedClassifier};
use crate::error::{OmicsError, Result};
use nalgebra::DMatrix;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

#[derive(Debug, Clone, PartialEq)]
pub struct RandomForest {
    pub n_trees: usize,
    pub max_depth: usize,
    /// Features tried per split; √p when `None`.
    pub max_features: Option<usize>,
    /// Nodes with fewer rows become leaves.
    pub min_samples_split: usize,
    pub seed: u64,
}

impl Default for RandomForest {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: 10,
            max_features: None,
            min_samples_split: 2,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        p_positive: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn predict(&self, x: &DMatrix<f64>, row: usize) -> f64 {
        let mut at = 0;
        loop {
            match &self.nodes[at] {
                Node::Leaf { p_positive } => return *p_positive,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => at = if x[(row, *feature)] <= *threshold { *left } else { *right },
            }
        }
    }
}

fn gini(n_pos: usize, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let q = n_pos as f64 / n as f64;
    2.0 * q * (1.0 - q)
}

struct Candidate {
    feature: usize,
    threshold: f64,
    /// n·G(parent) − n_left·G(left) − n_right·G(right)
    gain: f64,
}

/// Best threshold on one feature over `rows`.
fn best_threshold(x: &DMatrix<f64>, y: &[bool], rows: &[usize], feature: usize) -> Option<Candidate> {
    let mut sorted: Vec<usize> = rows.to_vec();
    sorted.sort_by(|&a, &b| x[(a, feature)].total_cmp(&x[(b, feature)]));

    let n = sorted.len();
    let n_pos = sorted.iter().filter(|&&r| y[r]).count();
    let parent = n as f64 * gini(n_pos, n);

    let mut best: Option<Candidate> = None;
    let mut left_pos = 0;
    for i in 1..n {
        if y[sorted[i - 1]] {
            left_pos += 1;
        }
        let lo = x[(sorted[i - 1], feature)];
        let hi = x[(sorted[i], feature)];
        if lo == hi {
            continue;
        }
        let gain = parent
            - i as f64 * gini(left_pos, i)
            - (n - i) as f64 * gini(n_pos - left_pos, n - i);
        if best.as_ref().map_or(true, |b| gain > b.gain) {
            best = Some(Candidate {
                feature,
                threshold: lo + (hi - lo) / 2.0,
                gain,
            });
        }
    }
    best.filter(|c| c.gain > 1e-12)
}

struct Grower<'a> {
    x: &'a DMatrix<f64>,
    y: &'a [bool],
    max_depth: usize,
    min_samples_split: usize,
    max_features: usize,
    nodes: Vec<Node>,
    importance: Vec<f64>,
}

impl Grower<'_> {
    fn leaf(&mut self, rows: &[usize]) -> usize {
        let n_pos = rows.iter().filter(|&&r| self.y[r]).count();
        self.nodes.push(Node::Leaf {
            p_positive: n_pos as f64 / rows.len() as f64,
        });
        self.nodes.len() - 1
    }

    fn grow(&mut self, rows: &[usize], depth: usize, rng: &mut ChaCha8Rng) -> usize {
        let n_pos = rows.iter().filter(|&&r| self.y[r]).count();
        if depth >= self.max_depth
            || rows.len() < self.min_samples_split
            || n_pos == 0
            || n_pos == rows.len()
        {
            return self.leaf(rows);
        }

        // Sampled features first; the rest only when none of them splits
        let p = self.x.ncols();
        let sampled = index::sample(rng, p, self.max_features).into_vec();
        let best_of = |features: &mut dyn Iterator<Item = usize>| {
            features
                .filter_map(|f| best_threshold(self.x, self.y, rows, f))
                .max_by(|a, b| a.gain.total_cmp(&b.gain).then(b.feature.cmp(&a.feature)))
        };
        let split = best_of(&mut sampled.iter().copied()).or_else(|| {
            best_of(&mut (0..p).filter(|f| !sampled.contains(f)))
        });
        let Some(split) = split else {
            return self.leaf(rows);
        };

        self.importance[split.feature] += split.gain;
        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .iter()
            .partition(|&&r| self.x[(r, split.feature)] <= split.threshold);

        let at = self.nodes.len();
        self.nodes.push(Node::Leaf { p_positive: 0.0 });
        let left = self.grow(&left_rows, depth + 1, rng);
        let right = self.grow(&right_rows, depth + 1, rng);
        self.nodes[at] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        at
    }
}

struct FittedForest {
    trees: Vec<Tree>,
    importance: Vec<f64>,
}

impl FittedClassifier for FittedForest {
    fn predict_proba(&self, x: &DMatrix<f64>) -> Vec<f64> {
        (0..x.nrows())
            .map(|row| {
                self.trees.iter().map(|t| t.predict(x, row)).sum::<f64>() / self.trees.len() as f64
            })
            .collect()
    }

    fn feature_importance(&self) -> Vec<f64> {
        self.importance.clone()
    }
}

impl Classifier for RandomForest {
    fn name(&self) -> &str {
        "random_forest"
    }

    fn fit(&self, x: &DMatrix<f64>, y: &[bool]) -> Result<Box<dyn FittedClassifier>> {
        check_training_set(x, y)?;
        if self.n_trees == 0 || self.max_depth == 0 {
            return Err(OmicsError::InvalidParameter(
                "random forest needs n_trees > 0 and max_depth > 0".into(),
            ));
        }
        let n = x.nrows();
        let p = x.ncols();
        let max_features = self
            .max_features
            .unwrap_or_else(|| (p as f64).sqrt().round() as usize)
            .clamp(1, p);

        let grown: Vec<(Tree, Vec<f64>)> = (0..self.n_trees)
            .into_par_iter()
            .map(|t| {
                let mut rng = ChaCha8Rng::seed_from_u64(self.seed.wrapping_add(t as u64));
                let rows: Vec<usize> = (0..n).map(|_| rng.random_range(0..n)).collect();
                let mut grower = Grower {
                    x,
                    y,
                    max_depth: self.max_depth,
                    min_samples_split: self.min_samples_split.max(2),
                    max_features,
                    nodes: Vec::new(),
                    importance: vec![0.0; p],
                };
                grower.grow(&rows, 0, &mut rng);
                normalize_importance(&mut grower.importance);
                (Tree { nodes: grower.nodes }, grower.importance)
            })
            .collect();

        let mut importance = vec![0.0; p];
        for (_, imp) in &grown {
            for (total, v) in importance.iter_mut().zip(imp) {
                *total += v;
            }
        }
        normalize_importance(&mut importance);

        Ok(Box::new(FittedForest {
            trees: grown.into_iter().map(|(t, _)| t).collect(),
            importance,
        }))
    }
}
