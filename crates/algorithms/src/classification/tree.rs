//! CART decision tree with Gini impurity

use ndarray::Array2;
use rand::seq::index::sample as sample_indices;
use rand::Rng;

/// Growth limits of a tree
#[derive(Debug, Clone, Copy)]
pub(crate) struct TreeParams {
    pub max_depth: Option<usize>,
    pub min_leaf_population: usize,
    /// Candidate features per split; all features when `None`
    pub features_per_split: Option<usize>,
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        class: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A fitted tree predicting class indices `0..n_classes`
#[derive(Debug, Clone)]
pub(crate) struct DecisionTree {
    nodes: Vec<Node>,
}

struct Builder<'a, R: Rng> {
    x: &'a Array2<f64>,
    y: &'a [usize],
    n_classes: usize,
    params: TreeParams,
    rng: &'a mut R,
    nodes: Vec<Node>,
    order: Vec<usize>,
}

impl DecisionTree {
    /// Grow a tree on the rows `rows` of `x` (duplicates allowed)
    pub fn fit<R: Rng>(
        x: &Array2<f64>,
        y: &[usize],
        n_classes: usize,
        rows: &mut [usize],
        params: TreeParams,
        rng: &mut R,
    ) -> Self {
        let mut builder = Builder {
            x,
            y,
            n_classes,
            params,
            rng,
            nodes: Vec::new(),
            order: Vec::with_capacity(rows.len()),
        };
        builder.grow(rows, 0);
        Self {
            nodes: builder.nodes,
        }
    }

    pub fn predict(&self, features: &[f64]) -> usize {
        let mut i = 0;
        loop {
            match &self.nodes[i] {
                Node::Leaf { class } => return *class,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    i = if features[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], i: usize) -> usize {
            match &nodes[i] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        walk(&self.nodes, 0)
    }
}

/// Index of the largest count, lowest index on ties
pub(crate) fn argmax(counts: &[usize]) -> usize {
    let mut best = 0;
    for (i, &c) in counts.iter().enumerate() {
        if c > counts[best] {
            best = i;
        }
    }
    best
}

impl<R: Rng> Builder<'_, R> {
    fn grow(&mut self, rows: &mut [usize], depth: usize) -> usize {
        let id = self.nodes.len();
        self.nodes.push(Node::Leaf { class: 0 });

        let mut counts = vec![0usize; self.n_classes];
        for &r in rows.iter() {
            counts[self.y[r]] += 1;
        }
        let majority = argmax(&counts);
        let n = rows.len();
        let pure = counts[majority] == n;
        let depth_reached = self.params.max_depth.map_or(false, |d| depth >= d);
        let min_leaf = self.params.min_leaf_population.max(1);

        if pure || depth_reached || n < 2 * min_leaf {
            self.nodes[id] = Node::Leaf { class: majority };
            return id;
        }

        let Some((feature, threshold)) = self.best_split(rows, &counts, min_leaf) else {
            self.nodes[id] = Node::Leaf { class: majority };
            return id;
        };

        let mut split = 0;
        for i in 0..n {
            if self.x[(rows[i], feature)] <= threshold {
                rows.swap(i, split);
                split += 1;
            }
        }
        let (left_rows, right_rows) = rows.split_at_mut(split);
        let left = self.grow(left_rows, depth + 1);
        let right = self.grow(right_rows, depth + 1);
        self.nodes[id] = Node::Split {
            feature,
            threshold,
            left,
            right,
        };
        id
    }

    /// Feature and threshold maximising the Gini gain
    fn best_split(&mut self, rows: &[usize], counts: &[usize], min_leaf: usize) -> Option<(usize, f64)> {
        let p = self.x.ncols();
        let features: Vec<usize> = match self.params.features_per_split {
            Some(m) if m < p => sample_indices(&mut *self.rng, p, m.max(1)).into_vec(),
            _ => (0..p).collect(),
        };

        let n = rows.len();
        let sq = |c: &[usize]| c.iter().map(|&v| (v * v) as f64).sum::<f64>();
        let parent = sq(counts) / n as f64;
        let mut best: Option<(f64, usize, f64)> = None;

        let mut left = vec![0usize; self.n_classes];
        let mut right = vec![0usize; self.n_classes];
        for f in features {
            self.order.clear();
            self.order.extend_from_slice(rows);
            let x = self.x;
            self.order
                .sort_unstable_by(|&a, &b| x[(a, f)].total_cmp(&x[(b, f)]));

            left.iter_mut().for_each(|v| *v = 0);
            right.copy_from_slice(counts);
            let mut sq_left = 0.0;
            let mut sq_right = sq(counts);

            for i in 0..n - 1 {
                let c = self.y[self.order[i]];
                sq_left += (2 * left[c] + 1) as f64;
                sq_right -= (2 * right[c] - 1) as f64;
                left[c] += 1;
                right[c] -= 1;

                let n_left = i + 1;
                let n_right = n - n_left;
                if n_left < min_leaf || n_right < min_leaf {
                    continue;
                }
                let lo = x[(self.order[i], f)];
                let hi = x[(self.order[i + 1], f)];
                if lo >= hi {
                    continue;
                }
                let score = sq_left / n_left as f64 + sq_right / n_right as f64;
                if score > parent + 1e-12 && best.map_or(true, |(s, _, _)| score > s) {
                    best = Some((score, f, lo + (hi - lo) / 2.0));
                }
            }
        }
        best.map(|(_, f, t)| (f, t))
    }
}
