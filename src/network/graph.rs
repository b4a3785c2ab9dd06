//! Undirected protein interaction graphs and their centrality metrics.
//!
//! Centralities follow the usual normalized definitions:
//! - degree: deg(v) / (n − 1)
//! - betweenness: Brandes' algorithm, pair dependencies summed over both
//!   directions and divided by (n − 1)(n − 2)
//! - closeness: Wasserman–Faust, (r / (n − 1)) · (r / Σ d(v, u)) over the
//!   r nodes reachable from v, so disconnected graphs stay comparable
//!
//! Communities come from greedy agglomerative modularity maximization
//! (Clauset–Newman–Moore) on the unweighted topology.

use crate::annotate::Interaction;
use crate::data::DiffResult;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;

/// Interaction network keyed by feature identifier.
#[derive(Debug, Clone, Default)]
pub struct InteractionNetwork {
    nodes: Vec<String>,
    index: HashMap<String, usize>,
    /// Effect size attached to each node, if it came from a result table.
    effects: Vec<Option<f64>>,
    edges: Vec<(usize, usize, f64)>,
    adjacency: Vec<Vec<(usize, f64)>>,
}

/// Summary statistics of a network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkStats {
    pub n_nodes: usize,
    pub n_edges: usize,
    pub density: f64,
    pub n_components: usize,
    /// Communities found by greedy modularity maximization.
    pub n_communities: usize,
    /// Modularity Q of that partition.
    pub modularity: f64,
    /// Edges with weight above 0.9.
    pub n_high_confidence: usize,
}

/// Per-node centrality row, as written to the hub table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HubRow {
    pub protein: String,
    pub degree: usize,
    pub degree_centrality: f64,
    pub betweenness_centrality: f64,
    pub closeness_centrality: f64,
}

impl InteractionNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Significant results become nodes; interactions between two of them
    /// become edges weighted by combined score.
    pub fn from_results<'a, I>(results: I, interactions: &[Interaction]) -> Self
    where
        I: IntoIterator<Item = &'a DiffResult>,
    {
        let mut net = Self::new();
        for r in results {
            net.add_node(&r.feature_id, Some(r.effect_size));
        }
        for i in interactions {
            if net.contains(&i.protein1) && net.contains(&i.protein2) {
                net.add_edge(&i.protein1, &i.protein2, i.combined_score);
            }
        }
        net
    }

    /// Add a node if absent; returns its index.
    pub fn add_node(&mut self, id: &str, effect: Option<f64>) -> usize {
        if let Some(&i) = self.index.get(id) {
            if effect.is_some() {
                self.effects[i] = effect;
            }
            return i;
        }
        let i = self.nodes.len();
        self.nodes.push(id.to_string());
        self.index.insert(id.to_string(), i);
        self.effects.push(effect);
        self.adjacency.push(Vec::new());
        i
    }

    /// Add an undirected edge, creating missing nodes. Self-loops and repeated
    /// edges are ignored; returns whether an edge was added.
    pub fn add_edge(&mut self, a: &str, b: &str, weight: f64) -> bool {
        let u = self.add_node(a, None);
        let v = self.add_node(b, None);
        if u == v || self.adjacency[u].iter().any(|&(w, _)| w == v) {
            return false;
        }
        self.edges.push((u, v, weight));
        self.adjacency[u].push((v, weight));
        self.adjacency[v].push((u, weight));
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn n_edges(&self) -> usize {
        self.edges.len()
    }

    /// Node identifiers in insertion order.
    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    pub fn effect(&self, id: &str) -> Option<f64> {
        self.index.get(id).and_then(|&i| self.effects[i])
    }

    pub fn degree(&self, id: &str) -> Option<usize> {
        self.index.get(id).map(|&i| self.adjacency[i].len())
    }

    /// 2E / (n(n − 1)); zero for fewer than two nodes.
    pub fn density(&self) -> f64 {
        let n = self.n_nodes();
        if n < 2 {
            return 0.0;
        }
        2.0 * self.n_edges() as f64 / (n * (n - 1)) as f64
    }

    pub fn degree_centrality(&self) -> Vec<f64> {
        let n = self.n_nodes();
        if n <= 1 {
            return vec![0.0; n];
        }
        let denom = (n - 1) as f64;
        self.adjacency.iter().map(|adj| adj.len() as f64 / denom).collect()
    }

    /// Betweenness centrality using Brandes' algorithm.
    pub fn betweenness_centrality(&self) -> Vec<f64> {
        let n = self.n_nodes();
        let mut cb = vec![0.0f64; n];

        for s in 0..n {
            let mut stack = Vec::new();
            let mut pred: Vec<Vec<usize>> = vec![Vec::new(); n];
            let mut sigma = vec![0.0f64; n];
            sigma[s] = 1.0;
            let mut dist = vec![-1i64; n];
            dist[s] = 0;

            let mut queue = VecDeque::new();
            queue.push_back(s);

            while let Some(v) = queue.pop_front() {
                stack.push(v);
                for &(w, _) in &self.adjacency[v] {
                    if dist[w] < 0 {
                        dist[w] = dist[v] + 1;
                        queue.push_back(w);
                    }
                    if dist[w] == dist[v] + 1 {
                        sigma[w] += sigma[v];
                        pred[w].push(v);
                    }
                }
            }

            let mut delta = vec![0.0f64; n];
            while let Some(w) = stack.pop() {
                for &v in &pred[w] {
                    delta[v] += (sigma[v] / sigma[w]) * (1.0 + delta[w]);
                }
                if w != s {
                    cb[w] += delta[w];
                }
            }
        }

        if n > 2 {
            let norm = ((n - 1) * (n - 2)) as f64;
            for v in &mut cb {
                *v /= norm;
            }
        }
        cb
    }

    pub fn closeness_centrality(&self) -> Vec<f64> {
        let n = self.n_nodes();
        if n <= 1 {
            return vec![0.0; n];
        }

        (0..n)
            .map(|v| {
                let distances = self.bfs_distances(v);
                let reached: Vec<usize> = distances
                    .into_iter()
                    .filter(|&d| d > 0 && d != usize::MAX)
                    .collect();
                let sum_dist: usize = reached.iter().sum();
                if sum_dist == 0 {
                    return 0.0;
                }
                let r = reached.len() as f64;
                (r / (n - 1) as f64) * (r / sum_dist as f64)
            })
            .collect()
    }

    /// Connected components, largest first (ties by first member).
    pub fn connected_components(&self) -> Vec<Vec<String>> {
        let n = self.n_nodes();
        let mut seen = vec![false; n];
        let mut components = Vec::new();

        for start in 0..n {
            if seen[start] {
                continue;
            }
            let mut members = Vec::new();
            let mut queue = VecDeque::from([start]);
            seen[start] = true;
            while let Some(v) = queue.pop_front() {
                members.push(v);
                for &(w, _) in &self.adjacency[v] {
                    if !seen[w] {
                        seen[w] = true;
                        queue.push_back(w);
                    }
                }
            }
            members.sort_unstable();
            components.push(members);
        }

        components.sort_by(|a, b| b.len().cmp(&a.len()).then(a[0].cmp(&b[0])));
        components
            .into_iter()
            .map(|c| c.into_iter().map(|i| self.nodes[i].clone()).collect())
            .collect()
    }

    /// Greedy modularity communities, largest first (ties by first member).
    ///
    /// Starting from singletons, the pair of adjacent communities whose merge
    /// raises modularity the most is merged until no merge improves it.
    pub fn modularity_communities(&self) -> Vec<Vec<String>> {
        self.greedy_partition()
            .into_iter()
            .map(|c| c.into_iter().map(|i| self.nodes[i].clone()).collect())
            .collect()
    }

    /// Modularity Q = Σ_c [L_c / m − (d_c / 2m)²] of a partition given as
    /// lists of node identifiers. Unknown identifiers are ignored.
    pub fn modularity(&self, communities: &[Vec<String>]) -> f64 {
        let mut assignment = vec![usize::MAX; self.n_nodes()];
        for (c, members) in communities.iter().enumerate() {
            for id in members {
                if let Some(&i) = self.index.get(id) {
                    assignment[i] = c;
                }
            }
        }
        self.partition_modularity(&assignment, communities.len())
    }

    fn partition_modularity(&self, assignment: &[usize], n_communities: usize) -> f64 {
        let m = self.n_edges() as f64;
        if m == 0.0 {
            return 0.0;
        }
        let mut internal = vec![0.0; n_communities];
        let mut degree = vec![0.0; n_communities];
        for &(u, v, _) in &self.edges {
            if assignment[u] == assignment[v] && assignment[u] < n_communities {
                internal[assignment[u]] += 1.0;
            }
        }
        for (v, c) in assignment.iter().enumerate() {
            if *c < n_communities {
                degree[*c] += self.adjacency[v].len() as f64;
            }
        }
        internal
            .iter()
            .zip(&degree)
            .map(|(l, d)| l / m - (d / (2.0 * m)).powi(2))
            .sum()
    }

    fn greedy_partition(&self) -> Vec<Vec<usize>> {
        let n = self.n_nodes();
        let m = self.n_edges() as f64;
        let mut members: Vec<Vec<usize>> = (0..n).map(|i| vec![i]).collect();
        let mut alive = vec![true; n];

        if m > 0.0 {
            // a[c]: fraction of edge ends in c; between[c][d]: edges joining c and d
            let mut a: Vec<f64> = (0..n)
                .map(|i| self.adjacency[i].len() as f64 / (2.0 * m))
                .collect();
            let mut between: Vec<HashMap<usize, f64>> = vec![HashMap::new(); n];
            for &(u, v, _) in &self.edges {
                *between[u].entry(v).or_insert(0.0) += 1.0;
                *between[v].entry(u).or_insert(0.0) += 1.0;
            }

            loop {
                let mut best: Option<(usize, usize, f64)> = None;
                for c in (0..n).filter(|&c| alive[c]) {
                    let mut neighbours: Vec<(&usize, &f64)> =
                        between[c].iter().filter(|(d, _)| **d > c).collect();
                    neighbours.sort_by_key(|(d, _)| **d);
                    for (&d, &e) in neighbours {
                        let dq = e / m - 2.0 * a[c] * a[d];
                        if best.map_or(true, |(_, _, q)| dq > q) {
                            best = Some((c, d, dq));
                        }
                    }
                }
                let (c, d) = match best {
                    Some((c, d, dq)) if dq > 0.0 => (c, d),
                    _ => break,
                };

                // Merge d into c
                let moved = std::mem::take(&mut members[d]);
                members[c].extend(moved);
                alive[d] = false;
                a[c] += a[d];
                let links = std::mem::take(&mut between[d]);
                for (k, e) in links {
                    between[k].remove(&d);
                    if k != c {
                        *between[c].entry(k).or_insert(0.0) += e;
                        *between[k].entry(c).or_insert(0.0) += e;
                    }
                }
                between[c].remove(&d);
            }
        }

        let mut communities: Vec<Vec<usize>> = members
            .into_iter()
            .zip(alive)
            .filter(|(_, keep)| *keep)
            .map(|(mut c, _)| {
                c.sort_unstable();
                c
            })
            .collect();
        communities.sort_by(|a, b| b.len().cmp(&a.len()).then(a[0].cmp(&b[0])));
        communities
    }

    pub fn stats(&self) -> NetworkStats {
        let communities = self.greedy_partition();
        let mut assignment = vec![0; self.n_nodes()];
        for (c, members) in communities.iter().enumerate() {
            for &v in members {
                assignment[v] = c;
            }
        }
        NetworkStats {
            n_nodes: self.n_nodes(),
            n_edges: self.n_edges(),
            density: self.density(),
            n_components: self.connected_components().len(),
            n_communities: communities.len(),
            modularity: self.partition_modularity(&assignment, communities.len()),
            n_high_confidence: self.edges.iter().filter(|(_, _, w)| *w > 0.9).count(),
        }
    }

    /// Centrality table sorted by degree, highest first (ties by identifier).
    pub fn hub_table(&self) -> Vec<HubRow> {
        let degree = self.degree_centrality();
        let betweenness = self.betweenness_centrality();
        let closeness = self.closeness_centrality();

        let mut rows: Vec<HubRow> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, id)| HubRow {
                protein: id.clone(),
                degree: self.adjacency[i].len(),
                degree_centrality: degree[i],
                betweenness_centrality: betweenness[i],
                closeness_centrality: closeness[i],
            })
            .collect();
        rows.sort_by(|a, b| b.degree.cmp(&a.degree).then_with(|| a.protein.cmp(&b.protein)));
        rows
    }

    fn bfs_distances(&self, start: usize) -> Vec<usize> {
        let n = self.n_nodes();
        let mut dist = vec![usize::MAX; n];
        dist[start] = 0;
        let mut queue = VecDeque::new();
        queue.push_back(start);
        while let Some(v) = queue.pop_front() {
            for &(w, _) in &self.adjacency[v] {
                if dist[w] == usize::MAX {
                    dist[w] = dist[v] + 1;
                    queue.push_back(w);
                }
            }
        }
        dist
    }
}

/// Interactions whose endpoints are both in `proteins`, strongest first.
pub fn filter_interactions(interactions: &[Interaction], proteins: &HashSet<&str>) -> Vec<Interaction> {
    let mut kept: Vec<Interaction> = interactions
        .iter()
        .filter(|i| proteins.contains(i.protein1.as_str()) && proteins.contains(i.protein2.as_str()))
        .cloned()
        .collect();
    kept.sort_by(|a, b| b.combined_score.total_cmp(&a.combined_score));
    kept
}

/// Write interactions to CSV.
pub fn write_interactions_csv<P: AsRef<Path>>(path: P, interactions: &[Interaction]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_path(path)?;
    writer.write_record(["protein1", "protein2", "combined_score", "nscore"])?;
    for i in interactions {
        writer.serialize(i)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the hub table to CSV.
pub fn write_hubs_csv<P: AsRef<Path>>(path: P, hubs: &[HubRow]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_path(path)?;
    writer.write_record([
        "protein",
        "degree",
        "degree_centrality",
        "betweenness_centrality",
        "closeness_centrality",
    ])?;
    for h in hubs {
        writer.serialize(h)?;
    }
    writer.flush()?;
    Ok(())
}
