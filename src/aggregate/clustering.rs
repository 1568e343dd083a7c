/// Hierarchical clustering of samples
///
/// Samples are compared on their KO profile: a sample x KO matrix holding how
/// many rows pair each sample with each KO. Pairwise distances between the
/// profiles feed an agglomerative merge that joins the two closest clusters at
/// every step.
///
/// Merges use the usual four-column layout. Ids below the sample count are
/// samples; merge `i` creates cluster `n + i`.

use crate::column::{Column, ColumnType, ColumnValue, ValueKey};
use crate::error::{processing_failure, Error, Result};
use crate::table::Table;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Distance between two KO profiles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    #[default]
    Euclidean,
    /// Sum of absolute differences
    Cityblock,
}

impl DistanceMetric {
    pub fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        let pairs = a.iter().zip(b);
        match self {
            DistanceMetric::Euclidean => pairs.map(|(x, y)| (x - y) * (x - y)).sum::<f64>().sqrt(),
            DistanceMetric::Cityblock => pairs.map(|(x, y)| (x - y).abs()).sum(),
        }
    }
}

/// How the distance to a freshly merged cluster is derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Linkage {
    /// Nearest member
    #[default]
    Single,
    /// Farthest member
    Complete,
    /// Mean over all member pairs
    Average,
    /// Mean of the two merged clusters' distances
    Weighted,
    /// Minimum variance increase
    Ward,
}

impl Linkage {
    /// Distance from cluster `k` to the union of `i` and `j`
    fn update(&self, d_ki: f64, d_kj: f64, d_ij: f64, n_i: usize, n_j: usize, n_k: usize) -> f64 {
        let (n_i, n_j, n_k) = (n_i as f64, n_j as f64, n_k as f64);
        match self {
            Linkage::Single => d_ki.min(d_kj),
            Linkage::Complete => d_ki.max(d_kj),
            Linkage::Average => (n_i * d_ki + n_j * d_kj) / (n_i + n_j),
            Linkage::Weighted => (d_ki + d_kj) / 2.0,
            Linkage::Ward => {
                let sum = (n_i + n_k) * d_ki * d_ki + (n_j + n_k) * d_kj * d_kj - n_k * d_ij * d_ij;
                (sum / (n_i + n_j + n_k)).max(0.0).sqrt()
            }
        }
    }
}

/// One agglomeration step
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Merge {
    /// Smaller id of the two merged clusters
    pub left: usize,
    pub right: usize,
    pub distance: f64,
    /// Number of samples in the new cluster
    pub size: usize,
}

/// Result of clustering the samples of a table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleClustering {
    metric: DistanceMetric,
    linkage: Linkage,
    samples: Vec<String>,
    distances: Vec<f64>,
    merges: Vec<Merge>,
}

impl SampleClustering {
    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    pub fn linkage(&self) -> Linkage {
        self.linkage
    }

    /// Sample names, sorted; a sample's position is its leaf id
    pub fn samples(&self) -> &[String] {
        &self.samples
    }

    /// Condensed pairwise distances: `(0,1), (0,2), .., (1,2), ..`
    pub fn distances(&self) -> &[f64] {
        &self.distances
    }

    /// Distance between the samples at positions `a` and `b`
    pub fn distance(&self, a: usize, b: usize) -> Option<f64> {
        let n = self.samples.len();
        if a >= n || b >= n {
            return None;
        }
        if a == b {
            return Some(0.0);
        }
        let (i, j) = if a < b { (a, b) } else { (b, a) };
        self.distances.get(condensed_index(n, i, j)).copied()
    }

    pub fn merges(&self) -> &[Merge] {
        &self.merges
    }

    /// Merges as `[left, right, distance, size]` rows
    pub fn linkage_matrix(&self) -> Vec<[f64; 4]> {
        self.merges
            .iter()
            .map(|m| [m.left as f64, m.right as f64, m.distance, m.size as f64])
            .collect()
    }
}

struct Profiles {
    samples: Vec<String>,
    kos: Vec<String>,
    counts: Vec<Vec<i64>>,
}

fn profiles(table: &Table) -> Result<Profiles> {
    table.require(&["sample", "ko"])?;
    let groups = table
        .group_by(&["sample", "ko"])
        .map_err(processing_failure("Pivoting samples by KO"))?;

    let kos: BTreeSet<ValueKey<'_>> = groups.keys().map(|key| key[1]).collect();
    let positions: BTreeMap<ValueKey<'_>, usize> = kos.iter().enumerate().map(|(i, ko)| (*ko, i)).collect();

    let mut rows: BTreeMap<ValueKey<'_>, Vec<i64>> = BTreeMap::new();
    for (key, members) in &groups {
        let row = rows.entry(key[0]).or_insert_with(|| vec![0; kos.len()]);
        if let Some(&position) = positions.get(&key[1]) {
            row[position] = members.len() as i64;
        }
    }

    Ok(Profiles {
        samples: rows.keys().map(|s| s.to_value().to_string()).collect(),
        kos: kos.iter().map(|k| k.to_value().to_string()).collect(),
        counts: rows.into_values().collect(),
    })
}

/// Pivot of row counts: one row per sample, one INT64 column per KO, zero
/// where a sample never meets that KO.
///
/// Samples and KO columns are both sorted. Rows with a NULL sample or KO are
/// ignored.
pub fn sample_ko_matrix(table: &Table) -> Result<Table> {
    let profiles = profiles(table)?;
    let fail = || processing_failure("Building the sample/KO matrix");

    let samples = profiles.samples.iter().map(|s| ColumnValue::from(s.as_str())).collect();
    let mut columns = Vec::with_capacity(profiles.kos.len() + 1);
    columns.push(Column::from_values("sample", ColumnType::String, false, samples).map_err(fail())?);
    for (position, ko) in profiles.kos.iter().enumerate() {
        let values = profiles.counts.iter().map(|row| ColumnValue::Int64(row[position])).collect();
        columns.push(Column::from_values(ko, ColumnType::Int64, false, values).map_err(fail())?);
    }

    Table::from_columns("sample_ko_matrix".to_string(), columns).map_err(fail())
}

/// Cluster the samples of `table` (columns `sample` and `ko`).
///
/// Fails with `Error::InsufficientData` when fewer than two samples remain
/// after dropping NULLs.
pub fn cluster_samples(table: &Table, metric: DistanceMetric, linkage: Linkage) -> Result<SampleClustering> {
    log::info!("Clustering samples of '{}' ({:?} distance, {:?} linkage)", table.name(), metric, linkage);
    let profiles = profiles(table)?;

    let n = profiles.samples.len();
    if n < 2 {
        let err = Error::InsufficientData {
            context: "Clustering samples".to_string(),
            needed: 2,
            found: n,
        };
        log::warn!("{}", err);
        return Err(err);
    }

    let vectors: Vec<Vec<f64>> = profiles
        .counts
        .iter()
        .map(|row| row.iter().map(|&c| c as f64).collect())
        .collect();
    let mut distances = Vec::with_capacity(n * (n - 1) / 2);
    for i in 0..n {
        for j in i + 1..n {
            distances.push(metric.distance(&vectors[i], &vectors[j]));
        }
    }

    let merges = agglomerate(n, &distances, linkage);
    log::info!("Clustered {} samples over {} KOs", n, profiles.kos.len());

    Ok(SampleClustering {
        metric,
        linkage,
        samples: profiles.samples,
        distances,
        merges,
    })
}

fn condensed_index(n: usize, i: usize, j: usize) -> usize {
    n * i - i * (i + 1) / 2 + (j - i - 1)
}

/// Merge the closest pair of active clusters until one is left.
/// Ties go to the pair found first in slot order.
fn agglomerate(n: usize, condensed: &[f64], linkage: Linkage) -> Vec<Merge> {
    let mut dist = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in i + 1..n {
            let d = condensed[condensed_index(n, i, j)];
            dist[i][j] = d;
            dist[j][i] = d;
        }
    }

    // Slot i holds cluster ids[i] while active[i].
    let mut active = vec![true; n];
    let mut ids: Vec<usize> = (0..n).collect();
    let mut sizes = vec![1usize; n];
    let mut merges = Vec::with_capacity(n.saturating_sub(1));

    for step in 0..n.saturating_sub(1) {
        let mut closest: Option<(usize, usize, f64)> = None;
        for i in (0..n).filter(|&i| active[i]) {
            for j in (i + 1..n).filter(|&j| active[j]) {
                if closest.map_or(true, |(_, _, d)| dist[i][j] < d) {
                    closest = Some((i, j, dist[i][j]));
                }
            }
        }
        let Some((i, j, d)) = closest else { break };

        for k in (0..n).filter(|&k| active[k] && k != i && k != j) {
            let updated = linkage.update(dist[k][i], dist[k][j], d, sizes[i], sizes[j], sizes[k]);
            dist[k][i] = updated;
            dist[i][k] = updated;
        }

        merges.push(Merge {
            left: ids[i].min(ids[j]),
            right: ids[i].max(ids[j]),
            distance: d,
            size: sizes[i] + sizes[j],
        });
        active[j] = false;
        sizes[i] += sizes[j];
        ids[i] = n + step;
    }
    merges
}
