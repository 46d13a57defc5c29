//! Agglomerative clustering of assets on correlation distance.
//!
//! Distances are `d(i, j) = sqrt(2 (1 − ρ_ij))`. Clusters are merged
//! closest-first with Lance-Williams distance updates until the requested
//! number of flat clusters remains.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Inter-cluster distance update rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Linkage {
    /// Nearest members
    Single,
    /// Farthest members
    Complete,
    /// Size-weighted mean distance (UPGMA)
    #[default]
    Average,
    /// Unweighted mean of the merged clusters' distances (WPGMA)
    Weighted,
    /// Minimum variance increase
    Ward,
}

impl Linkage {
    /// Distance from `m` to the union of `i` and `j`.
    fn update(self, d_im: f64, d_jm: f64, d_ij: f64, n_i: f64, n_j: f64, n_m: f64) -> f64 {
        match self {
            Self::Single => d_im.min(d_jm),
            Self::Complete => d_im.max(d_jm),
            Self::Average => (n_i * d_im + n_j * d_jm) / (n_i + n_j),
            Self::Weighted => 0.5 * (d_im + d_jm),
            Self::Ward => {
                let t = n_i + n_j + n_m;
                (((n_i + n_m) * d_im * d_im + (n_j + n_m) * d_jm * d_jm - n_m * d_ij * d_ij) / t)
                    .max(0.0)
                    .sqrt()
            }
        }
    }
}

/// Correlation distance matrix.
pub fn correlation_distance(corr: &Array2<f64>) -> Array2<f64> {
    corr.mapv(|c| (2.0 * (1.0 - c)).max(0.0).sqrt())
}

/// Cluster into at most `k` groups.
///
/// Groups list member indices in ascending order and are ordered by their
/// first member. `k` at or above the number of items leaves every item on
/// its own; ties between equal distances merge the lowest index pair.
pub fn cluster(dist: &Array2<f64>, linkage: Linkage, k: usize) -> Vec<Vec<usize>> {
    let n = dist.nrows();
    let mut d = dist.clone();
    let mut members: Vec<Option<Vec<usize>>> = (0..n).map(|i| Some(vec![i])).collect();
    let mut remaining = n;

    while remaining > k.max(1) {
        let mut best: Option<(usize, usize, f64)> = None;
        for i in 0..n {
            if members[i].is_none() {
                continue;
            }
            for j in (i + 1)..n {
                if members[j].is_none() {
                    continue;
                }
                let dij = d[[i, j]];
                if best.is_none_or(|(_, _, b)| dij < b) {
                    best = Some((i, j, dij));
                }
            }
        }
        let Some((i, j, d_ij)) = best else { break };

        let n_i = members[i].as_ref().map_or(0, Vec::len) as f64;
        let n_j = members[j].as_ref().map_or(0, Vec::len) as f64;
        for m in 0..n {
            if m == i || m == j {
                continue;
            }
            if let Some(group) = &members[m] {
                let updated = linkage.update(d[[i, m]], d[[j, m]], d_ij, n_i, n_j, group.len() as f64);
                d[[i, m]] = updated;
                d[[m, i]] = updated;
            }
        }
        let absorbed = members[j].take().unwrap_or_default();
        if let Some(group) = members[i].as_mut() {
            group.extend(absorbed);
            group.sort_unstable();
        }
        remaining -= 1;
    }

    let mut groups: Vec<Vec<usize>> = members.into_iter().flatten().collect();
    groups.sort_by_key(|g| g[0]);
    groups
}

/// Member with the highest mean correlation to its own cluster.
///
/// Ties go to the lowest index.
pub fn medoid(corr: &Array2<f64>, group: &[usize]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for &i in group {
        let avg = group.iter().map(|&j| corr[[i, j]]).sum::<f64>() / group.len() as f64;
        if best.is_none_or(|(_, b)| avg > b) {
            best = Some((i, avg));
        }
    }
    best.map(|(i, _)| i)
}
