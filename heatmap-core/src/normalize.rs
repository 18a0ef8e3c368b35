use crate::series::Series;
use heatmap_common::{HeatmapError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::debug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Normalization {
    /// Score by position among all nonzero values.
    #[default]
    Rank,
    /// Divide by the largest value (never by less than 1).
    Linear,
}

impl FromStr for Normalization {
    type Err = HeatmapError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "rank" => Ok(Self::Rank),
            "linear" => Ok(Self::Linear),
            other => Err(HeatmapError::config("normalization", format!("unknown mode {other:?} (use rank or linear)"))),
        }
    }
}

/// Rescales every map of `series` into `[0, 1]` in place. Zero stays zero.
pub fn normalize(series: &mut Series, mode: Normalization) -> Result<()> {
    series.shape()?;
    let pool: Vec<f64> = series
        .maps()
        .iter()
        .flatten()
        .flatten()
        .copied()
        .filter(|v| *v != 0.0)
        .collect();
    debug!(?mode, pool = pool.len(), "normalizing");

    match mode {
        Normalization::Rank => {
            let scores = rank_scores(pool);
            apply(series, |v| scores[&v.to_bits()]);
        }
        Normalization::Linear => {
            let max = pool.into_iter().fold(1.0, f64::max);
            apply(series, |v| v / max);
        }
    }
    Ok(())
}

// Ties are keyed by exact bit pattern: values that differ by one ulp rank apart.
fn rank_scores(mut values: Vec<f64>) -> HashMap<u64, f64> {
    values.sort_by(|a, b| b.total_cmp(a));
    let n = values.len() as f64;
    let mut scores = HashMap::with_capacity(values.len());
    for (i, v) in values.iter().enumerate() {
        scores.entry(v.to_bits()).or_insert((n - i as f64) / n);
    }
    scores
}

fn apply(series: &mut Series, f: impl Fn(f64) -> f64) {
    for map in series.maps_mut() {
        for v in map.iter_mut().flatten() {
            if *v != 0.0 {
                *v = f(*v);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(s: &Series) -> Vec<f64> {
        s.maps().iter().flatten().flatten().copied().collect()
    }

    #[test]
    fn rank_scores_by_position() {
        let mut s = Series::One(vec![vec![10.0, 0.0, 30.0], vec![20.0, 40.0, 0.0]]);
        normalize(&mut s, Normalization::Rank).unwrap();
        assert_eq!(flat(&s), vec![0.25, 0.0, 0.75, 0.5, 1.0, 0.0]);
    }

    #[test]
    fn rank_ties_share_first_score() {
        let mut s = Series::One(vec![vec![5.0, 5.0, 1.0, 5.0]]);
        normalize(&mut s, Normalization::Rank).unwrap();
        assert_eq!(flat(&s), vec![1.0, 1.0, 0.25, 1.0]);
    }

    #[test]
    fn rank_pools_across_maps() {
        let mut s = Series::Many(vec![vec![vec![1.0, 2.0]], vec![vec![3.0, 4.0]]]);
        normalize(&mut s, Normalization::Rank).unwrap();
        assert_eq!(s.maps()[0], vec![vec![0.25, 0.5]]);
        assert_eq!(s.maps()[1], vec![vec![0.75, 1.0]]);
    }

    #[test]
    fn linear_divides_by_max_with_floor() {
        let mut s = Series::One(vec![vec![2.0, 8.0, 0.0]]);
        normalize(&mut s, Normalization::Linear).unwrap();
        assert_eq!(flat(&s), vec![0.25, 1.0, 0.0]);

        let mut small = Series::One(vec![vec![0.5, 0.25]]);
        normalize(&mut small, Normalization::Linear).unwrap();
        assert_eq!(flat(&small), vec![0.5, 0.25]);

        let mut zeros = Series::One(vec![vec![0.0; 4]]);
        normalize(&mut zeros, Normalization::Linear).unwrap();
        assert_eq!(flat(&zeros), vec![0.0; 4]);
    }

    #[test]
    fn normalizing_twice_is_a_noop() {
        for mode in [Normalization::Rank, Normalization::Linear] {
            let mut s = Series::Many(vec![
                vec![vec![3.0, 0.0, 7.25], vec![7.25, 1.5, 9.0]],
                vec![vec![0.0, 2.0, 3.0], vec![11.0, 0.0, 0.5]],
            ]);
            normalize(&mut s, mode).unwrap();
            let once = s.clone();
            assert!(flat(&once).iter().all(|v| (0.0..=1.0).contains(v)));
            normalize(&mut s, mode).unwrap();
            assert_eq!(s, once);
        }
    }

    #[test]
    fn rank_preserves_order() {
        let raw = vec![vec![0.3, 9.0, 0.0, 4.5, 2.0, 4.5]];
        let mut s = Series::One(raw.clone());
        normalize(&mut s, Normalization::Rank).unwrap();
        let out = &s.maps()[0][0];
        for i in 0..raw[0].len() {
            for j in 0..raw[0].len() {
                if raw[0][i] < raw[0][j] {
                    assert!(out[i] < out[j]);
                }
            }
        }
    }

    #[test]
    fn ragged_maps_rejected() {
        let mut s = Series::Many(vec![vec![vec![1.0, 2.0]], vec![vec![1.0]]]);
        assert!(matches!(normalize(&mut s, Normalization::Rank), Err(HeatmapError::InvalidShape(_))));
    }

    #[test]
    fn mode_from_str() {
        assert_eq!("linear".parse::<Normalization>().unwrap(), Normalization::Linear);
        assert_eq!(Normalization::default(), Normalization::Rank);
        assert!("both".parse::<Normalization>().is_err());
    }
}
