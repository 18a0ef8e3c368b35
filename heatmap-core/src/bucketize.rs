use crate::series::{Map, Observation, RawSeries};
use heatmap_common::{HeatmapError, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketConfig {
    pub nbuckets: usize,
    #[serde(default)]
    pub min: f64,
    /// 0 asks `bucketize` to derive the maximum from the data.
    #[serde(default)]
    pub max: f64,
    #[serde(default)]
    pub weighbyrange: bool,
}

impl BucketConfig {
    pub fn new(nbuckets: usize) -> Self {
        Self { nbuckets, min: 0.0, max: 0.0, weighbyrange: false }
    }

    pub fn with_range(nbuckets: usize, min: f64, max: f64) -> Self {
        Self { nbuckets, min, max, weighbyrange: false }
    }
}

impl From<&heatmap_common::BucketingConfig> for BucketConfig {
    fn from(c: &heatmap_common::BucketingConfig) -> Self {
        Self { nbuckets: c.nbuckets, min: c.min, max: c.max, weighbyrange: c.weighbyrange }
    }
}

/// Spreads each observation's value uniformly over its range and accumulates the
/// per-bucket shares. Returns the map together with the max actually used.
pub fn bucketize(series: &RawSeries, conf: &BucketConfig) -> Result<(Map, f64)> {
    if conf.nbuckets == 0 {
        return Err(HeatmapError::config("nbuckets", "must be greater than zero"));
    }
    let samples = series.samples();

    // validate ranges and track the largest high in one pass
    let mut highest: Option<i64> = None;
    for (i, sample) in samples.iter().enumerate() {
        for (j, obs) in sample.iter().enumerate() {
            if obs.range.low > obs.range.high {
                return Err(HeatmapError::InvalidRange {
                    sample: i,
                    observation: j,
                    low: obs.range.low,
                    high: obs.range.high,
                });
            }
            highest = Some(highest.map_or(obs.range.high, |h| h.max(obs.range.high)));
        }
    }

    let min = conf.min;
    let max = if conf.max == 0.0 {
        highest.map_or(0.0, |h| (h + 1) as f64)
    } else {
        conf.max
    };

    if highest.is_none() {
        // nothing to distribute; the shape is all that matters
        return Ok((vec![vec![0.0; conf.nbuckets]; samples.len()], max));
    }
    if max <= min {
        return Err(HeatmapError::config("max", format!("resolved max {max} must exceed min {min}")));
    }

    let size = (max - min) / conf.nbuckets as f64;
    debug!(nsamples = samples.len(), nbuckets = conf.nbuckets, min, max, size, "bucketizing");

    let map = samples
        .par_iter()
        .map(|sample| bucketize_sample(sample, conf.nbuckets, min, max, size, conf.weighbyrange))
        .collect();
    Ok((map, max))
}

fn bucketize_sample(
    sample: &[Observation],
    nbuckets: usize,
    min: f64,
    max: f64,
    size: f64,
    weighbyrange: bool,
) -> Vec<f64> {
    let mut buckets = vec![0.0; nbuckets];
    let n = nbuckets as f64;

    for obs in sample {
        let (rlow, rhigh) = (obs.range.low as f64, obs.range.high as f64);
        if rlow >= max || rhigh < min {
            continue;
        }
        let value = if weighbyrange { obs.value * obs.range.midpoint() } else { obs.value };

        // range expressed in multiples of a bucket
        let mut low = (rlow - min) / size;
        let mut high = ((rhigh + 1.0) - min) / size;
        let lowfilled = low.floor() + 1.0;
        let mut highfilled = high.floor();

        if highfilled < lowfilled {
            // no bucket is fully covered: everything lands in the one we sit in
            let idx = (highfilled.max(0.0) as usize).min(nbuckets - 1);
            buckets[idx] += value;
            continue;
        }

        // share of value owed to one fully covered bucket
        let u = (1.0 / (high - low)) * value;

        if low < 0.0 {
            low = 0.0;
        }
        if high >= n {
            high = n - 1.0;
        }
        if highfilled > n {
            highfilled = n;
        }

        if low < lowfilled && lowfilled > 0.0 {
            if let Some(b) = buckets.get_mut(lowfilled as usize - 1) {
                *b += (lowfilled - low) * u;
            }
        }
        // indices below zero are outside the window
        for b in buckets.iter_mut().take(highfilled as usize).skip(lowfilled.max(0.0) as usize) {
            *b += u;
        }
        if high > highfilled {
            if let Some(b) = buckets.get_mut(highfilled as usize) {
                *b += (high - highfilled) * u;
            }
        }
    }
    buckets
}
