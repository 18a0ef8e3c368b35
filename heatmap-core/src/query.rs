use crate::series::{check_rows, Map};
use heatmap_common::{HeatmapError, Result};
use serde::{Deserialize, Serialize};

/// Image geometry needed to map a pixel back onto a cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeometryConfig {
    pub width: usize,
    pub height: usize,
    pub nbuckets: usize,
    pub nsamples: usize,
    pub min: f64,
    pub max: f64,
    #[serde(default)]
    pub base: i64,
}

/// Bucket layout of a map, for queries that read values rather than pixels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsConfig {
    pub nbuckets: usize,
    pub min: f64,
    pub max: f64,
    #[serde(default)]
    pub base: i64,
}

impl StatsConfig {
    pub fn new(nbuckets: usize, min: f64, max: f64, base: i64) -> Self {
        Self { nbuckets, min, max, base }
    }

    fn size(&self) -> f64 {
        (self.max - self.min) / self.nbuckets as f64
    }

    fn center(&self, j: usize) -> f64 {
        self.min + (j as f64 + 0.5) * self.size()
    }

    fn check(&self, map: &Map) -> Result<()> {
        if self.nbuckets == 0 {
            return Err(HeatmapError::config("nbuckets", "must be greater than zero"));
        }
        check_rows(map, self.nbuckets)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleRange {
    pub sample: i64,
    pub range: [i64; 2],
}

/// Inverse of the rasterizer's placement: which sample and value range pixel `(x, y)` shows.
pub fn samplerange(x: usize, y: usize, conf: &GeometryConfig) -> Result<SampleRange> {
    for (field, v) in [
        ("width", conf.width),
        ("height", conf.height),
        ("nbuckets", conf.nbuckets),
        ("nsamples", conf.nsamples),
    ] {
        if v == 0 {
            return Err(HeatmapError::config(field, "must be greater than zero"));
        }
    }
    let bwidth = conf.width as f64 / conf.nsamples as f64;
    let bheight = conf.height as f64 / conf.nbuckets as f64;
    let size = (conf.max - conf.min) / conf.nbuckets as f64;

    let sample = ((x as f64 + (conf.base as f64 * bwidth).floor()) / bwidth).floor() as i64;
    let bucket = conf.nbuckets as f64 - (y as f64 / bheight).floor() - 1.0;
    let low = (conf.min + bucket * size).round() as i64;
    let high = (conf.min + (bucket + 1.0) * size).round() as i64 - 1;
    Ok(SampleRange { sample, range: [low, high] })
}

/// Per-bucket total across all samples, keyed by bucket center.
pub fn distribution(map: &Map, conf: &StatsConfig) -> Result<Vec<(f64, f64)>> {
    conf.check(map)?;
    Ok((0..conf.nbuckets)
        .map(|j| (conf.center(j), map.iter().map(|row| row[j]).sum()))
        .collect())
}

/// Per-sample mean of bucket centers weighted by bucket value. Empty samples yield NaN.
pub fn average(map: &Map, conf: &StatsConfig) -> Result<Vec<(i64, f64)>> {
    conf.check(map)?;
    Ok(map
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let weight: f64 = row.iter().sum();
            let moment: f64 = row.iter().enumerate().map(|(j, v)| v * conf.center(j)).sum();
            (conf.base + i as i64, moment / weight)
        })
        .collect())
}

/// Per-sample value at cumulative fraction `p`, interpolating linearly inside the bucket
/// where the running total reaches `p` of the sample's mass.
pub fn percentile(map: &Map, conf: &StatsConfig, p: f64) -> Result<Vec<(i64, f64)>> {
    conf.check(map)?;
    if !(0.0..=1.0).contains(&p) {
        return Err(HeatmapError::config("percentile", format!("{p} is outside [0, 1]")));
    }
    let size = conf.size();
    Ok(map
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let (k, fraction) = locate(row, p);
            (conf.base + i as i64, conf.min + k as f64 * size + fraction * size)
        })
        .collect())
}

fn locate(row: &[f64], p: f64) -> (usize, f64) {
    let target = p * row.iter().sum::<f64>();
    if target == 0.0 {
        return (0, 0.0);
    }
    let mut cum = 0.0;
    for (k, &b) in row.iter().enumerate() {
        if cum + b >= target {
            let fraction = if b == 0.0 { 0.0 } else { (target - cum) / b };
            return (k, fraction);
        }
        cum += b;
    }
    // summation drift left the target just past the last bucket
    (row.len() - 1, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry() -> GeometryConfig {
        GeometryConfig { width: 100, height: 50, nbuckets: 10, nsamples: 20, min: 0.0, max: 1000.0, base: 0 }
    }

    #[test]
    fn samplerange_corners() {
        let g = geometry();
        assert_eq!(samplerange(0, 49, &g).unwrap(), SampleRange { sample: 0, range: [0, 99] });
        assert_eq!(samplerange(99, 0, &g).unwrap(), SampleRange { sample: 19, range: [900, 999] });
        assert_eq!(samplerange(7, 27, &g).unwrap(), SampleRange { sample: 1, range: [400, 499] });
    }

    #[test]
    fn samplerange_reports_absolute_sample() {
        let mut g = geometry();
        g.base = 40;
        assert_eq!(samplerange(0, 0, &g).unwrap().sample, 40);
        assert_eq!(samplerange(12, 0, &g).unwrap().sample, 42);
    }

    #[test]
    fn samplerange_rejects_zero_geometry() {
        let mut g = geometry();
        g.nsamples = 0;
        assert!(matches!(samplerange(0, 0, &g), Err(HeatmapError::InvalidConfig { field: "nsamples", .. })));
    }

    #[test]
    fn distribution_sums_columns() {
        let map = vec![vec![1.0, 2.0], vec![3.0, 0.5]];
        let d = distribution(&map, &StatsConfig::new(2, 0.0, 10.0, 0)).unwrap();
        assert_eq!(d, vec![(2.5, 4.0), (7.5, 2.5)]);
    }

    #[test]
    fn average_weights_centers() {
        let map = vec![vec![1.0, 3.0], vec![0.0, 0.0]];
        let a = average(&map, &StatsConfig::new(2, 0.0, 10.0, 7)).unwrap();
        assert_eq!(a[0], (7, 6.25));
        assert_eq!(a[1].0, 8);
        assert!(a[1].1.is_nan());
    }

    #[test]
    fn percentile_interpolates_inside_bucket() {
        let conf = StatsConfig::new(10, 1.0, 101.0, 101);
        let map = vec![vec![5.0, 10.0, 30.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]];
        let at = |p| percentile(&map, &conf, p).unwrap()[0].1;
        assert_eq!(at(0.0), 1.0);
        assert!((at(0.5) - 23.5).abs() < 1e-9);
        assert!((at(0.95) - 30.25).abs() < 1e-9);
        assert!((at(1.0) - 31.0).abs() < 1e-9);
    }

    #[test]
    fn percentile_of_empty_sample_is_min() {
        let conf = StatsConfig::new(3, 10.0, 40.0, 0);
        assert_eq!(percentile(&vec![vec![0.0; 3]], &conf, 0.5).unwrap(), vec![(0, 10.0)]);
    }

    #[test]
    fn percentile_rejects_bad_fraction_and_shape() {
        let conf = StatsConfig::new(3, 0.0, 3.0, 0);
        assert!(percentile(&vec![vec![1.0; 3]], &conf, 1.5).is_err());
        assert!(matches!(percentile(&vec![vec![1.0; 2]], &conf, 0.5), Err(HeatmapError::InvalidShape(_))));
    }
}
