use crate::bucketize::{bucketize, BucketConfig};
use crate::deduct::deduct;
use crate::generate::Hue;
use crate::query::{samplerange, GeometryConfig};
use crate::series::{Map, RawSeries, Series, SparseSeries};
use heatmap_common::Result;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// Labeled subsets of the total, e.g. per-process or per-syscall observations.
pub type Elements = BTreeMap<String, RawSeries>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Selection {
    #[default]
    None,
    All,
    Labels(Vec<String>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecomposeConfig {
    pub bucket: BucketConfig,
    #[serde(default)]
    pub selection: Selection,
    /// Leave the total out of the rendered datasets.
    #[serde(default)]
    pub isolate: bool,
    /// Deduct the selected elements from the total without drawing them.
    #[serde(default)]
    pub exclude: bool,
    pub hue: f64,
    pub hue_step: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Decomposition {
    /// The total's remainder first (unless isolated), then one map per drawn element.
    pub datasets: Vec<Map>,
    pub hues: Vec<f64>,
    pub labels: Vec<String>,
    /// Max used for every dataset.
    pub max: f64,
    /// True when `datasets[0]` is the total's remainder.
    pub has_total: bool,
}

impl Decomposition {
    pub fn series(&self) -> Series {
        match self.datasets.as_slice() {
            [only] => Series::One(only.clone()),
            many => Series::Many(many.to_vec()),
        }
    }

    pub fn hue(&self) -> Hue {
        match self.hues.as_slice() {
            [only] => Hue::One(*only),
            many => Hue::Many(many.to_vec()),
        }
    }

    /// The total's remainder, unless it was isolated away.
    pub fn total(&self) -> Option<&Map> {
        if self.has_total { self.datasets.first() } else { None }
    }

    /// The map drawn for `label`, if it was drawn.
    pub fn element(&self, label: &str) -> Option<&Map> {
        let offset = usize::from(self.has_total);
        self.labels
            .iter()
            .position(|l| l == label)
            .map(|i| &self.datasets[i + offset])
    }
}

/// Splits the total into its remainder and the selected elements, giving each drawn
/// element the next hue around the wheel.
pub fn decompose(total: &RawSeries, elements: &Elements, conf: &DecomposeConfig) -> Result<Decomposition> {
    let mut bconf = conf.bucket.clone();
    let mut datasets = Vec::new();
    let mut hues = vec![conf.hue];
    let mut labels = Vec::new();

    // every map shares the max the first bucketization resolves
    let mut primary = if conf.isolate {
        None
    } else {
        let (map, max) = bucketize(total, &bconf)?;
        bconf.max = max;
        Some(map)
    };

    let selected: Vec<&str> = match &conf.selection {
        Selection::None => Vec::new(),
        Selection::All => elements.keys().map(String::as_str).collect(),
        Selection::Labels(names) => names.iter().map(String::as_str).collect(),
    };

    let mut seen = HashSet::new();
    let mut drawn = Vec::new();
    for label in selected {
        let Some(data) = elements.get(label) else {
            debug!(label, "unknown decomposition element");
            continue;
        };
        if !seen.insert(label) {
            continue;
        }
        let (map, max) = bucketize(data, &bconf)?;
        bconf.max = max;
        if let Some(primary) = primary.as_mut() {
            deduct(primary, &map)?;
        }
        if conf.exclude {
            continue;
        }
        drawn.push(map);
        labels.push(label.to_owned());
        let last = hues[hues.len() - 1];
        hues.push((last + conf.hue_step) % 360.0);
    }

    let has_total = primary.is_some();
    if let Some(primary) = primary {
        datasets.push(primary);
    } else {
        hues.remove(0);
    }
    datasets.extend(drawn);

    if datasets.is_empty() {
        datasets.push(vec![vec![0.0; bconf.nbuckets]; total.len()]);
        hues = vec![0.0];
    }
    debug!(datasets = datasets.len(), labels = labels.len(), "decomposed");
    Ok(Decomposition { datasets, hues, labels, max: bconf.max, has_total })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Details {
    pub sample: i64,
    pub min: i64,
    pub max: i64,
    pub total: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decomposition: Option<BTreeMap<String, i64>>,
}

/// Mass under pixel `(x, y)`: the total and each element present in that cell.
/// A dense `total` is taken to start at `geometry.base`.
pub fn details(x: usize, y: usize, geometry: &GeometryConfig, total: &RawSeries, elements: &Elements) -> Result<Details> {
    let sr = samplerange(x, y, geometry)?;
    let [min, max] = sr.range;
    if max < min {
        // bucket narrower than one integer value: nothing can land in it
        return Ok(Details { sample: sr.sample, min, max, total: 0, decomposition: None });
    }
    // one bucket covering the inclusive range
    let bconf = BucketConfig::with_range(1, min as f64, (max + 1) as f64);

    let cell = |series: &RawSeries| -> Result<Option<f64>> {
        let Some(sample) = series.sample_at(sr.sample, geometry.base) else {
            return Ok(None);
        };
        let mut one = SparseSeries::new(sr.sample, 1);
        one.insert(sr.sample, sample.clone());
        let (map, _) = bucketize(&one.into(), &bconf)?;
        Ok(Some(map[0][0]))
    };

    let mass = cell(total)?.unwrap_or(0.0).round() as i64;
    let mut decomposition = None;
    if mass != 0 {
        let mut parts = BTreeMap::new();
        for (label, data) in elements {
            match cell(data)? {
                Some(v) if v >= 1.0 => {
                    parts.insert(label.clone(), v.round() as i64);
                }
                _ => {}
            }
        }
        decomposition = Some(parts);
    }
    Ok(Details { sample: sr.sample, min, max, total: mass, decomposition })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::Observation as O;

    fn fixture() -> (RawSeries, Elements) {
        let total = RawSeries::Dense(vec![
            vec![O::new(0, 9, 10.0), O::new(10, 19, 20.0)],
            vec![O::new(0, 9, 4.0)],
        ]);
        let mut elements = Elements::new();
        elements.insert("a".into(), RawSeries::Dense(vec![vec![O::new(0, 9, 6.0)], vec![]]));
        elements.insert("b".into(), RawSeries::Dense(vec![vec![O::new(10, 19, 5.0)], vec![O::new(0, 9, 4.0)]]));
        (total, elements)
    }

    fn conf(selection: Selection) -> DecomposeConfig {
        DecomposeConfig {
            bucket: BucketConfig::with_range(2, 0.0, 20.0),
            selection,
            isolate: false,
            exclude: false,
            hue: 21.0,
            hue_step: 91.0,
        }
    }

    #[test]
    fn no_selection_is_total_alone() {
        let (total, elements) = fixture();
        let d = decompose(&total, &elements, &conf(Selection::None)).unwrap();
        assert_eq!(d.datasets, vec![vec![vec![10.0, 20.0], vec![4.0, 0.0]]]);
        assert_eq!(d.hue(), Hue::One(21.0));
        assert_eq!(d.total(), Some(&d.datasets[0]));
        assert!(matches!(d.series(), Series::One(_)));
    }

    #[test]
    fn selected_elements_are_deducted_and_rotated() {
        let (total, elements) = fixture();
        let sel = Selection::Labels(vec!["b".into(), "missing".into(), "a".into(), "b".into()]);
        let d = decompose(&total, &elements, &conf(sel)).unwrap();
        assert_eq!(d.labels, vec!["b", "a"]);
        assert_eq!(d.hues, vec![21.0, 112.0, 203.0]);
        assert_eq!(d.datasets[0], vec![vec![4.0, 15.0], vec![0.0, 0.0]]);
        assert_eq!(d.element("a"), Some(&vec![vec![6.0, 0.0], vec![0.0, 0.0]]));
    }

    #[test]
    fn hue_wraps_around() {
        let (total, elements) = fixture();
        let mut c = conf(Selection::All);
        c.hue = 300.0;
        let d = decompose(&total, &elements, &c).unwrap();
        assert_eq!(d.hues, vec![300.0, 31.0, 122.0]);
    }

    #[test]
    fn isolate_drops_total_and_its_hue() {
        let (total, elements) = fixture();
        let mut c = conf(Selection::All);
        c.isolate = true;
        let d = decompose(&total, &elements, &c).unwrap();
        assert!(!d.has_total);
        assert!(d.total().is_none());
        assert_eq!(d.datasets.len(), 2);
        assert_eq!(d.hues, vec![112.0, 203.0]);
        assert_eq!(d.element("b"), Some(&vec![vec![0.0, 5.0], vec![4.0, 0.0]]));
    }

    #[test]
    fn exclude_deducts_without_drawing() {
        let (total, elements) = fixture();
        let mut c = conf(Selection::Labels(vec!["a".into()]));
        c.exclude = true;
        let d = decompose(&total, &elements, &c).unwrap();
        assert_eq!(d.datasets, vec![vec![vec![4.0, 20.0], vec![4.0, 0.0]]]);
        assert!(d.labels.is_empty());
    }

    #[test]
    fn nothing_left_yields_blank_map() {
        let (total, elements) = fixture();
        let mut c = conf(Selection::None);
        c.isolate = true;
        let d = decompose(&total, &elements, &c).unwrap();
        assert_eq!(d.datasets, vec![vec![vec![0.0; 2]; 2]]);
        assert_eq!(d.hues, vec![0.0]);
    }

    #[test]
    fn details_reports_cell_mass() {
        let (total, elements) = fixture();
        let geometry = GeometryConfig { width: 20, height: 20, nbuckets: 2, nsamples: 2, min: 0.0, max: 20.0, base: 0 };
        // lower half of sample 0 is bucket 0, values [0, 9]
        let d = details(3, 15, &geometry, &total, &elements).unwrap();
        assert_eq!((d.sample, d.min, d.max, d.total), (0, 0, 9, 10));
        let parts = d.decomposition.unwrap();
        assert_eq!(parts.get("a"), Some(&6));
        assert!(!parts.contains_key("b"));

        let empty = details(15, 0, &geometry, &total, &elements).unwrap();
        assert_eq!(empty.total, 0);
        assert!(empty.decomposition.is_none());
    }

    #[test]
    fn details_of_sub_integer_bucket_is_empty() {
        let (total, elements) = fixture();
        // size 0.5: bucket 1 spans [0.5, 1.0) and rounds to the empty range [1, 0]
        let geometry = GeometryConfig { width: 10, height: 10, nbuckets: 10, nsamples: 1, min: 0.0, max: 5.0, base: 0 };
        let d = details(0, 8, &geometry, &total, &elements).unwrap();
        assert_eq!((d.sample, d.min, d.max, d.total), (0, 1, 0, 0));
        assert!(d.decomposition.is_none());
    }
}
