use heatmap_common::{HeatmapError, Result};
use serde::de::value::{MapAccessDeserializer, SeqAccessDeserializer};
use serde::de::{MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

/// Closed integer interval `[low, high]`. Serialized as `[low, high]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[i64; 2]", into = "[i64; 2]")]
pub struct Range {
    pub low: i64,
    pub high: i64,
}

impl Range {
    pub fn new(low: i64, high: i64) -> Self {
        Self { low, high }
    }

    pub fn midpoint(&self) -> f64 {
        self.low as f64 + (self.high - self.low) as f64 / 2.0
    }
}

impl From<[i64; 2]> for Range {
    fn from([low, high]: [i64; 2]) -> Self {
        Self { low, high }
    }
}

impl From<Range> for [i64; 2] {
    fn from(r: Range) -> Self {
        [r.low, r.high]
    }
}

/// One `(range, value)` pair. Serialized as `[[low, high], value]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(Range, f64)", into = "(Range, f64)")]
pub struct Observation {
    pub range: Range,
    pub value: f64,
}

impl Observation {
    pub fn new(low: i64, high: i64, value: f64) -> Self {
        Self { range: Range::new(low, high), value }
    }
}

impl From<(Range, f64)> for Observation {
    fn from((range, value): (Range, f64)) -> Self {
        Self { range, value }
    }
}

impl From<Observation> for (Range, f64) {
    fn from(o: Observation) -> Self {
        (o.range, o.value)
    }
}

pub type Sample = Vec<Observation>;

/// Samples keyed by absolute index; `base .. base + nsamples` is the window materialized.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SparseSeries {
    pub base: i64,
    pub nsamples: usize,
    #[serde(rename = "samples", default)]
    pub entries: BTreeMap<i64, Sample>,
}

impl SparseSeries {
    pub fn new(base: i64, nsamples: usize) -> Self {
        Self { base, nsamples, entries: BTreeMap::new() }
    }

    pub fn insert(&mut self, index: i64, sample: Sample) {
        self.entries.insert(index, sample);
    }

    pub fn to_dense(&self) -> Vec<Sample> {
        (0..self.nsamples as i64)
            .map(|i| self.entries.get(&(self.base + i)).cloned().unwrap_or_default())
            .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum RawSeries {
    Dense(Vec<Sample>),
    Sparse(SparseSeries),
}

// serde's untagged buffering turns integer map keys into strings, so dispatch on the
// JSON shape by hand and let the sparse entries see the untouched map.
impl<'de> Deserialize<'de> for RawSeries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct RawSeriesVisitor;

        impl<'de> Visitor<'de> for RawSeriesVisitor {
            type Value = RawSeries;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an array of samples or a {base, nsamples, samples} object")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, seq: A) -> std::result::Result<RawSeries, A::Error> {
                Vec::<Sample>::deserialize(SeqAccessDeserializer::new(seq)).map(RawSeries::Dense)
            }

            fn visit_map<A: MapAccess<'de>>(self, map: A) -> std::result::Result<RawSeries, A::Error> {
                SparseSeries::deserialize(MapAccessDeserializer::new(map)).map(RawSeries::Sparse)
            }
        }

        deserializer.deserialize_any(RawSeriesVisitor)
    }
}

impl RawSeries {
    pub fn samples(&self) -> Cow<'_, [Sample]> {
        match self {
            RawSeries::Dense(samples) => Cow::Borrowed(samples.as_slice()),
            RawSeries::Sparse(sparse) => Cow::Owned(sparse.to_dense()),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            RawSeries::Dense(samples) => samples.len(),
            RawSeries::Sparse(sparse) => sparse.nsamples,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Observations of absolute sample `index`. A dense series starts at `dense_base`.
    pub fn sample_at(&self, index: i64, dense_base: i64) -> Option<&Sample> {
        match self {
            RawSeries::Dense(samples) => usize::try_from(index - dense_base)
                .ok()
                .and_then(|i| samples.get(i)),
            RawSeries::Sparse(sparse) => sparse.entries.get(&index),
        }
    }
}

impl From<Vec<Sample>> for RawSeries {
    fn from(samples: Vec<Sample>) -> Self {
        RawSeries::Dense(samples)
    }
}

impl From<SparseSeries> for RawSeries {
    fn from(sparse: SparseSeries) -> Self {
        RawSeries::Sparse(sparse)
    }
}

/// Samples × buckets.
pub type Map = Vec<Vec<f64>>;

/// One map, or several co-rendered maps of identical shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Series {
    One(Map),
    Many(Vec<Map>),
}

impl Series {
    pub fn maps(&self) -> &[Map] {
        match self {
            Series::One(map) => std::slice::from_ref(map),
            Series::Many(maps) => maps,
        }
    }

    pub fn maps_mut(&mut self) -> &mut [Map] {
        match self {
            Series::One(map) => std::slice::from_mut(map),
            Series::Many(maps) => maps,
        }
    }

    /// `(nsamples, nbuckets)` shared by every map, or `InvalidShape`.
    pub fn shape(&self) -> Result<(usize, usize)> {
        let maps = self.maps();
        let Some(first) = maps.first() else {
            return Err(HeatmapError::InvalidShape("no maps given".into()));
        };
        let nsamples = first.len();
        let nbuckets = first.first().map_or(0, |row| row.len());
        for (m, map) in maps.iter().enumerate() {
            if map.len() != nsamples {
                return Err(HeatmapError::InvalidShape(format!(
                    "map {m} has {} samples, expected {nsamples}",
                    map.len()
                )));
            }
            check_rows(map, nbuckets).map_err(|e| match e {
                HeatmapError::InvalidShape(msg) => HeatmapError::InvalidShape(format!("map {m}: {msg}")),
                other => other,
            })?;
        }
        Ok((nsamples, nbuckets))
    }
}

/// Every row of `map` must hold exactly `nbuckets` values.
pub fn check_rows(map: &Map, nbuckets: usize) -> Result<()> {
    match map.iter().position(|row| row.len() != nbuckets) {
        Some(i) => Err(HeatmapError::InvalidShape(format!(
            "sample {i} has {} buckets, expected {nbuckets}",
            map[i].len()
        ))),
        None => Ok(()),
    }
}
