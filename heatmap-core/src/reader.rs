use crate::decompose::Elements;
use crate::series::RawSeries;
use heatmap_common::Result;
use std::io::BufReader;
use std::path::Path;

/// Reads a series file: a JSON array of samples, or `{base, nsamples, samples}`.
pub fn read_series(path: &Path) -> Result<RawSeries> {
    let file = std::fs::File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

/// Reads a `{"label": <series>, ...}` file of decomposition elements.
pub fn read_elements(path: &Path) -> Result<Elements> {
    let file = std::fs::File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}
