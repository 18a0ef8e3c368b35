use crate::decompose::Decomposition;
use crate::query::StatsConfig;
use crate::series::Map;
use heatmap_common::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Query output: the total's rows first, then one entry per drawn element.
#[derive(Debug, Clone, Serialize)]
pub struct QueryReport<T: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<T>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub decomposition: BTreeMap<String, T>,
}

/// Runs `query` over every dataset of `decomp`, keeping the total apart from the elements.
pub fn report<T, F>(decomp: &Decomposition, conf: &StatsConfig, query: F) -> Result<QueryReport<T>>
where
    T: Serialize,
    F: Fn(&Map, &StatsConfig) -> Result<T>,
{
    let total = decomp.total().map(|m| query(m, conf)).transpose()?;
    let mut decomposition = BTreeMap::new();
    for label in &decomp.labels {
        if let Some(map) = decomp.element(label) {
            decomposition.insert(label.clone(), query(map, conf)?);
        }
    }
    Ok(QueryReport { total, decomposition })
}

pub fn export_json<T: Serialize>(output_path: &Path, doc: &T) -> Result<()> {
    let mut file = std::fs::File::create(output_path)?;
    serde_json::to_writer_pretty(&mut file, doc)?;
    Ok(())
}

pub fn print_summary(map: &Map, max: f64) {
    let nbuckets = map.first().map_or(0, Vec::len);
    let mass: f64 = map.iter().flatten().sum();
    let busiest = map
        .iter()
        .map(|row| row.iter().sum::<f64>())
        .fold(0.0, f64::max);
    println!("{:<16} {}", "Samples:", map.len());
    println!("{:<16} {}", "Buckets:", nbuckets);
    println!("{:<16} {}", "Max:", max);
    println!("{:<16} {:.2}", "Total mass:", mass);
    println!("{:<16} {:.2}", "Busiest sample:", busiest);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::average;

    fn decomp(has_total: bool) -> Decomposition {
        let datasets = vec![vec![vec![1.0, 1.0]], vec![vec![0.0, 2.0]]];
        let (hues, labels) = if has_total {
            (vec![21.0, 112.0], vec!["x".to_string()])
        } else {
            (vec![21.0, 112.0], vec!["x".to_string(), "y".to_string()])
        };
        Decomposition { datasets, hues, labels, max: 20.0, has_total }
    }

    #[test]
    fn report_splits_total_from_elements() {
        let conf = StatsConfig::new(2, 0.0, 20.0, 0);
        let r = report(&decomp(true), &conf, average).unwrap();
        assert_eq!(r.total, Some(vec![(0, 10.0)]));
        assert_eq!(r.decomposition.get("x"), Some(&vec![(0, 15.0)]));

        let r = report(&decomp(false), &conf, average).unwrap();
        assert!(r.total.is_none());
        assert_eq!(r.decomposition.len(), 2);
    }

    #[test]
    fn report_keys_elements_by_label() {
        let conf = StatsConfig::new(2, 0.0, 20.0, 0);
        let r = report(&decomp(false), &conf, average).unwrap();
        let json = serde_json::to_value(&r).unwrap();
        assert!(json.get("total").is_none());
        assert_eq!(json["decomposition"]["x"], serde_json::json!([[0, 10.0]]));
        assert_eq!(json["decomposition"]["y"], serde_json::json!([[0, 15.0]]));
    }

    #[test]
    fn export_writes_pretty_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        export_json(&path, &vec![(0, 1.5)]).unwrap();
        let back: Vec<(i64, f64)> = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back, vec![(0, 1.5)]);
    }
}
