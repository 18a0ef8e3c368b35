use crate::series::Map;
use heatmap_common::{HeatmapError, Result};
use tracing::warn;

/// Slack allowed for float drift between independently bucketized maps.
pub const DEDUCT_TOLERANCE: f64 = 0.5;

/// Subtracts `sub` from `total` cell by cell, in place. Nothing is modified on error.
pub fn deduct(total: &mut Map, sub: &Map) -> Result<()> {
    if total.len() != sub.len() {
        return Err(HeatmapError::InvalidShape(format!(
            "deducting {} samples from {}",
            sub.len(),
            total.len()
        )));
    }
    for (i, (t, d)) in total.iter().zip(sub).enumerate() {
        if t.len() != d.len() {
            return Err(HeatmapError::InvalidShape(format!(
                "sample {i}: deducting {} buckets from {}",
                d.len(),
                t.len()
            )));
        }
        if let Some(j) = t.iter().zip(d).position(|(tv, dv)| *tv < dv - DEDUCT_TOLERANCE) {
            return Err(HeatmapError::DeductionUnderflow {
                sample: i,
                bucket: j,
                total: t[j],
                deduct: d[j],
            });
        }
    }

    let mut clamped = 0usize;
    for (t, d) in total.iter_mut().zip(sub) {
        for (tv, dv) in t.iter_mut().zip(d) {
            *tv -= dv;
            if *tv < 0.0 {
                *tv = 0.0;
                clamped += 1;
            }
        }
    }
    if clamped > 0 {
        warn!(clamped, "deduction left negative cells; clamped to zero");
    }
    Ok(())
}

/// Like [`deduct`], leaving `total` untouched.
pub fn deducted(total: &Map, sub: &Map) -> Result<Map> {
    let mut out = total.clone();
    deduct(&mut out, sub)?;
    Ok(out)
}
