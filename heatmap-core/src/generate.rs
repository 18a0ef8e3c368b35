use crate::color::{hsv_to_rgb, BACKGROUND};
use crate::series::Series;
use heatmap_common::{HeatmapError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One hue for a single map, one per map when several are co-rendered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Hue {
    One(f64),
    Many(Vec<f64>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateConfig {
    pub width: usize,
    pub height: usize,
    pub hue: Hue,
    /// Saturation at the lowest and highest normalized value.
    pub saturation: [f64; 2],
    pub value: f64,
    /// Absolute index of the first sample; keeps column widths stable as the window slides.
    #[serde(default)]
    pub base: i64,
}

impl GenerateConfig {
    fn validate(&self, series: &Series) -> Result<()> {
        if self.width == 0 {
            return Err(HeatmapError::config("width", "must be greater than zero"));
        }
        if self.height == 0 {
            return Err(HeatmapError::config("height", "must be greater than zero"));
        }
        let [s0, s1] = self.saturation;
        if !(0.0..=1.0).contains(&s0) || !(0.0..=1.0).contains(&s1) || s0 >= s1 {
            return Err(HeatmapError::config("saturation", format!("need 0 <= s0 < s1 <= 1, got [{s0}, {s1}]")));
        }
        if !(0.0..=1.0).contains(&self.value) {
            return Err(HeatmapError::Domain { component: "value", value: self.value });
        }
        match (&self.hue, series) {
            (Hue::One(_), Series::One(_)) => {}
            (Hue::Many(hues), Series::Many(maps)) if hues.len() == maps.len() => {}
            (Hue::Many(hues), Series::Many(maps)) => {
                return Err(HeatmapError::config("hue", format!("{} hues for {} maps", hues.len(), maps.len())));
            }
            _ => return Err(HeatmapError::config("hue", "hue and series must both be single or both be lists")),
        }
        for &h in self.hues() {
            if !(0.0..=360.0).contains(&h) {
                return Err(HeatmapError::Domain { component: "hue", value: h });
            }
        }
        Ok(())
    }

    fn hues(&self) -> &[f64] {
        match &self.hue {
            Hue::One(h) => std::slice::from_ref(h),
            Hue::Many(hs) => hs,
        }
    }

    fn color(&self, hue: f64, v: f64) -> Result<[u8; 3]> {
        if v == 0.0 {
            return Ok(BACKGROUND);
        }
        let [s0, s1] = self.saturation;
        hsv_to_rgb(hue, s0 + v * (s1 - s0), self.value)
    }
}

/// Raw RGB pixels, row-major, three bytes per pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    pub width: usize,
    pub height: usize,
    pub rgb: Vec<u8>,
}

impl PixelBuffer {
    fn filled(width: usize, height: usize, color: [u8; 3]) -> Self {
        Self { width, height, rgb: color.repeat(width * height) }
    }

    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        let offs = (y * self.width + x) * 3;
        [self.rgb[offs], self.rgb[offs + 1], self.rgb[offs + 2]]
    }

    fn fill(&mut self, rows: std::ops::Range<usize>, cols: std::ops::Range<usize>, color: [u8; 3]) {
        for h in rows {
            let start = (h * self.width + cols.start) * 3;
            let end = (h * self.width + cols.end) * 3;
            for px in self.rgb[start..end].chunks_exact_mut(3) {
                px.copy_from_slice(&color);
            }
        }
    }
}

/// Rasterizes normalized map(s) into a pixel buffer, one box per (sample, bucket) cell.
/// Bucket 0 sits at the bottom. Overlaid maps blend by each one's share of the cell total.
pub fn generate(series: &Series, conf: &GenerateConfig) -> Result<PixelBuffer> {
    conf.validate(series)?;
    let (nsamples, nbuckets) = series.shape()?;
    let mut buf = PixelBuffer::filled(conf.width, conf.height, BACKGROUND);
    if nsamples == 0 || nbuckets == 0 {
        return Ok(buf);
    }

    let maps = series.maps();
    let hues = conf.hues();
    let bheight = conf.height as f64 / nbuckets as f64;
    let bwidth = conf.width as f64 / nsamples as f64;
    let origin = (conf.base as f64 * bwidth).floor();
    debug!(nsamples, nbuckets, bwidth, bheight, layers = maps.len(), "rasterizing");

    for i in 0..nsamples {
        let column = conf.base as f64 + i as f64;
        let wbase = to_pixel((column * bwidth).floor() - origin, conf.width);
        let wlimit = to_pixel(((column + 1.0) * bwidth).floor() - origin, conf.width);

        for j in 0..nbuckets {
            let jh = (nbuckets - j - 1) as f64;
            let hbase = to_pixel((jh * bheight).floor(), conf.height);
            let hlimit = to_pixel(((jh + 1.0) * bheight).floor(), conf.height);

            let rgb = if maps.len() == 1 {
                conf.color(hues[0], maps[0][i][j])?
            } else {
                blend(conf, maps.iter().map(|m| m[i][j]), hues)?
            };
            buf.fill(hbase..hlimit, wbase..wlimit, rgb);
        }
    }
    Ok(buf)
}

fn blend(conf: &GenerateConfig, values: impl Iterator<Item = f64> + Clone, hues: &[f64]) -> Result<[u8; 3]> {
    let total: f64 = values.clone().sum();
    if total == 0.0 {
        return Ok(BACKGROUND);
    }
    let mut acc = [0.0f64; 3];
    for (v, &hue) in values.zip(hues) {
        let c = conf.color(hue, v)?;
        let ratio = v / total;
        for (a, ch) in acc.iter_mut().zip(c) {
            *a += ch as f64 * ratio;
        }
    }
    Ok(acc.map(|a| a as u8))
}

fn to_pixel(x: f64, limit: usize) -> usize {
    (x.max(0.0) as usize).min(limit)
}
