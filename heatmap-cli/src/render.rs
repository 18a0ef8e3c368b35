use heatmap_common::Config;
use heatmap_core::{
    decompose, generate, normalize, BucketConfig, DecomposeConfig, Decomposition, Elements,
    GenerateConfig, GeometryConfig, Normalization, PixelBuffer, RawSeries, Selection, StatsConfig,
};
use std::path::Path;

/// Options shared by every subcommand that bucketizes a series.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    pub nbuckets: Option<usize>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub base: Option<i64>,
    pub weighbyrange: bool,
    pub selection: Selection,
    pub isolate: bool,
    pub exclude: bool,
}

impl Pipeline {
    pub fn bucket_config(&self, config: &Config) -> BucketConfig {
        let mut conf = BucketConfig::from(&config.bucketing);
        if let Some(n) = self.nbuckets { conf.nbuckets = n; }
        if let Some(min) = self.min { conf.min = min; }
        if let Some(max) = self.max { conf.max = max; }
        conf.weighbyrange |= self.weighbyrange;
        conf
    }

    pub fn decompose(&self, total: &RawSeries, elements: &Elements, config: &Config) -> anyhow::Result<Decomposition> {
        let conf = DecomposeConfig {
            bucket: self.bucket_config(config),
            selection: self.selection.clone(),
            isolate: self.isolate,
            exclude: self.exclude,
            hue: config.render.hue,
            hue_step: config.render.hue_step,
        };
        decompose(total, elements, &conf).map_err(|e| anyhow::anyhow!("{e}"))
    }

    /// Re-anchors sparse input at `--base`, so labels and data share one window.
    pub fn window(&self, series: RawSeries) -> RawSeries {
        match (self.base, series) {
            (Some(base), RawSeries::Sparse(mut sparse)) => {
                sparse.base = base;
                RawSeries::Sparse(sparse)
            }
            (_, series) => series,
        }
    }

    /// First sample index: `--base`, else the sparse series' own base, else 0.
    pub fn base(&self, total: &RawSeries) -> i64 {
        match total {
            RawSeries::Sparse(sparse) => self.base.unwrap_or(sparse.base),
            RawSeries::Dense(_) => self.base.unwrap_or(0),
        }
    }

    pub fn stats_config(&self, decomp: &Decomposition, total: &RawSeries, config: &Config) -> StatsConfig {
        let bconf = self.bucket_config(config);
        StatsConfig::new(bconf.nbuckets, bconf.min, decomp.max, self.base(total))
    }

    /// Geometry of the image `render` would draw under the same flags.
    pub fn geometry(
        &self,
        total: &RawSeries,
        elements: &Elements,
        width: usize,
        height: usize,
        config: &Config,
    ) -> anyhow::Result<GeometryConfig> {
        let bconf = self.bucket_config(config);
        let decomp = self.decompose(total, elements, config)?;
        Ok(GeometryConfig {
            width,
            height,
            nbuckets: bconf.nbuckets,
            nsamples: total.len(),
            min: bconf.min,
            max: decomp.max,
            base: self.base(total),
        })
    }
}

pub fn normalization(linear: bool, config: &Config) -> anyhow::Result<Normalization> {
    if linear {
        return Ok(Normalization::Linear);
    }
    config.bucketing.normalization.parse().map_err(|e| anyhow::anyhow!("{e}"))
}

pub fn rasterize(
    decomp: &Decomposition,
    mode: Normalization,
    width: usize,
    height: usize,
    base: i64,
    config: &Config,
) -> anyhow::Result<PixelBuffer> {
    let mut series = decomp.series();
    normalize(&mut series, mode).map_err(|e| anyhow::anyhow!("{e}"))?;
    let conf = GenerateConfig {
        width,
        height,
        hue: decomp.hue(),
        saturation: config.render.saturation,
        value: config.render.value,
        base,
    };
    generate(&series, &conf).map_err(|e| anyhow::anyhow!("{e}"))
}

pub fn write_png(buf: PixelBuffer, path: &Path) -> anyhow::Result<()> {
    let (w, h) = (buf.width as u32, buf.height as u32);
    let img = image::RgbImage::from_raw(w, h, buf.rgb)
        .ok_or_else(|| anyhow::anyhow!("pixel buffer does not match {w}x{h}"))?;
    img.save_with_format(path, image::ImageFormat::Png)?;
    Ok(())
}
