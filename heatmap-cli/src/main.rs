mod render;

use clap::{Args, CommandFactory, Parser, Subcommand};
use heatmap_common::Config;
use heatmap_core::{
    average, details, distribution, export_json, percentile, print_summary, read_elements, read_series, report,
    Elements, RawSeries, Selection,
};
use render::{normalization, rasterize, write_png, Pipeline};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

fn parse_fraction(s: &str) -> Result<f64, String> { // validate percentile at CLI parse time
    let v: f64 = s.parse().map_err(|_| format!("not a float: {s}"))?;
    if (0.0..=1.0).contains(&v) { Ok(v) } else { Err(format!("percentile must be in [0.0, 1.0], got {v}")) }
}

#[derive(Parser)]
#[command(name = "heatmap", version, about = "Render bucketized time-series heatmaps")]
struct Cli {
    /// Log pipeline decisions to stderr (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct SeriesArgs {
    /// JSON series: an array of samples or {base, nsamples, samples}
    path: PathBuf,
    #[arg(long)] nbuckets: Option<usize>,
    #[arg(long)] min: Option<f64>,
    #[arg(long)] max: Option<f64>,
    /// Absolute index of the first sample
    #[arg(long)] base: Option<i64>,
    #[arg(long)] weigh_by_range: bool,
    /// JSON object of labeled sub-series
    #[arg(long)] decomposed: Option<PathBuf>,
    #[arg(long, value_delimiter = ',')] select: Option<Vec<String>>,
    /// Select every decomposition element
    #[arg(long, conflicts_with = "select")] all: bool,
    #[arg(long)] isolate: bool,
    #[arg(long)] exclude: bool,
}

impl SeriesArgs {
    fn pipeline(&self) -> Pipeline {
        let selection = match (&self.select, self.all) {
            (_, true) => Selection::All,
            (Some(labels), false) => Selection::Labels(labels.clone()),
            (None, false) => Selection::None,
        };
        Pipeline {
            nbuckets: self.nbuckets,
            min: self.min,
            max: self.max,
            base: self.base,
            weighbyrange: self.weigh_by_range,
            selection,
            isolate: self.isolate,
            exclude: self.exclude,
        }
    }

    fn load(&self) -> anyhow::Result<(RawSeries, Elements)> {
        let pipeline = self.pipeline();
        let total = read_series(&self.path).map_err(|e| anyhow::anyhow!("{}: {e}", self.path.display()))?;
        let elements = match &self.decomposed {
            Some(p) => read_elements(p).map_err(|e| anyhow::anyhow!("{}: {e}", p.display()))?,
            None => Elements::new(),
        };
        let elements: Elements = elements.into_iter().map(|(label, s)| (label, pipeline.window(s))).collect();
        Ok((pipeline.window(total), elements))
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Render the series as a PNG heatmap
    Render {
        #[command(flatten)] series: SeriesArgs,
        #[arg(long)] output: Option<PathBuf>,
        #[arg(long)] width: Option<usize>,
        #[arg(long)] height: Option<usize>,
        /// Scale by the largest value instead of by rank
        #[arg(long)] linear: bool,
    },
    /// Value at a cumulative fraction per sample
    Percentile {
        #[command(flatten)] series: SeriesArgs,
        #[arg(long, short, value_parser = parse_fraction)] p: Option<f64>,
        #[arg(long)] output: Option<PathBuf>,
    },
    /// Weighted mean value per sample
    Average {
        #[command(flatten)] series: SeriesArgs,
        #[arg(long)] output: Option<PathBuf>,
    },
    /// Total per bucket across all samples
    Distribution {
        #[command(flatten)] series: SeriesArgs,
        #[arg(long)] output: Option<PathBuf>,
    },
    /// Sample, value range and mass under one pixel
    Details {
        #[command(flatten)] series: SeriesArgs,
        #[arg(long)] x: usize,
        #[arg(long)] y: usize,
        #[arg(long)] width: Option<usize>,
        #[arg(long)] height: Option<usize>,
    },
    /// Print shape and mass of the bucketized series
    Summary { #[command(flatten)] series: SeriesArgs },
    /// Print the effective configuration
    Config { #[arg(long)] save: bool },
    /// Generate shell completions
    Completions { shell: clap_complete::Shell },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = Config::load().unwrap_or_else(|e| {
        tracing::warn!("ignoring config: {e}");
        Config::default()
    });
    match cli.command {
        Commands::Render { series, output, width, height, linear } => run_render(&series, output, width, height, linear, &config)?,
        Commands::Percentile { series, p, output } => {
            let p = p.unwrap_or(config.query.percentile);
            run_query(&series, output, &config, |m, c| percentile(m, c, p))?
        }
        Commands::Average { series, output } => run_query(&series, output, &config, average)?,
        Commands::Distribution { series, output } => run_query(&series, output, &config, distribution)?,
        Commands::Details { series, x, y, width, height } => run_details(&series, x, y, width, height, &config)?,
        Commands::Summary { series } => run_summary(&series, &config)?,
        Commands::Config { save } => run_config(save, &config)?,
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "heatmap", &mut std::io::stdout());
        }
    }
    Ok(())
}

fn run_render(
    args: &SeriesArgs,
    output: Option<PathBuf>,
    width: Option<usize>,
    height: Option<usize>,
    linear: bool,
    config: &Config,
) -> anyhow::Result<()> {
    let (total, elements) = args.load()?;
    if total.is_empty() { anyhow::bail!("no samples in {}", args.path.display()); }
    let pipeline = args.pipeline();
    let decomp = pipeline.decompose(&total, &elements, config)?;
    let mode = normalization(linear, config)?;
    let width = width.unwrap_or(config.render.width);
    let height = height.unwrap_or(config.render.height);
    let buf = rasterize(&decomp, mode, width, height, pipeline.base(&total), config)?;
    let out_path = output.unwrap_or_else(|| Path::new(&config.export.output_dir).join("heatmap.png"));
    if let Some(parent) = out_path.parent() {
        if !parent.as_os_str().is_empty() { std::fs::create_dir_all(parent)?; }
    }
    write_png(buf, &out_path)?;
    println!("Rendered {} layer(s) to {}", decomp.datasets.len(), out_path.display());
    Ok(())
}

fn run_query<T, F>(args: &SeriesArgs, output: Option<PathBuf>, config: &Config, query: F) -> anyhow::Result<()>
where
    T: Serialize,
    F: Fn(&heatmap_core::Map, &heatmap_core::StatsConfig) -> heatmap_core::Result<T>,
{
    let (total, elements) = args.load()?;
    let pipeline = args.pipeline();
    let decomp = pipeline.decompose(&total, &elements, config)?;
    let stats = pipeline.stats_config(&decomp, &total, config);
    let doc = report(&decomp, &stats, query).map_err(|e| anyhow::anyhow!("{e}"))?;
    emit(&doc, output)
}

fn run_details(
    args: &SeriesArgs,
    x: usize,
    y: usize,
    width: Option<usize>,
    height: Option<usize>,
    config: &Config,
) -> anyhow::Result<()> {
    let (total, elements) = args.load()?;
    let width = width.unwrap_or(config.render.width);
    let height = height.unwrap_or(config.render.height);
    if x >= width || y >= height { anyhow::bail!("pixel ({x}, {y}) is outside {width}x{height}"); }
    let geometry = args.pipeline().geometry(&total, &elements, width, height, config)?;
    let d = details(x, y, &geometry, &total, &elements).map_err(|e| anyhow::anyhow!("{e}"))?;
    emit(&d, None)
}

fn run_summary(args: &SeriesArgs, config: &Config) -> anyhow::Result<()> {
    let (total, elements) = args.load()?;
    let pipeline = args.pipeline();
    let decomp = pipeline.decompose(&total, &elements, config)?;
    match decomp.total() {
        Some(map) => print_summary(map, decomp.max),
        None => println!("{:<16} {}", "Total:", "isolated"),
    }
    for label in &decomp.labels {
        if let Some(map) = decomp.element(label) {
            println!("{:<16} {:.2}", format!("{label}:"), map.iter().flatten().sum::<f64>());
        }
    }
    Ok(())
}

fn run_config(save: bool, config: &Config) -> anyhow::Result<()> {
    print!("{}", config.to_toml().map_err(|e| anyhow::anyhow!("{e}"))?);
    if save {
        config.save().map_err(|e| anyhow::anyhow!("{e}"))?;
        println!("# saved to {}", Config::config_path().display());
    }
    Ok(())
}

fn emit<T: Serialize>(doc: &T, output: Option<PathBuf>) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            export_json(&path, doc).map_err(|e| anyhow::anyhow!("{e}"))?;
            println!("Exported to {}", path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(doc)?),
    }
    Ok(())
}
