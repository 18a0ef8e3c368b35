pub mod bucketize;
pub mod color;
pub mod decompose;
pub mod deduct;
pub mod export;
pub mod generate;
pub mod normalize;
pub mod query;
pub mod reader;
pub mod series;

pub use heatmap_common::{HeatmapError, Result};

pub use bucketize::{bucketize, BucketConfig};
pub use color::{hsv_to_rgb, BACKGROUND};
pub use decompose::{decompose, details, DecomposeConfig, Decomposition, Details, Elements, Selection};
pub use deduct::{deduct, deducted, DEDUCT_TOLERANCE};
pub use export::{export_json, print_summary, report, QueryReport};
pub use generate::{generate, GenerateConfig, Hue, PixelBuffer};
pub use normalize::{normalize, Normalization};
pub use query::{average, distribution, percentile, samplerange, GeometryConfig, SampleRange, StatsConfig};
pub use reader::{read_elements, read_series};
pub use series::{Map, Observation, Range, RawSeries, Sample, Series, SparseSeries};
