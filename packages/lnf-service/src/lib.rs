pub mod inference;
pub mod process;
pub mod rematch;
pub mod submit;

mod error;

pub use error::{Error, Result};
pub use inference::{DegradeReason, Inference, StageStatus};
pub use process::{ProcessingResult, Thumbnails};
pub use rematch::{RematchReport, RematchResult};
pub use submit::{MatchSummary, SubmitItemRequest, SubmitItemResponse};

use std::{future::Future, pin::Pin, sync::Arc};

use lnf_config::{Config, FeatureExtractorConfig, ObjectDetectorConfig};
use lnf_domain::detection::RawDetection;
use lnf_providers::{detector, extractor};
use lnf_storage::db::Db;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait FeatureExtractor
where
	Self: Send + Sync,
{
	fn extract<'a>(
		&'a self,
		cfg: &'a FeatureExtractorConfig,
		jpeg: &'a [u8],
	) -> BoxFuture<'a, lnf_providers::Result<Vec<f32>>>;
}

pub trait ObjectDetector
where
	Self: Send + Sync,
{
	fn detect<'a>(
		&'a self,
		cfg: &'a ObjectDetectorConfig,
		jpeg: &'a [u8],
	) -> BoxFuture<'a, lnf_providers::Result<Vec<RawDetection>>>;
}

#[derive(Clone)]
pub struct Providers {
	pub extractor: Arc<dyn FeatureExtractor>,
	pub detector: Arc<dyn ObjectDetector>,
}
impl Providers {
	pub fn new(extractor: Arc<dyn FeatureExtractor>, detector: Arc<dyn ObjectDetector>) -> Self {
		Self { extractor, detector }
	}
}

impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self { extractor: provider.clone(), detector: provider }
	}
}

pub struct LnfService {
	pub cfg: Config,
	pub db: Db,
	pub providers: Providers,
}
impl LnfService {
	pub fn new(cfg: Config, db: Db) -> Self {
		Self { cfg, db, providers: Providers::default() }
	}

	pub fn with_providers(cfg: Config, db: Db, providers: Providers) -> Self {
		Self { cfg, db, providers }
	}
}

struct DefaultProviders;
impl FeatureExtractor for DefaultProviders {
	fn extract<'a>(
		&'a self,
		cfg: &'a FeatureExtractorConfig,
		jpeg: &'a [u8],
	) -> BoxFuture<'a, lnf_providers::Result<Vec<f32>>> {
		Box::pin(extractor::extract(cfg, jpeg))
	}
}

impl ObjectDetector for DefaultProviders {
	fn detect<'a>(
		&'a self,
		cfg: &'a ObjectDetectorConfig,
		jpeg: &'a [u8],
	) -> BoxFuture<'a, lnf_providers::Result<Vec<RawDetection>>> {
		Box::pin(detector::detect(cfg, jpeg))
	}
}
