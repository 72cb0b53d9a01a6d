mod error;

pub use error::{Error, Result};

use std::io::Cursor;

use image::{
	DynamicImage, ImageDecoder, ImageFormat, ImageReader, RgbImage, codecs::jpeg::JpegEncoder,
	imageops::FilterType, metadata::Orientation,
};
use image_hasher::{HashAlg, HasherConfig, ImageHash};

use lnf_config::Imaging;

const ALLOWED_FORMATS: [ImageFormat; 3] =
	[ImageFormat::Jpeg, ImageFormat::Png, ImageFormat::WebP];
const HASH_SIZE: u32 = 8;

/// Everything derived from one upload, computed once and handed to the providers and storage.
#[derive(Debug, Clone)]
pub struct PreparedImage {
	pub source_format: ImageFormat,
	pub width: u32,
	pub height: u32,
	/// Oriented, RGB, size-capped JPEG sent to the inference providers.
	pub canonical_jpeg: Vec<u8>,
	pub thumbnail_small: Vec<u8>,
	pub thumbnail_large: Vec<u8>,
	/// Gradient hash, base64.
	pub phash: String,
	/// BLAKE3 hex digest of the original upload bytes.
	pub digest: String,
}

/// Cheap checks that do not decode pixel data: emptiness, size cap, and format allow-list.
pub fn validate(bytes: &[u8], cfg: &Imaging) -> Result<ImageFormat> {
	if bytes.is_empty() {
		return Err(Error::Empty);
	}

	let size = bytes.len() as u64;

	if size > cfg.max_upload_bytes {
		return Err(Error::TooLarge { size, max: cfg.max_upload_bytes });
	}

	let format = image::guess_format(bytes)
		.map_err(|_| Error::UnsupportedFormat { format: "unknown".to_string() })?;

	if !ALLOWED_FORMATS.contains(&format) {
		return Err(Error::UnsupportedFormat { format: format!("{format:?}").to_lowercase() });
	}

	Ok(format)
}

/// Decodes an upload into an upright RGB image no larger than `cfg.max_dimension` on either side.
pub fn decode(bytes: &[u8], cfg: &Imaging) -> Result<RgbImage> {
	validate(bytes, cfg)?;

	decode_upright(bytes, cfg.max_dimension)
}

pub fn prepare(bytes: &[u8], cfg: &Imaging) -> Result<PreparedImage> {
	let source_format = validate(bytes, cfg)?;
	let rgb = DynamicImage::ImageRgb8(decode_upright(bytes, cfg.max_dimension)?);
	let canonical_jpeg = encode_jpeg(&rgb, cfg.jpeg_quality)?;
	let thumbnail_small = encode_jpeg(&thumbnail(&rgb, cfg.thumbnail_small), cfg.jpeg_quality)?;
	let thumbnail_large = encode_jpeg(&thumbnail(&rgb, cfg.thumbnail_large), cfg.jpeg_quality)?;

	Ok(PreparedImage {
		source_format,
		width: rgb.width(),
		height: rgb.height(),
		canonical_jpeg,
		thumbnail_small,
		thumbnail_large,
		phash: perceptual_hash(&rgb),
		digest: blake3::hash(bytes).to_hex().to_string(),
	})
}

pub fn perceptual_hash(img: &DynamicImage) -> String {
	let hasher = HasherConfig::new()
		.hash_alg(HashAlg::Gradient)
		.hash_size(HASH_SIZE, HASH_SIZE)
		.to_hasher();

	hasher.hash_image(img).to_base64()
}

/// Similarity of two base64 perceptual hashes as `1 - hamming / bits`.
///
/// Malformed or differently sized hashes compare as `0.0`.
pub fn hash_similarity(a: &str, b: &str) -> f32 {
	let (Some(a), Some(b)) = (parse_hash(a), parse_hash(b)) else {
		return 0.0;
	};
	let bits = a.as_bytes().len() * 8;

	if bits == 0 || a.as_bytes().len() != b.as_bytes().len() {
		return 0.0;
	}

	1.0 - a.dist(&b) as f32 / bits as f32
}

fn parse_hash(encoded: &str) -> Option<ImageHash> {
	ImageHash::<Box<[u8]>>::from_base64(encoded).ok()
}

fn decode_upright(bytes: &[u8], max_dimension: u32) -> Result<RgbImage> {
	let reader = ImageReader::new(Cursor::new(bytes))
		.with_guessed_format()
		.map_err(|err| Error::Decode { source: image::ImageError::IoError(err) })?;
	let mut decoder = reader.into_decoder().map_err(|source| Error::Decode { source })?;
	let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);
	let mut img =
		DynamicImage::from_decoder(decoder).map_err(|source| Error::Decode { source })?;

	img.apply_orientation(orientation);

	Ok(cap_dimensions(DynamicImage::ImageRgb8(img.to_rgb8()), max_dimension).to_rgb8())
}

fn cap_dimensions(img: DynamicImage, max_dimension: u32) -> DynamicImage {
	if img.width() <= max_dimension && img.height() <= max_dimension {
		return img;
	}

	img.resize(max_dimension, max_dimension, FilterType::Lanczos3)
}

fn thumbnail(img: &DynamicImage, size: u32) -> DynamicImage {
	if img.width() <= size && img.height() <= size {
		return img.clone();
	}

	img.thumbnail(size, size)
}

fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
	let mut buf = Vec::new();

	img.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality))
		.map_err(|source| Error::Encode { source })?;

	Ok(buf)
}
