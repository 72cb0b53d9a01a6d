pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Image payload is empty.")]
	Empty,
	#[error("Image payload is {size} bytes; the limit is {max} bytes.")]
	TooLarge { size: u64, max: u64 },
	#[error("Unsupported image format: {format}.")]
	UnsupportedFormat { format: String },
	#[error("Failed to decode image: {source}")]
	Decode { source: image::ImageError },
	#[error("Failed to encode image: {source}")]
	Encode { source: image::ImageError },
}
