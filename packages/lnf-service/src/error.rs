pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Invalid image: {message}")]
	InvalidImage { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
}
impl From<sqlx::Error> for Error {
	fn from(err: sqlx::Error) -> Self {
		Self::Storage { message: err.to_string() }
	}
}

impl From<lnf_storage::Error> for Error {
	fn from(err: lnf_storage::Error) -> Self {
		match err {
			lnf_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			lnf_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			lnf_storage::Error::NotFound(message) => Self::NotFound { message },
		}
	}
}

impl From<lnf_imaging::Error> for Error {
	fn from(err: lnf_imaging::Error) -> Self {
		Self::InvalidImage { message: err.to_string() }
	}
}
