pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Storage(#[from] lnf_storage::Error),
	#[error(transparent)]
	Provider(#[from] lnf_providers::Error),
}
