use std::io;

use thiserror::Error;

use crate::*;

pub type ScaffoldResult<T = ()> = Result<T, ScaffoldError>;

/// The kinds of errors that can occur during operations.
#[derive(Debug, Error)]
pub enum ScaffoldError {
	// I/O errors
	#[error("Could not create the dir `{path}`: {source}")]
	DirCreation { path: PathBuf, source: io::Error },

	#[error("Failed to create or write to the file `{path}`: {source}")]
	WriteError { path: PathBuf, source: io::Error },

	#[error("Could not read the contents of `{path}`: {source}")]
	ReadError { path: PathBuf, source: io::Error },

	#[error("Could not change the permissions of `{path}`: {source}")]
	PermissionsError { path: PathBuf, source: io::Error },

	// Invalid values
	#[error(
		"Multiple conflicting types required for config value: {key}\nType required is '{requested}' but previously used value was: {value} ({previous})"
	)]
	ConflictingConfigType {
		key: String,
		requested: ConfigKind,
		previous: String,
		value: String,
	},

	#[error("The existing file `{path}` is malformed: {reason}")]
	MalformedExistingFile { path: PathBuf, reason: String },

	#[error("No package.json found in `{dir}`")]
	MissingPackageManifest { dir: PathBuf },

	#[error("Preset `{name}` not found")]
	PresetNotFound { name: String },

	#[error("Could not get a value for the config option `{key}`: {reason}")]
	PromptUnavailable { key: String, reason: String },

	#[error("Shell command `{command}` failed: {reason}")]
	CommandFailed { command: String, reason: String },

	#[error(transparent)]
	Manifest(#[from] ManifestError),

	// Serde errors
	#[error("Error while serializing the content for `{file}`: {error}")]
	SerializationError { file: PathBuf, error: String },

	#[error(transparent)]
	Other(#[from] anyhow::Error),
}

impl ScaffoldError {
	pub(crate) fn malformed(path: impl Into<PathBuf>, error: impl Display) -> Self {
		Self::MalformedExistingFile {
			path: path.into(),
			reason: error.to_string(),
		}
	}
}
