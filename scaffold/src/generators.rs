use serde::Serialize;

use crate::*;

mod changesets;
mod common;
mod eslint;
mod github;
mod jest;
mod manifest;
mod typescript;

pub use changesets::*;
pub use common::*;
pub use eslint::*;
pub use github::*;
pub use jest::*;
pub use manifest::*;
pub use typescript::*;

pub(crate) fn to_json_string(file: &str, value: &impl Serialize) -> ScaffoldResult<String> {
	serde_json::to_string_pretty(value).map_err(|e| ScaffoldError::SerializationError {
		file: file.into(),
		error: e.to_string(),
	})
}

pub(crate) fn to_json_value(file: &str, value: &impl Serialize) -> ScaffoldResult<Value> {
	serde_json::to_value(value).map_err(|e| ScaffoldError::SerializationError {
		file: file.into(),
		error: e.to_string(),
	})
}

/// Parses the existing version of a JSON file, failing if it is not an object.
pub(crate) fn existing_json_object(path: &str, contents: Option<&str>) -> ScaffoldResult<Map<String, Value>> {
	let Some(contents) = contents else {
		return Ok(Map::new());
	};

	match Jsonc.deserialize(contents) {
		Ok(Value::Object(map)) => Ok(map),
		Ok(_) => Err(ScaffoldError::malformed(path, "expected a JSON object")),
		Err(e) => Err(ScaffoldError::malformed(path, e)),
	}
}

/// Merges `defaults` into the existing text of a JSON file, keeping its formatting and comments.
pub(crate) fn merge_json_file(
	path: &str,
	existing: Option<&str>,
	defaults: Map<String, Value>,
	overwrite: bool,
) -> ScaffoldResult<String> {
	merge_json(existing, defaults, overwrite).map_err(|e| map_format_error(path, e))
}

pub(crate) fn map_format_error(path: &str, error: FormatError) -> ScaffoldError {
	match error {
		FormatError::Serialization { .. } => ScaffoldError::SerializationError {
			file: path.into(),
			error: error.to_string(),
		},
		_ => ScaffoldError::malformed(path, error),
	}
}

#[cfg(test)]
pub(crate) mod test_utils {
	use super::*;

	/// Builds the variables of a run on an in-memory project, answering prompts with the seeds or the defaults.
	pub(crate) fn test_vars(fs: MemoryFs, seeds: Value) -> Vars {
		let fs: Arc<dyn ProjectFs> = Arc::new(fs);
		let seeds: Vec<(String, Value)> = match seeds {
			Value::Object(map) => map.into_iter().collect(),
			_ => Vec::new(),
		};

		Vars {
			config: Arc::new(ConfigStore::new(
				fs.clone(),
				Arc::new(StandardFormatter),
				Arc::new(SeededPrompter::new(seeds, Arc::new(DefaultsPrompter))),
			)),
			preset_manifest: PresetManifest::default(),
			package_manifest: Value::Object(Map::new()),
			dev_dependencies: StringBTreeMap::new(),
			project_name: fs
				.root()
				.file_name()
				.map_or_else(String::new, |name| name.to_string_lossy().to_string()),
			fs,
		}
	}

	/// Resolves the contents of the generated file with the given path.
	pub(crate) fn contents_of(files: Vec<VirtualFile>, path: &str, contents_vars: &ContentsVars) -> ScaffoldResult<Option<String>> {
		files
			.into_iter()
			.find(|file| file.path.join("/") == path)
			.map(|file| file.contents.resolve(contents_vars))
			.transpose()
	}
}
