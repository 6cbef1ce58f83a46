use std::{
	collections::{BTreeMap, BTreeSet},
	fmt::Display,
	str::FromStr,
	sync::LazyLock,
};

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

mod dependencies;
mod manifest_elements;
mod scripts;

pub use dependencies::*;
pub use manifest_elements::*;
pub use scripts::*;

type StringBTreeMap = BTreeMap<String, String>;

/// The errors that can occur while working with package manifests.
#[derive(Debug, Error)]
pub enum ManifestError {
	#[error("The dependency `{name}` is required by a generator but is not declared in the preset manifest")]
	MissingDependencyDeclaration { name: String },

	#[error("Invalid value `{value}` for the `access` setting. Allowed values are: public, restricted")]
	InvalidAccess { value: String },

	#[error("Could not parse the preset manifest: {0}")]
	InvalidPresetManifest(#[from] serde_json::Error),
}

/// The manifest of a preset bundle, which pins the versions of every dependency its generators can add to a project.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct PresetManifest {
	/// The name of the preset package. When set, it gets added to the dev dependencies of generated projects.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub version: Option<String>,

	pub dependencies: StringBTreeMap,

	// Necessary to have both camelCase and snake_case
	#[serde(alias = "dev_dependencies")]
	pub dev_dependencies: StringBTreeMap,
}

impl PresetManifest {
	pub fn from_json(text: &str) -> Result<Self, ManifestError> {
		Ok(serde_json::from_str(text)?)
	}

	/// Looks up the version declared for a dependency, preferring dev dependencies.
	pub fn version_of(&self, name: &str) -> Option<&str> {
		self.dev_dependencies
			.get(name)
			.or_else(|| self.dependencies.get(name))
			.map(String::as_str)
	}
}
