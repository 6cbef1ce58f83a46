use std::borrow::Cow;

use indexmap::IndexMap;
use serde_json::{Map, Value};
use thiserror::Error;

mod format;
mod jsonc;
mod merge;
mod patch;
mod yaml;

pub use format::*;
pub use jsonc::*;
pub use merge::*;
pub use patch::*;
pub use yaml::*;

/// The errors that can occur while reading or writing a structured file.
#[derive(Debug, Error)]
pub enum FormatError {
	#[error("Invalid {format} at line {line}, column {column}: {message}")]
	Syntax {
		format: &'static str,
		line: usize,
		column: usize,
		message: String,
	},

	#[error("Could not parse the YAML document: {0}")]
	Yaml(#[from] serde_yaml_ng::Error),

	#[error("Could not serialize the {format} data: {message}")]
	Serialization {
		format: &'static str,
		message: String,
	},
}

pub(crate) fn line_and_column(text: &str, pos: usize) -> (usize, usize) {
	let before = &text[..pos.min(text.len())];
	let line = before.matches('\n').count() + 1;
	let line_start = before.rfind('\n').map_or(0, |index| index + 1);

	(line, before[line_start..].chars().count() + 1)
}
