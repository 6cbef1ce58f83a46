#![allow(clippy::result_large_err)]

use std::{
	collections::{BTreeMap, BTreeSet, HashMap, HashSet},
	fmt::Display,
	path::{Path, PathBuf},
	sync::{Arc, LazyLock},
};

use async_trait::async_trait;
use file_patch::{FileFormat, FormatError, Jsonc, merge_json, merge_yaml};
use indexmap::IndexMap;
use package_manifest::{ManifestError, PresetManifest};
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod formatter;
pub mod fs;
pub mod generators;
pub mod ignore;
pub mod pipeline;
pub mod presets;
pub mod virtual_file;

pub use config::*;
pub use errors::*;
pub use exec::*;
pub use formatter::*;
pub use fs::*;
pub use ignore::*;
pub use pipeline::*;
pub use presets::*;
pub use virtual_file::*;

pub(crate) type StringBTreeMap = BTreeMap<String, String>;

/// The name of the manifest file found at the root of every project.
pub const PACKAGE_MANIFEST: &str = "package.json";
