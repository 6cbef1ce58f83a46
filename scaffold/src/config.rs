mod project;
mod prompter;

pub use project::*;
pub use prompter::*;
use serde::{Deserialize, Serialize};
use serde_json::Number;
use tokio::sync::Mutex;

use crate::*;

/// The location of the persisted project config, relative to the project root.
pub const CONFIG_FILE: [&str; 2] = ["config", ".skitrc.json"];

/// The types that a config value can have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKind {
	String,
	/// A string that is never saved to the project config.
	Password,
	Number,
	Boolean,
}

impl ConfigKind {
	/// Returns the value if it has the type required by this kind.
	pub fn guard(self, value: &Value) -> Option<ConfigValue> {
		match (self, value) {
			(Self::String | Self::Password, Value::String(string)) => Some(ConfigValue::String(string.clone())),
			(Self::Number, Value::Number(number)) => Some(ConfigValue::Number(number.clone())),
			(Self::Boolean, Value::Bool(boolean)) => Some(ConfigValue::Boolean(*boolean)),
			_ => None,
		}
	}

	pub const fn is_sensitive(self) -> bool {
		matches!(self, Self::Password)
	}

	fn describe(value: &Value) -> &'static str {
		match value {
			Value::Null => "null",
			Value::Bool(_) => "boolean",
			Value::Number(_) => "number",
			Value::String(_) => "string",
			Value::Array(_) => "array",
			Value::Object(_) => "object",
		}
	}
}

impl Display for ConfigKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::String => write!(f, "string"),
			Self::Password => write!(f, "password"),
			Self::Number => write!(f, "number"),
			Self::Boolean => write!(f, "boolean"),
		}
	}
}

/// A resolved config value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
	Boolean(bool),
	Number(Number),
	String(String),
}

impl ConfigValue {
	pub fn as_str(&self) -> Option<&str> {
		match self {
			Self::String(string) => Some(string),
			_ => None,
		}
	}

	pub const fn as_bool(&self) -> Option<bool> {
		match self {
			Self::Boolean(boolean) => Some(*boolean),
			_ => None,
		}
	}

	pub const fn as_number(&self) -> Option<&Number> {
		match self {
			Self::Number(number) => Some(number),
			_ => None,
		}
	}
}

impl Display for ConfigValue {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Boolean(boolean) => write!(f, "{boolean}"),
			Self::Number(number) => write!(f, "{number}"),
			Self::String(string) => write!(f, "{string}"),
		}
	}
}

impl From<ConfigValue> for Value {
	fn from(value: ConfigValue) -> Self {
		match value {
			ConfigValue::Boolean(boolean) => Self::Bool(boolean),
			ConfigValue::Number(number) => Self::Number(number),
			ConfigValue::String(string) => Self::String(string),
		}
	}
}

impl From<&str> for ConfigValue {
	fn from(value: &str) -> Self {
		Self::String(value.to_string())
	}
}

impl From<String> for ConfigValue {
	fn from(value: String) -> Self {
		Self::String(value)
	}
}

impl From<bool> for ConfigValue {
	fn from(value: bool) -> Self {
		Self::Boolean(value)
	}
}

impl From<u64> for ConfigValue {
	fn from(value: u64) -> Self {
		Self::Number(value.into())
	}
}

/// Settings for resolving a single config value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOpts {
	/// The message displayed when prompting for the value.
	pub hint: Option<String>,
	pub default_value: Option<ConfigValue>,
	/// If true, the value is not saved in the project config because it will not be needed later.
	pub should_not_save: bool,
}

impl ConfigOpts {
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn hint(mut self, hint: impl Into<String>) -> Self {
		self.hint = Some(hint.into());
		self
	}

	#[must_use]
	pub fn default_value(mut self, value: impl Into<ConfigValue>) -> Self {
		self.default_value = Some(value.into());
		self
	}

	#[must_use]
	pub fn maybe_default(mut self, value: Option<impl Into<ConfigValue>>) -> Self {
		self.default_value = value.map(Into::into);
		self
	}

	#[must_use]
	pub const fn should_not_save(mut self) -> Self {
		self.should_not_save = true;
		self
	}
}

#[derive(Debug, Default)]
struct ConfigState {
	data: Option<Map<String, Value>>,
	kinds: HashMap<String, ConfigKind>,
	do_not_save: HashSet<String>,
	// A config file already exists, so its defaults were accepted when it was created
	prefer_default_over_prompt: bool,
	has_prompted: bool,
}

/// Resolves, caches and persists the configuration values of a project.
///
/// Values are read from `config/.skitrc.json` the first time one is requested. Missing values are asked to the [`Prompter`], unless a config file already existed and the value has a default.
pub struct ConfigStore {
	fs: Arc<dyn ProjectFs>,
	formatter: Arc<dyn Formatter>,
	prompter: Arc<dyn Prompter>,
	state: Mutex<ConfigState>,
}

impl std::fmt::Debug for ConfigStore {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ConfigStore")
			.field("root", &self.fs.root())
			.finish_non_exhaustive()
	}
}

impl ConfigStore {
	pub fn new(fs: Arc<dyn ProjectFs>, formatter: Arc<dyn Formatter>, prompter: Arc<dyn Prompter>) -> Self {
		Self {
			fs,
			formatter,
			prompter,
			state: Mutex::new(ConfigState::default()),
		}
	}

	fn config_path() -> PathBuf {
		CONFIG_FILE.iter().collect()
	}

	async fn read_project_config(&self, state: &mut ConfigState) -> ScaffoldResult<Map<String, Value>> {
		let path = Self::config_path();

		let Some(contents) = self.fs.read_to_string(&path).await? else {
			return Ok(Map::new());
		};

		state.prefer_default_over_prompt = true;

		match Jsonc.deserialize(&contents) {
			Ok(Value::Object(data)) => Ok(data),
			Ok(other) => Err(ScaffoldError::malformed(
				path,
				format!("expected an object, found {}", ConfigKind::describe(&other)),
			)),
			Err(e) => Err(ScaffoldError::malformed(path, e)),
		}
	}

	/// Resolves a config value of the given kind.
	pub async fn get(&self, key: &str, kind: ConfigKind, opts: ConfigOpts) -> ScaffoldResult<ConfigValue> {
		let mut state = self.state.lock().await;

		if state.data.is_none() {
			let data = self.read_project_config(&mut state).await?;
			state.data = Some(data);
		}

		if let Some(previous) = state.kinds.get(key).copied()
			&& previous != kind
		{
			let value = state
				.data
				.as_ref()
				.and_then(|data| data.get(key))
				.map_or_else(|| "(unresolved)".to_string(), Value::to_string);

			return Err(ScaffoldError::ConflictingConfigType {
				key: key.to_string(),
				requested: kind,
				previous: previous.to_string(),
				value,
			});
		}

		state.kinds.insert(key.to_string(), kind);

		if kind.is_sensitive() || opts.should_not_save {
			state.do_not_save.insert(key.to_string());
		}

		if let Some(value) = state.data.as_ref().and_then(|data| data.get(key)) {
			return kind
				.guard(value)
				.ok_or_else(|| ScaffoldError::ConflictingConfigType {
					key: key.to_string(),
					requested: kind,
					previous: ConfigKind::describe(value).to_string(),
					value: value.to_string(),
				});
		}

		if state.prefer_default_over_prompt
			&& let Some(default) = &opts.default_value
		{
			debug!("Using the default value `{default}` for `{key}`");
			return Ok(default.clone());
		}

		if !state.has_prompted {
			info!("Please enter values for the following configuration options:");
			state.has_prompted = true;
		}

		let value = self
			.prompter
			.prompt(&PromptRequest {
				key,
				kind,
				hint: opts.hint.as_deref(),
				default_value: opts.default_value.as_ref(),
			})
			.await?;

		if opts.default_value.as_ref() == Some(&value) {
			state.do_not_save.insert(key.to_string());
		}

		if let Some(data) = state.data.as_mut() {
			data.insert(key.to_string(), value.clone().into());
		}

		Ok(value)
	}

	pub async fn get_string(&self, key: &str, opts: ConfigOpts) -> ScaffoldResult<String> {
		let value = self.get(key, ConfigKind::String, opts).await?;

		Ok(value.to_string())
	}

	pub async fn get_password(&self, key: &str, opts: ConfigOpts) -> ScaffoldResult<String> {
		let value = self.get(key, ConfigKind::Password, opts).await?;

		Ok(value.to_string())
	}

	pub async fn get_number(&self, key: &str, opts: ConfigOpts) -> ScaffoldResult<Number> {
		match self.get(key, ConfigKind::Number, opts).await? {
			ConfigValue::Number(number) => Ok(number),
			other => Err(ScaffoldError::ConflictingConfigType {
				key: key.to_string(),
				requested: ConfigKind::Number,
				previous: ConfigKind::describe(&other.clone().into()).to_string(),
				value: other.to_string(),
			}),
		}
	}

	pub async fn get_bool(&self, key: &str, opts: ConfigOpts) -> ScaffoldResult<bool> {
		match self.get(key, ConfigKind::Boolean, opts).await? {
			ConfigValue::Boolean(boolean) => Ok(boolean),
			other => Err(ScaffoldError::ConflictingConfigType {
				key: key.to_string(),
				requested: ConfigKind::Boolean,
				previous: ConfigKind::describe(&other.clone().into()).to_string(),
				value: other.to_string(),
			}),
		}
	}

	/// Writes the values that should be persisted to the project config. Does nothing if no value was ever requested.
	pub async fn save_project_config(&self) -> ScaffoldResult {
		let state = self.state.lock().await;

		let Some(data) = state.data.as_ref() else {
			return Ok(());
		};

		let to_save: Map<String, Value> = data
			.iter()
			.filter(|(key, _)| !state.do_not_save.contains(key.as_str()))
			.map(|(key, value)| (key.clone(), value.clone()))
			.collect();

		let path = Self::config_path();

		let serialized = serde_json::to_string_pretty(&to_save).map_err(|e| ScaffoldError::SerializationError {
			file: path.clone(),
			error: e.to_string(),
		})?;

		let mut contents = self.formatter.format(CONFIG_FILE[1], serialized)?;

		if !contents.ends_with('\n') {
			contents.push('\n');
		}

		if self.fs.read_to_string(&path).await?.as_deref() == Some(contents.as_str()) {
			debug!("The project config is up to date");
			return Ok(());
		}

		debug!("Saving the project config to `{}`", path.display());

		self.fs.write(&path, &contents, false).await
	}
}
