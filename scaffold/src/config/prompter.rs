use std::io::{self, IsTerminal, Write};

use crate::*;

/// A request for a config value that could not be resolved from the saved config.
#[derive(Debug, Clone, Copy)]
pub struct PromptRequest<'a> {
	pub key: &'a str,
	pub kind: ConfigKind,
	pub hint: Option<&'a str>,
	pub default_value: Option<&'a ConfigValue>,
}

impl PromptRequest<'_> {
	fn message(&self) -> String {
		let label = self.hint.unwrap_or(self.key);

		match self.default_value {
			Some(default) if !self.kind.is_sensitive() => format!("{label} ({default}): "),
			_ => format!("{label}: "),
		}
	}

	/// Converts the text typed by the user into a value of the requested kind. An empty answer selects the default.
	pub fn parse_answer(&self, answer: &str) -> Result<ConfigValue, String> {
		let answer = answer.trim_end_matches(['\r', '\n']);

		if answer.trim().is_empty()
			&& let Some(default) = self.default_value
		{
			return Ok(default.clone());
		}

		match self.kind {
			ConfigKind::String | ConfigKind::Password => Ok(ConfigValue::String(answer.trim().to_string())),
			ConfigKind::Number => answer
				.trim()
				.parse::<serde_json::Number>()
				.map(ConfigValue::Number)
				.map_err(|_| format!("`{}` is not a valid number", answer.trim())),
			ConfigKind::Boolean => match answer.trim().to_ascii_lowercase().as_str() {
				"y" | "yes" | "true" => Ok(ConfigValue::Boolean(true)),
				"n" | "no" | "false" => Ok(ConfigValue::Boolean(false)),
				other => Err(format!("`{other}` is not a valid answer, use y or n")),
			},
		}
	}
}

/// Obtains the config values that are not saved in the project.
#[async_trait]
pub trait Prompter: Send + Sync {
	async fn prompt(&self, request: &PromptRequest<'_>) -> ScaffoldResult<ConfigValue>;
}

/// Asks the user for values on the terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalPrompter;

fn read_answer(message: &str) -> io::Result<String> {
	let mut stderr = io::stderr();

	write!(stderr, "{message}")?;
	stderr.flush()?;

	let mut input = String::new();
	io::stdin().read_line(&mut input)?;

	Ok(input)
}

#[async_trait]
impl Prompter for TerminalPrompter {
	async fn prompt(&self, request: &PromptRequest<'_>) -> ScaffoldResult<ConfigValue> {
		if !io::stdin().is_terminal() || !io::stderr().is_terminal() {
			return Err(ScaffoldError::PromptUnavailable {
				key: request.key.to_string(),
				reason: "cannot prompt in non-interactive mode, use --yes or --set to provide the value".to_string(),
			});
		}

		loop {
			let message = request.message();

			let answer = tokio::task::spawn_blocking(move || read_answer(&message))
				.await
				.map_err(|e| ScaffoldError::PromptUnavailable {
					key: request.key.to_string(),
					reason: e.to_string(),
				})?
				.map_err(|e| ScaffoldError::PromptUnavailable {
					key: request.key.to_string(),
					reason: e.to_string(),
				})?;

			match request.parse_answer(&answer) {
				Ok(value) => return Ok(value),
				Err(e) => warn!("{e}"),
			}
		}
	}
}

/// Answers every request with its default value, without any interaction.
///
/// String values without a default are answered with an empty string.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultsPrompter;

#[async_trait]
impl Prompter for DefaultsPrompter {
	async fn prompt(&self, request: &PromptRequest<'_>) -> ScaffoldResult<ConfigValue> {
		if let Some(default) = request.default_value {
			return Ok(default.clone());
		}

		match request.kind {
			ConfigKind::String | ConfigKind::Password => Ok(ConfigValue::String(String::new())),
			kind => Err(ScaffoldError::PromptUnavailable {
				key: request.key.to_string(),
				reason: format!("no default is available for this {kind} value"),
			}),
		}
	}
}

/// Answers with preset values where available and delegates everything else.
pub struct SeededPrompter {
	seeds: HashMap<String, Value>,
	fallback: Arc<dyn Prompter>,
}

impl std::fmt::Debug for SeededPrompter {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SeededPrompter")
			.field("seeds", &self.seeds)
			.finish_non_exhaustive()
	}
}

impl SeededPrompter {
	pub fn new(seeds: impl IntoIterator<Item = (String, Value)>, fallback: Arc<dyn Prompter>) -> Self {
		Self {
			seeds: seeds.into_iter().collect(),
			fallback,
		}
	}
}

#[async_trait]
impl Prompter for SeededPrompter {
	async fn prompt(&self, request: &PromptRequest<'_>) -> ScaffoldResult<ConfigValue> {
		let Some(seed) = self.seeds.get(request.key) else {
			return self.fallback.prompt(request).await;
		};

		if let Some(value) = request.kind.guard(seed) {
			return Ok(value);
		}

		// Values given on the command line may be parsed as JSON when a string was meant
		match (request.kind, seed) {
			(ConfigKind::String | ConfigKind::Password, Value::Number(_) | Value::Bool(_)) => {
				Ok(ConfigValue::String(seed.to_string()))
			}
			(ConfigKind::Number | ConfigKind::Boolean, Value::String(answer)) => request
				.parse_answer(answer)
				.map_err(|reason| ScaffoldError::PromptUnavailable {
					key: request.key.to_string(),
					reason,
				}),
			_ => Err(ScaffoldError::PromptUnavailable {
				key: request.key.to_string(),
				reason: format!("the value `{seed}` does not have the type {}", request.kind),
			}),
		}
	}
}
