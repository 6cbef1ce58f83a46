use crate::*;

/// Normalizes the text of generated files, based on their name.
pub trait Formatter: Send + Sync {
	fn format(&self, file_name: &str, contents: String) -> ScaffoldResult<String>;
}

/// Pretty-prints strict JSON files with two spaces of indentation and leaves every other file as it is.
///
/// Files with a `.json` extension that contain comments or trailing commas are not strict JSON and are passed through.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardFormatter;

impl Formatter for StandardFormatter {
	fn format(&self, file_name: &str, contents: String) -> ScaffoldResult<String> {
		if !Path::new(file_name)
			.extension()
			.is_some_and(|ext| ext == "json")
		{
			return Ok(contents);
		}

		let Ok(data) = serde_json::from_str::<Value>(&contents) else {
			return Ok(contents);
		};

		serde_json::to_string_pretty(&data).map_err(|e| ScaffoldError::SerializationError {
			file: file_name.into(),
			error: e.to_string(),
		})
	}
}

/// Leaves every file untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl Formatter for PassThrough {
	fn format(&self, _file_name: &str, contents: String) -> ScaffoldResult<String> {
		Ok(contents)
	}
}

#[cfg(test)]
mod test {
	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn json_is_pretty_printed() -> ScaffoldResult {
		assert_eq!(
			StandardFormatter.format("package.json", r#"{"name":"x","files":["dist"]}"#.to_string())?,
			"{\n  \"name\": \"x\",\n  \"files\": [\n    \"dist\"\n  ]\n}"
		);

		Ok(())
	}

	#[test]
	fn other_files_are_untouched() -> ScaffoldResult {
		let jsonc = "// DO NOT MODIFY\n{ \"a\": 1 }\n".to_string();

		assert_eq!(StandardFormatter.format("tsconfig.json", jsonc.clone())?, jsonc);
		assert_eq!(StandardFormatter.format("README.md", "#  Title".to_string())?, "#  Title");
		assert_eq!(PassThrough.format("a.json", "{\"a\":1}".to_string())?, "{\"a\":1}");

		Ok(())
	}
}
