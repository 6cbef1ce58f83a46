use std::collections::HashSet;

use super::*;

/// The marker key that opens the block of generated scripts.
pub const GENERATED_SCRIPTS_START: &str = "=== Generated Scripts (do not modify) ===";
/// The marker key that closes the block of generated scripts.
pub const GENERATED_SCRIPTS_END: &str = "=== (end generated scripts) ===";

static BLOCK_START: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"(?i)^\s*=== Generated Scripts").expect("Failed to initialize the block start regex")
});

static BLOCK_MARKER: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^\s*===").expect("Failed to initialize the block marker regex"));

/// The `scripts` of a manifest, split around the block of generated scripts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptBlocks {
	/// The user scripts placed before the generated block.
	pub before: Vec<(String, Value)>,
	/// The entries inside the generated block, markers excluded. `None` if there is no block yet.
	pub generated: Option<Vec<(String, Value)>>,
	/// The user scripts placed after the generated block (or all of them, if there is no block yet).
	pub after: Vec<(String, Value)>,
}

impl ScriptBlocks {
	/// Splits a `scripts` map around its block of generated scripts.
	///
	/// The block starts at the first key that looks like `=== Generated Scripts ...` and ends at the next key starting with `===`. A `""` spacer key right after the end marker belongs to the block as well.
	pub fn parse(scripts: &Map<String, Value>) -> Self {
		let entries: Vec<(String, Value)> = scripts
			.iter()
			.map(|(key, value)| (key.clone(), value.clone()))
			.collect();

		let Some(start) = entries
			.iter()
			.position(|(key, _)| BLOCK_START.is_match(key))
		else {
			return Self {
				after: entries,
				..Default::default()
			};
		};

		let end_marker = entries[start + 1..]
			.iter()
			.position(|(key, _)| BLOCK_MARKER.is_match(key))
			.map(|offset| start + 1 + offset);

		let mut block_end = end_marker.map_or(start + 1, |marker| marker + 1);

		if entries
			.get(block_end)
			.is_some_and(|(key, _)| key.is_empty())
		{
			block_end += 1;
		}

		let generated = entries[start + 1..end_marker.unwrap_or(start + 1)].to_vec();

		let mut entries = entries;
		let after = entries.split_off(block_end);
		entries.truncate(start);

		Self {
			before: entries,
			generated: Some(generated),
			after,
		}
	}

	/// Replaces the generated block with new entries and turns the result back into a `scripts` map.
	///
	/// User scripts keep their position. Those whose name collides with a generated script get renamed to `<name>:old` (or `<name>:old2` and so on, if that name is taken as well).
	pub fn with_generated(self, generated: &IndexMap<String, String>) -> Map<String, Value> {
		let mut taken: HashSet<String> = self
			.before
			.iter()
			.chain(&self.after)
			.map(|(key, _)| key.clone())
			.chain(generated.keys().cloned())
			.collect();

		let mut rename = |(key, value): (String, Value)| {
			if !generated.contains_key(&key) {
				return (key, value);
			}

			let mut renamed = format!("{key}:old");
			let mut counter = 2;

			while taken.contains(&renamed) {
				renamed = format!("{key}:old{counter}");
				counter += 1;
			}

			taken.insert(renamed.clone());

			(renamed, value)
		};

		let mut output = Map::new();

		output.extend(self.before.into_iter().map(&mut rename));

		output.insert(GENERATED_SCRIPTS_START.to_string(), Value::String(String::new()));

		for (name, command) in generated {
			output.insert(name.clone(), Value::String(command.clone()));
		}

		output.insert(GENERATED_SCRIPTS_END.to_string(), Value::String(String::new()));
		output.insert(String::new(), Value::String(String::new()));

		output.extend(self.after.into_iter().map(&mut rename));

		output
	}
}

/// Merges a fresh set of generated scripts into the existing `scripts` of a manifest.
///
/// On the first run, the generated block is placed at the top.
pub fn merge_generated_scripts(
	existing: Option<&Map<String, Value>>,
	generated: &IndexMap<String, String>,
) -> Map<String, Value> {
	existing
		.map(ScriptBlocks::parse)
		.unwrap_or_default()
		.with_generated(generated)
}

#[cfg(test)]
mod test {
	use pretty_assertions::assert_eq;
	use serde_json::json;

	use super::*;

	fn scripts(value: Value) -> Map<String, Value> {
		match value {
			Value::Object(map) => map,
			_ => Map::new(),
		}
	}

	#[test]
	fn block_boundaries() {
		let existing = scripts(json!({
			"pre": "echo pre",
			"=== generated scripts (old title) ===": "",
			"build": "project && tsc",
			"=== (end generated scripts) ===": "",
			"": "",
			"post": "echo post",
		}));

		let blocks = ScriptBlocks::parse(&existing);

		assert_eq!(blocks.before, vec![("pre".to_string(), json!("echo pre"))]);
		assert_eq!(
			blocks.generated,
			Some(vec![("build".to_string(), json!("project && tsc"))])
		);
		assert_eq!(blocks.after, vec![("post".to_string(), json!("echo post"))]);
	}

	#[test]
	fn renamed_scripts_keep_existing_old_scripts() {
		let existing = scripts(json!({
			"build": "make",
			"build:old": "make legacy",
		}));

		let generated: IndexMap<String, String> = [("build".to_string(), "skit update && tsc".to_string())]
			.into_iter()
			.collect();

		let merged = merge_generated_scripts(Some(&existing), &generated);

		assert_eq!(
			merged.keys().map(String::as_str).collect::<Vec<_>>(),
			vec![
				GENERATED_SCRIPTS_START,
				"build",
				GENERATED_SCRIPTS_END,
				"",
				"build:old2",
				"build:old",
			]
		);
		assert_eq!(merged["build:old"], json!("make legacy"));
		assert_eq!(merged["build:old2"], json!("make"));

		assert_eq!(merge_generated_scripts(Some(&merged), &generated), merged);
	}

	#[test]
	fn unterminated_block_only_spans_its_start() {
		let existing = scripts(json!({
			"=== Generated Scripts (do not modify) ===": "",
			"build": "tsc",
		}));

		let blocks = ScriptBlocks::parse(&existing);

		assert_eq!(blocks.generated, Some(Vec::new()));
		assert_eq!(blocks.after, vec![("build".to_string(), json!("tsc"))]);
	}
}
