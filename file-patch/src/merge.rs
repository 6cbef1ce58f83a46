use serde_yaml_ng::{Mapping, Value as YamlValue};

use super::*;

/// Recursive merging for key-value trees.
///
/// Matching keys whose values are both maps are merged recursively. Any other value present on both sides is only replaced when `overwrite` is true, while keys that only exist in `other` are always added. Arrays are treated as leaves.
pub trait DeepMerge {
	fn deep_merge(&mut self, other: Self, overwrite: bool);
}

impl DeepMerge for Map<String, Value> {
	fn deep_merge(&mut self, other: Self, overwrite: bool) {
		for (key, incoming) in other {
			let Some(current) = self.get_mut(&key) else {
				self.insert(key, incoming);
				continue;
			};

			match (current, incoming) {
				(Value::Object(current), Value::Object(incoming)) => {
					current.deep_merge(incoming, overwrite);
				}
				(current, incoming) => {
					if overwrite {
						*current = incoming;
					}
				}
			}
		}
	}
}

impl DeepMerge for Value {
	fn deep_merge(&mut self, other: Self, overwrite: bool) {
		match (self, other) {
			(Self::Object(current), Self::Object(incoming)) => current.deep_merge(incoming, overwrite),
			(current, incoming) => {
				if overwrite {
					*current = incoming;
				}
			}
		}
	}
}

impl DeepMerge for Mapping {
	fn deep_merge(&mut self, other: Self, overwrite: bool) {
		for (key, incoming) in other {
			let Some(current) = self.get_mut(&key) else {
				self.insert(key, incoming);
				continue;
			};

			match (current, incoming) {
				(YamlValue::Mapping(current), YamlValue::Mapping(incoming)) => {
					current.deep_merge(incoming, overwrite);
				}
				(current, incoming) => {
					if overwrite {
						*current = incoming;
					}
				}
			}
		}
	}
}

impl DeepMerge for YamlValue {
	fn deep_merge(&mut self, other: Self, overwrite: bool) {
		match (self, other) {
			(Self::Mapping(current), Self::Mapping(incoming)) => current.deep_merge(incoming, overwrite),
			(current, incoming) => {
				if overwrite {
					*current = incoming;
				}
			}
		}
	}
}

#[cfg(test)]
mod test {
	use pretty_assertions::assert_eq;
	use serde_json::json;

	use super::*;

	fn defaults() -> Value {
		json!({
			"editor.formatOnSave": true,
			"search.exclude": { "**/.yarn": true, "**/.pnp.*": true },
			"recommendations": ["dbaeumer.vscode-eslint"],
		})
	}

	#[test]
	fn defaults_never_clobber() {
		let mut existing = json!({
			"editor.formatOnSave": false,
			"search.exclude": { "**/.yarn": false, "custom": true },
			"recommendations": ["my.extension"],
		});

		existing.deep_merge(defaults(), false);

		assert_eq!(
			existing,
			json!({
				"editor.formatOnSave": false,
				"search.exclude": { "**/.yarn": false, "custom": true, "**/.pnp.*": true },
				"recommendations": ["my.extension"],
			})
		);
	}

	#[test]
	fn overwrite_lets_incoming_win() {
		let mut existing = json!({
			"editor.formatOnSave": false,
			"search.exclude": { "**/.yarn": false, "custom": true },
			"recommendations": ["my.extension"],
		});

		existing.deep_merge(defaults(), true);

		assert_eq!(
			existing,
			json!({
				"editor.formatOnSave": true,
				"search.exclude": { "**/.yarn": true, "custom": true, "**/.pnp.*": true },
				"recommendations": ["dbaeumer.vscode-eslint"],
			})
		);
	}

	#[test]
	fn yaml_mappings() -> Result<(), Box<dyn std::error::Error>> {
		let mut current: Mapping = serde_yaml_ng::from_str("on:\n  push:\n    branches: [main]\nenv:\n  node_version: 14\n")?;
		let incoming: Mapping = serde_yaml_ng::from_str("on:\n  pull_request: {}\nenv:\n  node_version: 16\n  extra: true\n")?;

		current.deep_merge(incoming, false);

		let expected: Mapping = serde_yaml_ng::from_str(
			"on:\n  push:\n    branches: [main]\n  pull_request: {}\nenv:\n  node_version: 14\n  extra: true\n",
		)?;

		assert_eq!(current, expected);

		Ok(())
	}
}
