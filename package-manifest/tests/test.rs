use indexmap::IndexMap;
use maplit::btreemap;
use pretty_assertions::assert_eq;
use serde_json::{Map, Value, json};

use package_manifest::*;

fn generated() -> IndexMap<String, String> {
	[
		("lint", "project && eslint ./"),
		("build", "project && tsc -p ./tsconfig.build.json"),
		("test", "project && jest"),
	]
	.into_iter()
	.map(|(name, command)| (name.to_string(), command.to_string()))
	.collect()
}

fn as_map(value: Value) -> Map<String, Value> {
	match value {
		Value::Object(map) => map,
		_ => Map::new(),
	}
}

fn keys(map: &Map<String, Value>) -> Vec<&str> {
	map.keys().map(String::as_str).collect()
}

#[test]
fn first_run_puts_the_block_on_top() {
	let existing = as_map(json!({
		"start": "node dist/index.js",
		"build": "webpack",
	}));

	let merged = merge_generated_scripts(Some(&existing), &generated());

	assert_eq!(
		keys(&merged),
		vec![
			GENERATED_SCRIPTS_START,
			"lint",
			"build",
			"test",
			GENERATED_SCRIPTS_END,
			"",
			"start",
			"build:old",
		]
	);

	assert_eq!(merged["build:old"], json!("webpack"));
	assert_eq!(merged["build"], json!("project && tsc -p ./tsconfig.build.json"));
}

#[test]
fn later_runs_only_replace_the_block() {
	let existing = as_map(json!({
		"custom:before": "echo before",
		"=== Generated Scripts (do not modify) ===": "",
		"lint": "project && eslint --old",
		"removed": "project && gone",
		"=== (end generated scripts) ===": "",
		"": "",
		"start": "node dist/index.js",
	}));

	let merged = merge_generated_scripts(Some(&existing), &generated());

	assert_eq!(
		keys(&merged),
		vec![
			"custom:before",
			GENERATED_SCRIPTS_START,
			"lint",
			"build",
			"test",
			GENERATED_SCRIPTS_END,
			"",
			"start",
		]
	);

	assert_eq!(merged["lint"], json!("project && eslint ./"));

	// Running again with the same scripts is stable
	assert_eq!(merge_generated_scripts(Some(&merged), &generated()), merged);
}

#[test]
fn missing_scripts_get_a_fresh_block() {
	let merged = merge_generated_scripts(None, &generated());

	assert_eq!(merged.len(), 6);
	assert_eq!(merged[""], json!(""));
}

#[test]
fn dev_dependency_resolution() -> Result<(), Box<dyn std::error::Error>> {
	let preset = PresetManifest::from_json(
		r#"{
			"name": "@acme/preset-node",
			"version": "1.2.0",
			"dependencies": { "typescript": "^4.6.0" },
			"devDependencies": { "jest": "^27.5.1", "typescript": "^4.7.0" }
		}"#,
	)?;

	assert_eq!(
		resolve_dev_dependencies(["jest", "typescript"], &preset)?,
		btreemap! {
			"jest".to_string() => "^27.5.1".to_string(),
			"typescript".to_string() => "^4.7.0".to_string(),
		}
	);

	let missing = resolve_dev_dependencies(["jest", "rimraf"], &preset);

	assert!(matches!(
		missing,
		Err(ManifestError::MissingDependencyDeclaration { name }) if name == "rimraf"
	));

	Ok(())
}

#[test]
fn dev_dependency_changes() {
	let previous = json!({ "devDependencies": { "jest": "^27.5.1", "typescript": "^4.7.0" } });
	let reordered = json!({ "devDependencies": { "typescript": "^4.7.0", "jest": "^27.5.1" } });
	let bumped = json!({ "devDependencies": { "jest": "^28.0.0", "typescript": "^4.7.0" } });

	assert!(!dev_dependencies_changed(&previous, &reordered));
	assert!(dev_dependencies_changed(&previous, &bumped));
	assert!(dev_dependencies_changed(&json!({}), &previous));
	assert!(!dev_dependencies_changed(&json!({}), &json!({ "name": "x" })));
}
