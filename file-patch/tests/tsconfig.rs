use file_patch::*;
use maplit::btreemap;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

const USER_TSCONFIG: &str = r#"// Project settings
{
  "extends": "./old.json",
  "compilerOptions": {
    "outDir": "dist", // where builds go
    "rootDir": "src"
  },
  "include": ["src", "tests"]
}
"#;

#[test]
fn patches_from_several_sources() -> Result<(), Box<dyn std::error::Error>> {
	let extends: Patch = [("extends", Patch::set("./tsconfig.base.json"))]
		.into_iter()
		.collect();

	let options: Patch = [(
		"compilerOptions",
		[
			("rootDir", Patch::Delete),
			("composite", Patch::set(true)),
		]
		.into_iter()
		.collect::<Patch>(),
	)]
	.into_iter()
	.collect();

	let include: Patch = [("include", Patch::append("scripts"))]
		.into_iter()
		.collect();

	let output = Jsonc
		.apply_patches(Some(USER_TSCONFIG), &[extends, options, include])?
		.expect("the file should still exist");

	assert_eq!(
		output,
		r#"// Project settings
{
  "extends": "./tsconfig.base.json",
  "compilerOptions": {
    "outDir": "dist", // where builds go
    "composite": true
  },
  "include": ["src", "tests", "scripts"]
}
"#
	);

	// Applying the same idempotent patches again changes nothing
	let again: Patch = [("extends", Patch::set("./tsconfig.base.json"))]
		.into_iter()
		.collect();

	assert_eq!(
		Jsonc.apply_patches(Some(&output), &[again])?.as_deref(),
		Some(output.as_str())
	);

	Ok(())
}

#[test]
fn merged_defaults_keep_user_values() -> Result<(), Box<dyn std::error::Error>> {
	let defaults: serde_json::Map<String, Value> = btreemap! {
		"compilerOptions" => json!({ "outDir": "build", "strict": true }),
		"extends" => json!("./tsconfig.base.json"),
	}
	.into_iter()
	.map(|(key, value)| (key.to_string(), value))
	.collect();

	let merged = merge_json(Some(USER_TSCONFIG), defaults.clone(), false)?;
	let data = Jsonc.deserialize(&merged)?;

	assert_eq!(data["extends"], json!("./old.json"));
	assert_eq!(data["compilerOptions"]["outDir"], json!("dist"));
	assert_eq!(data["compilerOptions"]["strict"], json!(true));
	assert!(merged.contains("// where builds go"));

	let overwritten = Jsonc.deserialize(&merge_json(Some(USER_TSCONFIG), defaults, true)?)?;

	assert_eq!(overwritten["extends"], json!("./tsconfig.base.json"));
	assert_eq!(overwritten["compilerOptions"]["outDir"], json!("build"));
	assert_eq!(overwritten["include"], json!(["src", "tests"]));

	Ok(())
}
