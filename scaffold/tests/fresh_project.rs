use std::sync::Arc;

use async_trait::async_trait;
use maplit::btreemap;
use package_manifest::{GENERATED_SCRIPTS_END, GENERATED_SCRIPTS_START, PresetManifest};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use skit::{
	generators::{ManifestTarget, build_manifest, generated_scripts},
	*,
};

/// Emits the manifest of the project and a `.gitignore` with the default patterns.
struct ManifestAndGitignore;

#[async_trait]
impl Generator for ManifestAndGitignore {
	fn name(&self) -> &'static str {
		"manifest-and-gitignore"
	}

	fn dev_dependencies(&self) -> &'static [&'static str] {
		&["typescript"]
	}

	async fn files(&self, vars: &Vars) -> ScaffoldResult<Vec<VirtualFile>> {
		let manifest = build_manifest(vars, &vars.package_manifest, ManifestTarget::Root).await?;

		let manifest = serde_json::to_string_pretty(&manifest).map_err(|e| ScaffoldError::SerializationError {
			file: PACKAGE_MANIFEST.into(),
			error: e.to_string(),
		})?;

		Ok(vec![
			VirtualFile::new([PACKAGE_MANIFEST], manifest).checked_in(),
			VirtualFile::new([".gitignore"], IgnoredFiles::with_defaults().render()).checked_in(),
		])
	}
}

fn preset() -> Preset {
	Preset {
		name: "fresh",
		use_case: "testing a fresh project",
		generators: vec![Box::new(ManifestAndGitignore)],
		formatter: Some(Arc::new(StandardFormatter)),
	}
}

#[tokio::test]
async fn empty_manifest_is_filled_in() -> Result<(), Box<dyn std::error::Error>> {
	let fs = Arc::new(MemoryFs::new("/projects/my-app").with_file(PACKAGE_MANIFEST, "{}"));
	let preset_manifest = PresetManifest {
		dev_dependencies: btreemap! {
			"typescript".to_string() => "^4.6.3".to_string(),
		},
		..Default::default()
	};

	let report = Pipeline::new(fs.clone())
		.prompter(Arc::new(DefaultsPrompter))
		.apply_preset(&preset(), &preset_manifest, false)
		.await?;

	assert_eq!(report.outcome(PACKAGE_MANIFEST), Some(WriteOutcome::Updated));
	assert_eq!(report.outcome(".gitignore"), Some(WriteOutcome::Created));
	assert!(!report.installed_dependencies);

	let manifest: Value = serde_json::from_str(&fs.contents(PACKAGE_MANIFEST).unwrap_or_default())?;

	assert_eq!(manifest["name"], json!("my-app"));
	assert_eq!(manifest["version"], json!("0.0.1"));
	assert_eq!(manifest["devDependencies"], json!({ "typescript": "^4.6.3" }));

	let scripts: Vec<(&str, &str)> = manifest["scripts"]
		.as_object()
		.map(|scripts| {
			scripts
				.iter()
				.map(|(name, command)| (name.as_str(), command.as_str().unwrap_or_default()))
				.collect()
		})
		.unwrap_or_default();

	let generated = generated_scripts("dist", false);

	assert_eq!(scripts.first(), Some(&(GENERATED_SCRIPTS_START, "")));
	assert_eq!(scripts.len(), generated.len() + 3);
	assert_eq!(scripts[generated.len() + 1], (GENERATED_SCRIPTS_END, ""));

	for ((name, command), (expected_name, expected_command)) in scripts[1..].iter().zip(&generated) {
		assert_eq!(*name, expected_name.as_str());
		assert_eq!(*command, expected_command.as_str());
	}

	let gitignore = fs.contents(".gitignore").unwrap_or_default();

	let headings: Vec<&str> = gitignore
		.lines()
		.filter(|line| line.starts_with("# ==="))
		.collect();

	assert_eq!(
		headings,
		IgnoreCategoryKind::ALL
			.iter()
			.map(|kind| format!("# === {} ===", kind.heading()))
			.collect::<Vec<_>>()
	);

	let parsed = IgnoredFiles::parse(&gitignore);

	for kind in IgnoreCategoryKind::ALL {
		assert_eq!(
			parsed.category(kind).patterns().collect::<Vec<_>>(),
			kind.default_patterns().to_vec(),
			"unexpected lines in {}",
			kind.heading()
		);
	}

	Ok(())
}
