use package_manifest::{Bugs, JsDepKind, PublishConfig, Repository, merge_generated_scripts};
use serde_json::json;

use super::*;

const PACKAGE_MANAGER: &str = "yarn@3.2.0";
const DEFAULT_VERSION: &str = "0.0.1";

// Always placed at the end of the manifest, in this order
const ENTRIES_AFTER: [&str; 5] = [
	"scripts",
	"peerDependencies",
	"optionalDependencies",
	"dependencies",
	"devDependencies",
];

/// Prepended to every generated script so that the project files are updated before running it.
pub const SCRIPT_PREFIX: &str = "skit update && ";
const RUN_IF_EXISTS: &str = "skit run-if-script-exists";

/// The scripts placed in the generated block of the root `package.json`.
pub fn generated_scripts(dist_dir: &str, is_monorepo: bool) -> IndexMap<String, String> {
	let mut scripts: IndexMap<&str, String> = IndexMap::new();

	let eslint = "eslint --cache --ext js,jsx,ts,tsx ./".to_string();
	let prettier = r#"prettier -c "./**/*{.json,.md}""#.to_string();
	let build_typescript = format!(
		"tsc {} ./tsconfig.build.json",
		if is_monorepo { "-b" } else { "-p" }
	);
	let test_jest = "jest --passWithNoTests".to_string();

	scripts.insert("lint:eslint", eslint.clone());
	scripts.insert("lint:prettier", prettier.clone());
	scripts.insert(
		"lint:fix",
		format!("{eslint} --fix && {prettier} --write && {RUN_IF_EXISTS} lint:fix:custom"),
	);

	let lint = format!("{eslint} && {prettier} && {RUN_IF_EXISTS} lint:custom");
	scripts.insert("lint", lint.clone());

	let build_clean =
		format!(r#"rimraf "./{dist_dir}" "*.tsbuildinfo" && {RUN_IF_EXISTS} build:clean:custom"#);
	scripts.insert("build:clean", build_clean.clone());
	scripts.insert("build:typescript", build_typescript.clone());
	scripts.insert("build:watch", format!("{build_typescript} -w"));

	let build = format!(
		"{RUN_IF_EXISTS} build:custom-before && {build_typescript} && {RUN_IF_EXISTS} build:custom"
	);
	scripts.insert("build", build.clone());

	scripts.insert("test:jest", test_jest.clone());
	scripts.insert("test:watch", format!("{test_jest} --watch"));

	let test = format!("{test_jest} && {RUN_IF_EXISTS} test:custom");
	scripts.insert("test", test.clone());

	// Build mode has no `--noEmit`, so monorepos emit their build files to typecheck them
	let test_typecheck = format!(
		"tsc -p ./tsconfig.json --noEmit && {build_typescript}{}",
		if is_monorepo { "" } else { " --noEmit" }
	);
	scripts.insert("test:typecheck", test_typecheck.clone());
	scripts.insert("test:all", format!("{test_typecheck} && {lint} && {test}"));

	let publish = if is_monorepo {
		"yarn workspaces foreach --verbose --topological --no-private npm publish --tolerate-republish"
	} else {
		"changeset publish"
	};

	scripts.insert(
		"release",
		format!("{build_clean} && {build} && {publish} && {RUN_IF_EXISTS} release:custom"),
	);
	scripts.insert(
		"prepare",
		format!("husky install && {RUN_IF_EXISTS} prepare:custom"),
	);

	scripts
		.into_iter()
		.map(|(name, command)| (name.to_string(), format!("{SCRIPT_PREFIX}{command}")))
		.collect()
}

/// Which manifest is being generated.
#[derive(Debug, Clone, Copy)]
pub enum ManifestTarget<'a> {
	Root,
	/// A package inside a monorepo.
	Subpackage { root_name: &'a str, path: &'a str },
}

/// Returns the value of a key of the manifest, unless it is missing, null, false or an empty string.
fn truthy<'a>(manifest: &'a Value, key: &str) -> Option<&'a Value> {
	manifest.get(key).filter(|value| {
		!matches!(value, Value::Null | Value::Bool(false)) && value.as_str() != Some("")
	})
}

fn insert_entry(output: &mut Map<String, Value>, key: &str, value: Option<Value>) {
	if let Some(value) = value
		&& !value.is_null()
	{
		output.insert(key.to_string(), value);
	}
}

/// Builds the `package.json` of a project from its current contents.
pub async fn build_manifest(vars: &Vars, manifest: &Value, target: ManifestTarget<'_>) -> ScaffoldResult<Map<String, Value>> {
	let config = &vars.config;
	let is_subpackage = matches!(target, ManifestTarget::Subpackage { .. });
	let is_monorepo = config.is_monorepo().await?;

	let (package_name, description) = match target {
		ManifestTarget::Root => (
			config
				.package_name(manifest, &vars.project_name, is_monorepo)
				.await?,
			config.description(manifest).await?,
		),
		ManifestTarget::Subpackage { root_name, .. } => (
			config.subpackage_name(root_name).await?,
			config.subpackage_description(manifest).await?,
		),
	};

	let dist_dir = config.dist_dir().await?;
	let node_min_version = config.node_min_version().await?;
	let npm_registry = config.npm_registry().await?;
	let npm_access = config.npm_access().await?;

	let mut output = Map::new();

	insert_entry(&mut output, "name", Some(package_name.clone().into()));
	insert_entry(
		&mut output,
		"private",
		manifest
			.get("private")
			.cloned()
			.or_else(|| (is_monorepo && !is_subpackage).then_some(Value::Bool(true))),
	);
	insert_entry(
		&mut output,
		"version",
		Some(truthy(manifest, "version").cloned().unwrap_or_else(|| DEFAULT_VERSION.into())),
	);
	insert_entry(&mut output, "description", Some(description.into()));
	insert_entry(
		&mut output,
		"keywords",
		Some(truthy(manifest, "keywords").cloned().unwrap_or_else(|| json!([]))),
	);

	let homepage = match truthy(manifest, "homepage") {
		Some(homepage) => homepage.clone(),
		None => format!("{}#readme", config.repo_url(&package_name).await?).into(),
	};
	insert_entry(&mut output, "homepage", Some(homepage));

	let repository = match truthy(manifest, "repository") {
		Some(repository) => repository.clone(),
		None => {
			let directory = match target {
				ManifestTarget::Subpackage { path, .. } => Some(path),
				ManifestTarget::Root => None,
			};

			to_json_value(
				PACKAGE_MANIFEST,
				&Repository::git(&config.repo_url(&package_name).await?, directory),
			)?
		}
	};
	insert_entry(&mut output, "repository", Some(repository));

	let bugs = match truthy(manifest, "bugs") {
		Some(bugs) => bugs.clone(),
		None => to_json_value(
			PACKAGE_MANIFEST,
			&Bugs::from_repo_url(&config.repo_url(&package_name).await?),
		)?,
	};
	insert_entry(&mut output, "bugs", Some(bugs));

	let author = match truthy(manifest, "author") {
		Some(author) => author.clone(),
		None => config.author().await?.into(),
	};
	insert_entry(&mut output, "author", Some(author));
	insert_entry(&mut output, "license", Some(config.license(manifest).await?.into()));

	if !is_monorepo || is_subpackage {
		insert_entry(
			&mut output,
			"main",
			Some(
				truthy(manifest, "main")
					.cloned()
					.unwrap_or_else(|| format!("{dist_dir}/index.js").into()),
			),
		);
		insert_entry(
			&mut output,
			"types",
			Some(
				truthy(manifest, "types")
					.cloned()
					.unwrap_or_else(|| format!("{dist_dir}/index.d.ts").into()),
			),
		);

		let publish_config = match truthy(manifest, "publishConfig") {
			Some(publish_config) => publish_config.clone(),
			None => to_json_value(
				PACKAGE_MANIFEST,
				&PublishConfig {
					access: Some(npm_access),
					registry: Some(npm_registry),
					..Default::default()
				},
			)?,
		};
		insert_entry(&mut output, "publishConfig", Some(publish_config));
	} else {
		insert_entry(
			&mut output,
			"workspaces",
			Some(
				truthy(manifest, "workspaces")
					.cloned()
					.unwrap_or_else(|| json!({ "packages": ["./packages/*"] })),
			),
		);
	}

	insert_entry(&mut output, "packageManager", Some(PACKAGE_MANAGER.into()));
	insert_entry(
		&mut output,
		"engines",
		Some(
			truthy(manifest, "engines")
				.cloned()
				.unwrap_or_else(|| json!({ "node": format!(">={node_min_version}") })),
		),
	);

	if let Some(existing) = manifest.as_object() {
		for (key, value) in existing {
			if !ENTRIES_AFTER.contains(&key.as_str()) {
				insert_entry(&mut output, key, Some(value.clone()));
			}
		}
	}

	let scripts = if is_subpackage {
		manifest.get("scripts").cloned()
	} else {
		Some(Value::Object(merge_generated_scripts(
			manifest.get("scripts").and_then(Value::as_object),
			&generated_scripts(&dist_dir, is_monorepo),
		)))
	};
	insert_entry(&mut output, "scripts", scripts);

	for kind in [JsDepKind::PeerDependency, JsDepKind::OptionalDependency] {
		insert_entry(&mut output, kind.key(), manifest.get(kind.key()).cloned());
	}

	let dependencies = manifest
		.get(JsDepKind::Dependency.key())
		.and_then(Value::as_object)
		.cloned()
		.unwrap_or_default();

	let dependencies: Map<String, Value> = if is_subpackage {
		dependencies
	} else {
		// Required dev dependencies that are listed as regular dependencies get the preset's version
		dependencies
			.into_iter()
			.map(|(name, version)| match vars.dev_dependencies.get(&name) {
				Some(preset_version) => (name, preset_version.clone().into()),
				None => (name, version),
			})
			.collect()
	};

	let mut dev_dependencies = manifest
		.get(JsDepKind::DevDependency.key())
		.and_then(Value::as_object)
		.cloned()
		.unwrap_or_default();

	for (name, version) in &vars.dev_dependencies {
		let should_add = if is_subpackage {
			name == "@types/node"
		} else {
			!dependencies.contains_key(name)
		};

		if should_add {
			dev_dependencies.insert(name.clone(), version.clone().into());
		}
	}

	if !is_subpackage
		&& let (Some(name), Some(version)) = (&vars.preset_manifest.name, &vars.preset_manifest.version)
	{
		dev_dependencies.insert(name.clone(), version.clone().into());
	}

	if !dependencies.is_empty() {
		insert_entry(
			&mut output,
			JsDepKind::Dependency.key(),
			Some(Value::Object(dependencies)),
		);
	}

	insert_entry(
		&mut output,
		JsDepKind::DevDependency.key(),
		Some(Value::Object(dev_dependencies)),
	);

	Ok(output)
}

/// The directory of the first package of a monorepo, such as `sample` for `@scope/sample` in `@scope/monorepo`.
///
/// Returns `None` if the project is not a monorepo or if it already has workspaces.
pub async fn subpackage_dirname(vars: &Vars, root_name: &str) -> ScaffoldResult<Option<String>> {
	if !vars.config.is_monorepo().await? || vars.package_manifest.get("workspaces").is_some() {
		return Ok(None);
	}

	let subpackage_name = vars.config.subpackage_name(root_name).await?;

	let root_prefix = match root_name.split_once('/') {
		Some((scope, _)) if root_name.starts_with('@') => format!("{scope}/"),
		Some((base, _)) => format!("{base}-"),
		None if root_name.starts_with('@') => format!("{root_name}/"),
		None => format!("{root_name}-"),
	};

	let dirname = subpackage_name
		.strip_prefix(&root_prefix)
		.unwrap_or(&subpackage_name)
		.replace('@', "")
		.replace('/', "-");

	Ok(Some(dirname))
}

/// Generates `package.json` and the entrypoint of the project, plus the first package of a monorepo.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManifestGenerator;

#[async_trait]
impl Generator for ManifestGenerator {
	fn name(&self) -> &'static str {
		"manifest"
	}

	async fn files(&self, vars: &Vars) -> ScaffoldResult<Vec<VirtualFile>> {
		let is_monorepo = vars.config.is_monorepo().await?;
		let src_dir = vars.config.src_dir().await?;

		let root_manifest = build_manifest(vars, &vars.package_manifest, ManifestTarget::Root).await?;
		let root_name = root_manifest
			.get("name")
			.and_then(Value::as_str)
			.unwrap_or_default()
			.to_string();

		let mut files = vec![
			VirtualFile::new([PACKAGE_MANIFEST], to_json_string(PACKAGE_MANIFEST, &root_manifest)?)
				.checked_in(),
		];

		if !is_monorepo {
			files.push(
				VirtualFile::new([src_dir.as_str(), "index.ts"], "")
					.checked_in()
					.do_not_overwrite(),
			);

			return Ok(files);
		}

		let Some(dirname) = subpackage_dirname(vars, &root_name).await? else {
			return Ok(files);
		};

		let subpackage_dir = format!("packages/{dirname}");
		let manifest_path = ["packages", dirname.as_str(), PACKAGE_MANIFEST];

		let existing = vars.read(&manifest_path).await?;
		let existing = Value::Object(existing_json_object(
			&format!("{subpackage_dir}/{PACKAGE_MANIFEST}"),
			existing.as_deref(),
		)?);

		let subpackage_manifest = build_manifest(
			vars,
			&existing,
			ManifestTarget::Subpackage {
				root_name: &root_name,
				path: &subpackage_dir,
			},
		)
		.await?;

		files.push(
			VirtualFile::new(
				manifest_path,
				to_json_string(PACKAGE_MANIFEST, &subpackage_manifest)?,
			)
			.checked_in()
			.do_not_overwrite(),
		);
		files.push(
			VirtualFile::new(["packages", dirname.as_str(), src_dir.as_str(), "index.ts"], "")
				.checked_in()
				.do_not_overwrite(),
		);

		Ok(files)
	}
}

#[cfg(test)]
mod test {
	use maplit::btreemap;
	use pretty_assertions::assert_eq;

	use super::*;
	use crate::generators::test_utils::test_vars;

	fn vars(fs: MemoryFs, manifest: Value, seeds: Value) -> Vars {
		let mut vars = test_vars(fs, seeds);

		vars.package_manifest = manifest;
		vars.preset_manifest = PresetManifest {
			name: Some("@skit/preset-node".to_string()),
			version: Some("1.0.0".to_string()),
			..Default::default()
		};
		vars.dev_dependencies = btreemap! {
			"@types/node".to_string() => "^16.0.0".to_string(),
			"jest".to_string() => "^27.0.0".to_string(),
			"typescript".to_string() => "^4.5.0".to_string(),
		};

		vars
	}

	#[test]
	fn scripts_reference_each_other() {
		let scripts = generated_scripts("dist", false);

		assert_eq!(
			scripts.get("build:watch").map(String::as_str),
			Some("skit update && tsc -p ./tsconfig.build.json -w")
		);
		assert_eq!(
			scripts.get("test:typecheck").map(String::as_str),
			Some("skit update && tsc -p ./tsconfig.json --noEmit && tsc -p ./tsconfig.build.json --noEmit")
		);
		assert_eq!(scripts.keys().next().map(String::as_str), Some("lint:eslint"));
		assert_eq!(scripts.keys().last().map(String::as_str), Some("prepare"));

		let monorepo = generated_scripts("dist", true);

		assert!(
			monorepo["release"].contains("yarn workspaces foreach"),
			"{}",
			monorepo["release"]
		);
	}

	#[tokio::test]
	async fn fresh_manifest() -> ScaffoldResult {
		let vars = vars(
			MemoryFs::new("/projects/widgets"),
			json!({}),
			json!({ "repoUrl": "https://github.com/acme/widgets", "packageJsonAuthor": "Acme" }),
		);

		let manifest = build_manifest(&vars, &vars.package_manifest, ManifestTarget::Root).await?;

		assert_eq!(
			manifest.keys().map(String::as_str).collect::<Vec<_>>(),
			vec![
				"name",
				"version",
				"description",
				"keywords",
				"homepage",
				"repository",
				"bugs",
				"author",
				"license",
				"main",
				"types",
				"publishConfig",
				"packageManager",
				"engines",
				"scripts",
				"devDependencies",
			]
		);
		assert_eq!(manifest["name"], json!("widgets"));
		assert_eq!(manifest["homepage"], json!("https://github.com/acme/widgets#readme"));
		assert_eq!(
			manifest["repository"],
			json!({ "type": "git", "url": "https://github.com/acme/widgets.git" })
		);
		assert_eq!(
			manifest["publishConfig"],
			json!({ "access": "public", "registry": "https://registry.npmjs.org" })
		);
		assert_eq!(manifest["engines"], json!({ "node": ">=10" }));
		assert_eq!(
			manifest["devDependencies"],
			json!({
				"@types/node": "^16.0.0",
				"jest": "^27.0.0",
				"typescript": "^4.5.0",
				"@skit/preset-node": "1.0.0"
			})
		);

		Ok(())
	}

	#[tokio::test]
	async fn user_values_are_kept() -> ScaffoldResult {
		let existing = json!({
			"name": "@acme/widgets",
			"description": "Widgets",
			"packageManager": "yarn@3.1.0",
			"main": "lib/main.js",
			"files": ["dist"],
			"dependencies": { "typescript": "^4.0.0", "lodash": "^4.17.21" },
			"scripts": { "start": "node .", "lint": "eslint ." }
		});

		let vars = vars(
			MemoryFs::new("/projects/widgets"),
			existing.clone(),
			json!({ "packageJsonAuthor": "Acme" }),
		);

		let manifest = build_manifest(&vars, &existing, ManifestTarget::Root).await?;

		assert_eq!(manifest["name"], json!("@acme/widgets"));
		assert_eq!(manifest["homepage"], json!("https://github.com/acme/widgets#readme"));
		assert_eq!(manifest["main"], json!("lib/main.js"));
		assert_eq!(manifest["packageManager"], json!("yarn@3.1.0"));
		assert_eq!(manifest["files"], json!(["dist"]));
		assert_eq!(
			manifest["dependencies"],
			json!({ "typescript": "^4.5.0", "lodash": "^4.17.21" })
		);
		assert!(
			manifest["devDependencies"]
				.get("typescript")
				.is_none()
		);

		let scripts = manifest["scripts"]
			.as_object()
			.cloned()
			.unwrap_or_default();

		assert_eq!(scripts["start"], json!("node ."));
		assert_eq!(scripts["lint:old"], json!("eslint ."));

		Ok(())
	}

	#[tokio::test]
	async fn monorepo_packages() -> ScaffoldResult {
		let vars = vars(
			MemoryFs::new("/projects/widgets"),
			json!({}),
			json!({
				"isMonorepo": true,
				"repoUrl": "https://github.com/acme/widgets",
				"packageJsonAuthor": "Acme",
			}),
		);

		let files = ManifestGenerator.files(&vars).await?;
		let paths: Vec<_> = files.iter().map(|file| file.path.join("/")).collect();

		assert_eq!(
			paths,
			vec![
				"package.json",
				"packages/sample/package.json",
				"packages/sample/src/index.ts"
			]
		);

		let root = build_manifest(&vars, &json!({}), ManifestTarget::Root).await?;

		assert_eq!(root["name"], json!("@widgets/monorepo"));
		assert_eq!(root["private"], json!(true));
		assert_eq!(root["workspaces"], json!({ "packages": ["./packages/*"] }));
		assert!(root.get("main").is_none());

		let subpackage = build_manifest(
			&vars,
			&json!({}),
			ManifestTarget::Subpackage {
				root_name: "@widgets/monorepo",
				path: "packages/sample",
			},
		)
		.await?;

		assert_eq!(subpackage["name"], json!("@widgets/sample"));
		assert_eq!(
			subpackage["repository"],
			json!({
				"type": "git",
				"url": "https://github.com/acme/widgets.git",
				"directory": "packages/sample"
			})
		);
		assert_eq!(
			subpackage["devDependencies"],
			json!({ "@types/node": "^16.0.0" })
		);
		assert!(subpackage.get("scripts").is_none());

		Ok(())
	}
}
