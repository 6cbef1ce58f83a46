use file_patch::Patch;
use indexmap::IndexSet;
use serde_json::json;

use super::*;

const TSCONFIG_HEADER: &str = "// DO NOT MODIFY\n// This file is auto-generated (make changes to ./tsconfig.json instead)\n";

/// The ECMAScript version fully supported by the given major version of node.
///
/// Node has mostly followed the yearly ECMAScript releases since ES2015, and has been fully compatible with them since ES2019.
pub fn es_target(node_min_version: u64) -> String {
	if node_min_version < 6 {
		return "ES6".to_string();
	}

	let lag = u64::from(node_min_version < 12);

	format!("ES{}", 2015 + (node_min_version - 4 - lag) / 2)
}

/// Joins a relative path to a directory, resolving `.` and `..` segments.
fn join_relative(dir: &str, path: &str) -> String {
	let mut segments: Vec<&str> = Vec::new();

	for segment in dir.split('/').chain(path.split('/')) {
		match segment {
			"" | "." => {}
			".." => {
				segments.pop();
			}
			segment => segments.push(segment),
		}
	}

	segments.join("/")
}

/// The path of `to` relative to `from`, where both are relative to the project root.
fn relative_path(from: &str, to: &str) -> String {
	let from: Vec<&str> = from.split('/').filter(|s| !s.is_empty()).collect();
	let to: Vec<&str> = to.split('/').filter(|s| !s.is_empty()).collect();

	let common = from
		.iter()
		.zip(&to)
		.take_while(|(a, b)| a == b)
		.count();

	let mut segments = vec![".."; from.len() - common];
	segments.extend(&to[common..]);

	if segments.is_empty() {
		".".to_string()
	} else {
		segments.join("/")
	}
}

/// A package of a monorepo, found through the `workspaces` of the root manifest.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkspacePackage {
	/// The directory of the package, relative to the project root.
	pub dir: String,
	pub manifest: Map<String, Value>,
	/// The existing text of the `tsconfig.json` of the package.
	pub tsconfig: Option<String>,
	/// The directories that contain the sources of the package, relative to the project root.
	pub src_dirs: Vec<String>,
}

impl WorkspacePackage {
	pub fn name(&self) -> Option<&str> {
		self.manifest.get("name").and_then(Value::as_str)
	}

	fn dependency_names(&self) -> impl Iterator<Item = &str> {
		["dependencies", "devDependencies", "peerDependencies"]
			.into_iter()
			.filter_map(|key| self.manifest.get(key).and_then(Value::as_object))
			.flat_map(|deps| deps.keys().map(String::as_str))
	}
}

fn workspace_patterns(manifest: &Value) -> Vec<&str> {
	let workspaces = match manifest.get("workspaces") {
		Some(Value::Object(map)) => map.get("packages"),
		other => other,
	};

	workspaces
		.and_then(Value::as_array)
		.map(|patterns| patterns.iter().filter_map(Value::as_str).collect())
		.unwrap_or_default()
}

/// Finds the packages of a monorepo. Only literal directories and patterns ending in `/*` are supported.
pub async fn workspace_packages(vars: &Vars, dist_dir: &str) -> ScaffoldResult<Vec<WorkspacePackage>> {
	let mut dirs: IndexSet<String> = IndexSet::new();

	for pattern in workspace_patterns(&vars.package_manifest) {
		let pattern = pattern.trim_start_matches("./").trim_end_matches('/');

		if let Some(parent) = pattern.strip_suffix("/*") {
			for name in vars.fs.list_dirs(Path::new(parent)).await? {
				dirs.insert(format!("{parent}/{name}"));
			}
		} else if !pattern.contains('*') {
			dirs.insert(pattern.to_string());
		} else {
			warn!("Skipping the unsupported workspace pattern `{pattern}`");
		}
	}

	let mut packages = Vec::new();

	for dir in dirs {
		let manifest_path = format!("{dir}/{PACKAGE_MANIFEST}");

		let Some(manifest) = vars.read(&[dir.as_str(), PACKAGE_MANIFEST]).await? else {
			debug!("No manifest found in `{dir}`, it is not a package");
			continue;
		};

		let manifest = existing_json_object(&manifest_path, Some(&manifest))?;

		let tsconfig_path = format!("{dir}/tsconfig.json");
		let tsconfig = vars.read(&[dir.as_str(), "tsconfig.json"]).await?;
		let compiler_options = existing_json_object(&tsconfig_path, tsconfig.as_deref())?
			.remove("compilerOptions")
			.unwrap_or_default();

		let mut src_dirs: IndexSet<String> = IndexSet::new();

		if let Some(main) = manifest.get("main").and_then(Value::as_str)
			&& !main.contains(dist_dir)
		{
			src_dirs.insert(join_relative(&dir, main));
		}

		if let Some(root_dir) = compiler_options.get("rootDir").and_then(Value::as_str) {
			src_dirs.insert(join_relative(&dir, root_dir));
		}

		if let Some(root_dirs) = compiler_options.get("rootDirs").and_then(Value::as_array) {
			src_dirs.extend(
				root_dirs
					.iter()
					.filter_map(Value::as_str)
					.map(|root_dir| join_relative(&dir, root_dir)),
			);
		}

		packages.push(WorkspacePackage {
			dir,
			manifest,
			tsconfig,
			src_dirs: src_dirs.into_iter().collect(),
		});
	}

	Ok(packages)
}

/// Points the `tsconfig.json` of a package to the sources of the other packages it depends on.
fn package_tsconfig_patch(package: &WorkspacePackage, packages: &[WorkspacePackage], src_dir: &str) -> Patch {
	let dependencies: Vec<&WorkspacePackage> = package
		.dependency_names()
		.filter_map(|name| {
			packages
				.iter()
				.find(|other| other.dir != package.dir && other.name() == Some(name))
		})
		.collect();

	let paths: Patch = dependencies
		.iter()
		.filter_map(|dep| {
			let src = relative_path(&package.dir, &format!("{}/{src_dir}", dep.dir));
			dep.name().map(|name| (name, Patch::set(vec![src])))
		})
		.collect();

	let references: Vec<Value> = dependencies
		.iter()
		.map(|dep| json!({ "path": relative_path(&package.dir, &dep.dir) }))
		.collect();

	[
		("compilerOptions", [("paths", paths)].into_iter().collect::<Patch>()),
		("references", Patch::set(references)),
	]
	.into_iter()
	.collect()
}

fn subpackage_tsconfig(src_dir: &str, dist_dir: &str) -> String {
	format!(
		r#"
{{
  "extends": "../../tsconfig.json",
  "include": ["./{src_dir}/**/*", "./{src_dir}/**/*.json"],
  "exclude": ["**/__*__/**/*"],
  "compilerOptions": {{
    "noEmit": false,
    "rootDir": "./{src_dir}",
    "outDir": "./{dist_dir}",
    "types": ["node"]
  }},
  "references": []
}}
"#
	)
}

fn build_tsconfig(src_dir: &str, dist_dir: &str) -> String {
	format!(
		r#"
{TSCONFIG_HEADER}{{
  "extends": "./tsconfig.json",
  "include": ["./{src_dir}/**/*", "./{src_dir}/**/*.json"],
  "exclude": ["**/__*__/**/*"],
  "compilerOptions": {{
    "noEmit": false,
    "rootDir": "./{src_dir}",
    "outDir": "./{dist_dir}",
    "types": ["node"]
  }}
}}
"#
	)
}

/// The `tsconfig.build.json` of a monorepo, which builds every package that has a `tsconfig.json`.
fn monorepo_build_tsconfig(files: &[Vec<String>]) -> ScaffoldResult<String> {
	let package_dirs: IndexSet<String> = files
		.iter()
		.filter_map(|path| match path.split_last() {
			Some((file, dir)) if file == "tsconfig.json" && !dir.is_empty() => Some(dir.join("/")),
			_ => None,
		})
		.collect();

	let build = json!({
		"include": [],
		"references": package_dirs
			.iter()
			.map(|dir| json!({ "path": dir }))
			.collect::<Vec<_>>(),
	});

	Ok(format!(
		"{TSCONFIG_HEADER}{}\n",
		to_json_string("tsconfig.build.json", &build)?
	))
}

fn compiler_options(target: &str, paths: Map<String, Value>) -> Value {
	json!({
		"noEmit": true,
		"rootDir": "./",
		"baseUrl": "./",
		"target": target,
		"module": "commonjs",
		"lib": [target],
		"types": ["node", "jest"],
		"jsx": "react",
		"allowJs": true,
		"resolveJsonModule": true,
		"composite": true,
		"skipLibCheck": true,
		"sourceMap": true,
		"declaration": true,
		"importHelpers": true,
		"removeComments": false,
		"stripInternal": false,
		"moduleResolution": "node",
		"allowSyntheticDefaultImports": true,
		"esModuleInterop": true,
		"emitDecoratorMetadata": true,
		"experimentalDecorators": true,
		"strict": true,
		"noImplicitAny": true,
		"allowUnreachableCode": true,
		"allowUnusedLabels": false,
		"alwaysStrict": true,
		"forceConsistentCasingInFileNames": true,
		"noFallthroughCasesInSwitch": true,
		"noImplicitReturns": true,
		"noImplicitThis": true,
		"noUnusedLocals": true,
		"noUnusedParameters": false,
		"strictFunctionTypes": false,
		"strictNullChecks": true,
		"strictPropertyInitialization": false,
		"paths": paths,
	})
}

/// Generates the family of `tsconfig` files: the user-editable `tsconfig.json`, the generated base it extends and the configuration used for builds.
#[derive(Debug, Clone, Copy, Default)]
pub struct TypescriptGenerator;

#[async_trait]
impl Generator for TypescriptGenerator {
	fn name(&self) -> &'static str {
		"typescript"
	}

	fn dev_dependencies(&self) -> &'static [&'static str] {
		&[
			"typescript",
			"ts-node",
			"ts-node-dev",
			"tsconfig-paths",
			"node-notifier",
			"@types/node",
			"@types/jest",
		]
	}

	async fn files(&self, vars: &Vars) -> ScaffoldResult<Vec<VirtualFile>> {
		let is_monorepo = vars.config.is_monorepo().await?;
		let src_dir = vars.config.src_dir().await?;
		let dist_dir = vars.config.dist_dir().await?;
		let target = es_target(vars.config.node_min_version().await?);

		let (tsconfig, gitignore) = futures::try_join!(
			vars.read(&["tsconfig.json"]),
			vars.read(&[".gitignore"]),
		)?;

		let packages = if is_monorepo {
			workspace_packages(vars, &dist_dir).await?
		} else {
			Vec::new()
		};

		let mut files = Vec::new();

		if is_monorepo {
			let root_name = vars
				.config
				.package_name(&vars.package_manifest, &vars.project_name, true)
				.await?;

			if let Some(dirname) = subpackage_dirname(vars, &root_name).await? {
				files.push(
					VirtualFile::new(
						["packages", dirname.as_str(), "tsconfig.json"],
						subpackage_tsconfig(&src_dir, &dist_dir),
					)
					.checked_in()
					.do_not_overwrite(),
				);
			}

			for package in &packages {
				let Some(existing) = &package.tsconfig else {
					continue;
				};

				let path = format!("{}/tsconfig.json", package.dir);

				let contents = Jsonc
					.apply_patches(
						Some(existing),
						&[package_tsconfig_patch(package, &packages, &src_dir)],
					)
					.map_err(|e| map_format_error(&path, e))?
					.unwrap_or_default();

				files.push(VirtualFile::new(path.split('/'), contents).checked_in());
			}
		}

		let extends_base: Patch = [("extends", Patch::set("./tsconfig.base.json"))]
			.into_iter()
			.collect();

		let root_tsconfig = Jsonc
			.apply_patches(tsconfig.as_deref(), &[extends_base])
			.map_err(|e| map_format_error("tsconfig.json", e))?
			.unwrap_or_default();

		files.push(VirtualFile::new(["tsconfig.json"], root_tsconfig).checked_in());

		files.push(if is_monorepo {
			VirtualFile::dynamic(["tsconfig.build.json"], |contents_vars: &ContentsVars| {
				monorepo_build_tsconfig(&contents_vars.files)
			})
		} else {
			VirtualFile::new(["tsconfig.build.json"], build_tsconfig(&src_dir, &dist_dir))
		});

		let mut ignored = gitignore
			.as_deref()
			.map_or_else(IgnoredFiles::with_defaults, IgnoredFiles::parse);
		ignored.ensure_pattern(IgnoreCategoryKind::Build, &format!("{dist_dir}/"));

		let paths: Map<String, Value> = packages
			.iter()
			.filter_map(|package| {
				package
					.name()
					.map(|name| (name.to_string(), json!(package.src_dirs)))
			})
			.collect();

		files.push(VirtualFile::dynamic(
			["tsconfig.base.json"],
			move |contents_vars: &ContentsVars| {
				let mut exclude: IndexSet<String> = IndexSet::new();
				exclude.insert("**/.git/**/*".to_string());

				for pattern in ignored
					.patterns()
					.chain(contents_vars.gitignore_patterns.iter().map(String::as_str))
				{
					exclude.extend(gitignore_pattern_to_ts_globs(pattern));
				}

				exclude.insert("./.pnp.*".to_string());

				let base = json!({
					"include": ["**/*", "**/*.json"],
					"exclude": exclude.into_iter().collect::<Vec<_>>(),
					"compilerOptions": compiler_options(&target, paths),
				});

				Ok(format!(
					"{TSCONFIG_HEADER}{}\n",
					to_json_string("tsconfig.base.json", &base)?
				))
			},
		));

		Ok(files)
	}
}

#[cfg(test)]
mod test {
	use pretty_assertions::assert_eq;

	use super::*;
	use crate::generators::test_utils::{contents_of, test_vars};

	fn parse(contents: &str) -> ScaffoldResult<Value> {
		Jsonc
			.deserialize(contents)
			.map_err(|e| ScaffoldError::malformed("tsconfig", e))
	}

	#[test]
	fn targets_follow_node() {
		assert_eq!(es_target(4), "ES6");
		assert_eq!(es_target(6), "ES2015");
		assert_eq!(es_target(10), "ES2017");
		assert_eq!(es_target(12), "ES2019");
		assert_eq!(es_target(14), "ES2020");
		assert_eq!(es_target(16), "ES2021");
	}

	#[test]
	fn relative_paths() {
		assert_eq!(join_relative("packages/core", "./src"), "packages/core/src");
		assert_eq!(join_relative("packages/core", "../shared/lib"), "packages/shared/lib");
		assert_eq!(relative_path("packages/core", "packages/utils/src"), "../utils/src");
		assert_eq!(relative_path("packages/core", "packages/core"), ".");
	}

	#[tokio::test]
	async fn single_package_tsconfigs() -> ScaffoldResult {
		let fs = MemoryFs::new("/projects/app").with_file(
			"tsconfig.json",
			"{\n  // strictness\n  \"compilerOptions\": { \"strict\": false }\n}\n",
		);
		let vars = test_vars(fs, json!({ "nodeMinVersion": 12 }));

		let contents_vars = ContentsVars {
			gitignore_patterns: vec!["/.eslintrc.js".to_string()],
			..Default::default()
		};

		let root = contents_of(
			TypescriptGenerator.files(&vars).await?,
			"tsconfig.json",
			&contents_vars,
		)?
		.unwrap_or_default();

		assert!(root.contains("// strictness"), "{root}");
		assert_eq!(parse(&root)?["extends"], json!("./tsconfig.base.json"));

		let base = contents_of(
			TypescriptGenerator.files(&vars).await?,
			"tsconfig.base.json",
			&contents_vars,
		)?
		.unwrap_or_default();

		assert!(base.starts_with(TSCONFIG_HEADER));

		let base = parse(&base)?;
		let exclude: Vec<&str> = base["exclude"]
			.as_array()
			.map(|items| items.iter().filter_map(Value::as_str).collect())
			.unwrap_or_default();

		assert_eq!(exclude.first(), Some(&"**/.git/**/*"));
		assert_eq!(exclude.last(), Some(&"./.pnp.*"));
		assert!(exclude.contains(&"**/dist/**/*"));
		assert!(exclude.contains(&"**/node_modules/**/*"));
		assert!(exclude.contains(&"./.eslintrc.js"));
		assert_eq!(base["compilerOptions"]["target"], json!("ES2019"));
		assert_eq!(base["compilerOptions"]["paths"], json!({}));

		let build = contents_of(
			TypescriptGenerator.files(&vars).await?,
			"tsconfig.build.json",
			&contents_vars,
		)?
		.unwrap_or_default();

		assert_eq!(parse(&build)?["compilerOptions"]["outDir"], json!("./dist"));

		Ok(())
	}

	#[tokio::test]
	async fn monorepo_packages_reference_each_other() -> ScaffoldResult {
		let fs = MemoryFs::new("/projects/app")
			.with_file(
				"packages/core/package.json",
				r#"{ "name": "@app/core", "main": "dist/index.js" }"#,
			)
			.with_file(
				"packages/core/tsconfig.json",
				r#"{ "compilerOptions": { "rootDir": "./src" } }"#,
			)
			.with_file(
				"packages/cli/package.json",
				r#"{ "name": "@app/cli", "dependencies": { "@app/core": "^1.0.0", "chalk": "^4.0.0" } }"#,
			)
			.with_file("packages/cli/tsconfig.json", r#"{ "compilerOptions": {} }"#);

		let mut vars = test_vars(fs, json!({ "isMonorepo": true }));
		vars.package_manifest = json!({
			"name": "@app/monorepo",
			"workspaces": ["packages/*"],
		});

		let files = TypescriptGenerator.files(&vars).await?;
		let contents_vars = ContentsVars {
			files: files.iter().map(|file| file.path.clone()).collect(),
			..Default::default()
		};

		let cli = contents_of(
			TypescriptGenerator.files(&vars).await?,
			"packages/cli/tsconfig.json",
			&contents_vars,
		)?
		.unwrap_or_default();
		let cli = parse(&cli)?;

		assert_eq!(cli["compilerOptions"]["paths"], json!({ "@app/core": ["../core/src"] }));
		assert_eq!(cli["references"], json!([{ "path": "../core" }]));

		let build = contents_of(files, "tsconfig.build.json", &contents_vars)?.unwrap_or_default();

		assert_eq!(
			parse(&build)?,
			json!({
				"include": [],
				"references": [{ "path": "packages/cli" }, { "path": "packages/core" }],
			})
		);

		let base = contents_of(
			TypescriptGenerator.files(&vars).await?,
			"tsconfig.base.json",
			&contents_vars,
		)?
		.unwrap_or_default();

		assert_eq!(
			parse(&base)?["compilerOptions"]["paths"],
			json!({ "@app/cli": [], "@app/core": ["packages/core/src"] })
		);

		Ok(())
	}

	#[tokio::test]
	async fn new_monorepo_gets_a_package_tsconfig() -> ScaffoldResult {
		let mut vars = test_vars(MemoryFs::new("/projects/app"), json!({ "isMonorepo": true }));
		vars.package_manifest = json!({ "name": "@app/monorepo" });

		let files = TypescriptGenerator.files(&vars).await?;
		let package = files
			.iter()
			.find(|file| file.path == ["packages", "sample", "tsconfig.json"]);

		assert!(package.is_some_and(|file| file.do_not_overwrite));

		Ok(())
	}
}
