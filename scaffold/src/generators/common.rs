use serde_json::json;

use super::*;

const CONTRIBUTING: &str = r"
Contributions are welcome. Feel free to open a PR for small fixes, or an issue for bigger changes and discussions.

## Dev Instructions

Install the dependencies with:

```sh
yarn
```

Common commands are:

```sh
yarn test:watch
yarn lint:fix
```

See [package.json](./package.json) for more.

## Releasing changes

Every change that should appear in the changelog needs a changeset. Create one with `yarn changeset`, \
choosing the type of version bump (major, minor or patch) and describing the change.
";

const EXTENSIONS: [&str; 3] = [
	"dbaeumer.vscode-eslint",
	"esbenp.prettier-vscode",
	"arcanis.vscode-zipfs",
];

fn readme(package_name: &str, description: &str) -> String {
	let description = if description.is_empty() {
		String::new()
	} else {
		format!("\n_{description}_\n")
	};

	format!(
		"\n# {package_name}\n{description}\n## Contributing\n\nSee [CONTRIBUTING.md](./CONTRIBUTING.md) for instructions how to develop locally and make changes.\n"
	)
}

fn npmignore(src_dir: &str, dist_dir: &str, custom_patterns: &str) -> String {
	format!(
		r"
# DO NOT MODIFY
# This file is auto-generated (make changes to ./config/.npmignore instead)

# Ignore all files and make exceptions only for required files
**

# Include package files
!/package.json
!/README.md
!/CHANGELOG.md

# Include build files (but not .tsbuildinfo)
!{dist_dir}/**
{dist_dir}/**/*.tsbuildinfo

# Include source files (so that source maps work)
!{src_dir}/**

# Remove test/development files from source
__*__

# === {CUSTOM_PATTERNS_HEADING} ===
# Rules from ./config/.npmignore will appear below

{}
",
		custom_patterns.trim()
	)
}

fn yarnrc(main_branch: &str, npm_registry: &str) -> String {
	format!(
		"
changesetBaseRefs:
  - {main_branch}
  - origin/{main_branch}
  - upstream/{main_branch}

npmRegistryServer: {npm_registry}
"
	)
}

fn editor_settings() -> Map<String, Value> {
	let mut settings = Map::new();

	for lang in ["javascript", "javascriptreact", "typescript", "typescriptreact"] {
		settings.insert(
			format!("[{lang}]"),
			json!({ "editor.defaultFormatter": "dbaeumer.vscode-eslint" }),
		);
	}

	let Value::Object(defaults) = json!({
		"editor.formatOnSave": true,
		"editor.defaultFormatter": "esbenp.prettier-vscode",
		"eslint.format.enable": true,
		"typescript.tsdk": ".yarn/sdks/typescript/lib",
		"search.exclude": {
			"**/.yarn": true,
			"**/.pnp.*": true,
		},
		"eslint.nodePath": ".yarn/sdks",
		"prettier.prettierPath": ".yarn/sdks/prettier/index.js",
		"typescript.enablePromptUseWorkspaceTsdk": true,
	}) else {
		return settings;
	};

	settings.extend(defaults);
	settings
}

/// The yarn version range for `yvm`.
const YARN_VERSION: &str = "^1.22.10";

fn coc_settings() -> Map<String, Value> {
	let Value::Object(settings) = json!({
		"eslint.packageManager": "yarn",
		"eslint.nodePath": ".yarn/sdks",
		"workspace.workspaceFolderCheckCwd": false,
		"tsserver.tsdk": ".yarn/sdks/typescript/lib",
	}) else {
		return Map::new();
	};

	settings
}

/// Merges editor settings into an existing file. A malformed file is left as it is.
fn merge_editor_file(path: &str, existing: Option<String>, defaults: Map<String, Value>) -> ScaffoldResult<String> {
	match merge_json(existing.as_deref(), defaults, false) {
		Ok(merged) => Ok(merged),
		Err(FormatError::Serialization { message, .. }) => Err(ScaffoldError::SerializationError {
			file: path.into(),
			error: message,
		}),
		Err(e) => {
			warn!("Could not merge the settings into `{path}`, keeping it as it is: {e}");
			Ok(existing.unwrap_or_default())
		}
	}
}

/// Generates the files that every project has, such as the readme, the ignore files and the editor settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommonGenerator;

#[async_trait]
impl Generator for CommonGenerator {
	fn name(&self) -> &'static str {
		"common"
	}

	async fn files(&self, vars: &Vars) -> ScaffoldResult<Vec<VirtualFile>> {
		let config = &vars.config;

		let is_monorepo = config.is_monorepo().await?;
		let package_name = config
			.package_name(&vars.package_manifest, &vars.project_name, is_monorepo)
			.await?;
		let description = config.description(&vars.package_manifest).await?;
		let src_dir = config.src_dir().await?;
		let dist_dir = config.dist_dir().await?;
		let node_target_version = config.node_target_version().await?;
		let npm_registry = config.npm_registry().await?;
		let main_branch = config.main_branch().await?;

		let (gitignore, custom_npmignore, vscode_settings, vscode_extensions, coc) = futures::try_join!(
			vars.read(&[".gitignore"]),
			vars.read(&["config", ".npmignore"]),
			vars.read(&[".vscode", "settings.json"]),
			vars.read(&[".vscode", "extensions.json"]),
			vars.read(&[".vim", "coc-settings.json"]),
		)?;

		let mut ignored = gitignore
			.as_deref()
			.map_or_else(IgnoredFiles::default, IgnoredFiles::parse);

		ignored.ensure_defaults();
		ignored.ensure_pattern(IgnoreCategoryKind::Build, &format!("{dist_dir}/"));

		Ok(vec![
			VirtualFile::new(["README.md"], readme(&package_name, &description))
				.checked_in()
				.do_not_overwrite(),
			VirtualFile::new(["CONTRIBUTING.md"], CONTRIBUTING)
				.checked_in()
				.do_not_overwrite(),
			VirtualFile::dynamic([".gitignore"], move |contents_vars: &ContentsVars| {
				for pattern in &contents_vars.gitignore_patterns {
					ignored.ensure_pattern(IgnoreCategoryKind::Generated, pattern);
				}

				Ok(ignored.render())
			})
			.checked_in(),
			VirtualFile::new(
				[".npmignore"],
				npmignore(&src_dir, &dist_dir, custom_npmignore.as_deref().unwrap_or_default()),
			),
			VirtualFile::new([".nvmrc"], node_target_version.to_string()),
			VirtualFile::new([".yvmrc"], YARN_VERSION),
			VirtualFile::new([".yarnrc.yml"], yarnrc(&main_branch, &npm_registry))
				.checked_in()
				.do_not_overwrite(),
			VirtualFile::new(
				[".vscode", "settings.json"],
				merge_editor_file(".vscode/settings.json", vscode_settings, editor_settings())?,
			)
			.checked_in(),
			VirtualFile::new(
				[".vscode", "extensions.json"],
				merge_editor_file(
					".vscode/extensions.json",
					vscode_extensions,
					[("recommendations".to_string(), json!(EXTENSIONS))]
						.into_iter()
						.collect(),
				)?,
			)
			.checked_in(),
			VirtualFile::new(
				[".vim", "coc-settings.json"],
				merge_editor_file(".vim/coc-settings.json", coc, coc_settings())?,
			)
			.checked_in(),
		])
	}
}
