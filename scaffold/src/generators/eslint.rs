use super::*;

const ESLINTRC: &str = r"
// DO NOT MODIFY
// This file is auto-generated (make changes to ./config/.eslintrc.js instead)

module.exports = {
  root: true,
  env: {
    node: true,
    jest: true,
  },
  parser: '@typescript-eslint/parser',
  plugins: ['@typescript-eslint', 'import', 'jest', 'only-warn'],
  extends: [
    'eslint:recommended',
    'plugin:@typescript-eslint/recommended',
    'plugin:import/recommended',
    'plugin:import/typescript',
    'plugin:jest/recommended',
    'plugin:prettier/recommended',
  ],
  parserOptions: {
    project: './tsconfig.json',
  },
  settings: {
    'import/resolver': {
      typescript: {},
    },
  },
};

try {
  Object.assign(module.exports, require('./config/.eslintrc'));
} catch (_err) {}
";

const LINTSTAGEDRC: &str = r"
// DO NOT MODIFY
// This file is auto-generated (make changes to ./config/.lintstagedrc.js instead)

module.exports = {
  '*!(.{js,jsx,ts,tsx})': 'prettier -c -w',
  '*.{js,jsx,ts,tsx}': 'eslint --cache --fix',
};

try {
  Object.assign(module.exports, require('./config/.lintstagedrc'));
} catch (_err) {}
";

const PRE_COMMIT_HOOK: &str = "#!/bin/sh\n. \"$(dirname \"$0\")/_/husky.sh\"\n\nyarn lint-staged\n";

/// Patterns that only matter to the linters, which must not look at lockfiles or at the yarn cache.
const LINTER_PATTERNS: [(IgnoreCategoryKind, &str); 3] = [
	(IgnoreCategoryKind::Generated, "yarn.lock"),
	(IgnoreCategoryKind::Generated, "package-lock.json"),
	(IgnoreCategoryKind::Cache, ".yarn"),
];

/// Builds the file of a tool that ignores the same files as git, followed by the patterns of `config/<file_name>`.
fn derived_ignore_file(
	file_name: &'static str,
	gitignore: Option<&str>,
	custom_patterns: Option<String>,
	dist_dir: &str,
) -> VirtualFile {
	let mut ignored = gitignore.map_or_else(IgnoredFiles::with_defaults, IgnoredFiles::parse);
	ignored.ensure_pattern(IgnoreCategoryKind::Build, &format!("{dist_dir}/"));

	for (kind, pattern) in LINTER_PATTERNS {
		ignored.ensure_pattern(kind, pattern);
	}

	VirtualFile::dynamic([file_name], move |contents_vars: &ContentsVars| {
		for pattern in &contents_vars.gitignore_patterns {
			ignored.ensure_pattern(IgnoreCategoryKind::Generated, pattern);
		}

		Ok(ignored.render_derived(file_name, custom_patterns.as_deref().unwrap_or_default()))
	})
}

/// Generates the configuration of eslint, prettier and the pre-commit hook that runs them on staged files.
#[derive(Debug, Clone, Copy, Default)]
pub struct EslintGenerator;

#[async_trait]
impl Generator for EslintGenerator {
	fn name(&self) -> &'static str {
		"eslint"
	}

	fn dev_dependencies(&self) -> &'static [&'static str] {
		&[
			"eslint",
			"prettier",
			"@typescript-eslint/eslint-plugin",
			"@typescript-eslint/parser",
			"eslint-config-prettier",
			"eslint-plugin-import",
			"eslint-import-resolver-typescript",
			"eslint-plugin-jest",
			"eslint-plugin-only-warn",
			"eslint-plugin-prettier",
			"husky",
			"lint-staged",
		]
	}

	async fn files(&self, vars: &Vars) -> ScaffoldResult<Vec<VirtualFile>> {
		let dist_dir = vars.config.dist_dir().await?;

		let (gitignore, custom_eslintignore, custom_prettierignore) = futures::try_join!(
			vars.read(&[".gitignore"]),
			vars.read(&["config", ".eslintignore"]),
			vars.read(&["config", ".prettierignore"]),
		)?;

		Ok(vec![
			VirtualFile::new([".eslintrc.js"], ESLINTRC),
			derived_ignore_file(
				".eslintignore",
				gitignore.as_deref(),
				custom_eslintignore,
				&dist_dir,
			),
			derived_ignore_file(
				".prettierignore",
				gitignore.as_deref(),
				custom_prettierignore,
				&dist_dir,
			),
			VirtualFile::new([".lintstagedrc.js"], LINTSTAGEDRC),
			VirtualFile::new([".husky", "pre-commit"], PRE_COMMIT_HOOK)
				.checked_in()
				.executable()
				.do_not_trim(),
		])
	}
}

#[cfg(test)]
mod test {
	use pretty_assertions::assert_eq;
	use serde_json::json;

	use super::*;
	use crate::generators::test_utils::{contents_of, test_vars};

	#[tokio::test]
	async fn ignore_files_follow_gitignore() -> ScaffoldResult {
		let fs = MemoryFs::new("/projects/app")
			.with_file(
				".gitignore",
				"# === Build Files ===\n# Files which are the result of transforming other files in the project\nout/\n",
			)
			.with_file("config/.eslintignore", "/fixtures\n");
		let vars = test_vars(fs, json!({ "distDir": "out" }));

		let contents_vars = ContentsVars {
			gitignore_patterns: vec!["/.eslintignore".to_string()],
			..Default::default()
		};

		let files = EslintGenerator.files(&vars).await?;
		let eslintignore = contents_of(files, ".eslintignore", &contents_vars)?.unwrap_or_default();

		assert!(eslintignore.starts_with(
			"# DO NOT MODIFY\n# This file is auto-generated (make changes to ./config/.eslintignore instead)\n"
		));
		assert_eq!(eslintignore.matches("out/").count(), 1, "{eslintignore}");
		assert!(eslintignore.contains("yarn.lock\npackage-lock.json\n/.eslintignore"), "{eslintignore}");
		assert!(eslintignore.ends_with("will appear below\n\n/fixtures\n"), "{eslintignore}");

		Ok(())
	}

	#[tokio::test]
	async fn prettierignore_uses_default_patterns() -> ScaffoldResult {
		let vars = test_vars(MemoryFs::new("/projects/app"), json!({}));

		let files = EslintGenerator.files(&vars).await?;
		let prettierignore = contents_of(files, ".prettierignore", &ContentsVars::default())?.unwrap_or_default();

		assert!(prettierignore.contains("node_modules/"), "{prettierignore}");
		assert!(prettierignore.contains("dist/"), "{prettierignore}");
		assert!(prettierignore.contains(".yarn\n"), "{prettierignore}");

		Ok(())
	}

	#[tokio::test]
	async fn hook_is_executable() -> ScaffoldResult {
		let vars = test_vars(MemoryFs::new("/projects/app"), json!({}));

		let hook = EslintGenerator
			.files(&vars)
			.await?
			.into_iter()
			.find(|file| file.file_name() == "pre-commit");

		assert!(hook.is_some_and(|hook| hook.is_executable && hook.do_not_trim));

		Ok(())
	}
}
