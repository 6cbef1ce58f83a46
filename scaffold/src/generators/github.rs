use super::*;

fn ci_workflow(main_branch: &str, node_version: u64, is_monorepo: bool) -> String {
	let version_command = if is_monorepo {
		"version apply"
	} else {
		"changeset version"
	};

	format!(
		r#"# DO NOT MODIFY
# This file is auto-generated (make another YAML file in this directory instead
# or create a file in ./config/.github/workflows/ci.yml with contents to merge)
name: CI

on:
  push:
    branches:
      - {main_branch}
  pull_request:
    branches:
      - "*"

env:
  node_version: {node_version}

jobs:
  test:
    name: Test
    runs-on: ubuntu-latest
    steps:
      - name: Checkout repository
        uses: actions/checkout@v2
        with:
          fetch-depth: 0
      - name: Setup Node.js
        uses: actions/setup-node@v1
        with:
          node-version: ${{{{ env.node_version }}}}
      - name: Install dependencies
        run: yarn install --immutable
      - name: Test
        run: yarn test:all

  release:
    name: Release
    runs-on: ubuntu-latest
    needs: test
    if: ${{{{ github.ref == 'refs/heads/{main_branch}' }}}}
    steps:
      - name: Checkout repository
        uses: actions/checkout@v2
        with:
          fetch-depth: 0
      - name: Setup Node.js
        uses: actions/setup-node@v1
        with:
          node-version: ${{{{ env.node_version }}}}
      - name: Install dependencies
        run: yarn install --immutable
      - name: Bump versions according to changeset
        run: yarn {version_command}
      - name: Publish to npm
        run: yarn release
        env:
          NODE_AUTH_TOKEN: ${{{{ secrets.NPM_TOKEN }}}}
"#
	)
}

/// Generates the GitHub Actions workflow that tests and releases the project.
///
/// The contents of `config/.github/workflows/ci.yml` are merged into the generated workflow, overriding its values.
#[derive(Debug, Clone, Copy, Default)]
pub struct GithubGenerator;

#[async_trait]
impl Generator for GithubGenerator {
	fn name(&self) -> &'static str {
		"github"
	}

	async fn files(&self, vars: &Vars) -> ScaffoldResult<Vec<VirtualFile>> {
		let main_branch = vars.config.main_branch().await?;
		let node_target_version = vars.config.node_target_version().await?;
		let is_monorepo = vars.config.is_monorepo().await?;

		let custom = vars
			.read(&["config", ".github", "workflows", "ci.yml"])
			.await?;

		let contents = merge_yaml(
			&ci_workflow(&main_branch, node_target_version, is_monorepo),
			custom.as_deref().unwrap_or_default(),
			true,
		)
		.map_err(|e| map_format_error("config/.github/workflows/ci.yml", e))?;

		Ok(vec![
			VirtualFile::new([".github", "workflows", "ci.yml"], contents).checked_in(),
		])
	}
}
