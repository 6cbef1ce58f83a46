use serde_json::json;

use super::*;

const CHANGESET_CONFIG: [&str; 2] = [".changeset", "config.json"];

/// Generates the configuration of changesets, which is used to version and release packages.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangesetsGenerator;

#[async_trait]
impl Generator for ChangesetsGenerator {
	fn name(&self) -> &'static str {
		"changesets"
	}

	fn dev_dependencies(&self) -> &'static [&'static str] {
		&[
			"@changesets/cli",
			"@changesets/get-release-plan",
			"@changesets/release-utils",
		]
	}

	async fn files(&self, vars: &Vars) -> ScaffoldResult<Vec<VirtualFile>> {
		let main_branch = vars.config.main_branch().await?;
		let existing = vars.read(&CHANGESET_CONFIG).await?;

		let Value::Object(defaults) = json!({
			"$schema": "https://unpkg.com/@changesets/config@1.4.0/schema.json",
			"changelog": "@changesets/cli/changelog",
			"commit": true,
			"linked": [],
			"access": "public",
			"baseBranch": main_branch,
			"updateInternalDependencies": "patch",
			"ignore": [],
		}) else {
			return Ok(Vec::new());
		};

		let contents = merge_json_file(
			&CHANGESET_CONFIG.join("/"),
			existing.as_deref(),
			defaults,
			false,
		)?;

		Ok(vec![VirtualFile::new(CHANGESET_CONFIG, contents).checked_in()])
	}
}
