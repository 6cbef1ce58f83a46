use package_manifest::PublishConfigAccess;

use crate::*;

static SCOPE_REGEX: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^@[^/]+").expect("Failed to initialize the package scope regex"));

fn manifest_str<'a>(manifest: &'a Value, key: &str) -> Option<&'a str> {
	manifest
		.get(key)
		.and_then(Value::as_str)
		.filter(|value| !value.is_empty())
}

/// The scope of a package name, such as `@scope` in `@scope/name`.
pub fn package_scope(name: &str) -> Option<&str> {
	SCOPE_REGEX.find(name).map(|m| m.as_str())
}

/// The default repository url for a package name, like `https://github.com/scope/name` for `@scope/name`.
pub fn default_repo_url(package_name: &str) -> Option<String> {
	let mut parts = package_name.trim_start_matches('@').split('/');

	match (parts.next(), parts.next()) {
		(Some(owner), Some(repo)) if !owner.is_empty() && !repo.is_empty() => {
			Some(format!("https://github.com/{owner}/{repo}"))
		}
		_ => None,
	}
}

impl ConfigStore {
	/// The name of the package. A name in the manifest wins, otherwise it defaults to the name of the project directory.
	pub async fn package_name(&self, manifest: &Value, dir_name: &str, is_monorepo: bool) -> ScaffoldResult<String> {
		if let Some(name) = manifest_str(manifest, "name") {
			return Ok(name.to_string());
		}

		let mut opts = ConfigOpts::new().should_not_save();

		if is_monorepo {
			opts = opts
				.hint("name of the unpublished monorepo root package")
				.default_value(format!("@{dir_name}/monorepo"));
		} else {
			opts = opts.default_value(dir_name);
		}

		self.get_string("packageName", opts).await
	}

	pub async fn description(&self, manifest: &Value) -> ScaffoldResult<String> {
		if let Some(description) = manifest_str(manifest, "description") {
			return Ok(description.to_string());
		}

		self
			.get_string("description", ConfigOpts::new().should_not_save())
			.await
	}

	pub async fn repo_url(&self, package_name: &str) -> ScaffoldResult<String> {
		self
			.get_string(
				"repoUrl",
				ConfigOpts::new()
					.should_not_save()
					.maybe_default(default_repo_url(package_name)),
			)
			.await
	}

	/// The author of the package, in the `name <email> (url)` format used by package manifests.
	pub async fn author(&self) -> ScaffoldResult<String> {
		self
			.get_string("packageJsonAuthor", ConfigOpts::new().should_not_save())
			.await
	}

	pub async fn license(&self, manifest: &Value) -> ScaffoldResult<String> {
		if let Some(license) = manifest_str(manifest, "license") {
			return Ok(license.to_string());
		}

		self
			.get_string(
				"license",
				ConfigOpts::new().default_value("MIT").should_not_save(),
			)
			.await
	}

	pub async fn main_branch(&self) -> ScaffoldResult<String> {
		self
			.get_string("mainBranch", ConfigOpts::new().default_value("master"))
			.await
	}

	pub async fn src_dir(&self) -> ScaffoldResult<String> {
		self
			.get_string("srcDir", ConfigOpts::new().default_value("src"))
			.await
	}

	pub async fn dist_dir(&self) -> ScaffoldResult<String> {
		self
			.get_string("distDir", ConfigOpts::new().default_value("dist"))
			.await
	}

	async fn node_version(&self, key: &str, default: u64) -> ScaffoldResult<u64> {
		let version = self
			.get_number(key, ConfigOpts::new().default_value(default))
			.await?;

		version
			.as_u64()
			.ok_or_else(|| ScaffoldError::ConflictingConfigType {
				key: key.to_string(),
				requested: ConfigKind::Number,
				previous: "number".to_string(),
				value: version.to_string(),
			})
	}

	/// The oldest major version of Node.js supported by the package.
	pub async fn node_min_version(&self) -> ScaffoldResult<u64> {
		self.node_version("nodeMinVersion", 10).await
	}

	/// The major version of Node.js used for development.
	pub async fn node_target_version(&self) -> ScaffoldResult<u64> {
		self.node_version("nodeTargetVersion", 14).await
	}

	pub async fn npm_registry(&self) -> ScaffoldResult<String> {
		self
			.get_string(
				"npmRegistry",
				ConfigOpts::new().default_value("https://registry.npmjs.org"),
			)
			.await
	}

	pub async fn npm_access(&self) -> ScaffoldResult<PublishConfigAccess> {
		let access = self
			.get_string(
				"npmAccess",
				ConfigOpts::new()
					.default_value(PublishConfigAccess::Public.to_string())
					.should_not_save(),
			)
			.await?;

		Ok(access.parse::<PublishConfigAccess>()?)
	}

	pub async fn is_monorepo(&self) -> ScaffoldResult<bool> {
		self
			.get_bool("isMonorepo", ConfigOpts::new().default_value(false))
			.await
	}

	/// The name of the first package created inside a monorepo.
	pub async fn subpackage_name(&self, root_name: &str) -> ScaffoldResult<String> {
		let default = match package_scope(root_name) {
			Some(scope) => format!("{scope}/sample"),
			None => format!("{root_name}-sample"),
		};

		self
			.get_string(
				"subpackageName",
				ConfigOpts::new()
					.hint("name of the initial package within the monorepo")
					.default_value(default)
					.should_not_save(),
			)
			.await
	}

	pub async fn subpackage_description(&self, manifest: &Value) -> ScaffoldResult<String> {
		if let Some(description) = manifest_str(manifest, "description") {
			return Ok(description.to_string());
		}

		self
			.get_string(
				"subpackageDescription",
				ConfigOpts::new().should_not_save(),
			)
			.await
	}
}

#[cfg(test)]
mod test {
	use pretty_assertions::assert_eq;
	use serde_json::json;

	use super::*;

	fn defaults_store() -> ConfigStore {
		ConfigStore::new(
			Arc::new(MemoryFs::new("/projects/app")),
			Arc::new(StandardFormatter),
			Arc::new(DefaultsPrompter),
		)
	}

	#[test]
	fn repo_urls() {
		assert_eq!(
			default_repo_url("@acme/widgets").as_deref(),
			Some("https://github.com/acme/widgets")
		);
		assert_eq!(default_repo_url("widgets"), None);
		assert_eq!(package_scope("@acme/widgets"), Some("@acme"));
		assert_eq!(package_scope("widgets"), None);
	}

	#[tokio::test]
	async fn manifest_values_win() -> ScaffoldResult {
		let config = defaults_store();
		let manifest = json!({ "name": "from-manifest", "license": "Apache-2.0" });

		assert_eq!(config.package_name(&manifest, "app", false).await?, "from-manifest");
		assert_eq!(config.license(&manifest).await?, "Apache-2.0");
		assert_eq!(config.license(&json!({})).await?, "MIT");

		Ok(())
	}

	#[tokio::test]
	async fn project_defaults() -> ScaffoldResult {
		let config = defaults_store();

		assert_eq!(config.package_name(&json!({}), "app", true).await?, "@app/monorepo");
		assert_eq!(config.subpackage_name("@app/monorepo").await?, "@app/sample");
		assert_eq!(config.src_dir().await?, "src");
		assert_eq!(config.dist_dir().await?, "dist");
		assert_eq!(config.main_branch().await?, "master");
		assert_eq!(config.node_min_version().await?, 10);
		assert_eq!(config.node_target_version().await?, 14);
		assert_eq!(config.npm_access().await?, PublishConfigAccess::Public);
		assert!(!config.is_monorepo().await?);

		Ok(())
	}
}
