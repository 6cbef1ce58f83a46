use std::process::Stdio;

use tokio::process::Command;

use crate::*;

pub(crate) async fn launch_command(
	program: &str,
	args: &[&str],
	cwd: &Path,
	custom_error_message: Option<&str>,
) -> ScaffoldResult {
	let command = format!("{program} {}", args.join(" "));

	debug!("Running `{command}` in `{}`", cwd.display());

	let status = Command::new(program)
		.args(args)
		.current_dir(cwd)
		.stdin(Stdio::inherit())
		.stdout(Stdio::inherit())
		.stderr(Stdio::inherit())
		.status()
		.await
		.map_err(|e| ScaffoldError::CommandFailed {
			command: command.clone(),
			reason: e.to_string(),
		})?;

	if status.success() {
		Ok(())
	} else {
		Err(ScaffoldError::CommandFailed {
			command,
			reason: custom_error_message.map_or_else(
				|| format!("exited with code {:?}", status.code()),
				str::to_string,
			),
		})
	}
}

/// Installs the dependencies of a project after its manifest has changed.
#[async_trait]
pub trait DependencyInstaller: Send + Sync {
	async fn install(&self, root: &Path) -> ScaffoldResult;
}

/// Runs `yarn install` in the project root.
#[derive(Debug, Clone, Copy, Default)]
pub struct YarnInstaller;

#[async_trait]
impl DependencyInstaller for YarnInstaller {
	async fn install(&self, root: &Path) -> ScaffoldResult {
		info!("Installing dependencies...");

		launch_command("yarn", &["install"], root, Some("Could not install dependencies")).await
	}
}

/// Runs `yarn run <name>` if the manifest in `dir` defines a script with that name. Returns whether the script was run.
pub async fn run_if_script_exists(dir: &Path, name: &str) -> ScaffoldResult<bool> {
	let fs = DiskFs::new(dir)?;

	let Some(contents) = fs.read_to_string(Path::new(PACKAGE_MANIFEST)).await? else {
		return Err(ScaffoldError::MissingPackageManifest {
			dir: fs.root().to_path_buf(),
		});
	};

	let manifest: Value = serde_json::from_str(&contents)
		.map_err(|e| ScaffoldError::malformed(fs.root().join(PACKAGE_MANIFEST), e))?;

	if manifest
		.get("scripts")
		.and_then(|scripts| scripts.get(name))
		.is_none()
	{
		debug!("No `{name}` script found, skipping it");
		return Ok(false);
	}

	launch_command("yarn", &["run", name], fs.root(), None).await?;

	Ok(true)
}

#[cfg(test)]
mod test {
	use super::*;

	#[tokio::test]
	async fn missing_scripts_are_skipped() -> ScaffoldResult {
		let dir = std::env::temp_dir().join(format!("skit-run-if-script-exists-{}", std::process::id()));
		let fs = DiskFs::new(&dir)?;

		fs.write(
			Path::new(PACKAGE_MANIFEST),
			r#"{ "name": "app", "scripts": { "build": "tsc" } }"#,
			false,
		)
		.await?;

		assert!(!run_if_script_exists(&dir, "lint:custom").await?);

		Ok(())
	}

	#[tokio::test]
	async fn manifest_is_required() {
		let dir = std::env::temp_dir().join(format!("skit-no-manifest-{}", std::process::id()));

		assert!(matches!(
			run_if_script_exists(&dir, "build").await,
			Err(ScaffoldError::MissingPackageManifest { .. })
		));
	}
}
