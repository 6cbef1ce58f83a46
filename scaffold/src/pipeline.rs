use package_manifest::{dev_dependencies_changed, resolve_dev_dependencies};

use crate::*;

/// The values shared by every generator during a run.
pub struct Vars {
	pub config: Arc<ConfigStore>,
	pub preset_manifest: PresetManifest,
	/// The `package.json` of the project as it was before the run, or an empty object.
	pub package_manifest: Value,
	/// The versions of every dev dependency declared by the generators of the preset.
	pub dev_dependencies: StringBTreeMap,
	pub fs: Arc<dyn ProjectFs>,
	/// The name of the project directory.
	pub project_name: String,
}

impl std::fmt::Debug for Vars {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Vars")
			.field("preset_manifest", &self.preset_manifest)
			.field("package_manifest", &self.package_manifest)
			.field("dev_dependencies", &self.dev_dependencies)
			.field("project_name", &self.project_name)
			.finish_non_exhaustive()
	}
}

impl Vars {
	/// Reads a file from the project.
	pub async fn read(&self, segments: &[&str]) -> ScaffoldResult<Option<String>> {
		read_segments(self.fs.as_ref(), segments).await
	}
}

/// A unit that contributes files to a project.
#[async_trait]
pub trait Generator: Send + Sync {
	fn name(&self) -> &'static str;

	/// The packages that must be added to the dev dependencies of the project.
	fn dev_dependencies(&self) -> &'static [&'static str] {
		&[]
	}

	async fn files(&self, vars: &Vars) -> ScaffoldResult<Vec<VirtualFile>>;
}

/// A named set of generators for a kind of project.
pub struct Preset {
	pub name: &'static str,
	pub use_case: &'static str,
	pub generators: Vec<Box<dyn Generator>>,
	pub formatter: Option<Arc<dyn Formatter>>,
}

impl std::fmt::Debug for Preset {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Preset")
			.field("name", &self.name)
			.field("use_case", &self.use_case)
			.field(
				"generators",
				&self
					.generators
					.iter()
					.map(|generator| generator.name())
					.collect::<Vec<_>>(),
			)
			.finish_non_exhaustive()
	}
}

/// What happened to a file during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
	Created,
	Updated,
	Unchanged,
	/// The contents were unchanged but the file was made executable again.
	PermissionsRepaired,
	/// The file already existed and is never overwritten.
	Kept,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
	pub path: PathBuf,
	pub outcome: WriteOutcome,
}

/// The summary of a run of [`Pipeline::apply_preset`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
	pub files: Vec<FileReport>,
	pub installed_dependencies: bool,
}

impl ApplyReport {
	pub fn outcome(&self, path: impl AsRef<Path>) -> Option<WriteOutcome> {
		self
			.files
			.iter()
			.rev()
			.find(|report| report.path == path.as_ref())
			.map(|report| report.outcome)
	}

	/// The number of files that were created or updated.
	pub fn written(&self) -> usize {
		self
			.files
			.iter()
			.filter(|report| matches!(report.outcome, WriteOutcome::Created | WriteOutcome::Updated))
			.count()
	}
}

/// Trims the contents of a file so that it ends with a single newline. Empty contents stay empty.
pub fn trim_if(contents: String, should_trim: bool) -> String {
	if !should_trim {
		return contents;
	}

	let trimmed = contents.trim();

	if trimmed.is_empty() {
		String::new()
	} else {
		format!("{trimmed}\n")
	}
}

/// Applies presets to a project.
pub struct Pipeline {
	fs: Arc<dyn ProjectFs>,
	prompter: Arc<dyn Prompter>,
	installer: Arc<dyn DependencyInstaller>,
	require_manifest: bool,
}

impl std::fmt::Debug for Pipeline {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Pipeline")
			.field("root", &self.fs.root())
			.field("require_manifest", &self.require_manifest)
			.finish_non_exhaustive()
	}
}

impl Pipeline {
	/// Creates a pipeline that prompts on the terminal and installs dependencies with yarn.
	pub fn new(fs: Arc<dyn ProjectFs>) -> Self {
		Self {
			fs,
			prompter: Arc::new(TerminalPrompter),
			installer: Arc::new(YarnInstaller),
			require_manifest: false,
		}
	}

	#[must_use]
	pub fn prompter(mut self, prompter: Arc<dyn Prompter>) -> Self {
		self.prompter = prompter;
		self
	}

	#[must_use]
	pub fn installer(mut self, installer: Arc<dyn DependencyInstaller>) -> Self {
		self.installer = installer;
		self
	}

	/// Fails with [`ScaffoldError::MissingPackageManifest`] when the project has no `package.json`.
	#[must_use]
	pub const fn require_manifest(mut self, required: bool) -> Self {
		self.require_manifest = required;
		self
	}

	async fn read_package_manifest(&self) -> ScaffoldResult<Value> {
		let path = Path::new(PACKAGE_MANIFEST);

		let Some(contents) = self.fs.read_to_string(path).await? else {
			if self.require_manifest {
				return Err(ScaffoldError::MissingPackageManifest {
					dir: self.fs.root().to_path_buf(),
				});
			}

			return Ok(Value::Object(Map::new()));
		};

		serde_json::from_str(&contents).map_err(|e| ScaffoldError::malformed(path, e))
	}

	fn project_name(&self) -> String {
		self
			.fs
			.root()
			.file_name()
			.map_or_else(|| "project".to_string(), |name| name.to_string_lossy().to_string())
	}

	/// Generates the files of a preset and writes the ones that changed.
	pub async fn apply_preset(
		&self,
		preset: &Preset,
		preset_manifest: &PresetManifest,
		install_deps: bool,
	) -> ScaffoldResult<ApplyReport> {
		let package_manifest = self.read_package_manifest().await?;

		let dev_dependencies = resolve_dev_dependencies(
			preset
				.generators
				.iter()
				.flat_map(|generator| generator.dev_dependencies().iter().copied()),
			preset_manifest,
		)?;

		// The project config goes through the same formatter as the generated files
		let formatter: Arc<dyn Formatter> = preset
			.formatter
			.clone()
			.unwrap_or_else(|| Arc::new(PassThrough));

		let config = Arc::new(ConfigStore::new(
			self.fs.clone(),
			formatter.clone(),
			self.prompter.clone(),
		));

		let vars = Vars {
			config: config.clone(),
			preset_manifest: preset_manifest.clone(),
			package_manifest,
			dev_dependencies,
			fs: self.fs.clone(),
			project_name: self.project_name(),
		};

		let mut files = Vec::new();

		for generator in &preset.generators {
			let generated = generator.files(&vars).await?;

			debug!(
				"Generator `{}` produced {} files",
				generator.name(),
				generated.len()
			);

			files.extend(generated);
		}

		let contents_vars = ContentsVars {
			gitignore_patterns: files
				.iter()
				.filter(|file| !file.is_checked_in)
				.map(VirtualFile::gitignore_pattern)
				.collect(),
			files: files.iter().map(|file| file.path.clone()).collect(),
		};

		let mut resolved = Vec::with_capacity(files.len());

		for file in files {
			let VirtualFile {
				path,
				is_executable,
				do_not_overwrite,
				do_not_trim,
				contents,
				..
			} = file;

			let file_name = path.last().cloned().unwrap_or_default();
			let contents = formatter.format(&file_name, contents.resolve(&contents_vars)?)?;
			let existing_contents = self
				.fs
				.read_to_string(&path.iter().collect::<PathBuf>())
				.await?;

			resolved.push(ResolvedFile {
				path,
				is_executable,
				do_not_overwrite,
				contents: trim_if(contents, !do_not_trim),
				existing_contents,
			});
		}

		let mut report = ApplyReport::default();

		for file in &resolved {
			let outcome = self.write_if_changed(file).await?;

			report.files.push(FileReport {
				path: file.relative_path(),
				outcome,
			});
		}

		config.save_project_config().await?;

		if install_deps {
			let next_manifest = self.read_package_manifest().await?;

			if dev_dependencies_changed(&vars.package_manifest, &next_manifest) {
				self.installer.install(self.fs.root()).await?;
				report.installed_dependencies = true;
			} else {
				debug!("Dev dependencies are unchanged, skipping the installation");
			}
		}

		info!(
			"Applied the `{}` preset ({} files written)",
			preset.name,
			report.written()
		);

		Ok(report)
	}

	async fn write_if_changed(&self, file: &ResolvedFile) -> ScaffoldResult<WriteOutcome> {
		let path = file.relative_path();

		if file.do_not_overwrite {
			if file.existing_contents.is_some() || self.fs.exists(&path).await? {
				debug!("Keeping the existing `{}`", path.display());
				return Ok(WriteOutcome::Kept);
			}

			debug!("Creating `{}`", path.display());
			self
				.fs
				.write(&path, &file.contents, file.is_executable)
				.await?;

			return Ok(WriteOutcome::Created);
		}

		match file.existing_contents.as_deref() {
			None => {
				debug!("Creating `{}`", path.display());
				self
					.fs
					.write(&path, &file.contents, file.is_executable)
					.await?;

				return Ok(WriteOutcome::Created);
			}
			Some(existing) if existing != file.contents => {
				debug!("Updating `{}`", path.display());
				self
					.fs
					.write(&path, &file.contents, file.is_executable)
					.await?;

				return Ok(WriteOutcome::Updated);
			}
			Some(_) => {}
		}

		if file.is_executable
			&& let Some(mode) = self.fs.mode(&path).await?
			&& mode & 0o700 != 0o700
		{
			debug!("Making `{}` executable", path.display());
			self.fs.set_mode(&path, mode | 0o700).await?;

			return Ok(WriteOutcome::PermissionsRepaired);
		}

		Ok(WriteOutcome::Unchanged)
	}
}
