
pub(crate) mod parsers;

use clap::{Args, Parser, Subcommand};
use parsers::parse_config_value_pair;

use crate::*;

pub async fn main_entrypoint() -> Result<(), ScaffoldError> {
	Cli::parse().execute().await
}

impl Cli {
	#[cfg(test)]
	pub(crate) async fn execute_with<I, T>(args: I) -> Result<(), ScaffoldError>
	where
		I: IntoIterator<Item = T>,
		T: Into<std::ffi::OsString> + Clone,
	{
		let cli = Self::try_parse_from(args).map_err(|e| ScaffoldError::Other(e.into()))?;

		cli.execute().await
	}

	async fn execute(self) -> Result<(), ScaffoldError> {
		match self.command {
			Commands::Apply(args) => {
				args.apply(false).await?;
			}
			Commands::Update(args) => {
				args.apply(true).await?;
			}
			Commands::Presets => {
				for preset in presets() {
					println!("{}: {}", preset.name, preset.use_case);
				}
			}
			Commands::RunIfScriptExists { name, dir } => {
				run_if_script_exists(&dir, &name).await?;
			}
		}

		Ok(())
	}
}

impl ApplyArgs {
	async fn preset_manifest(&self) -> ScaffoldResult<PresetManifest> {
		let Some(path) = &self.preset_manifest else {
			return default_preset_manifest();
		};

		let contents = tokio::fs::read_to_string(path)
			.await
			.map_err(|e| ScaffoldError::ReadError {
				path: path.clone(),
				source: e,
			})?;

		Ok(PresetManifest::from_json(&contents)?)
	}

	async fn apply(self, require_manifest: bool) -> ScaffoldResult<ApplyReport> {
		let preset = find_preset(&self.preset)?;
		let preset_manifest = self.preset_manifest().await?;

		let fallback: Arc<dyn Prompter> = if self.yes {
			Arc::new(DefaultsPrompter)
		} else {
			Arc::new(TerminalPrompter)
		};

		let fs = DiskFs::new(&self.dir)?;

		Pipeline::new(Arc::new(fs))
			.prompter(Arc::new(SeededPrompter::new(self.config_values, fallback)))
			.require_manifest(require_manifest)
			.apply_preset(&preset, &preset_manifest, self.install)
			.await
	}
}

#[derive(Args, Debug, Clone)]
pub struct ApplyArgs {
	/// The preset to apply.
	#[arg(short, long, default_value = "node")]
	pub preset: String,

	/// The root directory of the project.
	#[arg(short, long, value_name = "DIR", default_value = ".")]
	pub dir: PathBuf,

	/// A JSON file with the versions of the dependencies added by the preset. Defaults to the versions bundled with this tool.
	#[arg(long, value_name = "FILE")]
	pub preset_manifest: Option<PathBuf>,

	/// Installs the dependencies when the dev dependencies of the project change.
	#[arg(long)]
	pub install: bool,

	/// Uses the default value of every config option instead of prompting for it.
	#[arg(short, long)]
	pub yes: bool,

	/// Sets the value of a config option (as key=value), skipping its prompt. Values are parsed as JSON if possible.
	#[arg(long = "set", short = 'S', value_parser = parse_config_value_pair, value_name = "KEY=VALUE")]
	pub config_values: Vec<(String, Value)>,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "skit")]
#[command(version, about, long_about = None)]
pub struct Cli {
	#[command(subcommand)]
	pub command: Commands,
}

/// The cli commands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
	/// Generates the files of a preset in a project, creating it if needed.
	Apply(ApplyArgs),

	/// Updates the generated files of an existing project.
	Update(ApplyArgs),

	/// Lists the built-in presets.
	Presets,

	/// Runs a script of package.json with yarn, only if it is defined.
	RunIfScriptExists {
		/// The name of the script.
		name: String,

		/// The directory that contains package.json.
		#[arg(short, long, value_name = "DIR", default_value = ".")]
		dir: PathBuf,
	},
}
