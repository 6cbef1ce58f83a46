use crate::{generators::*, *};

/// The versions of every dependency that the built-in generators can add to a project.
const NODE_PRESET_MANIFEST: &str = include_str!("./presets/node.json");

/// The preset for node packages written in TypeScript.
pub fn node_preset() -> Preset {
	Preset {
		name: "node",
		use_case: "node packages",
		generators: vec![
			Box::new(CommonGenerator),
			Box::new(ChangesetsGenerator),
			Box::new(EslintGenerator),
			Box::new(TypescriptGenerator),
			Box::new(JestGenerator),
			Box::new(GithubGenerator),
			Box::new(ManifestGenerator),
		],
		formatter: Some(Arc::new(StandardFormatter)),
	}
}

/// All the built-in presets.
pub fn presets() -> Vec<Preset> {
	vec![node_preset()]
}

pub fn find_preset(name: &str) -> ScaffoldResult<Preset> {
	presets()
		.into_iter()
		.find(|preset| preset.name == name)
		.ok_or_else(|| ScaffoldError::PresetNotFound {
			name: name.to_string(),
		})
}

/// The manifest that pins the versions of the dependencies of the built-in presets.
pub fn default_preset_manifest() -> ScaffoldResult<PresetManifest> {
	Ok(PresetManifest::from_json(NODE_PRESET_MANIFEST)?)
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn unknown_presets_are_rejected() {
		assert!(find_preset("node").is_ok());
		assert!(matches!(
			find_preset("deno"),
			Err(ScaffoldError::PresetNotFound { name }) if name == "deno"
		));
	}

	#[test]
	fn every_dependency_is_declared() -> ScaffoldResult {
		let manifest = default_preset_manifest()?;

		for preset in presets() {
			for generator in &preset.generators {
				for dependency in generator.dev_dependencies() {
					assert!(
						manifest.version_of(dependency).is_some(),
						"`{dependency}` of the `{}` generator has no version",
						generator.name()
					);
				}
			}
		}

		Ok(())
	}
}
