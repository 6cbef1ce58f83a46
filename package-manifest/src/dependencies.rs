use super::*;

/// Resolves the versions of the dev dependencies declared by generators.
///
/// Every name must be declared in the preset manifest, either as a dev dependency or as a regular one.
pub fn resolve_dev_dependencies<'a, I>(
	names: I,
	preset: &PresetManifest,
) -> Result<StringBTreeMap, ManifestError>
where
	I: IntoIterator<Item = &'a str>,
{
	names
		.into_iter()
		.map(|name| {
			preset
				.version_of(name)
				.map(|version| (name.to_string(), version.to_string()))
				.ok_or_else(|| ManifestError::MissingDependencyDeclaration {
					name: name.to_string(),
				})
		})
		.collect()
}

/// The `name@version` pairs listed in the `devDependencies` of a manifest.
pub fn dev_dependency_set(manifest: &Value) -> BTreeSet<String> {
	manifest
		.get(JsDepKind::DevDependency.key())
		.and_then(Value::as_object)
		.map(|deps| {
			deps
				.iter()
				.map(|(name, version)| match version {
					Value::String(version) => format!("{name}@{version}"),
					other => format!("{name}@{other}"),
				})
				.collect()
		})
		.unwrap_or_default()
}

/// Whether the dev dependencies of the two manifests differ in any name or version.
pub fn dev_dependencies_changed(previous: &Value, next: &Value) -> bool {
	dev_dependency_set(previous) != dev_dependency_set(next)
}
