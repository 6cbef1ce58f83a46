use super::*;

/// A textual format that can be turned into a [`Value`] tree, patched and turned back into text.
pub trait FileFormat {
	/// A human-readable name for the format.
	fn name(&self) -> &'static str;

	fn deserialize(&self, text: &str) -> Result<Value, FormatError>;

	fn patch<'a>(&self, data: Option<&'a Value>, patch: &Patch) -> Option<Cow<'a, Value>> {
		apply_patch(data, patch)
	}

	/// Turns the data into text. If the text it was originally read from is provided, implementors should try to keep the parts of it that did not change.
	fn serialize(&self, data: &Value, previous: Option<&str>) -> Result<String, FormatError>;

	/// Applies the patches to the contents of a file.
	///
	/// Returns `None` if the file should not exist after the patches are applied. If nothing changed, the existing text is returned as is.
	fn apply_patches(
		&self,
		existing: Option<&str>,
		patches: &[Patch],
	) -> Result<Option<String>, FormatError> {
		let data = existing
			.map(|text| self.deserialize(text))
			.transpose()?;

		match fold_patches(data.as_ref(), patches, |data, patch| self.patch(data, patch)) {
			PatchOutcome::Unchanged => Ok(existing.map(str::to_string)),
			PatchOutcome::Changed(value) => self.serialize(&value, existing).map(Some),
			PatchOutcome::Removed => Ok(None),
		}
	}
}
