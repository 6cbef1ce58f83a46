use crate::*;

/// The values that are only known after every generator has described its files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentsVars {
	/// The paths of the generated files that should not be committed, in the `/dir/file` form.
	pub gitignore_patterns: Vec<String>,
	/// The paths of all the generated files.
	pub files: Vec<Vec<String>>,
}

pub type ContentsFn = Box<dyn FnOnce(&ContentsVars) -> ScaffoldResult<String> + Send>;

/// The contents of a [`VirtualFile`].
pub enum FileContents {
	Static(String),
	/// Contents that depend on the other files of the preset.
	Dynamic(ContentsFn),
}

impl std::fmt::Debug for FileContents {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Static(contents) => f.debug_tuple("Static").field(contents).finish(),
			Self::Dynamic(_) => f.write_str("Dynamic(..)"),
		}
	}
}

impl FileContents {
	pub fn resolve(self, vars: &ContentsVars) -> ScaffoldResult<String> {
		match self {
			Self::Static(contents) => Ok(contents),
			Self::Dynamic(func) => func(vars),
		}
	}
}

impl From<String> for FileContents {
	fn from(value: String) -> Self {
		Self::Static(value)
	}
}

impl From<&str> for FileContents {
	fn from(value: &str) -> Self {
		Self::Static(value.to_string())
	}
}

/// A file to be written in the project.
#[derive(Debug)]
#[allow(clippy::struct_excessive_bools)]
pub struct VirtualFile {
	/// The segments of the path, relative to the project root.
	pub path: Vec<String>,
	pub is_checked_in: bool,
	pub is_executable: bool,
	/// The file is only written if it does not exist yet.
	pub do_not_overwrite: bool,
	pub do_not_trim: bool,
	pub contents: FileContents,
}

impl VirtualFile {
	pub fn new<S: Into<String>>(path: impl IntoIterator<Item = S>, contents: impl Into<FileContents>) -> Self {
		Self {
			path: path.into_iter().map(Into::into).collect(),
			is_checked_in: false,
			is_executable: false,
			do_not_overwrite: false,
			do_not_trim: false,
			contents: contents.into(),
		}
	}

	/// Creates a file whose contents are computed from the [`ContentsVars`].
	pub fn dynamic<S, F>(path: impl IntoIterator<Item = S>, func: F) -> Self
	where
		S: Into<String>,
		F: FnOnce(&ContentsVars) -> ScaffoldResult<String> + Send + 'static,
	{
		Self::new(path, FileContents::Dynamic(Box::new(func)))
	}

	#[must_use]
	pub const fn checked_in(mut self) -> Self {
		self.is_checked_in = true;
		self
	}

	#[must_use]
	pub const fn executable(mut self) -> Self {
		self.is_executable = true;
		self
	}

	#[must_use]
	pub const fn do_not_overwrite(mut self) -> Self {
		self.do_not_overwrite = true;
		self
	}

	#[must_use]
	pub const fn do_not_trim(mut self) -> Self {
		self.do_not_trim = true;
		self
	}

	pub fn relative_path(&self) -> PathBuf {
		self.path.iter().collect()
	}

	pub fn file_name(&self) -> &str {
		self.path.last().map_or("", String::as_str)
	}

	/// The pattern that matches this file in a `.gitignore` at the project root.
	pub fn gitignore_pattern(&self) -> String {
		self
			.path
			.iter()
			.map(|segment| format!("/{segment}"))
			.collect()
	}
}

/// A [`VirtualFile`] after its contents have been computed and formatted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
	pub path: Vec<String>,
	pub is_executable: bool,
	pub do_not_overwrite: bool,
	pub contents: String,
	pub existing_contents: Option<String>,
}

impl ResolvedFile {
	pub fn relative_path(&self) -> PathBuf {
		self.path.iter().collect()
	}
}
