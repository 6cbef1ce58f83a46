use crate::*;

static HEADING_REGEX: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"^#\s*===\s+(.+)\s+===$").expect("Failed to initialize the ignore heading regex")
});

const GITIGNORE_HEADER: &str = "# DO NOT CHANGE THE STRUCTURE OF THIS FILE\n# You may add extra patterns but do not change the \"=== HEADING ===\" comments or provided patterns";

/// The heading of the section that contains the user-defined patterns of derived ignore files.
pub const CUSTOM_PATTERNS_HEADING: &str = "Custom Ignore Patterns";

/// The categories of an ignore file, in the order in which they are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IgnoreCategoryKind {
	Build,
	Cache,
	Logs,
	External,
	Generated,
	Other,
}

impl IgnoreCategoryKind {
	pub const ALL: [Self; 6] = [
		Self::Build,
		Self::Cache,
		Self::Logs,
		Self::External,
		Self::Generated,
		Self::Other,
	];

	/// The text of the `# === Heading ===` line. It must never change, since it is used to recognize the category in existing files.
	pub const fn heading(self) -> &'static str {
		match self {
			Self::Build => "Build Files",
			Self::Cache => "Cache Files",
			Self::Logs => "Log Files",
			Self::External => "External Files",
			Self::Generated => "Generated Files",
			Self::Other => "Other Files",
		}
	}

	pub const fn description(self) -> &'static [&'static str] {
		match self {
			Self::Build => &["Files which are the result of transforming other files in the project"],
			Self::Cache => &["Generated by tools for caching"],
			Self::Logs => &["Log output files intended to be read by people rather than the project"],
			Self::External => &["Files commonly created by the OS or tools not defined in this project"],
			Self::Generated => &["Files generated by tools from the project"],
			Self::Other => &["Patterns which do not belong to any of the categories above"],
		}
	}

	/// The patterns that every `.gitignore` generated by this tool contains.
	pub const fn default_patterns(self) -> &'static [&'static str] {
		match self {
			Self::Build | Self::Other => &[],
			Self::Cache => &[
				"node_modules/",
				".*cache",
				".jest",
				"*.tsbuildinfo",
				".yarn/*",
				"!.yarn/patches",
				"!.yarn/plugins",
				"!.yarn/releases",
				"!.yarn/sdks",
				"!.yarn/versions",
			],
			Self::Logs => &["*.log", ".coverage/"],
			Self::External => &[".DS_Store", ".*.swp", "._*"],
			Self::Generated => &["/package-lock.json"],
		}
	}

	fn from_heading(heading: &str) -> Self {
		Self::ALL
			.into_iter()
			.find(|kind| kind.heading() == heading)
			.unwrap_or(Self::Other)
	}
}

/// A section of an ignore file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnoreCategory {
	pub kind: IgnoreCategoryKind,
	/// The lines below the heading and description, kept verbatim.
	pub raw_lines: Vec<String>,
}

impl IgnoreCategory {
	const fn new(kind: IgnoreCategoryKind) -> Self {
		Self {
			kind,
			raw_lines: Vec::new(),
		}
	}

	/// The patterns of this category, without comments and blank lines.
	pub fn patterns(&self) -> impl Iterator<Item = &str> {
		self
			.raw_lines
			.iter()
			.map(|line| line.trim())
			.filter(|line| !line.is_empty() && !line.starts_with('#'))
	}

	fn trim_end(&mut self) {
		while self
			.raw_lines
			.last()
			.is_some_and(|line| line.trim().is_empty())
		{
			self.raw_lines.pop();
		}
	}

	fn render_into(&self, lines: &mut Vec<String>, raw: bool) {
		lines.push(format!("# === {} ===", self.kind.heading()));

		for line in self.kind.description() {
			lines.push(format!("# {line}"));
		}

		if raw {
			lines.extend(self.raw_lines.iter().cloned());
		} else {
			lines.extend(self.patterns().map(str::to_string));
		}
	}
}

/// A `.gitignore` file, with every line assigned to one of the [`IgnoreCategoryKind`]s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnoredFiles {
	categories: Vec<IgnoreCategory>,
}

impl Default for IgnoredFiles {
	fn default() -> Self {
		Self {
			categories: IgnoreCategoryKind::ALL
				.into_iter()
				.map(IgnoreCategory::new)
				.collect(),
		}
	}
}

impl IgnoredFiles {
	/// A model that contains the default patterns of every category.
	pub fn with_defaults() -> Self {
		let mut ignored = Self::default();
		ignored.ensure_defaults();
		ignored
	}

	pub fn parse(contents: &str) -> Self {
		let mut ignored = Self::default();
		let mut current = IgnoreCategoryKind::Other;
		let mut is_description = true;

		for line in contents.split('\n') {
			let line = line.strip_suffix('\r').unwrap_or(line);
			let trimmed = line.trim();

			if let Some(heading) = HEADING_REGEX
				.captures(trimmed)
				.and_then(|caps| caps.get(1))
			{
				ignored.category_mut(current).trim_end();
				current = IgnoreCategoryKind::from_heading(heading.as_str());
				is_description = true;
				continue;
			}

			if is_description && trimmed.starts_with('#') {
				continue;
			}

			is_description = false;
			ignored
				.category_mut(current)
				.raw_lines
				.push(line.to_string());
		}

		ignored.category_mut(current).trim_end();

		ignored
	}

	pub fn categories(&self) -> &[IgnoreCategory] {
		&self.categories
	}

	pub fn category(&self, kind: IgnoreCategoryKind) -> &IgnoreCategory {
		// Every kind is created in the constructor, in the order of `IgnoreCategoryKind::ALL`
		&self.categories[kind as usize]
	}

	fn category_mut(&mut self, kind: IgnoreCategoryKind) -> &mut IgnoreCategory {
		&mut self.categories[kind as usize]
	}

	/// All the patterns of the file, in order.
	pub fn patterns(&self) -> impl Iterator<Item = &str> {
		self
			.categories
			.iter()
			.flat_map(IgnoreCategory::patterns)
	}

	/// Adds a pattern to a category, unless it is already present anywhere in the file. Returns true if the pattern was added.
	pub fn ensure_pattern(&mut self, kind: IgnoreCategoryKind, pattern: &str) -> bool {
		let pattern = pattern.trim();

		if pattern.is_empty() || self.patterns().any(|existing| existing == pattern) {
			return false;
		}

		self
			.category_mut(kind)
			.raw_lines
			.push(pattern.to_string());

		true
	}

	pub fn ensure_defaults(&mut self) {
		for kind in IgnoreCategoryKind::ALL {
			for pattern in kind.default_patterns() {
				self.ensure_pattern(kind, pattern);
			}
		}
	}

	fn render_categories(&self, raw: bool) -> String {
		self
			.categories
			.iter()
			.map(|category| {
				let mut lines = Vec::new();
				category.render_into(&mut lines, raw);
				lines.join("\n")
			})
			.collect::<Vec<_>>()
			.join("\n\n")
	}

	/// Renders the model as a `.gitignore` file.
	pub fn render(&self) -> String {
		format!("{GITIGNORE_HEADER}\n\n{}\n", self.render_categories(true))
	}

	/// Renders an ignore file for another tool, followed by the custom patterns defined in `config/<file_name>`.
	pub fn render_derived(&self, file_name: &str, custom_patterns: &str) -> String {
		format!(
			"# DO NOT MODIFY\n# This file is auto-generated (make changes to ./config/{file_name} instead)\n\n{}\n\n# === {CUSTOM_PATTERNS_HEADING} ===\n# Rules from ./config/{file_name} will appear below\n\n{}\n",
			self.render_categories(false),
			custom_patterns.trim()
		)
	}
}

/// Converts a `.gitignore` pattern into the globs that exclude the same files in a `tsconfig.json` file.
///
/// Negated patterns cannot be expressed and produce no globs.
pub fn gitignore_pattern_to_ts_globs(pattern: &str) -> Vec<String> {
	if pattern.starts_with('!') {
		return Vec::new();
	}

	let pattern = pattern.trim_end_matches('/');

	let prefix = if pattern.starts_with('/') { "." } else { "**/" };
	let suffix = if pattern.ends_with("**") { "/*" } else { "" };

	let mut globs = vec![format!("{prefix}{pattern}{suffix}")];

	if !pattern.ends_with('*') {
		globs.push(format!("{prefix}{pattern}/**/*"));
	}

	globs
}

#[cfg(test)]
mod test {
	use pretty_assertions::assert_eq;

	use super::*;

	const USER_GITIGNORE: &str = r"# My project
# === Build Files ===
# Files which are the result of transforming other files in the project
dist/

# keep the old output too
/out

# === Unknown Section ===
secrets.txt

# === Log Files ===
# Log output files intended to be read by people rather than the project
*.log


";

	#[test]
	fn round_trip() {
		let rendered = IgnoredFiles::parse(USER_GITIGNORE).render();

		assert_eq!(IgnoredFiles::parse(&rendered).render(), rendered);

		let defaults = IgnoredFiles::with_defaults().render();

		assert_eq!(IgnoredFiles::parse(&defaults).render(), defaults);
	}

	#[test]
	fn user_lines_stay_in_their_category() {
		let ignored = IgnoredFiles::parse(USER_GITIGNORE);

		assert_eq!(
			ignored.category(IgnoreCategoryKind::Build).raw_lines,
			vec!["dist/", "", "# keep the old output too", "/out"]
		);
		assert_eq!(
			ignored
				.category(IgnoreCategoryKind::Other)
				.patterns()
				.collect::<Vec<_>>(),
			vec!["secrets.txt"]
		);
		assert_eq!(
			ignored.category(IgnoreCategoryKind::Logs).raw_lines,
			vec!["*.log"]
		);
	}

	#[test]
	fn patterns_are_not_duplicated() {
		let mut ignored = IgnoredFiles::parse(USER_GITIGNORE);

		assert!(!ignored.ensure_pattern(IgnoreCategoryKind::Build, "dist/"));
		assert!(!ignored.ensure_pattern(IgnoreCategoryKind::Generated, "*.log"));
		assert!(ignored.ensure_pattern(IgnoreCategoryKind::Generated, "/.eslintrc.js"));

		ignored.ensure_defaults();
		let once = ignored.render();
		ignored.ensure_defaults();

		assert_eq!(ignored.render(), once);
	}

	#[test]
	fn fresh_gitignore() {
		let mut ignored = IgnoredFiles::default();
		ignored.ensure_pattern(IgnoreCategoryKind::Build, "dist/");

		assert_eq!(
			ignored.render(),
			r#"# DO NOT CHANGE THE STRUCTURE OF THIS FILE
# You may add extra patterns but do not change the "=== HEADING ===" comments or provided patterns

# === Build Files ===
# Files which are the result of transforming other files in the project
dist/

# === Cache Files ===
# Generated by tools for caching

# === Log Files ===
# Log output files intended to be read by people rather than the project

# === External Files ===
# Files commonly created by the OS or tools not defined in this project

# === Generated Files ===
# Files generated by tools from the project

# === Other Files ===
# Patterns which do not belong to any of the categories above
"#
		);
	}

	#[test]
	fn derived_files_have_custom_trailer() {
		let mut ignored = IgnoredFiles::default();
		ignored.ensure_pattern(IgnoreCategoryKind::Build, "dist/");

		let rendered = ignored.render_derived(".eslintignore", "\n/legacy\n");

		assert!(rendered.starts_with(
			"# DO NOT MODIFY\n# This file is auto-generated (make changes to ./config/.eslintignore instead)\n\n# === Build Files ==="
		));
		assert!(rendered.ends_with(
			"# === Custom Ignore Patterns ===\n# Rules from ./config/.eslintignore will appear below\n\n/legacy\n"
		));
	}

	#[test]
	fn ts_globs() {
		assert_eq!(
			gitignore_pattern_to_ts_globs("/dist"),
			vec!["./dist", "./dist/**/*"]
		);
		assert_eq!(
			gitignore_pattern_to_ts_globs("node_modules/"),
			vec!["**/node_modules", "**/node_modules/**/*"]
		);
		assert_eq!(gitignore_pattern_to_ts_globs("*.log"), vec!["**/*.log"]);
		assert_eq!(gitignore_pattern_to_ts_globs("/.yarn/**"), vec!["./.yarn/**/*"]);
		assert!(gitignore_pattern_to_ts_globs("!.yarn/sdks").is_empty());
	}
}
