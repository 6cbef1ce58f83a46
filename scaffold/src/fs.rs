use std::{
	io::ErrorKind,
	sync::{
		Mutex, PoisonError,
		atomic::{AtomicUsize, Ordering},
	},
};

use crate::*;

/// The file system operations needed to generate a project.
///
/// All paths are relative to [`ProjectFs::root`].
#[async_trait]
pub trait ProjectFs: Send + Sync {
	/// The root directory of the project.
	fn root(&self) -> &Path;

	/// Reads a file, returning `None` if it does not exist.
	async fn read_to_string(&self, path: &Path) -> ScaffoldResult<Option<String>>;

	async fn exists(&self, path: &Path) -> ScaffoldResult<bool>;

	/// The names of the directories inside `path`, sorted. A missing directory has no entries.
	async fn list_dirs(&self, path: &Path) -> ScaffoldResult<Vec<String>>;

	/// Writes a file, creating its parent directories if needed. Executable files are given the `0o755` mode.
	async fn write(&self, path: &Path, contents: &str, executable: bool) -> ScaffoldResult;

	/// The permission bits of a file, if the platform has them and the file exists.
	async fn mode(&self, path: &Path) -> ScaffoldResult<Option<u32>>;

	async fn set_mode(&self, path: &Path, mode: u32) -> ScaffoldResult;
}

/// A [`ProjectFs`] backed by the real file system.
#[derive(Debug, Clone)]
pub struct DiskFs {
	root: PathBuf,
}

impl DiskFs {
	pub fn new(root: impl AsRef<Path>) -> ScaffoldResult<Self> {
		let root = root.as_ref();

		let root = std::path::absolute(root).map_err(|e| ScaffoldError::ReadError {
			path: root.to_path_buf(),
			source: e,
		})?;

		Ok(Self { root })
	}
}

#[async_trait]
impl ProjectFs for DiskFs {
	fn root(&self) -> &Path {
		&self.root
	}

	async fn read_to_string(&self, path: &Path) -> ScaffoldResult<Option<String>> {
		let full_path = self.root.join(path);

		match tokio::fs::read_to_string(&full_path).await {
			Ok(contents) => Ok(Some(contents)),
			Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
			Err(e) => Err(ScaffoldError::ReadError {
				path: full_path,
				source: e,
			}),
		}
	}

	async fn exists(&self, path: &Path) -> ScaffoldResult<bool> {
		let full_path = self.root.join(path);

		tokio::fs::try_exists(&full_path)
			.await
			.map_err(|e| ScaffoldError::ReadError {
				path: full_path,
				source: e,
			})
	}

	async fn list_dirs(&self, path: &Path) -> ScaffoldResult<Vec<String>> {
		let full_path = self.root.join(path);

		let mut entries = match tokio::fs::read_dir(&full_path).await {
			Ok(entries) => entries,
			Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
			Err(e) => {
				return Err(ScaffoldError::ReadError {
					path: full_path,
					source: e,
				});
			}
		};

		let map_err = |e| ScaffoldError::ReadError {
			path: full_path.clone(),
			source: e,
		};

		let mut dirs = Vec::new();

		while let Some(entry) = entries.next_entry().await.map_err(map_err)? {
			if entry.file_type().await.map_err(map_err)?.is_dir() {
				dirs.push(entry.file_name().to_string_lossy().to_string());
			}
		}

		dirs.sort();

		Ok(dirs)
	}

	async fn write(&self, path: &Path, contents: &str, executable: bool) -> ScaffoldResult {
		let full_path = self.root.join(path);

		if let Some(parent) = full_path.parent() {
			tokio::fs::create_dir_all(parent)
				.await
				.map_err(|e| ScaffoldError::DirCreation {
					path: parent.to_path_buf(),
					source: e,
				})?;
		}

		tokio::fs::write(&full_path, contents)
			.await
			.map_err(|e| ScaffoldError::WriteError {
				path: full_path.clone(),
				source: e,
			})?;

		if executable {
			self.set_mode(path, 0o755).await?;
		}

		Ok(())
	}

	#[cfg(unix)]
	async fn mode(&self, path: &Path) -> ScaffoldResult<Option<u32>> {
		use std::os::unix::fs::PermissionsExt;

		let full_path = self.root.join(path);

		match tokio::fs::metadata(&full_path).await {
			Ok(metadata) => Ok(Some(metadata.permissions().mode())),
			Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
			Err(e) => Err(ScaffoldError::ReadError {
				path: full_path,
				source: e,
			}),
		}
	}

	#[cfg(not(unix))]
	async fn mode(&self, _path: &Path) -> ScaffoldResult<Option<u32>> {
		Ok(None)
	}

	#[cfg(unix)]
	async fn set_mode(&self, path: &Path, mode: u32) -> ScaffoldResult {
		use std::os::unix::fs::PermissionsExt;

		let full_path = self.root.join(path);

		tokio::fs::set_permissions(&full_path, std::fs::Permissions::from_mode(mode))
			.await
			.map_err(|e| ScaffoldError::PermissionsError {
				path: full_path,
				source: e,
			})
	}

	#[cfg(not(unix))]
	async fn set_mode(&self, _path: &Path, _mode: u32) -> ScaffoldResult {
		Ok(())
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct MemoryFile {
	contents: String,
	mode: u32,
}

/// An in-memory [`ProjectFs`] that counts the modifications made to it.
#[derive(Debug, Default)]
pub struct MemoryFs {
	root: PathBuf,
	files: Mutex<BTreeMap<PathBuf, MemoryFile>>,
	writes: AtomicUsize,
	mode_changes: AtomicUsize,
}

impl MemoryFs {
	/// Creates an empty file system. The last component of `root` is used as the project name.
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self {
			root: root.into(),
			..Default::default()
		}
	}

	/// Adds a file without counting it as a write.
	#[must_use]
	pub fn with_file(self, path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
		self.insert(path.into(), contents.into(), 0o644);
		self
	}

	/// Adds a file with the given permission bits without counting it as a write.
	#[must_use]
	pub fn with_file_mode(self, path: impl Into<PathBuf>, contents: impl Into<String>, mode: u32) -> Self {
		self.insert(path.into(), contents.into(), mode);
		self
	}

	fn insert(&self, path: PathBuf, contents: String, mode: u32) {
		self
			.files
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.insert(path, MemoryFile { contents, mode });
	}

	pub fn contents(&self, path: impl AsRef<Path>) -> Option<String> {
		self
			.files
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.get(path.as_ref())
			.map(|file| file.contents.clone())
	}

	pub fn file_mode(&self, path: impl AsRef<Path>) -> Option<u32> {
		self
			.files
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.get(path.as_ref())
			.map(|file| file.mode)
	}

	pub fn paths(&self) -> Vec<PathBuf> {
		self
			.files
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.keys()
			.cloned()
			.collect()
	}

	/// How many times a file was written.
	pub fn writes(&self) -> usize {
		self.writes.load(Ordering::SeqCst)
	}

	/// How many times the permissions of a file were changed.
	pub fn mode_changes(&self) -> usize {
		self.mode_changes.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl ProjectFs for MemoryFs {
	fn root(&self) -> &Path {
		&self.root
	}

	async fn read_to_string(&self, path: &Path) -> ScaffoldResult<Option<String>> {
		Ok(self.contents(path))
	}

	async fn exists(&self, path: &Path) -> ScaffoldResult<bool> {
		let files = self.files.lock().unwrap_or_else(PoisonError::into_inner);

		Ok(files.contains_key(path) || files.keys().any(|file| file.starts_with(path)))
	}

	async fn list_dirs(&self, path: &Path) -> ScaffoldResult<Vec<String>> {
		let files = self.files.lock().unwrap_or_else(PoisonError::into_inner);

		let dirs: BTreeSet<String> = files
			.keys()
			.filter_map(|file| file.strip_prefix(path).ok())
			.filter_map(|rest| {
				let mut components = rest.components();
				let first = components.next()?;
				// Only components followed by something else are directories
				components
					.next()
					.map(|_| first.as_os_str().to_string_lossy().to_string())
			})
			.collect();

		Ok(dirs.into_iter().collect())
	}

	async fn write(&self, path: &Path, contents: &str, executable: bool) -> ScaffoldResult {
		self.writes.fetch_add(1, Ordering::SeqCst);

		self.insert(
			path.to_path_buf(),
			contents.to_string(),
			if executable { 0o755 } else { 0o644 },
		);

		Ok(())
	}

	async fn mode(&self, path: &Path) -> ScaffoldResult<Option<u32>> {
		Ok(self.file_mode(path))
	}

	async fn set_mode(&self, path: &Path, mode: u32) -> ScaffoldResult {
		self.mode_changes.fetch_add(1, Ordering::SeqCst);

		if let Some(file) = self
			.files
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.get_mut(path)
		{
			file.mode = mode;
		}

		Ok(())
	}
}

/// Reads a file from the project, joining the path segments first.
pub(crate) async fn read_segments(fs: &dyn ProjectFs, segments: &[&str]) -> ScaffoldResult<Option<String>> {
	let path: PathBuf = segments.iter().collect();

	fs.read_to_string(&path).await
}

#[cfg(test)]
mod test {
	use pretty_assertions::assert_eq;

	use super::*;

	#[tokio::test]
	async fn directories_are_listed() -> ScaffoldResult {
		let fs = MemoryFs::new("/projects/app")
			.with_file("packages/core/package.json", "{}")
			.with_file("packages/core/src/index.ts", "")
			.with_file("packages/cli/package.json", "{}")
			.with_file("packages/README.md", "");

		assert_eq!(fs.list_dirs(Path::new("packages")).await?, vec!["cli", "core"]);
		assert!(fs.list_dirs(Path::new("missing")).await?.is_empty());

		Ok(())
	}

	#[tokio::test]
	async fn disk_directories_are_listed() -> ScaffoldResult {
		let root = std::env::temp_dir().join(format!("skit-list-dirs-{}", std::process::id()));
		let fs = DiskFs::new(&root)?;

		fs.write(Path::new("packages/core/package.json"), "{}", false).await?;
		fs.write(Path::new("packages/notes.txt"), "", false).await?;

		assert_eq!(fs.list_dirs(Path::new("packages")).await?, vec!["core"]);

		let _ = std::fs::remove_dir_all(&root);

		Ok(())
	}
}
