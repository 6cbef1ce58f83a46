use super::*;

/// An enum representing formats for the `repository` field in a `package.json` file.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum Repository {
	Path(String),
	Data {
		#[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
		type_: Option<String>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		url: Option<String>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		directory: Option<String>,
	},
}

impl Repository {
	/// A git repository hosted at `repo_url`, optionally pointing to a directory inside it.
	pub fn git(repo_url: &str, directory: Option<&str>) -> Self {
		Self::Data {
			type_: Some("git".to_string()),
			url: Some(format!("{repo_url}.git")),
			directory: directory.map(str::to_string),
		}
	}
}

/// A struct representing the `bugs` field in a `package.json` file.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Bugs {
	/// The url to your project's issue tracker.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub url: Option<String>,

	/// The email address to which issues should be reported.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub email: Option<String>,
}

impl Bugs {
	pub fn from_repo_url(repo_url: &str) -> Self {
		Self {
			url: Some(format!("{repo_url}/issues")),
			email: None,
		}
	}
}

/// The values that can be used to define `access` in a [`PublishConfig`]
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PublishConfigAccess {
	#[default]
	Public,
	Restricted,
}

impl Display for PublishConfigAccess {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Public => write!(f, "public"),
			Self::Restricted => write!(f, "restricted"),
		}
	}
}

impl FromStr for PublishConfigAccess {
	type Err = ManifestError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim() {
			"public" => Ok(Self::Public),
			"restricted" => Ok(Self::Restricted),
			other => Err(ManifestError::InvalidAccess {
				value: other.to_string(),
			}),
		}
	}
}

/// A set of config values that will be used at publish-time. It's especially handy if you want to set the tag, registry or access, so that you can ensure that a given package is not tagged with "latest", published to the global public registry or that a scoped module is private by default.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct PublishConfig {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub access: Option<PublishConfigAccess>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub registry: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub tag: Option<String>,
	#[serde(skip_serializing_if = "BTreeMap::is_empty")]
	#[serde(flatten)]
	pub other: StringBTreeMap,
}

/// The kinds of dependency maps found in a `package.json` file, in the order in which they appear in generated manifests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsDepKind {
	PeerDependency,
	OptionalDependency,
	Dependency,
	DevDependency,
}

impl JsDepKind {
	pub const ALL: [Self; 4] = [
		Self::PeerDependency,
		Self::OptionalDependency,
		Self::Dependency,
		Self::DevDependency,
	];

	/// The name of the manifest key holding this kind of dependency.
	pub const fn key(self) -> &'static str {
		match self {
			Self::PeerDependency => "peerDependencies",
			Self::OptionalDependency => "optionalDependencies",
			Self::Dependency => "dependencies",
			Self::DevDependency => "devDependencies",
		}
	}
}
