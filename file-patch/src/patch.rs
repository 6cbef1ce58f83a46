use super::*;

/// A set of targeted modifications to a [`Value`].
///
/// A [`Patch::Map`] descends into the keys of an object (or into the indexes of an array, written as numeric strings), while the other variants act on the value found at that position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Patch {
	Map(IndexMap<String, Self>),
	/// Replaces the target.
	Set(Value),
	/// Pushes into the target if it is an array, or turns it into a one-element array.
	Append(Value),
	/// Removes the target.
	Delete,
}

impl Patch {
	pub fn set<T: Into<Value>>(value: T) -> Self {
		Self::Set(value.into())
	}

	pub fn append<T: Into<Value>>(value: T) -> Self {
		Self::Append(value.into())
	}
}

impl<K: Into<String>> FromIterator<(K, Self)> for Patch {
	fn from_iter<T: IntoIterator<Item = (K, Self)>>(iter: T) -> Self {
		Self::Map(
			iter
				.into_iter()
				.map(|(key, patch)| (key.into(), patch))
				.collect(),
		)
	}
}

/// The net result of applying a list of patches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchOutcome {
	/// Nothing was modified, so the original data (or its absence) is still valid.
	Unchanged,
	Changed(Value),
	/// The data was removed entirely.
	Removed,
}

/// Applies a patch to some (possibly absent) data.
///
/// `None` stands for an absent value. When no directive in the whole patch tree modifies anything, the original reference is returned as [`Cow::Borrowed`], which callers can use to skip writes.
pub fn apply_patch<'a>(data: Option<&'a Value>, patch: &Patch) -> Option<Cow<'a, Value>> {
	match patch {
		Patch::Set(value) => match data {
			Some(current) if current == value => Some(Cow::Borrowed(current)),
			_ => Some(Cow::Owned(value.clone())),
		},
		Patch::Append(value) => {
			let mut items = match data {
				Some(Value::Array(items)) => items.clone(),
				_ => Vec::new(),
			};

			items.push(value.clone());

			Some(Cow::Owned(Value::Array(items)))
		}
		Patch::Delete => None,
		Patch::Map(children) => {
			let modified = match data {
				Some(Value::Array(items)) => patch_array(items, children).map(Value::Array),
				Some(Value::Object(map)) => patch_object(Some(map), children).map(Value::Object),
				_ => patch_object(None, children).map(Value::Object),
			};

			match modified {
				Some(value) => Some(Cow::Owned(value)),
				None => data.map(Cow::Borrowed),
			}
		}
	}
}

/// Folds a list of patches over some data, in order.
pub fn apply_patches(data: Option<&Value>, patches: &[Patch]) -> PatchOutcome {
	fold_patches(data, patches, apply_patch)
}

pub(crate) fn fold_patches<F>(data: Option<&Value>, patches: &[Patch], apply: F) -> PatchOutcome
where
	F: for<'a> Fn(Option<&'a Value>, &Patch) -> Option<Cow<'a, Value>>,
{
	let mut current: Option<Value> = None;
	let mut changed = false;

	for patch in patches {
		let base = if changed { current.as_ref() } else { data };

		let next = match apply(base, patch) {
			Some(Cow::Borrowed(_)) => continue,
			Some(Cow::Owned(value)) => Some(value),
			None if base.is_none() => continue,
			None => None,
		};

		current = next;
		changed = true;
	}

	if !changed {
		PatchOutcome::Unchanged
	} else if let Some(value) = current {
		PatchOutcome::Changed(value)
	} else {
		PatchOutcome::Removed
	}
}

// Returns a new map only if something changed
fn patch_object(
	map: Option<&Map<String, Value>>,
	children: &IndexMap<String, Patch>,
) -> Option<Map<String, Value>> {
	let mut copy: Option<Map<String, Value>> = None;

	for (key, child_patch) in children {
		let current = map.and_then(|map| map.get(key));

		match apply_patch(current, child_patch) {
			None => {
				if current.is_some() {
					copy
						.get_or_insert_with(|| map.cloned().unwrap_or_default())
						.shift_remove(key);
				}
			}
			Some(Cow::Borrowed(_)) => {}
			Some(Cow::Owned(value)) => {
				copy
					.get_or_insert_with(|| map.cloned().unwrap_or_default())
					.insert(key.clone(), value);
			}
		}
	}

	copy
}

// Indexes always refer to the positions in the original array, so removals happen last.
fn patch_array(items: &[Value], children: &IndexMap<String, Patch>) -> Option<Vec<Value>> {
	let mut copy: Option<Vec<Value>> = None;
	let mut removed: Vec<usize> = Vec::new();

	for (key, child_patch) in children {
		let Ok(index) = key.parse::<usize>() else {
			continue;
		};

		let current = items.get(index);

		match apply_patch(current, child_patch) {
			None => {
				if current.is_some() {
					removed.push(index);
				}
			}
			Some(Cow::Borrowed(_)) => {}
			Some(Cow::Owned(value)) => {
				let copy = copy.get_or_insert_with(|| items.to_vec());

				if index >= copy.len() {
					copy.resize(index + 1, Value::Null);
				}

				copy[index] = value;
			}
		}
	}

	if !removed.is_empty() {
		let copy = copy.get_or_insert_with(|| items.to_vec());

		removed.sort_unstable();
		removed.dedup();

		for index in removed.into_iter().rev() {
			copy.remove(index);
		}
	}

	copy
}
