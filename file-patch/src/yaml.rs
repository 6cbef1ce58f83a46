use std::ops::Range;

use serde_yaml_ng::{Mapping, Value as YamlValue};

use super::*;

const DEFAULT_INDENT: usize = 2;

/// YAML documents.
///
/// When serializing on top of the previous contents of a file whose root is a block mapping, only the entries that were added, removed or changed are rewritten. Comments, anchors and aliases in the rest of the document stay as they were.
#[derive(Debug, Clone, Copy, Default)]
pub struct Yaml;

impl FileFormat for Yaml {
	fn name(&self) -> &'static str {
		"YAML"
	}

	fn deserialize(&self, text: &str) -> Result<Value, FormatError> {
		if is_blank(text) {
			return Ok(Value::Null);
		}

		Ok(serde_yaml_ng::from_str(text)?)
	}

	fn serialize(&self, data: &Value, previous: Option<&str>) -> Result<String, FormatError> {
		let target = serde_yaml_ng::to_value(data)?;

		let Some(text) = previous else {
			return Ok(serde_yaml_ng::to_string(&target)?);
		};

		if let (Some(YamlValue::Mapping(current)), YamlValue::Mapping(target)) = (parse_root(text)?, &target) {
			return patch_mapping_document(text, &current, target);
		}

		Ok(format!(
			"{}{}",
			comment_header(text),
			serde_yaml_ng::to_string(&target)?
		))
	}
}

/// Merges the YAML document in `b` into the one in `a`.
///
/// If either document is empty, the other one is returned as is. If both are mappings, they are merged recursively like [`DeepMerge`] does, and only the entries of `a` affected by the merge are rewritten. Otherwise, `b` is returned if `overwrite` is true, and `a` if it's not.
pub fn merge_yaml(a: &str, b: &str, overwrite: bool) -> Result<String, FormatError> {
	let Some(doc_b) = parse_root(b)? else {
		return Ok(a.to_string());
	};

	let Some(doc_a) = parse_root(a)? else {
		return Ok(b.to_string());
	};

	match (doc_a, doc_b) {
		(YamlValue::Mapping(mapping_a), YamlValue::Mapping(mapping_b)) => {
			let mut merged = mapping_a.clone();
			merged.deep_merge(mapping_b, overwrite);

			patch_mapping_document(a, &mapping_a, &merged)
		}
		_ => Ok(if overwrite { b } else { a }.to_string()),
	}
}

fn parse_root(text: &str) -> Result<Option<YamlValue>, FormatError> {
	if is_blank(text) {
		return Ok(None);
	}

	let value: YamlValue = serde_yaml_ng::from_str(text)?;

	Ok((!value.is_null()).then_some(value))
}

fn is_blank(text: &str) -> bool {
	text.lines().all(|line| {
		let line = line.trim();
		line.is_empty() || line.starts_with('#') || line == "---"
	})
}

// The comment lines that come before any content
fn comment_header(text: &str) -> String {
	let mut header = String::new();

	for line in text.lines() {
		let trimmed = line.trim();

		if trimmed.starts_with('#') {
			header.push_str(line);
			header.push('\n');
		} else if !trimmed.is_empty() {
			break;
		}
	}

	header
}

// Applies the difference between `current` (the data in `text`) and `target` to the text.
// Layouts that can't be edited in place (like flow mappings at the root) are serialized again.
fn patch_mapping_document(text: &str, current: &Mapping, target: &Mapping) -> Result<String, FormatError> {
	if current == target {
		return Ok(text.to_string());
	}

	let lines = scan_lines(text);

	if let Some(root_indent) = lines
		.iter()
		.find(|line| line.kind == LineKind::Content)
		.map(|line| line.indent)
		&& let Some(entries) = parse_mapping(text, &lines, 0..lines.len(), root_indent)
	{
		let mut patcher = Patcher {
			text,
			indent_unit: detect_indent_unit(&lines),
			lines,
			splices: Vec::new(),
		};

		if patcher.patch_mapping(&entries, root_indent, current, target)? {
			return Ok(patcher.finish());
		}
	}

	Ok(format!(
		"{}{}",
		comment_header(text),
		serde_yaml_ng::to_string(target)?
	))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind {
	Blank,
	Comment,
	Content,
}

#[derive(Debug)]
struct Line {
	start: usize,
	// Excludes the line break
	end: usize,
	indent: usize,
	kind: LineKind,
}

fn scan_lines(text: &str) -> Vec<Line> {
	let mut lines = Vec::new();
	let mut start = 0;

	for raw in text.split_inclusive('\n') {
		let content = raw.trim_end_matches(['\n', '\r']);
		let unindented = content.trim_start_matches(' ');
		let indent = content.len() - unindented.len();
		let trimmed = unindented.trim();

		let kind = if trimmed.is_empty() {
			LineKind::Blank
		} else if trimmed.starts_with('#')
			|| (indent == 0 && (trimmed == "---" || trimmed == "..." || trimmed.starts_with('%')))
		{
			LineKind::Comment
		} else {
			LineKind::Content
		};

		lines.push(Line {
			start,
			end: start + content.len(),
			indent,
			kind,
		});

		start += raw.len();
	}

	lines
}

fn detect_indent_unit(lines: &[Line]) -> String {
	let unit = lines
		.iter()
		.filter(|line| line.kind == LineKind::Content && line.indent > 0)
		.map(|line| line.indent)
		.min()
		.unwrap_or(DEFAULT_INDENT);

	" ".repeat(unit)
}

#[derive(Debug)]
enum InlineValue {
	// Nothing after the colon except node properties, so a block collection follows
	Block,
	// A single-line scalar or alias, with its position in the text
	Scalar(Range<usize>),
	// Flow collections and block scalars
	Other,
}

#[derive(Debug)]
struct Entry {
	key: YamlValue,
	key_text: String,
	indent: usize,
	first_line: usize,
	// Trailing blank lines and comments that are not indented further than the key are left out
	end_line: usize,
	value: InlineValue,
}

fn quoted_len(s: &str, quote: u8) -> Option<usize> {
	let bytes = s.as_bytes();
	let mut index = 1;

	while index < bytes.len() {
		match bytes[index] {
			b'\\' if quote == b'"' => index += 2,
			byte if byte == quote => {
				if quote == b'\'' && bytes.get(index + 1) == Some(&b'\'') {
					index += 2;
				} else {
					return Some(index + 1);
				}
			}
			_ => index += 1,
		}
	}

	None
}

fn plain_key_len(s: &str) -> Option<usize> {
	let bytes = s.as_bytes();

	let colon = (0..bytes.len()).find(|&index| {
		bytes[index] == b':'
			&& bytes
				.get(index + 1)
				.is_none_or(|next| matches!(next, b' ' | b'\t'))
	})?;

	let key = &s[..colon];

	if key.contains(" #") {
		return None;
	}

	Some(key.trim_end().len())
}

fn inline_value(text: &str, from: usize, to: usize) -> InlineValue {
	let mut pos = from;

	// Anchors and tags
	loop {
		let rest = &text[pos..to];
		let trimmed = rest.trim_start_matches([' ', '\t']);
		pos = to - trimmed.len();

		if trimmed.starts_with('&') || trimmed.starts_with('!') {
			pos += trimmed.find([' ', '\t']).unwrap_or(trimmed.len());
		} else {
			break;
		}
	}

	let rest = &text[pos..to];

	match rest.as_bytes().first() {
		None | Some(b'#') => InlineValue::Block,
		Some(b'|' | b'>' | b'[' | b'{') => InlineValue::Other,
		Some(quote @ (b'"' | b'\'')) => {
			quoted_len(rest, *quote).map_or(InlineValue::Other, |len| InlineValue::Scalar(pos..pos + len))
		}
		Some(_) => {
			let end = rest
				.find(" #")
				.or_else(|| rest.find("\t#"))
				.unwrap_or(rest.len());

			InlineValue::Scalar(pos..pos + rest[..end].trim_end().len())
		}
	}
}

fn parse_key_line(text: &str, line: &Line, index: usize) -> Option<Entry> {
	let offset = line.start + line.indent;
	let s = &text[offset..line.end];

	let key_len = match s.as_bytes().first()? {
		quote @ (b'"' | b'\'') => quoted_len(s, *quote)?,
		b'-' if s.len() == 1 || s[1..].starts_with([' ', '\t']) => return None,
		b'?' | b'[' | b'{' | b'&' | b'*' | b'!' | b'|' | b'>' | b'%' | b'@' | b'`' | b'#' | b',' => return None,
		_ => plain_key_len(s)?,
	};

	let after_key = s[key_len..].trim_start_matches([' ', '\t']);
	let after_colon = after_key.strip_prefix(':')?;

	if !(after_colon.is_empty() || after_colon.starts_with([' ', '\t'])) {
		return None;
	}

	let key_text = s[..key_len].to_string();
	let key: YamlValue = serde_yaml_ng::from_str(&key_text).ok()?;

	Some(Entry {
		key,
		key_text,
		indent: line.indent,
		first_line: index,
		end_line: index + 1,
		value: inline_value(text, line.end - after_colon.len(), line.end),
	})
}

fn is_sequence_item(text: &str, line: &Line) -> bool {
	let s = &text[line.start + line.indent..line.end];

	s == "-" || s.starts_with("- ") || s.starts_with("-\t")
}

fn is_trailing_trivia(line: &Line, indent: usize) -> bool {
	match line.kind {
		LineKind::Blank => true,
		LineKind::Comment => line.indent <= indent,
		LineKind::Content => false,
	}
}

// The entries of the block mapping whose keys sit at `indent` within `range`.
// Returns `None` for layouts that can't be mapped to entries.
fn parse_mapping(text: &str, lines: &[Line], range: Range<usize>, indent: usize) -> Option<Vec<Entry>> {
	let mut entries: Vec<Entry> = Vec::new();

	for index in range.clone() {
		let line = &lines[index];

		if line.kind != LineKind::Content {
			continue;
		}

		if line.indent < indent {
			return None;
		}

		// Sequences can sit at the same indentation as their key
		let continues_entry = line.indent > indent
			|| (is_sequence_item(text, line)
				&& entries
					.last()
					.is_some_and(|entry| matches!(entry.value, InlineValue::Block)));

		if continues_entry {
			if entries.is_empty() {
				return None;
			}

			continue;
		}

		entries.push(parse_key_line(text, line, index)?);
	}

	let starts: Vec<usize> = entries.iter().map(|entry| entry.first_line).collect();

	for (position, entry) in entries.iter_mut().enumerate() {
		let mut end = starts.get(position + 1).copied().unwrap_or(range.end);

		while end > entry.first_line + 1 && is_trailing_trivia(&lines[end - 1], indent) {
			end -= 1;
		}

		entry.end_line = end;
	}

	Some(entries)
}

struct Splice {
	range: Range<usize>,
	replacement: String,
}

struct Patcher<'a> {
	text: &'a str,
	lines: Vec<Line>,
	indent_unit: String,
	splices: Vec<Splice>,
}

impl Patcher<'_> {
	fn line_start(&self, index: usize) -> usize {
		self
			.lines
			.get(index)
			.map_or(self.text.len(), |line| line.start)
	}

	fn children(&self, entry: &Entry) -> Option<(Vec<Entry>, usize)> {
		if !matches!(entry.value, InlineValue::Block) {
			return None;
		}

		let first_child = (entry.first_line + 1..entry.end_line)
			.find(|&index| self.lines[index].kind == LineKind::Content)?;
		let indent = self.lines[first_child].indent;

		if indent <= entry.indent {
			return None;
		}

		let children = parse_mapping(
			self.text,
			&self.lines,
			entry.first_line + 1..entry.end_line,
			indent,
		)?;

		Some((children, indent))
	}

	// Returns false if the layout of the mapping can't be edited in place
	fn patch_mapping(
		&mut self,
		entries: &[Entry],
		indent: usize,
		current: &Mapping,
		target: &Mapping,
	) -> Result<bool, FormatError> {
		if entries.len() != current.len() {
			return Ok(false);
		}

		for entry in entries {
			let Some(new) = target.get(&entry.key) else {
				self.splices.push(Splice {
					range: self.line_start(entry.first_line)..self.line_start(entry.end_line),
					replacement: String::new(),
				});
				continue;
			};

			let old = current.get(&entry.key);

			if old == Some(new) {
				continue;
			}

			if let (Some(YamlValue::Mapping(old)), YamlValue::Mapping(new)) = (old, new)
				&& let Some((children, child_indent)) = self.children(entry)
			{
				if !self.patch_mapping(&children, child_indent, old, new)? {
					return Ok(false);
				}

				continue;
			}

			self.replace(entry, new)?;
		}

		let additions: Vec<(&YamlValue, &YamlValue)> = target
			.iter()
			.filter(|(key, _)| !entries.iter().any(|entry| entry.key == **key))
			.collect();

		if additions.is_empty() {
			return Ok(true);
		}

		let Some(last) = entries.last() else {
			return Ok(false);
		};

		let padding = " ".repeat(indent);
		let mut rendered = String::new();

		for (key, value) in additions {
			let Some(key_text) = render_inline(key)? else {
				return Ok(false);
			};

			rendered.push_str(&render_entry(&key_text, value, &padding, &self.indent_unit)?);
		}

		let pos = self.line_start(last.end_line);

		if pos == self.text.len() && !self.text.is_empty() && !self.text.ends_with('\n') {
			rendered.insert(0, '\n');
		}

		self.splices.push(Splice {
			range: pos..pos,
			replacement: rendered,
		});

		Ok(true)
	}

	fn replace(&mut self, entry: &Entry, new: &YamlValue) -> Result<(), FormatError> {
		// Single-line scalars are replaced in place, so that the comment after them stays
		if let InlineValue::Scalar(span) = &entry.value
			&& entry.end_line == entry.first_line + 1
			&& let Some(inline) = render_inline(new)?
		{
			self.splices.push(Splice {
				range: span.clone(),
				replacement: inline,
			});

			return Ok(());
		}

		let padding = " ".repeat(entry.indent);
		let rendered = render_entry(&entry.key_text, new, &padding, &self.indent_unit)?;

		self.splices.push(Splice {
			range: self.line_start(entry.first_line)..self.line_start(entry.end_line),
			replacement: rendered,
		});

		Ok(())
	}

	fn finish(self) -> String {
		let mut splices = self.splices;
		splices.sort_by_key(|splice| splice.range.start);

		let mut output = self.text.to_string();

		// Insertions at the same position end up in the order they were made
		for splice in splices.into_iter().rev() {
			output.replace_range(splice.range, &splice.replacement);
		}

		output
	}
}

// Scalars and empty collections that fit on one line
fn render_inline(value: &YamlValue) -> Result<Option<String>, FormatError> {
	match value {
		YamlValue::Mapping(mapping) if !mapping.is_empty() => return Ok(None),
		YamlValue::Sequence(sequence) if !sequence.is_empty() => return Ok(None),
		_ => {}
	}

	let rendered = serde_yaml_ng::to_string(value)?;
	let rendered = rendered.trim_end_matches('\n');

	Ok((!rendered.contains('\n')).then(|| rendered.to_string()))
}

fn render_entry(key_text: &str, value: &YamlValue, padding: &str, unit: &str) -> Result<String, FormatError> {
	if let Some(inline) = render_inline(value)? {
		return Ok(format!("{padding}{key_text}: {inline}\n"));
	}

	let body = serde_yaml_ng::to_string(value)?;
	let mut lines = body.lines();

	let (mut output, nested_padding) = if matches!(value, YamlValue::Mapping(_) | YamlValue::Sequence(_)) {
		(format!("{padding}{key_text}:\n"), format!("{padding}{unit}"))
	} else {
		// Block scalars are already indented below their header
		let header = lines.next().unwrap_or_default();
		(format!("{padding}{key_text}: {header}\n"), padding.to_string())
	};

	for line in lines {
		if !line.is_empty() {
			output.push_str(&nested_padding);
			output.push_str(line);
		}

		output.push('\n');
	}

	Ok(output)
}

#[cfg(test)]
mod test {
	use pretty_assertions::assert_eq;
	use serde_json::json;

	use super::*;

	const GENERATED: &str = "# DO NOT MODIFY\n# This file is generated\nname: CI\nenv:\n  node_version: 14\n";

	const COMMENTED: &str = "# header\nname: CI\n# keep me\nenv:\n  node: 14 # inline\ndefaults: &d\n  x: 1\nuse: *d\n";

	#[test]
	fn empty_documents_yield_the_other_side() -> Result<(), FormatError> {
		assert_eq!(merge_yaml(GENERATED, "", false)?, GENERATED);
		assert_eq!(merge_yaml(GENERATED, "# only comments\n", true)?, GENERATED);
		assert_eq!(merge_yaml("\n", "name: custom\n", false)?, "name: custom\n");

		Ok(())
	}

	#[test]
	fn mappings_are_merged() -> Result<(), FormatError> {
		let overrides = "env:\n  node_version: 16\n  extra: true\njobs:\n  lint: {}\n";

		assert_eq!(
			merge_yaml(GENERATED, overrides, false)?,
			"# DO NOT MODIFY\n# This file is generated\nname: CI\nenv:\n  node_version: 14\n  extra: true\njobs:\n  lint: {}\n"
		);

		assert_eq!(
			merge_yaml(GENERATED, overrides, true)?,
			"# DO NOT MODIFY\n# This file is generated\nname: CI\nenv:\n  node_version: 16\n  extra: true\njobs:\n  lint: {}\n"
		);

		Ok(())
	}

	#[test]
	fn comments_and_anchors_survive_merges() -> Result<(), FormatError> {
		assert_eq!(
			merge_yaml(COMMENTED, "extra: true\n", false)?,
			format!("{COMMENTED}extra: true\n")
		);

		assert_eq!(
			merge_yaml(COMMENTED, "env:\n  node: 16\n", true)?,
			"# header\nname: CI\n# keep me\nenv:\n  node: 16 # inline\ndefaults: &d\n  x: 1\nuse: *d\n"
		);

		assert_eq!(
			merge_yaml(COMMENTED, "defaults:\n  y: 2\n", false)?,
			"# header\nname: CI\n# keep me\nenv:\n  node: 14 # inline\ndefaults: &d\n  x: 1\n  y: 2\nuse: *d\n"
		);

		Ok(())
	}

	#[test]
	fn collections_are_added_with_the_document_indentation() -> Result<(), FormatError> {
		let workflow = "jobs:\n    test:\n        runs-on: ubuntu-latest # fixed\n";

		assert_eq!(
			merge_yaml(workflow, "jobs:\n  test:\n    steps:\n      - run: yarn test\n", false)?,
			"jobs:\n    test:\n        runs-on: ubuntu-latest # fixed\n        steps:\n            - run: yarn test\n"
		);

		Ok(())
	}

	#[test]
	fn entries_are_removed_and_replaced_in_place() -> Result<(), FormatError> {
		let text = "# c\na: 1 # one\n# about b\nb: 2 # two\nc:\n  - x\n";

		assert_eq!(
			Yaml.serialize(&json!({ "b": 2, "c": ["x"] }), Some(text))?,
			"# c\n# about b\nb: 2 # two\nc:\n  - x\n"
		);

		assert_eq!(
			Yaml.serialize(&json!({ "a": 1, "b": "two", "c": { "y": true } }), Some(text))?,
			"# c\na: 1 # one\n# about b\nb: two # two\nc:\n  y: true\n"
		);

		Ok(())
	}

	#[test]
	fn flow_roots_are_serialized_again() -> Result<(), FormatError> {
		assert_eq!(
			merge_yaml("# flow\n{a: 1}\n", "b: 2\n", false)?,
			"# flow\na: 1\nb: 2\n"
		);

		Ok(())
	}

	#[test]
	fn mismatched_roots_fall_back() -> Result<(), FormatError> {
		let list = "- a\n- b\n";
		let mapping = "key: value\n";

		assert_eq!(merge_yaml(list, mapping, false)?, list);
		assert_eq!(merge_yaml(list, mapping, true)?, mapping);

		Ok(())
	}

	#[test]
	fn invalid_documents_are_errors() {
		assert!(matches!(
			merge_yaml("key: [unclosed\n", "other: 1\n", false),
			Err(FormatError::Yaml(_))
		));
	}
}
