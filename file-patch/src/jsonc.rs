use std::{collections::HashSet, ops::Range};

use serde::Serialize;
use serde_json::ser::PrettyFormatter;

use super::*;

const DEFAULT_INDENT: &str = "  ";

/// JSON with comments.
///
/// Line and block comments as well as trailing commas are accepted when reading. When serializing on top of the previous contents of a file, only the regions whose values changed are rewritten, so comments and formatting elsewhere are left as they were.
#[derive(Debug, Clone, Copy, Default)]
pub struct Jsonc;

impl FileFormat for Jsonc {
	fn name(&self) -> &'static str {
		"JSONC"
	}

	fn deserialize(&self, text: &str) -> Result<Value, FormatError> {
		Ok(parse_document(text)?.to_value())
	}

	fn serialize(&self, data: &Value, previous: Option<&str>) -> Result<String, FormatError> {
		match previous {
			Some(text) => patch_document(text, data),
			None => {
				let mut output = render(data, "", DEFAULT_INDENT)?;
				output.push('\n');
				Ok(output)
			}
		}
	}
}

/// Merges `defaults` into the JSONC document in `existing` (or into an empty object if there is none), keeping the comments and formatting of the parts that are not affected.
pub fn merge_json(
	existing: Option<&str>,
	defaults: Map<String, Value>,
	overwrite: bool,
) -> Result<String, FormatError> {
	let previous = existing.unwrap_or("{}");

	let mut data = Jsonc.deserialize(previous)?;

	data.deep_merge(Value::Object(defaults), overwrite);

	Jsonc.serialize(&data, Some(previous))
}

#[derive(Debug)]
struct Node {
	span: Range<usize>,
	kind: NodeKind,
}

#[derive(Debug)]
enum NodeKind {
	Object(Vec<Member>),
	Array(Vec<Node>),
	Scalar(Value),
}

#[derive(Debug)]
struct Member {
	key: String,
	key_start: usize,
	value: Node,
	comma: Option<usize>,
}

impl Node {
	fn to_value(&self) -> Value {
		match &self.kind {
			NodeKind::Scalar(value) => value.clone(),
			NodeKind::Array(items) => Value::Array(items.iter().map(Self::to_value).collect()),
			NodeKind::Object(members) => Value::Object(
				members
					.iter()
					.map(|member| (member.key.clone(), member.value.to_value()))
					.collect(),
			),
		}
	}

	fn matches(&self, value: &Value) -> bool {
		match (&self.kind, value) {
			(NodeKind::Scalar(scalar), value) => scalar == value,
			(NodeKind::Array(items), Value::Array(values)) => {
				items.len() == values.len()
					&& items
						.iter()
						.zip(values)
						.all(|(item, value)| item.matches(value))
			}
			(NodeKind::Object(_), Value::Object(_)) => self.to_value() == *value,
			_ => false,
		}
	}
}

struct Parser<'a> {
	text: &'a str,
	pos: usize,
}

impl Parser<'_> {
	fn peek(&self) -> Option<u8> {
		self.text.as_bytes().get(self.pos).copied()
	}

	fn error_at(&self, pos: usize, message: impl Into<String>) -> FormatError {
		let (line, column) = line_and_column(self.text, pos);

		FormatError::Syntax {
			format: "JSONC",
			line,
			column,
			message: message.into(),
		}
	}

	fn error(&self, message: impl Into<String>) -> FormatError {
		self.error_at(self.pos, message)
	}

	fn skip_trivia(&mut self) -> Result<(), FormatError> {
		loop {
			match self.peek() {
				Some(b' ' | b'\t' | b'\n' | b'\r') => self.pos += 1,
				Some(b'/') => match self.text.as_bytes().get(self.pos + 1) {
					Some(b'/') => {
						self.pos = self.text[self.pos..]
							.find('\n')
							.map_or(self.text.len(), |offset| self.pos + offset);
					}
					Some(b'*') => {
						let end = self.text[self.pos + 2..]
							.find("*/")
							.ok_or_else(|| self.error("unterminated block comment"))?;

						self.pos += end + 4;
					}
					_ => return Err(self.error("unexpected character `/`")),
				},
				_ => return Ok(()),
			}
		}
	}

	fn parse_value(&mut self) -> Result<Node, FormatError> {
		self.skip_trivia()?;

		let start = self.pos;

		match self.peek() {
			None => Err(self.error("unexpected end of input")),
			Some(b'{') => self.parse_object(),
			Some(b'[') => self.parse_array(),
			Some(b'"') => {
				let value = self.parse_string()?;

				Ok(Node {
					span: start..self.pos,
					kind: NodeKind::Scalar(Value::String(value)),
				})
			}
			Some(_) => self.parse_literal(),
		}
	}

	fn parse_string(&mut self) -> Result<String, FormatError> {
		let start = self.pos;
		self.pos += 1;

		loop {
			match self.peek() {
				None | Some(b'\n') => return Err(self.error_at(start, "unterminated string")),
				Some(b'\\') => self.pos += 2,
				Some(b'"') => {
					self.pos += 1;
					break;
				}
				Some(_) => self.pos += 1,
			}
		}

		serde_json::from_str(&self.text[start..self.pos])
			.map_err(|e| self.error_at(start, format!("invalid string: {e}")))
	}

	fn parse_literal(&mut self) -> Result<Node, FormatError> {
		let start = self.pos;

		while let Some(byte) = self.peek() {
			if byte.is_ascii_alphanumeric() || matches!(byte, b'+' | b'-' | b'.') {
				self.pos += 1;
			} else {
				break;
			}
		}

		if start == self.pos {
			let found = self.text[start..].chars().next().unwrap_or_default();

			return Err(self.error(format!("unexpected character `{found}`")));
		}

		let raw = &self.text[start..self.pos];

		let value: Value = serde_json::from_str(raw)
			.map_err(|_| self.error_at(start, format!("invalid value `{raw}`")))?;

		Ok(Node {
			span: start..self.pos,
			kind: NodeKind::Scalar(value),
		})
	}

	fn parse_object(&mut self) -> Result<Node, FormatError> {
		let start = self.pos;
		self.pos += 1;

		let mut members = Vec::new();

		loop {
			self.skip_trivia()?;

			match self.peek() {
				Some(b'}') => {
					self.pos += 1;
					break;
				}
				Some(b'"') => {}
				Some(_) => return Err(self.error("expected a string key or `}`")),
				None => return Err(self.error_at(start, "unterminated object")),
			}

			let key_start = self.pos;
			let key = self.parse_string()?;

			self.skip_trivia()?;

			if self.peek() != Some(b':') {
				return Err(self.error("expected `:` after the key"));
			}

			self.pos += 1;

			let value = self.parse_value()?;

			self.skip_trivia()?;

			let comma = match self.peek() {
				Some(b',') => {
					self.pos += 1;
					Some(self.pos - 1)
				}
				Some(b'}') => None,
				_ => return Err(self.error("expected `,` or `}`")),
			};

			members.push(Member {
				key,
				key_start,
				value,
				comma,
			});
		}

		Ok(Node {
			span: start..self.pos,
			kind: NodeKind::Object(members),
		})
	}

	fn parse_array(&mut self) -> Result<Node, FormatError> {
		let start = self.pos;
		self.pos += 1;

		let mut items = Vec::new();

		loop {
			self.skip_trivia()?;

			match self.peek() {
				Some(b']') => {
					self.pos += 1;
					break;
				}
				None => return Err(self.error_at(start, "unterminated array")),
				Some(_) => {}
			}

			items.push(self.parse_value()?);

			self.skip_trivia()?;

			match self.peek() {
				Some(b',') => self.pos += 1,
				Some(b']') => {}
				_ => return Err(self.error("expected `,` or `]`")),
			}
		}

		Ok(Node {
			span: start..self.pos,
			kind: NodeKind::Array(items),
		})
	}
}

fn parse_document(text: &str) -> Result<Node, FormatError> {
	let mut parser = Parser {
		text,
		pos: if text.starts_with('\u{feff}') { 3 } else { 0 },
	};

	let root = parser.parse_value()?;

	parser.skip_trivia()?;

	if parser.pos < text.len() {
		return Err(parser.error("unexpected content after the end of the document"));
	}

	Ok(root)
}

struct Edit {
	range: Range<usize>,
	replacement: String,
}

enum ChildStyle {
	Inline,
	Multiline(String),
}

struct TextPatcher<'a> {
	text: &'a str,
	indent_unit: String,
	edits: Vec<Edit>,
}

fn patch_document(text: &str, data: &Value) -> Result<String, FormatError> {
	let root = parse_document(text)?;

	let mut patcher = TextPatcher {
		text,
		indent_unit: detect_indent_unit(text),
		edits: Vec::new(),
	};

	patcher.patch_node(&root, data)?;

	let mut edits = patcher.edits;
	edits.sort_by_key(|edit| std::cmp::Reverse(edit.range.start));

	let mut output = text.to_string();

	for edit in edits {
		output.replace_range(edit.range, &edit.replacement);
	}

	Ok(output)
}

impl TextPatcher<'_> {
	fn patch_node(&mut self, node: &Node, target: &Value) -> Result<(), FormatError> {
		if node.matches(target) {
			return Ok(());
		}

		match (&node.kind, target) {
			(NodeKind::Object(members), Value::Object(map)) if !members.is_empty() && !map.is_empty() => {
				self.patch_object(node, members, map)
			}
			(NodeKind::Array(items), Value::Array(values)) if !items.is_empty() && !values.is_empty() => {
				self.patch_array(node, items, values)
			}
			_ => self.replace(node, target),
		}
	}

	fn replace(&mut self, node: &Node, target: &Value) -> Result<(), FormatError> {
		let indent = line_indent(self.text, node.span.start);
		let replacement = render(target, indent, &self.indent_unit)?;

		self.edits.push(Edit {
			range: node.span.clone(),
			replacement,
		});

		Ok(())
	}

	fn patch_object(
		&mut self,
		node: &Node,
		members: &[Member],
		target: &Map<String, Value>,
	) -> Result<(), FormatError> {
		// With duplicate keys, only the last one is meaningful
		let kept: Vec<bool> = members
			.iter()
			.enumerate()
			.map(|(index, member)| {
				target.contains_key(&member.key)
					&& !members[index + 1..]
						.iter()
						.any(|later| later.key == member.key)
			})
			.collect();

		let Some(last_kept) = kept.iter().rposition(|is_kept| *is_kept) else {
			return self.replace(node, &Value::Object(target.clone()));
		};

		for (index, member) in members.iter().enumerate() {
			if kept[index] {
				self.patch_node(&member.value, &target[member.key.as_str()])?;
			} else if index < last_kept {
				self.edits.push(Edit {
					range: self.removal_range(member),
					replacement: String::new(),
				});
			}
		}

		let present: HashSet<&str> = members.iter().map(|member| member.key.as_str()).collect();
		let style = self.child_style(node.span.start, members[0].key_start);

		let mut additions = Vec::new();

		for (key, value) in target
			.iter()
			.filter(|(key, _)| !present.contains(key.as_str()))
		{
			let key = render_compact(&Value::String(key.clone()))?;

			additions.push(match &style {
				ChildStyle::Inline => format!("{key}: {}", render_compact(value)?),
				ChildStyle::Multiline(indent) => {
					format!("{indent}{key}: {}", render(value, indent, &self.indent_unit)?)
				}
			});
		}

		let last = &members[last_kept];
		let removed_tail = &members[last_kept + 1..];

		let own_line = match (&style, removed_tail.first()) {
			(ChildStyle::Multiline(_), Some(first)) => self.preceding_newline(first.key_start),
			_ => None,
		};

		if let (Some(newline), Some(last_removed)) = (own_line, removed_tail.last()) {
			// Whatever follows the comma of the last kept member on its line stays where it is
			let end = last_removed
				.comma
				.map_or(last_removed.value.span.end, |comma| comma + 1);

			if additions.is_empty() && last_removed.comma.is_none() {
				if let Some(comma) = last.comma {
					self.edits.push(Edit {
						range: comma..comma + 1,
						replacement: String::new(),
					});
				}
			}

			let replacement = additions
				.iter()
				.map(|entry| format!("\n{entry}"))
				.collect::<Vec<_>>()
				.join(",");

			self.edits.push(Edit {
				range: newline..end,
				replacement,
			});
		} else if removed_tail.is_empty()
			&& !additions.is_empty()
			&& matches!(style, ChildStyle::Multiline(_))
			&& let Some(line_end) = self.commented_line_end(last)
		{
			// New members go below the comment that follows the last member
			if last.comma.is_none() {
				self.edits.push(Edit {
					range: last.value.span.end..last.value.span.end,
					replacement: ",".to_string(),
				});
			}

			let mut replacement = additions
				.iter()
				.map(|entry| format!("\n{entry}"))
				.collect::<Vec<_>>()
				.join(",");

			if last.comma.is_some() {
				replacement.push(',');
			}

			self.edits.push(Edit {
				range: line_end..line_end,
				replacement,
			});
		} else {
			let tail_end = members[members.len() - 1].value.span.end;

			self.push_tail(last.value.span.end..tail_end, &style, &additions);
		}

		Ok(())
	}

	fn patch_array(&mut self, node: &Node, items: &[Node], target: &[Value]) -> Result<(), FormatError> {
		for (item, value) in items.iter().zip(target) {
			self.patch_node(item, value)?;
		}

		let shared = items.len().min(target.len());
		let style = self.child_style(node.span.start, items[0].span.start);

		let additions = target[shared..]
			.iter()
			.map(|value| match &style {
				ChildStyle::Inline => render_compact(value),
				ChildStyle::Multiline(indent) => {
					render(value, indent, &self.indent_unit).map(|rendered| format!("{indent}{rendered}"))
				}
			})
			.collect::<Result<Vec<_>, _>>()?;

		let tail_start = items[shared - 1].span.end;
		let tail_end = items[items.len() - 1].span.end;

		self.push_tail(tail_start..tail_end, &style, &additions);

		Ok(())
	}

	// Replaces everything after the last kept child with the new entries
	fn push_tail(&mut self, range: Range<usize>, style: &ChildStyle, additions: &[String]) {
		let separator = match style {
			ChildStyle::Inline => ", ",
			ChildStyle::Multiline(_) => ",\n",
		};

		let replacement: String = additions
			.iter()
			.map(|entry| format!("{separator}{entry}"))
			.collect();

		if !range.is_empty() || !replacement.is_empty() {
			self.edits.push(Edit { range, replacement });
		}
	}

	fn preceding_newline(&self, pos: usize) -> Option<usize> {
		let newline = self.text[..pos].rfind('\n')?;

		self.text[newline + 1..pos]
			.trim()
			.is_empty()
			.then_some(newline)
	}

	// The member, its comma and the comment that follows it on the same line.
	// Whole lines are removed only if the member is the first thing on its line.
	fn removal_range(&self, member: &Member) -> Range<usize> {
		let own_line = self.preceding_newline(member.key_start);
		let start = own_line.map_or(member.key_start, |newline| newline + 1);
		let after = member
			.comma
			.map_or(member.value.span.end, |comma| comma + 1);

		let end = match self.line_end(after) {
			Some(line_end) if own_line.is_some() => line_end + 1,
			Some(line_end) => line_end,
			None => {
				let rest = &self.text[after..];
				after + rest.len() - rest.trim_start_matches([' ', '\t']).len()
			}
		};

		start..end
	}

	// The position of the newline that ends the line at `pos`, if only blanks or a line comment come before it
	fn line_end(&self, pos: usize) -> Option<usize> {
		let rest = &self.text[pos..];
		let content = rest.trim_start_matches([' ', '\t', '\r']);

		if !(content.starts_with('\n') || content.starts_with("//")) {
			return None;
		}

		content
			.find('\n')
			.map(|offset| pos + rest.len() - content.len() + offset)
	}

	// The end of the line of a member followed by a line comment
	fn commented_line_end(&self, member: &Member) -> Option<usize> {
		let after = member
			.comma
			.map_or(member.value.span.end, |comma| comma + 1);
		let line_end = self.line_end(after)?;

		if self.text[after..line_end].trim().is_empty() {
			return None;
		}

		Some(if self.text[..line_end].ends_with('\r') {
			line_end - 1
		} else {
			line_end
		})
	}

	fn child_style(&self, container_start: usize, first_child: usize) -> ChildStyle {
		if self.text[container_start..first_child].contains('\n') {
			ChildStyle::Multiline(line_indent(self.text, first_child).to_string())
		} else {
			ChildStyle::Inline
		}
	}
}

fn line_indent(text: &str, pos: usize) -> &str {
	let line_start = text[..pos].rfind('\n').map_or(0, |index| index + 1);
	let line = &text[line_start..];
	let indent_len = line.len() - line.trim_start_matches([' ', '\t']).len();

	&line[..indent_len]
}

fn detect_indent_unit(text: &str) -> String {
	text
		.lines()
		.filter(|line| {
			let trimmed = line.trim_start();
			!trimmed.is_empty() && !trimmed.starts_with('*')
		})
		.map(|line| &line[..line.len() - line.trim_start_matches([' ', '\t']).len()])
		.filter(|indent| !indent.is_empty())
		.min_by_key(|indent| indent.len())
		.unwrap_or(DEFAULT_INDENT)
		.to_string()
}

fn render(value: &Value, indent: &str, unit: &str) -> Result<String, FormatError> {
	let mut buffer = Vec::new();
	let mut serializer =
		serde_json::Serializer::with_formatter(&mut buffer, PrettyFormatter::with_indent(unit.as_bytes()));

	value
		.serialize(&mut serializer)
		.map_err(|e| FormatError::Serialization {
			format: "JSONC",
			message: e.to_string(),
		})?;

	let rendered = String::from_utf8(buffer).map_err(|e| FormatError::Serialization {
		format: "JSONC",
		message: e.to_string(),
	})?;

	if indent.is_empty() {
		Ok(rendered)
	} else {
		Ok(rendered.replace('\n', &format!("\n{indent}")))
	}
}

fn render_compact(value: &Value) -> Result<String, FormatError> {
	serde_json::to_string(value).map_err(|e| FormatError::Serialization {
		format: "JSONC",
		message: e.to_string(),
	})
}
