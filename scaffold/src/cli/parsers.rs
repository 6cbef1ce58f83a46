use std::str::FromStr;

use serde_json::Value;

pub fn parse_single_key_value_pair<'a>(name: &str, trimmed_part: &'a str) -> Result<(&'a str, &'a str), String> {
	match trimmed_part.split_once('=') {
		Some((key, val)) if !key.trim().is_empty() => Ok((key.trim(), val.trim())),
		_ => Err(format!(
			"Invalid key-value pair format for {name}. Only key-value pairs with '=' between them are allowed"
		)),
	}
}

/// Parses a `key=value` pair for a config option. Values that are not valid JSON are treated as strings.
pub fn parse_config_value_pair(s: &str) -> Result<(String, Value), String> {
	let (key, val) = parse_single_key_value_pair("config", s)?;

	let parsed_val = Value::from_str(val).unwrap_or_else(|_| Value::String(val.to_string()));

	Ok((key.to_string(), parsed_val))
}
