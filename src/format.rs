//! Remote path templates.
//!
//! A template such as `/notes/{{notename}}/{{mtime:YYYY-MM}}/{{nameext}}` is
//! expanded per uploaded file. Variable names are case-insensitive; date
//! variables accept a Moment-style format after a colon.

use std::collections::HashMap;

use chrono::{DateTime, Local, Utc};
use regex::Regex;

use crate::vault::VaultFile;

/// Format applied to date variables when the template gives none
pub const DEFAULT_DATE_FORMAT: &str = "YYYY-MM-DD HH:mm:ss";

/// A single template variable value
#[derive(Debug, Clone, PartialEq)]
pub enum FormatValue {
    Text(String),
    Date(DateTime<Local>),
}

/// Values available to a path template
#[derive(Debug, Clone, Default)]
pub struct FormatVariables {
    values: HashMap<&'static str, FormatValue>,
}

impl FormatVariables {
    /// Variables for uploading `file_name` (last modified at `file_mtime`)
    /// referenced from `note`
    pub fn new(file_name: &str, file_mtime: DateTime<Utc>, note: &VaultFile) -> Self {
        let (name, ext) = match file_name.rfind('.') {
            Some(idx) if idx > 0 => (&file_name[..idx], &file_name[idx + 1..]),
            _ => (file_name, ""),
        };

        let mut values = HashMap::new();
        values.insert("name", FormatValue::Text(name.to_string()));
        values.insert("ext", FormatValue::Text(ext.to_string()));
        values.insert("nameext", FormatValue::Text(file_name.to_string()));
        values.insert("mtime", FormatValue::Date(file_mtime.with_timezone(&Local)));
        values.insert("now", FormatValue::Date(Local::now()));
        values.insert("notename", FormatValue::Text(note.basename().to_string()));
        values.insert("notectime", FormatValue::Date(note.stat.ctime.with_timezone(&Local)));
        values.insert("notemtime", FormatValue::Date(note.stat.mtime.with_timezone(&Local)));

        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&FormatValue> {
        self.values.get(key.to_lowercase().as_str())
    }

    /// Override a value, mostly useful for previews and tests
    pub fn set(&mut self, key: &'static str, value: FormatValue) {
        self.values.insert(key, value);
    }
}

/// Expands `{{var}}` and `{{var:format}}` placeholders
pub struct PathFormatter {
    var_regex: Regex,
}

impl PathFormatter {
    pub fn new() -> Self {
        Self {
            var_regex: Regex::new(r"\{\{\s*(\w+)(?::([^}]+))?\s*\}\}").expect("Invalid regex"),
        }
    }

    /// Substitute variables and normalize the result to a single leading `/`
    pub fn format(&self, template: &str, variables: &FormatVariables) -> String {
        let expanded = self
            .var_regex
            .replace_all(template, |caps: &regex::Captures| {
                let key = &caps[1];
                match variables.get(key) {
                    Some(FormatValue::Text(value)) => value.clone(),
                    Some(FormatValue::Date(value)) => {
                        let format = caps
                            .get(2)
                            .map(|m| m.as_str().trim())
                            .unwrap_or(DEFAULT_DATE_FORMAT);
                        value.format(&moment_to_strftime(format)).to_string()
                    }
                    // Unknown variables stay in the path untouched
                    None => caps[0].to_string(),
                }
            })
            .to_string();

        format!("/{}", normalize_path(&expanded))
    }
}

impl Default for PathFormatter {
    fn default() -> Self {
        Self::new()
    }
}

/// Collapse separators and strip leading/trailing slashes
pub fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Moment.js tokens, longest first so `YYYY` wins over `YY`
const MOMENT_TOKENS: &[(&str, &str)] = &[
    ("YYYY", "%Y"),
    ("YY", "%y"),
    ("MMMM", "%B"),
    ("MMM", "%b"),
    ("MM", "%m"),
    ("M", "%-m"),
    ("DDDD", "%j"),
    ("DD", "%d"),
    ("Do", "%-d"),
    ("D", "%-d"),
    ("dddd", "%A"),
    ("ddd", "%a"),
    ("HH", "%H"),
    ("H", "%-H"),
    ("hh", "%I"),
    ("h", "%-I"),
    ("mm", "%M"),
    ("m", "%-M"),
    ("ss", "%S"),
    ("s", "%-S"),
    ("SSS", "%3f"),
    ("A", "%p"),
    ("a", "%P"),
    ("X", "%s"),
    ("ZZ", "%z"),
    ("Z", "%:z"),
    ("WW", "%V"),
    ("W", "%-V"),
];

/// Translate a Moment.js date format into a chrono strftime format.
///
/// Text inside `[...]` is copied literally, as Moment does.
pub fn moment_to_strftime(format: &str) -> String {
    let mut out = String::with_capacity(format.len() * 2);
    let mut rest = format;

    'outer: while let Some(c) = rest.chars().next() {
        if c == '[' {
            if let Some(close) = rest.find(']') {
                push_literal(&mut out, &rest[1..close]);
                rest = &rest[close + 1..];
                continue;
            }
        }

        for (token, replacement) in MOMENT_TOKENS {
            if let Some(stripped) = rest.strip_prefix(token) {
                out.push_str(replacement);
                rest = stripped;
                continue 'outer;
            }
        }

        push_literal(&mut out, &rest[..c.len_utf8()]);
        rest = &rest[c.len_utf8()..];
    }

    out
}

fn push_literal(out: &mut String, literal: &str) {
    for c in literal.chars() {
        if c == '%' {
            out.push_str("%%");
        } else {
            out.push(c);
        }
    }
}
