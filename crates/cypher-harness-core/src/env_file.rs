use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{HarnessError, HarnessResult};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvFile {
    entries: BTreeMap<String, String>,
}

impl EnvFile {
    /// One `KEY=VALUE` per line. Blank lines, `#` comments and an `export `
    /// prefix are skipped. Later duplicates win.
    pub fn parse(content: &str) -> Self {
        let mut entries = BTreeMap::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let line = line.strip_prefix("export ").unwrap_or(line);
            let Some((key, value)) = line.split_once('=') else {
                tracing::debug!(line, "Skipping env line without '='");
                continue;
            };
            let key = key.trim();
            if key.is_empty() {
                continue;
            }
            entries.insert(key.to_string(), parse_value(value.trim_start()));
        }
        Self { entries }
    }

    /// Read and parse `path`. A missing file is reported as
    /// [`HarnessError::EnvFileMissing`] rather than a generic I/O error.
    pub fn from_file(path: &Path) -> HarnessResult<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let env = Self::parse(&content);
                tracing::debug!(path = %path.display(), keys = env.entries.len(), "Loaded env file");
                Ok(env)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(HarnessError::EnvFileMissing {
                    path: path.to_path_buf(),
                })
            }
            Err(source) => Err(HarnessError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Value for `key`; empty values count as absent.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

/// Format `value` so that [`EnvFile::parse`] reads it back unchanged.
pub fn quote_value(value: &str) -> Cow<'_, str> {
    let plain = value.trim() == value && !value.contains(['"', '\'', '#']);
    if plain {
        return Cow::Borrowed(value);
    }
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    Cow::Owned(format!("\"{escaped}\""))
}

fn parse_value(raw: &str) -> String {
    if let Some(rest) = raw.strip_prefix('\'') {
        return match rest.find('\'') {
            Some(end) => rest[..end].to_string(),
            None => raw.to_string(),
        };
    }
    if let Some(rest) = raw.strip_prefix('"') {
        return unescape_double_quoted(rest).unwrap_or_else(|| raw.to_string());
    }
    strip_inline_comment(raw).trim_end().to_string()
}

/// Contents up to the closing quote, or `None` if there is none.
fn unescape_double_quoted(rest: &str) -> Option<String> {
    let mut out = String::with_capacity(rest.len());
    let mut chars = rest.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' => return Some(out),
            '\\' => match chars.next() {
                Some(next @ ('"' | '\\')) => out.push(next),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            },
            c => out.push(c),
        }
    }
    None
}

// An inline comment needs whitespace before the `#`.
fn strip_inline_comment(raw: &str) -> &str {
    let mut after_space = false;
    for (i, c) in raw.char_indices() {
        if c == '#' && after_space {
            return &raw[..i];
        }
        after_space = c.is_whitespace();
    }
    raw
}
