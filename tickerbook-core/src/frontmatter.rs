//! Frontmatter parsing from markdown cards.

use crate::models::{Frontmatter, FrontmatterValue};
use regex::Regex;
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FrontmatterError {
    #[error("Invalid YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Frontmatter must be a mapping of keys to values")]
    NotAMapping,
}

static FRONTMATTER_REGEX: OnceLock<Regex> = OnceLock::new();

fn frontmatter_regex() -> &'static Regex {
    FRONTMATTER_REGEX
        .get_or_init(|| Regex::new(r"(?s)^---[ \t]*\r?\n(.*?)\r?\n---[ \t]*(?:\r?\n|$)").unwrap())
}

/// Parse frontmatter from markdown content
///
/// Returns a tuple of (frontmatter, markdown_body).
/// If no frontmatter is present, returns empty frontmatter with the full content as body.
///
/// # Example
///
/// ```
/// use tickerbook_core::frontmatter::parse_frontmatter;
///
/// let content = "---\nticker: SBER\np_e: 4.5\n---\n# Сбербанк\n";
///
/// let (fm, body) = parse_frontmatter(content).unwrap();
/// assert_eq!(fm.get("ticker"), Some("SBER"));
/// assert_eq!(fm.get("p_e"), Some("4.5"));
/// assert_eq!(body, "# Сбербанк\n");
/// ```
pub fn parse_frontmatter(content: &str) -> Result<(Frontmatter, String), FrontmatterError> {
    let Some(captures) = frontmatter_regex().captures(content) else {
        return Ok((Frontmatter::default(), content.to_string()));
    };

    let yaml = captures.get(1).map_or("", |m| m.as_str());
    let body = &content[captures.get(0).map_or(0, |m| m.end())..];

    let value: Value = serde_yaml::from_str(yaml)?;
    let mapping = match value {
        Value::Mapping(mapping) => mapping,
        Value::Null => Default::default(),
        _ => return Err(FrontmatterError::NotAMapping),
    };

    let mut fields = BTreeMap::new();
    for (key, value) in mapping {
        let Some(key) = scalar_to_string(&key) else {
            continue;
        };
        let value = match value {
            Value::Sequence(items) => {
                FrontmatterValue::List(items.iter().filter_map(scalar_to_string).collect())
            }
            other => FrontmatterValue::Text(scalar_to_string(&other).unwrap_or_default()),
        };
        fields.insert(key, value);
    }

    Ok((Frontmatter { fields }, body.to_string()))
}

/// Body of a card with any frontmatter block removed
pub fn split_body(content: &str) -> &str {
    match frontmatter_regex().find(content) {
        Some(m) => &content[m.end()..],
        None => content,
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        Value::Tagged(tagged) => scalar_to_string(&tagged.value),
        Value::Sequence(_) | Value::Mapping(_) => None,
    }
}
