//! Line-oriented block scanner for the markdown subset used in company cards.
//!
//! Each block kind has a rule: a pure function that looks at the line under
//! the cursor and either declines or returns the block plus the number of
//! lines it consumed. Rules are tried in a fixed priority order and the
//! first match wins; anything no rule claims becomes a paragraph.

use regex::Regex;
use std::sync::OnceLock;

const COMMENT_OPEN: &str = "<!--";
const COMMENT_CLOSE: &str = "-->";

/// Deepest heading level the renderer emits
const MAX_HEADING_LEVEL: usize = 4;

/// One structural unit of a markdown body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading { level: u8, text: String },
    Paragraph(String),
    UnorderedList(Vec<String>),
    OrderedList(Vec<String>),
    Table { header: Vec<String>, rows: Vec<Vec<String>> },
    /// Quote lines with the `> ` marker removed
    Blockquote(Vec<String>),
    HorizontalRule,
    /// An HTML comment span, dropped from output
    ///
    /// `remnant` is whatever text shared a line with the comment markers
    /// (before `<!--` or after `-->`); it is scanned again on its own.
    Comment {
        start_line: usize,
        terminated: bool,
        remnant: String,
    },
}

type Rule = fn(&[&str], usize) -> Option<(Block, usize)>;

/// Block rules in priority order; blank lines and paragraphs are handled by [`scan`]
const RULES: &[Rule] = &[
    comment,
    horizontal_rule,
    heading,
    blockquote,
    table,
    unordered_list,
    ordered_list,
];

static HEADING_REGEX: OnceLock<Regex> = OnceLock::new();
static UNORDERED_REGEX: OnceLock<Regex> = OnceLock::new();
static ORDERED_REGEX: OnceLock<Regex> = OnceLock::new();

fn heading_regex() -> &'static Regex {
    HEADING_REGEX.get_or_init(|| Regex::new(r"^(#{1,6})\s+(.+)$").unwrap())
}

fn unordered_regex() -> &'static Regex {
    UNORDERED_REGEX.get_or_init(|| Regex::new(r"^\s*[-*]\s+").unwrap())
}

fn ordered_regex() -> &'static Regex {
    ORDERED_REGEX.get_or_init(|| Regex::new(r"^\s*\d+\.\s+").unwrap())
}

/// Split a markdown body into blocks
pub fn scan(source: &str) -> Vec<Block> {
    let lines: Vec<&str> = source.lines().collect();
    let mut blocks = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        if lines[i].trim().is_empty() {
            i += 1;
            continue;
        }

        let (block, consumed) = RULES
            .iter()
            .find_map(|rule| rule(&lines, i))
            .unwrap_or_else(|| paragraph(&lines, i));

        blocks.push(block);
        i += consumed.max(1);
    }

    blocks
}

/// `<!--` anywhere on the line; runs through the line holding the matching `-->`
fn comment(lines: &[&str], start: usize) -> Option<(Block, usize)> {
    if !lines[start].contains(COMMENT_OPEN) {
        return None;
    }

    let mut remnant = String::new();
    let mut idx = start;
    let mut rest = lines[start];

    while let Some(open) = rest.find(COMMENT_OPEN) {
        remnant.push_str(&rest[..open]);
        let mut tail = &rest[open + COMMENT_OPEN.len()..];

        loop {
            if let Some(close) = tail.find(COMMENT_CLOSE) {
                rest = &tail[close + COMMENT_CLOSE.len()..];
                break;
            }
            idx += 1;
            if idx >= lines.len() {
                let block = Block::Comment {
                    start_line: start + 1,
                    terminated: false,
                    remnant: remnant.trim().to_string(),
                };
                return Some((block, lines.len() - start));
            }
            if !remnant.ends_with(' ') && !remnant.is_empty() {
                remnant.push(' ');
            }
            tail = lines[idx];
        }
    }
    remnant.push_str(rest);

    let block = Block::Comment {
        start_line: start + 1,
        terminated: true,
        remnant: remnant.trim().to_string(),
    };
    Some((block, idx - start + 1))
}

fn horizontal_rule(lines: &[&str], start: usize) -> Option<(Block, usize)> {
    is_rule_line(lines[start]).then_some((Block::HorizontalRule, 1))
}

fn heading(lines: &[&str], start: usize) -> Option<(Block, usize)> {
    let caps = heading_regex().captures(lines[start].trim_start())?;
    let level = caps[1].len().min(MAX_HEADING_LEVEL) as u8;
    let text = caps[2].trim().to_string();
    Some((Block::Heading { level, text }, 1))
}

fn blockquote(lines: &[&str], start: usize) -> Option<(Block, usize)> {
    let quoted: Vec<String> = lines[start..]
        .iter()
        .map_while(|line| line.trim().strip_prefix("> ").map(str::to_string))
        .collect();

    if quoted.is_empty() {
        return None;
    }
    let consumed = quoted.len();
    Some((Block::Blockquote(quoted), consumed))
}

fn table(lines: &[&str], start: usize) -> Option<(Block, usize)> {
    let header_line = lines[start];
    let separator = lines.get(start + 1)?;
    if !header_line.contains('|') || !is_separator_line(separator) {
        return None;
    }

    let header = split_row(header_line);
    let rows: Vec<Vec<String>> = lines[start + 2..]
        .iter()
        .take_while(|line| line.trim().starts_with('|'))
        .map(|line| split_row(line))
        .collect();

    let consumed = 2 + rows.len();
    Some((Block::Table { header, rows }, consumed))
}

fn unordered_list(lines: &[&str], start: usize) -> Option<(Block, usize)> {
    list_items(lines, start, unordered_regex()).map(|items| {
        let consumed = items.len();
        (Block::UnorderedList(items), consumed)
    })
}

fn ordered_list(lines: &[&str], start: usize) -> Option<(Block, usize)> {
    list_items(lines, start, ordered_regex()).map(|items| {
        let consumed = items.len();
        (Block::OrderedList(items), consumed)
    })
}

/// Maximal run of lines carrying `marker`, with the marker stripped
fn list_items(lines: &[&str], start: usize, marker: &Regex) -> Option<Vec<String>> {
    let items: Vec<String> = lines[start..]
        .iter()
        .map_while(|line| {
            marker
                .find(line)
                .map(|m| line[m.end()..].trim().to_string())
        })
        .collect();

    (!items.is_empty()).then_some(items)
}

/// Fallback: the current line plus following lines that start no other block
fn paragraph(lines: &[&str], start: usize) -> (Block, usize) {
    let mut parts = vec![lines[start].trim()];
    for line in &lines[start + 1..] {
        if line.trim().is_empty() || starts_block(line) {
            break;
        }
        parts.push(line.trim());
    }

    let consumed = parts.len();
    (Block::Paragraph(parts.join(" ")), consumed)
}

/// Whether `line` would be claimed by a block rule and so ends a paragraph
fn starts_block(line: &str) -> bool {
    let s = line.trim();
    line.contains(COMMENT_OPEN)
        || is_rule_line(s)
        || heading_regex().is_match(s)
        || s.starts_with("> ")
        || s.strip_prefix('|').is_some_and(|rest| rest.contains('|'))
        || unordered_regex().is_match(s)
        || ordered_regex().is_match(s)
}

fn is_rule_line(line: &str) -> bool {
    let s = line.trim();
    s.len() >= 3 && s.chars().all(|c| c == '-')
}

/// Table separator: only pipes, dashes, colons and whitespace, with at least
/// one pipe and one dash (so a bare `---` stays a horizontal rule)
fn is_separator_line(line: &str) -> bool {
    line.contains('|')
        && line.contains('-')
        && line
            .chars()
            .all(|c| matches!(c, '|' | '-' | ':') || c.is_whitespace())
}

fn split_row(line: &str) -> Vec<String> {
    line.trim()
        .trim_matches('|')
        .split('|')
        .map(|cell| cell.trim().to_string())
        .collect()
}
