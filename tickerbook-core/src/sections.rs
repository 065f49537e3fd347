//! Manual section recovery for regenerated cards.
//!
//! Generated cards mix automatic sections (rebuilt from data on every run)
//! with manual sections a human writes. Before a card is regenerated, the
//! manual sections are pulled out of the existing file so they can be
//! written back verbatim.

use std::path::Path;

const SECTION_MARKER: &str = "## ";

/// One level-2 chunk of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk<'a> {
    /// The `## ...` line, or `None` for text before the first heading
    pub heading: Option<&'a str>,
    /// Everything after the heading line, up to the newline that precedes
    /// the next level-2 heading
    pub body: &'a str,
}

/// Split a document before every line starting with `## `
///
/// The newline separating two chunks belongs to neither of them.
pub fn split_sections(text: &str) -> Vec<Chunk<'_>> {
    let mut starts = vec![0];
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        if offset > 0 && line.starts_with(SECTION_MARKER) {
            starts.push(offset);
        }
        offset += line.len();
    }

    starts
        .iter()
        .enumerate()
        .map(|(idx, &start)| {
            let end = starts.get(idx + 1).map_or(text.len(), |next| next - 1);
            to_chunk(&text[start..end])
        })
        .collect()
}

fn to_chunk(raw: &str) -> Chunk<'_> {
    let trimmed = raw.trim_start();
    if !trimmed.starts_with(SECTION_MARKER) {
        return Chunk {
            heading: None,
            body: raw,
        };
    }
    match trimmed.split_once('\n') {
        Some((heading, body)) => Chunk {
            heading: Some(heading),
            body,
        },
        None => Chunk {
            heading: Some(trimmed),
            body: "",
        },
    }
}

/// Manual section bodies recovered from an existing document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManualSections {
    bodies: Vec<(String, String)>,
    duplicates: Vec<String>,
}

impl ManualSections {
    /// Every known title mapped to an empty body
    pub fn empty(titles: &[&str]) -> Self {
        Self {
            bodies: titles
                .iter()
                .map(|title| (title.to_string(), String::new()))
                .collect(),
            duplicates: Vec::new(),
        }
    }

    /// Raw captured body for `title` ("" when absent or unknown)
    pub fn get(&self, title: &str) -> &str {
        self.bodies
            .iter()
            .find(|(t, _)| t == title)
            .map_or("", |(_, body)| body.as_str())
    }

    /// A body counts as present only if it has non-whitespace content
    pub fn is_present(&self, title: &str) -> bool {
        !self.get(title).trim().is_empty()
    }

    /// The recovered body, or `default` when nothing usable was recovered
    pub fn body_or<'a>(&'a self, title: &str, default: &'a str) -> &'a str {
        if self.is_present(title) {
            self.get(title)
        } else {
            default
        }
    }

    /// Titles that appeared under more than one heading; only the first was kept
    pub fn duplicates(&self) -> &[String] {
        &self.duplicates
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.bodies.iter().map(|(t, b)| (t.as_str(), b.as_str()))
    }
}

/// Extract manual section bodies from a document
///
/// `document` is `None` when there is no previous file. Each chunk whose
/// heading begins with `## {title}` feeds the first matching title, in the
/// order given. Later chunks for an already captured title are ignored and
/// reported through [`ManualSections::duplicates`].
///
/// ```
/// use tickerbook_core::sections::extract_sections;
///
/// let doc = "# Card\n\n## Менеджмент\nCEO: Иванов\n\n## Дивиденды\n| 2024 | 10 |\n";
/// let sections = extract_sections(Some(doc), &["Менеджмент", "Риски"]);
/// assert_eq!(sections.get("Менеджмент"), "CEO: Иванов\n");
/// assert_eq!(sections.get("Риски"), "");
/// ```
pub fn extract_sections(document: Option<&str>, titles: &[&str]) -> ManualSections {
    let mut sections = ManualSections::empty(titles);
    let Some(text) = document else {
        return sections;
    };

    let mut captured = vec![false; titles.len()];
    for chunk in split_sections(text) {
        let Some(heading) = chunk.heading else {
            continue;
        };
        let Some(idx) = titles
            .iter()
            .position(|title| heading.starts_with(&format!("{SECTION_MARKER}{title}")))
        else {
            continue;
        };

        if captured[idx] {
            if !sections.duplicates.iter().any(|d| d == titles[idx]) {
                sections.duplicates.push(titles[idx].to_string());
            }
            continue;
        }
        captured[idx] = true;
        sections.bodies[idx].1 = chunk.body.to_string();
    }

    sections
}

/// Read `path` and extract its manual sections
///
/// A missing file is the normal first-run case. An unreadable file is logged
/// and treated the same way, so the card is rebuilt from defaults.
pub fn read_sections(path: &Path, titles: &[&str]) -> ManualSections {
    match std::fs::read_to_string(path) {
        Ok(text) => extract_sections(Some(&text), titles),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            extract_sections(None, titles)
        }
        Err(err) => {
            tracing::warn!("Cannot read {:?}, using default sections: {}", path, err);
            extract_sections(None, titles)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const TITLES: &[&str] = &["Guidance менеджмента", "Санкционный статус"];

    #[test]
    fn test_missing_document_maps_every_title_to_empty() {
        let sections = extract_sections(None, TITLES);
        assert_eq!(sections.get("Guidance менеджмента"), "");
        assert_eq!(sections.get("Санкционный статус"), "");
        assert_eq!(sections.iter().count(), 2);
    }

    #[test]
    fn test_empty_document() {
        let sections = extract_sections(Some(""), TITLES);
        assert!(sections.iter().all(|(_, body)| body.is_empty()));
    }

    #[test]
    fn test_extract_between_auto_sections() {
        let doc = "---\nticker: SBER\n---\n\n# События\n\n## Предстоящие катализаторы\n\n| a |\n\n## Guidance менеджмента\nРост 10%\n\n## Санкционный статус\nSDN: да\n";
        let sections = extract_sections(Some(doc), TITLES);
        assert_eq!(sections.get("Guidance менеджмента"), "Рост 10%\n");
        assert_eq!(sections.get("Санкционный статус"), "SDN: да\n");
    }

    #[test]
    fn test_subheadings_stay_inside_section() {
        let doc = "## Guidance менеджмента\n### 2025\n- рост\n#### детали\n";
        let sections = extract_sections(Some(doc), TITLES);
        assert_eq!(
            sections.get("Guidance менеджмента"),
            "### 2025\n- рост\n#### детали\n"
        );
    }

    #[test]
    fn test_whitespace_body_is_not_present() {
        let doc = "## Guidance менеджмента\n\n   \n## Санкционный статус\nнет";
        let sections = extract_sections(Some(doc), TITLES);
        assert!(!sections.is_present("Guidance менеджмента"));
        assert_eq!(sections.body_or("Guidance менеджмента", "DEFAULT"), "DEFAULT");
        assert_eq!(sections.body_or("Санкционный статус", "DEFAULT"), "нет");
    }

    #[test]
    fn test_heading_without_body() {
        let sections = extract_sections(Some("## Санкционный статус"), TITLES);
        assert_eq!(sections.get("Санкционный статус"), "");
    }

    #[test]
    fn test_first_duplicate_wins() {
        let doc = "## Санкционный статус\nпервый\n## Санкционный статус\nвторой\n";
        let sections = extract_sections(Some(doc), TITLES);
        assert_eq!(sections.get("Санкционный статус"), "первый");
        assert_eq!(sections.duplicates(), ["Санкционный статус"]);
    }

    #[test]
    fn test_level_three_heading_is_not_a_section() {
        let doc = "### Санкционный статус\nтекст";
        let sections = extract_sections(Some(doc), TITLES);
        assert_eq!(sections.get("Санкционный статус"), "");
    }

    #[test]
    fn test_split_sections_preserves_text() {
        let doc = "intro\n## A\none\n## B\ntwo";
        let chunks = split_sections(doc);
        assert_eq!(
            chunks,
            vec![
                Chunk {
                    heading: None,
                    body: "intro"
                },
                Chunk {
                    heading: Some("## A"),
                    body: "one"
                },
                Chunk {
                    heading: Some("## B"),
                    body: "two"
                },
            ]
        );
    }

    #[test]
    fn test_read_sections_missing_file() {
        let dir = tempdir().unwrap();
        let sections = read_sections(&dir.path().join("events.md"), TITLES);
        assert_eq!(sections, ManualSections::empty(TITLES));
    }

    #[test]
    fn test_read_sections_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.md");
        fs::write(&path, "## Guidance менеджмента\nCAPEX 1 трлн\n").unwrap();
        let sections = read_sections(&path, TITLES);
        assert_eq!(sections.get("Guidance менеджмента"), "CAPEX 1 трлн\n");
    }
}
