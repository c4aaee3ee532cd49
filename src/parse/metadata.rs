//! Metadata parser.
//!
//! Reads a title, a multi-line description and a comma-separated tag line out
//! of loosely formatted model output. Sections are announced by bilingual
//! header keywords; unlabeled lines belong to the section under the cursor.

use crate::model::Metadata;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Title,
    Description,
    Tags,
}

/// Header keywords for one section.
#[derive(Debug, Clone, Copy)]
pub struct Keywords {
    /// Matched as an exact substring.
    pub native: &'static str,
    /// Matched case-insensitively.
    pub english: &'static str,
}

impl Keywords {
    fn matches(&self, line: &str, lowered: &str) -> bool {
        line.contains(self.native) || lowered.contains(self.english)
    }
}

/// Header table, evaluated top to bottom. A line matching several rows is
/// classified by the first one.
pub const SECTION_KEYWORDS: [(Section, Keywords); 3] = [
    (
        Section::Title,
        Keywords {
            native: "タイトル",
            english: "title",
        },
    ),
    (
        Section::Description,
        Keywords {
            native: "説明",
            english: "description",
        },
    ),
    (
        Section::Tags,
        Keywords {
            native: "タグ",
            english: "tag",
        },
    ),
];

/// Section announced by `line`, if any.
pub fn classify_header(line: &str) -> Option<Section> {
    let lowered = line.to_lowercase();
    SECTION_KEYWORDS
        .iter()
        .find(|(_, kw)| kw.matches(line, &lowered))
        .map(|(section, _)| *section)
}

/// Comma split, each piece trimmed. Empty pieces are kept.
fn split_tags(s: &str) -> Vec<String> {
    s.split(',').map(|t| t.trim().to_string()).collect()
}

pub struct MetadataParser;

impl MetadataParser {
    pub fn parse(raw: &str) -> Metadata {
        let mut meta = Metadata::default();
        let mut cursor: Option<Section> = None;
        let mut description: Vec<&str> = Vec::new();

        for line in raw.trim().lines() {
            let line = line.trim();

            if let Some(section) = classify_header(line) {
                cursor = Some(section);
                if let Some((_, inline)) = line.split_once(':') {
                    match section {
                        Section::Title if meta.title.is_empty() => {
                            meta.title = inline.trim().to_string();
                        }
                        Section::Tags => meta.tags = split_tags(inline.trim()),
                        _ => {}
                    }
                }
                continue;
            }

            if line.is_empty() {
                continue;
            }
            match cursor {
                Some(Section::Title) if meta.title.is_empty() => meta.title = line.to_string(),
                Some(Section::Description) => description.push(line),
                Some(Section::Tags) => meta.tags = split_tags(line),
                _ => {}
            }
        }

        meta.description = description.join("\n");
        meta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_priority_is_title_description_tags() {
        assert_eq!(classify_header("Title and tags"), Some(Section::Title));
        assert_eq!(classify_header("説明 (tags inside)"), Some(Section::Description));
        assert_eq!(classify_header("TAGS"), Some(Section::Tags));
        assert_eq!(classify_header("ハッシュタグ"), Some(Section::Tags));
        assert_eq!(classify_header("plain body text"), None);
    }

    #[test]
    fn english_headers_case_insensitive() {
        let m = MetadataParser::parse("TITLE: Rates on hold\nDescription:\nBody\nTags: fed, rates");
        assert_eq!(m.title, "Rates on hold");
        assert_eq!(m.description, "Body");
        assert_eq!(m.tags, vec!["fed", "rates"]);
    }

    #[test]
    fn title_on_following_line() {
        let m = MetadataParser::parse("## タイトル\n\n円安が加速\n二行目は無視");
        assert_eq!(m.title, "円安が加速");
        assert!(m.description.is_empty());
    }

    #[test]
    fn last_tag_line_wins() {
        let m = MetadataParser::parse("タグ:\na, b\nc, d");
        assert_eq!(m.tags, vec!["c", "d"]);
    }

    #[test]
    fn description_inline_text_is_ignored() {
        let m = MetadataParser::parse("説明: inline\nbody");
        assert_eq!(m.description, "body");
    }

    #[test]
    fn lines_before_any_header_are_ignored() {
        let m = MetadataParser::parse("Sure! Here you go.\nタイトル: X");
        assert_eq!(m.title, "X");
        assert!(m.tags.is_empty());
    }
}
