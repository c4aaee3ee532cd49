//! Dialogue script parser.
//!
//! Best-effort: one utterance per line, `speaker: text`. Anything that does not
//! fit (blank lines, `#` comments, lines without a colon) is dropped, never an
//! error. No multi-line utterances, no escaped colons.

use crate::model::DialogueLine;

pub struct ScriptParser;

impl ScriptParser {
    pub fn parse(raw: &str) -> Vec<DialogueLine> {
        raw.lines().filter_map(parse_line).collect()
    }

    /// Inverse of `parse` for well-formed lines.
    pub fn render(lines: &[DialogueLine]) -> String {
        lines
            .iter()
            .map(|l| format!("{}: {}", l.speaker, l.text))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn parse_line(line: &str) -> Option<DialogueLine> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let (speaker, text) = line.split_once(':')?;
    Some(DialogueLine::new(speaker.trim(), text.trim()))
}
