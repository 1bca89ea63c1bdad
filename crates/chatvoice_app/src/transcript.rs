//! Plain-text chat transcripts: one `name: body` message per line.

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TranscriptLine {
    pub name: String,
    pub body: String,
}

/// Blank lines, `#` comments and lines without a `:` separator are skipped.
pub(crate) fn parse_transcript(text: &str) -> Vec<TranscriptLine> {
    text.lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                return None;
            }
            let (name, body) = line.split_once(':')?;
            Some(TranscriptLine {
                name: name.trim().to_string(),
                body: body.trim().to_string(),
            })
        })
        .collect()
}
