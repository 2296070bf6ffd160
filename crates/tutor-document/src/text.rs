//! Text cleanup and chunking helpers used when building documents.

/// Collapse every run of whitespace into a single space and trim the ends.
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split `text` into chunks of at most `max_chars` characters.
///
/// Chunks break on the last whitespace inside the window when there is one,
/// so words are not cut in half; a single word longer than the window is
/// split hard. Whitespace at chunk boundaries is dropped. Empty input yields
/// no chunks.
pub fn split_into_chunks(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let chars: Vec<char> = text.chars().collect();
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        while start < chars.len() && chars[start].is_whitespace() {
            start += 1;
        }
        if start >= chars.len() {
            break;
        }

        let hard_end = (start + max_chars).min(chars.len());
        let end = if hard_end == chars.len() || chars[hard_end].is_whitespace() {
            hard_end
        } else {
            match chars[start..hard_end].iter().rposition(|c| c.is_whitespace()) {
                Some(offset) if offset > 0 => start + offset,
                _ => hard_end,
            }
        };

        let chunk: String = chars[start..end].iter().collect();
        let chunk = chunk.trim_end().to_string();
        if !chunk.is_empty() {
            chunks.push(chunk);
        }
        start = end;
    }

    chunks
}

/// First `max_chars` characters of `text`, on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
