//! Split oversized text into transport-sized chunks at natural boundaries.
//!
//! Chunks always concatenate back to the original text; a boundary character
//! stays with the chunk that precedes it.

/// Default maximum chunk length in bytes, sized for a Slack message body.
pub const MAX_TEXT: usize = 3800;

/// Boundaries tried within a window, most preferred first.
const BOUNDARIES: [&str; 3] = ["\n\n", "\n", " "];

/// Split `text` into chunks of at most `max_len` bytes.
///
/// Each chunk is cut at the latest double newline, single newline, or space
/// inside the window, falling back to a hard cut at the window edge. Windows
/// never end inside a multi-byte character. The degenerate case where
/// `max_len` is smaller than a single character still makes progress by
/// emitting that character as its own chunk.
pub fn split_text(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while remaining.len() > max_len {
        let window = floor_char_boundary(remaining, max_len);
        let mut cut = if window == 0 {
            // max_len is inside the first character; take it whole.
            ceil_char_boundary(remaining, 1)
        } else {
            find_cut_index(&remaining[..window])
        };
        if cut == 0 {
            cut = ceil_char_boundary(remaining, 1);
        }
        chunks.push(remaining[..cut].to_string());
        remaining = &remaining[cut..];
    }

    if !remaining.is_empty() {
        chunks.push(remaining.to_string());
    }

    chunks
}

/// Latest boundary position inside `slice`, in preference order. A boundary
/// at position 0 would produce an empty chunk and is ignored. Returns the
/// slice length (hard cut) when no boundary qualifies.
fn find_cut_index(slice: &str) -> usize {
    for boundary in BOUNDARIES {
        if let Some(idx) = slice.rfind(boundary)
            && idx > 0
        {
            return idx + boundary.len();
        }
    }
    slice.len()
}

fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn ceil_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while !s.is_char_boundary(i) {
        i += 1;
    }
    i
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_single_chunk() {
        assert_eq!(split_text("hello", 10), vec!["hello"]);
        assert_eq!(split_text("", 10), vec![""]);
    }

    #[test]
    fn exact_fit_is_single_chunk() {
        assert_eq!(split_text("abcdef", 6), vec!["abcdef"]);
    }

    #[test]
    fn prefers_double_newline() {
        assert_eq!(split_text("aaaa\n\nbbbb", 6), vec!["aaaa\n\n", "bbbb"]);
    }

    #[test]
    fn falls_back_to_single_newline() {
        assert_eq!(split_text("aaaa\nbbbb", 6), vec!["aaaa\n", "bbbb"]);
    }

    #[test]
    fn falls_back_to_space() {
        assert_eq!(split_text("aaaa bbbb", 6), vec!["aaaa ", "bbbb"]);
    }

    #[test]
    fn hard_cut_without_boundary() {
        assert_eq!(split_text("abcdefgh", 3), vec!["abc", "def", "gh"]);
    }

    #[test]
    fn boundary_at_start_does_not_produce_empty_chunk() {
        let chunks = split_text(" abcdef", 3);
        assert!(chunks.iter().all(|c| !c.is_empty()));
        assert_eq!(chunks.concat(), " abcdef");
    }

    #[test]
    fn round_trip_reconstructs_input() {
        let samples = [
            "one two three four five six seven eight nine ten",
            "line one\nline two\n\nline three and some more words here",
            "nowhitespaceatallinthisparticularinputstring",
            "日本語のテキストで分割の境界を確認する文章です。改行\nもある。",
        ];
        for text in samples {
            for max in [1usize, 5, 8, 13, 40, 4000] {
                let chunks = split_text(text, max);
                assert_eq!(chunks.concat(), text, "max={max} text={text:?}");
                assert!(!chunks.is_empty());
            }
        }
    }

    #[test]
    fn chunks_respect_max_len() {
        let text = "word ".repeat(100);
        for max in [6usize, 10, 37, 80] {
            for chunk in split_text(&text, max) {
                assert!(chunk.len() <= max, "chunk {chunk:?} exceeds {max}");
            }
        }
    }

    #[test]
    fn never_splits_inside_a_character() {
        let text = "ありがとうございました。これはマルチバイト文字列です。";
        let chunks = split_text(text, 10);
        assert_eq!(chunks.concat(), text);
        for chunk in &chunks {
            assert!(chunk.is_char_boundary(0));
            assert!(chunk.len() <= 12); // at most one extra char for a degenerate window
        }
    }
}
