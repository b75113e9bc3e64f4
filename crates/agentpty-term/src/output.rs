//! Output accumulation
//!
//! Keeps everything a session has printed in two views: the raw bytes as
//! decoded from the PTY, and the ANSI-free text derived from them. The plain
//! view is maintained incrementally. An escape sequence still open at the end
//! of the raw view is held back until more output completes it, so the plain
//! view only ever grows.

use crate::ansi::split_complete;

/// Raw and plain views of a session's output.
///
/// Offsets into the plain view are byte offsets. Both buffers only grow.
#[derive(Debug, Default, Clone)]
pub struct OutputAccumulator {
    raw: String,
    plain: String,
    /// Start of the raw tail that has not been converted yet.
    pending_from: usize,
}

impl OutputAccumulator {
    /// Create an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a raw chunk and return the plain text it completed.
    ///
    /// The returned text may be empty when the chunk only opened an escape
    /// sequence; it is emitted once a later chunk finishes it.
    pub fn append_raw(&mut self, chunk: &str) -> &str {
        let before = self.plain.len();
        if chunk.is_empty() {
            return &self.plain[before..];
        }
        self.raw.push_str(chunk);

        let (text, consumed) = split_complete(&self.raw[self.pending_from..]);
        self.pending_from += consumed;
        self.plain.push_str(&text);

        &self.plain[before..]
    }

    /// Everything received, escapes included.
    #[must_use]
    pub fn raw_buffer(&self) -> &str {
        &self.raw
    }

    /// Everything received, escapes removed.
    #[must_use]
    pub fn plain_buffer(&self) -> &str {
        &self.plain
    }

    /// Current length of the plain view in bytes.
    #[must_use]
    pub fn plain_len(&self) -> usize {
        self.plain.len()
    }

    /// Plain text from `from` to the end.
    ///
    /// `from` is clamped to the buffer and rounded up to the next character
    /// boundary, so a stale offset never panics.
    #[must_use]
    pub fn plain_slice(&self, from: usize) -> &str {
        let mut start = from.min(self.plain.len());
        while !self.plain.is_char_boundary(start) {
            start += 1;
        }
        &self.plain[start..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ansi::strip_ansi_escapes;

    #[test]
    fn test_append_keeps_both_views() {
        let mut acc = OutputAccumulator::new();
        acc.append_raw("\x1b[32mHello");
        acc.append_raw("\x1b[0m World\r\n");

        assert_eq!(acc.raw_buffer(), "\x1b[32mHello\x1b[0m World\r\n");
        assert_eq!(acc.plain_buffer(), "Hello World\n");
        assert_eq!(acc.plain_len(), 12);
    }

    #[test]
    fn test_escape_split_across_chunks() {
        let mut acc = OutputAccumulator::new();
        assert_eq!(acc.append_raw("ready\x1b["), "ready");
        assert_eq!(acc.append_raw("3"), "");
        assert_eq!(acc.append_raw("1mred\x1b[0m"), "red");
        assert_eq!(acc.plain_buffer(), "readyred");
    }

    #[test]
    fn test_incremental_matches_full_strip_at_every_split() {
        let raw = "\x1b[?25l\x1b]0;agent\x07┌ Cursor Agent\r\n\x1b[38;5;244m> ✓ done\x1b[0m\r\n";
        let expected = strip_ansi_escapes(raw);

        let splits: Vec<usize> = raw.char_indices().map(|(i, _)| i).collect();
        for &first in &splits {
            for &second in splits.iter().filter(|&&s| s >= first) {
                let mut acc = OutputAccumulator::new();
                acc.append_raw(&raw[..first]);
                acc.append_raw(&raw[first..second]);
                acc.append_raw(&raw[second..]);
                assert_eq!(acc.plain_buffer(), expected, "splits at {first}/{second}");
            }
        }
    }

    #[test]
    fn test_plain_view_is_prefix_stable() {
        let mut acc = OutputAccumulator::new();
        let mut previous = String::new();
        for chunk in ["abc", "\x1b", "[1", "m", "def\r", "\n", "\x1b]2;t", "\x1b\\ghi"] {
            acc.append_raw(chunk);
            assert!(acc.plain_buffer().starts_with(&previous));
            previous = acc.plain_buffer().to_string();
        }
        assert_eq!(previous, "abcdef\nghi");
    }

    #[test]
    fn test_plain_slice_clamps_offsets() {
        let mut acc = OutputAccumulator::new();
        acc.append_raw("héllo");

        assert_eq!(acc.plain_slice(0), "héllo");
        assert_eq!(acc.plain_slice(1), "éllo");
        // Inside the two-byte 'é': rounds up to the next boundary.
        assert_eq!(acc.plain_slice(2), "llo");
        assert_eq!(acc.plain_slice(100), "");
    }
}
