//! Message splitting for Discord's reply length limit.

use nbcs_common::util::{char_len, take_chars};

/// Maximum message length for Discord.
pub const MAX_MESSAGE_LENGTH: usize = 2000;

/// One piece of a split message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    /// The next segment continues the same line (hard split, no newline between)
    pub continues: bool,
}

impl Segment {
    fn line(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            continues: false,
        }
    }

    fn continued(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            continues: true,
        }
    }
}

/// Split a message into chunks of at most `max_len` characters.
///
/// Lines are packed greedily; a line longer than `max_len` is cut into
/// fixed-width pieces.
pub fn split_message(text: &str, max_len: usize) -> Vec<String> {
    split_segments(text, max_len)
        .into_iter()
        .map(|s| s.text)
        .collect()
}

/// Like [`split_message`], keeping track of where hard splits happened.
pub fn split_segments(text: &str, max_len: usize) -> Vec<Segment> {
    let max_len = max_len.max(1);
    if char_len(text) <= max_len {
        return vec![Segment::line(text)];
    }

    let mut segments = Vec::new();
    // (text, length in chars); None until a line has been placed in it
    let mut buffer: Option<(String, usize)> = None;

    for line in text.split('\n') {
        let line_len = char_len(line);

        if line_len > max_len {
            if let Some((buf, _)) = buffer.take() {
                segments.push(Segment::line(buf));
            }

            let mut rest = line;
            loop {
                let piece = take_chars(rest, max_len);
                if piece.len() == rest.len() {
                    segments.push(Segment::line(piece));
                    break;
                }
                segments.push(Segment::continued(piece));
                rest = &rest[piece.len()..];
            }
            continue;
        }

        match buffer.as_mut() {
            Some((buf, len)) if *len + line_len + 1 <= max_len => {
                buf.push('\n');
                buf.push_str(line);
                *len += line_len + 1;
            }
            _ => {
                if let Some((buf, _)) = buffer.replace((line.to_string(), line_len)) {
                    segments.push(Segment::line(buf));
                }
            }
        }
    }

    if let Some((buf, _)) = buffer {
        segments.push(Segment::line(buf));
    }

    segments
}

/// Inverse of [`split_segments`].
pub fn join_segments(segments: &[Segment]) -> String {
    let mut out = String::new();
    for (i, segment) in segments.iter().enumerate() {
        out.push_str(&segment.text);
        if i + 1 < segments.len() && !segment.continues {
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;

    #[test]
    fn short_message_is_untouched() {
        assert_eq!(split_message("Short message", 2000), vec!["Short message"]);
    }

    #[test]
    fn fitting_lines_stay_together() {
        assert_eq!(split_message("line1\nline2", 2000), vec!["line1\nline2"]);
    }

    #[test]
    fn long_line_is_hard_split() {
        let text = "a".repeat(5000);
        let lens: Vec<usize> = split_message(&text, 2000).iter().map(|c| c.len()).collect();
        assert_eq!(lens, vec![2000, 2000, 1000]);
    }

    #[test]
    fn lines_are_packed_greedily() {
        let line = "x".repeat(900);
        let text = [line.as_str(); 5].join("\n");
        let chunks = split_message(&text, 2000);
        // 900 + 1 + 900 fits, a third line would not
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0], format!("{line}\n{line}"));
        assert_eq!(chunks[2], line);
    }

    #[test]
    fn oversized_line_flushes_buffer_first() {
        let text = format!("head\n{}\ntail", "b".repeat(25));
        let chunks = split_message(&text, 10);
        assert_eq!(
            chunks,
            vec!["head", "bbbbbbbbbb", "bbbbbbbbbb", "bbbbb", "tail"]
        );
    }

    #[test]
    fn counts_characters_not_bytes() {
        let text = "你".repeat(30);
        let chunks = split_message(&text, 20);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chars().count(), 20);
        assert_eq!(chunks[1].chars().count(), 10);
    }

    #[test_case("a\n\nb", 2 ; "blank line kept")]
    #[test_case("\n\n\n", 1 ; "only newlines")]
    #[test_case("abc\n", 2 ; "trailing newline")]
    fn empty_lines_survive(text: &str, max: usize) {
        let segments = split_segments(text, max);
        assert_eq!(join_segments(&segments), text);
    }

    proptest! {
        #[test]
        fn segments_fit_and_rejoin(text in "[ab\n你]{0,200}", max in 1usize..40) {
            let segments = split_segments(&text, max);
            for s in &segments {
                prop_assert!(char_len(&s.text) <= max);
            }
            prop_assert_eq!(join_segments(&segments), text);
        }

        #[test]
        fn short_lines_rejoin_with_newlines(lines in prop::collection::vec("[a-z]{0,10}", 1..30)) {
            let text = lines.join("\n");
            let chunks = split_message(&text, 16);
            prop_assert_eq!(chunks.join("\n"), text);
        }
    }
}
