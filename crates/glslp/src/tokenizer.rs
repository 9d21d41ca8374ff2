//! Splits directive lines into tokens.

/// Splits a line into whitespace-delimited tokens.
///
/// A token that starts with `"` or `<` extends to the matching `"` or `>`, whitespace
/// included, and keeps its delimiters. Everything from a `//` or `/*` outside such a
/// token to the end of the line is dropped.
#[inline]
#[must_use]
pub fn tokenize_line(line: &str) -> Vec<&str> {
    let bytes = line.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while let Some(&byte) = bytes.get(pos) {
        if byte.is_ascii_whitespace() {
            pos += 1;
            continue;
        }
        if starts_comment(bytes, pos) {
            break;
        }

        let start = pos;
        let closing = match byte {
            b'"' => Some(b'"'),
            b'<' => Some(b'>'),
            _ => None,
        };
        if let Some(closing) = closing {
            // An unterminated quote swallows the rest of the line.
            pos = bytes
                .iter()
                .skip(start + 1)
                .position(|&next| next == closing)
                .map_or(bytes.len(), |offset| start + offset + 2);
        } else {
            while bytes
                .get(pos)
                .is_some_and(|next| !next.is_ascii_whitespace() && !starts_comment(bytes, pos))
            {
                pos += 1;
            }
        }

        if let Some(token) = line.get(start..pos) {
            tokens.push(token);
        }
    }

    tokens
}

/// Checks for `//` or `/*` at `pos`.
fn starts_comment(bytes: &[u8], pos: usize) -> bool {
    bytes.get(pos) == Some(&b'/') && matches!(bytes.get(pos + 1), Some(b'/' | b'*'))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test_log::test]
    fn splits_on_any_whitespace() {
        assert_eq!(
            tokenize_line("  #pragma\tanki  mutator LOD 0 1 2 "),
            ["#pragma", "anki", "mutator", "LOD", "0", "1", "2"]
        );
        assert!(tokenize_line(" \t ").is_empty());
    }

    #[test_log::test]
    fn keeps_quoted_strings_whole() {
        assert_eq!(
            tokenize_line(r#"#include "my shaders/common.glsl""#),
            ["#include", r#""my shaders/common.glsl""#]
        );
        assert_eq!(
            tokenize_line("#include <lib/a b.glsl> // trailing"),
            ["#include", "<lib/a b.glsl>"]
        );
    }

    #[test_log::test]
    fn drops_comments() {
        assert_eq!(
            tokenize_line("#pragma anki end // done with the vertex stage"),
            ["#pragma", "anki", "end"]
        );
        assert_eq!(tokenize_line("#pragma anki end/* x */"), ["#pragma", "anki", "end"]);
        assert_eq!(
            tokenize_line(r#"#include "a//b.glsl""#),
            ["#include", r#""a//b.glsl""#]
        );
        assert_eq!(tokenize_line("#pragma anki end / 2"), ["#pragma", "anki", "end", "/", "2"]);
    }

    #[test_log::test]
    fn unterminated_quote_takes_the_rest_of_the_line() {
        assert_eq!(
            tokenize_line(r#"#include "broken.glsl"#),
            ["#include", r#""broken.glsl"#]
        );
    }
}
