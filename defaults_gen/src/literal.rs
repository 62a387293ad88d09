//! Byte-string literals for embedding raw segments in generated Rust.
//!
//! Every byte becomes a four character `\xHH` escape. Long literals are
//! wrapped with trailing-backslash continuations, which the Rust lexer joins
//! back together (skipping the next line's leading whitespace).

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Length of one `\xHH` escape.
pub const ESCAPE_LEN: usize = 4;

/// Smallest wrap width accepted by the generator options.
pub const MIN_WRAP_WIDTH: usize = 5;

const LITERAL_OPEN: &str = "b\"";
const LITERAL_CLOSE: &str = "\",";

pub fn encode_hex(byte: u8) -> [char; 2] {
    [
        HEX_DIGITS[usize::from(byte >> 4)] as char,
        HEX_DIGITS[usize::from(byte & 0x0f)] as char,
    ]
}

pub fn make_literal(bytes: &[u8]) -> String {
    let mut literal = String::with_capacity(bytes.len() * ESCAPE_LEN);
    for &byte in bytes {
        let [high, low] = encode_hex(byte);
        literal.push_str("\\x");
        literal.push(high);
        literal.push(low);
    }
    literal
}

/// Reverses [`make_literal`]. Returns `None` on anything that is not a
/// sequence of `\xHH` escapes.
pub fn decode_literal(literal: &str) -> Option<Vec<u8>> {
    let raw = literal.as_bytes();
    if raw.len() % ESCAPE_LEN != 0 {
        return None;
    }
    raw.chunks(ESCAPE_LEN)
        .map(|escape| match escape {
            [b'\\', b'x', high, low] => {
                let high = (*high as char).to_digit(16)?;
                let low = (*low as char).to_digit(16)?;
                Some((high * 16 + low) as u8)
            }
            _ => None,
        })
        .collect()
}

/// Renders one segment as the lines of a wrapped byte-string literal.
///
/// Chunks are `wrap` characters long, except that a split point is pushed
/// forward until it lands on the backslash opening an escape. The first line
/// opens the literal with `b"`, every line but the last ends with a `\`
/// continuation, and the last line closes the literal with `",`.
pub fn emit_literal_seg(segment: &[u8], wrap: usize) -> Vec<String> {
    assert!(wrap > 0, "literal wrap width must be positive");
    let literal = make_literal(segment);
    let raw = literal.as_bytes();
    let len = raw.len();

    let mut chunks = Vec::with_capacity(len / wrap + 1);
    let mut start = 0;
    loop {
        let mut end = start + wrap;
        while end < len && raw[end] != b'\\' {
            end += 1;
        }
        if end >= len {
            chunks.push(&literal[start..]);
            break;
        }
        assert!(end <= len, "wrap boundary past the end of the literal");
        chunks.push(&literal[start..end]);
        start = end;
    }

    let last = chunks.len() - 1;
    chunks
        .into_iter()
        .enumerate()
        .map(|(index, chunk)| {
            let open = if index == 0 { LITERAL_OPEN } else { "" };
            let close = if index == last { LITERAL_CLOSE } else { "\\" };
            format!("{open}{chunk}{close}")
        })
        .collect()
}

/// Joins lines produced by [`emit_literal_seg`] back into the escaped
/// literal, dropping indentation, the opening `b"`, continuations and the
/// closing quote.
pub fn literal_content<S: AsRef<str>>(lines: &[S]) -> String {
    let mut content = String::new();
    let last = lines.len().saturating_sub(1);
    for (index, line) in lines.iter().enumerate() {
        let mut line = line.as_ref().trim_start();
        if index == 0 {
            line = line.strip_prefix(LITERAL_OPEN).unwrap_or(line);
        }
        line = if index == last {
            line.strip_suffix(LITERAL_CLOSE).unwrap_or(line)
        } else {
            line.strip_suffix('\\').unwrap_or(line)
        };
        content.push_str(line);
    }
    content
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 37 + 11) as u8).collect()
    }

    #[test]
    fn hex_uses_lowercase_alphabet() {
        assert_eq!(encode_hex(0x00), ['0', '0']);
        assert_eq!(encode_hex(0xab), ['a', 'b']);
        assert_eq!(encode_hex(0xff), ['f', 'f']);
    }

    #[test]
    fn literal_escapes_every_byte() {
        assert_eq!(make_literal(&[0x01, 0x00, 0x5c]), "\\x01\\x00\\x5c");
        assert_eq!(make_literal(&[]), "");
    }

    #[test]
    fn literal_decodes_back_for_every_byte_value() {
        let all: Vec<u8> = (0..=255).collect();
        assert_eq!(decode_literal(&make_literal(&all)), Some(all));
        assert_eq!(decode_literal("\\x0"), None);
        assert_eq!(decode_literal("\\y00"), None);
        assert_eq!(decode_literal("\\xzz"), None);
    }

    #[test]
    fn seventeen_bytes_at_width_eight_wrap_into_nine_lines() {
        let bytes = sample(17);
        let lines = emit_literal_seg(&bytes, 8);

        assert_eq!(lines.len(), 9);
        assert!(lines[0].starts_with("b\"\\x"));
        assert!(lines[..8].iter().all(|line| line.ends_with('\\')));
        assert!(lines[8].ends_with("\","));
        assert_eq!(literal_content(&lines), make_literal(&bytes));
    }

    #[test]
    fn boundaries_never_split_an_escape() {
        for len in [0usize, 1, 2, 7, 16, 33, 100] {
            let bytes = sample(len);
            let expected = make_literal(&bytes);
            for wrap in 5..=23 {
                let lines = emit_literal_seg(&bytes, wrap);
                assert_eq!(literal_content(&lines), expected, "len {len} wrap {wrap}");
                for (index, line) in lines.iter().enumerate() {
                    let body = if index == 0 { &line[2..] } else { line.as_str() };
                    let chunk = body
                        .strip_suffix("\",")
                        .or_else(|| body.strip_suffix('\\'))
                        .unwrap();
                    assert!(chunk.is_empty() || chunk.starts_with("\\x"), "line {line:?}");
                    assert_eq!(chunk.len() % ESCAPE_LEN, 0, "line {line:?}");
                }
            }
        }
    }

    #[test]
    fn end_on_boundary_has_no_empty_trailing_line() {
        let bytes = sample(4);
        let lines = emit_literal_seg(&bytes, 8);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], format!("{}\",", &make_literal(&bytes)[8..]));
    }

    #[test]
    fn empty_segment_is_a_single_empty_literal() {
        assert_eq!(emit_literal_seg(&[], 8), vec!["b\"\",".to_string()]);
    }
}
