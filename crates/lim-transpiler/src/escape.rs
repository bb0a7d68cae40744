//! Escaping of literal text embedded in `[[...]]` long strings.
//!
//! Three bytes cannot appear raw inside the literal:
//! - `]`, because `]]` closes it
//! - `\r`, because Lua folds CR and CRLF into `\n` inside long strings
//! - [`ESCAPE`], so decoding stays unambiguous
//!
//! Each is replaced by [`ESCAPE`] followed by a code digit. Decoding runs
//! inside the generated program, so rendered output is byte-identical to
//! the source text.

/// Lead byte of every escape sequence (ASCII SUB).
pub const ESCAPE: u8 = 0x1a;

const CODES: [(u8, u8); 3] = [(ESCAPE, b'0'), (b']', b'1'), (b'\r', b'2')];

/// Whether `byte` must be escaped before embedding.
pub fn is_reserved(byte: u8) -> bool {
    CODES.iter().any(|&(raw, _)| raw == byte)
}

/// Append the embedded form of `byte` to `out`.
pub fn encode_byte(byte: u8, out: &mut Vec<u8>) {
    match CODES.iter().find(|&&(raw, _)| raw == byte) {
        Some(&(_, code)) => out.extend_from_slice(&[ESCAPE, code]),
        None => out.push(byte),
    }
}

/// Encode a whole text span.
pub fn encode(text: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for &b in text {
        encode_byte(b, &mut out);
    }
    out
}

/// Append the decoded form of `text` to `out`.
///
/// A lead byte without a known code is kept as is.
pub fn decode_into(text: &[u8], out: &mut Vec<u8>) {
    let mut i = 0;
    while i < text.len() {
        let b = text[i];
        if b == ESCAPE {
            let raw = text
                .get(i + 1)
                .and_then(|&next| CODES.iter().find(|&&(_, code)| code == next));
            if let Some(&(raw, _)) = raw {
                out.push(raw);
                i += 2;
                continue;
            }
        }
        out.push(b);
        i += 1;
    }
}

/// Decode a whole text span.
pub fn decode(text: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    decode_into(text, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_untouched() {
        assert_eq!(encode(b"<p>hello</p>"), b"<p>hello</p>");
    }

    #[test]
    fn test_closing_bracket_removed() {
        let encoded = encode(b"[[test]]");
        assert!(!encoded.windows(2).any(|w| w == b"]]"));
        assert!(!encoded.contains(&b']'));
        assert_eq!(decode(&encoded), b"[[test]]");
    }

    #[test]
    fn test_carriage_return_removed() {
        let encoded = encode(b"a\r\nb\rc");
        assert!(!encoded.contains(&b'\r'));
        assert_eq!(decode(&encoded), b"a\r\nb\rc");
    }

    #[test]
    fn test_escape_byte_in_text() {
        let text = [b'x', ESCAPE, b'1', b'y'];
        let encoded = encode(&text);
        assert_eq!(decode(&encoded), text);
    }

    #[test]
    fn test_unknown_code_kept() {
        assert_eq!(decode(&[ESCAPE, b'9']), vec![ESCAPE, b'9']);
        assert_eq!(decode(&[b'a', ESCAPE]), vec![b'a', ESCAPE]);
    }

    #[test]
    fn test_reserved_set() {
        assert!(is_reserved(b']'));
        assert!(is_reserved(b'\r'));
        assert!(is_reserved(ESCAPE));
        assert!(!is_reserved(b'['));
        assert!(!is_reserved(b'\n'));
    }
}
