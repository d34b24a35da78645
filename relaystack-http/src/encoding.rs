//! String encoding corrections between the gateway and the application
//!
//! The gateway delivers everything as UTF-8 JSON text, while applications
//! see header values and paths as byte strings with one unit per byte.
//! Header values arrive with non-ASCII bytes backslash-escaped by the
//! transport; paths arrive as UTF-8 text. Both are turned back into their
//! raw byte sequences here.

use percent_encoding::{percent_decode_str, percent_encode, AsciiSet, CONTROLS};
use thiserror::Error;

/// Bytes escaped when a raw path is placed into a request URI
const PATH: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Bytes escaped in a raw query string; existing `%XX` sequences are kept
const QUERY: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>');

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    #[error("Malformed escape sequence at byte {position} in {value:?}")]
    MalformedEscape { value: String, position: usize },
}

/// Undo the transport's backslash escaping of a header or cookie value.
///
/// `\xHH` becomes the byte `HH` and `\\` a single backslash. Any other
/// escape is kept literally. A truncated `\x` escape or a trailing lone
/// backslash is an error.
pub fn unescape_header_value(value: &str) -> Result<Vec<u8>, EncodingError> {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'\\' {
            out.push(bytes[i]);
            i += 1;
            continue;
        }

        let malformed = move || EncodingError::MalformedEscape {
            value: value.to_string(),
            position: i,
        };

        match bytes.get(i + 1) {
            Some(b'\\') => {
                out.push(b'\\');
                i += 2;
            }
            Some(b'x') => {
                let hi = bytes.get(i + 2).and_then(|b| hex_digit(*b)).ok_or_else(malformed)?;
                let lo = bytes.get(i + 3).and_then(|b| hex_digit(*b)).ok_or_else(malformed)?;
                out.push((hi << 4) | lo);
                i += 4;
            }
            Some(_) => {
                out.push(b'\\');
                i += 1;
            }
            None => return Err(malformed()),
        }
    }

    Ok(out)
}

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Raw bytes of a request path delivered as UTF-8 text.
///
/// Percent escapes are decoded, every other character contributes its
/// UTF-8 bytes.
pub fn path_bytes(path: &str) -> Vec<u8> {
    percent_decode_str(path).collect()
}

/// Place a UTF-8 path into a request URI byte by byte.
///
/// Each byte of the path ends up as exactly one unit in the URI, either
/// itself or a `%XX` escape, so the application recovers the original
/// byte sequence by percent-decoding.
pub fn encode_path(path: &str) -> String {
    let bytes = path_bytes(path);
    let encoded = percent_encode(&bytes, PATH).to_string();
    if encoded.starts_with('/') {
        encoded
    } else {
        format!("/{}", encoded)
    }
}

/// Make a raw query string safe for a request URI
pub fn encode_query(query: &str) -> String {
    percent_encode(query.as_bytes(), QUERY).to_string()
}

/// Decode bytes with one character per byte (ISO-8859-1)
pub fn decode_single_byte(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}
