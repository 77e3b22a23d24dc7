//! Bounded inflation of compressed streams
//!
//! lopdf inflates FlateDecode streams in one unbounded read, and it does so
//! for object and cross-reference streams while the file is still loading.
//! Every stream is measured through a capped reader before that happens.

use flate2::read::ZlibDecoder;
use lopdf::{Document, Object};
use std::io::Read;

use super::extract::ExtractionError;

const STREAM_KEYWORD: &[u8] = b"stream";
const END_PREFIX: &[u8] = b"end";
const ENDSTREAM_KEYWORD: &[u8] = b"endstream";

/// Filters whose decoded size cannot be measured ahead of lopdf
const UNMEASURED_FILTERS: [&str; 2] = ["LZWDecode", "ASCII85Decode"];

const CHUNK: usize = 8 * 1024;

/// Measure every stream in the raw file before it is handed to the parser
///
/// Stream data is located by its `stream` keyword, so streams hidden behind
/// broken cross-reference tables are measured too. The inflated sizes of all
/// streams are summed against `limit`.
pub fn check_raw_streams(bytes: &[u8], limit: usize) -> Result<(), ExtractionError> {
    let mut total = 0usize;
    let mut dictionary_start = 0usize;
    let mut cursor = 0usize;

    while let Some(found) = find(&bytes[cursor..], STREAM_KEYWORD) {
        let keyword = cursor + found;
        let after = keyword + STREAM_KEYWORD.len();
        cursor = after;

        if keyword >= END_PREFIX.len() && &bytes[keyword - END_PREFIX.len()..keyword] == END_PREFIX {
            dictionary_start = after;
            continue;
        }
        let Some(data_start) = skip_eol(bytes, after) else {
            continue;
        };

        let names = decode_name_escapes(&bytes[dictionary_start..keyword]);
        if let Some(filter) = UNMEASURED_FILTERS.iter().find(|f| contains(&names, f.as_bytes())) {
            return Err(ExtractionError::UnsupportedFilter(filter.to_string()));
        }

        total += inflated_len(&bytes[data_start..], limit.saturating_sub(total))?;
        if total > limit {
            return Err(ExtractionError::DecompressionLimitExceeded(limit));
        }

        match find(&bytes[data_start..], ENDSTREAM_KEYWORD) {
            Some(end) => {
                cursor = data_start + end + ENDSTREAM_KEYWORD.len();
                dictionary_start = cursor;
            }
            None => break,
        }
    }

    Ok(())
}

/// Measure the streams of a loaded document
///
/// Needed after decryption: the raw scan only saw ciphertext.
pub fn check_document_streams(document: &Document, limit: usize) -> Result<(), ExtractionError> {
    let mut total = 0usize;
    for object in document.objects.values() {
        let Object::Stream(stream) = object else {
            continue;
        };
        let Ok(filters) = stream.filters() else {
            continue;
        };
        if let Some(filter) = filters.iter().find(|f| UNMEASURED_FILTERS.contains(&f.as_str())) {
            return Err(ExtractionError::UnsupportedFilter(filter.clone()));
        }
        if filters.first().map(String::as_str) != Some("FlateDecode") {
            continue;
        }

        total += inflated_len(&stream.content, limit.saturating_sub(total))?;
        if total > limit {
            return Err(ExtractionError::DecompressionLimitExceeded(limit));
        }
    }
    Ok(())
}

/// Inflate at most `remaining + 1` bytes and report how many came out
///
/// Data that is not a valid zlib stream counts for whatever decoded before
/// the error; lopdf treats such streams the same way.
fn inflated_len(data: &[u8], remaining: usize) -> Result<usize, ExtractionError> {
    let mut decoder = ZlibDecoder::new(data);
    let mut buffer = [0u8; CHUNK];
    let mut produced = 0usize;

    loop {
        match decoder.read(&mut buffer) {
            Ok(0) | Err(_) => return Ok(produced),
            Ok(n) => produced += n,
        }
        if produced > remaining {
            return Ok(produced);
        }
    }
}

fn skip_eol(bytes: &[u8], at: usize) -> Option<usize> {
    match bytes.get(at..) {
        Some([b'\r', b'\n', ..]) => Some(at + 2),
        Some([b'\n' | b'\r', ..]) => Some(at + 1),
        _ => None,
    }
}

/// Resolve `#xx` escapes so `/LZW#44ecode` reads as `/LZWDecode`
fn decode_name_escapes(raw: &[u8]) -> Vec<u8> {
    let mut decoded = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'#' {
            let hex = raw.get(i + 1..i + 3).and_then(|h| std::str::from_utf8(h).ok());
            if let Some(byte) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                decoded.push(byte);
                i += 3;
                continue;
            }
        }
        decoded.push(raw[i]);
        i += 1;
    }
    decoded
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    find(haystack, needle).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn deflate(data: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn raw_stream(dictionary: &str, data: &[u8]) -> Vec<u8> {
        let mut bytes = format!("%PDF-1.5\n1 0 obj\n<< {} /Length {} >>\nstream\n", dictionary, data.len()).into_bytes();
        bytes.extend_from_slice(data);
        bytes.extend_from_slice(b"\nendstream\nendobj\n%%EOF\n");
        bytes
    }

    #[test]
    fn test_name_escapes() {
        assert_eq!(decode_name_escapes(b"/LZW#44ecode"), b"/LZWDecode".to_vec());
        assert_eq!(decode_name_escapes(b"/A#2"), b"/A#2".to_vec());
        assert_eq!(decode_name_escapes(b"/F#zz"), b"/F#zz".to_vec());
    }

    #[test]
    fn test_inflated_len_stops_past_remaining() {
        let packed = deflate(&vec![0u8; 1024 * 1024]);
        assert!(inflated_len(&packed, 4096).unwrap() > 4096);
        assert!(inflated_len(&packed, 4096).unwrap() <= 4096 + CHUNK);
        assert_eq!(inflated_len(&packed, usize::MAX).unwrap(), 1024 * 1024);
        assert_eq!(inflated_len(b"not zlib at all", 10).unwrap(), 0);
    }

    #[test]
    fn test_raw_scan_catches_oversized_stream() {
        let bytes = raw_stream("/Filter /FlateDecode", &deflate(&vec![b' '; 64 * 1024]));

        assert!(check_raw_streams(&bytes, 128 * 1024).is_ok());
        assert!(matches!(
            check_raw_streams(&bytes, 16 * 1024),
            Err(ExtractionError::DecompressionLimitExceeded(limit)) if limit == 16 * 1024
        ));
    }

    #[test]
    fn test_raw_scan_sums_streams() {
        let packed = deflate(&vec![b'a'; 10 * 1024]);
        let mut bytes = raw_stream("/Filter /FlateDecode", &packed);
        bytes.extend_from_slice(&raw_stream("/Filter /FlateDecode", &packed)[9..]);

        assert!(check_raw_streams(&bytes, 15 * 1024).is_err());
        assert!(check_raw_streams(&bytes, 25 * 1024).is_ok());
    }

    #[test]
    fn test_raw_scan_rejects_unmeasured_filters() {
        let lzw = raw_stream("/Filter /LZWDecode", b"\x80\x0b\x60\x50");
        assert!(matches!(
            check_raw_streams(&lzw, 1024),
            Err(ExtractionError::UnsupportedFilter(name)) if name == "LZWDecode"
        ));

        let escaped = raw_stream("/Filter [/ASCII85#44ecode /FlateDecode]", b"z~>");
        assert!(matches!(
            check_raw_streams(&escaped, 1024),
            Err(ExtractionError::UnsupportedFilter(name)) if name == "ASCII85Decode"
        ));
    }

    #[test]
    fn test_raw_scan_ignores_plain_streams() {
        let bytes = raw_stream("", b"BT (hello) Tj ET");
        assert!(check_raw_streams(&bytes, 1).is_ok());
    }
}
