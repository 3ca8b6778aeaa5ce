//! Byte-to-string decoding with HTML encoding sniffing.
//!
//! Priority order per the HTML encoding sniffing algorithm: a BOM wins,
//! then a recognized transport label, then a bounded pre-scan for a
//! `<meta charset>` (or `http-equiv` content-type) declaration, then the
//! `windows-1252` fallback.

use encoding_rs::{Encoding, WINDOWS_1252};

const PRESCAN_LIMIT: usize = 4096;

/// Decode raw HTML bytes; returns the text and the chosen encoding name.
pub fn decode_bytes(bytes: &[u8], transport_label: Option<&str>) -> (String, &'static str) {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        let (text, _) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        return (text.into_owned(), encoding.name());
    }
    if let Some(encoding) = transport_label
        .and_then(|label| Encoding::for_label(label.trim().as_bytes()))
    {
        let (text, _, _) = encoding.decode(bytes);
        return (text.into_owned(), encoding.name());
    }
    if let Some(encoding) = prescan_meta_charset(bytes) {
        let (text, _, _) = encoding.decode(bytes);
        return (text.into_owned(), encoding.name());
    }
    let (text, _, _) = WINDOWS_1252.decode(bytes);
    (text.into_owned(), WINDOWS_1252.name())
}

/// Scan the first bytes for a `<meta charset>` declaration. Comments are
/// skipped; the scan is ASCII-insensitive and bounded by `PRESCAN_LIMIT`.
fn prescan_meta_charset(bytes: &[u8]) -> Option<&'static Encoding> {
    let limit = bytes.len().min(PRESCAN_LIMIT);
    let lower: Vec<u8> = bytes[..limit]
        .iter()
        .map(|b| b.to_ascii_lowercase())
        .collect();
    let mut i = 0;
    while i < lower.len() {
        if lower[i] != b'<' {
            i += 1;
            continue;
        }
        if lower[i..].starts_with(b"<!--") {
            match find_subslice(&lower[i + 4..], b"-->") {
                Some(end) => i += 4 + end + 3,
                None => break,
            }
            continue;
        }
        if lower[i..].starts_with(b"<meta") {
            let tag_end = match lower[i..].iter().position(|&b| b == b'>') {
                Some(rel) => i + rel,
                None => break,
            };
            if let Some(encoding) = meta_charset_from_attrs(&lower[i + 5..tag_end]) {
                return Some(encoding);
            }
            i = tag_end + 1;
            continue;
        }
        i += 1;
    }
    None
}

fn meta_charset_from_attrs(attrs: &[u8]) -> Option<&'static Encoding> {
    if let Some(pos) = find_subslice(attrs, b"charset") {
        // Rule out the "charset=" buried in a content attribute value by
        // requiring it to start an attribute.
        let boundary_ok = pos == 0 || attrs[pos - 1].is_ascii_whitespace() || attrs[pos - 1] == b'"'
            || attrs[pos - 1] == b'\'';
        if boundary_ok
            && let Some(value) = attr_value_after(&attrs[pos + b"charset".len()..])
            && let Some(encoding) = Encoding::for_label(value)
        {
            return Some(encoding);
        }
    }
    if find_subslice(attrs, b"http-equiv").is_some()
        && let Some(content_pos) = find_subslice(attrs, b"content")
        && let Some(value) = attr_value_after(&attrs[content_pos + b"content".len()..])
        && let Some(charset_pos) = find_subslice(value, b"charset=")
    {
        let label: &[u8] = &value[charset_pos + b"charset=".len()..];
        let label = trim_label(label);
        if let Some(encoding) = Encoding::for_label(label) {
            return Some(encoding);
        }
    }
    None
}

/// Value following an attribute name: optional whitespace, `=`, optional
/// whitespace, then a quoted or bare token.
fn attr_value_after(slice: &[u8]) -> Option<&[u8]> {
    let mut i = 0;
    while i < slice.len() && slice[i].is_ascii_whitespace() {
        i += 1;
    }
    if slice.get(i) != Some(&b'=') {
        return None;
    }
    i += 1;
    while i < slice.len() && slice[i].is_ascii_whitespace() {
        i += 1;
    }
    match slice.get(i) {
        Some(&q) if q == b'"' || q == b'\'' => {
            let start = i + 1;
            let end = slice[start..].iter().position(|&b| b == q)? + start;
            Some(&slice[start..end])
        }
        Some(_) => {
            let start = i;
            let end = slice[start..]
                .iter()
                .position(|&b| b.is_ascii_whitespace() || b == b'/')
                .map_or(slice.len(), |rel| start + rel);
            Some(&slice[start..end])
        }
        None => None,
    }
}

fn trim_label(label: &[u8]) -> &[u8] {
    let start = label
        .iter()
        .position(|&b| !matches!(b, b' ' | b'\t' | b'"' | b'\''))
        .unwrap_or(label.len());
    let end = label[start..]
        .iter()
        .position(|&b| matches!(b, b' ' | b'\t' | b'"' | b'\'' | b';'))
        .map_or(label.len(), |rel| start + rel);
    &label[start..end]
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bom_wins_over_transport_label() {
        let bytes = b"\xEF\xBB\xBF<p>caf\xC3\xA9</p>";
        let (text, name) = decode_bytes(bytes, Some("windows-1252"));
        assert_eq!(text, "<p>café</p>");
        assert_eq!(name, "UTF-8");
    }

    #[test]
    fn transport_label_wins_over_meta() {
        let bytes = b"<meta charset=\"utf-8\"><p>\xE9</p>";
        let (text, name) = decode_bytes(bytes, Some("windows-1252"));
        assert_eq!(name, "windows-1252");
        assert_eq!(text, "<meta charset=\"utf-8\"><p>é</p>");
    }

    #[test]
    fn meta_charset_is_sniffed() {
        let bytes = b"<!doctype html><meta charset='utf-8'><p>ok</p>";
        let (_, name) = decode_bytes(bytes, None);
        assert_eq!(name, "UTF-8");
    }

    #[test]
    fn meta_inside_comment_is_ignored() {
        let bytes = b"<!-- <meta charset='utf-8'> --><p>x</p>";
        let (_, name) = decode_bytes(bytes, None);
        assert_eq!(name, "windows-1252");
    }

    #[test]
    fn http_equiv_content_type_is_sniffed() {
        let bytes =
            b"<meta http-equiv=\"Content-Type\" content=\"text/html; charset=utf-8\"><p>x</p>";
        let (_, name) = decode_bytes(bytes, None);
        assert_eq!(name, "UTF-8");
    }

    #[test]
    fn fallback_maps_c1_range_through_windows_1252() {
        let bytes = b"caf\xE9 \x80";
        let (text, name) = decode_bytes(bytes, None);
        assert_eq!(name, "windows-1252");
        assert_eq!(text, "café \u{20AC}");
    }

    #[test]
    fn empty_input_decodes_to_empty_string() {
        let (text, name) = decode_bytes(b"", None);
        assert!(text.is_empty());
        assert_eq!(name, "windows-1252");
    }
}
