//! HTML tokenizer.
//!
//! A single-pass scanner over a complete decoded input string, surfaced as a
//! lazy token iterator. Re-running the tokenizer over the same input yields
//! the same sequence; there is no incremental feeding.
//!
//! Invariants:
//! - Every token carries the byte offset of its first character in the input.
//! - CR and CRLF collapse to LF on every text emission, before character
//!   references are decoded. NUL bytes survive tokenization; the tree
//!   builder decides their fate from parent context.
//! - Tag and attribute names are ASCII-lowercased at emission; duplicate
//!   attribute names are dropped after the first occurrence.
//! - Recoverable errors accumulate on the tokenizer and never abort the
//!   scan; unterminated constructs still emit best-effort tokens.

use crate::entities;
use crate::error::{ErrorCode, ErrorOrigin, ParseError};
use crate::tag_tables::{is_raw_text_element, is_rcdata_element};
use memchr::{memchr, memchr2};
use std::borrow::Cow;
use std::collections::VecDeque;

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    StartTag {
        name: String,
        attrs: Vec<(String, String)>,
        self_closing: bool,
    },
    EndTag {
        name: String,
    },
    Text {
        data: String,
    },
    Comment {
        data: String,
    },
    Doctype {
        name: Option<String>,
        public_id: Option<String>,
        system_id: Option<String>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    /// Byte offset of the token's first character in the input.
    pub pos: usize,
    pub kind: TokenKind,
}

/// Byte offsets of line starts, for mapping offsets to 1-based positions.
#[derive(Clone, Debug)]
pub(crate) struct LineMap {
    line_starts: Vec<usize>,
}

impl LineMap {
    pub(crate) fn new(input: &str) -> Self {
        let mut line_starts = vec![0];
        let bytes = input.as_bytes();
        let mut i = 0;
        while let Some(rel) = memchr2(b'\n', b'\r', &bytes[i..]) {
            let p = i + rel;
            // CRLF counts as a single line break.
            let next = if bytes[p] == b'\r' && bytes.get(p + 1) == Some(&b'\n') {
                p + 2
            } else {
                p + 1
            };
            line_starts.push(next);
            i = next;
        }
        Self { line_starts }
    }

    /// 1-based `(line, column)` of a byte offset; the column counts
    /// characters, not bytes.
    pub(crate) fn locate(&self, input: &str, offset: usize) -> (u32, u32) {
        let offset = offset.min(input.len());
        let line_index = self.line_starts.partition_point(|&start| start <= offset) - 1;
        let line_start = self.line_starts[line_index];
        let column = input[line_start..offset].chars().count() + 1;
        (line_index as u32 + 1, column as u32)
    }
}

pub struct Tokenizer<'a> {
    input: &'a str,
    line_map: LineMap,
    cursor: usize,
    queue: VecDeque<Token>,
    errors: Vec<ParseError>,
    finished: bool,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            line_map: LineMap::new(input),
            cursor: 0,
            queue: VecDeque::new(),
            errors: Vec::new(),
            finished: false,
        }
    }

    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    pub(crate) fn take_errors(&mut self) -> Vec<ParseError> {
        std::mem::take(&mut self.errors)
    }

    pub(crate) fn locate(&self, offset: usize) -> (u32, u32) {
        self.line_map.locate(self.input, offset)
    }

    pub(crate) fn input_len(&self) -> usize {
        self.input.len()
    }

    fn error(&mut self, code: ErrorCode, offset: usize, message: impl Into<String>) {
        let (line, column) = self.locate(offset);
        self.errors.push(ParseError {
            origin: ErrorOrigin::Tokenizer,
            code,
            message: message.into(),
            line: Some(line),
            column: Some(column),
        });
    }

    fn emit(&mut self, pos: usize, kind: TokenKind) {
        log::trace!(target: "html.tokenizer", "emit at {pos}: {kind:?}");
        self.queue.push_back(Token { pos, kind });
    }

    /// Emit a text run after newline normalization and, unless the run is
    /// raw element content, character-reference decoding.
    fn emit_text(&mut self, start: usize, end: usize, decode: bool) {
        if start >= end {
            return;
        }
        let normalized = normalize_newlines(&self.input[start..end]);
        let data = if decode {
            match entities::decode(&normalized, false) {
                Cow::Borrowed(_) => normalized,
                Cow::Owned(decoded) => Cow::Owned(decoded),
            }
        } else {
            normalized
        };
        if data.is_empty() {
            return;
        }
        self.emit(
            start,
            TokenKind::Text {
                data: data.into_owned(),
            },
        );
    }

    fn scan_step(&mut self) {
        let bytes = self.input.as_bytes();
        let len = bytes.len();
        if self.cursor >= len {
            self.finished = true;
            return;
        }
        let at = self.cursor;

        if bytes[at] != b'<' {
            let end = memchr(b'<', &bytes[at..]).map_or(len, |rel| at + rel);
            self.cursor = end;
            self.emit_text(at, end, true);
            return;
        }

        let rest = &self.input[at..];
        if rest.starts_with("<!--") {
            self.scan_comment(at);
            return;
        }
        if starts_with_ignore_ascii_case(rest, "<!doctype") {
            self.scan_doctype(at);
            return;
        }
        if rest.starts_with("<![CDATA[") {
            self.scan_cdata(at);
            return;
        }
        if rest.starts_with("<!") {
            self.scan_bogus_comment(at, at + 2);
            return;
        }
        if rest.starts_with("<?") {
            // Processing-instruction-like markup keeps its `?` prefix.
            self.scan_bogus_comment(at, at + 1);
            return;
        }
        if rest.starts_with("</") {
            match bytes.get(at + 2).copied() {
                Some(b) if b.is_ascii_alphabetic() => {
                    self.scan_end_tag(at);
                    return;
                }
                Some(b) if b.is_ascii_whitespace() => {
                    self.scan_bogus_comment(at, at + 2);
                    return;
                }
                _ => {}
            }
        } else if bytes.get(at + 1).is_some_and(|b| b.is_ascii_alphabetic()) {
            self.scan_start_tag(at);
            return;
        }

        // Literal '<': fold it into the following text run.
        let end = memchr(b'<', &bytes[at + 1..]).map_or(len, |rel| at + 1 + rel);
        self.cursor = end;
        self.emit_text(at, end, true);
    }

    fn scan_comment(&mut self, at: usize) {
        let input = self.input;
        let body = at + 4;
        if input[body..].starts_with('>') {
            self.cursor = body + 1;
            self.emit(at, TokenKind::Comment { data: String::new() });
            return;
        }
        if input[body..].starts_with("->") {
            self.cursor = body + 2;
            self.emit(at, TokenKind::Comment { data: String::new() });
            return;
        }

        let mut i = body;
        while let Some(rel) = input[i..].find("--") {
            let dashes = i + rel;
            let after = dashes + 2;
            let tail = &input[after..];
            if tail.starts_with('>') {
                self.cursor = after + 1;
                let data = normalize_newlines(&input[body..dashes]).into_owned();
                self.emit(at, TokenKind::Comment { data });
                return;
            }
            if tail.starts_with("!>") {
                self.cursor = after + 2;
                let data = normalize_newlines(&input[body..dashes]).into_owned();
                self.emit(at, TokenKind::Comment { data });
                return;
            }
            i = dashes + 1;
        }

        self.error(ErrorCode::EofInComment, at, "unterminated comment");
        self.cursor = input.len();
        let data = normalize_newlines(&input[body..]).into_owned();
        self.emit(at, TokenKind::Comment { data });
    }

    fn scan_doctype(&mut self, at: usize) {
        let input = self.input;
        let decl_start = at + "<!doctype".len();
        let close = memchr(b'>', &input.as_bytes()[decl_start..]).map(|rel| decl_start + rel);
        let region = match close {
            Some(end) => &input[decl_start..end],
            None => &input[decl_start..],
        };

        let (name, public_id, system_id) = parse_doctype_declaration(region);

        match close {
            Some(end) => self.cursor = end + 1,
            None => {
                self.error(ErrorCode::EofInDoctype, at, "unterminated doctype");
                self.cursor = input.len();
            }
        }
        self.emit(
            at,
            TokenKind::Doctype {
                name,
                public_id,
                system_id,
            },
        );
    }

    fn scan_cdata(&mut self, at: usize) {
        let input = self.input;
        let body = at + "<![CDATA[".len();
        let payload = match input[body..].find("]]>") {
            Some(rel) => {
                self.cursor = body + rel + 3;
                &input[body..body + rel]
            }
            None => {
                self.cursor = input.len();
                &input[body..]
            }
        };
        // Wrapped so the tree builder can recognize the section and convert
        // it to text inside foreign content.
        let data = format!("[CDATA[{}]]", normalize_newlines(payload));
        self.emit(at, TokenKind::Comment { data });
    }

    fn scan_bogus_comment(&mut self, at: usize, data_start: usize) {
        let input = self.input;
        let raw = match memchr(b'>', &input.as_bytes()[data_start..]) {
            Some(rel) => {
                self.cursor = data_start + rel + 1;
                &input[data_start..data_start + rel]
            }
            None => {
                self.cursor = input.len();
                &input[data_start..]
            }
        };
        let data = normalize_newlines(raw).replace('\0', "\u{FFFD}");
        self.emit(at, TokenKind::Comment { data });
    }

    fn scan_end_tag(&mut self, at: usize) {
        let bytes = self.input.as_bytes();
        let len = bytes.len();
        let name_start = at + 2;
        let mut j = name_start;
        while j < len && is_tag_name_byte(bytes[j]) {
            j += 1;
        }
        let name = self.input[name_start..j].to_ascii_lowercase();
        // Junk between the name and `>` is skipped, `</div foo>` included.
        let Some(rel) = memchr(b'>', &bytes[j..]) else {
            self.error(
                ErrorCode::EofInTag,
                at,
                format!("unterminated end tag </{name}"),
            );
            self.cursor = len;
            self.emit_text(at, len, true);
            return;
        };
        self.cursor = j + rel + 1;
        self.emit(at, TokenKind::EndTag { name });
    }

    fn scan_start_tag(&mut self, at: usize) {
        let input = self.input;
        let bytes = input.as_bytes();
        let len = bytes.len();
        let mut j = at + 1;
        while j < len && is_tag_name_byte(bytes[j]) {
            j += 1;
        }
        let name = input[at + 1..j].to_ascii_lowercase();

        let mut attrs: Vec<(String, String)> = Vec::new();
        let mut self_closing = false;
        let mut k = j;
        let mut closed = false;

        while k < len {
            while k < len && bytes[k].is_ascii_whitespace() {
                k += 1;
            }
            if k >= len {
                break;
            }
            match bytes[k] {
                b'>' => {
                    k += 1;
                    closed = true;
                    break;
                }
                b'/' => {
                    // Self-close only when nothing but slashes and
                    // whitespace remain before `>`.
                    let mut t = k + 1;
                    while t < len && (bytes[t].is_ascii_whitespace() || bytes[t] == b'/') {
                        t += 1;
                    }
                    if t < len && bytes[t] == b'>' {
                        self_closing = true;
                    }
                    k += 1;
                }
                _ => {
                    let name_start = k;
                    while k < len
                        && !bytes[k].is_ascii_whitespace()
                        && !matches!(bytes[k], b'=' | b'/' | b'>')
                    {
                        k += 1;
                    }
                    if k == name_start {
                        k += 1;
                        continue;
                    }
                    let attr_name = input[name_start..k].to_ascii_lowercase();

                    while k < len && bytes[k].is_ascii_whitespace() {
                        k += 1;
                    }
                    let mut value = String::new();
                    if k < len && bytes[k] == b'=' {
                        k += 1;
                        while k < len && bytes[k].is_ascii_whitespace() {
                            k += 1;
                        }
                        if k < len && (bytes[k] == b'"' || bytes[k] == b'\'') {
                            let quote = bytes[k];
                            k += 1;
                            let value_start = k;
                            while k < len && bytes[k] != quote {
                                k += 1;
                            }
                            if k >= len {
                                self.error(
                                    ErrorCode::EofInTag,
                                    at,
                                    format!("unterminated start tag <{name}"),
                                );
                                self.cursor = len;
                                self.emit_text(at, len, true);
                                return;
                            }
                            value = decode_attribute_value(&input[value_start..k]);
                            k += 1;
                        } else {
                            let value_start = k;
                            while k < len && !bytes[k].is_ascii_whitespace() && bytes[k] != b'>' {
                                k += 1;
                            }
                            value = decode_attribute_value(&input[value_start..k]);
                        }
                    }
                    if !attrs.iter().any(|(existing, _)| *existing == attr_name) {
                        attrs.push((attr_name, value));
                    }
                }
            }
        }

        if !closed {
            self.error(
                ErrorCode::EofInTag,
                at,
                format!("unterminated start tag <{name}"),
            );
            self.cursor = len;
            self.emit_text(at, len, true);
            return;
        }

        self.cursor = k;
        let raw_text = !self_closing && is_raw_text_element(&name);
        self.emit(
            at,
            TokenKind::StartTag {
                name: name.clone(),
                attrs,
                self_closing,
            },
        );
        if raw_text {
            self.scan_raw_text(&name, at, k);
        }
    }

    /// Consume element content up to the matching close tag, emitting one
    /// text token and the end tag. Entities decode only in RCDATA elements.
    fn scan_raw_text(&mut self, name: &str, tag_pos: usize, content_start: usize) {
        let len = self.input.len();
        let found = if name == "script" {
            self.find_script_close(content_start)
        } else {
            self.find_rawtext_close(name, content_start)
        };
        let decode = is_rcdata_element(name);
        match found {
            Some((close_start, resume)) => {
                self.emit_text(content_start, close_start, decode);
                self.emit(
                    close_start,
                    TokenKind::EndTag {
                        name: name.to_string(),
                    },
                );
                self.cursor = resume;
            }
            None => {
                self.error(
                    ErrorCode::ExpectedClosingTagButGotEof,
                    tag_pos,
                    format!("expected </{name}> before end of input"),
                );
                self.emit_text(content_start, len, decode);
                self.emit(
                    len,
                    TokenKind::EndTag {
                        name: name.to_string(),
                    },
                );
                self.cursor = len;
            }
        }
    }

    /// Find `</name` at a tag boundary (`>`, `/`, or whitespace). Returns
    /// the offset of the `<` and the cursor position after the closing `>`.
    fn find_rawtext_close(&self, name: &str, from: usize) -> Option<(usize, usize)> {
        let bytes = self.input.as_bytes();
        let len = bytes.len();
        let n = name.len();
        let mut i = from;
        while let Some(rel) = memchr(b'<', &bytes[i..]) {
            let p = i + rel;
            if p + 2 + n <= len
                && bytes[p + 1] == b'/'
                && self.input[p + 2..p + 2 + n].eq_ignore_ascii_case(name)
            {
                let after_name = p + 2 + n;
                match bytes.get(after_name) {
                    Some(b'>') => return Some((p, after_name + 1)),
                    Some(b) if *b == b'/' || b.is_ascii_whitespace() => {
                        let resume = memchr(b'>', &bytes[after_name..])
                            .map_or(len, |rel| after_name + rel + 1);
                        return Some((p, resume));
                    }
                    _ => {}
                }
            }
            i = p + 1;
        }
        None
    }

    /// Script close-tag scan with the two escape flags: `<!--` opens the
    /// escaped region, a nested `<script` inside it opens the double-escaped
    /// region, `</script` leaves double-escape, and `-->` clears both. Only
    /// a `</script` seen with neither flag set closes the element.
    ///
    /// The flags react to tag-shaped byte sequences only; a `<script`
    /// inside an attribute value of the nested tag is not modeled.
    fn find_script_close(&self, from: usize) -> Option<(usize, usize)> {
        let input = self.input;
        let bytes = input.as_bytes();
        let len = bytes.len();
        let mut escaped = false;
        let mut double_escaped = false;
        let mut i = from;
        while let Some(rel) = memchr2(b'<', b'-', &bytes[i..]) {
            let p = i + rel;
            if bytes[p] == b'-' {
                if input[p..].starts_with("-->") {
                    escaped = false;
                    double_escaped = false;
                    i = p + 3;
                } else {
                    i = p + 1;
                }
                continue;
            }
            if input[p..].starts_with("<!--") {
                escaped = true;
                i = p + 4;
                continue;
            }
            if p + 8 <= len
                && bytes[p + 1] == b'/'
                && input[p + 2..p + 8].eq_ignore_ascii_case("script")
                && is_tag_boundary(bytes.get(p + 8))
            {
                if double_escaped {
                    double_escaped = false;
                    i = p + 8;
                    continue;
                }
                if !escaped {
                    let after_name = p + 8;
                    let resume = match bytes.get(after_name) {
                        Some(b'>') => after_name + 1,
                        _ => memchr(b'>', &bytes[after_name..])
                            .map_or(len, |rel| after_name + rel + 1),
                    };
                    return Some((p, resume));
                }
                i = p + 1;
                continue;
            }
            if escaped
                && p + 7 <= len
                && input[p + 1..p + 7].eq_ignore_ascii_case("script")
                && is_tag_boundary(bytes.get(p + 7))
            {
                double_escaped = true;
                i = p + 7;
                continue;
            }
            i = p + 1;
        }
        None
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        loop {
            if let Some(token) = self.queue.pop_front() {
                return Some(token);
            }
            if self.finished {
                return None;
            }
            self.scan_step();
        }
    }
}

/// Tokenize a complete input; convenience for tests and the event stream.
pub fn tokenize(input: &str) -> Vec<Token> {
    Tokenizer::new(input).collect()
}

fn is_tag_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b':' || b == b'-'
}

fn is_tag_boundary(b: Option<&u8>) -> bool {
    match b {
        Some(b) => matches!(*b, b'>' | b'/') || b.is_ascii_whitespace(),
        None => false,
    }
}

fn starts_with_ignore_ascii_case(haystack: &str, needle: &str) -> bool {
    haystack.len() >= needle.len()
        && haystack.as_bytes()[..needle.len()].eq_ignore_ascii_case(needle.as_bytes())
}

fn normalize_newlines(s: &str) -> Cow<'_, str> {
    if !s.as_bytes().contains(&b'\r') {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len());
    let bytes = s.as_bytes();
    let mut i = 0;
    let mut copy_start = 0;
    while let Some(rel) = memchr(b'\r', &bytes[i..]) {
        let p = i + rel;
        out.push_str(&s[copy_start..p]);
        out.push('\n');
        i = if bytes.get(p + 1) == Some(&b'\n') {
            p + 2
        } else {
            p + 1
        };
        copy_start = i;
    }
    out.push_str(&s[copy_start..]);
    Cow::Owned(out)
}

fn decode_attribute_value(raw: &str) -> String {
    let normalized = normalize_newlines(raw);
    match entities::decode(&normalized, true) {
        Cow::Borrowed(_) => normalized.into_owned(),
        Cow::Owned(decoded) => decoded,
    }
}

fn parse_doctype_declaration(region: &str) -> (Option<String>, Option<String>, Option<String>) {
    let bytes = region.as_bytes();
    let len = bytes.len();
    let mut i = 0;
    let skip_ws = |i: &mut usize| {
        while *i < len && bytes[*i].is_ascii_whitespace() {
            *i += 1;
        }
    };

    skip_ws(&mut i);
    let name_start = i;
    while i < len && !bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    let name = (i > name_start).then(|| region[name_start..i].to_ascii_lowercase());

    skip_ws(&mut i);
    let keyword = &region[i..];
    if starts_with_ignore_ascii_case(keyword, "public") {
        i += "public".len();
        skip_ws(&mut i);
        let public_id = parse_quoted(region, &mut i);
        skip_ws(&mut i);
        let system_id = match parse_quoted(region, &mut i) {
            Some(id) => Some(id),
            // PUBLIC with a public id alone: the system id defaults to empty.
            None => public_id.as_ref().map(|_| String::new()),
        };
        return (name, public_id, system_id);
    }
    if starts_with_ignore_ascii_case(keyword, "system") {
        i += "system".len();
        skip_ws(&mut i);
        let system_id = parse_quoted(region, &mut i);
        let public_id = system_id.as_ref().map(|_| String::new());
        return (name, public_id, system_id);
    }
    (name, None, None)
}

fn parse_quoted(region: &str, i: &mut usize) -> Option<String> {
    let bytes = region.as_bytes();
    let quote = *bytes.get(*i)?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }
    *i += 1;
    let start = *i;
    while *i < bytes.len() && bytes[*i] != quote {
        *i += 1;
    }
    let value = region[start..*i].to_string();
    if *i < bytes.len() {
        *i += 1;
    }
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input).into_iter().map(|t| t.kind).collect()
    }

    fn text(data: &str) -> TokenKind {
        TokenKind::Text {
            data: data.to_string(),
        }
    }

    fn start(name: &str, attrs: &[(&str, &str)], self_closing: bool) -> TokenKind {
        TokenKind::StartTag {
            name: name.to_string(),
            attrs: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            self_closing,
        }
    }

    fn end(name: &str) -> TokenKind {
        TokenKind::EndTag {
            name: name.to_string(),
        }
    }

    #[test]
    fn tokenize_simple_element_with_text() {
        assert_eq!(
            kinds("<p>Hello</p>"),
            vec![start("p", &[], false), text("Hello"), end("p")]
        );
    }

    #[test]
    fn tokenize_lowercases_names_and_keeps_first_duplicate_attribute() {
        assert_eq!(
            kinds("<DiV ID=a id=b Class='c'>x</DIV>"),
            vec![
                start("div", &[("id", "a"), ("class", "c")], false),
                text("x"),
                end("div"),
            ]
        );
    }

    #[test]
    fn tokenize_attribute_value_forms() {
        assert_eq!(
            kinds("<a one two=bare three=\"dq\" four='sq' five=>x</a>"),
            vec![
                start(
                    "a",
                    &[
                        ("one", ""),
                        ("two", "bare"),
                        ("three", "dq"),
                        ("four", "sq"),
                        ("five", ""),
                    ],
                    false,
                ),
                text("x"),
                end("a"),
            ]
        );
    }

    #[test]
    fn tokenize_decodes_entities_in_attribute_values() {
        assert_eq!(
            kinds("<p title=\"Tom&amp;Jerry\" alt=&#x3C;ok&#x3E;></p>"),
            vec![
                start("p", &[("title", "Tom&Jerry"), ("alt", "<ok>")], false),
                end("p"),
            ]
        );
    }

    #[test]
    fn tokenize_attribute_quirk_keeps_bare_entity_literal() {
        // `&amp` followed by an alphanumeric stays literal in attributes
        // but decodes in text.
        assert_eq!(
            kinds("<p t=\"&ampx\">&ampx</p>"),
            vec![start("p", &[("t", "&ampx")], false), text("&x"), end("p")]
        );
    }

    #[test]
    fn tokenize_self_closing_variants() {
        assert_eq!(kinds("<br/>"), vec![start("br", &[], true)]);
        assert_eq!(kinds("<br />"), vec![start("br", &[], true)]);
        assert_eq!(kinds("<br / >"), vec![start("br", &[], true)]);
        // A slash inside an unquoted value is value content, not self-close.
        assert_eq!(
            kinds("<a href=/foo/>"),
            vec![start("a", &[("href", "/foo/")], false)]
        );
    }

    #[test]
    fn tokenize_comment_terminators() {
        assert_eq!(
            kinds("<!--x-->"),
            vec![TokenKind::Comment {
                data: "x".to_string()
            }]
        );
        assert_eq!(
            kinds("<!--x--!>y"),
            vec![
                TokenKind::Comment {
                    data: "x".to_string()
                },
                text("y"),
            ]
        );
        assert_eq!(
            kinds("<!-->"),
            vec![TokenKind::Comment {
                data: String::new()
            }]
        );
        assert_eq!(
            kinds("<!--->"),
            vec![TokenKind::Comment {
                data: String::new()
            }]
        );
    }

    #[test]
    fn tokenize_unterminated_comment_reports_error_with_position() {
        let mut tokenizer = Tokenizer::new("ab\n<!--x");
        let tokens: Vec<_> = tokenizer.by_ref().collect();
        assert_eq!(
            tokens.last().map(|t| &t.kind),
            Some(&TokenKind::Comment {
                data: "x".to_string()
            })
        );
        let errors = tokenizer.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, ErrorCode::EofInComment);
        assert_eq!((errors[0].line, errors[0].column), (Some(2), Some(1)));
    }

    #[test]
    fn tokenize_doctype_forms() {
        assert_eq!(
            kinds("<!DOCTYPE html>"),
            vec![TokenKind::Doctype {
                name: Some("html".to_string()),
                public_id: None,
                system_id: None,
            }]
        );
        assert_eq!(
            kinds("<!doctype HTML PUBLIC \"-//W3C//DTD HTML 4.01//EN\" 'http://x'>"),
            vec![TokenKind::Doctype {
                name: Some("html".to_string()),
                public_id: Some("-//W3C//DTD HTML 4.01//EN".to_string()),
                system_id: Some("http://x".to_string()),
            }]
        );
        assert_eq!(
            kinds("<!DOCTYPE html PUBLIC \"-//pub//\">"),
            vec![TokenKind::Doctype {
                name: Some("html".to_string()),
                public_id: Some("-//pub//".to_string()),
                system_id: Some(String::new()),
            }]
        );
        assert_eq!(
            kinds("<!DOCTYPE html SYSTEM \"about:legacy-compat\">"),
            vec![TokenKind::Doctype {
                name: Some("html".to_string()),
                public_id: Some(String::new()),
                system_id: Some("about:legacy-compat".to_string()),
            }]
        );
    }

    #[test]
    fn tokenize_unterminated_doctype_reports_error() {
        let mut tokenizer = Tokenizer::new("<!doctype html");
        let tokens: Vec<_> = tokenizer.by_ref().collect();
        assert!(matches!(
            tokens.as_slice(),
            [Token {
                kind: TokenKind::Doctype { name: Some(n), .. },
                ..
            }] if n == "html"
        ));
        assert_eq!(tokenizer.errors()[0].code, ErrorCode::EofInDoctype);
    }

    #[test]
    fn tokenize_cdata_wraps_as_comment() {
        assert_eq!(
            kinds("<![CDATA[x<y]]>"),
            vec![TokenKind::Comment {
                data: "[CDATA[x<y]]".to_string()
            }]
        );
    }

    #[test]
    fn tokenize_bogus_comment_forms() {
        assert_eq!(
            kinds("<!ELEMENT br EMPTY>"),
            vec![TokenKind::Comment {
                data: "ELEMENT br EMPTY".to_string()
            }]
        );
        assert_eq!(
            kinds("<?xml version=\"1.0\"?>"),
            vec![TokenKind::Comment {
                data: "?xml version=\"1.0\"?".to_string()
            }]
        );
        assert_eq!(
            kinds("</ div>"),
            vec![TokenKind::Comment {
                data: " div".to_string()
            }]
        );
        assert_eq!(
            kinds("<!a\0b>"),
            vec![TokenKind::Comment {
                data: "a\u{FFFD}b".to_string()
            }]
        );
    }

    #[test]
    fn tokenize_end_tag_ignores_junk_before_gt() {
        assert_eq!(kinds("</div foo=bar>"), vec![end("div")]);
    }

    #[test]
    fn tokenize_literal_lt_stays_text() {
        assert_eq!(kinds("a < b"), vec![text("a < b")]);
        assert_eq!(
            kinds("1<2<p>x</p>"),
            vec![
                text("1"),
                text("<2"),
                start("p", &[], false),
                text("x"),
                end("p"),
            ]
        );
        assert_eq!(kinds("</3>"), vec![text("</3>")]);
    }

    #[test]
    fn tokenize_raw_text_elements_swallow_markup() {
        assert_eq!(
            kinds("<style>a<b{}</style>"),
            vec![start("style", &[], false), text("a<b{}"), end("style")]
        );
        assert_eq!(
            kinds("<xmp><p>literal</p></xmp>"),
            vec![start("xmp", &[], false), text("<p>literal</p>"), end("xmp")]
        );
        // Entities decode only in RCDATA elements.
        assert_eq!(
            kinds("<style>&amp;</style>"),
            vec![start("style", &[], false), text("&amp;"), end("style")]
        );
        assert_eq!(
            kinds("<title>&amp;</title>"),
            vec![start("title", &[], false), text("&"), end("title")]
        );
        assert_eq!(
            kinds("<textarea>a<b&gt;</textarea>"),
            vec![start("textarea", &[], false), text("a<b>"), end("textarea")]
        );
    }

    #[test]
    fn tokenize_rawtext_close_accepts_whitespace_and_near_misses() {
        assert_eq!(
            kinds("<script>ok</scriptx>no</script >"),
            vec![
                start("script", &[], false),
                text("ok</scriptx>no"),
                end("script"),
            ]
        );
    }

    #[test]
    fn tokenize_unterminated_rawtext_reports_expected_closing_tag() {
        let mut tokenizer = Tokenizer::new("<script>let x = 1;");
        let tokens: Vec<_> = tokenizer.by_ref().map(|t| t.kind).collect();
        assert_eq!(
            tokens,
            vec![start("script", &[], false), text("let x = 1;"), end("script")]
        );
        assert_eq!(
            tokenizer.errors()[0].code,
            ErrorCode::ExpectedClosingTagButGotEof
        );
    }

    #[test]
    fn tokenize_script_escape_states_ignore_double_escaped_close() {
        let input = "<script><!--<script></script>--></script>after";
        assert_eq!(
            kinds(input),
            vec![
                start("script", &[], false),
                text("<!--<script></script>-->"),
                end("script"),
                text("after"),
            ]
        );
    }

    #[test]
    fn tokenize_script_escaped_comment_hides_close_until_unescaped() {
        let input = "<script><!-- </script> --></script>x";
        // Inside the escaped region the first </script> is not accepted.
        assert_eq!(
            kinds(input),
            vec![
                start("script", &[], false),
                text("<!-- </script> -->"),
                end("script"),
                text("x"),
            ]
        );
    }

    #[test]
    fn tokenize_plain_script_closes_at_first_end_tag() {
        assert_eq!(
            kinds("<script>var a = 1;</script>"),
            vec![
                start("script", &[], false),
                text("var a = 1;"),
                end("script"),
            ]
        );
    }

    #[test]
    fn tokenize_normalizes_carriage_returns_in_text() {
        assert_eq!(kinds("a\r\nb\rc"), vec![text("a\nb\nc")]);
        assert_eq!(
            kinds("<p data=\"x\r\ny\">z</p>"),
            vec![start("p", &[("data", "x\ny")], false), text("z"), end("p")]
        );
    }

    #[test]
    fn tokenize_preserves_nul_in_text_for_the_tree_builder() {
        assert_eq!(kinds("a\0b"), vec![text("a\0b")]);
    }

    #[test]
    fn tokenize_unterminated_start_tag_degrades_to_text() {
        let mut tokenizer = Tokenizer::new("<div class=\"x");
        let tokens: Vec<_> = tokenizer.by_ref().map(|t| t.kind).collect();
        assert_eq!(tokens, vec![text("<div class=\"x")]);
        assert_eq!(tokenizer.errors()[0].code, ErrorCode::EofInTag);
    }

    #[test]
    fn tokenize_empty_input_yields_nothing() {
        assert!(kinds("").is_empty());
        assert_eq!(kinds("plain"), vec![text("plain")]);
    }

    #[test]
    fn token_positions_point_at_token_starts() {
        let tokens = tokenize("ab<p>c</p>");
        let positions: Vec<_> = tokens.iter().map(|t| t.pos).collect();
        assert_eq!(positions, vec![0, 2, 5, 6]);
    }

    #[test]
    fn text_concatenation_equals_input_minus_markup() {
        let input = "a<p>b&amp;c</p>d<!--x-->e";
        let mut all_text = String::new();
        for token in tokenize(input) {
            if let TokenKind::Text { data } = token.kind {
                all_text.push_str(&data);
            }
        }
        assert_eq!(all_text, "ab&cde");
    }

    #[test]
    fn line_map_locates_offsets_across_newline_kinds() {
        let input = "ab\ncd\r\nef";
        let map = LineMap::new(input);
        assert_eq!(map.locate(input, 0), (1, 1));
        assert_eq!(map.locate(input, 2), (1, 3));
        assert_eq!(map.locate(input, 3), (2, 1));
        assert_eq!(map.locate(input, 7), (3, 1));
        assert_eq!(map.locate(input, 9), (3, 3));
    }

    #[test]
    fn line_map_counts_characters_not_bytes_in_columns() {
        let input = "é<p>";
        let map = LineMap::new(input);
        assert_eq!(map.locate(input, 2), (1, 2));
    }
}
