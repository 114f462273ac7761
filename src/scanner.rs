//! Segmentation of raw template source into text, object (`{{ … }}`),
//! and tag (`{% … %}`) chunks.
//!
//! One forward pass over the bytes.  The interior of a marker is not
//! parsed here, but quoted runs are honoured so a literal `}}` inside a
//! string does not terminate its object.  Concatenating the `source`
//! fields of the scanned chunks always reconstructs the input exactly.

use crate::error::{Error, SourceInfo};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKind {
    Text,
    Object,
    Tag,
}

/// One lexical piece of a template.  For tags, `name` is the first
/// identifier and `args` everything after it; for objects, `args` is
/// the body between the braces.  For text chunks `args` starts empty;
/// the template parser stores the whitespace-controlled text there,
/// leaving `source` as the exact input slice.  The trim flags record
/// whitespace control markers (`{{-`, `-}}`, `{%-`, `-%}`).
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub kind: ChunkKind,
    pub source: String,
    pub name: String,
    pub args: String,
    pub info: SourceInfo,
    pub trim_before: bool,
    pub trim_after: bool,
}

impl Chunk {
    fn text(path: &str, full: &str, start: usize, end: usize) -> Chunk {
        Chunk {
            kind: ChunkKind::Text,
            source: full[start..end].to_string(),
            name: String::new(),
            args: String::new(),
            info: position(full, start, path),
            trim_before: false,
            trim_after: false,
        }
    }
}

/// Scan `source` into its chunk sequence.  Fails only on an
/// unterminated `{{` or `{%`, reported at the opening marker.
pub fn scan(source: &str, path: &str) -> Result<Vec<Chunk>, Error> {
    let mut chunks = Vec::new();
    let mut pos = 0;
    while pos < source.len() {
        let rest = &source[pos..];
        let next = match (rest.find("{{"), rest.find("{%")) {
            (Some(a), Some(b)) if a <= b => Some((a, ChunkKind::Object)),
            (Some(_), Some(b)) => Some((b, ChunkKind::Tag)),
            (Some(a), None) => Some((a, ChunkKind::Object)),
            (None, Some(b)) => Some((b, ChunkKind::Tag)),
            (None, None) => None,
        };
        match next {
            None => {
                chunks.push(Chunk::text(path, source, pos, source.len()));
                pos = source.len();
            }
            Some((offset, kind)) => {
                if offset > 0 {
                    chunks.push(Chunk::text(path, source, pos, pos + offset));
                }
                let (chunk, end) = scan_markup(source, path, pos + offset, kind)?;
                chunks.push(chunk);
                pos = end;
            }
        }
    }
    Ok(chunks)
}

fn scan_markup(
    source: &str,
    path: &str,
    start: usize,
    kind: ChunkKind,
) -> Result<(Chunk, usize), Error> {
    let bytes = source.as_bytes();
    let close: &[u8] = match kind {
        ChunkKind::Object => b"}}",
        _ => b"%}",
    };
    let info = position(source, start, path);
    let mut i = start + 2;
    let trim_before = bytes.get(i) == Some(&b'-');
    if trim_before {
        i += 1;
    }
    let inner_start = i;
    let (inner_end, trim_after, end) = loop {
        if i >= bytes.len() {
            return Err(Error::Scan {
                message: format!("unterminated {}", &source[start..start + 2]),
                info,
            });
        }
        let b = bytes[i];
        if b == b'\'' || b == b'"' {
            i = skip_quoted(bytes, i);
        } else if bytes[i..].starts_with(close) {
            break (i, false, i + 2);
        } else if b == b'-' && bytes[i + 1..].starts_with(close) {
            break (i, true, i + 3);
        } else {
            i += 1;
        }
    };
    let inner = &source[inner_start..inner_end];
    let (name, args) = match kind {
        ChunkKind::Tag => split_tag(inner),
        _ => (String::new(), inner.trim().to_string()),
    };
    let chunk = Chunk {
        kind,
        source: source[start..end].to_string(),
        name,
        args,
        info,
        trim_before,
        trim_after,
    };
    Ok((chunk, end))
}

/// Skip a quoted run starting at the quote byte, honouring backslash
/// escapes.  Returns the index just past the closing quote, or the end
/// of input when the string never closes (the caller then reports the
/// whole chunk unterminated).
fn skip_quoted(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            i += 2;
        } else if bytes[i] == quote {
            return i + 1;
        } else {
            i += 1;
        }
    }
    bytes.len()
}

/// Split a tag interior on the first whitespace run: name, arguments.
fn split_tag(inner: &str) -> (String, String) {
    let inner = inner.trim();
    match inner.find(char::is_whitespace) {
        Some(at) => (
            inner[..at].to_string(),
            inner[at..].trim_start().to_string(),
        ),
        None => (inner.to_string(), String::new()),
    }
}

fn position(source: &str, offset: usize, path: &str) -> SourceInfo {
    let line = 1 + bytecount::count(&source.as_bytes()[..offset], b'\n');
    let line_start = source[..offset].rfind('\n').map_or(0, |i| i + 1);
    let column = 1 + source[line_start..offset].chars().count();
    SourceInfo::new(path, line, column)
}
