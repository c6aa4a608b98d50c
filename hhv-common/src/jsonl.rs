//! JSON Lines helpers

use serde::Serialize;

use crate::Result;

/// Non-blank lines of a JSONL document with their 1-based line numbers
pub fn lines(content: &str) -> impl Iterator<Item = (usize, &str)> {
    content
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty())
}

/// Serialize values as JSONL, one compact object per line with a trailing newline
pub fn to_jsonl<'a, T, I>(items: I) -> Result<String>
where
    T: Serialize + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut out = String::new();
    for item in items {
        out.push_str(&serde_json::to_string(item)?);
        out.push('\n');
    }
    Ok(out)
}

/// Non-blank lines of raw JSONL bytes with their 1-based line numbers
///
/// Lines are not required to be UTF-8, so one damaged line does not make
/// the rest of the file unreadable.
pub fn byte_lines(content: &[u8]) -> impl Iterator<Item = (usize, &[u8])> {
    content
        .split(|b| *b == b'\n')
        .enumerate()
        .map(|(i, line)| (i + 1, trim_ascii(line)))
        .filter(|(_, line)| !line.is_empty())
}

/// Join already-encoded lines into a JSONL document
pub fn join_lines<S: AsRef<[u8]>>(lines: &[S]) -> Vec<u8> {
    let mut out = Vec::new();
    for line in lines {
        out.extend_from_slice(line.as_ref());
        out.push(b'\n');
    }
    out
}

fn trim_ascii(mut bytes: &[u8]) -> &[u8] {
    while let [first, rest @ ..] = bytes {
        if !first.is_ascii_whitespace() {
            break;
        }
        bytes = rest;
    }
    while let [rest @ .., last] = bytes {
        if !last.is_ascii_whitespace() {
            break;
        }
        bytes = rest;
    }
    bytes
}
