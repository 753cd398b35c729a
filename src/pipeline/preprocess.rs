//! Shader Source Preprocessor
//!
//! Textual expansion applied to stage bodies before driver compilation:
//! - `#include <name>` resolution against a [`ShaderChunkLibrary`]
//! - light-count token substitution (`NUM_DIR_LIGHTS` etc.)
//! - bounded light-loop unrolling
//!
//! All three passes are plain text transforms; no GLSL parsing happens here.
//! Loop-body extraction stops at the matching top-level closing brace, so a
//! body containing unbalanced braces (e.g. inside a macro) is a known
//! limitation of the unroller, not something it tries to repair.

use crate::chunks::ShaderChunkLibrary;
use crate::errors::{GlintError, Result};
use crate::features::LightCounts;

// ─── Include resolution ──────────────────────────────────────────────────────

/// Recursively replace `#include <name>` lines with chunk text.
///
/// Nested includes are resolved depth-first. A chunk name missing from the
/// library fails with [`GlintError::UnresolvedInclude`]; a chunk that is
/// reached again while it is still being expanded fails with
/// [`GlintError::IncludeCycle`]. Diamond-shaped include graphs are fine and
/// expand the shared chunk once per reference.
pub fn resolve_includes(source: &str, chunks: &ShaderChunkLibrary) -> Result<String> {
    let mut visiting: Vec<String> = Vec::new();
    resolve_recursive(source, chunks, &mut visiting)
}

fn resolve_recursive(
    source: &str,
    chunks: &ShaderChunkLibrary,
    visiting: &mut Vec<String>,
) -> Result<String> {
    let mut out = String::with_capacity(source.len());
    for line in source.lines() {
        if let Some(name) = parse_include_directive(line) {
            if visiting.iter().any(|v| v == name) {
                return Err(GlintError::IncludeCycle {
                    name: name.to_string(),
                });
            }
            let chunk = chunks.get(name).ok_or_else(|| GlintError::UnresolvedInclude {
                name: name.to_string(),
            })?;
            visiting.push(name.to_string());
            let expanded = resolve_recursive(chunk, chunks, visiting)?;
            visiting.pop();
            out.push_str(expanded.trim_end_matches('\n'));
        } else {
            out.push_str(line);
        }
        out.push('\n');
    }
    Ok(out)
}

/// Parse a whole line of the form `#include <name>`, tolerating surrounding
/// whitespace. Returns the chunk name, or `None` for any other line.
fn parse_include_directive(line: &str) -> Option<&str> {
    let rest = line.trim_start().strip_prefix("#include")?;
    let rest = rest.trim_start();
    let rest = rest.strip_prefix('<')?;
    let end = rest.find('>')?;
    let name = &rest[..end];
    if name.is_empty()
        || !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '/'))
    {
        return None;
    }
    if !rest[end + 1..].trim().is_empty() {
        return None;
    }
    Some(name)
}

// ─── Light-count substitution ────────────────────────────────────────────────

/// Replace the per-category count tokens with decimal literals.
///
/// Only whole-word occurrences of the five tokens are touched; every other
/// literal in the source passes through unchanged.
#[must_use]
pub fn substitute_light_counts(source: &str, counts: &LightCounts) -> String {
    let mut out = replace_token(source, "NUM_DIR_LIGHTS", &counts.directional.to_string());
    out = replace_token(&out, "NUM_POINT_LIGHTS", &counts.point.to_string());
    out = replace_token(&out, "NUM_SPOT_LIGHTS", &counts.spot.to_string());
    out = replace_token(&out, "NUM_RECT_AREA_LIGHTS", &counts.rect_area.to_string());
    out = replace_token(&out, "NUM_HEMI_LIGHTS", &counts.hemisphere.to_string());
    out
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Replace whole-word occurrences of `token` with `value`.
fn replace_token(source: &str, token: &str, value: &str) -> String {
    let bytes = source.as_bytes();
    let mut out = String::with_capacity(source.len());
    let mut cursor = 0;
    while let Some(rel) = source[cursor..].find(token) {
        let start = cursor + rel;
        let end = start + token.len();
        let bounded = (start == 0 || !is_ident_byte(bytes[start - 1]))
            && (end == bytes.len() || !is_ident_byte(bytes[end]));
        out.push_str(&source[cursor..start]);
        if bounded {
            out.push_str(value);
        } else {
            out.push_str(token);
        }
        cursor = end;
    }
    out.push_str(&source[cursor..]);
    out
}

// ─── Loop unrolling ──────────────────────────────────────────────────────────

/// Unroll loops of the literal form `for ( int i = A; i < B; i++ ) { body }`.
///
/// Each loop is replaced by `B - A` copies of `body` with every array access
/// `name[ i ]` rewritten to the literal index. `i` occurrences that are not
/// array subscripts are left alone. Loops not matching the form exactly pass
/// through untouched.
#[must_use]
pub fn unroll_light_loops(source: &str) -> String {
    let bytes = source.as_bytes();
    let mut out = String::with_capacity(source.len());
    let mut cursor = 0;

    while let Some(rel) = source[cursor..].find("for") {
        let start = cursor + rel;
        let end = start + 3;
        out.push_str(&source[cursor..start]);

        let bounded = (start == 0 || !is_ident_byte(bytes[start - 1]))
            && (end < bytes.len() && !is_ident_byte(bytes[end]));
        if bounded {
            if let Some(header) = parse_loop_header(source, end) {
                if let Some(close) = find_matching_brace(bytes, header.body_start) {
                    let body = &source[header.body_start..close];
                    for index in header.from..header.to {
                        substitute_loop_index(body, index, &mut out);
                    }
                    cursor = close + 1;
                    continue;
                }
            }
        }
        out.push_str("for");
        cursor = end;
    }
    out.push_str(&source[cursor..]);
    out
}

struct LoopHeader {
    from: usize,
    to: usize,
    /// Byte offset just past the opening `{`.
    body_start: usize,
}

/// Parse `( int i = A; i < B; i++ ) {` starting right after the `for`
/// keyword. Whitespace between tokens is free-form.
fn parse_loop_header(source: &str, pos: usize) -> Option<LoopHeader> {
    let b = source.as_bytes();
    let mut p = skip_ws(b, pos);
    p = expect_byte(b, p, b'(')?;
    p = skip_ws(b, p);
    p = expect_keyword(b, p, "int")?;
    p = skip_ws(b, p);
    p = expect_keyword(b, p, "i")?;
    p = skip_ws(b, p);
    p = expect_byte(b, p, b'=')?;
    p = skip_ws(b, p);
    let (from, mut p) = parse_decimal(b, p)?;
    p = skip_ws(b, p);
    p = expect_byte(b, p, b';')?;
    p = skip_ws(b, p);
    p = expect_keyword(b, p, "i")?;
    p = skip_ws(b, p);
    p = expect_byte(b, p, b'<')?;
    p = skip_ws(b, p);
    let (to, mut p) = parse_decimal(b, p)?;
    p = skip_ws(b, p);
    p = expect_byte(b, p, b';')?;
    p = skip_ws(b, p);
    p = expect_keyword(b, p, "i")?;
    p = skip_ws(b, p);
    p = expect_byte(b, p, b'+')?;
    p = expect_byte(b, p, b'+')?;
    p = skip_ws(b, p);
    p = expect_byte(b, p, b')')?;
    p = skip_ws(b, p);
    p = expect_byte(b, p, b'{')?;
    Some(LoopHeader {
        from,
        to,
        body_start: p,
    })
}

fn skip_ws(b: &[u8], mut p: usize) -> usize {
    while p < b.len() && b[p].is_ascii_whitespace() {
        p += 1;
    }
    p
}

fn expect_byte(b: &[u8], p: usize, expected: u8) -> Option<usize> {
    (p < b.len() && b[p] == expected).then_some(p + 1)
}

fn expect_keyword(b: &[u8], p: usize, keyword: &str) -> Option<usize> {
    let end = p + keyword.len();
    if end > b.len() || &b[p..end] != keyword.as_bytes() {
        return None;
    }
    if end < b.len() && is_ident_byte(b[end]) {
        return None;
    }
    Some(end)
}

fn parse_decimal(b: &[u8], p: usize) -> Option<(usize, usize)> {
    let mut end = p;
    while end < b.len() && b[end].is_ascii_digit() {
        end += 1;
    }
    if end == p {
        return None;
    }
    let value = std::str::from_utf8(&b[p..end]).ok()?.parse().ok()?;
    Some((value, end))
}

/// Index of the `}` matching the brace just before `body_start`, counting
/// nesting depth. Braces inside comments or string literals are counted too;
/// that is the documented limitation of the unroller.
fn find_matching_brace(b: &[u8], body_start: usize) -> Option<usize> {
    let mut depth = 1usize;
    let mut p = body_start;
    while p < b.len() {
        match b[p] {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(p);
                }
            }
            _ => {}
        }
        p += 1;
    }
    None
}

/// Append one unrolled copy of `body` with `name[ i ]` subscripts rewritten
/// to `name[ index ]`.
fn substitute_loop_index(body: &str, index: usize, out: &mut String) {
    let b = body.as_bytes();
    let mut cursor = 0;
    let mut p = 0;
    while p < b.len() {
        if b[p] == b'[' && prev_nonws_is_ident(b, p) {
            let q = skip_ws(b, p + 1);
            if q < b.len() && b[q] == b'i' && (q + 1 >= b.len() || !is_ident_byte(b[q + 1])) {
                let r = skip_ws(b, q + 1);
                if r < b.len() && b[r] == b']' {
                    out.push_str(&body[cursor..p]);
                    out.push_str("[ ");
                    out.push_str(&index.to_string());
                    out.push_str(" ]");
                    cursor = r + 1;
                    p = r + 1;
                    continue;
                }
            }
        }
        p += 1;
    }
    out.push_str(&body[cursor..]);
}

fn prev_nonws_is_ident(b: &[u8], p: usize) -> bool {
    let mut q = p;
    while q > 0 {
        q -= 1;
        if !b[q].is_ascii_whitespace() {
            return is_ident_byte(b[q]) || b[q] == b']';
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn include_directive_parsing() {
        assert_eq!(parse_include_directive("#include <common>"), Some("common"));
        assert_eq!(
            parse_include_directive("  \t#include <lights/pars>"),
            Some("lights/pars")
        );
        assert_eq!(parse_include_directive("#include <a> trailing"), None);
        assert_eq!(parse_include_directive("// #include-ish comment"), None);
        assert_eq!(parse_include_directive("#include <>"), None);
    }

    #[test]
    fn token_replacement_respects_word_boundaries() {
        let out = replace_token("NUM_DIR_LIGHTS NUM_DIR_LIGHTS_EXT", "NUM_DIR_LIGHTS", "2");
        assert_eq!(out, "2 NUM_DIR_LIGHTS_EXT");
    }

    #[test]
    fn loop_header_tolerates_spacing() {
        let src = "for(int i=0;i<2;i++){x[i]=0.0;}";
        let header = parse_loop_header(src, 3).unwrap();
        assert_eq!(header.from, 0);
        assert_eq!(header.to, 2);
    }

    #[test]
    fn loop_header_rejects_other_counters() {
        assert!(parse_loop_header("for ( int j = 0; j < 2; j++ ) {}", 3).is_none());
        assert!(parse_loop_header("for ( int i = 0; i < n; i++ ) {}", 3).is_none());
    }
}
