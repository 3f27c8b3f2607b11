// Pre-parse structural gate for untrusted XML

use crate::config::MAX_XML_BYTES;
use crate::error::XmlViolation;

const DOCTYPE_OPEN: &[u8] = b"<!doctype";
const ENTITY_OPEN: &[u8] = b"<!entity";

pub fn validate_xml(xml: &str) -> Result<(), XmlViolation> {
    validate_xml_with_limit(xml, MAX_XML_BYTES)
}

/// Size first, then structure. The first violation found wins, in this order:
/// size, DOCTYPE with SYSTEM, DOCTYPE with PUBLIC, `%name;` references, any
/// DOCTYPE, any ENTITY declaration.
pub fn validate_xml_with_limit(xml: &str, limit: usize) -> Result<(), XmlViolation> {
    check_xml_size(xml.len(), limit)?;
    validate_xml_structure(xml)
}

/// `size` is the byte count as received, before any text decoding.
pub fn check_xml_size(size: usize, limit: usize) -> Result<(), XmlViolation> {
    if size > limit {
        return Err(XmlViolation::TooLarge { size, limit });
    }
    Ok(())
}

/// Everything except the size check. Never rewrites the input.
pub fn validate_xml_structure(xml: &str) -> Result<(), XmlViolation> {
    let bytes = xml.as_bytes();
    let doctypes = doctype_spans(bytes);

    if doctypes.iter().any(|span| contains_keyword(span, b"system")) {
        return Err(XmlViolation::ExternalSystemDoctype);
    }

    if doctypes.iter().any(|span| contains_keyword(span, b"public")) {
        return Err(XmlViolation::ExternalPublicDoctype);
    }

    if let Some(name) = find_parameter_entity(bytes) {
        return Err(XmlViolation::ParameterEntity(name));
    }

    if !doctypes.is_empty() {
        return Err(XmlViolation::Doctype);
    }

    if find_ci(bytes, ENTITY_OPEN, 0).is_some() {
        return Err(XmlViolation::EntityDeclaration);
    }

    Ok(())
}

/// Every `<!DOCTYPE ...>` declaration, internal subset included.
fn doctype_spans(bytes: &[u8]) -> Vec<&[u8]> {
    let mut spans = Vec::new();
    let mut from = 0;

    while let Some(start) = find_ci(bytes, DOCTYPE_OPEN, from) {
        let end = declaration_end(bytes, start + DOCTYPE_OPEN.len());
        spans.push(&bytes[start..end]);
        from = end;
    }

    spans
}

/// Index just past the `>` closing a declaration, skipping quoted literals
/// and a bracketed internal subset. Unterminated declarations run to the end.
fn declaration_end(bytes: &[u8], from: usize) -> usize {
    let mut quote: Option<u8> = None;
    let mut depth = 0usize;

    for (offset, &b) in bytes[from..].iter().enumerate() {
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None => match b {
                b'"' | b'\'' => quote = Some(b),
                b'[' => depth += 1,
                b']' => depth = depth.saturating_sub(1),
                b'>' if depth == 0 => return from + offset + 1,
                _ => {}
            },
        }
    }

    bytes.len()
}

fn find_ci(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from >= haystack.len() || needle.len() > haystack.len() - from {
        return None;
    }

    haystack[from..]
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle))
        .map(|pos| from + pos)
}

fn contains_keyword(span: &[u8], keyword: &[u8]) -> bool {
    let mut from = 0;
    while let Some(pos) = find_ci(span, keyword, from) {
        let before = pos.checked_sub(1).map(|i| span[i]);
        let after = span.get(pos + keyword.len()).copied();
        if !before.is_some_and(is_name_byte) && !after.is_some_and(is_name_byte) {
            return true;
        }
        from = pos + 1;
    }
    false
}

fn find_parameter_entity(bytes: &[u8]) -> Option<String> {
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%'
            && let Some(&first) = bytes.get(i + 1)
            && is_name_start_byte(first)
        {
            let name_start = i + 1;
            let mut j = name_start + 1;
            while j < bytes.len() && is_name_byte(bytes[j]) {
                j += 1;
            }
            if bytes.get(j) == Some(&b';') {
                return Some(String::from_utf8_lossy(&bytes[name_start..j]).into_owned());
            }
        }
        i += 1;
    }
    None
}

fn is_name_start_byte(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b':' || b >= 0x80
}

fn is_name_byte(b: u8) -> bool {
    is_name_start_byte(b) || b.is_ascii_digit() || b == b'-' || b == b'.'
}
