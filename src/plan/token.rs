//! Argument reference tokens
//!
//! The grammar is closed: `${NAME}` is the only reference form, with `NAME`
//! matching `[A-Za-z_][A-Za-z0-9_]*`. `\${` escapes to a literal `${`.
//! Everything else, including unbraced `$NAME` and `$(...)`, is literal text
//! left for the shell that runs inside the build engine.
//!
//! Substitution is a single left-to-right pass. Inserted values are never
//! rescanned.

/// A piece of scanned template text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Literal(&'a str),
    /// `${NAME}`, holding `NAME`
    Reference(&'a str),
    /// A `${` that never forms a valid reference, holding the raw token text
    Malformed(&'a str),
}

/// A token left unresolved by [`substitute`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedToken(pub String);

pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub fn scan(template: &str) -> Vec<Segment<'_>> {
    let bytes = template.as_bytes();
    let mut segments = Vec::new();
    let mut literal_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'\\' && bytes[i + 1..].starts_with(b"${") {
            push_literal(&mut segments, &template[literal_start..i]);
            segments.push(Segment::Literal(&template[i + 1..i + 3]));
            i += 3;
            literal_start = i;
            continue;
        }

        if bytes[i..].starts_with(b"${") {
            push_literal(&mut segments, &template[literal_start..i]);
            match template[i + 2..].find('}') {
                Some(offset) => {
                    let end = i + 2 + offset + 1;
                    let name = &template[i + 2..end - 1];
                    if is_valid_name(name) {
                        segments.push(Segment::Reference(name));
                    } else {
                        segments.push(Segment::Malformed(&template[i..end]));
                    }
                    i = end;
                }
                None => {
                    segments.push(Segment::Malformed(&template[i..]));
                    i = bytes.len();
                }
            }
            literal_start = i;
            continue;
        }

        i += 1;
    }

    push_literal(&mut segments, &template[literal_start..]);
    segments
}

fn push_literal<'a>(segments: &mut Vec<Segment<'a>>, text: &'a str) {
    if !text.is_empty() {
        segments.push(Segment::Literal(text));
    }
}

/// Names referenced by `template`, in order of appearance
pub fn references(template: &str) -> Vec<&str> {
    scan(template)
        .into_iter()
        .filter_map(|segment| match segment {
            Segment::Reference(name) => Some(name),
            _ => None,
        })
        .collect()
}

pub fn contains_tokens(template: &str) -> bool {
    scan(template)
        .iter()
        .any(|segment| !matches!(segment, Segment::Literal(_)))
}

/// Replace every `${NAME}` in `template` with `lookup(NAME)`.
///
/// Fails on the first reference `lookup` cannot resolve and on the first
/// malformed token.
pub fn substitute<'v, F>(template: &str, mut lookup: F) -> Result<String, UnresolvedToken>
where
    F: FnMut(&str) -> Option<&'v str>,
{
    let mut out = String::with_capacity(template.len());
    for segment in scan(template) {
        match segment {
            Segment::Literal(text) => out.push_str(text),
            Segment::Reference(name) => match lookup(name) {
                Some(value) => out.push_str(value),
                None => return Err(UnresolvedToken(format!("${{{}}}", name))),
            },
            Segment::Malformed(token) => return Err(UnresolvedToken(token.to_string())),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn values() -> HashMap<&'static str, &'static str> {
        let mut map = HashMap::new();
        map.insert("JAVA_VERSION", "21");
        map.insert("APP_PORT", "9090");
        map.insert("SNEAKY", "${JAVA_VERSION}");
        map
    }

    fn render(template: &str) -> Result<String, UnresolvedToken> {
        let values = values();
        substitute(template, |name| values.get(name).copied())
    }

    #[test]
    fn test_substitutes_braced_reference() {
        assert_eq!(
            render("eclipse-temurin:${JAVA_VERSION}-jre-alpine").unwrap(),
            "eclipse-temurin:21-jre-alpine"
        );
    }

    #[test]
    fn test_substitutes_multiple_references() {
        assert_eq!(render("${APP_PORT}/${APP_PORT}").unwrap(), "9090/9090");
    }

    #[test]
    fn test_values_are_not_rescanned() {
        assert_eq!(render("x=${SNEAKY}").unwrap(), "x=${JAVA_VERSION}");
    }

    #[test]
    fn test_unbraced_dollar_is_literal() {
        assert_eq!(
            render("make -j$(nproc) && echo $HOME $").unwrap(),
            "make -j$(nproc) && echo $HOME $"
        );
    }

    #[test]
    fn test_escaped_reference_is_literal() {
        assert_eq!(render(r"echo \${APP_PORT}").unwrap(), "echo ${APP_PORT}");
    }

    #[test]
    fn test_unknown_reference_fails() {
        let err = render("${MISSING}").unwrap_err();
        assert_eq!(err, UnresolvedToken("${MISSING}".to_string()));
    }

    #[test]
    fn test_unterminated_reference_is_malformed() {
        let err = render("image:${JAVA_VERSION").unwrap_err();
        assert_eq!(err.0, "${JAVA_VERSION");
    }

    #[test]
    fn test_empty_and_invalid_names_are_malformed() {
        assert_eq!(render("${}").unwrap_err().0, "${}");
        assert_eq!(render("${1ABC}").unwrap_err().0, "${1ABC}");
        assert_eq!(render("${A-B}").unwrap_err().0, "${A-B}");
    }

    #[test]
    fn test_non_ascii_text_is_preserved() {
        assert_eq!(render("héllo ${APP_PORT} wörld").unwrap(), "héllo 9090 wörld");
    }

    #[test]
    fn test_references_lists_names_in_order() {
        assert_eq!(
            references("${B} ${A} $C ${B}"),
            vec!["B", "A", "B"]
        );
    }

    #[test]
    fn test_contains_tokens() {
        assert!(contains_tokens("${A}"));
        assert!(contains_tokens("${"));
        assert!(!contains_tokens("$A plain"));
    }

    #[test]
    fn test_valid_names() {
        assert!(is_valid_name("APP_PORT"));
        assert!(is_valid_name("_x1"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("9LIVES"));
        assert!(!is_valid_name("has space"));
    }
}
