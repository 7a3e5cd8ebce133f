//! Identifier derivation shared by the domain builder and both emitters.
//!
//! Names are derived once, by the domain builder, and stored on the domain.
//! Emitters never re-derive them; they only escape for their own syntax.
//!
//! | Input | Function | Output |
//! |-------|----------|--------|
//! | `operationId` | [`field_name`] | `operation_id` |
//! | `$ref` | [`field_name`] | `_ref` |
//! | `x-foo` | [`field_name`] | `x_foo` |
//! | `pathItem` | [`type_name`] | `PathItem` |
//! | `x-foo` | [`type_name`] | `XFoo` |

/// Words that are keywords in Rust. The generator spells them with `r#`.
const RUST_KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "do",
    "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl", "in",
    "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref",
    "return", "static", "struct", "trait", "true", "try", "type", "typeof", "unsafe",
    "unsized", "use", "virtual", "where", "while", "yield",
];

/// Keywords that cannot be raw identifiers, so they are renamed for every target.
const UNRAWABLE: &[&str] = &["self", "Self", "super", "crate", "_"];

/// Convert a schema key to a snake_case field identifier.
///
/// Returns `None` when nothing identifier-like is left (e.g. an empty key).
pub fn field_name(key: &str) -> Option<String> {
    let chars: Vec<char> = key.chars().collect();
    let mut out = String::with_capacity(key.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                Some(p) if p.is_ascii_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_ascii_uppercase() => next.is_some_and(|n| n.is_ascii_lowercase()),
                _ => false,
            };
            if boundary && !out.ends_with('_') {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else if c.is_ascii_alphanumeric() {
            out.push(c);
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }

    finish_identifier(out)
}

/// Convert a schema key to a PascalCase type identifier.
pub fn type_name(key: &str) -> Option<String> {
    let mut out = String::with_capacity(key.len());
    for word in key.split(|c: char| !c.is_ascii_alphanumeric()) {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            out.push(first.to_ascii_uppercase());
            out.extend(chars);
        }
    }
    finish_identifier(out)
}

/// Variant name for a snake_case field name (`body_parameter` -> `BodyParameter`).
pub fn variant_name(field_name: &str) -> String {
    let name: String = field_name
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect();
    if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
        format!("V{name}")
    } else {
        name
    }
}

/// Spell an identifier for Rust source, using a raw identifier for keywords.
pub fn rust_ident(ident: &str) -> String {
    if RUST_KEYWORDS.contains(&ident) {
        format!("r#{ident}")
    } else {
        ident.to_string()
    }
}

fn finish_identifier(mut out: String) -> Option<String> {
    if out.is_empty() || out == "_" {
        return None;
    }
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    if UNRAWABLE.contains(&out.as_str()) {
        out.push('_');
    }
    Some(out)
}
