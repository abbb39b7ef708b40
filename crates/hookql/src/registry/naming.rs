//! Name validation and formatting.

use std::sync::LazyLock;

use crate::error::RegistryError;

/// GraphQL name: `[_A-Za-z][_0-9A-Za-z]*`
static NAME_REGEX: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^[_A-Za-z][_0-9A-Za-z]*$").expect("Invalid name regex")
});

/// Scalars every schema provides without registration.
pub const BUILTIN_SCALARS: [&str; 5] = ["String", "Int", "Float", "Boolean", "ID"];

/// Returns true if `name` is one of the built-in scalars.
#[must_use]
pub fn is_builtin_scalar(name: &str) -> bool {
    BUILTIN_SCALARS.contains(&name)
}

/// Returns true if `name` is a syntactically valid GraphQL name.
#[must_use]
pub fn is_valid_name(name: &str) -> bool {
    NAME_REGEX.is_match(name)
}

/// Validates a type, field or argument name.
///
/// `what` is used in the error message ("type", "field", ...).
pub(crate) fn validate_name(name: &str, what: &str) -> Result<(), RegistryError> {
    if !is_valid_name(name) {
        return Err(RegistryError::validation(format!(
            "`{name}` is not a valid {what} name"
        )));
    }
    if name.starts_with("__") {
        return Err(RegistryError::validation(format!(
            "{what} name `{name}` is reserved for introspection"
        )));
    }
    Ok(())
}

/// Formats an arbitrary label as a camelCase field name.
///
/// Any run of characters outside `[A-Za-z0-9]` separates words. The first
/// word is lower-cased at its first character, following words are
/// upper-cased at theirs; the rest of each word is kept as written.
///
/// ```
/// assert_eq!(
///     hookql::format_field_name("This is some field name"),
///     "thisIsSomeFieldName"
/// );
/// ```
#[must_use]
pub fn format_field_name(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    for (index, word) in label
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .enumerate()
    {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            if index == 0 {
                out.push(first.to_ascii_lowercase());
            } else {
                out.push(first.to_ascii_uppercase());
            }
            out.extend(chars);
        }
    }
    out
}

/// Formats an arbitrary label as a PascalCase type name.
#[must_use]
pub fn format_type_name(label: &str) -> String {
    let field = format_field_name(label);
    let mut chars = field.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => field,
    }
}
