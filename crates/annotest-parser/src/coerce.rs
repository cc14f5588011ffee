/// Annotation value coercion
///
/// Turns the raw text after `=` into an [`AnnotationValue`]. Each rule is a
/// small parser that either claims the input or passes; the first rule to
/// claim it decides the result:
///
/// 1. array literal `["a", "b"]` (fails hard on bad JSON)
/// 2. double-quoted string `"a, b"` (quotes stripped, no splitting)
/// 3. comma list `a, b` (split and trimmed)
/// 4. anything else, as a plain string

use crate::ast::AnnotationValue;
use crate::error::CoerceError;

type Rule = fn(&str) -> Option<Result<AnnotationValue, CoerceError>>;

const RULES: [Rule; 3] = [array_literal, quoted_string, comma_list];

/// Coerce a raw annotation value
pub fn coerce(raw: &str) -> Result<AnnotationValue, CoerceError> {
    let text = raw.trim();
    RULES
        .iter()
        .find_map(|rule| rule(text))
        .unwrap_or_else(|| Ok(AnnotationValue::String(text.to_string())))
}

fn array_literal(text: &str) -> Option<Result<AnnotationValue, CoerceError>> {
    if !(text.starts_with('[') && text.ends_with(']')) {
        return None;
    }
    Some(
        serde_json::from_str::<Vec<String>>(text)
            .map(AnnotationValue::List)
            .map_err(|e| CoerceError(format!("expected a JSON array of strings: {}", e))),
    )
}

fn quoted_string(text: &str) -> Option<Result<AnnotationValue, CoerceError>> {
    let inner = text.strip_prefix('"')?.strip_suffix('"')?;
    Some(Ok(AnnotationValue::String(inner.to_string())))
}

fn comma_list(text: &str) -> Option<Result<AnnotationValue, CoerceError>> {
    if !text.contains(',') {
        return None;
    }
    let items = text.split(',').map(|item| item.trim().to_string()).collect();
    Some(Ok(AnnotationValue::List(items)))
}
