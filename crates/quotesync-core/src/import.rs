// Schema checks for quote records arriving as loose JSON
use crate::models::Quote;
use serde_json::Value;

/// A record matches the quote schema when `text` and `category` are both
/// present and both strings. Extra fields are ignored.
pub fn matches_schema(record: &Value) -> bool {
    record.get("text").map_or(false, Value::is_string)
        && record.get("category").map_or(false, Value::is_string)
}

/// Convert a record exactly as stored. Used when reading persisted data.
pub fn record_to_quote(record: &Value) -> Option<Quote> {
    if !matches_schema(record) {
        return None;
    }

    Some(Quote {
        text: record["text"].as_str()?.to_string(),
        category: record["category"].as_str()?.to_string(),
        id: record.get("id").and_then(Value::as_u64),
    })
}

/// Convert and trim a record from an import. Records whose fields are
/// blank after trimming are rejected.
pub fn sanitize_record(record: &Value) -> Option<Quote> {
    let quote = record_to_quote(record)?;
    let text = quote.text.trim();
    let category = quote.category.trim();

    if text.is_empty() || category.is_empty() {
        return None;
    }

    Some(Quote {
        text: text.to_string(),
        category: category.to_string(),
        id: quote.id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_schema_check() {
        assert!(matches_schema(&json!({"text": "A", "category": "x"})));
        assert!(matches_schema(&json!({"text": "A", "category": "x", "author": "y"})));
        assert!(!matches_schema(&json!({"text": "A"})));
        assert!(!matches_schema(&json!({"text": 1, "category": "x"})));
        assert!(!matches_schema(&json!("just a string")));
    }

    #[test]
    fn test_sanitize_trims_and_keeps_id() {
        let quote = sanitize_record(&json!({"text": "  A  ", "category": " x ", "id": 4})).unwrap();
        assert_eq!(quote, Quote::remote(4, "A", "x"));
    }

    #[test]
    fn test_sanitize_rejects_blank_fields() {
        assert!(sanitize_record(&json!({"text": "   ", "category": "x"})).is_none());
        assert!(sanitize_record(&json!({"text": "A", "category": ""})).is_none());
    }

    #[test]
    fn test_non_numeric_id_is_ignored() {
        let quote = record_to_quote(&json!({"text": "A", "category": "x", "id": "abc"})).unwrap();
        assert_eq!(quote.id, None);
    }
}
