use harvestflow_core::{AppError, AppResult};
use serde_json::Value;

/// A present, non-blank string field, trimmed.
pub(crate) fn required<'a>(field: &str, value: Option<&'a str>) -> AppResult<&'a str> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AppError::validation(format!("{field} is required"))),
    }
}

/// Blank strings count as absent.
pub(crate) fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Largest token id any store accepts (`BIGINT` in PostgreSQL).
pub const MAX_TOKEN_ID: u64 = i64::MAX as u64;

/// A token id given either as a JSON integer or as a string of digits.
pub(crate) fn token_id(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().filter(|&id| id <= MAX_TOKEN_ID),
        Value::String(s) => parse_token_id(s),
        _ => None,
    }
}

/// A token id written as plain decimal digits, at most [`MAX_TOKEN_ID`].
pub fn parse_token_id(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok().filter(|&id| id <= MAX_TOKEN_ID)
}

/// A non-negative decimal amount, returned as its canonical text.
pub(crate) fn amount(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.is_finite() && f >= 0.0 => Some(n.to_string()),
            _ => None,
        },
        Value::String(s) => {
            let s = s.trim();
            let (int, frac) = s.split_once('.').unwrap_or((s, ""));
            let digits = |p: &str| p.bytes().all(|b| b.is_ascii_digit());
            let well_formed = !int.is_empty()
                && digits(int)
                && digits(frac)
                && !(s.contains('.') && frac.is_empty());
            well_formed.then(|| s.to_string())
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn required_rejects_blank() {
        assert_eq!(required("policyId", Some(" abc ")).unwrap(), "abc");
        assert!(required("policyId", Some("  ")).is_err());
        assert!(required("policyId", None).is_err());
    }

    #[test]
    fn token_ids_accept_numbers_and_digit_strings() {
        assert_eq!(token_id(&json!(7)), Some(7));
        assert_eq!(token_id(&json!("12")), Some(12));
        assert_eq!(token_id(&json!(-1)), None);
        assert_eq!(token_id(&json!(1.5)), None);
        assert_eq!(token_id(&json!("7a")), None);
        assert_eq!(token_id(&json!("")), None);
        assert_eq!(token_id(&json!(null)), None);
    }

    #[test]
    fn token_ids_stop_at_bigint_range() {
        assert_eq!(token_id(&json!(MAX_TOKEN_ID)), Some(MAX_TOKEN_ID));
        assert_eq!(token_id(&json!(MAX_TOKEN_ID + 1)), None);
        assert_eq!(token_id(&json!(u64::MAX.to_string())), None);
        assert_eq!(parse_token_id("+5"), None);
        assert_eq!(parse_token_id(" 42 "), Some(42));
    }

    #[test]
    fn amounts_must_be_non_negative_decimals() {
        assert_eq!(amount(&json!(100)).as_deref(), Some("100"));
        assert_eq!(amount(&json!(2.5)).as_deref(), Some("2.5"));
        assert_eq!(amount(&json!("0.25")).as_deref(), Some("0.25"));
        assert_eq!(amount(&json!(-3)), None);
        assert_eq!(amount(&json!("1.")), None);
        assert_eq!(amount(&json!(".5")), None);
        assert_eq!(amount(&json!("1e3")), None);
        assert_eq!(amount(&json!(true)), None);
    }
}
