use serde_json::Value;

/// Stand-in used wherever a password or passphrase would be printed.
pub fn mask_secret(secret: Option<&str>) -> &'static str {
    match secret {
        Some(s) if !s.is_empty() => "********",
        _ => "<none>",
    }
}

/// Reads a TCP port out of a raw JSON value.
///
/// Integers and integer-looking strings are accepted. Anything else, including
/// `0` and values past `u16::MAX`, yields `None`.
pub fn parse_port(raw: &Value) -> Option<u16> {
    let port = match raw {
        Value::Number(n) => n.as_u64()?,
        Value::String(s) => s.trim().parse::<u64>().ok()?,
        _ => return None,
    };
    match u16::try_from(port) {
        Ok(0) | Err(_) => None,
        Ok(port) => Some(port),
    }
}

/// Treats an empty string the same as a missing field.
pub(crate) fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}
