use std::time::Duration;

/// Parse a boolean flag from a string value, or return the given default value otherwise.
pub fn parse_boolean_flag(value: Option<String>, default: bool) -> bool {
    let value = match value {
        Some(v) => v,
        None => return default,
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

/// Parses a duration given as a plain number of seconds, or with one of the `ms`, `s`, `m`, `h` or `d` suffixes.
///
/// Returns `None` for anything else, including negative numbers.
pub fn parse_duration(value: &str) -> Option<Duration> {
    let value = value.trim().to_ascii_lowercase();
    if value.is_empty() {
        return None;
    }
    let split = value.find(|c: char| !c.is_ascii_digit()).unwrap_or(value.len());
    let (amount, unit) = value.split_at(split);
    let amount = amount.parse::<u64>().ok()?;
    match unit.trim() {
        "" | "s" => Some(Duration::from_secs(amount)),
        "ms" => Some(Duration::from_millis(amount)),
        "m" => Some(Duration::from_secs(amount * 60)),
        "h" => Some(Duration::from_secs(amount * 3600)),
        "d" => Some(Duration::from_secs(amount * 86_400)),
        _ => None,
    }
}

/// Joins two free-text fragments with a newline and trims the result. Used for append-only note fields.
pub fn append_text(existing: &str, addition: &str) -> String {
    format!("{existing}\n{addition}").trim().to_string()
}
