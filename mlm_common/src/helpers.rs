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

/// Read a boolean flag from the environment, falling back to `default` when the variable is
/// missing or unparseable.
pub fn env_flag(var: &str, default: bool) -> bool {
    parse_boolean_flag(std::env::var(var).ok(), default)
}
