use std::collections::HashMap;

/// Parse query parameters from a URI string.
///
/// Handles URL decoding and returns a map of parameter key-value pairs.
/// Multiple values for the same key are not supported (only the last is kept).
pub fn parse_query_params(uri: &str) -> HashMap<String, String> {
    match uri.find('?') {
        Some(query_start) => parse_pairs(&uri[query_start + 1..], false),
        None => HashMap::new(),
    }
}

/// Parse an `application/x-www-form-urlencoded` request body. Unlike query
/// strings, form encoding uses '+' for spaces.
pub fn parse_form_params(body: &[u8]) -> HashMap<String, String> {
    parse_pairs(&String::from_utf8_lossy(body), true)
}

fn parse_pairs(input: &str, plus_is_space: bool) -> HashMap<String, String> {
    let mut params = HashMap::new();
    for param in input.split('&') {
        if param.is_empty() {
            continue;
        }
        if let Some(eq_idx) = param.find('=') {
            let key = &param[..eq_idx];
            let encoded_value = &param[eq_idx + 1..];
            let raw = if plus_is_space {
                encoded_value.replace('+', " ")
            } else {
                encoded_value.to_string()
            };
            let decoded = urlencoding::decode(&raw)
                .map(|c| c.to_string())
                .unwrap_or(raw);
            params.insert(key.to_string(), decoded);
        } else {
            // Flag parameter without value
            params.insert(param.to_string(), String::new());
        }
    }
    params
}

/// Get a string parameter, trimmed, defaulting to empty.
pub fn get_string(params: &HashMap<String, String>, key: &str) -> String {
    params.get(key).map(|s| s.trim().to_string()).unwrap_or_default()
}

/// Checkbox-style flag: present means set, whatever the value.
pub fn has_flag(params: &HashMap<String, String>, key: &str) -> bool {
    params.contains_key(key)
}
