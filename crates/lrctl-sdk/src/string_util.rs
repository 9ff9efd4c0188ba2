/// String helpers shared by the config document and manifest parsers.
pub struct StringUtil;

impl StringUtil {
    /// Convert a string to a boolean.
    ///
    /// Valid true values: `"1"`, `"true"`, `"yes"` (case-insensitive).
    /// Valid false values: `"0"`, `"false"`, `"no"` (case-insensitive).
    /// Returns `None` for unrecognized values.
    pub fn convert_to_bool(value: &str) -> Option<bool> {
        match value.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" => Some(true),
            "0" | "false" | "no" => Some(false),
            _ => None,
        }
    }

    /// Returns the second whitespace-delimited token of `line`, if any.
    pub fn second_token(line: &str) -> Option<&str> {
        line.split_whitespace().nth(1)
    }

    /// Strip one pair of matching surrounding quotes (`"` or `'`).
    pub fn trim_matching_quotes(value: &str) -> &str {
        let bytes = value.as_bytes();
        if bytes.len() >= 2 {
            let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
            if (first == b'"' || first == b'\'') && first == last {
                return &value[1..value.len() - 1];
            }
        }
        value
    }
}
