//! Cleaning of the sim's session YAML before it reaches serde.
//!
//! The sim writes driver and team names verbatim, so values such as
//! `O'Connor, Mike` or a livery string starting with a comma produce YAML
//! that strict parsers reject. It also leaves stray control bytes behind.

use std::borrow::Cow;

/// Keys whose values are free text and are emitted unquoted.
const FREE_TEXT_KEYS: &[&str] = &[
    "AbbrevName",
    "TeamName",
    "UserName",
    "Initials",
    "DriverSetupName",
    "CarDesignStr",
    "CarNumberDesignStr",
    "HelmetDesignStr",
    "SuitDesignStr",
    "ClubName",
    "DivisionName",
];

/// Strip control characters (keeping `\n`, `\r`, `\t`) and single-quote the
/// values of free-text keys.
pub(crate) fn preprocess_iracing_yaml(yaml: &str) -> String {
    let cleaned: String = yaml
        .chars()
        .filter(|&c| !c.is_control() || matches!(c, '\n' | '\r' | '\t'))
        .collect();

    let mut out = String::with_capacity(cleaned.len() + 64);
    for (i, line) in cleaned.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&quote_free_text(line));
    }
    out
}

fn quote_free_text(line: &str) -> Cow<'_, str> {
    let body = line.trim_start();
    let body = body.strip_prefix("- ").unwrap_or(body);
    let Some((key, rest)) = body.split_once(':') else {
        return Cow::Borrowed(line);
    };
    if !FREE_TEXT_KEYS.contains(&key) {
        return Cow::Borrowed(line);
    }
    let value = rest.trim();
    if value.is_empty() || value.starts_with('\'') || value.starts_with('"') {
        return Cow::Borrowed(line);
    }
    let prefix_len = line.len() - rest.len();
    Cow::Owned(format!("{} '{}'", &line[..prefix_len], value.replace('\'', "''")))
}

/// NUL-terminated, lossy UTF-8 conversion.
pub(crate) fn yaml_from_bytes(bytes: &[u8]) -> String {
    let len = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..len]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_characters_are_removed() {
        let result = preprocess_iracing_yaml("WeekendInfo:\n\x00\x01  TrackName: test\x03");
        assert_eq!(result, "WeekendInfo:\n  TrackName: test");
    }

    #[test]
    fn whitespace_survives() {
        let result = preprocess_iracing_yaml("Key:\n\r\t  Value");
        assert_eq!(result, "Key:\n\r\t  Value");
    }

    #[test]
    fn free_text_values_are_quoted() {
        let yaml = " - CarIdx: 1\n   UserName: O'Connor, Mike\n   TeamName: 'Already'\n   CarDesignStr: ,ff0000\n";
        let result = preprocess_iracing_yaml(yaml);
        assert!(result.contains("UserName: 'O''Connor, Mike'"));
        assert!(result.contains("TeamName: 'Already'"));
        assert!(result.contains("CarDesignStr: ',ff0000'"));
        assert!(result.contains("CarIdx: 1"));

        let value: serde_yaml_ng::Value = serde_yaml_ng::from_str(&result).unwrap();
        assert_eq!(value[0]["UserName"].as_str(), Some("O'Connor, Mike"));
    }

    #[test]
    fn list_item_keys_are_quoted() {
        let result = preprocess_iracing_yaml(" - UserName: A: B");
        assert_eq!(result, " - UserName: 'A: B'");
    }

    #[test]
    fn similar_key_names_are_untouched() {
        let line = "  DriverInitials: X, Y";
        assert_eq!(preprocess_iracing_yaml(line), line);
    }
}
