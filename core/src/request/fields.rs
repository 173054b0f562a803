// Request field helpers — lenient parsing of client-supplied values

use serde::de::{self, Deserialize, Deserializer};
use serde::{Serialize, Serializer};

/// Parse a priority field. Empty or non-numeric values mean 0.
pub fn parse_priority(raw: &str) -> i32 {
    raw.parse().unwrap_or(0)
}

/// Serde helper: a priority sent either as a JSON number or as a string.
pub fn deserialize_priority<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i32, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n
            .as_i64()
            .and_then(|v| i32::try_from(v).ok())
            .unwrap_or(0),
        serde_json::Value::String(s) => parse_priority(&s),
        _ => 0,
    })
}

/// Strip line breaks so client-supplied strings cannot forge log lines.
pub fn sanitize_log(raw: &str) -> String {
    raw.chars().filter(|c| *c != '\n' && *c != '\r').collect()
}

/// Final path component of `path`, or empty for hidden files and
/// directory paths.
pub fn file_base_name(path: &str) -> String {
    let name = path.rsplit(['/', '\\']).next().unwrap_or("");
    if name.starts_with('.') {
        String::new()
    } else {
        name.to_string()
    }
}

/// A string field clients send as boolean-ish JSON.
///
/// `1`, `true`, `on` (and capitalised forms) normalise to `"1"`;
/// `0`, `false`, `off`, `none`, `null` normalise to empty. Anything else is
/// kept as-is, so a field like `sound` can carry either a flag or a name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JsonFlag(String);

impl JsonFlag {
    pub fn new(raw: &str) -> Self {
        match raw {
            "1" | "true" | "TRUE" | "True" | "On" | "on" => Self("1".to_string()),
            "0" | "false" | "FALSE" | "False" | "Off" | "off" | "none" | "NONE" | "null"
            | "NULL" => Self(String::new()),
            other => Self(other.to_string()),
        }
    }

    pub fn is_set(&self) -> bool {
        !self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for JsonFlag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        match value {
            serde_json::Value::String(s) => Ok(JsonFlag::new(&s)),
            serde_json::Value::Bool(b) => Ok(JsonFlag::new(if b { "true" } else { "false" })),
            serde_json::Value::Number(n) => Ok(JsonFlag::new(&n.to_string())),
            serde_json::Value::Null => Ok(JsonFlag::default()),
            other => Err(de::Error::custom(format!(
                "expected a string, boolean or number, got {}",
                other
            ))),
        }
    }
}

impl Serialize for JsonFlag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(serde::Deserialize)]
    struct Fields {
        #[serde(default)]
        sound: JsonFlag,
    }

    fn flag(json: &str) -> JsonFlag {
        serde_json::from_str::<Fields>(json).unwrap().sound
    }

    #[test]
    fn test_parse_priority() {
        assert_eq!(parse_priority("10"), 10);
        assert_eq!(parse_priority("-3"), -3);
        assert_eq!(parse_priority(""), 0);
        assert_eq!(parse_priority("high"), 0);
        assert_eq!(parse_priority(" 5"), 0);
    }

    #[test]
    fn test_deserialize_priority() {
        #[derive(serde::Deserialize)]
        struct P {
            #[serde(default, deserialize_with = "deserialize_priority")]
            priority: i32,
        }
        let parse = |json: &str| serde_json::from_str::<P>(json).unwrap().priority;

        assert_eq!(parse(r#"{"priority":10}"#), 10);
        assert_eq!(parse(r#"{"priority":"7"}"#), 7);
        assert_eq!(parse(r#"{"priority":"x"}"#), 0);
        assert_eq!(parse(r#"{"priority":null}"#), 0);
        assert_eq!(parse(r#"{"priority":99999999999}"#), 0);
        assert_eq!(parse(r#"{}"#), 0);
    }

    #[test]
    fn test_sanitize_log() {
        assert_eq!(sanitize_log("a\r\nb\nc"), "abc");
        assert_eq!(sanitize_log("plain"), "plain");
    }

    #[test]
    fn test_file_base_name() {
        assert_eq!(file_base_name("/tmp/report.pdf"), "report.pdf");
        assert_eq!(file_base_name("report.pdf"), "report.pdf");
        assert_eq!(file_base_name("C:\\docs\\a.txt"), "a.txt");
        assert_eq!(file_base_name("/home/user/.bashrc"), "");
        assert_eq!(file_base_name("/home/user/"), "");
        assert_eq!(file_base_name(""), "");
    }

    #[test]
    fn test_json_flag_truthy() {
        for json in [r#"{"sound":"1"}"#, r#"{"sound":true}"#, r#"{"sound":"On"}"#, r#"{"sound":1}"#] {
            let f = flag(json);
            assert!(f.is_set(), "{}", json);
            assert_eq!(f.as_str(), "1");
        }
    }

    #[test]
    fn test_json_flag_falsy() {
        for json in [
            r#"{"sound":"0"}"#,
            r#"{"sound":false}"#,
            r#"{"sound":"none"}"#,
            r#"{"sound":null}"#,
            r#"{"sound":"NULL"}"#,
            r#"{}"#,
        ] {
            assert!(!flag(json).is_set(), "{}", json);
        }
    }

    #[test]
    fn test_json_flag_keeps_other_values() {
        assert_eq!(flag(r#"{"sound":"bell"}"#).as_str(), "bell");
    }

    #[test]
    fn test_json_flag_rejects_objects() {
        assert!(serde_json::from_str::<Fields>(r#"{"sound":{"a":1}}"#).is_err());
    }
}
