// Record extraction: one raw access-log line -> (path, latency) or a typed rejection.
// Pure; the pattern is compiled once at startup and shared.

use regex::Regex;
use url::Url;

/// Capture group holding the request line (`METHOD PATH PROTOCOL`).
pub const REQUEST_LINE_GROUP: usize = 5;
/// Capture group holding the request time in seconds.
pub const LATENCY_GROUP: usize = 12;
/// Minimum number of capture groups a usable pattern must define.
pub const MIN_CAPTURE_GROUPS: usize = 12;

/// Default pattern for nginx combined format extended with
/// `$upstream_response_time $request_time` as the last two fields.
pub const DEFAULT_COMBINED_PATTERN: &str = r#"^(\S+) (\S+) (\S+) \[([^\]]+)\] "([^"]*)" (\d{3}) (\S+) "([^"]*)" "([^"]*)" "([^"]*)" (\S+) (\S+)$"#;

/// A successful extraction: request path (query/fragment stripped) and
/// latency in seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedRecord {
    pub path: String,
    pub latency_seconds: f64,
}

/// Why a line was rejected. Every variant means "drop this record from
/// statistics"; none is fatal to the ingestion task.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    #[error("line did not match the configured pattern")]
    MalformedRecord,
    #[error("request line did not split into METHOD PATH PROTOCOL")]
    MalformedRequestLine,
    #[error("request path failed to parse as a URL")]
    UnparsablePath,
    #[error("latency field failed numeric parse")]
    MalformedLatency,
}

/// Compiled access-log pattern plus the base URL used to resolve
/// origin-form request targets.
pub struct LogPattern {
    regex: Regex,
    base: Url,
}

impl LogPattern {
    /// Compiles the configured pattern. Fails when the pattern is not a
    /// valid regex or defines fewer capture groups than the combined-format
    /// contract requires.
    pub fn new(pattern: &str) -> anyhow::Result<Self> {
        let regex = Regex::new(pattern)?;
        // captures_len counts the implicit whole-match group 0.
        anyhow::ensure!(
            regex.captures_len() > MIN_CAPTURE_GROUPS,
            "format pattern must define at least {} capture groups, got {}",
            MIN_CAPTURE_GROUPS,
            regex.captures_len() - 1
        );
        let base = Url::parse("http://localhost/").expect("static base URL");
        Ok(Self { regex, base })
    }

    /// Extracts `(path, latency_seconds)` from one raw line.
    pub fn extract(&self, line: &str) -> Result<ExtractedRecord, ExtractError> {
        let caps = self
            .regex
            .captures(line)
            .ok_or(ExtractError::MalformedRecord)?;

        let request_line = caps
            .get(REQUEST_LINE_GROUP)
            .ok_or(ExtractError::MalformedRecord)?
            .as_str();
        let tokens: Vec<&str> = request_line.split(' ').collect();
        if tokens.len() != 3 {
            return Err(ExtractError::MalformedRequestLine);
        }

        // join() resolves origin-form targets ("/a/b?q=1") against the base
        // and also accepts absolute-form targets; either way only the path
        // component survives.
        let url = self
            .base
            .join(tokens[1])
            .map_err(|_| ExtractError::UnparsablePath)?;
        let path = url.path().to_string();

        // A latency like "-" must reject the whole record, not record 0.0.
        let latency_seconds = caps
            .get(LATENCY_GROUP)
            .ok_or(ExtractError::MalformedRecord)?
            .as_str()
            .parse::<f64>()
            .map_err(|_| ExtractError::MalformedLatency)?;

        Ok(ExtractedRecord {
            path,
            latency_seconds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_with_too_few_groups_is_rejected() {
        assert!(LogPattern::new(r"^(\S+) (\S+)$").is_err());
    }

    #[test]
    fn invalid_regex_is_rejected() {
        assert!(LogPattern::new(r"([unclosed").is_err());
    }
}
