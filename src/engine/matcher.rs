//! Per-record match predicate for search scans
//!
//! A [`MatchFilter`] is compiled once, before any broker call, and then asked
//! a yes/no question per record inside the scan loop. The timestamp window is
//! checked before the text predicate so out-of-window records are skipped
//! without decoding.

use regex::RegexBuilder;

use super::error::Result;
use super::message::ScannedMessage;

/// The text predicate of a search.
#[derive(Debug, Clone)]
pub enum MatchPattern {
    /// Fixed substring, case-folded unless `case_sensitive` is set
    Substring(String),
    /// Regular expression, compiled before the scan starts
    Regex(String),
}

/// Which fields to test and how.
#[derive(Debug, Clone)]
pub struct MatchOptions {
    /// Test the record key
    pub search_key: bool,
    /// Test the record value
    pub search_value: bool,
    /// Test header keys and values
    pub search_headers: bool,
    /// Exact-case matching (default: case-insensitive)
    pub case_sensitive: bool,
    /// Inclusive `[from, to]` window in epoch milliseconds, evaluated before
    /// the text predicate. Records without a broker timestamp never fall
    /// inside a window.
    pub time_window: Option<(i64, i64)>,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            search_key: true,
            search_value: true,
            search_headers: false,
            case_sensitive: false,
            time_window: None,
        }
    }
}

enum CompiledPattern {
    /// Needle pre-folded when matching case-insensitively
    Substring(String),
    Regex(regex::Regex),
}

/// A compiled, ready-to-apply search predicate.
pub struct MatchFilter {
    pattern: CompiledPattern,
    options: MatchOptions,
}

impl MatchFilter {
    /// Compile a pattern with the given options.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::PatternInvalid`](super::error::EngineError) if
    /// a regex pattern fails to compile. This is raised before scanning
    /// starts, never per record.
    pub fn compile(pattern: &MatchPattern, options: MatchOptions) -> Result<Self> {
        let compiled = match pattern {
            MatchPattern::Substring(needle) => {
                let needle = if options.case_sensitive {
                    needle.clone()
                } else {
                    needle.to_lowercase()
                };
                CompiledPattern::Substring(needle)
            }
            MatchPattern::Regex(source) => {
                let re = RegexBuilder::new(source)
                    .case_insensitive(!options.case_sensitive)
                    .build()?;
                CompiledPattern::Regex(re)
            }
        };

        Ok(Self {
            pattern: compiled,
            options,
        })
    }

    /// Whether the record passes the timestamp window and text predicate.
    pub fn matches(&self, msg: &ScannedMessage) -> bool {
        if let Some((from, to)) = self.options.time_window {
            match msg.timestamp_ms {
                Some(ts) if ts >= from && ts <= to => {}
                _ => return false,
            }
        }

        if self.options.search_key {
            if let Some(key) = msg.key_text() {
                if self.text_matches(&key) {
                    return true;
                }
            }
        }

        if self.options.search_value {
            if let Some(value) = msg.value_text() {
                if self.text_matches(&value) {
                    return true;
                }
            }
        }

        if self.options.search_headers {
            for (name, value) in &msg.headers {
                if self.text_matches(name) {
                    return true;
                }
                if let Some(v) = value {
                    if self.text_matches(&String::from_utf8_lossy(v)) {
                        return true;
                    }
                }
            }
        }

        false
    }

    /// The options this filter was compiled with.
    pub fn options(&self) -> &MatchOptions {
        &self.options
    }

    fn text_matches(&self, text: &str) -> bool {
        match &self.pattern {
            CompiledPattern::Substring(needle) => {
                if self.options.case_sensitive {
                    text.contains(needle.as_str())
                } else {
                    text.to_lowercase().contains(needle.as_str())
                }
            }
            CompiledPattern::Regex(re) => re.is_match(text),
        }
    }
}

impl std::fmt::Debug for MatchFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchFilter")
            .field("options", &self.options)
            .finish()
    }
}
