//! Limit rules: the textual spec parser (C1) and the immutable [`Rule`] value.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Which of the four algorithms governs a [`Rule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Precise per-event log, expiring members older than the window.
    SlidingWindow,
    /// Single counter per window with a hard reset at the boundary.
    FixedWindow,
    /// Classic token bucket: constant refill rate, bounded burst.
    TokenBucket,
    /// Leaky bucket: constant drain rate, bounded queue level.
    LeakyBucket,
}

impl Strategy {
    fn as_str(&self) -> &'static str {
        match self {
            Strategy::SlidingWindow => "sliding_window",
            Strategy::FixedWindow => "fixed_window",
            Strategy::TokenBucket => "token_bucket",
            Strategy::LeakyBucket => "leaky_bucket",
        }
    }

    /// Whether this strategy uses a `capacity` (bucket strategies) rather
    /// than treating `requests` as both the rate and the burst ceiling.
    pub fn is_bucket(&self) -> bool {
        matches!(self, Strategy::TokenBucket | Strategy::LeakyBucket)
    }
}

/// An immutable rate limit rule: a request budget, a window, an algorithm,
/// and (for bucket strategies) a burst capacity.
///
/// Two `Rule`s built from the same spec string and prefix address the same
/// composite key; changing `requests`/`window`/the original spec text rolls
/// the key over automatically (§3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Requests admitted per window (sliding/fixed) or steady-state rate
    /// numerator (bucket strategies, combined with `window_seconds`).
    pub requests: u32,
    /// Window length in seconds.
    pub window_seconds: u32,
    /// Governing algorithm.
    pub strategy: Strategy,
    /// Burst ceiling for bucket strategies; defaults to `requests`.
    pub capacity: u32,
    /// Key namespace prefix, default `"rl"`.
    pub key_prefix: String,
    /// The original `"<N>/<period>"` text, preserved verbatim for the
    /// composite key (§3) so that editing a rule invalidates its counter.
    pub limit_text: String,
}

impl Rule {
    /// Parse `"<N>/<period>"` with the default strategy (sliding window)
    /// and prefix (`"rl"`).
    pub fn parse(spec: &str) -> Result<Self, ConfigError> {
        Self::builder(spec)?.build()
    }

    /// Start building a rule from a limit spec, to be customized with
    /// [`RuleBuilder::strategy`], [`RuleBuilder::capacity`], or
    /// [`RuleBuilder::key_prefix`] before calling [`RuleBuilder::build`].
    pub fn builder(spec: &str) -> Result<RuleBuilder, ConfigError> {
        let (requests, window_seconds) = parse_limit_spec(spec)?;
        Ok(RuleBuilder {
            requests,
            window_seconds,
            strategy: Strategy::SlidingWindow,
            capacity: None,
            key_prefix: "rl".to_string(),
            limit_text: spec.to_string(),
        })
    }

    /// The composite key under which this rule's counter is addressed.
    pub fn composite_key(&self, identity: &str) -> String {
        format!("{}:{}:{}", self.key_prefix, identity, self.limit_text)
    }
}

/// Builder returned by [`Rule::builder`].
pub struct RuleBuilder {
    requests: u32,
    window_seconds: u32,
    strategy: Strategy,
    capacity: Option<u32>,
    key_prefix: String,
    limit_text: String,
}

impl RuleBuilder {
    /// Set the governing algorithm. Default is [`Strategy::SlidingWindow`].
    pub fn strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Override the bucket capacity. Defaults to `requests` if unset.
    pub fn capacity(mut self, capacity: u32) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Override the key namespace prefix. Defaults to `"rl"`.
    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Validate and produce the [`Rule`].
    pub fn build(self) -> Result<Rule, ConfigError> {
        if self.requests == 0 || self.window_seconds == 0 {
            return Err(ConfigError::ZeroField {
                requests: self.requests,
                window_seconds: self.window_seconds,
            });
        }

        Ok(Rule {
            requests: self.requests,
            window_seconds: self.window_seconds,
            strategy: self.strategy,
            capacity: self.capacity.unwrap_or(self.requests),
            key_prefix: self.key_prefix,
            limit_text: self.limit_text,
        })
    }
}

/// Parse a `"<N>/<period>"` spec into `(requests, window_seconds)` (§4.1).
///
/// `<period>` is a unit word (`second`/`minute`/`hour`/`day`, singular or
/// plural), a unit letter (`s`/`m`/`h`/`d`), or `<k><unit>` for a positive
/// integer `k`. Matching is case-insensitive.
pub fn parse_limit_spec(spec: &str) -> Result<(u32, u32), ConfigError> {
    let trimmed = spec.trim();
    let (count_str, period_str) = trimmed
        .split_once('/')
        .ok_or_else(|| ConfigError::InvalidLimitSpec(spec.to_string()))?;

    let requests: u32 = count_str
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidRequestCount(spec.to_string()))?;
    if requests == 0 {
        return Err(ConfigError::InvalidRequestCount(spec.to_string()));
    }

    let window_seconds = parse_period(period_str.trim())?;

    Ok((requests, window_seconds))
}

fn parse_period(period: &str) -> Result<u32, ConfigError> {
    let lower = period.to_ascii_lowercase();

    // Bare unit words, singular or plural: "second"/"seconds", etc.
    let bare = match lower.as_str() {
        "second" | "seconds" | "s" => Some(1u32),
        "minute" | "minutes" | "m" => Some(60),
        "hour" | "hours" | "h" => Some(3600),
        "day" | "days" | "d" => Some(86400),
        _ => None,
    };
    if let Some(seconds) = bare {
        return Ok(seconds);
    }

    // "<k><unit>" form, e.g. "30s", "2h", "5minutes".
    let digits_end = lower
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(lower.len());
    if digits_end == 0 {
        return Err(ConfigError::UnknownUnit(period.to_string()));
    }
    let multiplier: u32 = lower[..digits_end]
        .parse()
        .map_err(|_| ConfigError::UnknownUnit(period.to_string()))?;
    if multiplier == 0 {
        return Err(ConfigError::UnknownUnit(period.to_string()));
    }

    let unit = lower[digits_end..].trim_end_matches('s');
    let unit_seconds = match unit {
        "s" | "sec" | "second" => 1u32,
        "m" | "min" | "minute" => 60,
        "h" | "hr" | "hour" => 3600,
        "d" | "day" => 86400,
        _ => return Err(ConfigError::UnknownUnit(period.to_string())),
    };

    multiplier
        .checked_mul(unit_seconds)
        .ok_or_else(|| ConfigError::UnknownUnit(period.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_unit_words() {
        assert_eq!(parse_limit_spec("100/minute").unwrap(), (100, 60));
        assert_eq!(parse_limit_spec("10/second").unwrap(), (10, 1));
        assert_eq!(parse_limit_spec("5/hour").unwrap(), (5, 3600));
        assert_eq!(parse_limit_spec("1/day").unwrap(), (1, 86400));
    }

    #[test]
    fn parses_unit_letters_case_insensitively() {
        assert_eq!(parse_limit_spec("10/S").unwrap(), (10, 1));
        assert_eq!(parse_limit_spec("10/M").unwrap(), (10, 60));
        assert_eq!(parse_limit_spec("10/H").unwrap(), (10, 3600));
        assert_eq!(parse_limit_spec("10/D").unwrap(), (10, 86400));
    }

    #[test]
    fn parses_multiplied_units() {
        assert_eq!(parse_limit_spec("2/30s").unwrap(), (2, 30));
        assert_eq!(parse_limit_spec("2/2minutes").unwrap(), (2, 120));
        assert_eq!(parse_limit_spec("1/2h").unwrap(), (1, 7200));
    }

    #[test]
    fn rejects_malformed_specs() {
        assert!(parse_limit_spec("not-a-spec").is_err());
        assert!(parse_limit_spec("0/minute").is_err());
        assert!(parse_limit_spec("10/fortnight").is_err());
        assert!(parse_limit_spec("10/").is_err());
    }

    #[test]
    fn round_trips_through_regeneration() {
        for spec in ["100/minute", "10/second", "5/hour", "1/day", "2/30s"] {
            let (requests, window_seconds) = parse_limit_spec(spec).unwrap();
            let regenerated = format!("{}/{}s", requests, window_seconds);
            let (requests2, window_seconds2) = parse_limit_spec(&regenerated).unwrap();
            assert_eq!((requests, window_seconds), (requests2, window_seconds2));
        }
    }

    #[test]
    fn builder_defaults_capacity_to_requests() {
        let rule = Rule::parse("10/second").unwrap();
        assert_eq!(rule.capacity, 10);
        assert_eq!(rule.key_prefix, "rl");
        assert_eq!(rule.strategy, Strategy::SlidingWindow);
    }

    #[test]
    fn builder_overrides_apply() {
        let rule = Rule::builder("10/second")
            .unwrap()
            .strategy(Strategy::TokenBucket)
            .capacity(50)
            .key_prefix("custom")
            .build()
            .unwrap();
        assert_eq!(rule.capacity, 50);
        assert_eq!(rule.key_prefix, "custom");
        assert_eq!(rule.strategy, Strategy::TokenBucket);
    }

    #[test]
    fn composite_key_includes_prefix_identity_and_limit_text() {
        let rule = Rule::parse("10/second").unwrap();
        assert_eq!(rule.composite_key("user:42"), "rl:user:42:10/second");
    }

    #[test]
    fn strategy_as_str_matches_wire_names() {
        assert_eq!(Strategy::SlidingWindow.as_str(), "sliding_window");
        assert_eq!(Strategy::FixedWindow.as_str(), "fixed_window");
        assert_eq!(Strategy::TokenBucket.as_str(), "token_bucket");
        assert_eq!(Strategy::LeakyBucket.as_str(), "leaky_bucket");
    }
}
