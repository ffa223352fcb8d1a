//! Round-trip tests for the configuration record and rule values through
//! `serde_json`, exercising the shape embedding applications are expected to
//! load configuration from (e.g. a JSON config file or API payload).

use throttlecore::config::{RateLimiterConfig, RemoteConfig, Topology};
use throttlecore::rule::{Rule, Strategy};

#[test]
fn rule_round_trips_through_json() {
    let rule = Rule::builder("10/second")
        .unwrap()
        .strategy(Strategy::TokenBucket)
        .capacity(50)
        .key_prefix("api")
        .build()
        .unwrap();

    let json = serde_json::to_string(&rule).unwrap();
    let restored: Rule = serde_json::from_str(&json).unwrap();

    assert_eq!(rule, restored);
}

#[test]
fn remote_config_round_trips_through_json() {
    let remote = RemoteConfig {
        host: "redis.internal".to_string(),
        port: 6380,
        db: 2,
        password: Some("hunter2".to_string()),
        tls: true,
        topology: Topology::Sentinel,
        sentinel_nodes: vec!["sentinel-1:26379".to_string(), "sentinel-2:26379".to_string()],
        primary_name: Some("mymaster".to_string()),
        pool_size: 20,
        timeout_s: 2,
    };

    let json = serde_json::to_string(&remote).unwrap();
    let restored: RemoteConfig = serde_json::from_str(&json).unwrap();

    assert_eq!(restored.host, remote.host);
    assert_eq!(restored.topology, Topology::Sentinel);
    assert_eq!(restored.sentinel_nodes, remote.sentinel_nodes);
    assert_eq!(restored.primary_name, remote.primary_name);
}

#[test]
fn full_rate_limiter_config_round_trips_through_json() {
    let mut config = RateLimiterConfig::default();
    config.global_rules.push(Rule::parse("1000/hour").unwrap());
    config.global_rules.push(
        Rule::builder("5/second")
            .unwrap()
            .strategy(Strategy::LeakyBucket)
            .build()
            .unwrap(),
    );
    config.fail_open = false;

    let json = serde_json::to_string_pretty(&config).unwrap();
    let restored: RateLimiterConfig = serde_json::from_str(&json).unwrap();

    assert_eq!(restored.global_rules.len(), 2);
    assert!(!restored.fail_open);
    assert_eq!(restored.global_rules[1].strategy, Strategy::LeakyBucket);
}

#[test]
fn default_config_matches_spec_defaults() {
    let config = RateLimiterConfig::default();

    assert!(config.enabled);
    assert!(config.fail_open);
    assert!(config.graceful_degradation);
    assert!(!config.in_memory_fallback);
    assert!(config.emit_headers);
    assert!(config.global_rules.is_empty());
    assert_eq!(config.remote.topology, Topology::Single);
}
