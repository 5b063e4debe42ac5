use std::time::Duration;

use regionping::*;
use serde_json::json;

#[test]
fn test_pinger_config_defaults() {
    let d = PingerConfig::default();
    assert_eq!(d.endpoints_url, config::DEFAULT_ENDPOINTS_URL);
    assert_eq!(d.ping_path, "/api/ping");
    assert_eq!(d.global_region_key, GLOBAL_REGION_KEY);
    assert_eq!(d.initial_iterations, 10);
    assert_eq!(d.history_limit, 20);
    assert_eq!(d.probe_timeout_ms, 5000);
    assert_eq!(d.retry.retry_count, 1);
    assert_eq!(d.refresh_interval_secs, 3600);
    assert!(d.auto_start);
    assert_eq!(d.log_level, LogLevel::Info);
}

#[test]
fn test_partial_config_fills_in_defaults() {
    let cfg: PingerConfig = serde_json::from_value(json!({
        "initial_iterations": 3,
        "log_level": "debug",
        "retry": { "retry_count": 4 }
    }))
    .unwrap();

    assert_eq!(cfg.initial_iterations, 3);
    assert_eq!(cfg.log_level, LogLevel::Debug);
    assert_eq!(cfg.retry.retry_count, 4);
    assert_eq!(cfg.retry.retry_delay_ms, 250);
    assert_eq!(cfg.history_limit, 20);
}

#[test]
fn test_config_from_missing_file_is_io_error() {
    let err = PingerConfig::from_json_file("/definitely/not/here/regionping.json").unwrap_err();
    assert!(matches!(err, RegionPingError::Io(_)));
}

#[test]
fn test_resolve_config_clamps_degenerate_values() {
    let cfg = PingerConfig {
        history_limit: 0,
        probe_timeout_ms: 0,
        refresh_interval_secs: 0,
        retry: RetrySettings { retry_count: 0, retry_delay_ms: 40 },
        ..Default::default()
    };
    let resolved = resolve_config(cfg);

    assert_eq!(resolved.history_limit, 1);
    assert_eq!(resolved.retry.retry_count, 1);
    assert_eq!(resolved.retry.retry_delay, Duration::from_millis(40));
    assert_eq!(resolved.settings.probe_timeout, Duration::from_millis(1));
    assert_eq!(resolved.settings.refresh_interval, Duration::from_secs(1));
}

#[test]
fn test_latency_class_thresholds() {
    assert_eq!(LatencyClass::of(None), LatencyClass::Unknown);
    assert_eq!(LatencyClass::of(Some(0)), LatencyClass::Fast);
    assert_eq!(LatencyClass::of(Some(100)), LatencyClass::Fast);
    assert_eq!(LatencyClass::of(Some(101)), LatencyClass::Medium);
    assert_eq!(LatencyClass::of(Some(299)), LatencyClass::Medium);
    assert_eq!(LatencyClass::of(Some(300)), LatencyClass::Slow);
}

#[test]
fn test_region_from_endpoint_joins_ping_path() {
    let endpoint = Endpoint {
        url: "https://us-east1.example.test/".to_string(),
        region: "us-east1".to_string(),
        region_name: "South Carolina".to_string(),
        lat: Some(33.8),
        lng: Some(-81.1),
    };

    let region = Region::from_endpoint(&endpoint, "/api/ping", 20).unwrap();
    assert_eq!(region.probe_url.as_str(), "https://us-east1.example.test/api/ping");
    assert_eq!(region.key, "us-east1");
    assert_eq!(region.label, "South Carolina");
    assert_eq!(region.lat, Some(33.8));
    assert_eq!(region.latency_class(), LatencyClass::Unknown);

    let bad = Endpoint { url: "not a url".to_string(), ..endpoint };
    assert!(Region::from_endpoint(&bad, "/api/ping", 20).is_err());
}

#[test]
fn test_region_samples_and_failures() {
    let url = "http://a.example.test/api/ping".parse().unwrap();
    let mut region = Region::new("a", "A", url, 3);

    assert_eq!(region.record_sample(300), 300);
    assert_eq!(region.record_sample(100), 300);
    assert_eq!(region.record_sample(200), 200);
    assert_eq!(region.latest(), Some(200));
    region.record_failure();
    assert_eq!(region.failure_count, 1);

    region.clear();
    assert_eq!(region.median(), None);
    assert_eq!(region.failure_count, 0);
}

#[test]
fn test_endpoint_wire_format() {
    let endpoint: Endpoint = serde_json::from_value(json!({
        "URL": "https://global.example.test",
        "Region": "global",
        "RegionName": "Global HTTP Load Balancer"
    }))
    .unwrap();
    assert_eq!(endpoint.lat, None);

    let value = serde_json::to_value(&endpoint).unwrap();
    assert!(value.get("Lat").is_none());
    assert_eq!(value["RegionName"], "Global HTTP Load Balancer");
}

#[test]
fn test_status_update_wire_format() {
    let update = StatusUpdate { status: RunStatus::Running, completed: 3, total: 34 };
    assert_eq!(
        serde_json::to_value(update).unwrap(),
        json!({ "status": "running", "completed": 3, "total": 34 })
    );
    assert_eq!(RunStatus::default(), RunStatus::Stopped);
}
