use rand::{rngs::StdRng, Rng, SeedableRng};
use regionping::*;

fn mk_region(key: &str, label: &str) -> Region {
    let url = format!("http://{key}.example.test/api/ping").parse().unwrap();
    Region::new(key, label, url, 20)
}

fn mk_session(regions: &[(&str, &str)]) -> Session {
    let mut session = Session::new(GLOBAL_REGION_KEY);
    for (key, label) in regions {
        session.insert_region(mk_region(key, label));
    }
    session
}

fn order_of(session: &Session) -> Vec<&str> {
    session.order().keys().iter().map(String::as_str).collect()
}

#[test]
fn test_incremental_order_follows_each_probe() {
    let mut session = mk_session(&[("a", "Alpha"), ("b", "Bravo"), ("global", "Global")]);

    session.record_sample("a", 50).unwrap();
    assert_eq!(order_of(&session), vec!["a"]);

    session.record_sample("b", 200).unwrap();
    assert_eq!(order_of(&session), vec!["a", "b"]);

    session.record_sample("global", 40).unwrap();
    assert_eq!(order_of(&session), vec!["global", "a", "b"]);

    assert_eq!(session.order().fastest_excluding("global"), Some("a"));
    assert_eq!(session.fastest_region().map(|r| r.key.as_str()), Some("a"));
}

#[test]
fn test_recording_same_key_twice_keeps_one_entry() {
    let mut session = mk_session(&[("a", "Alpha"), ("b", "Bravo"), ("c", "Charlie")]);
    session.record_sample("a", 10).unwrap();
    session.record_sample("b", 20).unwrap();
    session.record_sample("c", 30).unwrap();

    // a's median moves to 100 after the second sample (index 1 of [10, 100])
    session.record_sample("a", 100).unwrap();
    assert_eq!(session.region("a").unwrap().median(), Some(100));
    assert_eq!(order_of(&session), vec!["b", "c", "a"]);
    assert_eq!(session.order().keys().iter().filter(|k| *k == "a").count(), 1);

    // re-recording without a median change leaves the order alone
    let regions = session.regions().clone();
    let mut order = session.order().clone();
    order.record_result("b", &regions).unwrap();
    assert_eq!(order.keys(), session.order().keys());
}

#[test]
fn test_order_is_non_decreasing_after_random_updates() {
    let keys = ["r0", "r1", "r2", "r3", "r4", "r5", "r6", "r7"];
    let mut session = mk_session(&keys.iter().map(|k| (*k, *k)).collect::<Vec<_>>());
    let mut rng = StdRng::seed_from_u64(7);

    for _ in 0..500 {
        let key = keys[rng.gen_range(0..keys.len())];
        session.record_sample(key, rng.gen_range(1..400)).unwrap();

        assert!(session.order().is_sorted(session.regions()));
        let medians: Vec<u64> = session.ranked().map(|r| r.median().unwrap()).collect();
        assert!(medians.windows(2).all(|w| w[0] <= w[1]), "not ascending: {medians:?}");
    }
    assert_eq!(session.order().len(), keys.len());
}

#[test]
fn test_equal_medians_keep_discovery_order() {
    let mut session = mk_session(&[("first", "1"), ("second", "2"), ("third", "3")]);

    // recorded in reverse discovery order, all equal
    session.record_sample("third", 40).unwrap();
    session.record_sample("second", 40).unwrap();
    session.record_sample("first", 40).unwrap();
    assert_eq!(order_of(&session), vec!["first", "second", "third"]);

    // an update that keeps the value equal does not move the key to the end
    session.record_sample("first", 40).unwrap();
    assert_eq!(order_of(&session), vec!["first", "second", "third"]);

    // descending keeps discovery order among ties as well
    session.resort(SortKey::Median, SortDirection::Descending);
    assert_eq!(order_of(&session), vec!["first", "second", "third"]);
}

#[test]
fn test_resort_by_label_ignores_latency() {
    let mut session = mk_session(&[
        ("us-east1", "South Carolina"),
        ("europe-west2", "London"),
        ("asia-east1", "Taiwan"),
        ("us-west1", "Oregon"),
    ]);
    session.record_sample("us-east1", 20).unwrap();
    session.record_sample("europe-west2", 90).unwrap();
    session.record_sample("asia-east1", 250).unwrap();
    session.record_sample("us-west1", 70).unwrap();
    assert_eq!(order_of(&session), vec!["us-east1", "us-west1", "europe-west2", "asia-east1"]);

    session.resort(SortKey::Label, SortDirection::Ascending);
    let labels: Vec<&str> = session.ranked().map(|r| r.label.as_str()).collect();
    assert_eq!(labels, vec!["London", "Oregon", "South Carolina", "Taiwan"]);

    // steady-state updates keep using the label ordering
    session.record_sample("asia-east1", 1).unwrap();
    session.record_sample("asia-east1", 1).unwrap();
    let labels: Vec<&str> = session.ranked().map(|r| r.label.as_str()).collect();
    assert_eq!(labels, vec!["London", "Oregon", "South Carolina", "Taiwan"]);
}

#[test]
fn test_descending_median_order() {
    let mut session = mk_session(&[("a", "A"), ("b", "B"), ("c", "C")]);
    session.resort(SortKey::Median, SortDirection::Descending);

    session.record_sample("a", 10).unwrap();
    session.record_sample("b", 30).unwrap();
    session.record_sample("c", 20).unwrap();
    assert_eq!(order_of(&session), vec!["b", "c", "a"]);
    assert!(session.order().is_sorted(session.regions()));
}

#[test]
fn test_resort_by_latest_sample() {
    let mut session = mk_session(&[("a", "A"), ("b", "B")]);
    session.record_sample("a", 10).unwrap();
    session.record_sample("a", 10).unwrap();
    session.record_sample("a", 500).unwrap();
    session.record_sample("b", 100).unwrap();

    // median of a is 10, but its latest sample is the slowest
    assert_eq!(order_of(&session), vec!["a", "b"]);
    session.resort(SortKey::Latest, SortDirection::Ascending);
    assert_eq!(order_of(&session), vec!["b", "a"]);
}

#[test]
fn test_fastest_excluding_skips_sentinel() {
    let mut session = mk_session(&[("global", "Global"), ("a", "A"), ("b", "B")]);
    session.record_sample("global", 5).unwrap();
    assert_eq!(session.order().fastest_excluding("global"), None);

    session.record_sample("b", 60).unwrap();
    session.record_sample("a", 70).unwrap();
    assert_eq!(order_of(&session), vec!["global", "b", "a"]);
    assert_eq!(session.order().fastest_excluding("global"), Some("b"));
    assert_eq!(session.order().top_excluding("global", 5), vec!["b", "a"]);
    assert_eq!(session.top_regions(1).len(), 1);
}

#[test]
fn test_unknown_region_is_rejected() {
    let mut session = mk_session(&[("a", "A")]);
    let err = session.record_sample("zz", 1).unwrap_err();
    assert!(matches!(err, RegionPingError::UnknownRegion { ref key } if key == "zz"));
    assert!(session.order().is_empty());
}

#[test]
fn test_reset_rebuilds_empty_order() {
    let mut session = mk_session(&[("a", "A"), ("global", "Global")]);
    session.resort(SortKey::Label, SortDirection::Descending);
    session.record_sample("a", 12).unwrap();
    session.record_sample("global", 9).unwrap();
    session.set_routing_target(Some("us-east1".to_string()));
    session.mark_fastest_visible();

    session.reset();
    assert!(session.order().is_empty());
    assert_eq!(session.order().sort_key(), SortKey::Label);
    assert_eq!(session.order().direction(), SortDirection::Descending);
    assert!(session.regions().iter().all(|r| r.median().is_none()));
    assert_eq!(session.routing_target(), None);
    assert!(!session.fastest_visible());
    assert_eq!(session.regions().len(), 2);
}

#[test]
fn test_duplicate_directory_key_keeps_discovery_slot() {
    let mut session = mk_session(&[("a", "A"), ("b", "B")]);
    session.insert_region(mk_region("a", "A prime"));
    let keys: Vec<&str> = session.regions().keys().collect();
    assert_eq!(keys, vec!["a", "b"]);
    assert_eq!(session.region("a").unwrap().label, "A prime");
}

#[test]
fn test_sort_key_parsing() {
    assert_eq!("median".parse::<SortKey>().unwrap(), SortKey::Median);
    assert_eq!("latency".parse::<SortKey>().unwrap(), SortKey::Median);
    assert_eq!("Label".parse::<SortKey>().unwrap(), SortKey::Label);
    assert_eq!("region".parse::<SortKey>().unwrap(), SortKey::Key);
    assert!("speed".parse::<SortKey>().is_err());
    assert_eq!(SortDirection::Ascending.flipped(), SortDirection::Descending);
}
