//! Integration tests: status sequences end to end through the public API.
//!
//! A configuration is loaded from a store, bridges are initialized against a
//! MockTransport, and a series of statuses is applied, checking the group
//! writes each step produces.

use std::sync::{Arc, Barrier};
use std::thread;

use huestatus_lib::config::Config;
use huestatus_lib::monitor::{Outcome, StatusMonitor};
use huestatus_lib::protocol::Method;
use huestatus_lib::resolver;
use huestatus_lib::store::{self, KvStore, MemoryStore};
use huestatus_lib::transport::mock::MockTransport;
use serde_json::{Value, json};

const LAB_GROUPS: &str = "http://10.0.0.5/api/abc/groups/";
const LAB_RACK1: &str = "http://10.0.0.5/api/abc/groups/1/action/";
const OFFICE_GROUPS: &str = "http://10.0.0.6/api/def/groups/";
const OFFICE_DESK: &str = "http://10.0.0.6/api/def/groups/9/action/";

fn cluster_document() -> Value {
    json!({
        "version": 1,
        "format": "huestatus",
        "bridges": [
            {
                "name": "lab", "address": "10.0.0.5", "user": "abc", "enabled": true,
                "groups": [{"name": "rack1", "status": {
                    "HEALTH_OK": {"color": "green"},
                    "HEALTH_WARN": {"color": "yellow"},
                    "HEALTH_ERR": {"color": "red", "type": "alert"}
                }}]
            },
            {
                "name": "office", "address": "10.0.0.6", "user": "def", "enabled": true,
                "groups": [{"name": "desk", "status": {
                    "HEALTH_WARN": {"color": "yellow"},
                    "HEALTH_ERR": {"color": "red"}
                }}]
            }
        ]
    })
}

fn transport() -> MockTransport {
    let t = MockTransport::new();
    t.respond_ok(
        Method::Get,
        LAB_GROUPS,
        json!({"1": {"name": "rack1", "lights": ["1", "2", "3"]}}),
    );
    t.respond_ok(
        Method::Get,
        OFFICE_GROUPS,
        json!({"9": {"name": "desk", "lights": ["4"]}}),
    );
    t
}

fn puts(t: &MockTransport) -> Vec<(String, Value)> {
    t.requests_with(Method::Put)
        .into_iter()
        .map(|r| (r.url, r.body.unwrap_or(Value::Null)))
        .collect()
}

fn stored_monitor(t: &MockTransport) -> StatusMonitor<MockTransport> {
    let mut kv = MemoryStore::new();
    store::save_config(&mut kv, &Config::parse(&cluster_document()).unwrap()).unwrap();
    let config = store::load_config(&kv).unwrap();
    StatusMonitor::new(config, t.clone())
}

// ── Test: the lab scenario from configuration to device write ──

#[test]
fn lab_scenario_end_to_end() {
    let mut config = Config::parse(&json!({"bridges": [{
        "name": "lab", "address": "10.0.0.5", "user": "abc",
        "groups": [{"name": "rack1", "status": {"HEALTH_ERR": {"color": "red", "type": "alert"}}}]
    }]}))
    .unwrap();
    assert!(config.enable_bridge("lab", false));

    let targets = resolver::resolve(&config, "HEALTH_ERR");
    assert_eq!(targets.len(), 1);
    assert_eq!(targets[0].bridge, "lab");
    assert_eq!(targets[0].group, "rack1");
    assert_eq!(targets[0].color.color_name(), "red");
    assert!(targets[0].color.is_alert());

    let t = transport();
    let monitor = StatusMonitor::new(config, t.clone());
    let report = monitor.apply_status("HEALTH_ERR");
    assert!(report.all_applied());
    assert_eq!(
        puts(&t),
        [(
            LAB_RACK1.to_string(),
            json!({"on": true, "alert": "lselect", "hue": 0, "sat": 254, "bri": 254})
        )]
    );
}

// ── Test: a status sequence only writes on change ──

#[test]
fn status_sequence_writes_only_changes() {
    let t = transport();
    let monitor = stored_monitor(&t);
    assert_eq!(
        monitor.init_bridges(),
        [("lab".to_string(), true), ("office".to_string(), true)]
    );

    monitor.apply_status("HEALTH_WARN");
    assert_eq!(puts(&t).len(), 2);

    // Repeated status: everything cached.
    t.clear_requests();
    monitor.apply_status("HEALTH_WARN");
    assert!(puts(&t).is_empty());

    // Escalation rewrites both groups.
    t.clear_requests();
    monitor.apply_status("HEALTH_ERR");
    let writes = puts(&t);
    assert_eq!(writes.len(), 2);
    assert_eq!(writes[0].1["alert"], "lselect");
    assert_eq!(writes[1].1["alert"], "select");

    // Recovery only concerns the lab rack; the desk keeps showing red.
    t.clear_requests();
    let report = monitor.apply_status("HEALTH_OK");
    assert_eq!(report.groups.len(), 1);
    assert_eq!(
        puts(&t),
        [(
            LAB_RACK1.to_string(),
            json!({"on": true, "alert": "select", "hue": 25500, "sat": 254, "bri": 254})
        )]
    );
}

// ── Test: one unreachable bridge does not block the other ──

#[test]
fn transport_failure_is_isolated_per_bridge() {
    let t = transport();
    t.set_unreachable("http://10.0.0.5/");
    let monitor = stored_monitor(&t);

    let report = monitor.apply_status("HEALTH_WARN");
    assert_eq!(report.groups.len(), 2);
    assert_eq!(report.groups[0].bridge, "lab");
    assert_eq!(report.groups[0].outcome, Outcome::Failed);
    assert_eq!(report.groups[1].bridge, "office");
    assert_eq!(report.groups[1].outcome, Outcome::Applied);
    assert_eq!(puts(&t).len(), 1);
    assert_eq!(puts(&t)[0].0, OFFICE_DESK);
}

// ── Test: shutdown turns everything off ──

#[test]
fn shutdown_after_sequence() {
    let t = transport();
    let monitor = stored_monitor(&t);
    monitor.apply_status("HEALTH_ERR");

    t.clear_requests();
    let reports = monitor.shutdown();
    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|r| r.is_applied()));
    assert_eq!(
        puts(&t),
        [
            (LAB_RACK1.to_string(), json!({"on": false})),
            (OFFICE_DESK.to_string(), json!({"on": false})),
        ]
    );

    // The cache was cleared: the same status is written again.
    t.clear_requests();
    monitor.apply_status("HEALTH_ERR");
    assert_eq!(puts(&t).len(), 2);
}

// ── Test: statuses arriving together are applied one after the other ──

#[test]
fn overlapping_statuses_do_not_interleave() {
    for _ in 0..20 {
        let t = transport();
        let monitor = Arc::new(stored_monitor(&t));
        let barrier = Arc::new(Barrier::new(2));

        let handles: Vec<_> = ["HEALTH_WARN", "HEALTH_ERR"]
            .into_iter()
            .map(|status| {
                let monitor = Arc::clone(&monitor);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    monitor.apply_status(status)
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap().all_applied());
        }

        // Each apply writes rack1 then desk, with one color per apply.
        let writes = puts(&t);
        let urls: Vec<&str> = writes.iter().map(|(url, _)| url.as_str()).collect();
        assert_eq!(urls, [LAB_RACK1, OFFICE_DESK, LAB_RACK1, OFFICE_DESK]);
        assert_eq!(writes[0].1["hue"], writes[1].1["hue"]);
        assert_eq!(writes[2].1["hue"], writes[3].1["hue"]);
        assert_ne!(writes[0].1["hue"], writes[2].1["hue"]);

        // The cache holds whichever status was written last.
        let last = if writes[3].1["hue"] == 0 {
            "HEALTH_ERR"
        } else {
            "HEALTH_WARN"
        };
        t.clear_requests();
        assert!(monitor.apply_status(last).all_applied());
        assert!(puts(&t).is_empty(), "{last} should be cached");
    }
}

// ── Test: config changes made through the monitor survive a store round-trip ──

#[test]
fn monitor_changes_persist() {
    let t = transport();
    t.respond_ok(
        Method::Post,
        "http://10.0.0.7/api/",
        json!([{"success": {"username": "s3cret"}}]),
    );
    let monitor = stored_monitor(&t);
    monitor
        .setup_bridge(
            "spare",
            &json!({"address": "10.0.0.7", "groups": [
                {"name": "hall", "status": {"HEALTH_ERR": {"color": "red"}}}
            ]}),
        )
        .unwrap();
    monitor.create_user("spare").unwrap();
    monitor.disable_bridge("office").unwrap();

    let mut kv = MemoryStore::new();
    store::save_config(&mut kv, &monitor.config()).unwrap();
    assert!(kv.get(store::CONFIG_KEY).unwrap().is_some());

    let reloaded = store::load_config(&kv).unwrap();
    assert_eq!(reloaded, monitor.config());
    let spare = reloaded.bridge("spare").unwrap();
    assert_eq!(spare.user.as_deref(), Some("s3cret"));
    assert!(!spare.enabled);
    assert!(!reloaded.bridge("office").unwrap().enabled);
    assert!(reloaded.bridge("lab").unwrap().enabled);
}
