// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the process-wide default configuration.
//!
//! The default instance is shared by every test in this binary, so each test
//! holds a lock and starts from a reset.

use dyncfg::prelude::*;
use serde::Deserialize;
use std::sync::mpsc::channel;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

static GLOBAL_LOCK: Mutex<()> = Mutex::new(());

fn isolated() -> MutexGuard<'static, ()> {
    let guard = GLOBAL_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    dyncfg::reset();
    guard
}

#[test]
fn test_global_load_and_typed_getters() {
    let _guard = isolated();
    dyncfg::load(
        br#"{"app": {"name": "demo", "workers": 4, "ratio": 0.5, "debug": "on", "tick": "250ms"}}"#,
        &JsonUnmarshaller,
    )
    .unwrap();

    assert_eq!(dyncfg::get_string("app.name"), "demo");
    assert_eq!(dyncfg::get_int("app.workers"), 4);
    assert_eq!(dyncfg::get_uint("app.workers"), 4);
    assert_eq!(dyncfg::get_float64("app.ratio"), 0.5);
    assert!(dyncfg::get_bool("app.debug"));
    assert_eq!(dyncfg::get_duration("app.tick"), Duration::from_millis(250));
    assert!(dyncfg::contains_key("app"));
    assert_eq!(dyncfg::traverse(".").len(), 5);
}

#[test]
fn test_global_set_and_unmarshal() {
    #[derive(Deserialize)]
    struct App {
        name: String,
    }

    let _guard = isolated();
    dyncfg::set("app.name", "svc").unwrap();

    let app: App = dyncfg::unmarshal_key("app").unwrap();
    assert_eq!(app.name, "svc");
    assert!(dyncfg::unmarshal_key::<App>("other").is_err());
    assert_eq!(dyncfg::unmarshal_key_or("app.name", String::new()), "svc");
    assert_eq!(dyncfg::sub("app").get_string("name"), "svc");
}

#[test]
fn test_global_on_change() {
    let _guard = isolated();
    let (tx, rx) = channel();
    dyncfg::on_change("people", move |c| {
        let _ = tx.send(c.get_string("people.name"));
    });

    dyncfg::set("people.name", "Carol").unwrap();
    assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), "Carol");
}

#[test]
fn test_global_reset_swaps_instance() {
    let _guard = isolated();
    dyncfg::set("before", "reset").unwrap();
    let old = dyncfg::default_configuration();

    let (tx, rx) = channel();
    dyncfg::on_change("", move |_| {
        let _ = tx.send(());
    });

    dyncfg::reset();
    assert_eq!(dyncfg::get_string("before"), "");

    // Watchers of the old instance are inert for updates made globally.
    dyncfg::set("after", "reset").unwrap();
    assert!(rx.recv_timeout(Duration::from_millis(300)).is_err());

    // The old handle still works on its own tree.
    assert_eq!(old.get_string("before"), "reset");
    assert_eq!(old.get_string("after"), "");
}

#[test]
fn test_global_data_source() {
    let _guard = isolated();
    let source = std::sync::Arc::new(MemoryDataSource::new(r#"{"mode": "blue"}"#));
    dyncfg::load_from_data_source(source.clone(), std::sync::Arc::new(JsonUnmarshaller))
        .unwrap();
    assert_eq!(dyncfg::get_string("mode"), "blue");

    source.set_content(r#"{"mode": "green"}"#).unwrap();
    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while dyncfg::get_string("mode") != "green" && std::time::Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }
    assert_eq!(dyncfg::get_string("mode"), "green");
    source.close().unwrap();
}
