// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hot reload example.
//!
//! This example demonstrates:
//! - Binding a configuration to a data source
//! - Reacting to changes under a key prefix with `on_change`
//! - Keeping the last good state when a payload fails to decode
//!
//! To run this example:
//! ```bash
//! RUST_LOG=debug cargo run --example hot_reload
//! ```

use dyncfg::prelude::*;
use std::sync::mpsc::channel;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn main() -> Result<()> {
    // Initialize tracing for logging
    tracing_subscriber::fmt::init();

    println!("=== dyncfg: Hot Reload Example ===\n");

    let source = Arc::new(MemoryDataSource::new(
        r#"{"server": {"http": {"addr": ":8080", "timeout": "5s"}}, "people": {"name": "Alice"}}"#,
    ));

    let config = Configuration::new();
    config.load_from_data_source(source.clone(), Arc::new(JsonUnmarshaller))?;
    print_values(&config);

    let (tx, rx) = channel();
    config.on_change("server.http", move |c| {
        println!(
            "\n🔄 server.http changed: addr={} timeout={:?}",
            c.get_string("server.http.addr"),
            c.get_duration("server.http.timeout")
        );
        let _ = tx.send(());
    });

    println!("\nUpdating server.http.addr...");
    source.set_content(
        r#"{"server": {"http": {"addr": ":9090", "timeout": "5s"}}, "people": {"name": "Alice"}}"#,
    )?;
    if rx.recv_timeout(Duration::from_secs(2)).is_err() {
        println!("no change notification received");
    }

    println!("\nUpdating only people.name (server.http watcher stays quiet)...");
    source.set_content(
        r#"{"server": {"http": {"addr": ":9090", "timeout": "5s"}}, "people": {"name": "Bob"}}"#,
    )?;
    thread::sleep(Duration::from_millis(200));

    println!("\nPushing a broken payload (last good state is kept)...");
    source.set_content("{ not json")?;
    thread::sleep(Duration::from_millis(200));
    print_values(&config);

    source.close()?;
    println!("\nDone.");
    Ok(())
}

fn print_values(config: &Configuration) {
    println!("server.http.addr    = {}", config.get_string("server.http.addr"));
    println!(
        "server.http.timeout = {:?}",
        config.get_duration("server.http.timeout")
    );
    println!("people.name         = {}", config.get_string("people.name"));
}
