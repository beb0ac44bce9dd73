//
//  Copyright 2024 Google, Inc.
//
//  Licensed under the Apache License, Version 2.0 (the "License");
//  you may not use this file except in compliance with the License.
//  You may obtain a copy of the License at:
//
//  http://www.apache.org/licenses/LICENSE-2.0
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.

//! Logging for the softmac crates.
//!
//! Wraps env_logger, so RUST_LOG controls verbosity. Each line carries
//! a level letter, a UTC timestamp and the emitting module.

use std::io::Write;

use chrono::Utc;
use env_logger::{Builder, Env};
use log::{Level, Record};

/// Initializes process-wide logging for a daemon embedding the
/// receive path.
pub fn init() {
    let mut builder = Builder::from_env(Env::default().default_filter_or("info"));
    builder.format(|buf, record| {
        writeln!(
            buf,
            "{} {} softmac {}:{} - {}",
            level_tag(record.level()),
            timestamp(),
            module(record),
            record.line().unwrap_or(0),
            record.args()
        )
    });
    builder.init();
}

/// Logging for unit and integration tests. Output stays captured per
/// test, and repeated initialization across tests is a no-op.
pub fn init_for_test() {
    let mut builder = Builder::from_env(Env::default().default_filter_or("debug"));
    builder.is_test(true).format(|buf, record| {
        writeln!(
            buf,
            "{} {} softmac-test: {}",
            level_tag(record.level()),
            timestamp(),
            record.args()
        )
    });
    let _ = builder.try_init();
}

fn timestamp() -> String {
    Utc::now().format("%m-%d %H:%M:%S%.3f").to_string()
}

fn module<'a>(record: &'a Record<'a>) -> &'a str {
    record.module_path().unwrap_or("?")
}

fn level_tag(level: Level) -> &'static str {
    match level {
        Level::Error => "E",
        Level::Warn => "W",
        Level::Info => "I",
        Level::Debug => "D",
        Level::Trace => "T",
    }
}

/// Expected log: I <timestamp> softmac-test: rx path up
#[test]
fn test_init_for_test() {
    init_for_test();
    log::info!("rx path up");
}
