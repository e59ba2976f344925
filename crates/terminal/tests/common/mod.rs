//! Shared fixtures for the terminal pool integration tests.

#![allow(dead_code)]

use std::path::PathBuf;

use terminal::test_support::FakeHost;
use terminal::{Host, HostEvent, ProcessSpawner, TerminalPool, TerminalSettings};

pub const WORK_DIR: &str = "/work";

pub fn settings() -> TerminalSettings {
    TerminalSettings {
        shell: "/bin/sh".to_string(),
        ..TerminalSettings::default()
    }
}

pub fn pool() -> TerminalPool {
    TerminalPool::new(settings(), PathBuf::from(WORK_DIR))
}

pub fn pool_with(configure: impl FnOnce(&mut TerminalSettings)) -> TerminalPool {
    let mut settings = settings();
    configure(&mut settings);
    TerminalPool::new(settings, PathBuf::from(WORK_DIR))
}

/// Deliver every pending host event to the pool, the way an event loop would
/// between commands.
pub fn pump_events<P: ProcessSpawner>(pool: &mut TerminalPool, host: &mut FakeHost<P>) {
    let mut events = host.take_events();
    events.extend(
        host.poll_exited()
            .into_iter()
            .map(|process| HostEvent::ProcessExited { process }),
    );
    for event in events {
        pool.handle_event(&mut *host, event)
            .expect("event handling should succeed");
    }
}

/// Ids (registry keys) of terminals whose window is currently visible.
pub fn visible_terminals(pool: &TerminalPool, host: &dyn Host) -> Vec<u32> {
    pool.registry()
        .all()
        .iter()
        .filter(|(_, terminal)| terminal.is_open(host))
        .map(|(key, _)| *key)
        .collect()
}
