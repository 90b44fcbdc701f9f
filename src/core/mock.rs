//! Simulated Minitel for tests
//!
//! `MockDevice` implements [`Transport`] in memory. Bytes written by the
//! engine are recorded and matched against scripted rules; a matching rule
//! queues its reply on the inbound side, optionally only at a given speed.
//! Tests can also inject inbound bytes with a delay to exercise framing
//! timeouts.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use super::capability::DEFAULT_SPEED;
use super::transport::{Result, Transport};

struct Rule {
    command: Vec<u8>,
    baud: Option<u32>,
    reply: Vec<u8>,
}

struct State {
    inbound: VecDeque<(Instant, u8)>,
    written: Vec<u8>,
    pending: Vec<u8>,
    baud: u32,
    bauds: Vec<u32>,
    rules: Vec<Rule>,
    matched: Vec<Vec<u8>>,
}

struct Shared {
    state: Mutex<State>,
    ready: Condvar,
}

#[derive(Clone)]
pub struct MockDevice {
    shared: Arc<Shared>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    inbound: VecDeque::new(),
                    written: Vec::new(),
                    pending: Vec::new(),
                    baud: DEFAULT_SPEED,
                    bauds: Vec::new(),
                    rules: Vec::new(),
                    matched: Vec::new(),
                }),
                ready: Condvar::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.shared.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reply with `reply` whenever `command` has been written, at any speed
    pub fn on(&self, command: &[u8], reply: &[u8]) -> &Self {
        self.push_rule(command, None, reply)
    }

    /// Reply only while the link runs at `baud`
    pub fn on_at(&self, baud: u32, command: &[u8], reply: &[u8]) -> &Self {
        self.push_rule(command, Some(baud), reply)
    }

    fn push_rule(&self, command: &[u8], baud: Option<u32>, reply: &[u8]) -> &Self {
        self.state().rules.push(Rule {
            command: command.to_vec(),
            baud,
            reply: reply.to_vec(),
        });
        self
    }

    /// Make `bytes` readable after `delay`, each byte one millisecond apart
    pub fn inject(&self, bytes: &[u8], delay: Duration) {
        let mut state = self.state();
        let start = Instant::now() + delay;
        for (i, &b) in bytes.iter().enumerate() {
            state
                .inbound
                .push_back((start + Duration::from_millis(i as u64), b));
        }
        self.shared.ready.notify_all();
    }

    pub fn written(&self) -> Vec<u8> {
        self.state().written.clone()
    }

    /// Commands that triggered a scripted reply, in order
    pub fn matched(&self) -> Vec<Vec<u8>> {
        self.state().matched.clone()
    }

    pub fn current_baud(&self) -> u32 {
        self.state().baud
    }

    /// Every speed the link was switched to, in order
    pub fn baud_history(&self) -> Vec<u32> {
        self.state().bauds.clone()
    }

    pub fn boxed(&self) -> Box<dyn Transport> {
        Box::new(self.clone())
    }
}

impl Transport for MockDevice {
    fn read_byte(&mut self, timeout: Duration) -> Result<Option<u8>> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state();

        loop {
            let now = Instant::now();
            let wake = match state.inbound.front() {
                Some(&(at, byte)) if at <= now => {
                    state.inbound.pop_front();
                    return Ok(Some(byte));
                }
                Some(&(at, _)) => at.min(deadline),
                None => deadline,
            };

            if now >= deadline {
                return Ok(None);
            }

            state = self
                .shared
                .ready
                .wait_timeout(state, wake.saturating_duration_since(now))
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    fn write_and_flush(&mut self, byte: u8) -> Result<()> {
        let mut state = self.state();
        state.written.push(byte);
        state.pending.push(byte);

        let baud = state.baud;
        let hit = state.rules.iter().position(|rule| {
            state.pending.ends_with(&rule.command) && rule.baud.map_or(true, |b| b == baud)
        });

        if let Some(index) = hit {
            let now = Instant::now();
            let reply = state.rules[index].reply.clone();
            let command = state.rules[index].command.clone();
            for b in reply {
                state.inbound.push_back((now, b));
            }
            state.matched.push(command);
            state.pending.clear();
            self.shared.ready.notify_all();
        }
        Ok(())
    }

    fn set_baud_rate(&mut self, bps: u32) -> Result<()> {
        let mut state = self.state();
        state.baud = bps;
        state.bauds.push(bps);
        // Anything half-written at the old speed is garbage to the device
        state.pending.clear();
        Ok(())
    }

    fn try_clone(&self) -> Result<Box<dyn Transport>> {
        Ok(self.boxed())
    }
}
