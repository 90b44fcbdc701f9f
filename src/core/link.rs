//! Minitel link engine
//!
//! [`Minitel`] owns the transport and runs two pumps on dedicated threads:
//!
//! - the reader pump copies every byte received from the terminal into the
//!   inbound channel;
//! - the writer pump transmits the outbound channel byte by byte, flushing
//!   after each one.
//!
//! Callers never touch the transport directly. They `send` sequences, pull
//! bytes or whole frames with `receive`/`receive_sequence`, and run
//! command/response exchanges with `call`.
//!
//! # Single caller
//!
//! `call` discards pending input before sending its command. Two transactions
//! issued concurrently will steal each other's replies, so protocol
//! operations must be driven from one place at a time. The engine does not
//! lock against this.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::capability::{Capabilities, Mode, DEFAULT_SPEED};
use super::charset::CharacterSet;
use super::constants::{CSI, CSI_EXTENDED, ESC, SEP, SS2};
use super::sequence::{Item, Sequence};
use super::transport::{SerialTransport, Transport, TransportError, DEFAULT_TIMEOUT};

/// Wait after ESC before deciding it was the Escape key alone
pub const ESCAPE_WAIT: Duration = Duration::from_millis(100);

/// Per-byte wait while collecting a reply in `call`
pub const REPLY_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Error, Debug)]
pub enum MinitelError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Connection error: {0}")]
    Connection(#[from] TransportError),

    #[error("No data received")]
    Empty,

    #[error("Link is closed")]
    Disconnected,

    #[error("Failed to start pump thread: {0}")]
    Thread(#[source] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MinitelError>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Bytes handed to the writer pump and not yet flushed
#[derive(Default)]
struct Pending {
    count: Mutex<usize>,
    drained: Condvar,
}

impl Pending {
    fn add(&self, n: usize) {
        *lock(&self.count) += n;
    }

    fn done(&self) {
        let mut count = lock(&self.count);
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.drained.notify_all();
        }
    }

    fn wait_drained(&self) {
        let mut count = lock(&self.count);
        while *count > 0 {
            count = self
                .drained
                .wait(count)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

/// A connected Minitel
pub struct Minitel {
    /// Control handle, used for speed changes
    transport: Mutex<Box<dyn Transport>>,
    /// Bytes waiting for the writer pump
    outbound: Option<Sender<u8>>,
    /// Bytes received by the reader pump
    inbound: Mutex<Receiver<u8>>,
    pending: Arc<Pending>,
    /// Set once on shutdown
    stop: Arc<AtomicBool>,
    reader_thread: Option<JoinHandle<()>>,
    writer_thread: Option<JoinHandle<()>>,
    pub(super) mode: Mode,
    pub(super) speed: u32,
    pub(super) capabilities: Capabilities,
}

impl Minitel {
    /// Open the Minitel plugged on `device` at its power-on settings
    ///
    /// The terminal is assumed to be in Videotex mode at 1200 bps until
    /// [`detect_speed`](Self::detect_speed) and [`identify`](Self::identify)
    /// say otherwise.
    pub fn open(device: &str) -> Result<Self> {
        let transport = SerialTransport::open(device)?;
        info!("Minitel link opened on {}", device);
        Self::with_transport(Box::new(transport))
    }

    /// Start the engine on an already opened transport
    pub fn with_transport(transport: Box<dyn Transport>) -> Result<Self> {
        let reader = transport.try_clone()?;
        let writer = transport.try_clone()?;

        let stop = Arc::new(AtomicBool::new(false));
        let pending = Arc::new(Pending::default());
        let (in_tx, in_rx) = mpsc::channel::<u8>();
        let (out_tx, out_rx) = mpsc::channel::<u8>();

        let reader_stop = stop.clone();
        let reader_thread = thread::Builder::new()
            .name("minitel-reader".to_string())
            .spawn(move || reader_pump(reader, in_tx, reader_stop))
            .map_err(MinitelError::Thread)?;

        let writer_stop = stop.clone();
        let writer_pending = pending.clone();
        let writer_thread = match thread::Builder::new()
            .name("minitel-writer".to_string())
            .spawn(move || writer_pump(writer, out_rx, writer_stop, writer_pending))
        {
            Ok(handle) => handle,
            Err(e) => {
                stop_pump(&stop, reader_thread, "Reader");
                return Err(MinitelError::Thread(e));
            }
        };

        Ok(Self {
            transport: Mutex::new(transport),
            outbound: Some(out_tx),
            inbound: Mutex::new(in_rx),
            pending,
            stop,
            reader_thread: Some(reader_thread),
            writer_thread: Some(writer_thread),
            mode: Mode::Videotex,
            speed: DEFAULT_SPEED,
            capabilities: Capabilities::basic(),
        })
    }

    /// Current display mode
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Current link speed in bps
    pub fn speed(&self) -> u32 {
        self.speed
    }

    /// Capabilities found by the last [`identify`](Self::identify)
    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Character set matching the current mode
    pub fn charset(&self) -> CharacterSet {
        self.mode.into()
    }

    /// Queue `content` for transmission
    ///
    /// Returns as soon as the bytes are queued. Bytes of one call are sent
    /// contiguously and in order; concurrent senders interleave.
    pub fn send(&self, content: impl Into<Item>) -> Result<()> {
        let seq = Sequence::from_item(content, self.charset());
        let outbound = self.outbound.as_ref().ok_or(MinitelError::Disconnected)?;

        self.pending.add(seq.len());
        for (i, &byte) in seq.iter().enumerate() {
            if outbound.send(byte).is_err() {
                for _ in i..seq.len() {
                    self.pending.done();
                }
                return Err(MinitelError::Disconnected);
            }
        }
        Ok(())
    }

    /// Take one received byte
    ///
    /// Without `block` this returns immediately. With `block` it waits for
    /// `timeout`, or forever when `timeout` is `None`. Nothing received is
    /// reported as [`MinitelError::Empty`].
    pub fn receive(&self, block: bool, timeout: Option<Duration>) -> Result<u8> {
        let inbound = lock(&self.inbound);

        if !block {
            return inbound.try_recv().map_err(|e| match e {
                TryRecvError::Empty => MinitelError::Empty,
                TryRecvError::Disconnected => MinitelError::Disconnected,
            });
        }

        match timeout {
            Some(timeout) => inbound.recv_timeout(timeout).map_err(|e| match e {
                RecvTimeoutError::Timeout => MinitelError::Empty,
                RecvTimeoutError::Disconnected => MinitelError::Disconnected,
            }),
            None => inbound.recv().map_err(|_| MinitelError::Disconnected),
        }
    }

    /// Read one complete frame sent by the Minitel
    ///
    /// The length of a frame depends on its first byte:
    ///
    /// | First bytes          | Length |
    /// |----------------------|--------|
    /// | `SS2 x`, `SEP x`     | 2      |
    /// | `ESC` then silence   | 1      |
    /// | `ESC x` (x != `[`)   | 2      |
    /// | `ESC [ x`            | 3      |
    /// | `ESC [ 2 x`, `ESC [ 4 x` | 4  |
    /// | anything else        | 1      |
    ///
    /// An empty sequence means nothing arrived.
    pub fn receive_sequence(&self, block: bool, timeout: Option<Duration>) -> Sequence {
        let mut seq = Sequence::new();

        let first = match self.receive(block, timeout) {
            Ok(byte) => byte,
            Err(_) => return seq,
        };
        seq.push(first);

        match first {
            SS2 | SEP => {
                if let Ok(byte) = self.receive(true, None) {
                    seq.push(byte);
                }
            }
            ESC => {
                // The Escape key sends ESC alone
                let Ok(second) = self.receive(true, Some(ESCAPE_WAIT)) else {
                    return seq;
                };
                seq.push(second);

                if seq.equals(CSI) {
                    if let Ok(third) = self.receive(true, None) {
                        seq.push(third);
                        if CSI_EXTENDED.contains(&third) {
                            if let Ok(fourth) = self.receive(true, None) {
                                seq.push(fourth);
                            }
                        }
                    }
                }
            }
            _ => {}
        }

        seq
    }

    /// Send a command and collect up to `expected` reply bytes
    ///
    /// Stale input is discarded first, and collection starts only once the
    /// command has been fully transmitted. Each reply byte is awaited for one
    /// second; the first miss ends the collection, so the result may be
    /// shorter than `expected`.
    pub fn call(&self, content: impl Into<Item>, expected: usize) -> Result<Sequence> {
        self.discard_input();
        self.send(content)?;
        self.pending.wait_drained();

        let mut reply = Sequence::new();
        for _ in 0..expected {
            match self.receive(true, Some(REPLY_TIMEOUT)) {
                Ok(byte) => {
                    reply.push(byte);
                }
                Err(MinitelError::Empty) => break,
                Err(e) => return Err(e),
            }
        }

        debug!("call: expected {} bytes, got {:?}", expected, reply);
        Ok(reply)
    }

    fn discard_input(&self) {
        let inbound = lock(&self.inbound);
        let mut dropped = 0usize;
        while inbound.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            debug!("Discarded {} stale input bytes", dropped);
        }
    }

    /// Reconfigure the serial link speed
    pub(super) fn set_link_speed(&mut self, bps: u32) -> Result<()> {
        let transport = self
            .transport
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        transport.set_baud_rate(bps)?;
        Ok(())
    }

    /// Stop the pumps and release the link
    ///
    /// Everything already sent is transmitted before this returns. Takes
    /// about one second, the pumps' poll interval.
    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if self.reader_thread.is_none() && self.writer_thread.is_none() {
            return;
        }

        self.stop.store(true, Ordering::SeqCst);
        // The writer drains what is left, then sees the channel disconnect
        drop(self.outbound.take());

        if let Some(handle) = self.writer_thread.take() {
            join_pump(handle, "Writer");
        }
        if let Some(handle) = self.reader_thread.take() {
            join_pump(handle, "Reader");
        }

        info!("Minitel link closed");
    }
}

impl Drop for Minitel {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn join_pump(handle: JoinHandle<()>, name: &str) {
    if handle.join().is_err() {
        error!("{} pump panicked", name);
    }
}

/// Raise the stop flag and wait for a pump to notice it
fn stop_pump(stop: &AtomicBool, handle: JoinHandle<()>, name: &str) {
    stop.store(true, Ordering::SeqCst);
    join_pump(handle, name);
}

fn reader_pump(mut transport: Box<dyn Transport>, inbound: Sender<u8>, stop: Arc<AtomicBool>) {
    debug!("Reader pump started");

    while !stop.load(Ordering::SeqCst) {
        match transport.read_byte(DEFAULT_TIMEOUT) {
            Ok(Some(byte)) => {
                if inbound.send(byte).is_err() {
                    break;
                }
            }
            Ok(None) => {}
            Err(e) => {
                error!("Reader pump stopping: {}", e);
                break;
            }
        }
    }

    debug!("Reader pump stopped");
}

fn writer_pump(
    mut transport: Box<dyn Transport>,
    outbound: Receiver<u8>,
    stop: Arc<AtomicBool>,
    pending: Arc<Pending>,
) {
    debug!("Writer pump started");

    loop {
        match outbound.recv_timeout(DEFAULT_TIMEOUT) {
            Ok(byte) => {
                if let Err(e) = transport.write_and_flush(byte) {
                    warn!("Dropped byte {:#04x}: {}", byte, e);
                }
                pending.done();
            }
            Err(RecvTimeoutError::Timeout) => {
                if stop.load(Ordering::SeqCst) {
                    break;
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    debug!("Writer pump stopped");
}
