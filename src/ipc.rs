//! One-way sample channel between the touch poller and the render loop.
//!
//! Single producer, single consumer, no acknowledgment and no backpressure.
//! The producer never blocks on send; the consumer drains everything queued
//! once per frame and keeps only the newest sample. Stale samples are dropped
//! on purpose: a slow frame must never make the display replay old latencies.
//!
//! Two transports share the [`SampleSink`] seam:
//! - [`channel`]: in-process queue for the poller thread (the default).
//! - [`FrameWriter`] / [`FrameReader`]: fixed-size frames over any byte stream
//!   (pipe, socket) when the poller runs as a separate process.

use crate::error::{Error, Result};
use crate::sample::{TouchSample, FRAME_LEN};
use std::io::{self, Read, Write};
use std::sync::mpsc;

/// Destination for emitted samples.
pub trait SampleSink: Send {
    /// Hand one sample to the consumer. Must not block.
    ///
    /// Returns [`Error::ChannelClosed`] once the consumer is gone.
    fn send(&mut self, sample: TouchSample) -> Result<()>;
}

/// Collects samples in memory. Mostly useful in tests and tooling.
impl SampleSink for Vec<TouchSample> {
    fn send(&mut self, sample: TouchSample) -> Result<()> {
        self.push(sample);
        Ok(())
    }
}

/// Producer half of [`channel`].
pub struct SampleSender {
    tx: mpsc::Sender<TouchSample>,
}

/// Consumer half of [`channel`].
pub struct SampleReceiver {
    rx: mpsc::Receiver<TouchSample>,
    connected: bool,
}

/// Create an unbounded in-process sample channel.
pub fn channel() -> (SampleSender, SampleReceiver) {
    let (tx, rx) = mpsc::channel();
    (SampleSender { tx }, SampleReceiver { rx, connected: true })
}

impl SampleSink for SampleSender {
    fn send(&mut self, sample: TouchSample) -> Result<()> {
        self.tx.send(sample).map_err(|_| Error::ChannelClosed)
    }
}

impl SampleReceiver {
    /// Empty the queue without blocking and return the newest sample, if any.
    pub fn drain_latest(&mut self) -> Option<TouchSample> {
        let mut latest = None;
        loop {
            match self.rx.try_recv() {
                Ok(sample) => latest = Some(sample),
                Err(mpsc::TryRecvError::Empty) => break,
                Err(mpsc::TryRecvError::Disconnected) => {
                    self.connected = false;
                    break;
                }
            }
        }
        latest
    }

    /// Like [`drain_latest`](Self::drain_latest) but substitutes `fallback` when nothing was queued.
    pub fn latest_or(&mut self, fallback: TouchSample) -> TouchSample {
        self.drain_latest().unwrap_or(fallback)
    }

    /// `false` once the producer has hung up and the queue has been drained.
    pub fn is_connected(&self) -> bool {
        self.connected
    }
}

/// Writes samples as wire frames to a byte stream.
pub struct FrameWriter<W> {
    inner: W,
}

impl<W: Write> FrameWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write + Send> SampleSink for FrameWriter<W> {
    fn send(&mut self, sample: TouchSample) -> Result<()> {
        match self.inner.write_all(&sample.encode()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Err(Error::ChannelClosed),
            Err(e) => Err(e.into()),
        }
    }
}

/// Reads wire frames from a byte stream, keeping only the newest complete one.
///
/// Intended for a non-blocking reader: `WouldBlock` ends a drain. Partial
/// frames are carried over to the next drain.
pub struct FrameReader<R> {
    inner: R,
    pending: Vec<u8>,
    eof: bool,
}

impl<R: Read> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            pending: Vec::with_capacity(FRAME_LEN * 8),
            eof: false,
        }
    }

    /// Read everything available and return the newest complete sample.
    pub fn drain_latest(&mut self) -> Result<Option<TouchSample>> {
        let mut chunk = [0u8; FRAME_LEN * 32];
        while !self.eof {
            match self.inner.read(&mut chunk) {
                Ok(0) => self.eof = true,
                Ok(n) => self.pending.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        let whole = self.pending.len() / FRAME_LEN;
        if whole == 0 {
            return Ok(None);
        }
        // Consume the frames before decoding so a corrupt one is dropped, not retried.
        let frames: Vec<u8> = self.pending.drain(..whole * FRAME_LEN).collect();
        let latest = TouchSample::decode(&frames[(whole - 1) * FRAME_LEN..])?;
        Ok(Some(latest))
    }

    /// `true` once the writer closed the stream.
    pub fn is_eof(&self) -> bool {
        self.eof
    }
}
