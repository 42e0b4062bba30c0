//! Polling reader
//!
//! ```text
//! Unopened ──open──▶ Mapped ──poll/run──▶ Sampling × count ──close──▶ Closed
//!     └──────────── open failed ─────────────────────────────────────▶ Closed
//! ```
//!
//! `close` consumes the view, so nothing can sample a closed block. Any
//! early return drops the view, which releases the mapping.

use crate::config::ReaderConfig;
use crate::error::{Result, SensorError};
use crate::mmio::{Header, RegisterView};
use crate::sample::Sample;
use std::io::Write;
use std::iter::FusedIterator;
use std::path::Path;
use std::time::Duration;

/// Map the block at `identity` read-only
///
/// # Errors
///
/// See [`RegisterView::open`].
pub fn open(identity: impl AsRef<Path>) -> Result<RegisterView> {
    RegisterView::open(identity.as_ref())
}

/// Four independent field loads; never fails and never checks the header
pub fn sample(view: &RegisterView) -> Sample {
    Sample::from_fields(|field| view.field(field))
}

/// Check the header before sampling
///
/// # Errors
///
/// Returns [`SensorError::ProtocolMismatch`] if the magic is wrong or the
/// status is zero.
pub fn validate_header(view: &RegisterView) -> Result<Header> {
    let header = view.header();
    if !header.is_valid() {
        return Err(SensorError::ProtocolMismatch {
            magic: header.magic,
            status: header.status,
        });
    }
    tracing::debug!("{}: header ok, version {}", view.path().display(), header.version);
    Ok(header)
}

/// Lazy sequence of `count` samples, each followed by a pause of `interval`
pub fn poll(view: &RegisterView, interval: Duration, count: usize) -> Samples<'_> {
    Samples {
        view,
        interval,
        remaining: count,
        pause_pending: false,
    }
}

/// Sample `count` times, writing one rendered line per sample to `out`
///
/// Returns the number of samples written.
///
/// # Errors
///
/// Returns an I/O error if writing to `out` fails.
pub fn run<W: Write>(
    view: &RegisterView,
    interval: Duration,
    count: usize,
    out: &mut W,
) -> Result<usize> {
    let mut emitted = 0;
    for s in poll(view, interval, count) {
        let line = format!("{s}\n");
        out.write_all(line.as_bytes())?;
        out.flush()?;
        emitted += 1;
    }
    Ok(emitted)
}

/// Release the mapping
///
/// # Errors
///
/// See [`RegisterView::close`].
pub fn close(view: RegisterView) -> Result<()> {
    view.close()
}

/// Full reader session: open, optionally validate, run, close
///
/// # Errors
///
/// Returns the first open, validation or output error. The mapping is
/// released on every path.
pub fn run_session<W: Write>(config: &ReaderConfig, out: &mut W) -> Result<usize> {
    let view = open(config.path())?;

    if config.check_header {
        validate_header(&view)?;
    }

    let emitted = run(&view, config.interval, config.count, out)?;
    close(view)?;
    Ok(emitted)
}

/// Iterator returned by [`poll`]
///
/// Each pause happens before the next sample is taken, or before the end of
/// the sequence is reported. Once exhausted it returns `None` forever without
/// touching the block.
#[derive(Debug)]
pub struct Samples<'a> {
    view: &'a RegisterView,
    interval: Duration,
    remaining: usize,
    pause_pending: bool,
}

impl Samples<'_> {
    /// Samples still to be taken
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.remaining
    }

    fn pause(&mut self) {
        if std::mem::take(&mut self.pause_pending) && !self.interval.is_zero() {
            std::thread::sleep(self.interval);
        }
    }
}

impl Iterator for Samples<'_> {
    type Item = Sample;

    fn next(&mut self) -> Option<Sample> {
        self.pause();
        if self.remaining == 0 {
            return None;
        }

        let s = sample(self.view);
        self.remaining -= 1;
        self.pause_pending = true;
        Some(s)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Samples<'_> {}

impl FusedIterator for Samples<'_> {}
