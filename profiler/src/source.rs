//! Sample source adapters
//!
//! The sampling substrate itself is an external collaborator; this module
//! owns the boundary to it. A `SampleSource` wraps one recording session:
//! `open` starts it, `drain` destructively returns the samples that arrived
//! since the previous drain, and `close` ends the session and releases
//! whatever transient storage the session owned.
//!
//! Two adapters are provided. `SpoolSource` tails a newline-delimited JSON
//! spool file that the substrate appends to; the spool is a temp file created
//! at `open` and removed at `close`. `QueueSource` is an in-process feed for
//! hosts (and tests) that deliver samples directly through a `SampleSink`
//! handle.

use std::collections::VecDeque;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;
use tickscope_shared::RawSample;
use tracing::debug;

/// One recording session against the sampling substrate.
///
/// Draining is cursor-based: each call returns only samples not yet returned.
/// Samples that fail the caller's filters are still consumed from the feed so
/// nothing buffers without bound upstream.
pub trait SampleSource: Send {
    /// Start the recording session, allocating any transient storage.
    fn open(&mut self) -> io::Result<()>;

    /// Return all samples that became available since the last drain.
    fn drain(&mut self) -> io::Result<Vec<RawSample>>;

    /// End the session and remove its transient storage. Idempotent.
    fn close(&mut self) -> io::Result<()>;
}

/// Sample source backed by a temp spool file the substrate appends
/// newline-delimited JSON `RawSample` records to.
///
/// The spool is exclusively owned by this source for the lifetime of the
/// session and is deleted on `close`, including after errors. A partial
/// trailing line (a record still being written) is left in place and picked
/// up by the next drain. Malformed lines are consumed and skipped.
#[derive(Debug, Default)]
pub struct SpoolSource {
    spool: Option<NamedTempFile>,
    cursor: u64,
}

impl SpoolSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Path of the active spool file, to point the substrate at. `None` when
    /// the session is not open.
    pub fn path(&self) -> Option<&Path> {
        self.spool.as_ref().map(|f| f.path())
    }
}

impl SampleSource for SpoolSource {
    fn open(&mut self) -> io::Result<()> {
        if self.spool.is_some() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                "spool session already open",
            ));
        }
        let spool = tempfile::Builder::new()
            .prefix("tickscope-")
            .suffix(".spool")
            .tempfile()?;
        debug!("opened sample spool at {}", spool.path().display());
        self.cursor = 0;
        self.spool = Some(spool);
        Ok(())
    }

    fn drain(&mut self) -> io::Result<Vec<RawSample>> {
        let spool = match self.spool.as_mut() {
            Some(spool) => spool,
            None => {
                return Err(io::Error::new(
                    io::ErrorKind::NotConnected,
                    "spool session is not open",
                ))
            }
        };

        let file = spool.as_file_mut();
        file.seek(SeekFrom::Start(self.cursor))?;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf)?;

        // Only consume up to the last complete line; a record mid-write stays
        // for the next drain.
        let end = match buf.iter().rposition(|&b| b == b'\n') {
            Some(pos) => pos + 1,
            None => return Ok(Vec::new()),
        };
        self.cursor += end as u64;

        let mut samples = Vec::new();
        for line in buf[..end].split(|&b| b == b'\n') {
            if line.is_empty() {
                continue;
            }
            match serde_json::from_slice::<RawSample>(line) {
                Ok(sample) => samples.push(sample),
                Err(e) => debug!("skipping malformed spool record: {}", e),
            }
        }
        Ok(samples)
    }

    fn close(&mut self) -> io::Result<()> {
        self.cursor = 0;
        match self.spool.take() {
            Some(spool) => spool.close(),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Default)]
struct SharedQueue {
    samples: Mutex<VecDeque<RawSample>>,
}

/// Producer handle for a `QueueSource`.
///
/// This is the subscription side of the feed: the host keeps a clone for as
/// long as it wants to deliver samples and drops it to unsubscribe.
#[derive(Debug, Clone)]
pub struct SampleSink {
    queue: Arc<SharedQueue>,
}

impl SampleSink {
    /// Deliver one sample to the pending queue.
    pub fn push(&self, sample: RawSample) {
        self.queue.samples.lock().unwrap().push_back(sample);
    }

    /// Deliver a batch of samples.
    pub fn extend(&self, samples: impl IntoIterator<Item = RawSample>) {
        self.queue.samples.lock().unwrap().extend(samples);
    }

    /// Number of samples waiting to be drained.
    pub fn pending(&self) -> usize {
        self.queue.samples.lock().unwrap().len()
    }
}

/// In-process sample source fed through a `SampleSink`.
#[derive(Debug)]
pub struct QueueSource {
    queue: Arc<SharedQueue>,
}

impl QueueSource {
    /// Create a connected source/sink pair.
    pub fn channel() -> (Self, SampleSink) {
        let queue = Arc::new(SharedQueue::default());
        (
            Self {
                queue: queue.clone(),
            },
            SampleSink { queue },
        )
    }
}

impl SampleSource for QueueSource {
    fn open(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn drain(&mut self) -> io::Result<Vec<RawSample>> {
        let mut samples = self.queue.samples.lock().unwrap();
        Ok(samples.drain(..).collect())
    }

    fn close(&mut self) -> io::Result<()> {
        self.queue.samples.lock().unwrap().clear();
        Ok(())
    }
}
