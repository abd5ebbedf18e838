//! # Session Worker
//!
//! All dump access happens on one background thread that owns the
//! [`HeapSnapshot`] and the [`Navigator`]. Callers talk to it through a pair
//! of channels:
//!
//! ```text
//!  caller thread                         worker thread
//!  ─────────────                         ─────────────
//!  SessionHandle::submit ── Command ──▶  open + index (once)
//!                                        serve requests in order
//!  drain_replies / recv  ◀── Reply ───   one reply per request
//!  close ── Command::Close ──▶           finish queue, unmap, exit
//!        ◀─ join ─────────────────────
//! ```
//!
//! Requests are served strictly in submission order. `Close` is queued like
//! any other command, so an in-flight decode always finishes before the
//! mapping is released.

use std::path::PathBuf;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, error, info};

use crate::domain::{HeapError, Result};
use crate::graph::{HeapSnapshot, SnapshotSummary};
use crate::navigation::{Navigator, View};

/// Work the worker can be asked to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Search(String),
    Select(usize),
    Back,
    /// Re-send the current view
    Refresh,
}

#[derive(Debug)]
pub enum Reply {
    /// The dump is open and indexed
    Ready(SnapshotSummary),
    View(View),
    /// Fatal; the worker has stopped
    Failed(HeapError),
}

enum Command {
    Request(Request),
    Close,
}

/// Caller-side end of a session
pub struct SessionHandle {
    commands: Sender<Command>,
    replies: Receiver<Reply>,
    worker: Option<JoinHandle<()>>,
}

/// Start a worker thread that opens `path`
///
/// The first reply is `Ready` or `Failed`.
///
/// # Errors
/// Returns `Io` if the thread cannot be spawned
pub fn spawn(path: impl Into<PathBuf>) -> Result<SessionHandle> {
    let path = path.into();
    let (command_tx, command_rx) = unbounded();
    let (reply_tx, reply_rx) = unbounded();

    let worker = thread::Builder::new()
        .name("heapscope-session".to_string())
        .spawn(move || run_worker(&path, &command_rx, &reply_tx))?;

    Ok(SessionHandle { commands: command_tx, replies: reply_rx, worker: Some(worker) })
}

impl SessionHandle {
    /// Queue a request without waiting for its reply
    ///
    /// # Errors
    /// `SessionClosed` if the session was closed or the worker has stopped
    pub fn submit(&self, request: Request) -> Result<()> {
        if self.worker.is_none() {
            return Err(HeapError::SessionClosed);
        }
        self.commands.send(Command::Request(request)).map_err(|_| HeapError::SessionClosed)
    }

    /// Block until the next reply
    ///
    /// # Errors
    /// `SessionClosed` if the worker is gone and no reply is pending
    pub fn recv(&self) -> Result<Reply> {
        self.replies.recv().map_err(|_| HeapError::SessionClosed)
    }

    /// Wait for the dump to be opened
    ///
    /// # Errors
    /// The fatal error that stopped the worker
    pub fn wait_ready(&self) -> Result<SnapshotSummary> {
        match self.recv()? {
            Reply::Ready(summary) => Ok(summary),
            Reply::Failed(err) => Err(err),
            Reply::View(_) => Err(HeapError::SessionClosed),
        }
    }

    /// Submit `request` and block for its view
    ///
    /// Only use on a handle whose earlier replies have all been consumed.
    ///
    /// # Errors
    /// The fatal error that stopped the worker, or `SessionClosed`
    pub fn request(&self, request: Request) -> Result<View> {
        self.submit(request)?;
        match self.recv()? {
            Reply::View(view) => Ok(view),
            Reply::Failed(err) => Err(err),
            Reply::Ready(_) => Err(HeapError::SessionClosed),
        }
    }

    /// Hand every reply already delivered to `on_reply`, on the calling
    /// thread, without blocking
    pub fn drain_replies(&self, mut on_reply: impl FnMut(Reply)) {
        while let Ok(reply) = self.replies.try_recv() {
            on_reply(reply);
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.worker.is_none()
    }

    /// Finish queued requests, release the dump and join the worker
    ///
    /// Calling it again does nothing.
    pub fn close(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        // The worker may already be gone after a fatal error.
        let _ = self.commands.send(Command::Close);
        if worker.join().is_err() {
            error!("Session worker panicked");
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.close();
    }
}

fn run_worker(path: &std::path::Path, commands: &Receiver<Command>, replies: &Sender<Reply>) {
    let mut snapshot = match HeapSnapshot::open(path) {
        Ok(snapshot) => snapshot,
        Err(err) => {
            error!("Cannot open {}: {err}", path.display());
            let _ = replies.send(Reply::Failed(err));
            return;
        }
    };
    if replies.send(Reply::Ready(snapshot.summary())).is_err() {
        snapshot.close();
        return;
    }

    let mut navigator = Navigator::new();
    for command in commands {
        let request = match command {
            Command::Request(request) => request,
            Command::Close => break,
        };
        debug!("Serving {request:?}");

        let outcome = match request {
            Request::Search(query) => navigator.search(&snapshot, &query).map(|_| ()),
            Request::Select(row) => navigator.select(&snapshot, row).map(|_| ()),
            Request::Back => {
                navigator.back();
                Ok(())
            }
            Request::Refresh => Ok(()),
        };

        let reply = match outcome {
            Ok(()) => Reply::View(navigator.view()),
            Err(err) => {
                error!("Session failed: {err}");
                let _ = replies.send(Reply::Failed(err));
                break;
            }
        };
        if replies.send(reply).is_err() {
            break;
        }
    }

    snapshot.close();
    info!("Closed {}", path.display());
}
