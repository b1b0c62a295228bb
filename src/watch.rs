//! Watch for USB devices being connected and disconnected by polling a [`PresenceSource`].
//!
//! The [`Coordinator`] runs on its own thread and only sends [`UiEvent::Refresh`] over a channel when the set of attached devices changes. The UI thread calls [`dispatch`] which runs the refresh callback for each event, so callbacks are serialised and never run on the polling thread.
//!
//! ```no_run
//! use std::sync::mpsc;
//! use usbwatch::{parser, presence::Prober, watch};
//!
//! let (tx, rx) = mpsc::channel();
//! let mut coordinator = watch::Coordinator::new(Prober::new(), tx);
//! coordinator.start().unwrap();
//!
//! watch::dispatch(&rx, || {
//!     let records = parser::parse_all();
//!     println!("{} devices", records.len());
//! });
//! ```
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::error::{Error, ErrorKind, Result};
use crate::presence::{PresenceSnapshot, PresenceSource};

/// Default time between presence probes
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(2);

/// Events handled on the UI thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiEvent {
    /// Device set changed; re-read records and redraw
    Refresh,
    /// Stop dispatching
    Quit,
}

/// [`Coordinator`] lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    /// Created, not yet polled
    Idle,
    /// Polling thread running
    Polling,
    /// Stop requested; cannot be restarted
    Stopped,
}

/// Polls a [`PresenceSource`] on a background thread and requests a refresh when the device set changes
pub struct Coordinator<S> {
    source: Option<S>,
    sender: Sender<UiEvent>,
    interval: Duration,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    state: CoordinatorState,
}

impl<S> Coordinator<S>
where
    S: PresenceSource + Send + 'static,
{
    /// New idle [`Coordinator`] sending to `sender` at [`DEFAULT_INTERVAL`]
    pub fn new(source: S, sender: Sender<UiEvent>) -> Self {
        Self {
            source: Some(source),
            sender,
            interval: DEFAULT_INTERVAL,
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
            state: CoordinatorState::Idle,
        }
    }

    /// Poll every `interval` rather than [`DEFAULT_INTERVAL`]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Current [`CoordinatorState`]
    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    /// Time between probes
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Spawn the polling thread. Only valid from [`CoordinatorState::Idle`]
    pub fn start(&mut self) -> Result<()> {
        let source = match (self.state, self.source.take()) {
            (CoordinatorState::Idle, Some(source)) => source,
            (state, _) => {
                return Err(Error::new(
                    ErrorKind::InvalidArg,
                    &format!("Coordinator cannot be started when {:?}", state),
                ))
            }
        };

        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);
        let sender = self.sender.clone();
        let interval = self.interval;

        let handle = thread::Builder::new()
            .name("usbwatch-poll".into())
            .spawn(move || poll_loop(source, sender, interval, running))?;

        self.handle = Some(handle);
        self.state = CoordinatorState::Polling;
        log::debug!("Polling for USB changes every {:?}", self.interval);
        Ok(())
    }

    /// Ask the polling thread to exit; it does so after its current sleep
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.state = CoordinatorState::Stopped;
    }

    /// Stop and wait for the polling thread to exit
    pub fn join(mut self) -> Result<()> {
        self.stop();
        match self.handle.take() {
            Some(h) => h
                .join()
                .map_err(|_| Error::new(ErrorKind::Other("thread"), "Polling thread panicked")),
            None => Ok(()),
        }
    }
}

impl<S> Drop for Coordinator<S> {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

fn poll_loop<S: PresenceSource>(
    source: S,
    sender: Sender<UiEvent>,
    interval: Duration,
    running: Arc<AtomicBool>,
) {
    let mut last = PresenceSnapshot::new();

    while running.load(Ordering::SeqCst) {
        let current = source.probe();
        if current != last {
            log::info!("USB devices changed: {} attached", current.len());
            last = current;
            if sender.send(UiEvent::Refresh).is_err() {
                log::debug!("UI receiver gone, stopping poll");
                break;
            }
        }
        thread::sleep(interval);
    }

    log::debug!("Polling thread exit");
}

/// Run `callback` on the calling thread for each [`UiEvent::Refresh`], in order, until [`UiEvent::Quit`] or all senders are dropped
///
/// Returns the number of callbacks run
pub fn dispatch<F>(receiver: &Receiver<UiEvent>, mut callback: F) -> usize
where
    F: FnMut(),
{
    let mut count = 0;
    while let Ok(event) = receiver.recv() {
        match event {
            UiEvent::Refresh => {
                callback();
                count += 1;
            }
            UiEvent::Quit => break,
        }
    }
    count
}
