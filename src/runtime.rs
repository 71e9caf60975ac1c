use std::cell::Cell;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event as CtEvent, KeyEvent};

#[derive(Clone, Debug)]
pub enum FolioEvent {
    Key(KeyEvent),
    Resize,
    /// Nothing arrived within one tick interval
    Tick,
    /// An image (or other tracked resource) settled; `ok` is false on error
    ResourceLoaded { ok: bool },
}

/// Anything the page loop can wait on
pub trait FolioEventSource: Send + 'static {
    fn recv_timeout(&self, timeout: Duration) -> Result<FolioEvent, RecvTimeoutError>;
}

/// Events fed through an mpsc channel. Tests push scripted events into the
/// sending half; the terminal source wraps one of these.
pub struct ChannelEventSource {
    rx: Receiver<FolioEvent>,
}

impl ChannelEventSource {
    pub fn new(rx: Receiver<FolioEvent>) -> Self {
        Self { rx }
    }
}

impl FolioEventSource for ChannelEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<FolioEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Terminal input plus any producer holding a [`sender`](Self::sender),
/// such as the resource loader, merged into one queue.
pub struct CrosstermEventSource {
    tx: Sender<FolioEvent>,
    inner: ChannelEventSource,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        let input = tx.clone();

        std::thread::spawn(move || {
            while let Ok(ev) = event::read() {
                let forwarded = match ev {
                    CtEvent::Key(key) => FolioEvent::Key(key),
                    CtEvent::Resize(..) => FolioEvent::Resize,
                    _ => continue,
                };
                if input.send(forwarded).is_err() {
                    // page loop is gone
                    break;
                }
            }
        });

        Self {
            tx,
            inner: ChannelEventSource::new(rx),
        }
    }

    pub fn sender(&self) -> Sender<FolioEvent> {
        self.tx.clone()
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl FolioEventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<FolioEvent, RecvTimeoutError> {
        self.inner.recv_timeout(timeout)
    }
}

/// How long the loop waits for input before redrawing
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

pub struct Runner<E: FolioEventSource, T: Ticker> {
    source: E,
    ticker: T,
}

impl<E: FolioEventSource, T: Ticker> Runner<E, T> {
    pub fn new(source: E, ticker: T) -> Self {
        Self { source, ticker }
    }

    /// Next queued event, or `Tick` once the interval passes quietly. A
    /// closed queue also ticks so timers keep firing.
    pub fn step(&self) -> FolioEvent {
        self.source
            .recv_timeout(self.ticker.interval())
            .unwrap_or(FolioEvent::Tick)
    }
}

/// Page time: how long since page setup
pub trait Clock {
    fn now(&self) -> Duration;
}

#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn start() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Virtual clock for tests; only moves when told to
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) -> Duration {
        self.now.set(self.now.get() + by);
        self.now.get()
    }

    pub fn set(&self, to: Duration) {
        self.now.set(to);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}
