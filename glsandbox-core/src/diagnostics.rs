//! Diagnostics reporting.
//!
//! Components never talk to a global logger directly. They receive a
//! [`Diagnostics`] handle when they are constructed (usually through the
//! [`GpuContext`](crate::gfx::GpuContext)) and report lifecycle events and
//! errors through it. The default sink, [`LogSink`], forwards into the `log`
//! facade; [`MemorySink`] keeps messages in memory so tests can inspect them.

use std::{cell::RefCell, fmt, panic::Location, rc::Rc};

use log::Level;

/// A destination for leveled diagnostic messages.
pub trait DiagnosticSink {
    /// Records a message emitted at `location`.
    fn emit(&self, level: Level, location: &'static Location<'static>, message: fmt::Arguments<'_>);
}

/// Forwards diagnostics to whatever logger is installed behind the `log` facade.
pub struct LogSink {
    target: &'static str,
}

impl LogSink {
    /// Creates a sink that logs under the given target.
    pub fn new(target: &'static str) -> Self {
        Self { target }
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self::new("glsandbox")
    }
}

impl DiagnosticSink for LogSink {
    fn emit(
        &self,
        level: Level,
        location: &'static Location<'static>,
        message: fmt::Arguments<'_>,
    ) {
        if level > log::max_level() {
            return;
        }

        log::logger().log(
            &log::Record::builder()
                .args(message)
                .level(level)
                .target(self.target)
                .file_static(Some(location.file()))
                .line(Some(location.line()))
                .build(),
        );
    }
}

/// A single message captured by a [`MemorySink`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    pub level: Level,
    pub file: &'static str,
    pub line: u32,
    pub message: String,
}

/// Keeps every message in memory.
#[derive(Default)]
pub struct MemorySink {
    entries: RefCell<Vec<Entry>>,
}

impl MemorySink {
    /// Returns a copy of all recorded entries.
    pub fn entries(&self) -> Vec<Entry> {
        self.entries.borrow().clone()
    }

    /// Returns the messages recorded at exactly `level`.
    pub fn messages(&self, level: Level) -> Vec<String> {
        self.entries
            .borrow()
            .iter()
            .filter(|entry| entry.level == level)
            .map(|entry| entry.message.clone())
            .collect()
    }

    /// Returns `true` if any message at `level` contains `needle`.
    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.entries
            .borrow()
            .iter()
            .any(|entry| entry.level == level && entry.message.contains(needle))
    }
}

impl DiagnosticSink for MemorySink {
    fn emit(
        &self,
        level: Level,
        location: &'static Location<'static>,
        message: fmt::Arguments<'_>,
    ) {
        self.entries.borrow_mut().push(Entry {
            level,
            file: location.file(),
            line: location.line(),
            message: message.to_string(),
        });
    }
}

/// Cloneable handle to a [`DiagnosticSink`].
///
/// The reporting methods are `#[track_caller]`, so every message carries the
/// file and line of the code that reported it.
#[derive(Clone)]
pub struct Diagnostics {
    sink: Rc<dyn DiagnosticSink>,
}

impl Diagnostics {
    /// Wraps an existing sink.
    pub fn new(sink: Rc<dyn DiagnosticSink>) -> Self {
        Self { sink }
    }

    /// Diagnostics that go to the `log` facade.
    pub fn log_facade() -> Self {
        Self::new(Rc::new(LogSink::default()))
    }

    #[track_caller]
    pub fn report(&self, level: Level, message: fmt::Arguments<'_>) {
        self.sink.emit(level, Location::caller(), message);
    }

    #[track_caller]
    pub fn debug(&self, message: fmt::Arguments<'_>) {
        self.sink.emit(Level::Debug, Location::caller(), message);
    }

    #[track_caller]
    pub fn info(&self, message: fmt::Arguments<'_>) {
        self.sink.emit(Level::Info, Location::caller(), message);
    }

    #[track_caller]
    pub fn warn(&self, message: fmt::Arguments<'_>) {
        self.sink.emit(Level::Warn, Location::caller(), message);
    }

    #[track_caller]
    pub fn error(&self, message: fmt::Arguments<'_>) {
        self.sink.emit(Level::Error, Location::caller(), message);
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::log_facade()
    }
}
