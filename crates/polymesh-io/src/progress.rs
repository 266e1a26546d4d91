//! Coarse progress notifications emitted while loading and saving.
//!
//! Loggers are purely observational: nothing they do changes the outcome of
//! a load or save.

/// Receiver of start / progress / end notifications for one batch of work.
pub trait Logger {
    /// A batch named `message` with `total` units of work begins.
    fn start_progress(&mut self, message: &str, total: u64);

    /// `done` units of the current batch are complete.
    fn progress(&mut self, done: u64);

    /// The current batch is complete.
    fn end_progress(&mut self);
}

/// Discards every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLogger;

impl Logger for NullLogger {
    fn start_progress(&mut self, _message: &str, _total: u64) {}

    fn progress(&mut self, _done: u64) {}

    fn end_progress(&mut self) {}
}

/// Forwards progress to the `log` facade, once per percentage step.
#[derive(Debug, Clone)]
pub struct LogProgress {
    step: u32,
    message: String,
    total: u64,
    last_percent: Option<u32>,
}

impl Default for LogProgress {
    fn default() -> Self {
        Self::new(10)
    }
}

impl LogProgress {
    /// Reports every `step` percent (clamped to 1..=100).
    pub fn new(step: u32) -> Self {
        Self {
            step: step.clamp(1, 100),
            message: String::new(),
            total: 0,
            last_percent: None,
        }
    }

    fn percent(&self, done: u64) -> u32 {
        if self.total == 0 {
            return 100;
        }
        ((done.min(self.total) * 100) / self.total) as u32
    }
}

impl Logger for LogProgress {
    fn start_progress(&mut self, message: &str, total: u64) {
        self.message = message.to_string();
        self.total = total;
        self.last_percent = None;
        log::info!("{message}");
    }

    fn progress(&mut self, done: u64) {
        let percent = self.percent(done) / self.step * self.step;
        if self.last_percent.map_or(true, |last| percent > last) {
            self.last_percent = Some(percent);
            log::debug!("{}: {}%", self.message, percent);
        }
    }

    fn end_progress(&mut self) {
        log::info!("{}: done", self.message);
    }
}
