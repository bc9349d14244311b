//! Live source backed by a hardware link

use crate::error::Result;
use crate::server::config::RelayConfig;

use super::link::{Link, SerialLink};

/// Largest chunk read from the link per poll
const READ_CHUNK: usize = 4096;

/// Partial lines longer than this are discarded
const MAX_LINE_LEN: usize = 64 * 1024;

/// Non-blocking line reader over a [`Link`]
///
/// Each poll drains whatever bytes are already pending and returns at most one
/// complete line. A line that has not fully arrived stays buffered for the
/// next poll instead of stalling the caller.
pub struct LiveSource {
    link: Box<dyn Link>,
    pending: Vec<u8>,
}

impl LiveSource {
    /// Wrap an already opened link
    pub fn new(link: impl Link + 'static) -> Self {
        Self {
            link: Box::new(link),
            pending: Vec::new(),
        }
    }

    /// Open the configured serial port
    ///
    /// Waits `settle_delay` after opening, then discards buffered input so the
    /// first line returned is a fresh one.
    pub async fn open(config: &RelayConfig) -> Result<Self> {
        let mut link = SerialLink::open(&config.serial_port, config.baud_rate, config.read_timeout)?;

        if !config.settle_delay.is_zero() {
            tokio::time::sleep(config.settle_delay).await;
        }
        link.clear_input()?;

        Ok(Self::new(link))
    }

    /// Next trimmed line, or `None` if no complete non-empty line is ready.
    ///
    /// Link errors are logged and reported as `None`.
    pub fn poll(&mut self) -> Option<String> {
        if !self.has_line() {
            if let Err(e) = self.fill() {
                tracing::debug!(error = %e, "Serial read failed");
                return None;
            }
        }
        self.take_line()
    }

    fn has_line(&self) -> bool {
        self.pending.contains(&b'\n')
    }

    fn fill(&mut self) -> Result<()> {
        let available = self.link.available()?;
        if available == 0 {
            return Ok(());
        }

        let mut buf = [0u8; READ_CHUNK];
        let want = available.min(READ_CHUNK);
        let n = self.link.read(&mut buf[..want])?;
        self.pending.extend_from_slice(&buf[..n]);

        if !self.has_line() && self.pending.len() > MAX_LINE_LEN {
            tracing::warn!(bytes = self.pending.len(), "Discarding oversized partial line");
            self.pending.clear();
        }

        Ok(())
    }

    fn take_line(&mut self) -> Option<String> {
        let end = self.pending.iter().position(|&b| b == b'\n')?;
        let line: Vec<u8> = self.pending.drain(..=end).collect();
        let text = String::from_utf8_lossy(&line).trim().to_string();

        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

/// In-memory link for tests
#[cfg(test)]
pub(crate) mod mock {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use crate::error::{Error, Result};

    use super::Link;

    #[derive(Clone, Default)]
    pub(crate) struct MockLink {
        inner: Arc<Mutex<MockLinkInner>>,
    }

    #[derive(Default)]
    struct MockLinkInner {
        read_buffer: VecDeque<u8>,
        fail_next: bool,
    }

    impl MockLink {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn inject(&self, data: &[u8]) {
            self.inner.lock().unwrap().read_buffer.extend(data);
        }

        pub(crate) fn fail_next(&self) {
            self.inner.lock().unwrap().fail_next = true;
        }
    }

    impl Link for MockLink {
        fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
            let mut inner = self.inner.lock().unwrap();
            let n = inner.read_buffer.len().min(buffer.len());
            for slot in buffer.iter_mut().take(n) {
                *slot = inner.read_buffer.pop_front().unwrap_or(0);
            }
            Ok(n)
        }

        fn available(&mut self) -> Result<usize> {
            let mut inner = self.inner.lock().unwrap();
            if inner.fail_next {
                inner.fail_next = false;
                return Err(Error::Io(std::io::Error::from(
                    std::io::ErrorKind::BrokenPipe,
                )));
            }
            Ok(inner.read_buffer.len())
        }
    }
}
