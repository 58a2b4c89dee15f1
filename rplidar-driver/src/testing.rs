//! Scripted in-memory transport for tests.

use crate::serial::Transport;
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::thread::sleep;
use std::time::Duration;

enum Step {
    Data(Vec<u8>),
    Timeout,
    Fail(io::ErrorKind),
}

#[derive(Default)]
struct Inner {
    steps: VecDeque<Step>,
    written: Vec<u8>,
    flush_count: usize,
    read_delay: Duration,
}

/// Cloning yields another handle on the same script, so a test can keep
/// feeding and inspecting a transport owned by the decode thread.
#[derive(Clone, Default)]
pub(crate) struct MockTransport {
    inner: Arc<Mutex<Inner>>,
}

impl MockTransport {
    pub(crate) fn new() -> MockTransport {
        MockTransport::default()
    }

    /// Every read blocks this long before returning, like a serial read
    /// that waits out its whole timeout.
    pub(crate) fn set_read_delay(&self, delay: Duration) {
        self.inner.lock().unwrap().read_delay = delay;
    }

    pub(crate) fn push_read(&self, data: &[u8]) {
        self.inner
            .lock()
            .unwrap()
            .steps
            .push_back(Step::Data(data.to_vec()));
    }

    pub(crate) fn push_timeout(&self) {
        self.inner.lock().unwrap().steps.push_back(Step::Timeout);
    }

    pub(crate) fn push_error(&self, kind: io::ErrorKind) {
        self.inner.lock().unwrap().steps.push_back(Step::Fail(kind));
    }

    pub(crate) fn written(&self) -> Vec<u8> {
        self.inner.lock().unwrap().written.clone()
    }

    pub(crate) fn flush_count(&self) -> usize {
        self.inner.lock().unwrap().flush_count
    }

    /// Scripted bytes not consumed yet.
    pub(crate) fn remaining(&self) -> usize {
        self.inner
            .lock()
            .unwrap()
            .steps
            .iter()
            .map(|s| match s {
                Step::Data(d) => d.len(),
                _ => 0,
            })
            .sum()
    }
}

impl Transport for MockTransport {
    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.inner.lock().unwrap().written.extend_from_slice(data);
        Ok(())
    }

    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let delay = self.inner.lock().unwrap().read_delay;
        if !delay.is_zero() {
            sleep(delay);
        }
        let step = self.inner.lock().unwrap().steps.pop_front();
        match step {
            Some(Step::Data(mut data)) => {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                if n < data.len() {
                    let rest = data.split_off(n);
                    self.inner
                        .lock()
                        .unwrap()
                        .steps
                        .push_front(Step::Data(rest));
                }
                Ok(n)
            }
            Some(Step::Fail(kind)) => Err(io::Error::new(kind, "scripted failure")),
            Some(Step::Timeout) | None => {
                sleep(Duration::from_millis(1));
                Ok(0)
            }
        }
    }

    fn flush_input(&mut self) -> io::Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.steps.clear();
        inner.flush_count += 1;
        Ok(())
    }
}
