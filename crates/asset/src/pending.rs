//! Background loads with a pollable result.
//!
//! A load runs on its own thread; the owner polls the handle from the event
//! loop thread, so whatever consumes the result never runs concurrently with
//! rendering.

use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use anyhow::{Result, anyhow};

/// Result of a background load that may not have finished yet.
pub struct Pending<T> {
    label: String,
    rx: Option<Receiver<Result<T>>>,
}

impl<T: Send + 'static> Pending<T> {
    /// Run `load` on a worker thread.
    pub fn spawn<F>(label: impl Into<String>, load: F) -> Self
    where
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        let label = label.into();
        let (tx, rx) = mpsc::channel();
        let thread_label = label.clone();
        let spawned = thread::Builder::new()
            .name(format!("load:{label}"))
            .spawn(move || {
                let result = load();
                if tx.send(result).is_err() {
                    log::debug!("Load of {thread_label} finished after its handle was dropped");
                }
            });

        match spawned {
            Ok(_) => Self {
                label,
                rx: Some(rx),
            },
            Err(e) => Self::failed(label, anyhow!("failed to spawn loader thread: {e}")),
        }
    }
}

impl<T> Pending<T> {
    /// Already-resolved handle.
    pub fn ready(label: impl Into<String>, result: Result<T>) -> Self {
        let (tx, rx) = mpsc::channel();
        // The receiver is alive, so the send cannot fail.
        let _ = tx.send(result);
        Self {
            label: label.into(),
            rx: Some(rx),
        }
    }

    fn failed(label: String, err: anyhow::Error) -> Self {
        Self::ready(label, Err(err))
    }

    /// `true` once the result has been taken.
    #[inline]
    pub fn is_taken(&self) -> bool {
        self.rx.is_none()
    }

    /// Non-blocking. Yields the result exactly once, then `None` forever.
    pub fn poll(&mut self) -> Option<Result<T>> {
        let rx = self.rx.as_ref()?;
        let outcome = match rx.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => {
                Err(anyhow!("loader for {} stopped without a result", self.label))
            }
        };
        self.rx = None;
        Some(outcome)
    }

    /// Block until the load completes.
    pub fn wait(mut self) -> Result<T> {
        let rx = self
            .rx
            .take()
            .ok_or_else(|| anyhow!("result of {} was already taken", self.label))?;
        rx.recv()
            .map_err(|_| anyhow!("loader for {} stopped without a result", self.label))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn poll_until_ready<T>(pending: &mut Pending<T>) -> Result<T> {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(result) = pending.poll() {
                return result;
            }
            assert!(Instant::now() < deadline, "load never completed");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn result_is_delivered_once() {
        let mut pending = Pending::spawn("answer", || Ok(42));
        assert_eq!(poll_until_ready(&mut pending).expect("load ok"), 42);
        assert!(pending.is_taken());
        assert!(pending.poll().is_none());
    }

    #[test]
    fn errors_pass_through() {
        let mut pending: Pending<u8> = Pending::spawn("broken", || anyhow::bail!("404"));
        let err = poll_until_ready(&mut pending).unwrap_err();
        assert!(err.to_string().contains("404"));
    }

    #[test]
    fn panicking_loader_is_reported() {
        let mut pending: Pending<u8> = Pending::spawn("panics", || panic!("decoder crashed"));
        let err = poll_until_ready(&mut pending).unwrap_err();
        assert!(err.to_string().contains("panics"));
    }

    #[test]
    fn wait_blocks_for_result() {
        let pending = Pending::spawn("slow", || {
            thread::sleep(Duration::from_millis(20));
            Ok("done")
        });
        assert_eq!(pending.wait().expect("load ok"), "done");
        assert!(Pending::ready("now", Ok(1)).wait().is_ok());
    }
}
