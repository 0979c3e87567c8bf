//! In-memory link used to drive the equipment clients without hardware.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use super::{EqptError, Link};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A link whose received bytes are queued by the test and whose transmitted bytes are recorded.
///
/// Clones share the same buffers, so a test keeps one clone and hands the other to a client.
#[derive(Debug, Clone)]
pub struct MockLink {
    name: String,
    inner: Arc<Mutex<MockInner>>,
}

#[derive(Debug, Default)]
struct MockInner {
    rx: VecDeque<u8>,
    tx: Vec<u8>,
    motor_on: bool,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl MockLink {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            inner: Arc::new(Mutex::new(MockInner::default())),
        }
    }

    /// Queue bytes to be read by the client.
    pub fn push_rx(&self, bytes: &[u8]) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.rx.extend(bytes.iter().copied());
        }
    }

    /// Take every byte the client has written so far.
    pub fn take_tx(&self) -> Vec<u8> {
        self.inner
            .lock()
            .map(|mut inner| std::mem::take(&mut inner.tx))
            .unwrap_or_default()
    }

    /// Number of received bytes not yet read by the client.
    pub fn rx_pending(&self) -> usize {
        self.inner.lock().map(|inner| inner.rx.len()).unwrap_or(0)
    }

    pub fn motor_on(&self) -> bool {
        self.inner.lock().map(|inner| inner.motor_on).unwrap_or(false)
    }
}

impl Link for MockLink {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, EqptError> {
        let mut inner = self.inner.lock().map_err(|_| EqptError::LinkPoisoned)?;

        let n = buf.len().min(inner.rx.len());
        for (dst, src) in buf.iter_mut().zip(inner.rx.drain(..n)) {
            *dst = src;
        }

        Ok(n)
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), EqptError> {
        let mut inner = self.inner.lock().map_err(|_| EqptError::LinkPoisoned)?;
        inner.tx.extend_from_slice(bytes);
        Ok(())
    }

    fn set_motor(&mut self, on: bool) -> Result<(), EqptError> {
        let mut inner = self.inner.lock().map_err(|_| EqptError::LinkPoisoned)?;
        inner.motor_on = on;
        Ok(())
    }
}
