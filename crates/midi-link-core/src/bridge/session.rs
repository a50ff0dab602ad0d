//! Host-to-console direction of the bridge.
//!
//! The virtual MIDI input callback runs on the host MIDI subsystem's thread
//! while the bridge loop owns the socket. Messages cross over through a
//! channel whose sender is only present while a session is connected.

use std::net::Ipv4Addr;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

use crate::error::BridgeError;
use crate::midi::InputCallback;

/// Cloneable handle for sending host messages to the console.
#[derive(Debug, Clone)]
pub struct SessionWriter {
    peer: Ipv4Addr,
    slot: Arc<Mutex<Option<UnboundedSender<Vec<u8>>>>>,
}

impl SessionWriter {
    pub fn new(peer: Ipv4Addr) -> Self {
        Self {
            peer,
            slot: Arc::new(Mutex::new(None)),
        }
    }

    /// Queue a message's raw bytes for the active session.
    ///
    /// Fails with [`BridgeError::NotConnected`] when no session is open or the
    /// session was torn down concurrently.
    pub fn send(&self, message: &[u8]) -> Result<(), BridgeError> {
        let slot = self.slot.lock();
        match slot.as_ref() {
            Some(tx) => tx
                .send(message.to_vec())
                .map_err(|_| BridgeError::NotConnected { ip: self.peer }),
            None => Err(BridgeError::NotConnected { ip: self.peer }),
        }
    }

    pub fn is_open(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Callback for the virtual input: forwards every host message.
    pub fn input_callback(&self) -> InputCallback {
        let writer = self.clone();
        Box::new(move |message: &[u8]| {
            if let Err(e) = writer.send(message) {
                debug!(error = %e, len = message.len(), "Dropping host MIDI message");
            }
        })
    }

    /// Start accepting messages for a new session.
    pub(crate) fn open(&self) -> UnboundedReceiver<Vec<u8>> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.slot.lock() = Some(tx);
        rx
    }

    /// Stop accepting messages; later sends fail.
    pub(crate) fn close(&self) {
        self.slot.lock().take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn writer() -> SessionWriter {
        SessionWriter::new(Ipv4Addr::new(192, 168, 1, 70))
    }

    #[test]
    fn test_send_without_session_fails() {
        let writer = writer();
        assert!(!writer.is_open());
        assert!(matches!(
            writer.send(&[0x90, 0x40, 0x7F]),
            Err(BridgeError::NotConnected { .. })
        ));
    }

    #[test]
    fn test_send_reaches_open_session() {
        let writer = writer();
        let mut rx = writer.open();

        writer.send(&[0xB0, 0x07, 0x64]).unwrap();
        assert_eq!(rx.try_recv().unwrap(), vec![0xB0, 0x07, 0x64]);
    }

    #[test]
    fn test_send_after_close_fails() {
        let writer = writer();
        let _rx = writer.open();
        writer.close();
        assert!(writer.send(&[0xF8]).is_err());
    }

    #[test]
    fn test_send_after_receiver_dropped_fails() {
        let writer = writer();
        drop(writer.open());
        assert!(matches!(
            writer.send(&[0xF8]),
            Err(BridgeError::NotConnected { .. })
        ));
    }

    #[test]
    fn test_input_callback_uses_shared_slot() {
        let writer = writer();
        let mut callback = writer.input_callback();

        // No session: dropped without panicking.
        callback(&[0x90, 0x40, 0x7F]);

        let mut rx = writer.open();
        callback(&[0x80, 0x40, 0x00]);
        assert_eq!(rx.try_recv().unwrap(), vec![0x80, 0x40, 0x00]);
        assert!(rx.try_recv().is_err());
    }
}
