//! Virtual MIDI port capability and the bridge's port pair.

use std::fmt;

use tracing::{debug, info};

use crate::error::MidiPortError;
use crate::protocol::MidiMessage;

/// Called once per message host software sends to the virtual input.
pub type InputCallback = Box<dyn FnMut(&[u8]) + Send + 'static>;

/// Creates named virtual MIDI endpoints on the host.
pub trait VirtualMidiHost: Send {
    fn open_input(
        &mut self,
        name: &str,
        on_message: InputCallback,
    ) -> Result<Box<dyn VirtualInput>, MidiPortError>;

    fn open_output(&mut self, name: &str) -> Result<Box<dyn VirtualOutput>, MidiPortError>;
}

/// An open virtual input endpoint.
pub trait VirtualInput: Send {
    fn name(&self) -> &str;

    fn close(self: Box<Self>);
}

/// An open virtual output endpoint.
pub trait VirtualOutput: Send {
    fn name(&self) -> &str;

    /// Deliver one complete message to host software.
    fn send(&mut self, message: &[u8]) -> Result<(), MidiPortError>;

    fn close(self: Box<Self>);
}

/// The bridge's input/output pair. Either side may be absent until created.
#[derive(Default)]
pub struct MidiPorts {
    input: Option<Box<dyn VirtualInput>>,
    output: Option<Box<dyn VirtualOutput>>,
}

impl MidiPorts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether both endpoints exist.
    pub fn is_open(&self) -> bool {
        self.input.is_some() && self.output.is_some()
    }

    /// Create whichever endpoints do not exist yet, named `name`.
    ///
    /// `make_callback` is only invoked when the input has to be created.
    pub fn ensure<F>(
        &mut self,
        host: &mut dyn VirtualMidiHost,
        name: &str,
        make_callback: F,
    ) -> Result<(), MidiPortError>
    where
        F: FnOnce() -> InputCallback,
    {
        if self.input.is_none() {
            let input = host.open_input(name, make_callback())?;
            info!(port = %input.name(), "Opened virtual MIDI input");
            self.input = Some(input);
        }
        if self.output.is_none() {
            let output = host.open_output(name)?;
            info!(port = %output.name(), "Opened virtual MIDI output");
            self.output = Some(output);
        }
        Ok(())
    }

    /// Send a decoded console message to host software.
    pub fn forward(&mut self, message: &MidiMessage) -> Result<(), MidiPortError> {
        match self.output.as_mut() {
            Some(output) => output.send(message.as_bytes()),
            None => {
                debug!(msg = %message, "No virtual output open, dropping message");
                Ok(())
            }
        }
    }

    /// Close both endpoints. Closing twice is a no-op.
    pub fn close(&mut self) {
        if let Some(input) = self.input.take() {
            info!(port = %input.name(), "Closing virtual MIDI input");
            input.close();
        }
        if let Some(output) = self.output.take() {
            info!(port = %output.name(), "Closing virtual MIDI output");
            output.close();
        }
    }
}

impl fmt::Debug for MidiPorts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MidiPorts")
            .field("input", &self.input.as_ref().map(|p| p.name().to_string()))
            .field("output", &self.output.as_ref().map(|p| p.name().to_string()))
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Recording in-memory host used by the bridge tests.

    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Debug, Default)]
    pub struct HostLog {
        pub opened_inputs: Vec<String>,
        pub opened_outputs: Vec<String>,
        pub closed: Vec<String>,
        pub delivered: Vec<Vec<u8>>,
    }

    /// Fake host; keeps the input callback so tests can play host software.
    #[derive(Clone, Default)]
    pub struct FakeHost {
        pub log: Arc<Mutex<HostLog>>,
        pub callback: Arc<Mutex<Option<InputCallback>>>,
    }

    impl FakeHost {
        /// Invoke the input callback as host software would.
        pub fn play(&self, message: &[u8]) -> bool {
            match self.callback.lock().as_mut() {
                Some(callback) => {
                    callback(message);
                    true
                }
                None => false,
            }
        }
    }

    struct FakeInput {
        name: String,
        log: Arc<Mutex<HostLog>>,
    }

    struct FakeOutput {
        name: String,
        log: Arc<Mutex<HostLog>>,
    }

    impl VirtualMidiHost for FakeHost {
        fn open_input(
            &mut self,
            name: &str,
            on_message: InputCallback,
        ) -> Result<Box<dyn VirtualInput>, MidiPortError> {
            self.log.lock().opened_inputs.push(name.to_string());
            *self.callback.lock() = Some(on_message);
            Ok(Box::new(FakeInput {
                name: name.to_string(),
                log: self.log.clone(),
            }))
        }

        fn open_output(&mut self, name: &str) -> Result<Box<dyn VirtualOutput>, MidiPortError> {
            self.log.lock().opened_outputs.push(name.to_string());
            Ok(Box::new(FakeOutput {
                name: name.to_string(),
                log: self.log.clone(),
            }))
        }
    }

    impl VirtualInput for FakeInput {
        fn name(&self) -> &str {
            &self.name
        }

        fn close(self: Box<Self>) {
            self.log.lock().closed.push(format!("in:{}", self.name));
        }
    }

    impl VirtualOutput for FakeOutput {
        fn name(&self) -> &str {
            &self.name
        }

        fn send(&mut self, message: &[u8]) -> Result<(), MidiPortError> {
            self.log.lock().delivered.push(message.to_vec());
            Ok(())
        }

        fn close(self: Box<Self>) {
            self.log.lock().closed.push(format!("out:{}", self.name));
        }
    }
}
