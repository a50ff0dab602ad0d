//! Virtual ports backed by midir (ALSA sequencer on Linux, CoreMIDI on macOS).

use super::ports::{InputCallback, VirtualInput, VirtualMidiHost, VirtualOutput};
use super::CLIENT_NAME;
use crate::error::MidiPortError;

/// Opens virtual ports under a single MIDI client name.
#[derive(Debug, Clone)]
pub struct MidirHost {
    client_name: String,
}

impl MidirHost {
    pub fn new(client_name: impl Into<String>) -> Self {
        Self {
            client_name: client_name.into(),
        }
    }

    pub fn client_name(&self) -> &str {
        &self.client_name
    }
}

impl Default for MidirHost {
    fn default() -> Self {
        Self::new(CLIENT_NAME)
    }
}

#[cfg(unix)]
mod imp {
    use midir::os::unix::{VirtualInput as _, VirtualOutput as _};
    use midir::{MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};

    use super::*;

    pub(super) struct MidirInput {
        name: String,
        connection: MidiInputConnection<()>,
    }

    pub(super) struct MidirOutput {
        name: String,
        connection: MidiOutputConnection,
    }

    pub(super) fn open_input(
        client_name: &str,
        name: &str,
        mut on_message: InputCallback,
    ) -> Result<MidirInput, MidiPortError> {
        let input = MidiInput::new(client_name).map_err(|e| MidiPortError::Init(e.to_string()))?;
        let connection = input
            .create_virtual(
                name,
                move |_timestamp: u64, message: &[u8], _: &mut ()| on_message(message),
                (),
            )
            .map_err(|e| MidiPortError::Create {
                name: name.to_string(),
                message: e.to_string(),
            })?;

        Ok(MidirInput {
            name: name.to_string(),
            connection,
        })
    }

    pub(super) fn open_output(client_name: &str, name: &str) -> Result<MidirOutput, MidiPortError> {
        let output =
            MidiOutput::new(client_name).map_err(|e| MidiPortError::Init(e.to_string()))?;
        let connection = output
            .create_virtual(name)
            .map_err(|e| MidiPortError::Create {
                name: name.to_string(),
                message: e.to_string(),
            })?;

        Ok(MidirOutput {
            name: name.to_string(),
            connection,
        })
    }

    impl VirtualInput for MidirInput {
        fn name(&self) -> &str {
            &self.name
        }

        fn close(self: Box<Self>) {
            let _ = self.connection.close();
        }
    }

    impl VirtualOutput for MidirOutput {
        fn name(&self) -> &str {
            &self.name
        }

        fn send(&mut self, message: &[u8]) -> Result<(), MidiPortError> {
            self.connection
                .send(message)
                .map_err(|e| MidiPortError::Send(e.to_string()))
        }

        fn close(self: Box<Self>) {
            let _ = self.connection.close();
        }
    }
}

#[cfg(unix)]
impl VirtualMidiHost for MidirHost {
    fn open_input(
        &mut self,
        name: &str,
        on_message: InputCallback,
    ) -> Result<Box<dyn VirtualInput>, MidiPortError> {
        Ok(Box::new(imp::open_input(&self.client_name, name, on_message)?))
    }

    fn open_output(&mut self, name: &str) -> Result<Box<dyn VirtualOutput>, MidiPortError> {
        Ok(Box::new(imp::open_output(&self.client_name, name)?))
    }
}

#[cfg(not(unix))]
impl VirtualMidiHost for MidirHost {
    fn open_input(
        &mut self,
        _name: &str,
        _on_message: InputCallback,
    ) -> Result<Box<dyn VirtualInput>, MidiPortError> {
        Err(MidiPortError::Unsupported)
    }

    fn open_output(&mut self, _name: &str) -> Result<Box<dyn VirtualOutput>, MidiPortError> {
        Err(MidiPortError::Unsupported)
    }
}
