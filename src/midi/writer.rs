use super::{session::Result, Frame};
use crate::error::SessionError;
use midir::{MidiOutput, MidiOutputConnection};
use tracing::debug;

const CLIENT_NAME: &str = "windlayer-out";

#[derive(Default)]
pub struct MidiWriter {
    connection: Option<(String, MidiOutputConnection)>,
}

impl MidiWriter {
    pub fn get_available_ports() -> Vec<String> {
        MidiOutput::new(CLIENT_NAME)
            .map(|midi_out| {
                midi_out
                    .ports()
                    .iter()
                    .filter_map(|port| midi_out.port_name(port).ok())
                    .collect()
            })
            .unwrap_or_else(|_| vec![])
    }

    pub fn connect_output(&mut self, port_name: &str) -> Result<()> {
        self.connection = None;
        let midi_out =
            MidiOutput::new(CLIENT_NAME).map_err(|e| SessionError::Backend(e.to_string()))?;
        let ports = midi_out.ports();
        let port = ports
            .iter()
            .find(|port| {
                midi_out
                    .port_name(port)
                    .map(|name| name == port_name)
                    .unwrap_or(false)
            })
            .ok_or_else(|| SessionError::UnknownDevice(port_name.into()))?;
        let conn = midi_out
            .connect(port, CLIENT_NAME)
            .map_err(|e| SessionError::Connect(format!("{port_name}: {e}")))?;
        self.connection = Some((port_name.into(), conn));
        Ok(())
    }

    pub fn disconnect_output(&mut self) {
        self.connection = None;
    }

    pub fn send(&mut self, frame: Frame) -> Result<()> {
        let (_, conn) = self.connection.as_mut().ok_or(SessionError::NotConnected)?;
        conn.send(&frame.to_bytes())
            .map_err(|e| SessionError::Send(e.to_string()))?;
        debug!("MIDI sent: {frame}");
        Ok(())
    }
}
