use super::{session::Result, Incoming, Sender};
use crate::error::SessionError;
use midir::{Ignore, MidiInput};
use tracing::{trace, warn};

const CLIENT_NAME: &str = "windlayer-in";

pub struct MidiReader {
    connection: Option<(String, midir::MidiInputConnection<()>)>,
    tx: Sender,
}

impl MidiReader {
    pub fn new(tx: Sender) -> Self {
        Self {
            connection: None,
            tx,
        }
    }

    pub fn get_available_ports() -> Vec<String> {
        midir::MidiInput::new(CLIENT_NAME)
            .map(get_available_ports_of)
            .unwrap_or_else(|_| vec![])
    }

    /// Dropping the previous connection closes it before the new one is made.
    pub fn connect_input(&mut self, port_name: &str) -> Result<()> {
        self.connection = None;
        let mut midi_in =
            MidiInput::new(CLIENT_NAME).map_err(|e| SessionError::Backend(e.to_string()))?;
        midi_in.ignore(Ignore::All);
        let index = get_port_index(&midi_in, port_name)
            .ok_or_else(|| SessionError::UnknownDevice(port_name.into()))?;
        let conn = connect_midi_in_to_port(midi_in, index, port_name, self.tx.clone())?;
        self.connection = Some((port_name.into(), conn));
        Ok(())
    }

    pub fn disconnect_input(&mut self) {
        self.connection = None;
    }
}

fn get_available_ports_of(midi_in: MidiInput) -> Vec<String> {
    midi_in
        .ports()
        .iter()
        .filter_map(|port| midi_in.port_name(port).ok())
        .collect()
}

fn get_port_index(midi_in: &MidiInput, port_name: &str) -> Option<usize> {
    midi_in.ports().iter().position(|port| {
        if let Ok(name) = midi_in.port_name(port) {
            name == port_name
        } else {
            false
        }
    })
}

fn connect_midi_in_to_port(
    midi_in: MidiInput,
    port_index: usize,
    port_name: &str,
    tx: Sender,
) -> Result<midir::MidiInputConnection<()>> {
    let ports = midi_in.ports();
    let port = ports
        .get(port_index)
        .ok_or_else(|| SessionError::UnknownDevice(port_name.into()))?;
    midi_in
        .connect(
            port,
            CLIENT_NAME,
            move |_, message, _| {
                let incoming = Incoming::from_bytes(message);
                match &incoming {
                    Incoming::Frame(frame) => trace!("MIDI received: {frame}"),
                    Incoming::Malformed(bytes) => {
                        warn!("Received {} byte MIDI message: {bytes:?}", bytes.len())
                    }
                }
                _ = tx.send(incoming);
            },
            (),
        )
        .map_err(|e| SessionError::Connect(format!("{port_name}: {e}")))
}
