use super::{reader::MidiReader, writer::MidiWriter, Frame, Sender};
use crate::error::SessionError;
use serde::{Deserialize, Serialize};

/// Substring identifying the wind controller in a port name.
pub const WIND_CONTROLLER_NAME: &str = "TravelSax2";

pub type Result<T> = std::result::Result<T, SessionError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Opaque and stable for the lifetime of the port.
    pub id: String,
    pub name: String,
    pub is_wind_controller: bool,
}

impl DeviceInfo {
    pub fn from_port_name(name: String) -> Self {
        Self {
            id: name.clone(),
            is_wind_controller: name.contains(WIND_CONTROLLER_NAME),
            name,
        }
    }
}

/// Everything the engine needs from the platform MIDI layer.
pub trait DeviceSession: Send {
    fn list_inputs(&self) -> Vec<DeviceInfo>;
    fn list_outputs(&self) -> Vec<DeviceInfo>;

    /// Supersedes any previous input connection, so frames only ever
    /// reach one consumer.
    fn connect_input(&mut self, id: &str) -> Result<()>;
    fn disconnect_input(&mut self);

    fn connect_output(&mut self, id: &str) -> Result<()>;
    fn disconnect_output(&mut self);

    fn send(&mut self, frame: Frame) -> Result<()>;
}

/// The midir backed session. Received frames go to the channel given at
/// construction.
pub struct MidiSession {
    reader: MidiReader,
    writer: MidiWriter,
}

impl MidiSession {
    pub fn new(tx: Sender) -> Self {
        Self {
            reader: MidiReader::new(tx),
            writer: MidiWriter::default(),
        }
    }
}

impl DeviceSession for MidiSession {
    fn list_inputs(&self) -> Vec<DeviceInfo> {
        MidiReader::get_available_ports()
            .into_iter()
            .map(DeviceInfo::from_port_name)
            .collect()
    }

    fn list_outputs(&self) -> Vec<DeviceInfo> {
        MidiWriter::get_available_ports()
            .into_iter()
            .map(DeviceInfo::from_port_name)
            .collect()
    }

    fn connect_input(&mut self, id: &str) -> Result<()> {
        self.reader.connect_input(id)
    }

    fn disconnect_input(&mut self) {
        self.reader.disconnect_input();
    }

    fn connect_output(&mut self, id: &str) -> Result<()> {
        self.writer.connect_output(id)
    }

    fn disconnect_output(&mut self) {
        self.writer.disconnect_output();
    }

    fn send(&mut self, frame: Frame) -> Result<()> {
        self.writer.send(frame)
    }
}
