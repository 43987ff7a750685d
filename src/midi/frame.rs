use serde::{Deserialize, Serialize};
use std::fmt;

pub const NOTE_OFF: u8 = 0x80;
pub const NOTE_ON: u8 = 0x90;
pub const CONTROL_CHANGE: u8 = 0xB0;
pub const PROGRAM_CHANGE: u8 = 0xC0;

/// Second data byte of a Program Change frame. Receivers ignore it.
pub const PROGRAM_CHANGE_FILLER: u8 = 0x00;

pub const BANK_SELECT_MSB: u8 = 0;
pub const DATA_ENTRY_MSB: u8 = 0x06;
pub const NRPN_LSB: u8 = 0x62;
pub const NRPN_MSB: u8 = 0x63;

/// A raw 3-byte protocol message, kept exactly as it travels on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Frame {
    pub status: u8,
    pub data1: u8,
    pub data2: u8,
}

impl Frame {
    pub const fn new(status: u8, data1: u8, data2: u8) -> Self {
        Self {
            status,
            data1,
            data2,
        }
    }

    /// Accepts only exact 3-byte messages. Shorter or longer ones
    /// (sysex, running status, real-time bytes) are not frames.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        match *bytes {
            [status, data1, data2] => Some(Self::new(status, data1, data2)),
            _ => None,
        }
    }

    pub fn to_bytes(self) -> [u8; 3] {
        [self.status, self.data1, self.data2]
    }

    pub fn command(&self) -> u8 {
        self.status & 0xF0
    }

    pub fn channel(&self) -> u8 {
        self.status & 0x0F
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{:#04X}, {}, {}]", self.status, self.data1, self.data2)
    }
}

/// What an input port hands to the engine: a frame, or a message of any
/// other length, which is kept so it can be reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    Frame(Frame),
    Malformed(Vec<u8>),
}

impl Incoming {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        match Frame::from_bytes(bytes) {
            Some(frame) => Self::Frame(frame),
            None => Self::Malformed(bytes.to_vec()),
        }
    }
}

// Encoders do no range checking; keeping channel in [0,15] and data bytes
// in [0,127] is up to the caller.

pub fn encode_control_change(channel: u8, control: u8, value: u8) -> Frame {
    Frame::new(CONTROL_CHANGE.wrapping_add(channel), control, value)
}

pub fn encode_program_change(channel: u8, program: u8) -> Frame {
    Frame::new(
        PROGRAM_CHANGE.wrapping_add(channel),
        program,
        PROGRAM_CHANGE_FILLER,
    )
}

pub fn encode_bank_select(channel: u8, bank: u8) -> Frame {
    encode_control_change(channel, BANK_SELECT_MSB, bank)
}

/// A Non-Registered Parameter Number write. The LSB is optional and, when
/// absent, is left off the wire entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nrpn {
    pub msb: u8,
    pub lsb: Option<u8>,
    pub value: u8,
}

impl Nrpn {
    pub fn new(msb: u8, lsb: Option<u8>, value: u8) -> Self {
        Self { msb, lsb, value }
    }

    /// Parameter select before data entry, always on channel 0.
    pub fn encode(&self) -> Vec<Frame> {
        let mut frames = Vec::with_capacity(3);
        frames.push(encode_control_change(0, NRPN_MSB, self.msb));
        if let Some(lsb) = self.lsb {
            frames.push(encode_control_change(0, NRPN_LSB, lsb));
        }
        frames.push(encode_control_change(0, DATA_ENTRY_MSB, self.value));
        frames
    }
}
