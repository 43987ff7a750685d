// Resources:
// https://www.songstuff.com/recording/article/midi_message_format/
// https://www.midi.org/specifications-old/item/table-3-control-change-messages-data-bytes-2

use super::frame::{Frame, CONTROL_CHANGE, NOTE_OFF, NOTE_ON, PROGRAM_CHANGE};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    NoteOff,
    NoteOn,
    Controller,
    ProgramChange,
}

// Keyed by command nibble so every channel a firmware revision transmits on
// (0 before v3, 7 from v3.0.3) lands on the same tag.
const DECODE_TABLE: [(u8, Tag); 4] = [
    (NOTE_OFF, Tag::NoteOff),
    (NOTE_ON, Tag::NoteOn),
    (CONTROL_CHANGE, Tag::Controller),
    (PROGRAM_CHANGE, Tag::ProgramChange),
];

const LEGACY_CHANNEL: u8 = 0;
const MODERN_CHANNEL: u8 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Control {
    Expression,
    KeyPressed,
    KeyReleased,
    Other(u8),
}

impl Control {
    pub fn from_number(number: u8) -> Self {
        match number {
            7 => Self::Expression,
            14 => Self::KeyPressed,
            15 => Self::KeyReleased,
            n => Self::Other(n),
        }
    }

    pub fn as_number(&self) -> u8 {
        match *self {
            Control::Expression => 7,
            Control::KeyPressed => 14,
            Control::KeyReleased => 15,
            Control::Other(n) => n,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    NoteOff { note: u8, velocity: u8 },
    NoteOn { note: u8, velocity: u8 },
    Controller { control: Control, value: u8 },
    ProgramChange { program: u8 },
    Unrecognized { status: u8, data1: u8, data2: u8 },
}

/// Which controller firmware produced an event, guessed from its channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Firmware {
    /// Before v3.
    Legacy,
    /// v3.0.3 and later.
    Modern,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    pub channel: u8,
}

impl Event {
    /// Total over every possible frame: anything outside the table becomes
    /// `Unrecognized` instead of an error.
    pub fn decode(frame: Frame) -> Self {
        let tag = DECODE_TABLE
            .iter()
            .find(|(command, _)| *command == frame.command())
            .map(|(_, tag)| *tag);

        let kind = match tag {
            Some(Tag::NoteOff) => EventKind::NoteOff {
                note: frame.data1,
                velocity: frame.data2,
            },
            Some(Tag::NoteOn) => EventKind::NoteOn {
                note: frame.data1,
                velocity: frame.data2,
            },
            Some(Tag::Controller) => EventKind::Controller {
                control: Control::from_number(frame.data1),
                value: frame.data2,
            },
            Some(Tag::ProgramChange) => EventKind::ProgramChange {
                program: frame.data1,
            },
            None => EventKind::Unrecognized {
                status: frame.status,
                data1: frame.data1,
                data2: frame.data2,
            },
        };

        Self {
            kind,
            channel: frame.channel(),
        }
    }

    pub fn is_unrecognized(&self) -> bool {
        matches!(self.kind, EventKind::Unrecognized { .. })
    }

    pub fn firmware(&self) -> Firmware {
        if self.is_unrecognized() {
            return Firmware::Unknown;
        }
        match self.channel {
            LEGACY_CHANNEL => Firmware::Legacy,
            MODERN_CHANNEL => Firmware::Modern,
            _ => Firmware::Unknown,
        }
    }
}
