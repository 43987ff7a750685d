use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of output channels a layered instrument is spread across.
pub const LAYER_COUNT: u8 = 5;

/// First identifier of the layered range.
pub const FIRST_LAYERED: u32 = 128;

/// Bank selected before the program change of a layered instrument.
pub const LAYERED_BANK: u8 = 10;
pub const SIMPLE_BANK: u8 = 0;

/// Instrument identifier. `[0,127]` is a General MIDI program on channel 0,
/// `128` and above is a layered instrument played over channels 0 to 4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Instrument(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voicing {
    pub is_layered: bool,
    pub channel_count: u8,
}

impl Instrument {
    pub fn is_layered(&self) -> bool {
        self.0 >= FIRST_LAYERED
    }

    pub fn resolve(&self) -> Voicing {
        if self.is_layered() {
            Voicing {
                is_layered: true,
                channel_count: LAYER_COUNT,
            }
        } else {
            Voicing {
                is_layered: false,
                channel_count: 1,
            }
        }
    }

    pub fn bank(&self) -> u8 {
        if self.is_layered() {
            LAYERED_BANK
        } else {
            SIMPLE_BANK
        }
    }

    /// `(channel, program)` pairs in channel order.
    ///
    /// Custom identifiers are not bounded here, so a large layered
    /// identifier yields program numbers past 127; they are truncated to a
    /// byte and it is up to the caller to offer sane values.
    pub fn programs(&self) -> Vec<(u8, u8)> {
        if self.is_layered() {
            let base = 5u32.wrapping_mul(self.0 - FIRST_LAYERED);
            (0..LAYER_COUNT)
                .map(|channel| (channel, base.wrapping_add(channel as u32) as u8))
                .collect()
        } else {
            vec![(0, self.0 as u8)]
        }
    }

    pub fn name(&self) -> Option<&'static str> {
        CATALOG
            .iter()
            .find(|entry| entry.id == *self)
            .map(|entry| entry.name)
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name} ({})", self.0),
            None => write!(f, "custom ({})", self.0),
        }
    }
}

impl From<u32> for Instrument {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub name: &'static str,
    pub id: Instrument,
}

const fn entry(name: &'static str, id: u32) -> CatalogEntry {
    CatalogEntry {
        name,
        id: Instrument(id),
    }
}

pub const CATALOG: &[CatalogEntry] = &[
    entry("Tenor", 128),
    entry("Alto", 129),
    entry("Soprano", 130),
    entry("Piano", 0),
    entry("Bajo", 32),
    entry("Harmonica", 22),
    entry("violin", 40),
    entry("viola", 41),
    entry("cello", 42),
    entry("trumpet", 56),
    entry("trombon", 57),
    entry("tuba", 58),
    entry("bajo synth", 63),
    entry("clarinet", 71),
    entry("Ocarina", 79),
    entry("Pad Choir", 91),
];
