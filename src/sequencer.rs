use crate::{
    error::{EngineError, Result},
    instrument::Instrument,
    midi::frame::{encode_bank_select, encode_program_change, Frame, Nrpn},
};
use serde::{Deserialize, Serialize};

/// NRPN parameter pair of the reverb depth on the target synthesizer.
pub const REVERB_MSB: u8 = 0x37;
pub const REVERB_LSB: u8 = 0x58;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intent {
    SelectInstrument(Instrument),
    SetReverb(u8),
    SendNrpn {
        msb: Option<u8>,
        lsb: Option<u8>,
        value: Option<u8>,
    },
}

impl Intent {
    /// The full frame sequence, or an error before anything is produced.
    pub fn frames(&self) -> Result<Vec<Frame>> {
        match *self {
            Intent::SelectInstrument(instrument) => Ok(select_instrument(instrument)),
            Intent::SetReverb(value) => Ok(reverb(value).encode()),
            Intent::SendNrpn { msb, lsb, value } => Ok(nrpn(msb, lsb, value)?.encode()),
        }
    }
}

/// Bank select then program change, per layer channel.
pub fn select_instrument(instrument: Instrument) -> Vec<Frame> {
    let bank = instrument.bank();
    instrument
        .programs()
        .into_iter()
        .flat_map(|(channel, program)| {
            [
                encode_bank_select(channel, bank),
                encode_program_change(channel, program),
            ]
        })
        .collect()
}

pub fn reverb(value: u8) -> Nrpn {
    Nrpn::new(REVERB_MSB, Some(REVERB_LSB), value)
}

pub fn nrpn(msb: Option<u8>, lsb: Option<u8>, value: Option<u8>) -> Result<Nrpn> {
    match (msb, value) {
        (Some(msb), Some(value)) => Ok(Nrpn::new(msb, lsb, value)),
        _ => Err(EngineError::InvalidConfig(format!(
            "NRPN needs both MSB and value (msb: {msb:?}, lsb: {lsb:?}, value: {value:?})"
        ))),
    }
}
