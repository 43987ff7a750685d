use crate::{
    error::{EngineError, SessionError},
    instrument::{CatalogEntry, Instrument},
    midi::{DeviceInfo, Event, Frame},
};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, oneshot};

mod processor;

pub use processor::Engine;

pub type Requester = mpsc::Sender<(RequestKind, Responder)>;
pub type RequestListener = mpsc::Receiver<(RequestKind, Responder)>;
pub type Responder = oneshot::Sender<ResponseKind>;
pub type ResponseListener = oneshot::Receiver<ResponseKind>;
pub type ReportSender = broadcast::Sender<Report>;
pub type ReportReceiver = broadcast::Receiver<Report>;

pub fn create_request_channel(buffer: usize) -> (Requester, RequestListener) {
    mpsc::channel(buffer)
}

pub fn create_response_channel() -> (Responder, ResponseListener) {
    oneshot::channel()
}

pub fn create_report_channel(buffer: usize) -> (ReportSender, ReportReceiver) {
    broadcast::channel(buffer)
}

/// `None` when the engine is gone.
pub async fn send_request(req_tx: &Requester, kind: RequestKind) -> Option<ResponseKind> {
    let (res_tx, res_rx) = create_response_channel();

    if let Ok(()) = req_tx.send((kind, res_tx)).await {
        res_rx.await.ok()
    } else {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestKind {
    Discover,
    SelectInput(Option<String>),
    SelectOutput(Option<String>),
    SelectInstrument(Option<Instrument>),
    /// Sends the selection sequence for an instrument without selecting it.
    ApplyCustomInstrument(Instrument),
    ResendInstrument,
    SetReverb(u8),
    SendNrpn {
        msb: Option<u8>,
        lsb: Option<u8>,
        value: Option<u8>,
    },
    GetState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ResponseKind {
    Ok,
    Sent(Delivery),
    Devices {
        inputs: Vec<DeviceInfo>,
        outputs: Vec<DeviceInfo>,
    },
    State {
        state: EngineState,
        catalog: Vec<CatalogEntry>,
    },
    Failed(EngineError),
}

/// Non-fatal conditions, published as they happen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Report {
    Received(Event),
    Anomaly(Frame),
    /// An input message that was not exactly 3 bytes long.
    Malformed(Vec<u8>),
    SendFailed { frame: Frame, error: SessionError },
    NoDevicesFound,
    Lagged(u64),
}

/// Selections made by the user. Nothing is selected at session start.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineState {
    pub input: Option<String>,
    pub output: Option<String>,
    pub instrument: Option<Instrument>,
}

/// Outcome of one frame sequence. Every frame is attempted even when an
/// earlier one failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
    pub attempted: usize,
    pub delivered: usize,
}

impl Delivery {
    pub fn failed(&self) -> usize {
        self.attempted - self.delivered
    }
}

/// Device ids to pick automatically when discovery finds them. An explicit
/// selection of the same kind, including clearing it, discards the entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preselection {
    pub input: Option<String>,
    pub output: Option<String>,
}
