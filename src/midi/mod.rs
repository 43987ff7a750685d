pub mod frame;
mod msg;
mod reader;
pub mod session;
mod writer;

pub use frame::{Frame, Incoming};
pub use msg::Control;
pub use msg::Event;
pub use msg::EventKind;
pub use msg::Firmware;
pub use session::{DeviceInfo, DeviceSession, MidiSession};
use tokio::sync::broadcast;

pub type Sender = broadcast::Sender<Incoming>;
pub type Receiver = broadcast::Receiver<Incoming>;

pub fn create_channel(buffer: usize) -> (Sender, Receiver) {
    broadcast::channel(buffer)
}
