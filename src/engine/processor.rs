use super::{
    Delivery, EngineState, Preselection, Report, ReportSender, RequestKind, RequestListener,
    Responder, ResponseKind,
};
use crate::{
    error::{EngineError, Result},
    instrument::{Instrument, CATALOG},
    midi::{self, Control, DeviceSession, Event, EventKind, Frame, Incoming},
    router::{self, Snapshot},
    sequencer::Intent,
};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, trace, warn};

/// Owns the engine state and the device session. Frames and requests are
/// handled one at a time, so every routing decision sees a consistent
/// snapshot and selections have a single writer.
pub struct Engine<D: DeviceSession> {
    session: D,
    state: EngineState,
    preselection: Preselection,
    frame_rx: midi::Receiver,
    req_rx: RequestListener,
    report_tx: ReportSender,
}

impl<D: DeviceSession> Engine<D> {
    pub fn new(
        session: D,
        frame_rx: midi::Receiver,
        req_rx: RequestListener,
        report_tx: ReportSender,
        preselection: Preselection,
    ) -> Self {
        Self {
            session,
            state: EngineState::default(),
            preselection,
            frame_rx,
            req_rx,
            report_tx,
        }
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn session(&self) -> &D {
        &self.session
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            output_selected: self.state.output.is_some(),
            instrument: self.state.instrument,
        }
    }

    /// Runs until the request channel or the frame channel closes.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                biased;
                incoming = self.frame_rx.recv() => match incoming {
                    Ok(Incoming::Frame(frame)) => {
                        self.process_frame(frame);
                    }
                    Ok(Incoming::Malformed(bytes)) => self.process_malformed(bytes),
                    Err(RecvError::Lagged(count)) => {
                        warn!("Engine lagged behind, {count} MIDI frames dropped");
                        self.report(Report::Lagged(count));
                    }
                    Err(RecvError::Closed) => break,
                },
                req = self.req_rx.recv() => match req {
                    Some((kind, responder)) => self.process_request(kind, responder),
                    None => break,
                },
            }
        }
        info!("Engine stopped");
    }

    pub fn process_frame(&mut self, frame: Frame) -> Delivery {
        let snapshot = self.snapshot();
        let event = Event::decode(frame);
        log_event(&event);
        self.report(Report::Received(event));

        if event.is_unrecognized() {
            warn!("Command code not found: {frame}");
            self.report(Report::Anomaly(frame));
        }

        let frames = router::route(frame, &event, &snapshot);
        self.send_frames(&frames)
    }

    /// Nothing is routed; the message is only reported.
    pub fn process_malformed(&mut self, bytes: Vec<u8>) {
        self.report(Report::Malformed(bytes));
    }

    pub fn handle(&mut self, kind: RequestKind) -> ResponseKind {
        let result = match kind {
            RequestKind::Discover => Ok(self.discover()),
            RequestKind::SelectInput(id) => {
                self.preselection.input = None;
                self.select_input(id)
            }
            RequestKind::SelectOutput(id) => {
                self.preselection.output = None;
                self.select_output(id)
            }
            RequestKind::SelectInstrument(instrument) => self.select_instrument(instrument),
            RequestKind::ApplyCustomInstrument(instrument) => {
                self.perform(Intent::SelectInstrument(instrument))
            }
            RequestKind::ResendInstrument => self.resend_instrument(),
            RequestKind::SetReverb(value) => self.perform(Intent::SetReverb(value)),
            RequestKind::SendNrpn { msb, lsb, value } => {
                self.perform(Intent::SendNrpn { msb, lsb, value })
            }
            RequestKind::GetState => Ok(ResponseKind::State {
                state: self.state.clone(),
                catalog: CATALOG.to_vec(),
            }),
        };

        result.unwrap_or_else(|e| {
            warn!("Request failed: {e}");
            ResponseKind::Failed(e)
        })
    }

    fn process_request(&mut self, kind: RequestKind, responder: Responder) {
        let response = self.handle(kind);
        respond(responder, response);
    }

    fn discover(&mut self) -> ResponseKind {
        info!("MIDI device search started");

        // Reconnected below if it is still there.
        let wanted_input = self
            .state
            .input
            .take()
            .or_else(|| self.preselection.input.clone());
        self.session.disconnect_input();

        let inputs = self.session.list_inputs();
        let outputs = self.session.list_outputs();

        info!("| Available MIDI inputs:");
        for device in &inputs {
            info!("| - {}", device.name);
        }
        info!("| Available MIDI outputs:");
        for device in &outputs {
            info!("| - {}", device.name);
        }

        if inputs.is_empty() {
            warn!("No MIDI devices found");
            self.report(Report::NoDevicesFound);
        }

        if let Some(id) = wanted_input {
            if inputs.iter().any(|device| device.id == id) {
                if let Err(e) = self.select_input(Some(id)) {
                    warn!("Failed to reconnect input: {e}");
                }
            }
        }

        if self.state.output.is_none() {
            if let Some(id) = self.preselection.output.clone() {
                if outputs.iter().any(|device| device.id == id) {
                    if let Err(e) = self.select_output(Some(id)) {
                        warn!("Failed to connect preselected output: {e}");
                    }
                }
            }
        }

        ResponseKind::Devices { inputs, outputs }
    }

    fn select_input(&mut self, id: Option<String>) -> Result<ResponseKind> {
        self.state.input = None;
        match id {
            Some(id) => {
                self.session.connect_input(&id)?;
                info!("Selected input device: {id}");
                self.state.input = Some(id);
            }
            None => {
                self.session.disconnect_input();
                info!("Input device cleared");
            }
        }
        Ok(ResponseKind::Ok)
    }

    fn select_output(&mut self, id: Option<String>) -> Result<ResponseKind> {
        self.state.output = None;
        match id {
            Some(id) => {
                self.session.connect_output(&id)?;
                info!("Selected output device: {id}");
                self.state.output = Some(id);
            }
            None => {
                self.session.disconnect_output();
                info!("Output device cleared");
            }
        }
        Ok(ResponseKind::Ok)
    }

    /// The selection sequence is re-sent only when the selection changes.
    fn select_instrument(&mut self, instrument: Option<Instrument>) -> Result<ResponseKind> {
        let changed = self.state.instrument != instrument;
        self.state.instrument = instrument;
        match instrument {
            Some(instrument) if changed => {
                info!("Selected instrument: {instrument}");
                self.perform(Intent::SelectInstrument(instrument))
            }
            _ => Ok(ResponseKind::Ok),
        }
    }

    fn resend_instrument(&mut self) -> Result<ResponseKind> {
        let instrument = self
            .state
            .instrument
            .ok_or(EngineError::NoInstrumentSelected)?;
        self.perform(Intent::SelectInstrument(instrument))
    }

    fn perform(&mut self, intent: Intent) -> Result<ResponseKind> {
        if self.state.output.is_none() {
            return Err(EngineError::NoDeviceSelected);
        }
        let frames = intent.frames()?;
        if let Intent::SelectInstrument(instrument) = intent {
            let voicing = instrument.resolve();
            debug!(
                "Instrument {instrument}: {} channel(s), layered: {}, bank {}",
                voicing.channel_count,
                voicing.is_layered,
                instrument.bank()
            );
        }
        Ok(ResponseKind::Sent(self.send_frames(&frames)))
    }

    fn send_frames(&mut self, frames: &[Frame]) -> Delivery {
        let mut delivery = Delivery::default();
        for &frame in frames {
            delivery.attempted += 1;
            match self.session.send(frame) {
                Ok(()) => delivery.delivered += 1,
                Err(error) => {
                    warn!("Error sending MIDI message {frame}: {error}");
                    self.report(Report::SendFailed { frame, error });
                }
            }
        }
        delivery
    }

    fn report(&self, report: Report) {
        if self.report_tx.receiver_count() > 0 {
            _ = self.report_tx.send(report);
        }
    }
}

fn log_event(event: &Event) {
    let firmware = event.firmware();
    match event.kind {
        EventKind::NoteOn { note, velocity } => {
            trace!("noteOn: {note} {velocity} ({firmware:?})")
        }
        EventKind::NoteOff { note, velocity } => {
            trace!("noteOff: {note} {velocity} ({firmware:?})")
        }
        EventKind::Controller {
            control: Control::KeyPressed,
            value,
        } => trace!("Key pressed: {value}"),
        EventKind::Controller {
            control: Control::KeyReleased,
            value,
        } => trace!("Key released: {value}"),
        EventKind::Controller { control, value } => {
            trace!("Controller {}: {value}", control.as_number())
        }
        EventKind::ProgramChange { program } => trace!("Program change: {program}"),
        EventKind::Unrecognized { .. } => {}
    }
}

fn respond(responder: Responder, response_kind: ResponseKind) {
    if let Err(e) = responder.send(response_kind) {
        error!("Failed to send a response: {e:?}");
    }
}
