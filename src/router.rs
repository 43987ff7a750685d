use crate::{
    instrument::{Instrument, LAYER_COUNT},
    midi::{
        frame::{Frame, CONTROL_CHANGE, NOTE_OFF, NOTE_ON},
        Control, Event, EventKind,
    },
};
use serde::{Deserialize, Serialize};

/// The part of the engine state a routing decision depends on, read
/// together once per event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub output_selected: bool,
    pub instrument: Option<Instrument>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// No output, or no instrument yet.
    Consume,
    PassThrough,
    FanOut,
}

impl Snapshot {
    pub fn route_kind(&self) -> Route {
        match (self.output_selected, self.instrument) {
            (true, Some(instrument)) if instrument.is_layered() => Route::FanOut,
            (true, Some(_)) => Route::PassThrough,
            _ => Route::Consume,
        }
    }
}

/// Frames to send for one received frame, in send order.
pub fn route(frame: Frame, event: &Event, snapshot: &Snapshot) -> Vec<Frame> {
    match snapshot.route_kind() {
        Route::Consume => vec![],
        Route::PassThrough => vec![frame],
        Route::FanOut => fan_out(&event.kind),
    }
}

fn fan_out(kind: &EventKind) -> Vec<Frame> {
    match *kind {
        EventKind::NoteOn { note, velocity } => layers(NOTE_ON, note, velocity),
        EventKind::NoteOff { note, velocity } => layers(NOTE_OFF, note, velocity),
        EventKind::Controller {
            control: Control::Expression,
            value,
        } => layers(CONTROL_CHANGE, Control::Expression.as_number(), value),
        EventKind::Controller { .. }
        | EventKind::ProgramChange { .. }
        | EventKind::Unrecognized { .. } => vec![],
    }
}

fn layers(command: u8, data1: u8, data2: u8) -> Vec<Frame> {
    (0..LAYER_COUNT)
        .map(|channel| Frame::new(command + channel, data1, data2))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(output_selected: bool, instrument: Option<u32>) -> Snapshot {
        Snapshot {
            output_selected,
            instrument: instrument.map(Instrument),
        }
    }

    fn route_bytes(bytes: [u8; 3], snapshot: &Snapshot) -> Vec<Frame> {
        let frame = Frame::new(bytes[0], bytes[1], bytes[2]);
        route(frame, &Event::decode(frame), snapshot)
    }

    #[test]
    fn layered_note_on_fans_out() {
        let frames = route_bytes([144, 60, 100], &snapshot(true, Some(130)));
        let expected: Vec<Frame> = (0x90..=0x94u8)
            .map(|status| Frame::new(status, 60, 100))
            .collect();
        assert_eq!(frames, expected);
    }

    #[test]
    fn layered_fan_out_ignores_input_generation() {
        let old = route_bytes([144, 60, 100], &snapshot(true, Some(128)));
        let new = route_bytes([151, 60, 100], &snapshot(true, Some(128)));
        assert_eq!(old, new);
    }

    #[test]
    fn layered_note_off_fans_out() {
        let frames = route_bytes([135, 62, 0], &snapshot(true, Some(129)));
        assert_eq!(frames.len(), 5);
        for (i, frame) in frames.iter().enumerate() {
            assert_eq!(*frame, Frame::new(0x80 + i as u8, 62, 0));
        }
    }

    #[test]
    fn layered_expression_fans_out() {
        let frames = route_bytes([183, 7, 90], &snapshot(true, Some(128)));
        assert_eq!(
            frames,
            vec![
                Frame::new(0xB0, 7, 90),
                Frame::new(0xB1, 7, 90),
                Frame::new(0xB2, 7, 90),
                Frame::new(0xB3, 7, 90),
                Frame::new(0xB4, 7, 90),
            ]
        );
    }

    #[test]
    fn layered_key_events_are_not_forwarded() {
        let layered = snapshot(true, Some(128));
        assert!(route_bytes([176, 14, 3], &layered).is_empty());
        assert!(route_bytes([176, 15, 3], &layered).is_empty());
        assert!(route_bytes([0xC0, 3, 0], &layered).is_empty());
        assert!(route_bytes([0xF8, 0, 0], &layered).is_empty());
    }

    #[test]
    fn simple_instrument_passes_through_unchanged() {
        let piano = snapshot(true, Some(0));
        assert_eq!(
            route_bytes([144, 60, 100], &piano),
            vec![Frame::new(144, 60, 100)]
        );
        assert_eq!(
            route_bytes([151, 60, 100], &piano),
            vec![Frame::new(151, 60, 100)]
        );
        assert_eq!(
            route_bytes([176, 14, 3], &piano),
            vec![Frame::new(176, 14, 3)]
        );
    }

    #[test]
    fn threshold_is_128() {
        assert_eq!(snapshot(true, Some(127)).route_kind(), Route::PassThrough);
        assert_eq!(snapshot(true, Some(128)).route_kind(), Route::FanOut);
    }

    #[test]
    fn no_output_consumes() {
        assert!(route_bytes([144, 60, 100], &snapshot(false, Some(0))).is_empty());
        assert!(route_bytes([144, 60, 100], &snapshot(false, Some(130))).is_empty());
    }

    #[test]
    fn no_instrument_consumes() {
        assert!(route_bytes([144, 60, 100], &snapshot(true, None)).is_empty());
    }
}
