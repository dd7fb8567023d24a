//! Playback: the position map handed to the UI layer, plus the real-time
//! pieces that drive a preview.
//!
//! The cursor is always placed by the same sampler the SVG export uses:
//!   `position = timeline.position_at_time(transport.time())`
//!
//! [`Transport`] owns the clock and recomputes the playhead from an
//! [`Instant`] anchor every time it is read. [`PlaybackSession`] turns a
//! playhead time into a [`Frame`] from a timeline snapshot. [`Scheduler`]
//! only glues the two to a [`FrameSink`].

use std::collections::HashSet;
use std::time::Instant;

use log::debug;
use serde::Serialize;

use crate::model::{Chart, EventType, NoteType};
use crate::path::Vec2;
use crate::timemap::Timeline;
use crate::timing::time_to_grid_beat;

// ═══════════════════════════════════════════════════════════════════════
// Position map
// ═══════════════════════════════════════════════════════════════════════

/// Everything the UI needs to place notes, events and the cursor.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionMap {
    pub notes: Vec<NotePosition>,
    pub events: Vec<EventPosition>,
    /// Path vertices in playback order
    pub path: Vec<PathVertex>,
    /// Latest note time including long-note tails (seconds)
    pub end_time: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotePosition {
    /// Index into the chart's note list
    pub index: usize,
    pub note_type: NoteType,
    /// `None` when the chart has no path to place it on
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub final_time: f64,
    /// `m:ss.mmm`
    pub display_time: String,
    /// Seconds; 0 when not long
    pub long_time: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPosition {
    pub index: usize,
    pub event_type: EventType,
    pub event_id: String,
    pub event_time: f64,
    pub x: Option<f64>,
    pub y: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathVertex {
    pub note_index: usize,
    pub time: f64,
    pub x: f64,
    pub y: f64,
}

/// Build the position map for a chart.
///
/// Notes are listed in playback order. A chart without path notes has no
/// positions to offer; its entries carry `null` coordinates.
pub fn generate_position_map(chart: &Chart) -> PositionMap {
    let timeline = Timeline::compute(chart);
    let at = |seconds: f64| timeline.position_at_time(seconds);

    let notes = timeline
        .notes_by_time()
        .into_iter()
        .filter_map(|index| {
            let timing = timeline.note(index)?;
            let pos = at(timing.final_time);
            Some(NotePosition {
                index,
                note_type: chart.notes[index].note_type,
                x: pos.map(|p| p.x),
                y: pos.map(|p| p.y),
                final_time: timing.final_time,
                display_time: timeline.display_time(index)?,
                long_time: timing.long_time,
            })
        })
        .collect();

    let events = chart
        .events
        .iter()
        .enumerate()
        .map(|(index, event)| {
            let pos = at(event.event_time);
            EventPosition {
                index,
                event_type: event.event_type,
                event_id: event.event_id.clone(),
                event_time: event.event_time,
                x: pos.map(|p| p.x),
                y: pos.map(|p| p.y),
            }
        })
        .collect();

    let path = timeline
        .path()
        .points()
        .iter()
        .map(|p| PathVertex {
            note_index: p.note_index,
            time: p.time,
            x: p.position.x,
            y: p.position.y,
        })
        .collect();

    PositionMap {
        notes,
        events,
        path,
        end_time: timeline.end_time(),
    }
}

/// Serialize a PositionMap to JSON.
pub fn position_map_to_json(map: &PositionMap) -> String {
    serde_json::to_string(map).unwrap_or_else(|_| "{}".to_string())
}

// ═══════════════════════════════════════════════════════════════════════
// Transport
// ═══════════════════════════════════════════════════════════════════════

/// Playback clock. While playing, the time is `offset + (now - anchor)`,
/// recomputed on every read so it never drifts.
#[derive(Debug, Clone, Default)]
pub struct Transport {
    anchor: Option<Instant>,
    offset: f64,
}

impl Transport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_playing(&self) -> bool {
        self.anchor.is_some()
    }

    pub fn play(&mut self) {
        self.play_at(Instant::now());
    }

    pub fn play_at(&mut self, now: Instant) {
        if self.anchor.is_none() {
            self.anchor = Some(now);
        }
    }

    pub fn pause(&mut self) {
        self.pause_at(Instant::now());
    }

    pub fn pause_at(&mut self, now: Instant) {
        self.offset = self.time_at(now);
        self.anchor = None;
    }

    /// Jump to `seconds`, keeping the play/pause state.
    pub fn seek_at(&mut self, now: Instant, seconds: f64) {
        self.offset = seconds;
        if self.anchor.is_some() {
            self.anchor = Some(now);
        }
    }

    pub fn stop(&mut self) {
        self.anchor = None;
        self.offset = 0.0;
    }

    pub fn time(&self) -> f64 {
        self.time_at(Instant::now())
    }

    pub fn time_at(&self, now: Instant) -> f64 {
        match self.anchor {
            Some(anchor) => self.offset + now.saturating_duration_since(anchor).as_secs_f64(),
            None => self.offset,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Session
// ═══════════════════════════════════════════════════════════════════════

/// One rendered moment of playback.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    pub time: f64,
    /// Chart-global grid beat, rounded, for display
    pub grid_beat: i64,
    pub position: Option<Vec2>,
    /// Note indices reached since the previous frame
    pub triggered_notes: Vec<usize>,
    /// Event indices reached since the previous frame
    pub triggered_events: Vec<usize>,
}

/// Playback state over a timeline snapshot. Only the hit-sets change as
/// frames are produced.
#[derive(Debug, Clone)]
pub struct PlaybackSession {
    timeline: Timeline,
    event_times: Vec<f64>,
    hit_notes: HashSet<usize>,
    hit_events: HashSet<usize>,
}

impl PlaybackSession {
    pub fn new(chart: &Chart) -> Self {
        Self {
            timeline: Timeline::compute(chart),
            event_times: chart.events.iter().map(|e| e.event_time).collect(),
            hit_notes: HashSet::new(),
            hit_events: HashSet::new(),
        }
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Time after which nothing else can trigger.
    pub fn end_time(&self) -> f64 {
        self.event_times
            .iter()
            .copied()
            .fold(self.timeline.end_time(), f64::max)
    }

    /// Produce the frame for playhead `time`, marking every note and event
    /// at or before it as triggered.
    pub fn tick(&mut self, time: f64) -> Frame {
        let ctx = self.timeline.context();

        let mut triggered_notes = Vec::new();
        for index in self.timeline.notes_by_time() {
            let Some(timing) = self.timeline.note(index) else {
                continue;
            };
            if timing.final_time > time {
                break;
            }
            if self.hit_notes.insert(index) {
                triggered_notes.push(index);
            }
        }

        let mut triggered_events = Vec::new();
        for (index, &event_time) in self.event_times.iter().enumerate() {
            if event_time <= time && self.hit_events.insert(index) {
                triggered_events.push(index);
            }
        }

        Frame {
            time,
            grid_beat: time_to_grid_beat(time, ctx.bpm, ctx.subdivisions as f64),
            position: self.timeline.position_at_time(time),
            triggered_notes,
            triggered_events,
        }
    }

    /// Forget what was triggered so the next run triggers again.
    pub fn reset(&mut self) {
        self.hit_notes.clear();
        self.hit_events.clear();
    }

    /// Reset, then mark everything strictly before `time` as already
    /// triggered so playback started there only reports what lies ahead.
    pub fn seek(&mut self, time: f64) {
        self.reset();
        for (index, timing) in self.timeline.note_timings().iter().enumerate() {
            if timing.final_time < time {
                self.hit_notes.insert(index);
            }
        }
        for (index, &event_time) in self.event_times.iter().enumerate() {
            if event_time < time {
                self.hit_events.insert(index);
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Scheduler
// ═══════════════════════════════════════════════════════════════════════

/// Receiver of playback frames (canvas redraw, audio cues, ...).
pub trait FrameSink {
    fn on_frame(&mut self, frame: &Frame);

    fn on_stop(&mut self) {}
}

impl FrameSink for Vec<Frame> {
    fn on_frame(&mut self, frame: &Frame) {
        self.push(frame.clone());
    }
}

/// Drives a session from a transport and forwards each frame to a sink.
pub struct Scheduler<S: FrameSink> {
    transport: Transport,
    session: PlaybackSession,
    sink: S,
}

impl<S: FrameSink> Scheduler<S> {
    pub fn new(session: PlaybackSession, sink: S) -> Self {
        Self {
            transport: Transport::new(),
            session,
            sink,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    pub fn is_running(&self) -> bool {
        self.transport.is_playing()
    }

    pub fn start(&mut self) {
        self.start_at(Instant::now(), 0.0);
    }

    /// Start playing from `from_seconds`.
    pub fn start_at(&mut self, now: Instant, from_seconds: f64) {
        self.session.seek(from_seconds);
        self.transport.seek_at(now, from_seconds);
        self.transport.play_at(now);
        debug!("playback started at {from_seconds:.3}s");
    }

    pub fn tick(&mut self) -> bool {
        self.tick_at(Instant::now())
    }

    /// Emit one frame. Returns false once the playhead has passed the last
    /// note or event (the scheduler stops itself) or if it is not running.
    pub fn tick_at(&mut self, now: Instant) -> bool {
        if !self.transport.is_playing() {
            return false;
        }
        let time = self.transport.time_at(now);
        let frame = self.session.tick(time);
        self.sink.on_frame(&frame);

        if time > self.session.end_time() {
            self.stop();
            return false;
        }
        true
    }

    /// Cancel playback and clear the hit-sets.
    pub fn stop(&mut self) {
        self.transport.stop();
        self.session.reset();
        self.sink.on_stop();
        debug!("playback stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Direction, Event, Note};
    use std::time::Duration;

    fn chart() -> Chart {
        let mut chart = Chart::new(120.0, 16);
        chart.notes = vec![
            Note::direction(0.0, Direction::Right),
            Note::tab(16.0),
            Note::direction(32.0, Direction::Up),
        ];
        chart.events.push(Event::from_catalog(EventType::Camera, "zoom", 0.75));
        chart
    }

    #[test]
    fn position_map_lists_notes_by_time() {
        let map = generate_position_map(&chart());
        let order: Vec<_> = map.notes.iter().map(|n| n.index).collect();
        assert_eq!(order, vec![0, 1, 2]);
        // 0.4 * 120 = 48 units/s to the right.
        assert!((map.notes[1].x.unwrap() - 24.0).abs() < 1e-9);
        assert_eq!(map.notes[1].display_time, "0:00.500");
        assert!((map.events[0].x.unwrap() - 36.0).abs() < 1e-9);
        assert_eq!(map.path.len(), 2);
        assert_eq!(map.end_time, 1.0);

        let json = position_map_to_json(&map);
        assert!(json.contains("\"displayTime\":\"0:00.500\""));
    }

    #[test]
    fn position_map_without_path_has_no_coordinates() {
        let mut chart = Chart::new(120.0, 16);
        chart.notes = vec![Note::tab(16.0)];
        chart.events.push(Event::from_catalog(EventType::Camera, "zoom", 0.25));

        let map = generate_position_map(&chart);
        assert!(map.path.is_empty());
        assert_eq!((map.notes[0].x, map.notes[0].y), (None, None));
        assert_eq!((map.events[0].x, map.events[0].y), (None, None));

        let value: serde_json::Value =
            serde_json::from_str(&position_map_to_json(&map)).unwrap();
        assert!(value["notes"][0]["x"].is_null());
        assert!(value["events"][0]["y"].is_null());
    }

    #[test]
    fn seek_skips_everything_before_start() {
        let mut session = PlaybackSession::new(&chart());
        session.seek(0.6);
        let frame = session.tick(0.6);
        assert!(frame.triggered_notes.is_empty());
        assert!(frame.triggered_events.is_empty());
        assert_eq!(session.tick(1.0).triggered_notes, vec![2]);
    }

    #[test]
    fn transport_recomputes_from_anchor() {
        let t0 = Instant::now();
        let mut transport = Transport::new();
        transport.play_at(t0);
        assert!((transport.time_at(t0 + Duration::from_millis(250)) - 0.25).abs() < 1e-9);

        transport.pause_at(t0 + Duration::from_millis(500));
        assert!(!transport.is_playing());
        assert!((transport.time_at(t0 + Duration::from_secs(9)) - 0.5).abs() < 1e-9);

        transport.seek_at(t0, 2.0);
        assert_eq!(transport.time_at(t0), 2.0);
        transport.stop();
        assert_eq!(transport.time_at(t0), 0.0);
    }

    #[test]
    fn session_triggers_each_note_once() {
        let mut session = PlaybackSession::new(&chart());
        let first = session.tick(0.6);
        assert_eq!(first.triggered_notes, vec![0, 1]);
        assert!(first.triggered_events.is_empty());
        assert_eq!(first.grid_beat, 19);

        let second = session.tick(0.8);
        assert!(second.triggered_notes.is_empty());
        assert_eq!(second.triggered_events, vec![0]);

        session.reset();
        assert_eq!(session.tick(0.8).triggered_notes, vec![0, 1]);
    }

    #[test]
    fn scheduler_forwards_frames_and_stops_after_end() {
        let t0 = Instant::now();
        let mut scheduler = Scheduler::new(PlaybackSession::new(&chart()), Vec::new());
        scheduler.start_at(t0, 0.0);
        assert!(scheduler.tick_at(t0 + Duration::from_millis(100)));
        assert!(scheduler.tick_at(t0 + Duration::from_millis(600)));
        assert!(!scheduler.tick_at(t0 + Duration::from_millis(1500)));
        assert!(!scheduler.is_running());

        let frames = scheduler.into_sink();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].triggered_notes, vec![0]);
        assert_eq!(frames[1].triggered_notes, vec![1]);
        assert_eq!(frames[2].triggered_notes, vec![2]);
    }

    #[test]
    fn restart_after_stop_triggers_again() {
        let t0 = Instant::now();
        let mut scheduler = Scheduler::new(PlaybackSession::new(&chart()), Vec::new());
        scheduler.start_at(t0, 0.0);
        scheduler.tick_at(t0 + Duration::from_millis(600));
        scheduler.stop();
        assert!(!scheduler.tick_at(t0 + Duration::from_millis(700)));

        scheduler.start_at(t0, 0.0);
        scheduler.tick_at(t0 + Duration::from_millis(600));
        let frames = scheduler.into_sink();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].triggered_notes, frames[1].triggered_notes);
    }
}
