//! Playback tests: position map and scheduled frames for the sample charts.

use chartlib::playback::{FrameSink, Frame, PlaybackSession, Scheduler};
use chartlib::{
    generate_position_map, load_chart_file, load_chart_json, position_map_to_json, Document, Platform,
};
use std::path::PathBuf;
use std::time::{Duration, Instant};

fn charts_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("charts")
}

#[test]
fn position_map_basic() {
    let chart = load_chart_file(charts_dir().join("basic.json"), Platform::Windows)
        .expect("Failed to load basic.json");
    let map = generate_position_map(&chart);

    assert_eq!(map.notes.len(), 5);
    assert_eq!(map.events.len(), 2);
    assert_eq!(map.path.len(), 3, "origin, wait node, fade note");

    // Notes come out in playback order with non-decreasing times
    for pair in map.notes.windows(2) {
        assert!(pair[0].final_time <= pair[1].final_time);
    }
    assert_eq!(map.notes[0].display_time, "0:00.000");
    assert_eq!(map.notes[4].display_time, "0:02.000");
    assert!((map.end_time - 2.0).abs() < 1e-9);

    let json = position_map_to_json(&map);
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["notes"][1]["noteType"], "tab");
    assert_eq!(value["events"][0]["eventId"], "zoom");
    println!("✓ Position map basic: {} bytes of JSON", json.len());
}

#[test]
fn position_map_sections_respects_pre_delay() {
    let chart = load_chart_file(charts_dir().join("sections.json"), Platform::Windows).unwrap();
    let map = generate_position_map(&chart);

    let origin = map.notes.iter().find(|n| n.index == 0).unwrap();
    assert_eq!(origin.final_time, 0.0);
    assert_eq!((origin.x, origin.y), (Some(0.0), Some(0.0)));

    let section_tab = map.notes.iter().find(|n| n.index == 2).unwrap();
    assert!((section_tab.final_time - 0.7).abs() < 1e-9);
    assert_eq!(section_tab.display_time, "0:00.700");
}

/// Counts triggers per note and how often playback stopped.
#[derive(Default)]
struct Recorder {
    note_hits: Vec<usize>,
    event_hits: Vec<usize>,
    stops: usize,
}

impl FrameSink for Recorder {
    fn on_frame(&mut self, frame: &Frame) {
        self.note_hits.extend(&frame.triggered_notes);
        self.event_hits.extend(&frame.triggered_events);
    }

    fn on_stop(&mut self) {
        self.stops += 1;
    }
}

#[test]
fn scheduler_plays_basic_chart_once_through() {
    let chart = load_chart_file(charts_dir().join("basic.json"), Platform::Windows).unwrap();
    let mut scheduler = Scheduler::new(PlaybackSession::new(&chart), Recorder::default());

    let t0 = Instant::now();
    scheduler.start_at(t0, 0.0);
    let mut ms = 0;
    while scheduler.tick_at(t0 + Duration::from_millis(ms)) {
        ms += 16;
        assert!(ms < 10_000, "playback never finished");
    }

    let recorder = scheduler.into_sink();
    let mut hits = recorder.note_hits.clone();
    hits.sort_unstable();
    assert_eq!(hits, vec![0, 1, 2, 3, 4]);
    assert_eq!(recorder.note_hits, vec![0, 1, 2, 3, 4], "notes trigger in time order");
    assert_eq!(recorder.event_hits, vec![0, 1]);
    assert_eq!(recorder.stops, 1);
}

#[test]
fn starting_mid_chart_triggers_earlier_notes_at_once() {
    let chart = load_chart_file(charts_dir().join("basic.json"), Platform::Windows).unwrap();
    let mut session = PlaybackSession::new(&chart);
    let frame = session.tick(1.2);

    assert_eq!(frame.triggered_notes, vec![0, 1, 2]);
    assert_eq!(frame.triggered_events, vec![0]);
    // Stationary until the wait node, so the cursor is still at the origin.
    assert_eq!(frame.position.map(|p| (p.x, p.y)), Some((0.0, 0.0)));
}

#[test]
fn partially_indexed_file_matches_document_timeline() {
    let text = r#"[
        {"type": "direction", "beat": 0, "direction": "right"},
        {"type": "tab", "beat": 16, "beatReset": true, "sectionIndex": 0},
        {"type": "tab", "beat": 0}
    ]"#;
    let chart = load_chart_json(text, Platform::Windows).unwrap();
    let map = generate_position_map(&chart);
    let doc = Document::new(chart);

    let mapped = map.notes.iter().find(|n| n.index == 2).unwrap();
    let edited = doc.timeline().note(2).unwrap();
    assert_eq!(mapped.final_time, edited.final_time);
    assert!((mapped.final_time - 0.5).abs() < 1e-9);
}

#[test]
fn scheduler_started_mid_chart_skips_earlier_notes() {
    let chart = load_chart_file(charts_dir().join("basic.json"), Platform::Windows).unwrap();
    let mut scheduler = Scheduler::new(PlaybackSession::new(&chart), Recorder::default());

    let t0 = Instant::now();
    scheduler.start_at(t0, 1.2);
    assert!(scheduler.tick_at(t0));
    assert!(scheduler.sink().note_hits.is_empty());
    assert!(scheduler.sink().event_hits.is_empty());

    let mut ms = 0;
    while scheduler.tick_at(t0 + Duration::from_millis(ms)) {
        ms += 16;
        assert!(ms < 10_000, "playback never finished");
    }
    let recorder = scheduler.into_sink();
    assert_eq!(recorder.note_hits, vec![3, 4]);
    assert_eq!(recorder.event_hits, vec![1]);
}
