//! Chart validation.
//!
//! Problems are collected as human-readable strings and never returned as
//! `Err`: the caller decides whether an error blocks an action. Warnings
//! never block export or save.

use log::debug;
use serde::Serialize;

use crate::events::check_param_value;
use crate::model::{Chart, Direction, Event, Note, NoteType};
use crate::timemap::{is_path_origin, Timeline};

/// Result of validating a chart.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }
}

fn is_positive(value: f64) -> bool {
    value > 0.0
}

/// Structural errors of a single note. `index` is only used for messages.
pub fn validate_note(index: usize, note: &Note) -> Vec<String> {
    let mut errors = Vec::new();
    let label = format!("Note {} ({:?} at beat {})", index + 1, note.note_type, note.beat);

    if note.note_type.requires_direction() && note.direction == Direction::None {
        errors.push(format!("{label}: direction is required"));
    }
    if (note.is_long || note.note_type.is_long()) && note.long_time <= 0.0 {
        errors.push(format!("{label}: long duration must be greater than 0"));
    }
    if !note.beat.is_finite() {
        errors.push(format!("{label}: beat is not a finite number"));
    }
    if let Some(bpm) = note.bpm {
        if !is_positive(bpm) {
            errors.push(format!("{label}: BPM override must be positive"));
        }
    }
    if note.subdivisions == Some(0) {
        errors.push(format!("{label}: subdivisions override must be positive"));
    }

    errors
}

/// Structural errors of a single event.
pub fn validate_event(index: usize, event: &Event) -> Vec<String> {
    let mut errors = Vec::new();
    let label = format!("Event {} ({})", index + 1, event.label());

    if event.event_id.trim().is_empty() {
        errors.push(format!("{label}: event id is empty"));
    }
    if event.event_time.is_nan() || event.event_time < 0.0 {
        errors.push(format!("{label}: event time must be 0 or later"));
    }
    for param in &event.event_params {
        if param.param_name.trim().is_empty() {
            errors.push(format!("{label}: parameter name is empty"));
            continue;
        }
        if let Err(reason) = check_param_value(param.param_type, &param.param_value) {
            errors.push(format!("{label}: parameter '{}': {reason}", param.param_name));
        }
    }

    errors
}

/// Validate a whole chart: global timing, origin invariant, every note and
/// event, then the semantic warnings.
pub fn validate_chart(chart: &Chart) -> ValidationReport {
    let mut report = ValidationReport::default();

    if !is_positive(chart.bpm) {
        report.errors.push("Chart BPM must be positive".to_string());
    }
    if chart.subdivisions == 0 {
        report.errors.push("Chart subdivisions must be positive".to_string());
    }
    if !is_positive(chart.speed_multiplier) {
        report.errors.push("Speed multiplier must be positive".to_string());
    }
    if !report.errors.is_empty() {
        // Timing is meaningless without valid globals.
        return report;
    }

    for (i, note) in chart.notes.iter().enumerate() {
        report.errors.extend(validate_note(i, note));
        if note.wait && note.note_type != NoteType::Node {
            report.warnings.push(format!(
                "Note {}: wait only applies to node notes and is ignored",
                i + 1
            ));
        }
    }
    for (i, event) in chart.events.iter().enumerate() {
        report.errors.extend(validate_event(i, event));
        report.warnings.extend(duplicate_param_warnings(i, event));
    }

    let timeline = Timeline::compute(chart);
    let origins = chart
        .notes
        .iter()
        .zip(timeline.note_timings())
        .filter(|(note, timing)| is_path_origin(note, timing.section_offset))
        .count();
    match origins {
        0 => report
            .errors
            .push("Chart needs a direction note at beat 0 as the path origin".to_string()),
        1 => {}
        n => report
            .errors
            .push(format!("Chart has {n} direction notes at beat 0; exactly one is allowed")),
    }

    report.warnings.extend(long_note_overlaps(chart, &timeline));

    debug!(
        "validation: {} errors, {} warnings",
        report.errors.len(),
        report.warnings.len()
    );
    report
}

fn duplicate_param_warnings(index: usize, event: &Event) -> Vec<String> {
    let mut seen: Vec<&str> = Vec::new();
    let mut warnings = Vec::new();
    for param in &event.event_params {
        let name = param.param_name.as_str();
        if seen.contains(&name) {
            warnings.push(format!(
                "Event {} ({}): parameter '{name}' appears more than once",
                index + 1,
                event.label()
            ));
        } else {
            seen.push(name);
        }
    }
    warnings
}

/// Notes that start while a long note is still held.
fn long_note_overlaps(chart: &Chart, timeline: &Timeline) -> Vec<String> {
    let timings = timeline.note_timings();
    let mut warnings = Vec::new();

    for (i, long) in timings.iter().enumerate() {
        if long.long_time <= 0.0 {
            continue;
        }
        let start = long.final_time;
        let end = start + long.long_time;
        for (j, other) in timings.iter().enumerate() {
            if j == i {
                continue;
            }
            // Path notes never collide with a held note in gameplay.
            if chart.notes[j].note_type == NoteType::Node {
                continue;
            }
            if other.final_time > start && other.final_time < end {
                warnings.push(format!(
                    "Note {} starts at {:.3}s while long note {} is held until {:.3}s",
                    j + 1,
                    other.final_time,
                    i + 1,
                    end
                ));
            }
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EventParam, EventType, ParamType};
    use crate::timemap::assign_section_indices;

    fn chart(notes: Vec<Note>) -> Chart {
        let mut chart = Chart::new(120.0, 16);
        chart.notes = notes;
        assign_section_indices(&mut chart.notes);
        chart
    }

    #[test]
    fn valid_chart_has_no_errors() {
        let chart = chart(vec![
            Note::direction(0.0, Direction::Right),
            Note::tab(16.0),
            Note::long(NoteType::LongDirection, 32.0, Direction::Up, 8.0),
        ]);
        let report = validate_chart(&chart);
        assert!(report.is_clean(), "{report:?}");
    }

    #[test]
    fn missing_direction_and_bad_long_duration() {
        let chart = chart(vec![
            Note::direction(0.0, Direction::Right),
            Note::new(NoteType::Both, 8.0),
            Note::long(NoteType::LongTab, 16.0, Direction::None, 0.0),
        ]);
        let report = validate_chart(&chart);
        assert_eq!(report.errors.len(), 2, "{:?}", report.errors);
        assert!(report.errors[0].contains("direction is required"));
        assert!(report.errors[1].contains("long duration"));
    }

    #[test]
    fn origin_must_exist_exactly_once() {
        let none = chart(vec![Note::tab(0.0)]);
        assert!(validate_chart(&none).errors[0].contains("path origin"));

        let two = chart(vec![
            Note::direction(0.0, Direction::Right),
            Note::direction(0.0, Direction::Up),
        ]);
        assert!(validate_chart(&two).errors[0].contains("exactly one"));

        // A beat-0 direction note after a reset belongs to another section.
        let sections = chart(vec![
            Note::direction(0.0, Direction::Right),
            Note::tab(16.0).with_beat_reset(),
            Note::direction(0.0, Direction::Up),
        ]);
        assert!(validate_chart(&sections).is_ok());
    }

    #[test]
    fn long_overlap_is_a_warning() {
        let chart = chart(vec![
            Note::direction(0.0, Direction::Right),
            Note::long(NoteType::LongTab, 16.0, Direction::None, 16.0),
            Note::tab(24.0),
        ]);
        let report = validate_chart(&chart);
        assert!(report.is_ok());
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].starts_with("Note 3"));
    }

    #[test]
    fn malformed_event_params_are_errors() {
        let mut chart = chart(vec![Note::direction(0.0, Direction::Right)]);
        let mut event = Event::from_catalog(EventType::Camera, "zoom", 1.0);
        event.set_param("scale", "big");
        event.event_params.push(EventParam {
            param_type: ParamType::Float,
            param_name: "scale".to_string(),
            param_value: "2".to_string(),
        });
        chart.events.push(event);

        let report = validate_chart(&chart);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("'scale'"));
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("more than once"));
    }

    #[test]
    fn invalid_globals_short_circuit() {
        let mut chart = chart(vec![Note::direction(0.0, Direction::Right)]);
        chart.bpm = 0.0;
        let report = validate_chart(&chart);
        assert_eq!(report.errors, vec!["Chart BPM must be positive".to_string()]);
    }
}
