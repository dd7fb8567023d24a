//! Compute absolute times for every note in a chart.  This is the bridge
//! between the editable note list and everything that needs wall-clock
//! time (path, playback, export). It answers "where does each section
//! start?" and "when does each note happen?".
//!
//! The results live in a [`Timeline`], a derived table indexed by note
//! position in the snapshot it was computed from. Notes themselves are
//! never written to here; the only mutating operation is
//! [`assign_section_indices`], which the document calls after edits and
//! the loaders call (through [`normalize_section_indices`]) on read.

use std::collections::HashMap;

use log::debug;
use serde::Serialize;

use crate::model::{Chart, Note, NoteType};
use crate::path::{ChartPath, Vec2};
use crate::timing::{long_note_time, TimingContext};

/// Derived timing for one note.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteTiming {
    /// Absolute start time of the note's section (seconds)
    pub section_offset: f64,
    /// Section offset + the note's own beat time, before pre-delay
    pub original_time: f64,
    /// Playback time: original time + pre-delay (0 for the path origin)
    pub final_time: f64,
    /// `final_time` re-expressed in chart-global beats
    pub path_beat: f64,
    /// Long-note duration in seconds (0 when not long)
    pub long_time: f64,
}

/// Assign `section_index` to every note in canonical order.
///
/// A note's section is the number of `beat_reset` notes strictly before it;
/// the reset note itself closes its own section. Running this twice gives
/// the same result.
pub fn assign_section_indices(notes: &mut [Note]) {
    let mut section = 0usize;
    for note in notes.iter_mut() {
        note.section_index = Some(section);
        if note.beat_reset {
            section += 1;
        }
    }
}

/// Bring loaded notes in line with what [`assign_section_indices`] would
/// produce. Files may carry partial or stale indices; every loader runs
/// this so all readers of a chart derive the same section offsets.
///
/// Returns whether any index changed.
pub fn normalize_section_indices(notes: &mut [Note]) -> bool {
    let before: Vec<_> = notes.iter().map(|n| n.section_index).collect();
    assign_section_indices(notes);
    let changed = notes
        .iter()
        .zip(&before)
        .any(|(n, old)| n.section_index != *old);
    if changed {
        debug!("section indices rewritten from note order");
    }
    changed
}

/// Absolute start time of each note's section, parallel to `notes`.
///
/// Uses `section_index` when any note carries one. Charts saved before
/// section indices existed fall back to a running total in array order,
/// which is only correct while that order is untouched.
pub fn section_offsets(notes: &[Note], ctx: &TimingContext) -> Vec<f64> {
    if notes.iter().any(|n| n.section_index.is_some()) {
        let starts = section_start_times(notes, ctx);
        notes
            .iter()
            .map(|n| {
                starts
                    .get(&n.section_index.unwrap_or(0))
                    .copied()
                    .unwrap_or(0.0)
            })
            .collect()
    } else {
        if notes.iter().any(|n| n.beat_reset) {
            debug!("no section indices present, using array-order section offsets");
        }
        legacy_section_offsets(notes, ctx)
    }
}

/// Map of section index → absolute start time.
///
/// Each reset note records the start of the section after its own, once;
/// later resets in the same section do not advance it again.
pub fn section_start_times(notes: &[Note], ctx: &TimingContext) -> HashMap<usize, f64> {
    let mut starts = HashMap::new();
    starts.insert(0usize, 0.0);

    for note in notes.iter().filter(|n| n.beat_reset) {
        let section = note.section_index.unwrap_or(0);
        let start = starts.get(&section).copied().unwrap_or(0.0);
        starts
            .entry(section + 1)
            .or_insert(start + ctx.note_beat_time(note));
    }

    starts
}

fn legacy_section_offsets(notes: &[Note], ctx: &TimingContext) -> Vec<f64> {
    let mut running = 0.0;
    let mut offsets = Vec::with_capacity(notes.len());
    for note in notes {
        offsets.push(running);
        if note.beat_reset {
            running += ctx.note_beat_time(note);
        }
    }
    offsets
}

/// Whether `note` is the chart's path origin: a direction note at beat 0
/// in the first section.
pub fn is_path_origin(note: &Note, section_offset: f64) -> bool {
    note.note_type == NoteType::Direction && note.beat == 0.0 && section_offset == 0.0
}

/// Section offset + beat time, before pre-delay.
pub fn original_time(note: &Note, section_offset: f64, ctx: &TimingContext) -> f64 {
    section_offset + ctx.note_beat_time(note)
}

/// Playback time of a note. The path origin is pinned to 0.
pub fn final_time(note: &Note, section_offset: f64, ctx: &TimingContext) -> f64 {
    if is_path_origin(note, section_offset) {
        0.0
    } else {
        original_time(note, section_offset, ctx) + ctx.pre_delay_seconds
    }
}

/// Format seconds as `m:ss.mmm` for note lists.
pub fn format_display_time(seconds: f64) -> String {
    let sign = if seconds < 0.0 { "-" } else { "" };
    let total_ms = (seconds.abs() * 1000.0).round() as u64;
    let minutes = total_ms / 60_000;
    let secs = (total_ms / 1000) % 60;
    let ms = total_ms % 1000;
    format!("{sign}{minutes}:{secs:02}.{ms:03}")
}

/// All derived state of a chart snapshot.
#[derive(Debug, Clone)]
pub struct Timeline {
    context: TimingContext,
    notes: Vec<NoteTiming>,
    path: ChartPath,
}

impl Timeline {
    /// Compute the timeline for a whole chart.
    pub fn compute(chart: &Chart) -> Self {
        Self::from_notes(&chart.notes, chart.timing_context())
    }

    /// Compute the timeline for a note list under an explicit context.
    pub fn from_notes(notes: &[Note], context: TimingContext) -> Self {
        let offsets = section_offsets(notes, &context);

        let timings: Vec<NoteTiming> = notes
            .iter()
            .zip(&offsets)
            .map(|(note, &offset)| {
                let final_time = final_time(note, offset, &context);
                NoteTiming {
                    section_offset: offset,
                    original_time: original_time(note, offset, &context),
                    final_time,
                    path_beat: context.global_beat(final_time),
                    long_time: long_note_time(note, context.bpm, context.subdivisions),
                }
            })
            .collect();

        let path = ChartPath::build(notes, &offsets, &context);

        debug!(
            "timeline: {} notes, {} path vertices",
            timings.len(),
            path.len()
        );

        Self {
            context,
            notes: timings,
            path,
        }
    }

    pub fn context(&self) -> &TimingContext {
        &self.context
    }

    pub fn path(&self) -> &ChartPath {
        &self.path
    }

    pub fn note_timings(&self) -> &[NoteTiming] {
        &self.notes
    }

    pub fn note(&self, index: usize) -> Option<&NoteTiming> {
        self.notes.get(index)
    }

    /// Position of note `index` on the path at its playback time.
    pub fn note_position(&self, index: usize) -> Option<Vec2> {
        let timing = self.notes.get(index)?;
        self.path.position_at_time(timing.final_time)
    }

    /// Position on the path at an absolute playback time.
    pub fn position_at_time(&self, seconds: f64) -> Option<Vec2> {
        self.path.position_at_time(seconds)
    }

    /// `(start, end)` playback times of a long note; `None` for short notes.
    pub fn long_note_span(&self, index: usize) -> Option<(f64, f64)> {
        let timing = self.notes.get(index)?;
        (timing.long_time > 0.0).then(|| (timing.final_time, timing.final_time + timing.long_time))
    }

    /// Display string of note `index`'s playback time.
    pub fn display_time(&self, index: usize) -> Option<String> {
        self.notes.get(index).map(|t| format_display_time(t.final_time))
    }

    /// Note indices ordered by playback time (stable for ties).
    pub fn notes_by_time(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.notes.len()).collect();
        order.sort_by(|&a, &b| self.notes[a].final_time.total_cmp(&self.notes[b].final_time));
        order
    }

    /// Latest time any note occupies, including long-note tails.
    pub fn end_time(&self) -> f64 {
        self.notes
            .iter()
            .map(|t| t.final_time + t.long_time)
            .fold(0.0, f64::max)
    }
}
