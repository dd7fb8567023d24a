//! Beat ↔ time conversion and tempo-fade math.
//!
//! Every function here is pure. Callers guard against zero bpm or
//! subdivisions; the conversions themselves do not.

use serde::{Deserialize, Serialize};

use crate::model::Note;

/// BPM differences at or below this are treated as "no tempo change".
pub const BPM_EPSILON: f64 = 0.01;

/// Below this average tempo the fade curve degenerates to linear.
const FADE_DEGENERATE_DISTANCE: f64 = 0.001;

/// Convert a beat position (in subdivisions) to seconds.
pub fn beat_to_time(beat: f64, bpm: f64, subdivisions: f64) -> f64 {
    beat * (60.0 / bpm) / subdivisions
}

/// Exact inverse of [`beat_to_time`]. Never rounded.
pub fn time_to_beat(seconds: f64, bpm: f64, subdivisions: f64) -> f64 {
    seconds * bpm * subdivisions / 60.0
}

/// [`time_to_beat`] snapped to the nearest integer grid slot.
///
/// Only for discrete-grid display such as live hit highlighting; the path
/// and serializer always use the unrounded value.
pub fn time_to_grid_beat(seconds: f64, bpm: f64, subdivisions: f64) -> i64 {
    time_to_beat(seconds, bpm, subdivisions).round() as i64
}

/// Normalised distance travelled after `t ∈ [0, 1]` of a segment whose
/// tempo ramps linearly from `start_bpm` to `end_bpm`.
///
/// Speed is proportional to tempo, so distance is its integral:
/// `d(t) = s·t + (e - s)·t²/2`, normalised by `d(1) = (s + e)/2`.
pub fn fade_progress(t: f64, start_bpm: f64, end_bpm: f64) -> f64 {
    let total = (start_bpm + end_bpm) / 2.0;
    if total.abs() < FADE_DEGENERATE_DISTANCE {
        return t;
    }
    let distance = start_bpm * t + (end_bpm - start_bpm) * t * t / 2.0;
    distance / total
}

/// Whether two tempos differ enough to count as a change.
pub fn bpm_differs(a: f64, b: f64) -> bool {
    (a - b).abs() > BPM_EPSILON
}

/// Chart-global timing values threaded through every core computation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingContext {
    pub bpm: f64,
    pub subdivisions: u32,
    pub pre_delay_seconds: f64,
    pub speed_multiplier: f64,
}

impl TimingContext {
    pub fn new(bpm: f64, subdivisions: u32) -> Self {
        Self {
            bpm,
            subdivisions,
            pre_delay_seconds: 0.0,
            speed_multiplier: 1.0,
        }
    }

    /// The note's own tempo, falling back to the chart tempo.
    pub fn note_bpm(&self, note: &Note) -> f64 {
        note.bpm.unwrap_or(self.bpm)
    }

    /// The note's own subdivisions, falling back to the chart value.
    pub fn note_subdivisions(&self, note: &Note) -> f64 {
        note.subdivisions.unwrap_or(self.subdivisions) as f64
    }

    /// Section-relative time of the note's beat, using its own overrides.
    pub fn note_beat_time(&self, note: &Note) -> f64 {
        beat_to_time(note.beat, self.note_bpm(note), self.note_subdivisions(note))
    }

    /// Global-grid beat for an absolute time.
    pub fn global_beat(&self, seconds: f64) -> f64 {
        time_to_beat(seconds, self.bpm, self.subdivisions as f64)
    }

    /// Absolute time for a global-grid beat.
    pub fn global_time(&self, beat: f64) -> f64 {
        beat_to_time(beat, self.bpm, self.subdivisions as f64)
    }
}

/// Duration of a long note in seconds, or 0 for anything that is not long.
pub fn long_note_time(note: &Note, global_bpm: f64, global_subdivisions: u32) -> f64 {
    if !note.is_long || note.long_time <= 0.0 {
        return 0.0;
    }
    let bpm = note.bpm.unwrap_or(global_bpm);
    let subdivisions = note.subdivisions.unwrap_or(global_subdivisions) as f64;
    beat_to_time(note.long_time, bpm, subdivisions)
}
