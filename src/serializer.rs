//! Chart serializer: converts the chart model to and from its two JSON
//! shapes:
//!
//!   - the exported chart (`noteList` + derived times) consumed by the game
//!   - the autosave document (internal note objects + audio metadata),
//!     which may also be a bare array of notes from older saves
//!
//! Pre-delay is stored as integer milliseconds with the platform latency
//! correction applied; that correction exists only at this boundary.
//! Derived times in an export are written for the game and recomputed,
//! never trusted, on import.

use chrono::Utc;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::config::Platform;
use crate::error::ChartError;
use crate::model::{AudioInfo, Chart, Direction, Event, Note, NoteType, DEFAULT_BPM, DEFAULT_SUBDIVISIONS};
use crate::timemap::{normalize_section_indices, Timeline};
use crate::timing::time_to_beat;

/// Fixed lead-in between the start of playback and the start of the music.
pub const MUSIC_START_OFFSET_SECONDS: f64 = 3.0;

const TIMING_EXPLANATION: &str = "originalTime = section offset + beat * (60 / bpm) / subdivisions; \
musicTime = originalTime + 3.0; finalTime = originalTime + preDelay (the beat-0 direction note stays at 0); \
longTime is in seconds, longTimeBeat in beats; preDelay is in milliseconds.";

/// One note of the exported chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportNote {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bpm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subdivisions: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub music_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_time: Option<f64>,
    #[serde(default)]
    pub is_long: bool,
    /// Seconds
    #[serde(default)]
    pub long_time: f64,
    /// Beats
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_time_beat: Option<f64>,
    #[serde(default)]
    pub note_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_wait: Option<bool>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub beat_reset: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub fade: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_index: Option<usize>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportMetadata {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub timing_explanation: String,
    #[serde(default)]
    pub exported_at: String,
}

/// The exported chart document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportChart {
    #[serde(default)]
    pub diff_index: u32,
    #[serde(default)]
    pub level: u32,
    pub bpm: f64,
    pub subdivisions: u32,
    /// Milliseconds, platform-corrected
    #[serde(default)]
    pub pre_delay: i64,
    pub note_list: Vec<ExportNote>,
    #[serde(default)]
    pub event_list: Vec<Event>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ExportMetadata>,
}

/// Autosave document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutosaveDocument {
    pub notes: Vec<Note>,
    #[serde(default)]
    pub events: Vec<Event>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_file_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_file_type: Option<String>,
    /// Milliseconds, platform-corrected
    #[serde(default)]
    pub pre_delay: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bpm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subdivisions: Option<u32>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AutosaveShape {
    Document(AutosaveDocument),
    Legacy(Vec<Note>),
}

// ═══════════════════════════════════════════════════════════════════════
// Pre-delay
// ═══════════════════════════════════════════════════════════════════════

/// Seconds → persisted milliseconds.
pub fn pre_delay_to_ms(seconds: f64, platform: Platform) -> i64 {
    (seconds * 1000.0).round() as i64 + platform.pre_delay_correction_ms()
}

/// Persisted milliseconds → seconds.
pub fn pre_delay_from_ms(ms: i64, platform: Platform) -> f64 {
    (ms - platform.pre_delay_correction_ms()) as f64 / 1000.0
}

// ═══════════════════════════════════════════════════════════════════════
// Export
// ═══════════════════════════════════════════════════════════════════════

/// Build the exported chart for `chart`.
pub fn export_chart(chart: &Chart, platform: Platform) -> ExportChart {
    let timeline = Timeline::compute(chart);
    let ctx = timeline.context();

    let note_list = chart
        .notes
        .iter()
        .zip(timeline.note_timings())
        .map(|(note, timing)| ExportNote {
            beat: Some(note.beat),
            bpm: Some(ctx.note_bpm(note)),
            subdivisions: Some(note.subdivisions.unwrap_or(chart.subdivisions)),
            original_time: Some(timing.original_time),
            music_time: Some(MUSIC_START_OFFSET_SECONDS + timing.original_time),
            final_time: Some(timing.final_time),
            is_long: note.is_long,
            long_time: timing.long_time,
            long_time_beat: Some(note.long_time),
            note_type: note.note_type.external_name().to_string(),
            direction: Some(note.direction.name().to_string()),
            is_wait: (note.note_type == NoteType::Node).then_some(note.wait),
            beat_reset: note.beat_reset,
            fade: note.fade,
            section_index: note.section_index,
        })
        .collect();

    info!(
        "exporting chart: {} notes, {} events",
        chart.notes.len(),
        chart.events.len()
    );

    ExportChart {
        diff_index: chart.diff_index,
        level: chart.level,
        bpm: chart.bpm,
        subdivisions: chart.subdivisions,
        pre_delay: pre_delay_to_ms(chart.pre_delay_seconds, platform),
        note_list,
        event_list: chart.events.clone(),
        metadata: Some(ExportMetadata {
            description: format!(
                "Chart at {} BPM, {} subdivisions, {} notes",
                chart.bpm,
                chart.subdivisions,
                chart.notes.len()
            ),
            timing_explanation: TIMING_EXPLANATION.to_string(),
            exported_at: Utc::now().to_rfc3339(),
        }),
    }
}

/// Export `chart` as pretty-printed JSON.
pub fn export_chart_json(chart: &Chart, platform: Platform) -> Result<String, ChartError> {
    Ok(serde_json::to_string_pretty(&export_chart(chart, platform))?)
}

// ═══════════════════════════════════════════════════════════════════════
// Import
// ═══════════════════════════════════════════════════════════════════════

/// Convert an exported chart back into the model.
pub fn import_chart(export: &ExportChart, platform: Platform) -> Result<Chart, ChartError> {
    check_globals(export.bpm, export.subdivisions)?;

    let mut chart = Chart::new(export.bpm, export.subdivisions);
    chart.diff_index = export.diff_index;
    chart.level = export.level;
    chart.pre_delay_seconds = pre_delay_from_ms(export.pre_delay, platform);
    chart.events = export.event_list.clone();
    chart.notes = export
        .note_list
        .iter()
        .enumerate()
        .map(|(i, n)| import_note(i, n, export.bpm, export.subdivisions))
        .collect::<Result<_, _>>()?;
    normalize_section_indices(&mut chart.notes);

    info!(
        "imported chart: {} notes, {} events",
        chart.notes.len(),
        chart.events.len()
    );
    Ok(chart)
}

/// Parse and import exported chart JSON.
pub fn import_chart_json(text: &str, platform: Platform) -> Result<Chart, ChartError> {
    let export: ExportChart = serde_json::from_str(text)?;
    import_chart(&export, platform)
}

fn check_globals(bpm: f64, subdivisions: u32) -> Result<(), ChartError> {
    if bpm.is_nan() || bpm <= 0.0 {
        return Err(ChartError::InvalidValue {
            field: "bpm",
            message: format!("{bpm} is not positive"),
        });
    }
    if subdivisions == 0 {
        return Err(ChartError::InvalidValue {
            field: "subdivisions",
            message: "must be at least 1".to_string(),
        });
    }
    Ok(())
}

fn import_note(
    index: usize,
    external: &ExportNote,
    global_bpm: f64,
    global_subdivisions: u32,
) -> Result<Note, ChartError> {
    let note_type = NoteType::from_external_name(&external.note_type).unwrap_or_else(|| {
        warn!(
            "note {}: unknown note type '{}', using Tab",
            index + 1,
            external.note_type
        );
        NoteType::Tab
    });

    let direction = match external.direction.as_deref() {
        None => Direction::None,
        Some(name) => Direction::from_name(name).unwrap_or_else(|| {
            warn!("note {}: unknown direction '{name}'", index + 1);
            Direction::None
        }),
    };

    let bpm = external.bpm.unwrap_or(global_bpm);
    let subdivisions = external.subdivisions.unwrap_or(global_subdivisions);
    if bpm.is_nan() || bpm <= 0.0 || subdivisions == 0 {
        return Err(ChartError::InvalidValue {
            field: "bpm",
            message: format!("note {} has non-positive timing", index + 1),
        });
    }

    let beat = match external.beat {
        Some(beat) => beat,
        None => {
            let seconds = external
                .original_time
                .or(external.music_time.map(|t| t - MUSIC_START_OFFSET_SECONDS))
                .ok_or_else(|| ChartError::MissingField {
                    field: "beat",
                    context: format!("note {}", index + 1),
                })?;
            time_to_beat(seconds, bpm, subdivisions as f64)
        }
    };

    let long_time = match external.long_time_beat {
        Some(beats) => beats,
        None if external.long_time > 0.0 => {
            time_to_beat(external.long_time, bpm, subdivisions as f64)
        }
        None => 0.0,
    };

    Ok(Note {
        note_type,
        beat,
        direction,
        is_long: external.is_long,
        long_time,
        bpm: (bpm != global_bpm).then_some(bpm),
        subdivisions: (subdivisions != global_subdivisions).then_some(subdivisions),
        wait: note_type == NoteType::Node && external.is_wait.unwrap_or(false),
        beat_reset: external.beat_reset,
        fade: external.fade,
        section_index: external.section_index,
    })
}

// ═══════════════════════════════════════════════════════════════════════
// Autosave
// ═══════════════════════════════════════════════════════════════════════

/// Build the autosave document for `chart`.
pub fn to_autosave(chart: &Chart, platform: Platform) -> AutosaveDocument {
    AutosaveDocument {
        notes: chart.notes.clone(),
        events: chart.events.clone(),
        audio_file_name: chart.audio.as_ref().map(|a| a.file_name.clone()),
        audio_file_size: chart.audio.as_ref().map(|a| a.file_size),
        audio_file_type: chart.audio.as_ref().map(|a| a.file_type.clone()),
        pre_delay: pre_delay_to_ms(chart.pre_delay_seconds, platform),
        bpm: Some(chart.bpm),
        subdivisions: Some(chart.subdivisions),
    }
}

pub fn autosave_to_json(chart: &Chart, platform: Platform) -> Result<String, ChartError> {
    Ok(serde_json::to_string(&to_autosave(chart, platform))?)
}

/// Read an autosave document, accepting the legacy bare note array.
pub fn from_autosave_json(text: &str, platform: Platform) -> Result<Chart, ChartError> {
    let doc = match serde_json::from_str::<AutosaveShape>(text)? {
        AutosaveShape::Document(doc) => doc,
        AutosaveShape::Legacy(notes) => {
            info!("reading legacy autosave ({} notes)", notes.len());
            AutosaveDocument {
                notes,
                events: Vec::new(),
                audio_file_name: None,
                audio_file_size: None,
                audio_file_type: None,
                pre_delay: platform.pre_delay_correction_ms(),
                bpm: None,
                subdivisions: None,
            }
        }
    };

    let bpm = doc.bpm.unwrap_or(DEFAULT_BPM);
    let subdivisions = doc.subdivisions.unwrap_or(DEFAULT_SUBDIVISIONS);
    check_globals(bpm, subdivisions)?;

    let mut chart = Chart::new(bpm, subdivisions);
    chart.pre_delay_seconds = pre_delay_from_ms(doc.pre_delay, platform);
    chart.notes = doc.notes;
    normalize_section_indices(&mut chart.notes);
    chart.events = doc.events;
    chart.audio = match (doc.audio_file_name, doc.audio_file_size, doc.audio_file_type) {
        (Some(file_name), Some(file_size), Some(file_type)) => Some(AudioInfo {
            file_name,
            file_size,
            file_type,
        }),
        _ => None,
    };
    Ok(chart)
}

/// Read either JSON shape: an exported chart (has `noteList`) or an
/// autosave document / legacy note array.
pub fn load_chart_json(text: &str, platform: Platform) -> Result<Chart, ChartError> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    if value.get("noteList").is_some() {
        let export: ExportChart = serde_json::from_value(value)?;
        import_chart(&export, platform)
    } else {
        from_autosave_json(text, platform)
    }
}
