//! The editor document: sole owner of a chart and its derived timeline.
//!
//! Every mutation goes through here. After each one the section indices are
//! reassigned in note order and the timeline is rebuilt, so readers always
//! see derived state that matches the notes.

use log::{debug, info};

use crate::config::Platform;
use crate::error::ChartError;
use crate::model::{AudioInfo, Chart, Event, Note};
use crate::serializer;
use crate::timemap::{assign_section_indices, Timeline};
use crate::validate::{validate_chart, ValidationReport};

#[derive(Debug, Clone)]
pub struct Document {
    chart: Chart,
    timeline: Timeline,
    dirty: bool,
}

impl Default for Document {
    fn default() -> Self {
        Self::new(Chart::default())
    }
}

impl Document {
    pub fn new(mut chart: Chart) -> Self {
        assign_section_indices(&mut chart.notes);
        let timeline = Timeline::compute(&chart);
        Self {
            chart,
            timeline,
            dirty: false,
        }
    }

    pub fn chart(&self) -> &Chart {
        &self.chart
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn into_chart(self) -> Chart {
        self.chart
    }

    /// Whether anything changed since the last save/import.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_saved(&mut self) {
        self.dirty = false;
    }

    fn refresh(&mut self) {
        assign_section_indices(&mut self.chart.notes);
        self.timeline = Timeline::compute(&self.chart);
        self.dirty = true;
        debug!("document refreshed ({} notes)", self.chart.notes.len());
    }

    // ── Notes ──────────────────────────────────────────────────────────

    /// Append a note; returns its index.
    pub fn add_note(&mut self, note: Note) -> usize {
        self.chart.notes.push(note);
        self.refresh();
        self.chart.notes.len() - 1
    }

    pub fn insert_note(&mut self, index: usize, note: Note) -> Result<(), ChartError> {
        if index > self.chart.notes.len() {
            return Err(out_of_range("note index", index, self.chart.notes.len()));
        }
        self.chart.notes.insert(index, note);
        self.refresh();
        Ok(())
    }

    pub fn remove_note(&mut self, index: usize) -> Option<Note> {
        if index >= self.chart.notes.len() {
            return None;
        }
        let note = self.chart.notes.remove(index);
        self.refresh();
        Some(note)
    }

    /// Edit a note in place. Returns false if `index` does not exist.
    pub fn update_note(&mut self, index: usize, edit: impl FnOnce(&mut Note)) -> bool {
        let Some(note) = self.chart.notes.get_mut(index) else {
            return false;
        };
        edit(note);
        self.refresh();
        true
    }

    /// Move a note to a new position in canonical order. Sections follow
    /// the new order.
    pub fn move_note(&mut self, from: usize, to: usize) -> Result<(), ChartError> {
        let len = self.chart.notes.len();
        if from >= len {
            return Err(out_of_range("note index", from, len));
        }
        if to >= len {
            return Err(out_of_range("note index", to, len));
        }
        let note = self.chart.notes.remove(from);
        self.chart.notes.insert(to, note);
        self.refresh();
        Ok(())
    }

    // ── Events ─────────────────────────────────────────────────────────

    pub fn add_event(&mut self, event: Event) -> usize {
        self.chart.events.push(event);
        self.dirty = true;
        self.chart.events.len() - 1
    }

    pub fn remove_event(&mut self, index: usize) -> Option<Event> {
        if index >= self.chart.events.len() {
            return None;
        }
        self.dirty = true;
        Some(self.chart.events.remove(index))
    }

    pub fn update_event(&mut self, index: usize, edit: impl FnOnce(&mut Event)) -> bool {
        let Some(event) = self.chart.events.get_mut(index) else {
            return false;
        };
        edit(event);
        self.dirty = true;
        true
    }

    // ── Chart-global timing ────────────────────────────────────────────

    pub fn set_bpm(&mut self, bpm: f64) -> Result<(), ChartError> {
        if bpm.is_nan() || bpm <= 0.0 {
            return Err(ChartError::InvalidValue {
                field: "bpm",
                message: format!("{bpm} is not positive"),
            });
        }
        self.chart.bpm = bpm;
        self.refresh();
        Ok(())
    }

    pub fn set_subdivisions(&mut self, subdivisions: u32) -> Result<(), ChartError> {
        if subdivisions == 0 {
            return Err(ChartError::InvalidValue {
                field: "subdivisions",
                message: "must be at least 1".to_string(),
            });
        }
        self.chart.subdivisions = subdivisions;
        self.refresh();
        Ok(())
    }

    /// Pre-delay in seconds; negative values are allowed.
    pub fn set_pre_delay(&mut self, seconds: f64) -> Result<(), ChartError> {
        if !seconds.is_finite() {
            return Err(ChartError::InvalidValue {
                field: "preDelay",
                message: format!("{seconds} is not a finite number"),
            });
        }
        self.chart.pre_delay_seconds = seconds;
        self.refresh();
        Ok(())
    }

    pub fn set_speed_multiplier(&mut self, multiplier: f64) -> Result<(), ChartError> {
        if multiplier.is_nan() || multiplier <= 0.0 {
            return Err(ChartError::InvalidValue {
                field: "speedMultiplier",
                message: format!("{multiplier} is not positive"),
            });
        }
        self.chart.speed_multiplier = multiplier;
        self.refresh();
        Ok(())
    }

    pub fn set_audio(&mut self, audio: Option<AudioInfo>) {
        self.chart.audio = audio;
        self.dirty = true;
    }

    // ── Persistence ────────────────────────────────────────────────────

    /// Replace the chart with an exported chart. On error the document is
    /// left untouched.
    pub fn import_export_json(&mut self, text: &str, platform: Platform) -> Result<(), ChartError> {
        let chart = serializer::import_chart_json(text, platform)?;
        self.replace(chart);
        Ok(())
    }

    /// Replace the chart with an autosave document (or legacy note array).
    /// On error the document is left untouched.
    pub fn import_autosave(&mut self, text: &str, platform: Platform) -> Result<(), ChartError> {
        let chart = serializer::from_autosave_json(text, platform)?;
        self.replace(chart);
        Ok(())
    }

    fn replace(&mut self, mut chart: Chart) {
        // Neither file shape stores these; keep what the editor already has.
        chart.speed_multiplier = self.chart.speed_multiplier;
        if chart.audio.is_none() {
            chart.audio = self.chart.audio.take();
        }
        info!(
            "document loaded: {} notes, {} events",
            chart.notes.len(),
            chart.events.len()
        );
        *self = Document::new(chart);
    }

    pub fn export_json(&self, platform: Platform) -> Result<String, ChartError> {
        serializer::export_chart_json(&self.chart, platform)
    }

    pub fn autosave_json(&self, platform: Platform) -> Result<String, ChartError> {
        serializer::autosave_to_json(&self.chart, platform)
    }

    pub fn validate(&self) -> ValidationReport {
        validate_chart(&self.chart)
    }
}

fn out_of_range(field: &'static str, index: usize, len: usize) -> ChartError {
    ChartError::InvalidValue {
        field,
        message: format!("{index} is out of range (0..{len})"),
    }
}
