//! Data model for a rhythm game chart document.
//!
//! These structures are the canonical, user-editable state. Everything
//! derived from them (section offsets, path vertices, sampled positions)
//! lives in [`crate::timemap::Timeline`] and is recomputed on demand.

use serde::{Deserialize, Serialize};

/// Default tempo if a document does not specify one.
pub const DEFAULT_BPM: f64 = 120.0;
/// Default number of grid slices per beat.
pub const DEFAULT_SUBDIVISIONS: u32 = 16;

/// A complete chart document: notes, events and chart-global timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chart {
    /// Difficulty slot index in the external format
    #[serde(default)]
    pub diff_index: u32,
    /// Displayed difficulty level
    #[serde(default)]
    pub level: u32,
    /// Chart-global tempo
    pub bpm: f64,
    /// Chart-global grid slices per beat
    pub subdivisions: u32,
    /// Lead-in shift applied to every note except the path origin (seconds, may be negative)
    #[serde(default)]
    pub pre_delay_seconds: f64,
    /// Movement speed multiplier for the path (1.0 = normal)
    #[serde(default = "default_speed_multiplier")]
    pub speed_multiplier: f64,
    /// Notes in canonical (insertion) order
    #[serde(default)]
    pub notes: Vec<Note>,
    /// Timed cues
    #[serde(default)]
    pub events: Vec<Event>,
    /// Metadata about the backing audio file, if one was loaded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<AudioInfo>,
}

fn default_speed_multiplier() -> f64 {
    1.0
}

/// Metadata of the audio file the chart is synchronised to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioInfo {
    pub file_name: String,
    pub file_size: u64,
    pub file_type: String,
}

/// Note variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteType {
    #[default]
    Tab,
    Direction,
    Both,
    LongTab,
    LongDirection,
    LongBoth,
    Node,
}

impl NoteType {
    pub const ALL: [NoteType; 7] = [
        NoteType::Tab,
        NoteType::Direction,
        NoteType::Both,
        NoteType::LongTab,
        NoteType::LongDirection,
        NoteType::LongBoth,
        NoteType::Node,
    ];

    /// Whether this variant spans a duration.
    pub fn is_long(self) -> bool {
        matches!(
            self,
            NoteType::LongTab | NoteType::LongDirection | NoteType::LongBoth
        )
    }

    /// Whether this variant must carry a direction.
    pub fn requires_direction(self) -> bool {
        matches!(
            self,
            NoteType::Direction | NoteType::Both | NoteType::LongDirection | NoteType::LongBoth
        )
    }

    /// Whether notes of this variant contribute a path vertex.
    pub fn is_path_note(self) -> bool {
        matches!(self, NoteType::Direction | NoteType::Node)
    }

    /// Name used by the external chart format.
    pub fn external_name(self) -> &'static str {
        match self {
            NoteType::Tab => "Tab",
            NoteType::Direction => "Direction",
            NoteType::Both => "Both",
            NoteType::LongTab => "LongTab",
            NoteType::LongDirection => "LongDirection",
            NoteType::LongBoth => "LongBoth",
            NoteType::Node => "Node",
        }
    }

    /// Inverse of [`NoteType::external_name`].
    pub fn from_external_name(name: &str) -> Option<NoteType> {
        NoteType::ALL
            .into_iter()
            .find(|t| t.external_name() == name)
    }
}

/// Compass direction of a direction-bearing note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    UpLeft,
    UpRight,
    DownLeft,
    DownRight,
    #[default]
    None,
}

impl Direction {
    pub const ALL: [Direction; 9] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
        Direction::UpLeft,
        Direction::UpRight,
        Direction::DownLeft,
        Direction::DownRight,
        Direction::None,
    ];

    /// Raw (unnormalised) screen-space vector; y grows downwards.
    pub fn vector(self) -> (f64, f64) {
        match self {
            Direction::Up => (0.0, -1.0),
            Direction::Down => (0.0, 1.0),
            Direction::Left => (-1.0, 0.0),
            Direction::Right => (1.0, 0.0),
            Direction::UpLeft => (-1.0, -1.0),
            Direction::UpRight => (1.0, -1.0),
            Direction::DownLeft => (-1.0, 1.0),
            Direction::DownRight => (1.0, 1.0),
            Direction::None => (0.0, 0.0),
        }
    }

    /// Unit-length vector, or the zero vector for [`Direction::None`].
    pub fn unit_vector(self) -> (f64, f64) {
        let (x, y) = self.vector();
        let len = (x * x + y * y).sqrt();
        if len == 0.0 {
            (0.0, 0.0)
        } else {
            (x / len, y / len)
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
            Direction::UpLeft => "upleft",
            Direction::UpRight => "upright",
            Direction::DownLeft => "downleft",
            Direction::DownRight => "downright",
            Direction::None => "none",
        }
    }

    pub fn from_name(name: &str) -> Option<Direction> {
        let lower = name.to_ascii_lowercase();
        Direction::ALL.into_iter().find(|d| d.name() == lower)
    }
}

/// A single chart note.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    #[serde(rename = "type")]
    pub note_type: NoteType,
    /// Position within its section, in subdivisions
    pub beat: f64,
    /// Required for direction-bearing variants
    #[serde(default)]
    pub direction: Direction,
    #[serde(default)]
    pub is_long: bool,
    /// Duration in beats (long variants only)
    #[serde(default)]
    pub long_time: f64,
    /// Per-note tempo override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bpm: Option<f64>,
    /// Per-note subdivision override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subdivisions: Option<u32>,
    /// Node only: the path does not move when arriving at this note
    #[serde(default)]
    pub wait: bool,
    /// Starts a new section after this note
    #[serde(default)]
    pub beat_reset: bool,
    /// Ramp the movement speed towards this note's tempo
    #[serde(default)]
    pub fade: bool,
    /// Assigned by [`crate::timemap::assign_section_indices`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_index: Option<usize>,
}

impl Note {
    /// A note of the given type at `beat` with no direction.
    pub fn new(note_type: NoteType, beat: f64) -> Self {
        Self {
            note_type,
            beat,
            direction: Direction::None,
            is_long: note_type.is_long(),
            ..Default::default()
        }
    }

    pub fn direction(beat: f64, direction: Direction) -> Self {
        Self {
            direction,
            ..Note::new(NoteType::Direction, beat)
        }
    }

    pub fn tab(beat: f64) -> Self {
        Note::new(NoteType::Tab, beat)
    }

    pub fn node(beat: f64, wait: bool) -> Self {
        Self {
            wait,
            ..Note::new(NoteType::Node, beat)
        }
    }

    /// A long variant of `note_type` lasting `long_time` beats.
    pub fn long(note_type: NoteType, beat: f64, direction: Direction, long_time: f64) -> Self {
        Self {
            direction,
            is_long: true,
            long_time,
            ..Note::new(note_type, beat)
        }
    }

    pub fn with_bpm(mut self, bpm: f64) -> Self {
        self.bpm = Some(bpm);
        self
    }

    pub fn with_fade(mut self) -> Self {
        self.fade = true;
        self
    }

    pub fn with_beat_reset(mut self) -> Self {
        self.beat_reset = true;
        self
    }

    pub fn is_wait_node(&self) -> bool {
        self.note_type == NoteType::Node && self.wait
    }
}

/// Category of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Camera,
    Background,
    Custom,
}

/// Value type of an event parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    Float,
    Int,
    String,
    Bool,
    Vector3,
    Vector2,
    Color,
    Enum,
}

/// One named parameter of an event. Values are kept as text, the way the
/// external format stores them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventParam {
    pub param_type: ParamType,
    pub param_name: String,
    pub param_value: String,
}

/// A timestamped camera/background/custom cue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub event_type: EventType,
    pub event_id: String,
    /// Absolute playback time in seconds
    pub event_time: f64,
    #[serde(default)]
    pub event_params: Vec<EventParam>,
}

impl Chart {
    /// Create an empty chart with the given global timing.
    pub fn new(bpm: f64, subdivisions: u32) -> Self {
        Self {
            diff_index: 0,
            level: 0,
            bpm,
            subdivisions,
            pre_delay_seconds: 0.0,
            speed_multiplier: 1.0,
            notes: Vec::new(),
            events: Vec::new(),
            audio: None,
        }
    }

    /// The explicit timing context every core computation takes.
    pub fn timing_context(&self) -> crate::timing::TimingContext {
        crate::timing::TimingContext {
            bpm: self.bpm,
            subdivisions: self.subdivisions,
            pre_delay_seconds: self.pre_delay_seconds,
            speed_multiplier: self.speed_multiplier,
        }
    }

    /// Number of notes that contribute a path vertex.
    pub fn path_note_count(&self) -> usize {
        self.notes
            .iter()
            .filter(|n| n.note_type.is_path_note())
            .count()
    }
}

impl Default for Chart {
    fn default() -> Self {
        Self::new(DEFAULT_BPM, DEFAULT_SUBDIVISIONS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn external_names_are_a_bijection() {
        for t in NoteType::ALL {
            assert_eq!(NoteType::from_external_name(t.external_name()), Some(t));
        }
        assert_eq!(NoteType::from_external_name("Slide"), None);
    }

    #[test]
    fn diagonal_unit_vector_is_normalised() {
        let (x, y) = Direction::UpRight.unit_vector();
        assert!((x * x + y * y - 1.0).abs() < 1e-12);
        assert!(x > 0.0 && y < 0.0);
        assert_eq!(Direction::None.unit_vector(), (0.0, 0.0));
    }

    #[test]
    fn note_json_uses_internal_names() {
        let note = Note::long(NoteType::LongDirection, 32.0, Direction::Up, 8.0);
        let json = serde_json::to_value(&note).unwrap();
        assert_eq!(json["type"], "longdirection");
        assert_eq!(json["direction"], "up");
        assert_eq!(json["isLong"], true);
        assert_eq!(json["longTime"], 8.0);
        assert!(json.get("sectionIndex").is_none());
    }

    #[test]
    fn note_json_defaults_missing_fields() {
        let note: Note = serde_json::from_str(r#"{"type":"tab","beat":4}"#).unwrap();
        assert_eq!(note.note_type, NoteType::Tab);
        assert_eq!(note.direction, Direction::None);
        assert!(!note.is_long);
        assert_eq!(note.section_index, None);
    }
}
