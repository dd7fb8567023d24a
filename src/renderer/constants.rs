//! Shared constants for the chart renderer (all in SVG user units).

// ── Colors ──────────────────────────────────────────────────────────
pub(super) const BACKGROUND_COLOR: &str = "#1b1d2a";
pub(super) const PATH_COLOR: &str = "#7aa2f7";
pub(super) const LONG_BAR_COLOR: &str = "#e0af68";
pub(super) const TAB_COLOR: &str = "#9ece6a";
pub(super) const DIRECTION_COLOR: &str = "#7dcfff";
pub(super) const BOTH_COLOR: &str = "#bb9af7";
pub(super) const NODE_COLOR: &str = "#565f89";
pub(super) const ARROW_COLOR: &str = "#ffffff";
pub(super) const BPM_RING_COLOR: &str = "#f7768e";
pub(super) const EVENT_COLOR: &str = "#ff9e64";
pub(super) const LABEL_COLOR: &str = "#c0caf5";

// ── Strokes ─────────────────────────────────────────────────────────
pub(super) const PATH_WIDTH: f64 = 2.0;
pub(super) const LONG_BAR_WIDTH: f64 = 8.0;
pub(super) const ARROW_WIDTH: f64 = 2.0;
pub(super) const BPM_RING_WIDTH: f64 = 1.5;

// ── Marker sizes ────────────────────────────────────────────────────
pub(super) const NOTE_RADIUS: f64 = 6.0;
pub(super) const NODE_RADIUS: f64 = 3.5;
pub(super) const ARROW_LENGTH: f64 = 14.0;
pub(super) const ARROW_HEAD: f64 = 4.0;
pub(super) const BPM_RING_RADIUS: f64 = 11.0;
pub(super) const EVENT_MARKER_SIZE: f64 = 7.0; // half-diagonal of the diamond
pub(super) const EVENT_LABEL_OFFSET: f64 = 12.0; // label sits above the marker
pub(super) const NODE_LABEL_OFFSET: f64 = 10.0;
pub(super) const LABEL_SIZE: f64 = 10.0;
