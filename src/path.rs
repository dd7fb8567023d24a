//! Path building and sampling.
//!
//! Direction and node notes define a polyline in world space. The path
//! advances from one vertex to the next at a speed proportional to tempo,
//! so a note's on-screen position is a function of time alone.
//!
//! [`ChartPath::position_at_time`] is the only segment walk in the crate.
//! The editor canvas, playback transport, position map and SVG export all
//! call it; none of them walk the vertex list themselves.

use std::ops::{Add, Mul, Sub};

use serde::Serialize;

use crate::model::{Direction, Note, NoteType};
use crate::timemap::{final_time, is_path_origin};
use crate::timing::{bpm_differs, fade_progress, TimingContext};

/// World units travelled per second per BPM, before the speed multiplier.
pub const BASE_SPEED_PER_BPM: f64 = 0.4;

/// A point in world space (y grows downwards).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn lerp(self, other: Vec2, t: f64) -> Vec2 {
        self + (other - self) * t
    }

    pub fn length(self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn distance(self, other: Vec2) -> f64 {
        (other - self).length()
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, other: Vec2) -> Vec2 {
        Vec2::new(self.x + other.x, self.y + other.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, other: Vec2) -> Vec2 {
        Vec2::new(self.x - other.x, self.y - other.y)
    }
}

impl Mul<f64> for Vec2 {
    type Output = Vec2;

    fn mul(self, factor: f64) -> Vec2 {
        Vec2::new(self.x * factor, self.y * factor)
    }
}

impl From<(f64, f64)> for Vec2 {
    fn from((x, y): (f64, f64)) -> Self {
        Vec2::new(x, y)
    }
}

/// One path vertex and the note it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathPoint {
    /// Index of the source note in the chart's note list
    pub note_index: usize,
    pub note_type: NoteType,
    pub direction: Direction,
    /// Playback time of the vertex (seconds)
    pub time: f64,
    /// Effective tempo at this vertex
    pub bpm: f64,
    /// The segment arriving at this vertex ramps its tempo
    pub fade: bool,
    /// Node with zero displacement from the previous vertex
    pub wait: bool,
    pub position: Vec2,
}

/// The polyline derived from a chart's direction and node notes, sorted by
/// playback time.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartPath {
    points: Vec<PathPoint>,
}

impl ChartPath {
    /// Build the path from a note list and its section offsets.
    ///
    /// `offsets` is parallel to `notes` (see [`crate::timemap::section_offsets`]).
    pub fn build(notes: &[Note], offsets: &[f64], ctx: &TimingContext) -> Self {
        let mut points: Vec<PathPoint> = notes
            .iter()
            .zip(offsets)
            .enumerate()
            .filter(|(_, (note, _))| note.note_type.is_path_note())
            .map(|(note_index, (note, &offset))| PathPoint {
                note_index,
                note_type: note.note_type,
                direction: note.direction,
                time: final_time(note, offset, ctx),
                bpm: ctx.note_bpm(note),
                fade: note.fade,
                wait: note.is_wait_node(),
                position: Vec2::ZERO,
            })
            .collect();

        // Vec::sort_by is stable, so equal times keep note order.
        points.sort_by(|a, b| a.time.total_cmp(&b.time));

        for i in 1..points.len() {
            let prev = points[i - 1];
            let arriving = points[i];

            points[i].position = if arriving.wait {
                prev.position
            } else {
                let effective_bpm = if arriving.fade && bpm_differs(prev.bpm, arriving.bpm) {
                    (prev.bpm + arriving.bpm) / 2.0
                } else {
                    arriving.bpm
                };
                let speed = BASE_SPEED_PER_BPM * ctx.speed_multiplier * effective_bpm;
                let distance = speed * (arriving.time - prev.time);
                let heading = Vec2::from(departing_direction(&points, i - 1).unit_vector());
                prev.position + heading * distance
            };
        }

        // Notes pulled before the origin by a negative pre-delay still
        // leave the origin vertex at (0, 0).
        let origin = notes
            .iter()
            .zip(offsets)
            .position(|(note, &offset)| is_path_origin(note, offset));
        if let Some(shift) = origin.and_then(|i| points.iter().find(|p| p.note_index == i)) {
            let shift = shift.position;
            if shift != Vec2::ZERO {
                for point in &mut points {
                    point.position = point.position - shift;
                }
            }
        }

        Self { points }
    }

    /// Vertices in playback order.
    pub fn points(&self) -> &[PathPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Vertex belonging to note `note_index`, if that note is on the path.
    pub fn vertex_for_note(&self, note_index: usize) -> Option<Vec2> {
        self.points
            .iter()
            .find(|p| p.note_index == note_index)
            .map(|p| p.position)
    }

    /// Position on the path at playback time `seconds`.
    ///
    /// Returns `None` only for an empty path. Times before the first vertex
    /// clamp to it, times after the last vertex clamp to the last one.
    pub fn position_at_time(&self, seconds: f64) -> Option<Vec2> {
        let first = self.points.first()?;
        let last = self.points.last()?;

        if seconds <= first.time {
            return Some(first.position);
        }
        if seconds >= last.time {
            return Some(last.position);
        }

        for pair in self.points.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            if a.time <= seconds && seconds <= b.time {
                return Some(interpolate(a, b, seconds));
            }
        }

        Some(last.position)
    }

    /// Position for a beat on the chart-global grid (the editor canvas
    /// addresses the path this way).
    pub fn position_at_beat(&self, beat: f64, ctx: &TimingContext) -> Option<Vec2> {
        self.position_at_time(ctx.global_time(beat))
    }

    /// The route followed between two playback times: the start point,
    /// every vertex strictly inside the range, then the end point.
    pub fn trace(&self, start: f64, end: f64) -> Vec<Vec2> {
        let (start, end) = if start <= end { (start, end) } else { (end, start) };
        let Some(head) = self.position_at_time(start) else {
            return Vec::new();
        };

        let mut route = vec![head];
        route.extend(
            self.points
                .iter()
                .filter(|p| p.time > start && p.time < end)
                .map(|p| p.position),
        );
        if let Some(tail) = self.position_at_time(end) {
            route.push(tail);
        }
        route
    }

    /// Axis-aligned bounds of all vertices as `(min, max)`.
    pub fn bounds(&self) -> Option<(Vec2, Vec2)> {
        let first = self.points.first()?.position;
        Some(self.points.iter().fold((first, first), |(lo, hi), p| {
            (
                Vec2::new(lo.x.min(p.position.x), lo.y.min(p.position.y)),
                Vec2::new(hi.x.max(p.position.x), hi.y.max(p.position.y)),
            )
        }))
    }
}

fn interpolate(a: &PathPoint, b: &PathPoint, seconds: f64) -> Vec2 {
    let span = b.time - a.time;
    if span == 0.0 {
        return a.position;
    }
    let mut t = (seconds - a.time) / span;
    if b.fade && bpm_differs(a.bpm, b.bpm) {
        t = fade_progress(t, a.bpm, b.bpm);
    }
    a.position.lerp(b.position, t)
}

/// Heading when leaving vertex `index`: its own direction, or for nodes
/// the nearest earlier non-node direction, defaulting to right.
fn departing_direction(points: &[PathPoint], index: usize) -> Direction {
    points[..=index]
        .iter()
        .rev()
        .find(|p| p.note_type != NoteType::Node)
        .map_or(Direction::Right, |p| p.direction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timemap::{assign_section_indices, section_offsets};

    fn build(notes: &mut [Note], ctx: &TimingContext) -> ChartPath {
        assign_section_indices(notes);
        let offsets = section_offsets(notes, ctx);
        ChartPath::build(notes, &offsets, ctx)
    }

    fn assert_close(a: Vec2, b: Vec2) {
        assert!(a.distance(b) < 1e-9, "{a:?} != {b:?}");
    }

    #[test]
    fn straight_segment_at_120_bpm() {
        let ctx = TimingContext::new(120.0, 16);
        let mut notes = vec![
            Note::direction(0.0, Direction::Right),
            Note::direction(16.0, Direction::Right),
        ];
        let path = build(&mut notes, &ctx);
        assert_eq!(path.len(), 2);
        assert_close(path.points()[0].position, Vec2::ZERO);
        assert_close(path.points()[1].position, Vec2::new(24.0, 0.0));
    }

    #[test]
    fn heading_comes_from_departing_note() {
        let ctx = TimingContext::new(120.0, 16);
        let mut notes = vec![
            Note::direction(0.0, Direction::Down),
            Note::direction(16.0, Direction::Right),
        ];
        let path = build(&mut notes, &ctx);
        assert_close(path.points()[1].position, Vec2::new(0.0, 24.0));
    }

    #[test]
    fn wait_node_holds_position() {
        let ctx = TimingContext::new(120.0, 16);
        let mut notes = vec![
            Note::direction(0.0, Direction::Right),
            Note::node(16.0, true),
            Note::direction(32.0, Direction::Right),
        ];
        let path = build(&mut notes, &ctx);
        assert_close(path.points()[1].position, Vec2::ZERO);
        // Leaving the wait node inherits "right" from the origin.
        assert_close(path.points()[2].position, Vec2::new(24.0, 0.0));
    }

    #[test]
    fn moving_node_inherits_previous_direction() {
        let ctx = TimingContext::new(120.0, 16);
        let mut notes = vec![
            Note::direction(0.0, Direction::Up),
            Note::node(16.0, false),
            Note::direction(32.0, Direction::Right),
        ];
        let path = build(&mut notes, &ctx);
        assert_close(path.points()[1].position, Vec2::new(0.0, -24.0));
        assert_close(path.points()[2].position, Vec2::new(0.0, -48.0));
    }

    #[test]
    fn none_direction_means_no_displacement() {
        let ctx = TimingContext::new(120.0, 16);
        let mut notes = vec![
            Note::direction(0.0, Direction::None),
            Note::direction(16.0, Direction::Right),
        ];
        let path = build(&mut notes, &ctx);
        assert_close(path.points()[1].position, Vec2::ZERO);
    }

    #[test]
    fn speed_multiplier_scales_distance() {
        let mut ctx = TimingContext::new(120.0, 16);
        ctx.speed_multiplier = 2.0;
        let mut notes = vec![
            Note::direction(0.0, Direction::Right),
            Note::direction(16.0, Direction::Right),
        ];
        let path = build(&mut notes, &ctx);
        assert_close(path.points()[1].position, Vec2::new(48.0, 0.0));
    }

    #[test]
    fn fade_segment_uses_mean_bpm() {
        let ctx = TimingContext::new(120.0, 16);
        let mut notes = vec![
            Note::direction(0.0, Direction::Right),
            Note::direction(16.0, Direction::Right).with_bpm(240.0).with_fade(),
        ];
        let path = build(&mut notes, &ctx);
        // Arriving note's own tempo shortens its beat time to 0.25s.
        let expected = 0.4 * 180.0 * 0.25;
        assert_close(path.points()[1].position, Vec2::new(expected, 0.0));

        // Without fade the arriving tempo applies directly.
        notes[1].fade = false;
        let path = build(&mut notes, &ctx);
        assert_close(path.points()[1].position, Vec2::new(0.4 * 240.0 * 0.25, 0.0));
    }

    #[test]
    fn origin_vertex_is_zero_with_pre_delay() {
        let mut ctx = TimingContext::new(120.0, 16);
        ctx.pre_delay_seconds = 3.0;
        let mut notes = vec![
            Note::direction(16.0, Direction::Right),
            Note::direction(0.0, Direction::Right),
        ];
        let path = build(&mut notes, &ctx);
        let origin = path.points()[0];
        assert_eq!(origin.note_index, 1);
        assert_eq!(origin.time, 0.0);
        assert_close(origin.position, Vec2::ZERO);
        assert!((path.points()[1].time - 3.5).abs() < 1e-12);
    }

    #[test]
    fn negative_pre_delay_keeps_origin_at_zero() {
        let mut ctx = TimingContext::new(120.0, 16);
        ctx.pre_delay_seconds = -1.0;
        let mut notes = vec![
            Note::direction(0.0, Direction::Right),
            Note::direction(16.0, Direction::Up),
        ];
        let path = build(&mut notes, &ctx);
        // The second note plays at -0.5 s, before the origin.
        assert_eq!(path.points()[0].note_index, 1);
        assert_eq!(path.vertex_for_note(0), Some(Vec2::ZERO));
        // Up heading for 0.5 s at 48 units/s, seen from the origin.
        assert_close(path.vertex_for_note(1).unwrap(), Vec2::new(0.0, 24.0));
    }

    #[test]
    fn sampler_interpolates_and_clamps() {
        let ctx = TimingContext::new(120.0, 16);
        let mut notes = vec![
            Note::direction(0.0, Direction::Right),
            Note::direction(16.0, Direction::Right),
        ];
        let path = build(&mut notes, &ctx);
        assert_close(path.position_at_time(0.25).unwrap(), Vec2::new(12.0, 0.0));
        assert_close(path.position_at_time(10.0).unwrap(), Vec2::new(24.0, 0.0));
        assert_close(path.position_at_time(-1.0).unwrap(), Vec2::ZERO);
        assert_close(path.position_at_beat(8.0, &ctx).unwrap(), Vec2::new(12.0, 0.0));
    }

    #[test]
    fn sampler_applies_fade_curve() {
        let ctx = TimingContext::new(60.0, 16);
        let mut notes = vec![
            Note::direction(0.0, Direction::Right),
            Note::direction(16.0, Direction::Right).with_bpm(180.0).with_fade(),
        ];
        let path = build(&mut notes, &ctx);
        let end = path.points()[1];
        let mid = path.position_at_time(end.time / 2.0).unwrap();
        let expected = end.position.x * fade_progress(0.5, 60.0, 180.0);
        assert!((mid.x - expected).abs() < 1e-9);
        assert!(mid.x < end.position.x / 2.0);
    }

    #[test]
    fn sampler_handles_empty_and_single_vertex() {
        let ctx = TimingContext::new(120.0, 16);
        let empty = build(&mut [Note::tab(4.0)], &ctx);
        assert!(empty.is_empty());
        assert_eq!(empty.position_at_time(1.0), None);
        assert!(empty.trace(0.0, 1.0).is_empty());

        let single = build(&mut [Note::direction(0.0, Direction::Up)], &ctx);
        assert_eq!(single.position_at_time(5.0), Some(Vec2::ZERO));
    }

    #[test]
    fn zero_length_segment_returns_first_vertex() {
        let ctx = TimingContext::new(120.0, 16);
        let mut notes = vec![
            Note::direction(0.0, Direction::Right),
            Note::direction(16.0, Direction::Right),
            Note::direction(16.0, Direction::Up),
            Note::direction(32.0, Direction::Up),
        ];
        let path = build(&mut notes, &ctx);
        assert_close(path.points()[2].position, path.points()[1].position);
        assert_close(path.position_at_time(0.5).unwrap(), Vec2::new(24.0, 0.0));
        assert_close(path.points()[3].position, Vec2::new(24.0, -24.0));
    }

    #[test]
    fn trace_includes_inner_vertices() {
        let ctx = TimingContext::new(120.0, 16);
        let mut notes = vec![
            Note::direction(0.0, Direction::Right),
            Note::direction(16.0, Direction::Down),
            Note::direction(32.0, Direction::Down),
        ];
        let path = build(&mut notes, &ctx);
        let route = path.trace(0.25, 0.75);
        assert_eq!(route.len(), 3);
        assert_close(route[0], Vec2::new(12.0, 0.0));
        assert_close(route[1], Vec2::new(24.0, 0.0));
        assert_close(route[2], Vec2::new(24.0, 12.0));
    }
}
