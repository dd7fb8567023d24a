//! Chart renderer: draws a chart's path, notes and events as a static SVG.
//!
//! Every position comes from the timeline's path sampler, so the picture
//! matches what playback shows. World units are scaled by a fixed factor
//! and the drawing is framed by the bounding box of everything rendered.

mod constants;
mod svg_builder;

use std::path::{Path, PathBuf};

use log::info;

use crate::config::SvgOptions;
use crate::error::ChartError;
use crate::model::{Chart, Direction, NoteType};
use crate::path::Vec2;
use crate::timemap::Timeline;
use crate::timing::bpm_differs;
use constants::*;
use svg_builder::SvgBuilder;

/// File name used when the SVG is written into a directory.
pub const SVG_FILE_NAME: &str = "chart_visualization.svg";

// ═══════════════════════════════════════════════════════════════════════
// Public API
// ═══════════════════════════════════════════════════════════════════════

/// Render a chart into a complete SVG document.
pub fn render_chart_to_svg(chart: &Chart, options: &SvgOptions) -> String {
    let timeline = Timeline::compute(chart);
    let scene = Scene::collect(chart, &timeline);
    let view = View::fit(&scene, options);

    let mut svg = SvgBuilder::new(view.width, view.height);

    // Background
    svg.rect(0.0, 0.0, view.width, view.height, BACKGROUND_COLOR);

    // Long-note bars under everything else
    for bar in &scene.long_bars {
        let points: Vec<_> = bar.iter().map(|&p| view.px(p)).collect();
        svg.polyline(&points, LONG_BAR_COLOR, LONG_BAR_WIDTH, 0.6);
    }

    // Path
    let path: Vec<_> = scene.path.iter().map(|&p| view.px(p)).collect();
    svg.polyline(&path, PATH_COLOR, PATH_WIDTH, 1.0);

    // Events
    for event in &scene.events {
        let (x, y) = view.px(event.position);
        let s = EVENT_MARKER_SIZE;
        svg.polygon(&[(x, y - s), (x + s, y), (x, y + s), (x - s, y)], EVENT_COLOR);
        svg.text(x, y - EVENT_LABEL_OFFSET, &event.label, LABEL_SIZE, EVENT_COLOR, "middle");
    }

    // Notes
    for note in &scene.notes {
        let (x, y) = view.px(note.position);
        if note.bpm_change {
            svg.ring(x, y, BPM_RING_RADIUS, BPM_RING_COLOR, BPM_RING_WIDTH);
        }
        if note.note_type == NoteType::Node {
            svg.circle(x, y, NODE_RADIUS, NODE_COLOR);
            let label = if note.wait {
                format!("N{} wait", note.index + 1)
            } else {
                format!("N{}", note.index + 1)
            };
            svg.text(x + NODE_LABEL_OFFSET, y - NODE_LABEL_OFFSET, &label, LABEL_SIZE, LABEL_COLOR, "start");
            continue;
        }
        svg.circle(x, y, NOTE_RADIUS, note_color(note.note_type));
        if note.direction != Direction::None {
            draw_arrow(&mut svg, x, y, note.direction);
        }
    }

    svg.build()
}

/// Render `chart` and write it as [`SVG_FILE_NAME`] inside `dir`.
pub fn write_svg<P: AsRef<Path>>(
    chart: &Chart,
    options: &SvgOptions,
    dir: P,
) -> Result<PathBuf, ChartError> {
    let path = dir.as_ref().join(SVG_FILE_NAME);
    let svg = render_chart_to_svg(chart, options);
    std::fs::write(&path, svg).map_err(|e| ChartError::io(&path, e))?;
    info!("wrote {}", path.display());
    Ok(path)
}

// ═══════════════════════════════════════════════════════════════════════
// Scene
// ═══════════════════════════════════════════════════════════════════════

struct NoteMark {
    index: usize,
    note_type: NoteType,
    direction: Direction,
    position: Vec2,
    wait: bool,
    /// Tempo differs from the previous note in playback order
    bpm_change: bool,
}

struct EventMark {
    label: String,
    position: Vec2,
}

/// Everything to draw, in world coordinates.
struct Scene {
    path: Vec<Vec2>,
    long_bars: Vec<Vec<Vec2>>,
    notes: Vec<NoteMark>,
    events: Vec<EventMark>,
}

impl Scene {
    fn collect(chart: &Chart, timeline: &Timeline) -> Self {
        let ctx = timeline.context();
        let path = timeline.path().points().iter().map(|p| p.position).collect();

        let long_bars = (0..chart.notes.len())
            .filter_map(|i| timeline.long_note_span(i))
            .map(|(start, end)| timeline.path().trace(start, end))
            .filter(|bar| bar.len() >= 2)
            .collect();

        let mut notes = Vec::new();
        let mut previous_bpm = ctx.bpm;
        for index in timeline.notes_by_time() {
            let note = &chart.notes[index];
            let bpm = ctx.note_bpm(note);
            let bpm_change = bpm_differs(bpm, previous_bpm);
            previous_bpm = bpm;

            let Some(position) = timeline.note_position(index) else {
                continue;
            };
            notes.push(NoteMark {
                index,
                note_type: note.note_type,
                direction: note.direction,
                position,
                wait: note.is_wait_node(),
                bpm_change,
            });
        }

        let events = chart
            .events
            .iter()
            .filter_map(|event| {
                Some(EventMark {
                    label: event.label(),
                    position: timeline.position_at_time(event.event_time)?,
                })
            })
            .collect();

        Self {
            path,
            long_bars,
            notes,
            events,
        }
    }

    fn points(&self) -> impl Iterator<Item = Vec2> + '_ {
        self.path
            .iter()
            .copied()
            .chain(self.long_bars.iter().flatten().copied())
            .chain(self.notes.iter().map(|n| n.position))
            .chain(self.events.iter().map(|e| e.position))
    }

    /// `(min, max)` over every rendered point, at least one unit wide and
    /// tall. An empty scene is the unit square at the origin.
    fn bounds(&self) -> (Vec2, Vec2) {
        let mut points = self.points();
        let Some(first) = points.next() else {
            return (Vec2::ZERO, Vec2::new(1.0, 1.0));
        };
        let (min, max) = points.fold((first, first), |(lo, hi), p| {
            (
                Vec2::new(lo.x.min(p.x), lo.y.min(p.y)),
                Vec2::new(hi.x.max(p.x), hi.y.max(p.y)),
            )
        });
        let max = Vec2::new(max.x.max(min.x + 1.0), max.y.max(min.y + 1.0));
        (min, max)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Projection
// ═══════════════════════════════════════════════════════════════════════

/// World → SVG mapping.
struct View {
    origin: Vec2,
    scale: f64,
    margin: f64,
    width: f64,
    height: f64,
}

impl View {
    fn fit(scene: &Scene, options: &SvgOptions) -> Self {
        let (min, max) = scene.bounds();
        Self {
            origin: min,
            scale: options.scale,
            margin: options.margin,
            width: (max.x - min.x) * options.scale + 2.0 * options.margin,
            height: (max.y - min.y) * options.scale + 2.0 * options.margin,
        }
    }

    fn px(&self, p: Vec2) -> (f64, f64) {
        (
            (p.x - self.origin.x) * self.scale + self.margin,
            (p.y - self.origin.y) * self.scale + self.margin,
        )
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Markers
// ═══════════════════════════════════════════════════════════════════════

fn note_color(note_type: NoteType) -> &'static str {
    match note_type {
        NoteType::Tab | NoteType::LongTab => TAB_COLOR,
        NoteType::Direction | NoteType::LongDirection => DIRECTION_COLOR,
        NoteType::Both | NoteType::LongBoth => BOTH_COLOR,
        NoteType::Node => NODE_COLOR,
    }
}

/// Arrow from the marker centre along the note's direction.
fn draw_arrow(svg: &mut SvgBuilder, x: f64, y: f64, direction: Direction) {
    let (dx, dy) = direction.unit_vector();
    let tip = (x + dx * ARROW_LENGTH, y + dy * ARROW_LENGTH);
    svg.line(x, y, tip.0, tip.1, ARROW_COLOR, ARROW_WIDTH);

    // Perpendicular for the head's base.
    let (px, py) = (-dy, dx);
    let base = (tip.0 - dx * ARROW_HEAD, tip.1 - dy * ARROW_HEAD);
    svg.polygon(
        &[
            tip,
            (base.0 + px * ARROW_HEAD, base.1 + py * ARROW_HEAD),
            (base.0 - px * ARROW_HEAD, base.1 - py * ARROW_HEAD),
        ],
        ARROW_COLOR,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Event, EventType, Note};

    fn options() -> SvgOptions {
        SvgOptions::default()
    }

    #[test]
    fn empty_chart_uses_unit_box() {
        let svg = render_chart_to_svg(&Chart::default(), &options());
        assert!(svg.starts_with("<?xml"));
        // 1 unit * 10 px + 2 * 40 px margin
        assert!(svg.contains(r#"width="90.0" height="90.0""#), "{svg}");
        let doc = roxmltree::Document::parse(&svg).unwrap();
        assert_eq!(doc.root_element().tag_name().name(), "svg");
    }

    #[test]
    fn draws_path_notes_and_events() {
        let mut chart = Chart::new(120.0, 16);
        chart.notes = vec![
            Note::direction(0.0, Direction::Right),
            Note::long(NoteType::LongTab, 8.0, Direction::None, 8.0),
            Note::node(24.0, true),
            Note::direction(48.0, Direction::Down).with_bpm(180.0),
        ];
        chart.events.push(Event::from_catalog(EventType::Camera, "shake", 0.5));
        let svg = render_chart_to_svg(&chart, &options());
        let doc = roxmltree::Document::parse(&svg).unwrap();

        let polylines = doc.descendants().filter(|n| n.has_tag_name("polyline")).count();
        assert_eq!(polylines, 2, "path + one long bar");
        let rings = doc
            .descendants()
            .filter(|n| n.has_tag_name("circle") && n.attribute("fill") == Some("none"))
            .count();
        assert_eq!(rings, 1);
        let labels: Vec<_> = doc
            .descendants()
            .filter(|n| n.has_tag_name("text"))
            .filter_map(|n| n.text())
            .collect();
        assert!(labels.contains(&"camera:shake"));
        assert!(labels.contains(&"N3 wait"));
    }

    #[test]
    fn width_follows_bounding_box() {
        let mut chart = Chart::new(120.0, 16);
        chart.notes = vec![
            Note::direction(0.0, Direction::Right),
            Note::direction(16.0, Direction::Right),
        ];
        // 0.5 s at 48 units/s = 24 units wide, 1 unit tall
        let svg = render_chart_to_svg(&chart, &options());
        assert!(svg.contains(r#"width="320.0" height="90.0""#), "{svg}");
    }

    #[test]
    fn write_svg_uses_fixed_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_svg(&Chart::default(), &options(), dir.path()).unwrap();
        assert_eq!(path.file_name().unwrap(), SVG_FILE_NAME);
        assert!(std::fs::read_to_string(path).unwrap().contains("<svg"));
    }
}
