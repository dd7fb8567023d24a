//! chartlib: timing, path and export library for a rhythm game chart editor.
//!
//! Notes are placed on a beat grid with per-note tempo overrides and
//! section resets. From that, the library derives every note's playback
//! time, builds the moving path the player follows, samples positions on
//! it, and reads/writes the game's chart JSON.
//!
//! # Example
//! ```no_run
//! use chartlib::{load_chart_file, Platform, Timeline};
//!
//! let chart = load_chart_file("charts/basic.json", Platform::Windows).unwrap();
//! let timeline = Timeline::compute(&chart);
//! println!("Notes: {}", chart.notes.len());
//! println!("Position at 1.5s: {:?}", timeline.position_at_time(1.5));
//! ```

pub mod config;
pub mod document;
pub mod error;
pub mod events;
pub mod model;
pub mod path;
pub mod playback;
pub mod renderer;
pub mod serializer;
pub mod timemap;
pub mod timing;
pub mod validate;

use std::path::Path;

pub use config::{Config, Platform, SvgOptions};
pub use document::Document;
pub use error::ChartError;
pub use model::*;
pub use path::{ChartPath, PathPoint, Vec2};
pub use playback::{generate_position_map, position_map_to_json, PositionMap};
pub use renderer::{render_chart_to_svg, write_svg, SVG_FILE_NAME};
pub use serializer::{export_chart_json, import_chart_json, load_chart_json};
pub use timemap::Timeline;
pub use timing::TimingContext;
pub use validate::{validate_chart, ValidationReport};

/// Read a chart file in either JSON shape (exported chart or autosave).
pub fn load_chart_file<P: AsRef<Path>>(path: P, platform: Platform) -> Result<Chart, ChartError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| ChartError::io(path, e))?;
    load_chart_json(&text, platform)
}

/// Load a chart file and render it directly to SVG.
pub fn render_file_to_svg<P: AsRef<Path>>(
    path: P,
    platform: Platform,
    options: &SvgOptions,
) -> Result<String, ChartError> {
    let chart = load_chart_file(path, platform)?;
    Ok(render_chart_to_svg(&chart, options))
}

/// Render chart JSON (either shape) to SVG.
pub fn render_json_to_svg(
    text: &str,
    platform: Platform,
    options: &SvgOptions,
) -> Result<String, ChartError> {
    let chart = load_chart_json(text, platform)?;
    Ok(render_chart_to_svg(&chart, options))
}

// ═══════════════════════════════════════════════════════════════════════
// C FFI for the native editor host
// ═══════════════════════════════════════════════════════════════════════

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

/// # Safety
/// `ptr` must be null or a valid null-terminated C string.
unsafe fn str_arg<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().ok()
}

fn into_c_string(result: Result<String, ChartError>) -> *mut c_char {
    match result {
        Ok(s) => CString::new(s).unwrap_or_default().into_raw(),
        Err(e) => {
            log::warn!("ffi call failed: {e}");
            std::ptr::null_mut()
        }
    }
}

/// Render chart JSON (exported chart or autosave) and return SVG as a C
/// string. The caller must free the returned string with
/// `chartlib_free_string`. Returns null on error.
///
/// `scale` is pixels per world unit. Pass 0.0 to use the default.
///
/// # Safety
/// `json` must be a valid null-terminated UTF-8 C string.
#[no_mangle]
pub unsafe extern "C" fn chartlib_render_json(json: *const c_char, scale: f64) -> *mut c_char {
    let Some(text) = (unsafe { str_arg(json) }) else {
        return std::ptr::null_mut();
    };
    let mut options = SvgOptions::default();
    if scale > 0.0 {
        options.scale = scale;
    }
    into_c_string(render_json_to_svg(text, Platform::current(), &options))
}

/// Convert autosave JSON into exported chart JSON.
/// The caller must free the returned string with `chartlib_free_string`.
///
/// # Safety
/// `json` must be a valid null-terminated UTF-8 C string.
#[no_mangle]
pub unsafe extern "C" fn chartlib_export_json(json: *const c_char) -> *mut c_char {
    let Some(text) = (unsafe { str_arg(json) }) else {
        return std::ptr::null_mut();
    };
    let platform = Platform::current();
    into_c_string(
        serializer::from_autosave_json(text, platform)
            .and_then(|chart| export_chart_json(&chart, platform)),
    )
}

/// Position map JSON for chart JSON in either shape.
/// The caller must free the returned string with `chartlib_free_string`.
///
/// # Safety
/// `json` must be a valid null-terminated UTF-8 C string.
#[no_mangle]
pub unsafe extern "C" fn chartlib_position_map(json: *const c_char) -> *mut c_char {
    let Some(text) = (unsafe { str_arg(json) }) else {
        return std::ptr::null_mut();
    };
    into_c_string(
        load_chart_json(text, Platform::current())
            .map(|chart| position_map_to_json(&generate_position_map(&chart))),
    )
}

/// Free a string previously returned by chartlib functions.
///
/// # Safety
/// `ptr` must be a string previously returned by a chartlib function, or null.
#[no_mangle]
pub unsafe extern "C" fn chartlib_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        unsafe {
            let _ = CString::from_raw(ptr);
        }
    }
}
