//! Predefined event catalog and parameter value checks.
//!
//! Camera and background events usually come from the catalog below, which
//! fills in the parameter list with defaults. Custom events carry whatever
//! parameters the author typed.

use crate::model::{Event, EventParam, EventType, ParamType};

/// One parameter slot of a catalog entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub param_type: ParamType,
    pub default: &'static str,
}

/// A predefined event id and its parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CatalogEntry {
    pub event_type: EventType,
    pub event_id: &'static str,
    pub params: &'static [ParamSpec],
}

const fn param(name: &'static str, param_type: ParamType, default: &'static str) -> ParamSpec {
    ParamSpec {
        name,
        param_type,
        default,
    }
}

/// Values accepted by the `easing` enum parameter.
pub const EASING_VALUES: [&str; 4] = ["linear", "easeIn", "easeOut", "easeInOut"];

static CATALOG: &[CatalogEntry] = &[
    CatalogEntry {
        event_type: EventType::Camera,
        event_id: "zoom",
        params: &[
            param("scale", ParamType::Float, "1.0"),
            param("duration", ParamType::Float, "0.5"),
            param("easing", ParamType::Enum, "linear"),
        ],
    },
    CatalogEntry {
        event_type: EventType::Camera,
        event_id: "shake",
        params: &[
            param("intensity", ParamType::Float, "0.3"),
            param("duration", ParamType::Float, "0.25"),
        ],
    },
    CatalogEntry {
        event_type: EventType::Camera,
        event_id: "rotate",
        params: &[
            param("angle", ParamType::Float, "0"),
            param("duration", ParamType::Float, "0.5"),
            param("easing", ParamType::Enum, "easeInOut"),
        ],
    },
    CatalogEntry {
        event_type: EventType::Camera,
        event_id: "offset",
        params: &[
            param("offset", ParamType::Vector2, "0,0"),
            param("duration", ParamType::Float, "0.5"),
        ],
    },
    CatalogEntry {
        event_type: EventType::Camera,
        event_id: "position",
        params: &[
            param("position", ParamType::Vector3, "0,0,-10"),
            param("duration", ParamType::Float, "1.0"),
        ],
    },
    CatalogEntry {
        event_type: EventType::Background,
        event_id: "color",
        params: &[
            param("color", ParamType::Color, "#000000"),
            param("duration", ParamType::Float, "1.0"),
        ],
    },
    CatalogEntry {
        event_type: EventType::Background,
        event_id: "flash",
        params: &[
            param("color", ParamType::Color, "#ffffff"),
            param("duration", ParamType::Float, "0.1"),
            param("repeat", ParamType::Int, "1"),
        ],
    },
    CatalogEntry {
        event_type: EventType::Background,
        event_id: "image",
        params: &[
            param("path", ParamType::String, ""),
            param("opacity", ParamType::Float, "1.0"),
            param("visible", ParamType::Bool, "true"),
        ],
    },
];

/// All predefined entries.
pub fn catalog() -> &'static [CatalogEntry] {
    CATALOG
}

/// Look up a predefined event.
pub fn catalog_entry(event_type: EventType, event_id: &str) -> Option<&'static CatalogEntry> {
    CATALOG
        .iter()
        .find(|e| e.event_type == event_type && e.event_id == event_id)
}

impl Event {
    /// An event with no parameters.
    pub fn new(event_type: EventType, event_id: impl Into<String>, event_time: f64) -> Self {
        Self {
            event_type,
            event_id: event_id.into(),
            event_time,
            event_params: Vec::new(),
        }
    }

    /// An event whose parameters are filled from the catalog defaults.
    /// Unknown ids get an empty parameter list.
    pub fn from_catalog(event_type: EventType, event_id: &str, event_time: f64) -> Self {
        let mut event = Event::new(event_type, event_id, event_time);
        event.populate_params();
        event
    }

    /// Replace the parameter list with the catalog defaults for this
    /// event's id. Returns false if the id is not in the catalog.
    pub fn populate_params(&mut self) -> bool {
        let Some(entry) = catalog_entry(self.event_type, &self.event_id) else {
            return false;
        };
        self.event_params = entry
            .params
            .iter()
            .map(|spec| EventParam {
                param_type: spec.param_type,
                param_name: spec.name.to_string(),
                param_value: spec.default.to_string(),
            })
            .collect();
        true
    }

    pub fn param(&self, name: &str) -> Option<&EventParam> {
        self.event_params.iter().find(|p| p.param_name == name)
    }

    /// Set an existing parameter's value, or append a new string parameter.
    pub fn set_param(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.event_params.iter_mut().find(|p| p.param_name == name) {
            Some(p) => p.param_value = value,
            None => self.event_params.push(EventParam {
                param_type: ParamType::String,
                param_name: name.to_string(),
                param_value: value,
            }),
        }
    }

    /// Short label for markers: `type:id`.
    pub fn label(&self) -> String {
        let kind = match self.event_type {
            EventType::Camera => "camera",
            EventType::Background => "background",
            EventType::Custom => "custom",
        };
        format!("{kind}:{}", self.event_id)
    }
}

/// Check that `value` parses as `param_type`. Returns a reason on failure.
pub fn check_param_value(param_type: ParamType, value: &str) -> Result<(), String> {
    let value = value.trim();
    match param_type {
        ParamType::Float => value
            .parse::<f64>()
            .map(|_| ())
            .map_err(|_| format!("'{value}' is not a number")),
        ParamType::Int => value
            .parse::<i64>()
            .map(|_| ())
            .map_err(|_| format!("'{value}' is not an integer")),
        ParamType::Bool => match value {
            "true" | "false" => Ok(()),
            _ => Err(format!("'{value}' is not true/false")),
        },
        ParamType::Vector2 => check_components(value, 2),
        ParamType::Vector3 => check_components(value, 3),
        ParamType::Color => check_color(value),
        ParamType::Enum => {
            if value.is_empty() {
                Err("enum value is empty".to_string())
            } else {
                Ok(())
            }
        }
        ParamType::String => Ok(()),
    }
}

fn check_components(value: &str, count: usize) -> Result<(), String> {
    let parts: Vec<&str> = value.split(',').map(str::trim).collect();
    if parts.len() != count {
        return Err(format!(
            "'{value}' needs {count} comma-separated components"
        ));
    }
    if parts.iter().any(|p| p.parse::<f64>().is_err()) {
        return Err(format!("'{value}' has a non-numeric component"));
    }
    Ok(())
}

fn check_color(value: &str) -> Result<(), String> {
    let hex = value
        .strip_prefix('#')
        .ok_or_else(|| format!("'{value}' is not a #rrggbb color"))?;
    if matches!(hex.len(), 6 | 8) && hex.chars().all(|c| c.is_ascii_hexdigit()) {
        Ok(())
    } else {
        Err(format!("'{value}' is not a #rrggbb color"))
    }
}
