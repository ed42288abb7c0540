use crate::error::SettingsError;
use crate::model::{Offset, Point};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SwimlaneSettings {
    pub lane_height: f32,
    pub column_width: f32,
    pub header_width: f32,
    pub loop_clearance: f32,
    pub step_half_width: f32,
}

impl Default for SwimlaneSettings {
    fn default() -> Self {
        Self {
            lane_height: 110.0,
            column_width: 170.0,
            header_width: 150.0,
            loop_clearance: 26.0,
            step_half_width: 48.0,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Radius for binding a loose endpoint to a participant, in pixels.
    pub endpoint_snap_px: f32,
    /// Radius for binding a dropped participant to a loose endpoint, as a
    /// fraction of the canvas width.
    pub placement_snap_fraction: f32,
    pub port_inset: f32,
    pub default_bow: f32,
    pub reciprocal_bow: f32,
    pub self_loop_height: f32,
    pub self_loop_spread: f32,
    pub canvas_center: Point,
    pub radial_radius: f32,
    pub participant_hit_px: f32,
    pub handle_hit_px: f32,
    pub decision_dock_offset: Offset,
    pub open_end_offset: Offset,
    pub swimlane: SwimlaneSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint_snap_px: 70.0,
            placement_snap_fraction: 0.12,
            port_inset: 4.0,
            default_bow: 0.2,
            reciprocal_bow: 0.4,
            self_loop_height: 12.0,
            self_loop_spread: 3.0,
            canvas_center: Point::new(50.0, 50.0),
            radial_radius: 35.0,
            participant_hit_px: 30.0,
            handle_hit_px: 10.0,
            decision_dock_offset: Offset::new(0.0, 9.0),
            open_end_offset: Offset::new(12.0, 0.0),
            swimlane: SwimlaneSettings::default(),
        }
    }
}

fn is_toml(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "toml")
}

pub fn load_settings(path: impl AsRef<Path>) -> Result<Settings, SettingsError> {
    let path = path.as_ref();
    let s = std::fs::read_to_string(path)?;
    if is_toml(path) {
        match toml::from_str::<Settings>(&s) {
            Ok(settings) => Ok(settings),
            Err(e) => serde_json::from_str::<Settings>(&s).map_err(|_| e.into()),
        }
    } else {
        match serde_json::from_str::<Settings>(&s) {
            Ok(settings) => Ok(settings),
            Err(e) => toml::from_str::<Settings>(&s).map_err(|_| e.into()),
        }
    }
}

pub fn save_settings(path: impl AsRef<Path>, settings: &Settings) -> Result<(), SettingsError> {
    let path = path.as_ref();
    let text = if is_toml(path) {
        toml::to_string_pretty(settings)?
    } else {
        serde_json::to_string_pretty(settings)?
    };
    std::fs::write(path, text)?;
    Ok(())
}
