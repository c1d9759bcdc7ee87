//! Scalar volumes and their display properties.

use super::attributes::{format_bool, format_numbers, parse_bool, parse_f64, parse_numbers, AttributeList};
use super::variant::{NodeVariant, ReferenceRole};
use crate::error::Result;

pub const SCALAR_VOLUME_CLASS: &str = "vtkMRMLScalarVolumeNode";
pub const VOLUME_DISPLAY_CLASS: &str = "vtkMRMLScalarVolumeDisplayNode";

/// Image geometry of a scalar volume. Voxel data itself lives with the
/// storage node's file.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarVolume {
    pub dimensions: [u32; 3],
    pub spacing: [f64; 3],
    pub origin: [f64; 3],
    /// Row-major 3x3 IJK to RAS direction cosines.
    pub ijk_to_ras_directions: [f64; 9],
    pub label_map: bool,
}

impl Default for ScalarVolume {
    fn default() -> Self {
        Self {
            dimensions: [0, 0, 0],
            spacing: [1.0, 1.0, 1.0],
            origin: [0.0, 0.0, 0.0],
            ijk_to_ras_directions: [-1.0, 0.0, 0.0, 0.0, -1.0, 0.0, 0.0, 0.0, 1.0],
            label_map: false,
        }
    }
}

impl ScalarVolume {
    const ROLES: [ReferenceRole; 3] = [
        ReferenceRole::multi("display"),
        ReferenceRole::single("storage"),
        ReferenceRole::single("transform"),
    ];

    /// RAS coordinates of voxel `ijk`.
    pub fn ijk_to_ras(&self, ijk: [f64; 3]) -> [f64; 3] {
        let d = &self.ijk_to_ras_directions;
        let mut ras = self.origin;
        for (row, out) in ras.iter_mut().enumerate() {
            for col in 0..3 {
                *out += d[row * 3 + col] * self.spacing[col] * ijk[col];
            }
        }
        ras
    }

    pub fn voxel_count(&self) -> u64 {
        self.dimensions.iter().map(|&d| u64::from(d)).product()
    }
}

impl NodeVariant for ScalarVolume {
    fn class_name(&self) -> &'static str {
        SCALAR_VOLUME_CLASS
    }

    fn tag_name(&self) -> &'static str {
        "Volume"
    }

    fn reference_roles(&self) -> &'static [ReferenceRole] {
        &Self::ROLES
    }

    fn write_attributes(&self, out: &mut AttributeList) {
        out.push("dimensions", format_numbers(&self.dimensions));
        out.push("spacing", format_numbers(&self.spacing));
        out.push("origin", format_numbers(&self.origin));
        out.push("ijkToRASDirections", format_numbers(&self.ijk_to_ras_directions));
        out.push("labelMap", format_bool(self.label_map));
    }

    fn read_attribute(&mut self, key: &str, value: &str) -> Result<bool> {
        match key {
            "dimensions" => self.dimensions = parse_numbers(key, value)?,
            "spacing" => self.spacing = parse_numbers(key, value)?,
            "origin" => self.origin = parse_numbers(key, value)?,
            "ijkToRASDirections" => self.ijk_to_ras_directions = parse_numbers(key, value)?,
            "labelMap" => self.label_map = parse_bool(key, value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    crate::impl_variant_boilerplate!();
}

/// Window/level display properties of a scalar volume.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeDisplay {
    pub window: f64,
    pub level: f64,
    pub interpolate: bool,
    pub visibility: bool,
}

impl Default for VolumeDisplay {
    fn default() -> Self {
        Self {
            window: 256.0,
            level: 128.0,
            interpolate: true,
            visibility: true,
        }
    }
}

impl VolumeDisplay {
    const ROLES: [ReferenceRole; 2] = [
        ReferenceRole::single("colorNode"),
        ReferenceRole::multi("display"),
    ];

    /// Lower and upper intensity bounds of the window.
    pub fn window_range(&self) -> (f64, f64) {
        let half = self.window / 2.0;
        (self.level - half, self.level + half)
    }
}

impl NodeVariant for VolumeDisplay {
    fn class_name(&self) -> &'static str {
        VOLUME_DISPLAY_CLASS
    }

    fn tag_name(&self) -> &'static str {
        "VolumeDisplay"
    }

    fn reference_roles(&self) -> &'static [ReferenceRole] {
        &Self::ROLES
    }

    fn write_attributes(&self, out: &mut AttributeList) {
        out.push("window", self.window.to_string());
        out.push("level", self.level.to_string());
        out.push("interpolate", format_bool(self.interpolate));
        out.push("visibility", format_bool(self.visibility));
    }

    fn read_attribute(&mut self, key: &str, value: &str) -> Result<bool> {
        match key {
            "window" => self.window = parse_f64(key, value)?,
            "level" => self.level = parse_f64(key, value)?,
            "interpolate" => self.interpolate = parse_bool(key, value)?,
            "visibility" => self.visibility = parse_bool(key, value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    crate::impl_variant_boilerplate!();
}
