use super::attributes::{format_numbers, parse_numbers, AttributeList};
use super::variant::{NodeVariant, ReferenceRole};
use crate::error::Result;

pub const LINEAR_TRANSFORM_CLASS: &str = "vtkMRMLLinearTransformNode";

/// Affine transform to the parent coordinate frame. Transforms chain through
/// their own `transform` reference.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearTransform {
    /// Row-major 4x4 homogeneous matrix.
    pub matrix_to_parent: [f64; 16],
}

impl Default for LinearTransform {
    fn default() -> Self {
        Self {
            matrix_to_parent: IDENTITY,
        }
    }
}

const IDENTITY: [f64; 16] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

impl LinearTransform {
    const ROLES: [ReferenceRole; 1] = [ReferenceRole::single("transform")];

    pub fn translation(x: f64, y: f64, z: f64) -> Self {
        let mut matrix = IDENTITY;
        matrix[3] = x;
        matrix[7] = y;
        matrix[11] = z;
        Self {
            matrix_to_parent: matrix,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.matrix_to_parent == IDENTITY
    }

    pub fn apply(&self, point: [f64; 3]) -> [f64; 3] {
        let m = &self.matrix_to_parent;
        let mut out = [0.0; 3];
        for (row, value) in out.iter_mut().enumerate() {
            *value = m[row * 4] * point[0] + m[row * 4 + 1] * point[1] + m[row * 4 + 2] * point[2]
                + m[row * 4 + 3];
        }
        out
    }

    /// `self * other`: applies `other` first.
    pub fn compose(&self, other: &LinearTransform) -> LinearTransform {
        let (a, b) = (&self.matrix_to_parent, &other.matrix_to_parent);
        let mut out = [0.0; 16];
        for row in 0..4 {
            for col in 0..4 {
                out[row * 4 + col] = (0..4).map(|k| a[row * 4 + k] * b[k * 4 + col]).sum();
            }
        }
        LinearTransform {
            matrix_to_parent: out,
        }
    }
}

impl NodeVariant for LinearTransform {
    fn class_name(&self) -> &'static str {
        LINEAR_TRANSFORM_CLASS
    }

    fn tag_name(&self) -> &'static str {
        "LinearTransform"
    }

    fn reference_roles(&self) -> &'static [ReferenceRole] {
        &Self::ROLES
    }

    fn write_attributes(&self, out: &mut AttributeList) {
        out.push("matrixTransformToParent", format_numbers(&self.matrix_to_parent));
    }

    fn read_attribute(&mut self, key: &str, value: &str) -> Result<bool> {
        match key {
            "matrixTransformToParent" => self.matrix_to_parent = parse_numbers(key, value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    crate::impl_variant_boilerplate!();
}
