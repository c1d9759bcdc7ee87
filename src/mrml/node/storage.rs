use super::attributes::{format_bool, parse_bool, AttributeList};
use super::variant::NodeVariant;
use crate::error::Result;
use std::path::Path;

pub const VOLUME_STORAGE_CLASS: &str = "vtkMRMLVolumeArchetypeStorageNode";

/// Where a volume's voxels are stored on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeStorage {
    pub file_name: Option<String>,
    pub use_compression: bool,
}

impl Default for VolumeStorage {
    fn default() -> Self {
        Self {
            file_name: None,
            use_compression: true,
        }
    }
}

impl VolumeStorage {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: Some(file_name.into()),
            ..Default::default()
        }
    }

    /// Lower-cased extension of the file name, used to pick a reader.
    pub fn extension(&self) -> Option<String> {
        let name = self.file_name.as_deref()?;
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".nii.gz") {
            return Some("nii.gz".to_string());
        }
        Path::new(&lower)
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned())
    }
}

impl NodeVariant for VolumeStorage {
    fn class_name(&self) -> &'static str {
        VOLUME_STORAGE_CLASS
    }

    fn tag_name(&self) -> &'static str {
        "VolumeArchetypeStorage"
    }

    fn write_attributes(&self, out: &mut AttributeList) {
        if let Some(file_name) = &self.file_name {
            out.push("fileName", file_name.clone());
        }
        out.push("useCompression", format_bool(self.use_compression));
    }

    fn read_attribute(&mut self, key: &str, value: &str) -> Result<bool> {
        match key {
            "fileName" => self.file_name = Some(value.to_string()),
            "useCompression" => self.use_compression = parse_bool(key, value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    crate::impl_variant_boilerplate!();
}
