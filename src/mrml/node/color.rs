use super::attributes::{escape, unescape, AttributeList};
use super::variant::NodeVariant;
use crate::error::{MrmlError, Result};

pub const COLOR_TABLE_CLASS: &str = "vtkMRMLColorTableNode";

/// Which built-in palette a table was generated from. `User` tables are
/// edited by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorTableType {
    #[default]
    Grey,
    Labels,
    Rainbow,
    User,
}

impl ColorTableType {
    fn code(self) -> u32 {
        match self {
            ColorTableType::Grey => 1,
            ColorTableType::Labels => 6,
            ColorTableType::Rainbow => 11,
            ColorTableType::User => 13,
        }
    }

    fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(ColorTableType::Grey),
            6 => Some(ColorTableType::Labels),
            11 => Some(ColorTableType::Rainbow),
            13 => Some(ColorTableType::User),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColorEntry {
    pub index: u32,
    pub name: String,
    pub rgba: [f64; 4],
}

/// Lookup table mapping label values to named colours.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ColorTable {
    pub table_type: ColorTableType,
    pub number_of_colors: u32,
    pub entries: Vec<ColorEntry>,
}

impl ColorTable {
    /// Sets or replaces the entry at `index`, growing the table if needed.
    pub fn set_color(&mut self, index: u32, name: impl Into<String>, rgba: [f64; 4]) {
        let entry = ColorEntry {
            index,
            name: name.into(),
            rgba,
        };
        match self.entries.binary_search_by_key(&index, |e| e.index) {
            Ok(pos) => self.entries[pos] = entry,
            Err(pos) => self.entries.insert(pos, entry),
        }
        self.number_of_colors = self.number_of_colors.max(index + 1);
    }

    pub fn color(&self, index: u32) -> Option<&ColorEntry> {
        self.entries
            .binary_search_by_key(&index, |e| e.index)
            .ok()
            .map(|pos| &self.entries[pos])
    }

    pub fn index_of(&self, name: &str) -> Option<u32> {
        self.entries.iter().find(|e| e.name == name).map(|e| e.index)
    }

    fn format_entries(&self) -> String {
        self.entries
            .iter()
            .map(|e| {
                format!(
                    "{} {} {} {} {} {}",
                    e.index,
                    escape(&e.name),
                    e.rgba[0],
                    e.rgba[1],
                    e.rgba[2],
                    e.rgba[3]
                )
            })
            .collect::<Vec<_>>()
            .join(";")
    }

    fn parse_entries(value: &str) -> Result<Vec<ColorEntry>> {
        let mut entries = Vec::new();
        for raw in value.split(';').filter(|e| !e.trim().is_empty()) {
            let tokens: Vec<&str> = raw.split_whitespace().collect();
            if tokens.len() != 6 {
                return Err(MrmlError::parse(format!(
                    "colour entry '{}' needs index, name and four components",
                    raw
                )));
            }
            let number = |t: &str| {
                t.parse::<f64>()
                    .map_err(|_| MrmlError::parse(format!("bad colour component '{}'", t)))
            };
            entries.push(ColorEntry {
                index: tokens[0]
                    .parse()
                    .map_err(|_| MrmlError::parse(format!("bad colour index '{}'", tokens[0])))?,
                name: unescape(tokens[1])?,
                rgba: [
                    number(tokens[2])?,
                    number(tokens[3])?,
                    number(tokens[4])?,
                    number(tokens[5])?,
                ],
            });
        }
        entries.sort_by_key(|e| e.index);
        Ok(entries)
    }
}

impl NodeVariant for ColorTable {
    fn class_name(&self) -> &'static str {
        COLOR_TABLE_CLASS
    }

    fn tag_name(&self) -> &'static str {
        "ColorTable"
    }

    fn write_attributes(&self, out: &mut AttributeList) {
        out.push("type", self.table_type.code().to_string());
        out.push("numcolors", self.number_of_colors.to_string());
        if !self.entries.is_empty() {
            out.push("colors", self.format_entries());
        }
    }

    fn read_attribute(&mut self, key: &str, value: &str) -> Result<bool> {
        match key {
            "type" => {
                self.table_type = value
                    .trim()
                    .parse()
                    .ok()
                    .and_then(ColorTableType::from_code)
                    .ok_or_else(|| MrmlError::parse(format!("unknown colour table type '{}'", value)))?
            }
            "numcolors" => {
                self.number_of_colors = value
                    .trim()
                    .parse()
                    .map_err(|_| MrmlError::parse(format!("bad colour count '{}'", value)))?
            }
            "colors" => self.entries = Self::parse_entries(value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    crate::impl_variant_boilerplate!();
}
