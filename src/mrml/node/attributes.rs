//! The flat key/value form every node serializes to.
//!
//! Compound values (the user attribute map, the reference set, numeric
//! vectors) are packed into a single attribute string. The separators used
//! for packing are percent-escaped inside keys and values so that arbitrary
//! text survives a round trip.

use crate::error::{MrmlError, Result};
use crate::ids::NodeId;
use std::collections::BTreeMap;

/// Ordered list of `key="value"` pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeList {
    entries: Vec<(String, String)>,
}

impl AttributeList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.push((key.into(), value.into()));
    }

    /// First value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Copy of the list without the given keys.
    pub fn without(&self, keys: &[&str]) -> AttributeList {
        AttributeList {
            entries: self
                .entries
                .iter()
                .filter(|(k, _)| !keys.contains(&k.as_str()))
                .cloned()
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, String)> for AttributeList {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for AttributeList {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

// `%` must be first when encoding and last when decoding.
const ESCAPES: [(char, &str); 5] = [
    ('%', "%25"),
    (';', "%3B"),
    (':', "%3A"),
    (',', "%2C"),
    (' ', "%20"),
];

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match ESCAPES.iter().find(|(ch, _)| *ch == c) {
            Some((_, code)) => out.push_str(code),
            None => out.push(c),
        }
    }
    out
}

pub fn unescape(encoded: &str) -> Result<String> {
    let mut out = String::with_capacity(encoded.len());
    let mut rest = encoded;
    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let code = rest
            .get(pos..pos + 3)
            .ok_or_else(|| MrmlError::parse(format!("truncated escape in '{}'", encoded)))?;
        let decoded = ESCAPES
            .iter()
            .find(|(_, c)| c.eq_ignore_ascii_case(code))
            .map(|(ch, _)| *ch)
            .ok_or_else(|| MrmlError::parse(format!("unknown escape '{}' in '{}'", code, encoded)))?;
        out.push(decoded);
        rest = &rest[pos + 3..];
    }
    out.push_str(rest);
    Ok(out)
}

pub fn format_bool(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

pub fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => Err(MrmlError::parse(format!(
            "attribute '{}' expects true/false, got '{}'",
            key, other
        ))),
    }
}

pub fn parse_f64(key: &str, value: &str) -> Result<f64> {
    value.trim().parse::<f64>().map_err(|_| {
        MrmlError::parse(format!("attribute '{}' expects a number, got '{}'", key, value))
    })
}

pub fn format_numbers<T: ToString>(values: &[T]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parses exactly `N` whitespace separated numbers.
pub fn parse_numbers<T, const N: usize>(key: &str, value: &str) -> Result<[T; N]>
where
    T: std::str::FromStr + Copy + Default,
{
    let mut out = [T::default(); N];
    let mut count = 0;
    for token in value.split_whitespace() {
        if count == N {
            count += 1;
            break;
        }
        out[count] = token.parse::<T>().map_err(|_| {
            MrmlError::parse(format!("attribute '{}' has a malformed number '{}'", key, token))
        })?;
        count += 1;
    }
    if count != N {
        return Err(MrmlError::parse(format!(
            "attribute '{}' expects {} numbers, got '{}'",
            key, N, value
        )));
    }
    Ok(out)
}

/// Encodes the user attribute map as `k:v;k2:v2`.
pub fn format_map(map: &BTreeMap<String, String>) -> String {
    map.iter()
        .map(|(k, v)| format!("{}:{}", escape(k), escape(v)))
        .collect::<Vec<_>>()
        .join(";")
}

pub fn parse_map(value: &str) -> Result<BTreeMap<String, String>> {
    let mut map = BTreeMap::new();
    for entry in value.split(';').filter(|e| !e.is_empty()) {
        let (k, v) = entry
            .split_once(':')
            .ok_or_else(|| MrmlError::parse(format!("attribute entry '{}' lacks ':'", entry)))?;
        map.insert(unescape(k)?, unescape(v)?);
    }
    Ok(map)
}

/// Reference set: role -> ordered slots, `None` marks an unresolved slot.
pub type ReferenceSet = BTreeMap<String, Vec<Option<NodeId>>>;

/// Encodes references as `role:id1,id2;role2:id3`. Unresolved slots are
/// written as empty tokens.
pub fn format_references(refs: &ReferenceSet) -> String {
    refs.iter()
        .filter(|(_, slots)| !slots.is_empty())
        .map(|(role, slots)| {
            let targets = slots
                .iter()
                .map(|slot| slot.as_ref().map(|id| escape(id.as_str())).unwrap_or_default())
                .collect::<Vec<_>>()
                .join(",");
            format!("{}:{}", escape(role), targets)
        })
        .collect::<Vec<_>>()
        .join(";")
}

pub fn parse_references(value: &str) -> Result<ReferenceSet> {
    let mut refs = ReferenceSet::new();
    for entry in value.split(';').filter(|e| !e.is_empty()) {
        let (role, targets) = entry
            .split_once(':')
            .ok_or_else(|| MrmlError::parse(format!("reference entry '{}' lacks a role", entry)))?;
        let role = unescape(role)?;
        if role.is_empty() {
            return Err(MrmlError::parse(format!("reference entry '{}' has an empty role", entry)));
        }
        let slots = targets
            .split(',')
            .map(|t| {
                if t.is_empty() {
                    Ok(None)
                } else {
                    unescape(t).map(|id| Some(NodeId::new(id)))
                }
            })
            .collect::<Result<Vec<_>>>()?;
        refs.entry(role).or_default().extend(slots);
    }
    Ok(refs)
}
