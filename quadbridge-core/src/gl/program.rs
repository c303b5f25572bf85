//! Per-program uniform cache.
//!
//! Filled once right after a program links. Array uniforms are stored under their
//! base name together with their declared length and the name of element 0; the
//! other elements get consecutive names, so `colors[i]` resolves to `base + i`.

use std::collections::HashMap;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct UniformEntry {
    /// Declared array length (1 for non-arrays).
    pub size: u32,
    /// Location name of element 0.
    pub base: u32,
}

#[derive(Clone, Debug, Default)]
pub struct ProgramInfo {
    pub uniforms: HashMap<String, UniformEntry>,
    /// Longest active uniform name plus the terminator.
    pub max_uniform_length: i32,
    /// Computed on first request.
    pub max_attribute_length: Option<i32>,
    /// Computed on first request.
    pub max_uniform_block_name_length: Option<i32>,
    /// Every location name allocated while linking, retired on relink/delete.
    pub location_names: Vec<u32>,
}

impl ProgramInfo {
    /// Resolve `name` (optionally `base[index]`) to a location name.
    ///
    /// `-1` for unknown uniforms and out-of-range indices.
    pub fn location(&self, name: &str) -> i32 {
        let (base, index) = split_array_index(name);
        let Some(index) = index else {
            tracing::warn!(name, "malformed uniform array index");
            return -1;
        };
        match self.uniforms.get(base) {
            Some(entry) if index < entry.size => (entry.base + index) as i32,
            Some(entry) => {
                tracing::warn!(name, size = entry.size, "uniform array index out of bounds");
                -1
            }
            None => -1,
        }
    }
}

/// Strip a trailing `[..]` accessor.
///
/// `"foo"` and `"foo[]"` both mean element 0. The index is `None` when the
/// accessor is not a number.
pub fn split_array_index(name: &str) -> (&str, Option<u32>) {
    if !name.ends_with(']') {
        return (name, Some(0));
    }
    let Some(open) = name.rfind('[') else {
        return (name, Some(0));
    };
    let digits = &name[open + 1..name.len() - 1];
    let index = if digits.is_empty() {
        Some(0)
    } else {
        digits.parse().ok()
    };
    (&name[..open], index)
}

/// Base name of an active uniform as reported by the native context.
pub fn base_name(name: &str) -> &str {
    if name.ends_with(']') {
        if let Some(open) = name.rfind('[') {
            return &name[..open];
        }
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info_with_colors() -> ProgramInfo {
        let mut info = ProgramInfo::default();
        info.uniforms
            .insert("colors".into(), UniformEntry { size: 3, base: 10 });
        info.uniforms
            .insert("mvp".into(), UniformEntry { size: 1, base: 9 });
        info
    }

    #[test]
    fn array_element_resolves_to_base_plus_index() {
        let info = info_with_colors();
        assert_eq!(info.location("colors[1]"), 11);
        assert_eq!(info.location("colors"), 10);
        assert_eq!(info.location("colors[]"), 10);
    }

    #[test]
    fn out_of_bounds_index_is_not_found() {
        let info = info_with_colors();
        assert_eq!(info.location("colors[5]"), -1);
        assert_eq!(info.location("mvp[1]"), -1);
    }

    #[test]
    fn unknown_or_malformed_names_are_not_found() {
        let info = info_with_colors();
        assert_eq!(info.location("nope"), -1);
        assert_eq!(info.location("colors[x]"), -1);
    }

    #[test]
    fn base_name_strips_reported_array_suffix() {
        assert_eq!(base_name("lights[0]"), "lights");
        assert_eq!(base_name("plain"), "plain");
    }
}
