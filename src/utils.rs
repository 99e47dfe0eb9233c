//! General utility functions for tagbridge
//!
//! This module contains common helper functions used across the library.

/// Normalize a tag path for comparison: `\` separators, lower case, no
/// surrounding whitespace or leading separators.
pub fn normalize_tag_path(path: &str) -> String {
    path.trim()
        .replace('/', "\\")
        .trim_start_matches('\\')
        .to_ascii_lowercase()
}

/// Split `path.group` into its relative path and group extension
pub fn split_group(path: &str) -> Option<(&str, &str)> {
    let (stem, group) = path.rsplit_once('.')?;
    if stem.is_empty() || group.is_empty() || group.contains(['\\', '/']) {
        return None;
    }
    Some((stem, group))
}

/// Format a float slice as `a, b, c` for log output
pub fn format_reals(values: &[f32]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// True when two float slices are equal within `epsilon`
pub fn approx_eq(a: &[f32], b: &[f32], epsilon: f32) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() <= epsilon)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_tag_path() {
        assert_eq!(
            normalize_tag_path(" Objects/Vehicles\\Human/Warthog/warthog "),
            "objects\\vehicles\\human\\warthog\\warthog"
        );
        assert_eq!(normalize_tag_path("\\levels\\a"), "levels\\a");
    }

    #[test]
    fn test_split_group() {
        assert_eq!(
            split_group("levels\\multi\\a\\a.scenario"),
            Some(("levels\\multi\\a\\a", "scenario"))
        );
        assert_eq!(split_group("levels\\multi.v2\\a"), None);
        assert_eq!(split_group("noext"), None);
    }

    #[test]
    fn test_format_reals() {
        assert_eq!(format_reals(&[1.0, 2.5, -3.0]), "1, 2.5, -3");
    }

    #[test]
    fn test_approx_eq() {
        assert!(approx_eq(&[1.0, 2.0], &[1.000001, 2.0], 1e-5));
        assert!(!approx_eq(&[1.0], &[1.0, 2.0], 1e-5));
    }
}
