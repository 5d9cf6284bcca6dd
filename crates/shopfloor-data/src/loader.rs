//! Format detection, file discovery and deserialization helpers for
//! scenario data files.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use shopfloor_core::error::InventoryError;
use shopfloor_core::fixed::{Volume, checked_f64_to_fixed64};

// ===========================================================================
// Errors
// ===========================================================================

#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    #[error("required file '{file}' not found in {dir}")]
    MissingRequired { file: String, dir: PathBuf },

    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files share a base name but differ in format.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    #[error("unresolved {expected_kind} reference '{name}' in {file}")]
    UnresolvedRef {
        file: PathBuf,
        name: String,
        expected_kind: &'static str,
    },

    #[error("duplicate name '{name}' in {file}")]
    DuplicateName { file: PathBuf, name: String },

    /// A numeric field is negative, not finite, or too large for a volume.
    #[error("invalid {field} {value} in {file}")]
    InvalidValue {
        file: PathBuf,
        field: &'static str,
        value: f64,
    },

    /// The inventory refused an entry while building the scenario.
    #[error("{file}: {source}")]
    Rejected {
        file: PathBuf,
        #[source]
        source: InventoryError,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Find `{base_name}.ron`, `.toml` or `.json` in `dir`. More than one is a
/// conflict.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut found: Option<PathBuf> = None;
    for ext in ["ron", "toml", "json"] {
        let candidate = dir.join(format!("{base_name}.{ext}"));
        if !candidate.exists() {
            continue;
        }
        if let Some(existing) = &found {
            return Err(DataLoadError::ConflictingFormats {
                a: existing.clone(),
                b: candidate,
            });
        }
        found = Some(candidate);
    }
    Ok(found)
}

pub fn require_data_file(dir: &Path, base_name: &str) -> Result<PathBuf, DataLoadError> {
    find_data_file(dir, base_name)?.ok_or_else(|| DataLoadError::MissingRequired {
        file: base_name.to_string(),
        dir: dir.to_path_buf(),
    })
}

// ===========================================================================
// Deserialization
// ===========================================================================

fn parse_error(path: &Path, detail: impl ToString) -> DataLoadError {
    DataLoadError::Parse {
        file: path.to_path_buf(),
        detail: detail.to_string(),
    }
}

/// Read a file and deserialize it in the format its extension names.
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    match format {
        Format::Ron => ron::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Json => serde_json::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Toml => toml::from_str(&content).map_err(|e| parse_error(path, e)),
    }
}

/// Deserialize a list. RON and JSON files hold the list directly; a TOML
/// file holds it as an array of tables under `toml_key`.
pub fn deserialize_list<T: DeserializeOwned>(path: &Path, toml_key: &str) -> Result<Vec<T>, DataLoadError> {
    if detect_format(path)? != Format::Toml {
        return deserialize_file(path);
    }
    let content = std::fs::read_to_string(path)?;
    let mut table: toml::Table = toml::from_str(&content).map_err(|e| parse_error(path, e))?;
    let array = table
        .remove(toml_key)
        .ok_or_else(|| parse_error(path, format!("missing key '{toml_key}' in TOML file")))?;
    array
        .try_into()
        .map_err(|e: toml::de::Error| parse_error(path, e))
}

// ===========================================================================
// Name checks
// ===========================================================================

/// Fail on the first name that appears twice.
pub fn check_unique<'a>(
    names: impl IntoIterator<Item = &'a str>,
    file: &Path,
) -> Result<HashSet<&'a str>, DataLoadError> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(DataLoadError::DuplicateName {
                file: file.to_path_buf(),
                name: name.to_string(),
            });
        }
    }
    Ok(seen)
}

/// `UnresolvedRef` unless `name` is in `known`.
pub fn resolve_name(
    known: &HashSet<&str>,
    name: &str,
    file: &Path,
    expected_kind: &'static str,
) -> Result<(), DataLoadError> {
    if known.contains(name) {
        return Ok(());
    }
    Err(DataLoadError::UnresolvedRef {
        file: file.to_path_buf(),
        name: name.to_string(),
        expected_kind,
    })
}

/// Convert a volume read from `file`. Volumes must be finite, non-negative
/// and within the fixed-point range.
pub fn parse_volume(value: f64, file: &Path, field: &'static str) -> Result<Volume, DataLoadError> {
    match checked_f64_to_fixed64(value) {
        Some(volume) if value >= 0.0 => Ok(volume),
        _ => Err(DataLoadError::InvalidValue {
            file: file.to_path_buf(),
            field,
            value,
        }),
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::LocationData;
    use std::fs;

    fn make_test_dir(suffix: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "shopfloor_data_loader_{suffix}_{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn cleanup(dir: &Path) {
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn detects_formats_by_extension() {
        assert_eq!(detect_format(Path::new("a.ron")).unwrap(), Format::Ron);
        assert_eq!(detect_format(Path::new("a.toml")).unwrap(), Format::Toml);
        assert_eq!(detect_format(Path::new("a.json")).unwrap(), Format::Json);
        assert!(matches!(
            detect_format(Path::new("a.yaml")),
            Err(DataLoadError::UnsupportedFormat { .. })
        ));
        assert!(detect_format(Path::new("a")).is_err());
    }

    #[test]
    fn find_reports_missing_and_conflicts() {
        let dir = make_test_dir("find");
        assert_eq!(find_data_file(&dir, "locations").unwrap(), None);
        assert!(matches!(
            require_data_file(&dir, "locations"),
            Err(DataLoadError::MissingRequired { ref file, .. }) if file == "locations"
        ));

        fs::write(dir.join("locations.toml"), "").unwrap();
        assert_eq!(
            find_data_file(&dir, "locations").unwrap(),
            Some(dir.join("locations.toml"))
        );

        fs::write(dir.join("locations.json"), "[]").unwrap();
        assert!(matches!(
            find_data_file(&dir, "locations"),
            Err(DataLoadError::ConflictingFormats { .. })
        ));
        cleanup(&dir);
    }

    #[test]
    fn lists_load_from_every_format() {
        let dir = make_test_dir("lists");
        let ron = dir.join("a.ron");
        fs::write(&ron, r#"[(name: "Rack"), (name: "Dock", kind: Shipping)]"#).unwrap();
        let json = dir.join("b.json");
        fs::write(&json, r#"[{"name": "Rack", "max_volume": 10.0}]"#).unwrap();
        let toml_path = dir.join("c.toml");
        fs::write(
            &toml_path,
            "[[locations]]\nname = \"Rack\"\nmax_items = 4\n\n[[locations]]\nname = \"Dock\"\n",
        )
        .unwrap();

        let a: Vec<LocationData> = deserialize_list(&ron, "locations").unwrap();
        let b: Vec<LocationData> = deserialize_list(&json, "locations").unwrap();
        let c: Vec<LocationData> = deserialize_list(&toml_path, "locations").unwrap();
        assert_eq!(a.len(), 2);
        assert_eq!(b[0].max_volume, 10.0);
        assert_eq!(c[0].max_items, 4);
        assert_eq!(c[1].name, "Dock");
        cleanup(&dir);
    }

    #[test]
    fn toml_list_without_key_is_a_parse_error() {
        let dir = make_test_dir("toml_key");
        let path = dir.join("locations.toml");
        fs::write(&path, "foo = \"bar\"").unwrap();
        let result: Result<Vec<LocationData>, _> = deserialize_list(&path, "locations");
        assert!(matches!(result, Err(DataLoadError::Parse { ref detail, .. }) if detail.contains("locations")));
        cleanup(&dir);
    }

    #[test]
    fn bad_ron_is_a_parse_error() {
        let dir = make_test_dir("bad_ron");
        let path = dir.join("locations.ron");
        fs::write(&path, "not ron {{{").unwrap();
        let result: Result<Vec<LocationData>, _> = deserialize_file(&path);
        assert!(matches!(result, Err(DataLoadError::Parse { .. })));
        cleanup(&dir);
    }

    #[test]
    fn duplicates_and_references() {
        let file = Path::new("locations.ron");
        let known = check_unique(["A", "B"], file).unwrap();
        assert!(resolve_name(&known, "A", file, "location").is_ok());
        assert!(matches!(
            resolve_name(&known, "C", file, "location"),
            Err(DataLoadError::UnresolvedRef { ref name, expected_kind: "location", .. }) if name == "C"
        ));
        assert!(matches!(
            check_unique(["A", "A"], file),
            Err(DataLoadError::DuplicateName { ref name, .. }) if name == "A"
        ));
    }

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: DataLoadError = io_err.into();
        assert!(matches!(err, DataLoadError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }
}
