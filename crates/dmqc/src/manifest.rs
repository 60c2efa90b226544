//! Expected-scan manifest
//!
//! Per site, the project file declares which scan tags should be acquired,
//! how many of each, and where they sort in the report:
//!
//! ```yaml
//! ExportInfo:
//!   T1:         {Pattern: {...}, Count: 1, Order: 0}
//!   DTI60-1000: {Count: 1, Order: 2}
//! ```
//!
//! The sequence form (`- T1: {...}`) is accepted as well. Declaration order
//! is kept; it is the tie-break for missing-scan rows.

use crate::config::ProjectConfig;
use crate::error::{QcError, Result};
use serde::Serialize;
use serde_yaml::{Mapping, Value};
use std::collections::HashMap;

/// Expected acquisitions for one tag at one site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpectedEntry {
    pub tag: String,
    pub expected_count: u32,
    /// Sort key for report rows; 0 when the project file has no `Order`.
    pub order_key: i64,
}

impl ExpectedEntry {
    pub fn new(tag: impl Into<String>, expected_count: u32, order_key: i64) -> Self {
        Self {
            tag: tag.into(),
            expected_count,
            order_key,
        }
    }
}

/// All expected tags for one site, in declaration order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExpectedManifest {
    site: String,
    entries: Vec<ExpectedEntry>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl ExpectedManifest {
    /// Build the manifest for `site` from the project configuration.
    pub fn build(config: &ProjectConfig, site: &str) -> Result<Self> {
        let site_config = config.site(site)?;
        let export_info = site_config.export_info.as_ref().ok_or_else(|| {
            QcError::Config(format!("site '{}' has no ExportInfo block", site))
        })?;
        Self::from_export_info(site, export_info)
    }

    /// Interpret a raw `ExportInfo` value.
    pub fn from_export_info(site: &str, export_info: &Value) -> Result<Self> {
        let mut entries = Vec::new();
        match export_info {
            Value::Mapping(map) => collect_entries(site, map, &mut entries)?,
            Value::Sequence(items) => {
                for item in items {
                    let map = item.as_mapping().ok_or_else(|| {
                        QcError::Config(format!(
                            "site '{}': ExportInfo list items must be 'TAG: {{...}}' mappings",
                            site
                        ))
                    })?;
                    collect_entries(site, map, &mut entries)?;
                }
            }
            Value::Null => {}
            _ => {
                return Err(QcError::Config(format!(
                    "site '{}': ExportInfo must be a mapping of tags",
                    site
                )))
            }
        }
        Self::from_entries(site, entries)
    }

    /// Assemble a manifest from entries; duplicate tags are rejected.
    pub fn from_entries(site: &str, entries: Vec<ExpectedEntry>) -> Result<Self> {
        let mut index = HashMap::with_capacity(entries.len());
        for (position, entry) in entries.iter().enumerate() {
            if index.insert(entry.tag.clone(), position).is_some() {
                return Err(QcError::Config(format!(
                    "site '{}': tag '{}' is declared more than once in ExportInfo",
                    site, entry.tag
                )));
            }
        }
        Ok(Self {
            site: site.to_string(),
            entries,
            index,
        })
    }

    pub fn site(&self) -> &str {
        &self.site
    }

    pub fn get(&self, tag: &str) -> Option<&ExpectedEntry> {
        self.index.get(tag).map(|&position| &self.entries[position])
    }

    /// Declaration position of `tag`.
    pub fn position(&self, tag: &str) -> Option<usize> {
        self.index.get(tag).copied()
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.index.contains_key(tag)
    }

    pub fn entries(&self) -> &[ExpectedEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn collect_entries(site: &str, map: &Mapping, entries: &mut Vec<ExpectedEntry>) -> Result<()> {
    for (key, fields) in map {
        let tag = key.as_str().ok_or_else(|| {
            QcError::Config(format!("site '{}': ExportInfo tag {:?} is not a string", site, key))
        })?;
        entries.push(parse_entry(site, tag, fields)?);
    }
    Ok(())
}

fn parse_entry(site: &str, tag: &str, fields: &Value) -> Result<ExpectedEntry> {
    let fail = |what: String| QcError::Config(format!("site '{}', tag '{}': {}", site, tag, what));

    let fields = fields
        .as_mapping()
        .ok_or_else(|| fail("expected a mapping with a Count".to_string()))?;

    let count = match fields.get("Count") {
        None | Some(Value::Null) => return Err(fail("Count is missing".to_string())),
        Some(Value::Number(n)) => match (n.as_u64(), n.as_i64()) {
            (Some(count), _) => u32::try_from(count)
                .map_err(|_| fail(format!("Count {} is too large", count)))?,
            (None, Some(negative)) => return Err(fail(format!("Count {} is negative", negative))),
            _ => return Err(fail(format!("Count {} is not an integer", n))),
        },
        Some(other) => return Err(fail(format!("Count {:?} is not numeric", other))),
    };

    let order_key = match fields.get("Order") {
        None | Some(Value::Null) => 0,
        Some(Value::Number(n)) => n
            .as_i64()
            .ok_or_else(|| fail(format!("Order {} is not an integer", n)))?,
        // A list of positions sorts by its smallest member.
        Some(Value::Sequence(items)) => items
            .iter()
            .map(|item| {
                item.as_i64()
                    .ok_or_else(|| fail(format!("Order entry {:?} is not an integer", item)))
            })
            .collect::<Result<Vec<i64>>>()?
            .into_iter()
            .min()
            .ok_or_else(|| fail("Order list is empty".to_string()))?,
        Some(other) => return Err(fail(format!("Order {:?} is not an integer", other))),
    };

    Ok(ExpectedEntry::new(tag, count, order_key))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn export_info(yaml: &str) -> Value {
        serde_yaml::from_str(yaml).unwrap()
    }

    fn config_error(result: Result<ExpectedManifest>) -> String {
        match result {
            Err(QcError::Config(msg)) => msg,
            other => panic!("expected config error, got {:?}", other),
        }
    }

    #[test]
    fn test_mapping_form_keeps_declaration_order() {
        let info = export_info(
            "T1: {Count: 1, Order: 0}\nRST: {Count: 2, Order: 3}\nFMAP: {Count: 1}\n",
        );
        let manifest = ExpectedManifest::from_export_info("CMH", &info).unwrap();

        let tags: Vec<&str> = manifest.entries().iter().map(|e| e.tag.as_str()).collect();
        assert_eq!(tags, vec!["T1", "RST", "FMAP"]);
        assert_eq!(manifest.get("RST"), Some(&ExpectedEntry::new("RST", 2, 3)));
        assert_eq!(manifest.get("FMAP").unwrap().order_key, 0);
        assert_eq!(manifest.position("FMAP"), Some(2));
        assert!(!manifest.contains("DTI"));
    }

    #[test]
    fn test_sequence_form() {
        let info = export_info("- T1: {Pattern: {SagT1: ''}, Count: 1}\n- DTI: {Count: 2, Order: 1}\n");
        let manifest = ExpectedManifest::from_export_info("CMH", &info).unwrap();
        assert_eq!(manifest.len(), 2);
        assert_eq!(manifest.get("DTI").unwrap().expected_count, 2);
    }

    #[test]
    fn test_order_list_uses_minimum() {
        let info = export_info("T1: {Count: 2, Order: [4, 2, 7]}\n");
        let manifest = ExpectedManifest::from_export_info("CMH", &info).unwrap();
        assert_eq!(manifest.get("T1").unwrap().order_key, 2);
    }

    #[test]
    fn test_zero_count_is_legal() {
        let info = export_info("T2: {Count: 0}\n");
        let manifest = ExpectedManifest::from_export_info("CMH", &info).unwrap();
        assert_eq!(manifest.get("T2").unwrap().expected_count, 0);
    }

    #[test]
    fn test_count_errors() {
        let missing = config_error(ExpectedManifest::from_export_info(
            "CMH",
            &export_info("T1: {Order: 1}\n"),
        ));
        assert!(missing.contains("Count is missing"), "{}", missing);

        let text = config_error(ExpectedManifest::from_export_info(
            "CMH",
            &export_info("T1: {Count: two}\n"),
        ));
        assert!(text.contains("not numeric"), "{}", text);

        let negative = config_error(ExpectedManifest::from_export_info(
            "CMH",
            &export_info("T1: {Count: -1}\n"),
        ));
        assert!(negative.contains("negative"), "{}", negative);

        let fractional = config_error(ExpectedManifest::from_export_info(
            "CMH",
            &export_info("T1: {Count: 1.5}\n"),
        ));
        assert!(fractional.contains("not an integer"), "{}", fractional);
    }

    #[test]
    fn test_duplicate_tag_rejected() {
        let info = export_info("- T1: {Count: 1}\n- T1: {Count: 2}\n");
        let msg = config_error(ExpectedManifest::from_export_info("CMH", &info));
        assert!(msg.contains("more than once"));
    }

    #[test]
    fn test_build_from_project() {
        let config = ProjectConfig::from_yaml(
            "paths: {dcm: /d, nii: /n, qc: /q, std: /s, meta: /m}\n\
             Sites:\n  CMH:\n    ExportInfo:\n      T1: {Count: 1}\n  MRC: {}\n",
        )
        .unwrap();

        let manifest = ExpectedManifest::build(&config, "CMH").unwrap();
        assert_eq!(manifest.site(), "CMH");
        assert_eq!(manifest.len(), 1);

        let unknown = config_error(ExpectedManifest::build(&config, "ZHH"));
        assert!(unknown.contains("ZHH"));

        let no_export = config_error(ExpectedManifest::build(&config, "MRC"));
        assert!(no_export.contains("no ExportInfo"));
    }
}
