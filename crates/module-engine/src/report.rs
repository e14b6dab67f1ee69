//! Report aggregation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::module::{DeclarationWarning, ModuleInfo};

/// One module's contribution to the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportEntry {
    pub handle: String,
    pub title: String,
    pub display_order: i32,
    /// Module-defined payload
    pub payload: Value,
}

/// Final output of an analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// Module outputs, sorted by display order
    pub entries: Vec<ReportEntry>,
    /// Declaration warnings raised while building the modules
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<DeclarationWarning>,
    /// Number of events dispatched
    #[serde(default)]
    pub events_dispatched: usize,
}

impl Report {
    /// Returns the entry for a module handle.
    pub fn entry(&self, handle: &str) -> Option<&ReportEntry> {
        self.entries.iter().find(|entry| entry.handle == handle)
    }

    /// Handles in report order.
    pub fn handles(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.handle.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serializes the report to pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Serializes the report to compact JSON (single line).
    pub fn to_json_compact(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Drops modules without output and sorts the rest by display order.
///
/// The sort is stable, so modules sharing a display order keep the order
/// they were given in.
pub fn aggregate<'a, I>(outputs: I) -> Vec<ReportEntry>
where
    I: IntoIterator<Item = (&'a ModuleInfo, Option<Value>)>,
{
    let mut entries: Vec<ReportEntry> = outputs
        .into_iter()
        .filter_map(|(info, payload)| {
            payload.map(|payload| ReportEntry {
                handle: info.handle.clone(),
                title: info.title.clone(),
                display_order: info.display_order,
                payload,
            })
        })
        .collect();
    entries.sort_by_key(|entry| entry.display_order);
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::display_order;
    use serde_json::json;

    fn info(handle: &str, order: i32) -> ModuleInfo {
        ModuleInfo {
            handle: handle.to_string(),
            title: handle.to_uppercase(),
            display_order: order,
            dependencies: Vec::new(),
        }
    }

    #[test]
    fn test_aggregate_sorts_and_drops() {
        let modules = [
            info("damage", display_order::DEFAULT),
            info("hidden", display_order::TOP),
            info("about", display_order::ABOUT),
            info("casts", display_order::DEFAULT),
            info("checklist", display_order::CHECKLIST),
        ];
        let outputs = vec![
            (&modules[0], Some(json!(1))),
            (&modules[1], None),
            (&modules[2], Some(json!(2))),
            (&modules[3], Some(json!(3))),
            (&modules[4], Some(json!(4))),
        ];

        let entries = aggregate(outputs);
        let handles: Vec<&str> = entries.iter().map(|e| e.handle.as_str()).collect();

        assert_eq!(handles, vec!["about", "checklist", "damage", "casts"]);
        assert_eq!(entries[0].title, "ABOUT");
    }

    #[test]
    fn test_report_json_uses_camel_case() {
        let report = Report {
            entries: aggregate(vec![(&info("about", -3), Some(json!({"duration": 5})))]),
            warnings: Vec::new(),
            events_dispatched: 3,
        };

        let value: Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(value["entries"][0]["displayOrder"], json!(-3));
        assert_eq!(value["eventsDispatched"], json!(3));
        assert!(value.get("warnings").is_none());

        let parsed: Report = serde_json::from_str(&report.to_json_compact().unwrap()).unwrap();
        assert_eq!(parsed, report);
    }

    #[test]
    fn test_report_lookup() {
        let report = Report {
            entries: aggregate(vec![(&info("casts", 50), Some(json!([])))]),
            warnings: Vec::new(),
            events_dispatched: 0,
        };

        assert!(report.entry("casts").is_some());
        assert!(report.entry("missing").is_none());
        assert_eq!(report.handles(), vec!["casts"]);
        assert!(!report.is_empty());
    }
}
