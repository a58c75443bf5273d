/// Wire types for the analytics backend.
///
/// The client treats datasets as mostly opaque: rows are kept as ordered JSON
/// maps so column order survives, and every summary field is optional so a
/// partial summary still renders.
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One CSV row: column name to cell value, in file order.
pub type Row = Map<String, Value>;

/// Summary statistics computed server-side for a dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Summary {
    pub total_equipment: Option<u64>,
    pub avg_flowrate: Option<f64>,
    pub avg_pressure: Option<f64>,
    pub avg_temperature: Option<f64>,
    /// Category name to count, in server order (most frequent first).
    pub type_distribution: Option<Map<String, Value>>,
}

impl Summary {
    /// Category counts in server order. Non-numeric counts are skipped.
    pub fn type_counts(&self) -> Vec<(&str, u64)> {
        self.type_distribution
            .iter()
            .flatten()
            .filter_map(|(name, count)| count.as_u64().map(|c| (name.as_str(), c)))
            .collect()
    }
}

/// A parsed upload: row data plus its summary.
///
/// `id`, `file_name` and `uploaded_at` are present on responses from the
/// detail endpoints; they are optional so minimal payloads still decode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded_at: Option<String>,
    #[serde(default)]
    pub data: Vec<Row>,
    #[serde(default)]
    pub summary: Option<Summary>,
}

/// Lightweight record of a previous upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub file_name: String,
    pub uploaded_at: String,
    #[serde(default)]
    pub summary: Option<Summary>,
}

impl HistoryEntry {
    /// Row count shown in the history list; missing summaries count as 0.
    pub fn row_count(&self) -> u64 {
        self.summary
            .as_ref()
            .and_then(|s| s.total_equipment)
            .unwrap_or(0)
    }
}

/// Binary report payload with the server-suggested disposition header.
#[derive(Debug, Clone)]
pub struct Report {
    pub content_disposition: Option<String>,
    pub bytes: Vec<u8>,
}

/// A CSV staged for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dataset_preserves_column_order() {
        let json = r#"{
            "id": "0b6f",
            "file_name": "sample.csv",
            "uploaded_at": "2024-05-01T10:00:00Z",
            "data": [{"Equipment Name": "Pump A", "Type": "Pump", "Flowrate": 100}],
            "summary": {"total_equipment": 1, "avg_flowrate": 100.0,
                        "avg_pressure": 50.0, "avg_temperature": 300.0,
                        "type_distribution": {"Pump": 1}}
        }"#;
        let dataset: Dataset = serde_json::from_str(json).unwrap();
        let keys: Vec<_> = dataset.data[0].keys().cloned().collect();
        assert_eq!(keys, vec!["Equipment Name", "Type", "Flowrate"]);
        assert_eq!(dataset.summary.unwrap().total_equipment, Some(1));
    }

    #[test]
    fn summary_tolerates_null_fields() {
        let json = r#"{"total_equipment": 3, "avg_flowrate": null, "avg_pressure": 1.5}"#;
        let summary: Summary = serde_json::from_str(json).unwrap();
        assert_eq!(summary.total_equipment, Some(3));
        assert_eq!(summary.avg_flowrate, None);
        assert_eq!(summary.avg_temperature, None);
        assert!(summary.type_counts().is_empty());
    }

    #[test]
    fn type_counts_keep_server_order() {
        let json = r#"{"type_distribution": {"Valve": 4, "Pump": 2, "Bogus": "x"}}"#;
        let summary: Summary = serde_json::from_str(json).unwrap();
        assert_eq!(summary.type_counts(), vec![("Valve", 4), ("Pump", 2)]);
    }

    #[test]
    fn history_row_count_defaults_to_zero() {
        let json = r#"[{"id": "a", "file_name": "a.csv", "uploaded_at": "2024-05-01T10:00:00Z"},
                       {"id": "b", "file_name": "b.csv", "uploaded_at": "2024-05-01T09:00:00Z",
                        "summary": {"total_equipment": 7}}]"#;
        let history: Vec<HistoryEntry> = serde_json::from_str(json).unwrap();
        assert_eq!(history[0].row_count(), 0);
        assert_eq!(history[1].row_count(), 7);
    }
}
