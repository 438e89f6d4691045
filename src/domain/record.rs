// Tabular card results and row normalization
use serde::Deserialize;
use serde_json::Value;

/// One result row as an ordered column-name to value mapping.
pub type Record = serde_json::Map<String, Value>;

/// Columnar payload returned by the upstream card-query endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TabularResult {
    #[serde(default)]
    pub data: Option<TabularData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TabularData {
    #[serde(default)]
    pub cols: Vec<Column>,
    #[serde(default)]
    pub rows: Vec<Vec<Value>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Column {
    pub name: String,
}

impl TabularData {
    /// Position of the first column whose name appears in `names`,
    /// in the order given.
    pub fn column_index(&self, names: &[&str]) -> Option<usize> {
        names
            .iter()
            .find_map(|name| self.cols.iter().position(|c| c.name == *name))
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Convert a columnar result into one record per row, mapping the column
/// name at ordinal i to the row value at i. An absent result, absent
/// `data`, or absent rows all normalize to an empty sequence.
pub fn normalize(result: Option<&TabularResult>) -> Vec<Record> {
    let Some(data) = result.and_then(|r| r.data.as_ref()) else {
        return Vec::new();
    };

    data.rows
        .iter()
        .map(|row| {
            let mut record = Record::new();
            for (i, col) in data.cols.iter().enumerate() {
                record.insert(col.name.clone(), row.get(i).cloned().unwrap_or(Value::Null));
            }
            record
        })
        .collect()
}

/// Integer coercion used for metric values. Parse failures count as zero.
pub fn value_as_i64(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}
