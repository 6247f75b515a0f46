//! Domain entities: core data structures

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::error::DomainError;

/// Kind of a data-source node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Namespace,
    Table,
    Text,
    Date,
    Number,
}

impl DataType {
    pub const ALL: [DataType; 5] = [
        DataType::Namespace,
        DataType::Table,
        DataType::Text,
        DataType::Date,
        DataType::Number,
    ];

    /// Namespace and Table own children, everything else is a leaf.
    pub fn is_reference(self) -> bool {
        matches!(self, DataType::Namespace | DataType::Table)
    }

    /// Types a Table accepts as columns.
    pub fn is_table_column(self) -> bool {
        matches!(self, DataType::Text | DataType::Date | DataType::Number)
    }

    /// Whether a node of this type may be placed directly inside `container`.
    pub fn fits_into(self, container: DataType) -> bool {
        match container {
            DataType::Namespace => true,
            DataType::Table => self.is_table_column(),
            DataType::Text | DataType::Date | DataType::Number => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DataType::Namespace => "namespace",
            DataType::Table => "table",
            DataType::Text => "text",
            DataType::Date => "date",
            DataType::Number => "number",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DataType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DomainError::UnknownDataType(s.to_string()))
    }
}

/// Opaque node identity.
///
/// Assigned once when a node enters a tree and never reused, so external
/// references (bindings) survive renames and moves.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn generate() -> Self {
        Self(format!("N{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Plain nested node shape used for loading, exporting and as the template for new nodes.
///
/// Carries no parent link; `children` is only meaningful for reference types and
/// gets normalized when the record is turned into tree nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<NodeId>,
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: DataType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<NodeRecord>>,
}

impl NodeRecord {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            id: None,
            name: name.into(),
            data_type,
            children: None,
        }
    }

    pub fn with_children(mut self, children: Vec<NodeRecord>) -> Self {
        self.children = Some(children);
        self
    }

    /// Same tree shape (names, types, nesting), ignoring ids.
    pub fn is_isomorphic(&self, other: &NodeRecord) -> bool {
        let left = self.children.as_deref().unwrap_or_default();
        let right = other.children.as_deref().unwrap_or_default();
        self.name == other.name
            && self.data_type == other.data_type
            && left.len() == right.len()
            && left.iter().zip(right).all(|(l, r)| l.is_isomorphic(r))
    }
}

/// Insert position relative to an anchor sibling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Position {
    #[default]
    Before,
    After,
}

/// Rectangular cell range inside a sheet (zero-based, inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellRange {
    pub start_row: u32,
    pub start_column: u32,
    pub end_row: u32,
    pub end_column: u32,
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "R{}C{}:R{}C{}",
            self.start_row, self.start_column, self.end_row, self.end_column
        )
    }
}

fn parse_cell(cell: &str) -> Option<(u32, u32)> {
    let rest = cell.strip_prefix(['R', 'r'])?;
    let (row, column) = rest.split_once(['C', 'c'])?;
    Some((row.parse().ok()?, column.parse().ok()?))
}

/// Parses `R1C2:R5C2`; a single cell `R1C2` yields a one-cell range.
impl FromStr for CellRange {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DomainError::InvalidRange(s.to_string());
        let s = s.trim();
        let (start, end) = s.split_once(':').unwrap_or((s, s));
        let (start_row, start_column) = parse_cell(start).ok_or_else(invalid)?;
        let (end_row, end_column) = parse_cell(end).ok_or_else(invalid)?;
        if end_row < start_row || end_column < start_column {
            return Err(invalid());
        }
        Ok(Self {
            start_row,
            start_column,
            end_row,
            end_column,
        })
    }
}

/// Where in the host spreadsheet a node gets bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindingSheetInfo {
    pub unit_id: String,
    pub sub_unit_id: String,
    pub range: CellRange,
}

/// Association between a tree node and a spreadsheet range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Binding {
    /// Unique binding name, used for data extraction
    pub name: String,
    /// Bound node (non-owning)
    pub node_id: NodeId,
    pub unit_id: String,
    pub sub_unit_id: String,
    pub range: CellRange,
}

/// Persisted binding: refers to the node by its name path since ids are
/// reassigned on every load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindingRecord {
    pub name: String,
    pub node_path: Vec<String>,
    pub unit_id: String,
    pub sub_unit_id: String,
    pub range: CellRange,
}

/// On-disk data-source definition.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DataFormDocument {
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
    #[serde(default)]
    pub bindings: Vec<BindingRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(DataType::Namespace, true, false)]
    #[case(DataType::Table, true, false)]
    #[case(DataType::Text, false, true)]
    #[case(DataType::Date, false, true)]
    #[case(DataType::Number, false, true)]
    fn test_type_groups(#[case] t: DataType, #[case] reference: bool, #[case] column: bool) {
        assert_eq!(t.is_reference(), reference);
        assert_eq!(t.is_table_column(), column);
    }

    #[test]
    fn test_table_rejects_containers() {
        assert!(DataType::Text.fits_into(DataType::Table));
        assert!(!DataType::Namespace.fits_into(DataType::Table));
        assert!(!DataType::Table.fits_into(DataType::Table));
        assert!(DataType::Table.fits_into(DataType::Namespace));
        assert!(!DataType::Text.fits_into(DataType::Date));
    }

    #[test]
    fn test_data_type_from_str() {
        assert_eq!("Table".parse::<DataType>().unwrap(), DataType::Table);
        assert_eq!(" number ".parse::<DataType>().unwrap(), DataType::Number);
        assert!(matches!(
            "matrix".parse::<DataType>(),
            Err(DomainError::UnknownDataType(_))
        ));
    }

    #[rstest]
    #[case("R1C2:R5C2", (1, 2, 5, 2))]
    #[case("r0c0", (0, 0, 0, 0))]
    #[case(" R3C1:R3C4 ", (3, 1, 3, 4))]
    fn test_cell_range_from_str(#[case] input: &str, #[case] expected: (u32, u32, u32, u32)) {
        let range: CellRange = input.parse().unwrap();
        assert_eq!(
            (range.start_row, range.start_column, range.end_row, range.end_column),
            expected
        );
    }

    #[rstest]
    #[case("A1:B2")]
    #[case("R5C1:R1C1")]
    #[case("R1C")]
    fn test_cell_range_rejects_garbage(#[case] input: &str) {
        assert!(matches!(
            input.parse::<CellRange>(),
            Err(DomainError::InvalidRange(_))
        ));
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = NodeId::generate();
        let b = NodeId::generate();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with('N'));
    }

    #[test]
    fn test_record_json_shape() {
        let record = NodeRecord::new("orders", DataType::Table)
            .with_children(vec![NodeRecord::new("amount", DataType::Number)]);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "orders",
                "type": "table",
                "children": [{ "name": "amount", "type": "number" }]
            })
        );
    }
}
