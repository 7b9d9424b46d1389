//! Node and edge types for the schema dependency graph.
//!
//! ## Design Decisions
//!
//! | Decision | Choice | Rationale |
//! |----------|--------|-----------|
//! | Object/edge kinds | Enum not String | Closed sets; matches are exhaustive |
//! | Node id | `schema.name` | Stable, human-readable, unique per database |
//! | Edge metadata | `BTreeMap<String, String>` | Open-ended; deterministic iteration |
//! | Delete rule | `Option<DeleteRule>` | Views and triggers have none |

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Error;

/// Metadata key under which a foreign key's ordered column list is stored
/// (comma-joined).
pub const FK_COLUMNS_KEY: &str = "fk_columns";

/// Build the canonical node id for a schema-qualified object.
#[must_use]
pub fn node_id(schema: &str, name: &str) -> String {
    format!("{schema}.{name}")
}

// ============================================================================
// Kinds
// ============================================================================

/// Kind of database object a node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    /// Base table (including partitions and placeholders)
    Table,
    /// View or materialized view
    View,
    /// Trigger attached to a table
    Trigger,
}

impl NodeType {
    /// Upper-case label used in reports.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Table => "TABLE",
            Self::View => "VIEW",
            Self::Trigger => "TRIGGER",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of dependency an edge represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyType {
    /// Referencing table -> referenced table
    ForeignKey,
    /// View -> object it selects from
    ViewDepends,
    /// Trigger -> table it fires on, or object its function touches
    TriggerAction,
    /// Partition/child table -> parent table
    Inheritance,
}

impl DependencyType {
    /// Upper-case label used in reports.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ForeignKey => "FOREIGN_KEY",
            Self::ViewDepends => "VIEW_DEPENDS",
            Self::TriggerAction => "TRIGGER_ACTION",
            Self::Inheritance => "INHERITANCE",
        }
    }
}

impl fmt::Display for DependencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Referential action taken when the referenced row is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeleteRule {
    /// `ON DELETE CASCADE`
    Cascade,
    /// `ON DELETE RESTRICT`
    Restrict,
    /// `ON DELETE SET NULL`
    SetNull,
    /// `ON DELETE SET DEFAULT`
    SetDefault,
    /// `ON DELETE NO ACTION` (the SQL default)
    NoAction,
}

impl DeleteRule {
    /// SQL spelling of the rule.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cascade => "CASCADE",
            Self::Restrict => "RESTRICT",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
            Self::NoAction => "NO ACTION",
        }
    }
}

impl fmt::Display for DeleteRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeleteRule {
    type Err = Error;

    /// Accepts the SQL spelling in any case, with `_` or `-` in place of
    /// the space ("set_null", "No Action").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace(['_', '-'], " ");
        match normalized.as_str() {
            "CASCADE" => Ok(Self::Cascade),
            "RESTRICT" => Ok(Self::Restrict),
            "SET NULL" => Ok(Self::SetNull),
            "SET DEFAULT" => Ok(Self::SetDefault),
            "NO ACTION" => Ok(Self::NoAction),
            _ => Err(Error::invalid_value("delete rule", s)),
        }
    }
}

impl Serialize for DeleteRule {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DeleteRule {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Node and Edge
// ============================================================================

/// A database object in the dependency graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Node {
    /// `schema.name`
    pub id: String,
    /// Schema (namespace) the object lives in
    pub schema: String,
    /// Object name within the schema
    pub name: String,
    /// Table, view, or trigger
    pub node_type: NodeType,
    /// Human-readable storage size ("12 MB"); display only
    pub size: String,
    /// Estimated row count; may be approximate
    pub row_count: u64,
    /// Covered columns of each index, in index order
    pub indexes: Vec<Vec<String>>,
}

impl Node {
    pub(crate) fn new(
        schema: &str,
        name: &str,
        node_type: NodeType,
        size: &str,
        row_count: u64,
    ) -> Self {
        Self {
            id: node_id(schema, name),
            schema: schema.to_string(),
            name: name.to_string(),
            node_type,
            size: size.to_string(),
            row_count,
            indexes: Vec::new(),
        }
    }
}

/// A directed dependency: `source` depends on `target`.
///
/// If the target changes, the source is impacted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edge {
    /// Id of the dependent object
    pub source_id: String,
    /// Id of the object depended upon
    pub target_id: String,
    /// Kind of dependency
    pub dep_type: DependencyType,
    /// Originating constraint, if any
    pub constraint_name: Option<String>,
    /// Referential delete action (foreign keys only)
    pub delete_rule: Option<DeleteRule>,
    /// Auxiliary facts, e.g. [`FK_COLUMNS_KEY`]
    pub metadata: BTreeMap<String, String>,
}

impl Edge {
    /// Ordered foreign-key columns recorded on this edge.
    ///
    /// Returns `None` when the metadata is absent or empty.
    #[must_use]
    pub fn fk_columns(&self) -> Option<Vec<&str>> {
        self.metadata
            .get(FK_COLUMNS_KEY)
            .filter(|cols| !cols.is_empty())
            .map(|cols| cols.split(',').map(str::trim).collect())
    }

    /// Record the ordered foreign-key columns for this edge.
    pub fn set_fk_columns<S: AsRef<str>>(&mut self, columns: &[S]) -> &mut Self {
        let joined = columns
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join(",");
        self.metadata.insert(FK_COLUMNS_KEY.to_string(), joined);
        self
    }

    /// Whether deleting the target row deletes the source rows.
    #[must_use]
    pub fn is_cascading_fk(&self) -> bool {
        self.dep_type == DependencyType::ForeignKey && self.delete_rule == Some(DeleteRule::Cascade)
    }
}
