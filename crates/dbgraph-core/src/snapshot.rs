//! Schema snapshots: introspection results saved as JSON.
//!
//! A snapshot is the file form of a schema source. [`SchemaSnapshot::build_graph`]
//! populates a [`Graph`] from it in a fixed order (nodes, indexes, foreign
//! keys, view dependencies, triggers, inheritance) so placeholders and
//! backfills behave the same way every time.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::graph::{DeleteRule, DependencyType, Graph, NodeType, node_id};

/// Constraint name recorded on trigger-to-function edges.
pub const FUNCTION_CALL_CONSTRAINT: &str = "Function Call";

/// Relation kind as reported by the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    /// Ordinary or partitioned table
    Table,
    /// Plain view
    View,
    /// Materialized view; analysed as a view
    MaterializedView,
    /// Trigger
    Trigger,
}

impl From<ObjectKind> for NodeType {
    fn from(kind: ObjectKind) -> Self {
        match kind {
            ObjectKind::Table => Self::Table,
            ObjectKind::View | ObjectKind::MaterializedView => Self::View,
            ObjectKind::Trigger => Self::Trigger,
        }
    }
}

/// A table, view, or trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRecord {
    /// Owning schema
    pub schema: String,
    /// Object name
    pub name: String,
    /// Kind of relation
    #[serde(rename = "type")]
    pub kind: ObjectKind,
    /// Human-readable storage size
    #[serde(default)]
    pub size: String,
    /// Planner row estimate; `-1` means never analysed
    #[serde(default)]
    pub row_count: i64,
}

/// Columns of one index, in index order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRecord {
    /// Schema
    pub schema: String,
    /// Table name
    pub table: String,
    /// Indexed columns
    pub columns: Vec<String>,
}

/// A foreign-key constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyRecord {
    /// Referencing table's schema
    pub schema: String,
    /// Referencing table
    pub table: String,
    /// Referenced table's schema
    pub ref_schema: String,
    /// Referenced table
    pub ref_table: String,
    /// Constraint name
    #[serde(default)]
    pub constraint_name: Option<String>,
    /// `ON DELETE` action
    #[serde(default)]
    pub delete_rule: Option<DeleteRule>,
    /// Referencing columns, in constraint order
    #[serde(default)]
    pub columns: Vec<String>,
}

/// A view reading from a relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewDependencyRecord {
    /// Schema of the view
    pub view_schema: String,
    /// View name
    pub view_name: String,
    /// Schema of the relation read
    pub table_schema: String,
    /// Relation read by the view
    pub table_name: String,
}

/// A routine called by a trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutineRef {
    /// Schema
    pub schema: String,
    /// Routine name
    pub name: String,
}

/// A trigger attached to a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerRecord {
    /// Schema of both the trigger and its table
    pub schema: String,
    /// Trigger name
    pub trigger: String,
    /// Table the trigger fires on
    pub table: String,
    /// Objects the trigger function calls
    #[serde(default)]
    pub calls: Vec<RoutineRef>,
}

/// Table inheritance (child inherits from parent).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InheritanceRecord {
    /// Schema of the inheriting table
    pub child_schema: String,
    /// Inheriting table
    pub child_name: String,
    /// Schema of the parent table
    pub parent_schema: String,
    /// Parent table
    pub parent_name: String,
}

/// One introspection result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaSnapshot {
    /// Tables, views, and triggers
    pub nodes: Vec<ObjectRecord>,
    /// Index column lists
    pub indexes: Vec<IndexRecord>,
    /// Foreign-key constraints
    pub foreign_keys: Vec<ForeignKeyRecord>,
    /// View-to-relation reads
    pub view_dependencies: Vec<ViewDependencyRecord>,
    /// Triggers and their calls
    pub triggers: Vec<TriggerRecord>,
    /// Table inheritance links
    pub inheritance: Vec<InheritanceRecord>,
}

impl SchemaSnapshot {
    /// Parse a snapshot from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] on malformed input, including unknown object
    /// kinds and delete rules.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a snapshot file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read, or [`Error::Json`]
    /// if it does not parse.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let snapshot = Self::from_json(&text)?;
        tracing::debug!(
            path = %path.display(),
            nodes = snapshot.nodes.len(),
            foreign_keys = snapshot.foreign_keys.len(),
            "Loaded schema snapshot"
        );
        Ok(snapshot)
    }

    /// Build the dependency graph described by this snapshot.
    #[must_use]
    pub fn build_graph(&self) -> Graph {
        let mut graph = Graph::new();

        for object in &self.nodes {
            let rows = u64::try_from(object.row_count).unwrap_or(0);
            graph.add_node(
                &object.schema,
                &object.name,
                object.kind.into(),
                &object.size,
                rows,
            );
        }

        for index in &self.indexes {
            let table = node_id(&index.schema, &index.table);
            if !graph.contains(&table) {
                tracing::warn!(table = %table, "Index on unknown table, ignoring");
                continue;
            }
            graph.add_index(&index.schema, &index.table, &index.columns);
        }

        for fk in &self.foreign_keys {
            let edge = graph.add_edge(
                &fk.schema,
                &fk.table,
                &fk.ref_schema,
                &fk.ref_table,
                DependencyType::ForeignKey,
                fk.constraint_name.as_deref(),
                fk.delete_rule,
            );
            if fk.columns.is_empty() {
                tracing::warn!(
                    source = %edge.source_id,
                    target = %edge.target_id,
                    "Foreign key without column list"
                );
            } else {
                edge.set_fk_columns(&fk.columns);
            }
        }

        let mut seen_views = BTreeSet::new();
        for dep in &self.view_dependencies {
            graph.add_node(&dep.view_schema, &dep.view_name, NodeType::View, "", 0);
            let view = node_id(&dep.view_schema, &dep.view_name);
            let table = node_id(&dep.table_schema, &dep.table_name);
            if view == table || !seen_views.insert((view, table)) {
                continue;
            }
            graph.add_edge(
                &dep.view_schema,
                &dep.view_name,
                &dep.table_schema,
                &dep.table_name,
                DependencyType::ViewDepends,
                None,
                None,
            );
        }

        for trigger in &self.triggers {
            graph.add_node(&trigger.schema, &trigger.trigger, NodeType::Trigger, "", 0);
            graph.add_edge(
                &trigger.schema,
                &trigger.trigger,
                &trigger.schema,
                &trigger.table,
                DependencyType::TriggerAction,
                None,
                None,
            );
            for call in &trigger.calls {
                graph.add_edge(
                    &trigger.schema,
                    &trigger.trigger,
                    &call.schema,
                    &call.name,
                    DependencyType::TriggerAction,
                    Some(FUNCTION_CALL_CONSTRAINT),
                    None,
                );
            }
        }

        for link in &self.inheritance {
            graph.add_edge(
                &link.child_schema,
                &link.child_name,
                &link.parent_schema,
                &link.parent_name,
                DependencyType::Inheritance,
                None,
                None,
            );
        }

        tracing::debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "Built dependency graph from snapshot"
        );
        graph
    }
}
