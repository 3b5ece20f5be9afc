use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use tracing::trace;

use crate::{planner::{PlannerError, PlannerResult}, types::{NameAndType, NamesAndTypes}};

/// Physical name of one column slot, unique for one query compilation.
pub type ColumnIdentifier = String;

pub type ColumnNameToColumnIdentifier = IndexMap<String, ColumnIdentifier>;

/// Columns read from one table expression (table, table function or subquery)
/// and the identifier each one was given.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TableExpressionColumns {
    /// Valid for table, table function, query table expression nodes
    columns: NamesAndTypes,

    /// Valid for table, table function, query table expression nodes
    columns_names: IndexSet<String>,

    /// Valid only for table table expression node
    alias_columns_names: IndexSet<String>,

    /// Valid for table, table function, query table expression nodes
    column_name_to_column_identifier: ColumnNameToColumnIdentifier,
}

impl TableExpressionColumns {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_column(&self, column_name: &str) -> bool {
        self.alias_columns_names.contains(column_name) || self.columns_names.contains(column_name)
    }

    /// Add a column known to be new. Fails if a column or alias column with this name exists.
    pub fn add_column(
        &mut self,
        column: &NameAndType,
        column_identifier: &str,
    ) -> PlannerResult<()> {
        if self.has_column(&column.name) {
            return Err(PlannerError::ColumnAlreadyExists { name: column.name.clone() });
        }

        self.insert_column(column, column_identifier);
        Ok(())
    }

    /// Add a column unless one with the same name exists. Returns whether it was added.
    pub fn add_column_if_not_exists(
        &mut self,
        column: &NameAndType,
        column_identifier: &str,
    ) -> bool {
        if self.has_column(&column.name) {
            return false;
        }

        self.insert_column(column, column_identifier);
        true
    }

    /// Mark a name as an `ALIAS` column of a table. Does not assign an identifier.
    pub fn add_alias_column_name(&mut self, column_name: &str) {
        self.alias_columns_names.insert(column_name.to_string());
    }

    pub fn get_alias_columns_names(&self) -> &IndexSet<String> {
        &self.alias_columns_names
    }

    pub fn get_columns_names(&self) -> &IndexSet<String> {
        &self.columns_names
    }

    /// Columns in insertion order.
    pub fn get_columns(&self) -> &NamesAndTypes {
        &self.columns
    }

    pub fn get_column_name_to_identifier(&self) -> &ColumnNameToColumnIdentifier {
        &self.column_name_to_column_identifier
    }

    pub fn get_column_identifier_or_err(
        &self,
        column_name: &str,
    ) -> PlannerResult<&ColumnIdentifier> {
        self.column_name_to_column_identifier
            .get(column_name)
            .ok_or_else(|| PlannerError::ColumnIdentifierNotFound { name: column_name.to_string() })
    }

    pub fn get_column_identifier_or_null(&self, column_name: &str) -> Option<&ColumnIdentifier> {
        self.column_name_to_column_identifier.get(column_name)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    fn insert_column(&mut self, column: &NameAndType, column_identifier: &str) {
        trace!(column = %column.name, identifier = %column_identifier, "register column");
        self.columns_names.insert(column.name.clone());
        self.columns.push(column.clone());
        self.column_name_to_column_identifier
            .insert(column.name.clone(), column_identifier.to_string());
    }
}
