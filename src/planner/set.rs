use std::{collections::HashSet, sync::Arc};

use serde::Serialize;

use crate::{planner::{PlannerError, PlannerResult}, types::{DataType, Literal}};

/// Materialized right-hand side of an `IN (subquery)` predicate.
///
/// Rows are inserted while the producing subquery runs; `finish` marks the
/// set as created. Only created sets can be registered as the output of a
/// subquery node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Set {
    element_types: Vec<DataType>,
    #[serde(skip)]
    elements: HashSet<Vec<Literal>>,
    created: bool,
}

pub type SetPtr = Arc<Set>;

impl Set {
    pub fn new(element_types: Vec<DataType>) -> Self {
        Self { element_types, elements: HashSet::new(), created: false }
    }

    /// Build a created set from rows in one step.
    pub fn from_rows(
        element_types: Vec<DataType>,
        rows: impl IntoIterator<Item = Vec<Literal>>,
    ) -> PlannerResult<SetPtr> {
        let mut set = Set::new(element_types);
        for row in rows {
            set.insert(row)?;
        }
        set.finish();
        Ok(Arc::new(set))
    }

    /// Insert one row; returns whether it was new.
    pub fn insert(&mut self, row: Vec<Literal>) -> PlannerResult<bool> {
        if row.len() != self.element_types.len() {
            return Err(PlannerError::SetArityMismatch {
                expected: self.element_types.len(),
                actual: row.len(),
            });
        }
        Ok(self.elements.insert(row))
    }

    pub fn contains(&self, row: &[Literal]) -> bool {
        self.elements.contains(row)
    }

    pub fn finish(&mut self) {
        self.created = true;
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_checks_arity_and_dedups() {
        let mut set = Set::new(vec![DataType::Int64]);
        assert!(set.insert(vec![Literal::Int(1)]).unwrap());
        assert!(!set.insert(vec![Literal::Int(1)]).unwrap());
        assert_eq!(
            set.insert(vec![Literal::Int(1), Literal::Int(2)]),
            Err(PlannerError::SetArityMismatch { expected: 1, actual: 2 })
        );
        assert_eq!(set.len(), 1);
        assert!(!set.is_created());
    }

    #[test]
    fn test_from_rows_is_created() {
        let set = Set::from_rows(
            vec![DataType::Int64, DataType::String],
            vec![vec![Literal::Int(1), Literal::String("a".into())]],
        )
        .unwrap();

        assert!(set.is_created());
        assert!(set.contains(&[Literal::Int(1), Literal::String("a".into())]));
        assert!(!set.contains(&[Literal::Int(1), Literal::String("b".into())]));
    }
}
