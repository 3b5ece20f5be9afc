use std::sync::Arc;

use uuid::Uuid;

use crate::planner::PlannerSettings;

/// Read-only execution context of the query being compiled.
#[derive(Debug, Clone)]
pub struct QueryContext {
    query_id: String,
    settings: PlannerSettings,
}

pub type QueryContextPtr = Arc<QueryContext>;

impl QueryContext {
    pub fn new(settings: PlannerSettings) -> QueryContextPtr {
        Self::with_query_id(&Uuid::new_v4().to_string(), settings)
    }

    pub fn with_query_id(query_id: &str, settings: PlannerSettings) -> QueryContextPtr {
        Arc::new(Self { query_id: query_id.to_string(), settings })
    }

    pub fn query_id(&self) -> &str {
        &self.query_id
    }

    pub fn settings(&self) -> &PlannerSettings {
        &self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_query_ids_differ() {
        let a = QueryContext::new(PlannerSettings::default());
        let b = QueryContext::new(PlannerSettings::default());
        assert_ne!(a.query_id(), b.query_id());
        assert!(Uuid::parse_str(a.query_id()).is_ok());
    }
}
