//! Helper for building optional `WHERE ... AND ...` clauses.

use sqlx::{Postgres, QueryBuilder};

/// Emits ` WHERE ` before the first condition and ` AND ` before the rest.
#[derive(Debug, Default)]
pub(crate) struct Where {
    started: bool,
}

impl Where {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn next(&mut self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(if self.started { " AND " } else { " WHERE " });
        self.started = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_condition_gets_where() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM t");
        let mut clause = Where::new();
        clause.next(&mut qb);
        qb.push("a = 1");
        clause.next(&mut qb);
        qb.push("b = 2");
        assert_eq!(qb.sql(), "SELECT 1 FROM t WHERE a = 1 AND b = 2");
    }

    #[test]
    fn test_no_conditions_leaves_query_untouched() {
        let qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM t");
        assert_eq!(qb.sql(), "SELECT 1 FROM t");
    }
}
