//! Court lookup and search.

use crate::PostgresStore;
use crate::error::map_sqlx;
use crate::rows::{self, COURT_COLUMNS, LOCATION_COLUMNS};
use courtside_core::filter::{CourtFilter, CourtPredicate};
use courtside_core::store::CourtCatalog;
use courtside_core::{Court, CourtId, CourtWithLocation, StoreError};
use sqlx::{Postgres, QueryBuilder};

impl CourtCatalog for PostgresStore {
    async fn find_court(&self, court_id: CourtId) -> Result<Option<CourtWithLocation>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {COURT_COLUMNS}, {LOCATION_COLUMNS} \
             FROM courts c JOIN locations l ON l.id = c.location_id \
             WHERE c.id = $1"
        ))
        .bind(court_id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;

        row.map(|row| {
            Ok::<_, StoreError>(CourtWithLocation {
                court: rows::court(&row)?,
                location: rows::location(&row)?,
            })
        })
        .transpose()
    }

    async fn search_courts(&self, filter: &CourtFilter) -> Result<Vec<Court>, StoreError> {
        let mut query: QueryBuilder<'_, Postgres> =
            QueryBuilder::new(format!("SELECT {COURT_COLUMNS} FROM courts c"));

        for (i, predicate) in filter.predicates().into_iter().enumerate() {
            query.push(if i == 0 { " WHERE " } else { " AND " });
            match predicate {
                CourtPredicate::Location(id) => {
                    query.push("c.location_id = ").push_bind(id.get());
                }
                CourtPredicate::Type(court_type) => {
                    query.push("c.type = ").push_bind(court_type.as_str());
                }
                CourtPredicate::Size(size) => {
                    query.push("c.size = ").push_bind(size.as_str());
                }
            }
        }
        query.push(" ORDER BY c.id");

        let found = query
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)?;
        found.iter().map(rows::court).collect()
    }
}
