//! Court lookup and search.

use crate::{AppError, WebResult};
use crate::response::ApiResponse;
use crate::state::AppState;
use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use courtside_core::environment::Clock;
use courtside_core::filter::CourtFilter;
use courtside_core::store::BookingStore;
use courtside_core::{Court, CourtId, CourtSize, CourtType, CourtWithLocation, FieldError, LocationId};
use serde::Deserialize;
use std::str::FromStr;

/// `GET /api/search` query. Absent or `all` means no constraint.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    /// Location id
    pub location: Option<String>,
    /// `indoor` or `outdoor`
    #[serde(rename = "type")]
    pub court_type: Option<String>,
    /// `full-court` or `half-court`
    pub size: Option<String>,
}

impl SearchQuery {
    /// Fold the query into a filter, collecting every invalid parameter.
    ///
    /// # Errors
    ///
    /// Returns one [`FieldError`] per unparseable parameter.
    pub fn to_filter(&self) -> Result<CourtFilter, Vec<FieldError>> {
        let mut errors = Vec::new();

        let location = parse_param(self.location.as_deref(), "location", &mut errors, |s| {
            s.parse::<i64>().map(LocationId::new).map_err(|e| e.to_string())
        });
        let court_type = parse_param(
            self.court_type.as_deref(),
            "type",
            &mut errors,
            CourtType::from_str,
        );
        let size = parse_param(self.size.as_deref(), "size", &mut errors, CourtSize::from_str);

        if errors.is_empty() {
            Ok(CourtFilter::new()
                .location(location)
                .court_type(court_type)
                .size(size))
        } else {
            Err(errors)
        }
    }
}

fn parse_param<T>(
    raw: Option<&str>,
    field: &str,
    errors: &mut Vec<FieldError>,
    parse: impl FnOnce(&str) -> Result<T, String>,
) -> Option<T> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty() && *s != "all")?;
    match parse(raw) {
        Ok(value) => Some(value),
        Err(message) => {
            errors.push(FieldError::new(field, message));
            None
        }
    }
}

/// `GET /api/courts/{id}`
///
/// # Errors
///
/// 404 when the court does not exist.
pub async fn get_court<S, C>(
    State(state): State<AppState<S, C>>,
    path: Result<Path<i64>, PathRejection>,
) -> WebResult<ApiResponse<CourtWithLocation>>
where
    S: BookingStore + 'static,
    C: Clock + 'static,
{
    let Path(id) = path?;
    let court = state.bookings.court(CourtId::new(id)).await?;
    Ok(ApiResponse::new("Successfully fetched court data", court))
}

/// `GET /api/search?location=&type=&size=`
///
/// # Errors
///
/// 400 for an unknown type, size or a non-numeric location.
pub async fn search_courts<S, C>(
    State(state): State<AppState<S, C>>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> WebResult<ApiResponse<Vec<Court>>>
where
    S: BookingStore + 'static,
    C: Clock + 'static,
{
    let Query(query) = query?;
    let filter = query.to_filter().map_err(|errors| AppError::validation(&errors))?;
    let courts = state.bookings.search_courts(&filter).await?;
    Ok(ApiResponse::new("Successfully fetched courts data", courts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use courtside_core::filter::CourtPredicate;

    fn query(location: Option<&str>, court_type: Option<&str>, size: Option<&str>) -> SearchQuery {
        SearchQuery {
            location: location.map(String::from),
            court_type: court_type.map(String::from),
            size: size.map(String::from),
        }
    }

    #[test]
    fn all_and_absent_mean_no_constraint() {
        let filter = query(Some("all"), None, Some("all")).to_filter();
        assert_eq!(filter.map(|f| f.predicates()), Ok(vec![]));
    }

    #[test]
    fn every_parameter_becomes_a_predicate() {
        let filter = query(Some("2"), Some("outdoor"), Some("half-court")).to_filter();
        assert_eq!(
            filter.map(|f| f.predicates()),
            Ok(vec![
                CourtPredicate::Location(LocationId::new(2)),
                CourtPredicate::Type(CourtType::Outdoor),
                CourtPredicate::Size(CourtSize::HalfCourt),
            ])
        );
    }

    #[test]
    fn invalid_parameters_are_all_reported() {
        let errors = query(Some("north"), Some("grass"), None)
            .to_filter()
            .err()
            .unwrap_or_default();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["location", "type"]);
    }
}
