//! Court search predicates.
//!
//! [`CourtFilter`] collects optional constraints and folds them into a flat
//! list of [`CourtPredicate`]s that every backend combines conjunctively.
//! An empty list matches every court.

use crate::types::{Court, CourtSize, CourtType, LocationId};

/// One search constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CourtPredicate {
    /// Court belongs to the location
    Location(LocationId),
    /// Court has the given type
    Type(CourtType),
    /// Court has the given size
    Size(CourtSize),
}

impl CourtPredicate {
    /// Evaluate the predicate against a court.
    #[must_use]
    pub fn matches(&self, court: &Court) -> bool {
        match self {
            Self::Location(id) => court.location_id == *id,
            Self::Type(court_type) => court.court_type == *court_type,
            Self::Size(size) => court.size == *size,
        }
    }
}

/// Builder for court search filters.
///
/// # Example
///
/// ```
/// use courtside_core::filter::{CourtFilter, CourtPredicate};
/// use courtside_core::CourtType;
///
/// let filter = CourtFilter::new().court_type(Some(CourtType::Indoor)).size(None);
/// assert_eq!(filter.predicates(), vec![CourtPredicate::Type(CourtType::Indoor)]);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CourtFilter {
    location: Option<LocationId>,
    court_type: Option<CourtType>,
    size: Option<CourtSize>,
}

impl CourtFilter {
    /// A filter that matches every court.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            location: None,
            court_type: None,
            size: None,
        }
    }

    /// Restrict to a location (`None` = any).
    #[must_use]
    pub const fn location(mut self, location: Option<LocationId>) -> Self {
        self.location = location;
        self
    }

    /// Restrict to a court type (`None` = any).
    #[must_use]
    pub const fn court_type(mut self, court_type: Option<CourtType>) -> Self {
        self.court_type = court_type;
        self
    }

    /// Restrict to a court size (`None` = any).
    #[must_use]
    pub const fn size(mut self, size: Option<CourtSize>) -> Self {
        self.size = size;
        self
    }

    /// Fold the optional constraints into the predicates that apply.
    #[must_use]
    pub fn predicates(&self) -> Vec<CourtPredicate> {
        [
            self.location.map(CourtPredicate::Location),
            self.court_type.map(CourtPredicate::Type),
            self.size.map(CourtPredicate::Size),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// Evaluate all predicates against a court.
    #[must_use]
    pub fn matches(&self, court: &Court) -> bool {
        self.predicates().iter().all(|p| p.matches(court))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CourtId, Money};
    use chrono::Utc;

    fn court(location: i64, court_type: CourtType, size: CourtSize) -> Court {
        Court {
            id: CourtId::new(1),
            location_id: LocationId::new(location),
            name: "Centre".into(),
            description: String::new(),
            size,
            court_type,
            price_per_hour: Money::from_cents(2500),
            image: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn empty_filter_matches_everything() {
        let filter = CourtFilter::new();
        assert!(filter.predicates().is_empty());
        assert!(filter.matches(&court(1, CourtType::Indoor, CourtSize::FullCourt)));
    }

    #[test]
    fn predicates_are_combined_conjunctively() {
        let filter = CourtFilter::new()
            .location(Some(LocationId::new(2)))
            .court_type(Some(CourtType::Outdoor));

        assert_eq!(filter.predicates().len(), 2);
        assert!(filter.matches(&court(2, CourtType::Outdoor, CourtSize::HalfCourt)));
        assert!(!filter.matches(&court(2, CourtType::Indoor, CourtSize::HalfCourt)));
        assert!(!filter.matches(&court(3, CourtType::Outdoor, CourtSize::HalfCourt)));
    }
}
