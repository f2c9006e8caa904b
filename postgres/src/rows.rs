//! Row decoding and column conversions.

use courtside_core::{
    Court, CourtId, Hour, Location, LocationId, Money, Order, OrderId, StoreError,
};
use sqlx::Row;
use sqlx::postgres::PgRow;

/// Court columns, aliased under `c`.
pub(crate) const COURT_COLUMNS: &str = "c.id, c.location_id, c.name, c.description, c.size, \
     c.type, c.price_cents, c.image, c.created_at, c.updated_at";

/// Location columns, aliased under `l` and prefixed with `location_`.
pub(crate) const LOCATION_COLUMNS: &str = "l.id AS location_pk, l.name AS location_name, \
     l.description AS location_description, l.address AS location_address, \
     l.city AS location_city, l.state AS location_state, l.latitude AS location_latitude, \
     l.longitude AS location_longitude, l.created_at AS location_created_at, \
     l.updated_at AS location_updated_at";

/// Order columns, aliased under `o`.
pub(crate) const ORDER_COLUMNS: &str = "o.id AS order_pk, o.court_id AS order_court_id, \
     o.email, o.date, o.duration, o.total_cents, o.created_at AS order_created_at, \
     o.updated_at AS order_updated_at";

pub(crate) fn court(row: &PgRow) -> Result<Court, StoreError> {
    Ok(Court {
        id: CourtId::new(get(row, "id")?),
        location_id: LocationId::new(get(row, "location_id")?),
        name: get(row, "name")?,
        description: get(row, "description")?,
        size: get::<String>(row, "size")?.parse().map_err(StoreError::Corrupt)?,
        court_type: get::<String>(row, "type")?.parse().map_err(StoreError::Corrupt)?,
        price_per_hour: money(get(row, "price_cents")?)?,
        image: get(row, "image")?,
        created_at: get(row, "created_at")?,
        updated_at: get(row, "updated_at")?,
    })
}

pub(crate) fn location(row: &PgRow) -> Result<Location, StoreError> {
    Ok(Location {
        id: LocationId::new(get(row, "location_pk")?),
        name: get(row, "location_name")?,
        description: get(row, "location_description")?,
        address: get(row, "location_address")?,
        city: get(row, "location_city")?,
        state: get(row, "location_state")?,
        latitude: get(row, "location_latitude")?,
        longitude: get(row, "location_longitude")?,
        created_at: get(row, "location_created_at")?,
        updated_at: get(row, "location_updated_at")?,
    })
}

pub(crate) fn order(row: &PgRow) -> Result<Order, StoreError> {
    Ok(Order {
        id: OrderId::new(get(row, "order_pk")?),
        court_id: CourtId::new(get(row, "order_court_id")?),
        email: get(row, "email")?,
        date: get(row, "date")?,
        duration: u32::try_from(get::<i32>(row, "duration")?)
            .map_err(|_| StoreError::Corrupt("negative order duration".to_string()))?,
        total: money(get(row, "total_cents")?)?,
        created_at: get(row, "order_created_at")?,
        updated_at: get(row, "order_updated_at")?,
    })
}

pub(crate) fn get<'r, T>(row: &'r PgRow, column: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(column).map_err(crate::error::map_sqlx)
}

pub(crate) fn money(cents: i64) -> Result<Money, StoreError> {
    u64::try_from(cents)
        .map(Money::from_cents)
        .map_err(|_| StoreError::Corrupt(format!("negative amount: {cents}")))
}

pub(crate) fn cents(amount: Money) -> Result<i64, StoreError> {
    i64::try_from(amount.cents())
        .map_err(|_| StoreError::Database(format!("amount {amount} out of range")))
}

pub(crate) fn hour(value: i16) -> Result<Hour, StoreError> {
    u8::try_from(value)
        .ok()
        .and_then(|h| Hour::new(h).ok())
        .ok_or_else(|| StoreError::Corrupt(format!("hour out of range: {value}")))
}

pub(crate) fn hour_to_db(hour: Hour) -> i16 {
    i16::from(hour.get())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn negative_amounts_are_corrupt() {
        assert!(matches!(money(-1), Err(StoreError::Corrupt(_))));
        assert_eq!(money(2500), Ok(Money::from_cents(2500)));
    }

    #[test]
    fn hours_outside_the_day_are_corrupt() {
        assert!(hour(24).is_err());
        assert!(hour(-1).is_err());
        assert_eq!(hour(9).map(Hour::get), Ok(9));
        assert_eq!(hour_to_db(Hour::new(23).unwrap()), 23);
    }
}
