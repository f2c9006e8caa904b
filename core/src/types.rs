//! Domain types for the court reservation system.
//!
//! Identifiers are store-generated positive integers wrapped in newtypes so a
//! court id can never be passed where an order id is expected. Money is kept
//! in integer minor units (cents) end to end.

use crate::slots::Hour;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            #[doc = concat!("Create a `", stringify!($name), "` from its raw value")]
            #[must_use]
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            /// Get the raw value
            #[must_use]
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// Unique identifier for a location
    LocationId
);
id_type!(
    /// Unique identifier for a court
    CourtId
);
id_type!(
    /// Unique identifier for an order
    OrderId
);
id_type!(
    /// Unique identifier for a reservation (one booked hour)
    ReservationId
);
id_type!(
    /// Unique identifier for a payment record
    PaymentId
);
id_type!(
    /// Unique identifier for an outbox notification task
    NotificationId
);

// ============================================================================
// Money
// ============================================================================

/// Monetary amount in cents.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(u64);

impl Money {
    /// Creates a `Money` value from cents
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Returns the amount in cents
    #[must_use]
    pub const fn cents(&self) -> u64 {
        self.0
    }

    /// Multiplies the amount by a count with overflow checking
    #[must_use]
    pub const fn checked_mul(self, count: u64) -> Option<Self> {
        match self.0.checked_mul(count) {
            Some(result) => Some(Self(result)),
            None => None,
        }
    }

    /// Parses a decimal amount such as `"50"`, `"50.5"` or `"50000.00"`.
    ///
    /// At most two fractional digits are accepted; anything else returns `None`.
    #[must_use]
    pub fn parse_decimal(input: &str) -> Option<Self> {
        let input = input.trim();
        let (whole, fraction) = match input.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (input, ""),
        };

        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        if fraction.len() > 2 || !fraction.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        let whole: u64 = whole.parse().ok()?;
        let fraction_cents: u64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<u64>().ok()? * 10,
            _ => fraction.parse().ok()?,
        };

        whole.checked_mul(100)?.checked_add(fraction_cents).map(Self)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

// ============================================================================
// Court attributes
// ============================================================================

/// Playing surface size.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CourtSize {
    /// Full-size court
    FullCourt,
    /// Half-size court
    HalfCourt,
}

impl CourtSize {
    /// Database/wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::FullCourt => "full-court",
            Self::HalfCourt => "half-court",
        }
    }
}

impl FromStr for CourtSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full-court" => Ok(Self::FullCourt),
            "half-court" => Ok(Self::HalfCourt),
            other => Err(format!("unknown court size: {other}")),
        }
    }
}

/// Indoor or outdoor court.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CourtType {
    /// Covered court
    Indoor,
    /// Open-air court
    Outdoor,
}

impl CourtType {
    /// Database/wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Indoor => "indoor",
            Self::Outdoor => "outdoor",
        }
    }
}

impl FromStr for CourtType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "indoor" => Ok(Self::Indoor),
            "outdoor" => Ok(Self::Outdoor),
            other => Err(format!("unknown court type: {other}")),
        }
    }
}

// ============================================================================
// Reference data
// ============================================================================

/// A venue that owns courts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Location ID
    pub id: LocationId,
    /// Display name
    pub name: String,
    /// Free-form description
    pub description: String,
    /// Street address
    pub address: String,
    /// City
    pub city: String,
    /// State or province
    pub state: String,
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// Updated timestamp
    pub updated_at: DateTime<Utc>,
}

/// A bookable court.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Court {
    /// Court ID
    pub id: CourtId,
    /// Owning location
    pub location_id: LocationId,
    /// Display name
    pub name: String,
    /// Free-form description
    pub description: String,
    /// Court size
    pub size: CourtSize,
    /// Indoor or outdoor
    #[serde(rename = "type")]
    pub court_type: CourtType,
    /// Price for one hour
    pub price_per_hour: Money,
    /// Image reference (URL)
    pub image: String,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// Updated timestamp
    pub updated_at: DateTime<Utc>,
}

/// A court joined with its location.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CourtWithLocation {
    /// The court
    #[serde(flatten)]
    pub court: Court,
    /// Its location
    pub location: Location,
}

// ============================================================================
// Orders, reservations, payments
// ============================================================================

/// Values for a new order row, before the store assigns an id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewOrder {
    /// Court being booked
    pub court_id: CourtId,
    /// Contact email
    pub email: String,
    /// Calendar day (UTC)
    pub date: NaiveDate,
    /// Number of booked hours
    pub duration: u32,
    /// `duration × court price`
    pub total: Money,
}

/// One booking transaction for one court on one day.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Order ID
    pub id: OrderId,
    /// Booked court
    pub court_id: CourtId,
    /// Contact email
    pub email: String,
    /// Calendar day (UTC)
    pub date: NaiveDate,
    /// Number of booked hours
    pub duration: u32,
    /// Total price
    pub total: Money,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// Updated timestamp
    pub updated_at: DateTime<Utc>,
}

/// One booked hour-slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    /// Reservation ID
    pub id: ReservationId,
    /// Owning order
    pub order_id: OrderId,
    /// Booked hour
    pub hour: Hour,
}

/// Lifecycle of a payment record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Waiting for the provider to report settlement
    Pending,
    /// Provider reported settlement with a matching amount
    Settled,
}

impl PaymentStatus {
    /// Database representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Settled => "settled",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "settled" => Ok(Self::Settled),
            other => Err(format!("unknown payment status: {other}")),
        }
    }
}

/// Payment record for an order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    /// Payment ID
    pub id: PaymentId,
    /// Paid order
    pub order_id: OrderId,
    /// Amount due (equals the order total)
    pub amount: Money,
    /// Current status
    pub status: PaymentStatus,
}

/// An order together with everything a notification needs to render.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderDetails {
    /// The order
    pub order: Order,
    /// Booked hours, ascending
    pub hours: Vec<Hour>,
    /// Booked court
    pub court: Court,
    /// Location of the court
    pub location: Location,
}

// ============================================================================
// Outbox
// ============================================================================

/// Kind of notification queued by a transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Order created: create a payment link and send it
    PaymentPending,
    /// Payment settled: send the confirmation
    PaymentConfirmed,
}

impl NotificationKind {
    /// Database/metric label representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PaymentPending => "payment_pending",
            Self::PaymentConfirmed => "payment_confirmed",
        }
    }
}

impl FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "payment_pending" => Ok(Self::PaymentPending),
            "payment_confirmed" => Ok(Self::PaymentConfirmed),
            other => Err(format!("unknown notification kind: {other}")),
        }
    }
}

/// A claimed outbox row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NotificationTask {
    /// Task ID
    pub id: NotificationId,
    /// Order the notification is about
    pub order_id: OrderId,
    /// What to send
    pub kind: NotificationKind,
    /// Delivery attempts made so far
    pub attempts: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn money_parses_provider_amounts() {
        assert_eq!(Money::parse_decimal("50"), Some(Money::from_cents(5000)));
        assert_eq!(Money::parse_decimal("50.5"), Some(Money::from_cents(5050)));
        assert_eq!(Money::parse_decimal("50000.00"), Some(Money::from_cents(5_000_000)));
        assert_eq!(Money::parse_decimal("12.345"), None);
        assert_eq!(Money::parse_decimal("-1"), None);
        assert_eq!(Money::parse_decimal(".5"), None);
        assert_eq!(Money::parse_decimal("abc"), None);
    }

    #[test]
    fn money_display_keeps_two_decimals() {
        assert_eq!(Money::from_cents(5000).to_string(), "50.00");
        assert_eq!(Money::from_cents(7).to_string(), "0.07");
    }

    #[test]
    fn court_attributes_round_trip_their_labels() {
        for size in [CourtSize::FullCourt, CourtSize::HalfCourt] {
            assert_eq!(size.as_str().parse::<CourtSize>(), Ok(size));
        }
        for court_type in [CourtType::Indoor, CourtType::Outdoor] {
            assert_eq!(court_type.as_str().parse::<CourtType>(), Ok(court_type));
        }
        assert!("grass".parse::<CourtType>().is_err());
    }
}
