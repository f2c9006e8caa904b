//! Reservation reads and booking.

use crate::{AppError, WebResult};
use crate::extractors::CorrelationId;
use crate::response::ApiResponse;
use crate::state::AppState;
use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use courtside_core::booking::{BookedOrder, BookingRequest};
use courtside_core::environment::Clock;
use courtside_core::slots;
use courtside_core::store::BookingStore;
use courtside_core::window::normalize_date;
use courtside_core::{CourtId, FieldError, NaiveDate, Reservation};
use serde::{Deserialize, Serialize};
use validator::Validate;

const DATE_FORMAT_MESSAGE: &str = "must be an ISO date or RFC 3339 timestamp";

/// `GET /api/courts/{id}/reservations` query.
#[derive(Debug, Deserialize)]
pub struct ReservationsQuery {
    /// ISO date or RFC 3339 timestamp
    pub date: String,
}

/// One reserved hour.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ReservationView {
    /// Reservation id
    pub reservation_id: i64,
    /// Owning order
    pub order_id: i64,
    /// Hour of day, `0..=23`
    pub hour: u8,
}

impl From<Reservation> for ReservationView {
    fn from(r: Reservation) -> Self {
        Self {
            reservation_id: r.id.get(),
            order_id: r.order_id.get(),
            hour: r.hour.get(),
        }
    }
}

/// `POST /api/courts/{id}/reservations` body.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateReservationBody {
    /// Contact email
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    /// ISO date or RFC 3339 timestamp
    pub date: String,
    /// Party size; validated, not priced
    #[validate(range(min = 1, max = 10, message = "must be between 1 and 10"))]
    pub players: u32,
    /// `HH:00` labels
    #[validate(length(min = 1, message = "at least one time slot must be selected"))]
    pub timetables: Vec<String>,
}

impl CreateReservationBody {
    /// Decode into a booking request, collecting every field error.
    ///
    /// # Errors
    ///
    /// Returns the invalid fields, sorted by name.
    pub fn into_request(self, court_id: CourtId) -> Result<BookingRequest, Vec<FieldError>> {
        let mut errors: Vec<FieldError> = match self.validate() {
            Ok(()) => Vec::new(),
            Err(report) => report
                .field_errors()
                .into_iter()
                .flat_map(|(field, problems)| {
                    problems.iter().map(move |problem| {
                        FieldError::new(
                            field.to_string(),
                            problem
                                .message
                                .as_ref()
                                .map_or_else(|| problem.code.to_string(), ToString::to_string),
                        )
                    })
                })
                .collect(),
        };

        let date = normalize_date(&self.date);
        if date.is_none() {
            errors.push(FieldError::new("date", DATE_FORMAT_MESSAGE));
        }

        let hours = if self.timetables.is_empty() {
            None
        } else {
            match slots::parse_timetables(&self.timetables) {
                Ok(hours) => Some(hours),
                Err(err) => {
                    errors.push(FieldError::new("timetables", err.to_string()));
                    None
                }
            }
        };

        match (date, hours) {
            (Some(date), Some(hours)) if errors.is_empty() => Ok(BookingRequest {
                court_id,
                email: self.email,
                date,
                hours,
            }),
            _ => {
                errors.sort_by(|a, b| a.field.cmp(&b.field));
                Err(errors)
            }
        }
    }
}

/// A created order.
#[derive(Debug, Serialize)]
pub struct OrderView {
    /// Order id
    pub order_id: i64,
    /// Booked court
    pub court_id: i64,
    /// Calendar day (UTC)
    pub date: NaiveDate,
    /// Booked hours
    pub duration: u32,
    /// Total as a decimal string, e.g. `"50.00"`
    pub total: String,
    /// Booked hour labels, ascending
    pub hours: Vec<String>,
    /// Payment state
    pub payment_status: &'static str,
}

impl From<BookedOrder> for OrderView {
    fn from(booked: BookedOrder) -> Self {
        Self {
            order_id: booked.order.id.get(),
            court_id: booked.order.court_id.get(),
            date: booked.order.date,
            duration: booked.order.duration,
            total: booked.order.total.to_string(),
            hours: booked.hours().into_iter().map(|h| h.label()).collect(),
            payment_status: booked.payment.status.as_str(),
        }
    }
}

/// `GET /api/courts/{id}/reservations?date=`
///
/// Any date is accepted; the booking window applies to writes only.
///
/// # Errors
///
/// 400 for a missing or malformed date, 503/500 on store failure.
pub async fn list_reservations<S, C>(
    State(state): State<AppState<S, C>>,
    path: Result<Path<i64>, PathRejection>,
    query: Result<Query<ReservationsQuery>, QueryRejection>,
) -> WebResult<ApiResponse<Vec<ReservationView>>>
where
    S: BookingStore + 'static,
    C: Clock + 'static,
{
    let Path(id) = path?;
    let Query(query) = query?;
    let date = normalize_date(&query.date)
        .ok_or_else(|| AppError::validation(&[FieldError::new("date", DATE_FORMAT_MESSAGE)]))?;

    let reservations = state.bookings.reservations(CourtId::new(id), date).await?;
    let message = if reservations.is_empty() {
        "Successfully fetched reservation, but no order found"
    } else {
        "Successfully fetched reservation"
    };

    Ok(ApiResponse::new(
        message,
        reservations.into_iter().map(ReservationView::from).collect(),
    ))
}

/// `POST /api/courts/{id}/reservations`
///
/// # Errors
///
/// See [`AppError`]'s mapping of [`courtside_core::BookingError`].
pub async fn create_reservation<S, C>(
    State(state): State<AppState<S, C>>,
    correlation_id: CorrelationId,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<CreateReservationBody>, JsonRejection>,
) -> WebResult<ApiResponse<OrderView>>
where
    S: BookingStore + 'static,
    C: Clock + 'static,
{
    let Path(id) = path?;
    let Json(body) = body?;
    let players = body.players;

    let request = body
        .into_request(CourtId::new(id))
        .map_err(|errors| AppError::validation(&errors))?;

    tracing::debug!(%correlation_id, court_id = id, players, "Booking request received");

    let booked = state.bookings.book(request).await?;
    Ok(ApiResponse::created(
        "Successfully created reservation",
        OrderView::from(booked),
    ))
}
