//! Reservation request validation.

use chrono::{NaiveDate, Utc};
use common::ItemId;
use domain::{AddOn, Customer, DateRange, Location, Money, ServiceTier};
use serde::Deserialize;
use thiserror::Error;

/// Raw reservation submission, as received from the client.
///
/// Dates arrive as strings so parse failures surface as validation
/// errors rather than deserialization errors.
#[derive(Debug, Clone, Deserialize)]
pub struct ReservationRequest {
    #[serde(default)]
    pub item_id: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub tier: Option<String>,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub add_ons: Vec<AddOnRequest>,
}

/// Raw add-on line: nightly price in minor units of the booking currency.
#[derive(Debug, Clone, Deserialize)]
pub struct AddOnRequest {
    pub code: String,
    pub nightly_price_minor: i64,
}

/// A request that passed validation, with all fields in domain types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidReservation {
    pub item_id: ItemId,
    pub range: DateRange,
    pub location: Location,
    pub tier: ServiceTier,
    pub customer: Customer,
    pub add_ons: Vec<AddOn>,
}

/// A rejected reservation field.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid date in {field}: {value}")]
    BadDate { field: &'static str, value: String },

    #[error("end date {end} must be after start date {start}")]
    EndNotAfterStart { start: NaiveDate, end: NaiveDate },

    #[error("start date {0} is in the past")]
    StartInPast(NaiveDate),

    #[error("invalid email address: {0}")]
    BadEmail(String),

    #[error("unknown location: {0}")]
    UnknownLocation(String),

    #[error("unknown service tier: {0}")]
    UnknownTier(String),

    #[error("add-on {0} has a negative nightly price")]
    NegativeAddOn(String),

    #[error("computed total must be positive")]
    NonPositiveTotal,
}

fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, ValidationError> {
    value.parse().map_err(|_| ValidationError::BadDate {
        field,
        value: value.to_string(),
    })
}

/// A very light structural check: one `@`, non-empty local part, and a
/// dot somewhere in the domain. Deliverability is the provider's problem.
fn email_is_plausible(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

fn parse_location(value: &str) -> Result<Location, ValidationError> {
    Location::ALL
        .into_iter()
        .find(|l| l.as_str() == value)
        .ok_or_else(|| ValidationError::UnknownLocation(value.to_string()))
}

fn parse_tier(value: Option<&str>) -> Result<ServiceTier, ValidationError> {
    match value {
        None | Some("") => Ok(ServiceTier::default()),
        Some("standard") => Ok(ServiceTier::Standard),
        Some("premium") => Ok(ServiceTier::Premium),
        Some("vvip") => Ok(ServiceTier::Vvip),
        Some(other) => Err(ValidationError::UnknownTier(other.to_string())),
    }
}

/// Validates a raw request. Checks run in a fixed order so the client
/// always sees the same first error for the same input: required
/// fields, then dates, then email, then location and tier, then add-ons.
pub fn validate(request: &ReservationRequest) -> Result<ValidReservation, ValidationError> {
    if request.item_id.trim().is_empty() {
        return Err(ValidationError::MissingField("item_id"));
    }
    if request.start_date.trim().is_empty() {
        return Err(ValidationError::MissingField("start_date"));
    }
    if request.end_date.trim().is_empty() {
        return Err(ValidationError::MissingField("end_date"));
    }
    if request.location.trim().is_empty() {
        return Err(ValidationError::MissingField("location"));
    }
    if request.customer_name.trim().is_empty() {
        return Err(ValidationError::MissingField("customer_name"));
    }
    if request.email.trim().is_empty() {
        return Err(ValidationError::MissingField("email"));
    }

    let start = parse_date("start_date", &request.start_date)?;
    let end = parse_date("end_date", &request.end_date)?;
    let range =
        DateRange::new(start, end).map_err(|_| ValidationError::EndNotAfterStart { start, end })?;
    if start < Utc::now().date_naive() {
        return Err(ValidationError::StartInPast(start));
    }

    if !email_is_plausible(&request.email) {
        return Err(ValidationError::BadEmail(request.email.clone()));
    }

    let location = parse_location(&request.location)?;
    let tier = parse_tier(request.tier.as_deref())?;

    let currency = location.currency();
    let mut add_ons = Vec::with_capacity(request.add_ons.len());
    for add_on in &request.add_ons {
        if add_on.nightly_price_minor < 0 {
            return Err(ValidationError::NegativeAddOn(add_on.code.clone()));
        }
        add_ons.push(AddOn {
            code: add_on.code.clone(),
            nightly_price: Money::from_minor(add_on.nightly_price_minor, currency),
        });
    }

    Ok(ValidReservation {
        item_id: ItemId::new(request.item_id.trim()),
        range,
        location,
        tier,
        customer: Customer {
            full_name: request.customer_name.trim().to_string(),
            email: request.email.trim().to_string(),
            phone: request.phone.clone(),
        },
        add_ons,
    })
}
