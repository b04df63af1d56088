//! Deterministic multi-factor pricing engine.
//!
//! `quote` is a pure function of its inputs: identical inputs always
//! produce identical breakdowns. All monetary math runs in minor units
//! with round-half-up applied once per additive stage.

mod config;

pub use config::{BPS_ONE, CategoryPricing, LocationPricing, PricingConfig, SeasonTable};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::dates::DateRange;
use crate::error::PricingError;
use crate::item::{InventoryItem, Location, ServiceTier};
use crate::money::{Currency, Money};

/// Calendar pricing season, determined solely by the stay's start date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Peak,
    High,
    Low,
    Standard,
}

impl Season {
    /// Classifies a date. Peak wins over low inside January.
    pub fn for_date(date: NaiveDate) -> Self {
        let (month, day) = (date.month(), date.day());
        match month {
            12 if day >= 15 => Season::Peak,
            1 if day <= 15 => Season::Peak,
            1 => Season::Low, // Jan 16–31
            2 | 3 => Season::Low,
            6..=8 => Season::High,
            _ => Season::Standard,
        }
    }

    fn bps(&self, table: &SeasonTable) -> u32 {
        match self {
            Season::Peak => table.peak_bps,
            Season::High => table.high_bps,
            Season::Low => table.low_bps,
            Season::Standard => table.standard_bps,
        }
    }
}

/// A customer-selected add-on, priced per night.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddOn {
    pub code: String,
    pub nightly_price: Money,
}

/// Full price breakdown for display and audit.
///
/// Every additive component is carried separately; `total` is their sum
/// plus the security deposit. All amounts share one currency, derived
/// from the booking location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub currency: Currency,
    pub nights: i64,
    pub season: Season,
    pub seasonal_multiplier_bps: u32,
    pub tier: ServiceTier,
    pub tier_multiplier_bps: u32,
    /// Base price after tier and seasonal multipliers, per night.
    pub adjusted_nightly: Money,
    pub subtotal: Money,
    pub insurance: Money,
    pub add_ons_cost: Money,
    pub service_fee: Money,
    pub taxes: Money,
    pub security_deposit: Money,
    pub total: Money,
}

/// Computes the price breakdown for a stay.
///
/// Stage order (rounding once per stage):
/// 1. `adjusted_nightly = base × tier × seasonal` (single rounded multiply)
/// 2. `subtotal = adjusted_nightly × nights`
/// 3. `insurance = subtotal × category rate`
/// 4. `add_ons = Σ nightly_price × nights`
/// 5. `service_fee = (subtotal + insurance + add_ons) × location fee rate`
/// 6. `taxes = (… + service_fee) × location tax rate`
/// 7. `total = … + taxes + security deposit`
pub fn quote(
    item: &InventoryItem,
    range: DateRange,
    location: Location,
    tier: ServiceTier,
    add_ons: &[AddOn],
    config: &PricingConfig,
) -> Result<PriceBreakdown, PricingError> {
    let location_cfg = config
        .location(location)
        .ok_or(PricingError::UnpricedLocation(location))?;
    let category_cfg = config
        .category(item.category)
        .ok_or(PricingError::UnpricedCategory(item.category))?;

    if !item.supports_location(location) {
        return Err(PricingError::LocationNotSupported(location));
    }

    let currency = location.currency();
    if item.base_price.currency() != currency {
        return Err(PricingError::CurrencyMismatch {
            expected: currency,
            found: item.base_price.currency(),
        });
    }

    let nights = range.nights().max(1);
    let season = Season::for_date(range.start());
    let seasonal_bps = season.bps(&config.seasons);
    let tier_bps = config.tier_bps(location_cfg, tier);

    // Multipliers are combined before rounding so the stage rounds once.
    let adjusted_nightly = Money::from_minor(
        mul_bps2(item.base_price.minor_units(), tier_bps, seasonal_bps),
        currency,
    );
    let subtotal = adjusted_nightly.times(nights);

    let insurance = subtotal.apply_bps(category_cfg.insurance_rate_bps);

    let mut add_ons_cost = Money::zero(currency);
    for add_on in add_ons {
        if add_on.nightly_price.currency() != currency {
            return Err(PricingError::CurrencyMismatch {
                expected: currency,
                found: add_on.nightly_price.currency(),
            });
        }
        add_ons_cost = add_ons_cost.try_add(add_on.nightly_price.times(nights))?;
    }

    let fee_base = subtotal.try_add(insurance)?.try_add(add_ons_cost)?;
    let service_fee = fee_base.apply_bps(location_cfg.service_fee_bps);

    let tax_base = fee_base.try_add(service_fee)?;
    let taxes = tax_base.apply_bps(location_cfg.tax_bps);

    let security_deposit = Money::from_minor(category_cfg.security_deposit_minor, currency);
    let total = tax_base.try_add(taxes)?.try_add(security_deposit)?;

    Ok(PriceBreakdown {
        currency,
        nights,
        season,
        seasonal_multiplier_bps: seasonal_bps,
        tier,
        tier_multiplier_bps: tier_bps,
        adjusted_nightly,
        subtotal,
        insurance,
        add_ons_cost,
        service_fee,
        taxes,
        security_deposit,
        total,
    })
}

/// `value × a × b / 10_000²`, rounded half-up once.
fn mul_bps2(value: i64, a_bps: u32, b_bps: u32) -> i64 {
    let product = value as i128 * a_bps as i128 * b_bps as i128;
    let denom: i128 = 10_000 * 10_000;
    ((product + denom / 2) / denom) as i64
}
