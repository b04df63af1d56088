//! Strongly-typed pricing configuration.
//!
//! Season, tier, location and category tables are enumerated structures
//! validated at load time, so a typo in a deployment config fails startup
//! instead of mispricing bookings.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::PricingConfigError;
use crate::item::{ItemCategory, Location, ServiceTier};

/// Multiplier in basis points applied to `standard` pricing: 10_000 = 1.0×.
pub const BPS_ONE: u32 = 10_000;

/// Seasonal multiplier table, in basis points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonTable {
    /// Dec 15 – Jan 15.
    pub peak_bps: u32,
    /// Jun – Aug.
    pub high_bps: u32,
    /// Jan 16 – Mar 31.
    pub low_bps: u32,
    /// Everything else.
    pub standard_bps: u32,
}

impl Default for SeasonTable {
    fn default() -> Self {
        Self {
            peak_bps: 15_000,
            high_bps: 12_500,
            low_bps: 8_500,
            standard_bps: BPS_ONE,
        }
    }
}

/// Per-location rates and tier multipliers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationPricing {
    pub service_fee_bps: u32,
    pub tax_bps: u32,
    /// Premium tier multiplier; must sit in 13_000..=15_000.
    pub premium_tier_bps: u32,
    /// VVIP tier multiplier; must sit in 18_000..=20_000.
    pub vvip_tier_bps: u32,
}

/// Per-category insurance rate and security deposit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryPricing {
    pub insurance_rate_bps: u32,
    /// Fixed deposit in the booking location's minor units.
    pub security_deposit_minor: i64,
}

/// Full pricing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingConfig {
    pub seasons: SeasonTable,
    pub locations: HashMap<Location, LocationPricing>,
    pub categories: HashMap<ItemCategory, CategoryPricing>,
}

impl PricingConfig {
    /// Looks up the location entry.
    pub fn location(&self, location: Location) -> Option<&LocationPricing> {
        self.locations.get(&location)
    }

    /// Looks up the category entry.
    pub fn category(&self, category: ItemCategory) -> Option<&CategoryPricing> {
        self.categories.get(&category)
    }

    /// Resolves the tier multiplier for a location.
    pub fn tier_bps(&self, location: &LocationPricing, tier: ServiceTier) -> u32 {
        match tier {
            ServiceTier::Standard => BPS_ONE,
            ServiceTier::Premium => location.premium_tier_bps,
            ServiceTier::Vvip => location.vvip_tier_bps,
        }
    }

    /// Validates bands and completeness. Called once at load.
    pub fn validate(&self) -> Result<(), PricingConfigError> {
        let seasons = [
            ("peak", self.seasons.peak_bps),
            ("high", self.seasons.high_bps),
            ("low", self.seasons.low_bps),
            ("standard", self.seasons.standard_bps),
        ];
        for (season, bps) in seasons {
            if !(5_000..=20_000).contains(&bps) {
                return Err(PricingConfigError::SeasonOutOfRange { season, bps });
            }
        }

        for location in Location::ALL {
            let entry = self
                .locations
                .get(&location)
                .ok_or_else(|| PricingConfigError::MissingEntry(format!("{location:?}")))?;

            check_band(location, ServiceTier::Premium, entry.premium_tier_bps, 13_000, 15_000)?;
            check_band(location, ServiceTier::Vvip, entry.vvip_tier_bps, 18_000, 20_000)?;

            for (rate, bps) in [
                ("service fee", entry.service_fee_bps),
                ("tax", entry.tax_bps),
            ] {
                if bps >= BPS_ONE {
                    return Err(PricingConfigError::RateTooHigh {
                        scope: format!("{location:?}"),
                        rate,
                        bps,
                    });
                }
            }
        }

        for category in [
            ItemCategory::Car,
            ItemCategory::Yacht,
            ItemCategory::Jet,
            ItemCategory::Property,
        ] {
            let entry = self
                .categories
                .get(&category)
                .ok_or_else(|| PricingConfigError::MissingEntry(format!("{category:?}")))?;
            if entry.insurance_rate_bps >= BPS_ONE {
                return Err(PricingConfigError::RateTooHigh {
                    scope: format!("{category:?}"),
                    rate: "insurance",
                    bps: entry.insurance_rate_bps,
                });
            }
            if entry.security_deposit_minor < 0 {
                return Err(PricingConfigError::NegativeDeposit(category));
            }
        }

        Ok(())
    }
}

fn check_band(
    location: Location,
    tier: ServiceTier,
    bps: u32,
    min: u32,
    max: u32,
) -> Result<(), PricingConfigError> {
    if !(min..=max).contains(&bps) {
        return Err(PricingConfigError::TierOutOfBand {
            location,
            tier,
            bps,
            min,
            max,
        });
    }
    Ok(())
}

impl Default for PricingConfig {
    fn default() -> Self {
        let locations = Location::ALL
            .into_iter()
            .map(|location| {
                let entry = match location {
                    Location::Miami => LocationPricing {
                        service_fee_bps: 1_200,
                        tax_bps: 600,
                        premium_tier_bps: 13_000,
                        vvip_tier_bps: 18_000,
                    },
                    Location::Monaco => LocationPricing {
                        service_fee_bps: 1_500,
                        tax_bps: 2_000,
                        premium_tier_bps: 15_000,
                        vvip_tier_bps: 20_000,
                    },
                    Location::London => LocationPricing {
                        service_fee_bps: 1_250,
                        tax_bps: 2_000,
                        premium_tier_bps: 14_000,
                        vvip_tier_bps: 19_000,
                    },
                    Location::Dubai => LocationPricing {
                        service_fee_bps: 1_000,
                        tax_bps: 500,
                        premium_tier_bps: 13_500,
                        vvip_tier_bps: 18_500,
                    },
                };
                (location, entry)
            })
            .collect();

        let categories = HashMap::from([
            (
                ItemCategory::Car,
                CategoryPricing {
                    insurance_rate_bps: 1_500,
                    security_deposit_minor: 500_000,
                },
            ),
            (
                ItemCategory::Yacht,
                CategoryPricing {
                    insurance_rate_bps: 2_000,
                    security_deposit_minor: 5_000_000,
                },
            ),
            (
                ItemCategory::Jet,
                CategoryPricing {
                    insurance_rate_bps: 2_500,
                    security_deposit_minor: 10_000_000,
                },
            ),
            (
                ItemCategory::Property,
                CategoryPricing {
                    insurance_rate_bps: 1_000,
                    security_deposit_minor: 300_000,
                },
            ),
        ]);

        Self {
            seasons: SeasonTable::default(),
            locations,
            categories,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        PricingConfig::default().validate().unwrap();
    }

    #[test]
    fn premium_tier_below_band_rejected() {
        let mut config = PricingConfig::default();
        config
            .locations
            .get_mut(&Location::Miami)
            .unwrap()
            .premium_tier_bps = 11_000;
        assert!(matches!(
            config.validate(),
            Err(PricingConfigError::TierOutOfBand { .. })
        ));
    }

    #[test]
    fn vvip_tier_above_band_rejected() {
        let mut config = PricingConfig::default();
        config
            .locations
            .get_mut(&Location::Dubai)
            .unwrap()
            .vvip_tier_bps = 25_000;
        assert!(matches!(
            config.validate(),
            Err(PricingConfigError::TierOutOfBand { .. })
        ));
    }

    #[test]
    fn tax_at_or_above_full_rate_rejected() {
        let mut config = PricingConfig::default();
        config.locations.get_mut(&Location::London).unwrap().tax_bps = 10_000;
        assert!(matches!(
            config.validate(),
            Err(PricingConfigError::RateTooHigh { .. })
        ));
    }

    #[test]
    fn missing_location_rejected() {
        let mut config = PricingConfig::default();
        config.locations.remove(&Location::Monaco);
        assert!(matches!(
            config.validate(),
            Err(PricingConfigError::MissingEntry(_))
        ));
    }

    #[test]
    fn negative_deposit_rejected() {
        let mut config = PricingConfig::default();
        config
            .categories
            .get_mut(&ItemCategory::Jet)
            .unwrap()
            .security_deposit_minor = -1;
        assert!(matches!(
            config.validate(),
            Err(PricingConfigError::NegativeDeposit(_))
        ));
    }
}
