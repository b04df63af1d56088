//! Pricing engine benchmarks.

use chrono::NaiveDate;
use common::ItemId;
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use domain::{
    AddOn, Currency, DateRange, InventoryItem, ItemCategory, Location, Money, PricingConfig,
    ServiceTier, quote,
};

fn bench_quote(c: &mut Criterion) {
    let item = InventoryItem {
        id: ItemId::new("yacht-azzam"),
        category: ItemCategory::Yacht,
        base_price: Money::from_major(25_000, Currency::Eur),
        locations: vec![Location::Monaco],
        min_rental_nights: 2,
        blackout_ranges: vec![],
    };
    let range = DateRange::new(
        NaiveDate::from_ymd_opt(2026, 7, 1).unwrap(),
        NaiveDate::from_ymd_opt(2026, 7, 8).unwrap(),
    )
    .unwrap();
    let add_ons = vec![
        AddOn {
            code: "crew".to_string(),
            nightly_price: Money::from_major(3_000, Currency::Eur),
        },
        AddOn {
            code: "chef".to_string(),
            nightly_price: Money::from_major(1_200, Currency::Eur),
        },
    ];
    let config = PricingConfig::default();

    c.bench_function("quote_yacht_week_vvip", |b| {
        b.iter(|| {
            quote(
                black_box(&item),
                black_box(range),
                Location::Monaco,
                ServiceTier::Vvip,
                black_box(&add_ons),
                &config,
            )
            .unwrap()
        })
    });
}

criterion_group!(benches, bench_quote);
criterion_main!(benches);
