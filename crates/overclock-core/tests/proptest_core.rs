//! Property-based tests for the scaling math and the upgrade tracker.
//!
//! Uses proptest to generate random profiles and tracker contents, then
//! verify the contracts the rest of the engine is built on.

use overclock_core::id::TileCoord;
use overclock_core::rng::SimRng;
use overclock_core::scaling::ScalingProfile;
use overclock_core::tracker::{UpgradeRecord, UpgradeTracker};
use proptest::prelude::*;

// ===========================================================================
// Generators
// ===========================================================================

fn arb_profile() -> impl Strategy<Value = ScalingProfile> {
    (
        0.0..50.0f64,
        -20..20i32,
        -20..20i32,
        -5.0..5.0f64,
        -5.0..5.0f64,
        0.0..2.0f64,
        0.0..2.0f64,
        0.0..4.0f64,
    )
        .prop_map(
            |(base, input_delta, output_delta, input_mult, output_mult, bonus_min, bonus_max, time_mult)| {
                let mut profile = ScalingProfile::new("p", "Upgrade");
                profile.base_multiplier = base;
                profile.input_static_delta = input_delta;
                profile.output_static_delta = output_delta;
                profile.input_multiplier = input_mult;
                profile.output_multiplier = output_mult;
                profile.output_multiplier_min = bonus_min;
                profile.output_multiplier_max = bonus_max;
                profile.time_multiplier = time_mult;
                profile
            },
        )
}

fn arb_records() -> impl Strategy<Value = Vec<UpgradeRecord>> {
    proptest::collection::vec(
        ("[a-z]{1,8}", -50..50i32, -50..50i32, "[a-z]{1,8}").prop_map(
            |(location_name, x, y, profile_key)| UpgradeRecord {
                location_name,
                x,
                y,
                profile_key,
            },
        ),
        0..20,
    )
}

// ===========================================================================
// Properties
// ===========================================================================

proptest! {
    /// The no-input sentinel survives every profile shape.
    #[test]
    fn zero_input_stays_zero(profile in arb_profile()) {
        prop_assert_eq!(profile.scaled_input(0), 0);
    }

    /// A real requirement never scales away entirely.
    #[test]
    fn scaled_input_at_least_one(profile in arb_profile(), base in 1..200u32) {
        prop_assert!(profile.scaled_input(base) >= 1);
    }

    /// More base multiplier never means less input.
    #[test]
    fn scaled_input_monotone_in_base_multiplier(
        profile in arb_profile(),
        base in 1..200u32,
        bump in 0.0..30.0f64,
    ) {
        let mut bigger = profile.clone();
        bigger.base_multiplier += bump;
        prop_assert!(bigger.scaled_input(base) >= profile.scaled_input(base));
    }

    /// Output quantities share the floor-at-one contract.
    #[test]
    fn scaled_output_at_least_one(profile in arb_profile(), base in 1..200u32, seed in any::<u64>()) {
        let mut rng = SimRng::new(seed);
        prop_assert!(profile.scaled_output(base, &mut rng) >= 1);
    }

    /// Processing time is always on the ten-minute grid.
    #[test]
    fn scaled_time_is_a_multiple_of_ten(profile in arb_profile(), base in 0..5000u32) {
        prop_assert_eq!(profile.scaled_time(base) % 10, 0);
    }

    /// Clearing an upgrade twice is the same as clearing it once.
    #[test]
    fn tracker_clear_is_idempotent(records in arb_records()) {
        let mut once = UpgradeTracker::new();
        once.load(records.clone());
        let mut twice = once.clone();

        if let Some(record) = records.first() {
            let tile = TileCoord::new(record.x, record.y);
            once.set(&record.location_name, tile, None);
            twice.set(&record.location_name, tile, None);
            twice.set(&record.location_name, tile, None);
        }
        prop_assert_eq!(once.save(), twice.save());
    }

    /// save() then load() reproduces an equivalent mapping.
    #[test]
    fn tracker_save_load_round_trip(records in arb_records()) {
        let mut tracker = UpgradeTracker::new();
        tracker.load(records);

        let mut restored = UpgradeTracker::new();
        restored.load(tracker.save());

        for record in tracker.save() {
            let tile = TileCoord::new(record.x, record.y);
            prop_assert_eq!(
                restored.get(&record.location_name, tile),
                Some(record.profile_key.as_str())
            );
        }
        prop_assert_eq!(restored.len(), tracker.len());
    }

    /// The binary blob codec is lossless for any tracker state.
    #[test]
    fn tracker_blob_round_trip(records in arb_records()) {
        let mut tracker = UpgradeTracker::new();
        tracker.load(records);

        let blob = tracker.to_blob().unwrap();
        let mut restored = UpgradeTracker::new();
        restored.load_blob(&blob).unwrap();
        prop_assert_eq!(restored, tracker);
    }

    /// The session RNG's bounded draws honor their bounds.
    #[test]
    fn rng_uniform_within_bounds(seed in any::<u64>(), min in -10.0..10.0f64, width in 0.0..10.0f64) {
        let mut rng = SimRng::new(seed);
        let max = min + width;
        let draw = rng.uniform(min, max);
        if width == 0.0 {
            prop_assert_eq!(draw, max);
        } else {
            prop_assert!((min..=max).contains(&draw));
        }
    }
}
