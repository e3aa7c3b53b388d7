use proptest::prelude::*;
use rescale_config::{Config, RescaleValue, StatisticRef};
use rescale_core::calibrate;
use rescale_core::mocks::StubDataset;
use rescale_core::requirements::required_statistics;
use rescale_traits::Tensor;

fn literal_config(scale: f64, shift: f64) -> Config {
    let mut table = toml::Table::new();
    table.insert("global_rescale_scale".into(), toml::Value::Float(scale));
    table.insert("global_rescale_shift".into(), toml::Value::Float(shift));
    Config::from_table(table)
}

fn slot() -> impl Strategy<Value = RescaleValue> {
    prop_oneof![
        Just(RescaleValue::None),
        (-10.0f64..10.0).prop_map(RescaleValue::Scalar),
        prop::collection::vec(0.1f64..10.0, 2).prop_map(RescaleValue::PerSpecies),
        prop::sample::select(vec![
            "force_rms",
            "energy_mean",
            "energy_std",
            "per_species_energy_mean",
            "per_species_energy_std",
        ])
        .prop_map(|n| RescaleValue::Statistic(StatisticRef::new(n))),
    ]
}

proptest! {
    #[test]
    fn literal_globals_pass_through_untouched(
        scale in 1e-3f64..1e3,
        shift in -1e3f64..1e3,
    ) {
        let ds = StubDataset::default();
        let mut cfg = literal_config(scale, shift);
        let cal = calibrate(&mut cfg, &ds).unwrap();
        prop_assert_eq!(cal.global_scale, Some(scale));
        prop_assert_eq!(cal.global_shift, Some(shift));
        prop_assert_eq!(ds.total_calls(), 0);
        prop_assert!(cal.statistics.is_empty());
    }

    #[test]
    fn requirements_are_exactly_the_referenced_statistics(
        slots in prop::collection::vec(slot(), 4),
    ) {
        let required = required_statistics(slots.iter());
        for s in &slots {
            if let Some(stat) = s.statistic() {
                prop_assert!(required.contains(stat));
            }
        }
        prop_assert!(required.len() <= slots.iter().filter(|s| s.statistic().is_some()).count());
    }

    #[test]
    fn per_species_values_divide_by_global_scale(
        gs in 0.5f64..4.0,
        a in 0.5f64..8.0,
        b in 0.5f64..8.0,
    ) {
        let ds = StubDataset::default();
        let mut table = toml::Table::new();
        table.insert("global_rescale_shift".into(), "none".into());
        table.insert("global_rescale_scale".into(), toml::Value::Float(gs));
        table.insert("PerSpeciesScaleShift_enable".into(), true.into());
        table.insert(
            "PerSpeciesScaleShift_scales".into(),
            toml::Value::Array(vec![toml::Value::Float(a), toml::Value::Float(b)]),
        );
        let mut cfg = Config::from_table(table);
        let cal = calibrate(&mut cfg, &ds).unwrap();

        prop_assert_eq!(cal.per_species_scales, Some(Tensor::from(vec![a, b])));
        let stored = RescaleValue::from_toml(cfg.get("PerSpeciesScaleShift_scales").unwrap());
        prop_assert_eq!(stored, RescaleValue::PerSpecies(vec![a / gs, b / gs]));
    }
}
