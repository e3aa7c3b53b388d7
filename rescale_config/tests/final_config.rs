use rescale_config::{FINAL_CONFIG_FILE, RescaleValue, load_file, load_toml};
use std::fs;
use tempfile::tempdir;

#[test]
fn final_config_round_trips_through_disk() {
    let dir = tempdir().unwrap();
    let mut cfg = load_toml(
        r#"
run_name = "water"
per_species_scale_shift_enable = true
global_rescale_shift = false
"#,
    )
    .unwrap();
    cfg.insert("num_types", 2_i64);
    cfg.insert("PerSpeciesScaleShift_shifts", RescaleValue::None.to_toml());

    let run_dir = dir.path().join("nested").join("water");
    let path = cfg.write_final(&run_dir).unwrap();
    assert_eq!(path, run_dir.join(FINAL_CONFIG_FILE));

    let saved = load_file(&path).unwrap();
    assert_eq!(saved.get("num_types").and_then(toml::Value::as_integer), Some(2));
    assert_eq!(
        saved.get("PerSpeciesScaleShift_enable"),
        Some(&toml::Value::Boolean(true))
    );
    assert!(RescaleValue::from_toml(saved.get("PerSpeciesScaleShift_shifts").unwrap()).is_none());
    assert!(RescaleValue::from_toml(saved.get("global_rescale_shift").unwrap()).is_none());
}

#[test]
fn load_file_reports_the_path() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("nope.toml");
    let err = load_file(&missing).unwrap_err();
    assert!(format!("{err}").contains("nope.toml"));

    let bad = dir.path().join("bad.toml");
    fs::write(&bad, "global_rescale_scale = [").unwrap();
    let err = load_file(&bad).unwrap_err();
    assert!(format!("{err}").starts_with("parse config"));
}
