#![no_main]
use libfuzzer_sys::fuzz_target;
use rescale_core::mocks::StubDataset;

fuzz_target!(|data: &str| {
    // Parse, validate and calibrate arbitrary TOML; errors are fine, panics are not.
    let Ok(mut cfg) = rescale_config::load_toml(data) else {
        return;
    };
    if cfg.validate().is_err() {
        return;
    }
    let _ = rescale_core::calibrate(&mut cfg, &StubDataset::default());
    // The persisted form must stay loadable.
    if let Ok(text) = cfg.to_toml_string() {
        let _ = rescale_config::load_toml(&text);
    }
});
