use super::*;

#[test]
fn test_empty_file_is_default() {
    let settings = Settings::from_toml("").unwrap();
    assert_eq!(settings, Settings::default());
    assert_eq!(settings.device.vid, 0x1A86);
    assert_eq!(settings.device.pid, 0x7523);
    assert_eq!(settings.flash.chip, DEFAULT_CHIP);
    assert_eq!(settings.platform().unwrap(), Platform::GameBoy);
}

#[test]
fn test_partial_sections_keep_other_defaults() {
    let settings = Settings::from_toml(
        r#"
[device]
port = "/dev/ttyUSB3"

[timing]
erase_timeout_secs = 30
erase_poll_limit = 5000

[flash]
we_pin = "audio"
"#,
    )
    .unwrap();

    assert_eq!(settings.device.port.as_deref(), Some("/dev/ttyUSB3"));
    assert_eq!(settings.device.vid, DEFAULT_VID);

    let timing = settings.timing();
    assert_eq!(timing.erase, Duration::from_secs(30));
    assert_eq!(timing.erase_poll_limit, Some(5000));
    assert_eq!(timing.response, Timing::default().response);

    let flash = settings.flash_profile();
    assert_eq!(flash.we_pin, Some(WritePin::Audio));
    assert_eq!(flash.chip, DEFAULT_CHIP);

    let matcher = settings.matcher();
    assert_eq!(matcher.port.as_deref(), Some("/dev/ttyUSB3"));
}

#[test]
fn test_bad_values_are_config_errors() {
    assert!(matches!(
        Settings::from_toml("[timing]\nresponse_timeout_ms = \"soon\""),
        Err(CartError::Config(_))
    ));

    let mut settings = Settings::default();
    settings.device.platform = "n64".into();
    assert!(matches!(settings.platform(), Err(CartError::Config(_))));
    assert!(settings.session_config().is_err());
}

#[test]
fn test_save_and_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("settings.toml");

    let mut settings = Settings::default();
    settings.device.port = Some("COM7".into());
    settings.timing.erase_poll_limit = Some(12);
    settings.flash.we_pin = Some(WritePin::Wr);
    settings.save_to(&path).unwrap();

    assert!(!path.with_extension("toml.tmp").exists());
    let loaded = Settings::load_from(&path).unwrap();
    assert_eq!(loaded, settings);
}

#[test]
fn test_missing_file_is_default() {
    let dir = tempfile::tempdir().unwrap();
    let loaded = Settings::load_from(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(loaded, Settings::default());
}

#[test]
fn test_default_round_trips_through_toml() {
    let text = Settings::default().to_toml().unwrap();
    assert!(text.contains("[device]"));
    assert!(text.contains("erase_timeout_secs"));
    assert_eq!(Settings::from_toml(&text).unwrap(), Settings::default());
}

#[test]
fn test_settings_path_location() {
    let path = settings_path();
    assert!(path.ends_with("gbcart/settings.toml"));
}
