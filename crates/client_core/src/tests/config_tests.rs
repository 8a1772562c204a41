use super::*;
use std::collections::HashMap;

fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn defaults_are_valid() {
    let settings = ClientSettings::default();
    settings.validate().expect("default settings validate");
    assert_eq!(settings.default_page_size, 10);
    assert_eq!(settings.request_timeout(), Duration::from_secs(30));
    assert_eq!(
        settings.field_labels.get("identification").map(String::as_str),
        Some("Identification number")
    );
}

#[test]
fn parses_toml_and_extends_builtin_labels() {
    let raw = r#"
api_base_url = "https://logistics.example.com/api/v2"
default_page_size = 25
fallback_error_message = "Try again later"

[field_labels]
plate = "Plate"
capacityKg = "Capacity (kg)"

[search_debounce_ms]
vehicles = 1200
"#;
    let settings = parse_settings(raw, Path::new("backoffice.toml")).expect("parse settings");

    assert_eq!(settings.api_base_url, "https://logistics.example.com/api/v2");
    assert_eq!(settings.default_page_size, 25);
    assert_eq!(settings.request_timeout_secs, 30);
    assert_eq!(settings.fallback_error_message, "Try again later");
    assert_eq!(settings.field_labels.get("plate").map(String::as_str), Some("Plate"));
    assert_eq!(
        settings.field_labels.get("capacityKg").map(String::as_str),
        Some("Capacity (kg)")
    );
    assert_eq!(
        settings.field_labels.get("email").map(String::as_str),
        Some("Email address")
    );
    assert_eq!(
        settings.search_debounce("vehicles", Duration::from_millis(800)),
        Duration::from_millis(1200)
    );
    assert_eq!(
        settings.search_debounce("routes", Duration::from_millis(800)),
        Duration::from_millis(800)
    );
}

#[test]
fn malformed_toml_names_the_file() {
    let err = parse_settings("default_page_size = \"many\"", Path::new("conf/backoffice.toml"))
        .expect_err("type mismatch must fail");
    assert!(matches!(err, SettingsError::Parse { .. }));
    assert!(err.to_string().contains("conf/backoffice.toml"));
}

#[test]
fn env_overrides_win_over_file_values() {
    let mut settings = ClientSettings::default();
    apply_env_overrides(
        &mut settings,
        lookup_from(&[
            ("BACKOFFICE_API_URL", "http://ignored.example.com"),
            ("APP__API_BASE_URL", "http://10.0.0.5:3000/api"),
            ("APP__REQUEST_TIMEOUT_SECS", " 5 "),
            ("APP__DEFAULT_PAGE_SIZE", "50"),
            ("APP__FALLBACK_ERROR_MESSAGE", "Server unavailable"),
        ]),
    )
    .expect("apply overrides");

    assert_eq!(settings.api_base_url, "http://10.0.0.5:3000/api");
    assert_eq!(settings.request_timeout_secs, 5);
    assert_eq!(settings.default_page_size, 50);
    assert_eq!(settings.fallback_error_message, "Server unavailable");
}

#[test]
fn unparsable_env_value_is_rejected() {
    let mut settings = ClientSettings::default();
    let err = apply_env_overrides(&mut settings, lookup_from(&[("APP__DEFAULT_PAGE_SIZE", "ten")]))
        .expect_err("non-numeric page size");
    assert!(matches!(
        err,
        SettingsError::InvalidValue {
            key: "APP__DEFAULT_PAGE_SIZE",
            ..
        }
    ));
}

#[test]
fn validate_rejects_bad_urls_and_zero_sizes() {
    let mut settings = ClientSettings {
        api_base_url: "not a url".into(),
        ..ClientSettings::default()
    };
    assert!(matches!(
        settings.validate(),
        Err(SettingsError::InvalidBaseUrl { .. })
    ));

    settings.api_base_url = "mailto:ops@example.com".into();
    assert!(matches!(
        settings.validate(),
        Err(SettingsError::OpaqueBaseUrl(_))
    ));

    settings.api_base_url = "http://localhost:3000/api".into();
    settings.default_page_size = 0;
    assert!(matches!(
        settings.validate(),
        Err(SettingsError::InvalidValue {
            key: "default_page_size",
            ..
        })
    ));
}

#[test]
fn explicit_missing_file_is_an_error() {
    let err = load_settings(Some(Path::new("/nonexistent/backoffice.toml")))
        .expect_err("missing explicit file");
    assert!(matches!(err, SettingsError::Read { .. }));
}
