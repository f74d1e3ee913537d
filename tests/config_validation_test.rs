//! Integration-level checks that `Settings::load` fails fast on an invalid configuration
//! file instead of letting the server start with unusable settings.

use ringlogd::config::Settings;
use serial_test::serial;
use std::io::Write;

#[test]
#[serial]
fn malformed_toml_file_is_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "port = \"not a number\"").unwrap();

    let result = Settings::load(Some(file.path()));
    assert!(result.is_err());
}

#[test]
#[serial]
fn toml_file_with_zero_capacity_fails_validation() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "capacity = 0").unwrap();

    let result = Settings::load(Some(file.path()));
    assert!(result.is_err());
}

#[test]
#[serial]
fn toml_file_overrides_only_the_fields_it_sets() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "port = 9200").unwrap();

    let settings = Settings::load(Some(file.path())).expect("should load");
    assert_eq!(settings.port, 9200);
    assert_eq!(settings.capacity, ringlogd::config::DEFAULT_CAPACITY);
}
