//! Tests for til.toml parsing and lookup.

use super::{CONFIG_FILE_NAME, Config, DEFAULT_MAX_BLOCKS, default_config_path};
use crate::til_frontend::til_errors::ErrorType;
use std::fs;
use std::path::Path;

#[test]
fn empty_config_uses_defaults() {
    let config = Config::from_toml_str("", Path::new("til.toml")).expect("empty config is valid");

    assert_eq!(config, Config::default());
    assert_eq!(config.driver.max_blocks, DEFAULT_MAX_BLOCKS);
    assert!(config.driver.parallel);
    assert!(config.dump.enabled);
}

#[test]
fn partial_tables_keep_remaining_defaults() {
    let source = "[dump]\nshow_edges = false\n\n[driver]\nmax_blocks = 64\n";
    let config = Config::from_toml_str(source, Path::new("til.toml")).expect("config should parse");

    assert!(!config.dump.show_edges);
    assert!(config.dump.show_instructions);
    assert_eq!(config.driver.max_blocks, 64);
    assert!(config.driver.parallel);

    let options = config.dump.display_options();
    assert!(!options.show_edges);
    assert!(options.show_phi_status);
}

#[test]
fn unknown_keys_are_rejected() {
    let error = Config::from_toml_str("[driver]\nthreads = 4\n", Path::new("bad.toml"))
        .expect_err("unknown key should fail");

    assert_eq!(error.error_type, ErrorType::Config);
    assert_eq!(error.location.path.as_deref(), Some(Path::new("bad.toml")));
}

#[test]
fn zero_block_limit_is_rejected() {
    let error = Config::from_toml_str("[driver]\nmax_blocks = 0\n", Path::new("til.toml"))
        .expect_err("zero limit should fail");

    assert_eq!(error.error_type, ErrorType::Config);
    assert!(error.msg.contains("max_blocks"));
}

#[test]
fn resolve_prefers_explicit_path_then_file_beside_input() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let input = dir.path().join("unit.json");

    // Nothing on disk
    let config = Config::resolve(None, &input).expect("missing file means defaults");
    assert_eq!(config, Config::default());

    fs::write(
        dir.path().join(CONFIG_FILE_NAME),
        "[driver]\nparallel = false\n",
    )
    .expect("config should be written");
    let config = Config::resolve(None, &input).expect("config beside input should load");
    assert!(!config.driver.parallel);

    let explicit = dir.path().join("other.toml");
    fs::write(&explicit, "[driver]\nmax_blocks = 3\n").expect("config should be written");
    let config = Config::resolve(Some(explicit.as_path()), &input).expect("explicit config should load");
    assert_eq!(config.driver.max_blocks, 3);
    assert!(config.driver.parallel);

    let missing = dir.path().join("missing.toml");
    let error = Config::resolve(Some(missing.as_path()), &input)
        .expect_err("explicit config has to exist");
    assert_eq!(error.error_type, ErrorType::File);
}

#[test]
fn default_path_sits_next_to_the_input() {
    assert_eq!(
        default_config_path(Path::new("units/a.json")),
        Path::new("units").join(CONFIG_FILE_NAME)
    );
}
