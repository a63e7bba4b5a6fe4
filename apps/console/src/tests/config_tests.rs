use std::{
    collections::HashMap,
    env, fs,
    time::{SystemTime, UNIX_EPOCH},
};

use super::*;

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn file_values_override_defaults() {
    let mut settings = Settings::default();
    apply_file(
        &mut settings,
        r#"
reply_delay_ms = 10
latency_scale = 0.0
rng_seed = 7
history_path = "/tmp/console-history.json"
"#,
    )
    .expect("valid file");

    assert_eq!(settings.reply_delay_ms, 10);
    assert_eq!(settings.latency_scale, 0.0);
    assert_eq!(settings.rng_seed, Some(7));
    assert_eq!(
        settings.history_path,
        PathBuf::from("/tmp/console-history.json")
    );
    assert_eq!(settings.log_filter, "info");
    assert_eq!(settings.search_limit, 24);
}

#[test]
fn env_overrides_file() {
    let mut settings = Settings::default();
    apply_file(&mut settings, "reply_delay_ms = 10\nlog_filter = \"warn\"").expect("file");
    apply_env(
        &mut settings,
        env_from(&[
            ("APP__REPLY_DELAY_MS", "250"),
            ("APP__SEED_DIR", "./seed-override"),
            ("APP__SEARCH_LIMIT", " 12 "),
        ]),
    )
    .expect("env");

    assert_eq!(settings.reply_delay_ms, 250);
    assert_eq!(settings.seed_dir, Some(PathBuf::from("./seed-override")));
    assert_eq!(settings.search_limit, 12);
    assert_eq!(settings.log_filter, "warn");

    let session = settings.session_config();
    assert_eq!(session.reply_delay, Duration::from_millis(250));
    assert_eq!(session.search_limit, 12);
    assert_eq!(session.history_limit, 10);
}

#[test]
fn rejects_bad_values() {
    let mut settings = Settings::default();
    assert!(apply_env(&mut settings, env_from(&[("APP__RNG_SEED", "seven")])).is_err());
    assert!(apply_env(&mut settings, env_from(&[("APP__LATENCY_SCALE", "-1")])).is_err());
    assert!(apply_file(&mut Settings::default(), "search_limit = 0").is_err());
    assert!(apply_file(&mut Settings::default(), "unknown_key = 1").is_err());
}

#[test]
fn explicit_config_path_must_exist() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let temp_root = env::temp_dir().join(format!("console_config_test_{suffix}"));
    let missing = temp_root.join("missing.toml");
    assert!(load_settings(Some(&missing)).is_err());

    fs::create_dir_all(&temp_root).expect("temp root");
    let present = temp_root.join("console.toml");
    fs::write(&present, "rng_seed = 99\n").expect("write config");
    let settings = load_settings(Some(&present)).expect("load");
    assert!(settings.rng_seed.is_some());

    fs::remove_dir_all(temp_root).expect("cleanup");
}
