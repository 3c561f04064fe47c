// tests/config.rs
use aviser_bot::config::{BotConfig, LogFormat, ENV_CONFIG_PATH};
use std::{env, fs};

const OVERRIDES: [&str; 5] = [
    "BOT_HOST",
    "BOT_STORAGE_PATH",
    "BOT_BATCH_SIZE",
    "BOT_METRICS_ADDR",
    "BOT_LOG_FORMAT",
];

fn clear_env() {
    env::remove_var(ENV_CONFIG_PATH);
    for k in OVERRIDES {
        env::remove_var(k);
    }
}

#[test]
fn parse_toml_file() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("bot.toml");
    fs::write(
        &p,
        r#"
host = "localhost:8081"
storage_path = "/var/lib/aviser"
batch_size = 250
metrics_addr = "127.0.0.1:9100"
log_format = "json"
"#,
    )
    .unwrap();

    let cfg = BotConfig::load_from(&p).unwrap();
    assert_eq!(cfg.host, "localhost:8081");
    assert_eq!(cfg.storage_path.to_str(), Some("/var/lib/aviser"));
    assert_eq!(cfg.batch_size, 100, "clamped to the getUpdates maximum");
    assert_eq!(cfg.metrics_addr.map(|a| a.port()), Some(9100));
    assert_eq!(cfg.log_format, LogFormat::Json);
    assert_eq!(cfg.idle_sleep_ms, 1_000);
}

#[serial_test::serial]
#[test]
fn default_uses_env_then_fallbacks() {
    // Isolate CWD so the repo's own config/ is not read.
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();
    clear_env();

    // 1) Nothing present: built-in defaults.
    let cfg = BotConfig::load(None).unwrap();
    assert_eq!(cfg, BotConfig::default());

    // 2) Fallback config/bot.toml.
    fs::create_dir_all(tmp.path().join("config")).unwrap();
    fs::write(tmp.path().join("config/bot.toml"), "batch_size = 7").unwrap();
    assert_eq!(BotConfig::load(None).unwrap().batch_size, 7);

    // 3) $BOT_CONFIG_PATH wins over the fallback.
    let p_env = tmp.path().join("other.toml");
    fs::write(&p_env, "batch_size = 9").unwrap();
    env::set_var(ENV_CONFIG_PATH, p_env.display().to_string());
    assert_eq!(BotConfig::load(None).unwrap().batch_size, 9);

    // 4) An explicit path wins over $BOT_CONFIG_PATH.
    let p_cli = tmp.path().join("cli.toml");
    fs::write(&p_cli, "batch_size = 11").unwrap();
    assert_eq!(BotConfig::load(Some(&p_cli)).unwrap().batch_size, 11);

    // 5) Env overrides apply on top of any file.
    env::set_var("BOT_BATCH_SIZE", "3");
    env::set_var("BOT_HOST", "example.org");
    let cfg = BotConfig::load(None).unwrap();
    assert_eq!(cfg.batch_size, 3);
    assert_eq!(cfg.host, "example.org");

    clear_env();
    env::set_current_dir(&old).unwrap();
}

#[serial_test::serial]
#[test]
fn missing_explicit_path_is_an_error() {
    clear_env();
    let err = BotConfig::load(Some(std::path::Path::new("/definitely/not/here.toml")))
        .unwrap_err();
    assert!(err.to_string().contains("does not exist"));
}

#[serial_test::serial]
#[test]
fn bad_env_override_is_an_error() {
    clear_env();
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();

    env::set_var("BOT_BATCH_SIZE", "lots");
    assert!(BotConfig::load(None).is_err());

    clear_env();
    env::set_current_dir(&old).unwrap();
}
