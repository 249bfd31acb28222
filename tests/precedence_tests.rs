//! Integration tests for the override layer stack.
//!
//! Exercises the precedence law: explicit argument > environment variable >
//! dotenv file > subclass default > base default, plus provenance reporting
//! and the fatal source-read path.

use layered_config::error::ConfigError;
use layered_config::layers::{LayeredSources, OverrideLayer};
use layered_config::resolver::resolve_class;
use layered_config::schema::ConfigClass;
use std::sync::{Arc, Mutex, MutexGuard};
use tempfile::TempDir;

// Process environment mutation is global; serialize the tests that touch it.
static ENV_LOCK: Mutex<()> = Mutex::new(());

fn env_guard() -> MutexGuard<'static, ()> {
    ENV_LOCK
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn set_var(key: &str, value: &str) {
    unsafe { std::env::set_var(key, value) }
}

fn remove_var(key: &str) {
    unsafe { std::env::remove_var(key) }
}

/// Base/sub pair declaring `field` with distinct defaults at both levels.
fn layered_classes(field: &'static str) -> (Arc<ConfigClass>, Arc<ConfigClass>) {
    let base = ConfigClass::builder("pre_base")
        .plain(field, "from-base")
        .build();
    let sub = ConfigClass::builder("pre_sub")
        .parent(base.clone())
        .plain(field, "from-sub")
        .build();
    (base, sub)
}

fn dotenv_file(temp: &TempDir, contents: &str) -> std::path::PathBuf {
    let path = temp.path().join(".env");
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_base_default_applies() {
    let (base, _) = layered_classes("PRE_BASE_ONLY");
    let cfg = resolve_class(&base, &LayeredSources::new()).unwrap();
    assert_eq!(cfg.text("PRE_BASE_ONLY").unwrap(), "from-base");
    assert_eq!(
        cfg.source("PRE_BASE_ONLY").unwrap(),
        OverrideLayer::Default
    );
}

#[test]
fn test_subclass_override_wins_over_base() {
    let (_, sub) = layered_classes("PRE_SUBCLASS");
    let cfg = resolve_class(&sub, &LayeredSources::new()).unwrap();
    assert_eq!(cfg.text("PRE_SUBCLASS").unwrap(), "from-sub");
    assert_eq!(
        cfg.source("PRE_SUBCLASS").unwrap(),
        OverrideLayer::SubclassOverride
    );
}

#[test]
fn test_dotenv_overrides_subclass_default() {
    let (_, sub) = layered_classes("PRE_DOTENV");
    let temp = TempDir::new().unwrap();
    let path = dotenv_file(&temp, "PRE_DOTENV=from-dotenv\n");

    let cfg = resolve_class(&sub, &LayeredSources::new().with_dotenv(&path)).unwrap();
    assert_eq!(cfg.text("PRE_DOTENV").unwrap(), "from-dotenv");
    assert_eq!(cfg.source("PRE_DOTENV").unwrap(), OverrideLayer::DotenvFile);
}

#[test]
fn test_env_var_overrides_dotenv() {
    let _guard = env_guard();
    let (_, sub) = layered_classes("PRE_ENVVAR");
    let temp = TempDir::new().unwrap();
    let path = dotenv_file(&temp, "PRE_ENVVAR=from-dotenv\n");

    set_var("PRE_ENVVAR", "from-env");
    let cfg = resolve_class(&sub, &LayeredSources::new().with_dotenv(&path)).unwrap();
    remove_var("PRE_ENVVAR");

    assert_eq!(cfg.text("PRE_ENVVAR").unwrap(), "from-env");
    assert_eq!(
        cfg.source("PRE_ENVVAR").unwrap(),
        OverrideLayer::EnvironmentVariable
    );
}

#[test]
fn test_explicit_argument_outranks_everything() {
    let _guard = env_guard();
    let (_, sub) = layered_classes("PRE_EXPLICIT");
    let temp = TempDir::new().unwrap();
    let path = dotenv_file(&temp, "PRE_EXPLICIT=from-dotenv\n");

    set_var("PRE_EXPLICIT", "from-env");
    let sources = LayeredSources::new()
        .with_dotenv(&path)
        .with_arg("PRE_EXPLICIT", "from-explicit");
    let cfg = resolve_class(&sub, &sources).unwrap();
    remove_var("PRE_EXPLICIT");

    assert_eq!(cfg.text("PRE_EXPLICIT").unwrap(), "from-explicit");
    assert_eq!(
        cfg.source("PRE_EXPLICIT").unwrap(),
        OverrideLayer::ExplicitArgument
    );
}

#[test]
fn test_precedence_ladder_peels_layer_by_layer() {
    let _guard = env_guard();
    let (_, sub) = layered_classes("PRE_LADDER");
    let temp = TempDir::new().unwrap();
    let path = dotenv_file(&temp, "PRE_LADDER=from-dotenv\n");

    // All five layers present: explicit argument wins.
    set_var("PRE_LADDER", "from-env");
    let all = LayeredSources::new()
        .with_dotenv(&path)
        .with_arg("PRE_LADDER", "from-explicit");
    let cfg = resolve_class(&sub, &all).unwrap();
    assert_eq!(cfg.text("PRE_LADDER").unwrap(), "from-explicit");

    // Remove the explicit argument: the env var wins.
    let cfg = resolve_class(&sub, &LayeredSources::new().with_dotenv(&path)).unwrap();
    assert_eq!(cfg.text("PRE_LADDER").unwrap(), "from-env");

    // Remove the env var: the dotenv entry wins.
    remove_var("PRE_LADDER");
    let cfg = resolve_class(&sub, &LayeredSources::new().with_dotenv(&path)).unwrap();
    assert_eq!(cfg.text("PRE_LADDER").unwrap(), "from-dotenv");

    // Remove the dotenv file: the subclass default wins.
    let cfg = resolve_class(&sub, &LayeredSources::new()).unwrap();
    assert_eq!(cfg.text("PRE_LADDER").unwrap(), "from-sub");

    // Resolve the base class: its own default stands.
    let base = ConfigClass::builder("pre_base")
        .plain("PRE_LADDER", "from-base")
        .build();
    let cfg = resolve_class(&base, &LayeredSources::new()).unwrap();
    assert_eq!(cfg.text("PRE_LADDER").unwrap(), "from-base");
}

#[test]
fn test_name_scenario() {
    let _guard = env_guard();
    let class = ConfigClass::builder("pre_scn")
        .plain("PRE_SCENARIO_NAME", "X")
        .build();
    let temp = TempDir::new().unwrap();

    // No overrides present.
    let cfg = resolve_class(&class, &LayeredSources::new()).unwrap();
    assert_eq!(cfg.text("PRE_SCENARIO_NAME").unwrap(), "X");

    // Environment variable set.
    set_var("PRE_SCENARIO_NAME", "Y");
    let cfg = resolve_class(&class, &LayeredSources::new()).unwrap();
    assert_eq!(cfg.text("PRE_SCENARIO_NAME").unwrap(), "Y");
    remove_var("PRE_SCENARIO_NAME");

    // Dotenv file, no env var.
    let path = dotenv_file(&temp, "PRE_SCENARIO_NAME=Z\n");
    let cfg = resolve_class(&class, &LayeredSources::new().with_dotenv(&path)).unwrap();
    assert_eq!(cfg.text("PRE_SCENARIO_NAME").unwrap(), "Z");

    // Both dotenv and env var: the env var wins.
    set_var("PRE_SCENARIO_NAME", "Y");
    let cfg = resolve_class(&class, &LayeredSources::new().with_dotenv(&path)).unwrap();
    assert_eq!(cfg.text("PRE_SCENARIO_NAME").unwrap(), "Y");
    remove_var("PRE_SCENARIO_NAME");
}

#[test]
fn test_unreadable_dotenv_path_is_fatal() {
    let (_, sub) = layered_classes("PRE_FATAL");
    let temp = TempDir::new().unwrap();
    let missing = temp.path().join("missing.env");

    let err = resolve_class(&sub, &LayeredSources::new().with_dotenv(&missing)).unwrap_err();
    assert!(matches!(err, ConfigError::SourceRead { .. }));
}

#[test]
fn test_abstract_base_fails_to_resolve() {
    let base = ConfigClass::builder("pre_abs")
        .abstract_base()
        .plain("PRE_ABS_FIELD", "value")
        .build();
    let err = resolve_class(&base, &LayeredSources::new()).unwrap_err();
    match err {
        ConfigError::AbstractInstantiation { env_code } => assert_eq!(env_code, "pre_abs"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_inherited_field_not_redeclared_keeps_base_provenance() {
    let base = ConfigClass::builder("pre_base")
        .plain("PRE_INHERITED", "from-base")
        .build();
    let sub = ConfigClass::builder("pre_sub").parent(base).build();

    let cfg = resolve_class(&sub, &LayeredSources::new()).unwrap();
    assert_eq!(cfg.text("PRE_INHERITED").unwrap(), "from-base");
    assert_eq!(
        cfg.source("PRE_INHERITED").unwrap(),
        OverrideLayer::Default
    );
}
