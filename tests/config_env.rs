/// Environment-driven configuration tests
///
/// These mutate process environment variables, so every test is serialized.

use scoped_injector::{Container, ContainerOptions, DiError, DuplicatePolicy};
use serial_test::serial;
use std::env;
use std::sync::Arc;

const VARS: [&str; 3] = [
    "SCOPED_INJECTOR_DUPLICATE_BINDINGS",
    "SCOPED_INJECTOR_ENABLE_CLEANUP",
    "SCOPED_INJECTOR_MAX_DEPTH",
];

fn clear() {
    for var in VARS {
        env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_unset_variables_keep_defaults() {
    clear();
    assert_eq!(ContainerOptions::from_env().unwrap(), ContainerOptions::default());
}

#[test]
#[serial]
fn test_variables_override_defaults() {
    clear();
    env::set_var("SCOPED_INJECTOR_DUPLICATE_BINDINGS", "Reject");
    env::set_var("SCOPED_INJECTOR_ENABLE_CLEANUP", "yes");
    env::set_var("SCOPED_INJECTOR_MAX_DEPTH", "64");

    let options = ContainerOptions::from_env().unwrap();
    clear();

    assert_eq!(options.duplicate_bindings, DuplicatePolicy::Reject);
    assert!(options.enable_cleanup);
    assert_eq!(options.max_depth, 64);
}

#[test]
#[serial]
fn test_invalid_values_are_configuration_errors() {
    clear();
    env::set_var("SCOPED_INJECTOR_MAX_DEPTH", "deep");
    let err = ContainerOptions::from_env().unwrap_err();
    assert!(matches!(err, DiError::Configuration(ref msg) if msg.contains("MAX_DEPTH")));

    env::set_var("SCOPED_INJECTOR_MAX_DEPTH", "0");
    assert!(matches!(ContainerOptions::from_env(), Err(DiError::Configuration(_))));
    clear();

    env::set_var("SCOPED_INJECTOR_ENABLE_CLEANUP", "sometimes");
    assert!(matches!(ContainerOptions::from_env(), Err(DiError::Configuration(_))));
    clear();
}

#[test]
#[serial]
fn test_env_options_drive_the_container() {
    clear();
    env::set_var("SCOPED_INJECTOR_DUPLICATE_BINDINGS", "reject");
    let container = Container::with_options(ContainerOptions::from_env().unwrap()).unwrap();
    clear();

    container.bind::<u32>().singleton().to_value(Arc::new(1)).unwrap();
    let err = container.bind::<u32>().singleton().to_value(Arc::new(2)).unwrap_err();
    assert!(matches!(err, DiError::Configuration(_)));
}
