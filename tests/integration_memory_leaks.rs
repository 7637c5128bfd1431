/// Memory retention integration tests
///
/// Closing a scope must drop every instance it cached so nothing outlives
/// the scope except what callers still hold.

use scoped_injector::{Container, Resolver, Resource};
use std::sync::{Arc, Weak};

struct Payload {
    bytes: Vec<u8>,
}

fn payload() -> Arc<Payload> {
    Arc::new(Payload { bytes: vec![0; 1024] })
}

#[test]
fn test_request_instances_dropped_on_close() {
    let container = Container::new();
    container.bind::<Payload>().request().to_factory(|()| Ok(payload())).unwrap();

    let scope = container.open_request_scope().unwrap();
    let weak: Weak<Payload> = Arc::downgrade(&scope.resolve::<Payload>().unwrap());
    assert!(weak.upgrade().is_some());

    scope.close_blocking().unwrap();
    assert!(weak.upgrade().is_none());
}

#[test]
fn test_transients_are_not_retained() {
    let container = Container::new();
    container.bind::<Payload>().transient().to_factory(|()| Ok(payload())).unwrap();

    let weak = Arc::downgrade(&container.resolve::<Payload>().unwrap());
    assert!(weak.upgrade().is_none());
}

#[test]
fn test_singletons_dropped_on_shutdown() {
    let container = Container::new();
    container
        .bind::<Payload>()
        .singleton()
        .enable_cleanup(true)
        .to_resource(|()| Ok(Resource::new(payload()).on_release(|| Ok(()))))
        .unwrap();

    let resolved = container.resolve::<Payload>().unwrap();
    assert_eq!(resolved.bytes.len(), 1024);
    let weak = Arc::downgrade(&resolved);
    drop(resolved);
    assert!(weak.upgrade().is_some());

    container.shutdown_blocking().unwrap();
    assert!(weak.upgrade().is_none());
}

#[test]
fn test_many_scopes_do_not_accumulate() {
    let container = Container::new();
    container.bind::<Payload>().request().to_factory(|()| Ok(payload())).unwrap();

    let weaks: Vec<_> = (0..100)
        .map(|_| {
            let scope = container.open_request_scope().unwrap();
            let weak = Arc::downgrade(&scope.resolve::<Payload>().unwrap());
            scope.close_blocking().unwrap();
            weak
        })
        .collect();

    assert!(weaks.iter().all(|w| w.upgrade().is_none()));
}
