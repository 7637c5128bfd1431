/// Concurrent access integration tests
///
/// These tests verify that the container behaves correctly when shared across
/// threads and tasks: singleton consistency, request scope isolation and
/// cleanup accounting under contention.

use scoped_injector::{Container, Resolver, Resource};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;
use std::time::Duration;

// ===== Test Services =====

#[derive(Debug)]
pub struct CounterService {
    count: AtomicU32,
}

impl CounterService {
    pub fn new() -> Self {
        Self { count: AtomicU32::new(0) }
    }

    pub fn increment(&self) -> u32 {
        self.count.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn get_count(&self) -> u32 {
        self.count.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct RequestContext {
    id: u32,
}

impl RequestContext {
    pub fn new() -> Self {
        static COUNTER: AtomicU32 = AtomicU32::new(0);
        Self {
            id: COUNTER.fetch_add(1, Ordering::SeqCst),
        }
    }
}

#[derive(Debug)]
pub struct AuditLog {
    entries: Mutex<Vec<u32>>,
}

// ===== Singleton Consistency =====

#[test]
fn test_singleton_consistency_across_threads() {
    const THREADS: usize = 16;

    let container = Container::new();
    container
        .bind::<CounterService>()
        .singleton()
        .to_factory(|()| {
            // Widen the window for racing constructions
            thread::sleep(Duration::from_millis(5));
            Ok(Arc::new(CounterService::new()))
        })
        .unwrap();

    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let container = container.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                let service = container.resolve::<CounterService>().unwrap();
                service.increment();
                service
            })
        })
        .collect();

    let services: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let first = &services[0];
    for service in &services {
        assert!(Arc::ptr_eq(first, service), "all threads must observe one singleton");
    }
    assert_eq!(first.get_count(), THREADS as u32);
}

#[test]
fn test_racing_singleton_releases_every_constructed_instance() {
    const THREADS: usize = 8;

    let constructed = Arc::new(AtomicU32::new(0));
    let released = Arc::new(AtomicU32::new(0));
    let container = Container::new();
    let (c, r) = (constructed.clone(), released.clone());
    container
        .bind::<CounterService>()
        .singleton()
        .enable_cleanup(true)
        .to_resource(move |()| {
            c.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(5));
            let r = r.clone();
            Ok(Resource::new(Arc::new(CounterService::new())).on_release(move || {
                r.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }))
        })
        .unwrap();

    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let container = container.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                container.resolve::<CounterService>().unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    container.shutdown_blocking().unwrap();
    assert!(constructed.load(Ordering::SeqCst) >= 1);
    assert_eq!(released.load(Ordering::SeqCst), constructed.load(Ordering::SeqCst));
}

// ===== Request Scope Isolation =====

#[test]
fn test_request_scopes_isolated_across_threads() {
    const THREADS: usize = 12;

    let container = Container::new();
    container.bind::<CounterService>().singleton().to_factory(|()| Ok(Arc::new(CounterService::new()))).unwrap();
    container.bind::<RequestContext>().request().to_factory(|()| Ok(Arc::new(RequestContext::new()))).unwrap();

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let container = container.clone();
            thread::spawn(move || {
                let scope = container.open_request_scope().unwrap();
                let a = scope.resolve::<RequestContext>().unwrap();
                let b = scope.resolve::<RequestContext>().unwrap();
                assert!(Arc::ptr_eq(&a, &b));
                scope.resolve::<CounterService>().unwrap().increment();
                scope.close_blocking().unwrap();
                a.id
            })
        })
        .collect();

    let ids: HashSet<u32> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(ids.len(), THREADS);
    assert_eq!(container.resolve::<CounterService>().unwrap().get_count(), THREADS as u32);
}

#[test]
fn test_shared_scope_across_threads_builds_one_instance_view() {
    const THREADS: usize = 6;

    let container = Container::new();
    container.bind::<RequestContext>().request().to_factory(|()| Ok(Arc::new(RequestContext::new()))).unwrap();
    let scope = container.open_request_scope().unwrap();

    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let scope = scope.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                scope.resolve::<RequestContext>().unwrap().id
            })
        })
        .collect();

    let ids: HashSet<u32> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(ids.len(), 1);
    scope.close_blocking().unwrap();
}

// ===== Async Tasks =====

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_scoped_requests_share_singletons() {
    let container = Container::new();
    container
        .bind::<AuditLog>()
        .singleton()
        .to_value(Arc::new(AuditLog { entries: Mutex::new(Vec::new()) }))
        .unwrap();
    container.bind::<RequestContext>().request().to_factory(|()| Ok(Arc::new(RequestContext::new()))).unwrap();

    let tasks: Vec<_> = (0..20)
        .map(|_| {
            let container = container.clone();
            tokio::spawn(async move {
                container
                    .scoped(|_| {
                        let container = container.clone();
                        async move {
                            let request = container.resolve_async::<RequestContext>().await?;
                            tokio::task::yield_now().await;
                            let again = container.resolve::<RequestContext>()?;
                            assert!(Arc::ptr_eq(&request, &again));
                            container.resolve::<AuditLog>()?.entries.lock().unwrap().push(request.id);
                            Ok(request.id)
                        }
                    })
                    .await
                    .unwrap()
            })
        })
        .collect();

    let mut ids = HashSet::new();
    for task in tasks {
        ids.insert(task.await.unwrap());
    }
    assert_eq!(ids.len(), 20);
    assert_eq!(container.resolve::<AuditLog>().unwrap().entries.lock().unwrap().len(), 20);
}
