use scoped_injector::{BoxError, Container, DiError, ProviderMode, Resolver};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct Settings {
    url: String,
}

struct Pool {
    url: String,
}

struct Repository {
    pool: Arc<Pool>,
}

fn container() -> Container {
    let container = Container::new();
    container
        .bind::<Settings>()
        .singleton()
        .to_value(Arc::new(Settings { url: "postgres://db".into() }))
        .unwrap();
    container
        .bind::<Pool>()
        .singleton()
        .to_async_factory(|settings: Arc<Settings>| async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok::<_, BoxError>(Arc::new(Pool { url: settings.url.clone() }))
        })
        .unwrap();
    container
        .bind::<Repository>()
        .request()
        .to_factory(|pool: Arc<Pool>| Ok(Arc::new(Repository { pool })))
        .unwrap();
    container
}

#[tokio::test]
async fn test_async_provider_resolves() {
    let container = container();
    let pool = container.resolve_async::<Pool>().await.unwrap();
    assert_eq!(pool.url, "postgres://db");

    let again = container.resolve_async::<Pool>().await.unwrap();
    assert!(Arc::ptr_eq(&pool, &again));
}

#[tokio::test]
async fn test_blocking_resolution_of_async_provider_fails() {
    let container = container();
    match container.resolve::<Pool>() {
        Err(DiError::AsyncRequired { service, chain }) => {
            assert!(service.ends_with("Pool"));
            assert_eq!(chain.len(), 1);
        }
        other => panic!("expected async required, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn test_async_requirement_reported_with_chain_before_construction() {
    let container = container();
    let scope = container.open_request_scope().unwrap();

    match scope.resolve::<Repository>() {
        Err(DiError::AsyncRequired { service, chain }) => {
            assert!(service.ends_with("Pool"));
            assert!(chain[0].ends_with("Repository"));
            assert!(chain[1].ends_with("Pool"));
        }
        other => panic!("expected async required, got {:?}", other.map(|_| ())),
    }

    // Once the pool is cached, blocking resolution of dependents works
    let repo = scope.resolve_async::<Repository>().await.unwrap();
    let again = scope.resolve::<Repository>().unwrap();
    assert!(Arc::ptr_eq(&repo, &again));
    assert!(Arc::ptr_eq(&repo.pool, &container.resolve_async::<Pool>().await.unwrap()));
    scope.close().await.unwrap();
}

#[tokio::test]
async fn test_concurrent_singleton_construction_keeps_one_instance() {
    struct Slow;

    let built = Arc::new(AtomicUsize::new(0));
    let counter = built.clone();
    let container = Container::new();
    container
        .bind::<Slow>()
        .singleton()
        .to_async_factory(move |()| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok::<_, BoxError>(Arc::new(Slow))
            }
        })
        .unwrap();

    let (a, b) = tokio::join!(container.resolve_async::<Slow>(), container.resolve_async::<Slow>());
    let (a, b) = (a.unwrap(), b.unwrap());

    // Both may construct, only the first stored instance is retained
    assert!(Arc::ptr_eq(&a, &b));
    assert!(built.load(Ordering::SeqCst) >= 1);
    let c = container.resolve::<Slow>().unwrap();
    assert!(Arc::ptr_eq(&a, &c));
}

#[tokio::test]
async fn test_async_provider_error_propagates_unchanged() {
    #[derive(Debug, thiserror::Error)]
    #[error("timed out connecting")]
    struct ConnectTimeout;

    struct Remote;
    struct Consumer;

    let container = Container::new();
    container
        .bind::<Remote>()
        .singleton()
        .to_async_factory(|()| async { Err::<Arc<Remote>, BoxError>(Box::new(ConnectTimeout)) })
        .unwrap();
    container
        .bind::<Consumer>()
        .to_factory(|_: Arc<Remote>| Ok(Arc::new(Consumer)))
        .unwrap();

    match container.resolve_async::<Consumer>().await {
        Err(DiError::Provider { service, source }) => {
            assert!(service.ends_with("Remote"));
            assert!(source.is::<ConnectTimeout>());
        }
        other => panic!("expected provider error, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn test_async_factory_with_resolver() {
    struct Report {
        url: String,
    }

    let container = container();
    container
        .bind::<Report>()
        .to_async_factory_with_resolver(|ctx| async move {
            let pool = ctx.resolve_async::<Pool>().await?;
            Ok::<_, DiError>(Arc::new(Report { url: pool.url.clone() }))
        })
        .unwrap();

    let report = container.resolve_async::<Report>().await.unwrap();
    assert_eq!(report.url, "postgres://db");

    let descriptor = container
        .descriptors()
        .into_iter()
        .find(|d| d.type_name().ends_with("Report"))
        .unwrap();
    assert_eq!(descriptor.mode, ProviderMode::Async);
    assert!(descriptor.dependencies.is_empty());
}

#[tokio::test]
async fn test_freeze_lists_async_identities() {
    let container = container();
    let report = container.freeze().unwrap();
    let names: Vec<_> = report.async_required.iter().map(|k| k.display_name()).collect();
    assert_eq!(names.len(), 2);
    assert!(names.iter().any(|n| n.ends_with("Pool")));
    assert!(names.iter().any(|n| n.ends_with("Repository")));
}
