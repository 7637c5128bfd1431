/// Full application integration test
///
/// Wires a small web-service style application: configuration, an async
/// connection pool with asynchronous teardown, request-scoped repositories
/// and transient handlers, then drives several requests through `scoped`
/// and shuts the container down.

use scoped_injector::{
    BoxError, Container, ContainerOptions, DiError, Injectable, Resolver, Resource, ScopeKind,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

// ===== Domain =====

#[derive(Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub page_size: usize,
}

pub struct ConnectionPool {
    url: String,
    queries: AtomicU32,
}

impl ConnectionPool {
    async fn connect(url: &str) -> Result<Self, BoxError> {
        tokio::task::yield_now().await;
        Ok(Self {
            url: url.to_string(),
            queries: AtomicU32::new(0),
        })
    }

    fn query(&self, sql: &str) -> String {
        self.queries.fetch_add(1, Ordering::SeqCst);
        format!("{} @ {}", sql, self.url)
    }
}

pub struct RequestContext {
    pub request_id: u32,
}

pub trait UserRepository: Send + Sync {
    fn find(&self, id: u32) -> String;
}

pub struct SqlUserRepository {
    pool: Arc<ConnectionPool>,
    ctx: Arc<RequestContext>,
}

impl UserRepository for SqlUserRepository {
    fn find(&self, id: u32) -> String {
        format!("[req {}] {}", self.ctx.request_id, self.pool.query(&format!("select user {}", id)))
    }
}

impl Injectable for SqlUserRepository {
    type Deps = (Arc<ConnectionPool>, Arc<RequestContext>);

    fn inject((pool, ctx): Self::Deps) -> Result<Self, BoxError> {
        Ok(Self { pool, ctx })
    }
}

pub struct UserHandler {
    repo: Arc<dyn UserRepository>,
    config: Arc<AppConfig>,
}

impl UserHandler {
    fn handle(&self, id: u32) -> String {
        format!("{} (page {})", self.repo.find(id), self.config.page_size)
    }
}

type Events = Arc<Mutex<Vec<String>>>;

fn build(events: &Events) -> Container {
    let container = Container::with_options(ContainerOptions::strict().with_cleanup(true)).unwrap();
    let next_request = Arc::new(AtomicU32::new(1));

    container
        .bind::<AppConfig>()
        .singleton()
        .to_value(Arc::new(AppConfig {
            database_url: "postgres://localhost/app".to_string(),
            page_size: 25,
        }))
        .unwrap();

    let log = events.clone();
    container
        .bind::<ConnectionPool>()
        .singleton()
        .to_async_resource(move |config: Arc<AppConfig>| {
            let log = log.clone();
            async move {
                let pool = ConnectionPool::connect(&config.database_url).await?;
                log.lock().unwrap().push("pool opened".to_string());
                Ok::<_, BoxError>(Resource::new(Arc::new(pool)).on_release_async(move || async move {
                    tokio::task::yield_now().await;
                    log.lock().unwrap().push("pool closed".to_string());
                    Ok::<_, BoxError>(())
                }))
            }
        })
        .unwrap();

    let log = events.clone();
    container
        .bind::<RequestContext>()
        .request()
        .to_resource(move |()| {
            let id = next_request.fetch_add(1, Ordering::SeqCst);
            let log = log.clone();
            log.lock().unwrap().push(format!("request {} started", id));
            Ok(Resource::new(Arc::new(RequestContext { request_id: id })).on_release(move || {
                log.lock().unwrap().push(format!("request {} finished", id));
                Ok(())
            }))
        })
        .unwrap();

    container
        .bind::<dyn UserRepository>()
        .request()
        .enable_cleanup(false)
        .to_injectable::<SqlUserRepository, _>(|repo| repo as Arc<dyn UserRepository>)
        .unwrap();

    container
        .bind::<UserHandler>()
        .transient()
        .to_factory(|(repo, config): (Arc<dyn UserRepository>, Arc<AppConfig>)| {
            Ok(Arc::new(UserHandler { repo, config }))
        })
        .unwrap();

    container
}

#[tokio::test]
async fn test_full_request_lifecycle() {
    let events: Events = Arc::new(Mutex::new(Vec::new()));
    let container = build(&events);

    let report = container.freeze().unwrap();
    assert!(report.is_valid());
    assert!(report.requires_async());
    assert!(container.bind::<u8>().to_value(Arc::new(0)).is_err());

    // The pool is async, so blocking resolution is refused before anything is built
    let scope = container.open_request_scope().unwrap();
    let err = scope.resolve::<UserHandler>().err().unwrap();
    assert!(matches!(err, DiError::AsyncRequired { .. }));
    assert_eq!(scope.pending_cleanups(), 0);
    scope.close().await.unwrap();
    assert!(events.lock().unwrap().is_empty());

    for user in [7, 8] {
        let body = container
            .scoped(|scope| async move {
                let handler = scope.resolve_async::<UserHandler>().await?;
                let other = scope.resolve_async::<UserHandler>().await?;
                assert!(!Arc::ptr_eq(&handler, &other));
                assert!(Arc::ptr_eq(&handler.repo, &other.repo));
                Ok(handler.handle(user))
            })
            .await
            .unwrap();
        assert!(body.contains(&format!("select user {}", user)));
        assert!(body.ends_with("(page 25)"));
    }

    let pool = container.resolve::<ConnectionPool>().unwrap();
    assert_eq!(pool.queries.load(Ordering::SeqCst), 2);
    drop(pool);

    container.shutdown().await.unwrap();
    assert!(matches!(container.resolve::<AppConfig>(), Err(DiError::ScopeClosed { .. })));

    assert_eq!(
        *events.lock().unwrap(),
        vec![
            "pool opened",
            "request 1 started",
            "request 1 finished",
            "request 2 started",
            "request 2 finished",
            "pool closed",
        ]
    );
}

#[tokio::test]
async fn test_descriptors_describe_the_application() {
    let events: Events = Arc::new(Mutex::new(Vec::new()));
    let container = build(&events);

    let descriptors = container.descriptors();
    assert_eq!(descriptors.len(), 5);

    let repo = descriptors
        .iter()
        .find(|d| d.type_name().contains("UserRepository") && d.type_name().starts_with("dyn"))
        .unwrap();
    assert_eq!(repo.scope, ScopeKind::Request);
    assert!(repo.implementation.ends_with("SqlUserRepository"));
    assert!(!repo.cleanup);

    let pool = descriptors.iter().find(|d| d.type_name().ends_with("ConnectionPool")).unwrap();
    assert!(pool.is_async());
    assert!(pool.cleanup);

    container.shutdown().await.unwrap();
}
