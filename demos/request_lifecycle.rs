use scoped_injector::{AsyncDispose, BoxError, Container, ContainerOptions, DiResult, Resolver, Resource};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

// ===== Domain Types =====

#[derive(Debug, Clone)]
struct User {
    id: u32,
    name: String,
}

struct RequestContext {
    request_id: u32,
    path: String,
}

// ===== Services =====

trait UserRepository: Send + Sync {
    fn find_by_id(&self, id: u32) -> Option<User>;
}

struct InMemoryUserRepository {
    users: HashMap<u32, User>,
}

impl InMemoryUserRepository {
    fn new() -> Self {
        let users = [(1, "Alice"), (2, "Bob"), (3, "Charlie")]
            .into_iter()
            .map(|(id, name)| (id, User { id, name: name.to_string() }))
            .collect();
        Self { users }
    }
}

impl UserRepository for InMemoryUserRepository {
    fn find_by_id(&self, id: u32) -> Option<User> {
        self.users.get(&id).cloned()
    }
}

/// Stand-in for a pooled connection that must be returned asynchronously.
struct EventSink {
    sent: AtomicU32,
}

#[async_trait::async_trait]
impl AsyncDispose for EventSink {
    async fn dispose(&self) -> Result<(), BoxError> {
        tokio::task::yield_now().await;
        println!("event sink flushed after {} events", self.sent.load(Ordering::SeqCst));
        Ok(())
    }
}

struct UserHandler {
    context: Arc<RequestContext>,
    users: Arc<dyn UserRepository>,
    events: Arc<EventSink>,
}

impl UserHandler {
    fn handle(&self, id: u32) -> String {
        self.events.sent.fetch_add(1, Ordering::SeqCst);
        match self.users.find_by_id(id) {
            Some(user) => format!("#{} {} -> user {} ({})", self.context.request_id, self.context.path, user.id, user.name),
            None => format!("#{} {} -> not found", self.context.request_id, self.context.path),
        }
    }
}

fn configure() -> DiResult<Container> {
    let container = Container::with_options(ContainerOptions::from_env()?.with_cleanup(true))?;
    let next_request = Arc::new(AtomicU32::new(1));

    container
        .bind::<dyn UserRepository>()
        .singleton()
        .to_value(Arc::new(InMemoryUserRepository::new()) as Arc<dyn UserRepository>)?;

    container
        .bind::<EventSink>()
        .singleton()
        .to_async_resource(|()| async {
            Ok::<_, BoxError>(Resource::disposing_async(Arc::new(EventSink { sent: AtomicU32::new(0) })))
        })?;

    container.bind::<RequestContext>().request().to_resource(move |()| {
        let request_id = next_request.fetch_add(1, Ordering::SeqCst);
        Ok(Resource::new(Arc::new(RequestContext {
            request_id,
            path: "/users".to_string(),
        }))
        .on_release(move || {
            println!("request #{} finished", request_id);
            Ok(())
        }))
    })?;

    container.bind::<UserHandler>().transient().to_factory(
        |(context, users, events): (Arc<RequestContext>, Arc<dyn UserRepository>, Arc<EventSink>)| {
            Ok(Arc::new(UserHandler { context, users, events }))
        },
    )?;

    let report = container.freeze()?;
    let async_names: Vec<_> = report.async_required.iter().map(|key| key.display_name()).collect();
    println!("{} bindings frozen, async: {:?}", container.len(), async_names);
    Ok(container)
}

#[tokio::main]
async fn main() -> DiResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let container = configure()?;

    for descriptor in container.descriptors() {
        println!(
            "  {} [{} / {:?}] cleanup={}",
            descriptor.type_name(),
            descriptor.scope,
            descriptor.mode,
            descriptor.cleanup
        );
    }

    for id in [1, 3, 9] {
        let response = container
            .scoped(|scope| async move {
                let handler = scope.resolve_async::<UserHandler>().await?;
                Ok(handler.handle(id))
            })
            .await?;
        println!("{}", response);
    }

    // Blocking resolution still works for identities that are already cached
    let users = container.resolve::<dyn UserRepository>()?;
    println!("direct lookup: {:?}", users.find_by_id(2));

    container.shutdown().await
}
