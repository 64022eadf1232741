use std::time::Duration;

use cache::{Cache, HashCache, PreviewArtifact, ValidationArtifact, DEFAULT_PREVIEW_LIMIT, DEFAULT_TTL};
use sources::ConnectionRegistry;
use tokio_util::sync::CancellationToken;

/// The knobs a host sets once per run (spec §9): worker-pool width, how long
/// C8 entries stay fresh, how many rows an unbounded preview request
/// truncates to, and how many connections C3 keeps open per data source.
/// Populated from CLI flags / environment by a host binary; the core never
/// reads configuration itself.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// `None` defers to the Normalizer's own default
    /// (`min(available_parallelism(), 8)`).
    pub worker_pool_width: Option<usize>,
    pub cache_ttl: Duration,
    pub preview_limit: usize,
    pub connection_pool_size: u32,
}

impl Default for CoreConfig {
    fn default() -> Self {
        CoreConfig {
            worker_pool_width: None,
            cache_ttl: DEFAULT_TTL,
            preview_limit: DEFAULT_PREVIEW_LIMIT,
            // Matches `ConnectionRegistry::default()`'s own pool size.
            connection_pool_size: 4,
        }
    }
}

/// Everything a run of the core needs that outlives any single call:
/// pooled data-source connections, the two C8 artifact caches, the C8 hash
/// cache, and a cancellation token a host can trip to abort in-flight work.
/// One `RunContext` is built per process (or per project, for a host that
/// keeps several open at once) and threaded through every facade call.
pub struct RunContext {
    pub(crate) registry: ConnectionRegistry,
    pub(crate) preview_cache: Cache<PreviewArtifact>,
    pub(crate) validation_cache: Cache<ValidationArtifact>,
    pub(crate) hash_cache: HashCache,
    pub(crate) config: CoreConfig,
    cancel: CancellationToken,
}

impl RunContext {
    pub fn new(config: CoreConfig) -> Self {
        RunContext {
            registry: ConnectionRegistry::with_pool_size(config.connection_pool_size),
            preview_cache: Cache::with_ttl(config.cache_ttl),
            validation_cache: Cache::with_ttl(config.cache_ttl),
            hash_cache: HashCache::new(config.cache_ttl),
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// A token callers can check or pass down; cloning it (rather than
    /// handing out `&CancellationToken`) lets each call own its lifetime
    /// independently of `self`.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Signals every in-flight operation sharing this context to abort at
    /// its next checkpoint (spec §5).
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn invalidate_cache(&self, project_name: &str, entity: Option<&model::EntityName>) {
        self.preview_cache.invalidate(project_name, entity);
        self.validation_cache.invalidate(project_name, entity);
        self.hash_cache.invalidate(entity);
    }
}

impl Default for RunContext {
    fn default() -> Self {
        RunContext::new(CoreConfig::default())
    }
}
