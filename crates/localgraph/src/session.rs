//! Session facade mirroring a remote graph-database client.
//!
//! Callers acquire a [`Session`], run queries and upserts through it, and
//! release it, exactly as they would with a network driver. When the local
//! engine toggle is on, sessions are bound to an in-process [`GraphStore`];
//! when it is off, a registered [`RemoteConnector`] supplies them.
//!
//! The engine is synchronous. Async callers should acquire and use sessions
//! from a blocking task.

use crate::config::GraphConfig;
use crate::error::{GraphError, Result};
use crate::graph::{GraphStore, Node, NodeId, PropertyMap, Relationship};
use crate::query::{Query, QueryEngine, Record};
use log::{debug, info};
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, RwLock};
use uuid::Uuid;

/// A store shared between sessions.
pub type SharedStore = Arc<Mutex<GraphStore>>;

/// Operations available on an open session.
///
/// Implemented by [`LocalSession`] and by whatever a [`RemoteConnector`]
/// returns, so calling code does not care which backend it talks to.
pub trait GraphSession: Send {
    /// Session identifier for log lines.
    fn id(&self) -> &str;

    /// Run a query.
    fn run(&mut self, query: Query) -> Result<Vec<Record>>;

    /// Find-or-create a node, see [`GraphStore::find_or_create_node_with`].
    fn find_or_create_node_with(
        &mut self,
        labels: &[&str],
        match_properties: PropertyMap,
        extra_properties: PropertyMap,
    ) -> Result<Node>;

    /// See [`GraphStore::merge_relationship`].
    fn merge_relationship(
        &mut self,
        start_id: NodeId,
        end_id: NodeId,
        rel_type: &str,
        properties: PropertyMap,
    ) -> Result<Relationship>;

    /// See [`GraphStore::create_relationship`].
    fn create_relationship(
        &mut self,
        start_id: NodeId,
        end_id: NodeId,
        rel_type: &str,
        properties: PropertyMap,
    ) -> Result<Relationship>;

    /// Persist the backing store.
    fn save_state(&mut self) -> Result<()>;

    /// Release backend resources. Never persists. Idempotent.
    fn close(&mut self);
}

/// Supplies sessions when the local engine is switched off.
pub trait RemoteConnector: Send + Sync {
    /// Open a session against the remote backend.
    fn connect(&self) -> Result<Box<dyn GraphSession>>;
}

/// Session bound to an in-process store.
///
/// Every call locks the shared store for its duration only.
pub struct LocalSession {
    id: String,
    store: SharedStore,
    closed: bool,
}

impl LocalSession {
    /// Open a session over `store`.
    pub fn new(store: SharedStore) -> Self {
        let id = Uuid::new_v4().to_string();
        debug!("Opened local session {id}");
        Self {
            id,
            store,
            closed: false,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, GraphStore>> {
        if self.closed {
            return Err(GraphError::InvalidOperation {
                message: format!("session {} is closed", self.id),
            });
        }
        lock_store(&self.store)
    }
}

impl GraphSession for LocalSession {
    fn id(&self) -> &str {
        &self.id
    }

    fn run(&mut self, query: Query) -> Result<Vec<Record>> {
        let store = self.lock()?;
        QueryEngine.execute(&store, &query)
    }

    fn find_or_create_node_with(
        &mut self,
        labels: &[&str],
        match_properties: PropertyMap,
        extra_properties: PropertyMap,
    ) -> Result<Node> {
        self.lock()?.find_or_create_node_with(
            labels.iter().copied(),
            match_properties,
            extra_properties,
        )
    }

    fn merge_relationship(
        &mut self,
        start_id: NodeId,
        end_id: NodeId,
        rel_type: &str,
        properties: PropertyMap,
    ) -> Result<Relationship> {
        self.lock()?
            .merge_relationship(start_id, end_id, rel_type, properties)
    }

    fn create_relationship(
        &mut self,
        start_id: NodeId,
        end_id: NodeId,
        rel_type: &str,
        properties: PropertyMap,
    ) -> Result<Relationship> {
        self.lock()?
            .create_relationship(start_id, end_id, rel_type, properties)
    }

    fn save_state(&mut self) -> Result<()> {
        self.lock()?.save_state()
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            debug!("Closed local session {}", self.id);
        }
    }
}

/// Lock a shared store, mapping poisoning to [`GraphError::Storage`].
pub fn lock_store(store: &SharedStore) -> Result<MutexGuard<'_, GraphStore>> {
    store.lock().map_err(|_| GraphError::Storage {
        message: "graph store lock poisoned".to_string(),
    })
}

/// Scoped session handle.
///
/// Dereferences to [`GraphSession`]. The backend session is closed when the
/// handle is dropped, on every exit path.
pub struct Session {
    inner: Box<dyn GraphSession>,
}

impl Session {
    /// Wrap a backend session.
    pub fn new(inner: Box<dyn GraphSession>) -> Self {
        Self { inner }
    }

    /// Close explicitly. Equivalent to dropping the handle.
    pub fn close(self) {
        drop(self);
    }
}

impl Deref for Session {
    type Target = dyn GraphSession;

    fn deref(&self) -> &Self::Target {
        self.inner.as_ref()
    }
}

impl DerefMut for Session {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.inner.as_mut()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.inner.close();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").field("id", &self.inner.id()).finish()
    }
}

/// Hands out sessions against the configured backend.
pub struct SessionFacade {
    config: GraphConfig,
    use_local: AtomicBool,
    store: Mutex<Option<SharedStore>>,
    remote: RwLock<Option<Arc<dyn RemoteConnector>>>,
    // project id -> populate+save lock, shared by every pipeline over this facade
    project_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SessionFacade {
    /// Facade whose store is opened from `config` on the first local session.
    pub fn new(config: GraphConfig) -> Self {
        Self {
            use_local: AtomicBool::new(config.use_local_engine),
            config,
            store: Mutex::new(None),
            remote: RwLock::new(None),
            project_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Facade over an already opened store, local engine on.
    pub fn with_store(store: SharedStore) -> Self {
        Self {
            config: GraphConfig::default(),
            use_local: AtomicBool::new(true),
            store: Mutex::new(Some(store)),
            remote: RwLock::new(None),
            project_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Process-wide facade configured from the environment.
    ///
    /// The store is opened on the first local session and lives until the
    /// process exits. It assumes this process is the only writer of the data
    /// directory; nothing guards against a second process saving over it.
    pub fn global() -> &'static SessionFacade {
        static GLOBAL: OnceLock<SessionFacade> = OnceLock::new();
        GLOBAL.get_or_init(|| SessionFacade::new(GraphConfig::from_env()))
    }

    /// Register the connector used while the local engine is off.
    pub fn set_remote_connector(&self, connector: Arc<dyn RemoteConnector>) {
        if let Ok(mut slot) = self.remote.write() {
            *slot = Some(connector);
        }
    }

    /// Switch between the embedded engine and the remote connector.
    pub fn set_use_local_engine(&self, enabled: bool) {
        info!("Local graph engine {}", if enabled { "enabled" } else { "disabled" });
        self.use_local.store(enabled, Ordering::SeqCst);
    }

    /// Whether sessions are currently served by the embedded engine.
    pub fn uses_local_engine(&self) -> bool {
        self.use_local.load(Ordering::SeqCst)
    }

    /// The shared store, opening it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Io`] if the store cannot be opened.
    pub fn store(&self) -> Result<SharedStore> {
        let mut slot = self.store.lock().map_err(|_| GraphError::Storage {
            message: "session facade lock poisoned".to_string(),
        })?;

        if let Some(store) = slot.as_ref() {
            return Ok(Arc::clone(store));
        }

        let store = Arc::new(Mutex::new(GraphStore::from_config(&self.config)?));
        *slot = Some(Arc::clone(&store));
        Ok(store)
    }

    /// Acquire a session from the active backend.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::BackendUnavailable`] if the local engine is off
    /// and no connector is registered, or the store's open error.
    pub fn get_session(&self) -> Result<Session> {
        if self.uses_local_engine() {
            return Ok(Session::new(Box::new(LocalSession::new(self.store()?))));
        }

        let connector = self
            .remote
            .read()
            .ok()
            .and_then(|slot| slot.clone())
            .ok_or_else(|| GraphError::BackendUnavailable {
                message: "local engine disabled and no remote connector registered".to_string(),
            })?;
        Ok(Session::new(connector.connect()?))
    }

    /// The lock serializing population and save for `project_id`.
    ///
    /// Locks nobody holds are dropped from the map on the way in, so the map
    /// only grows with the number of projects being analyzed at once.
    pub(crate) fn project_lock(&self, project_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self
            .project_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        locks.retain(|id, lock| id == project_id || Arc::strong_count(lock) > 1);
        Arc::clone(locks.entry(project_id.to_string()).or_default())
    }

    #[cfg(test)]
    fn tracked_projects(&self) -> usize {
        self.project_locks.lock().map(|l| l.len()).unwrap_or(0)
    }

    /// Release a session. Never persists.
    pub fn close(&self, session: Session) {
        session.close();
    }
}
