//! Helpdesk server: owns the subsystems and the HTTP listener lifecycle

use crate::api::{build_app, AppState};
use crate::auth::AuthState;
use crate::chat::ChatState;
use crate::complaints::ComplaintsState;
use crate::config::HelpdeskConfig;
use crate::error::{Error, Result};
use crate::knowledge::{KnowledgeState, KnowledgeStore};
use crate::llm::{generator_from_config, GenerationFallback, Generator};
use crate::retrieval::RetrievalPipeline;
use crate::session::SessionManager;
use crate::storage::Database;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;

/// Server state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Not started
    Stopped,
    /// Binding the listener
    Starting,
    /// Serving requests
    Running,
    /// Draining connections
    ShuttingDown,
}

/// Helpdesk server
pub struct Server {
    config: HelpdeskConfig,
    state: Arc<RwLock<ServerState>>,
    db: Arc<Database>,
    sessions: Arc<SessionManager>,
    knowledge: Arc<KnowledgeStore>,
    pipeline: Arc<RetrievalPipeline>,
    shutdown_tx: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Server {
    /// Create a server, opening storage and loading the knowledge base
    pub fn new(config: HelpdeskConfig) -> Result<Self> {
        let generator = generator_from_config(&config.llm)?;
        let db = Database::open(&config.storage.database)?;
        Self::with_parts(config, db, generator)
    }

    fn with_parts(
        config: HelpdeskConfig,
        db: Database,
        generator: Arc<dyn Generator>,
    ) -> Result<Self> {
        config.validate()?;

        let knowledge = Arc::new(KnowledgeStore::load(config.knowledge.source.clone())?);
        let pipeline = Arc::new(
            RetrievalPipeline::new(knowledge.clone(), GenerationFallback::new(generator))
                .with_threshold(config.retrieval.threshold),
        );
        let (shutdown_tx, _) = watch::channel(false);
        let sessions = SessionManager::with_idle_timeout(idle_timeout_ms(
            config.server.session_ttl_secs,
        ));

        Ok(Self {
            config,
            state: Arc::new(RwLock::new(ServerState::Stopped)),
            db: Arc::new(db),
            sessions: Arc::new(sessions),
            knowledge,
            pipeline,
            shutdown_tx,
            tasks: Mutex::new(Vec::new()),
        })
    }

    /// Get current state
    pub async fn state(&self) -> ServerState {
        *self.state.read().await
    }

    /// Build the HTTP application over this server's subsystems
    pub fn app(&self) -> Router {
        let state = AppState {
            auth: AuthState {
                db: self.db.clone(),
                sessions: self.sessions.clone(),
                config: Arc::new(self.config.auth.clone()),
            },
            chat: ChatState {
                pipeline: self.pipeline.clone(),
                sessions: self.sessions.clone(),
            },
            complaints: ComplaintsState {
                db: self.db.clone(),
                sessions: self.sessions.clone(),
            },
            knowledge: KnowledgeState {
                store: self.knowledge.clone(),
                sessions: self.sessions.clone(),
                threshold: self.config.retrieval.threshold,
            },
        };
        build_app(state, &self.config.server.cors_origins)
    }

    /// Bind the listener and start serving. Returns the bound address.
    pub async fn start(&self) -> Result<SocketAddr> {
        let mut state = self.state.write().await;
        if *state != ServerState::Stopped {
            return Err(Error::Internal("Server already running".to_string()));
        }
        *state = ServerState::Starting;
        drop(state);

        let addr = format!("{}:{}", self.config.server.host, self.config.server.port);
        let listener = match tokio::net::TcpListener::bind(&addr).await {
            Ok(listener) => listener,
            Err(e) => {
                *self.state.write().await = ServerState::Stopped;
                return Err(e.into());
            }
        };
        let local_addr = listener.local_addr()?;

        self.shutdown_tx.send_replace(false);
        let mut tasks = self.tasks.lock().await;

        let app = self.app();
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        tasks.push(tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.wait_for(|stop| *stop).await;
                })
                .await;
            if let Err(e) = served {
                tracing::error!("HTTP server error: {}", e);
            }
        }));

        tasks.push(self.spawn_session_sweep());

        *self.state.write().await = ServerState::Running;
        tracing::info!("Helpdesk listening on http://{}", local_addr);
        Ok(local_addr)
    }

    /// Periodically drop sessions idle for longer than the configured TTL
    fn spawn_session_sweep(&self) -> JoinHandle<()> {
        let sessions = self.sessions.clone();
        let ttl_secs = self.config.server.session_ttl_secs;
        let max_idle_ms = idle_timeout_ms(ttl_secs);
        let period = Duration::from_secs((ttl_secs / 4).clamp(1, 300));
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        sessions.cleanup_inactive(max_idle_ms).await;
                    }
                    _ = async {
                        let _ = shutdown_rx.wait_for(|stop| *stop).await;
                    } => break,
                }
            }
        })
    }

    /// Stop serving and wait for in-flight requests to finish
    pub async fn stop(&self) -> Result<()> {
        let mut state = self.state.write().await;
        if *state != ServerState::Running {
            return Ok(());
        }
        *state = ServerState::ShuttingDown;
        drop(state);

        tracing::info!("Stopping helpdesk server");
        self.shutdown_tx.send_replace(true);

        let tasks: Vec<JoinHandle<()>> = self.tasks.lock().await.drain(..).collect();
        for task in tasks {
            if let Err(e) = task.await {
                tracing::warn!("Server task ended abnormally: {}", e);
            }
        }

        *self.state.write().await = ServerState::Stopped;
        tracing::info!("Helpdesk server stopped");
        Ok(())
    }

    pub fn config(&self) -> &HelpdeskConfig {
        &self.config
    }

    pub fn pipeline(&self) -> &Arc<RetrievalPipeline> {
        &self.pipeline
    }

    pub fn session_manager(&self) -> &Arc<SessionManager> {
        &self.sessions
    }
}

fn idle_timeout_ms(ttl_secs: u64) -> i64 {
    i64::try_from(ttl_secs.saturating_mul(1000)).unwrap_or(i64::MAX)
}

/// Builder for Server
pub struct ServerBuilder {
    config: HelpdeskConfig,
    generator: Option<Arc<dyn Generator>>,
    in_memory: bool,
}

impl ServerBuilder {
    /// Create a new builder with default config
    pub fn new() -> Self {
        Self {
            config: HelpdeskConfig::default(),
            generator: None,
            in_memory: false,
        }
    }

    /// Set the configuration
    pub fn config(mut self, config: HelpdeskConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the bind host
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.server.host = host.into();
        self
    }

    /// Set the bind port
    pub fn port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    /// Use this generator instead of the configured endpoint
    pub fn generator(mut self, generator: Arc<dyn Generator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Keep accounts and complaints in memory only
    pub fn in_memory_storage(mut self) -> Self {
        self.in_memory = true;
        self
    }

    /// Build the server
    pub fn build(self) -> Result<Server> {
        let generator = match self.generator {
            Some(generator) => generator,
            None => generator_from_config(&self.config.llm)?,
        };
        let db = if self.in_memory {
            Database::open_in_memory()?
        } else {
            Database::open(&self.config.storage.database)?
        };
        Server::with_parts(self.config, db, generator)
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
