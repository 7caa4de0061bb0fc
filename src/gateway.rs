//! The gateway container: owns the process-wide state (run status, the
//! event queue, the outstanding-fetch counter, the URL-map table, the
//! collaborators) and exposes the public operations enumerated in spec §6 —
//! `init`, `shutdown`, `dispatch`, `get_load`, and the `url_map_*` family.
//!
//! Grounded on spec §9's design note: "model as a single owning container
//! initialized by `init` and dropped by `shutdown`; avoid ambient globals."

use std::sync::atomic::{AtomicI64, AtomicU8, Ordering};
use std::sync::{Arc, RwLock};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use crate::collaborators::{
    CookieStore, HttpCaller, HttpCompletion, PpgCollaborator, WmlCompiler, WmlScriptCompiler,
    WspCollaborator,
};
use crate::config::GatewayConfig;
use crate::convert::ConverterRegistry;
use crate::error::GatewayError;
use crate::event::{Event, RunStatus};
use crate::event_loop::{self, EventLoopContext};
use crate::fetch::FetchContext;
use crate::reply_pump;
use crate::urlmap::UrlMap;

impl RunStatus {
    fn to_u8(self) -> u8 {
        match self {
            RunStatus::Limbo => 0,
            RunStatus::Running => 1,
            RunStatus::Terminating => 2,
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            1 => RunStatus::Running,
            2 => RunStatus::Terminating,
            _ => RunStatus::Limbo,
        }
    }
}

/// Collaborators and tunables supplied by the embedder at [`Gateway::init`].
/// PPG support is enabled iff `ppg` is `Some` (spec §6: "if `config` is
/// non-null, PPG features are enabled").
pub struct GatewayDeps {
    pub wsp: Arc<dyn WspCollaborator>,
    pub ppg: Option<Arc<dyn PpgCollaborator>>,
    pub http_caller: Arc<dyn HttpCaller>,
    pub http_completions: mpsc::Receiver<HttpCompletion>,
    pub wml: Arc<dyn WmlCompiler>,
    pub wmlscript: Arc<dyn WmlScriptCompiler>,
    pub cookie_store: Option<Arc<dyn CookieStore>>,
    /// Hostname reported in `Via` lines.
    pub host: String,
}

struct GatewayState {
    status: AtomicU8,
    fetch_counter: AtomicI64,
    queue_len: AtomicI64,
    url_map: RwLock<UrlMap>,
    config: GatewayConfig,
    host: String,
    wsp: Arc<dyn WspCollaborator>,
    ppg: Option<Arc<dyn PpgCollaborator>>,
    http_caller: Arc<dyn HttpCaller>,
    wml: Arc<dyn WmlCompiler>,
    wmlscript: Arc<dyn WmlScriptCompiler>,
    cookie_store: Option<Arc<dyn CookieStore>>,
}

struct GatewayTasks {
    main_loop: JoinHandle<()>,
    reply_pump: JoinHandle<()>,
}

/// The running gateway. Clone is cheap (it's an `Arc` handle); every clone
/// shares the same underlying state and the same background tasks.
#[derive(Clone)]
pub struct Gateway {
    state: Arc<GatewayState>,
    event_tx: mpsc::Sender<Event>,
    tasks: Arc<std::sync::Mutex<Option<GatewayTasks>>>,
}

impl Gateway {
    /// LIMBO → RUNNING: spawn the event loop (C6) and the reply pump (C7).
    pub fn init(config: GatewayConfig, deps: GatewayDeps) -> Self {
        let mut url_map = UrlMap::new();
        if let Some(ref home) = config.device_home {
            if let Err(err) = url_map.config_add_device_home(home) {
                tracing::error!(%err, "ignoring misconfigured device_home");
            }
        }

        let state = Arc::new(GatewayState {
            status: AtomicU8::new(RunStatus::Running.to_u8()),
            fetch_counter: AtomicI64::new(0),
            queue_len: AtomicI64::new(0),
            url_map: RwLock::new(url_map),
            config,
            host: deps.host,
            wsp: deps.wsp,
            ppg: deps.ppg,
            http_caller: deps.http_caller,
            wml: deps.wml,
            wmlscript: deps.wmlscript,
            cookie_store: deps.cookie_store,
        });

        let event_capacity = state.config.event_queue_capacity;
        let (event_tx, event_rx) = mpsc::channel(event_capacity);

        let main_loop = tokio::spawn(run_event_loop(state.clone(), event_rx));
        let reply_pump = tokio::spawn(run_reply_pump(state.clone(), deps.http_completions));

        info!("wap-appl gateway started");

        Self {
            state,
            event_tx,
            tasks: Arc::new(std::sync::Mutex::new(Some(GatewayTasks {
                main_loop,
                reply_pump,
            }))),
        }
    }

    /// Produce an event onto the queue. Precondition: RUNNING (spec §6);
    /// violating it is a logic error in the embedder, not a recoverable
    /// condition the core absorbs.
    pub async fn dispatch(&self, event: Event) -> Result<(), GatewayError> {
        let status = RunStatus::from_u8(self.state.status.load(Ordering::SeqCst));
        if status != RunStatus::Running {
            return Err(GatewayError::NotRunning(status));
        }
        self.state.queue_len.fetch_add(1, Ordering::SeqCst);
        // Draining on send success happens in `run_event_loop`, keeping
        // `queue_len` an honest count of events not yet picked up.
        if self.event_tx.send(event).await.is_err() {
            self.state.queue_len.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(())
    }

    /// `outstanding_fetch_count + queue_length`, a cheap lock-free load metric.
    pub fn get_load(&self) -> i64 {
        self.state.fetch_counter.load(Ordering::SeqCst) + self.state.queue_len.load(Ordering::SeqCst)
    }

    pub fn url_map_config(&self, src: &str, dst: &str) -> Result<(), crate::error::UrlMapError> {
        self.state.url_map.write().unwrap().config_add(src, dst)
    }

    pub fn url_map_config_device_home(
        &self,
        dst: &str,
    ) -> Result<(), crate::error::UrlMapError> {
        self.state
            .url_map
            .write()
            .unwrap()
            .config_add_device_home(dst)
    }

    /// Number of configured url-map rules.
    pub fn url_map_config_info(&self) -> usize {
        self.state.url_map.read().unwrap().len()
    }

    pub fn url_map_destroy(&self) {
        self.state.url_map.write().unwrap().destroy();
    }

    /// RUNNING → TERMINATING → LIMBO: close the queue, join the main loop,
    /// signal the HTTP caller to stop, join the reply pump.
    pub async fn shutdown(self) {
        self.state
            .status
            .store(RunStatus::Terminating.to_u8(), Ordering::SeqCst);
        drop(self.event_tx);

        let tasks = self.tasks.lock().unwrap().take();
        if let Some(GatewayTasks {
            main_loop,
            reply_pump,
        }) = tasks
        {
            let _ = main_loop.await;
            self.state.http_caller.signal_shutdown().await;
            let _ = reply_pump.await;
        }

        self.state
            .status
            .store(RunStatus::Limbo.to_u8(), Ordering::SeqCst);
        info!("wap-appl gateway shut down");
    }

    pub fn run_status(&self) -> RunStatus {
        RunStatus::from_u8(self.state.status.load(Ordering::SeqCst))
    }
}

async fn run_event_loop(state: Arc<GatewayState>, mut events: mpsc::Receiver<Event>) {
    while let Some(event) = events.recv().await {
        state.queue_len.fetch_sub(1, Ordering::SeqCst);

        let url_map = state.url_map.read().unwrap().clone();
        let converters = ConverterRegistry::new(state.wml.as_ref(), state.wmlscript.as_ref());
        let fetch_ctx = FetchContext {
            url_map: &url_map,
            converters: &converters,
            http_caller: state.http_caller.as_ref(),
            wsp: state.wsp.as_ref(),
            config: &state.config,
            fetch_counter: &state.fetch_counter,
            host: &state.host,
            cookie_store: state.cookie_store.as_deref(),
        };
        let ctx = EventLoopContext {
            wsp: state.wsp.as_ref(),
            ppg: state.ppg.as_deref(),
            fetch_ctx: &fetch_ctx,
        };

        event_loop::handle_event(event, &ctx).await;
    }
}

async fn run_reply_pump(state: Arc<GatewayState>, completions: mpsc::Receiver<HttpCompletion>) {
    let converters = ConverterRegistry::new(state.wml.as_ref(), state.wmlscript.as_ref());
    reply_pump::run(
        completions,
        &converters,
        state.wsp.as_ref(),
        &state.config,
        &state.fetch_counter,
        state.cookie_store.as_deref(),
    )
    .await;
}
