//! Demonstration binary: wires a [`wap_appl_gateway::Gateway`] with in-memory
//! collaborator stubs, dispatches a handful of canned events, and shuts back
//! down. Shows the crate running end to end without a live WSP session layer
//! or PPG — the real collaborators are out of scope (spec.md §1).

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use wap_appl_gateway::collaborators::{
    CookieStore, PpgCollaborator, WmlCompiler, WmlScriptCompiler, WspCollaborator,
};
use wap_appl_gateway::config::GatewayConfig;
use wap_appl_gateway::event::{
    AddrTuple, ConnectInd, Event, Method, MethodInvoke, PpgEvent, WspReply,
};
use wap_appl_gateway::gateway::{Gateway, GatewayDeps};
use wap_appl_gateway::http_caller::ReqwestHttpCaller;

/// Run the wap-appl gateway core against canned events.
#[derive(Parser, Debug)]
#[command(name = "wap_appl_demo", version, about)]
struct Args {
    /// Product name reported in `X-WAP-Gateway` and `Via` headers.
    #[arg(long, env = "WAPGW_PRODUCT_NAME")]
    product_name: Option<String>,

    /// Disable the smart-error WML fallback deck on fetch failure.
    #[arg(long)]
    no_smart_errors: bool,

    /// Optional device-home URL for the `DEVICE:home*` url-map rule.
    #[arg(long, env = "WAPGW_DEVICE_HOME")]
    device_home: Option<String>,

    /// Log file path, in addition to stdout.
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Log level, overridden by `RUST_LOG` if set.
    #[arg(long)]
    log_level: Option<String>,
}

/// Logs every reply it receives; stands in for the WSP session machine
/// registry and event dispatcher (out of scope per spec.md §1).
struct LoggingWsp;

#[async_trait]
impl WspCollaborator for LoggingWsp {
    async fn session_dispatch_event(&self, reply: WspReply) {
        info!(?reply, "WSP session_dispatch_event");
    }
    async fn unit_dispatch_event(&self, reply: WspReply) {
        info!(?reply, "WSP unit_dispatch_event");
    }
    fn referer_url(&self, _session_id: i64) -> Option<String> {
        None
    }
    fn set_referer_url(&self, session_id: i64, url: String) {
        info!(session_id, %url, "WSP set_referer_url");
    }
}

/// No push sessions, ever; stands in for the PPG session registry (out of
/// scope per spec.md §1).
struct NoPushPpg;

#[async_trait]
impl PpgCollaborator for NoPushPpg {
    async fn ppg_dispatch_event(&self, event: PpgEvent) {
        info!(?event, "PPG ppg_dispatch_event");
    }
    fn have_push_session_for(&self, _addr: &AddrTuple) -> bool {
        false
    }
    fn have_push_session_for_sid(&self, _session_id: i64) -> bool {
        false
    }
}

/// Placeholder WML "compiler": the real WML compiler is an external
/// collaborator (spec.md §1's out-of-scope black box). This one uppercases
/// the body so the demo can show a successful conversion without depending
/// on a real compiler crate.
struct DemoWmlCompiler;

impl WmlCompiler for DemoWmlCompiler {
    fn compile(&self, body: &[u8], _charset: Option<&str>) -> Option<Vec<u8>> {
        Some(body.to_ascii_uppercase())
    }
    fn charsets(&self) -> Vec<String> {
        vec!["utf-8".to_string()]
    }
}

struct DemoWmlScriptCompiler;

impl WmlScriptCompiler for DemoWmlScriptCompiler {
    fn compile_data(&self, _url: &str, _body: &[u8]) -> Option<Vec<u8>> {
        None
    }
}

fn init_logging(log_file: Option<&PathBuf>, log_level: Option<&String>) -> anyhow::Result<()> {
    use time::UtcOffset;
    use tracing_subscriber::fmt::time::OffsetTime;

    // Must happen before any threads are spawned.
    let local_offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    let timer = OffsetTime::new(local_offset, time::format_description::well_known::Rfc3339);

    let env_filter = if let Ok(filter) = EnvFilter::try_from_default_env() {
        filter
    } else if let Some(level) = log_level {
        EnvFilter::new(level)
    } else {
        EnvFilter::new("info")
    };

    if let Some(log_path) = log_file {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file_appender = tracing_appender::rolling::never(
            log_path.parent().unwrap_or(std::path::Path::new(".")),
            log_path
                .file_name()
                .unwrap_or(std::ffi::OsStr::new("wap_appl.log")),
        );
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        std::mem::forget(guard);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false).with_timer(timer.clone()))
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_timer(timer)
                    .with_writer(non_blocking),
            )
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false).with_timer(timer))
            .try_init()?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.as_ref(), args.log_level.as_ref())?;

    let config = GatewayConfig::from_figment(
        args.product_name,
        None,
        Some(!args.no_smart_errors),
        args.device_home,
        args.log_file.clone(),
        args.log_level.clone(),
    )?;

    let (http_caller, http_completions) = ReqwestHttpCaller::new(config.reply_queue_capacity);
    let cookie_store: Option<Arc<dyn CookieStore>> = None;
    let wsp: Arc<dyn WspCollaborator> = Arc::new(LoggingWsp);
    let ppg: Arc<dyn PpgCollaborator> = Arc::new(NoPushPpg);
    let wml: Arc<dyn WmlCompiler> = Arc::new(DemoWmlCompiler);
    let wmlscript: Arc<dyn WmlScriptCompiler> = Arc::new(DemoWmlScriptCompiler);

    let gateway = Gateway::init(
        config,
        GatewayDeps {
            wsp,
            ppg: Some(ppg),
            http_caller,
            http_completions,
            wml,
            wmlscript,
            cookie_store,
            host: "wap-appl-gateway.local".to_string(),
        },
    );

    gateway.url_map_config("http://old.example/*", "http://new.example/*")?;

    gateway
        .dispatch(Event::MethodInvokeInd(MethodInvoke {
            server_transaction_id: 1,
            session_id: 7,
            request_uri: "kannel:alive".to_string(),
            method: Method::Get,
            request_headers: Vec::new(),
            session_headers: Vec::new(),
            request_body: Vec::new(),
            addr_tuple: AddrTuple::default(),
            client_sdu_size: 0,
        }))
        .await?;

    gateway
        .dispatch(Event::ConnectInd(ConnectInd {
            session_id: 7,
            addr_tuple: AddrTuple {
                local: "10.0.0.1:9200".to_string(),
                remote: "10.0.0.2:9200".to_string(),
            },
            client_headers: Vec::new(),
            requested_capabilities: vec!["1.2".to_string()],
        }))
        .await?;

    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    info!(load = gateway.get_load(), "shutting down demo gateway");
    gateway.shutdown().await;

    Ok(())
}
