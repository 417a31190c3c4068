use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

use fne_acl::{IdListAcl, ListMode, PeerList, TalkgroupRules};
use fne_master::config::{Cli, FneSettings};
use fne_master::network::{FneNetwork, Routers};
use fne_master::{
    ActivitySink, DailyFileActivitySink, DiagNetwork, NoopActivitySink, NoopPeerLifecycleCallbacks, UnimplementedFrameDecoder,
};
use fne_metrics::{FneMetrics, MetricsConfig, MetricsServer};
use fne_router::ProtocolRouter;
use fne_transport::FneSocket;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.syslog);

    if let Err(e) = run(cli).await {
        tracing::error!(error = %e, "fatal startup error");
        std::process::exit(1);
    }
    Ok(())
}

fn init_tracing(syslog: bool) {
    let filter = EnvFilter::from_default_env().add_directive(Level::INFO.into());
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if syslog {
        subscriber.with_ansi(false).without_time().compact().init();
    } else {
        subscriber.init();
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings = FneSettings::load(&cli.config).with_context(|| format!("loading config from {}", cli.config.display()))?;

    let peer_list = Arc::new(PeerList::new(&settings.peer_list_path, true));
    peer_list.reload_if_changed().context("loading peer list")?;

    let peer_acl = Arc::new(match &settings.peer_acl_path {
        Some(path) => IdListAcl::new(path, ListMode::Whitelist, true),
        None => IdListAcl::new("peer_acl.dat", ListMode::Whitelist, false),
    });
    peer_acl.reload_if_changed().context("loading peer acl")?;

    let rid_acl = Arc::new(match &settings.radio_id_acl_path {
        Some(path) => IdListAcl::new(path, ListMode::Whitelist, true),
        None => IdListAcl::new("rid_acl.dat", ListMode::Whitelist, false),
    });
    rid_acl.reload_if_changed().context("loading radio id acl")?;

    let talkgroup_rules = Arc::new(TalkgroupRules::new(&settings.talkgroup_rules_path));
    talkgroup_rules.reload_if_changed().context("loading talkgroup rules")?;

    let routers = Routers {
        dmr: Arc::new(build_router("dmr", &talkgroup_rules, &peer_acl, &rid_acl, &settings)),
        p25: Arc::new(build_router("p25", &talkgroup_rules, &peer_acl, &rid_acl, &settings)),
        nxdn: Arc::new(build_router("nxdn", &talkgroup_rules, &peer_acl, &rid_acl, &settings)),
        dmr_enabled: settings.protocols.dmr,
        p25_enabled: settings.protocols.p25,
        nxdn_enabled: settings.protocols.nxdn,
    };

    let metrics = Arc::new(FneMetrics::new("fne"));
    let metrics_server = MetricsServer::install(MetricsConfig { listen: settings.metrics_listen.clone(), namespace: "fne" })
        .context("installing prometheus recorder")?;
    tokio::spawn(async move {
        if let Err(e) = metrics_server.serve().await {
            warn!(error = %e, "metrics server exited");
        }
    });

    let activity: Arc<dyn ActivitySink> = match &settings.activity_log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).with_context(|| format!("creating activity log dir {}", dir.display()))?;
            Arc::new(DailyFileActivitySink::new(dir))
        }
        None => Arc::new(NoopActivitySink),
    };

    let decoder = Arc::new(UnimplementedFrameDecoder);

    let network = Arc::new(
        FneNetwork::bind(
            settings.clone(),
            peer_list,
            peer_acl,
            rid_acl,
            talkgroup_rules,
            routers,
            decoder,
            metrics,
            activity.clone(),
            Arc::new(NoopPeerLifecycleCallbacks),
        )
        .await
        .context("binding traffic socket")?,
    );
    info!(addr = %network.local_addr(), "master listening for peer traffic");

    let shutdown = CancellationToken::new();

    let read_loop = {
        let network = network.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move { network.run(shutdown).await })
    };

    let clock_task = {
        let network = network.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_millis(100));
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => return,
                    _ = interval.tick() => network.clock(100).await,
                }
            }
        })
    };

    let reload_task = {
        let network = network.clone();
        let shutdown = shutdown.clone();
        let interval_s = settings.lookup_reload_interval_s.max(1);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_secs(interval_s));
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => return,
                    _ = interval.tick() => network.reload_lookups_and_announce().await,
                }
            }
        })
    };

    let diag_task = if let Some(diag_addr) = settings.diagnostics_listen.as_ref() {
        let addr = diag_addr.parse().context("parsing diagnostics_listen")?;
        let socket = FneSocket::bind(addr).await.context("binding diagnostics socket")?;
        info!(%addr, "diagnostics socket listening");
        let diag = DiagNetwork::new(socket, activity.clone());
        let shutdown = shutdown.clone();
        Some(tokio::spawn(async move {
            tokio::select! {
                _ = shutdown.cancelled() => {}
                _ = diag.run() => {}
            }
        }))
    } else {
        None
    };

    let rpc_addr = settings.rpc_listen.parse().context("parsing rpc_listen")?;
    let rpc = fne_rpc::RpcService::bind(rpc_addr, &settings.password).await.context("binding rpc socket")?;
    info!(addr = %rpc.local_addr()?, "rpc socket listening");
    register_rpc_handlers(&rpc, &network);
    let rpc = Arc::new(rpc);
    let rpc_task = {
        let rpc = rpc.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => return,
                    result = rpc.poll() => {
                        if let Err(e) = result {
                            warn!(error = %e, "rpc poll error");
                        }
                    }
                }
            }
        })
    };

    tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
    info!("shutdown signal received");
    shutdown.cancel();

    let _ = read_loop.await;
    let _ = clock_task.await;
    let _ = reload_task.await;
    if let Some(diag_task) = diag_task {
        diag_task.abort();
    }
    rpc_task.abort();

    Ok(())
}

fn build_router(
    name: &'static str,
    rules: &Arc<TalkgroupRules>,
    peer_acl: &Arc<IdListAcl>,
    rid_acl: &Arc<IdListAcl>,
    settings: &FneSettings,
) -> ProtocolRouter {
    ProtocolRouter::new(
        name,
        rules.clone(),
        peer_acl.clone(),
        rid_acl.clone(),
        settings.call_activity_timeout_ms,
        settings.parrot_delay_ms,
        settings.parrot_frame_spacing_ms,
    )
}

/// Registers the small set of RPC requests this master answers at this
/// scope: a liveness ping. `RpcHandler` runs synchronously off the RPC poll
/// loop, so anything needing the peer table (itself behind an async lock)
/// is out of reach here without blocking that loop; deeper RPC surfaces
/// (live peer list, force-disconnect, TG activation) are left for a future
/// pass that thread those queries through a channel instead. `fne-rpc`
/// itself already supports registering more handlers.
fn register_rpc_handlers(rpc: &fne_rpc::RpcService, _network: &Arc<FneNetwork>) {
    const RPC_FUNC_PING: u16 = 0x0001;

    rpc.register_handler(RPC_FUNC_PING, Box::new(|_req| serde_json::json!({ "status": 200 })));
}
