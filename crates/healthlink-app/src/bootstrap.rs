use std::future::Future;
use std::io::{self, Write};
use std::sync::Arc;

use healthlink_bridge::{
    EVENT_CHANNEL, HostMethod, JsonEventSink, METHOD_CHANNEL, MethodRouter, StreamHandler,
};
use healthlink_config::{HealthlinkConfig, LogFormatSetting, LoggingSettings};
use healthlink_events::{ChannelSink, EventSink};
use healthlink_poller::UpdatePoller;
use healthlink_provider::{HealthProvider, ProviderHandle};
use healthlink_query::QueryService;
use healthlink_telemetry::{GlobalContextGuard, LogFormat, LoggingConfig, Metrics};
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};
use crate::output::TranscriptWriter;
use crate::simulated::SimulatedProvider;

/// Push events buffered between the poller and the transcript writer.
const EVENT_BUFFER: usize = 64;

/// Dependencies required to bootstrap the application.
pub(crate) struct BootstrapDependencies<W> {
    config: HealthlinkConfig,
    metrics: Metrics,
    provider: Option<Arc<dyn HealthProvider>>,
    transcript: TranscriptWriter<W>,
}

impl BootstrapDependencies<io::Stdout> {
    /// Construct production dependencies from the environment for the binary entrypoint.
    pub(crate) fn from_env() -> AppResult<Self> {
        let config =
            HealthlinkConfig::from_env().map_err(|err| AppError::config("config.from_env", err))?;
        let metrics =
            Metrics::new().map_err(|err| AppError::telemetry("telemetry.metrics", err))?;
        let provider = config
            .simulate
            .then(|| Arc::new(SimulatedProvider::new()) as Arc<dyn HealthProvider>);
        Ok(Self {
            config,
            metrics,
            provider,
            transcript: TranscriptWriter::stdout(),
        })
    }
}

/// Entry point for the application boot sequence.
///
/// # Errors
///
/// Returns an error if configuration, telemetry setup or the final flush fails.
pub async fn run_app() -> AppResult<()> {
    let dependencies = BootstrapDependencies::from_env()?;
    healthlink_telemetry::init_logging(&logging_config(&dependencies.config.logging))
        .map_err(|err| AppError::telemetry("telemetry.init", err))?;
    let _context = GlobalContextGuard::new("stream");
    run_app_with(dependencies, shutdown_signal()).await
}

/// Boot sequence that relies entirely on injected dependencies to simplify testing.
pub(crate) async fn run_app_with<W, S>(
    dependencies: BootstrapDependencies<W>,
    shutdown: S,
) -> AppResult<()>
where
    W: Write + Send + 'static,
    S: Future<Output = ()>,
{
    let BootstrapDependencies {
        config,
        metrics,
        provider,
        transcript,
    } = dependencies;
    info!(simulate = provider.is_some(), "healthlink starting");

    // Separate handles so releasing the poller's reference leaves the query side intact.
    let query_provider = ProviderHandle::new();
    let poller_provider = ProviderHandle::new();
    if let Some(provider) = provider {
        query_provider.install(Arc::clone(&provider));
        poller_provider.install(provider);
    } else {
        warn!("no provider installed; queries answer with defaults and ticks are skipped");
    }

    let router = MethodRouter::new(Arc::new(QueryService::new(
        query_provider.clone(),
        config.query,
        metrics.clone(),
    )));
    for method in HostMethod::ALL {
        let outcome = router.dispatch(method.as_str()).await;
        transcript.method_result(METHOD_CHANNEL, method.as_str(), outcome.into_json());
    }

    let stream = StreamHandler::new(UpdatePoller::new(
        poller_provider,
        config.poller,
        metrics.clone(),
    ));
    // The poller only enqueues; encoding and stdout writes happen on this task.
    let (sink, mut events) = ChannelSink::with_capacity(EVENT_BUFFER);
    let writer = transcript.clone();
    let encoder = JsonEventSink::new(move |value| writer.event(EVENT_CHANNEL, value));
    stream.on_listen(Arc::new(sink)).await;

    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            () = &mut shutdown => break,
            Some(event) = events.next() => encoder.on_event(event),
        }
    }
    info!("shutdown requested");
    stream.on_cancel().await;
    while let Some(event) = events.try_next() {
        encoder.on_event(event);
    }
    stream.shutdown().await;
    query_provider.release();

    let snapshot = metrics.snapshot();
    info!(
        ticks = snapshot.poller_ticks_total,
        tick_panics = snapshot.poller_tick_panics_total,
        "healthlink stopped"
    );
    match metrics.render() {
        Ok(exposition) => debug!(metrics = %exposition, "final metrics"),
        Err(err) => warn!(error = %err, "failed to render metrics"),
    }
    transcript.flush()
}

fn logging_config(settings: &LoggingSettings) -> LoggingConfig<'_> {
    LoggingConfig {
        level: &settings.level,
        format: settings.format.map_or_else(LogFormat::infer, |format| match format {
            LogFormatSetting::Json => LogFormat::Json,
            LogFormatSetting::Pretty => LogFormat::Pretty,
        }),
        build_sha: option_env!("HEALTHLINK_BUILD_SHA").unwrap_or("dev"),
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "ctrl-c handler unavailable; shutting down");
    }
}
