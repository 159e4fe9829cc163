use tracing::subscriber::set_global_default;
use tracing::Subscriber;
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_log::LogTracer;
use tracing_subscriber::{fmt::MakeWriter, layer::SubscriberExt, EnvFilter, Registry};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    /// Reads `LOG_FORMAT`; anything but `json` keeps the human readable output.
    pub fn from_env() -> Self {
        match std::env::var("LOG_FORMAT") {
            Ok(value) if value.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

pub fn get_subscriber<Sink>(
    name: impl Into<String>,
    env_filter: impl Into<String>,
    format: LogFormat,
    sink: Sink,
) -> impl Subscriber + Sync + Send
where
    Sink: for<'a> MakeWriter<'a> + Send + Sync + Clone + 'static,
{
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(env_filter.into()));
    let json = format == LogFormat::Json;

    let pretty_layer = (!json).then(|| {
        tracing_subscriber::fmt::Layer::new()
            .with_writer(sink.clone())
            .with_target(false)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_ansi(true)
            .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
    });
    let bunyan_layer = json.then(|| BunyanFormattingLayer::new(name.into(), sink));

    Registry::default()
        .with(env_filter)
        .with(json.then_some(JsonStorageLayer))
        .with(bunyan_layer)
        .with(pretty_layer)
}

pub fn init_subscriber(
    subscriber: impl Subscriber + Sync + Send,
) -> Result<(), Box<dyn std::error::Error>> {
    LogTracer::init()?;
    set_global_default(subscriber)?;
    Ok(())
}
