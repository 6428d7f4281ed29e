use summarizer_core::LoggingConfig;
use tracing::Subscriber;
use tracing_subscriber::{
    fmt::MakeWriter, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

const CRATES: [&str; 3] = ["summarizer_api", "summarizer_ai", "summarizer_core"];

fn default_filter(level: &str) -> EnvFilter {
    let directives: Vec<String> = CRATES
        .iter()
        .map(|krate| format!("{}={}", krate, level))
        .chain(std::iter::once("tower_http=debug".to_string()))
        .collect();
    EnvFilter::new(directives.join(","))
}

/// Subscriber used while the configuration itself is being loaded
pub fn startup_subscriber() -> impl Subscriber + Send + Sync {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter("info"));
    startup_subscriber_with(filter, std::io::stderr)
}

pub fn startup_subscriber_with<W>(filter: EnvFilter, writer: W) -> impl Subscriber + Send + Sync
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    tracing_subscriber::registry().with(filter).with(
        tracing_subscriber::fmt::layer()
            .compact()
            .with_writer(writer),
    )
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
pub fn init_tracing(config: &LoggingConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(&config.level));

    let registry = tracing_subscriber::registry().with(env_filter);

    // A second init (tests, embedding) is not an error worth failing over.
    let _ = match config.format.as_str() {
        "json" => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        "compact" => registry
            .with(tracing_subscriber::fmt::layer().compact())
            .try_init(),
        _ => registry.with(tracing_subscriber::fmt::layer()).try_init(),
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};
    use summarizer_core::{ConfigManager, SummarizerConfig};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn startup_subscriber_keeps_config_warnings() {
        let captured = Captured::default();
        let subscriber = startup_subscriber_with(default_filter("info"), captured.clone());

        let config = tracing::subscriber::with_default(subscriber, || {
            ConfigManager::apply_env_overrides(SummarizerConfig::default(), |key: &str| {
                (key == "SUMMARIZER_PORT").then(|| "not-a-port".to_string())
            })
        });

        assert_eq!(config.server.port, 3000);
        let output = captured.text();
        assert!(output.contains("Ignoring invalid SUMMARIZER_PORT"), "{}", output);
    }

    #[test]
    fn default_filter_covers_workspace_crates() {
        let filter = default_filter("warn").to_string();
        for krate in CRATES {
            assert!(filter.contains(&format!("{}=warn", krate)), "{}", filter);
        }
    }
}
