use tracing_subscriber::EnvFilter;

use crate::logging::config::LoggingConfig;

pub fn build_filter_from_config(config: &LoggingConfig) -> EnvFilter {
    let directive = config.build_filter_directive();

    // Если RUST_LOG задан — используем его.
    match EnvFilter::try_from_default_env() {
        Ok(env_filter) => env_filter,
        Err(_) => match EnvFilter::try_new(&directive) {
            Ok(filter) => filter,
            Err(e) => {
                eprintln!(
                    "Invalid log filter directive from config ('{directive}'): {e}; falling back to 'info'"
                );
                EnvFilter::new("info")
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use std::{
        env,
        sync::{Arc, Mutex},
    };

    use serial_test::serial;
    use tracing_subscriber::{fmt, prelude::*, registry::Registry};

    use super::*;

    // Мини-буферный writer для тестов
    #[derive(Clone)]
    struct VecMakeWriter(Arc<Mutex<Vec<u8>>>);

    impl<'a> fmt::MakeWriter<'a> for VecMakeWriter {
        type Writer = VecWriterGuard;

        fn make_writer(&'a self) -> Self::Writer {
            VecWriterGuard(self.0.clone())
        }
    }

    struct VecWriterGuard(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for VecWriterGuard {
        fn write(
            &mut self,
            buf: &[u8],
        ) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn capture(
        config: &LoggingConfig,
        emit: impl FnOnce(),
    ) -> String {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let layer = fmt::layer()
            .with_writer(VecMakeWriter(buf.clone()))
            .with_ansi(false);
        let subscriber = Registry::default()
            .with(build_filter_from_config(config))
            .with(layer);
        tracing::subscriber::with_default(subscriber, emit);

        let bytes = buf.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    /// Уровень из конфига отсекает события ниже порога.
    #[test]
    #[serial]
    fn test_config_level_filters_events() {
        env::remove_var("RUST_LOG");
        let cfg = LoggingConfig {
            level: "info".into(),
            ..Default::default()
        };
        let out = capture(&cfg, || {
            tracing::debug!(target: "cereal", "hidden");
            tracing::info!(target: "cereal", "visible");
        });
        assert!(out.contains("visible"));
        assert!(!out.contains("hidden"));
    }

    /// RUST_LOG имеет приоритет над конфигом.
    #[test]
    #[serial]
    fn test_env_overrides_config() {
        env::set_var("RUST_LOG", "debug");
        let out = capture(&LoggingConfig::default(), || {
            tracing::debug!(target: "cereal", "from env");
        });
        env::remove_var("RUST_LOG");
        assert!(out.contains("from env"));
    }

    /// Некорректная директива не паникует.
    #[test]
    #[serial]
    fn test_invalid_directive_falls_back() {
        env::remove_var("RUST_LOG");
        let cfg = LoggingConfig {
            level: "cereal=[[[".into(),
            ..Default::default()
        };
        let _f = build_filter_from_config(&cfg);
    }
}
