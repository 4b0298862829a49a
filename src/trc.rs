//! Tracing configuration and initialization.

use tracing_subscriber::{
    EnvFilter,
    fmt::format::FmtSpan,
    layer::SubscriberExt,
    util::{SubscriberInitExt, TryInitError},
};

/// Environment variable consulted for a log filter before the default.
pub const LOG_ENV: &str = "DOKUFS_LOG";

pub struct Trc {
    env_filter: EnvFilter,
}

impl Default for Trc {
    fn default() -> Self {
        let env_filter = EnvFilter::try_from_env(LOG_ENV)
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("info"));
        Self { env_filter }
    }
}

impl Trc {
    /// Use an explicit filter directive instead of the environment.
    pub fn with_directive(directive: &str) -> Self {
        Self {
            env_filter: EnvFilter::new(directive),
        }
    }

    pub fn init(self) -> Result<(), TryInitError> {
        tracing_subscriber::registry()
            .with(self.env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_span_events(FmtSpan::ENTER | FmtSpan::CLOSE),
            )
            .try_init()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_second_global_init_reports_the_error() {
        Trc::with_directive("info")
            .init()
            .expect("first init claims the global subscriber");
        assert!(Trc::with_directive("debug").init().is_err());
    }
}
