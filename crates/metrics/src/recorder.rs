//! Metrics recorder initialization.

use std::net::SocketAddr;

use {anyhow::Result, tracing::info};

/// Handle to the installed recorder.
#[derive(Clone)]
pub struct MetricsHandle {
    #[cfg(feature = "prometheus")]
    prometheus_handle: Option<metrics_exporter_prometheus::PrometheusHandle>,
}

impl MetricsHandle {
    /// Render metrics in Prometheus text format. Empty when nothing is installed.
    #[must_use]
    pub fn render(&self) -> String {
        #[cfg(feature = "prometheus")]
        {
            self.prometheus_handle
                .as_ref()
                .map(metrics_exporter_prometheus::PrometheusHandle::render)
                .unwrap_or_default()
        }
        #[cfg(not(feature = "prometheus"))]
        {
            String::new()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MetricsRecorderConfig {
    pub enabled: bool,
    /// Address the `/metrics` endpoint listens on. `None` installs the
    /// recorder without serving it.
    pub listen: Option<SocketAddr>,
    /// Labels added to every metric
    pub global_labels: Vec<(String, String)>,
}

/// Install the global recorder. Call once, from inside the tokio runtime.
///
/// # Errors
///
/// Fails when the exporter cannot be built or a recorder is already installed.
pub fn init_metrics(config: MetricsRecorderConfig) -> Result<MetricsHandle> {
    if !config.enabled {
        info!("metrics collection is disabled");
        return Ok(MetricsHandle {
            #[cfg(feature = "prometheus")]
            prometheus_handle: None,
        });
    }

    #[cfg(feature = "prometheus")]
    {
        let listen = config.listen;
        let handle = init_prometheus(config)?;
        match listen {
            Some(addr) => info!(%addr, "prometheus exporter listening"),
            None => info!("prometheus recorder installed"),
        }
        Ok(MetricsHandle {
            prometheus_handle: Some(handle),
        })
    }

    #[cfg(not(feature = "prometheus"))]
    {
        info!("metrics feature not enabled at compile time");
        Ok(MetricsHandle {})
    }
}

#[cfg(feature = "prometheus")]
fn init_prometheus(
    config: MetricsRecorderConfig,
) -> Result<metrics_exporter_prometheus::PrometheusHandle> {
    use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};

    let mut builder = PrometheusBuilder::new().set_buckets_for_metric(
        Matcher::Full(crate::commands::DURATION_SECONDS.to_string()),
        &crate::buckets::COMMAND_DURATION,
    )?;
    for (key, value) in config.global_labels {
        builder = builder.add_global_label(key, value);
    }

    let Some(addr) = config.listen else {
        return Ok(builder.install_recorder()?);
    };

    let (recorder, exporter) = builder.with_http_listener(addr).build()?;
    let handle = recorder.handle();
    metrics::set_global_recorder(recorder)
        .map_err(|_| anyhow::anyhow!("a global metrics recorder is already installed"))?;
    tokio::spawn(async move {
        if let Err(e) = exporter.await {
            tracing::warn!(error = ?e, "prometheus exporter stopped");
        }
    });
    Ok(handle)
}
