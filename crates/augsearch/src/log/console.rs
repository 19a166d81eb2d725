//! Console logging backend.

use std::collections::HashMap;

use super::MetricLogger;

/// Writes metrics as `tracing` events.
#[derive(Default)]
pub struct ConsoleLogger;

impl ConsoleLogger {
    pub fn new() -> Self {
        Self
    }

    /// `step N: a=1.0000, b=2.0000` with keys sorted
    pub(crate) fn format_metrics(metrics: &HashMap<String, f64>, step: u64) -> String {
        let mut keys: Vec<_> = metrics.keys().collect();
        keys.sort();

        let fields: Vec<String> = keys
            .into_iter()
            .map(|k| format!("{}={:.4}", k, metrics[k]))
            .collect();
        format!("step {}: {}", step, fields.join(", "))
    }
}

impl MetricLogger for ConsoleLogger {
    fn log_scalar(&self, name: &str, value: f64, step: u64) {
        tracing::info!(step, "{} = {:.4}", name, value);
    }

    fn log_metrics(&self, metrics: &HashMap<String, f64>, step: u64) {
        tracing::info!("{}", Self::format_metrics(metrics, step));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_metrics_sorted() {
        let mut metrics = HashMap::new();
        metrics.insert("loss".to_string(), 0.25);
        metrics.insert("entropy".to_string(), 3.0);
        assert_eq!(
            ConsoleLogger::format_metrics(&metrics, 7),
            "step 7: entropy=3.0000, loss=0.2500"
        );
    }
}
