//! Metric logger traits and composites.

use std::collections::HashMap;

/// Sink for search metrics (rewards, losses, entropies).
pub trait MetricLogger: Send + Sync {
    /// Log a single scalar.
    fn log_scalar(&self, name: &str, value: f64, step: u64);

    /// Log a set of named scalars for one step.
    fn log_metrics(&self, metrics: &HashMap<String, f64>, step: u64);

    /// Flush pending writes.
    fn close(&self) {}
}

/// Discards everything.
pub struct NoOpLogger;

impl MetricLogger for NoOpLogger {
    fn log_scalar(&self, _name: &str, _value: f64, _step: u64) {}
    fn log_metrics(&self, _metrics: &HashMap<String, f64>, _step: u64) {}
}

/// Dispatches to multiple backends.
#[derive(Default)]
pub struct CompositeLogger {
    loggers: Vec<Box<dyn MetricLogger>>,
}

impl CompositeLogger {
    pub fn new(loggers: Vec<Box<dyn MetricLogger>>) -> Self {
        Self { loggers }
    }

    pub fn add(&mut self, logger: Box<dyn MetricLogger>) {
        self.loggers.push(logger);
    }

    pub fn len(&self) -> usize {
        self.loggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loggers.is_empty()
    }
}

impl MetricLogger for CompositeLogger {
    fn log_scalar(&self, name: &str, value: f64, step: u64) {
        for logger in &self.loggers {
            logger.log_scalar(name, value, step);
        }
    }

    fn log_metrics(&self, metrics: &HashMap<String, f64>, step: u64) {
        for logger in &self.loggers {
            logger.log_metrics(metrics, step);
        }
    }

    fn close(&self) {
        for logger in &self.loggers {
            logger.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Recording(Arc<Mutex<Vec<(String, f64, u64)>>>);

    impl MetricLogger for Recording {
        fn log_scalar(&self, name: &str, value: f64, step: u64) {
            self.0.lock().unwrap().push((name.to_string(), value, step));
        }

        fn log_metrics(&self, metrics: &HashMap<String, f64>, step: u64) {
            for (name, value) in metrics {
                self.log_scalar(name, *value, step);
            }
        }
    }

    #[test]
    fn test_composite_dispatches_to_all() {
        let a = Recording::default();
        let b = Recording::default();
        let mut composite = CompositeLogger::new(vec![Box::new(a.clone())]);
        composite.add(Box::new(b.clone()));
        composite.add(Box::new(NoOpLogger));
        assert_eq!(composite.len(), 3);

        composite.log_scalar("reward", 0.5, 3);
        let mut metrics = HashMap::new();
        metrics.insert("entropy".to_string(), 1.0);
        composite.log_metrics(&metrics, 4);
        composite.close();

        for rec in [a, b] {
            let entries = rec.0.lock().unwrap();
            assert_eq!(entries.len(), 2);
            assert_eq!(entries[0], ("reward".to_string(), 0.5, 3));
            assert_eq!(entries[1].2, 4);
        }
    }
}
