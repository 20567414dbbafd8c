use itertools::{Itertools, MinMaxResult};

use crate::nn::RawOutput;

use super::Candidate;

/// Receives diagnostics from the detection decoder.
///
/// A [`PalmDetector`][crate::PalmDetector] owns one observer and passes it to every decode call.
/// All methods default to doing nothing.
pub trait DecodeObserver: Send + Sync {
    /// Called once per decode with the unprocessed network output.
    fn raw_output(&self, output: &RawOutput) {
        let _ = output;
    }

    /// Called for every prediction that passes the confidence threshold.
    fn candidate(&self, candidate: &Candidate) {
        let _ = candidate;
    }

    /// Called after decoding with the number of predictions that were examined and accepted.
    fn finished(&self, examined: usize, accepted: usize) {
        let _ = (examined, accepted);
    }
}

/// A [`DecodeObserver`] that forwards diagnostics to the [`log`] crate.
///
/// Value ranges and counts are logged at *debug* level, individual predictions at *trace* level.
#[derive(Debug, Clone, Copy)]
pub struct LogObserver {
    preview: usize,
}

impl LogObserver {
    /// Number of raw predictions logged by default.
    pub const DEFAULT_PREVIEW: usize = 5;

    pub fn new() -> Self {
        Self {
            preview: Self::DEFAULT_PREVIEW,
        }
    }

    /// Sets how many of the first raw predictions get logged at *trace* level.
    pub fn with_preview(mut self, preview: usize) -> Self {
        self.preview = preview;
        self
    }
}

impl Default for LogObserver {
    fn default() -> Self {
        Self::new()
    }
}

fn range(values: &[f32]) -> String {
    match values.iter().minmax_by(|a, b| a.total_cmp(b)) {
        MinMaxResult::NoElements => "<empty>".to_string(),
        MinMaxResult::OneElement(v) => format!("{v}"),
        MinMaxResult::MinMax(min, max) => format!("{min}..={max}"),
    }
}

impl DecodeObserver for LogObserver {
    fn raw_output(&self, output: &RawOutput) {
        log::debug!(
            "raw output: {} predictions, regression range {}, logit range {}",
            output.num_predictions(),
            range(output.regression_values()),
            range(output.logits()),
        );

        if log::log_enabled!(log::Level::Trace) {
            for i in 0..self.preview.min(output.num_predictions()) {
                log::trace!(
                    "prediction {i}: logit={} {:?}",
                    output.logits()[i],
                    output.regression(i),
                );
            }
        }
    }

    fn candidate(&self, candidate: &Candidate) {
        log::trace!(
            "candidate at anchor {}: p={} {:?}",
            candidate.anchor_index(),
            candidate.probability(),
            candidate.rect(),
        );
    }

    fn finished(&self, examined: usize, accepted: usize) {
        log::debug!("{accepted}/{examined} predictions above threshold");
    }
}

/// A [`DecodeObserver`] that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl DecodeObserver for NoopObserver {}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[test]
    fn ranges() {
        assert_eq!(range(&[]), "<empty>");
        assert_eq!(range(&[2.0]), "2");
        assert_eq!(range(&[3.0, -1.0, 0.5]), "-1..=3");
    }

    #[derive(Default)]
    struct Counter {
        calls: Mutex<Vec<(usize, usize)>>,
    }

    impl DecodeObserver for Counter {
        fn finished(&self, examined: usize, accepted: usize) {
            self.calls.lock().unwrap().push((examined, accepted));
        }
    }

    #[test]
    fn default_methods_are_optional() {
        let counter = Counter::default();
        let output = RawOutput::new(vec![0.0; 18], vec![0.0]).unwrap();
        counter.raw_output(&output);
        counter.finished(1, 0);
        assert_eq!(*counter.calls.lock().unwrap(), [(1, 0)]);
    }
}
