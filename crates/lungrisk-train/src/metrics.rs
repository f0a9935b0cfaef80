//! Held-out evaluation for the risk classifier.
//!
//! Survey datasets are usually imbalanced, so the evaluation keeps the full
//! confusion matrix rather than a single accuracy number. Counts are tallied
//! row by row while the trainer scores the test partition; every rate is
//! derived from the counts on demand.

/// Confusion-matrix tally for binary screening labels.
///
/// Class 1 = lung cancer, class 0 = no lung cancer. Start from
/// [`ValidationMetrics::default`] and [`record`](Self::record) each scored
/// row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationMetrics {
    /// Cancer rows flagged as cancer.
    pub true_positives: usize,
    /// Healthy rows flagged as cancer.
    pub false_positives: usize,
    /// Healthy rows cleared as healthy.
    pub true_negatives: usize,
    /// Cancer rows cleared as healthy.
    pub false_negatives: usize,
}

impl ValidationMetrics {
    /// Tally one scored row.
    pub fn record(&mut self, predicted_positive: bool, actually_positive: bool) {
        match (predicted_positive, actually_positive) {
            (true, true) => self.true_positives += 1,
            (true, false) => self.false_positives += 1,
            (false, true) => self.false_negatives += 1,
            (false, false) => self.true_negatives += 1,
        }
    }

    /// Rows tallied so far.
    #[must_use]
    pub fn total(&self) -> usize {
        self.true_positives + self.false_positives + self.true_negatives + self.false_negatives
    }

    /// Rows classified correctly.
    #[must_use]
    pub fn correct(&self) -> usize {
        self.true_positives + self.true_negatives
    }

    /// Fraction of rows classified correctly.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        ratio(self.correct(), self.total())
    }

    /// Fraction of flagged rows that are cancer.
    #[must_use]
    pub fn precision(&self) -> f64 {
        ratio(
            self.true_positives,
            self.true_positives + self.false_positives,
        )
    }

    /// Fraction of cancer rows that were flagged. The sensitivity of the screen.
    #[must_use]
    pub fn recall(&self) -> f64 {
        ratio(
            self.true_positives,
            self.true_positives + self.false_negatives,
        )
    }

    /// Harmonic mean of precision and recall.
    #[must_use]
    pub fn f1(&self) -> f64 {
        let p = self.precision();
        let r = self.recall();
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }

    /// Fraction of healthy rows that were flagged anyway.
    #[must_use]
    pub fn false_positive_rate(&self) -> f64 {
        ratio(
            self.false_positives,
            self.false_positives + self.true_negatives,
        )
    }
}

/// `0.0` when the denominator is empty, so every rate is defined for any tally.
fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

impl std::fmt::Display for ValidationMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "accuracy {:.4} ({} of {} rows), precision {:.4}, recall {:.4}, f1 {:.4}, false positive rate {:.4}",
            self.accuracy(),
            self.correct(),
            self.total(),
            self.precision(),
            self.recall(),
            self.f1(),
            self.false_positive_rate()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tally(pairs: &[(bool, bool)]) -> ValidationMetrics {
        let mut metrics = ValidationMetrics::default();
        for &(predicted, actual) in pairs {
            metrics.record(predicted, actual);
        }
        metrics
    }

    #[test]
    fn test_perfect_screen() {
        let m = tally(&[(false, false), (true, true), (false, false), (true, true)]);
        assert_eq!(m.correct(), 4);
        assert!((m.accuracy() - 1.0).abs() < 1e-9);
        assert!((m.precision() - 1.0).abs() < 1e-9);
        assert!((m.recall() - 1.0).abs() < 1e-9);
        assert!((m.f1() - 1.0).abs() < 1e-9);
        assert!(m.false_positive_rate().abs() < 1e-9);
    }

    #[test]
    fn test_inverted_screen() {
        let m = tally(&[(true, false), (true, false), (false, true), (false, true)]);
        assert_eq!(m.correct(), 0);
        assert!(m.accuracy().abs() < 1e-9);
        assert!(m.precision().abs() < 1e-9);
        assert!(m.recall().abs() < 1e-9);
        assert!((m.false_positive_rate() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_mixed_counts_and_rates() {
        // 2 true positives, 1 false positive, 3 true negatives, 2 false negatives.
        let m = tally(&[
            (true, true),
            (true, true),
            (true, false),
            (false, false),
            (false, false),
            (false, false),
            (false, true),
            (false, true),
        ]);
        assert_eq!(m.true_positives, 2);
        assert_eq!(m.false_positives, 1);
        assert_eq!(m.true_negatives, 3);
        assert_eq!(m.false_negatives, 2);
        assert_eq!(m.total(), 8);
        assert!((m.accuracy() - 5.0 / 8.0).abs() < 1e-9);
        assert!((m.precision() - 2.0 / 3.0).abs() < 1e-9);
        assert!((m.recall() - 0.5).abs() < 1e-9);
        assert!((m.f1() - 4.0 / 7.0).abs() < 1e-9);
        assert!((m.false_positive_rate() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_empty_tally_has_defined_rates() {
        let m = ValidationMetrics::default();
        assert_eq!(m.total(), 0);
        assert!(m.accuracy().abs() < 1e-9);
        assert!(m.f1().abs() < 1e-9);
        assert!(m.false_positive_rate().abs() < 1e-9);
    }

    #[test]
    fn test_no_healthy_rows_means_zero_fpr() {
        let m = tally(&[(true, true), (true, true), (true, true)]);
        assert!((m.recall() - 1.0).abs() < 1e-9);
        assert!(m.false_positive_rate().abs() < 1e-9);
    }

    #[test]
    fn test_display_reads_as_report_line() {
        let m = tally(&[(true, true), (false, false)]);
        let line = m.to_string();
        assert!(line.contains("accuracy 1.0000"), "got: {line}");
        assert!(line.contains("2 of 2 rows"), "got: {line}");
        assert!(line.contains("false positive rate"), "got: {line}");
    }
}
