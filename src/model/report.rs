use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Averages {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

/// Held-out evaluation in the familiar precision/recall/F1 layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub classes: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub macro_avg: Averages,
    pub weighted_avg: Averages,
    pub support: usize,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

fn harmonic(p: f64, r: f64) -> f64 {
    if p + r == 0.0 { 0.0 } else { 2.0 * p * r / (p + r) }
}

impl ClassificationReport {
    /// Score predictions against truth. Classes are the sorted union of both
    /// label sets; divisions by zero score 0.
    pub fn compute(truth: &[String], predicted: &[String]) -> Self {
        let mut labels: Vec<&String> = truth.iter().chain(predicted).collect();
        labels.sort();
        labels.dedup();

        let pairs = || truth.iter().zip(predicted);
        let classes: Vec<ClassMetrics> = labels
            .into_iter()
            .map(|label| {
                let tp = pairs().filter(|(t, p)| *t == label && *p == label).count();
                let predicted_n = predicted.iter().filter(|p| *p == label).count();
                let support = truth.iter().filter(|t| *t == label).count();
                let precision = ratio(tp, predicted_n);
                let recall = ratio(tp, support);
                ClassMetrics {
                    label: label.clone(),
                    precision,
                    recall,
                    f1: harmonic(precision, recall),
                    support,
                }
            })
            .collect();

        let total = truth.len();
        let correct = pairs().filter(|(t, p)| t == p).count();

        let k = classes.len().max(1) as f64;
        let macro_avg = Averages {
            precision: classes.iter().map(|c| c.precision).sum::<f64>() / k,
            recall: classes.iter().map(|c| c.recall).sum::<f64>() / k,
            f1: classes.iter().map(|c| c.f1).sum::<f64>() / k,
        };
        let weight = |f: fn(&ClassMetrics) -> f64| {
            if total == 0 {
                0.0
            } else {
                classes.iter().map(|c| f(c) * c.support as f64).sum::<f64>() / total as f64
            }
        };
        let weighted_avg = Averages {
            precision: weight(|c| c.precision),
            recall: weight(|c| c.recall),
            f1: weight(|c| c.f1),
        };

        Self {
            accuracy: ratio(correct, total),
            classes,
            macro_avg,
            weighted_avg,
            support: total,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.support == 0
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return writeln!(f, "No held-out samples; nothing to evaluate.");
        }

        let width = self
            .classes
            .iter()
            .map(|c| c.label.len())
            .chain(["weighted avg".len()])
            .max()
            .unwrap_or(12);

        writeln!(
            f,
            "{:>width$} {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        for c in &self.classes {
            writeln!(
                f,
                "{:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                c.label, c.precision, c.recall, c.f1, c.support
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>width$} {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy", "", "", self.accuracy, self.support
        )?;
        for (name, avg) in [("macro avg", self.macro_avg), ("weighted avg", self.weighted_avg)] {
            writeln!(
                f,
                "{:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                name, avg.precision, avg.recall, avg.f1, self.support
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_metrics() {
        let truth = labels(&["jazz", "jazz", "pop", "pop", "phonk"]);
        let pred = labels(&["jazz", "pop", "pop", "pop", "jazz"]);
        let r = ClassificationReport::compute(&truth, &pred);

        assert_eq!(r.support, 5);
        assert!((r.accuracy - 0.6).abs() < 1e-12);
        let names: Vec<&str> = r.classes.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(names, vec!["jazz", "phonk", "pop"]);

        let jazz = &r.classes[0];
        assert!((jazz.precision - 0.5).abs() < 1e-12);
        assert!((jazz.recall - 0.5).abs() < 1e-12);
        assert_eq!(jazz.support, 2);

        let phonk = &r.classes[1];
        assert_eq!((phonk.precision, phonk.recall, phonk.f1), (0.0, 0.0, 0.0));

        let pop = &r.classes[2];
        assert!((pop.precision - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(pop.recall, 1.0);
        assert!((pop.f1 - 0.8).abs() < 1e-12);

        assert!((r.macro_avg.recall - 0.5).abs() < 1e-12);
        assert!((r.weighted_avg.recall - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_predicted_only_label_is_listed() {
        let r = ClassificationReport::compute(&labels(&["jazz"]), &labels(&["pop"]));
        assert_eq!(r.classes.len(), 2);
        assert_eq!(r.classes[1].label, "pop");
        assert_eq!(r.classes[1].support, 0);
        assert_eq!(r.accuracy, 0.0);
    }

    #[test]
    fn test_display() {
        let r = ClassificationReport::compute(&labels(&["jazz", "pop"]), &labels(&["jazz", "pop"]));
        let text = r.to_string();
        assert!(text.contains("precision"));
        assert!(text.contains("weighted avg"));
        assert!(text.lines().any(|l| l.trim_start().starts_with("jazz") && l.contains("1.00")));

        let empty = ClassificationReport::compute(&[], &[]);
        assert!(empty.is_empty());
        assert!(empty.to_string().contains("No held-out samples"));
    }
}
