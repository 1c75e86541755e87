use crate::schema::FeatureVector;

/// A feature vector with its genre label.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledSample {
    pub features: FeatureVector,
    pub label: String,
}

/// Ordered labeled samples sharing the canonical schema.
///
/// Holding `FeatureVector`s means every row already has all 27 finite values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Corpus {
    samples: Vec<LabeledSample>,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, features: FeatureVector, label: impl Into<String>) {
        self.samples.push(LabeledSample {
            features,
            label: label.into(),
        });
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[LabeledSample] {
        &self.samples
    }

    pub fn iter(&self) -> impl Iterator<Item = &LabeledSample> {
        self.samples.iter()
    }

    /// Sorted distinct labels.
    pub fn labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = self.samples.iter().map(|s| s.label.clone()).collect();
        labels.sort();
        labels.dedup();
        labels
    }
}

impl FromIterator<LabeledSample> for Corpus {
    fn from_iter<I: IntoIterator<Item = LabeledSample>>(iter: I) -> Self {
        Self {
            samples: iter.into_iter().collect(),
        }
    }
}

/// A dataset row as read from disk, before numeric coercion.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    /// 1-based line number in the source file (header is line 1).
    pub line: usize,
    pub cells: Vec<String>,
}

/// Dataset file contents whose header matched the canonical schema.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetTable {
    pub rows: Vec<RawRow>,
}

impl DatasetTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}
