use serde_json::Value;
use crate::ltrcore::{DocId, Result};
use crate::ltrcore::index::SegmentReader;
use super::{AllDocs, DocIdSetIterator, Scorer, ScoringContext, Weight};

/// Scores a document from feature values already computed for it.
///
/// The value is `constant + sum(weight * fv[ordinal])`, read from the
/// feature vector carried by the [`ScoringContext`]. Referenced ordinals
/// must come before the derived feature itself, otherwise the vector still
/// holds the model's default for them.
#[derive(Debug)]
pub struct DerivedWeight {
    inputs: Vec<(usize, f32)>,
    constant: f32,
    extra_logging: Option<String>,
}

impl DerivedWeight {
    pub fn new(inputs: Vec<(usize, f32)>, constant: f32) -> Self {
        DerivedWeight { inputs, constant, extra_logging: None }
    }

    // also record the value under `key` when the document is logged
    pub fn with_extra_logging(mut self, key: Option<String>) -> Self {
        self.extra_logging = key;
        self
    }
}

impl Weight for DerivedWeight {
    fn description(&self) -> String {
        format!("derived(inputs={:?}, constant={})", self.inputs, self.constant)
    }

    fn scorer<'a>(&self, reader: SegmentReader<'a>) -> Result<Option<Box<dyn Scorer + 'a>>> {
        Ok(Some(Box::new(DerivedScorer {
            docs: AllDocs::new(reader.max_doc()),
            inputs: self.inputs.clone(),
            constant: self.constant,
            extra_logging: self.extra_logging.clone(),
        })))
    }
}

struct DerivedScorer {
    docs: AllDocs,
    inputs: Vec<(usize, f32)>,
    constant: f32,
    extra_logging: Option<String>,
}

impl DocIdSetIterator for DerivedScorer {
    fn doc_id(&self) -> DocId {
        self.docs.doc_id()
    }

    fn next_doc(&mut self) -> DocId {
        self.docs.next_doc()
    }

    fn advance(&mut self, target: DocId) -> DocId {
        self.docs.advance(target)
    }

    fn cost(&self) -> u64 {
        self.docs.cost()
    }
}

impl Scorer for DerivedScorer {
    fn score(&mut self, ctx: &ScoringContext<'_>) -> f32 {
        let score = self.inputs
            .iter()
            .fold(self.constant, |sum, (ordinal, weight)| sum + weight * ctx.feature_score(*ordinal));
        if let (Some(key), Some(consumer)) = (&self.extra_logging, ctx.log_consumer()) {
            consumer.lock().extra_logging_map().insert(key.clone(), Value::from(score));
        }
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ltrcore::index::Shard;
    use crate::ltrcore::ranker::FeatureVector;

    #[test]
    fn test_derived_reads_feature_vector() {
        let mut shard = Shard::new();
        shard.add_document("a", &[1], 10);
        let weight = DerivedWeight::new(vec![(0, 2.0), (1, -1.0)], 0.5);
        let mut scorer = weight.scorer(shard.readers()[0]).unwrap().unwrap();
        assert_eq!(scorer.next_doc(), 1);

        let mut fv = FeatureVector::new(3, 0.0);
        fv.set_feature_score(0, 3.0);
        fv.set_feature_score(1, 1.0);
        assert_eq!(scorer.score(&ScoringContext::with_vector(&fv)), 5.5);
        // no vector, every input reads as zero
        assert_eq!(scorer.score(&ScoringContext::none()), 0.5);
    }
}
