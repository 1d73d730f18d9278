use std::mem;
use std::sync::Arc;
use serde::{Serialize, Deserialize};
use serde_json::{Map, Value};
use crate::ltrcore::feature::FeatureSet;
use crate::ltrcore::ranker::LogConsumer;
use super::EXTRA_LOGGING_NAME;

#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
#[serde(untagged)]
pub enum LogValue {
    Score(f32),
    Extra(Map<String, Value>),
}

/// One `{name, value}` item of a hit's log. The value is absent for a
/// feature that did not match when missing features are not reported.
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
pub struct LogEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<LogValue>,
}

impl LogEntry {
    pub fn score(&self) -> Option<f32> {
        match self.value {
            Some(LogValue::Score(score)) => Some(score),
            _ => None,
        }
    }
}

/// Builds the log of one logger for every hit it is shown.
///
/// `next_doc` opens a fresh log with one entry per feature, in ordinal
/// order. Feature values and extra logging land in the open log until the
/// next call to `next_doc`.
#[derive(Debug)]
pub struct HitLogConsumer {
    name: String,
    features: Arc<FeatureSet>,
    missing_as_zero: bool,
    // hit index and its log
    current: Option<(usize, Vec<LogEntry>)>,
    extra_logging: Option<Map<String, Value>>,
    logs: Vec<(usize, Vec<LogEntry>)>,
}

impl HitLogConsumer {
    pub fn new(name: &str, features: Arc<FeatureSet>, missing_as_zero: bool) -> Self {
        HitLogConsumer {
            name: name.to_string(),
            features,
            missing_as_zero,
            current: None,
            extra_logging: None,
            logs: vec![],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn feature_count(&self) -> usize {
        self.features.size()
    }

    fn rebuild(&self) -> Vec<LogEntry> {
        (0..self.features.size())
            .map(|ordinal| LogEntry {
                name: self.features.feature(ordinal).name().to_string(),
                value: if self.missing_as_zero { Some(LogValue::Score(0.0)) } else { None },
            })
            .collect()
    }

    // closes the open log, extra logging goes last
    fn flush(&mut self) {
        if let Some((hit, mut log)) = self.current.take() {
            if let Some(extra) = self.extra_logging.take() {
                log.push(LogEntry {
                    name: EXTRA_LOGGING_NAME.to_string(),
                    value: Some(LogValue::Extra(extra)),
                });
            }
            self.logs.push((hit, log));
        }
    }

    /// Logs of every hit seen so far, by hit index.
    pub fn take_logs(&mut self) -> Vec<(usize, Vec<LogEntry>)> {
        self.flush();
        mem::take(&mut self.logs)
    }
}

impl LogConsumer for HitLogConsumer {
    fn next_doc(&mut self, hit: usize) {
        self.flush();
        self.current = Some((hit, self.rebuild()));
    }

    fn accept(&mut self, ordinal: usize, score: f32) {
        let (_, log) = self.current.as_mut().expect("accept called before next_doc");
        log[ordinal].value = Some(LogValue::Score(score));
    }

    fn extra_logging_map(&mut self) -> &mut Map<String, Value> {
        assert!(self.current.is_some(), "extra logging requested before next_doc");
        self.extra_logging.get_or_insert_with(Map::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ltrcore::feature::{Feature, PrebuiltFeature};
    use crate::ltrcore::query::SubQuery;

    fn features() -> Arc<FeatureSet> {
        let features: Vec<Arc<dyn Feature>> = ["title", "body", "year"]
            .iter()
            .map(|n| Arc::new(PrebuiltFeature::new(n, SubQuery::MatchNone)) as Arc<dyn Feature>)
            .collect();
        Arc::new(FeatureSet::new("set", features).unwrap())
    }

    #[test]
    fn test_missing_feature_omitted() {
        let mut consumer = HitLogConsumer::new("log", features(), false);
        consumer.next_doc(4);
        consumer.accept(0, 1.5);
        consumer.accept(2, 3.0);
        let logs = consumer.take_logs();
        assert_eq!(logs.len(), 1);
        let (hit, log) = &logs[0];
        assert_eq!(*hit, 4);
        assert_eq!(log.iter().map(|e| e.name.as_str()).collect::<Vec<_>>(), vec!["title", "body", "year"]);
        assert_eq!(log[0].score(), Some(1.5));
        assert_eq!(log[1].value, None);
        assert_eq!(
            serde_json::to_string(&log[..2]).unwrap(),
            r#"[{"name":"title","value":1.5},{"name":"body"}]"#
        );
        assert!(consumer.take_logs().is_empty());
    }

    #[test]
    fn test_missing_as_zero_and_reset() {
        let mut consumer = HitLogConsumer::new("log", features(), true);
        consumer.next_doc(0);
        consumer.accept(1, 2.0);
        consumer.next_doc(1);
        let logs = consumer.take_logs();
        assert_eq!(logs[0].1[1].score(), Some(2.0));
        assert_eq!(logs[0].1[0].score(), Some(0.0));
        // nothing leaks into the next hit
        assert!(logs[1].1.iter().all(|e| e.score() == Some(0.0)));
    }

    #[test]
    fn test_extra_logging_appended_once() {
        let mut consumer = HitLogConsumer::new("log", features(), false);
        consumer.next_doc(0);
        consumer.extra_logging_map().insert("a".to_string(), Value::from(1));
        consumer.extra_logging_map().insert("b".to_string(), Value::from(2));
        consumer.next_doc(1);
        let logs = consumer.take_logs();
        assert_eq!(logs[0].1.len(), 4);
        let extra = &logs[0].1[3];
        assert_eq!(extra.name, EXTRA_LOGGING_NAME);
        match &extra.value {
            Some(LogValue::Extra(map)) => assert_eq!(map.len(), 2),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(logs[1].1.len(), 3);
    }

    #[test]
    #[should_panic(expected = "accept called before next_doc")]
    fn test_accept_without_doc_panics() {
        let mut consumer = HitLogConsumer::new("log", features(), false);
        consumer.accept(0, 1.0);
    }
}
