use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatName {
    RequestTotalCount,
    RequestErrorCount,
}

impl StatName {
    pub fn name(&self) -> &'static str {
        match self {
            StatName::RequestTotalCount => "request_total_count",
            StatName::RequestErrorCount => "request_error_count",
        }
    }
}

/// Node level counters, shared by every request.
#[derive(Debug, Default)]
pub struct LtrStats {
    request_total_count: AtomicU64,
    request_error_count: AtomicU64,
}

impl LtrStats {
    pub fn new() -> Self {
        Self::default()
    }

    fn counter(&self, stat: StatName) -> &AtomicU64 {
        match stat {
            StatName::RequestTotalCount => &self.request_total_count,
            StatName::RequestErrorCount => &self.request_error_count,
        }
    }

    pub fn increment(&self, stat: StatName) {
        self.counter(stat).fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self, stat: StatName) -> u64 {
        self.counter(stat).load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> Vec<(&'static str, u64)> {
        [StatName::RequestTotalCount, StatName::RequestErrorCount]
            .iter()
            .map(|s| (s.name(), self.get(*s)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let stats = LtrStats::new();
        stats.increment(StatName::RequestErrorCount);
        stats.increment(StatName::RequestErrorCount);
        stats.increment(StatName::RequestTotalCount);
        assert_eq!(stats.get(StatName::RequestErrorCount), 2);
        assert_eq!(stats.snapshot(), vec![("request_total_count", 1), ("request_error_count", 2)]);
    }
}
