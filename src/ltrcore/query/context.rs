use crate::ltrcore::settings::LtrSettings;
use super::cache::WeightCache;

/// State owned by one search request and handed explicitly to every weight
/// construction of that request.
///
/// A weight cache set here takes precedence over the ranking query's own,
/// this is how the fetch phase shares the weights built while scoring.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    settings: LtrSettings,
    weight_cache: Option<WeightCache>,
}

impl RequestContext {
    pub fn new(settings: LtrSettings) -> Self {
        RequestContext {
            settings,
            weight_cache: None,
        }
    }

    pub fn with_weight_cache(mut self, cache: WeightCache) -> Self {
        self.weight_cache = Some(cache);
        self
    }

    pub fn settings(&self) -> &LtrSettings {
        &self.settings
    }

    pub fn weight_cache(&self) -> Option<&WeightCache> {
        self.weight_cache.as_ref()
    }
}
