use std::sync::Arc;
use serde::{Serialize, Deserialize};
use crate::ltrcore::{LtrError, Params, Result};
use crate::ltrcore::query::subquery::{DerivedExpr, QueryFloat, SubQuery};
use super::{Feature, FeatureSet, LtrQueryContext};

fn default_weight() -> f32 {
    1.0
}

#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
pub struct DerivedInput {
    pub feature: String,
    #[serde(default = "default_weight")]
    pub weight: f32,
}

/// Query template of a stored feature. Text may hold `{{param}}`
/// placeholders, filled from the query parameters.
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeatureTemplate {
    Match { text: String },
    Phrase { text: String },
    Lmd { text: String },
    Constant { score: f32 },
    // weighted sum of features defined earlier in the same set
    Derived {
        inputs: Vec<DerivedInput>,
        #[serde(default)]
        constant: f32,
        #[serde(default)]
        extra_logging: bool,
    },
}

#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
pub struct StoredFeature {
    name: String,
    // parameters the feature cannot be built without
    #[serde(default)]
    params: Vec<String>,
    template: FeatureTemplate,
}

impl StoredFeature {
    pub fn new(name: &str, params: &[&str], template: FeatureTemplate) -> Self {
        StoredFeature {
            name: name.to_string(),
            params: params.iter().map(|p| p.to_string()).collect(),
            template,
        }
    }

    pub fn template(&self) -> &FeatureTemplate {
        &self.template
    }

    fn missing_params(&self, params: &Params) -> Result<()> {
        let missing: Vec<&str> = self.params
            .iter()
            .filter(|p| !params.contains_key(p.as_str()))
            .map(|p| p.as_str())
            .collect();
        if !missing.is_empty() {
            return Err(LtrError::MissingParameter {
                feature: self.name.clone(),
                params: missing.join(", "),
            });
        }
        Ok(())
    }

    // replaces every {{name}} with its parameter value
    fn render(&self, text: &str, params: &Params) -> Result<String> {
        let mut rendered = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(start) = rest.find("{{") {
            let end = match rest[start..].find("}}") {
                Some(end) => start + end,
                None => break,
            };
            let key = rest[start + 2..end].trim();
            let value = params.get(key).ok_or_else(|| LtrError::MissingParameter {
                feature: self.name.clone(),
                params: key.to_string(),
            })?;
            rendered.push_str(&rest[..start]);
            rendered.push_str(value);
            rest = &rest[end + 2..];
        }
        rendered.push_str(rest);
        Ok(rendered)
    }
}

impl Feature for StoredFeature {
    fn name(&self) -> &str {
        &self.name
    }

    fn to_query(&self, ctx: &LtrQueryContext<'_>, params: &Params) -> Result<SubQuery> {
        self.missing_params(params)?;
        let query = match &self.template {
            FeatureTemplate::Match { text } => SubQuery::Match { terms: ctx.terms(&self.render(text, params)?) },
            FeatureTemplate::Phrase { text } => SubQuery::Phrase { terms: ctx.phrase_terms(&self.render(text, params)?) },
            FeatureTemplate::Lmd { text } => SubQuery::Lmd { terms: ctx.terms(&self.render(text, params)?) },
            FeatureTemplate::Constant { score } => SubQuery::Constant { score: QueryFloat(*score) },
            FeatureTemplate::Derived { .. } => {
                return Err(LtrError::InvalidDefinition {
                    name: self.name.clone(),
                    reason: "derived feature used outside of its feature set".to_string(),
                });
            },
        };
        Ok(query)
    }
}

// A derived feature whose inputs were resolved to ordinals.
#[derive(Debug, Clone)]
struct DerivedFeature {
    name: String,
    expr: DerivedExpr,
}

impl Feature for DerivedFeature {
    fn name(&self) -> &str {
        &self.name
    }

    fn to_query(&self, _ctx: &LtrQueryContext<'_>, _params: &Params) -> Result<SubQuery> {
        Ok(SubQuery::Derived(self.expr.clone()))
    }
}

/// Feature set as stored in model files.
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
pub struct StoredFeatureSet {
    name: String,
    features: Vec<StoredFeature>,
}

impl StoredFeatureSet {
    pub fn new(name: &str, features: Vec<StoredFeature>) -> Self {
        StoredFeatureSet {
            name: name.to_string(),
            features,
        }
    }

    pub fn size(&self) -> usize {
        self.features.len()
    }

    // resolves derived feature references, they may only point backwards
    pub fn compile(&self) -> Result<FeatureSet> {
        let mut compiled: Vec<Arc<dyn Feature>> = Vec::with_capacity(self.features.len());
        for (ordinal, feature) in self.features.iter().enumerate() {
            match &feature.template {
                FeatureTemplate::Derived { inputs, constant, extra_logging } => {
                    let mut resolved = vec![];
                    for input in inputs {
                        let target = self.features[..ordinal]
                            .iter()
                            .position(|f| f.name == input.feature)
                            .ok_or_else(|| LtrError::UnknownFeature {
                                feature: feature.name.clone(),
                                reference: input.feature.clone(),
                            })?;
                        resolved.push((target, input.weight));
                    }
                    let mut expr = DerivedExpr::new(resolved, *constant);
                    if *extra_logging {
                        expr = expr.with_extra_logging(&feature.name);
                    }
                    compiled.push(Arc::new(DerivedFeature {
                        name: feature.name.clone(),
                        expr,
                    }));
                },
                _ => compiled.push(Arc::new(feature.clone())),
            }
        }
        FeatureSet::new(&self.name, compiled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ltrcore::analyzer::Analyzer;

    fn params(kv: &[(&str, &str)]) -> Params {
        kv.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_render_params() {
        let mut analyzer = Analyzer::new();
        analyzer.analyze("do you quarrel sir");
        let ctx = LtrQueryContext::new(&analyzer);
        let feature = StoredFeature::new("title", &["keywords"], FeatureTemplate::Match {
            text: "{{ keywords }} sir".to_string(),
        });
        let query = feature.to_query(&ctx, &params(&[("keywords", "quarrel")])).unwrap();
        assert_eq!(query, SubQuery::Match { terms: vec![3, 4] });

        match feature.to_query(&ctx, &Params::new()) {
            Err(LtrError::MissingParameter { feature, params }) => {
                assert_eq!(feature, "title");
                assert_eq!(params, "keywords");
            },
            other => panic!("unexpected {:?}", other),
        }

        // undeclared placeholders are required too
        let loose = StoredFeature::new("loose", &[], FeatureTemplate::Phrase {
            text: "{{a}} {{b}}".to_string(),
        });
        assert!(loose.to_query(&ctx, &params(&[("a", "do")])).is_err());
        assert_eq!(
            loose.to_query(&ctx, &params(&[("a", "do"), ("b", "you")])).unwrap(),
            SubQuery::Phrase { terms: vec![1, 2] }
        );
    }

    #[test]
    fn test_phrase_with_unknown_word_matches_nothing() {
        use crate::ltrcore::index::Shard;
        use crate::ltrcore::query::IndexSearcher;
        use crate::ltrcore::scoring::Weight;

        let mut analyzer = Analyzer::new();
        let mut shard = Shard::new();
        let text = "quarrel sir no sir";
        shard.add_document("1", &analyzer.analyze(text), 10);
        let ctx = LtrQueryContext::new(&analyzer);
        let feature = StoredFeature::new("phrase", &["keywords"], FeatureTemplate::Phrase {
            text: "{{keywords}}".to_string(),
        });

        let query = feature.to_query(&ctx, &params(&[("keywords", "quarrel zzz sir")])).unwrap();
        assert_eq!(query, SubQuery::Phrase { terms: vec![] });
        let searcher = IndexSearcher::new(&shard);
        let canonical = query.rewrite(&searcher);
        assert_eq!(canonical, SubQuery::MatchNone);
        let weight = canonical.create_weight(&searcher).unwrap();
        assert!(weight.scorer(searcher.readers()[0]).unwrap().is_none());

        let query = feature.to_query(&ctx, &params(&[("keywords", "quarrel sir")])).unwrap();
        assert_eq!(query, SubQuery::Phrase { terms: vec![1, 2] });
    }

    #[test]
    fn test_compile_derived() {
        let yaml = "
name: movies
features:
  - name: title
    params: [keywords]
    template:
      type: match
      text: '{{keywords}}'
  - name: popularity
    template:
      type: constant
      score: 2.0
  - name: combined
    template:
      type: derived
      inputs:
        - feature: title
          weight: 0.5
        - feature: popularity
      constant: 1.0
      extra_logging: true
";
        let stored: StoredFeatureSet = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(stored.size(), 3);
        let set = stored.compile().unwrap();
        assert_eq!(set.name(), "movies");
        let query = set.feature(2).to_query(&LtrQueryContext::empty(), &Params::new()).unwrap();
        assert_eq!(query, SubQuery::Derived(
            DerivedExpr::new(vec![(0, 0.5), (1, 1.0)], 1.0).with_extra_logging("combined")
        ));
    }

    #[test]
    fn test_compile_rejects_forward_reference() {
        let stored = StoredFeatureSet::new("set", vec![
            StoredFeature::new("sum", &[], FeatureTemplate::Derived {
                inputs: vec![DerivedInput { feature: "later".to_string(), weight: 1.0 }],
                constant: 0.0,
                extra_logging: false,
            }),
            StoredFeature::new("later", &[], FeatureTemplate::Constant { score: 1.0 }),
        ]);
        match stored.compile() {
            Err(LtrError::UnknownFeature { feature, reference }) => {
                assert_eq!(feature, "sum");
                assert_eq!(reference, "later");
            },
            other => panic!("unexpected {:?}", other),
        }
    }
}
