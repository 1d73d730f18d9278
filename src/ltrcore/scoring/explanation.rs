use std::fmt;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Explanation {
    matched: bool,
    value: f32,
    description: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    details: Vec<Explanation>,
}

impl Explanation {
    pub fn matched(value: f32, description: &str, details: Vec<Explanation>) -> Self {
        Explanation {
            matched: true,
            value,
            description: description.to_string(),
            details,
        }
    }

    pub fn no_match(description: &str) -> Self {
        Explanation {
            matched: false,
            value: 0.0,
            description: description.to_string(),
            details: vec![],
        }
    }

    pub fn is_match(&self) -> bool {
        self.matched
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn details(&self) -> &[Explanation] {
        &self.details
    }

    fn write_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        writeln!(f, "{:indent$}{} {}", "", self.value, self.description, indent = depth * 2)?;
        for d in &self.details {
            d.write_indented(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for Explanation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_indented(f, 0)
    }
}
