use std::fs;
use std::path::Path;
use serde_json::Value;
use crate::ltrcore::Result;

pub const DEFAULT_FIELDS: [&str; 2] = ["title", "body"];

#[derive(PartialEq, Debug, Clone)]
pub struct Document {
    id: String,
    content: String,
    // explicit routing, otherwise documents are spread round robin
    shard: Option<usize>,
}

impl Document {
    pub fn new(id: &str, content: &str) -> Self {
        Document {
            id: id.to_string(),
            content: content.to_string(),
            shard: None,
        }
    }
    pub fn with_shard(mut self, shard: usize) -> Self {
        self.shard = Some(shard);
        self
    }
    pub fn get_id(&self) -> &str {
        &self.id
    }
    pub fn get_content(&self) -> &str {
        &self.content
    }
    pub fn get_shard(&self) -> Option<usize> {
        self.shard
    }
}

// one json object per line, text fields are concatenated into the content
pub fn parse_jsonlines(path: &Path, text: &str, fields: &[&str]) -> Vec<Document> {
    let path_string = path.to_string_lossy().to_string();
    let mut docs = vec![];
    for (n, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(line) {
            Ok(value) => {
                let mut content = String::new();
                for f in fields {
                    if let Value::String(s) = &value[f.to_lowercase()] {
                        if !content.is_empty() {
                            content.push(' ');
                        }
                        content.push_str(s);
                    }
                }
                let id = match &value["id"] {
                    Value::String(s) => s.clone(),
                    Value::Number(num) => num.to_string(),
                    _ => format!("{}:{}", path_string, n + 1),
                };
                let mut doc = Document::new(&id, &content);
                if let Some(shard) = value["shard"].as_u64() {
                    doc = doc.with_shard(shard as usize);
                }
                docs.push(doc);
            },
            Err(e) => log::warn!("{}:{}: {}", path_string, n + 1, e),
        }
    }
    docs
}

pub fn load(path: &Path, fields: &[&str]) -> Result<Vec<Document>> {
    let text = fs::read_to_string(path)?;
    Ok(parse_jsonlines(path, &text, fields))
}
