use std::collections::HashMap;

use serde_json::Value;

use crate::{expand::Node, StoryboardError};

/// Named declaration fragments from the document's `templates` map.
///
/// Loaded once before any declaration is resolved and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    templates: HashMap<String, Node>,
}

impl TemplateRegistry {
    pub fn from_json(value: Option<&Value>) -> Result<Self, StoryboardError> {
        let mut templates = HashMap::new();
        match value {
            None | Some(Value::Null) => {}
            Some(Value::Object(map)) => {
                for (id, fragment) in map {
                    let Value::Object(fragment) = fragment else {
                        return Err(StoryboardError::new(
                            "E1003",
                            format!("template `{id}` must be an object"),
                        ));
                    };
                    templates.insert(id.clone(), fragment.clone());
                }
            }
            Some(_) => {
                return Err(StoryboardError::new("E1003", "`templates` must be an object"));
            }
        }
        Ok(Self { templates })
    }

    pub fn get(&self, id: &str) -> Option<&Node> {
        self.templates.get(id)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn clear(&mut self) {
        self.templates.clear();
    }

    /// Lays `node` over the template chain it references.
    ///
    /// Fields of `node` win over template fields, and a derived template wins over
    /// the template it references. A `states` array is taken wholesale from the
    /// nearest level that has one. The `template` key is consumed.
    pub fn apply(&self, mut node: Node) -> Result<Node, StoryboardError> {
        let Some(reference) = node.remove("template") else {
            return Ok(node);
        };
        let chain = self.chain(&reference)?;

        let mut merged = Node::new();
        for fragment in chain.iter().rev() {
            for (key, value) in fragment.iter() {
                if key != "template" {
                    merged.insert(key.clone(), value.clone());
                }
            }
        }
        merged.extend(node);
        Ok(merged)
    }

    fn chain(&self, reference: &Value) -> Result<Vec<&Node>, StoryboardError> {
        let mut chain: Vec<&Node> = Vec::new();
        let mut seen: Vec<&str> = Vec::new();
        let mut next = Some(reference);

        while let Some(reference) = next {
            let id = match reference {
                Value::Null => break,
                Value::String(id) => id.as_str(),
                other => {
                    return Err(StoryboardError::new("E4102", "`template` must be a string")
                        .with_context(other.to_string()))
                }
            };
            if seen.contains(&id) {
                return Err(StoryboardError::new(
                    "E3004",
                    format!("template inheritance cycle through `{id}`"),
                ));
            }
            let fragment = self.templates.get(id).ok_or_else(|| {
                StoryboardError::new("E3003", format!("unknown template `{id}`"))
            })?;
            seen.push(id);
            chain.push(fragment);
            next = fragment.get("template");
        }
        Ok(chain)
    }
}
