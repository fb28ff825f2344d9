use std::{collections::BTreeMap, time::Instant};

use serde_json::Value;
use storyboard_schema::{Category, Chart, ObjectState, StageObject};

use crate::{
    chain::{build_states, node_note},
    expand::{expand, Node},
    template::TemplateRegistry,
    time::ResolveContext,
    StoryboardError,
};

pub type ObjectTable<S> = BTreeMap<String, StageObject<S>>;

/// Turns raw declarations of one document into stage objects.
pub(crate) struct ObjectLoader<'a> {
    chart: &'a Chart,
    templates: &'a TemplateRegistry,
    generated_ids: usize,
}

impl<'a> ObjectLoader<'a> {
    pub(crate) fn new(chart: &'a Chart, templates: &'a TemplateRegistry) -> Self {
        Self {
            chart,
            templates,
            generated_ids: 0,
        }
    }

    /// Loads every declaration of one category array into `table`.
    ///
    /// Failures are isolated per declaration and appended to `diagnostics`.
    /// On duplicate ids the first object wins.
    pub(crate) fn load_category<S: ObjectState>(
        &mut self,
        declarations: Option<&Value>,
        table: &mut ObjectTable<S>,
        diagnostics: &mut Vec<StoryboardError>,
    ) {
        let category = S::CATEGORY;
        let declarations = match declarations {
            None | Some(Value::Null) => return,
            Some(Value::Array(items)) => items,
            Some(_) => {
                report(
                    diagnostics,
                    StoryboardError::new("E1003", format!("`{category}` must be an array"))
                        .with_category(category),
                );
                return;
            }
        };

        let started = Instant::now();
        for (index, declaration) in declarations.iter().enumerate() {
            let Value::Object(node) = declaration else {
                report(
                    diagnostics,
                    StoryboardError::new("E1003", "declarations must be objects")
                        .with_category(category)
                        .with_index(index),
                );
                continue;
            };

            let expanded = match expand(node.clone(), self.chart) {
                Ok(expanded) => expanded,
                Err(e) => {
                    report(diagnostics, e.with_category(category).with_index(index));
                    continue;
                }
            };

            for node in expanded {
                match self.load_object::<S>(node) {
                    Ok(object) => {
                        if table.contains_key(&object.id) {
                            report(
                                diagnostics,
                                StoryboardError::new(
                                    "E4101",
                                    format!("redefinition of `{}`", object.id),
                                )
                                .with_category(category)
                                .with_index(index)
                                .with_object_id(object.id.clone()),
                            );
                            continue;
                        }
                        table.insert(object.id.clone(), object);
                    }
                    Err(e) => report(diagnostics, e.with_category(category).with_index(index)),
                }
            }
        }

        tracing::debug!(
            %category,
            objects = table.len(),
            elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
            "loaded category"
        );
    }

    /// Resolves one expanded root declaration with its own replacement context.
    pub(crate) fn load_object<S: ObjectState>(
        &mut self,
        mut node: Node,
    ) -> Result<StageObject<S>, StoryboardError> {
        // The default lands on the raw declaration, so it also shadows a template's `time`.
        if let Some(default_time) = S::CATEGORY.default_time() {
            if node.get("time").map_or(true, Value::is_null) {
                node.insert("time".to_string(), Value::from(default_time));
            }
        }
        let node = self.templates.apply(node)?;

        let id = string_field(&node, "id")?;
        let target_id = string_field(&node, "target_id")?;
        let parent_id = string_field(&node, "parent_id")?;
        if id.is_some() && target_id.is_some() {
            return Err(StoryboardError::new(
                "E4001",
                "a stage object cannot have both id and target_id",
            ));
        }
        if target_id.is_some() && parent_id.is_some() {
            return Err(StoryboardError::new(
                "E4002",
                "a stage object cannot have both target_id and parent_id",
            ));
        }

        let mut ctx = ResolveContext::new(self.chart);
        let states = build_states::<S>(&node, self.templates, &mut ctx)?;

        let note = node_note(&node);
        let id = match id {
            Some(id) => ctx.substitute(id, note)?,
            None => self.generate_id(S::CATEGORY),
        };
        let target_id = target_id.map(|s| ctx.substitute(s, note)).transpose()?;
        let parent_id = parent_id.map(|s| ctx.substitute(s, note)).transpose()?;

        Ok(StageObject {
            id,
            target_id,
            parent_id,
            states,
        })
    }

    fn generate_id(&mut self, category: Category) -> String {
        self.generated_ids += 1;
        format!("auto:{category}:{}", self.generated_ids)
    }
}

fn string_field<'n>(node: &'n Node, key: &str) -> Result<Option<&'n str>, StoryboardError> {
    match node.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(StoryboardError::new("E4102", format!("`{key}` must be a string"))
            .with_context(other.to_string())),
    }
}

fn report(diagnostics: &mut Vec<StoryboardError>, error: StoryboardError) {
    tracing::warn!(
        code = error.code,
        category = error.category.map(|c| c.key()),
        index = error.index,
        object_id = error.object_id.as_deref(),
        "storyboard: {}",
        error.message
    );
    diagnostics.push(error);
}
