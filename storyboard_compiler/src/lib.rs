use std::{fs, path::Path};

use serde_json::Value;
use storyboard_schema::{
    Category, Chart, CompiledStoryboard, ControllerState, LineState, NoteControllerState,
    ObjectState, SpriteState, StageObject, TextState, VideoState,
};

mod chain;
mod error;
mod expand;
mod loader;
mod selector;
mod template;
mod time;
mod trigger;

pub use chain::build_states;
pub use error::{StoryboardError, StoryboardErrorKind, StoryboardResult};
pub use expand::expand;
pub use loader::ObjectTable;
pub use selector::NoteSelector;
pub use template::TemplateRegistry;
pub use time::{resolve_time, ResolveContext};
pub use trigger::{load_trigger, GameSnapshot, TriggerEngine, TriggerHandler};

use loader::ObjectLoader;

#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Fail the load on the first per-declaration diagnostic instead of skipping it.
    pub strict: bool,
}

/// A fully resolved storyboard: one object table per category plus the armed triggers.
#[derive(Debug, Clone, Default)]
pub struct Storyboard {
    pub texts: ObjectTable<TextState>,
    pub sprites: ObjectTable<SpriteState>,
    pub videos: ObjectTable<VideoState>,
    pub lines: ObjectTable<LineState>,
    pub controllers: ObjectTable<ControllerState>,
    pub note_controllers: ObjectTable<NoteControllerState>,
    pub triggers: TriggerEngine,
    pub templates: TemplateRegistry,
    diagnostics: Vec<StoryboardError>,
}

pub fn parse_file(path: impl AsRef<Path>, chart: &Chart) -> Result<Storyboard, StoryboardError> {
    parse_file_with_options(path, chart, &ParseOptions::default())
}

pub fn parse_file_with_options(
    path: impl AsRef<Path>,
    chart: &Chart,
    options: &ParseOptions,
) -> Result<Storyboard, StoryboardError> {
    let path = path.as_ref();
    let src = fs::read_to_string(path).map_err(|e| {
        StoryboardError::new("E2001", format!("failed to read storyboard: {e}"))
            .with_file(path.display().to_string())
    })?;
    parse_str_with_options(&src, chart, options).map_err(|e| e.with_file(path.display().to_string()))
}

pub fn parse_str(src: &str, chart: &Chart) -> Result<Storyboard, StoryboardError> {
    parse_str_with_options(src, chart, &ParseOptions::default())
}

pub fn parse_str_with_options(
    src: &str,
    chart: &Chart,
    options: &ParseOptions,
) -> Result<Storyboard, StoryboardError> {
    let root: Value = serde_json::from_str(src)
        .map_err(|e| StoryboardError::new("E1001", format!("invalid storyboard json: {e}")))?;
    parse_value_with_options(&root, chart, options)
}

pub fn parse_value_with_options(
    root: &Value,
    chart: &Chart,
    options: &ParseOptions,
) -> Result<Storyboard, StoryboardError> {
    let Value::Object(_) = root else {
        return Err(StoryboardError::new("E1002", "storyboard root must be an object"));
    };

    let storyboard = if root.get("compiled").and_then(Value::as_bool) == Some(true) {
        load_compiled(root)?
    } else {
        load_declarations(root, chart)?
    };

    if options.strict {
        if let Some(first) = storyboard.diagnostics.first() {
            return Err(first.clone());
        }
    }
    Ok(storyboard)
}

/// Raw path: templates, expansion, time resolution, state chains, triggers.
fn load_declarations(root: &Value, chart: &Chart) -> Result<Storyboard, StoryboardError> {
    let templates = TemplateRegistry::from_json(root.get("templates"))?;
    let mut storyboard = Storyboard::default();
    let mut diagnostics = Vec::new();

    let mut loader = ObjectLoader::new(chart, &templates);
    for category in Category::ALL {
        let declarations = root.get(category.key());
        match category {
            Category::Text => {
                loader.load_category(declarations, &mut storyboard.texts, &mut diagnostics)
            }
            Category::Sprite => {
                loader.load_category(declarations, &mut storyboard.sprites, &mut diagnostics)
            }
            Category::Video => {
                loader.load_category(declarations, &mut storyboard.videos, &mut diagnostics)
            }
            Category::Line => {
                loader.load_category(declarations, &mut storyboard.lines, &mut diagnostics)
            }
            Category::Controller => {
                loader.load_category(declarations, &mut storyboard.controllers, &mut diagnostics)
            }
            Category::NoteController => loader.load_category(
                declarations,
                &mut storyboard.note_controllers,
                &mut diagnostics,
            ),
        }
    }

    let mut triggers = Vec::new();
    match root.get("triggers") {
        None | Some(Value::Null) => {}
        Some(Value::Array(items)) => {
            for (index, item) in items.iter().enumerate() {
                match load_trigger(item) {
                    Ok(trigger) => triggers.push(trigger),
                    Err(e) => {
                        let e = e.with_index(index);
                        tracing::warn!(code = e.code, index, "storyboard: {}", e.message);
                        diagnostics.push(e);
                    }
                }
            }
        }
        Some(_) => {
            let e = StoryboardError::new("E5002", "`triggers` must be an array");
            tracing::warn!(code = e.code, "storyboard: {}", e.message);
            diagnostics.push(e);
        }
    }
    storyboard.triggers = TriggerEngine::new(triggers);
    storyboard.templates = templates;
    storyboard.diagnostics = diagnostics;
    Ok(storyboard)
}

/// Compiled path: six flat arrays of resolved objects, loaded as they are.
fn load_compiled(root: &Value) -> Result<Storyboard, StoryboardError> {
    let mut storyboard = Storyboard::default();
    let mut diagnostics = Vec::new();
    for category in Category::ALL {
        match category {
            Category::Text => load_compiled_table(root, &mut storyboard.texts, &mut diagnostics)?,
            Category::Sprite => {
                load_compiled_table(root, &mut storyboard.sprites, &mut diagnostics)?
            }
            Category::Video => load_compiled_table(root, &mut storyboard.videos, &mut diagnostics)?,
            Category::Line => load_compiled_table(root, &mut storyboard.lines, &mut diagnostics)?,
            Category::Controller => {
                load_compiled_table(root, &mut storyboard.controllers, &mut diagnostics)?
            }
            Category::NoteController => {
                load_compiled_table(root, &mut storyboard.note_controllers, &mut diagnostics)?
            }
        }
    }
    storyboard.diagnostics = diagnostics;
    Ok(storyboard)
}

fn load_compiled_table<S: ObjectState>(
    root: &Value,
    table: &mut ObjectTable<S>,
    diagnostics: &mut Vec<StoryboardError>,
) -> Result<(), StoryboardError> {
    let category = S::CATEGORY;
    let Some(Value::Array(items)) = root.get(category.key()) else {
        return Err(StoryboardError::new(
            "E1101",
            format!("compiled storyboard is missing the `{category}` array"),
        )
        .with_category(category));
    };

    for (index, item) in items.iter().enumerate() {
        let object: StageObject<S> = serde_json::from_value(item.clone()).map_err(|e| {
            StoryboardError::new("E1102", format!("invalid compiled object: {e}"))
                .with_category(category)
                .with_index(index)
        })?;
        if table.contains_key(&object.id) {
            let e = StoryboardError::new("E4101", format!("redefinition of `{}`", object.id))
                .with_category(category)
                .with_index(index)
                .with_object_id(object.id.clone());
            tracing::warn!(code = e.code, index, "storyboard: {}", e.message);
            diagnostics.push(e);
            continue;
        }
        table.insert(object.id.clone(), object);
    }
    Ok(())
}

impl Storyboard {
    /// Per-declaration problems collected while loading, in document order.
    pub fn diagnostics(&self) -> &[StoryboardError] {
        &self.diagnostics
    }

    pub fn object_count(&self) -> usize {
        self.texts.len()
            + self.sprites.len()
            + self.videos.len()
            + self.lines.len()
            + self.controllers.len()
            + self.note_controllers.len()
    }

    /// Flattens every object table into the compiled form.
    pub fn compile(&self) -> CompiledStoryboard {
        CompiledStoryboard {
            compiled: true,
            texts: self.texts.values().cloned().collect(),
            sprites: self.sprites.values().cloned().collect(),
            videos: self.videos.values().cloned().collect(),
            lines: self.lines.values().cloned().collect(),
            controllers: self.controllers.values().cloned().collect(),
            note_controllers: self.note_controllers.values().cloned().collect(),
        }
    }

    /// The compiled form as JSON, with null-valued fields omitted.
    pub fn compile_to_value(&self) -> Result<Value, StoryboardError> {
        let mut value = serde_json::to_value(self.compile()).map_err(|e| {
            StoryboardError::new("E1001", format!("failed to serialize storyboard: {e}"))
        })?;
        strip_nulls(&mut value);
        Ok(value)
    }

    pub fn write_compiled(&self, path: impl AsRef<Path>) -> Result<(), StoryboardError> {
        let path = path.as_ref();
        let value = self.compile_to_value()?;
        let json = serde_json::to_string_pretty(&value).map_err(|e| {
            StoryboardError::new("E1001", format!("failed to serialize storyboard: {e}"))
        })?;
        fs::write(path, json).map_err(|e| {
            StoryboardError::new("E2002", format!("failed to write compiled storyboard: {e}"))
                .with_file(path.display().to_string())
        })
    }

    /// Releases every object table, the triggers and the templates.
    pub fn dispose(&mut self) {
        self.texts.clear();
        self.sprites.clear();
        self.videos.clear();
        self.lines.clear();
        self.controllers.clear();
        self.note_controllers.clear();
        self.triggers.clear();
        self.templates.clear();
    }
}

fn strip_nulls(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|_, v| !v.is_null());
            map.values_mut().for_each(strip_nulls);
        }
        Value::Array(items) => items.iter_mut().for_each(strip_nulls),
        _ => {}
    }
}

#[cfg(test)]
mod tests;
