use std::{fs, path::Path};

use anyhow::Context;
use storyboard_compiler::{GameSnapshot, Storyboard, TriggerHandler};
use storyboard_schema::{Chart, Trigger};

pub fn load_chart_json_from_path(path: impl AsRef<Path>) -> anyhow::Result<Chart> {
    let path = path.as_ref();
    let bytes = fs::read(path).with_context(|| format!("failed to read chart: {}", path.display()))?;
    let chart: Chart = serde_json::from_slice(&bytes)
        .with_context(|| format!("failed to parse chart json: {}", path.display()))?;
    Ok(chart)
}

pub fn load_chart_json_from_str(json: &str) -> anyhow::Result<Chart> {
    let chart: Chart = serde_json::from_str(json).context("failed to parse chart json")?;
    Ok(chart)
}

pub fn load_storyboard_from_path(path: impl AsRef<Path>, chart: &Chart) -> anyhow::Result<Storyboard> {
    let path = path.as_ref();
    let storyboard = storyboard_compiler::parse_file(path, chart)
        .map_err(|e| anyhow::anyhow!(e.to_string()))
        .with_context(|| format!("failed to load storyboard: {}", path.display()))?;
    Ok(storyboard)
}

/// What the host's presentation layer must provide.
pub trait StoryboardRenderer {
    /// One-time setup (resource loads etc.). Completes before any event is routed.
    fn initialize(&mut self, storyboard: &Storyboard) -> anyhow::Result<()>;

    /// Spawns / destroys the objects a fired trigger references.
    fn on_trigger(&mut self, trigger: &Trigger);
}

struct RendererHandler<'r, R>(&'r mut R);

impl<R: StoryboardRenderer> TriggerHandler for RendererHandler<'_, R> {
    fn on_trigger(&mut self, trigger: &Trigger) {
        self.0.on_trigger(trigger);
    }
}

/// A storyboard bound to a chart and an initialized renderer.
///
/// Everything runs on the caller's thread; note-clear events must be delivered
/// from the same thread that started the session.
pub struct Session<R> {
    storyboard: Storyboard,
    chart: Chart,
    renderer: R,
}

impl<R: StoryboardRenderer> Session<R> {
    pub fn start(storyboard: Storyboard, chart: Chart, mut renderer: R) -> anyhow::Result<Self> {
        renderer
            .initialize(&storyboard)
            .context("storyboard renderer failed to initialize")?;
        tracing::debug!(
            objects = storyboard.object_count(),
            triggers = storyboard.triggers.len(),
            "storyboard session started"
        );
        Ok(Self {
            storyboard,
            chart,
            renderer,
        })
    }

    pub fn storyboard(&self) -> &Storyboard {
        &self.storyboard
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Routes one note-clear event to the trigger engine. Returns how many triggers fired.
    pub fn on_note_clear(&mut self, note_id: i32, game: GameSnapshot) -> anyhow::Result<usize> {
        let note = self
            .chart
            .note(note_id)
            .with_context(|| format!("cleared note {note_id} is not in the chart"))?;
        let mut handler = RendererHandler(&mut self.renderer);
        Ok(self.storyboard.triggers.on_note_clear(note, game, &mut handler))
    }

    /// Drops every object, trigger and template; hands the renderer back.
    pub fn dispose(mut self) -> R {
        self.storyboard.dispose();
        self.renderer
    }
}
