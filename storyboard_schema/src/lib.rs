use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{collections::HashMap, fmt::Debug, str::FromStr};

mod states;

pub use states::{
    ControllerState, LinePosition, LineState, NoteControllerState, SpriteState, StageFields,
    StateBase, TextState, VideoState,
};

pub type Seconds = f64;
pub type NoteId = i32;

/// Resolved time of a state that is never displayed. Sorts after every real time.
pub const NEVER: Seconds = f64::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoteType {
    Click = 0,
    Hold = 1,
    LongHold = 2,
    DragHead = 3,
    DragChild = 4,
    Flick = 5,
    CDragHead = 6,
    CDragChild = 7,
}

impl NoteType {
    pub const ALL: [NoteType; 8] = [
        NoteType::Click,
        NoteType::Hold,
        NoteType::LongHold,
        NoteType::DragHead,
        NoteType::DragChild,
        NoteType::Flick,
        NoteType::CDragHead,
        NoteType::CDragChild,
    ];

    pub fn code(self) -> i32 {
        self as i32
    }
}

/// One note of the chart, as far as the storyboard needs to know it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartNote {
    pub id: NoteId,
    #[serde(rename = "type")]
    pub note_type: i32,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub direction: i32,
    pub intro_time: Seconds,
    pub start_time: Seconds,
    pub end_time: Seconds,
}

/// On-disk shape of a chart as the storyboard reads it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChartFile {
    pub note_list: Vec<ChartNote>,
}

/// Note list ordered by id, with an id lookup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "ChartFile", into = "ChartFile")]
pub struct Chart {
    notes: Vec<ChartNote>,
    note_map: HashMap<NoteId, usize>,
}

impl Chart {
    pub fn new(mut notes: Vec<ChartNote>) -> Self {
        notes.sort_by_key(|n| n.id);
        let note_map = notes.iter().enumerate().map(|(i, n)| (n.id, i)).collect();
        Self { notes, note_map }
    }

    pub fn notes(&self) -> &[ChartNote] {
        &self.notes
    }

    pub fn note(&self, id: NoteId) -> Option<&ChartNote> {
        self.note_map.get(&id).map(|&i| &self.notes[i])
    }
}

impl From<ChartFile> for Chart {
    fn from(file: ChartFile) -> Self {
        Chart::new(file.note_list)
    }
}

impl From<Chart> for ChartFile {
    fn from(chart: Chart) -> Self {
        ChartFile {
            note_list: chart.notes,
        }
    }
}

/// The six object categories of a storyboard document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Text,
    Sprite,
    Video,
    Line,
    Controller,
    NoteController,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Text,
        Category::Sprite,
        Category::Video,
        Category::Line,
        Category::Controller,
        Category::NoteController,
    ];

    /// Name of the document array holding this category.
    pub fn key(self) -> &'static str {
        match self {
            Category::Text => "texts",
            Category::Sprite => "sprites",
            Category::Video => "videos",
            Category::Line => "lines",
            Category::Controller => "controllers",
            Category::NoteController => "note_controllers",
        }
    }

    /// Time given to a root declaration that has none.
    pub fn default_time(self) -> Option<Seconds> {
        match self {
            Category::Controller | Category::NoteController => Some(0.0),
            _ => None,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Typed state of one category. Each category owns its field schema on top of [`StateBase`].
pub trait ObjectState: Debug + Clone + Default + PartialEq + Serialize + DeserializeOwned {
    const CATEGORY: Category;

    fn base(&self) -> &StateBase;
    fn base_mut(&mut self) -> &mut StateBase;

    /// Replaces every attribute `patch` sets. Timing fields of the base are not touched.
    fn overlay(&mut self, patch: Self);
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageObject<S> {
    pub id: String,
    #[serde(default)]
    pub target_id: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub states: Vec<S>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    #[default]
    None,
    NoteClear,
    Combo,
    Score,
}

impl FromStr for TriggerType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(TriggerType::None),
            "noteclear" => Ok(TriggerType::NoteClear),
            "combo" => Ok(TriggerType::Combo),
            "score" => Ok(TriggerType::Score),
            other => Err(format!("unknown trigger type: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Trigger {
    #[serde(rename = "type")]
    pub trigger_type: TriggerType,
    /// Activation budget; `None` means unlimited.
    pub uses: Option<u32>,
    pub current_uses: u32,
    pub notes: Vec<NoteId>,
    pub spawn: Vec<String>,
    pub destroy: Vec<String>,
    pub combo: i32,
    pub score: i64,
    /// Note that caused the most recent activation.
    #[serde(skip)]
    pub triggerer: Option<ChartNote>,
}

/// Flat, fully resolved form of a storyboard. Reloading it skips templates, times and triggers.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CompiledStoryboard {
    pub compiled: bool,
    pub texts: Vec<StageObject<TextState>>,
    pub sprites: Vec<StageObject<SpriteState>>,
    pub videos: Vec<StageObject<VideoState>>,
    pub lines: Vec<StageObject<LineState>>,
    pub controllers: Vec<StageObject<ControllerState>>,
    pub note_controllers: Vec<StageObject<NoteControllerState>>,
}
