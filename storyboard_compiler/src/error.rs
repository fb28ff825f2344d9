use storyboard_schema::Category;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoryboardErrorKind {
    Parse,
    Structure,
    IO,
    Reference,
    Identity,
    Validation,
    Trigger,
}

impl StoryboardErrorKind {
    pub(crate) fn from_code(code: &'static str) -> Self {
        match code {
            "E1001" | "E1002" | "E1003" => Self::Parse,

            // Compiled documents only
            "E1101" | "E1102" => Self::Structure,

            "E2001" | "E2002" => Self::IO,

            "E3001" | "E3002" | "E3003" | "E3004" => Self::Reference,

            "E4001" | "E4002" => Self::Identity,

            "E4101" | "E4102" => Self::Validation,

            "E5001" | "E5002" => Self::Trigger,

            _ => Self::Parse,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
#[error("{code}: {message}")]
pub struct StoryboardError {
    pub code: &'static str,
    pub kind: StoryboardErrorKind,
    pub message: String,

    pub file: Option<String>,
    pub category: Option<Category>,
    pub object_id: Option<String>,
    /// Position of the declaration inside its document array.
    pub index: Option<usize>,
    pub context: Option<String>,
}

impl StoryboardError {
    pub(crate) fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            kind: StoryboardErrorKind::from_code(code),
            message: message.into(),

            file: None,
            category: None,
            object_id: None,
            index: None,
            context: None,
        }
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_object_id(mut self, object_id: impl Into<String>) -> Self {
        self.object_id = Some(object_id.into());
        self
    }

    pub fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

pub type StoryboardResult<T> = Result<T, StoryboardError>;
