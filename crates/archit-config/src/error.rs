//! Configuration errors.

use thiserror::Error;

/// Record category a decode error was raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Architecture,
    Site,
    Network,
    Services,
    Service,
    Pipeline,
    Repository,
    Stage,
    Database,
    Application,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Category::Architecture => "Architecture",
            Category::Site => "Site",
            Category::Network => "Network",
            Category::Services => "Services",
            Category::Service => "Service",
            Category::Pipeline => "Pipeline",
            Category::Repository => "Repository",
            Category::Stage => "Stage",
            Category::Database => "Database",
            Category::Application => "Application",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeReason {
    /// Required field is absent (or null).
    Missing,
    /// Discriminator does not name a variant of the category.
    UnknownKind(String),
    /// Field has the wrong primitive shape.
    WrongType {
        expected: &'static str,
        found: &'static str,
    },
    /// Field has the right shape but an unacceptable value.
    Invalid(String),
}

impl std::fmt::Display for DecodeReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeReason::Missing => write!(f, "missing required field"),
            DecodeReason::UnknownKind(kind) => write!(f, "unsupported kind '{}'", kind),
            DecodeReason::WrongType { expected, found } => {
                write!(f, "expected {}, found {}", expected, found)
            }
            DecodeReason::Invalid(message) => write!(f, "{}", message),
        }
    }
}

/// Malformed or incomplete configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{category} error at '{}': {reason}", location(.path, .field))]
pub struct DecodeError {
    pub category: Category,
    pub field: String,
    pub reason: DecodeReason,
    /// Enclosing sections, outermost first.
    pub path: Vec<String>,
}

fn location(path: &[String], field: &str) -> String {
    let mut parts: Vec<&str> = path.iter().map(String::as_str).collect();
    if !field.is_empty() {
        parts.push(field);
    }
    parts.join(".")
}

impl DecodeError {
    pub fn new(category: Category, field: impl Into<String>, reason: DecodeReason) -> Self {
        Self {
            category,
            field: field.into(),
            reason,
            path: Vec::new(),
        }
    }

    pub fn missing(category: Category, field: impl Into<String>) -> Self {
        Self::new(category, field, DecodeReason::Missing)
    }

    pub fn invalid(
        category: Category,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(category, field, DecodeReason::Invalid(message.into()))
    }

    /// Record the enclosing section the error was raised under.
    pub fn at(mut self, segment: impl Into<String>) -> Self {
        self.path.insert(0, segment.into());
        self
    }

    /// Dotted path to the offending field, e.g. `services.0.app.pipeline.repo.owner`.
    pub fn location(&self) -> String {
        location(&self.path, &self.field)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("document parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("unresolved variables: {}", .0.join(", "))]
    UnresolvedVariables(Vec<String>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type DecodeResult<T> = std::result::Result<T, DecodeError>;
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
