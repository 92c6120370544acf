use crate::route::{HandlerKey, RouteDescriptor};
use crate::schema::SectionSlot;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid name `{raw}`: {reason}")]
    InvalidName { raw: String, reason: String },

    #[error("{slot} section expects {expected} actions, found {found}")]
    Arity {
        slot: SectionSlot,
        expected: usize,
        found: usize,
    },

    #[error("missing {0} section")]
    MissingSection(SectionSlot),

    #[error("{0} section declared more than once")]
    DuplicateSection(SectionSlot),

    #[error("{0} section requires a resourceName")]
    MissingResourceName(SectionSlot),

    #[error("{slot} section declares action `{action}` more than once")]
    DuplicateAction { slot: SectionSlot, action: String },

    #[error("{slot} section, action `{action}`: {detail}")]
    Convention {
        slot: SectionSlot,
        action: String,
        detail: String,
    },

    #[error("route collision on {} {}: `{}` and `{}`", .first.method, .first.path, .first.handler_key, .second.handler_key)]
    RouteCollision {
        first: Box<RouteDescriptor>,
        second: Box<RouteDescriptor>,
    },

    #[error("module `{module_id}` has {} unbound handler(s): {}", .keys.len(), join_keys(.keys))]
    UnboundHandler {
        module_id: String,
        keys: Vec<HandlerKey>,
    },

    #[error("{slot} section: {source}")]
    Section {
        slot: SectionSlot,
        #[source]
        source: Box<Error>,
    },

    #[error("module `{module_id}`: {source}")]
    Compile {
        module_id: String,
        #[source]
        source: Box<Error>,
    },

    #[error("two emitted modules share the mount `{0}`")]
    DuplicateMount(String),

    #[error("invalid handler key `{key}`: {reason}")]
    InvalidHandlerKey { key: String, reason: String },

    #[error("compile task failed: {0}")]
    Task(String),

    #[error("unsupported definition format: {0}")]
    UnsupportedFormat(String),

    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SerdeJson Error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("Toml Error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Wraps `self` with the id of the module being compiled. Errors that
    /// already carry module context are returned unchanged.
    pub fn in_module(self, module_id: impl Into<String>) -> Self {
        match self {
            Error::Compile { .. } | Error::UnboundHandler { .. } => self,
            other => Error::Compile {
                module_id: module_id.into(),
                source: Box::new(other),
            },
        }
    }

    /// Wraps a name error with the slot of the section it was found in.
    /// Errors that already name their slot are returned unchanged.
    pub(crate) fn in_section(self, slot: SectionSlot) -> Self {
        match self {
            Error::InvalidName { .. } => Error::Section {
                slot,
                source: Box::new(self),
            },
            other => other,
        }
    }

    /// The innermost error, looking through `Compile` and `Section` wrappers.
    pub fn root(&self) -> &Error {
        match self {
            Error::Compile { source, .. } | Error::Section { source, .. } => source.root(),
            other => other,
        }
    }

    pub(crate) fn convention(
        slot: SectionSlot,
        action: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Error::Convention {
            slot,
            action: action.into(),
            detail: detail.into(),
        }
    }
}

fn join_keys(keys: &[HandlerKey]) -> String {
    keys.iter()
        .map(|k| k.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
