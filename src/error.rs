//! Error types for stargraph.

use std::fmt;

use thiserror::Error;

use crate::graph::SystemId;

/// What kind of record a failed lookup was looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKind {
    System,
    ResourceType,
}

impl fmt::Display for LookupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupKind::System => write!(f, "system"),
            LookupKind::ResourceType => write!(f, "resource type"),
        }
    }
}

/// Structural problems in the records handed to the graph builder.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphBuildError {
    #[error("stargate {from} -> {to} references unknown system {to}")]
    DanglingGate { from: SystemId, to: SystemId },

    #[error("system id {0} appears more than once")]
    DuplicateSystem(SystemId),

    #[error("system name '{0}' is used by more than one system")]
    DuplicateName(String),
}

#[derive(Debug, Error)]
pub enum StarGraphError {
    #[error("graph build failed: {0}")]
    GraphBuild(#[from] GraphBuildError),

    #[error("{kind} not found: {name}")]
    NotFound { kind: LookupKind, name: String },

    #[error("inconsistent search cache at system {system}: {detail}")]
    InconsistentCache { system: SystemId, detail: String },

    #[error("no route from {from} to {to} within the requested security bounds")]
    NoRoute { from: String, to: String },

    #[error("store error: {0}")]
    Store(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StarGraphError {
    pub fn system_not_found(name: impl Into<String>) -> Self {
        StarGraphError::NotFound {
            kind: LookupKind::System,
            name: name.into(),
        }
    }

    pub fn resource_not_found(name: impl Into<String>) -> Self {
        StarGraphError::NotFound {
            kind: LookupKind::ResourceType,
            name: name.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StarGraphError>;
