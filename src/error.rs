use thiserror::Error;

/// Errors raised by a layout recomputation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("no data: at least one person is required to compute a tree")]
    NoData,
    #[error("ancestry node for {person} is not connected to the focal person")]
    DetachedAncestry { person: String },
    #[error("siblings of {focal} requested but the focal person has no parent nodes")]
    SiblingsWithoutParents { focal: String },
    #[error("traversal from {root} exceeded {limit} nodes")]
    TraversalLimit { root: String, limit: usize },
    #[error("person {id} not found")]
    UnknownPerson { id: String },
}

/// Errors raised while normalizing raw person records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("invalid family data: {0}")]
    Parse(String),
    #[error("family data must be a list of person records")]
    NotAList,
    #[error("record {index} is not an object")]
    NotAnObject { index: usize },
    #[error("record {index} has no id")]
    MissingId { index: usize },
    #[error("parent {parent} of {person} not found")]
    UnknownParent { person: String, parent: String },
}

/// Errors raised by string-keyed parameter updates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("unknown layout parameter `{0}`")]
    UnknownParameter(String),
    #[error("invalid value for `{key}`: expected {expected}")]
    InvalidValue { key: String, expected: &'static str },
}
