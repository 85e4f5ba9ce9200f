use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

const DEFAULT_NODE_SEPARATION: f32 = 250.0;
const DEFAULT_LEVEL_SEPARATION: f32 = 150.0;
/// Spacing below this is clamped; a zero spacing collapses every node onto its parent.
const MIN_SEPARATION: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStyle {
    /// Right-angle polyline.
    Elbow,
    /// Monotone cubic curve between the endpoints.
    Smooth,
    /// Elbow polyline with rounded corners.
    #[default]
    Legacy,
}

impl LinkStyle {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "elbow" | "straight" => Some(Self::Elbow),
            "smooth" => Some(Self::Smooth),
            "legacy" | "rounded" => Some(Self::Legacy),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutConfig {
    pub node_separation: f32,
    pub level_separation: f32,
    pub is_horizontal: bool,
    pub ancestry_depth_limit: Option<usize>,
    pub progeny_depth_limit: Option<usize>,
    pub include_siblings_of_focal: bool,
    pub single_parent_placeholder_enabled: bool,
    /// Show only the focal person's direct relatives.
    pub one_level_rels: bool,
    pub link_style: LinkStyle,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_separation: DEFAULT_NODE_SEPARATION,
            level_separation: DEFAULT_LEVEL_SEPARATION,
            is_horizontal: false,
            ancestry_depth_limit: None,
            progeny_depth_limit: None,
            include_siblings_of_focal: false,
            single_parent_placeholder_enabled: true,
            one_level_rels: false,
            link_style: LinkStyle::default(),
        }
    }
}

impl LayoutConfig {
    pub fn node_separation(&self) -> f32 {
        sanitize_separation(self.node_separation, DEFAULT_NODE_SEPARATION)
    }

    pub fn level_separation(&self) -> f32 {
        sanitize_separation(self.level_separation, DEFAULT_LEVEL_SEPARATION)
    }

    /// Applies a single parameter change. Returns whether the value changed.
    pub fn apply(&mut self, parameter: LayoutParameter) -> bool {
        let before = self.clone();
        match parameter {
            LayoutParameter::NodeSeparation(value) => self.node_separation = value,
            LayoutParameter::LevelSeparation(value) => self.level_separation = value,
            LayoutParameter::IsHorizontal(value) => self.is_horizontal = value,
            LayoutParameter::AncestryDepthLimit(value) => self.ancestry_depth_limit = value,
            LayoutParameter::ProgenyDepthLimit(value) => self.progeny_depth_limit = value,
            LayoutParameter::IncludeSiblingsOfFocal(value) => {
                self.include_siblings_of_focal = value
            }
            LayoutParameter::SingleParentPlaceholderEnabled(value) => {
                self.single_parent_placeholder_enabled = value
            }
            LayoutParameter::OneLevelRels(value) => self.one_level_rels = value,
            LayoutParameter::LinkStyle(value) => self.link_style = value,
        }
        *self != before
    }
}

fn sanitize_separation(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value.max(MIN_SEPARATION)
    } else {
        fallback
    }
}

/// One typed layout parameter update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LayoutParameter {
    NodeSeparation(f32),
    LevelSeparation(f32),
    IsHorizontal(bool),
    AncestryDepthLimit(Option<usize>),
    ProgenyDepthLimit(Option<usize>),
    IncludeSiblingsOfFocal(bool),
    SingleParentPlaceholderEnabled(bool),
    OneLevelRels(bool),
    LinkStyle(LinkStyle),
}

impl LayoutParameter {
    /// Builds a parameter from its camelCase key and a JSON value.
    ///
    /// Depth limits accept `null` (unlimited) or a non-negative integer.
    pub fn from_key_value(key: &str, value: &Value) -> Result<Self, ConfigError> {
        let invalid = |expected: &'static str| ConfigError::InvalidValue {
            key: key.to_string(),
            expected,
        };
        let number = || value.as_f64().map(|v| v as f32).ok_or_else(|| invalid("a number"));
        let boolean = || value.as_bool().ok_or_else(|| invalid("a boolean"));
        let depth = || match value {
            Value::Null => Ok(None),
            other => other
                .as_u64()
                .map(|v| Some(v as usize))
                .ok_or_else(|| invalid("a non-negative integer or null")),
        };
        match key {
            "nodeSeparation" => number().map(Self::NodeSeparation),
            "levelSeparation" => number().map(Self::LevelSeparation),
            "isHorizontal" => boolean().map(Self::IsHorizontal),
            "ancestryDepthLimit" | "ancestryDepth" => depth().map(Self::AncestryDepthLimit),
            "progenyDepthLimit" | "progenyDepth" => depth().map(Self::ProgenyDepthLimit),
            "includeSiblingsOfFocal" | "showSiblingsOfMain" => {
                boolean().map(Self::IncludeSiblingsOfFocal)
            }
            "singleParentPlaceholderEnabled" | "singleParentEmptyCard" => {
                boolean().map(Self::SingleParentPlaceholderEnabled)
            }
            "oneLevelRels" => boolean().map(Self::OneLevelRels),
            "linkStyle" => value
                .as_str()
                .and_then(LinkStyle::from_token)
                .map(Self::LinkStyle)
                .ok_or_else(|| invalid("one of elbow, smooth, legacy")),
            other => Err(ConfigError::UnknownParameter(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub layout: LayoutConfig,
    pub focal_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LayoutConfigFile {
    node_separation: Option<f32>,
    level_separation: Option<f32>,
    is_horizontal: Option<bool>,
    ancestry_depth_limit: Option<usize>,
    progeny_depth_limit: Option<usize>,
    include_siblings_of_focal: Option<bool>,
    single_parent_placeholder_enabled: Option<bool>,
    one_level_rels: Option<bool>,
    link_style: Option<LinkStyle>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    focal_id: Option<String>,
    layout: Option<LayoutConfigFile>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let Some(path) = path else {
        return Ok(config);
    };

    let contents = std::fs::read_to_string(path)?;
    let parsed: ConfigFile = serde_json::from_str(&contents)?;

    if let Some(focal_id) = parsed.focal_id {
        config.focal_id = Some(focal_id);
    }

    if let Some(layout) = parsed.layout {
        let target = &mut config.layout;
        if let Some(v) = layout.node_separation {
            target.node_separation = v;
        }
        if let Some(v) = layout.level_separation {
            target.level_separation = v;
        }
        if let Some(v) = layout.is_horizontal {
            target.is_horizontal = v;
        }
        if let Some(v) = layout.ancestry_depth_limit {
            target.ancestry_depth_limit = Some(v);
        }
        if let Some(v) = layout.progeny_depth_limit {
            target.progeny_depth_limit = Some(v);
        }
        if let Some(v) = layout.include_siblings_of_focal {
            target.include_siblings_of_focal = v;
        }
        if let Some(v) = layout.single_parent_placeholder_enabled {
            target.single_parent_placeholder_enabled = v;
        }
        if let Some(v) = layout.one_level_rels {
            target.one_level_rels = v;
        }
        if let Some(v) = layout.link_style {
            target.link_style = v;
        }
    }

    Ok(config)
}
