use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::ir::Person;

/// Caller-supplied ordering for children and siblings.
pub type ChildOrder = Arc<dyn Fn(&Person, &Person) -> Ordering + Send + Sync>;

/// Layout hints that are not plain parameters: an optional child comparator
/// and per-person spouse ids hidden from spouse placement.
#[derive(Clone, Default)]
pub struct LayoutHints {
    pub child_order: Option<ChildOrder>,
    pub suppressed_spouses: HashMap<String, HashSet<String>>,
}

impl LayoutHints {
    pub fn with_child_order<F>(mut self, order: F) -> Self
    where
        F: Fn(&Person, &Person) -> Ordering + Send + Sync + 'static,
    {
        self.child_order = Some(Arc::new(order));
        self
    }

    pub fn suppress_spouse(&mut self, person: impl Into<String>, spouse: impl Into<String>) {
        self.suppressed_spouses
            .entry(person.into())
            .or_default()
            .insert(spouse.into());
    }

    pub fn is_suppressed(&self, person: &str, spouse: &str) -> bool {
        self.suppressed_spouses
            .get(person)
            .is_some_and(|hidden| hidden.contains(spouse))
    }
}

impl fmt::Debug for LayoutHints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayoutHints")
            .field("child_order", &self.child_order.as_ref().map(|_| "<fn>"))
            .field("suppressed_spouses", &self.suppressed_spouses)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    Focal,
    Progeny,
    Ancestry,
    Spouse,
    Sibling,
}

/// One appearance of a person in the laid out tree.
///
/// A person reachable through several branches gets several nodes; they
/// share `person` but differ in `appearance_id`. All node references are
/// appearance ids.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutNode {
    pub appearance_id: String,
    pub person: Person,
    pub x: f32,
    pub y: f32,
    /// Signed generation. The focal node is the only `focal`/`progeny` node
    /// at 0; spouses and siblings beside it also report 0 under their own
    /// roles.
    pub depth: i32,
    pub is_ancestry: bool,
    pub role: NodeRole,
    pub parent_node: Option<String>,
    pub child_nodes: Vec<String>,
    pub parent_nodes: Vec<String>,
    pub spouse_nodes: Vec<String>,
    pub spouse_of: Option<String>,
    pub coparent: Option<String>,
    pub spouse_anchor: Option<(f32, f32)>,
    pub progeny_anchor: Option<(f32, f32)>,
    pub duplicate_count: usize,
    pub all_rels_displayed: bool,
}

impl LayoutNode {
    pub fn person_id(&self) -> &str {
        &self.person.id
    }

    pub fn position(&self) -> (f32, f32) {
        (self.x, self.y)
    }

    pub fn is_duplicate(&self) -> bool {
        self.duplicate_count > 1
    }

    /// Whether a "more relatives" marker should be shown for this node.
    pub fn has_hidden_relatives(&self) -> bool {
        !self.all_rels_displayed && !self.person.is_placeholder()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dimensions {
    pub width: f32,
    pub height: f32,
    pub x_offset: f32,
    pub y_offset: f32,
    pub min_x: f32,
    pub max_x: f32,
    pub min_y: f32,
    pub max_y: f32,
    pub center_x: f32,
    pub center_y: f32,
    pub padding_x: f32,
    pub padding_y: f32,
}

/// Result of one layout pass.
#[derive(Debug, Clone)]
pub struct Tree {
    pub nodes: Vec<LayoutNode>,
    pub dimensions: Dimensions,
    pub focal_appearance_id: String,
    pub is_horizontal: bool,
    /// Persons the pass worked on, including synthesized placeholders.
    pub persons: Vec<Person>,
    index: HashMap<String, usize>,
}

impl Tree {
    pub fn new(
        nodes: Vec<LayoutNode>,
        dimensions: Dimensions,
        focal_appearance_id: String,
        is_horizontal: bool,
        persons: Vec<Person>,
    ) -> Self {
        let index = nodes
            .iter()
            .enumerate()
            .map(|(idx, node)| (node.appearance_id.clone(), idx))
            .collect();
        Self {
            nodes,
            dimensions,
            focal_appearance_id,
            is_horizontal,
            persons,
            index,
        }
    }

    pub fn node(&self, appearance_id: &str) -> Option<&LayoutNode> {
        self.index.get(appearance_id).map(|&idx| &self.nodes[idx])
    }

    pub fn focal(&self) -> Option<&LayoutNode> {
        self.node(&self.focal_appearance_id)
    }

    pub fn appearances<'a>(&'a self, person_id: &'a str) -> impl Iterator<Item = &'a LayoutNode> + 'a {
        self.nodes
            .iter()
            .filter(move |node| node.person.id == person_id)
    }

    /// Looks up by appearance id, then by the first appearance of a person id.
    pub fn find(&self, id: &str) -> Option<&LayoutNode> {
        self.node(id)
            .or_else(|| self.nodes.iter().find(|node| node.person.id == id))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LinkKind {
    #[serde(rename = "parent-child")]
    ParentChild,
    #[serde(rename = "spouse")]
    Spouse,
    #[serde(rename = "ancestry-link")]
    Ancestry,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    pub id: String,
    pub kind: LinkKind,
    pub sources: Vec<String>,
    pub targets: Vec<String>,
    pub source_point: (f32, f32),
    pub target_point: (f32, f32),
    pub points: Vec<(f32, f32)>,
    pub path: String,
    pub is_curved: bool,
    /// Generation of the far end relative to the focal person.
    pub depth: i32,
    /// Lateral fan displacement applied to interior points.
    pub fan_offset: f32,
}
