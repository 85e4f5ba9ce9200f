use std::collections::VecDeque;
use std::fmt;

use serde_json::Value;
use tracing::{debug, info};

use crate::config::{LayoutConfig, LayoutParameter};
use crate::error::{ConfigError, LayoutError, NormalizeError};
use crate::ir::{Family, Person};
use crate::layout::{LayoutHints, LayoutNode, Link, Tree, create_links, position_tree};
use crate::parser::{format_for_export, has_legacy_parent_fields, normalize_records};

/// How many focal ids are remembered for `last_available_focal`.
const FOCAL_HISTORY_LEN: usize = 10;

/// Notifications sent to store listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    FocalChanged { from: Option<String>, to: String },
    TreeUpdated { focal_appearance_id: String, nodes: usize },
}

type Listener = Box<dyn FnMut(&StoreEvent)>;

/// Owns the canonical person list, the layout parameters and the last
/// computed tree.
///
/// Mutations never recompute on their own. Any change to data, focal person,
/// parameters or hints drops the cached layout; call [`Store::recompute`]
/// after a batch of changes.
#[derive(Default)]
pub struct Store {
    family: Family,
    focal_id: Option<String>,
    history: VecDeque<String>,
    config: LayoutConfig,
    hints: LayoutHints,
    legacy_format: Option<bool>,
    tree: Option<Tree>,
    links: Vec<Link>,
    listeners: Vec<Listener>,
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("persons", &self.family.len())
            .field("focal_id", &self.focal_id)
            .field("history", &self.history)
            .field("config", &self.config)
            .field("legacy_format", &self.legacy_format)
            .field("tree", &self.tree.as_ref().map(Tree::len))
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Store {
    pub fn new(config: LayoutConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn on_event<F>(&mut self, listener: F)
    where
        F: FnMut(&StoreEvent) + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    fn emit(&mut self, event: StoreEvent) {
        for listener in &mut self.listeners {
            listener(&event);
        }
    }

    /// Replaces the person list. Falls back to the first person when the
    /// current focal id no longer resolves.
    pub fn set_data(&mut self, persons: Vec<Person>) {
        self.family = Family::new(persons);
        self.invalidate();

        let focal_present = self
            .focal_id
            .as_deref()
            .is_some_and(|id| self.family.contains(id));
        if !focal_present {
            if let Some(first) = self.family.persons().first().map(|p| p.id.clone()) {
                debug!(focal = %first, "focal person missing after data update, using first person");
                self.change_focal(first);
            }
        }
    }

    /// Normalizes raw records and replaces the person list. The legacy format
    /// flag is detected from the first batch of records.
    pub fn set_records(&mut self, records: &[Value]) -> Result<(), NormalizeError> {
        let persons = normalize_records(records)?;
        if self.legacy_format.is_none() {
            self.legacy_format = Some(has_legacy_parent_fields(records));
        }
        self.set_data(persons);
        Ok(())
    }

    pub fn set_focal(&mut self, id: impl Into<String>) {
        let id = id.into();
        if self.focal_id.as_deref() != Some(id.as_str()) {
            self.change_focal(id);
        }
    }

    fn change_focal(&mut self, id: String) {
        self.invalidate();
        let from = self.focal_id.replace(id.clone());
        self.history.retain(|seen| seen != &id);
        self.history.push_back(id.clone());
        while self.history.len() > FOCAL_HISTORY_LEN {
            self.history.pop_front();
        }
        self.emit(StoreEvent::FocalChanged { from, to: id });
    }

    /// Applies a typed parameter. Returns whether anything changed.
    pub fn set_parameter(&mut self, parameter: LayoutParameter) -> bool {
        let changed = self.config.apply(parameter);
        if changed {
            self.invalidate();
        }
        changed
    }

    /// Applies a parameter given by its camelCase key and a JSON value.
    pub fn set_parameter_value(&mut self, key: &str, value: &Value) -> Result<bool, ConfigError> {
        let parameter = LayoutParameter::from_key_value(key, value)?;
        Ok(self.set_parameter(parameter))
    }

    pub fn set_hints(&mut self, hints: LayoutHints) {
        self.hints = hints;
        self.invalidate();
    }

    /// Mutable hints. The cached layout is dropped up front.
    pub fn hints_mut(&mut self) -> &mut LayoutHints {
        self.invalidate();
        &mut self.hints
    }

    /// Drops the cached tree and links.
    fn invalidate(&mut self) {
        if self.tree.take().is_some() {
            debug!("cached layout invalidated");
        }
        self.links.clear();
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Runs a full layout pass and keeps the result.
    pub fn recompute(&mut self) -> Result<&Tree, LayoutError> {
        let tree = position_tree(
            self.family.persons(),
            self.focal_id.as_deref(),
            &self.config,
            &self.hints,
        )?;
        let links = create_links(&tree, self.config.link_style);
        info!(
            focal = %tree.focal_appearance_id,
            nodes = tree.len(),
            links = links.len(),
            "tree recomputed"
        );
        let event = StoreEvent::TreeUpdated {
            focal_appearance_id: tree.focal_appearance_id.clone(),
            nodes: tree.len(),
        };
        self.links = links;
        self.emit(event);
        Ok(self.tree.insert(tree))
    }

    pub fn persons(&self) -> &[Person] {
        self.family.persons()
    }

    pub fn focal_id(&self) -> Option<&str> {
        self.focal_id.as_deref()
    }

    /// Person by id; placeholders synthesized by the last pass resolve too.
    pub fn person(&self, id: &str) -> Option<&Person> {
        self.family.get(id).or_else(|| {
            self.tree
                .as_ref()
                .and_then(|tree| tree.persons.iter().find(|person| person.id == id))
        })
    }

    /// Node by appearance id, or the first appearance of a person id.
    pub fn layout_node(&self, id: &str) -> Option<&LayoutNode> {
        self.tree.as_ref().and_then(|tree| tree.find(id))
    }

    pub fn tree(&self) -> Option<&Tree> {
        self.tree.as_ref()
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Most recent focal person still present in the data, else the first
    /// person.
    pub fn last_available_focal(&self) -> Option<&Person> {
        self.history
            .iter()
            .rev()
            .find_map(|id| self.family.get(id))
            .or_else(|| self.family.persons().first())
    }

    pub fn focal_history(&self) -> impl Iterator<Item = &str> {
        self.history.iter().map(String::as_str)
    }

    /// Whether the data arrived with `father`/`mother` fields.
    pub fn legacy_format(&self) -> bool {
        self.legacy_format.unwrap_or(false)
    }

    /// Canonical persons in the exchange shape of the input.
    pub fn export(&self) -> Result<Vec<Value>, NormalizeError> {
        format_for_export(self.family.persons(), self.legacy_format())
    }
}
