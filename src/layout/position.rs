use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::config::LayoutConfig;
use crate::error::LayoutError;
use crate::ir::{Family, Person};

use super::dimensions::calculate_dimensions;
use super::hierarchy::{Direction, Hierarchy, HierarchyOptions, build_hierarchy};
use super::placeholder::synthesize_placeholders;
use super::siblings::place_siblings;
use super::tidy::tidy_layout;
use super::types::{LayoutHints, LayoutNode, NodeRole, Tree};

/// Extra separation between cousins (nodes under different parents).
const COUSIN_SEPARATION: f32 = 0.25;
/// Extra separation per recorded spouse of either neighbour.
const SPOUSE_SEPARATION: f32 = 0.5;
/// Extra separation between half siblings.
const HALF_SIBLING_SEPARATION: f32 = 0.125;

/// Working node of one layout pass. Coordinates are `lateral` (across a
/// generation) and `level` (across generations, positive on both sides) until
/// they are oriented at the end of the pass.
#[derive(Debug, Clone)]
pub(super) struct Slot {
    pub person: usize,
    pub lateral: f32,
    pub level: f32,
    pub depth: i32,
    pub is_ancestry: bool,
    pub role: NodeRole,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    pub parents: Vec<usize>,
    pub spouses: Vec<usize>,
    pub spouse_of: Option<usize>,
    pub coparent: Option<usize>,
    pub spouse_anchor: Option<(f32, f32)>,
    pub progeny_anchor: Option<(f32, f32)>,
}

impl Slot {
    pub(super) fn new(person: usize, role: NodeRole) -> Self {
        Self {
            person,
            lateral: 0.0,
            level: 0.0,
            depth: 0,
            is_ancestry: role == NodeRole::Ancestry,
            role,
            parent: None,
            children: Vec::new(),
            parents: Vec::new(),
            spouses: Vec::new(),
            spouse_of: None,
            coparent: None,
            spouse_anchor: None,
            progeny_anchor: None,
        }
    }
}

/// Computes the positioned tree around `focal_id`.
///
/// Falls back to the first person when the focal id is unknown or absent.
pub fn position_tree(
    persons: &[Person],
    focal_id: Option<&str>,
    config: &LayoutConfig,
    hints: &LayoutHints,
) -> Result<Tree, LayoutError> {
    if persons.is_empty() {
        return Err(LayoutError::NoData);
    }
    let (mut node_sep, mut level_sep) = (config.node_separation(), config.level_separation());
    if config.is_horizontal {
        std::mem::swap(&mut node_sep, &mut level_sep);
    }

    let mut family = Family::new(persons.to_vec());
    if config.single_parent_placeholder_enabled {
        synthesize_placeholders(&mut family);
    }

    let focal_idx = match focal_id.and_then(|id| family.position(id)) {
        Some(idx) => idx,
        None => {
            if let Some(id) = focal_id {
                warn!(focal = id, "focal person not found, falling back to the first person");
            }
            0
        }
    };
    let focal_person_id = family.at(focal_idx).id.clone();

    let (ancestry_limit, progeny_limit) = if config.one_level_rels {
        (Some(1), Some(1))
    } else {
        (config.ancestry_depth_limit, config.progeny_depth_limit)
    };

    let spouse_lists = effective_spouses(&family, hints);

    let progeny = build_hierarchy(
        &family,
        &focal_person_id,
        Direction::Progeny,
        &HierarchyOptions {
            child_order: hints.child_order.as_ref(),
            max_depth: progeny_limit,
            ..HierarchyOptions::default()
        },
    )?;
    let ancestry = build_hierarchy(
        &family,
        &focal_person_id,
        Direction::Ancestry,
        &HierarchyOptions {
            child_order: hints.child_order.as_ref(),
            max_depth: ancestry_limit,
            ..HierarchyOptions::default()
        },
    )?;

    let progeny_positions = tidy_layout(&progeny, (node_sep, level_sep), |a, b| {
        progeny_separation(&family, &progeny, &spouse_lists, config.one_level_rels, a, b)
    });
    let ancestry_positions = tidy_layout(&ancestry, (node_sep, level_sep), |_, _| 1.0);

    let mut slots = merge_sides(
        &family,
        &progeny,
        &progeny_positions,
        &ancestry,
        &ancestry_positions,
    )?;
    link_structure(&mut slots);
    place_spouses(&mut slots, &family, &spouse_lists, node_sep, config.one_level_rels);

    if config.include_siblings_of_focal && !config.one_level_rels {
        if ancestry_limit == Some(0) {
            debug!("ancestry trimmed to the focal person, siblings skipped");
        } else {
            place_siblings(&mut slots, &family, hints, node_sep)?;
        }
    }

    record_progeny_anchors(&mut slots, &family);
    let nodes = finalize(&slots, &family, config.is_horizontal);
    let dimensions = calculate_dimensions(&nodes, node_sep, level_sep, config.is_horizontal);
    let focal_appearance_id = nodes[0].appearance_id.clone();

    debug!(
        focal = %focal_appearance_id,
        nodes = nodes.len(),
        progeny = progeny.len(),
        ancestry = ancestry.len(),
        "tree positioned"
    );
    Ok(Tree::new(
        nodes,
        dimensions,
        focal_appearance_id,
        config.is_horizontal,
        family.into_persons(),
    ))
}

/// Resolvable, non-suppressed spouses per person, in recorded order.
fn effective_spouses(family: &Family, hints: &LayoutHints) -> Vec<Vec<usize>> {
    family
        .persons()
        .iter()
        .map(|person| {
            person
                .relationships
                .spouses
                .iter()
                .filter(|id| !hints.is_suppressed(&person.id, id))
                .filter_map(|id| {
                    let resolved = family.position(id);
                    if resolved.is_none() {
                        warn!(person = %person.id, spouse = %id, "skipping dangling spouse id");
                    }
                    resolved
                })
                .collect()
        })
        .collect()
}

fn progeny_separation(
    family: &Family,
    hierarchy: &Hierarchy,
    spouse_lists: &[Vec<usize>],
    one_level: bool,
    a: usize,
    b: usize,
) -> f32 {
    let node_a = &hierarchy.nodes[a];
    let node_b = &hierarchy.nodes[b];
    let same_parent = node_a.parent == node_b.parent;

    let mut offset = 1.0;
    if !same_parent {
        offset += COUSIN_SEPARATION;
    }
    if !one_level {
        let spouses = spouse_lists[node_a.person].len() + spouse_lists[node_b.person].len();
        if spouses > 0 {
            offset += spouses as f32 * SPOUSE_SEPARATION;
        }
    }
    if same_parent && !same_parent_set(family.at(node_a.person), family.at(node_b.person)) {
        offset += HALF_SIBLING_SEPARATION;
    }
    offset
}

fn same_parent_set(a: &Person, b: &Person) -> bool {
    let mut parents_a: Vec<&String> = a.relationships.parents.iter().collect();
    let mut parents_b: Vec<&String> = b.relationships.parents.iter().collect();
    parents_a.sort();
    parents_b.sort();
    parents_a == parents_b
}

/// Levels both sides around a shared root and merges them as
/// `progeny ++ ancestry[1..]`.
fn merge_sides(
    family: &Family,
    progeny: &Hierarchy,
    progeny_positions: &[(f32, f32)],
    ancestry: &Hierarchy,
    ancestry_positions: &[(f32, f32)],
) -> Result<Vec<Slot>, LayoutError> {
    let mid_diff = match (ancestry_positions.first(), progeny_positions.first()) {
        (Some(up), Some(down)) => (up.0 - down.0) / 2.0,
        _ => 0.0,
    };

    let mut slots = Vec::with_capacity(progeny.len() + ancestry.len().saturating_sub(1));
    for (idx, (node, &(x, y))) in progeny.nodes.iter().zip(progeny_positions).enumerate() {
        let role = if idx == 0 { NodeRole::Focal } else { NodeRole::Progeny };
        let mut slot = Slot::new(node.person, role);
        slot.lateral = x + mid_diff;
        slot.level = y;
        slot.depth = node.depth as i32;
        slot.parent = node.parent;
        slots.push(slot);
    }

    let offset = progeny.len() - 1;
    for (node, &(x, y)) in ancestry.nodes.iter().zip(ancestry_positions).skip(1) {
        let parent = match node.parent {
            Some(0) => 0,
            Some(parent) => parent + offset,
            None => {
                return Err(LayoutError::DetachedAncestry {
                    person: family.at(node.person).id.clone(),
                });
            }
        };
        let mut slot = Slot::new(node.person, NodeRole::Ancestry);
        slot.lateral = x - mid_diff;
        slot.level = y;
        slot.depth = -(node.depth as i32);
        slot.parent = Some(parent);
        slots.push(slot);
    }
    Ok(slots)
}

/// Derives child and parent lists from the structural parent links and pairs
/// up co-parents.
fn link_structure(slots: &mut [Slot]) {
    for idx in 0..slots.len() {
        if let Some(parent) = slots[idx].parent {
            if slots[idx].is_ancestry {
                slots[parent].parents.push(idx);
            } else {
                slots[parent].children.push(idx);
            }
        }
    }
    for idx in 0..slots.len() {
        if let Some((p1, p2)) = parent_pair(&slots[idx]) {
            slots[p1].coparent = Some(p2);
            slots[p2].coparent = Some(p1);
        }
    }
}

fn parent_pair(slot: &Slot) -> Option<(usize, usize)> {
    match slot.parents.as_slice() {
        &[p1, p2] => Some((p1, p2)),
        _ => None,
    }
}

fn place_spouses(
    slots: &mut Vec<Slot>,
    family: &Family,
    spouse_lists: &[Vec<usize>],
    node_sep: f32,
    one_level: bool,
) {
    for idx in (0..slots.len()).rev() {
        if !slots[idx].is_ancestry {
            let spouses = &spouse_lists[slots[idx].person];
            if !spouses.is_empty() {
                if one_level && slots[idx].depth > 0 {
                    continue;
                }
                // Female partners sit to the right.
                let side = if family.at(slots[idx].person).is_male() { -1.0 } else { 1.0 };
                slots[idx].lateral += spouses.len() as f32 / 2.0 * node_sep * side;

                let (lateral, level, depth) = (slots[idx].lateral, slots[idx].level, slots[idx].depth);
                for (n, &spouse) in spouses.iter().enumerate() {
                    let x = lateral - node_sep * (n + 1) as f32 * side;
                    let anchor = if n == 0 { x + node_sep / 2.0 * side } else { x };
                    let mut slot = Slot::new(spouse, NodeRole::Spouse);
                    slot.lateral = x;
                    slot.level = level;
                    slot.depth = depth;
                    slot.spouse_of = Some(idx);
                    slot.spouse_anchor = Some((anchor, level));
                    let spouse_idx = slots.len();
                    slots.push(slot);
                    slots[idx].spouses.push(spouse_idx);
                }
            }
        }

        if let Some((p1, p2)) = parent_pair(&slots[idx]) {
            recenter_couple(slots, p1, p2, node_sep);
        }
    }
}

/// Moves two parents one `node_sep` apart around their current midpoint.
fn recenter_couple(slots: &mut [Slot], p1: usize, p2: usize, node_sep: f32) {
    let half = node_sep / 2.0;
    let midpoint = slots[p1].lateral - (slots[p1].lateral - slots[p2].lateral) / 2.0;
    let toward = |from: f32, to: f32| if from < to { 1.0 } else { -1.0 };
    slots[p2].lateral = midpoint + half * toward(slots[p1].lateral, slots[p2].lateral);
    slots[p1].lateral = midpoint + half * toward(slots[p2].lateral, slots[p1].lateral);
}

/// Records where each progeny link leaves its parents: the gap between the
/// parent and the partner it had the child with, or the single parent itself.
fn record_progeny_anchors(slots: &mut [Slot], family: &Family) {
    for idx in 0..slots.len() {
        let slot = &slots[idx];
        if slot.is_ancestry
            || slot.depth == 0
            || matches!(slot.role, NodeRole::Spouse | NodeRole::Sibling)
        {
            continue;
        }
        let Some(parent) = slot.parent else {
            continue;
        };
        let child_parents = &family.at(slot.person).relationships.parents;
        let partner = slots[parent]
            .spouses
            .iter()
            .copied()
            .find(|&spouse| child_parents.contains(&family.at(slots[spouse].person).id));

        let anchor = match partner.and_then(|spouse| slots[spouse].spouse_anchor) {
            Some(anchor) => anchor,
            None => {
                let own = (slots[parent].lateral, slots[parent].level);
                slots[parent].spouse_anchor = Some(own);
                own
            }
        };
        slots[idx].progeny_anchor = Some(anchor);
    }
}

fn orient(point: (f32, f32), is_ancestry: bool, horizontal: bool) -> (f32, f32) {
    let (lateral, level) = point;
    let level = if is_ancestry { -level } else { level };
    if horizontal { (level, lateral) } else { (lateral, level) }
}

/// Orients coordinates and turns slots into appearance-keyed nodes.
fn finalize(slots: &[Slot], family: &Family, horizontal: bool) -> Vec<LayoutNode> {
    let mut totals: HashMap<usize, usize> = HashMap::new();
    for slot in slots {
        *totals.entry(slot.person).or_default() += 1;
    }
    let mut seen: HashMap<usize, usize> = HashMap::new();
    let appearance_ids: Vec<String> = slots
        .iter()
        .map(|slot| {
            let occurrence = seen.entry(slot.person).or_default();
            *occurrence += 1;
            let id = &family.at(slot.person).id;
            if *occurrence == 1 {
                id.clone()
            } else {
                format!("{id}--x{occurrence}")
            }
        })
        .collect();

    let displayed: HashSet<&str> = slots
        .iter()
        .map(|slot| family.at(slot.person).id.as_str())
        .collect();
    let ids = |list: &[usize]| -> Vec<String> {
        list.iter().map(|&idx| appearance_ids[idx].clone()).collect()
    };

    slots
        .iter()
        .enumerate()
        .map(|(idx, slot)| {
            let person = family.at(slot.person);
            let (x, y) = orient((slot.lateral, slot.level), slot.is_ancestry, horizontal);
            LayoutNode {
                appearance_id: appearance_ids[idx].clone(),
                person: person.clone(),
                x,
                y,
                depth: slot.depth,
                is_ancestry: slot.is_ancestry,
                role: slot.role,
                parent_node: slot.parent.map(|p| appearance_ids[p].clone()),
                child_nodes: ids(&slot.children),
                parent_nodes: ids(&slot.parents),
                spouse_nodes: ids(&slot.spouses),
                spouse_of: slot.spouse_of.map(|p| appearance_ids[p].clone()),
                coparent: slot.coparent.map(|p| appearance_ids[p].clone()),
                spouse_anchor: slot
                    .spouse_anchor
                    .map(|anchor| orient(anchor, slot.is_ancestry, horizontal)),
                progeny_anchor: slot
                    .progeny_anchor
                    .map(|anchor| orient(anchor, slot.is_ancestry, horizontal)),
                duplicate_count: totals.get(&slot.person).copied().unwrap_or(1),
                all_rels_displayed: person
                    .all_relative_ids()
                    .all(|id| displayed.contains(id.as_str())),
            }
        })
        .collect()
}
