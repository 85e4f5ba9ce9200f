use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::config::LinkStyle;

use super::curve::build_path;
use super::types::{LayoutNode, Link, LinkKind, Tree};

// ── Sibling fan-out ─────────────────────────────────────────────────
/// Base spread per sibling, before the count bonus.
const FAN_SPREAD_VERTICAL: f32 = 12.0;
const FAN_SPREAD_HORIZONTAL: f32 = 10.0;
/// Upper bound on the per-sibling spread.
const FAN_MAX_SCALE: f32 = 20.0;
/// Hard clamp on a single link's displacement.
const FAN_MAX_DISPLACEMENT: f32 = 24.0;
/// Links this close to the middle of their group are left straight.
const FAN_CENTER_EPSILON: f32 = 0.05;

/// Derives every spouse, ancestry and parent-child link of `tree`.
///
/// Links are keyed by their id; when two nodes produce the same link the later
/// geometry replaces the earlier one in place.
pub fn create_links(tree: &Tree, style: LinkStyle) -> Vec<Link> {
    let mut links: Vec<Link> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    for node in &tree.nodes {
        for link in links_for_node(tree, node) {
            match positions.get(&link.id) {
                Some(&idx) => links[idx] = link,
                None => {
                    positions.insert(link.id.clone(), links.len());
                    links.push(link);
                }
            }
        }
    }

    apply_fan_offsets(tree, &mut links);
    for link in &mut links {
        link.path = build_path(link, style, tree.is_horizontal);
    }
    debug!(links = links.len(), ?style, "links synthesized");
    links
}

/// Lateral displacement for the `index`-th of `count` sibling links.
///
/// Returns `None` for a lone link and for the middle link of an odd group.
pub fn sibling_offset(index: usize, count: usize, horizontal: bool) -> Option<f32> {
    if count <= 1 {
        return None;
    }
    let center = (count as f32 - 1.0) / 2.0;
    let from_center = index as f32 - center;
    if from_center.abs() < FAN_CENTER_EPSILON {
        return None;
    }
    let base = if horizontal {
        FAN_SPREAD_HORIZONTAL
    } else {
        FAN_SPREAD_VERTICAL
    };
    let scale = (base + count as f32).min(FAN_MAX_SCALE);
    Some((from_center * scale).clamp(-FAN_MAX_DISPLACEMENT, FAN_MAX_DISPLACEMENT))
}

fn links_for_node(tree: &Tree, node: &LayoutNode) -> Vec<Link> {
    let mut links = Vec::new();
    spouse_links(tree, node, &mut links);
    ancestry_link(tree, node, &mut links);
    progeny_links(tree, node, &mut links);
    links
}

fn link_id(nodes: &[&LayoutNode]) -> String {
    let mut ids: Vec<&str> = nodes.iter().map(|node| node.appearance_id.as_str()).collect();
    ids.sort_unstable();
    ids.join(", ")
}

fn midpoint(a: (f32, f32), b: (f32, f32)) -> (f32, f32) {
    (a.0 - (a.0 - b.0) / 2.0, a.1 - (a.1 - b.1) / 2.0)
}

/// Right-angle route with the bend halfway between the two generations.
fn elbow(from: (f32, f32), to: (f32, f32), horizontal: bool) -> Vec<(f32, f32)> {
    if horizontal {
        let hx = from.0 + (to.0 - from.0) / 2.0;
        vec![from, (hx, from.1), (hx, from.1), (hx, to.1), (hx, to.1), to]
    } else {
        let hy = from.1 + (to.1 - from.1) / 2.0;
        vec![from, (from.0, hy), (from.0, hy), (to.0, hy), (to.0, hy), to]
    }
}

fn spouse_links(tree: &Tree, node: &LayoutNode, links: &mut Vec<Link>) {
    let partners: Vec<&LayoutNode> = if node.spouse_nodes.is_empty() {
        node.coparent.iter().filter_map(|id| tree.node(id)).collect()
    } else {
        node.spouse_nodes.iter().filter_map(|id| tree.node(id)).collect()
    };
    for partner in partners {
        links.push(Link {
            id: link_id(&[node, partner]),
            kind: LinkKind::Spouse,
            sources: vec![node.appearance_id.clone()],
            targets: vec![partner.appearance_id.clone()],
            source_point: node.position(),
            target_point: partner.position(),
            points: vec![node.position(), partner.position()],
            path: String::new(),
            is_curved: false,
            depth: node.depth,
            fan_offset: 0.0,
        });
    }
}

fn ancestry_link(tree: &Tree, node: &LayoutNode, links: &mut Vec<Link>) {
    let parents: Vec<&LayoutNode> = node
        .parent_nodes
        .iter()
        .filter_map(|id| tree.node(id))
        .collect();
    let Some(&p1) = parents.first() else {
        return;
    };
    let p2 = parents.get(1).copied().unwrap_or(p1);
    let target = midpoint(p1.position(), p2.position());

    let mut targets = vec![p1.appearance_id.clone()];
    if p2.appearance_id != p1.appearance_id {
        targets.push(p2.appearance_id.clone());
    }
    links.push(Link {
        id: link_id(&[node, p1, p2]),
        kind: LinkKind::Ancestry,
        sources: vec![node.appearance_id.clone()],
        targets,
        source_point: node.position(),
        target_point: target,
        points: elbow(node.position(), target, tree.is_horizontal),
        path: String::new(),
        is_curved: true,
        depth: node.depth - 1,
        fan_offset: 0.0,
    });
}

fn progeny_links(tree: &Tree, node: &LayoutNode, links: &mut Vec<Link>) {
    for child in node.child_nodes.iter().filter_map(|id| tree.node(id)) {
        let child_parents = &child.person.relationships.parents;
        let partner = node
            .spouse_nodes
            .iter()
            .filter_map(|id| tree.node(id))
            .find(|spouse| child_parents.contains(&spouse.person.id));
        let other_parent = partner.unwrap_or(node);

        let anchor = child
            .progeny_anchor
            .or_else(|| partner.and_then(|p| p.spouse_anchor))
            .or(node.spouse_anchor)
            .or_else(|| partner.map(|p| midpoint(node.position(), p.position())))
            .unwrap_or_else(|| node.position());
        let trunk = if tree.is_horizontal {
            (node.x, anchor.1)
        } else {
            (anchor.0, node.y)
        };

        let mut sources = vec![node.appearance_id.clone()];
        if other_parent.appearance_id != node.appearance_id {
            sources.push(other_parent.appearance_id.clone());
        }
        links.push(Link {
            id: link_id(&[child, node, other_parent]),
            kind: LinkKind::ParentChild,
            sources,
            targets: vec![child.appearance_id.clone()],
            source_point: trunk,
            target_point: child.position(),
            points: elbow(trunk, child.position(), tree.is_horizontal),
            path: String::new(),
            is_curved: true,
            depth: node.depth + 1,
            fan_offset: 0.0,
        });
    }
}

/// Spreads parent-child links that leave the same parent person.
fn apply_fan_offsets(tree: &Tree, links: &mut [Link]) {
    let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (idx, link) in links.iter().enumerate() {
        if link.kind != LinkKind::ParentChild {
            continue;
        }
        let key = link
            .sources
            .first()
            .and_then(|id| tree.node(id))
            .map_or(link.id.as_str(), |parent| parent.person.id.as_str());
        groups.entry(key).or_default().push(idx);
    }

    let lateral = |point: (f32, f32)| if tree.is_horizontal { point.1 } else { point.0 };
    let mut assignments = Vec::new();
    for members in groups.values() {
        let mut sorted = members.clone();
        sorted.sort_by(|&a, &b| lateral(links[a].target_point).total_cmp(&lateral(links[b].target_point)));
        for (index, &idx) in sorted.iter().enumerate() {
            if let Some(offset) = sibling_offset(index, sorted.len(), tree.is_horizontal) {
                assignments.push((idx, offset));
            }
        }
    }
    for (idx, offset) in assignments {
        links[idx].fan_offset = offset;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use crate::ir::{Gender, Person};
    use crate::layout::{LayoutHints, position_tree};

    fn tree_for(persons: &[Person], focal: &str, config: &LayoutConfig) -> Tree {
        position_tree(persons, Some(focal), config, &LayoutHints::default()).unwrap()
    }

    fn abc() -> Vec<Person> {
        vec![
            Person::new("A").with_gender(Gender::Male).with_children(["C"]),
            Person::new("B").with_gender(Gender::Female).with_children(["C"]),
            Person::new("C").with_parents(["A", "B"]),
        ]
    }

    #[test]
    fn parents_get_one_spouse_link_and_one_ancestry_link() {
        let tree = tree_for(&abc(), "C", &LayoutConfig::default());
        let links = create_links(&tree, LinkStyle::Elbow);
        assert_eq!(links.len(), 2);

        let spouse = links.iter().find(|l| l.kind == LinkKind::Spouse).unwrap();
        assert_eq!(spouse.id, "A, B");
        assert!(!spouse.is_curved);

        let ancestry = links.iter().find(|l| l.kind == LinkKind::Ancestry).unwrap();
        assert_eq!(ancestry.id, "A, B, C");
        assert_eq!(ancestry.sources, vec!["C"]);
        assert_eq!(ancestry.targets, vec!["A", "B"]);
        assert_eq!(ancestry.points.first(), Some(&(0.0, 0.0)));
        assert_eq!(ancestry.points.last(), Some(&(0.0, -150.0)));
        assert_eq!(ancestry.path, "M0,0 L0,-75 L0,-150");
    }

    #[test]
    fn progeny_links_leave_from_the_couple_gap() {
        let persons = vec![
            Person::new("D").with_gender(Gender::Male).with_children(["E", "F"]),
            Person::new("E").with_parents(["D"]),
            Person::new("F").with_parents(["D"]),
        ];
        let tree = tree_for(&persons, "D", &LayoutConfig::default());
        let links = create_links(&tree, LinkStyle::Elbow);
        let progeny: Vec<&Link> = links.iter().filter(|l| l.kind == LinkKind::ParentChild).collect();
        assert_eq!(progeny.len(), 2);

        let d = tree.node("D").unwrap();
        let anchor = tree.node("E").unwrap().progeny_anchor.unwrap();
        for link in &progeny {
            assert_eq!(link.source_point, (anchor.0, d.y));
            let child = tree.node(&link.targets[0]).unwrap();
            assert_eq!(link.points.last(), Some(&child.position()));
            assert_eq!(link.sources, vec!["D".to_string(), "D--to-add".to_string()]);
            assert_eq!(link.depth, 1);
        }
        assert_eq!(progeny[0].id, "D, D--to-add, E");
    }

    #[test]
    fn sibling_links_fan_symmetrically() {
        let persons = vec![
            Person::new("D").with_gender(Gender::Male).with_spouses(["W"]).with_children(["a", "b", "c"]),
            Person::new("W").with_gender(Gender::Female).with_spouses(["D"]).with_children(["a", "b", "c"]),
            Person::new("a").with_parents(["D", "W"]),
            Person::new("b").with_parents(["D", "W"]),
            Person::new("c").with_parents(["D", "W"]),
        ];
        let tree = tree_for(&persons, "D", &LayoutConfig::default());
        let links = create_links(&tree, LinkStyle::Smooth);
        let mut fanned: Vec<&Link> = links.iter().filter(|l| l.kind == LinkKind::ParentChild).collect();
        fanned.sort_by(|a, b| a.target_point.0.total_cmp(&b.target_point.0));
        let offsets: Vec<f32> = fanned.iter().map(|l| l.fan_offset).collect();
        assert_eq!(offsets, vec![-15.0, 0.0, 15.0]);
    }

    #[test]
    fn duplicate_links_keep_first_position() {
        let tree = tree_for(&abc(), "C", &LayoutConfig::default());
        let links = create_links(&tree, LinkStyle::Legacy);
        let ids: Vec<&str> = links.iter().map(|l| l.id.as_str()).collect();
        // C is visited first, so its ancestry link precedes the couple link.
        assert_eq!(ids, vec!["A, B, C", "A, B"]);
    }

    #[test]
    fn sibling_offset_is_centered_and_clamped() {
        assert_eq!(sibling_offset(0, 1, false), None);
        assert_eq!(sibling_offset(1, 3, false), None);
        assert_eq!(sibling_offset(0, 2, false), Some(-7.0));
        assert_eq!(sibling_offset(0, 2, true), Some(-6.0));
        assert_eq!(sibling_offset(0, 12, false), Some(-24.0));
        assert_eq!(sibling_offset(11, 12, false), Some(24.0));
    }

    #[test]
    fn horizontal_links_bend_between_generations() {
        let config = LayoutConfig {
            is_horizontal: true,
            ..LayoutConfig::default()
        };
        let tree = tree_for(&abc(), "C", &config);
        let links = create_links(&tree, LinkStyle::Elbow);
        let ancestry = links.iter().find(|l| l.kind == LinkKind::Ancestry).unwrap();
        assert_eq!(ancestry.points[1], (-125.0, 0.0));
        assert_eq!(ancestry.target_point, (-250.0, 0.0));
    }
}
