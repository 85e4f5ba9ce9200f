use std::cmp::Reverse;
use std::collections::{HashMap, HashSet, VecDeque};

use tracing::{debug, warn};

use crate::error::LayoutError;
use crate::ir::{Family, Person};

use super::types::ChildOrder;

/// Upper bound on nodes per side before a traversal is abandoned.
pub const MAX_HIERARCHY_NODES: usize = 50_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Follow `parents` edges.
    Ancestry,
    /// Follow `children` edges.
    Progeny,
}

#[derive(Clone)]
pub struct HierarchyOptions<'a> {
    pub child_order: Option<&'a ChildOrder>,
    pub max_depth: Option<usize>,
    pub node_limit: usize,
}

impl Default for HierarchyOptions<'_> {
    fn default() -> Self {
        Self {
            child_order: None,
            max_depth: None,
            node_limit: MAX_HIERARCHY_NODES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HierarchyNode {
    /// Index into the family the hierarchy was built from.
    pub person: usize,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    pub depth: usize,
}

/// Arena tree in breadth-first order. Node 0 is the root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hierarchy {
    pub nodes: Vec<HierarchyNode>,
}

impl Hierarchy {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn height(&self) -> usize {
        self.nodes.iter().map(|node| node.depth).max().unwrap_or(0)
    }

    fn path_contains(&self, from: usize, person: usize) -> bool {
        let mut cursor = Some(from);
        while let Some(idx) = cursor {
            let node = &self.nodes[idx];
            if node.person == person {
                return true;
            }
            cursor = node.parent;
        }
        false
    }
}

/// Builds the ancestry or progeny hierarchy of `root`.
///
/// A person is not expanded below itself, but the same person reached via two
/// different paths appears twice. Depth limits are applied after construction.
pub fn build_hierarchy(
    stash: &Family,
    root: &str,
    direction: Direction,
    options: &HierarchyOptions<'_>,
) -> Result<Hierarchy, LayoutError> {
    let root_idx = stash.position(root).ok_or_else(|| LayoutError::UnknownPerson {
        id: root.to_string(),
    })?;

    let mut hierarchy = Hierarchy {
        nodes: vec![HierarchyNode {
            person: root_idx,
            parent: None,
            children: Vec::new(),
            depth: 0,
        }],
    };
    let mut queue = VecDeque::from([0usize]);

    while let Some(current) = queue.pop_front() {
        let person = stash.at(hierarchy.nodes[current].person);
        let next = match direction {
            Direction::Progeny => ordered_children(stash, person, options.child_order),
            Direction::Ancestry => ordered_parents(stash, person),
        };
        for person_idx in next {
            if hierarchy.path_contains(current, person_idx) {
                debug!(
                    person = %stash.at(person_idx).id,
                    "relationship cycle, not expanding person below itself"
                );
                continue;
            }
            if hierarchy.nodes.len() >= options.node_limit {
                return Err(LayoutError::TraversalLimit {
                    root: root.to_string(),
                    limit: options.node_limit,
                });
            }
            let idx = hierarchy.nodes.len();
            let depth = hierarchy.nodes[current].depth + 1;
            hierarchy.nodes.push(HierarchyNode {
                person: person_idx,
                parent: Some(current),
                children: Vec::new(),
                depth,
            });
            hierarchy.nodes[current].children.push(idx);
            queue.push_back(idx);
        }
    }

    if let Some(max_depth) = options.max_depth {
        let removed = trim_depth(&mut hierarchy, max_depth);
        if removed > 0 {
            debug!(?direction, max_depth, removed, "trimmed hierarchy");
        }
    }
    Ok(hierarchy)
}

/// Drops every node deeper than `max_depth`. Returns the number removed.
pub fn trim_depth(hierarchy: &mut Hierarchy, max_depth: usize) -> usize {
    // Breadth-first order keeps depths non-decreasing, so the trimmed nodes form a suffix.
    let before = hierarchy.nodes.len();
    let keep = hierarchy
        .nodes
        .iter()
        .position(|node| node.depth > max_depth)
        .unwrap_or(before);
    hierarchy.nodes.truncate(keep);
    for node in &mut hierarchy.nodes {
        node.children.retain(|&child| child < keep);
    }
    before - keep
}

fn resolve(stash: &Family, owner: &str, id: &str) -> Option<usize> {
    if id.is_empty() {
        return None;
    }
    let resolved = stash.position(id);
    if resolved.is_none() {
        warn!(person = owner, relative = id, "skipping dangling relationship id");
    }
    resolved
}

/// Children of `person`, ordered by the caller comparator, then grouped by the
/// other parent's place in the spouse list, with synthetic children last.
fn ordered_children(stash: &Family, person: &Person, order: Option<&ChildOrder>) -> Vec<usize> {
    let mut children: Vec<usize> = person
        .relationships
        .children
        .iter()
        .filter_map(|id| resolve(stash, &person.id, id))
        .collect();

    if let Some(order) = order {
        children.sort_by(|&a, &b| order(stash.at(a), stash.at(b)));
    }
    let spouse_rank = |child: usize| -> i64 {
        other_parent(stash, stash.at(child), &person.id)
            .and_then(|other| {
                person
                    .relationships
                    .spouses
                    .iter()
                    .position(|spouse| spouse == other)
            })
            .map_or(-1, |idx| idx as i64)
    };
    if person.is_male() {
        children.sort_by_key(|&child| spouse_rank(child));
    } else {
        children.sort_by_key(|&child| Reverse(spouse_rank(child)));
    }
    children.sort_by_key(|&child| stash.at(child).to_add);
    children
}

/// Parents of `person`, father first when the first listed parent is female.
fn ordered_parents(stash: &Family, person: &Person) -> Vec<usize> {
    let mut ids: Vec<&String> = person.relationships.parents.iter().collect();
    let first_is_female = ids
        .first()
        .and_then(|id| stash.get(id))
        .is_some_and(Person::is_female);
    if first_is_female {
        ids.reverse();
    }
    ids.into_iter()
        .filter_map(|id| resolve(stash, &person.id, id))
        .collect()
}

pub(crate) fn other_parent<'a>(stash: &Family, child: &'a Person, parent: &str) -> Option<&'a str> {
    child
        .relationships
        .parents
        .iter()
        .find(|id| id.as_str() != parent && stash.contains(id))
        .map(String::as_str)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DepthSummary {
    pub ancestry: usize,
    pub progeny: usize,
}

/// Number of generations above and below `id`, counting real persons only.
pub fn max_depths(persons: &[Person], id: &str) -> Result<DepthSummary, LayoutError> {
    let family = Family::new(persons.to_vec());
    let root = family
        .position(id)
        .ok_or_else(|| LayoutError::UnknownPerson { id: id.to_string() })?;

    let mut walker = HeightWalker {
        family: &family,
        memo: HashMap::new(),
        on_path: HashSet::new(),
    };
    let ancestry = walker.height(root, Direction::Ancestry);
    walker.memo.clear();
    let progeny = walker.height(root, Direction::Progeny);
    Ok(DepthSummary { ancestry, progeny })
}

struct HeightWalker<'a> {
    family: &'a Family,
    memo: HashMap<usize, usize>,
    on_path: HashSet<usize>,
}

impl HeightWalker<'_> {
    fn height(&mut self, idx: usize, direction: Direction) -> usize {
        if let Some(&known) = self.memo.get(&idx) {
            return known;
        }
        self.on_path.insert(idx);
        let rels = &self.family.at(idx).relationships;
        let next_ids = match direction {
            Direction::Ancestry => &rels.parents,
            Direction::Progeny => &rels.children,
        };
        let next: Vec<usize> = next_ids
            .iter()
            .filter_map(|id| self.family.position(id))
            .filter(|&next| !self.family.at(next).is_placeholder())
            .filter(|next| !self.on_path.contains(next))
            .collect();
        let mut best = 0;
        for next in next {
            best = best.max(1 + self.height(next, direction));
        }
        self.on_path.remove(&idx);
        self.memo.insert(idx, best);
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Gender;
    use std::sync::Arc;

    fn ids(stash: &Family, hierarchy: &Hierarchy, node: usize) -> Vec<String> {
        hierarchy.nodes[node]
            .children
            .iter()
            .map(|&child| stash.at(hierarchy.nodes[child].person).id.clone())
            .collect()
    }

    fn blended_family(parent_gender: Gender) -> Family {
        Family::new(vec![
            Person::new("p")
                .with_gender(parent_gender)
                .with_spouses(["s1", "s2"])
                .with_children(["from_s2", "from_s1", "alone"]),
            Person::new("s1").with_spouses(["p"]).with_children(["from_s1"]),
            Person::new("s2").with_spouses(["p"]).with_children(["from_s2"]),
            Person::new("from_s1").with_parents(["p", "s1"]),
            Person::new("from_s2").with_parents(["p", "s2"]),
            Person::new("alone").with_parents(["p"]),
        ])
    }

    #[test]
    fn male_parent_orders_children_by_spouse_index() {
        let stash = blended_family(Gender::Male);
        let tree = build_hierarchy(&stash, "p", Direction::Progeny, &HierarchyOptions::default()).unwrap();
        assert_eq!(ids(&stash, &tree, 0), vec!["alone", "from_s1", "from_s2"]);
    }

    #[test]
    fn female_parent_reverses_spouse_order() {
        let stash = blended_family(Gender::Female);
        let tree = build_hierarchy(&stash, "p", Direction::Progeny, &HierarchyOptions::default()).unwrap();
        assert_eq!(ids(&stash, &tree, 0), vec!["from_s2", "from_s1", "alone"]);
    }

    #[test]
    fn comparator_runs_before_synthetic_children_move_last() {
        let mut pending = Person::new("a_pending").with_parents(["p"]);
        pending.to_add = true;
        let stash = Family::new(vec![
            Person::new("p").with_gender(Gender::Male).with_children(["c", "a_pending", "b"]),
            Person::new("c").with_parents(["p"]),
            pending,
            Person::new("b").with_parents(["p"]),
        ]);
        let order: ChildOrder = Arc::new(|a: &Person, b: &Person| a.id.cmp(&b.id));
        let options = HierarchyOptions {
            child_order: Some(&order),
            ..HierarchyOptions::default()
        };
        let tree = build_hierarchy(&stash, "p", Direction::Progeny, &options).unwrap();
        assert_eq!(ids(&stash, &tree, 0), vec!["b", "c", "a_pending"]);
    }

    #[test]
    fn synthetic_children_stay_last_across_spouse_groups() {
        let mut pending = Person::new("pending").with_parents(["p", "s1"]);
        pending.to_add = true;
        let stash = Family::new(vec![
            Person::new("p")
                .with_gender(Gender::Female)
                .with_spouses(["s1"])
                .with_children(["real", "pending"]),
            Person::new("s1").with_gender(Gender::Male).with_spouses(["p"]),
            Person::new("real").with_parents(["p"]),
            pending,
        ]);
        let tree = build_hierarchy(&stash, "p", Direction::Progeny, &HierarchyOptions::default()).unwrap();
        assert_eq!(ids(&stash, &tree, 0), vec!["real", "pending"]);

        let father = Family::new(vec![
            Person::new("p")
                .with_gender(Gender::Male)
                .with_spouses(["s1"])
                .with_children(["pending", "real"]),
            Person::new("s1").with_gender(Gender::Female).with_spouses(["p"]),
            Person::new("real").with_parents(["p", "s1"]),
            {
                let mut pending = Person::new("pending").with_parents(["p"]);
                pending.to_add = true;
                pending
            },
        ]);
        let tree = build_hierarchy(&father, "p", Direction::Progeny, &HierarchyOptions::default()).unwrap();
        assert_eq!(ids(&father, &tree, 0), vec!["real", "pending"]);
    }

    #[test]
    fn mother_listed_first_is_swapped_behind_father() {
        let stash = Family::new(vec![
            Person::new("kid").with_parents(["mom", "dad"]),
            Person::new("mom").with_gender(Gender::Female),
            Person::new("dad").with_gender(Gender::Male),
        ]);
        let tree = build_hierarchy(&stash, "kid", Direction::Ancestry, &HierarchyOptions::default()).unwrap();
        assert_eq!(ids(&stash, &tree, 0), vec!["dad", "mom"]);
    }

    #[test]
    fn shared_ancestor_appears_once_per_path() {
        // Cousins a and b married; their child sees grandparent g twice.
        let stash = Family::new(vec![
            Person::new("kid").with_parents(["a", "b"]),
            Person::new("a").with_parents(["pa"]),
            Person::new("b").with_parents(["pb"]),
            Person::new("pa").with_parents(["g"]),
            Person::new("pb").with_parents(["g"]),
            Person::new("g"),
        ]);
        let tree = build_hierarchy(&stash, "kid", Direction::Ancestry, &HierarchyOptions::default()).unwrap();
        let g = stash.position("g").unwrap();
        assert_eq!(tree.nodes.iter().filter(|node| node.person == g).count(), 2);
        assert_eq!(tree.height(), 3);
    }

    #[test]
    fn cycles_terminate() {
        let stash = Family::new(vec![
            Person::new("a").with_children(["b"]).with_parents(["b"]),
            Person::new("b").with_children(["a"]).with_parents(["a"]),
        ]);
        let tree = build_hierarchy(&stash, "a", Direction::Progeny, &HierarchyOptions::default()).unwrap();
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn node_limit_is_an_error() {
        let stash = blended_family(Gender::Male);
        let options = HierarchyOptions {
            node_limit: 2,
            ..HierarchyOptions::default()
        };
        let err = build_hierarchy(&stash, "p", Direction::Progeny, &options).unwrap_err();
        assert_eq!(
            err,
            LayoutError::TraversalLimit {
                root: "p".to_string(),
                limit: 2
            }
        );
    }

    #[test]
    fn trim_depth_drops_deep_nodes() {
        let stash = Family::new(vec![
            Person::new("a").with_children(["b"]),
            Person::new("b").with_parents(["a"]).with_children(["c"]),
            Person::new("c").with_parents(["b"]),
        ]);
        let mut tree = build_hierarchy(&stash, "a", Direction::Progeny, &HierarchyOptions::default()).unwrap();
        assert_eq!(trim_depth(&mut tree, 1), 1);
        assert_eq!(tree.len(), 2);
        assert!(tree.nodes[1].children.is_empty());
        assert_eq!(trim_depth(&mut tree, 0), 1);
        assert!(tree.nodes[0].children.is_empty());
    }

    #[test]
    fn dangling_children_are_skipped() {
        let stash = Family::new(vec![Person::new("a").with_children(["ghost"])]);
        let tree = build_hierarchy(&stash, "a", Direction::Progeny, &HierarchyOptions::default()).unwrap();
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn max_depths_ignore_placeholders() {
        let mut placeholder = Person::new("ph").with_parents(["kid"]);
        placeholder.to_add = true;
        let persons = vec![
            Person::new("gp").with_children(["p"]),
            Person::new("p").with_parents(["gp"]).with_children(["kid"]),
            Person::new("kid").with_parents(["p"]).with_children(["ph"]),
            placeholder,
        ];
        let depths = max_depths(&persons, "p").unwrap();
        assert_eq!(depths, DepthSummary { ancestry: 1, progeny: 1 });
        assert!(max_depths(&persons, "nobody").is_err());
    }
}
