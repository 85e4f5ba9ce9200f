use tracing::debug;

use crate::error::LayoutError;
use crate::ir::Family;

use super::position::Slot;
use super::types::{LayoutHints, NodeRole};

const FOCAL_SLOT: usize = 0;

/// Adds the focal person's siblings beside the focal/spouse cluster.
///
/// Siblings share at least one recorded parent with the focal person. Full
/// siblings sit next to the focal person; half siblings through the first
/// parent go outermost left and half siblings through the second parent go
/// outermost right.
pub(super) fn place_siblings(
    slots: &mut Vec<Slot>,
    family: &Family,
    hints: &LayoutHints,
    node_sep: f32,
) -> Result<(), LayoutError> {
    let focal_person = slots[FOCAL_SLOT].person;
    let focal = family.at(focal_person);
    let focal_parents: Vec<&String> = focal
        .relationships
        .parents
        .iter()
        .take(2)
        .filter(|id| family.contains(id))
        .collect();

    let siblings: Vec<usize> = family
        .persons()
        .iter()
        .enumerate()
        .filter(|(idx, person)| {
            *idx != focal_person
                && person.id != focal.id
                && focal_parents
                    .iter()
                    .any(|parent| person.relationships.parents.contains(parent))
        })
        .map(|(idx, _)| idx)
        .collect();
    if siblings.is_empty() {
        return Ok(());
    }
    if slots[FOCAL_SLOT].parents.is_empty() {
        return Err(LayoutError::SiblingsWithoutParents {
            focal: focal.id.clone(),
        });
    }

    // Parent slots of the focal person, matched by person id.
    let parent_slot = |person_id: Option<&String>, slots: &[Slot]| -> Option<usize> {
        let person_id = person_id?;
        slots[FOCAL_SLOT]
            .parents
            .iter()
            .copied()
            .find(|&slot| &family.at(slots[slot].person).id == person_id)
    };

    let level = slots[FOCAL_SLOT].level;
    let mut added = Vec::with_capacity(siblings.len());
    for person in siblings {
        let parents = &family.at(person).relationships.parents;
        let mut slot = Slot::new(person, NodeRole::Sibling);
        slot.level = level;
        slot.parents.extend(parent_slot(parents.first(), slots));
        slot.parents.extend(parent_slot(parents.get(1), slots));
        added.push(slots.len());
        slots.push(slot);
    }

    let mut ordered: Vec<usize> = std::iter::once(FOCAL_SLOT).chain(added.iter().copied()).collect();
    if let Some(order) = &hints.child_order {
        ordered.sort_by(|&a, &b| order(family.at(slots[a].person), family.at(slots[b].person)));
    }
    ordered.sort_by_key(|&slot| {
        let parents = &family.at(slots[slot].person).relationships.parents;
        let has_first = parent_slot(parents.first(), slots).is_some();
        let has_second = parent_slot(parents.get(1), slots).is_some();
        (has_second, !has_first)
    });

    let focal_slot = &slots[FOCAL_SLOT];
    let (min_x, max_x) = focal_slot
        .spouses
        .iter()
        .map(|&spouse| slots[spouse].lateral)
        .fold((focal_slot.lateral, focal_slot.lateral), |(lo, hi), x| {
            (lo.min(x), hi.max(x))
        });
    let focal_rank = ordered
        .iter()
        .position(|&slot| slot == FOCAL_SLOT)
        .unwrap_or(0);
    for (rank, &slot) in ordered.iter().enumerate() {
        if rank < focal_rank {
            slots[slot].lateral = min_x - node_sep * (focal_rank - rank) as f32;
        } else if rank > focal_rank {
            slots[slot].lateral = max_x + node_sep * (rank - focal_rank) as f32;
        }
    }

    debug!(siblings = added.len(), "placed siblings of focal person");
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::config::LayoutConfig;
    use crate::ir::{Gender, Person};
    use crate::layout::{LayoutError, LayoutHints, NodeRole, position_tree};

    fn config() -> LayoutConfig {
        LayoutConfig {
            include_siblings_of_focal: true,
            single_parent_placeholder_enabled: false,
            ..LayoutConfig::default()
        }
    }

    fn family() -> Vec<Person> {
        vec![
            Person::new("dad").with_gender(Gender::Male).with_children(["me", "sis", "half_d"]),
            Person::new("mom").with_gender(Gender::Female).with_children(["me", "sis", "half_m"]),
            Person::new("me").with_parents(["dad", "mom"]),
            Person::new("sis").with_parents(["dad", "mom"]),
            Person::new("half_d").with_parents(["dad"]),
            Person::new("half_m").with_parents(["other", "mom"]),
            Person::new("other").with_gender(Gender::Male).with_children(["half_m"]),
        ]
    }

    #[test]
    fn half_siblings_go_outermost() {
        let tree = position_tree(&family(), Some("me"), &config(), &LayoutHints::default()).unwrap();
        let x = |id: &str| tree.node(id).unwrap().x;
        assert_eq!(x("half_d"), x("me") - 250.0);
        assert_eq!(x("sis"), x("me") + 250.0);
        assert_eq!(x("half_m"), x("me") + 500.0);

        let sis = tree.node("sis").unwrap();
        assert_eq!(sis.role, NodeRole::Sibling);
        assert_eq!(sis.depth, 0);
        assert_eq!(sis.y, 0.0);
        assert_eq!(sis.parent_nodes, vec!["dad", "mom"]);
        assert_eq!(tree.node("half_m").unwrap().parent_nodes, vec!["mom"]);
    }

    #[test]
    fn siblings_are_skipped_when_ancestry_is_trimmed() {
        let config = LayoutConfig {
            ancestry_depth_limit: Some(0),
            ..config()
        };
        let tree = position_tree(&family(), Some("me"), &config, &LayoutHints::default()).unwrap();
        assert!(tree.node("sis").is_none());
    }

    #[test]
    fn comparator_orders_full_siblings() {
        let hints = LayoutHints::default().with_child_order(|a, b| b.id.cmp(&a.id));
        let tree = position_tree(&family(), Some("me"), &config(), &hints).unwrap();
        // Reverse id order puts "sis" before "me"; half siblings stay outermost.
        let x = |id: &str| tree.node(id).unwrap().x;
        assert!(x("half_d") < x("sis"));
        assert!(x("sis") < x("me"));
        assert!(x("me") < x("half_m"));
    }

    #[test]
    fn siblings_without_parent_nodes_fail() {
        // "me" lists itself as a parent, so the ancestry side never expands.
        let persons = vec![
            Person::new("me").with_parents(["me"]).with_children(["sib"]),
            Person::new("sib").with_parents(["me"]),
        ];
        let err = position_tree(&persons, Some("me"), &config(), &LayoutHints::default()).unwrap_err();
        assert_eq!(
            err,
            LayoutError::SiblingsWithoutParents {
                focal: "me".to_string()
            }
        );
    }
}
