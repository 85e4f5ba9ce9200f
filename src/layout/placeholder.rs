use tracing::{debug, warn};

use crate::ir::{Family, Gender, Person};

/// Suffix of synthesized partner ids.
pub const PLACEHOLDER_SUFFIX: &str = "--to-add";

/// Gives every single-parent child a synthetic second parent.
///
/// Runs on the per-pass copy of the family: each real person with children
/// gets at most one `to_add` partner, reused when one already exists, and that
/// partner becomes the missing parent of every affected child. New persons are
/// appended after the existing ones. Returns how many were created.
pub fn synthesize_placeholders(stash: &mut Family) -> usize {
    let original_len = stash.len();
    let mut created = 0;

    for idx in 0..original_len {
        let person = stash.at(idx);
        if person.is_placeholder() || person.relationships.children.is_empty() {
            continue;
        }
        let person_id = person.id.clone();
        let children = person.relationships.children.clone();
        let mut placeholder: Option<usize> = None;

        for child_id in &children {
            let Some(child_idx) = stash.position(child_id) else {
                warn!(person = %person_id, child = %child_id, "skipping dangling child id");
                continue;
            };
            let resolvable = resolvable_parents(stash, child_idx);
            if resolvable.len() != stash.at(child_idx).relationships.parents.len() {
                debug!(child = %child_id, "dropping dangling parent ids from pass copy");
                stash.at_mut(child_idx).relationships.parents = resolvable.clone();
            }
            if resolvable.len() >= 2 {
                continue;
            }
            if !resolvable.contains(&person_id) {
                warn!(
                    person = %person_id,
                    child = %child_id,
                    "child does not list this person as a parent"
                );
                continue;
            }

            let placeholder_idx = match placeholder {
                Some(existing) => existing,
                None => {
                    let (found, is_new) = find_or_create_partner(stash, idx);
                    if is_new {
                        created += 1;
                    }
                    placeholder = Some(found);
                    found
                }
            };
            let placeholder_id = stash.at(placeholder_idx).id.clone();
            stash
                .at_mut(placeholder_idx)
                .relationships
                .children
                .push(child_id.clone());
            stash
                .at_mut(child_idx)
                .relationships
                .parents
                .push(placeholder_id);
        }
    }

    if created > 0 {
        debug!(created, "synthesized placeholder parents");
    }
    created
}

fn resolvable_parents(stash: &Family, child_idx: usize) -> Vec<String> {
    stash
        .at(child_idx)
        .relationships
        .parents
        .iter()
        .filter(|id| stash.contains(id))
        .cloned()
        .collect()
}

fn find_or_create_partner(stash: &mut Family, person_idx: usize) -> (usize, bool) {
    let person = stash.at(person_idx);
    let existing = person
        .relationships
        .spouses
        .iter()
        .filter_map(|id| stash.position(id))
        .find(|&spouse| stash.at(spouse).to_add);
    if let Some(existing) = existing {
        return (existing, false);
    }

    let person_id = person.id.clone();
    let gender = Gender::partner_of(person.gender());
    let id = unique_placeholder_id(stash, &person_id);
    let mut partner = Person::new(id.clone())
        .with_gender(gender)
        .with_spouses([person_id]);
    partner.to_add = true;

    stash.at_mut(person_idx).relationships.spouses.push(id);
    (stash.push(partner), true)
}

fn unique_placeholder_id(stash: &Family, person_id: &str) -> String {
    let base = format!("{person_id}{PLACEHOLDER_SUFFIX}");
    if !stash.contains(&base) {
        return base;
    }
    (2..)
        .map(|n| format!("{base}-{n}"))
        .find(|candidate| !stash.contains(candidate))
        .unwrap_or(base)
}
