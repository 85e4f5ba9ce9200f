pub mod curve;
mod dimensions;
mod hierarchy;
mod placeholder;
mod position;
mod routing;
mod siblings;
mod tidy;
pub(crate) mod types;

pub use crate::error::LayoutError;
pub use curve::build_path;
pub use dimensions::calculate_dimensions;
pub use hierarchy::{
    build_hierarchy, max_depths, trim_depth, DepthSummary, Direction, Hierarchy, HierarchyNode,
    HierarchyOptions, MAX_HIERARCHY_NODES,
};
pub use placeholder::{synthesize_placeholders, PLACEHOLDER_SUFFIX};
pub use position::position_tree;
pub use routing::{create_links, sibling_offset};
pub use tidy::tidy_layout;
pub use types::*;

use crate::config::LayoutConfig;
use crate::ir::Person;

/// A positioned tree together with its routed links.
#[derive(Debug, Clone)]
pub struct Layout {
    pub tree: Tree,
    pub links: Vec<Link>,
}

/// Positions `persons` around `focal_id` and routes every link in the
/// configured style.
pub fn compute_layout(
    persons: &[Person],
    focal_id: Option<&str>,
    config: &LayoutConfig,
    hints: &LayoutHints,
) -> Result<Layout, LayoutError> {
    let tree = position_tree(persons, focal_id, config, hints)?;
    let links = create_links(&tree, config.link_style);
    Ok(Layout { tree, links })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LinkStyle;
    use crate::ir::Gender;

    fn nuclear() -> Vec<Person> {
        vec![
            Person::new("A").with_gender(Gender::Male).with_spouses(["B"]).with_children(["C"]),
            Person::new("B").with_gender(Gender::Female).with_spouses(["A"]).with_children(["C"]),
            Person::new("C").with_parents(["A", "B"]),
        ]
    }

    #[test]
    fn layout_places_nodes_and_links() {
        let layout = compute_layout(&nuclear(), Some("C"), &LayoutConfig::default(), &LayoutHints::default())
            .unwrap();
        assert_eq!(layout.tree.len(), 3);
        assert_eq!(layout.links.len(), 2);
        assert!(layout.links.iter().all(|link| !link.path.is_empty()));
    }

    #[test]
    fn layout_is_deterministic() {
        let config = LayoutConfig {
            link_style: LinkStyle::Smooth,
            ..LayoutConfig::default()
        };
        let first = compute_layout(&nuclear(), Some("A"), &config, &LayoutHints::default()).unwrap();
        let second = compute_layout(&nuclear(), Some("A"), &config, &LayoutHints::default()).unwrap();
        let coords = |layout: &Layout| -> Vec<(String, f32, f32)> {
            layout
                .tree
                .nodes
                .iter()
                .map(|n| (n.appearance_id.clone(), n.x, n.y))
                .collect()
        };
        assert_eq!(coords(&first), coords(&second));
        assert_eq!(first.links, second.links);
    }

    #[test]
    fn links_end_at_their_nodes() {
        let layout = compute_layout(&nuclear(), Some("A"), &LayoutConfig::default(), &LayoutHints::default())
            .unwrap();
        for link in &layout.links {
            let first = link.points.first().copied();
            let last = link.points.last().copied();
            assert_eq!(first, Some(link.source_point), "{}", link.id);
            assert_eq!(last, Some(link.target_point), "{}", link.id);
            for target in &link.targets {
                assert!(layout.tree.node(target).is_some());
            }
        }
    }

    #[test]
    fn find_result_outlives_the_lookup_key() {
        let layout = compute_layout(&nuclear(), Some("C"), &LayoutConfig::default(), &LayoutHints::default())
            .unwrap();
        let node = {
            let key = String::from("A");
            layout.tree.find(&key)
        };
        assert_eq!(node.map(|n| n.depth), Some(-1));
        assert!(layout.tree.find("nobody").is_none());
    }
}
