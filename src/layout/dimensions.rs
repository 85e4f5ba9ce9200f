use super::types::{Dimensions, LayoutNode, NodeRole};

/// Bounding box of the laid out nodes, padded by half a spacing on each side.
///
/// `node_sep` and `level_sep` are the separations the pass worked with, so in
/// horizontal mode they arrive swapped and are swapped back here.
pub fn calculate_dimensions(
    nodes: &[LayoutNode],
    node_sep: f32,
    level_sep: f32,
    is_horizontal: bool,
) -> Dimensions {
    let (node_sep, level_sep) = if is_horizontal {
        (level_sep, node_sep)
    } else {
        (node_sep, level_sep)
    };
    let padding_x = node_sep / 2.0;
    let padding_y = level_sep / 2.0;

    let Some(first) = nodes.first() else {
        return Dimensions {
            width: node_sep,
            height: level_sep,
            x_offset: padding_x,
            y_offset: padding_y,
            min_x: -padding_x,
            max_x: padding_x,
            min_y: -padding_y,
            max_y: padding_y,
            padding_x,
            padding_y,
            ..Dimensions::default()
        };
    };

    let (mut min_x, mut max_x) = (first.x, first.x);
    let (mut min_y, mut max_y) = (first.y, first.y);
    for node in &nodes[1..] {
        min_x = min_x.min(node.x);
        max_x = max_x.max(node.x);
        min_y = min_y.min(node.y);
        max_y = max_y.max(node.y);
    }
    min_x -= padding_x;
    max_x += padding_x;
    min_y -= padding_y;
    max_y += padding_y;

    let center = nodes
        .iter()
        .find(|node| !node.is_ancestry && node.role != NodeRole::Spouse && node.depth == 0)
        .unwrap_or(first);

    Dimensions {
        width: max_x - min_x,
        height: max_y - min_y,
        x_offset: -min_x,
        y_offset: -min_y,
        min_x,
        max_x,
        min_y,
        max_y,
        center_x: center.x,
        center_y: center.y,
        padding_x,
        padding_y,
    }
}
