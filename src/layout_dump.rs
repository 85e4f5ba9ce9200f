use crate::layout::{Dimensions, Layout, LinkKind, NodeRole};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeDump {
    pub nodes: Vec<NodeDump>,
    pub links: Vec<LinkDump>,
    pub dimensions: Dimensions,
    pub focal_appearance_id: String,
    pub is_horizontal: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDump {
    pub id: String,
    pub person_id: String,
    pub x: f32,
    pub y: f32,
    pub depth: i32,
    pub role: NodeRole,
    pub is_ancestry: bool,
    pub to_add: bool,
    pub unknown: bool,
    pub duplicate_count: usize,
    pub all_rels_displayed: bool,
    pub parent_node: Option<String>,
    pub spouse_of: Option<String>,
    pub data: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkDump {
    pub id: String,
    pub kind: LinkKind,
    pub sources: Vec<String>,
    pub targets: Vec<String>,
    pub points: Vec<[f32; 2]>,
    pub path: String,
    pub curved: bool,
    pub depth: i32,
}

impl TreeDump {
    pub fn from_layout(layout: &Layout) -> Self {
        let tree = &layout.tree;
        let nodes = tree
            .nodes
            .iter()
            .map(|node| NodeDump {
                id: node.appearance_id.clone(),
                person_id: node.person.id.clone(),
                x: node.x,
                y: node.y,
                depth: node.depth,
                role: node.role,
                is_ancestry: node.is_ancestry,
                to_add: node.person.to_add,
                unknown: node.person.unknown,
                duplicate_count: node.duplicate_count,
                all_rels_displayed: node.all_rels_displayed,
                parent_node: node.parent_node.clone(),
                spouse_of: node.spouse_of.clone(),
                data: node.person.attributes.clone(),
            })
            .collect();

        let links = layout
            .links
            .iter()
            .map(|link| LinkDump {
                id: link.id.clone(),
                kind: link.kind,
                sources: link.sources.clone(),
                targets: link.targets.clone(),
                points: link.points.iter().map(|&(x, y)| [x, y]).collect(),
                path: link.path.clone(),
                curved: link.is_curved,
                depth: link.depth,
            })
            .collect();

        Self {
            nodes,
            links,
            dimensions: tree.dimensions,
            focal_appearance_id: tree.focal_appearance_id.clone(),
            is_horizontal: tree.is_horizontal,
        }
    }
}

pub fn write_tree_dump(path: &Path, layout: &Layout) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &TreeDump::from_layout(layout))?;
    writer.flush()?;
    Ok(())
}
