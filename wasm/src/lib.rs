use family_tree_layout::layout_dump::TreeDump;
use family_tree_layout::parser::parse_family;
use family_tree_layout::{LayoutConfig, LayoutHints, LayoutParameter, compute_layout};
use serde::Deserialize;
use serde_json::{Map, Value};
use wasm_bindgen::prelude::*;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FamilyTreeOptions {
    focal_id: Option<String>,
    #[serde(flatten)]
    parameters: Map<String, Value>,
}

fn build_layout_config(parameters: &Map<String, Value>) -> Result<LayoutConfig, String> {
    let mut config = LayoutConfig::default();
    for (key, value) in parameters {
        let parameter =
            LayoutParameter::from_key_value(key, value).map_err(|error| error.to_string())?;
        config.apply(parameter);
    }
    Ok(config)
}

fn compute(data: &str, options_json: Option<&str>) -> Result<String, String> {
    let options = match options_json {
        Some(raw) => serde_json::from_str::<FamilyTreeOptions>(raw).map_err(|error| error.to_string())?,
        None => FamilyTreeOptions::default(),
    };
    let config = build_layout_config(&options.parameters)?;
    let persons = parse_family(data).map_err(|error| error.to_string())?;
    let layout = compute_layout(
        &persons,
        options.focal_id.as_deref(),
        &config,
        &LayoutHints::default(),
    )
    .map_err(|error| error.to_string())?;
    serde_json::to_string(&TreeDump::from_layout(&layout)).map_err(|error| error.to_string())
}

#[wasm_bindgen]
pub fn compute_family_tree(data: &str, options_json: Option<String>) -> Result<String, JsValue> {
    compute(data, options_json.as_deref()).map_err(|error| JsValue::from_str(&error))
}
