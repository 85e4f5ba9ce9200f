use crate::config::{load_config, LayoutParameter, LinkStyle};
use crate::layout::Layout;
use crate::layout_dump::TreeDump;
use crate::parser::{format_for_export, parse_records};
use crate::store::Store;
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "famtree", version, about = "Family tree layout and link routing")]
pub struct Args {
    /// Input file (JSON list of persons) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file. Defaults to stdout if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "layout")]
    pub output_format: OutputFormat,

    /// Config JSON file (layout parameters and focal id)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Focal person id. Defaults to the config's, then the first person.
    #[arg(short = 'f', long = "focal")]
    pub focal: Option<String>,

    /// Lay generations out left to right
    #[arg(long = "horizontal")]
    pub horizontal: bool,

    #[arg(short = 's', long = "linkStyle", value_enum)]
    pub link_style: Option<LinkStyleArg>,

    #[arg(long = "ancestryDepth")]
    pub ancestry_depth: Option<usize>,

    #[arg(long = "progenyDepth")]
    pub progeny_depth: Option<usize>,

    /// Place the focal person's siblings
    #[arg(long = "siblings")]
    pub siblings: bool,

    /// Do not synthesize placeholder partners for single parents
    #[arg(long = "noPlaceholders")]
    pub no_placeholders: bool,

    /// Only direct relatives of the focal person
    #[arg(long = "oneLevel")]
    pub one_level: bool,

    /// Force legacy father/mother fields when exporting data
    #[arg(long = "legacy")]
    pub legacy: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Positioned nodes, routed links and dimensions
    Layout,
    /// Normalized person records
    Data,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum LinkStyleArg {
    Elbow,
    Smooth,
    Legacy,
}

impl From<LinkStyleArg> for LinkStyle {
    fn from(value: LinkStyleArg) -> Self {
        match value {
            LinkStyleArg::Elbow => LinkStyle::Elbow,
            LinkStyleArg::Smooth => LinkStyle::Smooth,
            LinkStyleArg::Legacy => LinkStyle::Legacy,
        }
    }
}

pub fn run() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let config = load_config(args.config.as_deref())
        .with_context(|| format!("failed to load config {:?}", args.config))?;

    let input = read_input(args.input.as_deref())?;
    let records = parse_records(&input)?;

    let mut store = Store::new(config.layout);
    store.set_records(&records)?;
    for parameter in parameter_overrides(&args) {
        store.set_parameter(parameter);
    }
    if let Some(focal) = args.focal.or(config.focal_id) {
        store.set_focal(focal);
    }

    let output = match args.output_format {
        OutputFormat::Layout => {
            let tree = store.recompute()?.clone();
            let layout = Layout {
                tree,
                links: store.links().to_vec(),
            };
            serde_json::to_string_pretty(&TreeDump::from_layout(&layout))?
        }
        OutputFormat::Data => {
            let legacy = args.legacy || store.legacy_format();
            serde_json::to_string_pretty(&format_for_export(store.persons(), legacy)?)?
        }
    };
    info!(persons = store.persons().len(), format = ?args.output_format, "writing output");
    write_output(&output, args.output.as_deref())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn parameter_overrides(args: &Args) -> Vec<LayoutParameter> {
    let mut parameters = Vec::new();
    if args.horizontal {
        parameters.push(LayoutParameter::IsHorizontal(true));
    }
    if let Some(style) = args.link_style {
        parameters.push(LayoutParameter::LinkStyle(style.into()));
    }
    if let Some(depth) = args.ancestry_depth {
        parameters.push(LayoutParameter::AncestryDepthLimit(Some(depth)));
    }
    if let Some(depth) = args.progeny_depth {
        parameters.push(LayoutParameter::ProgenyDepthLimit(Some(depth)));
    }
    if args.siblings {
        parameters.push(LayoutParameter::IncludeSiblingsOfFocal(true));
    }
    if args.no_placeholders {
        parameters.push(LayoutParameter::SingleParentPlaceholderEnabled(false));
    }
    if args.one_level {
        parameters.push(LayoutParameter::OneLevelRels(true));
    }
    parameters
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path {
        if path != Path::new("-") {
            return std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()));
        }
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn write_output(contents: &str, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => std::fs::write(path, contents)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(contents.as_bytes())?;
            stdout.write_all(b"\n")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_become_parameters() {
        let args = Args::parse_from([
            "famtree",
            "--horizontal",
            "--linkStyle",
            "smooth",
            "--ancestryDepth",
            "2",
            "--oneLevel",
        ]);
        assert_eq!(
            parameter_overrides(&args),
            vec![
                LayoutParameter::IsHorizontal(true),
                LayoutParameter::LinkStyle(LinkStyle::Smooth),
                LayoutParameter::AncestryDepthLimit(Some(2)),
                LayoutParameter::OneLevelRels(true),
            ]
        );
        assert_eq!(args.output_format, OutputFormat::Layout);
    }

    #[test]
    fn json5_input_reaches_the_store() {
        let records = parse_records("[{id: 'a', rels: {},},]").unwrap();
        let mut store = Store::default();
        store.set_records(&records).unwrap();
        assert_eq!(store.focal_id(), Some("a"));
        assert!(!store.legacy_format());
    }
}
