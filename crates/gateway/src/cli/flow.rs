//! `dmfy flow validate <file>`.

use std::path::Path;

use anyhow::Context;

use dm_flows::{CompiledFlow, FlowDefinition};

/// Read a flow JSON file.  A publish body (with `pageId`) is accepted too.
pub fn load_flow_file(path: &Path) -> anyhow::Result<FlowDefinition> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

/// Returns `false` when the flow would be rejected on publish.
pub fn validate(path: &Path) -> anyhow::Result<bool> {
    let definition = load_flow_file(path)?;

    match CompiledFlow::compile(definition) {
        Ok(flow) => {
            let def = flow.definition();
            println!(
                "Flow OK ({}): \"{}\" v{} with {} node(s), entry \"{}\"",
                path.display(),
                def.name,
                def.version,
                def.nodes.len(),
                def.entry_node_id,
            );
            Ok(true)
        }
        Err(e) => {
            println!("{}: {e}", path.display());
            Ok(false)
        }
    }
}
