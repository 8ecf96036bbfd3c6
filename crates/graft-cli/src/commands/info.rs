//! Handler for `graft info`.

use std::collections::BTreeMap;
use std::path::Path;

use graft_core::lockfile::GraphLockFile;
use graft_resolver::DepsGraph;
use graft_util::errors::GraftError;
use miette::Result;
use serde::Serialize;

use super::Session;
use crate::cli::ResolveArgs;

#[derive(Debug, Serialize)]
struct NodeInfo {
    id: usize,
    name: String,
    reference: Option<String>,
    recipe: String,
    remote: Option<String>,
    package_id: Option<String>,
    requires: Vec<String>,
    build_requires: Vec<String>,
}

#[derive(Debug, Serialize)]
struct GraphInfo {
    nodes: Vec<NodeInfo>,
    aliases: BTreeMap<String, String>,
}

pub fn exec(args: &ResolveArgs, lockfile: Option<&Path>, json: bool) -> Result<()> {
    let lock = lockfile.map(GraphLockFile::from_path).transpose()?;
    let graph = Session::open(args)?.resolve(lock.as_ref(), &[])?;
    let info = collect(&graph);

    if json {
        let text = serde_json::to_string_pretty(&info).map_err(|e| GraftError::Generic {
            message: format!("Failed to serialize graph info: {e}"),
        })?;
        println!("{text}");
        return Ok(());
    }

    for node in &info.nodes {
        println!("{}", node.reference.as_deref().unwrap_or(&node.name));
        println!("    id: {}", node.id);
        println!("    recipe: {}", node.recipe);
        println!("    remote: {}", node.remote.as_deref().unwrap_or("None"));
        if let Some(package_id) = &node.package_id {
            println!("    package id: {package_id}");
        }
        if !node.requires.is_empty() {
            println!("    requires: {}", node.requires.join(", "));
        }
        if !node.build_requires.is_empty() {
            println!("    build requires: {}", node.build_requires.join(", "));
        }
    }
    if !info.aliases.is_empty() {
        println!("aliases:");
        for (alias, target) in &info.aliases {
            println!("    {alias} -> {target}");
        }
    }
    Ok(())
}

fn collect(graph: &DepsGraph) -> GraphInfo {
    let nodes = graph
        .nodes()
        .map(|(idx, node)| {
            let mut requires = Vec::new();
            let mut build_requires = Vec::new();
            for (dep, requirement) in graph.dependencies_of(idx) {
                let label = graph.node(dep).to_string();
                if requirement.build_require {
                    build_requires.push(label);
                } else {
                    requires.push(label);
                }
            }
            NodeInfo {
                id: node.id,
                name: node.to_string(),
                reference: node.reference.as_ref().map(ToString::to_string),
                recipe: node.recipe.to_string(),
                remote: node.remote.clone(),
                package_id: node.package_id.clone(),
                requires,
                build_requires,
            }
        })
        .collect();
    let aliases = graph
        .aliased
        .iter()
        .map(|(alias, target)| (alias.to_string(), target.to_string()))
        .collect();
    GraphInfo { nodes, aliases }
}
