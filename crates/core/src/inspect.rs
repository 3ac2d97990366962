//! Builder inspection
//!
//! Parses the human-readable output of the builder tool's `inspect`
//! sub-command into a [`BuilderInfo`]. The first `Name:` line names the
//! builder; every following `Name:` line starts a new node.

use crate::command::command_for;
use crate::errors::{InspectError, Result};
use crate::exec::CommandRunner;
use crate::mode::ExecutionMode;
use serde::{Serialize, Serializer};
use tracing::{debug, instrument};

/// One execution endpoint within a builder
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Node {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(
        rename = "buildkitd-flags",
        skip_serializing_if = "Option::is_none"
    )]
    pub buildkitd_flags: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buildkit: Option<String>,
    #[serde(
        serialize_with = "serialize_platforms",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub platforms: Vec<String>,
}

impl Node {
    fn is_empty(&self) -> bool {
        *self == Node::default()
    }

    /// Platforms joined the way they are published (`a,b,c`)
    pub fn platforms_csv(&self) -> String {
        self.platforms.join(",")
    }
}

fn serialize_platforms<S: Serializer>(platforms: &[String], serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&platforms.join(","))
}

/// Inspection result
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuilderInfo {
    pub name: Option<String>,
    pub driver: Option<String>,
    pub nodes: Vec<Node>,
}

impl BuilderInfo {
    /// Canonical representative node for summary outputs
    pub fn first_node(&self) -> Option<&Node> {
        self.nodes.first()
    }

    /// Nodes serialized as pretty JSON for the `nodes` output
    pub fn nodes_json(&self) -> String {
        serde_json::to_string_pretty(&self.nodes).unwrap_or_else(|_| "[]".to_string())
    }
}

/// Parse `inspect` output
pub fn parse_inspect_output(output: &str) -> BuilderInfo {
    let mut builder = BuilderInfo::default();
    let mut node = Node::default();

    for line in output.trim().lines() {
        let mut parts = line.split(':');
        let key = parts.next().unwrap_or_default().trim_end();
        let value = parts.map(str::trim).collect::<Vec<_>>().join(":");
        if key.is_empty() || value.is_empty() {
            continue;
        }

        match key.to_lowercase().as_str() {
            "name" => {
                if builder.name.is_none() {
                    builder.name = Some(value);
                } else {
                    if !node.is_empty() {
                        builder.nodes.push(std::mem::take(&mut node));
                    }
                    node.name = Some(value);
                }
            }
            "driver" => builder.driver = Some(value),
            "endpoint" => node.endpoint = Some(value),
            "status" => node.status = Some(value),
            "flags" | "buildkit daemon flags" => node.buildkitd_flags = Some(value),
            "buildkit" | "buildkit version" => node.buildkit = Some(value),
            "platforms" => node.platforms = parse_platforms(&value),
            _ => {}
        }
    }

    if !node.is_empty() {
        builder.nodes.push(node);
    }
    builder
}

/// `linux/amd64*, linux/arm64` lists user-pinned platforms with `*`; when any
/// are pinned only those are kept.
fn parse_platforms(value: &str) -> Vec<String> {
    let entries = value.split(',').map(str::trim).filter(|p| !p.is_empty());
    if value.contains('*') {
        entries
            .filter(|p| p.contains('*'))
            .map(|p| p.replace('*', ""))
            .collect()
    } else {
        entries.map(str::to_string).collect()
    }
}

/// Inspect a builder and require at least one node and a driver
#[instrument(skip(runner))]
pub async fn inspect<R: CommandRunner>(
    runner: &R,
    identity: &str,
    mode: ExecutionMode,
) -> Result<BuilderInfo> {
    let command = command_for(["inspect", identity], mode);
    let output = runner.run(&command).await?;
    let info = parse_inspect_output(&output.stdout);
    debug!("Inspected builder {:?} with {} node(s)", info.name, info.nodes.len());

    if info.driver.is_none() {
        return Err(InspectError::NoDriver {
            name: identity.to_string(),
        }
        .into());
    }
    if info.nodes.is_empty() {
        return Err(InspectError::NoNodes {
            name: identity.to_string(),
        }
        .into());
    }
    Ok(info)
}
