// src/objects/flow.rs
use std::collections::HashMap;
use std::fmt::Write as _;

use super::types::{FlowNode, Pipeline};

const END: &str = "END";

struct ChartNode<'a> {
    node: &'a FlowNode,
    id: String,
    label: String,
}

/// Renders a pipeline's flow as Mermaid graph text.
///
/// Nodes are labelled by alias, else filter name, prefixed by their namespace.
/// Repeated names get `-N` suffixed ids so `jumpIf` targets stay unambiguous.
/// A pipeline without an explicit flow runs its filters in order.
pub fn flow_chart(pipeline: &Pipeline) -> String {
    let implicit: Vec<FlowNode>;
    let flow: &[FlowNode] = if pipeline.flow.is_empty() {
        implicit = pipeline
            .filters
            .iter()
            .enumerate()
            .map(|(index, filter)| FlowNode {
                filter: if filter.name.is_empty() {
                    placeholder(index)
                } else {
                    filter.name.clone()
                },
                ..FlowNode::default()
            })
            .collect();
        &implicit
    } else {
        &pipeline.flow
    };

    let mut used_ids: HashMap<String, usize> = HashMap::new();
    let nodes: Vec<ChartNode> = flow
        .iter()
        .enumerate()
        .map(|(index, node)| chart_node(node, index, &mut used_ids))
        .collect();

    let mut chart = String::from("graph TB;\nSTART((START))");
    let mut last_is_end = false;
    for node in &nodes {
        if node.label == END && !last_is_end {
            last_is_end = true;
            chart.push_str("==>END((END));\n");
            continue;
        }
        let shape = format!("{}({})", node.id, node.label);
        if last_is_end {
            chart.push_str(&shape);
            last_is_end = false;
        } else {
            chart.push_str("==>");
            chart.push_str(&shape);
        }
    }
    if !last_is_end {
        chart.push_str("==>END((END));\n");
    }

    for node in nodes.iter().filter(|n| !n.node.jump_if.is_empty()) {
        for (condition, target) in &node.node.jump_if {
            // writing to a String cannot fail
            let _ = if condition.is_empty() {
                writeln!(chart, "{}-.->{};", node.id, target)
            } else {
                writeln!(chart, "{}-.->|{}|{};", node.id, condition, target)
            };
        }
    }

    chart
}

fn placeholder(index: usize) -> String {
    format!("typing-filter-{}...", index)
}

fn chart_node<'a>(
    node: &'a FlowNode,
    index: usize,
    used_ids: &mut HashMap<String, usize>,
) -> ChartNode<'a> {
    let name = [&node.alias, &node.filter]
        .into_iter()
        .find(|n| !n.is_empty())
        .cloned()
        .unwrap_or_else(|| placeholder(index));

    if name == END {
        return ChartNode {
            node,
            id: name.clone(),
            label: name,
        };
    }

    let id = match used_ids.get_mut(&name) {
        Some(count) => {
            *count += 1;
            format!("{}-{}", name, count)
        }
        None => {
            used_ids.insert(name.clone(), 1);
            name.clone()
        }
    };

    let label = if node.namespace.is_empty() {
        name
    } else {
        format!("{}/{}", node.namespace, name)
    };

    ChartNode { node, id, label }
}
