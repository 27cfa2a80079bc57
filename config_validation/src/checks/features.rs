use std::collections::{BTreeMap, HashMap, HashSet};

use serde_json::Value;

use super::{CheckResult, all_features, features, name_of};
use crate::{
    constants::*,
    error::ConfigValidationError,
};

/// Checks that no two features, input or output, share a name.
pub fn check_feature_names_unique(config: &Value) -> CheckResult {
    let mut seen: HashMap<&str, String> = HashMap::new();

    for (section, i, feature) in all_features(config) {
        let name = name_of(feature);
        let path = format!("{section}[{i}].{NAME}");

        if let Some(first) = seen.get(name) {
            return Err(ConfigValidationError::new(
                "unique feature names",
                format!("feature name '{name}' is used by both {first} and {path}"),
            )
            .at(first.clone(), Value::from(name))
            .at(path, Value::from(name)));
        }

        seen.insert(name, path);
    }

    Ok(())
}

/// Checks that every `tied` reference names an existing input feature.
pub fn check_tied_features_are_valid(config: &Value) -> CheckResult {
    let input_features = features(config, INPUT_FEATURES);
    let names: HashSet<&str> = input_features.iter().map(name_of).collect();

    for (i, feature) in input_features.iter().enumerate() {
        let Some(tied) = feature.get(TIED).filter(|t| !t.is_null()) else {
            continue;
        };

        if !tied.as_str().is_some_and(|t| names.contains(t)) {
            return Err(ConfigValidationError::new(
                "tied feature exists",
                format!(
                    "input feature '{}' is tied to {tied}, which is not an input feature",
                    name_of(feature)
                ),
            )
            .at(format!("{INPUT_FEATURES}[{i}].{TIED}"), tied.clone()));
        }
    }

    Ok(())
}

/// Checks that every output feature dependency exists and that dependencies form no cycle.
pub fn check_dependent_features(config: &Value) -> CheckResult {
    let output_features = features(config, OUTPUT_FEATURES);
    let names: HashSet<&str> = output_features.iter().map(name_of).collect();
    let mut graph: BTreeMap<&str, Vec<&str>> = BTreeMap::new();

    for (i, feature) in output_features.iter().enumerate() {
        let name = name_of(feature);
        let deps = feature
            .get(DEPENDENCIES)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        let edges = graph.entry(name).or_default();

        for (j, dep) in deps.iter().enumerate() {
            let Some(dep_name) = dep.as_str().filter(|d| names.contains(d)) else {
                return Err(ConfigValidationError::new(
                    "dependent feature exists",
                    format!(
                        "output feature '{name}' depends on {dep}, which is not an output feature"
                    ),
                )
                .at(format!("{OUTPUT_FEATURES}[{i}].{DEPENDENCIES}[{j}]"), dep.clone()));
            };
            edges.push(dep_name);
        }
    }

    if let Some(cycle) = find_cycle(&graph) {
        let path = cycle.join(" -> ");
        return Err(ConfigValidationError::new(
            "acyclic feature dependencies",
            format!("output feature dependencies form a cycle: {path}"),
        )
        .at(
            format!("{OUTPUT_FEATURES}.{DEPENDENCIES}"),
            Value::from(cycle.iter().map(|n| Value::from(*n)).collect::<Vec<_>>()),
        ));
    }

    Ok(())
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Visiting,
    Done,
}

/// Returns one dependency cycle, first node repeated at the end, if any exists.
fn find_cycle<'a>(graph: &BTreeMap<&'a str, Vec<&'a str>>) -> Option<Vec<&'a str>> {
    let mut marks: HashMap<&str, Mark> = HashMap::new();
    let mut stack: Vec<&str> = Vec::new();

    for &start in graph.keys() {
        if let Some(cycle) = visit(start, graph, &mut marks, &mut stack) {
            return Some(cycle);
        }
    }

    None
}

fn visit<'a>(
    node: &'a str,
    graph: &BTreeMap<&'a str, Vec<&'a str>>,
    marks: &mut HashMap<&'a str, Mark>,
    stack: &mut Vec<&'a str>,
) -> Option<Vec<&'a str>> {
    match marks.get(node) {
        Some(Mark::Done) => return None,
        Some(Mark::Visiting) => {
            let start = stack.iter().position(|n| *n == node).unwrap_or_default();
            let mut cycle = stack[start..].to_vec();
            cycle.push(node);
            return Some(cycle);
        }
        None => {}
    }

    marks.insert(node, Mark::Visiting);
    stack.push(node);

    for &next in graph.get(node).into_iter().flatten() {
        if let Some(cycle) = visit(next, graph, marks, stack) {
            return Some(cycle);
        }
    }

    stack.pop();
    marks.insert(node, Mark::Done);
    None
}
