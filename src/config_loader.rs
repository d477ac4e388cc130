use crate::config::Scenario;
use crate::topology::{NodeId, Topology};
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use log::{debug, info};
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

/// Load and validate a scenario from a YAML file
pub fn load_scenario(path: &Path) -> Result<Scenario> {
    info!("Loading scenario from: {:?}", path);

    let file = File::open(path).wrap_err_with(|| format!("Failed to open scenario '{}'", path.display()))?;
    let scenario: Scenario = serde_yaml::from_reader(file)
        .wrap_err_with(|| format!("Failed to parse scenario '{}'", path.display()))?;

    scenario.validate()?;
    Ok(scenario)
}

/// Log level requested by a scenario file, if it can be read and names one.
///
/// Runs before logging is set up, so failures are left for
/// [`load_scenario`] to report.
pub fn scenario_log_level(path: &Path) -> Option<String> {
    let file = File::open(path).ok()?;
    let scenario: Scenario = serde_yaml::from_reader(file).ok()?;
    scenario
        .general
        .log_level
        .filter(|level| level.parse::<log::LevelFilter>().is_ok())
}

/// Build a topology from a validated scenario.
///
/// Segments are created in file order. A link rejected by node policy is an
/// error, since the scenario asked for a graph that cannot exist.
pub fn build_topology(scenario: &Scenario) -> Result<Topology> {
    let mut topology = Topology::new();
    let mut index: Vec<HashMap<&str, NodeId>> = Vec::new();

    for config in &scenario.segments {
        let id = topology.add_segment();
        let segment = topology
            .segment_mut(id)
            .ok_or_else(|| eyre!("segment '{}' vanished during build", config.name))?;
        let mut names = HashMap::new();
        for name in &config.endpoints {
            names.insert(name.as_str(), segment.add_endpoint());
        }
        for bridge in &config.bridges {
            let node = segment
                .add_bridge(bridge.capacity, &bridge.id)
                .wrap_err_with(|| format!("Failed to add bridge '{}' to segment '{}'", bridge.id, config.name))?;
            names.insert(bridge.id.as_str(), node);
        }
        for router in &config.routers {
            let node = segment
                .add_router(router.capacity, &router.id)
                .wrap_err_with(|| format!("Failed to add router '{}' to segment '{}'", router.id, config.name))?;
            names.insert(router.id.as_str(), node);
        }
        debug!("Segment '{}' created with {} nodes", config.name, names.len());
        index.push(names);
    }

    for (from, to) in &scenario.links {
        let a = resolve(scenario, &index, from)?;
        let b = resolve(scenario, &index, to)?;
        if !topology.connect(a, b) {
            return Err(eyre!("Link {} - {} rejected by node policy", from, to));
        }
    }

    if scenario.general.fix_loops {
        let removed = topology.fix_loops();
        info!("Removed {} edges to break loops", removed);
    }

    info!(
        "Built topology with {} segments and {} links",
        topology.segment_count(),
        scenario.links.len()
    );
    Ok(topology)
}

fn resolve(scenario: &Scenario, index: &[HashMap<&str, NodeId>], reference: &str) -> Result<NodeId> {
    let (position, name) = scenario.lookup(reference)?;
    index
        .get(position)
        .and_then(|names| names.get(name))
        .copied()
        .ok_or_else(|| eyre!("Unresolved node reference '{}'", reference))
}
