//! Status resolution — status string → ordered (bridge, group, color) targets.

use serde::Serialize;

use crate::config::{Config, StatusColor};

/// One group that should show a color for the resolved status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Target {
    pub bridge: String,
    pub group: String,
    pub color: StatusColor,
}

/// Resolve `status` against `config`.
///
/// Enabled bridges in insertion order, then their groups in insertion order;
/// one target per group defining the status.
pub fn resolve(config: &Config, status: &str) -> Vec<Target> {
    config
        .status_groups_for(status)
        .into_iter()
        .flat_map(|(bridge, groups)| {
            groups.into_iter().filter_map(move |group| {
                group.status_color(status).map(|color| Target {
                    bridge: bridge.to_string(),
                    group: group.name.clone(),
                    color: *color,
                })
            })
        })
        .collect()
}
