//! `bridge` subcommand — set up, pair, enable and inspect bridges.

use huestatus_lib::client::{BridgeClient, GroupInfo};
use huestatus_lib::config::BridgeConfig;
use serde::Serialize;

use super::{
    BridgeSummaryJson, Context, DisableOutput, EnableOutput, HueStatusError, Result,
    UreqTransport, UserOutput, kv, kv_indent, kv_width, print_group_reports, print_json,
    read_document, store,
};

fn not_found(name: &str) -> HueStatusError {
    HueStatusError::NotFound(format!("bridge '{name}'"))
}

pub(super) fn cmd_setup(ctx: &Context, name: &str, source: &str) -> Result<()> {
    let document = read_document(source)?;
    let (mut kv_store, config) = ctx.load()?;
    let monitor = ctx.monitor(config);
    let bridge = monitor.setup_bridge(name, &document)?;
    store::save_config(&mut kv_store, &monitor.config())?;

    if ctx.json {
        return print_json(&bridge);
    }
    println!(
        "Bridge '{name}' set up with {} groups{}",
        bridge.groups.len(),
        if bridge.enabled { " (enabled)" } else { "" }
    );
    Ok(())
}

pub(super) fn cmd_enable(ctx: &Context, name: &str, force: bool) -> Result<()> {
    let (mut kv_store, config) = ctx.load()?;
    let monitor = ctx.monitor(config);
    let enabled = monitor.enable_bridge(name, force)?;
    if enabled {
        store::save_config(&mut kv_store, &monitor.config())?;
    }

    if ctx.json {
        return print_json(&EnableOutput {
            bridge: name.to_string(),
            enabled,
        });
    }
    if enabled {
        println!("Bridge '{name}' enabled");
    } else {
        println!("Bridge '{name}' not enabled (run with -v for details)");
    }
    Ok(())
}

pub(super) fn cmd_disable(ctx: &Context, name: &str) -> Result<()> {
    let (mut kv_store, config) = ctx.load()?;
    let monitor = ctx.monitor(config);
    let groups = monitor.disable_bridge(name)?;
    store::save_config(&mut kv_store, &monitor.config())?;

    if ctx.json {
        return print_json(&DisableOutput {
            bridge: name.to_string(),
            groups,
        });
    }
    println!("Bridge '{name}' disabled");
    print_group_reports(&groups);
    Ok(())
}

pub(super) fn cmd_create_user(ctx: &Context, name: &str) -> Result<()> {
    let (mut kv_store, config) = ctx.load()?;
    let monitor = ctx.monitor(config);
    let user = monitor.create_user(name)?;
    store::save_config(&mut kv_store, &monitor.config())?;

    if ctx.json {
        return print_json(&UserOutput {
            bridge: name.to_string(),
            user,
        });
    }
    println!("Paired with bridge '{name}', user stored");
    Ok(())
}

pub(super) fn cmd_set_user(ctx: &Context, name: &str, user: &str) -> Result<()> {
    let (mut kv_store, mut config) = ctx.load()?;
    config.set_user(name, user)?;
    store::save_config(&mut kv_store, &config)?;
    println!("User stored for bridge '{name}'");
    Ok(())
}

pub(super) fn cmd_set_address(ctx: &Context, name: &str, address: &str) -> Result<()> {
    let (mut kv_store, mut config) = ctx.load()?;
    config.set_address(name, address)?;
    store::save_config(&mut kv_store, &config)?;
    println!("Address stored for bridge '{name}'");
    Ok(())
}

fn summary(bridge: &BridgeConfig) -> BridgeSummaryJson {
    BridgeSummaryJson {
        name: bridge.name.clone(),
        address: bridge.address.clone(),
        paired: bridge.has_user(),
        enabled: bridge.enabled,
        groups: bridge.groups.len(),
    }
}

pub(super) fn cmd_ls(ctx: &Context) -> Result<()> {
    let (_, config) = ctx.load()?;

    if ctx.json {
        let bridges: Vec<BridgeSummaryJson> = config.bridges().iter().map(summary).collect();
        return print_json(&bridges);
    }
    if config.bridges().is_empty() {
        println!("No bridges configured.");
        return Ok(());
    }
    println!(
        "{:<16}{:<20}{:<8}{:<9}GROUPS",
        "NAME", "ADDRESS", "PAIRED", "ENABLED"
    );
    for b in config.bridges() {
        println!(
            "{:<16}{:<20}{:<8}{:<9}{}",
            b.name,
            b.address.as_deref().unwrap_or("-"),
            if b.has_user() { "yes" } else { "no" },
            if b.enabled { "yes" } else { "no" },
            b.groups.len()
        );
    }
    Ok(())
}

#[derive(Serialize)]
struct InfoOutput<'a> {
    bridge: &'a BridgeConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    device_groups: Option<Vec<GroupInfo>>,
}

fn device_groups(bridge: &BridgeConfig) -> Result<Vec<GroupInfo>> {
    let client = BridgeClient::from_config(bridge, UreqTransport::new()).ok_or_else(|| {
        HueStatusError::NotFound(format!("address or user for bridge '{}'", bridge.name))
    })?;
    Ok(client.list_groups()?.into_values().collect())
}

pub(super) fn cmd_info(ctx: &Context, name: &str, with_groups: bool) -> Result<()> {
    let (_, config) = ctx.load()?;
    let bridge = config.bridge(name).ok_or_else(|| not_found(name))?;
    let remote = if with_groups {
        Some(device_groups(bridge)?)
    } else {
        None
    };

    if ctx.json {
        return print_json(&InfoOutput {
            bridge,
            device_groups: remote,
        });
    }

    let statuses: Vec<String> = bridge
        .groups
        .iter()
        .filter_map(|g| g.status_map())
        .flat_map(|m| m.keys().map(|k| format!("{k}:")))
        .collect();
    let indent: Vec<&str> = statuses.iter().map(String::as_str).collect();
    let w = kv_width(&["Address:", "User:", "Enabled:"], &indent);

    kv("Name:", &bridge.name, w);
    kv("Address:", bridge.address.as_deref().unwrap_or("(not set)"), w);
    kv("User:", if bridge.has_user() { "(set)" } else { "(not set)" }, w);
    kv("Enabled:", bridge.enabled, w);
    for group in &bridge.groups {
        println!();
        println!("Group {}:", group.name);
        for (status, color) in group.status_map().into_iter().flatten() {
            kv_indent(&format!("{status}:"), color, w);
        }
    }

    if let Some(groups) = remote {
        println!();
        println!("Bridge groups:");
        if groups.is_empty() {
            println!("  (none)");
        }
        for g in groups {
            println!("  {:<6}{:<24}lights: {}", g.id, g.name, g.lights.join(", "));
        }
    }
    Ok(())
}
