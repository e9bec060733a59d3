//! `config` subcommand — print or replace the stored configuration.

use super::{Context, Result, read_document, store};

pub(super) fn cmd_config_get(ctx: &Context) -> Result<()> {
    let (_, config) = ctx.load()?;
    // The document is JSON either way.
    println!("{}", config.to_json_pretty());
    Ok(())
}

pub(super) fn cmd_config_set(ctx: &Context, source: &str) -> Result<()> {
    let document = read_document(source)?;
    let (mut kv, mut config) = ctx.load()?;
    config.assimilate(&document)?;
    store::save_config(&mut kv, &config)?;

    if ctx.json {
        println!("{}", config.to_json_pretty());
        return Ok(());
    }
    let enabled = config.enabled_bridges().count();
    println!(
        "Configuration saved: {} bridges ({enabled} enabled) -> {}",
        config.bridges().len(),
        kv.path().display()
    );
    Ok(())
}
