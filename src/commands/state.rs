use anyhow::{Context as _, Result, bail};
use declarative::{Registry, SENSITIVE, split_address};
use serde_json::Value as Json;

use crate::Context;
use crate::cli::StateCommand;
use crate::resource::{self, Api};
use crate::state::StateFile;
use crate::ui;

pub fn run(ctx: &Context, cmd: StateCommand) -> Result<()> {
    match cmd {
        StateCommand::List => list(ctx),
        StateCommand::Show { address } => show(ctx, &address),
        StateCommand::Rm { address } => rm(ctx, &address),
    }
}

fn list(ctx: &Context) -> Result<()> {
    let state = StateFile::load(&ctx.state)?;
    if state.resources.is_empty() {
        ui::info("Nothing tracked yet");
        return Ok(());
    }
    for (address, tracked) in &state.resources {
        let id = tracked.attributes.get("id").map(ui::format_value).unwrap_or_default();
        println!("{address}  {}", id);
    }
    Ok(())
}

fn show(ctx: &Context, address: &str) -> Result<()> {
    let state = StateFile::load(&ctx.state)?;
    let tracked = state
        .get(address)
        .with_context(|| format!("{address} is not tracked"))?;

    let registry = resource::registry(&Api::offline());
    let attributes = masked(&registry, &tracked.type_name, &tracked.attributes);

    ui::header(address);
    if let Json::Object(map) = &attributes {
        for (key, value) in map {
            ui::kv(key, &ui::format_value(value));
        }
    }
    Ok(())
}

fn rm(ctx: &Context, address: &str) -> Result<()> {
    if split_address(address).is_none() {
        bail!("{address:?} is not an address of the form type.name");
    }
    let mut state = StateFile::load(&ctx.state)?;
    if state.remove(address).is_none() {
        bail!("{address} is not tracked");
    }
    state.save(&ctx.state)?;
    ui::success(&format!("Stopped tracking {address}; the entity is left in place"));
    Ok(())
}

/// Replace sensitive attributes with a placeholder
fn masked(registry: &Registry, type_name: &str, attributes: &Json) -> Json {
    let mut out = attributes.clone();
    let sensitive = registry
        .get(type_name)
        .map(|r| r.sensitive_attributes())
        .unwrap_or_default();
    if let Json::Object(map) = &mut out {
        for name in sensitive {
            if let Some(value) = map.get_mut(*name) {
                if !value.is_null() {
                    *value = Json::String(SENSITIVE.to_string());
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sensitive_attributes_masked() {
        let registry = resource::registry(&Api::offline());
        let attributes = json!({"name": "db", "sensitive_properties": [{"name": "pw", "value": "x"}]});

        let out = masked(&registry, "application", &attributes);
        assert_eq!(out["sensitive_properties"], json!(SENSITIVE));
        assert_eq!(out["name"], "db");

        let untouched = masked(&registry, "tag_member", &attributes);
        assert_eq!(untouched, attributes);
    }
}
