use anyhow::{Result, bail};
use declarative::{Tracked, import_and_read};

use crate::Context;
use crate::cli::ImportArgs;
use crate::state::StateFile;
use crate::ui;

pub fn run(ctx: &Context, args: ImportArgs) -> Result<()> {
    let address = format!("{}.{}", args.resource_type, args.name);
    if args.name.trim().is_empty() || args.name.contains('.') {
        bail!("Name {:?} must be non-empty and contain no '.'", args.name);
    }

    let mut state = StateFile::load(&ctx.state)?;
    if state.get(&address).is_some() {
        bail!("{address} is already tracked; remove it with `pamform state rm {address}` first");
    }

    let registry = super::connect(ctx, None)?;
    let Some(resource) = registry.get(&args.resource_type) else {
        let known: Vec<&str> = registry.type_names().collect();
        bail!(
            "Unknown resource type {:?}; expected one of {}",
            args.resource_type,
            known.join(", ")
        );
    };

    let attributes = import_and_read(resource.as_ref(), &args.id)?;
    state.insert(
        address.clone(),
        Tracked::new(args.resource_type, attributes),
    );
    state.save(&ctx.state)?;

    ui::success(&format!("Imported {address}"));
    Ok(())
}
