use anyhow::Result;

use crate::resource::{self, Api};

pub fn run() -> Result<()> {
    let registry = resource::registry(&Api::offline());
    for type_name in registry.type_names() {
        println!("{type_name}");
    }
    Ok(())
}
