use std::path::Path;

use anyhow::{Context, Result, bail};
use scenelens_core::LayoutTable;

/// Write a layout with engine-generic defaults and zeroed build offsets.
pub fn run(output: &Path) -> Result<()> {
    if output.exists() {
        bail!("{} already exists", output.display());
    }

    let layout = LayoutTable {
        version: "unset".to_string(),
        ..Default::default()
    };
    layout
        .save(output)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!("Wrote layout template to {}", output.display());
    println!("Fill in world, names and the actor offsets before use.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_template_loads_but_needs_offsets() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("layout.toml");
        run(&path).unwrap();

        let layout = LayoutTable::load(&path).unwrap();
        assert_eq!(layout.version, "unset");
        assert!(layout.validate().is_err());

        // Refuses to overwrite.
        assert!(run(&path).is_err());
    }
}
