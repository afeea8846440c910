//! One-shot snapshot export.

use std::path::Path;

use anyhow::{Context, Result};
use scenelens_core::{ClassFilter, EntitySnapshot, SnapshotBuilder};
use tracing::info;

use super::target::TargetArgs;

pub fn run(args: &TargetArgs, output: Option<&Path>) -> Result<()> {
    let target = args.attach()?;
    let reader = target.reader();

    let mut builder = SnapshotBuilder::new(
        target.layout.clone(),
        target.process.base(),
        ClassFilter::default(),
    );
    let mut snapshot = EntitySnapshot::new();
    let stats = builder.build(&reader, &mut snapshot);
    info!(
        "{:?} via {:?}: {} included, {} filtered, {} dropped",
        stats.outcome, stats.source, stats.included, stats.filtered, stats.dropped
    );

    let json = snapshot.to_json()?;
    match output {
        Some(path) => {
            std::fs::write(path, &json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Wrote {} entities to {}", snapshot.len(), path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}
