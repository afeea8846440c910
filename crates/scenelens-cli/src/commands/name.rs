//! Single class-id lookup, with the number of remote reads it cost.

use anyhow::Result;
use scenelens_core::{MemoryReader, NameResolver, NameState};

use super::counting::CountingTransport;
use super::target::TargetArgs;

pub fn run(args: &TargetArgs, id: i32) -> Result<()> {
    let target = args.attach()?;
    let reader = MemoryReader::new(CountingTransport::new(&target.process));

    let mut names = NameResolver::from_layout(target.process.base(), &target.layout);
    let name = names.resolve(&reader, id);
    let state = match names.cached(id) {
        Some(NameState::Resolved(_)) => "resolved",
        _ => "unresolved",
    };

    println!("{} -> {} ({})", id, name, state);
    println!(
        "{} remote reads, {} bytes",
        reader.transport().reads(),
        reader.transport().bytes()
    );
    Ok(())
}
