//! Pointer-chain status for a layout against a live target.

use anyhow::Result;
use scenelens_core::ChainReport;

use super::target::TargetArgs;

pub fn run(args: &TargetArgs) -> Result<()> {
    let target = args.attach()?;
    let reader = target.reader();
    let report = ChainReport::walk(&reader, target.process.base(), &target.layout);

    println!("Layout {} on pid {}", target.layout.version, target.process.pid);
    println!();
    println!("World chain:");
    for hop in &report.world {
        println!("  {}", hop);
    }

    println!("Camera chain:");
    if report.camera.is_empty() {
        println!("  (not configured)");
    }
    for hop in &report.camera {
        println!("  {}", hop);
    }

    println!("Entity list: {:?}", report.list);
    match report.entity_count {
        Some(count) => println!("Entity count: {}", count),
        None => println!("Entity count: (unreadable)"),
    }

    println!();
    if report.is_complete() {
        println!("All chains resolve.");
    } else {
        println!("Some chains do not resolve; check the offsets above.");
    }
    Ok(())
}
