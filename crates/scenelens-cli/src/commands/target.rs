//! Arguments shared by every command that attaches to a target.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::Args;
use scenelens_core::{LayoutField, LayoutTable, MemoryReader, ProcessHandle};
use tracing::{debug, info};

use super::hex_utils::{parse_hex_address, parse_hex_arg};

#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Process id of the target
    #[arg(long, env = "SCENELENS_PID")]
    pub pid: i32,

    /// Module base address in hex
    #[arg(long, env = "SCENELENS_BASE", value_parser = parse_hex_arg)]
    pub base: u64,

    /// Layout file (.toml or .json)
    #[arg(short, long, default_value = "layout.toml")]
    pub layout: PathBuf,

    /// Override one layout offset, e.g. --set world=0x8a1b2c0
    #[arg(long = "set", value_parser = parse_override)]
    pub overrides: Vec<(LayoutField, u64)>,
}

/// An attached target with its validated layout.
pub struct Target {
    pub process: ProcessHandle,
    pub layout: Arc<LayoutTable>,
}

impl Target {
    pub fn reader(&self) -> MemoryReader<&ProcessHandle> {
        MemoryReader::new(&self.process)
    }
}

impl TargetArgs {
    /// Load the layout, apply overrides, validate it.
    pub fn load_layout(&self) -> Result<LayoutTable> {
        let mut layout = LayoutTable::load(&self.layout)
            .with_context(|| format!("Failed to load layout {}", self.layout.display()))?;
        for (field, value) in &self.overrides {
            debug!("Override {} = {:#x}", field, value);
            layout.set_offset(*field, *value);
        }
        layout
            .validate()
            .with_context(|| format!("Layout {} is not usable", self.layout.display()))?;
        info!("Loaded layout {}", layout.version);
        Ok(layout)
    }

    pub fn attach(&self) -> Result<Target> {
        let layout = self.load_layout()?;
        let process = ProcessHandle::attach(self.pid, self.base)
            .with_context(|| format!("Failed to attach to pid {}", self.pid))?;
        Ok(Target {
            process,
            layout: Arc::new(layout),
        })
    }
}

/// Parse `field=hex`.
pub fn parse_override(s: &str) -> Result<(LayoutField, u64), String> {
    let parse = || -> Result<(LayoutField, u64)> {
        let (name, value) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected field=value"))?;
        let field: LayoutField = name
            .trim()
            .parse()
            .map_err(|_| anyhow!("unknown layout field '{}'", name.trim()))?;
        Ok((field, parse_hex_address(value.trim())?))
    };
    parse().map_err(|e| e.to_string())
}
