//! Configuration commands.

use std::io::Write;
use std::path::Path;

use crate::config::ClientConfig;
use crate::error::ClientResult;

/// Dump the effective configuration as TOML.
pub fn dump(config: &ClientConfig, path: &Path, out: &mut impl Write) -> ClientResult<()> {
    writeln!(out, "# config.toml ({})", path.display())?;
    write!(out, "{}", config.to_toml()?)?;
    out.flush()?;
    Ok(())
}

/// Show the configuration file path.
pub fn path(path: &Path, out: &mut impl Write) -> ClientResult<()> {
    writeln!(out, "config: {}", path.display())?;
    Ok(())
}
