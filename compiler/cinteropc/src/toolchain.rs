//! External C toolchain used to compile the glue file.

use std::io::ErrorKind;
use std::path::Path;
use std::process::Command;

use crate::config::ToolchainConfig;
use crate::error::DriverError;

/// Compiles a C source file into an object file.
pub trait NativeToolchain {
    fn compile(&self, source: &Path, object: &Path) -> Result<(), DriverError>;
}

/// A clang-compatible compiler driver (`cc`, `clang`, `gcc`).
#[derive(Clone, Debug)]
pub struct CcToolchain {
    command: String,
    args: Vec<String>,
}

impl CcToolchain {
    pub fn new(command: impl Into<String>) -> Self {
        CcToolchain {
            command: command.into(),
            args: Vec::new(),
        }
    }

    pub fn from_config(config: &ToolchainConfig) -> Self {
        CcToolchain {
            command: config.command.clone(),
            args: config.args.clone(),
        }
    }

    fn command(&self, source: &Path, object: &Path) -> Command {
        let mut cmd = Command::new(&self.command);
        cmd.args(&self.args)
            .arg("-c")
            .arg(source)
            .arg("-o")
            .arg(object);
        cmd
    }
}

impl NativeToolchain for CcToolchain {
    fn compile(&self, source: &Path, object: &Path) -> Result<(), DriverError> {
        let mut cmd = self.command(source, object);
        tracing::debug!(command = ?cmd, "compiling glue");

        let output = cmd.output().map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                DriverError::ToolchainNotFound {
                    command: self.command.clone(),
                    source: e,
                }
            } else {
                DriverError::io(source, e)
            }
        })?;

        if output.status.success() {
            return Ok(());
        }
        Err(DriverError::GlueLink {
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
