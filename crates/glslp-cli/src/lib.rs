//! Command line tool for expanding `.glslp` shader programs into their variants.
//!
//! ## Inspecting a program
//!
//! `glslp show material.glslp` lists the stages, mutators, rewrite rules and inputs a program
//! declares, and how many variants its mutation space folds down to.
//!
//! ## Generating variants
//!
//! `glslp generate material.glslp --output-dir out/` canonicalizes every mutation, generates
//! each distinct variant in parallel and writes one `<stem>_<n>.<stage>.glsl` file per stage,
//! plus a `manifest.json` mapping every variant to its sources, active inputs and bindings.
//! `--mutation NAME=VALUE` restricts the output to a single mutation.
//!
//! ## Configuration
//!
//! Parser settings are read from a `glslp.toml` next to the shader program, or from the file
//! given with `--config`. Settings passed on the command line take precedence.

#![expect(clippy::pub_use, reason = "part of public API")]

pub use glslp;

use self::{generate::Generate, show::Show};

pub mod config;
pub mod filesystem;
pub mod generate;
pub mod merge;
pub mod show;

/// Central function to write to the user.
///
/// Writes to the given [`std::io::Write`] and flushes it, evaluating to an
/// [`std::io::Result`].
#[macro_export]
macro_rules! user_output {
    ($dst: expr, $($args: tt)*) => { {
        #[allow(
            clippy::allow_attributes,
            clippy::useless_attribute,
            unused_imports,
            reason = "`std::io::Write` is only sometimes called??"
        )]
        use std::io::Write as _;

        let mut writer = $dst;
        write!(writer, $($args)*).and_then(|()| writer.flush())
    } }
}

/// All of the available subcommands for `glslp`
#[derive(clap::Subcommand)]
#[non_exhaustive]
pub enum Command {
    /// Show what a shader program declares.
    Show(Show),

    /// Generate the variants of a shader program.
    Generate(Box<Generate>),
}

impl Command {
    /// Runs the command
    ///
    /// # Errors
    /// Any errors during execution, usually printed to the user
    #[inline]
    pub fn run(&self) -> anyhow::Result<()> {
        match self {
            Self::Show(show) => show.run(std::io::stdout()),
            Self::Generate(generate) => generate.run(std::io::stdout()),
        }
    }
}

/// The struct representing the main CLI.
#[derive(clap::Parser)]
#[clap(author, version, about, subcommand_required = true)]
#[non_exhaustive]
pub struct Cli {
    /// The command to run.
    #[clap(subcommand)]
    pub command: Command,
}

#[cfg(test)]
mod test {
    use clap::CommandFactory as _;

    use super::*;

    #[test_log::test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }
}
