//! Manage and merge the sources of config:
//! the `glslp.toml` file and the command line arguments.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use glslp::{ParserConfig, ShaderProgram, ShaderProgramParser};
use serde::{Deserialize, Serialize};

use crate::{filesystem::DirFilesystem, merge::merge};

/// Name of the config file looked up next to the shader program.
pub const CONFIG_FILE_NAME: &str = "glslp.toml";

/// Contents of a `glslp.toml`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
#[non_exhaustive]
pub struct ConfigFile {
    /// Directories searched for includes, relative to the config file.
    pub include_paths: Vec<PathBuf>,
    /// Parser settings.
    pub parser: ParserConfig,
}

impl ConfigFile {
    /// Reads and parses the config file at `path`.
    ///
    /// Relative include paths are resolved against the directory of the file.
    ///
    /// # Errors
    /// If the file can not be read or is not valid.
    #[inline]
    pub fn read(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("could not read config file '{}'", path.display()))?;
        let mut config: Self = toml::from_str(&text)
            .with_context(|| format!("could not parse config file '{}'", path.display()))?;

        if let Some(dir) = path.parent() {
            for include_path in &mut config.include_paths {
                if include_path.is_relative() {
                    *include_path = dir.join(&*include_path);
                }
            }
        }
        Ok(config)
    }

    /// Reads `explicit` if given, else the `glslp.toml` in `shader_dir` if there is one.
    ///
    /// # Errors
    /// If the selected file can not be read or is not valid.
    #[inline]
    pub fn discover(explicit: Option<&Path>, shader_dir: &Path) -> anyhow::Result<Self> {
        if let Some(path) = explicit {
            return Self::read(path);
        }

        let default_path = shader_dir.join(CONFIG_FILE_NAME);
        if default_path.is_file() {
            log::debug!("using config file '{}'", default_path.display());
            Self::read(&default_path)
        } else {
            Ok(Self::default())
        }
    }
}

/// Arguments shared by every command that reads a shader program.
#[derive(clap::Parser, Debug, Clone)]
#[non_exhaustive]
pub struct ProgramArgs {
    /// The `.glslp` shader program.
    pub file: PathBuf,

    /// Directory searched for includes, after the directory of the shader program and the
    /// config file's include paths. Can be repeated.
    #[clap(long = "include-path", value_name = "DIR")]
    pub include_paths: Vec<PathBuf>,

    /// Config file to use instead of the `glslp.toml` next to the shader program.
    #[clap(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Parser settings, overriding the config file.
    #[clap(flatten)]
    pub parser: ParserConfig,
}

impl ProgramArgs {
    /// Resolves the config and parses the shader program.
    ///
    /// # Errors
    /// If the config is invalid, a search directory is missing, or the program fails to parse.
    #[inline]
    pub fn load(&self) -> anyhow::Result<ShaderProgram> {
        let file = dunce::canonicalize(&self.file).with_context(|| {
            format!("shader program '{}' does not exist", self.file.display())
        })?;
        let shader_dir = file
            .parent()
            .context("shader program has no parent directory")?;
        let name = file
            .file_name()
            .context("couldn't parse the file name of the shader program")?
            .to_string_lossy()
            .into_owned();

        let config_file = ConfigFile::discover(self.config.as_deref(), shader_dir)?;
        let parser_config = merge(&config_file.parser, &self.parser)?;
        log::debug!("parsing with final merged settings: {parser_config:#?}");

        let search_dirs = core::iter::once(shader_dir.to_path_buf())
            .chain(config_file.include_paths)
            .chain(self.include_paths.iter().cloned());
        let filesystem =
            DirFilesystem::new(search_dirs).context("an include path does not exist")?;

        let program = ShaderProgramParser::new(name, &filesystem, parser_config)
            .parse()
            .with_context(|| format!("could not parse '{}'", file.display()))?;
        Ok(program)
    }
}

#[cfg(test)]
mod test {
    use std::fs;

    use clap::Parser as _;
    use glslp::{GpuVendor, PackingRule, UniformStorage};

    use super::*;

    const PROGRAM: &str = "#include \"lib.glsl\"\n#pragma anki start comp\nvoid main() {}\n#pragma anki end\n";

    #[test_log::test]
    fn reads_the_config_next_to_the_shader() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("include")).unwrap();
        fs::write(dir.path().join("include/lib.glsl"), "#define LIB 1\n").unwrap();
        fs::write(dir.path().join("blit.glslp"), PROGRAM).unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "include_paths = [\"include\"]\n\n[parser]\npush_constants_size = 256\ngpu_vendor = \"nvidia\"\n",
        )
        .unwrap();

        let args = ProgramArgs::parse_from([
            "glslp".as_ref(),
            dir.path().join("blit.glslp").as_os_str(),
            "--gpu-vendor".as_ref(),
            "intel".as_ref(),
        ]);
        let program = args.load().unwrap();
        assert_eq!(program.file_name(), "blit.glslp");
        assert_eq!(program.config().push_constants_size, 256);
        assert_eq!(program.config().gpu_vendor, GpuVendor::Intel);
    }

    #[test_log::test]
    fn includes_fail_without_an_include_path() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("blit.glslp"), PROGRAM).unwrap();

        let args = ProgramArgs::parse_from(["glslp".as_ref(), dir.path().join("blit.glslp").as_os_str()]);
        let err = args.load().unwrap_err();
        assert!(err.downcast_ref::<glslp::ParseError>().is_some(), "{err:?}");
    }

    #[test_log::test]
    fn include_paths_from_the_command_line() {
        let dir = tempfile::tempdir().unwrap();
        let include = tempfile::tempdir().unwrap();
        fs::write(include.path().join("lib.glsl"), "#define LIB 1\n").unwrap();
        fs::write(dir.path().join("blit.glslp"), PROGRAM).unwrap();

        let args = ProgramArgs::parse_from([
            "glslp".as_ref(),
            dir.path().join("blit.glslp").as_os_str(),
            "--include-path".as_ref(),
            include.path().as_os_str(),
        ]);
        args.load().unwrap();
    }

    #[test_log::test]
    fn explicit_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        fs::write(
            &path,
            "[parser]\npacking = \"std430\"\nuniform_storage = \"uniform_buffer\"\n",
        )
        .unwrap();

        let config = ConfigFile::discover(Some(&path), Path::new("/nonexistent")).unwrap();
        assert_eq!(config.parser.packing, PackingRule::Std430);
        assert_eq!(config.parser.uniform_storage, UniformStorage::UniformBuffer);
        assert_eq!(config.parser.backend_major, 1);
    }

    #[test_log::test]
    fn missing_default_config_is_fine_but_broken_ones_are_not() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            ConfigFile::discover(None, dir.path()).unwrap(),
            ConfigFile::default()
        );

        fs::write(dir.path().join(CONFIG_FILE_NAME), "frobnicate = true\n").unwrap();
        assert!(ConfigFile::discover(None, dir.path()).is_err());
        assert!(ConfigFile::discover(Some(&dir.path().join("absent.toml")), dir.path()).is_err());
    }
}
