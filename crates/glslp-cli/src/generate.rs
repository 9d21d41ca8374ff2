//! `glslp generate`, writes the sources of every variant and a manifest describing them.

use std::{
    collections::{BTreeMap, HashSet},
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use glslp::{
    GenerateVariantError, InputClass, MutatorValue, ShaderProgram, ShaderVariableBlockInfo,
    ShaderVariableDataType, Variant,
};
use rayon::prelude::*;
use serde::Serialize;

use crate::{config::ProgramArgs, user_output};

/// `glslp generate` arguments
#[derive(clap::Parser, Debug, Clone)]
#[non_exhaustive]
pub struct Generate {
    /// The shader program and how to parse it.
    #[clap(flatten)]
    pub program: ProgramArgs,

    /// Directory the variant sources and the manifest are written to.
    #[clap(long, value_name = "DIR")]
    pub output_dir: PathBuf,

    /// Only generate the mutation with these values, one `NAME=VALUE` per mutator.
    #[clap(long = "mutation", value_name = "NAME=VALUE", value_parser = parse_assignment)]
    pub mutation: Vec<(String, MutatorValue)>,

    /// Name of the manifest written to the output directory.
    #[clap(long, default_value = "manifest.json")]
    pub manifest_file: String,
}

/// The `manifest.json` written next to the sources.
#[derive(Debug, Clone, Serialize)]
#[non_exhaustive]
pub struct Manifest {
    /// Path of the shader program, relative to the output directory when possible.
    pub program: String,
    /// Names of the mutators, in the order of every mutation below.
    pub mutators: Vec<String>,
    /// Every generated variant.
    pub variants: Vec<ManifestVariant>,
}

/// One variant of the [`Manifest`].
#[derive(Debug, Clone, Serialize)]
#[non_exhaustive]
pub struct ManifestVariant {
    /// The canonical mutation of the variant.
    pub mutation: Vec<MutatorValue>,
    /// File of each stage, relative to the output directory, keyed by stage name.
    pub sources: BTreeMap<String, String>,
    /// The inputs the variant uses.
    pub active_inputs: Vec<ManifestInput>,
    /// Size of the uniform block in bytes.
    pub uniform_block_size: u32,
    /// Whether the uniform block lives in push constants.
    pub uses_push_constants: bool,
}

/// An active input of a [`ManifestVariant`].
#[derive(Debug, Clone, Serialize)]
#[non_exhaustive]
pub struct ManifestInput {
    /// Name of the input.
    pub name: String,
    /// How the input reaches the shader.
    pub class: InputClass,
    /// Type of the input.
    pub data_type: ShaderVariableDataType,
    /// Placement inside the uniform block.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_info: Option<ShaderVariableBlockInfo>,
    /// Descriptor binding of textures and samplers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binding: Option<u32>,
    /// First specialization constant id of constants.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spec_constant_id: Option<u32>,
}

/// Parses a `NAME=VALUE` mutator assignment.
fn parse_assignment(text: &str) -> Result<(String, MutatorValue), String> {
    let (name, value) = text
        .split_once('=')
        .ok_or_else(|| format!("expected `NAME=VALUE`, found `{text}`"))?;
    let value = value
        .trim()
        .parse()
        .map_err(|err| format!("invalid value for `{name}`: {err}"))?;
    Ok((name.trim().to_owned(), value))
}

impl Generate {
    /// Entrypoint
    ///
    /// # Errors
    /// If the program can not be parsed, a file can not be written, or a variant fails to
    /// generate. Variants that generate fine are written regardless.
    #[inline]
    pub fn run<W: Write>(&self, mut writer: W) -> anyhow::Result<()> {
        let program = self.program.load()?;
        let mutations = self.canonical_mutations(&program)?;
        user_output!(
            &mut writer,
            "Generating {} variants of {}...\n",
            mutations.len(),
            self.program.file.display()
        )?;

        log::debug!(
            "ensuring output-dir '{}' exists",
            self.output_dir.display()
        );
        std::fs::create_dir_all(&self.output_dir).with_context(|| {
            format!("could not create output dir '{}'", self.output_dir.display())
        })?;
        let output_dir = dunce::canonicalize(&self.output_dir)?;

        let results: Vec<Result<Variant, GenerateVariantError>> = mutations
            .par_iter()
            .map(|mutation| program.generate_variant(mutation))
            .collect();

        let stem = Path::new(program.file_name())
            .file_stem()
            .context("couldn't parse the file stem of the shader program")?
            .to_string_lossy()
            .into_owned();
        let mut variants = Vec::with_capacity(results.len());
        let mut failures = 0_usize;
        for (idx, result) in results.into_iter().enumerate() {
            match result {
                Ok(variant) => {
                    let entry = variants.len();
                    variants.push(write_variant(&program, &variant, &output_dir, &stem, entry)?);
                }
                Err(err) => {
                    failures += 1;
                    let mutation = mutations.get(idx).map(Vec::as_slice).unwrap_or_default();
                    log::error!("variant {mutation:?} of {}: {err}", program.file_name());
                }
            }
        }

        let manifest = Manifest {
            program: self.program_path(&output_dir),
            mutators: program
                .mutators()
                .iter()
                .map(|mutator| mutator.name().to_owned())
                .collect(),
            variants,
        };
        let manifest_path = output_dir.join(&self.manifest_file);
        let json = serde_json::to_string_pretty(&manifest)?;
        std::fs::write(&manifest_path, json).with_context(|| {
            format!(
                "could not write shader manifest file '{}'",
                manifest_path.display()
            )
        })?;
        log::info!("wrote manifest to '{}'", manifest_path.display());

        anyhow::ensure!(
            failures == 0,
            "{failures} of {} variants failed to generate",
            mutations.len()
        );
        Ok(())
    }

    /// The distinct canonical mutations to generate, in enumeration order.
    fn canonical_mutations(&self, program: &ShaderProgram) -> anyhow::Result<Vec<Vec<MutatorValue>>> {
        let raw: Vec<Vec<MutatorValue>> = if self.mutation.is_empty() {
            program.mutations().collect()
        } else {
            vec![self.requested_mutation(program)?]
        };

        let mut seen = HashSet::new();
        let mut canonical = Vec::new();
        for mut mutation in raw {
            program.canonicalize_mutation(&mut mutation)?;
            if seen.insert(mutation.clone()) {
                canonical.push(mutation);
            }
        }
        Ok(canonical)
    }

    /// Orders the `--mutation` assignments like the program's mutators.
    fn requested_mutation(&self, program: &ShaderProgram) -> anyhow::Result<Vec<MutatorValue>> {
        for (name, _) in &self.mutation {
            anyhow::ensure!(
                program.mutator(name).is_some(),
                "`{}` declares no mutator `{name}`",
                program.file_name()
            );
        }

        let mutation = program
            .mutators()
            .iter()
            .map(|mutator| {
                self.mutation
                    .iter()
                    .rev()
                    .find(|(name, _)| name == mutator.name())
                    .map(|&(_, value)| value)
                    .with_context(|| format!("missing `--mutation {}=VALUE`", mutator.name()))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        program.validate_mutation(&mutation)?;
        Ok(mutation)
    }

    /// Path of the shader program as recorded in the manifest.
    fn program_path(&self, output_dir: &Path) -> String {
        use relative_path::PathExt as _;
        let file = dunce::canonicalize(&self.program.file).unwrap_or_else(|_| self.program.file.clone());
        file.relative_to(output_dir).map_or_else(
            |_| file.display().to_string(),
            |relative| relative.to_string(),
        )
    }
}

/// Writes the sources of one variant, returning its manifest entry.
fn write_variant(
    program: &ShaderProgram,
    variant: &Variant,
    output_dir: &Path,
    stem: &str,
    idx: usize,
) -> anyhow::Result<ManifestVariant> {
    let mut sources = BTreeMap::new();
    for (stage, source) in variant.sources() {
        let file_name = format!("{stem}_{idx}.{}.glsl", stage.pragma_name());
        let path = output_dir.join(&file_name);
        log::debug!("writing {}", path.display());
        std::fs::write(&path, source)
            .with_context(|| format!("could not write '{}'", path.display()))?;
        sources.insert(stage.pragma_name().to_owned(), file_name);
    }

    let active_inputs = program
        .inputs()
        .iter()
        .filter(|input| variant.is_input_active(input))
        .map(|input| ManifestInput {
            name: input.name().to_owned(),
            class: input.class(),
            data_type: input.data_type(),
            block_info: variant.block_info(input),
            binding: variant.binding(input),
            spec_constant_id: input.spec_constant_id(),
        })
        .collect();

    Ok(ManifestVariant {
        mutation: variant.mutation().to_vec(),
        sources,
        active_inputs,
        uniform_block_size: variant.uniform_block_size(),
        uses_push_constants: variant.uses_push_constants(),
    })
}
