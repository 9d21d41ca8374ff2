//! Display what a shader program declares.

use std::{collections::HashSet, fmt::Write as _, io::Write};

use glslp::{InputClass, ShaderProgram};

use crate::{config::ProgramArgs, user_output};

/// `glslp show` arguments
#[derive(clap::Parser, Debug, Clone)]
#[non_exhaustive]
pub struct Show {
    /// The shader program and how to parse it.
    #[clap(flatten)]
    pub program: ProgramArgs,
}

impl Show {
    /// Entrypoint
    ///
    /// # Errors
    /// If the program can not be parsed or its rewrite rules form a cycle.
    #[inline]
    pub fn run<W: Write>(&self, mut writer: W) -> anyhow::Result<()> {
        let program = self.program.load()?;
        user_output!(&mut writer, "{}", describe(&program)?)?;
        Ok(())
    }
}

/// A human readable summary of `program`.
///
/// # Errors
/// If canonicalizing a mutation hits a rewrite cycle.
#[inline]
pub fn describe(program: &ShaderProgram) -> anyhow::Result<String> {
    let mut out = String::new();
    let stages: Vec<_> = program
        .shader_types()
        .stages()
        .map(glslp::ShaderType::pragma_name)
        .collect();
    writeln!(out, "{}", program.file_name())?;
    writeln!(out, "  stages: {}", stages.join(" "))?;
    writeln!(out, "  descriptor set: {}", program.descriptor_set())?;

    writeln!(out, "  mutators:")?;
    let instanced = program.instance_count_mutator().map(glslp::Mutator::name);
    for mutator in program.mutators() {
        let values: Vec<_> = mutator.values().iter().map(ToString::to_string).collect();
        write!(out, "    {} = {{{}}}", mutator.name(), values.join(", "))?;
        if instanced == Some(mutator.name()) {
            write!(out, " (instance count)")?;
        }
        writeln!(out)?;
    }
    writeln!(out, "  rewrite rules: {}", program.rewrites().len())?;

    writeln!(out, "  inputs:")?;
    for input in program.inputs() {
        write!(out, "    {} {:?} {}", class_name(input.class()), input.data_type(), input.name())?;
        if input.is_instanced() {
            write!(out, " (instanced)")?;
        }
        if let Some(id) = input.spec_constant_id() {
            write!(out, " constant_id = {id}")?;
        }
        if let Some(binding) = input.binding() {
            write!(out, " binding = {binding}")?;
        }
        writeln!(out)?;
    }

    let mut canonical = HashSet::new();
    for mut mutation in program.mutations() {
        program.canonicalize_mutation(&mut mutation)?;
        canonical.insert(mutation);
    }
    writeln!(
        out,
        "  mutations: {} ({} distinct variants)",
        program.mutation_space_size(),
        canonical.len()
    )?;
    Ok(out)
}

/// Short name of an input class.
const fn class_name(class: InputClass) -> &'static str {
    match class {
        InputClass::UniformBlock => "uniform",
        InputClass::Constant => "const",
        InputClass::Texture => "texture",
        InputClass::Sampler => "sampler",
    }
}

#[cfg(test)]
mod test {
    use std::fs;

    use clap::Parser as _;

    use super::*;

    const PROGRAM: &str = r"
#pragma anki mutator instanced INSTANCE_COUNT 1 2 4
#pragma anki mutator LOD 0 1
#pragma anki rewrite_mutation INSTANCE_COUNT 4 LOD 1 to INSTANCE_COUNT 4 LOD 0
#pragma anki descriptor_set 2

#pragma anki input instanced Mat4 u_mvp
#pragma anki input const Vec3 u_tint
#pragma anki input texture2D u_albedo
#pragma anki input sampler u_sampler

#pragma anki start vert
void main() { gl_Position = u_mvp[gl_InstanceID] * Vec4(u_tint, float(LOD)); }
#pragma anki end
#pragma anki start frag
void main() {}
#pragma anki end
";

    #[test_log::test]
    fn shows_the_declarations() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("mesh.glslp");
        fs::write(&file, PROGRAM).unwrap();

        let show = Show::parse_from(["glslp".as_ref(), file.as_os_str()]);
        let mut output = Vec::new();
        show.run(&mut output).unwrap();
        let output = String::from_utf8(output).unwrap();

        assert!(output.starts_with("mesh.glslp\n"), "{output}");
        assert!(output.contains("  stages: vert frag\n"), "{output}");
        assert!(output.contains("  descriptor set: 2\n"), "{output}");
        assert!(output.contains("    INSTANCE_COUNT = {1, 2, 4} (instance count)\n"), "{output}");
        assert!(output.contains("    LOD = {0, 1}\n"), "{output}");
        assert!(output.contains("  rewrite rules: 1\n"), "{output}");
        assert!(output.contains("    uniform Mat4 u_mvp (instanced)\n"), "{output}");
        assert!(output.contains("    const Vec3 u_tint constant_id = 0\n"), "{output}");
        assert!(output.contains("    texture Texture2D u_albedo binding = 1\n"), "{output}");
        assert!(output.contains("    sampler Sampler u_sampler binding = 2\n"), "{output}");
        assert!(output.contains("  mutations: 6 (5 distinct variants)\n"), "{output}");
    }

    #[test_log::test]
    fn unparsable_programs_fail() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("broken.glslp");
        fs::write(&file, "#pragma anki mutator\n").unwrap();

        let show = Show::parse_from(["glslp".as_ref(), file.as_os_str()]);
        assert!(show.run(std::io::sink()).is_err());
    }
}
