//! utilities for tests
#![cfg(test)]

use std::collections::HashMap;

use crate::{ParseError, ParserConfig, ShaderProgram, ShaderProgramParser};

/// Name every single-file test program is parsed as.
pub const ROOT_FILE: &str = "test.glslp";

/// A program with a texture that only some mutations use, and a rule folding the mutations
/// where it would be wasted.
pub const MATERIAL_PROGRAM: &str = r"
#pragma anki mutator LOD 0 1 2
#pragma anki mutator DIFFUSE_TEX 0 1

#pragma anki rewrite_mutation LOD 2 DIFFUSE_TEX 1 to LOD 2 DIFFUSE_TEX 0

#pragma anki input Mat4 u_mvp
#if DIFFUSE_TEX == 1
#pragma anki input texture2D u_diffuse
#endif
#pragma anki input sampler u_sampler

#pragma anki start vert
void main()
{
	gl_Position = u_mvp * Vec4(gl_VertexID);
}
#pragma anki end

#pragma anki start frag
layout(location = 0) out Vec4 out_color;

void main()
{
#if DIFFUSE_TEX == 1
	out_color = texture(sampler2D(u_diffuse, u_sampler), Vec2(0.0));
#else
	out_color = Vec4(LOD);
#endif
}
#pragma anki end
";

/// In-memory filesystem made of `(name, text)` pairs.
pub fn files(entries: &[(&str, &str)]) -> HashMap<String, String> {
    entries
        .iter()
        .map(|&(name, text)| (name.to_owned(), text.to_owned()))
        .collect()
}

/// Parses `root` out of an in-memory filesystem made of `entries`.
pub fn parse_files(root: &str, entries: &[(&str, &str)]) -> Result<ShaderProgram, ParseError> {
    let files = files(entries);
    ShaderProgramParser::new(root, &files, ParserConfig::default()).parse()
}

/// Parses a single file with the given settings.
pub fn parse_with(source: &str, config: ParserConfig) -> Result<ShaderProgram, ParseError> {
    let files = files(&[(ROOT_FILE, source)]);
    ShaderProgramParser::new(ROOT_FILE, &files, config).parse()
}

/// Parses a single file with the default settings.
pub fn parse(source: &str) -> Result<ShaderProgram, ParseError> {
    parse_with(source, ParserConfig::default())
}

/// Wraps declarations in a minimal vertex stage so they form a valid program.
pub fn with_vertex_stage(declarations: &str) -> String {
    format!("{declarations}\n#pragma anki start vert\nvoid main() {{}}\n#pragma anki end\n")
}
