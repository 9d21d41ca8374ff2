//! Preprocessor of annotated GLSL shader programs.
//!
//! A shader program is a single `*.glslp` file, plus its includes, holding every stage of a
//! pipeline together with a small directive language on top of GLSL:
//!
//! * `#pragma anki mutator [instanced] NAME V0 [V1 ...]` declares a compile-time switch,
//! * `#pragma anki rewrite_mutation NAME V ... to NAME V ...` folds equivalent mutations,
//! * `#pragma anki input [const | instanced] TYPE NAME` declares a uniform, a
//!   specialization constant, a texture or a sampler,
//! * `#pragma anki start STAGE` and `#pragma anki end` delimit the code of a stage,
//! * `#pragma anki descriptor_set N` picks the descriptor set of the program.
//!
//! [`ShaderProgramParser`] turns the file into a [`ShaderProgram`], which in turn generates
//! a [`Variant`] for any combination of mutator values: the concrete source of every stage,
//! which inputs survive preprocessing, where they live in the uniform block and what they are
//! bound to. No shading language compiler is involved.
//!
//! ```
//! use std::collections::HashMap;
//! use glslp::{ParserConfig, ShaderProgramParser, ShaderType};
//!
//! let source = r"
//! #pragma anki mutator BLUR 0 1
//! #if BLUR == 1
//! #pragma anki input F32 u_radius
//! #endif
//! #pragma anki start frag
//! void main() {}
//! #pragma anki end
//! ";
//! let files = HashMap::from([("post.glslp".to_owned(), source.to_owned())]);
//! let program = ShaderProgramParser::new("post.glslp", &files, ParserConfig::default())
//!     .parse()
//!     .unwrap();
//!
//! let radius = program.input("u_radius").unwrap();
//! let sharp = program.generate_variant(&[0]).unwrap();
//! let blurred = program.generate_variant(&[1]).unwrap();
//! assert!(!sharp.is_input_active(radius));
//! assert!(blurred.is_input_active(radius));
//! assert!(blurred.source(ShaderType::Fragment).unwrap().contains("#define BLUR 1"));
//! ```

#![expect(clippy::pub_use, reason = "part of public API")]

pub use self::{
    config::{ParserConfig, UniformStorage},
    error::{
        GenerateVariantError, InvalidMutationError, ParseError, ParseErrorKind,
        RewriteCycleSuspected,
    },
    filesystem::ShaderFilesystem,
    input::{Input, InputClass, ScalarKind, ShaderVariableDataType},
    layout::{PackingRule, ShaderVariableBlockInfo},
    mutator::{MutationRewrite, Mutations, Mutator, RewriteRecord},
    parser::ShaderProgramParser,
    program::ShaderProgram,
    types::{GpuVendor, ShaderType, ShaderTypes},
    variant::{InputMask, Variant},
};

pub mod conditional;
pub mod config;
pub mod error;
pub mod filesystem;
pub mod include;
pub mod input;
pub mod layout;
pub mod mutator;
pub mod parser;
pub mod program;
pub mod tokenizer;
pub mod types;
pub mod variant;

mod test;

/// A value of a mutator.
pub type MutatorValue = i32;

/// Maximum number of inputs a shader program can declare.
pub const MAX_INPUTS: usize = 128;
