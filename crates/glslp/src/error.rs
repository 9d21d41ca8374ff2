//! Errors reported while parsing a shader program or generating its variants.

use std::io;

use crate::{types::ShaderType, MutatorValue};

/// An error raised while parsing a shader program file or one of its includes.
///
/// Always points at the offending file and 1-based line. Failures to read the root file
/// itself are reported at line `0`.
#[derive(Debug, thiserror::Error)]
#[error("{file}:{line}: {kind}")]
#[non_exhaustive]
pub struct ParseError {
    /// Name of the file containing the offending line.
    pub file: String,
    /// 1-based line number inside [`file`](Self::file).
    pub line: usize,
    /// What went wrong.
    #[source]
    pub kind: ParseErrorKind,
}

impl ParseError {
    /// Attaches a location to an error kind.
    #[inline]
    #[must_use]
    pub fn new(file: impl Into<String>, line: usize, kind: ParseErrorKind) -> Self {
        Self {
            file: file.into(),
            line,
            kind,
        }
    }
}

/// The reason a [`ParseError`] was raised.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
#[expect(clippy::module_name_repetitions, reason = "this is intended")]
pub enum ParseErrorKind {
    /// The file provider could not supply the requested file.
    #[error("could not read `{name}`: {source}")]
    IncludeNotFound {
        /// Name of the file as it was requested.
        name: String,
        /// Error reported by the file provider.
        source: io::Error,
    },
    /// Includes are nested deeper than allowed.
    #[error("including `{name}` exceeds the maximum include depth of {max_depth}")]
    IncludeTooDeep {
        /// Name of the file that would have been included.
        name: String,
        /// The maximum allowed nesting depth.
        max_depth: u32,
    },
    /// `#pragma once` appears more than once in the same file.
    #[error("`#pragma once` can only appear once per file")]
    DuplicatePragmaOnce,
    /// A mutator with the same name was already declared.
    #[error("mutator `{0}` is already declared")]
    DuplicateMutatorName(String),
    /// The values of a mutator are missing, not integers or not strictly increasing.
    #[error("invalid values for mutator `{name}`: {reason}")]
    InvalidMutatorValues {
        /// Name of the mutator.
        name: String,
        /// Why the values were rejected.
        reason: String,
    },
    /// More than one mutator is flagged `instanced`.
    #[error("mutator `{name}` is `instanced` but `{previous}` already drives the instance count")]
    DuplicateInstanceCountMutator {
        /// Name of the offending mutator.
        name: String,
        /// Name of the mutator declared `instanced` first.
        previous: String,
    },
    /// An input with the same name was already declared.
    #[error("input `{0}` is already declared")]
    DuplicateInputName(String),
    /// The qualifiers of an input contradict each other or its type.
    #[error("input `{name}`: {reason}")]
    ConflictingInputQualifiers {
        /// Name of the input.
        name: String,
        /// Which qualifiers conflict.
        reason: String,
    },
    /// The type of an input is not one of the supported data types.
    #[error("unknown input type `{0}`")]
    UnknownInputType(String),
    /// More inputs were declared than a variant can track.
    #[error("a shader program can not declare more than {max} inputs")]
    TooManyInputs {
        /// The maximum number of inputs.
        max: usize,
    },
    /// `#pragma anki start`/`end` are nested, unbalanced or mix incompatible stages.
    #[error("{0}")]
    StageNestingError(String),
    /// `#pragma anki descriptor_set` declared twice with different values.
    #[error("descriptor set already declared as {previous}, can not redeclare it as {new}")]
    DescriptorSetRedeclared {
        /// Value of the first declaration.
        previous: u32,
        /// Value of the conflicting declaration.
        new: u32,
    },
    /// A `#pragma anki rewrite_mutation` is malformed.
    #[error("malformed mutation rewrite: {0}")]
    MalformedRewriteRule(String),
    /// A directive has missing or extra tokens, or is not recognized.
    #[error("malformed pragma: {0}")]
    MalformedPragma(String),
    /// The file, including its includes, does not contain any shader stage.
    #[error("no shader stage found, expected at least one `#pragma anki start`")]
    NoShaderStages,
}

/// A mutation passed to variant generation does not match the declared mutators.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum InvalidMutationError {
    /// The mutation does not have exactly one value per mutator.
    #[error("mutation has {found} values but the program declares {expected} mutators")]
    Arity {
        /// Number of declared mutators.
        expected: usize,
        /// Number of values in the mutation.
        found: usize,
    },
    /// A value is not part of its mutator's declared values.
    #[error("value {value} is not declared for mutator `{mutator}`")]
    UndeclaredValue {
        /// Name of the mutator.
        mutator: String,
        /// The offending value.
        value: MutatorValue,
    },
}

/// An error raised while generating a single variant.
///
/// It only concerns the requested mutation: other mutations of the same program are unaffected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum GenerateVariantError {
    /// The requested mutation is not valid for this program.
    #[error("invalid mutation: {0}")]
    InvalidMutation(#[from] InvalidMutationError),
    /// A conditional guarding an input uses an expression the analyzer does not understand.
    #[error("unsupported conditional in {stage:?} source at line {line} (`{text}`): {reason}")]
    UnsupportedConditional {
        /// Stage whose assembled source contains the conditional.
        stage: ShaderType,
        /// 1-based line inside the assembled source.
        line: usize,
        /// The directive as written.
        text: String,
        /// What is not supported.
        reason: String,
    },
    /// The uniform block must live in push constants but does not fit.
    #[error("uniform block needs {size} bytes but only {budget} bytes of push constants are available")]
    PushConstantsOverflow {
        /// Size of the uniform block in bytes.
        size: u32,
        /// The configured push constant budget in bytes.
        budget: u32,
    },
    /// The uniform block outgrows 32 bit offsets, usually through a large instance count.
    #[error("uniform block does not fit in 4 GiB once `{input}` is added")]
    UniformBlockTooLarge {
        /// The input that did not fit.
        input: String,
    },
}

/// Repeated mutation rewrites did not reach a fixed point.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("mutation {mutation:?} is still being rewritten after {applied} rewrites, the rewrite rules likely form a cycle")]
#[non_exhaustive]
pub struct RewriteCycleSuspected {
    /// How many rewrites were applied before giving up.
    pub applied: usize,
    /// The mutation as it was when giving up.
    pub mutation: Vec<MutatorValue>,
}
