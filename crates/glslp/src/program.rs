//! The parsed, immutable model of a shader program.

use crate::{
    config::ParserConfig,
    error::{GenerateVariantError, InvalidMutationError, RewriteCycleSuspected},
    input::Input,
    mutator::{MutationRewrite, Mutations, Mutator},
    types::{ShaderType, ShaderTypes},
    variant::{self, Variant},
    MutatorValue,
};

/// Everything [`ShaderProgramParser::parse`](crate::ShaderProgramParser::parse) learnt from
/// a shader program file and its includes.
///
/// Immutable: every query takes `&self`, so one program can serve many threads.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ShaderProgram {
    /// Name of the root file.
    pub(crate) file_name: String,
    /// Settings the program was parsed with.
    pub(crate) config: ParserConfig,
    /// Mutators in declaration order.
    pub(crate) mutators: Vec<Mutator>,
    /// Inputs in declaration order.
    pub(crate) inputs: Vec<Input>,
    /// Rewrite rules in declaration order.
    pub(crate) rewrites: Vec<MutationRewrite>,
    /// Stages present in the file.
    pub(crate) shader_types: ShaderTypes,
    /// Descriptor set of textures, samplers and the uniform buffer.
    pub(crate) descriptor_set: u32,
    /// Index of the mutator declared `instanced`.
    pub(crate) instance_count_mutator: Option<usize>,
    /// Code outside of any stage block, shared by every stage.
    pub(crate) globals: String,
    /// Code of each stage block.
    pub(crate) stage_code: [String; ShaderType::COUNT],
    /// Members of the uniform block, each guarded by its activation macro.
    pub(crate) uniform_block_members: String,
}

impl ShaderProgram {
    /// Name of the root file.
    #[inline]
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Settings the program was parsed with.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Mutators in declaration order.
    #[inline]
    #[must_use]
    pub fn mutators(&self) -> &[Mutator] {
        &self.mutators
    }

    /// Looks a mutator up by name.
    #[inline]
    #[must_use]
    pub fn mutator(&self, name: &str) -> Option<&Mutator> {
        self.mutators.iter().find(|mutator| mutator.name() == name)
    }

    /// The mutator declared `instanced`, if any.
    #[inline]
    #[must_use]
    pub fn instance_count_mutator(&self) -> Option<&Mutator> {
        self.mutators.get(self.instance_count_mutator?)
    }

    /// Inputs in declaration order. An input's position is its [`Input::index`].
    #[inline]
    #[must_use]
    pub fn inputs(&self) -> &[Input] {
        &self.inputs
    }

    /// Looks an input up by name.
    #[inline]
    #[must_use]
    pub fn input(&self, name: &str) -> Option<&Input> {
        self.inputs.iter().find(|input| input.name() == name)
    }

    /// Rewrite rules in declaration order.
    #[inline]
    #[must_use]
    pub fn rewrites(&self) -> &[MutationRewrite] {
        &self.rewrites
    }

    /// Stages present in the file.
    #[inline]
    #[must_use]
    pub const fn shader_types(&self) -> ShaderTypes {
        self.shader_types
    }

    /// Descriptor set declared with `#pragma anki descriptor_set`, `0` by default.
    #[inline]
    #[must_use]
    pub const fn descriptor_set(&self) -> u32 {
        self.descriptor_set
    }

    /// Code of `stage`, empty if the program has no such stage.
    pub(crate) fn stage_code(&self, stage: ShaderType) -> &str {
        self.stage_code.get(stage.index()).map_or("", String::as_str)
    }

    /// Number of raw mutations, the product of the value counts of every mutator.
    ///
    /// Saturates at [`u64::MAX`].
    #[inline]
    #[must_use]
    pub fn mutation_space_size(&self) -> u64 {
        self.mutators.iter().fold(1_u64, |size, mutator| {
            size.saturating_mul(u64::try_from(mutator.values().len()).unwrap_or(u64::MAX))
        })
    }

    /// Iterates every raw mutation, the last mutator varying fastest.
    #[inline]
    #[must_use]
    pub fn mutations(&self) -> Mutations<'_> {
        Mutations::new(&self.mutators)
    }

    /// Checks that `mutation` holds one declared value per mutator.
    ///
    /// # Errors
    ///
    /// Returns the first mismatch found.
    #[inline]
    pub fn validate_mutation(&self, mutation: &[MutatorValue]) -> Result<(), InvalidMutationError> {
        if mutation.len() != self.mutators.len() {
            return Err(InvalidMutationError::Arity {
                expected: self.mutators.len(),
                found: mutation.len(),
            });
        }
        for (mutator, &value) in self.mutators.iter().zip(mutation) {
            if !mutator.has_value(value) {
                return Err(InvalidMutationError::UndeclaredValue {
                    mutator: mutator.name().to_owned(),
                    value,
                });
            }
        }
        Ok(())
    }

    /// Applies the first rewrite rule matching `mutation`, in declaration order.
    ///
    /// Returns whether a rule was applied. At most one rule is applied per call.
    #[inline]
    pub fn rewrite_mutation(&self, mutation: &mut [MutatorValue]) -> bool {
        let Some(rewrite) = self
            .rewrites
            .iter()
            .find(|rewrite| rewrite.matches(mutation))
        else {
            return false;
        };

        let before = mutation.to_vec();
        rewrite.apply(mutation);
        log::debug!("rewrote mutation {before:?} to {mutation:?}");
        true
    }

    /// Rewrites `mutation` until no rule applies, returning how many rewrites were applied.
    ///
    /// # Errors
    ///
    /// Returns [`RewriteCycleSuspected`] if the mutation is still being rewritten after as
    /// many applications as there are rules.
    #[inline]
    pub fn canonicalize_mutation(
        &self,
        mutation: &mut [MutatorValue],
    ) -> Result<usize, RewriteCycleSuspected> {
        for applied in 0..=self.rewrites.len() {
            if !self.rewrite_mutation(mutation) {
                return Ok(applied);
            }
        }

        Err(RewriteCycleSuspected {
            applied: self.rewrites.len() + 1,
            mutation: mutation.to_vec(),
        })
    }

    /// Produces the sources and metadata of the variant selected by `mutation`.
    ///
    /// The mutation is used as given: callers wanting canonical variants canonicalize first.
    /// The result only depends on the program and the mutation.
    ///
    /// # Errors
    ///
    /// * [`GenerateVariantError::InvalidMutation`] if the mutation does not match the mutators,
    /// * [`GenerateVariantError::UnsupportedConditional`] if an input is guarded by a
    ///   conditional outside the supported subset,
    /// * [`GenerateVariantError::UniformBlockTooLarge`] if the uniform block outgrows 32 bit
    ///   offsets,
    /// * [`GenerateVariantError::PushConstantsOverflow`] if the uniform block must live in
    ///   push constants but does not fit.
    #[inline]
    pub fn generate_variant(
        &self,
        mutation: &[MutatorValue],
    ) -> Result<Variant, GenerateVariantError> {
        variant::generate(self, mutation)
    }
}
