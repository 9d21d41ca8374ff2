//! Concrete per-stage sources of one mutation and the metadata needed to bind them.

use core::fmt::Write as _;

use serde::Serialize;

use crate::{
    conditional::find_active_inputs,
    config::UniformStorage,
    error::GenerateVariantError,
    input::{Input, ShaderVariableDataType, NUMERIC_TYPE_ALIASES},
    layout::{BlockLayout, ShaderVariableBlockInfo},
    program::ShaderProgram,
    types::ShaderType,
    MutatorValue, MAX_INPUTS,
};

/// Name of the uniform block instance every in-block input is a member of.
pub(crate) const UNIFORM_BLOCK_INSTANCE: &str = "_anki_unis";
/// Prefix of the macro defined for every active input.
pub(crate) const ACTIVATE_INPUT_PREFIX: &str = "_ANKI_ACTIVATE_INPUT_";
/// Prefix of the macro holding the binding of an active texture or sampler.
pub(crate) const BINDING_PREFIX: &str = "_ANKI_BINDING_";
/// Macro holding the descriptor set of the program.
pub(crate) const DESCRIPTOR_SET_MACRO: &str = "_ANKI_DESCRIPTOR_SET";

/// A set of inputs, indexed by [`Input::index`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct InputMask(u128);

impl InputMask {
    /// Whether the input at `index` is in the set.
    #[inline]
    #[must_use]
    pub const fn get(self, index: usize) -> bool {
        index < MAX_INPUTS && self.0 & (1 << index) != 0
    }

    /// Adds the input at `index`. Indices past [`MAX_INPUTS`] are ignored.
    #[inline]
    pub fn set(&mut self, index: usize) {
        if index < MAX_INPUTS {
            self.0 |= 1 << index;
        }
    }

    /// Number of inputs in the set.
    #[inline]
    #[must_use]
    pub const fn len(self) -> u32 {
        self.0.count_ones()
    }

    /// Whether the set is empty.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterates the indices in the set, in increasing order.
    #[inline]
    pub fn indices(self) -> impl Iterator<Item = usize> {
        (0..MAX_INPUTS).filter(move |&index| self.get(index))
    }
}

impl core::ops::BitOr for InputMask {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl core::ops::BitOrAssign for InputMask {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// The result of [`ShaderProgram::generate_variant`].
///
/// Owned by the caller, never modified after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct Variant {
    /// The mutation the variant was generated for.
    mutation: Vec<MutatorValue>,
    /// Source of every stage present in the program.
    sources: [Option<String>; ShaderType::COUNT],
    /// Inputs whose declaration survives preprocessing in at least one stage.
    active_inputs: InputMask,
    /// Placement of active uniform block members, per input index.
    block_infos: Vec<Option<ShaderVariableBlockInfo>>,
    /// Bindings of active textures and samplers, per input index.
    bindings: Vec<Option<u32>>,
    /// Size of the uniform block in bytes.
    uniform_block_size: u32,
    /// Whether the uniform block lives in push constants.
    uses_push_constants: bool,
}

impl Variant {
    /// The mutation the variant was generated for.
    #[inline]
    #[must_use]
    pub fn mutation(&self) -> &[MutatorValue] {
        &self.mutation
    }

    /// Source of `stage`, `None` if the program has no such stage.
    #[inline]
    #[must_use]
    pub fn source(&self, stage: ShaderType) -> Option<&str> {
        self.sources.get(stage.index())?.as_deref()
    }

    /// Every stage with its source, in pipeline order.
    #[inline]
    pub fn sources(&self) -> impl Iterator<Item = (ShaderType, &str)> {
        ShaderType::ALL
            .into_iter()
            .filter_map(|stage| Some((stage, self.source(stage)?)))
    }

    /// The set of active inputs.
    #[inline]
    #[must_use]
    pub const fn active_inputs(&self) -> InputMask {
        self.active_inputs
    }

    /// Whether `input` is used by this variant.
    #[inline]
    #[must_use]
    pub const fn is_input_active(&self, input: &Input) -> bool {
        self.active_inputs.get(input.index())
    }

    /// Placement of `input` inside the uniform block, if it is an active member of it.
    #[inline]
    #[must_use]
    pub fn block_info(&self, input: &Input) -> Option<ShaderVariableBlockInfo> {
        self.block_infos.get(input.index()).copied().flatten()
    }

    /// Binding of `input`, if it is an active texture or sampler.
    #[inline]
    #[must_use]
    pub fn binding(&self, input: &Input) -> Option<u32> {
        self.bindings.get(input.index()).copied().flatten()
    }

    /// Size of the uniform block in bytes, `0` if no in-block input is active.
    #[inline]
    #[must_use]
    pub const fn uniform_block_size(&self) -> u32 {
        self.uniform_block_size
    }

    /// Whether the uniform block lives in push constants rather than a uniform buffer.
    #[inline]
    #[must_use]
    pub const fn uses_push_constants(&self) -> bool {
        self.uses_push_constants
    }
}

/// Generates the variant of a valid mutation.
pub(crate) fn generate(
    program: &ShaderProgram,
    mutation: &[MutatorValue],
) -> Result<Variant, GenerateVariantError> {
    program.validate_mutation(mutation)?;
    let config = program.config();

    let headers: Vec<(ShaderType, String)> = program
        .shader_types()
        .stages()
        .map(|stage| (stage, header(program, mutation, stage)))
        .collect();

    let mut active_inputs = InputMask::default();
    for (stage, header) in &headers {
        let analyzed = [header.as_str(), &program.globals, program.stage_code(*stage)].concat();
        active_inputs |= find_active_inputs(&analyzed, program.inputs()).map_err(|err| {
            GenerateVariantError::UnsupportedConditional {
                stage: *stage,
                line: err.line,
                text: err.text,
                reason: err.reason,
            }
        })?;
    }

    let instance_count = program
        .instance_count_mutator
        .and_then(|idx| mutation.get(idx))
        .and_then(|&value| u32::try_from(value).ok());

    let input_count = program.inputs().len();
    let mut block_infos = vec![None; input_count];
    let mut bindings = vec![None; input_count];
    let mut block = BlockLayout::new(config.packing);
    for input in program.inputs() {
        if !active_inputs.get(input.index()) {
            continue;
        }
        if input.in_uniform_block() {
            let array_size = if input.is_instanced() {
                instance_count
            } else {
                None
            };
            let info = block.push(input.data_type(), array_size).ok_or_else(|| {
                GenerateVariantError::UniformBlockTooLarge {
                    input: input.name().to_owned(),
                }
            })?;
            if let Some(slot) = block_infos.get_mut(input.index()) {
                *slot = Some(info);
            }
        } else if let Some(slot) = bindings.get_mut(input.index()) {
            *slot = input.binding();
        }
    }

    let uniform_block_size = block.size();
    let budget = config.push_constants_size;
    let uses_push_constants = match config.uniform_storage {
        UniformStorage::Auto => uniform_block_size > 0 && uniform_block_size <= budget,
        UniformStorage::PushConstants => {
            if uniform_block_size > budget {
                return Err(GenerateVariantError::PushConstantsOverflow {
                    size: uniform_block_size,
                    budget,
                });
            }
            uniform_block_size > 0
        }
        UniformStorage::UniformBuffer => false,
    };
    log::debug!(
        "mutation {mutation:?}: {} active inputs, uniform block of {uniform_block_size} bytes in {}",
        active_inputs.len(),
        if uses_push_constants {
            "push constants"
        } else {
            "a uniform buffer"
        }
    );

    let activation = activation_defines(program.inputs(), active_inputs);
    let uniform_block = if uniform_block_size > 0 {
        uniform_block(program, uses_push_constants)
    } else {
        String::new()
    };

    let mut sources: [Option<String>; ShaderType::COUNT] = Default::default();
    for (stage, header) in headers {
        let source = [
            header.as_str(),
            &activation,
            &uniform_block,
            &program.globals,
            program.stage_code(stage),
        ]
        .concat();
        if let Some(slot) = sources.get_mut(stage.index()) {
            *slot = Some(source);
        }
    }

    Ok(Variant {
        mutation: mutation.to_vec(),
        sources,
        active_inputs,
        block_infos,
        bindings,
        uniform_block_size,
        uses_push_constants,
    })
}

/// Lines every source of `stage` starts with.
fn header(program: &ShaderProgram, mutation: &[MutatorValue], stage: ShaderType) -> String {
    let config = program.config();
    let mut header = String::from("#version 450 core\n");
    // Writing to a `String` can not fail.
    let _ = writeln!(header, "#define ANKI_BACKEND_MINOR {}", config.backend_minor);
    let _ = writeln!(header, "#define ANKI_BACKEND_MAJOR {}", config.backend_major);
    let _ = writeln!(header, "#define {} 1", config.gpu_vendor.define_name());
    let _ = writeln!(header, "#define {} 1", stage.define_name());
    let _ = writeln!(
        header,
        "#define {DESCRIPTOR_SET_MACRO} {}",
        program.descriptor_set()
    );
    for (mutator, value) in program.mutators().iter().zip(mutation) {
        let _ = writeln!(header, "#define {} {value}", mutator.name());
    }

    for (alias, data_type) in NUMERIC_TYPE_ALIASES {
        let _ = writeln!(header, "#define {alias} {}", data_type.glsl_name());
    }
    for (_, data_type) in NUMERIC_TYPE_ALIASES {
        if !data_type.is_matrix() {
            header.push_str(&spec_constant_macro(data_type));
        }
    }
    if stage == ShaderType::Vertex {
        header.push_str("#define gl_VertexID gl_VertexIndex\n");
        header.push_str("#define gl_InstanceID gl_InstanceIndex\n");
    }
    header
}

/// `#define` of the macro declaring a specialization constant of `data_type`.
///
/// Vectors are declared one scalar constant per component, with consecutive ids.
fn spec_constant_macro(data_type: ShaderVariableDataType) -> String {
    let Some(scalar) = data_type.scalar_kind() else {
        return String::new();
    };
    let suffix = data_type.spec_constant_suffix();
    let scalar_name = scalar.glsl_name();
    let zero = scalar.zero_literal();
    let components = data_type.component_count();

    if components == 1 {
        return format!(
            "#define ANKI_SPECIALIZATION_CONSTANT_{suffix}(n_, id_) \
             layout(constant_id = id_) const {scalar_name} n_ = {zero}\n"
        );
    }

    let mut body = String::new();
    for component in 0..components {
        let id = if component == 0 {
            "id_".to_owned()
        } else {
            format!("id_ + {component}")
        };
        let _ = write!(
            body,
            "layout(constant_id = {id}) const {scalar_name} n_##_{component} = {zero}; "
        );
    }
    let members = (0..components)
        .map(|component| format!("n_##_{component}"))
        .collect::<Vec<_>>()
        .join(", ");
    let glsl_name = data_type.glsl_name();
    format!(
        "#define ANKI_SPECIALIZATION_CONSTANT_{suffix}(n_, id_) \
         {body}const {glsl_name} n_ = {glsl_name}({members})\n"
    )
}

/// Defines the activation and binding macros of every active input.
fn activation_defines(inputs: &[Input], active: InputMask) -> String {
    let mut defines = String::new();
    for input in inputs.iter().filter(|input| active.get(input.index())) {
        let _ = writeln!(defines, "#define {ACTIVATE_INPUT_PREFIX}{} 1", input.name());
        if let Some(binding) = input.binding() {
            let _ = writeln!(defines, "#define {BINDING_PREFIX}{} {binding}", input.name());
        }
    }
    defines
}

/// Declaration of the uniform block. Members are guarded by their activation macro.
fn uniform_block(program: &ShaderProgram, push_constants: bool) -> String {
    let packing = program.config().packing.qualifier();
    let layout = if push_constants {
        format!("push_constant, {packing}")
    } else {
        format!("set = {DESCRIPTOR_SET_MACRO}, binding = 0, {packing}")
    };
    format!(
        "layout({layout}) uniform _anki_uniforms_\n{{\n{}}} {UNIFORM_BLOCK_INSTANCE};\n",
        program.uniform_block_members
    )
}
