//! Inputs of a shader program: uniforms, specialization constants, textures and samplers.

use serde::{Deserialize, Serialize};

/// Data type of an [`Input`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ShaderVariableDataType {
    /// No type.
    None,
    /// `int`.
    I32,
    /// `ivec2`.
    IVec2,
    /// `ivec3`.
    IVec3,
    /// `ivec4`.
    IVec4,
    /// `uint`.
    U32,
    /// `uvec2`.
    UVec2,
    /// `uvec3`.
    UVec3,
    /// `uvec4`.
    UVec4,
    /// `float`.
    F32,
    /// `vec2`.
    Vec2,
    /// `vec3`.
    Vec3,
    /// `vec4`.
    Vec4,
    /// `mat3`, three `vec3` columns.
    Mat3,
    /// `mat4`, four `vec4` columns.
    Mat4,
    /// `mat3x4`, three `vec4` columns.
    Mat3x4,
    /// `mat4x3`, four `vec3` columns.
    Mat4x3,
    /// `texture1D`.
    Texture1D,
    /// `texture1DArray`.
    Texture1DArray,
    /// `texture2D`.
    Texture2D,
    /// `texture2DArray`.
    Texture2DArray,
    /// `texture3D`.
    Texture3D,
    /// `textureCube`.
    TextureCube,
    /// `textureCubeArray`.
    TextureCubeArray,
    /// `sampler`.
    Sampler,
}

/// Scalar component type of numeric data types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[expect(clippy::exhaustive_enums, reason = "GLSL only has these")]
pub enum ScalarKind {
    /// 32-bit signed integer.
    Int,
    /// 32-bit unsigned integer.
    Uint,
    /// 32-bit float.
    Float,
}

impl ScalarKind {
    /// GLSL name of the scalar type.
    #[inline]
    #[must_use]
    pub const fn glsl_name(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Uint => "uint",
            Self::Float => "float",
        }
    }

    /// GLSL literal for zero of this type.
    #[inline]
    #[must_use]
    pub const fn zero_literal(self) -> &'static str {
        match self {
            Self::Int => "0",
            Self::Uint => "0u",
            Self::Float => "0.0",
        }
    }
}

/// Every numeric type together with the alias the generated header defines for it.
pub(crate) const NUMERIC_TYPE_ALIASES: [(&str, ShaderVariableDataType); 16] = [
    ("I32", ShaderVariableDataType::I32),
    ("IVec2", ShaderVariableDataType::IVec2),
    ("IVec3", ShaderVariableDataType::IVec3),
    ("IVec4", ShaderVariableDataType::IVec4),
    ("U32", ShaderVariableDataType::U32),
    ("UVec2", ShaderVariableDataType::UVec2),
    ("UVec3", ShaderVariableDataType::UVec3),
    ("UVec4", ShaderVariableDataType::UVec4),
    ("F32", ShaderVariableDataType::F32),
    ("Vec2", ShaderVariableDataType::Vec2),
    ("Vec3", ShaderVariableDataType::Vec3),
    ("Vec4", ShaderVariableDataType::Vec4),
    ("Mat3", ShaderVariableDataType::Mat3),
    ("Mat4", ShaderVariableDataType::Mat4),
    ("Mat3x4", ShaderVariableDataType::Mat3x4),
    ("Mat4x3", ShaderVariableDataType::Mat4x3),
];

impl ShaderVariableDataType {
    /// Parses the type of `#pragma anki input`. Both the header aliases (`Vec4`) and plain
    /// GLSL names (`vec4`) are accepted.
    #[inline]
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        if let Some(&(_, ty)) = NUMERIC_TYPE_ALIASES
            .iter()
            .find(|&&(alias, _)| alias == name)
        {
            return Some(ty);
        }

        let ty = match name {
            "int" => Self::I32,
            "ivec2" => Self::IVec2,
            "ivec3" => Self::IVec3,
            "ivec4" => Self::IVec4,
            "uint" => Self::U32,
            "uvec2" => Self::UVec2,
            "uvec3" => Self::UVec3,
            "uvec4" => Self::UVec4,
            "float" => Self::F32,
            "vec2" => Self::Vec2,
            "vec3" => Self::Vec3,
            "vec4" => Self::Vec4,
            "mat3" => Self::Mat3,
            "mat4" => Self::Mat4,
            "mat3x4" => Self::Mat3x4,
            "mat4x3" => Self::Mat4x3,
            "texture1D" => Self::Texture1D,
            "texture1DArray" => Self::Texture1DArray,
            "texture2D" => Self::Texture2D,
            "texture2DArray" => Self::Texture2DArray,
            "texture3D" => Self::Texture3D,
            "textureCube" => Self::TextureCube,
            "textureCubeArray" => Self::TextureCubeArray,
            "sampler" => Self::Sampler,
            _ => return None,
        };
        Some(ty)
    }

    /// The GLSL spelling of the type.
    #[inline]
    #[must_use]
    pub const fn glsl_name(self) -> &'static str {
        match self {
            Self::None => "void",
            Self::I32 => "int",
            Self::IVec2 => "ivec2",
            Self::IVec3 => "ivec3",
            Self::IVec4 => "ivec4",
            Self::U32 => "uint",
            Self::UVec2 => "uvec2",
            Self::UVec3 => "uvec3",
            Self::UVec4 => "uvec4",
            Self::F32 => "float",
            Self::Vec2 => "vec2",
            Self::Vec3 => "vec3",
            Self::Vec4 => "vec4",
            Self::Mat3 => "mat3",
            Self::Mat4 => "mat4",
            Self::Mat3x4 => "mat3x4",
            Self::Mat4x3 => "mat4x3",
            Self::Texture1D => "texture1D",
            Self::Texture1DArray => "texture1DArray",
            Self::Texture2D => "texture2D",
            Self::Texture2DArray => "texture2DArray",
            Self::Texture3D => "texture3D",
            Self::TextureCube => "textureCube",
            Self::TextureCubeArray => "textureCubeArray",
            Self::Sampler => "sampler",
        }
    }

    /// Whether the type is one of the texture kinds.
    #[inline]
    #[must_use]
    pub const fn is_texture(self) -> bool {
        matches!(
            self,
            Self::Texture1D
                | Self::Texture1DArray
                | Self::Texture2D
                | Self::Texture2DArray
                | Self::Texture3D
                | Self::TextureCube
                | Self::TextureCubeArray
        )
    }

    /// Whether the type is a sampler.
    #[inline]
    #[must_use]
    pub const fn is_sampler(self) -> bool {
        matches!(self, Self::Sampler)
    }

    /// Whether the type is a matrix.
    #[inline]
    #[must_use]
    pub const fn is_matrix(self) -> bool {
        matches!(self, Self::Mat3 | Self::Mat4 | Self::Mat3x4 | Self::Mat4x3)
    }

    /// Scalar type of the components of numeric types.
    #[inline]
    #[must_use]
    pub const fn scalar_kind(self) -> Option<ScalarKind> {
        match self {
            Self::I32 | Self::IVec2 | Self::IVec3 | Self::IVec4 => Some(ScalarKind::Int),
            Self::U32 | Self::UVec2 | Self::UVec3 | Self::UVec4 => Some(ScalarKind::Uint),
            Self::F32
            | Self::Vec2
            | Self::Vec3
            | Self::Vec4
            | Self::Mat3
            | Self::Mat4
            | Self::Mat3x4
            | Self::Mat4x3 => Some(ScalarKind::Float),
            Self::None
            | Self::Texture1D
            | Self::Texture1DArray
            | Self::Texture2D
            | Self::Texture2DArray
            | Self::Texture3D
            | Self::TextureCube
            | Self::TextureCubeArray
            | Self::Sampler => None,
        }
    }

    /// `(columns, rows)` of numeric types. Scalars are `(1, 1)` and vectors `(1, N)`.
    #[inline]
    #[must_use]
    pub const fn shape(self) -> Option<(u32, u32)> {
        let shape = match self {
            Self::I32 | Self::U32 | Self::F32 => (1, 1),
            Self::IVec2 | Self::UVec2 | Self::Vec2 => (1, 2),
            Self::IVec3 | Self::UVec3 | Self::Vec3 => (1, 3),
            Self::IVec4 | Self::UVec4 | Self::Vec4 => (1, 4),
            Self::Mat3 => (3, 3),
            Self::Mat4 => (4, 4),
            Self::Mat3x4 => (3, 4),
            Self::Mat4x3 => (4, 3),
            Self::None
            | Self::Texture1D
            | Self::Texture1DArray
            | Self::Texture2D
            | Self::Texture2DArray
            | Self::Texture3D
            | Self::TextureCube
            | Self::TextureCubeArray
            | Self::Sampler => return None,
        };
        Some(shape)
    }

    /// Number of scalar components, `0` for non numeric types.
    #[inline]
    #[must_use]
    pub const fn component_count(self) -> u32 {
        match self.shape() {
            Some((columns, rows)) => columns * rows,
            None => 0,
        }
    }

    /// Suffix of the `ANKI_SPECIALIZATION_CONSTANT_*` macro declaring a constant of this type.
    #[inline]
    #[must_use]
    pub fn spec_constant_suffix(self) -> String {
        self.glsl_name().to_ascii_uppercase()
    }
}

/// Classification of an [`Input`], which decides how it reaches the shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
#[expect(clippy::exhaustive_enums, reason = "every input is exactly one of these")]
pub enum InputClass {
    /// A member of the uniform block.
    UniformBlock,
    /// A specialization constant.
    Constant,
    /// A texture bound to the descriptor set.
    Texture,
    /// A sampler bound to the descriptor set.
    Sampler,
}

/// A value or resource a shader program reads, declared with
/// `#pragma anki input [const | instanced] TYPE NAME`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[non_exhaustive]
pub struct Input {
    /// Name of the input as used in GLSL.
    pub(crate) name: String,
    /// Position among the declared inputs.
    pub(crate) index: usize,
    /// Type of the input.
    pub(crate) data_type: ShaderVariableDataType,
    /// First specialization constant id, for `const` inputs.
    pub(crate) spec_constant_id: Option<u32>,
    /// Descriptor binding, for textures and samplers.
    pub(crate) binding: Option<u32>,
    /// Whether the input is an array with one element per instance.
    pub(crate) instanced: bool,
}

impl Input {
    /// Name of the input.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Position among the declared inputs.
    #[inline]
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Type of the input.
    #[inline]
    #[must_use]
    pub const fn data_type(&self) -> ShaderVariableDataType {
        self.data_type
    }

    /// Whether the input holds one value per instance.
    #[inline]
    #[must_use]
    pub const fn is_instanced(&self) -> bool {
        self.instanced
    }

    /// The first specialization constant id, if the input was declared `const`.
    ///
    /// Vector constants occupy one id per component, starting at this one.
    #[inline]
    #[must_use]
    pub const fn spec_constant_id(&self) -> Option<u32> {
        self.spec_constant_id
    }

    /// Whether the input is a specialization constant.
    #[inline]
    #[must_use]
    pub const fn is_constant(&self) -> bool {
        self.spec_constant_id.is_some()
    }

    /// Whether the input is a texture.
    #[inline]
    #[must_use]
    pub const fn is_texture(&self) -> bool {
        self.data_type.is_texture()
    }

    /// Whether the input is a sampler.
    #[inline]
    #[must_use]
    pub const fn is_sampler(&self) -> bool {
        self.data_type.is_sampler()
    }

    /// Whether the input is a member of the uniform block.
    #[inline]
    #[must_use]
    pub const fn in_uniform_block(&self) -> bool {
        !self.is_constant() && !self.is_texture() && !self.is_sampler()
    }

    /// How the input reaches the shader.
    #[inline]
    #[must_use]
    pub const fn class(&self) -> InputClass {
        if self.is_constant() {
            InputClass::Constant
        } else if self.is_texture() {
            InputClass::Texture
        } else if self.is_sampler() {
            InputClass::Sampler
        } else {
            InputClass::UniformBlock
        }
    }

    /// The descriptor binding of textures and samplers, the same in every variant.
    #[inline]
    #[must_use]
    pub const fn binding(&self) -> Option<u32> {
        self.binding
    }
}
