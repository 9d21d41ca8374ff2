//! Shader stages and the GPU vendor the generated sources are specialized for.

use serde::{Deserialize, Serialize};

/// A single shading stage of a shader program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[expect(clippy::exhaustive_enums, reason = "the set of stages is fixed")]
pub enum ShaderType {
    /// Vertex stage, `#pragma anki start vert`.
    Vertex,
    /// Tessellation control stage, `#pragma anki start tessc`.
    TessellationControl,
    /// Tessellation evaluation stage, `#pragma anki start tesse`.
    TessellationEvaluation,
    /// Geometry stage, `#pragma anki start geom`.
    Geometry,
    /// Fragment stage, `#pragma anki start frag`.
    Fragment,
    /// Compute stage, `#pragma anki start comp`.
    Compute,
}

impl ShaderType {
    /// Number of shader stages.
    pub const COUNT: usize = 6;

    /// Every stage, in pipeline order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Vertex,
        Self::TessellationControl,
        Self::TessellationEvaluation,
        Self::Geometry,
        Self::Fragment,
        Self::Compute,
    ];

    /// Position of the stage inside [`Self::ALL`].
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Vertex => 0,
            Self::TessellationControl => 1,
            Self::TessellationEvaluation => 2,
            Self::Geometry => 3,
            Self::Fragment => 4,
            Self::Compute => 5,
        }
    }

    /// Parses the stage name used by `#pragma anki start`.
    #[inline]
    #[must_use]
    pub fn from_pragma_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|stage| stage.pragma_name() == name)
    }

    /// The name used by `#pragma anki start`, also used as a file extension.
    #[inline]
    #[must_use]
    pub const fn pragma_name(self) -> &'static str {
        match self {
            Self::Vertex => "vert",
            Self::TessellationControl => "tessc",
            Self::TessellationEvaluation => "tesse",
            Self::Geometry => "geom",
            Self::Fragment => "frag",
            Self::Compute => "comp",
        }
    }

    /// The macro defined to `1` in the header of this stage's source.
    #[inline]
    #[must_use]
    pub const fn define_name(self) -> &'static str {
        match self {
            Self::Vertex => "ANKI_VERTEX_SHADER",
            Self::TessellationControl => "ANKI_TESSELLATION_CONTROL_SHADER",
            Self::TessellationEvaluation => "ANKI_TESSELLATION_EVALUATION_SHADER",
            Self::Geometry => "ANKI_GEOMETRY_SHADER",
            Self::Fragment => "ANKI_FRAGMENT_SHADER",
            Self::Compute => "ANKI_COMPUTE_SHADER",
        }
    }

    /// The stage as a single-bit [`ShaderTypes`] set.
    #[inline]
    #[must_use]
    pub const fn bit(self) -> ShaderTypes {
        match self {
            Self::Vertex => ShaderTypes::VERTEX,
            Self::TessellationControl => ShaderTypes::TESSELLATION_CONTROL,
            Self::TessellationEvaluation => ShaderTypes::TESSELLATION_EVALUATION,
            Self::Geometry => ShaderTypes::GEOMETRY,
            Self::Fragment => ShaderTypes::FRAGMENT,
            Self::Compute => ShaderTypes::COMPUTE,
        }
    }
}

bitflags::bitflags! {
    /// A set of shader stages.
    #[derive(Debug, Default, Serialize, Deserialize, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
    #[serde(transparent)]
    pub struct ShaderTypes: u8 {
        /// Vertex stage.
        const VERTEX                  = 0b00_0001;
        /// Tessellation control stage.
        const TESSELLATION_CONTROL    = 0b00_0010;
        /// Tessellation evaluation stage.
        const TESSELLATION_EVALUATION = 0b00_0100;
        /// Geometry stage.
        const GEOMETRY                = 0b00_1000;
        /// Fragment stage.
        const FRAGMENT                = 0b01_0000;
        /// Compute stage.
        const COMPUTE                 = 0b10_0000;
        /// Every stage that belongs to a graphics pipeline.
        const ALL_GRAPHICS            = 0b01_1111;
    }
}

impl ShaderTypes {
    /// Iterates the stages of the set in pipeline order.
    #[inline]
    pub fn stages(self) -> impl Iterator<Item = ShaderType> {
        ShaderType::ALL
            .into_iter()
            .filter(move |stage| self.contains(stage.bit()))
    }
}

/// Vendor of the GPU the sources are generated for.
///
/// Exposed to the shader as `ANKI_VENDOR_<NAME>`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum GpuVendor {
    /// Vendor could not be determined.
    Unknown,
    /// ARM.
    Arm,
    /// Nvidia.
    Nvidia,
    /// AMD.
    #[default]
    Amd,
    /// Intel.
    Intel,
    /// Qualcomm.
    Qualcomm,
}

impl GpuVendor {
    /// The macro defined to `1` in every generated source.
    #[inline]
    #[must_use]
    pub const fn define_name(self) -> &'static str {
        match self {
            Self::Unknown => "ANKI_VENDOR_UNKNOWN",
            Self::Arm => "ANKI_VENDOR_ARM",
            Self::Nvidia => "ANKI_VENDOR_NVIDIA",
            Self::Amd => "ANKI_VENDOR_AMD",
            Self::Intel => "ANKI_VENDOR_INTEL",
            Self::Qualcomm => "ANKI_VENDOR_QUALCOMM",
        }
    }
}
