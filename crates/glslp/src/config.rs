//! Settings that shape the generated sources.

use serde::{Deserialize, Serialize};

use crate::{layout::PackingRule, types::GpuVendor};

/// Where the uniform block of a variant lives.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum UniformStorage {
    /// Push constants when the block fits the budget, a uniform buffer otherwise.
    #[default]
    Auto,
    /// Always push constants. Variants whose block does not fit fail to generate.
    PushConstants,
    /// Always a uniform buffer at binding `0` of the descriptor set.
    UniformBuffer,
}

/// Settings of a [`ShaderProgramParser`](crate::ShaderProgramParser).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::Parser))]
#[serde(default)]
#[non_exhaustive]
pub struct ParserConfig {
    /// Bytes of push constants available to the uniform block.
    #[cfg_attr(feature = "clap", clap(long, default_value_t = 128))]
    pub push_constants_size: u32,

    /// Major version of the graphics backend, exposed as `ANKI_BACKEND_MAJOR`.
    #[cfg_attr(feature = "clap", clap(long, default_value_t = 1))]
    pub backend_major: u32,

    /// Minor version of the graphics backend, exposed as `ANKI_BACKEND_MINOR`.
    #[cfg_attr(feature = "clap", clap(long, default_value_t = 1))]
    pub backend_minor: u32,

    /// Vendor of the target GPU.
    #[cfg_attr(feature = "clap", clap(long, value_enum, default_value_t = GpuVendor::Amd))]
    pub gpu_vendor: GpuVendor,

    /// Layout rules of the uniform block.
    #[cfg_attr(feature = "clap", clap(long, value_enum, default_value_t = PackingRule::Std140))]
    pub packing: PackingRule,

    /// Whether the uniform block goes to push constants or a uniform buffer.
    #[cfg_attr(feature = "clap", clap(long, value_enum, default_value_t = UniformStorage::Auto))]
    pub uniform_storage: UniformStorage,
}

impl Default for ParserConfig {
    #[inline]
    fn default() -> Self {
        Self {
            push_constants_size: 128,
            backend_major: 1,
            backend_minor: 1,
            gpu_vendor: GpuVendor::default(),
            packing: PackingRule::default(),
            uniform_storage: UniformStorage::default(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test_log::test]
    fn defaults() {
        let config = ParserConfig::default();
        assert_eq!(config.push_constants_size, 128);
        assert_eq!(config.gpu_vendor, GpuVendor::Amd);
        assert_eq!(config.packing, PackingRule::Std140);
        assert_eq!(config.uniform_storage, UniformStorage::Auto);
    }
}
