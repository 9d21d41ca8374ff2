//! Memory layout of the uniform block.
//!
//! Members are laid out in declaration order following GLSL's `std140` or `std430` rules.
//! Matrices are column major.

use serde::{Deserialize, Serialize};

use crate::input::ShaderVariableDataType;

/// Size in bytes of every scalar type.
const SCALAR_SIZE: u32 = 4;
/// Alignment `std140` forces on arrays, matrix columns and structs.
const STD140_VEC4_ALIGNMENT: u32 = 16;

/// Layout rules of the uniform block.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum PackingRule {
    /// GLSL `std140`, valid for uniform buffers and push constants.
    #[default]
    Std140,
    /// GLSL `std430`, tighter arrays and matrices.
    Std430,
}

impl PackingRule {
    /// The layout qualifier to put on the block.
    #[inline]
    #[must_use]
    pub const fn qualifier(self) -> &'static str {
        match self {
            Self::Std140 => "std140",
            Self::Std430 => "std430",
        }
    }
}

/// Placement of one uniform block member.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub struct ShaderVariableBlockInfo {
    /// Offset from the start of the block, in bytes.
    pub offset: u32,
    /// Total size of the member in bytes, every array element included.
    pub size: u32,
    /// Number of array elements, `1` for non arrays.
    pub array_size: u32,
    /// Distance between array elements in bytes, `0` for non arrays.
    pub array_stride: u32,
    /// Distance between matrix columns in bytes, `0` for non matrices.
    pub matrix_stride: u32,
}

/// Size and alignment of a single, non array, value.
#[derive(Debug, Clone, Copy)]
struct ValueLayout {
    /// Size in bytes.
    size: u32,
    /// Base alignment in bytes.
    alignment: u32,
    /// Column stride of matrices.
    matrix_stride: u32,
}

/// Accumulates members of a uniform block.
#[derive(Debug, Clone)]
pub struct BlockLayout {
    /// Rules in use.
    rule: PackingRule,
    /// First free byte.
    cursor: u32,
    /// Largest base alignment of any member so far.
    max_alignment: u32,
}

impl BlockLayout {
    /// Starts an empty block.
    #[inline]
    #[must_use]
    pub const fn new(rule: PackingRule) -> Self {
        Self {
            rule,
            cursor: 0,
            max_alignment: SCALAR_SIZE,
        }
    }

    /// Appends a member, returning where it was placed.
    ///
    /// `array_size` is `None` for plain members. Types without a numeric shape
    /// occupy no space. Returns `None`, leaving the block untouched, if the padded block
    /// would no longer be addressable with 32 bits.
    #[inline]
    pub fn push(
        &mut self,
        data_type: ShaderVariableDataType,
        array_size: Option<u32>,
    ) -> Option<ShaderVariableBlockInfo> {
        let Some(value) = self.value_layout(data_type) else {
            return Some(ShaderVariableBlockInfo {
                offset: self.cursor,
                ..ShaderVariableBlockInfo::default()
            });
        };

        let (alignment, size, array_size, array_stride) = match array_size {
            Some(count) => {
                let alignment = match self.rule {
                    PackingRule::Std140 => value.alignment.max(STD140_VEC4_ALIGNMENT),
                    PackingRule::Std430 => value.alignment,
                };
                let stride = align_up(value.size, alignment)?;
                (alignment, stride.checked_mul(count)?, count, stride)
            }
            None => (value.alignment, value.size, 1, 0),
        };

        let offset = align_up(self.cursor, alignment)?;
        let cursor = offset.checked_add(size)?;
        // `size()` pads to at most a vec4.
        align_up(cursor, STD140_VEC4_ALIGNMENT)?;
        self.cursor = cursor;
        self.max_alignment = self.max_alignment.max(alignment);

        Some(ShaderVariableBlockInfo {
            offset,
            size,
            array_size,
            array_stride,
            matrix_stride: value.matrix_stride,
        })
    }

    /// Size of the block so far, padded to its alignment. `0` for an empty block.
    #[inline]
    #[must_use]
    pub fn size(&self) -> u32 {
        if self.cursor == 0 {
            return 0;
        }
        let alignment = match self.rule {
            PackingRule::Std140 => self.max_alignment.max(STD140_VEC4_ALIGNMENT),
            PackingRule::Std430 => self.max_alignment,
        };
        align_up(self.cursor, alignment).unwrap_or(self.cursor)
    }

    /// Size and alignment of a single value of the given type.
    fn value_layout(&self, data_type: ShaderVariableDataType) -> Option<ValueLayout> {
        let (columns, rows) = data_type.shape()?;
        let column_alignment = vector_alignment(rows);

        if columns == 1 {
            return Some(ValueLayout {
                size: rows * SCALAR_SIZE,
                alignment: column_alignment,
                matrix_stride: 0,
            });
        }

        // A matrix is laid out as an array of its column vectors.
        let stride = match self.rule {
            PackingRule::Std140 => column_alignment.max(STD140_VEC4_ALIGNMENT),
            PackingRule::Std430 => (rows * SCALAR_SIZE).next_multiple_of(column_alignment),
        };
        Some(ValueLayout {
            size: stride * columns,
            alignment: stride,
            matrix_stride: stride,
        })
    }
}

/// Base alignment of a vector with `rows` components. Three component vectors align like four.
const fn vector_alignment(rows: u32) -> u32 {
    match rows {
        1 => SCALAR_SIZE,
        2 => 2 * SCALAR_SIZE,
        _ => 4 * SCALAR_SIZE,
    }
}

/// Rounds `value` up to a multiple of `alignment`, `None` on overflow.
const fn align_up(value: u32, alignment: u32) -> Option<u32> {
    value.checked_next_multiple_of(alignment)
}
