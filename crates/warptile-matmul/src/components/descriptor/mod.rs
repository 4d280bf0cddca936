//! Tensor descriptors: a base strided layout plus a chain of index
//! transforms (pass-through, merge, unmerge, right-pad) mapping logical
//! multi-indices to linear element offsets.
//!
//! Descriptors are built once per problem on the host and consumed read-only
//! by every group. Padded positions map to [`TensorElement::Pad`]: they read
//! as zero and are never written back.

use std::fmt::{Debug, Display};

use super::{FormattedConfigError, InvalidConfigError};

/// One index transform, mapping upper (logical) coordinates to coordinates of
/// the previous (lower) level.
#[derive(Clone, Debug)]
pub enum AxisTransform {
    /// Forwards one lower axis unchanged.
    PassThrough { axis: usize },
    /// Right-pads one lower axis up to `padded` elements.
    RightPad { axis: usize, padded: u32 },
    /// Fuses several lower axes (major to minor) into one upper axis.
    Merge { axes: Vec<usize> },
    /// Splits one lower axis into several upper axes (major to minor).
    Unmerge { axis: usize, lengths: Vec<u32> },
}

impl AxisTransform {
    fn num_upper_dims(&self) -> usize {
        match self {
            AxisTransform::PassThrough { .. } => 1,
            AxisTransform::RightPad { .. } => 1,
            AxisTransform::Merge { .. } => 1,
            AxisTransform::Unmerge { lengths, .. } => lengths.len(),
        }
    }

    fn lower_axes(&self) -> Vec<usize> {
        match self {
            AxisTransform::PassThrough { axis }
            | AxisTransform::RightPad { axis, .. }
            | AxisTransform::Unmerge { axis, .. } => vec![*axis],
            AxisTransform::Merge { axes } => axes.clone(),
        }
    }

    fn upper_lengths(&self, lower_lengths: &[u32]) -> Result<Vec<u32>, InvalidConfigError> {
        match self {
            AxisTransform::PassThrough { axis } => Ok(vec![lower_lengths[*axis]]),
            AxisTransform::RightPad { axis, padded } => {
                let raw = lower_lengths[*axis];
                if *padded < raw {
                    let (padded, raw) = (*padded, raw);
                    return Err(FormattedConfigError::new(move || {
                        format!("Right-pad target {padded} is below the raw length {raw}")
                    }));
                }
                Ok(vec![*padded])
            }
            AxisTransform::Merge { axes } => {
                Ok(vec![axes.iter().map(|axis| lower_lengths[*axis]).product()])
            }
            AxisTransform::Unmerge { axis, lengths } => {
                let product: u32 = lengths.iter().product();
                if product != lower_lengths[*axis] {
                    let (product, len) = (product, lower_lengths[*axis]);
                    return Err(FormattedConfigError::new(move || {
                        format!("Unmerge lengths multiply to {product}, axis has {len}")
                    }));
                }
                Ok(lengths.clone())
            }
        }
    }
}

/// One level of the transform chain. Upper dimensions are the transforms'
/// outputs in declaration order, optionally permuted.
#[derive(Clone, Debug)]
pub struct TransformStage {
    ops: Vec<AxisTransform>,
    /// `order[j]` = which produced output lands at upper dimension `j`.
    order: Option<Vec<usize>>,
}

impl TransformStage {
    pub fn new(ops: Vec<AxisTransform>) -> Self {
        Self { ops, order: None }
    }

    pub fn with_order(mut self, order: Vec<usize>) -> Self {
        self.order = Some(order);
        self
    }
}

/// Result of resolving a logical multi-index.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TensorElement {
    /// Offset into the underlying buffer.
    Linear(usize),
    /// Position inside a right-padded region: reads as the fill value, never
    /// written.
    Pad,
}

/// A logical multi-index fell outside the (padded) descriptor bounds.
pub struct IndexError {
    pub index: Vec<u32>,
    pub lengths: Vec<u32>,
}

impl Display for IndexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "index {:?} outside descriptor bounds {:?}",
            self.index, self.lengths
        )
    }
}

impl Debug for IndexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

/// Immutable description of a tensor's logical shape and its mapping to
/// linear memory.
#[derive(Clone, Debug)]
pub struct TensorDescriptor {
    base_lengths: Vec<u32>,
    base_strides: Vec<u32>,
    stages: Vec<(TransformStage, Vec<u32>)>,
    lengths: Vec<u32>,
}

impl TensorDescriptor {
    pub fn new(lengths: Vec<u32>, strides: Vec<u32>) -> Result<Self, InvalidConfigError> {
        if lengths.len() != strides.len() {
            let (l, s) = (lengths.len(), strides.len());
            return Err(FormattedConfigError::new(move || {
                format!("Descriptor rank mismatch: {l} lengths, {s} strides")
            }));
        }
        Ok(Self {
            lengths: lengths.clone(),
            base_lengths: lengths,
            base_strides: strides,
            stages: Vec::new(),
        })
    }

    /// Composes a new descriptor from this one plus one transform stage.
    pub fn transform(mut self, stage: TransformStage) -> Result<Self, InvalidConfigError> {
        let lower_lengths = self.lengths.clone();

        let mut consumed = vec![false; lower_lengths.len()];
        for op in &stage.ops {
            for axis in op.lower_axes() {
                if axis >= lower_lengths.len() || consumed[axis] {
                    return Err(FormattedConfigError::new(move || {
                        format!("Transform stage reuses or exceeds lower axis {axis}")
                    }));
                }
                consumed[axis] = true;
            }
        }
        if consumed.iter().any(|used| !used) {
            return Err(FormattedConfigError::new(|| {
                "Transform stage must consume every lower axis exactly once".to_string()
            }));
        }

        let mut produced = Vec::new();
        for op in &stage.ops {
            produced.extend(op.upper_lengths(&lower_lengths)?);
        }

        let upper_lengths = match &stage.order {
            Some(order) => {
                if order.len() != produced.len() {
                    let (o, p) = (order.len(), produced.len());
                    return Err(FormattedConfigError::new(move || {
                        format!("Stage order has {o} entries for {p} outputs")
                    }));
                }
                order.iter().map(|&src| produced[src]).collect()
            }
            None => produced,
        };

        self.stages.push((stage, lower_lengths));
        self.lengths = upper_lengths;
        Ok(self)
    }

    pub fn rank(&self) -> usize {
        self.lengths.len()
    }

    /// Logical (padded) length of one axis.
    pub fn length(&self, axis: usize) -> u32 {
        self.lengths[axis]
    }

    pub fn lengths(&self) -> &[u32] {
        &self.lengths
    }

    /// Total logical element count; at least the raw element count since
    /// transforms only ever add padding.
    pub fn num_elements(&self) -> u64 {
        self.lengths.iter().map(|&len| len as u64).product()
    }

    /// Resolves a logical multi-index to a buffer offset or a padded slot.
    pub fn element(&self, index: &[u32]) -> Result<TensorElement, IndexError> {
        if index.len() != self.lengths.len()
            || index.iter().zip(&self.lengths).any(|(i, len)| i >= len)
        {
            return Err(IndexError {
                index: index.to_vec(),
                lengths: self.lengths.clone(),
            });
        }

        let mut coords = index.to_vec();
        for (stage, lower_lengths) in self.stages.iter().rev() {
            let produced = match &stage.order {
                Some(order) => {
                    let mut unpermuted = vec![0u32; coords.len()];
                    for (upper, &src) in order.iter().enumerate() {
                        unpermuted[src] = coords[upper];
                    }
                    unpermuted
                }
                None => coords,
            };

            let mut lower = vec![0u32; lower_lengths.len()];
            let mut cursor = 0;
            for op in &stage.ops {
                let upper = &produced[cursor..cursor + op.num_upper_dims()];
                cursor += op.num_upper_dims();
                match op {
                    AxisTransform::PassThrough { axis } => lower[*axis] = upper[0],
                    AxisTransform::RightPad { axis, .. } => {
                        if upper[0] >= lower_lengths[*axis] {
                            return Ok(TensorElement::Pad);
                        }
                        lower[*axis] = upper[0];
                    }
                    AxisTransform::Merge { axes } => {
                        let mut remaining = upper[0];
                        for &axis in axes.iter().rev() {
                            lower[axis] = remaining % lower_lengths[axis];
                            remaining /= lower_lengths[axis];
                        }
                    }
                    AxisTransform::Unmerge { axis, lengths } => {
                        let mut combined = 0u32;
                        for (coord, len) in upper.iter().zip(lengths) {
                            combined = combined * len + coord;
                        }
                        lower[*axis] = combined;
                    }
                }
            }
            coords = lower;
        }

        let offset = coords
            .iter()
            .zip(&self.base_strides)
            .map(|(&coord, &stride)| coord as usize * stride as usize)
            .sum();
        Ok(TensorElement::Linear(offset))
    }

    pub fn base_lengths(&self) -> &[u32] {
        &self.base_lengths
    }
}
