use warptile_core::Numeric;

/// User-supplied value transform applied in flight during data movement or at
/// accumulator flush. Opaque to the engine and side-effect free.
pub trait ElementwiseOp<E: Numeric>: Send + Sync {
    /// Whether `apply` is the identity. Split-K launches fold partial sums
    /// into the output, which is only sound for identity output transforms;
    /// setup validation relies on this flag.
    const IS_IDENTITY: bool = false;

    fn apply(&self, value: E) -> E;
}

/// Forwards values unchanged.
#[derive(Copy, Clone, Debug, Default)]
pub struct PassThrough;

impl<E: Numeric> ElementwiseOp<E> for PassThrough {
    const IS_IDENTITY: bool = true;

    fn apply(&self, value: E) -> E {
        value
    }
}

/// Multiplies every value by a constant factor.
#[derive(Copy, Clone, Debug)]
pub struct Scale {
    pub factor: f32,
}

impl<E: Numeric> ElementwiseOp<E> for Scale {
    fn apply(&self, value: E) -> E {
        E::from_f32(value.to_f32() * self.factor)
    }
}
