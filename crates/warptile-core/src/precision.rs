use std::sync::atomic::{AtomicU16, AtomicU32, Ordering};

use half::{bf16, f16};
use num_traits::NumAssign;

/// Element type usable in kernel buffers.
///
/// Conversions route through `f32`, which is the widest register precision
/// the engine computes in.
pub trait Numeric:
    bytemuck::Pod + Copy + PartialEq + Send + Sync + std::fmt::Debug + NumAssign + 'static
{
    const NAME: &'static str;

    fn from_f32(value: f32) -> Self;
    fn to_f32(self) -> f32;

    /// Atomically adds `value` to the element behind `slot`.
    ///
    /// Realized as a compare-and-swap on the element's bit pattern, the
    /// portable equivalent of a hardware atomic accumulate.
    ///
    /// # Safety
    ///
    /// `slot` must be valid, properly aligned, and every concurrent access to
    /// it for the duration of the launch must go through this function.
    unsafe fn atomic_add(slot: *mut Self, value: Self);
}

impl Numeric for f32 {
    const NAME: &'static str = "f32";

    fn from_f32(value: f32) -> Self {
        value
    }

    fn to_f32(self) -> f32 {
        self
    }

    unsafe fn atomic_add(slot: *mut Self, value: Self) {
        let atomic = unsafe { &*(slot as *const AtomicU32) };
        let mut current = atomic.load(Ordering::Relaxed);
        loop {
            let updated = (f32::from_bits(current) + value).to_bits();
            match atomic.compare_exchange_weak(
                current,
                updated,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }
    }
}

macro_rules! impl_numeric_half {
    ($ty:ty, $name:literal) => {
        impl Numeric for $ty {
            const NAME: &'static str = $name;

            fn from_f32(value: f32) -> Self {
                <$ty>::from_f32(value)
            }

            fn to_f32(self) -> f32 {
                <$ty>::to_f32(self)
            }

            unsafe fn atomic_add(slot: *mut Self, value: Self) {
                let atomic = unsafe { &*(slot as *const AtomicU16) };
                let mut current = atomic.load(Ordering::Relaxed);
                loop {
                    let updated = (<$ty>::from_bits(current) + value).to_bits();
                    match atomic.compare_exchange_weak(
                        current,
                        updated,
                        Ordering::Relaxed,
                        Ordering::Relaxed,
                    ) {
                        Ok(_) => break,
                        Err(observed) => current = observed,
                    }
                }
            }
        }
    };
}

impl_numeric_half!(f16, "f16");
impl_numeric_half!(bf16, "bf16");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atomic_add_accumulates_f32() {
        let mut value = 1.0f32;
        unsafe {
            f32::atomic_add(&mut value, 2.5);
            f32::atomic_add(&mut value, -0.5);
        }
        assert_eq!(value, 3.0);
    }

    #[test]
    fn atomic_add_accumulates_f16() {
        let mut value = f16::from_f32(1.0);
        unsafe {
            f16::atomic_add(&mut value, f16::from_f32(2.0));
        }
        assert_eq!(value.to_f32(), 3.0);
    }

    #[test]
    fn conversions_round_trip_through_f32() {
        assert_eq!(f16::from_f32(0.5).to_f32(), 0.5);
        assert_eq!(bf16::from_f32(2.0).to_f32(), 2.0);
    }
}
