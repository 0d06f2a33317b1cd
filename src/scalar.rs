mod sealed {
    pub trait Sealed {}
}

/// Plain numeric types that may be copied byte-for-byte to and from device
/// memory or passed by value as kernel arguments.
pub trait Scalar: sealed::Sealed + Copy + Default + Send + Sync + 'static {}

macro_rules! scalars {
    ($($ty:ty),*) => {
        $(
            impl sealed::Sealed for $ty {}
            impl Scalar for $ty {}
        )*
    };
}

scalars!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);
