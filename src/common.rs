/// Stream sample rate (samples per second per channel).
pub type SampleRate = u32;

/// Number of channels in a stream.
pub type ChannelCount = u16;

/// Internal sample representation, normalized to `-1.0..=1.0`.
///
/// Every codec decodes into this type; conversion to the requested output
/// encoding happens once, at the end of the render pipeline.
pub type Sample = f32;

/// Compile-time check that an error type can be shared across threads and
/// cloned, which is what callers storing or forwarding our errors rely on.
macro_rules! assert_error_traits {
    ($to_test:path) => {
        const _: () = {
            const fn check<T>()
            where
                T: std::error::Error + Send + Sync + Clone + std::fmt::Debug + std::fmt::Display,
            {
            }
            check::<$to_test>();
        };
    };
}
pub(crate) use assert_error_traits;
