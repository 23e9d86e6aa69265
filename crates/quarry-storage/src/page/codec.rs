//! Fixed-width byte encoding for page entries.

/// A value with a fixed-width little-endian byte encoding.
///
/// Bucket pages store keys and values inline at computed offsets, so
/// every entry type must encode to exactly [`ENCODED_SIZE`] bytes.
///
/// [`ENCODED_SIZE`]: FixedCodec::ENCODED_SIZE
pub trait FixedCodec: Copy {
    /// Number of bytes this type occupies on a page.
    const ENCODED_SIZE: usize;

    /// Writes the encoding into `buf`, which is exactly
    /// `ENCODED_SIZE` bytes.
    fn encode_to(&self, buf: &mut [u8]);

    /// Reads a value back from `buf`, which is exactly
    /// `ENCODED_SIZE` bytes.
    fn decode_from(buf: &[u8]) -> Self;
}

macro_rules! impl_fixed_codec_for_int {
    ($($ty:ty),*) => {
        $(
            impl FixedCodec for $ty {
                const ENCODED_SIZE: usize = std::mem::size_of::<$ty>();

                #[inline]
                fn encode_to(&self, buf: &mut [u8]) {
                    buf.copy_from_slice(&self.to_le_bytes());
                }

                #[inline]
                fn decode_from(buf: &[u8]) -> Self {
                    let mut bytes = [0u8; std::mem::size_of::<$ty>()];
                    bytes.copy_from_slice(buf);
                    <$ty>::from_le_bytes(bytes)
                }
            }
        )*
    };
}

impl_fixed_codec_for_int!(i16, u16, i32, u32, i64, u64);
