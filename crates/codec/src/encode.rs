/// Types that know their big-endian wire encoding.
pub trait Encode {
    /// Append the encoding of `self` to `out`.
    fn encode_to(&self, out: &mut Vec<u8>);

    /// Number of bytes [`Encode::encode_to`] will append.
    fn encoded_size(&self) -> usize;

    /// Encode into a fresh buffer.
    fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_size());
        self.encode_to(&mut out);
        out
    }
}

macro_rules! impl_encode_int {
    ($($t:ty),*) => {$(
        impl Encode for $t {
            #[inline]
            fn encode_to(&self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_be_bytes());
            }

            #[inline]
            fn encoded_size(&self) -> usize {
                core::mem::size_of::<$t>()
            }
        }
    )*};
}

impl_encode_int!(u8, u16, u32, u64, i8, i16, i32, i64);

impl Encode for bool {
    #[inline]
    fn encode_to(&self, out: &mut Vec<u8>) {
        out.push(*self as u8);
    }

    #[inline]
    fn encoded_size(&self) -> usize {
        1
    }
}

impl<const N: usize> Encode for [u8; N] {
    #[inline]
    fn encode_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self);
    }

    #[inline]
    fn encoded_size(&self) -> usize {
        N
    }
}

impl<T: Encode> Encode for Option<T> {
    fn encode_to(&self, out: &mut Vec<u8>) {
        match self {
            None => out.push(0x00),
            Some(v) => {
                out.push(0x01);
                v.encode_to(out);
            }
        }
    }

    fn encoded_size(&self) -> usize {
        1 + self.as_ref().map_or(0, Encode::encoded_size)
    }
}

macro_rules! impl_length_tagged_writers {
    ($($tag:ty => $bytes:ident, $list:ident, $string:ident);* $(;)?) => {$(
        /// Write a byte sequence with a length prefix of the tag width.
        /// The length must fit the tag.
        pub fn $bytes(out: &mut Vec<u8>, data: &[u8]) {
            debug_assert!(data.len() <= <$tag>::MAX as usize);
            (data.len() as $tag).encode_to(out);
            out.extend_from_slice(data);
        }

        /// Write a list of encodable elements with a count prefix of the tag width.
        /// The element count must fit the tag.
        pub fn $list<T: Encode>(out: &mut Vec<u8>, items: &[T]) {
            debug_assert!(items.len() <= <$tag>::MAX as usize);
            (items.len() as $tag).encode_to(out);
            for item in items {
                item.encode_to(out);
            }
        }

        /// Write a string as raw bytes with a length prefix of the tag width.
        pub fn $string(out: &mut Vec<u8>, s: &str) {
            $bytes(out, s.as_bytes());
        }
    )*};
}

impl_length_tagged_writers! {
    u8  => write_bytes_u8,  write_list_u8,  write_string_u8;
    u16 => write_bytes_u16, write_list_u16, write_string_u16;
    u32 => write_bytes_u32, write_list_u32, write_string_u32;
}
