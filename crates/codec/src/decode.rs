use crate::{Error, Result};

/// Cursor over an input buffer.
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Reader { buf, pos: 0 }
    }

    /// Bytes not yet consumed.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Take the next `n` bytes, or fail with [`Error::UnexpectedEof`].
    pub fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(Error::UnexpectedEof);
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    #[inline]
    pub fn take_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }
}

/// Types that can be decoded from their big-endian wire encoding.
pub trait Decode: Sized {
    /// Decode one value, advancing the reader past it.
    fn decode_from(r: &mut Reader<'_>) -> Result<Self>;

    /// Decode a value that must span the whole buffer.
    fn from_bytes(buf: &[u8]) -> Result<Self> {
        let mut r = Reader::new(buf);
        let value = Self::decode_from(&mut r)?;
        if r.remaining() > 0 {
            return Err(Error::TrailingBytes {
                remaining: r.remaining(),
            });
        }
        Ok(value)
    }
}

macro_rules! impl_decode_int {
    ($($t:ty),*) => {$(
        impl Decode for $t {
            #[inline]
            fn decode_from(r: &mut Reader<'_>) -> Result<Self> {
                let raw = r.take(core::mem::size_of::<$t>())?;
                Ok(<$t>::from_be_bytes(raw.try_into().expect("width checked")))
            }
        }
    )*};
}

impl_decode_int!(u8, u16, u32, u64, i8, i16, i32, i64);

impl Decode for bool {
    fn decode_from(r: &mut Reader<'_>) -> Result<Self> {
        match r.take_u8()? {
            0x00 => Ok(false),
            0x01 => Ok(true),
            tag => Err(Error::InvalidTag { tag }),
        }
    }
}

impl<const N: usize> Decode for [u8; N] {
    fn decode_from(r: &mut Reader<'_>) -> Result<Self> {
        let raw = r.take(N)?;
        Ok(raw.try_into().expect("width checked"))
    }
}

impl<T: Decode> Decode for Option<T> {
    fn decode_from(r: &mut Reader<'_>) -> Result<Self> {
        if bool::decode_from(r)? {
            Ok(Some(T::decode_from(r)?))
        } else {
            Ok(None)
        }
    }
}

macro_rules! impl_length_tagged_readers {
    ($($tag:ty => $bytes:ident, $list:ident, $string:ident);* $(;)?) => {$(
        /// Read a byte sequence with a length prefix of the tag width.
        pub fn $bytes(r: &mut Reader<'_>) -> Result<Vec<u8>> {
            let len = <$tag>::decode_from(r)? as usize;
            Ok(r.take(len)?.to_vec())
        }

        /// Read a list with a count prefix of the tag width.
        ///
        /// The count is sanity-checked against the remaining input before
        /// anything is allocated, so a forged prefix cannot force a huge
        /// allocation.
        pub fn $list<T: Decode>(r: &mut Reader<'_>) -> Result<Vec<T>> {
            let len = <$tag>::decode_from(r)? as usize;
            if len > r.remaining() {
                return Err(Error::UnexpectedEof);
            }
            let mut items = Vec::with_capacity(len);
            for _ in 0..len {
                items.push(T::decode_from(r)?);
            }
            Ok(items)
        }

        /// Read a string stored as raw bytes with a length prefix.
        /// Invalid UTF-8 is reported as an invalid tag at the offending byte.
        pub fn $string(r: &mut Reader<'_>) -> Result<String> {
            let raw = $bytes(r)?;
            String::from_utf8(raw).map_err(|e| {
                let at = e.utf8_error().valid_up_to();
                Error::InvalidTag {
                    tag: e.as_bytes().get(at).copied().unwrap_or(0),
                }
            })
        }
    )*};
}

impl_length_tagged_readers! {
    u8  => read_bytes_u8,  read_list_u8,  read_string_u8;
    u16 => read_bytes_u16, read_list_u16, read_string_u16;
    u32 => read_bytes_u32, read_list_u32, read_string_u32;
}
