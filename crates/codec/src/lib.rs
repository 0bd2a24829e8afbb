//! Big-endian binary wire codec.
//!
//! The layout of a value is dictated entirely by its type: fixed-width
//! integers are two's-complement big-endian, booleans are a single strict
//! `0x00`/`0x01` byte, fixed arrays are the concatenation of their
//! elements, and structures encode their fields in declaration order.
//! Variable-length sequences and strings carry a length prefix whose
//! width is chosen per field at the call site (`write_bytes_u16`,
//! `read_list_u16`, ...). Optional values are a boolean prefix followed
//! by the value when present.
//!
//! Decoding is strict: truncated input fails with [`Error::UnexpectedEof`],
//! unknown variant or flag bytes with [`Error::InvalidTag`], and
//! [`Decode::from_bytes`] rejects buffers that are not fully consumed
//! with [`Error::TrailingBytes`].

mod decode;
mod encode;

pub use decode::{
    read_bytes_u16, read_bytes_u32, read_bytes_u8, read_list_u16, read_list_u32, read_list_u8,
    read_string_u16, read_string_u32, read_string_u8, Decode, Reader,
};
pub use encode::{
    write_bytes_u16, write_bytes_u32, write_bytes_u8, write_list_u16, write_list_u32,
    write_list_u8, write_string_u16, write_string_u32, write_string_u8, Encode,
};

/// Errors raised while decoding wire data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Reached the end of input while more bytes were required.
    #[error("unexpected end of input")]
    UnexpectedEof,
    /// A variant tag, boolean or optional flag byte had no defined meaning.
    #[error("invalid tag byte 0x{tag:02x}")]
    InvalidTag { tag: u8 },
    /// A full-buffer decode left bytes unconsumed.
    #[error("{remaining} trailing bytes after decode")]
    TrailingBytes { remaining: usize },
}

pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_are_big_endian() {
        assert_eq!(0x0102u16.to_bytes(), vec![0x01, 0x02]);
        assert_eq!(0xdeadbeefu32.to_bytes(), vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(
            1u64.to_bytes(),
            vec![0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01]
        );
        assert_eq!((-2i16).to_bytes(), vec![0xff, 0xfe]);

        assert_eq!(u16::from_bytes(&[0x01, 0x02]).unwrap(), 0x0102);
        assert_eq!(i32::from_bytes(&[0xff, 0xff, 0xff, 0xfe]).unwrap(), -2);
    }

    #[test]
    fn bool_is_strict() {
        assert_eq!(true.to_bytes(), vec![0x01]);
        assert_eq!(false.to_bytes(), vec![0x00]);
        assert_eq!(bool::from_bytes(&[0x00]).unwrap(), false);
        assert_eq!(bool::from_bytes(&[0x01]).unwrap(), true);
        assert_eq!(
            bool::from_bytes(&[0x02]).unwrap_err(),
            Error::InvalidTag { tag: 0x02 }
        );
    }

    #[test]
    fn fixed_arrays_concatenate() {
        let arr = [0xaau8; 20];
        assert_eq!(arr.to_bytes(), vec![0xaa; 20]);
        assert_eq!(<[u8; 20]>::from_bytes(&vec![0xaa; 20]).unwrap(), arr);
        assert_eq!(
            <[u8; 20]>::from_bytes(&[0u8; 19]).unwrap_err(),
            Error::UnexpectedEof
        );
    }

    #[test]
    fn optional_uses_bool_prefix() {
        let some: Option<u16> = Some(7);
        let none: Option<u16> = None;
        assert_eq!(some.to_bytes(), vec![0x01, 0x00, 0x07]);
        assert_eq!(none.to_bytes(), vec![0x00]);
        assert_eq!(Option::<u16>::from_bytes(&[0x00]).unwrap(), None);
        assert_eq!(Option::<u16>::from_bytes(&[0x01, 0x00, 0x07]).unwrap(), Some(7));
        assert_eq!(
            Option::<u16>::from_bytes(&[0x05]).unwrap_err(),
            Error::InvalidTag { tag: 0x05 }
        );
    }

    #[test]
    fn length_prefixed_bytes_round_trip() {
        let data = b"abc".to_vec();

        let mut out = Vec::new();
        write_bytes_u8(&mut out, &data);
        assert_eq!(out, vec![0x03, b'a', b'b', b'c']);
        let mut r = Reader::new(&out);
        assert_eq!(read_bytes_u8(&mut r).unwrap(), data);

        let mut out = Vec::new();
        write_bytes_u16(&mut out, &data);
        assert_eq!(out, vec![0x00, 0x03, b'a', b'b', b'c']);
        let mut r = Reader::new(&out);
        assert_eq!(read_bytes_u16(&mut r).unwrap(), data);
    }

    #[test]
    fn strings_are_raw_bytes() {
        let mut out = Vec::new();
        write_string_u8(&mut out, "hi");
        assert_eq!(out, vec![0x02, b'h', b'i']);
        let mut r = Reader::new(&out);
        assert_eq!(read_string_u8(&mut r).unwrap(), "hi");
    }

    #[test]
    fn lists_prefix_their_element_count() {
        let xs: Vec<u16> = vec![1, 2, 3];
        let mut out = Vec::new();
        write_list_u16(&mut out, &xs);
        assert_eq!(out, vec![0x00, 0x03, 0, 1, 0, 2, 0, 3]);
        let mut r = Reader::new(&out);
        assert_eq!(read_list_u16::<u16>(&mut r).unwrap(), xs);
    }

    #[test]
    fn truncation_is_eof() {
        let mut r = Reader::new(&[0x00]);
        assert_eq!(u32::decode_from(&mut r).unwrap_err(), Error::UnexpectedEof);

        // Declared length larger than the remaining input.
        let mut r = Reader::new(&[0x10, b'a']);
        assert_eq!(read_bytes_u8(&mut r).unwrap_err(), Error::UnexpectedEof);

        // An impossible list length fails before allocating.
        let mut r = Reader::new(&[0xff, 0xff]);
        assert_eq!(
            read_list_u8::<u64>(&mut r).unwrap_err(),
            Error::UnexpectedEof
        );
    }

    #[test]
    fn full_decode_rejects_trailing_bytes() {
        assert_eq!(
            u8::from_bytes(&[0x01, 0x02]).unwrap_err(),
            Error::TrailingBytes { remaining: 1 }
        );
    }
}
