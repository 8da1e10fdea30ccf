/*!
Types and routines that support the wire format of compiled patterns.

A serialized pattern is not a snapshot of the regex engine's internal
automata. It is the pattern's persistent state: its source and its compile
time flags, wrapped in a small header so that corrupt or foreign data is
rejected with a useful message instead of being silently recompiled.

The layout is:

```text
label      NUL terminated, padded with NUL bytes to a multiple of 4
u32        endianness check, always 0xFEFF
u32        format version
u32        pattern flag bits
u32        pattern length in bytes, N
[u8; N]    pattern source, UTF-8
```

Every integer is written in little endian. There is no trailing data.
*/

use core::{cmp, mem::size_of};

/// An error that occurs when serializing a pattern.
///
/// A `SerializeError` provides no introspection capabilities. Its only
/// supported operation is conversion to a human readable error message.
#[derive(Debug)]
pub struct SerializeError {
    what: &'static str,
}

impl SerializeError {
    fn too_big(what: &'static str) -> SerializeError {
        SerializeError { what }
    }
}

impl std::error::Error for SerializeError {}

impl core::fmt::Display for SerializeError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "{} is too big to fit in a u32", self.what)
    }
}

/// An error that occurs when deserializing a pattern.
///
/// A `DeserializeError` provides no introspection capabilities. Its only
/// supported operation is conversion to a human readable error message.
#[derive(Debug)]
pub struct DeserializeError(DeserializeErrorKind);

#[derive(Debug)]
enum DeserializeErrorKind {
    Generic { msg: &'static str },
    BufferTooSmall { what: &'static str },
    InvalidUsize { what: &'static str },
    VersionMismatch { expected: u32, found: u32 },
    EndianMismatch { expected: u32, found: u32 },
    LabelMismatch { expected: &'static str },
    InvalidFlags { bits: u32 },
    InvalidUtf8 { what: &'static str },
    TrailingBytes { len: usize },
}

impl DeserializeError {
    pub(crate) fn generic(msg: &'static str) -> DeserializeError {
        DeserializeError(DeserializeErrorKind::Generic { msg })
    }

    fn buffer_too_small(what: &'static str) -> DeserializeError {
        DeserializeError(DeserializeErrorKind::BufferTooSmall { what })
    }

    fn invalid_usize(what: &'static str) -> DeserializeError {
        DeserializeError(DeserializeErrorKind::InvalidUsize { what })
    }

    fn version_mismatch(expected: u32, found: u32) -> DeserializeError {
        DeserializeError(DeserializeErrorKind::VersionMismatch {
            expected,
            found,
        })
    }

    fn endian_mismatch(expected: u32, found: u32) -> DeserializeError {
        DeserializeError(DeserializeErrorKind::EndianMismatch {
            expected,
            found,
        })
    }

    fn label_mismatch(expected: &'static str) -> DeserializeError {
        DeserializeError(DeserializeErrorKind::LabelMismatch { expected })
    }

    pub(crate) fn invalid_flags(bits: u32) -> DeserializeError {
        DeserializeError(DeserializeErrorKind::InvalidFlags { bits })
    }

    fn invalid_utf8(what: &'static str) -> DeserializeError {
        DeserializeError(DeserializeErrorKind::InvalidUtf8 { what })
    }

    fn trailing_bytes(len: usize) -> DeserializeError {
        DeserializeError(DeserializeErrorKind::TrailingBytes { len })
    }
}

impl std::error::Error for DeserializeError {}

impl core::fmt::Display for DeserializeError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        use self::DeserializeErrorKind::*;

        match self.0 {
            Generic { msg } => write!(f, "{}", msg),
            BufferTooSmall { what } => {
                write!(f, "buffer is too small to read {}", what)
            }
            InvalidUsize { what } => {
                write!(f, "{} is too big to fit in a usize", what)
            }
            VersionMismatch { expected, found } => write!(
                f,
                "unsupported version: \
                 expected version {} but found version {}",
                expected, found,
            ),
            EndianMismatch { expected, found } => write!(
                f,
                "endianness mismatch: expected 0x{:X} but got 0x{:X}",
                expected, found,
            ),
            LabelMismatch { expected } => write!(
                f,
                "label mismatch: start of serialized object should \
                 contain a NUL terminated {:?} label, but a different \
                 label was found",
                expected,
            ),
            InvalidFlags { bits } => {
                write!(f, "unrecognized pattern flag bits 0x{:X}", bits)
            }
            InvalidUtf8 { what } => write!(f, "{} is not valid UTF-8", what),
            TrailingBytes { len } => {
                write!(f, "found {} unexpected trailing bytes", len)
            }
        }
    }
}

/// Reads a NUL terminated label (plus padding) from the start of `slice` and
/// confirms that it is equivalent to `expected_label`.
///
/// Upon success, the total number of bytes read (including padding bytes) is
/// returned.
pub(crate) fn read_label(
    slice: &[u8],
    expected_label: &'static str,
) -> Result<usize, DeserializeError> {
    // Set an upper bound on how many bytes we scan for a NUL. Since no label
    // in this crate is longer than 256 bytes, if we can't find one within that
    // range, then we have corrupted data.
    let first_nul =
        slice[..cmp::min(slice.len(), 256)].iter().position(|&b| b == 0);
    let first_nul = match first_nul {
        Some(first_nul) => first_nul,
        None => {
            return Err(DeserializeError::generic(
                "could not find NUL terminated label \
                 at start of serialized object",
            ));
        }
    };
    let len = first_nul + 1 + padding_len(first_nul + 1);
    if slice.len() < len {
        return Err(DeserializeError::generic(
            "could not find properly sized label at start of serialized object",
        ));
    }
    if expected_label.as_bytes() != &slice[..first_nul] {
        return Err(DeserializeError::label_mismatch(expected_label));
    }
    if slice[first_nul..len].iter().any(|&b| b != 0) {
        return Err(DeserializeError::generic(
            "label padding contains non-NUL bytes",
        ));
    }
    Ok(len)
}

/// Writes the given label to `dst` as a NUL terminated string, followed by
/// as many NUL bytes as are needed for the number of bytes written to be a
/// multiple of 4.
///
/// The label must not contain NUL and must not be longer than 255 bytes.
/// Labels are compile time constants in this crate, so a violation is a bug
/// and panics.
pub(crate) fn write_label(label: &str, dst: &mut Vec<u8>) -> usize {
    assert!(label.len() <= 255, "label must not be longer than 255 bytes");
    assert!(!label.as_bytes().contains(&0), "label must not contain NUL");
    let nwrite = label.len() + 1 + padding_len(label.len() + 1);
    dst.extend_from_slice(label.as_bytes());
    dst.resize(dst.len() + (nwrite - label.len()), 0);
    nwrite
}

/// Reads the endianness check from the beginning of the given slice.
///
/// Upon success, the total number of bytes read is returned.
pub(crate) fn read_endianness_check(
    slice: &[u8],
) -> Result<usize, DeserializeError> {
    let (n, nr) = try_read_u32(slice, "endianness check")?;
    if n != 0xFEFF {
        return Err(DeserializeError::endian_mismatch(0xFEFF, n));
    }
    Ok(nr)
}

/// Writes 0xFEFF so that it can be checked during deserialization.
pub(crate) fn write_endianness_check(dst: &mut Vec<u8>) -> usize {
    write_u32(0xFEFF, dst)
}

/// Reads a version number from the beginning of the given slice and confirms
/// that is matches the expected version number given.
///
/// N.B. Currently, we require that the version number is exactly equivalent.
/// If the format ever changes, then older versions will need to be decoded
/// explicitly.
pub(crate) fn read_version(
    slice: &[u8],
    expected_version: u32,
) -> Result<usize, DeserializeError> {
    let (n, nr) = try_read_u32(slice, "version")?;
    if n != expected_version {
        return Err(DeserializeError::version_mismatch(expected_version, n));
    }
    Ok(nr)
}

/// Writes the given version number.
pub(crate) fn write_version(version: u32, dst: &mut Vec<u8>) -> usize {
    write_u32(version, dst)
}

/// Reads a length-prefixed UTF-8 string. `what` names the string in error
/// messages and should be a noun in singular form.
///
/// Upon success, the string and the total number of bytes read are returned.
pub(crate) fn read_str<'a>(
    slice: &'a [u8],
    what: &'static str,
) -> Result<(&'a str, usize), DeserializeError> {
    let (len, nr) = try_read_u32_as_usize(slice, what)?;
    let slice = &slice[nr..];
    check_slice_len(slice, len, what)?;
    let s = core::str::from_utf8(&slice[..len])
        .map_err(|_| DeserializeError::invalid_utf8(what))?;
    Ok((s, nr + len))
}

/// Writes a length-prefixed string. This fails when the string's length
/// doesn't fit in a `u32`.
pub(crate) fn write_str(
    s: &str,
    what: &'static str,
    dst: &mut Vec<u8>,
) -> Result<usize, SerializeError> {
    let len =
        u32::try_from(s.len()).map_err(|_| SerializeError::too_big(what))?;
    let nwrite = write_u32(len, dst);
    dst.extend_from_slice(s.as_bytes());
    Ok(nwrite + s.len())
}

/// Returns an error if `slice` has any bytes left in it.
pub(crate) fn check_exhausted(slice: &[u8]) -> Result<(), DeserializeError> {
    if !slice.is_empty() {
        return Err(DeserializeError::trailing_bytes(slice.len()));
    }
    Ok(())
}

/// Try to read a u32 as a usize from the beginning of the given slice.
pub(crate) fn try_read_u32_as_usize(
    slice: &[u8],
    what: &'static str,
) -> Result<(usize, usize), DeserializeError> {
    try_read_u32(slice, what).and_then(|(n, nr)| {
        usize::try_from(n)
            .map(|n| (n, nr))
            .map_err(|_| DeserializeError::invalid_usize(what))
    })
}

/// Try to read a little endian u32 from the beginning of the given slice. If
/// the slice has fewer than 4 bytes, then this returns an error. The error
/// message will include the `what` description of what is being
/// deserialized, for better error messages. `what` should be a noun in
/// singular form.
///
/// Upon success, this also returns the number of bytes read.
pub(crate) fn try_read_u32(
    slice: &[u8],
    what: &'static str,
) -> Result<(u32, usize), DeserializeError> {
    check_slice_len(slice, size_of::<u32>(), what)?;
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&slice[..size_of::<u32>()]);
    Ok((u32::from_le_bytes(bytes), size_of::<u32>()))
}

/// Writes a little endian u32 and returns the number of bytes written.
pub(crate) fn write_u32(n: u32, dst: &mut Vec<u8>) -> usize {
    dst.extend_from_slice(&n.to_le_bytes());
    size_of::<u32>()
}

/// Checks that the given slice has some minimal length. If it's smaller than
/// the bound given, then a "buffer too small" error is returned with `what`
/// describing what the buffer represents.
fn check_slice_len<T>(
    slice: &[T],
    at_least_len: usize,
    what: &'static str,
) -> Result<(), DeserializeError> {
    if slice.len() < at_least_len {
        return Err(DeserializeError::buffer_too_small(what));
    }
    Ok(())
}

/// Returns the number of additional bytes required to add to the given length
/// in order to make the total length a multiple of 4. The return value is
/// always less than 4.
fn padding_len(non_padding_len: usize) -> usize {
    (4 - (non_padding_len & 0b11)) & 0b11
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_is_padded() {
        let mut buf = vec![];
        assert_eq!(8, write_label("abcdef", &mut buf));
        assert_eq!(b"abcdef\x00\x00", &buf[..]);
        assert_eq!(8, read_label(&buf, "abcdef").unwrap());

        let mut buf = vec![];
        assert_eq!(4, write_label("abc", &mut buf));
        assert_eq!(b"abc\x00", &buf[..]);
        assert_eq!(4, read_label(&buf, "abc").unwrap());
    }

    #[test]
    fn label_mismatch() {
        let mut buf = vec![];
        write_label("abc", &mut buf);
        let err = read_label(&buf, "abd").unwrap_err();
        assert!(err.to_string().contains("label mismatch"), "{}", err);
        assert!(read_label(b"abc", "abc").is_err());
        assert!(read_label(b"abc\x00\x00", "abc").is_ok());
        assert!(read_label(b"abcd\x00\x01\x00\x00", "abcd").is_err());
    }

    #[test]
    fn version_and_endianness() {
        let mut buf = vec![];
        write_endianness_check(&mut buf);
        write_version(7, &mut buf);
        assert_eq!(4, read_endianness_check(&buf).unwrap());
        assert_eq!(4, read_version(&buf[4..], 7).unwrap());

        let err = read_version(&buf[4..], 8).unwrap_err();
        assert_eq!(
            "unsupported version: expected version 8 but found version 7",
            err.to_string(),
        );
        let err = read_endianness_check(&[0xFF, 0xFE]).unwrap_err();
        assert_eq!(
            "buffer is too small to read endianness check",
            err.to_string(),
        );
        assert!(read_endianness_check(&[0, 0, 0xFE, 0xFF]).is_err());
    }

    #[test]
    fn strings() {
        let mut buf = vec![];
        assert_eq!(9, write_str("hello", "pattern", &mut buf).unwrap());
        let (s, nr) = read_str(&buf, "pattern").unwrap();
        assert_eq!(("hello", 9), (s, nr));
        assert!(check_exhausted(&buf[nr..]).is_ok());

        let err = read_str(&buf[..7], "pattern").unwrap_err();
        assert_eq!("buffer is too small to read pattern", err.to_string());

        let mut buf = vec![];
        write_u32(2, &mut buf);
        buf.extend_from_slice(b"\xFF\xFE");
        let err = read_str(&buf, "pattern").unwrap_err();
        assert_eq!("pattern is not valid UTF-8", err.to_string());
    }

    #[test]
    fn trailing_bytes() {
        let err = check_exhausted(b"xyz").unwrap_err();
        assert_eq!("found 3 unexpected trailing bytes", err.to_string());
    }
}
