use bytes::BytesMut;
use std::{fs::File, io::Error as IoError};

/// The result of one background refill, handed back through the bridge.
pub(crate) struct Outcome {
    /// The file offset the refill started at.
    pub offset: u64,
    /// The filled buffer, or the error that interrupted the read.
    pub result: Result<BytesMut, IoError>,
}

/// Reads exactly `len` bytes from `file` starting at `offset` into `buf`.
///
/// The buffer is exclusively owned for the duration of the read; no shared
/// cache state is touched. A read that ends before `len` bytes surfaces as an
/// error rather than a partially filled buffer, so callers can treat any `Ok`
/// as a complete window.
pub(crate) fn fill(file: &File, offset: u64, len: usize, mut buf: BytesMut) -> Result<BytesMut, IoError> {
    buf.resize(len, 0);
    if len == 0 {
        return Ok(buf);
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::FileExt;
        file.read_exact_at(buf.as_mut(), offset)?;
    }
    #[cfg(windows)]
    {
        use std::os::windows::fs::FileExt;
        let mut read = 0;
        while read < buf.len() {
            let n = file.seek_read(&mut buf.as_mut()[read..], offset + read as u64)?;
            if n == 0 {
                return Err(IoError::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "file ended before the requested range",
                ));
            }
            read += n;
        }
    }

    Ok(buf)
}
