//! Fixed-buffer marshalling for `clGet*Info` style queries.

use crate::error::{ClError, Result, check};
use crate::sys::cl_int;
use std::mem;
use std::os::raw::c_void;
use std::ptr;

/// Buffer size for short names such as kernel function names.
pub(crate) const NAME_SIZE: usize = 256;
/// Buffer size for platform and device strings.
pub(crate) const STRING_SIZE: usize = 1024;

/// Runs a string query against a fixed `N`-byte buffer. The returned text
/// stops at the first NUL.
pub(crate) fn string<const N: usize>(
    query: impl FnOnce(usize, *mut c_void, *mut usize) -> cl_int,
) -> Result<String> {
    let mut buffer = [0u8; N];
    let mut len = 0usize;
    check(query(N, buffer.as_mut_ptr().cast(), &mut len))?;

    let bytes = &buffer[..len.min(N)];
    let bytes = match bytes.iter().position(|&b| b == 0) {
        Some(end) => &bytes[..end],
        None => bytes,
    };
    Ok(String::from_utf8_lossy(bytes).into_owned())
}

/// Like [`string`], but when the text does not fit in `N` bytes the runtime
/// is asked for the exact length and the query is repeated once.
pub(crate) fn long_string<const N: usize>(
    mut query: impl FnMut(usize, *mut c_void, *mut usize) -> cl_int,
) -> Result<String> {
    match string::<N>(&mut query) {
        Err(ClError::InvalidValue) => {}
        other => return other,
    }

    let mut len = 0usize;
    check(query(0, ptr::null_mut(), &mut len))?;
    let mut buffer = vec![0u8; len];
    check(query(len, buffer.as_mut_ptr().cast(), ptr::null_mut()))?;
    if let Some(end) = buffer.iter().position(|&b| b == 0) {
        buffer.truncate(end);
    }
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Runs a query for one fixed-size value.
pub(crate) fn value<T: Copy + Default>(
    query: impl FnOnce(usize, *mut c_void, *mut usize) -> cl_int,
) -> Result<T> {
    let mut value = T::default();
    check(query(
        mem::size_of::<T>(),
        (&mut value as *mut T).cast(),
        ptr::null_mut(),
    ))?;
    Ok(value)
}

/// Runs a query for `len` consecutive values.
pub(crate) fn array<T: Copy + Default>(
    len: usize,
    query: impl FnOnce(usize, *mut c_void, *mut usize) -> cl_int,
) -> Result<Vec<T>> {
    let mut values = vec![T::default(); len];
    check(query(
        mem::size_of::<T>() * len,
        values.as_mut_ptr().cast(),
        ptr::null_mut(),
    ))?;
    Ok(values)
}
