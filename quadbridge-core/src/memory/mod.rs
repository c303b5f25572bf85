//! Guest linear-memory views.
//!
//! `GuestMemory` wraps the byte slice of the guest's current linear memory for the
//! duration of one host call. Every accessor is bounds-checked against that slice;
//! nothing here keeps a pointer past the call, so memory growth between calls can
//! never leave a dangling view behind.
//!
//! Typed views (`TypedView`, `TypedViewMut`) are windows, not copies: writes through
//! a `TypedViewMut` land directly in guest memory. Elements are little-endian as in
//! wasm, and reads go through `from_le_bytes` so guest pointers need no alignment.

use thiserror::Error;

/// Errors from guest memory access.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MemoryError {
    #[error("out of bounds: ptr={ptr} len={len} memory_size={size}")]
    OutOfBounds { ptr: u32, len: usize, size: usize },

    #[error("integer overflow while computing a guest range")]
    Overflow,
}

/// A scalar that can be read from / written to guest memory.
pub trait Element: Copy {
    const SIZE: usize;

    fn read(bytes: &[u8]) -> Self;
    fn write(self, bytes: &mut [u8]);
}

macro_rules! le_element {
    ($($ty:ty),*) => {
        $(
            impl Element for $ty {
                const SIZE: usize = core::mem::size_of::<$ty>();

                #[inline]
                fn read(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; core::mem::size_of::<$ty>()];
                    raw.copy_from_slice(&bytes[..Self::SIZE]);
                    <$ty>::from_le_bytes(raw)
                }

                #[inline]
                fn write(self, bytes: &mut [u8]) {
                    bytes[..Self::SIZE].copy_from_slice(&self.to_le_bytes());
                }
            }
        )*
    };
}

le_element!(u8, i8, i32, u32, f32, u64);

/// Borrowed view over the guest's linear memory.
pub struct GuestMemory<'a> {
    bytes: &'a mut [u8],
}

impl<'a> GuestMemory<'a> {
    pub fn new(bytes: &'a mut [u8]) -> Self {
        Self { bytes }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    fn range(&self, ptr: u32, len: usize) -> Result<core::ops::Range<usize>, MemoryError> {
        let start = ptr as usize;
        let end = start.checked_add(len).ok_or(MemoryError::Overflow)?;
        if end > self.bytes.len() {
            return Err(MemoryError::OutOfBounds {
                ptr,
                len,
                size: self.bytes.len(),
            });
        }
        Ok(start..end)
    }

    /// Borrow `[ptr, ptr + len)`.
    pub fn bytes(&self, ptr: u32, len: usize) -> Result<&[u8], MemoryError> {
        let range = self.range(ptr, len)?;
        Ok(&self.bytes[range])
    }

    /// Mutably borrow `[ptr, ptr + len)`.
    pub fn bytes_mut(&mut self, ptr: u32, len: usize) -> Result<&mut [u8], MemoryError> {
        let range = self.range(ptr, len)?;
        Ok(&mut self.bytes[range])
    }

    /// Copy `data` into guest memory at `ptr`.
    pub fn write_bytes(&mut self, ptr: u32, data: &[u8]) -> Result<(), MemoryError> {
        self.bytes_mut(ptr, data.len())?.copy_from_slice(data);
        Ok(())
    }

    pub fn read<T: Element>(&self, ptr: u32) -> Result<T, MemoryError> {
        Ok(T::read(self.bytes(ptr, T::SIZE)?))
    }

    pub fn write<T: Element>(&mut self, ptr: u32, value: T) -> Result<(), MemoryError> {
        value.write(self.bytes_mut(ptr, T::SIZE)?);
        Ok(())
    }

    /// Read-only typed window of `count` elements starting at `ptr`.
    pub fn view<T: Element>(&self, ptr: u32, count: usize) -> Result<TypedView<'_, T>, MemoryError> {
        let len = count.checked_mul(T::SIZE).ok_or(MemoryError::Overflow)?;
        Ok(TypedView {
            bytes: self.bytes(ptr, len)?,
            _marker: core::marker::PhantomData,
        })
    }

    /// Writable typed window of `count` elements starting at `ptr`.
    pub fn view_mut<T: Element>(
        &mut self,
        ptr: u32,
        count: usize,
    ) -> Result<TypedViewMut<'_, T>, MemoryError> {
        let len = count.checked_mul(T::SIZE).ok_or(MemoryError::Overflow)?;
        Ok(TypedViewMut {
            bytes: self.bytes_mut(ptr, len)?,
            _marker: core::marker::PhantomData,
        })
    }

    /// Decode a UTF-8 run starting at `ptr`.
    ///
    /// Stops at the first NUL, after `max_bytes` (when given) or at the end of memory,
    /// whichever comes first. Malformed sequences are replaced with U+FFFD and reported
    /// once as a warning.
    pub fn read_utf8(&self, ptr: u32, max_bytes: Option<usize>) -> String {
        let start = ptr as usize;
        if start > self.bytes.len() {
            tracing::warn!(ptr, size = self.bytes.len(), "string pointer outside guest memory");
            return String::new();
        }

        let mut window = &self.bytes[start..];
        if let Some(max) = max_bytes {
            window = &window[..max.min(window.len())];
        }
        if let Some(nul) = window.iter().position(|&b| b == 0) {
            window = &window[..nul];
        }

        match core::str::from_utf8(window) {
            Ok(text) => text.to_owned(),
            Err(err) => {
                tracing::warn!(
                    ptr,
                    valid_up_to = err.valid_up_to(),
                    "invalid UTF-8 encountered while reading a guest string"
                );
                String::from_utf8_lossy(window).into_owned()
            }
        }
    }

    /// Encode `text` at `ptr`, writing at most `max_bytes`.
    ///
    /// A character that would not fit whole is dropped rather than split. No NUL
    /// terminator is written. Returns the number of bytes written.
    pub fn write_utf8(&mut self, text: &str, ptr: u32, max_bytes: usize) -> Result<usize, MemoryError> {
        let len = utf8_prefix_len(text, max_bytes);
        self.write_bytes(ptr, &text.as_bytes()[..len])?;
        Ok(len)
    }
}

/// Length of the longest prefix of `text` that fits in `max_bytes` without splitting a char.
pub fn utf8_prefix_len(text: &str, max_bytes: usize) -> usize {
    if text.len() <= max_bytes {
        return text.len();
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    end
}

/// Read-only typed window into guest memory.
pub struct TypedView<'m, T> {
    bytes: &'m [u8],
    _marker: core::marker::PhantomData<T>,
}

impl<'m, T: Element> TypedView<'m, T> {
    pub fn len(&self) -> usize {
        self.bytes.len() / T::SIZE
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<T> {
        let at = index.checked_mul(T::SIZE)?;
        let end = at.checked_add(T::SIZE)?;
        self.bytes.get(at..end).map(T::read)
    }

    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        self.bytes.chunks_exact(T::SIZE).map(T::read)
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.iter().collect()
    }

    /// Raw little-endian bytes covered by this view.
    pub fn as_bytes(&self) -> &'m [u8] {
        self.bytes
    }
}

/// Writable typed window into guest memory.
pub struct TypedViewMut<'m, T> {
    bytes: &'m mut [u8],
    _marker: core::marker::PhantomData<T>,
}

impl<'m, T: Element> TypedViewMut<'m, T> {
    pub fn len(&self) -> usize {
        self.bytes.len() / T::SIZE
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<T> {
        let at = index.checked_mul(T::SIZE)?;
        let end = at.checked_add(T::SIZE)?;
        self.bytes.get(at..end).map(T::read)
    }

    /// Store `value` at `index`; returns `false` when `index` is past the end.
    pub fn set(&mut self, index: usize, value: T) -> bool {
        let Some(at) = index.checked_mul(T::SIZE) else {
            return false;
        };
        let Some(end) = at.checked_add(T::SIZE) else {
            return false;
        };
        match self.bytes.get_mut(at..end) {
            Some(slot) => {
                value.write(slot);
                true
            }
            None => false,
        }
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        self.bytes
    }
}
