/// Rounds `value` up to the next multiple of `align`.
///
/// `align` must be a power of two. The addition is unchecked; use
/// [`checked_align_up`] for caller-supplied sizes.
///
/// # Examples
///
/// ```rust
/// use privheap::align_up;
///
/// assert_eq!(align_up!(13, 4), 16);
/// assert_eq!(align_up!(16, 4), 16);
/// assert_eq!(align_up!(0, 8), 0);
/// ```
#[macro_export]
macro_rules! align_up {
  ($value:expr, $align:expr) => {
    (($value) + ($align) - 1) & !(($align) - 1)
  };
}

/// Rounds `value` down to the previous multiple of `align`.
///
/// ```rust
/// use privheap::align_down;
///
/// assert_eq!(align_down!(257, 4), 256);
/// assert_eq!(align_down!(7, 8), 0);
/// ```
#[macro_export]
macro_rules! align_down {
  ($value:expr, $align:expr) => {
    ($value) & !(($align) - 1)
  };
}

/// Like [`align_up!`] but returns `None` when rounding would overflow.
#[inline]
pub const fn checked_align_up(
  value: usize,
  align: usize,
) -> Option<usize> {
  match value.checked_add(align - 1) {
    Some(v) => Some(v & !(align - 1)),
    None => None,
  }
}
