//! Debug formatting helpers for large decoded buffers

use std::fmt;

#[cfg(not(feature = "debug-print-all"))]
const PREVIEW_ELEMENTS: usize = 3;

/// Print the first few elements of a collection followed by the count of the rest
#[cfg(not(feature = "debug-print-all"))]
pub fn trimmed_collection_fmt<C, T>(items: &C, f: &mut fmt::Formatter) -> fmt::Result
where
    C: AsRef<[T]>,
    T: fmt::Debug,
{
    let items = items.as_ref();
    if items.len() <= PREVIEW_ELEMENTS {
        write!(f, "{:#?}", items)
    } else {
        write!(
            f,
            "{:#?} + {} elements",
            &items[..PREVIEW_ELEMENTS],
            items.len() - PREVIEW_ELEMENTS
        )
    }
}

#[cfg(feature = "debug-print-all")]
pub fn trimmed_collection_fmt<C, T>(items: &C, f: &mut fmt::Formatter) -> fmt::Result
where
    C: AsRef<[T]>,
    T: fmt::Debug,
{
    write!(f, "{:#?}", items.as_ref())
}
