//! Continuation-token pagination.

use crate::error::StoreResult;

/// One page of a listing. `continuation` is `None` on the last page.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub continuation: Option<String>,
}

impl<T> Page<T> {
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            continuation: None,
        }
    }
}

/// Lazy iterator over a paginated listing.
///
/// Pages are fetched on demand. The first error is yielded once and ends the
/// iteration.
pub struct Paged<T, F> {
    fetch: F,
    buffer: std::vec::IntoIter<T>,
    continuation: Option<String>,
    exhausted: bool,
}

impl<T, F> Paged<T, F>
where
    F: FnMut(Option<String>) -> StoreResult<Page<T>>,
{
    pub fn new(fetch: F) -> Self {
        Self {
            fetch,
            buffer: Vec::new().into_iter(),
            continuation: None,
            exhausted: false,
        }
    }
}

impl<T, F> Iterator for Paged<T, F>
where
    F: FnMut(Option<String>) -> StoreResult<Page<T>>,
{
    type Item = StoreResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.buffer.next() {
                return Some(Ok(item));
            }
            if self.exhausted {
                return None;
            }
            match (self.fetch)(self.continuation.take()) {
                Ok(page) => {
                    self.exhausted = page.continuation.is_none();
                    self.continuation = page.continuation;
                    self.buffer = page.items.into_iter();
                }
                Err(e) => {
                    self.exhausted = true;
                    return Some(Err(e));
                }
            }
        }
    }
}
