//! Cursor-based pagination walker.
//!
//! Every paginated connection in the graph follows the same protocol: a
//! first page arrives inline with its parent query, and further pages are
//! fetched one at a time by passing the previous page's `end_cursor` back
//! unchanged. [`Pages`] turns that protocol into an iterator so the
//! traversal code never hand-rolls a pagination loop.

use crate::error::{Error, Result};
use crate::model::{Connection, PageInfo};

/// Lazy iterator over every item of a remote collection.
///
/// The inline first page is yielded with zero fetches; after that, exactly
/// one fetch per page, in strict forward order. The walk is finite and
/// non-restartable: the first fetch error is yielded once and the iterator
/// fuses. No retry happens at this layer.
pub struct Pages<T, F> {
    items: std::vec::IntoIter<T>,
    page_info: PageInfo,
    fetch: F,
    done: bool,
}

impl<T, F> Pages<T, F>
where
    F: FnMut(&str) -> Result<Connection<T>>,
{
    /// Start a walk from an already-fetched first page.
    pub fn new(first: Connection<T>, fetch: F) -> Self {
        Self {
            items: first.nodes.into_iter(),
            page_info: first.page_info,
            fetch,
            done: false,
        }
    }
}

impl<T, F> Iterator for Pages<T, F>
where
    F: FnMut(&str) -> Result<Connection<T>>,
{
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done {
                return None;
            }
            if let Some(item) = self.items.next() {
                return Some(Ok(item));
            }
            if !self.page_info.has_next_page {
                self.done = true;
                return None;
            }
            // A page claiming more data must carry a cursor; a missing one
            // would otherwise truncate the collection silently.
            let Some(cursor) = self.page_info.end_cursor.take() else {
                self.done = true;
                return Some(Err(Error::Protocol(
                    "page reported a next page but no end cursor".into(),
                )));
            };
            match (self.fetch)(&cursor) {
                Ok(page) => {
                    self.items = page.nodes.into_iter();
                    self.page_info = page.page_info;
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}
