//! The directory engine: paged, doubly-linked lists of entry references.
//!
//! A directory is a chain of `DirNode` pages sharing a root index. Page
//! zero is the root; the root's `IndexPrevious` doubles as the tail
//! pointer, so appends touch at most the root and the tail. Pages hold at
//! most [`DIR_NODE_MAX`] references.
//!
//! Appends are strictly at the tail: within a page that has seen no
//! deletions, references appear in insertion order, and observers can tail
//! a directory by re-reading only its last page.

use freshet_common::{Hash256, Ter, TerResult};
use freshet_ledger::{index, Entry, EntryType, FieldId};
use tracing::{trace, warn};

use crate::entry_set::EntrySet;

/// Maximum number of entry references per directory page.
pub const DIR_NODE_MAX: usize = 32;

/// Highest page number probed when a deletion hint turns out stale.
const SOFT_PROBE_MAX: u64 = 20;

/// Cursor state for [`EntrySet::dir_first`] / [`EntrySet::dir_next`].
///
/// The cursor is positional; mutating the directory invalidates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirCursor {
    page: u64,
    pos: usize,
}

impl EntrySet {
    /// Append `entry_id` to the directory rooted at `root`, creating the
    /// root or a new tail page as needed.
    ///
    /// `describer` stamps book/owner metadata onto each freshly created
    /// page (`true` for the root). Returns the page number holding the new
    /// reference, for use as a deletion hint later.
    pub fn dir_add<F>(
        &mut self,
        root: Hash256,
        entry_id: Hash256,
        mut describer: F,
    ) -> TerResult<u64>
    where
        F: FnMut(&mut Entry, bool),
    {
        trace!(root = %root, entry = %entry_id, "dir_add");

        let Some(root_page) = self.entry_cache(EntryType::DirNode, root)? else {
            // No root: start the directory.
            let mut page = self.entry_create(EntryType::DirNode, root)?;
            page.set_field_hash(FieldId::RootIndex, root);
            describer(&mut page, true);
            page.set_field_vector(FieldId::Indexes, vec![entry_id]);
            self.entry_modify(&page)?;
            return Ok(0);
        };

        let tail = root_page.field_u64(FieldId::IndexPrevious);
        let mut page = if tail != 0 {
            match self.entry_cache(EntryType::DirNode, index::dir_page_index(root, tail))? {
                Some(page) => page,
                None => {
                    warn!(root = %root, tail, "dir_add: tail page missing");
                    debug_assert!(false, "directory tail missing");
                    return Err(Ter::TefBadLedger);
                }
            }
        } else {
            root_page
        };

        let mut indexes = page.field_vector(FieldId::Indexes);
        if indexes.len() < DIR_NODE_MAX {
            indexes.push(entry_id);
            page.set_field_vector(FieldId::Indexes, indexes);
            self.entry_modify(&page)?;
            trace!(root = %root, node = tail, "dir_add: appended");
            return Ok(tail);
        }

        // Tail is full: allocate the next page.
        let Some(new_node) = tail.checked_add(1) else {
            return Err(Ter::TecDirFull);
        };

        if tail == 0 {
            // The full page is the root itself; link and repoint in one
            // write.
            page.set_field_u64(FieldId::IndexNext, new_node);
            page.set_field_u64(FieldId::IndexPrevious, new_node);
            self.entry_modify(&page)?;
        } else {
            page.set_field_u64(FieldId::IndexNext, new_node);
            self.entry_modify(&page)?;

            let mut root_page = self
                .entry_cache(EntryType::DirNode, root)?
                .ok_or(Ter::TefBadLedger)?;
            root_page.set_field_u64(FieldId::IndexPrevious, new_node);
            self.entry_modify(&root_page)?;
        }

        let mut new_page =
            self.entry_create(EntryType::DirNode, index::dir_page_index(root, new_node))?;
        new_page.set_field_hash(FieldId::RootIndex, root);
        if new_node != 1 {
            new_page.set_field_u64(FieldId::IndexPrevious, new_node - 1);
        }
        describer(&mut new_page, false);
        new_page.set_field_vector(FieldId::Indexes, vec![entry_id]);
        self.entry_modify(&new_page)?;

        trace!(root = %root, node = new_node, "dir_add: new tail page");
        Ok(new_node)
    }

    /// Remove `entry_id` from the directory rooted at `root`.
    ///
    /// `node_hint` names the page believed to hold the reference; with
    /// `soft`, nearby pages are probed when the hint is stale. `stable`
    /// preserves the relative order of the remaining references (book
    /// directories care; owner directories do not). Empty pages are
    /// unlinked and deleted per the coalescing policy; `keep_root` retains
    /// an overflowed root even once everything else is gone.
    pub fn dir_delete(
        &mut self,
        keep_root: bool,
        node_hint: u64,
        root: Hash256,
        entry_id: Hash256,
        stable: bool,
        soft: bool,
    ) -> TerResult<()> {
        let mut node = node_hint;

        // Locate the page actually holding the reference.
        let (mut page, pos) = loop {
            match self.entry_cache(EntryType::DirNode, index::dir_page_index(root, node))? {
                Some(page) => {
                    let indexes = page.field_vector(FieldId::Indexes);
                    if let Some(pos) = indexes.iter().position(|idx| *idx == entry_id) {
                        break (page, pos);
                    }
                    warn!(root = %root, node, entry = %entry_id, "dir_delete: no such entry");
                }
                None => {
                    warn!(root = %root, node, entry = %entry_id, "dir_delete: no such node");
                }
            }

            if !soft {
                debug_assert!(false, "directory delete hint is wrong");
                return Err(Ter::TefBadLedger);
            }
            if node >= SOFT_PROBE_MAX {
                return Err(Ter::TefBadLedger);
            }
            node += 1;
        };

        let mut indexes = page.field_vector(FieldId::Indexes);
        if stable {
            indexes.remove(pos);
        } else {
            indexes.swap_remove(pos);
        }
        let now_empty = indexes.is_empty();
        page.set_field_vector(FieldId::Indexes, indexes);
        self.entry_modify(&page)?;

        if !now_empty {
            return Ok(());
        }

        // The page emptied; decide whether pages can be unlinked.
        let prev = page.field_u64(FieldId::IndexPrevious);
        let next = page.field_u64(FieldId::IndexNext);

        if node == 0 {
            if prev == 0 {
                // Never overflowed: just drop the root.
                self.entry_delete(&page)?;
            } else if keep_root || prev != next {
                // Overflowed root is being retained, or more than two
                // pages remain.
            } else {
                // Exactly the root plus one page; drop both if the other
                // page is empty too.
                let last = self
                    .entry_cache(EntryType::DirNode, index::dir_page_index(root, next))?;
                let Some(last) = last else {
                    warn!(root = %root, node = next, "dir_delete: last node is missing");
                    return Err(Ter::TefBadLedger);
                };
                if last.field_vector(FieldId::Indexes).is_empty() {
                    self.entry_delete(&page)?;
                    self.entry_delete(&last)?;
                }
            }
        } else if next != 0 {
            // Middle page: splice it out of the chain. Both neighbors must
            // exist for the chain to be sound.
            let prev_page =
                self.entry_cache(EntryType::DirNode, index::dir_page_index(root, prev))?;
            let next_page =
                self.entry_cache(EntryType::DirNode, index::dir_page_index(root, next))?;
            let (Some(mut prev_page), Some(mut next_page)) = (prev_page, next_page) else {
                warn!(root = %root, node, prev, next, "dir_delete: neighbor node is missing");
                return Err(Ter::TefBadLedger);
            };

            prev_page.set_field_u64(FieldId::IndexNext, next);
            self.entry_modify(&prev_page)?;
            next_page.set_field_u64(FieldId::IndexPrevious, prev);
            self.entry_modify(&next_page)?;
            self.entry_delete(&page)?;
        } else if keep_root || prev != 0 {
            // Tail page, but the root is being retained or intermediate
            // pages still exist; leave the empty tail in place.
        } else {
            // Tail directly after the root: collapse both if the root is
            // empty as well.
            let root_page = self.entry_cache(EntryType::DirNode, root)?;
            let Some(root_page) = root_page else {
                warn!(root = %root, "dir_delete: root node is missing");
                return Err(Ter::TefBadLedger);
            };
            if root_page.field_vector(FieldId::Indexes).is_empty() {
                self.entry_delete(&root_page)?;
                self.entry_delete(&page)?;
            }
        }

        Ok(())
    }

    /// Begin iterating the directory rooted at `root`.
    pub fn dir_first(&mut self, root: Hash256) -> TerResult<Option<(DirCursor, Hash256)>> {
        if self.entry_cache(EntryType::DirNode, root)?.is_none() {
            // Directories are iterated, never probed for.
            debug_assert!(false, "dir_first on missing directory");
            return Ok(None);
        }
        self.dir_next(root, DirCursor { page: 0, pos: 0 })
    }

    /// Yield the entry at the cursor and advance, following the chain
    /// across page boundaries. Returns `None` at the end of the chain.
    pub fn dir_next(
        &mut self,
        root: Hash256,
        cursor: DirCursor,
    ) -> TerResult<Option<(DirCursor, Hash256)>> {
        let mut page_no = cursor.page;
        let mut pos = cursor.pos;

        loop {
            let Some(page) =
                self.entry_cache(EntryType::DirNode, index::dir_page_index(root, page_no))?
            else {
                warn!(root = %root, node = page_no, "dir_next: corrupt directory chain");
                debug_assert!(false, "corrupt directory chain");
                return Ok(None);
            };

            let indexes = page.field_vector(FieldId::Indexes);
            debug_assert!(pos <= indexes.len());
            if pos < indexes.len() {
                let entry = indexes[pos];
                trace!(root = %root, node = page_no, pos, entry = %entry, "dir_next");
                return Ok(Some((
                    DirCursor {
                        page: page_no,
                        pos: pos + 1,
                    },
                    entry,
                )));
            }

            let next = page.field_u64(FieldId::IndexNext);
            if next == 0 {
                return Ok(None);
            }
            page_no = next;
            pos = 0;
        }
    }

    /// Total number of references in the directory.
    pub fn dir_count(&mut self, root: Hash256) -> TerResult<u32> {
        let mut count = 0u32;
        let mut node = 0u64;

        loop {
            let page = self.entry_cache(EntryType::DirNode, index::dir_page_index(root, node))?;
            match page {
                Some(page) => {
                    count += page.field_vector(FieldId::Indexes).len() as u32;
                    node = page.field_u64(FieldId::IndexNext);
                    if node == 0 {
                        return Ok(count);
                    }
                }
                None if node == 0 => return Ok(0),
                None => {
                    warn!(root = %root, node, "dir_count: no such node");
                    debug_assert!(false, "directory chain broken");
                    return Err(Ter::TefBadLedger);
                }
            }
        }
    }

    /// Whether the directory holds no references at all.
    pub fn dir_is_empty(&mut self, root: Hash256) -> TerResult<bool> {
        let Some(page) = self.entry_cache(EntryType::DirNode, root)? else {
            return Ok(true);
        };
        if !page.field_vector(FieldId::Indexes).is_empty() {
            return Ok(false);
        }
        // A non-empty follow-on page keeps the directory non-empty even
        // when the root page has been drained.
        Ok(page.field_u64(FieldId::IndexNext) == 0)
    }
}
