use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::basalt_debug_log;
use crate::catalog::table_id_for_path;
use crate::coordinator::TransactionCoordinator;
use crate::error::{DbError, DbResult};
use crate::page::Page;
use crate::transaction::{Permission, TransactionId};
use crate::tuple::{Tuple, TupleDesc};
use crate::{PageId, RecordId, PAGE_SIZE};

/// A heap file stores one table's tuples in no particular order, as a
/// contiguous run of fixed-size pages starting at offset 0. The table's
/// identity is the hash of the file's absolute path.
///
/// File handles are opened per operation; nothing here keeps a
/// descriptor alive between calls.
#[derive(Debug)]
pub struct HeapFile {
    id: u64,
    path: PathBuf,
    desc: TupleDesc,
}

impl HeapFile {
    pub fn open(path: impl AsRef<Path>, desc: TupleDesc) -> DbResult<HeapFile> {
        let path = std::path::absolute(path.as_ref())?;
        let id = table_id_for_path(&path);
        Ok(HeapFile { id, path, desc })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn tuple_desc(&self) -> &TupleDesc {
        &self.desc
    }

    /// Number of whole pages currently backing this table. A file that
    /// does not exist yet has zero pages.
    pub fn num_pages(&self) -> DbResult<u32> {
        match std::fs::metadata(&self.path) {
            Ok(meta) => Ok((meta.len() / PAGE_SIZE as u64) as u32),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(0),
            Err(err) => Err(err.into()),
        }
    }

    /// Reads the named page from disk. A request beyond the file's
    /// current extent grows the file with zero-filled pages and returns
    /// an empty page image.
    pub fn read_page(&self, pid: PageId) -> DbResult<Page> {
        if pid.table != self.id {
            return Err(DbError::invalid(format!(
                "page {pid:?} does not belong to table {}",
                self.id
            )));
        }
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)?;

        let num_pages = file.metadata()?.len() / PAGE_SIZE as u64;
        if pid.page_no as u64 >= num_pages {
            basalt_debug_log!(
                "[HeapFile::read_page] Page {} of table {} is beyond extent {}, extending.",
                pid.page_no,
                self.id,
                num_pages
            );
            file.set_len((pid.page_no as u64 + 1) * PAGE_SIZE as u64)?;
            return Ok(Page::new(pid));
        }

        file.seek(SeekFrom::Start(pid.page_no as u64 * PAGE_SIZE as u64))?;
        let mut data = [0u8; PAGE_SIZE];
        file.read_exact(&mut data)?;
        Ok(Page::from_bytes(pid, data))
    }

    /// Writes the page's 4096-byte image at its offset and syncs.
    pub fn write_page(&self, page: &Page) -> DbResult<()> {
        let pid = page.id();
        if pid.table != self.id {
            return Err(DbError::invalid(format!(
                "page {pid:?} does not belong to table {}",
                self.id
            )));
        }
        basalt_debug_log!(
            "[HeapFile::write_page] Writing page {} of table {}",
            pid.page_no,
            self.id
        );
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)?;
        file.seek(SeekFrom::Start(pid.page_no as u64 * PAGE_SIZE as u64))?;
        file.write_all(&page.data)?;
        file.sync_all()?;
        Ok(())
    }

    /// Adds a tuple on behalf of `tid`, scanning page numbers from 0
    /// upward for a free slot and extending the file when every
    /// existing page is full. Acquires a write lock on each page it
    /// probes; returns the pages it dirtied.
    pub fn add_tuple(
        &self,
        pool: &TransactionCoordinator,
        tid: TransactionId,
        tuple: &mut Tuple,
    ) -> DbResult<Vec<PageId>> {
        if *tuple.desc() != self.desc {
            return Err(DbError::invalid(
                "tuple schema does not match the table schema",
            ));
        }
        let mut page_no = 0u32;
        loop {
            let pid = PageId {
                table: self.id,
                page_no,
            };
            let handle = pool.get_page(tid, pid, Permission::ReadWrite)?;
            let has_free = handle.read().free_slot_count(&self.desc) > 0;
            if has_free {
                let slot = handle.write(tid).insert_tuple(&self.desc, tuple)?;
                tuple.set_record_id(RecordId { page: pid, slot });
                basalt_debug_log!(
                    "[HeapFile::add_tuple] {} stored a tuple at page {} slot {}",
                    tid,
                    page_no,
                    slot
                );
                return Ok(vec![pid]);
            }
            page_no += 1;
        }
    }

    /// Removes the tuple named by its record id. The tuple must belong
    /// to this table.
    pub fn delete_tuple(
        &self,
        pool: &TransactionCoordinator,
        tid: TransactionId,
        tuple: &Tuple,
    ) -> DbResult<PageId> {
        let rid = tuple
            .record_id()
            .ok_or_else(|| DbError::invalid("tuple has no record id"))?;
        if rid.page.table != self.id {
            return Err(DbError::invalid(
                "tuple does not belong to the current table",
            ));
        }
        let handle = pool.get_page(tid, rid.page, Permission::ReadWrite)?;
        handle.write(tid).delete_tuple(&self.desc, rid)?;
        basalt_debug_log!(
            "[HeapFile::delete_tuple] {} cleared page {} slot {}",
            tid,
            rid.page.page_no,
            rid.slot
        );
        Ok(rid.page)
    }

    /// A sequential iterator over every stored tuple, page by page and
    /// slot by slot, reading with shared locks on behalf of `tid`.
    pub fn iter<'a>(
        self: &Arc<Self>,
        pool: &'a TransactionCoordinator,
        tid: TransactionId,
    ) -> HeapIter<'a> {
        HeapIter {
            file: Arc::clone(self),
            pool,
            tid,
            page_no: 0,
            slot: 0,
            opened: false,
        }
    }
}

pub struct HeapIter<'a> {
    file: Arc<HeapFile>,
    pool: &'a TransactionCoordinator,
    tid: TransactionId,
    page_no: u32,
    slot: u16,
    opened: bool,
}

impl HeapIter<'_> {
    pub fn open(&mut self) -> DbResult<()> {
        self.opened = true;
        self.page_no = 0;
        self.slot = 0;
        Ok(())
    }

    /// The next stored tuple, or `None` at end of file. A closed
    /// iterator yields nothing.
    pub fn next(&mut self) -> DbResult<Option<Tuple>> {
        if !self.opened {
            return Ok(None);
        }
        let desc = self.file.tuple_desc();
        let slots = Page::slot_count(desc);
        loop {
            if self.page_no >= self.file.num_pages()? {
                return Ok(None);
            }
            let pid = PageId {
                table: self.file.id,
                page_no: self.page_no,
            };
            let handle = self.pool.get_page(self.tid, pid, Permission::ReadOnly)?;
            let page = handle.read();
            while self.slot < slots {
                let slot = self.slot;
                self.slot += 1;
                if let Some(tuple) = page.tuple_at(desc, slot) {
                    return Ok(Some(tuple));
                }
            }
            self.page_no += 1;
            self.slot = 0;
        }
    }

    pub fn rewind(&mut self) -> DbResult<()> {
        self.page_no = 0;
        self.slot = 0;
        Ok(())
    }

    pub fn close(&mut self) {
        self.opened = false;
    }
}
