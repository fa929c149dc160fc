use std::sync::Arc;

use crate::catalog::Catalog;
use crate::error::DbResult;
use crate::page::Page;
use crate::PageId;

/// Durable page I/O, dispatched through the catalog to the owning
/// table's heap file. Reads of pages beyond a file's extent grow the
/// file with zero-filled pages. I/O errors propagate to the caller;
/// there is no retry here.
#[derive(Debug)]
pub struct PageStore {
    catalog: Arc<Catalog>,
}

impl PageStore {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        PageStore { catalog }
    }

    pub fn read_page(&self, pid: PageId) -> DbResult<Page> {
        self.catalog.heap_file(pid.table)?.read_page(pid)
    }

    pub fn write_page(&self, page: &Page) -> DbResult<()> {
        self.catalog.heap_file(page.id().table)?.write_page(page)
    }

    pub fn num_pages(&self, table: u64) -> DbResult<u32> {
        self.catalog.heap_file(table)?.num_pages()
    }
}
