use crate::error::{DbError, DbResult};
use crate::transaction::TransactionId;
use crate::tuple::{Tuple, TupleDesc};
use crate::{PageId, RecordId, PAGE_SIZE};

/// A fixed-size page image plus its in-memory dirty state.
///
/// The byte layout is a slotted heap page: an occupancy bitmap header
/// followed by fixed-width tuple slots. For tuple size `s` the page
/// holds `floor(PAGE_SIZE * 8 / (s * 8 + 1))` slots and the header is
/// `ceil(slots / 8)` bytes; bit `i % 8` of header byte `i / 8` marks
/// slot `i` occupied.
#[derive(Debug, Clone)]
pub struct Page {
    id: PageId,
    pub data: [u8; PAGE_SIZE],
    dirty: Option<TransactionId>,
}

impl Page {
    /// A zero-filled page: every slot free.
    pub fn new(id: PageId) -> Self {
        Page {
            id,
            data: [0; PAGE_SIZE],
            dirty: None,
        }
    }

    pub fn from_bytes(id: PageId, data: [u8; PAGE_SIZE]) -> Self {
        Page {
            id,
            data,
            dirty: None,
        }
    }

    pub fn id(&self) -> PageId {
        self.id
    }

    /// The transaction that dirtied this page, if any.
    pub fn dirtier(&self) -> Option<TransactionId> {
        self.dirty
    }

    pub fn is_clean(&self) -> bool {
        self.dirty.is_none()
    }

    pub fn mark_dirty(&mut self, tid: TransactionId) {
        self.dirty = Some(tid);
    }

    pub fn set_clean(&mut self) {
        self.dirty = None;
    }

    /// Number of tuple slots a page holds for the given schema.
    pub fn slot_count(desc: &TupleDesc) -> u16 {
        let tuple_bits = desc.byte_size() * 8 + 1;
        ((PAGE_SIZE * 8) / tuple_bits) as u16
    }

    /// Size of the occupancy bitmap header for the given schema.
    pub fn header_size(desc: &TupleDesc) -> usize {
        (Self::slot_count(desc) as usize).div_ceil(8)
    }

    pub fn slot_in_use(&self, desc: &TupleDesc, slot: u16) -> bool {
        debug_assert!(slot < Self::slot_count(desc));
        let byte = self.data[slot as usize / 8];
        byte & (1 << (slot % 8)) != 0
    }

    fn set_slot(&mut self, slot: u16, used: bool) {
        let byte = &mut self.data[slot as usize / 8];
        if used {
            *byte |= 1 << (slot % 8);
        } else {
            *byte &= !(1 << (slot % 8));
        }
    }

    fn slot_offset(desc: &TupleDesc, slot: u16) -> usize {
        Self::header_size(desc) + slot as usize * desc.byte_size()
    }

    pub fn free_slot_count(&self, desc: &TupleDesc) -> u16 {
        let slots = Self::slot_count(desc);
        (0..slots).filter(|&s| !self.slot_in_use(desc, s)).count() as u16
    }

    /// Writes the tuple into the first free slot and returns it. The
    /// caller is responsible for marking the page dirty.
    pub fn insert_tuple(&mut self, desc: &TupleDesc, tuple: &Tuple) -> DbResult<u16> {
        let slots = Self::slot_count(desc);
        let slot = (0..slots)
            .find(|&s| !self.slot_in_use(desc, s))
            .ok_or_else(|| DbError::invalid(format!("page {:?} has no free slot", self.id)))?;

        let offset = Self::slot_offset(desc, slot);
        tuple.write_bytes(&mut self.data[offset..offset + desc.byte_size()]);
        self.set_slot(slot, true);
        Ok(slot)
    }

    /// Clears the slot named by `rid`. Fails if the slot is not in use
    /// or names another page.
    pub fn delete_tuple(&mut self, desc: &TupleDesc, rid: RecordId) -> DbResult<()> {
        if rid.page != self.id {
            return Err(DbError::invalid(format!(
                "record {rid:?} does not live on page {:?}",
                self.id
            )));
        }
        if rid.slot >= Self::slot_count(desc) || !self.slot_in_use(desc, rid.slot) {
            return Err(DbError::invalid(format!("slot {} is not in use", rid.slot)));
        }
        self.set_slot(rid.slot, false);
        Ok(())
    }

    /// Reads the tuple in `slot`, with its record id attached, or
    /// `None` if the slot is free.
    pub fn tuple_at(&self, desc: &TupleDesc, slot: u16) -> Option<Tuple> {
        if slot >= Self::slot_count(desc) || !self.slot_in_use(desc, slot) {
            return None;
        }
        let offset = Self::slot_offset(desc, slot);
        let mut tuple = Tuple::from_bytes(desc, &self.data[offset..offset + desc.byte_size()]);
        tuple.set_record_id(RecordId {
            page: self.id,
            slot,
        });
        Some(tuple)
    }
}
