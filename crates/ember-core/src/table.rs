//! Open-addressed hash map from interned string (`ObjRef`) to `Value`.
//!
//! Grounded directly on spec.md §4.5: load-factor bound 0.75 triggers a
//! rehash to double capacity (minimum 8); linear probing; deletions leave a
//! tombstone that counts toward fill for growth purposes but is reusable by
//! inserts.
//!
//! Every key is an interned string, and probing always uses that string's
//! own FNV-1a hash (`StringObj::hash`), never the `ObjRef`'s arbitrary arena
//! index — otherwise `find_string`'s hash-based probe (used before a
//! candidate `ObjRef` even exists) and `set`/`get`'s probe of already-keyed
//! entries would walk different sequences over the same backing array.

use crate::heap::Heap;
use crate::object::ObjRef;
use crate::value::Value;

const MIN_CAPACITY: usize = 8;
const MAX_LOAD: f64 = 0.75;

#[derive(Debug, Clone)]
enum Slot {
    Empty,
    Tombstone,
    Occupied { key: ObjRef, hash: u32, value: Value },
}

#[derive(Debug, Clone, Default)]
pub struct Table {
    entries: Vec<Slot>,
    /// Count of occupied entries plus tombstones; used against `MAX_LOAD`
    /// so tombstones still force a timely rehash.
    count: usize,
}

impl Table {
    pub fn new() -> Self {
        Table { entries: Vec::new(), count: 0 }
    }

    pub fn len(&self) -> usize {
        self.entries.iter().filter(|s| matches!(s, Slot::Occupied { .. })).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Finds the slot a key would occupy: the first matching occupied slot,
    /// or (for insertion purposes) the first tombstone seen, or an empty
    /// slot if no tombstone was seen. An empty slot with no prior tombstone
    /// means "not found".
    fn find_slot(entries: &[Slot], key: ObjRef, hash: u32) -> usize {
        let capacity = entries.len();
        let mut index = (hash as usize) % capacity;
        let mut tombstone: Option<usize> = None;
        loop {
            match &entries[index] {
                Slot::Empty => return tombstone.unwrap_or(index),
                Slot::Tombstone => {
                    if tombstone.is_none() {
                        tombstone = Some(index);
                    }
                }
                Slot::Occupied { key: k, .. } if *k == key => return index,
                Slot::Occupied { .. } => {}
            }
            index = (index + 1) % capacity;
        }
    }

    fn grow(&mut self, new_capacity: usize) {
        let mut new_entries: Vec<Slot> = (0..new_capacity).map(|_| Slot::Empty).collect();
        let mut new_count = 0;
        for slot in self.entries.drain(..) {
            if let Slot::Occupied { key, hash, value } = slot {
                let idx = Table::find_slot(&new_entries, key, hash);
                new_entries[idx] = Slot::Occupied { key, hash, value };
                new_count += 1;
            }
        }
        self.entries = new_entries;
        self.count = new_count;
    }

    fn ensure_capacity(&mut self) {
        if self.entries.is_empty() {
            self.grow(MIN_CAPACITY);
            return;
        }
        if (self.count + 1) as f64 > self.capacity() as f64 * MAX_LOAD {
            self.grow(self.capacity() * 2);
        }
    }

    /// Inserts or overwrites `key -> value`. Returns `true` if this was a
    /// new key.
    pub fn set(&mut self, heap: &Heap, key: ObjRef, value: Value) -> bool {
        let hash = heap.string_obj(key).hash;
        self.set_hashed(key, hash, value)
    }

    pub(crate) fn set_hashed(&mut self, key: ObjRef, hash: u32, value: Value) -> bool {
        self.ensure_capacity();
        let idx = Table::find_slot(&self.entries, key, hash);
        let is_new = !matches!(self.entries[idx], Slot::Occupied { .. });
        if is_new && !matches!(self.entries[idx], Slot::Tombstone) {
            self.count += 1;
        }
        self.entries[idx] = Slot::Occupied { key, hash, value };
        is_new
    }

    pub fn get(&self, heap: &Heap, key: ObjRef) -> Option<Value> {
        if self.entries.is_empty() {
            return None;
        }
        let hash = heap.string_obj(key).hash;
        match &self.entries[Table::find_slot(&self.entries, key, hash)] {
            Slot::Occupied { value, .. } => Some(*value),
            _ => None,
        }
    }

    pub fn contains(&self, heap: &Heap, key: ObjRef) -> bool {
        self.get(heap, key).is_some()
    }

    /// Leaves a tombstone so other entries' probe sequences stay intact.
    pub fn delete(&mut self, heap: &Heap, key: ObjRef) -> bool {
        if self.entries.is_empty() {
            return false;
        }
        let hash = heap.string_obj(key).hash;
        let idx = Table::find_slot(&self.entries, key, hash);
        if matches!(self.entries[idx], Slot::Occupied { .. }) {
            self.entries[idx] = Slot::Tombstone;
            true
        } else {
            false
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObjRef, Value)> + '_ {
        self.entries.iter().filter_map(|s| match s {
            Slot::Occupied { key, value, .. } => Some((*key, *value)),
            _ => None,
        })
    }

    /// The interning probe: compares candidate keys by length, hash, then
    /// byte content, against `bytes`/`hash`. Needs `heap` to read the
    /// candidate strings' contents since the table only stores handles.
    /// Encountering a truly empty slot (not a tombstone) terminates the
    /// search, matching spec.md §4.5.
    pub fn find_string(&self, heap: &Heap, bytes: &str, hash: u32) -> Option<ObjRef> {
        if self.entries.is_empty() {
            return None;
        }
        let capacity = self.entries.len();
        let mut index = (hash as usize) % capacity;
        loop {
            match &self.entries[index] {
                Slot::Empty => return None,
                Slot::Occupied { key, hash: entry_hash, .. } => {
                    if *entry_hash == hash {
                        let candidate = heap.string_obj(*key);
                        if candidate.bytes.len() == bytes.len() && candidate.bytes == bytes {
                            return Some(*key);
                        }
                    }
                }
                Slot::Tombstone => {}
            }
            index = (index + 1) % capacity;
        }
    }

    /// Deletes every entry whose key object is unmarked. Run on the
    /// interning table before sweep, so unreferenced interned strings are
    /// reclaimed (spec.md §4.5's GC integration note).
    pub fn remove_white(&mut self, is_marked: impl Fn(ObjRef) -> bool) {
        for slot in &mut self.entries {
            if let Slot::Occupied { key, .. } = slot {
                if !is_marked(*key) {
                    *slot = Slot::Tombstone;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::Heap;

    #[test]
    fn set_get_delete_roundtrip() {
        let mut heap = Heap::new();
        let mut table = Table::new();
        let k1 = heap.intern_string("alpha");
        let k2 = heap.intern_string("beta");

        assert!(table.set(&heap, k1, Value::Number(1.0)));
        assert!(table.set(&heap, k2, Value::Number(2.0)));
        assert!(!table.set(&heap, k1, Value::Number(11.0)));

        assert_eq!(table.get(&heap, k1), Some(Value::Number(11.0)));
        assert_eq!(table.get(&heap, k2), Some(Value::Number(2.0)));

        assert!(table.delete(&heap, k1));
        assert_eq!(table.get(&heap, k1), None);
        // deleting again fails; reinsert finds the tombstone, not growth.
        assert!(!table.delete(&heap, k1));
        let cap_before = table.capacity();
        assert!(table.set(&heap, k1, Value::Number(42.0)));
        assert_eq!(table.capacity(), cap_before);
        assert_eq!(table.get(&heap, k1), Some(Value::Number(42.0)));
    }

    #[test]
    fn grows_past_load_factor() {
        let mut heap = Heap::new();
        let mut table = Table::new();
        for i in 0..20 {
            let key = heap.intern_string(&format!("key{i}"));
            table.set(&heap, key, Value::Number(i as f64));
        }
        assert_eq!(table.len(), 20);
        assert!(table.capacity() >= 20 * 2 - 1);
    }
}
