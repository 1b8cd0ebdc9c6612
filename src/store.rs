use crate::error::{LedgerError, Result};
use crate::record::{InvoiceRecord, Schema};
use serde::Serialize;
use std::collections::HashSet;

/// The in-memory invoice table
///
/// Rows are kept in table order. S.No. values are unique, and after a
/// deletion they are exactly `1..=len()`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RecordStore {
    schema: Schema,
    rows: Vec<InvoiceRecord>,
}

impl RecordStore {
    pub fn new(schema: Schema) -> Self {
        RecordStore {
            schema,
            rows: Vec::new(),
        }
    }

    /// Build a store from rows read off a sheet
    ///
    /// Rows keep the S.No. they were stored with. A row whose key is missing
    /// (0) or already taken by an earlier row gets the next free key, so
    /// the uniqueness invariant holds even for hand-edited files.
    pub fn from_rows(schema: Schema, rows: Vec<InvoiceRecord>) -> Result<Self> {
        let mut store = RecordStore::new(schema);
        let mut seen = HashSet::new();
        let mut pending = Vec::new();

        for (idx, mut row) in rows.into_iter().enumerate() {
            row.normalise(schema);
            if row.sno == 0 || !seen.insert(row.sno) {
                pending.push(idx);
            }
            store.rows.push(row);
        }

        for idx in pending {
            let sno = store.next_sno()?;
            store.rows[idx].sno = sno;
        }

        Ok(store)
    }

    pub fn schema(&self) -> Schema {
        self.schema
    }

    pub fn rows(&self) -> &[InvoiceRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// `max(existing) + 1`, or 1 for an empty table
    ///
    /// Fails with `KeysExhausted` once a row holds `u32::MAX`.
    pub fn next_sno(&self) -> Result<u32> {
        let max = self.rows.iter().map(|r| r.sno).max().unwrap_or(0);
        max.checked_add(1).ok_or(LedgerError::KeysExhausted(max))
    }

    /// Append a row and return the S.No. it was given
    ///
    /// Whatever key the record carried is replaced, and text fields are
    /// trimmed the same way they are when read back from a sheet.
    pub fn append(&mut self, mut record: InvoiceRecord) -> Result<u32> {
        let sno = self.next_sno()?;
        record.normalise(self.schema);
        record.sno = sno;
        self.rows.push(record);
        Ok(sno)
    }

    /// Remove the row with the given S.No. and renumber the rest
    ///
    /// On `NotFound` the table is left untouched.
    pub fn delete(&mut self, sno: u32) -> Result<InvoiceRecord> {
        let idx = self
            .rows
            .iter()
            .position(|r| r.sno == sno)
            .ok_or(LedgerError::NotFound(sno))?;

        let removed = self.rows.remove(idx);
        self.renumber();
        Ok(removed)
    }

    /// Reassign S.No. as 1..N in current row order
    pub fn renumber(&mut self) {
        for (i, row) in self.rows.iter_mut().enumerate() {
            row.sno = i as u32 + 1;
        }
    }

    /// Rows where `query` occurs in at least one field, ignoring case
    ///
    /// A blank query matches everything.
    pub fn filter(&self, query: &str) -> Vec<&InvoiceRecord> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.rows.iter().collect();
        }

        let columns = self.schema.columns();
        self.rows
            .iter()
            .filter(|r| r.contains(columns, &needle))
            .collect()
    }

    /// Replace every row, renumbering from 1 in the given order
    pub fn replace_all(&mut self, rows: Vec<InvoiceRecord>) {
        self.rows = rows;
        for row in &mut self.rows {
            row.normalise(self.schema);
        }
        self.renumber();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(customer: &str, destination: &str) -> InvoiceRecord {
        InvoiceRecord {
            customer: customer.to_string(),
            destination: destination.to_string(),
            ..Default::default()
        }
    }

    fn sample() -> RecordStore {
        let mut store = RecordStore::new(Schema::Standard);
        store.append(record("Acme Steel", "Pune")).unwrap();
        store.append(record("Bharat Cements", "Nagpur")).unwrap();
        store.append(record("Coastal Foods", "Goa")).unwrap();
        store.append(record("Delta Paper", "Pune")).unwrap();
        store
    }

    fn keys(store: &RecordStore) -> Vec<u32> {
        store.rows().iter().map(|r| r.sno).collect()
    }

    #[test]
    fn append_assigns_one_on_empty_table() {
        let mut store = RecordStore::new(Schema::Standard);
        assert_eq!(store.next_sno().unwrap(), 1);
        assert_eq!(store.append(record("Acme", "Pune")).unwrap(), 1);
    }

    #[test]
    fn append_uses_max_plus_one_even_with_gaps() {
        let rows = vec![
            InvoiceRecord { sno: 2, ..record("A", "X") },
            InvoiceRecord { sno: 9, ..record("B", "Y") },
        ];
        let mut store = RecordStore::from_rows(Schema::Standard, rows).unwrap();
        let sno = store.append(InvoiceRecord { sno: 3, ..record("C", "Z") }).unwrap();
        assert_eq!(sno, 10);
        assert_eq!(keys(&store), vec![2, 9, 10]);
    }

    #[test]
    fn delete_renumbers_densely_in_order() {
        let mut store = sample();
        let removed = store.delete(2).unwrap();
        assert_eq!(removed.customer, "Bharat Cements");
        assert_eq!(keys(&store), vec![1, 2, 3]);
        let customers: Vec<_> = store.rows().iter().map(|r| r.customer.as_str()).collect();
        assert_eq!(customers, vec!["Acme Steel", "Coastal Foods", "Delta Paper"]);
    }

    #[test]
    fn delete_missing_key_leaves_table_unchanged() {
        let mut store = sample();
        let before = store.clone();
        match store.delete(42) {
            Err(LedgerError::NotFound(42)) => {}
            other => panic!("expected NotFound, got {:?}", other),
        }
        assert_eq!(store, before);
    }

    #[test]
    fn delete_last_row_empties_table() {
        let mut store = RecordStore::new(Schema::Standard);
        store.append(record("Only", "Row")).unwrap();
        store.delete(1).unwrap();
        assert!(store.is_empty());
        assert_eq!(store.next_sno().unwrap(), 1);
    }

    #[test]
    fn filter_matches_any_field_ignoring_case() {
        let store = sample();
        let hits: Vec<_> = store.filter("PUNE").iter().map(|r| r.sno).collect();
        assert_eq!(hits, vec![1, 4]);

        let hits: Vec<_> = store.filter("cement").iter().map(|r| r.sno).collect();
        assert_eq!(hits, vec![2]);

        assert!(store.filter("zzz").is_empty());
    }

    #[test]
    fn filter_searches_sno_text() {
        let store = sample();
        let hits: Vec<_> = store.filter("3").iter().map(|r| r.sno).collect();
        assert_eq!(hits, vec![3]);
    }

    #[test]
    fn blank_filter_returns_everything() {
        let store = sample();
        assert_eq!(store.filter("").len(), 4);
        assert_eq!(store.filter("   ").len(), 4);
    }

    #[test]
    fn from_rows_repairs_missing_and_duplicate_keys() {
        let rows = vec![
            InvoiceRecord { sno: 1, ..record("A", "X") },
            InvoiceRecord { sno: 1, ..record("B", "Y") },
            InvoiceRecord { sno: 0, ..record("C", "Z") },
        ];
        let store = RecordStore::from_rows(Schema::Standard, rows).unwrap();
        assert_eq!(keys(&store), vec![1, 2, 3]);
    }

    #[test]
    fn append_after_largest_key_is_refused() {
        let rows = vec![InvoiceRecord { sno: u32::MAX, ..record("A", "X") }];
        let mut store = RecordStore::from_rows(Schema::Standard, rows).unwrap();
        let before = store.clone();
        match store.append(record("B", "Y")) {
            Err(LedgerError::KeysExhausted(u32::MAX)) => {}
            other => panic!("expected KeysExhausted, got {:?}", other),
        }
        assert_eq!(store, before);
    }

    #[test]
    fn repairing_keys_past_largest_key_fails() {
        let rows = vec![
            InvoiceRecord { sno: u32::MAX, ..record("A", "X") },
            InvoiceRecord { sno: 0, ..record("B", "Y") },
        ];
        assert!(matches!(
            RecordStore::from_rows(Schema::Standard, rows),
            Err(LedgerError::KeysExhausted(_))
        ));
    }

    #[test]
    fn appended_values_are_trimmed() {
        let mut store = RecordStore::new(Schema::Standard);
        store.append(record("  Acme  ", "\tPune ")).unwrap();
        assert_eq!(store.rows()[0].customer, "Acme");
        assert_eq!(store.rows()[0].destination, "Pune");
    }

    #[test]
    fn standard_schema_drops_vehicle_fields() {
        let mut store = RecordStore::new(Schema::Standard);
        let mut row = record("A", "X");
        row.product = "Coil".into();
        store.append(row).unwrap();
        assert_eq!(store.rows()[0].product, "");
    }

    #[test]
    fn replace_all_renumbers_from_one() {
        let mut store = sample();
        store.replace_all(vec![
            InvoiceRecord { sno: 40, ..record("Z", "Z") },
            InvoiceRecord { sno: 7, ..record(" Y ", "Y") },
        ]);
        assert_eq!(keys(&store), vec![1, 2]);
        assert_eq!(store.rows()[0].customer, "Z");
        assert_eq!(store.rows()[1].customer, "Y");
    }
}
