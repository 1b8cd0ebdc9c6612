use crate::record::InvoiceRecord;
use serde::Serialize;

/// A calendar entry for one dispatched invoice
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CalendarEvent {
    pub title: String,
    /// Dispatch date exactly as entered
    pub start: String,
}

impl From<&InvoiceRecord> for CalendarEvent {
    fn from(record: &InvoiceRecord) -> Self {
        CalendarEvent {
            title: format!("Invoice #{} - {}", record.invoice_no, record.customer),
            start: record.dispatch_date.clone(),
        }
    }
}

/// One event per row, in table order
pub fn calendar_events<'a>(rows: impl IntoIterator<Item = &'a InvoiceRecord>) -> Vec<CalendarEvent> {
    rows.into_iter().map(CalendarEvent::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_use_invoice_number_customer_and_dispatch_date() {
        let rows = vec![
            InvoiceRecord {
                sno: 1,
                invoice_no: "INV-7".into(),
                customer: "Acme".into(),
                dispatch_date: "2026-10-02".into(),
                ..Default::default()
            },
            InvoiceRecord {
                sno: 2,
                invoice_no: "INV-8".into(),
                customer: "Bharat".into(),
                ..Default::default()
            },
        ];

        let events = calendar_events(&rows);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].title, "Invoice #INV-7 - Acme");
        assert_eq!(events[0].start, "2026-10-02");
        assert_eq!(events[1].start, "");

        let json = serde_json::to_value(&events[0]).unwrap();
        assert_eq!(json["title"], "Invoice #INV-7 - Acme");
    }
}
