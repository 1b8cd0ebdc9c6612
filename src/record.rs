use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// A column of the invoice table
///
/// The header text is what ends up in the first row of the workbook, so
/// changing it breaks files written by earlier versions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Column {
    SNo,
    InvoiceDate,
    InvoiceNo,
    Customer,
    Destination,
    DispatchDate,
    Transporter,
    Vehicle,
    VehicleCapacity,
    Product,
    Quantity,
    FreightCharges,
}

impl Column {
    pub fn header(self) -> &'static str {
        match self {
            Column::SNo => "S.No.",
            Column::InvoiceDate => "Invoice Date",
            Column::InvoiceNo => "Invoice No",
            Column::Customer => "Customer",
            Column::Destination => "Destination",
            Column::DispatchDate => "Dispatch Date",
            Column::Transporter => "Transporter",
            Column::Vehicle => "Vehicle",
            Column::VehicleCapacity => "Vehicle Capacity",
            Column::Product => "Product",
            Column::Quantity => "Quantity",
            Column::FreightCharges => "Freight Charges",
        }
    }

    /// Match a header cell against the known columns
    ///
    /// Comparison ignores case and surrounding whitespace so that files
    /// edited by hand in a spreadsheet program still line up.
    pub fn from_header(text: &str) -> Option<Self> {
        let text = text.trim();
        ALL_COLUMNS
            .iter()
            .copied()
            .find(|c| c.header().eq_ignore_ascii_case(text))
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

const ALL_COLUMNS: [Column; 12] = [
    Column::SNo,
    Column::InvoiceDate,
    Column::InvoiceNo,
    Column::Customer,
    Column::Destination,
    Column::DispatchDate,
    Column::Transporter,
    Column::Vehicle,
    Column::VehicleCapacity,
    Column::Product,
    Column::Quantity,
    Column::FreightCharges,
];

const STANDARD_COLUMNS: [Column; 9] = [
    Column::SNo,
    Column::InvoiceDate,
    Column::InvoiceNo,
    Column::Customer,
    Column::Destination,
    Column::DispatchDate,
    Column::Transporter,
    Column::Vehicle,
    Column::FreightCharges,
];

const VEHICLE_COLUMNS: [Column; 12] = [
    Column::SNo,
    Column::InvoiceDate,
    Column::InvoiceNo,
    Column::Customer,
    Column::Destination,
    Column::DispatchDate,
    Column::Transporter,
    Column::Vehicle,
    Column::VehicleCapacity,
    Column::Product,
    Column::Quantity,
    Column::FreightCharges,
];

/// Which set of columns a ledger keeps
///
/// `Vehicle` adds capacity, product and quantity for the vehicle-entry log.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum Schema {
    #[default]
    Standard,
    Vehicle,
}

impl Schema {
    /// Columns in header order, starting with S.No.
    pub fn columns(self) -> &'static [Column] {
        match self {
            Schema::Standard => &STANDARD_COLUMNS,
            Schema::Vehicle => &VEHICLE_COLUMNS,
        }
    }

    pub fn headers(self) -> Vec<&'static str> {
        self.columns().iter().map(|c| c.header()).collect()
    }

    pub fn has(self, column: Column) -> bool {
        self.columns().contains(&column)
    }
}

/// One row of the invoice table
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceRecord {
    pub sno: u32,
    pub invoice_date: String,
    pub invoice_no: String,
    pub customer: String,
    pub destination: String,
    pub dispatch_date: String,
    pub transporter: String,
    pub vehicle: String,
    #[serde(default)]
    pub vehicle_capacity: String,
    #[serde(default)]
    pub product: String,
    #[serde(default)]
    pub quantity: String,
    pub freight_charges: String,
}

impl InvoiceRecord {
    /// The string form of a field, as written to the sheet and searched by filters
    pub fn get(&self, column: Column) -> Cow<'_, str> {
        let text = match column {
            Column::SNo => return Cow::Owned(self.sno.to_string()),
            Column::InvoiceDate => &self.invoice_date,
            Column::InvoiceNo => &self.invoice_no,
            Column::Customer => &self.customer,
            Column::Destination => &self.destination,
            Column::DispatchDate => &self.dispatch_date,
            Column::Transporter => &self.transporter,
            Column::Vehicle => &self.vehicle,
            Column::VehicleCapacity => &self.vehicle_capacity,
            Column::Product => &self.product,
            Column::Quantity => &self.quantity,
            Column::FreightCharges => &self.freight_charges,
        };
        Cow::Borrowed(text.as_str())
    }

    /// Set a field from its string form
    ///
    /// An S.No. that does not parse as a positive integer is stored as 0,
    /// which the store treats as "unassigned".
    pub fn set(&mut self, column: Column, value: impl Into<String>) {
        let value = value.into();
        let slot = match column {
            Column::SNo => {
                self.sno = value.trim().parse().unwrap_or(0);
                return;
            }
            Column::InvoiceDate => &mut self.invoice_date,
            Column::InvoiceNo => &mut self.invoice_no,
            Column::Customer => &mut self.customer,
            Column::Destination => &mut self.destination,
            Column::DispatchDate => &mut self.dispatch_date,
            Column::Transporter => &mut self.transporter,
            Column::Vehicle => &mut self.vehicle,
            Column::VehicleCapacity => &mut self.vehicle_capacity,
            Column::Product => &mut self.product,
            Column::Quantity => &mut self.quantity,
            Column::FreightCharges => &mut self.freight_charges,
        };
        *slot = value;
    }

    /// Case-insensitive substring test over the given columns
    ///
    /// `needle` must already be lowercased.
    pub fn contains(&self, columns: &[Column], needle: &str) -> bool {
        columns
            .iter()
            .any(|&c| self.get(c).to_lowercase().contains(needle))
    }

    /// Bring the row to the form a sheet read yields
    ///
    /// Text fields lose surrounding whitespace and columns the schema does
    /// not keep are emptied.
    pub fn normalise(&mut self, schema: Schema) {
        for column in ALL_COLUMNS {
            if column == Column::SNo {
                continue;
            }
            let value = if schema.has(column) {
                let current = self.get(column);
                if current.trim().len() == current.len() {
                    continue;
                }
                current.trim().to_string()
            } else {
                String::new()
            };
            self.set(column, value);
        }
    }
}

/// Form data submitted when adding a row
///
/// Every field is optional on the wire; missing fields become empty strings.
/// `disp_date` is accepted for the dispatch date since older entry forms used it.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct RecordForm {
    pub invoice_date: String,
    pub invoice_no: String,
    pub customer: String,
    pub destination: String,
    #[serde(alias = "disp_date")]
    pub dispatch_date: String,
    pub transporter: String,
    pub vehicle: String,
    pub vehicle_capacity: String,
    pub product: String,
    pub quantity: String,
    pub freight_charges: String,
}

impl From<RecordForm> for InvoiceRecord {
    fn from(form: RecordForm) -> Self {
        let clean = |s: String| s.trim().to_string();
        InvoiceRecord {
            sno: 0,
            invoice_date: clean(form.invoice_date),
            invoice_no: clean(form.invoice_no),
            customer: clean(form.customer),
            destination: clean(form.destination),
            dispatch_date: clean(form.dispatch_date),
            transporter: clean(form.transporter),
            vehicle: clean(form.vehicle),
            vehicle_capacity: clean(form.vehicle_capacity),
            product: clean(form.product),
            quantity: clean(form.quantity),
            freight_charges: clean(form.freight_charges),
        }
    }
}
