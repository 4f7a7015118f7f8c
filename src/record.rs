//! Reading order rows from CSV and coercing their fields into typed [`Record`]s.
//!
//! Parsing is permissive: a value that can't be understood turns into NaN or `None` and the row is
//! kept. Whoever consumes a field has to filter for validity.
use time::PrimitiveDateTime;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("Cannot use '{0}' as delimiter")]
    InvalidDelimiter(char),
    #[error("The required column '{name}' could not be found in first line of CSV file")]
    MissingColumn { name: &'static str },
    #[error("Row in line {line} did not have the '{name}' column at index {index}")]
    ColumnMissingInRow {
        line: u64,
        index: usize,
        name: &'static str,
    },
}

#[derive(Clone, Debug)]
pub struct Options {
    pub delimiter: char,
}

impl Default for Options {
    fn default() -> Self {
        Options { delimiter: ',' }
    }
}

/// A row exactly as it was found in the CSV file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    pub price: String,
    pub freight_value: String,
    pub payment_value: String,
    pub review_score: String,
    pub order_purchase_timestamp: String,
    pub order_delivered_customer_date: String,
    pub customer_state: String,
    pub payment_type: String,
    pub product_category_name: String,
    /// Only present if the export carried the translated category column.
    pub product_category_name_english: Option<String>,
    pub order_status: String,
}

/// One order line with its fields coerced. Numbers that failed to parse are NaN, timestamps are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub price: f64,
    pub freight_value: f64,
    pub payment_value: f64,
    pub review_score: f64,
    pub purchased_at: Option<PrimitiveDateTime>,
    pub delivered_at: Option<PrimitiveDateTime>,
    /// The two-letter code of the federative unit, like `SP`.
    pub customer_state: String,
    pub payment_type: String,
    pub product_category: String,
    pub product_category_english: Option<String>,
    pub order_status: String,
}

const SECONDS_PER_DAY: f64 = 60.0 * 60.0 * 24.0;

impl Record {
    /// The days it took from purchase to delivery, or NaN if one of the timestamps is missing.
    pub fn delivery_days(&self) -> f64 {
        match (self.purchased_at, self.delivered_at) {
            (Some(purchased), Some(delivered)) => {
                (delivered - purchased).as_seconds_f64() / SECONDS_PER_DAY
            }
            _ => f64::NAN,
        }
    }

    /// The first day of the month the order was placed in.
    pub fn purchase_month(&self) -> Option<time::Date> {
        self.purchased_at.and_then(|at| at.date().replace_day(1).ok())
    }
}

impl From<RawRecord> for Record {
    fn from(raw: RawRecord) -> Self {
        use crate::parse_number;
        Record {
            price: parse_number(&raw.price),
            freight_value: parse_number(&raw.freight_value),
            payment_value: parse_number(&raw.payment_value),
            review_score: parse_number(&raw.review_score),
            purchased_at: function::parse_timestamp(&raw.order_purchase_timestamp),
            delivered_at: function::parse_timestamp(&raw.order_delivered_customer_date),
            customer_state: raw.customer_state.trim().to_owned(),
            payment_type: raw.payment_type.trim().to_owned(),
            product_category: raw.product_category_name.trim().to_owned(),
            product_category_english: raw
                .product_category_name_english
                .map(|name| name.trim().to_owned())
                .filter(|name| !name.is_empty()),
            order_status: raw.order_status.trim().to_owned(),
        }
    }
}

pub(crate) mod function {
    use crate::record::{Error, Options, RawRecord, Record};
    use time::format_description::FormatItem;
    use time::macros::format_description;
    use time::PrimitiveDateTime;

    /// Coerce every raw row, keeping all of them.
    pub fn normalize(raw: impl IntoIterator<Item = RawRecord>) -> Vec<Record> {
        let records: Vec<Record> = raw.into_iter().map(Record::from).collect();
        log::debug!(
            "normalized {} rows, {} without valid payment value, {} without delivery duration",
            records.len(),
            records
                .iter()
                .filter(|r| !r.payment_value.is_finite())
                .count(),
            records
                .iter()
                .filter(|r| !r.delivery_days().is_finite())
                .count()
        );
        records
    }

    /// Read all rows of one or more CSV files, each with its own header line.
    ///
    /// Columns are looked up by name so their order doesn't matter.
    pub fn read(
        csv_data: impl IntoIterator<Item = impl std::io::Read>,
        Options { delimiter }: Options,
    ) -> Result<Vec<RawRecord>, Error> {
        let delimiter = delimiter
            .is_ascii()
            .then_some(delimiter as u8)
            .ok_or(Error::InvalidDelimiter(delimiter))?;
        let mut out = Vec::new();
        for csv in csv_data {
            let mut csv = csv::ReaderBuilder::new()
                .delimiter(delimiter)
                .has_headers(true)
                .from_reader(csv);
            let columns = Columns::from_headers(csv.headers()?)?;
            for record in csv.records() {
                out.push(columns.extract(&record?)?);
            }
        }
        log::debug!("read {} rows", out.len());
        Ok(out)
    }

    const REQUIRED: [&str; 10] = [
        "price",
        "freight_value",
        "payment_value",
        "review_score",
        "order_purchase_timestamp",
        "order_delivered_customer_date",
        "customer_state",
        "payment_type",
        "product_category_name",
        "order_status",
    ];
    const CATEGORY_ENGLISH: &str = "product_category_name_english";

    /// Column indices in the order of [`REQUIRED`].
    struct Columns {
        required: [usize; REQUIRED.len()],
        category_english: Option<usize>,
    }

    impl Columns {
        fn from_headers(headers: &csv::StringRecord) -> Result<Self, Error> {
            let mut required = [0; REQUIRED.len()];
            for (slot, name) in required.iter_mut().zip(REQUIRED) {
                *slot = header_idx(name, headers).ok_or(Error::MissingColumn { name })?;
            }
            Ok(Columns {
                required,
                category_english: header_idx(CATEGORY_ENGLISH, headers),
            })
        }

        fn extract(&self, record: &csv::StringRecord) -> Result<RawRecord, Error> {
            let field = |column: usize| -> Result<String, Error> {
                let index = self.required[column];
                record
                    .get(index)
                    .map(ToOwned::to_owned)
                    .ok_or_else(|| Error::ColumnMissingInRow {
                        line: record.position().map(|p| p.line()).unwrap_or_default(),
                        index,
                        name: REQUIRED[column],
                    })
            };
            Ok(RawRecord {
                price: field(0)?,
                freight_value: field(1)?,
                payment_value: field(2)?,
                review_score: field(3)?,
                order_purchase_timestamp: field(4)?,
                order_delivered_customer_date: field(5)?,
                customer_state: field(6)?,
                payment_type: field(7)?,
                product_category_name: field(8)?,
                order_status: field(9)?,
                product_category_name_english: self
                    .category_english
                    .and_then(|index| record.get(index))
                    .map(ToOwned::to_owned),
            })
        }
    }

    /// Return the position of `name` in `headers`, ignoring surrounding whitespace.
    fn header_idx(name: &str, headers: &csv::StringRecord) -> Option<usize> {
        headers.iter().position(|header| header.trim() == name)
    }

    static DATE_TIME_FORMATS: &[&[FormatItem<'static>]] = &[
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
        format_description!("[year]-[month]-[day] [hour]:[minute]"),
    ];
    static DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

    /// Parse the timestamp formats seen in the exports, falling back to whatever `gix-date` understands.
    /// Timestamps with an offset are converted to UTC.
    pub(crate) fn parse_timestamp(input: &str) -> Option<PrimitiveDateTime> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }
        if let Some(parsed) = DATE_TIME_FORMATS
            .iter()
            .find_map(|format| PrimitiveDateTime::parse(input, format).ok())
        {
            return Some(parsed);
        }
        if let Ok(date) = time::Date::parse(input, DATE_FORMAT) {
            return Some(date.midnight());
        }
        let parsed = gix_date::parse(input, None).ok()?;
        let utc = time::OffsetDateTime::from_unix_timestamp(parsed.seconds).ok()?;
        Some(PrimitiveDateTime::new(utc.date(), utc.time()))
    }
}
