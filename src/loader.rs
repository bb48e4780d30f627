//! Turning an uploaded byte stream into an [`OrderTable`].
//!
//! The CSV reader keeps whatever types it infers for ordinary columns. The
//! five order timestamps are re-read as text and coerced one value at a time:
//! anything that is not a recognised date or datetime becomes null.

use crate::session::FileKey;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use color_eyre::eyre::eyre;
use color_eyre::Result;
use orderlens_cli::CompressionFormat;
use polars::prelude::*;
use std::borrow::Cow;
use std::io::{Cursor, Read};

pub const STATUS_COLUMN: &str = "order_status";
pub const PURCHASE_COLUMN: &str = "order_purchase_timestamp";
pub const APPROVED_COLUMN: &str = "order_approved_at";
pub const CARRIER_COLUMN: &str = "order_delivered_carrier_date";
pub const CUSTOMER_COLUMN: &str = "order_delivered_customer_date";
pub const ESTIMATED_COLUMN: &str = "order_estimated_delivery_date";

/// Columns coerced to `Datetime(Microseconds)` during load
pub const TIMESTAMP_COLUMNS: [&str; 5] = [
    PURCHASE_COLUMN,
    APPROVED_COLUMN,
    CARRIER_COLUMN,
    CUSTOMER_COLUMN,
    ESTIMATED_COLUMN,
];

/// Layouts carrying a UTC offset; parsed values are converted to UTC.
const OFFSET_LAYOUTS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
];

const DATETIME_LAYOUTS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S%.f",
    "%m/%d/%Y %H:%M",
];

const DATE_LAYOUTS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Parse options that affect the resulting table. Part of the [`FileKey`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoadOptions {
    pub delimiter: u8,
    pub has_header: bool,
    pub compression: Option<CompressionFormat>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            has_header: true,
            compression: None,
        }
    }
}

impl LoadOptions {
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_has_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    pub fn with_compression(mut self, compression: Option<CompressionFormat>) -> Self {
        self.compression = compression;
        self
    }
}

/// A loaded order file. Immutable once built; shared as `Arc<OrderTable>`.
#[derive(Debug, Clone)]
pub struct OrderTable {
    df: DataFrame,
    key: FileKey,
    source: String,
    unparsed_timestamps: Vec<(String, usize)>,
}

impl OrderTable {
    pub fn df(&self) -> &DataFrame {
        &self.df
    }

    pub fn key(&self) -> FileKey {
        self.key
    }

    /// Where the bytes came from (usually a path)
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    /// Values that were present but could not be read as a timestamp, per column
    pub fn unparsed_timestamps(&self) -> &[(String, usize)] {
        &self.unparsed_timestamps
    }

    pub fn total_unparsed(&self) -> usize {
        self.unparsed_timestamps.iter().map(|(_, n)| n).sum()
    }

    pub(crate) fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }
}

/// Parse an uploaded file into an [`OrderTable`].
///
/// Fails when the bytes cannot be decompressed or parsed as delimited text,
/// or when one of the five timestamp columns is absent. Individual timestamp
/// values never fail the load.
pub fn load_orders(bytes: &[u8], options: &LoadOptions) -> Result<OrderTable> {
    let key = FileKey::new(bytes, options);
    let raw = decompress(bytes, options.compression)?;

    // Full-scan inference so a late non-numeric value cannot fail the read
    let read_options = CsvReadOptions::default()
        .with_has_header(options.has_header)
        .with_infer_schema_length(None)
        .map_parse_options(|opts| opts.with_separator(options.delimiter));
    let mut df = CsvReader::new(Cursor::new(raw.as_ref()))
        .with_options(read_options)
        .finish()?;

    trim_column_names(&mut df)?;

    let mut unparsed_timestamps = Vec::with_capacity(TIMESTAMP_COLUMNS.len());
    for name in TIMESTAMP_COLUMNS {
        let unparsed = coerce_timestamp_column(&mut df, name)?;
        if unparsed > 0 {
            tracing::debug!(column = name, unparsed, "timestamp values coerced to null");
        }
        unparsed_timestamps.push((name.to_string(), unparsed));
    }

    tracing::info!(rows = df.height(), columns = df.width(), "loaded order table");

    Ok(OrderTable {
        df,
        key,
        source: String::new(),
        unparsed_timestamps,
    })
}

fn decompress(bytes: &[u8], compression: Option<CompressionFormat>) -> Result<Cow<'_, [u8]>> {
    let Some(compression) = compression else {
        return Ok(Cow::Borrowed(bytes));
    };

    let mut reader: Box<dyn Read + '_> = match compression {
        CompressionFormat::Gzip => Box::new(flate2::read::GzDecoder::new(bytes)),
        CompressionFormat::Zstd => Box::new(zstd::Decoder::new(bytes)?),
        CompressionFormat::Bzip2 => Box::new(bzip2::read::BzDecoder::new(bytes)),
        CompressionFormat::Xz => Box::new(xz2::read::XzDecoder::new(bytes)),
    };
    let mut decompressed = Vec::new();
    reader.read_to_end(&mut decompressed).map_err(|e| {
        eyre!(
            "Could not decompress {} data: {}",
            compression.extension(),
            e
        )
    })?;
    Ok(Cow::Owned(decompressed))
}

/// Header cells like " order_status" are common in hand-edited exports.
fn trim_column_names(df: &mut DataFrame) -> Result<()> {
    let renames: Vec<(String, String)> = df
        .get_column_names()
        .iter()
        .filter(|name| name.trim() != name.as_str())
        .map(|name| (name.to_string(), name.trim().to_string()))
        .collect();
    for (old, new) in renames {
        df.rename(&old, new.into())?;
    }
    Ok(())
}

/// Replace `name` with a `Datetime(Microseconds)` column; returns how many
/// non-blank values failed to parse.
fn coerce_timestamp_column(df: &mut DataFrame, name: &str) -> Result<usize> {
    let column = df
        .column(name)
        .map_err(|_| PolarsError::ColumnNotFound(name.to_string().into()))?;
    let text = column.cast(&DataType::String)?;
    let values = text.str()?;

    let mut unparsed = 0usize;
    let micros = values.into_iter().map(|value| {
        let value = value.map(str::trim).filter(|v| !v.is_empty())?;
        match parse_timestamp(value) {
            Some(ts) => Some(ts.and_utc().timestamp_micros()),
            None => {
                unparsed += 1;
                None
            }
        }
    });
    let coerced = Int64Chunked::from_iter_options(name.into(), micros)
        .into_datetime(TimeUnit::Microseconds, None)
        .into_series();

    df.with_column(coerced)?;
    Ok(unparsed)
}

/// Parse a single timestamp in any of the accepted layouts.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }
    if value.ends_with('Z') {
        let trimmed = &value[..value.len() - 1];
        return parse_naive(trimmed);
    }
    for layout in OFFSET_LAYOUTS {
        if let Ok(dt) = DateTime::parse_from_str(value, layout) {
            return Some(dt.naive_utc());
        }
    }
    parse_naive(value)
}

fn parse_naive(value: &str) -> Option<NaiveDateTime> {
    for layout in DATETIME_LAYOUTS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, layout) {
            return Some(dt);
        }
    }
    for layout in DATE_LAYOUTS {
        if let Ok(date) = NaiveDate::parse_from_str(value, layout) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}
