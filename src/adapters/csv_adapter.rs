//! CSV quote import.
//!
//! Expected header: `symbol,timestamp,open,high,low,close,volume`. Timestamps
//! are RFC 3339 or a bare `YYYY-MM-DD` date (taken as midnight UTC).

use crate::domain::error::PapertraderError;
use crate::domain::quote::Quote;
use chrono::{DateTime, NaiveDate, Utc};
use std::fs;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

const COLUMNS: [&str; 7] = ["symbol", "timestamp", "open", "high", "low", "close", "volume"];

pub struct CsvQuoteReader;

impl CsvQuoteReader {
    pub fn read_file<P: AsRef<Path>>(path: P) -> Result<Vec<Quote>, PapertraderError> {
        let path = path.as_ref();
        let file = fs::File::open(path).map_err(|e| PapertraderError::Import {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;
        Self::read(file)
    }

    pub fn read<R: Read>(reader: R) -> Result<Vec<Quote>, PapertraderError> {
        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

        let headers = rdr.headers().map_err(|e| PapertraderError::Import {
            reason: format!("CSV header error: {}", e),
        })?;
        let actual: Vec<String> = headers.iter().map(|h| h.to_lowercase()).collect();
        if actual != COLUMNS {
            return Err(PapertraderError::Import {
                reason: format!("expected columns {}, found {}", COLUMNS.join(","), actual.join(",")),
            });
        }

        let mut quotes = Vec::new();
        for (index, result) in rdr.records().enumerate() {
            // header is line 1
            let line = index + 2;
            let record = result.map_err(|e| PapertraderError::Import {
                reason: format!("CSV parse error on line {}: {}", line, e),
            })?;

            let symbol = field(&record, 0, line)?.to_uppercase();
            if symbol.is_empty() {
                return Err(PapertraderError::Import {
                    reason: format!("empty symbol on line {}", line),
                });
            }

            let quote = Quote {
                symbol,
                timestamp: parse_timestamp(field(&record, 1, line)?, line)?,
                open: parse_number(&record, 2, line)?,
                high: parse_number(&record, 3, line)?,
                low: parse_number(&record, 4, line)?,
                close: parse_number(&record, 5, line)?,
                volume: parse_number(&record, 6, line)?,
            };
            if !quote.has_usable_close() {
                return Err(PapertraderError::Import {
                    reason: format!("unusable close {} on line {}", quote.close, line),
                });
            }
            quotes.push(quote);
        }

        quotes.sort_by(|a, b| a.symbol.cmp(&b.symbol).then(a.timestamp.cmp(&b.timestamp)));
        Ok(quotes)
    }
}

fn field<'r>(record: &'r csv::StringRecord, idx: usize, line: usize) -> Result<&'r str, PapertraderError> {
    record.get(idx).ok_or_else(|| PapertraderError::Import {
        reason: format!("missing {} column on line {}", COLUMNS[idx], line),
    })
}

fn parse_number<T>(record: &csv::StringRecord, idx: usize, line: usize) -> Result<T, PapertraderError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    field(record, idx, line)?
        .parse()
        .map_err(|e: T::Err| PapertraderError::Import {
            reason: format!("invalid {} value on line {}: {}", COLUMNS[idx], line, e),
        })
}

fn parse_timestamp(value: &str, line: usize) -> Result<DateTime<Utc>, PapertraderError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| PapertraderError::Import {
            reason: format!("invalid timestamp '{}' on line {}", value, line),
        })
}
