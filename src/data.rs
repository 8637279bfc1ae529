use crate::types::Record;
use csv::{ReaderBuilder, StringRecord, Trim};
use thiserror::Error;

/// Any of these rejects the whole batch; no partial snapshot is produced.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("required column '{0}' not found in header")]
    MissingColumn(&'static str),
    #[error("row {row}: field '{column}' is missing")]
    MissingField { row: usize, column: &'static str },
    #[error("row {row}: field '{column}' is not a number: {value:?}")]
    InvalidNumber {
        row: usize,
        column: &'static str,
        value: String,
    },
    #[error("row {row}: capacity {value} is negative")]
    NegativeCapacity { row: usize, value: f64 },
}

struct ColumnIndices {
    name: usize,
    stage: usize,
    capacity: usize,
    lat: usize,
    lon: usize,
    label: usize,
}

impl ColumnIndices {
    fn from_headers(headers: &StringRecord) -> Result<Self, ParseError> {
        let find = |column: &'static str| {
            headers
                .iter()
                .position(|h| h == column)
                .ok_or(ParseError::MissingColumn(column))
        };
        Ok(Self {
            name: find("name")?,
            stage: find("stage")?,
            capacity: find("capacity")?,
            lat: find("lat")?,
            lon: find("lon")?,
            label: find("label")?,
        })
    }
}

/// Parse the feed body into records. Columns are matched by header name;
/// extra columns are ignored.
pub fn parse_records(bytes: &[u8]) -> Result<Vec<Record>, ParseError> {
    let mut rdr = ReaderBuilder::new().trim(Trim::All).from_reader(bytes);
    let headers = rdr.headers()?.clone();
    let cols = ColumnIndices::from_headers(&headers)?;

    let mut records = Vec::new();
    for (i, result) in rdr.records().enumerate() {
        let row = result?;
        records.push(parse_row(&row, i + 1, &cols)?);
    }
    Ok(records)
}

fn parse_row(row: &StringRecord, n: usize, cols: &ColumnIndices) -> Result<Record, ParseError> {
    let text = |idx: usize, column: &'static str| {
        row.get(idx).ok_or(ParseError::MissingField { row: n, column })
    };
    let number = |idx: usize, column: &'static str| -> Result<f64, ParseError> {
        let raw = text(idx, column)?;
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| ParseError::InvalidNumber {
                row: n,
                column,
                value: raw.to_string(),
            })
    };

    let capacity = number(cols.capacity, "capacity")?;
    if capacity < 0.0 {
        return Err(ParseError::NegativeCapacity {
            row: n,
            value: capacity,
        });
    }

    Ok(Record {
        name: text(cols.name, "name")?.to_string(),
        stage: text(cols.stage, "stage")?.to_string(),
        capacity,
        lat: number(cols.lat, "lat")?,
        lon: number(cols.lon, "lon")?,
        label: text(cols.label, "label")?.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = "\
name,stage,capacity,lat,lon,label,updated
Fafe,1,95,41.45,-8.17,Fafe,12:00
Lousã,2, 40 ,40.10,-8.25,Lousã ZE1,12:01
";

    #[test]
    fn parses_rows_in_order_ignoring_extra_columns() {
        let records = parse_records(FEED.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0],
            Record {
                name: "Fafe".into(),
                stage: "1".into(),
                capacity: 95.0,
                lat: 41.45,
                lon: -8.17,
                label: "Fafe".into(),
            }
        );
        assert_eq!(records[1].name, "Lousã");
        assert_eq!(records[1].capacity, 40.0);
    }

    #[test]
    fn column_order_is_not_significant() {
        let csv = "label,lon,lat,capacity,stage,name\nL,-8.0,41.0,12.5,SS3,N\n";
        let records = parse_records(csv.as_bytes()).unwrap();
        assert_eq!(records[0].name, "N");
        assert_eq!(records[0].stage, "SS3");
        assert_eq!(records[0].capacity, 12.5);
    }

    #[test]
    fn header_only_is_an_empty_batch() {
        let records = parse_records(b"name,stage,capacity,lat,lon,label\n").unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn missing_column_rejects_batch() {
        let err = parse_records(b"name,stage,lat,lon,label\nA,1,41,-8,A\n").unwrap_err();
        assert!(matches!(err, ParseError::MissingColumn("capacity")));
    }

    #[test]
    fn non_numeric_value_rejects_whole_batch() {
        let csv = "name,stage,capacity,lat,lon,label\nA,1,10,41,-8,A\nB,1,full,41,-8,B\n";
        let err = parse_records(csv.as_bytes()).unwrap_err();
        match err {
            ParseError::InvalidNumber { row, column, value } => {
                assert_eq!(row, 2);
                assert_eq!(column, "capacity");
                assert_eq!(value, "full");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_and_non_finite_numbers_are_rejected() {
        let csv = "name,stage,capacity,lat,lon,label\nA,1,,41,-8,A\n";
        assert!(matches!(
            parse_records(csv.as_bytes()),
            Err(ParseError::InvalidNumber { column: "capacity", .. })
        ));
        let csv = "name,stage,capacity,lat,lon,label\nA,1,5,NaN,-8,A\n";
        assert!(matches!(
            parse_records(csv.as_bytes()),
            Err(ParseError::InvalidNumber { column: "lat", .. })
        ));
    }

    #[test]
    fn negative_capacity_is_rejected() {
        let csv = "name,stage,capacity,lat,lon,label\nA,1,-3,41,-8,A\n";
        assert!(matches!(
            parse_records(csv.as_bytes()),
            Err(ParseError::NegativeCapacity { row: 1, .. })
        ));
    }

    #[test]
    fn ragged_row_is_a_csv_error() {
        let csv = "name,stage,capacity,lat,lon,label\nA,1,5,41\n";
        assert!(matches!(parse_records(csv.as_bytes()), Err(ParseError::Csv(_))));
    }
}
