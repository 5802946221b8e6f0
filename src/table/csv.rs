use ::csv;
use std::io::Read;
use super::{TableError, TableSettings};

/// Raw textual content of a delimited file: the header (if the settings
/// declare one) and the data records, all with the same number of fields.
pub struct Records {

    pub header : Option<Vec<String>>,

    pub rows : Vec<csv::StringRecord>
}

/// Reads all records from the reader. Records with a number of fields different
/// from the first record are rejected by the csv reader.
pub fn read_records<R>(reader : R, settings : &TableSettings) -> Result<Records, TableError>
where
    R : Read
{
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(settings.delimiter)
        .has_headers(settings.header)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let header = if settings.header {
        Some(csv_reader.headers()?.iter().map(|h| h.to_string() ).collect())
    } else {
        None
    };
    let mut rows = Vec::new();
    for record in csv_reader.records() {
        rows.push(record?);
    }
    if rows.is_empty() {
        return Err(TableError::Empty);
    }
    Ok(Records { header, rows })
}

/// Parses a numeric field, reporting its position on failure.
pub fn parse_field(field : &str, row : usize, col : usize) -> Result<f64, TableError> {
    field.parse::<f64>().map_err(|_| TableError::Parse { row, col, value : field.to_string() })
}

#[test]
fn reads_header_and_rows() {
    let content = "a;b\n1;2\n 3 ;4\n";
    let mut settings = TableSettings::default();
    settings.delimiter = b';';
    let records = read_records(content.as_bytes(), &settings).unwrap();
    assert_eq!(records.header, Some(vec![String::from("a"), String::from("b")]));
    assert_eq!(records.rows.len(), 2);
    assert_eq!(&records.rows[1][0], "3");
}

#[test]
fn reports_unparseable_fields() {
    assert_eq!(parse_field("2.5", 0, 0).unwrap(), 2.5);
    match parse_field("abc", 3, 1) {
        Err(TableError::Parse { row : 3, col : 1, value }) => assert_eq!(value, "abc"),
        other => panic!("Unexpected result: {:?}", other)
    }
}
