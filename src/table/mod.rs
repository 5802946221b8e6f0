use nalgebra::*;
use thiserror::Error;
use std::fs::File;
use std::path::Path;
use std::convert::AsRef;
use std::str::FromStr;
use std::io::Read;

pub mod csv;

#[derive(Debug, Error)]
pub enum TableError {

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] ::csv::Error),

    #[error("Could not parse '{value}' as a number (record {row}, column {col})")]
    Parse { row : usize, col : usize, value : String },

    #[error("Unknown column {0}")]
    Column(String),

    #[error("Unknown class '{name}' at record {row}")]
    UnknownClass { row : usize, name : String },

    #[error("Table has no data")]
    Empty

}

/// Identifies a column by its header name or by its zero-based position.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnIndex {
    Named(String),
    Pos(usize),
    Last
}

impl From<usize> for ColumnIndex {

    fn from(ix : usize) -> Self {
        Self::Pos(ix)
    }
}

impl From<&str> for ColumnIndex {

    fn from(name : &str) -> Self {
        Self::Named(name.to_owned())
    }
}

impl ColumnIndex {

    fn resolve(&self, header : Option<&[String]>, ncols : usize) -> Result<usize, TableError> {
        match self {
            ColumnIndex::Last => Ok(ncols - 1),
            ColumnIndex::Pos(ix) if *ix < ncols => Ok(*ix),
            ColumnIndex::Pos(ix) => Err(TableError::Column(ix.to_string())),
            ColumnIndex::Named(name) => header
                .and_then(|h| h.iter().position(|c| c == name ) )
                .ok_or_else(|| TableError::Column(name.clone()) )
        }
    }

}

/// How a delimited file is laid out.
#[derive(Debug, Clone)]
pub struct TableSettings {

    pub delimiter : u8,

    /// Whether the first line holds column names.
    pub header : bool,

    /// Column holding the class of each record, or None for unlabeled data.
    pub label : Option<ColumnIndex>,

    /// Class names in label order. When informed, records with any other class
    /// name are rejected; otherwise classes are numbered in order of first appearance.
    pub classes : Option<Vec<String>>
}

impl Default for TableSettings {

    fn default() -> Self {
        Self {
            delimiter : b',',
            header : true,
            label : Some(ColumnIndex::Last),
            classes : None
        }
    }

}

/// Numeric data matrix (one observation per row) with optional integer class labels
/// in 0..k, as read from a delimited text file where all columns but the label
/// column are numeric.
#[derive(Debug, Clone)]
pub struct LabeledTable {

    /// Names of the numeric columns, in matrix column order.
    pub features : Vec<String>,

    /// Class names; classes[i] is the name of label i.
    pub classes : Vec<String>,

    pub x : DMatrix<f64>,

    pub y : Option<Vec<i64>>
}

impl LabeledTable {

    pub fn open<P>(path : P, settings : &TableSettings) -> Result<Self, TableError>
    where
        P : AsRef<Path>
    {
        let f = File::open(path)?;
        Self::from_reader(f, settings)
    }

    pub fn from_reader<R>(reader : R, settings : &TableSettings) -> Result<Self, TableError>
    where
        R : Read
    {
        let records = csv::read_records(reader, settings)?;
        let ncols = records.rows[0].len();
        let label_col = match &settings.label {
            Some(ix) => Some(ix.resolve(records.header.as_deref(), ncols)?),
            None => None
        };
        let feature_cols : Vec<usize> = (0..ncols).filter(|c| Some(*c) != label_col ).collect();
        if feature_cols.is_empty() {
            return Err(TableError::Empty);
        }
        let features : Vec<String> = feature_cols.iter()
            .map(|c| match &records.header {
                Some(h) => h[*c].clone(),
                None => format!("(Column {})", c)
            })
            .collect();

        let fixed_classes = settings.classes.is_some();
        let mut classes = settings.classes.clone().unwrap_or_default();
        let mut data = Vec::with_capacity(records.rows.len() * feature_cols.len());
        let mut y = Vec::with_capacity(records.rows.len());
        for (row, record) in records.rows.iter().enumerate() {
            for col in feature_cols.iter() {
                data.push(csv::parse_field(&record[*col], row, *col)?);
            }
            if let Some(col) = label_col {
                let name = &record[col];
                let label = match classes.iter().position(|c| c == name ) {
                    Some(label) => label,
                    None if fixed_classes => {
                        return Err(TableError::UnknownClass { row, name : name.to_string() });
                    },
                    None => {
                        classes.push(name.to_string());
                        classes.len() - 1
                    }
                };
                y.push(label as i64);
            }
        }
        let x = DMatrix::from_row_slice(records.rows.len(), feature_cols.len(), &data[..]);
        Ok(Self { features, classes, x, y : label_col.map(|_| y ) })
    }

}

impl FromStr for LabeledTable {

    type Err = TableError;

    fn from_str(content : &str) -> Result<Self, Self::Err> {
        Self::from_reader(content.as_bytes(), &TableSettings::default())
    }

}

#[test]
fn classes_follow_first_appearance() {
    let content = "x,kind,z\n1.0,b,2.0\n3.0,a,4.0\n5.0,b,6.0\n";
    let mut settings = TableSettings::default();
    settings.label = Some(ColumnIndex::from("kind"));
    let tbl = LabeledTable::from_reader(content.as_bytes(), &settings).unwrap();
    assert_eq!(tbl.features, vec![String::from("x"), String::from("z")]);
    assert_eq!(tbl.classes, vec![String::from("b"), String::from("a")]);
    assert_eq!(tbl.y, Some(vec![0, 1, 0]));
    assert_eq!(tbl.x, DMatrix::from_row_slice(3, 2, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]));
}

#[test]
fn imposed_classes_and_unlabeled_data() {
    let content = "1.0,2.0,a\n3.0,4.0,c\n";
    let mut settings = TableSettings::default();
    settings.header = false;
    settings.classes = Some(vec![String::from("c"), String::from("a")]);
    let tbl = LabeledTable::from_reader(content.as_bytes(), &settings).unwrap();
    assert_eq!(tbl.y, Some(vec![1, 0]));
    assert_eq!(tbl.features, vec![String::from("(Column 0)"), String::from("(Column 1)")]);

    settings.classes = Some(vec![String::from("a")]);
    match LabeledTable::from_reader(content.as_bytes(), &settings) {
        Err(TableError::UnknownClass { row : 1, name }) => assert_eq!(name, "c"),
        other => panic!("Unexpected result: {:?}", other)
    }

    let mut settings = TableSettings::default();
    settings.label = None;
    let tbl = LabeledTable::from_reader("u,v\n1,2\n".as_bytes(), &settings).unwrap();
    assert_eq!(tbl.y, None);
    assert_eq!(tbl.x.shape(), (1, 2));
}

#[test]
fn default_settings_parse_last_column_as_label() {
    let tbl : LabeledTable = "u,v,class\n1,2,x\n3,4,y\n".parse().unwrap();
    assert_eq!(tbl.classes, vec![String::from("x"), String::from("y")]);
    assert_eq!(tbl.y, Some(vec![0, 1]));
}

#[test]
fn unknown_label_column() {
    let mut settings = TableSettings::default();
    settings.header = false;
    settings.label = Some(ColumnIndex::from(5));
    match LabeledTable::from_reader("1,2\n".as_bytes(), &settings) {
        Err(TableError::Column(c)) => assert_eq!(c, "5"),
        other => panic!("Unexpected result: {:?}", other)
    }
}
