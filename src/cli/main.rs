use lda::{Model, FitSettings, Confusion};
use lda::table::{LabeledTable, TableSettings, ColumnIndex};
use structopt::StructOpt;
use serde::{Serialize, Deserialize};
use anyhow::{anyhow, bail, Context};
use std::fs::File;
use std::io::{self, Write};

/// Fit linear discriminant models to labeled CSV tables, and use them to
/// project or classify new observations.
#[derive(StructOpt, Debug)]
struct Lda {

    /// Log intermediate fit statistics to stderr.
    #[structopt(short, long)]
    verbose : bool,

    #[structopt(subcommand)]
    cmd : Command
}

#[derive(StructOpt, Debug)]
enum Command {

    /// Fits a model to a CSV table whose label column holds class names,
    /// writing the model, feature names and class names as JSON.
    Fit {
        data : String,

        /// Name of the label column (the last column by default).
        #[structopt(short, long)]
        label : Option<String>,

        /// JSON file with fit settings.
        #[structopt(long)]
        settings : Option<String>,

        /// Variance tolerance (overrides the settings file).
        #[structopt(long)]
        tol : Option<f64>,

        /// Keep eigenpairs in solver order instead of decreasing eigenvalue modulus.
        #[structopt(long)]
        unsorted : bool,

        #[structopt(short)]
        output : Option<String>
    },

    /// Projects the rows of a CSV table onto the leading discriminant axes.
    Transform {
        data : String,

        #[structopt(short)]
        model : String,

        /// Number of discriminant axes.
        #[structopt(short)]
        dims : usize,

        #[structopt(short, long)]
        label : Option<String>,

        /// The table has no label column.
        #[structopt(long)]
        unlabeled : bool,

        #[structopt(short)]
        output : Option<String>
    },

    /// Classifies the rows of a CSV table. If the table is labeled,
    /// accuracy and confusion matrix are reported to stderr.
    Predict {
        data : String,

        #[structopt(short)]
        model : String,

        #[structopt(short, long)]
        label : Option<String>,

        #[structopt(long)]
        unlabeled : bool,

        #[structopt(short)]
        output : Option<String>
    },

    /// Displays a summary of a fitted model.
    Summary {
        model : String
    }

}

/// What the fit subcommand writes: the model plus the names required
/// to read new tables consistently.
#[derive(Serialize, Deserialize)]
struct Trained {

    features : Vec<String>,

    classes : Vec<String>,

    model : Model
}

impl Trained {

    fn load(path : &str) -> anyhow::Result<Self> {
        let f = File::open(path).with_context(|| format!("Error opening model {}", path) )?;
        let trained : Trained = serde_json::from_reader(f)?;
        trained.model.check()?;
        if trained.features.len() != trained.model.p() || trained.classes.len() != trained.model.k() {
            bail!("Model {} has inconsistent feature or class names", path);
        }
        Ok(trained)
    }

}

struct StderrLogger {
    level : log::LevelFilter
}

impl log::Log for StderrLogger {

    fn enabled(&self, metadata : &log::Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record : &log::Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) { }

}

static LOGGER : StderrLogger = StderrLogger { level : log::LevelFilter::Debug };

fn table_settings(label : &Option<String>, unlabeled : bool, classes : Option<Vec<String>>) -> TableSettings {
    let mut settings = TableSettings::default();
    settings.label = match (label, unlabeled) {
        (_, true) => None,
        (Some(name), false) => Some(ColumnIndex::from(&name[..])),
        (None, false) => Some(ColumnIndex::Last)
    };
    settings.classes = classes;
    settings
}

fn open_table(path : &str, settings : &TableSettings) -> anyhow::Result<LabeledTable> {
    LabeledTable::open(path, settings).with_context(|| format!("Error opening table {}", path) )
}

fn open_output(path : &Option<String>) -> anyhow::Result<Box<dyn Write>> {
    match path {
        Some(path) => Ok(Box::new(File::create(path).with_context(|| format!("Error creating {}", path) )?)),
        None => Ok(Box::new(io::stdout()))
    }
}

fn fit(
    data : &str,
    label : &Option<String>,
    settings_path : &Option<String>,
    tol : Option<f64>,
    unsorted : bool,
    output : &Option<String>
) -> anyhow::Result<()> {
    let mut settings : FitSettings = match settings_path {
        Some(path) => serde_json::from_reader(File::open(path)?)
            .with_context(|| format!("Error reading settings {}", path) )?,
        None => FitSettings::default()
    };
    if let Some(tol) = tol {
        settings.tol = tol;
    }
    if unsorted {
        settings.sort_eigenpairs = false;
    }
    let tbl = open_table(data, &table_settings(label, false, None))?;
    let y = tbl.y.as_ref().ok_or_else(|| anyhow!("Table {} has no labels", data) )?;
    let model = lda::fit_with(&tbl.x, &y[..], &settings)?;
    let trained = Trained { features : tbl.features, classes : tbl.classes, model };
    let mut out = open_output(output)?;
    serde_json::to_writer_pretty(&mut out, &trained)?;
    writeln!(out)?;
    Ok(())
}

fn transform(
    data : &str,
    model : &str,
    dims : usize,
    label : &Option<String>,
    unlabeled : bool,
    output : &Option<String>
) -> anyhow::Result<()> {
    let trained = Trained::load(model)?;
    let tbl = open_table(data, &table_settings(label, unlabeled, Some(trained.classes.clone())))?;
    let z = lda::transform(&trained.model, &tbl.x, dims)?;
    let mut writer = csv::Writer::from_writer(open_output(output)?);
    let mut header : Vec<String> = (1..=dims).map(|d| format!("LD{}", d) ).collect();
    if tbl.y.is_some() {
        header.push(String::from("class"));
    }
    writer.write_record(&header)?;
    for (i, row) in z.row_iter().enumerate() {
        let mut record : Vec<String> = row.iter().map(|v| v.to_string() ).collect();
        if let Some(y) = &tbl.y {
            record.push(trained.classes[y[i] as usize].clone());
        }
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

fn predict(
    data : &str,
    model : &str,
    label : &Option<String>,
    unlabeled : bool,
    output : &Option<String>
) -> anyhow::Result<()> {
    let trained = Trained::load(model)?;
    let tbl = open_table(data, &table_settings(label, unlabeled, Some(trained.classes.clone())))?;
    let predicted = lda::predict_rows(&trained.model, &tbl.x)?;
    let mut writer = csv::Writer::from_writer(open_output(output)?);
    writer.write_record(&["predicted"])?;
    for class in predicted.iter() {
        writer.write_record(&[&trained.classes[*class]])?;
    }
    writer.flush()?;
    if let Some(y) = &tbl.y {
        let confusion = Confusion::new(&trained.model, &tbl.x, &y[..])?;
        eprintln!("Accuracy: {:.4} ({} observations)", confusion.accuracy(), confusion.total());
        eprintln!("Confusion (rows: known class; columns: predicted class; order: {})", trained.classes.join(", "));
        eprint!("{}", confusion.counts());
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Lda::from_args();
    if cli.verbose {
        log::set_logger(&LOGGER).map_err(|e| anyhow!("{}", e) )?;
        log::set_max_level(LOGGER.level);
    }
    match &cli.cmd {
        Command::Fit { data, label, settings, tol, unsorted, output } => {
            fit(data, label, settings, *tol, *unsorted, output)
        },
        Command::Transform { data, model, dims, label, unlabeled, output } => {
            transform(data, model, *dims, label, *unlabeled, output)
        },
        Command::Predict { data, model, label, unlabeled, output } => {
            predict(data, model, label, *unlabeled, output)
        },
        Command::Summary { model } => {
            let trained = Trained::load(model)?;
            println!("Features: {}", trained.features.join(", "));
            println!("Classes: {}", trained.classes.join(", "));
            print!("{}", trained.model);
            Ok(())
        }
    }
}

#[test]
fn logger_filters_by_level() {
    use log::Log;

    let debug = log::Metadata::builder().level(log::Level::Debug).build();
    let trace = log::Metadata::builder().level(log::Level::Trace).build();
    assert!(LOGGER.enabled(&debug));
    assert!(!LOGGER.enabled(&trace));
    let quiet = StderrLogger { level : log::LevelFilter::Warn };
    assert!(!quiet.enabled(&debug));
}
