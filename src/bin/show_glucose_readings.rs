use std::{error::Error, path::Path};

use clap::Parser;
use glucose_import::{
    db::{
        glucose_readings_archive::{self, GlucoseReadingRecord},
        prod_db::ProdDb,
    },
    utils::lib_sqlite::{self, AccessMode},
};
use log::info;
use tabled::{builder::Builder, settings::Style};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Environment name, e.g., test, prod
    #[arg(short, long, default_value = "prod")]
    env: String,

    /// Path to the SQLite database, overrides GLUCOSE_DB_PATH
    #[arg(long)]
    db: Option<String>,

    /// Only show the readings of this patient
    #[arg(short, long)]
    patient: Option<String>,
}

fn ascii_table(data: &[GlucoseReadingRecord]) -> tabled::Table {
    let mut builder = Builder::new();
    builder.push_record(vec![
        "Reading",
        "Patient",
        "Glucose Level",
        "Status",
        "Reading Time (UTC)",
    ]);
    for record in data {
        builder.push_record(vec![
            record.reading_id.to_string(),
            record.patient_id.clone(),
            record.glucose_level.to_string(),
            record.status.clone(),
            record.reading_time.format("%Y-%m-%d %H:%M:%S").to_string(),
        ]);
    }
    let mut table = builder.build();
    table.with(Style::sharp());
    table
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .init();
    let env_file = format!(".env/{}.env", args.env);
    if Path::new(&env_file).exists() {
        dotenvy::from_path(Path::new(&env_file))?;
    }

    let db_path = ProdDb::db_path(args.db)?;
    let conn = lib_sqlite::open(&db_path, AccessMode::ReadOnly)?;
    let records = glucose_readings_archive::query_readings(&conn, args.patient.as_deref())?;
    info!("{} readings in {}", records.len(), db_path);
    println!("{}", ascii_table(&records));
    Ok(())
}
