use std::{error::Error, path::Path};

use clap::Parser;
use glucose_import::db::{glucose_readings_archive::StagedReading, prod_db::ProdDb};
use log::info;
use tabled::{builder::Builder, settings::Style};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Environment name, e.g., test, prod
    #[arg(short, long, default_value = "prod")]
    env: String,

    /// Path to the CSV file, overrides GLUCOSE_CSV_PATH
    #[arg(long)]
    csv: Option<String>,

    /// Path to the SQLite database, overrides GLUCOSE_DB_PATH
    #[arg(long)]
    db: Option<String>,

    /// Create the glucose_readings table if it doesn't exist
    #[arg(long)]
    create_table: bool,

    /// Parse the file and show the rows, don't write anything
    #[arg(long)]
    dry_run: bool,
}

/// Make an ASCII table from the parsed rows
fn ascii_table(data: &[StagedReading]) -> tabled::Table {
    let mut builder = Builder::new();
    builder.push_record(vec!["Patient", "Glucose Level", "Status"]);
    for row in data {
        builder.push_record(vec![
            row.patient_id.clone(),
            row.glucose_level.to_string(),
            row.status.clone(),
        ]);
    }
    let mut table = builder.build();
    table.with(Style::sharp());
    table
}

/// Run this job whenever a new export from the sensor lands
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .init();
    let env_file = format!(".env/{}.env", args.env);
    if Path::new(&env_file).exists() {
        dotenvy::from_path(Path::new(&env_file))?;
    }

    let mut archive = ProdDb::glucose_readings_from(args.csv, args.db)?;
    archive.create_table = args.create_table;

    if args.dry_run {
        let rows = archive.dry_run()?;
        println!("{}", ascii_table(&rows));
        return Ok(());
    }

    let summary = archive.update_db()?;
    info!("{}", summary);
    println!("Imported readings successfully.");
    Ok(())
}
