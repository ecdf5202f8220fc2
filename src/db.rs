pub mod glucose_readings_archive;
pub mod prod_db;
