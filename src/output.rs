use anyhow::{Context, Result};
use chrono::Local;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::schema::{ListingRecord, field_names};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
}

/// JSON document written for [`OutputFormat::Json`].
#[derive(Debug, Serialize)]
pub struct ListingExport<'a> {
    pub scraped_at: String,
    pub index_url: &'a str,
    pub total: usize,
    pub listings: &'a [ListingRecord],
}

/// One header row with the schema columns, then one row per record.
pub fn write_csv<W: Write>(records: &[ListingRecord], writer: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(field_names())?;
    for record in records {
        writer.write_record(record.values())?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_json<W: Write>(records: &[ListingRecord], index_url: &str, writer: W) -> Result<()> {
    let export = ListingExport {
        scraped_at: Local::now().to_rfc3339(),
        index_url,
        total: records.len(),
        listings: records,
    };
    serde_json::to_writer_pretty(writer, &export)?;
    Ok(())
}

pub fn save(
    records: &[ListingRecord],
    index_url: &str,
    path: &Path,
    format: OutputFormat,
) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create output file {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    match format {
        OutputFormat::Csv => write_csv(records, &mut writer)?,
        OutputFormat::Json => write_json(records, index_url, &mut writer)?,
    }

    writer
        .flush()
        .with_context(|| format!("Failed to write {}", path.display()))
}
