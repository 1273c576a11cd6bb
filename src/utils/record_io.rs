// src/utils/record_io.rs - JSON Lines record source and sink
use anyhow::{bail, Context, Result};
use log::{debug, info};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Lines, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use crate::utils::constants::RECORD_FILE_EXTENSIONS;

/// Files holding the records at `path`: the file itself, or every record file of a
/// directory sorted by name.
fn record_files(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        bail!("Record path {} does not exist", path.display());
    }
    let mut files = Vec::new();
    for entry in fs::read_dir(path)
        .with_context(|| format!("Failed to list record directory {}", path.display()))?
    {
        let entry_path = entry
            .with_context(|| format!("Failed to read entry of {}", path.display()))?
            .path();
        let is_record_file = entry_path
            .extension()
            .and_then(|ext| ext.to_str())
            .map_or(false, |ext| RECORD_FILE_EXTENSIONS.contains(&ext));
        if entry_path.is_file() && is_record_file {
            files.push(entry_path);
        }
    }
    files.sort();
    Ok(files)
}

struct OpenRecordFile {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
    line_number: usize,
    records_read: usize,
}

/// Lazily decodes JSON Lines records, one file at a time. Blank lines are skipped.
/// Each error names the file and line it came from.
pub struct RecordStream<T> {
    files: std::vec::IntoIter<PathBuf>,
    current: Option<OpenRecordFile>,
    _record: PhantomData<T>,
}

impl<T: DeserializeOwned> Iterator for RecordStream<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current.is_none() {
                let path = self.files.next()?;
                let file = match File::open(&path) {
                    Ok(file) => file,
                    Err(e) => {
                        return Some(Err(anyhow::Error::new(e)
                            .context(format!("Failed to open {}", path.display()))))
                    }
                };
                self.current = Some(OpenRecordFile {
                    path,
                    lines: BufReader::new(file).lines(),
                    line_number: 0,
                    records_read: 0,
                });
            }
            let file = self.current.as_mut()?;
            let line = match file.lines.next() {
                Some(line) => line,
                None => {
                    debug!("Read {} records from {}", file.records_read, file.path.display());
                    self.current = None;
                    continue;
                }
            };
            file.line_number += 1;
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    return Some(Err(anyhow::Error::new(e).context(format!(
                        "Failed to read {} line {}",
                        file.path.display(),
                        file.line_number
                    ))))
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            file.records_read += 1;
            return Some(serde_json::from_str(&line).with_context(|| {
                format!("Malformed record in {} line {}", file.path.display(), file.line_number)
            }));
        }
    }
}

/// Opens the records of a file or directory as a [`RecordStream`]. Only the file
/// listing happens up front.
pub fn stream_records<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<RecordStream<T>> {
    Ok(RecordStream {
        files: record_files(path.as_ref())?.into_iter(),
        current: None,
        _record: PhantomData,
    })
}

/// Reads every JSON Lines record of a file or directory into memory.
pub fn read_records<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<Vec<T>> {
    let path = path.as_ref();
    let records = stream_records(path)?.collect::<Result<Vec<T>>>()?;
    info!("Loaded {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Writes records as JSON Lines, creating parent directories as needed.
pub fn write_records<T: Serialize>(path: impl AsRef<Path>, records: &[T]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory {}", parent.display()))?;
    }
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    for record in records {
        serde_json::to_writer(&mut writer, record)
            .with_context(|| format!("Failed to serialize record for {}", path.display()))?;
        writer.write_all(b"\n")?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to flush {}", path.display()))?;
    info!("Wrote {} records to {}", records.len(), path.display());
    Ok(())
}
