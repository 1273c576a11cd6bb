// src/utils/constants.rs

/// File extensions read when a record path is a directory.
pub const RECORD_FILE_EXTENSIONS: [&str; 2] = ["json", "jsonl"];

/// Memory usage above which the run summary warns, in MB.
pub const HIGH_MEMORY_WARNING_MB: u64 = 8000;
