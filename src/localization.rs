/*!
 * Localization file parsing and writing.
 *
 * Localization.txt files are line-oriented, comma-delimited tables whose
 * first row names the columns. The translatable source lives in the
 * `english` column and every column after `Context / Alternate Text` is a
 * target language. Text columns may be double-quoted with `""` escapes,
 * and linefeeds inside values are stored as literal `\n` sequences that
 * must never be converted to real newlines.
 */

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::errors::LocalizationError;
use crate::translation::TranslationSink;

/// Column holding the entry identifier
pub const KEY_COLUMN: &str = "Key";

/// Column holding the source text
pub const SOURCE_COLUMN: &str = "english";

/// Last non-language column; everything after it is a target language
pub const CONTEXT_COLUMN: &str = "Context / Alternate Text";

/// Suffix given to translated output files
pub const TRANSLATED_SUFFIX: &str = "translated";

/// One parsed row of a localization file
#[derive(Debug, Clone)]
pub struct LocalizationEntry {
    /// Value of the Key column
    pub key: String,

    /// All field values, aligned with the file header
    pub fields: Vec<String>,
}

/// A parsed localization file
#[derive(Debug)]
pub struct LocalizationFile {
    /// Path the file was read from
    pub path: PathBuf,

    /// Column names from the first row
    pub header: Vec<String>,

    /// Data rows in file order
    pub entries: Vec<LocalizationEntry>,
}

impl LocalizationFile {
    /// Parse a localization file from disk
    pub fn open(path: &Path) -> Result<Self, LocalizationError> {
        let contents = std::fs::read_to_string(path)?;
        let mut lines = contents.lines().enumerate();

        let header = match lines.next() {
            Some((_, line)) if !line.trim().is_empty() => split_row(line),
            _ => return Err(LocalizationError::InvalidHeader(path.display().to_string())),
        };

        let key_index = header
            .iter()
            .position(|c| c == KEY_COLUMN)
            .ok_or_else(|| LocalizationError::InvalidHeader(path.display().to_string()))?;

        let mut entries = Vec::new();
        for (line_number, line) in lines {
            if line.trim().is_empty() {
                continue;
            }
            let mut fields = split_row(line);
            if fields.len() > header.len() {
                warn!(
                    "[LOC] Row {} of {} has {} fields for {} columns, truncating",
                    line_number + 1,
                    path.display(),
                    fields.len(),
                    header.len()
                );
                fields.truncate(header.len());
            }
            // Short rows are common in hand-edited files; pad them out
            fields.resize(header.len(), String::new());

            let key = fields[key_index].clone();
            if key.is_empty() {
                debug!(
                    "[LOC] Skipping keyless row {} of {}",
                    line_number + 1,
                    path.display()
                );
                continue;
            }
            entries.push(LocalizationEntry { key, fields });
        }

        Ok(Self {
            path: path.to_path_buf(),
            header,
            entries,
        })
    }

    /// Target languages in header order: every column after the context
    /// column, or after the source column if no context column exists
    pub fn target_languages(&self) -> Vec<String> {
        let boundary = self
            .column_index(CONTEXT_COLUMN)
            .or_else(|| self.column_index(SOURCE_COLUMN));
        match boundary {
            Some(index) => self.header[index + 1..].to_vec(),
            None => Vec::new(),
        }
    }

    /// Index of a named column
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|c| c == name)
    }

    /// The entry's source text, empty if the file has no source column
    pub fn source_text<'a>(&self, entry: &'a LocalizationEntry) -> &'a str {
        match self.column_index(SOURCE_COLUMN) {
            Some(index) => entry.fields.get(index).map(String::as_str).unwrap_or(""),
            None => "",
        }
    }
}

/// Writer that collects translations for a file's rows and re-serializes
/// the table with the original quoting rules
pub struct LocalizationWriter {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
    row_by_key: HashMap<String, usize>,
    column_by_name: HashMap<String, usize>,
    quoted_columns: Vec<bool>,
}

impl LocalizationWriter {
    /// Prepare a writer seeded with the file's existing rows
    pub fn new(file: &LocalizationFile) -> Self {
        let rows: Vec<Vec<String>> = file.entries.iter().map(|e| e.fields.clone()).collect();
        let row_by_key = file
            .entries
            .iter()
            .enumerate()
            .map(|(index, entry)| (entry.key.clone(), index))
            .collect();
        let column_by_name = file
            .header
            .iter()
            .enumerate()
            .map(|(index, name)| (name.clone(), index))
            .collect();

        // Source, context, and every language column get quoted on output
        let language_start = file
            .column_index(CONTEXT_COLUMN)
            .or_else(|| file.column_index(SOURCE_COLUMN))
            .map(|index| index + 1)
            .unwrap_or(file.header.len());
        let quoted_columns = file
            .header
            .iter()
            .enumerate()
            .map(|(index, name)| {
                name == SOURCE_COLUMN || name == CONTEXT_COLUMN || index >= language_start
            })
            .collect();

        Self {
            header: file.header.clone(),
            rows,
            row_by_key,
            column_by_name,
            quoted_columns,
        }
    }

    /// Serialize the table to `path`
    pub fn save(&self, path: &Path) -> Result<(), LocalizationError> {
        let mut out = std::fs::File::create(path)?;
        writeln!(out, "{}", self.header.join(","))?;
        for row in &self.rows {
            let formatted: Vec<String> = row
                .iter()
                .enumerate()
                .map(|(index, value)| {
                    format_field(value, self.quoted_columns.get(index).copied().unwrap_or(false))
                })
                .collect();
            writeln!(out, "{}", formatted.join(","))?;
        }
        Ok(())
    }
}

impl TranslationSink for LocalizationWriter {
    fn write(&mut self, entry_key: &str, language: &str, translation: &str) {
        let Some(&row) = self.row_by_key.get(entry_key) else {
            warn!("[WRITER] Unknown entry key: {}", entry_key);
            return;
        };
        let Some(&column) = self.column_by_name.get(language) else {
            warn!("[WRITER] Unknown language column: {}", language);
            return;
        };
        if let Some(field) = self.rows.get_mut(row).and_then(|r| r.get_mut(column)) {
            *field = translation.to_string();
        }
    }
}

/// Output path for a translated file: `Localization.translated.txt`
/// alongside the input
pub fn translated_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "Localization".to_string());
    let extension = input
        .extension()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "txt".to_string());
    input.with_file_name(format!("{}.{}.{}", stem, TRANSLATED_SUFFIX, extension))
}

/// Split one delimited row into fields, honoring double-quote quoting
/// with `""` escapes. Literal `\n` sequences pass through untouched.
pub fn split_row(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' if current.is_empty() => in_quotes = true,
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

/// Format one field for output: real linefeeds become literal `\n`,
/// quoted columns get wrapped with internal quotes doubled
fn format_field(value: &str, quoted: bool) -> String {
    if value.is_empty() {
        return String::new();
    }
    let value = value.replace('\n', "\\n");
    if quoted {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value
    }
}
