/*!
 * Tests for localization file parsing and quote-preserving writing.
 */

use std::path::Path;

use tempfile::TempDir;

use loctrans::localization::{
    LocalizationFile, LocalizationWriter, translated_output_path,
};
use loctrans::translation::TranslationSink;

const SAMPLE: &str = "\
Key,File,Type,UsedInMainMenu,NoTranslate,english,Context / Alternate Text,german,french
greeting,UI,Label,,,\"Hello, world\",,,
farewell,UI,Label,,,\"He said \"\"bye\"\"\\nand left\",context note,,
";

fn write_sample(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("Localization.txt");
    std::fs::write(&path, SAMPLE).unwrap();
    path
}

#[test]
fn test_open_shouldParseHeaderAndEntries() {
    let dir = TempDir::new().unwrap();
    let file = LocalizationFile::open(&write_sample(&dir)).unwrap();

    assert_eq!(file.header.len(), 9);
    assert_eq!(file.entries.len(), 2);
    assert_eq!(file.entries[0].key, "greeting");
    assert_eq!(file.source_text(&file.entries[0]), "Hello, world");
}

#[test]
fn test_target_languages_shouldBeColumnsAfterContext() {
    let dir = TempDir::new().unwrap();
    let file = LocalizationFile::open(&write_sample(&dir)).unwrap();

    assert_eq!(file.target_languages(), vec!["german", "french"]);
}

#[test]
fn test_open_shouldPreserveQuotesAndLiteralNewlines() {
    let dir = TempDir::new().unwrap();
    let file = LocalizationFile::open(&write_sample(&dir)).unwrap();

    assert_eq!(
        file.source_text(&file.entries[1]),
        "He said \"bye\"\\nand left"
    );
}

#[test]
fn test_open_withEmptyFile_shouldFail() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("Localization.txt");
    std::fs::write(&path, "").unwrap();

    assert!(LocalizationFile::open(&path).is_err());
}

#[test]
fn test_writer_shouldFillLanguageColumnsAndRoundTrip() {
    let dir = TempDir::new().unwrap();
    let input = write_sample(&dir);
    let file = LocalizationFile::open(&input).unwrap();

    let mut writer = LocalizationWriter::new(&file);
    writer.write("greeting", "german", "Hallo, Welt");
    writer.write("greeting", "french", "Bonjour, monde");
    writer.write("farewell", "german", "Er sagte \"tschüss\"");

    let output = translated_output_path(&input);
    writer.save(&output).unwrap();

    // The written file parses back with the translations in place and the
    // untouched columns intact
    let reparsed = LocalizationFile::open(&output).unwrap();
    let german = reparsed.column_index("german").unwrap();
    let french = reparsed.column_index("french").unwrap();
    assert_eq!(reparsed.entries[0].fields[german], "Hallo, Welt");
    assert_eq!(reparsed.entries[0].fields[french], "Bonjour, monde");
    assert_eq!(reparsed.entries[1].fields[german], "Er sagte \"tschüss\"");
    assert_eq!(reparsed.source_text(&reparsed.entries[0]), "Hello, world");
}

#[test]
fn test_writer_withUnknownKeyOrLanguage_shouldIgnoreQuietly() {
    let dir = TempDir::new().unwrap();
    let input = write_sample(&dir);
    let file = LocalizationFile::open(&input).unwrap();

    let mut writer = LocalizationWriter::new(&file);
    writer.write("no-such-key", "german", "x");
    writer.write("greeting", "no-such-language", "x");

    let output = dir.path().join("out.txt");
    writer.save(&output).unwrap();
    let reparsed = LocalizationFile::open(&output).unwrap();
    assert_eq!(reparsed.entries.len(), 2);
}

#[test]
fn test_translated_output_path_shouldSitNextToInput() {
    assert_eq!(
        translated_output_path(Path::new("mods/a/Localization.txt")),
        Path::new("mods/a/Localization.translated.txt")
    );
}
