use std::fs;
use std::io::{self, Write};
use std::path::Path;

use camino::Utf8Path;
use flate2::read::MultiGzDecoder;

use crate::error::SurveyError;

pub fn write_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), SurveyError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    fs::create_dir_all(parent.as_std_path())
        .map_err(|err| SurveyError::Filesystem(err.to_string()))?;
    let mut temp = tempfile::Builder::new()
        .prefix(".mg-survey")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| SurveyError::Filesystem(err.to_string()))?;
    temp.write_all(content)
        .map_err(|err| SurveyError::Filesystem(err.to_string()))?;
    temp.persist(path.as_std_path())
        .map_err(|err| SurveyError::Filesystem(err.to_string()))?;
    Ok(())
}

pub fn move_into_place(source: &Path, dest: &Utf8Path) -> Result<(), SurveyError> {
    if dest.as_std_path().exists() {
        fs::remove_file(dest.as_std_path())
            .map_err(|err| SurveyError::Filesystem(err.to_string()))?;
    }
    fs::rename(source, dest.as_std_path())
        .map_err(|err| SurveyError::Filesystem(format!("move into {dest}: {err}")))
}

pub fn is_gzip(path: &Path) -> Result<bool, SurveyError> {
    let mut magic = [0u8; 2];
    let mut file = fs::File::open(path)
        .map_err(|err| SurveyError::Filesystem(format!("open {}: {err}", path.display())))?;
    let read = io::Read::read(&mut file, &mut magic)
        .map_err(|err| SurveyError::Filesystem(err.to_string()))?;
    Ok(read == 2 && magic == [0x1f, 0x8b])
}

pub fn validate_gzip(path: &Path) -> Result<u64, SurveyError> {
    let file = fs::File::open(path)
        .map_err(|err| SurveyError::Filesystem(format!("open {}: {err}", path.display())))?;
    let mut decoder = MultiGzDecoder::new(file);
    io::copy(&mut decoder, &mut io::sink()).map_err(|err| {
        SurveyError::Filesystem(format!("corrupt gzip {}: {err}", path.display()))
    })
}
