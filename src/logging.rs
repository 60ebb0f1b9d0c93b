//! Optional transcript logging for the interactive chat loop.

use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{Error, Result};

pub struct TranscriptLog {
    file_path: Option<String>,
    is_active: bool,
}

impl TranscriptLog {
    /// A log file given up front (e.g. via `--log`) starts active.
    pub fn new(log_file: Option<String>) -> Result<Self> {
        let mut log = TranscriptLog {
            file_path: None,
            is_active: false,
        };
        if let Some(path) = log_file {
            log.set_log_file(path)?;
        }
        Ok(log)
    }

    pub fn set_log_file(&mut self, path: String) -> Result<()> {
        self.probe_file_access(&path)?;
        self.file_path = Some(path);
        self.is_active = true;
        Ok(())
    }

    /// Pauses or resumes logging; fails when no log file was ever set.
    pub fn toggle(&mut self) -> Result<String> {
        match &self.file_path {
            Some(path) => {
                self.is_active = !self.is_active;
                if self.is_active {
                    Ok(format!("Logging resumed to: {path}"))
                } else {
                    Ok(format!("Logging paused (file: {path})"))
                }
            }
            None => Err(Error::validation(
                "no log file set; use /log <filename> to enable logging first",
            )),
        }
    }

    /// Appends one message to the log, preserving line structure and adding
    /// a blank separator line to match the on-screen spacing.
    pub fn log_message(&self, content: &str) -> Result<()> {
        if !self.is_active {
            return Ok(());
        }
        let Some(file_path) = self.file_path.as_ref() else {
            return Ok(());
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(file_path)
            .map_err(|e| {
                Error::configuration_with(format!("could not open log file {file_path}"), e)
            })?;
        let mut writer = BufWriter::new(file);
        for line in content.lines() {
            writeln!(writer, "{line}")
                .map_err(|e| Error::configuration_with("could not write log", e))?;
        }
        writeln!(writer).map_err(|e| Error::configuration_with("could not write log", e))?;
        writer
            .flush()
            .map_err(|e| Error::configuration_with("could not flush log", e))
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn status(&self) -> String {
        match (&self.file_path, self.is_active) {
            (None, _) => "disabled".to_string(),
            (Some(path), true) => format!("active ({})", file_name_of(path)),
            (Some(path), false) => format!("paused ({})", file_name_of(path)),
        }
    }

    fn probe_file_access(&self, path: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| {
                Error::configuration_with(format!("could not open log file {path}"), e)
            })?;
        file.flush()
            .map_err(|e| Error::configuration_with(format!("could not write log file {path}"), e))
    }
}

fn file_name_of(path: &str) -> String {
    Path::new(path)
        .file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn log_given_at_construction_is_active() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("chat.log").to_string_lossy().into_owned();
        let log = TranscriptLog::new(Some(path)).expect("log");
        assert!(log.is_active());
    }

    #[test]
    fn messages_append_with_a_blank_separator() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("chat.log").to_string_lossy().into_owned();
        let log = TranscriptLog::new(Some(path.clone())).expect("log");

        log.log_message("You: hello").expect("write");
        log.log_message("two\nlines").expect("write");

        let contents = std::fs::read_to_string(&path).expect("read");
        assert_eq!(contents, "You: hello\n\ntwo\nlines\n\n");
    }

    #[test]
    fn toggle_without_a_file_fails() {
        let mut log = TranscriptLog::new(None).expect("log");
        assert!(matches!(log.toggle(), Err(Error::Validation(_))));
        assert_eq!(log.status(), "disabled");
    }

    #[test]
    fn paused_logging_writes_nothing() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("chat.log").to_string_lossy().into_owned();
        let mut log = TranscriptLog::new(Some(path.clone())).expect("log");

        log.toggle().expect("pause");
        log.log_message("dropped").expect("write");
        let contents = std::fs::read_to_string(&path).expect("read");
        assert!(contents.is_empty());

        log.toggle().expect("resume");
        assert!(log.status().starts_with("active"));
    }
}
