//src/fastq.rs

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use flate2::read::MultiGzDecoder;

use crate::config::EngineConfig;
use crate::error::{AnalysisError, Result};
use crate::types::FastqRecord;

/// Offset of the Sanger / Illumina 1.8+ quality encoding.
pub const PHRED_OFFSET: u8 = 33;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Structural problems seen while streaming one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub valid: bool,
    pub total_reads: u64,
    /// First few messages, capped by `max_reported_errors`.
    pub errors: Vec<String>,
    /// Every problem seen, including those not kept in `errors`.
    pub error_count: usize,
}

impl ValidationReport {
    fn new() -> Self {
        Self {
            valid: true,
            ..Self::default()
        }
    }
}

/// Decode one Phred+33 quality character.
#[inline]
pub fn decode_phred(c: u8) -> u8 {
    c.saturating_sub(PHRED_OFFSET)
}

/// Streaming FASTQ reader over plain or gzip-compressed files.
///
/// Header / separator violations are recorded in [`FastqReader::validation`]
/// instead of aborting the stream. I/O and decompression failures end the
/// stream with a single `Err` item.
pub struct FastqReader {
    path: PathBuf,
    reader: Box<dyn BufRead + Send>,
    buf: Vec<u8>,
    line_no: usize,
    validation: ValidationReport,
    max_reported_errors: usize,
    done: bool,
}

impl FastqReader {
    /// Open `path`, transparently decompressing gzip input.
    pub fn open<P: AsRef<Path>>(path: P, cfg: &EngineConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let f = File::open(&path).map_err(|e| AnalysisError::io(&path, e))?;
        let mut raw = BufReader::new(f);

        // Sniff the magic bytes too, downloads are not always named *.gz
        let has_gz_ext = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("gz"))
            .unwrap_or(false);
        let has_gz_magic = raw
            .fill_buf()
            .map(|head| head.starts_with(&GZIP_MAGIC))
            .map_err(|e| AnalysisError::io(&path, e))?;

        let reader: Box<dyn BufRead + Send> = if has_gz_ext || has_gz_magic {
            Box::new(BufReader::new(MultiGzDecoder::new(raw)))
        } else {
            Box::new(raw)
        };

        Ok(Self {
            path,
            reader,
            buf: Vec::with_capacity(512),
            line_no: 0,
            validation: ValidationReport::new(),
            max_reported_errors: cfg.max_reported_errors,
            done: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Validation state so far; complete once the iterator is exhausted.
    pub fn validation(&self) -> &ValidationReport {
        &self.validation
    }

    pub fn into_validation(self) -> ValidationReport {
        self.validation
    }

    fn record_error(&mut self, msg: String) {
        self.validation.valid = false;
        self.validation.error_count += 1;
        if self.validation.errors.len() < self.max_reported_errors {
            self.validation.errors.push(msg);
        }
    }

    /// Read one line into `self.buf` without its line terminator.
    /// Returns `false` at EOF.
    fn read_line(&mut self) -> std::io::Result<bool> {
        self.buf.clear();
        if self.reader.read_until(b'\n', &mut self.buf)? == 0 {
            return Ok(false);
        }
        self.line_no += 1;
        while matches!(self.buf.last(), Some(b'\n') | Some(b'\r')) {
            self.buf.pop();
        }
        Ok(true)
    }

    fn truncated(&mut self) {
        let msg = format!(
            "Line {}: Truncated record (expected 4 lines per read)",
            self.line_no
        );
        self.record_error(msg);
        self.done = true;
    }

    fn next_record(&mut self) -> std::io::Result<Option<FastqRecord>> {
        // 1) header
        if !self.read_line()? {
            return Ok(None);
        }
        let id;
        let sequence;
        if self.buf.is_empty() {
            // An empty last line is fine, anywhere else it is a bad header
            let blank_line = self.line_no;
            if !self.read_line()? {
                return Ok(None);
            }
            let msg = format!("Line {}: Invalid header (should start with @)", blank_line);
            self.record_error(msg);
            id = String::new();
            sequence = self.buf.clone();
        } else {
            if self.buf[0] != b'@' {
                let msg = format!("Line {}: Invalid header (should start with @)", self.line_no);
                self.record_error(msg);
            }
            let header = self.buf.strip_prefix(b"@").unwrap_or(&self.buf[..]);
            id = header
                .split(|b| b.is_ascii_whitespace())
                .next()
                .map(|s| String::from_utf8_lossy(s).into_owned())
                .unwrap_or_default();

            // 2) sequence
            if !self.read_line()? {
                self.truncated();
                return Ok(None);
            }
            sequence = self.buf.clone();
        }

        // 3) separator
        if !self.read_line()? {
            self.truncated();
            return Ok(None);
        }
        if !self.buf.starts_with(b"+") {
            let msg = format!(
                "Line {}: Invalid separator (should start with +)",
                self.line_no
            );
            self.record_error(msg);
        }

        // 4) quality
        if !self.read_line()? {
            self.truncated();
            return Ok(None);
        }
        if self.buf.len() != sequence.len() {
            let msg = format!(
                "Line {}: Quality length {} does not match sequence length {}",
                self.line_no,
                self.buf.len(),
                sequence.len()
            );
            self.record_error(msg);
        }
        let quality = self.buf.iter().map(|&c| decode_phred(c)).collect();

        self.validation.total_reads += 1;
        Ok(Some(FastqRecord {
            id,
            sequence,
            quality,
        }))
    }
}

impl Iterator for FastqReader {
    type Item = Result<FastqRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_record() {
            Ok(Some(rec)) => Some(Ok(rec)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(AnalysisError::io(&self.path, e)))
            }
        }
    }
}

/// Validation-only pass over a FASTQ file.
pub fn validate_fastq<P: AsRef<Path>>(path: P, cfg: &EngineConfig) -> Result<ValidationReport> {
    let mut reader = FastqReader::open(path, cfg)?;
    for rec in reader.by_ref() {
        rec?;
    }
    let report = reader.into_validation();
    if report.valid {
        log::info!(
            "FASTQ validation passed: {} reads",
            report.total_reads
        );
    } else {
        log::warn!(
            "FASTQ validation failed with {} problem(s)",
            report.error_count
        );
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_plain(dir: &TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_decode_phred() {
        assert_eq!(decode_phred(b'!'), 0);
        assert_eq!(decode_phred(b'I'), 40);
        assert_eq!(decode_phred(b' '), 0);
    }

    #[test]
    fn test_reads_plain_records() {
        let dir = TempDir::new().unwrap();
        let path = write_plain(&dir, "a.fastq", "@r1 extra\nACGT\n+\nII#!\n@r2\nNN\n+r2\n55\n");
        let cfg = EngineConfig::default();
        let mut reader = FastqReader::open(&path, &cfg).unwrap();
        let recs: Vec<_> = reader.by_ref().collect::<Result<_>>().unwrap();

        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].id, "r1");
        assert_eq!(recs[0].sequence, b"ACGT");
        assert_eq!(recs[0].quality, vec![40, 40, 2, 0]);
        assert_eq!(recs[1].quality, vec![20, 20]);
        assert!(reader.validation().valid);
        assert_eq!(reader.validation().total_reads, 2);
    }

    #[test]
    fn test_reads_gzip_records() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.fastq.gz");
        let mut enc = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        enc.write_all(b"@r1\nACGT\n+\nIIII\n").unwrap();
        enc.finish().unwrap();

        let cfg = EngineConfig::default();
        let recs: Vec<_> = FastqReader::open(&path, &cfg)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].sequence, b"ACGT");
    }

    #[test]
    fn test_crlf_line_endings() {
        let dir = TempDir::new().unwrap();
        let path = write_plain(&dir, "crlf.fastq", "@r1\r\nACGT\r\n+\r\nIIII\r\n");
        let report = validate_fastq(&path, &EngineConfig::default()).unwrap();
        assert!(report.valid);
        assert_eq!(report.total_reads, 1);
    }

    #[test]
    fn test_bad_header_and_separator_are_recorded_not_raised() {
        let dir = TempDir::new().unwrap();
        let path = write_plain(&dir, "bad.fastq", "r1\nACGT\n-\nIIII\n@r2\nAC\n+\nII\n");
        let cfg = EngineConfig::default();
        let mut reader = FastqReader::open(&path, &cfg).unwrap();
        let recs: Vec<_> = reader.by_ref().collect::<Result<_>>().unwrap();

        assert_eq!(recs.len(), 2);
        let v = reader.validation();
        assert!(!v.valid);
        assert_eq!(v.error_count, 2);
        assert!(v.errors[0].starts_with("Line 1: Invalid header"));
        assert!(v.errors[1].starts_with("Line 3: Invalid separator"));
    }

    #[test]
    fn test_truncated_record_is_invalid() {
        let dir = TempDir::new().unwrap();
        let path = write_plain(&dir, "trunc.fastq", "@r1\nACGT\n+\nIIII\n@r2\nACGT\n");
        let report = validate_fastq(&path, &EngineConfig::default()).unwrap();
        assert!(!report.valid);
        assert_eq!(report.total_reads, 1);
        assert!(report.errors[0].contains("Truncated"));
    }

    #[test]
    fn test_quality_length_mismatch_is_invalid() {
        let dir = TempDir::new().unwrap();
        let path = write_plain(&dir, "len.fastq", "@r1\nACGT\n+\nIII\n");
        let report = validate_fastq(&path, &EngineConfig::default()).unwrap();
        assert!(!report.valid);
        assert_eq!(report.total_reads, 1);
    }

    #[test]
    fn test_error_messages_are_capped() {
        let dir = TempDir::new().unwrap();
        let body = "x\nA\n-\nI\n".repeat(20);
        let path = write_plain(&dir, "many.fastq", &body);
        let cfg = EngineConfig {
            max_reported_errors: 3,
            ..EngineConfig::default()
        };
        let report = validate_fastq(&path, &cfg).unwrap();
        assert_eq!(report.errors.len(), 3);
        assert_eq!(report.error_count, 40);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = FastqReader::open(dir.path().join("nope.fastq.gz"), &EngineConfig::default())
            .err()
            .expect("open should fail");
        assert!(matches!(err, AnalysisError::Io { .. }));
    }

    #[test]
    fn test_corrupt_gzip_yields_io_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("corrupt.fastq.gz");
        std::fs::write(&path, b"this is not gzip at all").unwrap();
        let results: Vec<_> = FastqReader::open(&path, &EngineConfig::default())
            .unwrap()
            .collect();
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], Err(AnalysisError::Io { .. })));
    }

    #[test]
    fn test_empty_file_has_no_records() {
        let dir = TempDir::new().unwrap();
        let path = write_plain(&dir, "empty.fastq", "");
        let report = validate_fastq(&path, &EngineConfig::default()).unwrap();
        assert!(report.valid);
        assert_eq!(report.total_reads, 0);
    }

    #[test]
    fn test_blank_line_between_records_is_a_bad_header() {
        let dir = TempDir::new().unwrap();
        let path = write_plain(
            &dir,
            "gap.fastq",
            "@r1\nACGT\n+\nIIII\n\n@r2\nACGT\n+\nIIII\n",
        );
        let report = validate_fastq(&path, &EngineConfig::default()).unwrap();
        assert!(!report.valid);
        assert!(report.errors[0].starts_with("Line 5: Invalid header"));
    }

    #[test]
    fn test_only_blank_lines_is_invalid() {
        let dir = TempDir::new().unwrap();
        let path = write_plain(&dir, "blank.fastq", "\n\n\n\n");
        let report = validate_fastq(&path, &EngineConfig::default()).unwrap();
        assert!(!report.valid);
        assert!(report.errors[0].starts_with("Line 1: Invalid header"));
    }

    #[test]
    fn test_single_trailing_blank_line_is_accepted() {
        let dir = TempDir::new().unwrap();
        let path = write_plain(&dir, "tail.fastq", "@r1\nACGT\n+\nIIII\n\n");
        let report = validate_fastq(&path, &EngineConfig::default()).unwrap();
        assert!(report.valid);
        assert_eq!(report.total_reads, 1);
    }
}
