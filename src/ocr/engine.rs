use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use super::preprocess::scaled_copy;
use super::setup::{find_tessdata_dir, find_tesseract_executable};
use super::{OcrBackend, Recognition};
use crate::command;
use crate::error::OcrError;

/// Represents a line of OCR text with confidence score
#[derive(Debug, Clone)]
pub struct OcrLine {
    pub text: String,
    pub words: Vec<OcrWord>,
    /// Mean word confidence, 0..100
    pub confidence: f32,
}

/// Represents a single word from OCR with confidence score
#[derive(Debug, Clone)]
pub struct OcrWord {
    pub text: String,
    /// 0..100
    pub confidence: f32,
}

/// Tesseract invoked as a subprocess with TSV output.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    executable: PathBuf,
    tessdata: Option<PathBuf>,
    /// Resize the image before each run, enabling the scale search.
    prescale: bool,
}

impl TesseractOcr {
    pub fn new(executable: impl Into<PathBuf>, tessdata: Option<PathBuf>, prescale: bool) -> Self {
        Self {
            executable: executable.into(),
            tessdata,
            prescale,
        }
    }

    /// Finds an installed Tesseract.
    pub fn locate(prescale: bool) -> Result<Self, OcrError> {
        let executable = find_tesseract_executable()?;
        let tessdata = find_tessdata_dir();
        debug!(
            "Tesseract executable: {}, tessdata: {:?}",
            executable.display(),
            tessdata
        );
        Ok(Self::new(executable, tessdata, prescale))
    }

    /// Runs Tesseract on an image file and returns structured lines.
    pub fn recognize_lines(&self, image: &Path) -> Result<Vec<OcrLine>, OcrError> {
        let mut cmd = Command::new(&self.executable);
        cmd.arg(image).arg("stdout");
        if let Some(tessdata) = &self.tessdata {
            cmd.arg("--tessdata-dir").arg(tessdata);
        }
        cmd.arg("-l").arg("eng").arg("tsv");

        let tsv = command::output(&mut cmd, None)?;
        let lines = parse_tsv_output(&tsv);
        for line in &lines {
            debug!("OCR line ({:.0}%): {}", line.confidence, line.text);
        }
        Ok(lines)
    }
}

impl OcrBackend for TesseractOcr {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn supports_scaling(&self) -> bool {
        self.prescale
    }

    fn recognize(&self, image: &Path, scale: f32) -> Result<Recognition, OcrError> {
        let lines = if self.prescale && (scale - 1.0).abs() > f32::EPSILON {
            let scaled = scaled_copy(image, scale)?;
            self.recognize_lines(scaled.path())?
        } else {
            self.recognize_lines(image)?
        };
        Ok(recognition_from_lines(&lines))
    }
}

/// Joins lines with spaces; confidence is the sum of word confidences scaled to 0..1.
pub fn recognition_from_lines(lines: &[OcrLine]) -> Recognition {
    let text = lines
        .iter()
        .map(|l| l.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    let confidence = lines
        .iter()
        .flat_map(|l| &l.words)
        .map(|w| w.confidence / 100.0)
        .sum();
    Recognition { text, confidence }
}

/// Parses Tesseract TSV output into structured OcrLine data
pub fn parse_tsv_output(tsv: &str) -> Vec<OcrLine> {
    let mut lines: Vec<OcrLine> = Vec::new();
    let mut current_key: Option<(i32, i32, i32)> = None;
    let mut current_words: Vec<OcrWord> = Vec::new();

    // Skip header
    for row in tsv.lines().skip(1) {
        let fields: Vec<&str> = row.split('\t').collect();
        if fields.len() < 12 {
            continue;
        }

        // TSV fields: level, page_num, block_num, par_num, line_num, word_num,
        //             left, top, width, height, conf, text
        let level: i32 = fields[0].parse().unwrap_or(-1);
        let key = (
            fields[2].parse().unwrap_or(-1),
            fields[3].parse().unwrap_or(-1),
            fields[4].parse().unwrap_or(-1),
        );
        let conf: f32 = fields[10].parse().unwrap_or(-1.0);
        let text = fields[11].trim();

        // Level 5 = word
        if level != 5 || text.is_empty() || conf < 0.0 {
            continue;
        }

        if current_key.is_some_and(|k| k != key) {
            flush_line(&mut lines, std::mem::take(&mut current_words));
        }
        current_key = Some(key);

        current_words.push(OcrWord {
            text: text.to_string(),
            confidence: conf,
        });
    }

    flush_line(&mut lines, current_words);
    lines
}

fn flush_line(lines: &mut Vec<OcrLine>, words: Vec<OcrWord>) {
    if words.is_empty() {
        return;
    }
    let confidence = words.iter().map(|w| w.confidence).sum::<f32>() / words.len() as f32;
    let text = words
        .iter()
        .map(|w| w.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    lines.push(OcrLine {
        text,
        words,
        confidence,
    });
}
