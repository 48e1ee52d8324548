//! Recorded capture replay.
//!
//! A capture is a CSV file with one labeled marker position per row:
//!
//! ```text
//! frame,label,x,y,z
//! 0,LASI,-0.12,1.0,0.08
//! 0,RASI,0.12,1.0,0.08
//! 1,LASI,,,
//! ```
//!
//! Empty or `nan` coordinates mark a dropout. Rows are grouped by frame
//! index; frames keep the order in which their index first appears.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context, Result};
use csv::{ReaderBuilder, StringRecord};
use nalgebra::Vector3;

use crate::localization::MarkerFrame;

const COLUMNS: [&str; 5] = ["frame", "label", "x", "y", "z"];

/// Loads every frame of a capture file.
pub fn load_capture<P: AsRef<Path>>(path: P) -> Result<Vec<MarkerFrame>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open capture {}", path.display()))?;
    parse_capture(file).with_context(|| format!("Invalid capture {}", path.display()))
}

/// Parses capture CSV from any reader.
pub fn parse_capture<R: Read>(reader: R) -> Result<Vec<MarkerFrame>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers().context("Failed to read capture header")?.clone();
    let columns = column_indices(&headers)?;

    let mut frames: Vec<MarkerFrame> = Vec::new();
    let mut slots: HashMap<u64, usize> = HashMap::new();
    for (row, rec) in rdr.records().enumerate() {
        let rec = rec.with_context(|| format!("Malformed row {}", row + 1))?;
        let field = |i: usize| rec.get(columns[i]).unwrap_or("");

        let index: u64 = field(0)
            .parse()
            .with_context(|| format!("Row {}: bad frame index {:?}", row + 1, field(0)))?;
        let label = field(1);
        if label.is_empty() {
            bail!("Row {}: empty marker label", row + 1);
        }
        let position = Vector3::new(
            coordinate(field(2), row)?,
            coordinate(field(3), row)?,
            coordinate(field(4), row)?,
        );

        let slot = *slots.entry(index).or_insert_with(|| {
            frames.push(MarkerFrame::new(index));
            frames.len() - 1
        });
        frames[slot].push(label, position);
    }
    Ok(frames)
}

fn column_indices(headers: &StringRecord) -> Result<[usize; 5]> {
    let mut indices = [0; 5];
    for (slot, name) in indices.iter_mut().zip(COLUMNS) {
        *slot = headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .with_context(|| format!("Capture header is missing column {:?}", name))?;
    }
    Ok(indices)
}

fn coordinate(text: &str, row: usize) -> Result<f64> {
    if text.is_empty() || text.eq_ignore_ascii_case("nan") {
        return Ok(f64::NAN);
    }
    text.parse()
        .with_context(|| format!("Row {}: bad coordinate {:?}", row + 1, text))
}
