//! Curve output: one CSV column per cohort series, or the full set as JSON

use super::CurveSet;
use crate::error::CurveResult;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Write a curve set as CSV.
///
/// Header is the index label followed by one `<cohort>_<kind>` column per series.
/// Rows cover the union of every series' index values; undefined ratios are empty.
pub fn write_curve_csv<W: Write>(set: &CurveSet, writer: W) -> CurveResult<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header = vec![set.index.label().to_string()];
    header.extend(set.series.iter().map(|s| set.label(s)));
    wtr.write_record(&header)?;

    for (index, ratios) in set.aligned() {
        let mut record = vec![index.to_string()];
        record.extend(
            ratios
                .iter()
                .map(|r| r.map(|v| v.to_string()).unwrap_or_default()),
        );
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_curve_json<W: Write>(set: &CurveSet, writer: W) -> CurveResult<()> {
    serde_json::to_writer_pretty(writer, set)?;
    Ok(())
}

/// Write `set` to `<dir>/<kind>.csv` (or `.json`), returning the path written
pub fn save_curve(set: &CurveSet, dir: &Path, json: bool) -> CurveResult<std::path::PathBuf> {
    let ext = if json { "json" } else { "csv" };
    let path = dir.join(format!("{}.{ext}", set.kind));
    let file = File::create(&path)?;
    if json {
        write_curve_json(set, file)?;
    } else {
        write_curve_csv(set, file)?;
    }
    log::info!("Wrote {} series of {} to {}", set.series.len(), set.kind, path.display());
    Ok(path)
}
