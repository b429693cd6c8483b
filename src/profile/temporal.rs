//! Top-feature summaries over the sampling timeline.

use super::order_by_mean_desc;
use crate::data::{AbundanceMatrix, Metadata};
use crate::error::{AbrgError, Result};
use crate::io;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One observation of a top feature in a tidy time series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub feature_id: String,
    pub sample_id: String,
    pub day: f64,
    pub abundance: f64,
}

/// Rows of the `top_n` features with the highest mean abundance, in rank
/// order (ties by feature ID).
pub fn top_features_over_time(matrix: &AbundanceMatrix, top_n: usize) -> Result<AbundanceMatrix> {
    let means = matrix.row_means();
    let mut order = order_by_mean_desc(&means, matrix.feature_ids(), (0..means.len()).collect());
    order.truncate(top_n);
    matrix.subset_features(&order)
}

/// Tidy time series of the `top_n` most abundant features.
///
/// Samples whose `day_column` value is missing are dropped. Points are
/// ordered by feature rank, then day, then sample ID.
pub fn time_series(
    matrix: &AbundanceMatrix,
    metadata: &Metadata,
    top_n: usize,
    day_column: &str,
) -> Result<Vec<TimeSeriesPoint>> {
    if !metadata.has_column(day_column) {
        return Err(AbrgError::MissingColumn(day_column.to_string()));
    }
    let days = metadata.numeric_for(day_column, matrix.sample_ids())?;

    let mut timeline: Vec<(usize, f64)> = days
        .iter()
        .enumerate()
        .filter_map(|(j, d)| d.map(|day| (j, day)))
        .collect();
    timeline.sort_by(|a, b| {
        a.1.total_cmp(&b.1)
            .then_with(|| matrix.sample_ids()[a.0].cmp(&matrix.sample_ids()[b.0]))
    });

    let means = matrix.row_means();
    let mut order = order_by_mean_desc(&means, matrix.feature_ids(), (0..means.len()).collect());
    order.truncate(top_n);

    let mut points = Vec::with_capacity(order.len() * timeline.len());
    for &i in &order {
        for &(j, day) in &timeline {
            points.push(TimeSeriesPoint {
                feature_id: matrix.feature_ids()[i].clone(),
                sample_id: matrix.sample_ids()[j].clone(),
                day,
                abundance: matrix.get(i, j),
            });
        }
    }
    Ok(points)
}

/// Write tidy time-series rows (`KO,sample_id,day,abundance`).
pub fn write_time_series<P: AsRef<Path>>(points: &[TimeSeriesPoint], path: P) -> Result<()> {
    let mut writer = io::create_writer(path)?;
    writer.write_record(["KO", "sample_id", "day", "abundance"])?;
    for p in points {
        writer.write_record([
            p.feature_id.as_str(),
            p.sample_id.as_str(),
            io::fmt_f64(p.day).as_str(),
            io::fmt_f64(p.abundance).as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}
