use chrono::NaiveDateTime;
use log::{debug, info, warn};

use snafu::ResultExt;

use crate::config::*;
use crate::grouping::SeedGrouper;
use crate::table::*;

/// Response counts of one seed per time bin.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ArrivalSeries {
    pub seed: String,
    pub counts: Vec<u64>,
}

/// How fast responses came in, seed by seed.
///
/// Bin `i` covers `[i * bin_seconds, (i + 1) * bin_seconds)` seconds after
/// the first submission of the whole table. All the series have the same
/// number of bins.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ArrivalReport {
    pub bin_seconds: i64,
    pub series: Vec<ArrivalSeries>,
}

/// Equal-width histogram. The last bin is closed on both ends.
#[derive(PartialEq, Debug, Clone)]
pub struct Histogram {
    pub lower: f64,
    pub width: f64,
    pub counts: Vec<u64>,
}

impl Histogram {
    /// The `counts.len() + 1` bin edges.
    pub fn edges(&self) -> Vec<f64> {
        (0..=self.counts.len())
            .map(|i| self.lower + (i as f64) * self.width)
            .collect()
    }
}

fn read_timestamps(
    table: &ResponseTable,
    timing: &TimingSettings,
) -> SurveyResult<Vec<Option<NaiveDateTime>>> {
    let idx = table.column_index(&timing.submit_column)?;
    table
        .rows()
        .iter()
        .enumerate()
        .map(|(lineno, row)| {
            let cell = row[idx].trim();
            if cell.is_empty() {
                return Ok(None);
            }
            NaiveDateTime::parse_from_str(cell, &timing.timestamp_format)
                .map(Some)
                .context(MalformedTimestampSnafu {
                    lineno: lineno + 1,
                    value: cell,
                })
        })
        .collect()
}

// Bin of a timestamp, None when it comes before the origin.
fn bin_of(ts: NaiveDateTime, origin: NaiveDateTime, bin_seconds: i64) -> Option<usize> {
    let delta = (ts - origin).num_seconds();
    if delta < 0 {
        None
    } else {
        Some((delta / bin_seconds) as usize)
    }
}

/// Bins the submission times of the rows of every main seed.
///
/// The origin is the first submission time found in the table, in table order.
/// Blank submission times are skipped.
pub fn arrival_rates(table: &ResponseTable, settings: &SurveySettings) -> SurveyResult<ArrivalReport> {
    let timing = &settings.timing;
    if timing.bin_seconds <= 0 {
        return InvalidBucketsSnafu {
            message: format!("bin length must be positive, got {}s", timing.bin_seconds),
        }
        .fail();
    }

    let all = read_timestamps(table, timing)?;
    let origin = match all.iter().flatten().next() {
        Some(ts) => *ts,
        None => {
            warn!("arrival_rates: no submission time in the table");
            return Ok(ArrivalReport {
                bin_seconds: timing.bin_seconds,
                series: settings
                    .main_seeds
                    .iter()
                    .map(|seed| ArrivalSeries {
                        seed: seed.clone(),
                        counts: Vec::new(),
                    })
                    .collect(),
            });
        }
    };
    let num_bins = all
        .iter()
        .flatten()
        .filter_map(|ts| bin_of(*ts, origin, timing.bin_seconds))
        .max()
        .map_or(0, |b| b + 1);
    debug!("arrival_rates: origin {}, {} bins", origin, num_bins);

    let grouper = SeedGrouper::new(table, settings)?;
    let mut series: Vec<ArrivalSeries> = Vec::new();
    for seed in settings.main_seeds.iter() {
        let rows = grouper.rows_for_seed(seed);
        let mut counts: Vec<u64> = vec![0; num_bins];
        for (lineno, ts) in read_timestamps(&rows, timing)?.into_iter().enumerate() {
            let ts = match ts {
                Some(x) => x,
                None => continue,
            };
            match bin_of(ts, origin, timing.bin_seconds) {
                Some(b) => counts[b] += 1,
                None => warn!(
                    "arrival_rates: seed {:?}: row {} was submitted at {}, before the first response",
                    seed,
                    lineno + 1,
                    ts
                ),
            }
        }
        info!(
            "arrival_rates: seed {:?}: {} responses",
            seed,
            counts.iter().sum::<u64>()
        );
        series.push(ArrivalSeries {
            seed: seed.clone(),
            counts,
        });
    }
    Ok(ArrivalReport {
        bin_seconds: timing.bin_seconds,
        series,
    })
}

/// Histogram of the interview length of every respondent.
///
/// Blank cells are skipped. Without any value, the histogram has no bins.
pub fn interview_lengths(table: &ResponseTable, settings: &SurveySettings) -> SurveyResult<Histogram> {
    let timing = &settings.timing;
    if timing.interview_bins == 0 {
        return InvalidBucketsSnafu {
            message: "the interview length histogram needs at least one bin".to_string(),
        }
        .fail();
    }
    let idx = table.column_index(&timing.interview_column)?;
    let values: Vec<f64> = table
        .rows()
        .iter()
        .enumerate()
        .map(|(lineno, row)| parse_number(&row[idx], lineno + 1, &timing.interview_column))
        .collect::<SurveyResult<Vec<Option<f64>>>>()?
        .into_iter()
        .flatten()
        .collect();
    info!("interview_lengths: {} values", values.len());
    Ok(histogram(&values, timing.interview_bins))
}

fn histogram(values: &[f64], bins: usize) -> Histogram {
    let (min, max) = match values.iter().copied().fold(None, |acc, x| match acc {
        None => Some((x, x)),
        Some((lo, hi)) => Some((f64::min(lo, x), f64::max(hi, x))),
    }) {
        Some(x) => x,
        None => {
            return Histogram {
                lower: 0.0,
                width: 0.0,
                counts: Vec::new(),
            }
        }
    };
    let (lower, upper) = if min == max {
        (min - 0.5, max + 0.5)
    } else {
        (min, max)
    };
    let width = (upper - lower) / (bins as f64);
    let mut counts: Vec<u64> = vec![0; bins];
    for x in values.iter() {
        let b = (((x - lower) / width) as usize).min(bins - 1);
        counts[b] += 1;
    }
    Histogram {
        lower,
        width,
        counts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &[&str]) -> Vec<String> {
        v.iter().map(|x| x.to_string()).collect()
    }

    fn table() -> ResponseTable {
        ResponseTable::new(
            s(&["ref", "unique", "submitdate", "interviewtime"]),
            vec![
                s(&["sd01", "aaaa", "2020-03-01 10:00:00", "300"]),
                s(&["sd02", "bbbb", "2020-03-01 10:20:00", "100"]),
                s(&["aaaa", "cccc", "2020-03-01 11:40:00", ""]),
                s(&["sd01", "dddd", "", "200"]),
                s(&["bbbb", "eeee", "2020-03-01 09:00:00", "500"]),
            ],
        )
        .unwrap()
    }

    fn settings(seeds: &[&str]) -> SurveySettings {
        SurveySettings {
            main_seeds: s(seeds),
            ..SurveySettings::default()
        }
    }

    #[test]
    fn arrival_bins() {
        let report = arrival_rates(&table(), &settings(&["sd01", "sd02", "*"])).unwrap();
        assert_eq!(report.bin_seconds, 1800);
        assert_eq!(report.series.len(), 3);
        // 10:00, 11:40 and a blank time.
        assert_eq!(report.series[0].counts, vec![1, 0, 0, 1]);
        // 10:20, and 09:00 which is before the origin.
        assert_eq!(report.series[1].counts, vec![1, 0, 0, 0]);
        assert_eq!(report.series[2].counts, vec![0, 0, 0, 0]);
    }

    #[test]
    fn arrival_origin_is_first_timestamp() {
        let t = ResponseTable::new(
            s(&["ref", "unique", "submitdate"]),
            vec![
                s(&["sd01", "aaaa", ""]),
                s(&["sd01", "bbbb", "2020-03-01 10:00:00"]),
                s(&["aaaa", "cccc", "2020-03-01 10:40:00"]),
            ],
        )
        .unwrap();
        let report = arrival_rates(&t, &settings(&["sd01"])).unwrap();
        assert_eq!(report.series[0].counts, vec![1, 1]);
    }

    #[test]
    fn arrival_bad_timestamp() {
        let t = ResponseTable::new(
            s(&["ref", "unique", "submitdate"]),
            vec![s(&["sd01", "aaaa", "yesterday"])],
        )
        .unwrap();
        let err = arrival_rates(&t, &settings(&["sd01"])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedRow);
        assert!(matches!(err, SurveyError::MalformedTimestamp { lineno: 1, .. }));
    }

    #[test]
    fn arrival_needs_positive_bins() {
        let mut st = settings(&["sd01"]);
        st.timing.bin_seconds = 0;
        assert_eq!(
            arrival_rates(&table(), &st).unwrap_err().kind(),
            ErrorKind::Configuration
        );
        st.timing.bin_seconds = 60;
        st.timing.submit_column = "submitted".to_string();
        assert!(matches!(
            arrival_rates(&table(), &st),
            Err(SurveyError::MissingColumn { .. })
        ));
    }

    #[test]
    fn interview_histogram() {
        let mut st = settings(&["*"]);
        st.timing.interview_bins = 4;
        let h = interview_lengths(&table(), &st).unwrap();
        assert_eq!(h.lower, 100.0);
        assert_eq!(h.width, 100.0);
        assert_eq!(h.counts, vec![1, 1, 1, 1]);
        assert_eq!(h.edges(), vec![100.0, 200.0, 300.0, 400.0, 500.0]);
    }

    #[test]
    fn constant_sample() {
        let h = histogram(&[7.0, 7.0], 2);
        assert_eq!(h.lower, 6.5);
        assert_eq!(h.counts, vec![0, 2]);
        let h = histogram(&[], 3);
        assert!(h.counts.is_empty());
    }
}
