use analysis_core::Bar;
use chrono::NaiveDate;
use nalgebra::DMatrix;
use std::collections::BTreeMap;

/// Close prices of several symbols restricted to the dates every symbol traded.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedCloses {
    pub dates: Vec<NaiveDate>,
    /// One column per input series, in input order; every column has `dates.len()` entries.
    pub columns: Vec<Vec<f64>>,
}

/// Inner-join bar series on trading date.
pub fn align_closes(series: &[&[Bar]]) -> AlignedCloses {
    let n = series.len();
    let mut by_date: BTreeMap<NaiveDate, Vec<Option<f64>>> = BTreeMap::new();

    for (col, bars) in series.iter().enumerate() {
        for bar in bars.iter() {
            let row = by_date.entry(bar.trading_date()).or_insert_with(|| vec![None; n]);
            row[col] = Some(bar.close);
        }
    }

    let mut dates = Vec::new();
    let mut columns = vec![Vec::new(); n];
    for (date, row) in by_date {
        if n == 0 || row.iter().any(|v| v.is_none()) {
            continue;
        }
        dates.push(date);
        for (col, value) in row.into_iter().enumerate() {
            columns[col].push(value.unwrap_or_default());
        }
    }

    AlignedCloses { dates, columns }
}

fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n < 2 {
        return 0.0;
    }

    let a = &a[..n];
    let b = &b[..n];
    let mean_a: f64 = a.iter().sum::<f64>() / n as f64;
    let mean_b: f64 = b.iter().sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for i in 0..n {
        let da = a[i] - mean_a;
        let db = b[i] - mean_b;
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }

    let denom = (var_a * var_b).sqrt();
    if denom == 0.0 {
        0.0
    } else {
        (cov / denom).clamp(-1.0, 1.0)
    }
}

/// Pearson correlation matrix of return columns.
/// The diagonal is 1; a pair involving a constant series correlates at 0.
pub fn correlation_matrix(returns: &[Vec<f64>]) -> DMatrix<f64> {
    let n = returns.len();
    DMatrix::from_fn(n, n, |i, j| {
        if i == j {
            1.0
        } else {
            pearson(&returns[i], &returns[j])
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn bar(day: u32, close: f64) -> Bar {
        Bar {
            timestamp: Utc.with_ymd_and_hms(2024, 3, day, 21, 0, 0).unwrap(),
            open: close,
            high: close,
            low: close,
            close,
            volume: 0.0,
        }
    }

    #[test]
    fn test_align_keeps_only_common_dates() {
        let a = vec![bar(1, 10.0), bar(2, 11.0), bar(4, 12.0)];
        let b = vec![bar(2, 20.0), bar(3, 21.0), bar(4, 22.0)];
        let aligned = align_closes(&[&a, &b]);
        assert_eq!(aligned.dates.len(), 2);
        assert_eq!(aligned.columns[0], vec![11.0, 12.0]);
        assert_eq!(aligned.columns[1], vec![20.0, 22.0]);
    }

    #[test]
    fn test_correlation_of_perfectly_related_series() {
        let x = vec![0.01, -0.02, 0.03, 0.005];
        let doubled: Vec<f64> = x.iter().map(|v| v * 2.0).collect();
        let negated: Vec<f64> = x.iter().map(|v| -v).collect();
        let m = correlation_matrix(&[x, doubled, negated]);
        assert!((m[(0, 1)] - 1.0).abs() < 1e-12);
        assert!((m[(0, 2)] + 1.0).abs() < 1e-12);
        assert_eq!(m[(2, 2)], 1.0);
        assert_eq!(m[(1, 0)], m[(0, 1)]);
    }

    #[test]
    fn test_constant_series_correlates_at_zero() {
        let m = correlation_matrix(&[vec![0.0, 0.0, 0.0], vec![0.01, 0.02, -0.01]]);
        assert_eq!(m[(0, 1)], 0.0);
        assert_eq!(m[(0, 0)], 1.0);
    }
}
