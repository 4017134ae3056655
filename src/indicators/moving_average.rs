use super::IndicatorError;

/// Calculate an Exponential Moving Average series aligned to the input.
///
/// The output has the same length as `values`. Indices `0..period-1` are
/// `None` (insufficient warm-up); index `period-1` carries the seed (simple
/// average of the first `period` values); later indices follow
/// `ema[i] = value[i] * k + ema[i-1] * (1 - k)` with `k = 2 / (period + 1)`.
///
/// Inputs shorter than `period` produce an all-`None` series.
pub fn ema_series(values: &[f64], period: usize) -> Result<Vec<Option<f64>>, IndicatorError> {
    if period == 0 {
        return Err(IndicatorError::InvalidPeriod);
    }

    let mut out = vec![None; values.len()];
    if values.len() < period {
        return Ok(out);
    }

    let seed: f64 = values.iter().take(period).sum::<f64>() / period as f64;
    out[period - 1] = Some(seed);

    let multiplier = 2.0 / (period as f64 + 1.0);
    let mut ema = seed;
    for (i, value) in values.iter().enumerate().skip(period) {
        ema = value * multiplier + ema * (1.0 - multiplier);
        out[i] = Some(ema);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ema_warmup_alignment() {
        let prices = vec![100.0, 102.0, 104.0, 106.0, 108.0, 110.0];
        let ema = ema_series(&prices, 5).unwrap();

        assert_eq!(ema.len(), prices.len());
        for value in &ema[..4] {
            assert!(value.is_none());
        }
        for value in &ema[4..] {
            assert!(value.is_some());
        }
    }

    #[test]
    fn test_ema_seed_is_simple_average() {
        let prices = vec![100.0, 102.0, 104.0, 106.0, 108.0];
        let ema = ema_series(&prices, 5).unwrap();

        // Length == period: exactly one defined value, the seed at the end
        assert_eq!(ema[4], Some(104.0));
        assert_eq!(ema.iter().filter(|v| v.is_some()).count(), 1);
    }

    #[test]
    fn test_ema_recurrence() {
        let prices = vec![100.0, 102.0, 104.0, 106.0, 108.0, 110.0];
        let ema = ema_series(&prices, 5).unwrap();

        // Seed 104, k = 1/3: next = 110/3 + 104*2/3 = 106
        let last = ema[5].unwrap();
        assert!((last - 106.0).abs() < 1e-9);
    }

    #[test]
    fn test_ema_flat_series_stays_flat() {
        let prices = vec![100.0; 60];
        let ema = ema_series(&prices, 50).unwrap();
        for value in ema.iter().flatten() {
            assert!((value - 100.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_ema_period_one_tracks_input() {
        let prices = vec![100.0, 105.0, 95.0];
        let ema = ema_series(&prices, 1).unwrap();
        assert_eq!(ema, vec![Some(100.0), Some(105.0), Some(95.0)]);
    }

    #[test]
    fn test_ema_zero_period_rejected() {
        let prices = vec![100.0, 102.0];
        assert_eq!(ema_series(&prices, 0), Err(IndicatorError::InvalidPeriod));
    }

    #[test]
    fn test_ema_insufficient_data() {
        let prices = vec![100.0, 102.0];
        let ema = ema_series(&prices, 5).unwrap();
        assert!(ema.iter().all(|v| v.is_none()));
    }
}
