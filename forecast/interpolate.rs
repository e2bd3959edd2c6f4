use crate::error::ForecastError;

/// Checks that the sample points can define a piecewise-linear curve.
fn validate_samples(xs: &[f64], ys: &[f64]) -> Result<(), ForecastError> {
    if xs.len() != ys.len() {
        return Err(ForecastError::MisalignedSeries {
            name: "sample values".to_string(),
            found: ys.len(),
            expected: xs.len(),
        });
    }
    if xs.len() < 2 {
        return Err(ForecastError::TooFewSamples {
            found: xs.len(),
            required: 2,
        });
    }
    if xs.iter().chain(ys).any(|v| !v.is_finite()) {
        return Err(ForecastError::NonFinite("sample points".to_string()));
    }
    if let Some(pair) = xs.windows(2).find(|pair| pair[1] <= pair[0]) {
        return Err(ForecastError::UnsortedAbscissa {
            previous: pair[0],
            next: pair[1],
        });
    }
    Ok(())
}

/// Piecewise-linear interpolation, held at the end values outside the sampled range.
pub fn interpolate(x: f64, xs: &[f64], ys: &[f64]) -> Result<f64, ForecastError> {
    validate_samples(xs, ys)?;
    Ok(interpolate_unchecked(x, xs, ys))
}

/// Straight line through the last two samples, evaluated at `x`.
pub fn extrapolate(x: f64, xs: &[f64], ys: &[f64]) -> Result<f64, ForecastError> {
    validate_samples(xs, ys)?;
    Ok(extrapolate_unchecked(x, xs, ys))
}

/// Fills in a per-year series: interpolated inside the sampled range and
/// extrapolated beyond its last sample.
pub fn linear_series(years: &[i32], xs: &[f64], ys: &[f64]) -> Result<Vec<f64>, ForecastError> {
    validate_samples(xs, ys)?;
    let last = xs[xs.len() - 1];
    Ok(years
        .iter()
        .map(|&year| {
            let x = f64::from(year);
            if x > last {
                extrapolate_unchecked(x, xs, ys)
            } else {
                interpolate_unchecked(x, xs, ys)
            }
        })
        .collect())
}

fn interpolate_unchecked(x: f64, xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len();
    if x <= xs[0] {
        return ys[0];
    }
    if x >= xs[n - 1] {
        return ys[n - 1];
    }
    // First sample strictly to the right of x; the guards above keep it in 1..n.
    let right = xs.partition_point(|&sample| sample <= x);
    let left = right - 1;
    let fraction = (x - xs[left]) / (xs[right] - xs[left]);
    ys[left] + fraction * (ys[right] - ys[left])
}

fn extrapolate_unchecked(x: f64, xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len();
    let slope = (ys[n - 1] - ys[n - 2]) / (xs[n - 1] - xs[n - 2]);
    ys[n - 1] + slope * (x - xs[n - 1])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const XS: [f64; 2] = [2050.0, 2151.0];
    const YS: [f64; 2] = [30.0, 59.0];

    #[test]
    fn interpolation_clamps_outside_the_range() {
        assert_abs_diff_eq!(interpolate(2030.0, &XS, &YS).unwrap(), 30.0);
        assert_abs_diff_eq!(
            interpolate(2055.0, &XS, &YS).unwrap(),
            30.0 + 5.0 * 29.0 / 101.0,
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(interpolate(2200.0, &XS, &YS).unwrap(), 59.0);
    }

    #[test]
    fn interpolation_hits_interior_knots() {
        let xs = [0.0, 1.0, 3.0];
        let ys = [0.0, 10.0, 30.0];
        assert_abs_diff_eq!(interpolate(1.0, &xs, &ys).unwrap(), 10.0);
        assert_abs_diff_eq!(interpolate(2.0, &xs, &ys).unwrap(), 20.0, epsilon = 1e-12);
        assert_abs_diff_eq!(interpolate(0.5, &xs, &ys).unwrap(), 5.0, epsilon = 1e-12);
    }

    #[test]
    fn extrapolation_follows_the_last_segment() {
        assert_abs_diff_eq!(
            extrapolate(2130.0, &XS, &YS).unwrap(),
            59.0 - 21.0 * 29.0 / 101.0,
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(
            extrapolate(2251.0, &XS, &YS).unwrap(),
            59.0 + 100.0 * 29.0 / 101.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn series_switches_to_extrapolation_past_the_last_sample() {
        let xs = [2030.0, 2080.0];
        let ys = [0.1, 0.3];
        let series = linear_series(&[2030, 2055, 2080, 2105, 2130], &xs, &ys).unwrap();
        let expected = [0.1, 0.2, 0.3, 0.4, 0.5];
        for (got, want) in series.iter().zip(expected) {
            assert_abs_diff_eq!(*got, want, epsilon = 1e-12);
        }
    }

    #[test]
    fn malformed_samples_are_rejected() {
        assert!(matches!(
            interpolate(1.0, &[0.0], &[1.0]),
            Err(ForecastError::TooFewSamples { found: 1, .. })
        ));
        assert!(matches!(
            interpolate(1.0, &[0.0, 1.0], &[1.0]),
            Err(ForecastError::MisalignedSeries { .. })
        ));
        assert!(matches!(
            extrapolate(1.0, &[1.0, 1.0], &[1.0, 2.0]),
            Err(ForecastError::UnsortedAbscissa { .. })
        ));
        assert!(matches!(
            linear_series(&[2030], &[0.0, f64::NAN], &[1.0, 2.0]),
            Err(ForecastError::NonFinite(..))
        ));
    }
}
