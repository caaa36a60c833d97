//! Reduction of a run of values to one value.
//!
//! Every function fails on empty input. The `only_numeric` forms skip NaN and
//! infinite values, the `exclude_dev` forms additionally drop values further
//! than the given number of standard deviations from the mean.

use crate::error::{CiftiError, Result};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Method of reducing a run of values.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum ReductionMethod {
    /// The largest value
    Max,
    /// The smallest value
    Min,
    /// 1-based index of the largest value
    IndexMax,
    /// 1-based index of the smallest value
    IndexMin,
    /// Sum of the values
    Sum,
    /// Product of the values
    Product,
    /// Mean of the values
    Mean,
    /// Population standard deviation
    Stdev,
    /// Sample standard deviation
    SampStdev,
    /// Population variance
    Variance,
    /// Median, averaging the middle two of an even count
    Median,
    /// Most common value, the smallest on ties
    Mode,
    /// Number of values that are not zero
    CountNonzero,
}

impl Default for ReductionMethod {
    fn default() -> Self {
        ReductionMethod::Mean
    }
}

impl ReductionMethod {
    /// All methods.
    pub const ALL: [ReductionMethod; 13] = [
        ReductionMethod::Max,
        ReductionMethod::Min,
        ReductionMethod::IndexMax,
        ReductionMethod::IndexMin,
        ReductionMethod::Sum,
        ReductionMethod::Product,
        ReductionMethod::Mean,
        ReductionMethod::Stdev,
        ReductionMethod::SampStdev,
        ReductionMethod::Variance,
        ReductionMethod::Median,
        ReductionMethod::Mode,
        ReductionMethod::CountNonzero,
    ];

    /// Uppercase name of the method.
    pub fn name(self) -> &'static str {
        match self {
            ReductionMethod::Max => "MAX",
            ReductionMethod::Min => "MIN",
            ReductionMethod::IndexMax => "INDEXMAX",
            ReductionMethod::IndexMin => "INDEXMIN",
            ReductionMethod::Sum => "SUM",
            ReductionMethod::Product => "PRODUCT",
            ReductionMethod::Mean => "MEAN",
            ReductionMethod::Stdev => "STDEV",
            ReductionMethod::SampStdev => "SAMPSTDEV",
            ReductionMethod::Variance => "VARIANCE",
            ReductionMethod::Median => "MEDIAN",
            ReductionMethod::Mode => "MODE",
            ReductionMethod::CountNonzero => "COUNT_NONZERO",
        }
    }

    /// Whether the weighted reductions support this method.
    pub fn supports_weights(self) -> bool {
        match self {
            ReductionMethod::IndexMax
            | ReductionMethod::IndexMin
            | ReductionMethod::Min
            | ReductionMethod::Max
            | ReductionMethod::Product
            | ReductionMethod::CountNonzero => false,
            _ => true,
        }
    }
}

impl fmt::Display for ReductionMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ReductionMethod {
    type Err = CiftiError;

    fn from_str(s: &str) -> Result<ReductionMethod> {
        ReductionMethod::ALL
            .iter()
            .copied()
            .find(|m| m.name() == s)
            .ok_or_else(|| CiftiError::Reduction(format!("unrecognized reduction method: {}", s)))
    }
}

fn fail<T, S: Into<String>>(msg: S) -> Result<T> {
    Err(CiftiError::Reduction(msg.into()))
}

fn check_nonempty(data: &[f32]) -> Result<()> {
    if data.is_empty() {
        return fail("reduction requested on empty data");
    }
    Ok(())
}

fn check_weighted(data: &[f32], weights: &[f32], method: ReductionMethod) -> Result<()> {
    check_nonempty(data)?;
    if weights.len() != data.len() {
        return fail("weights must have the same length as the data");
    }
    if !method.supports_weights() {
        return fail(format!("weighted reduction not supported for '{}' method", method));
    }
    Ok(())
}

fn total_cmp(a: &f32, b: &f32) -> Ordering {
    a.partial_cmp(b).unwrap_or(Ordering::Equal)
}

/// Reduce all values.
pub fn reduce(data: &[f32], method: ReductionMethod) -> Result<f32> {
    use self::ReductionMethod::*;
    check_nonempty(data)?;
    let n = data.len();
    Ok(match method {
        SampStdev | Mean | Stdev | Variance | Sum => {
            if method == SampStdev && n < 2 {
                return fail("'SAMPSTDEV' reduction on 1 element would require dividing by zero");
            }
            let sum: f64 = data.iter().map(|&x| f64::from(x)).sum();
            if method == Sum {
                return Ok(sum as f32);
            }
            let mean = (sum / n as f64) as f32;
            if method == Mean {
                return Ok(mean);
            }
            let residsqr: f64 = data
                .iter()
                .map(|&x| {
                    let d = x - mean;
                    f64::from(d * d)
                })
                .sum();
            match method {
                Stdev => (residsqr / n as f64).sqrt() as f32,
                SampStdev => (residsqr / (n - 1) as f64).sqrt() as f32,
                _ => (residsqr / n as f64) as f32,
            }
        }
        Product => data.iter().map(|&x| f64::from(x)).product::<f64>() as f32,
        Max => data[1..].iter().fold(data[0], |m, &x| if x > m { x } else { m }),
        Min => data[1..].iter().fold(data[0], |m, &x| if x < m { x } else { m }),
        IndexMax => {
            let mut best = 0;
            for (i, &x) in data.iter().enumerate().skip(1) {
                if x > data[best] {
                    best = i;
                }
            }
            (best + 1) as f32
        }
        IndexMin => {
            let mut best = 0;
            for (i, &x) in data.iter().enumerate().skip(1) {
                if x < data[best] {
                    best = i;
                }
            }
            (best + 1) as f32
        }
        Median => {
            let mut sorted = data.to_vec();
            sorted.sort_by(total_cmp);
            if n % 2 == 0 {
                (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
            } else {
                sorted[n / 2]
            }
        }
        Mode => {
            let mut sorted = data.to_vec();
            sorted.sort_by(total_cmp);
            longest_run(&sorted)
        }
        CountNonzero => data.iter().filter(|&&x| x != 0.0).count() as f32,
    })
}

/// Value of the longest run of equal values in sorted data, the first on ties.
fn longest_run(sorted: &[f32]) -> f32 {
    let mut best_count = 0;
    let mut best = sorted[0];
    let mut cur = sorted[0];
    let mut cur_count = 0;
    for &x in sorted {
        if x == cur {
            cur_count += 1;
        } else {
            if cur_count > best_count {
                best = cur;
                best_count = cur_count;
            }
            cur = x;
            cur_count = 1;
        }
    }
    if cur_count > best_count {
        best = cur;
    }
    best
}

/// 1-based index of the extreme value among those accepted by `keep`.
fn extreme_index<F>(data: &[f32], max: bool, keep: F) -> Option<usize>
where
    F: Fn(f32) -> bool,
{
    let mut best: Option<usize> = None;
    for (i, &x) in data.iter().enumerate() {
        if !keep(x) {
            continue;
        }
        let better = match best {
            None => true,
            Some(b) if max => x > data[b],
            Some(b) => x < data[b],
        };
        if better {
            best = Some(i);
        }
    }
    best.map(|b| b + 1)
}

/// Reduce only the finite values.
pub fn reduce_only_numeric(data: &[f32], method: ReductionMethod) -> Result<f32> {
    check_nonempty(data)?;
    match method {
        ReductionMethod::IndexMax | ReductionMethod::IndexMin => {
            let max = method == ReductionMethod::IndexMax;
            return match extreme_index(data, max, f32::is_finite) {
                Some(i) => Ok(i as f32),
                None => fail("all input values to reduce_only_numeric were non-numeric"),
            };
        }
        _ => {}
    }
    let numeric: Vec<f32> = data.iter().copied().filter(|x| x.is_finite()).collect();
    if numeric.is_empty() {
        return fail("all input values to reduce_only_numeric were non-numeric");
    }
    if method == ReductionMethod::SampStdev && numeric.len() < 2 {
        return fail("SAMPSTDEV requested in reduce_only_numeric when only 1 element is numeric");
    }
    reduce(&numeric, method)
}

/// Reduce the finite values within `below` standard deviations under the mean
/// and `above` standard deviations over it.
pub fn reduce_exclude_dev(data: &[f32], method: ReductionMethod, below: f32, above: f32) -> Result<f32> {
    check_nonempty(data)?;
    let numeric: Vec<f32> = data.iter().copied().filter(|x| x.is_finite()).collect();
    if numeric.is_empty() {
        return fail("all input values to reduce_exclude_dev were non-numeric");
    }
    let mean = reduce(&numeric, ReductionMethod::Mean)?;
    let stdev = reduce(&numeric, ReductionMethod::Stdev)?;
    let low = mean - below * stdev;
    let high = mean + above * stdev;
    let keep = |x: f32| x.is_finite() && x >= low && x <= high;
    match method {
        ReductionMethod::IndexMax | ReductionMethod::IndexMin => {
            let max = method == ReductionMethod::IndexMax;
            // 0 when nothing survives the exclusion
            return Ok(extreme_index(data, max, &keep).unwrap_or(0) as f32);
        }
        _ => {}
    }
    let kept: Vec<f32> = data.iter().copied().filter(|&x| keep(x)).collect();
    if kept.is_empty() {
        return fail("exclusion parameters to reduce_exclude_dev resulted in no usable data");
    }
    if method == ReductionMethod::SampStdev && kept.len() < 2 {
        return fail("SAMPSTDEV requested in reduce_exclude_dev when only 1 element passed the exclusion parameters");
    }
    reduce(&kept, method)
}

/// Reduce all values, each counted with its weight.
pub fn reduce_weighted(data: &[f32], weights: &[f32], method: ReductionMethod) -> Result<f32> {
    use self::ReductionMethod::*;
    check_weighted(data, weights, method)?;
    let n = data.len();
    Ok(match method {
        SampStdev | Mean | Stdev | Variance | Sum => {
            if method == SampStdev && n < 2 {
                return fail("'SAMPSTDEV' weighted reduction on 1 element would require dividing by zero");
            }
            let mut accum = 0.0f64;
            let mut weight_sum = 0.0f64;
            for (&x, &w) in data.iter().zip(weights) {
                accum += f64::from(x * w);
                weight_sum += f64::from(w);
            }
            if method == Sum {
                return Ok(accum as f32);
            }
            let mean = (accum / weight_sum) as f32;
            if method == Mean {
                return Ok(mean);
            }
            let mut accum = 0.0f64;
            let mut weight_sum2 = 0.0f64;
            for (&x, &w) in data.iter().zip(weights) {
                let d = x - mean;
                accum += f64::from(w * d * d);
                weight_sum2 += f64::from(w * w);
            }
            match method {
                Stdev => (accum / weight_sum).sqrt() as f32,
                Variance => (accum / weight_sum) as f32,
                _ => (accum / (weight_sum - weight_sum2 / weight_sum)).sqrt() as f32,
            }
        }
        Median => {
            let sorted = sorted_pairs(data, weights);
            let mut cumulative = Vec::with_capacity(n);
            let mut running = 0.0f64;
            for &(_, w) in &sorted {
                running += f64::from(w);
                cumulative.push(running);
            }
            let target = running / 2.0;
            let mut index = cumulative.partition_point(|&c| c < target);
            if index == n {
                index -= 1;
            }
            if index + 1 < n && cumulative[index] == target {
                (sorted[index].0 + sorted[index + 1].0) / 2.0
            } else {
                sorted[index].0
            }
        }
        Mode => {
            let sorted = sorted_pairs(data, weights);
            let mut best = sorted[0].0;
            let mut best_weight = f32::NEG_INFINITY;
            let mut cur = sorted[0].0;
            let mut cur_weight = 0.0f32;
            for &(x, w) in &sorted {
                if x == cur {
                    cur_weight += w;
                } else {
                    if cur_weight > best_weight {
                        best = cur;
                        best_weight = cur_weight;
                    }
                    cur = x;
                    cur_weight = w;
                }
            }
            if cur_weight > best_weight {
                best = cur;
            }
            best
        }
        Max | Min | IndexMax | IndexMin | Product | CountNonzero => {
            return fail(format!("weighted reduction not supported for '{}' method", method))
        }
    })
}

/// Values paired with their weights, stably sorted by value.
fn sorted_pairs(data: &[f32], weights: &[f32]) -> Vec<(f32, f32)> {
    let mut pairs: Vec<(f32, f32)> = data.iter().copied().zip(weights.iter().copied()).collect();
    pairs.sort_by(|a, b| total_cmp(&a.0, &b.0));
    pairs
}

/// Weighted reduction of only the finite values.
pub fn reduce_weighted_only_numeric(data: &[f32], weights: &[f32], method: ReductionMethod) -> Result<f32> {
    check_weighted(data, weights, method)?;
    let (kept, kept_weights): (Vec<f32>, Vec<f32>) = data
        .iter()
        .zip(weights)
        .filter(|(x, _)| x.is_finite())
        .map(|(&x, &w)| (x, w))
        .unzip();
    if kept.is_empty() {
        return fail("all input values to reduce_weighted_only_numeric were non-numeric");
    }
    if method == ReductionMethod::SampStdev && kept.len() < 2 {
        return fail("SAMPSTDEV requested in reduce_weighted_only_numeric when only 1 element is numeric");
    }
    reduce_weighted(&kept, &kept_weights, method)
}

/// Weighted reduction of the finite values within the given number of
/// weighted standard deviations of the weighted mean.
pub fn reduce_weighted_exclude_dev(
    data: &[f32],
    weights: &[f32],
    method: ReductionMethod,
    below: f32,
    above: f32,
) -> Result<f32> {
    check_weighted(data, weights, method)?;
    let (numeric, numeric_weights): (Vec<f32>, Vec<f32>) = data
        .iter()
        .zip(weights)
        .filter(|(x, _)| x.is_finite())
        .map(|(&x, &w)| (x, w))
        .unzip();
    if numeric.is_empty() {
        return fail("all input values to reduce_weighted_exclude_dev were non-numeric");
    }
    let mean = reduce_weighted(&numeric, &numeric_weights, ReductionMethod::Mean)?;
    let stdev = reduce_weighted(&numeric, &numeric_weights, ReductionMethod::Stdev)?;
    let low = mean - below * stdev;
    let high = mean + above * stdev;
    let (kept, kept_weights): (Vec<f32>, Vec<f32>) = numeric
        .iter()
        .zip(&numeric_weights)
        .filter(|(x, _)| **x >= low && **x <= high)
        .map(|(&x, &w)| (x, w))
        .unzip();
    if kept.is_empty() {
        return fail("exclusion parameters to reduce_weighted_exclude_dev resulted in no usable data");
    }
    if method == ReductionMethod::SampStdev && kept.len() < 2 {
        return fail("SAMPSTDEV requested in reduce_weighted_exclude_dev when only 1 element passed the exclusion parameters");
    }
    reduce_weighted(&kept, &kept_weights, method)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;

    const DATA: [f32; 5] = [2.0, 4.0, 4.0, 1.0, 9.0];

    #[test]
    fn plain_reductions() {
        use super::ReductionMethod::*;
        assert_eq!(reduce(&DATA, Max).unwrap(), 9.0);
        assert_eq!(reduce(&DATA, Min).unwrap(), 1.0);
        assert_eq!(reduce(&DATA, IndexMax).unwrap(), 5.0);
        assert_eq!(reduce(&DATA, IndexMin).unwrap(), 4.0);
        assert_eq!(reduce(&DATA, Sum).unwrap(), 20.0);
        assert_eq!(reduce(&DATA, Product).unwrap(), 288.0);
        assert_eq!(reduce(&DATA, Mean).unwrap(), 4.0);
        assert_relative_eq!(reduce(&DATA, Variance).unwrap(), 7.6, epsilon = 1e-5);
        assert_relative_eq!(reduce(&DATA, Stdev).unwrap(), 7.6f32.sqrt(), epsilon = 1e-5);
        assert_relative_eq!(reduce(&DATA, SampStdev).unwrap(), 9.5f32.sqrt(), epsilon = 1e-5);
        assert_eq!(reduce(&DATA, Median).unwrap(), 4.0);
        assert_eq!(reduce(&[1.0, 2.0, 3.0, 4.0], Median).unwrap(), 2.5);
        assert_eq!(reduce(&DATA, Mode).unwrap(), 4.0);
        assert_eq!(reduce(&[3.0, 1.0, 3.0, 1.0], Mode).unwrap(), 1.0);
        assert_eq!(reduce(&[0.0, 1.0, -2.0], CountNonzero).unwrap(), 2.0);
    }

    #[test]
    fn degenerate_inputs() {
        assert!(reduce(&[], ReductionMethod::Mean).is_err());
        assert!(reduce(&[1.0], ReductionMethod::SampStdev).is_err());
        assert_eq!(reduce(&[1.0], ReductionMethod::Stdev).unwrap(), 0.0);
    }

    #[test]
    fn only_numeric() {
        let data = [f32::NAN, 3.0, f32::INFINITY, 5.0];
        assert_eq!(reduce_only_numeric(&data, ReductionMethod::Mean).unwrap(), 4.0);
        assert_eq!(reduce_only_numeric(&data, ReductionMethod::IndexMax).unwrap(), 4.0);
        assert_eq!(reduce_only_numeric(&data, ReductionMethod::IndexMin).unwrap(), 2.0);
        assert!(reduce_only_numeric(&[f32::NAN], ReductionMethod::Mean).is_err());
        assert!(reduce_only_numeric(&[f32::NAN, 1.0], ReductionMethod::SampStdev).is_err());
    }

    #[test]
    fn exclude_dev() {
        let data = [1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 100.0];
        assert_eq!(reduce_exclude_dev(&data, ReductionMethod::Mean, 2.0, 2.0).unwrap(), 1.0);
        assert_eq!(reduce_exclude_dev(&data, ReductionMethod::IndexMax, 2.0, 2.0).unwrap(), 1.0);
        assert_eq!(reduce_exclude_dev(&data, ReductionMethod::Max, 4.0, 4.0).unwrap(), 100.0);
    }

    #[test]
    fn weighted() {
        let data = [1.0, 2.0, 3.0];
        let weights = [1.0, 1.0, 2.0];
        assert_eq!(reduce_weighted(&data, &weights, ReductionMethod::Sum).unwrap(), 9.0);
        assert_eq!(reduce_weighted(&data, &weights, ReductionMethod::Mean).unwrap(), 2.25);
        assert_relative_eq!(
            reduce_weighted(&data, &weights, ReductionMethod::Variance).unwrap(),
            0.6875,
            epsilon = 1e-6
        );
        assert_eq!(reduce_weighted(&data, &weights, ReductionMethod::Median).unwrap(), 2.5);
        assert_eq!(reduce_weighted(&data, &weights, ReductionMethod::Mode).unwrap(), 3.0);
        assert!(reduce_weighted(&data, &weights, ReductionMethod::Max).is_err());
        assert!(reduce_weighted(&data, &weights[..2], ReductionMethod::Mean).is_err());
        // equal weights reduce to the unweighted result
        let ones = [1.0; 5];
        assert_eq!(
            reduce_weighted(&DATA, &ones, ReductionMethod::Median).unwrap(),
            reduce(&DATA, ReductionMethod::Median).unwrap()
        );
    }

    #[test]
    fn weighted_filters() {
        let data = [f32::NAN, 2.0, 4.0];
        let weights = [5.0, 1.0, 3.0];
        assert_eq!(
            reduce_weighted_only_numeric(&data, &weights, ReductionMethod::Mean).unwrap(),
            3.5
        );
        assert_eq!(
            reduce_weighted_exclude_dev(&data, &weights, ReductionMethod::Sum, 10.0, 10.0).unwrap(),
            14.0
        );
        assert!(reduce_weighted_only_numeric(&[f32::NAN], &[1.0], ReductionMethod::Mean).is_err());
    }

    #[test]
    fn method_names() {
        for method in ReductionMethod::ALL.iter() {
            assert_eq!(method.name().parse::<ReductionMethod>().unwrap(), *method);
        }
        assert!("AVERAGE".parse::<ReductionMethod>().is_err());
        assert_eq!(ReductionMethod::default(), ReductionMethod::Mean);
    }
}
