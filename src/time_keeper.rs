//! Published time axis of the reader.

use std::fmt;

/// Values outside `(-SANE_TIME, SANE_TIME)` are treated as sentinels.
const SANE_TIME: f64 = 1e299;

/// Two times closer than this are the same.
const TIME_TOLERANCE: f64 = 1e-14;

#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// Unknown time policy.
    InvalidPolicy(i32),

    /// Step ids and time values don't have the same length.
    InputLenMismatch { expected: usize, actual: usize },

    /// Time flag index out of range.
    NoSuchTimeFlag { index: usize, len: usize },

    /// No time step to pick from.
    NoTimeSteps,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidPolicy(policy) => write!(f, "invalid time policy {policy}"),
            Error::InputLenMismatch { expected, actual } => write!(
                f,
                "time steps and time values don't have the same length (expected {expected}, got {actual})"
            ),
            Error::NoSuchTimeFlag { index, len } => {
                write!(f, "no time flag #{index} (only {len} flags)")
            }
            Error::NoTimeSteps => write!(f, "no time steps"),
        }
    }
}

impl std::error::Error for Error {}

/// Whether every value is distinct from the others.
fn all_distinct<T: PartialEq>(values: &[T]) -> bool {
    values
        .iter()
        .enumerate()
        .all(|(i, v)| !values[..i].contains(v))
}

/// A time axis based on step ids, for when declared times are unusable.
fn processed_using_pair_of_ids(ts: &[(i32, i32)]) -> Vec<f64> {
    let iterations: Vec<i32> = ts.iter().map(|(it, _)| *it).collect();
    if all_distinct(&iterations) {
        return iterations.into_iter().map(f64::from).collect();
    }
    let orders: Vec<i32> = ts.iter().map(|(_, order)| *order).collect();
    if all_distinct(&orders) {
        return orders.into_iter().map(f64::from).collect();
    }
    (0..ts.len()).map(|i| i as f64).collect()
}

/// Turns declared (iteration, order, time) steps into a selectable time axis
/// and keeps the time step flags of the modal mode.
#[derive(Clone, Debug, Default)]
pub struct TimeKeeper {
    policy: i32,
    postprocessed_time: Vec<f64>,
    times_flags: Vec<(bool, String)>,
}

impl TimeKeeper {
    pub fn new(policy: i32) -> TimeKeeper {
        TimeKeeper {
            policy,
            ..TimeKeeper::default()
        }
    }

    pub fn policy(&self) -> i32 {
        self.policy
    }

    pub fn set_policy(&mut self, policy: i32) {
        self.policy = policy;
    }

    /// Computes and memoizes the published time axis.
    ///
    /// Policy 0 publishes declared times when they are all sane and
    /// distinct, else falls back to iterations, then orders, then
    /// `0..N`. Policy 1 first accumulates times (`t'[i]` is the sum of the
    /// `i` first times) then applies policy 0.
    pub fn time_steps_regarding_policy(
        &mut self,
        ts: &[(i32, i32)],
        times: &[f64],
    ) -> Result<Vec<f64>, Error> {
        if ts.len() != times.len() {
            return Err(Error::InputLenMismatch {
                expected: ts.len(),
                actual: times.len(),
            });
        }
        match self.policy {
            0 => Ok(self.policy_0(ts, times)),
            1 => {
                let accumulated: Vec<f64> = times
                    .iter()
                    .scan(0.0, |sum, t| {
                        let current = *sum;
                        *sum += t;
                        Some(current)
                    })
                    .collect();
                Ok(self.policy_0(ts, &accumulated))
            }
            policy => Err(Error::InvalidPolicy(policy)),
        }
    }

    fn policy_0(&mut self, ts: &[(i32, i32)], times: &[f64]) -> Vec<f64> {
        let sane = times.iter().all(|t| t.abs() < SANE_TIME);
        self.postprocessed_time = if sane && all_distinct(times) {
            times.to_vec()
        } else {
            tracing::debug!(?times, "declared times unusable, using step ids");
            processed_using_pair_of_ids(ts)
        };
        self.postprocessed_time.clone()
    }

    pub fn postprocessed_time(&self) -> &[f64] {
        &self.postprocessed_time
    }

    /// Position of `time` on the published axis.
    pub fn time_step_id_from(&self, time: f64) -> Option<usize> {
        self.postprocessed_time.iter().position(|t| *t == time)
    }

    /// Resets the flags to `n` enabled steps.
    pub fn set_max_number_of_time_steps(&mut self, n: usize) {
        self.times_flags = (0..n).map(|i| (true, format!("000{i}"))).collect();
    }

    pub fn times_flags(&self) -> &[(bool, String)] {
        &self.times_flags
    }

    pub fn set_time_flag(&mut self, index: usize, status: bool) -> Result<(), Error> {
        let len = self.times_flags.len();
        let flag = self
            .times_flags
            .get_mut(index)
            .ok_or(Error::NoSuchTimeFlag { index, len })?;
        flag.0 = status;
        Ok(())
    }

    pub fn vect_of_bool(&self) -> Vec<bool> {
        self.times_flags.iter().map(|(b, _)| *b).collect()
    }
}

/// Picks the step shown for a requested time on a published axis.
///
/// Returns the step index and whether the match was exact. Steps within
/// `1e-14` match; otherwise the last step before the request is kept (or
/// the first step when the request precedes them all).
pub fn find_time_step(times: &[f64], requested: f64) -> Result<(usize, bool), Error> {
    if times.is_empty() {
        return Err(Error::NoTimeSteps);
    }
    if times.len() == 1 {
        return Ok((0, times[0] == requested));
    }
    if let Some(pos) = times
        .iter()
        .position(|t| (t - requested).abs() < TIME_TOLERANCE)
    {
        return Ok((pos, true));
    }
    let before = times
        .iter()
        .enumerate()
        .filter(|(_, t)| **t < requested)
        .max_by(|(_, a), (_, b)| a.total_cmp(b));
    let pos = match before {
        Some((pos, _)) => pos,
        None => times
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(pos, _)| pos)
            .unwrap_or(0),
    };
    let list: String = times.iter().map(|t| format!("{t},")).collect();
    tracing::warn!(
        "request for time {requested} but not in {list} ! Keep time {} at pos #{pos}",
        times[pos]
    );
    Ok((pos, false))
}

/// Which steps of a leaf are shown by one request.
#[derive(Clone, Debug, PartialEq)]
pub enum TimeRequest {
    /// One step, arrays keep their name.
    Standard { step: usize },
    /// Every flagged step, arrays are suffixed with the step index.
    Modal { steps: Vec<usize> },
}

impl TimeRequest {
    /// The modal request of the enabled flags among the `n` steps of a leaf.
    pub fn modal(flags: &[bool], n: usize) -> TimeRequest {
        TimeRequest::Modal {
            steps: flags
                .iter()
                .take(n)
                .enumerate()
                .filter(|(_, on)| **on)
                .map(|(i, _)| i)
                .collect(),
        }
    }

    pub fn steps(&self) -> &[usize] {
        match self {
            TimeRequest::Standard { step } => std::slice::from_ref(step),
            TimeRequest::Modal { steps } => steps,
        }
    }

    pub fn array_name(&self, name: &str, step: usize) -> String {
        match self {
            TimeRequest::Standard { .. } => name.to_string(),
            TimeRequest::Modal { .. } => format!("{name}[{step}]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ids(n: usize) -> Vec<(i32, i32)> {
        (0..n as i32).map(|i| (i, -1)).collect()
    }

    #[test]
    fn test_sane_distinct_times_are_kept() {
        let mut tk = TimeKeeper::new(0);
        let axis = tk
            .time_steps_regarding_policy(&ids(3), &[0.0, 0.5, 1.0])
            .unwrap();
        assert_eq!(axis, vec![0.0, 0.5, 1.0]);
        assert_eq!(tk.time_step_id_from(0.5), Some(1));
        assert_eq!(tk.time_step_id_from(0.7), None);
    }

    #[test]
    fn test_out_of_range_time() {
        let mut tk = TimeKeeper::new(0);
        let axis = tk
            .time_steps_regarding_policy(&ids(3), &[1e300, 0.0, 1.0])
            .unwrap();
        assert_ne!(axis, vec![1e300, 0.0, 1.0]);
        assert_eq!(axis, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_duplicate_times_use_iterations() {
        let mut tk = TimeKeeper::new(0);
        let axis = tk
            .time_steps_regarding_policy(&[(0, 0), (1, 0), (2, 0)], &[0.0, 1.0, 1.0])
            .unwrap();
        assert_eq!(axis, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_fallback_tiers() {
        let mut tk = TimeKeeper::new(0);
        let axis = tk
            .time_steps_regarding_policy(&[(5, 3), (5, 7), (5, 9)], &[0.0; 3])
            .unwrap();
        assert_eq!(axis, vec![3.0, 7.0, 9.0]);
        let axis = tk
            .time_steps_regarding_policy(&[(5, 3), (5, 3), (6, 9)], &[0.0; 3])
            .unwrap();
        assert_eq!(axis, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_policy_1_accumulates() {
        let mut tk = TimeKeeper::new(1);
        let axis = tk
            .time_steps_regarding_policy(&ids(3), &[0.5, 0.25, 1.0])
            .unwrap();
        assert_eq!(axis, vec![0.0, 0.5, 0.75]);
        tk.set_policy(3);
        assert_eq!(
            tk.time_steps_regarding_policy(&ids(3), &[0.5, 0.25, 1.0]),
            Err(Error::InvalidPolicy(3))
        );
    }

    #[test]
    fn test_find_time_step() {
        let times = [0.0, 0.5, 1.0];
        assert_eq!(find_time_step(&times, 0.5).unwrap(), (1, true));
        assert_eq!(find_time_step(&times, 0.5 + 1e-15).unwrap(), (1, true));
        assert_eq!(find_time_step(&times, 0.7).unwrap(), (1, false));
        assert_eq!(find_time_step(&times, -3.0).unwrap(), (0, false));
        assert_eq!(find_time_step(&times, 8.0).unwrap(), (2, false));
        assert_eq!(find_time_step(&[4.0], 8.0).unwrap(), (0, false));
        assert_eq!(find_time_step(&[], 8.0), Err(Error::NoTimeSteps));
    }

    #[test]
    fn test_times_flags() {
        let mut tk = TimeKeeper::default();
        tk.set_max_number_of_time_steps(3);
        assert_eq!(tk.times_flags()[2], (true, "0002".to_string()));
        tk.set_time_flag(1, false).unwrap();
        assert_eq!(tk.vect_of_bool(), vec![true, false, true]);
        assert!(tk.set_time_flag(3, false).is_err());
        let request = TimeRequest::modal(&tk.vect_of_bool(), 2);
        assert_eq!(request.steps(), &[0]);
        assert_eq!(request.array_name("f", 0), "f[0]");
    }

    proptest!(
        #[test]
        fn time_axis_is_deterministic_and_invertible(
            times in prop::collection::vec(-1e3..1e3f64, 1..20),
        ) {
            let ts = ids(times.len());
            let mut tk = TimeKeeper::new(0);
            let first = tk.time_steps_regarding_policy(&ts, &times).unwrap();
            let second = tk.time_steps_regarding_policy(&ts, &times).unwrap();
            prop_assert_eq!(&first, &second);
            for (i, t) in first.iter().enumerate() {
                prop_assert_eq!(tk.time_step_id_from(*t), Some(i));
            }
        }
    );
}
