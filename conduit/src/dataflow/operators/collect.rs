//! Terminal stages draining a stream into a vector.

use crate::dataflow::{StreamCore, TryStream};
use crate::ComputationError;

/// Reads `stream` to its end, returning the values in arrival order.
///
/// Blocks until the stream closes. A stream that has already been drained yields an empty vector
/// immediately.
///
/// # Examples
/// ```
/// use conduit::{collect, generate, CancellationToken};
///
/// let token = CancellationToken::new();
/// let mut stream = generate(&token, 0, 3);
/// assert_eq!(collect(&mut stream), vec![0, 1, 2]);
/// assert_eq!(collect(&mut stream), Vec::<i64>::new());
/// ```
pub fn collect<D>(stream: &mut StreamCore<D>) -> Vec<D> {
    let mut result = Vec::new();
    while let Some(value) = stream.recv() {
        result.push(value);
    }
    result
}

/// Reads `stream` to its end, or to its first failure.
///
/// On failure the stream is closed, so that the stages feeding it stop at their next handoff,
/// and the failure is returned. A failure recorded upstream is returned even if cancellation
/// kept it from arriving, so an `Ok` result means no stage feeding `stream` has failed.
pub fn try_collect(stream: &mut TryStream) -> Result<Vec<i64>, ComputationError> {
    let mut result = Vec::new();
    while let Some(item) = stream.recv() {
        match item {
            Ok(value) => result.push(value),
            Err(error) => {
                stream.close();
                return Err(error);
            }
        }
    }
    match stream.failure() {
        Some(error) => Err(error.clone()),
        None => Ok(result),
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use crate::{collect, generate, merge, transform, try_collect, try_transform, CancellationToken, Stream};

    #[test]
    fn second_collect_returns_immediately() {
        let token = CancellationToken::new();
        let mut stream = transform(&token, generate(&token, 0, 10), |x| x + 1);
        assert_eq!(collect(&mut stream).len(), 10);
        assert!(stream.is_closed());

        let start = Instant::now();
        assert!(collect(&mut stream).is_empty());
        assert!(collect(&mut stream).is_empty());
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn closed_streams_collect_empty() {
        assert!(collect(&mut Stream::closed()).is_empty());
    }

    #[test]
    fn failure_stops_a_merged_pipeline() {
        let token = CancellationToken::new();
        let failing = try_transform(&token, generate(&token, 0, 5), |x| {
            if x == 2 { Err("two") } else { Ok(x) }
        });
        let healthy = try_transform(&token, generate(&token, 100, 1_000_000), |x| Ok::<_, String>(x));
        let mut merged = merge(&token, vec![failing, healthy]);
        let error = try_collect(&mut merged).unwrap_err();
        assert_eq!(error.value, 2);
        assert!(merged.is_closed());
        assert!(collect(&mut merged).is_empty());
    }

    #[test]
    fn failure_survives_cancellation() {
        let token = CancellationToken::new();
        let failing = try_transform(&token, generate(&token, 0, 10), |x| {
            if x == 0 { Err("zero") } else { Ok(x) }
        });
        let mut merged = merge(&token, vec![failing]);
        while merged.failure().is_none() {
            std::thread::sleep(Duration::from_millis(1));
        }
        token.cancel();
        let error = try_collect(&mut merged).unwrap_err();
        assert_eq!(error.value, 0);
        assert!(try_collect(&mut merged).is_err());
    }

    #[test]
    fn try_collect_without_failures() {
        let token = CancellationToken::new();
        let mut stream = try_transform(&token, generate(&token, 0, 4), |x| Ok::<_, String>(x * 3));
        assert_eq!(try_collect(&mut stream).unwrap(), vec![0, 3, 6, 9]);
        assert_eq!(try_collect(&mut stream).unwrap(), Vec::<i64>::new());
    }
}
