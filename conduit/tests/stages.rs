use std::thread;
use std::time::{Duration, Instant};

use conduit::{collect, generate, merge, transform, try_collect, try_transform, CancellationToken, Pipeline, Stream};

#[test]
fn generate_yields_the_range() {
    for (start, count) in [(0, 0), (0, 1), (-5, 10), (1_000_000, 257), (i64::MIN, 3)] {
        let token = CancellationToken::new();
        let values = collect(&mut generate(&token, start, count));
        assert_eq!(values.len() as i64, count);
        assert!(values.windows(2).all(|pair| pair[1] == pair[0] + 1));
        assert_eq!(values.first().copied(), if count > 0 { Some(start) } else { None });
    }
}

#[test]
fn negative_count_is_empty() {
    let token = CancellationToken::new();
    assert!(collect(&mut generate(&token, 7, -3)).is_empty());
}

#[test]
fn cancel_before_reading_is_empty() {
    let token = CancellationToken::new();
    let mut squares = transform(&token, generate(&token, 0, 1_000), |x| x * x);
    token.cancel();
    assert!(collect(&mut squares).is_empty());
}

#[test]
fn cancel_after_reading_leaves_a_prefix() {
    for k in [0, 1, 5, 50] {
        let token = CancellationToken::new();
        let mut stream = transform(&token, generate(&token, 0, 1_000), |x| x + 1);
        let mut values = Vec::new();
        for _ in 0 .. k {
            values.extend(stream.recv());
        }
        token.cancel();
        values.extend(collect(&mut stream));

        assert!(values.len() >= k && values.len() <= 1_000);
        assert_eq!(values, (1 ..= values.len() as i64).collect::<Vec<_>>());
    }
}

#[test]
fn transform_squares() {
    let token = CancellationToken::new();
    let mut squares = transform(&token, generate(&token, 0, 5), |x| x * x);
    assert_eq!(collect(&mut squares), vec![0, 1, 4, 9, 16]);
}

#[test]
fn merge_keeps_per_source_order() {
    let token = CancellationToken::new();
    let first = generate(&token, 1, 3);
    let second = transform(&token, generate(&token, 1, 2), |x| x * 10);
    let values = collect(&mut merge(&token, vec![first, second]));

    let mut sorted = values.clone();
    sorted.sort();
    assert_eq!(sorted, vec![1, 2, 3, 10, 20]);
    assert_eq!(values.iter().copied().filter(|x| *x < 10).collect::<Vec<_>>(), vec![1, 2, 3]);
    assert_eq!(values.iter().copied().filter(|x| *x >= 10).collect::<Vec<_>>(), vec![10, 20]);
}

#[test]
fn empty_merge_is_closed() {
    let token = CancellationToken::new();
    let mut merged = merge(&token, Vec::<Stream>::new());
    let start = Instant::now();
    assert!(collect(&mut merged).is_empty());
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[test]
fn drained_stream_collects_empty() {
    let token = CancellationToken::new();
    let mut merged = merge(&token, vec![generate(&token, 0, 3), generate(&token, 3, 3)]);
    assert_eq!(collect(&mut merged).len(), 6);
    assert!(collect(&mut merged).is_empty());
}

#[test]
fn merges_nest() {
    let pipeline = Pipeline::new(CancellationToken::new());
    let left = pipeline.merge(vec![pipeline.generate(0, 10), pipeline.generate(10, 10)]);
    let right = pipeline.merge(vec![pipeline.generate(20, 10)]);
    let mut values = collect(&mut pipeline.merge(vec![left, right]));
    values.sort();
    assert_eq!(values, (0 .. 30).collect::<Vec<_>>());
    pipeline.join().unwrap();
}

#[test]
fn failures_cross_merges() {
    let pipeline = Pipeline::new(CancellationToken::new());
    let checked = pipeline.try_transform(pipeline.generate(0, 100), |x| {
        if x % 7 == 6 { Err(format!("{} is unlucky", x)) } else { Ok(x) }
    });
    let plain = pipeline.try_transform(pipeline.generate(1_000, 5), |x| Ok::<_, String>(x));
    let mut merged = pipeline.merge(vec![checked, plain]);
    let error = try_collect(&mut merged).unwrap_err();
    assert_eq!(error.value, 6);
    assert_eq!(error.to_string(), "stage 1 failed on value 6: 6 is unlucky");
    pipeline.join().unwrap();
}

#[test]
fn dropping_a_stream_stops_its_stages() {
    let pipeline = Pipeline::new(CancellationToken::new());
    let mut stream = pipeline.transform(pipeline.generate(0, i64::MAX), |x| x);
    assert_eq!(stream.recv(), Some(0));
    drop(stream);
    // Without a reader every stage disconnects, so this returns.
    pipeline.join().unwrap();
    assert!(!pipeline.token().is_cancelled());
}

#[test]
fn free_functions_share_a_token() {
    let token = CancellationToken::new();
    let mut stream = try_transform(&token, generate(&token, 0, i64::MAX), |x| Ok::<_, String>(x));
    assert!(stream.recv().is_some());
    token.cancel();
    assert_eq!(try_collect(&mut stream).map(|values| values.len() <= 1).ok(), Some(true));
}

/// Spins until a fallible stage upstream of `stream` has recorded its failure.
fn await_failure<D>(stream: &conduit::StreamCore<D>) {
    while stream.failure().is_none() {
        thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn failure_before_cancel_is_reported() {
    let token = CancellationToken::new();
    let failing = try_transform(&token, generate(&token, 0, 10), |x| {
        if x == 0 { Err("zero") } else { Ok(x) }
    });
    let mut merged = merge(&token, vec![failing]);
    await_failure(&merged);
    // The failure is parked in the merge worker's handoff when the token is signalled.
    thread::sleep(Duration::from_millis(50));
    token.cancel();

    let error = try_collect(&mut merged).unwrap_err();
    assert_eq!(error.value, 0);
    assert_eq!(error.to_string(), "stage 0 failed on value 0: zero");
}

#[test]
fn failure_through_transforms_survives_cancel() {
    let pipeline = Pipeline::new(CancellationToken::new());
    let checked = pipeline.try_transform(pipeline.generate(0, 10), |x| {
        if x == 0 { Err(format!("{} rejected", x)) } else { Ok(x) }
    });
    let doubled = pipeline.try_transform(checked, |x| Ok::<_, String>(x * 2));
    let mut merged = pipeline.merge(vec![doubled, pipeline.try_transform(pipeline.generate(0, 5), |x| Ok::<_, String>(x))]);
    await_failure(&merged);
    pipeline.cancel();

    let error = try_collect(&mut merged).unwrap_err();
    assert_eq!((error.stage, error.value), (1, 0));
    pipeline.join().unwrap();
}

#[test]
fn join_after_cancel_returns_with_an_unread_failure() {
    let pipeline = Pipeline::new(CancellationToken::new());
    let stream = pipeline.try_transform(pipeline.generate(0, 10), |x| {
        if x == 0 { Err("zero") } else { Ok(x) }
    });
    await_failure(&stream);
    pipeline.cancel();

    let (done, joined) = crossbeam_channel::bounded(1);
    let joiner = pipeline.clone();
    thread::spawn(move || { let _ = done.send(joiner.join()); });
    let outcome = joined.recv_timeout(Duration::from_secs(5));
    assert_eq!(outcome, Ok(Ok(())));
    assert_eq!(stream.failure().map(|error| error.value), Some(0));
}
