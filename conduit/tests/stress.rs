use std::collections::HashSet;
use std::thread;
use std::time::Duration;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use conduit::{collect, CancellationToken, Pipeline};

const SOURCES: i64 = 50;
const VALUES: i64 = 1_000;

/// Sleeps for a few microseconds on a small share of calls, to shake up thread interleavings.
fn jitter(rng: &mut SmallRng) {
    if rng.gen_ratio(1, 16) {
        thread::sleep(Duration::from_micros(rng.gen_range(0 .. 200)));
    }
}

#[test]
#[cfg_attr(miri, ignore)]
fn merge_fifty_jittered_sources() {
    let pipeline = Pipeline::new(CancellationToken::new());
    let inputs = (0 .. SOURCES).map(|source| {
        let mut rng = SmallRng::seed_from_u64(source as u64);
        let values = pipeline.generate(source * VALUES, VALUES);
        pipeline.transform(values, move |x| { jitter(&mut rng); x })
    }).collect::<Vec<_>>();
    let mut merged = pipeline.merge(inputs);

    let mut rng = SmallRng::seed_from_u64(0xC0FFEE);
    let mut values = Vec::new();
    while let Some(value) = merged.recv() {
        jitter(&mut rng);
        values.push(value);
    }
    pipeline.join().unwrap();

    assert_eq!(values.len() as i64, SOURCES * VALUES);
    let unique: HashSet<_> = values.iter().copied().collect();
    assert_eq!(unique.len(), values.len());
    assert!(values.iter().all(|value| (0 .. SOURCES * VALUES).contains(value)));

    for source in 0 .. SOURCES {
        let range = source * VALUES .. (source + 1) * VALUES;
        let ordered: Vec<_> = values.iter().copied().filter(|value| range.contains(value)).collect();
        assert_eq!(ordered, range.collect::<Vec<_>>());
    }
}

#[test]
#[cfg_attr(miri, ignore)]
fn cancel_under_load_leaves_source_prefixes() {
    for seed in 0 .. 8 {
        let mut rng = SmallRng::seed_from_u64(seed);
        let token = CancellationToken::new();
        let pipeline = Pipeline::new(token.clone());
        let inputs = (0 .. 8).map(|source| pipeline.generate(source * VALUES, VALUES)).collect::<Vec<_>>();
        let mut merged = pipeline.merge(inputs);

        let reads = rng.gen_range(0 .. 2_000);
        let mut values = Vec::new();
        for _ in 0 .. reads {
            values.extend(merged.recv());
        }
        token.cancel();
        values.extend(collect(&mut merged));
        pipeline.join().unwrap();

        assert!(values.len() >= reads.min(8 * VALUES as usize));
        for source in 0 .. 8 {
            let start = source * VALUES;
            let ordered: Vec<_> = values.iter().copied().filter(|value| (start .. start + VALUES).contains(value)).collect();
            assert_eq!(ordered, (start .. start + ordered.len() as i64).collect::<Vec<_>>());
        }
    }
}
