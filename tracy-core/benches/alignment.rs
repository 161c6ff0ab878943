use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracy_core::index::{locate_slice, LocatorParams};
use tracy_core::profile::reference_profile;
use tracy_core::{gotoh, AlignMode, DnaScore, ReferenceIndex, ReferenceRecord};

fn random_sequence(length: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..length).map(|_| b"ACGT"[rng.gen_range(0..4)]).collect()
}

/// Copy of `seq` with a deletion and a few substitutions, like a Sanger read
fn mutate(seq: &[u8]) -> Vec<u8> {
    let mut read: Vec<u8> = seq.iter().copied().enumerate().filter(|(i, _)| !(200..203).contains(i)).map(|(_, b)| b).collect();
    for i in (50..read.len()).step_by(97) {
        read[i] = if read[i] == b'A' { b'C' } else { b'A' };
    }
    read
}

fn bench_sequence_alignment(c: &mut Criterion) {
    let reference = random_sequence(1000, 1);
    let read = mutate(&reference[100..800]);
    let scoring = DnaScore::default();

    c.bench_function("gotoh_semi_global_700x1000", |b| {
        b.iter(|| black_box(gotoh(black_box(&read[..]), black_box(&reference[..]), AlignMode::SEMI_GLOBAL, &scoring)))
    });
}

fn bench_profile_alignment(c: &mut Criterion) {
    let reference = random_sequence(1000, 2);
    let read = mutate(&reference[100..800]);
    let query = reference_profile(&read).unwrap();
    let target = reference_profile(&reference).unwrap();
    let scoring = DnaScore::default();

    c.bench_function("gotoh_profile_700x1000", |b| {
        b.iter(|| black_box(gotoh(black_box(&query), black_box(&target), AlignMode::SEMI_GLOBAL, &scoring)))
    });
}

fn bench_locate_slice(c: &mut Criterion) {
    let genome = random_sequence(1_000_000, 3);
    let index = ReferenceIndex::build(vec![ReferenceRecord::new("chr1", &genome)]).unwrap();
    let read = mutate(&genome[500_000..500_700]);
    let params = LocatorParams::default();

    c.bench_function("locate_slice_1mb", |b| {
        b.iter(|| black_box(locate_slice(&index, black_box(&read), &params)))
    });
}

criterion_group!(benches, bench_sequence_alignment, bench_profile_alignment, bench_locate_slice);
criterion_main!(benches);
