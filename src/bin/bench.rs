//! Minimal CLI benchmark harness: build a random trie, report its average
//! stem depth, then time proving and verifying a multi-key proof.
//!
//! Flags: `--stems N` `--chunks-per-stem N` `--proof-keys N` `--seed N`.

#![forbid(unsafe_code)]

use std::sync::Arc;
use std::time::Instant;

use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use tracing::info;

use verkle_trie::{build_proof, verify, Key, PublicParams, Stem, Trie, Value, KEY_LENGTH, STEM_LENGTH};

fn parse_flag(args: &[String], key: &str) -> Option<String> {
    let mut it = args.iter();
    while let Some(a) = it.next() {
        if a == key {
            return it.next().cloned();
        }
    }
    None
}

fn parse_usize(args: &[String], key: &str, default: usize) -> anyhow::Result<usize> {
    match parse_flag(args, key) {
        Some(s) => s
            .parse::<usize>()
            .map_err(|e| anyhow::anyhow!("--{key}: {e}")),
        None => Ok(default),
    }
}

fn parse_u64(args: &[String], key: &str, default: u64) -> anyhow::Result<u64> {
    match parse_flag(args, key) {
        Some(s) => s
            .parse::<u64>()
            .map_err(|e| anyhow::anyhow!("--{key}: {e}")),
        None => Ok(default),
    }
}

fn random_stem(rng: &mut impl Rng) -> Stem {
    let mut bytes = [0u8; STEM_LENGTH];
    rng.fill(&mut bytes);
    Stem(bytes)
}

fn random_value(rng: &mut impl Rng) -> Value {
    let mut bytes = [0u8; KEY_LENGTH];
    rng.fill(&mut bytes);
    Value(bytes)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "bench=info".into()))
        .with_target(false)
        .compact()
        .init();

    let args: Vec<String> = std::env::args().collect();
    let stems = parse_usize(&args, "--stems", 1_000)?;
    let chunks_per_stem = parse_usize(&args, "--chunks-per-stem", 5)?;
    let proof_keys = parse_usize(&args, "--proof-keys", 100)?;
    let seed = parse_u64(&args, "--seed", 0)?;

    info!(stems, chunks_per_stem, proof_keys, seed, "starting benchmark");

    let mut rng = StdRng::seed_from_u64(seed);
    let pp = Arc::new(PublicParams::deterministic(b"verkle-trie.bench.v1"));
    let mut trie = Trie::new(pp.clone());

    let mut all_keys = Vec::with_capacity(stems * chunks_per_stem);
    for _ in 0..stems {
        let stem = random_stem(&mut rng);
        for _ in 0..chunks_per_stem {
            let suffix = rng.gen::<u8>();
            let key = stem.with_suffix(suffix);
            let value = random_value(&mut rng);
            trie.insert_no_commitment(key, value)?;
            all_keys.push(key);
        }
    }

    let time_a = Instant::now();
    trie.compute_missing_commitments();
    let build_elapsed = time_a.elapsed();
    info!(?build_elapsed, "computed verkle root");

    let distinct_stems: std::collections::BTreeSet<Stem> = all_keys.iter().map(|k| k.stem()).collect();
    let total_depth: usize = distinct_stems.iter().map(|s| trie.find_stem(s).inner_commitments.len()).sum();
    let average_depth = total_depth as f64 / distinct_stems.len() as f64;
    info!(
        inserted = all_keys.len(),
        average_depth,
        "average stem depth (includes the root and the extension level)"
    );

    // build_proof rejects duplicate keys, so sample without replacement.
    all_keys.shuffle(&mut rng);
    let sample: Vec<Key> = all_keys[..proof_keys.min(all_keys.len())].to_vec();

    let time_a = Instant::now();
    let proof = build_proof(&trie, &sample)?;
    let prove_elapsed = time_a.elapsed();
    info!(?prove_elapsed, keys = sample.len(), "built proof");

    let claimed: Vec<Option<Value>> = sample.iter().map(|k| trie.lookup(k)).collect();

    let time_a = Instant::now();
    verify(&pp, trie.root_commitment(), &sample, &claimed, &proof)
        .map_err(|e| anyhow::anyhow!("proof failed to verify: {e}"))?;
    let verify_elapsed = time_a.elapsed();
    info!(?verify_elapsed, "verified proof");

    Ok(())
}
