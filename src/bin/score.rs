//! Score a ranking document file against a LightGBM JSON model dump.
//!
//! Usage:
//!   cargo run --bin score --release -- --model model.json --documents test.txt [options]
//!
//! Options:
//!   --scorer <name>     merged | linearized | eqnodes | simd128x8 | simd128x16 |
//!                       simd256x8 | simd256x16 | simd256x32 | simd512x8 |
//!                       simd512x16 | simd512x32 | simd512x64   (default: merged)
//!   --block <w>         scalar block width 8|16|32|64 (default: 32)
//!   --threads <n>       size of the parallel region (default: 1)
//!   --parallel-features / --parallel-documents / --parallel-forest
//!   --expected <path>   compare against expected scores (tolerance 1e-6)
//!   --max <n>           score at most n documents (default: all)

use std::process::ExitCode;
use std::time::Instant;

use rapidscorer::compat::lightgbm::LgbModel;
use rapidscorer::data::{read_documents, read_scores};
use rapidscorer::testing::documents_matrix;
use rapidscorer::{
    score_all, Config, EqNodesScorer, Forest, LinearizedScorer, MergedScorer, Scorer, Simd128x16,
    Simd128x8, Simd256x16, Simd256x32, Simd256x8, Simd512x16, Simd512x32, Simd512x64, Simd512x8,
    SimdScorer,
};

struct Args {
    model: String,
    documents: String,
    scorer: String,
    block: u32,
    expected: Option<String>,
    max: usize,
    config: Config,
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args {
        model: String::new(),
        documents: String::new(),
        scorer: "merged".to_string(),
        block: 32,
        expected: None,
        max: 0,
        config: Config::serial(),
    };

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        let mut value = |name: &str| {
            iter.next()
                .ok_or_else(|| format!("{name} requires a value"))
        };
        match arg.as_str() {
            "--model" => args.model = value("--model")?,
            "--documents" => args.documents = value("--documents")?,
            "--scorer" => args.scorer = value("--scorer")?,
            "--block" => {
                args.block = value("--block")?
                    .parse()
                    .map_err(|_| "--block expects 8|16|32|64".to_string())?
            }
            "--threads" => {
                args.config.n_threads = value("--threads")?
                    .parse()
                    .map_err(|_| "--threads expects an integer".to_string())?
            }
            "--parallel-features" => args.config.parallel_features = true,
            "--parallel-documents" => args.config.parallel_documents = true,
            "--parallel-forest" => args.config.parallel_forest = true,
            "--expected" => args.expected = Some(value("--expected")?),
            "--max" => {
                args.max = value("--max")?
                    .parse()
                    .map_err(|_| "--max expects an integer".to_string())?
            }
            other => return Err(format!("unknown argument {other:?}")),
        }
    }

    if args.model.is_empty() || args.documents.is_empty() {
        return Err("--model and --documents are required".to_string());
    }
    Ok(args)
}

fn build_scorer<'f>(
    args: &Args,
    forest: &'f Forest,
) -> Result<Box<dyn Scorer + 'f>, String> {
    let config = args.config.clone();
    let scorer: Box<dyn Scorer + 'f> = match (args.scorer.as_str(), args.block) {
        ("merged", 8) => Box::new(MergedScorer::<u8>::new(config, forest).map_err(err)?),
        ("merged", 16) => Box::new(MergedScorer::<u16>::new(config, forest).map_err(err)?),
        ("merged", 32) => Box::new(MergedScorer::<u32>::new(config, forest).map_err(err)?),
        ("merged", 64) => Box::new(MergedScorer::<u64>::new(config, forest).map_err(err)?),
        ("linearized", 8) => Box::new(LinearizedScorer::<u8>::new(config, forest).map_err(err)?),
        ("linearized", 16) => Box::new(LinearizedScorer::<u16>::new(config, forest).map_err(err)?),
        ("linearized", 32) => Box::new(LinearizedScorer::<u32>::new(config, forest).map_err(err)?),
        ("linearized", 64) => Box::new(LinearizedScorer::<u64>::new(config, forest).map_err(err)?),
        ("eqnodes", 8) => Box::new(EqNodesScorer::<u8>::new(config, forest).map_err(err)?),
        ("eqnodes", 16) => Box::new(EqNodesScorer::<u16>::new(config, forest).map_err(err)?),
        ("eqnodes", 32) => Box::new(EqNodesScorer::<u32>::new(config, forest).map_err(err)?),
        ("eqnodes", 64) => Box::new(EqNodesScorer::<u64>::new(config, forest).map_err(err)?),
        ("simd128x8", _) => Box::new(SimdScorer::<Simd128x8>::new(config, forest).map_err(err)?),
        ("simd128x16", _) => Box::new(SimdScorer::<Simd128x16>::new(config, forest).map_err(err)?),
        ("simd256x8", _) => Box::new(SimdScorer::<Simd256x8>::new(config, forest).map_err(err)?),
        ("simd256x16", _) => Box::new(SimdScorer::<Simd256x16>::new(config, forest).map_err(err)?),
        ("simd256x32", _) => Box::new(SimdScorer::<Simd256x32>::new(config, forest).map_err(err)?),
        ("simd512x8", _) => Box::new(SimdScorer::<Simd512x8>::new(config, forest).map_err(err)?),
        ("simd512x16", _) => Box::new(SimdScorer::<Simd512x16>::new(config, forest).map_err(err)?),
        ("simd512x32", _) => Box::new(SimdScorer::<Simd512x32>::new(config, forest).map_err(err)?),
        ("simd512x64", _) => Box::new(SimdScorer::<Simd512x64>::new(config, forest).map_err(err)?),
        (name, block) => {
            return Err(format!(
                "no scorer named {name:?} with block width {block}"
            ))
        }
    };
    Ok(scorer)
}

fn err(e: impl std::fmt::Display) -> String {
    e.to_string()
}

fn run(args: Args) -> Result<(), String> {
    let t0 = Instant::now();
    let forest = LgbModel::from_file(&args.model)
        .and_then(|m| m.to_forest())
        .map_err(err)?;
    eprintln!(
        "parsed {} trees ({} leaves) in {:.3}s",
        forest.n_trees(),
        forest.total_leaves(),
        t0.elapsed().as_secs_f64()
    );

    let documents = read_documents(&args.documents, args.max).map_err(err)?;
    let uniform = documents
        .windows(2)
        .all(|pair| pair[0].len() == pair[1].len());
    if !uniform {
        return Err("documents must all have the same feature count".to_string());
    }
    let matrix = documents_matrix(&documents);

    let t1 = Instant::now();
    let scorer = build_scorer(&args, &forest)?;
    eprintln!(
        "built {} scorer in {:.3}s",
        args.scorer,
        t1.elapsed().as_secs_f64()
    );

    let t2 = Instant::now();
    let scores = score_all(scorer.as_ref(), matrix.view()).map_err(err)?;
    eprintln!(
        "scored {} documents in {:.3}s",
        scores.len(),
        t2.elapsed().as_secs_f64()
    );

    if let Some(expected_path) = &args.expected {
        let expected = read_scores(expected_path, args.max).map_err(err)?;
        if expected.len() != scores.len() {
            return Err(format!(
                "expected {} scores, scored {} documents",
                expected.len(),
                scores.len()
            ));
        }
        let mismatches = scores
            .iter()
            .zip(expected.iter())
            .filter(|(got, want)| (*got - *want).abs() > 1e-6)
            .count();
        eprintln!("{mismatches} scores off by more than 1e-6");
        if mismatches > 0 {
            return Err(format!("{mismatches} score mismatches"));
        }
    } else {
        for score in &scores {
            println!("{score}");
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    match parse_args().and_then(run) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}
