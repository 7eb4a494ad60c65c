use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;

use classic_ai_core as core;
use core::games::{minesweeper, tictactoe};
use core::heredity::{infer, infer_parallel, GeneCount, HeredityParams, Pedigree, Posterior};
use core::pagerank::{iterate_pagerank, sample_pagerank, Corpus, PageRankConfig, Ranks};
use core::shopping::{evaluate, load_data, train_test_split, KNearestNeighbors};

#[derive(Parser)]
#[command(name = "classic-ai")]
#[command(version)]
#[command(about = "Exact inference, ranking, classification and game search")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Gene and trait probabilities for every person in a family
    Heredity {
        /// Path to family CSV (columns: name, mother, father, trait)
        #[arg(short, long)]
        data: String,

        /// JSON file overriding the default probability tables
        #[arg(short, long)]
        params: Option<String>,

        /// Override the mutation rate
        #[arg(long)]
        mutation_rate: Option<f64>,

        /// Enumerate hypotheses on all cores
        #[arg(long)]
        parallel: bool,

        /// Output format: "text" (default) or "json"
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Rank the pages of a directory of HTML files
    Pagerank {
        /// Directory containing *.html pages
        #[arg(short, long)]
        corpus: String,

        /// Pages visited by the random surfer
        #[arg(long, default_value = "10000")]
        samples: usize,

        /// Damping factor
        #[arg(long, default_value = "0.85")]
        damping: f64,

        /// Seed for the random surfer
        #[arg(long, default_value = "0")]
        seed: u64,
    },

    /// Train and evaluate a nearest-neighbour purchase classifier
    Shopping {
        /// Path to shopping sessions CSV
        #[arg(short, long)]
        data: String,

        /// Fraction of sessions held out for testing
        #[arg(long, default_value = "0.4")]
        test_size: f64,

        /// Neighbours consulted per prediction
        #[arg(short, long, default_value = "1")]
        k: usize,

        /// Seed for the train/test shuffle
        #[arg(long, default_value = "0")]
        seed: u64,
    },

    /// Best move for the player to move on a tic-tac-toe board
    Tictactoe {
        /// Nine squares in row-major order, e.g. "X.O|.X.|..O"
        #[arg(short, long, default_value = ".........")]
        board: String,
    },

    /// Let the inference player play one game of Minesweeper
    Minesweeper {
        #[arg(long, default_value = "8")]
        height: usize,

        #[arg(long, default_value = "8")]
        width: usize,

        #[arg(long, default_value = "8")]
        mines: usize,

        /// Seed for mine placement and guesses
        #[arg(long, default_value = "0")]
        seed: u64,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Heredity {
            data,
            params,
            mutation_rate,
            parallel,
            format,
        } => cmd_heredity(&data, params.as_deref(), mutation_rate, parallel, &format),
        Commands::Pagerank {
            corpus,
            samples,
            damping,
            seed,
        } => cmd_pagerank(&corpus, samples, damping, seed),
        Commands::Shopping {
            data,
            test_size,
            k,
            seed,
        } => cmd_shopping(&data, test_size, k, seed),
        Commands::Tictactoe { board } => cmd_tictactoe(&board),
        Commands::Minesweeper {
            height,
            width,
            mines,
            seed,
        } => cmd_minesweeper(height, width, mines, seed),
    }
}

fn cmd_heredity(
    data_path: &str,
    params_path: Option<&str>,
    mutation_rate: Option<f64>,
    parallel: bool,
    output_format: &str,
) -> Result<()> {
    let pedigree = Pedigree::from_csv(data_path)
        .with_context(|| format!("Failed to load family from '{}'", data_path))?;
    eprintln!(
        "Loaded {} people from '{}'",
        pedigree.n_people(),
        data_path
    );

    let mut params = match params_path {
        Some(path) => HeredityParams::from_json_file(path)
            .with_context(|| format!("Failed to load parameters from '{}'", path))?,
        None => HeredityParams::default(),
    };
    if let Some(rate) = mutation_rate {
        params = params.mutation_rate(rate);
    }

    let posterior = if parallel {
        infer_parallel(&pedigree, &params)
    } else {
        infer(&pedigree, &params)
    }
    .context("Inference failed")?;

    eprintln!("Enumerated {} hypotheses", posterior.hypotheses());

    match output_format.to_lowercase().as_str() {
        "json" => print_posterior_json(&posterior)?,
        "text" => print!("{}", posterior.summary()),
        other => anyhow::bail!("Unknown format '{}'. Use 'text' (default) or 'json'.", other),
    }
    Ok(())
}

fn print_posterior_json(posterior: &Posterior) -> Result<()> {
    let people: Vec<serde_json::Value> = posterior
        .iter()
        .map(|(name, d)| {
            serde_json::json!({
                "name": name,
                "gene": {
                    "2": d.gene(GeneCount::Two),
                    "1": d.gene(GeneCount::One),
                    "0": d.gene(GeneCount::Zero),
                },
                "trait": {
                    "true": d.trait_probability(true),
                    "false": d.trait_probability(false),
                },
            })
        })
        .collect();

    let out = serde_json::json!({
        "hypotheses": posterior.hypotheses(),
        "people": people,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn cmd_pagerank(corpus_dir: &str, samples: usize, damping: f64, seed: u64) -> Result<()> {
    let corpus = Corpus::crawl(corpus_dir)
        .with_context(|| format!("Failed to crawl '{}'", corpus_dir))?;
    eprintln!("Crawled {} pages from '{}'", corpus.len(), corpus_dir);

    let config = PageRankConfig::new().damping(damping).samples(samples);
    let mut rng = StdRng::seed_from_u64(seed);

    let sampled = sample_pagerank(&corpus, &config, &mut rng).context("Sampling failed")?;
    print_ranks(
        &format!("PageRank Results from Sampling (n = {})", config.n_samples()),
        &sampled,
    );

    let iterated = iterate_pagerank(&corpus, &config).context("Iteration failed")?;
    print_ranks("PageRank Results from Iteration", &iterated);
    Ok(())
}

fn print_ranks(title: &str, ranks: &Ranks) {
    println!("{}", title);
    for (page, rank) in ranks {
        println!("  {}: {:.4}", page, rank);
    }
}

fn cmd_shopping(data_path: &str, test_size: f64, k: usize, seed: u64) -> Result<()> {
    let data = load_data(data_path)
        .with_context(|| format!("Failed to load sessions from '{}'", data_path))?;
    eprintln!("Loaded {} sessions from '{}'", data.len(), data_path);

    let split = train_test_split(&data, test_size, seed).context("Failed to split data")?;
    let model = KNearestNeighbors::new(k)?
        .fit(&split.train.evidence, &split.train.labels)
        .context("Failed to train classifier")?;
    let predictions = model.predict(&split.test.evidence);
    let eval = evaluate(&split.test.labels, &predictions).context("Evaluation failed")?;

    println!("Correct: {}", eval.correct);
    println!("Incorrect: {}", eval.incorrect);
    println!("True Positive Rate: {:.2}%", 100.0 * eval.sensitivity);
    println!("True Negative Rate: {:.2}%", 100.0 * eval.specificity);
    Ok(())
}

fn cmd_tictactoe(board: &str) -> Result<()> {
    let board: tictactoe::Board = board.parse().context("Invalid board")?;
    println!("{}\n", board);

    if let Some(w) = tictactoe::winner(&board) {
        println!("Game over: {} wins", w);
        return Ok(());
    }
    match tictactoe::minimax(&board) {
        Some((row, col)) => {
            let value = match tictactoe::value(&board) {
                1 => "X wins",
                -1 => "O wins",
                _ => "draw",
            };
            println!(
                "{} to move: best move ({}, {}), perfect play ends in: {}",
                tictactoe::player(&board),
                row,
                col,
                value
            );
        }
        None => println!("Game over: tie"),
    }
    Ok(())
}

fn cmd_minesweeper(height: usize, width: usize, mines: usize, seed: u64) -> Result<()> {
    let mut rng = StdRng::seed_from_u64(seed);
    let board = minesweeper::Minesweeper::new(height, width, mines, &mut rng)
        .context("Failed to create board")?;
    eprintln!("Playing a {}x{} board with {} mines", height, width, mines);

    match minesweeper::play(&board, &mut rng)? {
        minesweeper::GameOutcome::Won { moves } => println!("Won after {} moves", moves),
        minesweeper::GameOutcome::Lost { moves, mine } => println!(
            "Lost after {} moves: mine at ({}, {})",
            moves, mine.0, mine.1
        ),
    }
    Ok(())
}
