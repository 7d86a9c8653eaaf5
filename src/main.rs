use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use melody_continuation::config::{GenerationParams, LoopLimits};
use melody_continuation::constants::{MAX_ITERATIONS, MODEL_INTRA_THREADS, MODEL_PATH};
use melody_continuation::continue_midi;
use melody_continuation::error::ContinuationError;
use melody_continuation::inference::OnnxOracle;

#[derive(Parser)]
#[command(name = "continue-midi")]
#[command(about = "Continue a MIDI performance with a note sequence model", long_about = None)]
struct Cli {
    /// Seed performance (.mid or .midi)
    input: PathBuf,

    /// Where to write the merged MIDI file
    #[arg(short, long, default_value = "output.mid")]
    output: PathBuf,

    /// Seconds of material to generate (clamped to 5..=120)
    #[arg(short, long)]
    seconds: Option<i64>,

    /// Pitch sampling temperature (clamped to 0.2..=2.0)
    #[arg(short, long)]
    temperature: Option<f64>,

    /// ONNX export of the continuation model
    #[arg(long, env = "AI_MODEL_PATH", default_value = MODEL_PATH)]
    model: PathBuf,

    #[arg(long, default_value_t = MODEL_INTRA_THREADS)]
    threads: usize,

    /// Seed for pitch sampling; random when omitted
    #[arg(long)]
    seed: Option<u64>,

    #[arg(long, default_value_t = MAX_ITERATIONS)]
    max_iterations: usize,

    /// Stop early after this many milliseconds and keep what was generated
    #[arg(long)]
    timeout_ms: Option<u64>,
}

fn main() -> Result<(), Box<dyn Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    let is_midi = cli
        .input
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("mid") || ext.eq_ignore_ascii_case("midi"));
    if !is_midi {
        return Err(ContinuationError::UnsupportedInput(format!(
            "{} is not a MIDI file; transcribe audio to MIDI first",
            cli.input.display()
        ))
        .into());
    }

    let params = GenerationParams::from_request(cli.seconds, cli.temperature);
    let mut limits = LoopLimits::default().with_max_iterations(cli.max_iterations);
    if let Some(timeout_ms) = cli.timeout_ms {
        limits = limits.with_timeout(Duration::from_millis(timeout_ms));
    }
    let mut rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let oracle = OnnxOracle::load(&cli.model, cli.threads)?;
    let midi_data = std::fs::read(&cli.input)?;

    let (output, continuation) = continue_midi(&oracle, &midi_data, &params, &limits, &mut rng)?;
    std::fs::write(&cli.output, &output)?;

    info!(
        output = %cli.output.display(),
        generated = continuation.notes.len(),
        target = params.target_duration,
        temperature = params.temperature,
        "wrote continuation"
    );

    Ok(())
}
