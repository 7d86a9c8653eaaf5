// Seed window
pub const WINDOW_LENGTH: usize = 20;
pub const EVENT_FEATURES: usize = 3;
pub const DEFAULT_SEED_PITCH: u8 = 60;
pub const DEFAULT_SEED_STEP: f64 = 0.0;
pub const DEFAULT_SEED_DURATION: f64 = 0.5;

// Decoding
pub const MAX_PITCH: u8 = 127;
pub const TEMPERATURE_FLOOR: f64 = 1e-5;
pub const TIME_CLAMP_MIN: f64 = 0.0;
pub const TIME_CLAMP_MAX: f64 = 4.0;
pub const TIME_BUCKET_WIDTH: f64 = 0.05;
pub const MIN_NOTE_DURATION: f64 = 0.05;

// Request parameters
pub const DEFAULT_SECONDS: i64 = 30;
pub const MIN_SECONDS: i64 = 5;
pub const MAX_SECONDS: i64 = 120;
pub const DEFAULT_TEMPERATURE: f64 = 1.0;
pub const MIN_TEMPERATURE: f64 = 0.2;
pub const MAX_TEMPERATURE: f64 = 2.0;

// Loop guards. Policy bounds: progress is counted in decoded step + duration,
// so a model emitting tiny steps can exceed MAX_ITERATIONS on a long target.
pub const MAX_ITERATIONS: usize = 100_000;
pub const STALL_LIMIT: usize = 1_000;

// Model
pub const MODEL_PATH: &str = "./model/continuation.onnx";
pub const MODEL_INTRA_THREADS: usize = 4;

// MIDI Conversion
pub const TICKS_PER_BEAT: u16 = 480;
pub const OUTPUT_BPM: u32 = 120;
pub const DEFAULT_TEMPO_MICROS: u32 = 500_000;
pub const PERCUSSION_CHANNEL: u8 = 9;
pub const GENERATED_VELOCITY: u8 = 90;
