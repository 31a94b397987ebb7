//! Command-line entry point for the wavecnn toolkit.
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use wavecnn::config::{self, AppSettings, BackendChoice};
use wavecnn::{dataset, discrimination, logging, ml, sampling, summary, synthesis, vcv};

#[derive(Parser)]
#[command(name = "wavecnn")]
#[command(about = "Waveform CNN phonological classifier and VCV synthesis toolkit")]
struct Args {
    /// Settings file (defaults to wavecnn.toml in the app directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum BackendArg {
    Cpu,
    Wgpu,
}

impl From<BackendArg> for BackendChoice {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Cpu => BackendChoice::Cpu,
            BackendArg::Wgpu => BackendChoice::Wgpu,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Train a classifier on a labeled audio directory
    Train {
        /// Directory of audio clips
        #[arg(long)]
        data: PathBuf,
        /// FileID,Category table
        #[arg(long)]
        labels: PathBuf,
        /// Output model directory
        #[arg(long)]
        out: PathBuf,
        #[arg(long)]
        epochs: Option<usize>,
        #[arg(long, value_enum)]
        backend: Option<BackendArg>,
    },
    /// Classify a directory of clips, optionally scoring against labels
    Predict {
        #[arg(long)]
        model: PathBuf,
        #[arg(long)]
        data: PathBuf,
        /// Predictions CSV
        #[arg(long)]
        out: PathBuf,
        #[arg(long)]
        labels: Option<PathBuf>,
        #[arg(long, value_enum)]
        backend: Option<BackendArg>,
    },
    /// Cosine distances between hidden activations for stimulus pairs
    Discriminate {
        #[arg(long)]
        model: PathBuf,
        /// Stimulus1,Stimulus2 table; paths are relative to it
        #[arg(long)]
        pairs: PathBuf,
        /// Layer name, e.g. downconv_2 or dense
        #[arg(long)]
        layer: String,
        #[arg(long)]
        out: PathBuf,
        #[arg(long, value_enum)]
        backend: Option<BackendArg>,
    },
    /// Measure annotated VCV recordings into a token table
    Measure {
        /// Directory of TextGrids with same-named audio files
        #[arg(long)]
        dir: PathBuf,
        #[arg(long)]
        out: PathBuf,
    },
    /// Sample synthesis parameters from a measured token table
    Sample {
        #[arg(long)]
        tokens: PathBuf,
        /// Klatt parameter table
        #[arg(long)]
        params: PathBuf,
        /// FileID,Category table for the sampled tokens
        #[arg(long)]
        meta: PathBuf,
        #[arg(long)]
        voiced: Option<usize>,
        #[arg(long)]
        voiceless: Option<usize>,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Render a parameter table to WAV files
    Synthesize {
        #[arg(long)]
        params: PathBuf,
        #[arg(long)]
        out: PathBuf,
    },
    /// Histogram and moment tables of a parameter table
    Summarize {
        #[arg(long)]
        params: PathBuf,
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value = "10")]
        bins: usize,
    },
    /// Placeholder FileID,Category table from file names
    Meta {
        #[arg(long)]
        dir: PathBuf,
        #[arg(long)]
        out: PathBuf,
    },
    /// Write the effective settings (defaults unless --config is given)
    InitConfig {
        /// Destination (defaults to the app directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    if let Err(err) = logging::init() {
        eprintln!("Logging disabled: {err}");
    }
    let settings = config::load(args.config.as_deref())?;
    run(args.command, settings)
}

fn with_backend(mut settings: AppSettings, backend: Option<BackendArg>) -> AppSettings {
    if let Some(backend) = backend {
        settings.training.backend = backend.into();
    }
    settings
}

fn run(command: Command, settings: AppSettings) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Train {
            data,
            labels,
            out,
            epochs,
            backend,
        } => {
            let mut settings = with_backend(settings, backend);
            if let Some(epochs) = epochs {
                settings.training.epochs = epochs;
            }
            let examples = dataset::load_dataset(&data, &labels, &settings.data)?;
            let (classifier, report) = ml::train_model(examples, &settings)?;
            ml::save_model(&classifier, &out)?;
            for epoch in &report.epochs {
                match epoch.validation_accuracy {
                    Some(acc) => println!(
                        "epoch {:>3}  loss {:.4}  val acc {:.3}",
                        epoch.epoch, epoch.mean_loss, acc
                    ),
                    None => println!("epoch {:>3}  loss {:.4}", epoch.epoch, epoch.mean_loss),
                }
            }
            println!("Saved model to {}", out.display());
        }
        Command::Predict {
            model,
            data,
            out,
            labels,
            backend,
        } => {
            let settings = with_backend(settings, backend);
            let classifier = ml::load_model(&model, settings.training.backend)?;
            let predictions = ml::predict_dir(&classifier, &data)?;
            ml::write_predictions(&out, classifier.categories(), &predictions)?;
            if let Some(labels) = labels {
                let report = ml::evaluate(&classifier, &predictions, &labels)?;
                println!("accuracy {:.4} ({} unmatched)", report.accuracy, report.unmatched);
                for stats in &report.per_class {
                    println!(
                        "{:<16} precision {:.3}  recall {:.3}  n={}",
                        stats.category, stats.precision, stats.recall, stats.support
                    );
                }
            }
        }
        Command::Discriminate {
            model,
            pairs,
            layer,
            out,
            backend,
        } => {
            let settings = with_backend(settings, backend);
            let classifier = ml::load_model(&model, settings.training.backend)?;
            let rows = discrimination::distance_table(&classifier, &layer, &pairs)?;
            discrimination::write_distance_table(&out, &rows)?;
        }
        Command::Measure { dir, out } => {
            let distributions = vcv::measure_directory(&dir, &settings.measurement)?;
            vcv::write_tokens_csv(&out, distributions.all())?;
        }
        Command::Sample {
            tokens,
            params,
            meta,
            voiced,
            voiceless,
            seed,
        } => {
            let mut sampling_settings = settings.sampling;
            sampling_settings.voiced_count = voiced.unwrap_or(sampling_settings.voiced_count);
            sampling_settings.voiceless_count =
                voiceless.unwrap_or(sampling_settings.voiceless_count);
            sampling_settings.seed = seed.unwrap_or(sampling_settings.seed);
            let mut distributions = vcv::VcvDistributions::default();
            for token in vcv::read_tokens_csv(&tokens)? {
                distributions.push(token);
            }
            let sampled = sampling::sample_batch(&distributions, &sampling_settings)?;
            let rows: Vec<_> = sampled.iter().map(|token| token.params.clone()).collect();
            sampling::write_params_table(&params, &rows)?;
            sampling::write_sample_metadata(&meta, &sampled)?;
        }
        Command::Synthesize { params, out } => {
            let report = synthesis::synthesize_table(&params, &out, &settings.synthesis)?;
            println!("Wrote {} files and {}", report.written.len(), report.metadata.display());
        }
        Command::Summarize { params, out, bins } => {
            std::fs::create_dir_all(&out)?;
            let summaries = summary::summarize_table(&params, bins)?;
            summary::write_histograms(&out.join("histograms.csv"), &summaries)?;
            summary::write_stats(&out.join("stats.csv"), &summaries)?;
        }
        Command::Meta { dir, out } => {
            let rows = dataset::build_metadata(&dir)?;
            dataset::write_metadata(&out, &rows)?;
            info!("Wrote {} metadata rows", rows.len());
        }
        Command::InitConfig { path } => init_config(path.as_deref(), &settings)?,
    }
    Ok(())
}

fn init_config(path: Option<&Path>, settings: &AppSettings) -> Result<(), config::ConfigError> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => config::config_path()?,
    };
    config::save_to_path(settings, &path)?;
    println!("Wrote {}", path.display());
    Ok(())
}
