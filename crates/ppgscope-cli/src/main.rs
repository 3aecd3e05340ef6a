use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::{error, info};
use ppgscope_lib::{
    arrhythmia::{detect_arrhythmia, DetectionResult},
    config::PipelineConfig,
    features::{extract_features, FeatureSet},
    io::{self as ppg_io, read_json, write_json, write_recording},
    pipeline::{analyze_file, discover_recordings, write_plots},
    plot::ImageFormat,
    preprocess::{preprocess, resample},
    signal::TimeSeries,
    simulate::{synthesize, BeatPause, SyntheticPpg},
};
use serde::Serialize;
use std::{
    io::{self, Read},
    path::{Path, PathBuf},
};

#[derive(Parser)]
#[command(
    name = "ppgscope",
    version,
    about = "ppgscope: offline PPG preprocessing, features, arrhythmia flags and plots"
)]
struct Cli {
    /// TOML pipeline configuration; command-line flags override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a synthetic PPG recording with known beat timing
    Simulate {
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value_t = 100.0)]
        fs: f64,
        #[arg(long, default_value_t = 30.0)]
        duration: f64,
        #[arg(long, default_value_t = 72.0)]
        bpm: f64,
        #[arg(long, default_value_t = 15.0)]
        breaths_per_min: f64,
        #[arg(long, default_value_t = 0.02)]
        noise: f64,
        #[arg(long, default_value_t = 7)]
        seed: u64,
        /// Stretch the interval after this (1-based) beat
        #[arg(long)]
        pause_at_beat: Option<usize>,
        #[arg(long, default_value_t = 1.6)]
        pause_factor: f64,
    },
    /// Clean a raw recording (stdin when --input is omitted)
    Preprocess {
        #[arg(long)]
        input: Option<PathBuf>,
        /// Sampling rate for inputs without a header
        #[arg(long)]
        fs: Option<f64>,
        #[arg(long)]
        out: PathBuf,
        #[arg(long)]
        highpass_hz: Option<f64>,
        #[arg(long)]
        lowpass_hz: Option<f64>,
        #[arg(long)]
        artifact_mad_k: Option<f64>,
        #[arg(long)]
        no_normalize: bool,
    },
    /// Resample a recording to a new rate by linear interpolation
    Resample {
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long)]
        fs: Option<f64>,
        #[arg(long)]
        target_fs: f64,
        #[arg(long)]
        out: PathBuf,
    },
    /// Extract features from a cleaned recording as JSON
    Features {
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long)]
        fs: Option<f64>,
        /// Write JSON here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
        #[arg(long)]
        min_beat_interval_s: Option<f64>,
        #[arg(long)]
        min_peak_height: Option<f64>,
    },
    /// Classify RR intervals of a feature JSON file
    Detect {
        #[arg(long)]
        features: PathBuf,
        #[arg(long)]
        out: Option<PathBuf>,
        #[arg(long)]
        deviation_threshold: Option<f64>,
        #[arg(long)]
        sdnn_threshold_s: Option<f64>,
    },
    /// Render signal, heart-rate, tachogram and feature plots
    Plot {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        fs: Option<f64>,
        #[arg(long)]
        features: Option<PathBuf>,
        #[arg(long)]
        detection: Option<PathBuf>,
        #[arg(long)]
        out_dir: PathBuf,
        /// File name prefix; defaults to the input file stem
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        format: Option<ImageFormat>,
    },
    /// Run every stage over each recording in a directory
    Analyze {
        #[arg(long)]
        data_dir: PathBuf,
        #[arg(long)]
        results_dir: PathBuf,
        #[arg(long, default_value = "PPG-")]
        prefix: String,
        /// File names to skip (repeatable)
        #[arg(long)]
        exclude: Vec<String>,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let mut cfg = PipelineConfig::load_or_default(cli.config.as_deref())?;
    match cli.command {
        Commands::Simulate {
            out,
            fs,
            duration,
            bpm,
            breaths_per_min,
            noise,
            seed,
            pause_at_beat,
            pause_factor,
        } => {
            let sim = SyntheticPpg {
                fs,
                duration_s: duration,
                heart_rate_bpm: bpm,
                breaths_per_min,
                noise_std: noise,
                seed,
                pause: pause_at_beat.map(|beat| BeatPause {
                    beat,
                    factor: pause_factor,
                }),
                ..SyntheticPpg::default()
            };
            cmd_simulate(&sim, &out)?
        }
        Commands::Preprocess {
            input,
            fs,
            out,
            highpass_hz,
            lowpass_hz,
            artifact_mad_k,
            no_normalize,
        } => {
            let pre = &mut cfg.preprocess;
            if let Some(v) = highpass_hz {
                pre.highpass_hz = v;
            }
            if let Some(v) = lowpass_hz {
                pre.lowpass_hz = v;
            }
            if let Some(v) = artifact_mad_k {
                pre.artifact_mad_k = v;
            }
            if no_normalize {
                pre.normalize = false;
            }
            cmd_preprocess(input.as_deref(), fs, &out, &cfg)?
        }
        Commands::Resample {
            input,
            fs,
            target_fs,
            out,
        } => cmd_resample(input.as_deref(), fs, target_fs, &out)?,
        Commands::Features {
            input,
            fs,
            out,
            min_beat_interval_s,
            min_peak_height,
        } => {
            if let Some(v) = min_beat_interval_s {
                cfg.features.beats.min_beat_interval_s = v;
            }
            if let Some(v) = min_peak_height {
                cfg.features.beats.min_peak_height = v;
            }
            cmd_features(input.as_deref(), fs, out.as_deref(), &cfg)?
        }
        Commands::Detect {
            features,
            out,
            deviation_threshold,
            sdnn_threshold_s,
        } => {
            if let Some(v) = deviation_threshold {
                cfg.detection.deviation_threshold = v;
            }
            if let Some(v) = sdnn_threshold_s {
                cfg.detection.sdnn_threshold_s = v;
            }
            cmd_detect(&features, out.as_deref(), &cfg)?
        }
        Commands::Plot {
            input,
            fs,
            features,
            detection,
            out_dir,
            name,
            format,
        } => {
            if let Some(format) = format {
                cfg.plot.format = format;
            }
            cmd_plot(
                &input,
                fs,
                features.as_deref(),
                detection.as_deref(),
                &out_dir,
                name,
                &cfg,
            )?
        }
        Commands::Analyze {
            data_dir,
            results_dir,
            prefix,
            exclude,
        } => cmd_analyze(&data_dir, &results_dir, &prefix, &exclude, &cfg)?,
    }
    Ok(())
}

fn read_signal(input: Option<&Path>, fs: Option<f64>) -> Result<TimeSeries> {
    match input {
        Some(path) => ppg_io::load_signal(path, fs),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            ppg_io::parse_signal("<stdin>", &buf, fs)
        }
    }
}

fn emit_json<T: Serialize>(value: &T, out: Option<&Path>) -> Result<()> {
    match out {
        Some(path) => write_json(path, value),
        None => {
            println!("{}", serde_json::to_string(value)?);
            Ok(())
        }
    }
}

fn cmd_simulate(sim: &SyntheticPpg, out: &Path) -> Result<()> {
    sim.validate()?;
    let ts = synthesize(sim);
    write_recording(out, &ts)?;
    info!("wrote {} samples at {} Hz to {}", ts.len(), ts.fs, out.display());
    Ok(())
}

fn cmd_preprocess(
    input: Option<&Path>,
    fs: Option<f64>,
    out: &Path,
    cfg: &PipelineConfig,
) -> Result<()> {
    let raw = read_signal(input, fs)?;
    let cleaned = preprocess(&raw, &cfg.preprocess)?;
    write_recording(out, &cleaned)
}

fn cmd_resample(input: Option<&Path>, fs: Option<f64>, target_fs: f64, out: &Path) -> Result<()> {
    let ts = read_signal(input, fs)?;
    let resampled = resample(&ts, target_fs)?;
    write_recording(out, &resampled)
}

fn cmd_features(
    input: Option<&Path>,
    fs: Option<f64>,
    out: Option<&Path>,
    cfg: &PipelineConfig,
) -> Result<()> {
    let ts = read_signal(input, fs)?;
    let features = extract_features(&ts, &cfg.features)?;
    emit_json(&features, out)
}

fn cmd_detect(features: &Path, out: Option<&Path>, cfg: &PipelineConfig) -> Result<()> {
    let features: FeatureSet = read_json(features)?;
    let result = detect_arrhythmia(&features, &cfg.detection)?;
    emit_json(&result, out)
}

fn cmd_plot(
    input: &Path,
    fs: Option<f64>,
    features: Option<&Path>,
    detection: Option<&Path>,
    out_dir: &Path,
    name: Option<String>,
    cfg: &PipelineConfig,
) -> Result<()> {
    let signal = ppg_io::load_signal(input, fs)?;
    let features: Option<FeatureSet> = features.map(read_json::<FeatureSet>).transpose()?;
    let detection: Option<DetectionResult> = detection.map(read_json::<DetectionResult>).transpose()?;
    let name = match name {
        Some(name) => name,
        None => input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .context("input path has no file name")?,
    };
    let written = write_plots(
        out_dir,
        &name,
        &signal,
        features.as_ref(),
        detection.as_ref(),
        &cfg.plot,
    )?;
    for path in written {
        println!("{}", path.display());
    }
    Ok(())
}

fn cmd_analyze(
    data_dir: &Path,
    results_dir: &Path,
    prefix: &str,
    exclude: &[String],
    cfg: &PipelineConfig,
) -> Result<()> {
    let files = discover_recordings(data_dir, prefix, exclude)?;
    if files.is_empty() {
        bail!(
            "no {}*.csv recordings found in {}",
            prefix,
            data_dir.display()
        );
    }
    let mut failed = 0usize;
    for path in &files {
        let file_name = path.display();
        println!("Processing {}...", file_name);
        match analyze_file(path, results_dir, cfg) {
            Ok(report) => {
                let features = &report.features;
                let detection = &report.detection;
                println!("Dataset Name: {}", report.name);
                println!("Mean Heart Rate: {:.2} BPM", features.heart_rate_bpm);
                match features.respiratory_rate_bpm {
                    Some(rate) => println!("Mean Respiratory Rate: {:.2} /minute", rate),
                    None => println!("Mean Respiratory Rate: N/A"),
                }
                println!(
                    "Mean Systolic Amplitude: {:.4} units",
                    features.systolic_amplitude
                );
                let detected = detection.arrhythmia_detected();
                println!("Arrhythmia Detected: {}", if detected { "Yes" } else { "No" });
                if let Some((start, end)) = detection.irregular_segment {
                    println!("  - Segment Time: {:.2} - {:.2}", start, end);
                }
                println!("Finished processing {}\n", file_name);
            }
            Err(err) => {
                error!("{}: {:#}", file_name, err);
                failed += 1;
            }
        }
    }
    if failed == files.len() {
        bail!("all {} recordings failed", failed);
    }
    info!("{} of {} recordings analysed", files.len() - failed, files.len());
    Ok(())
}
