mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use std::io::BufReader;
use std::path::PathBuf;
use std::time::Duration;

use cli::Cli;
use psound::audio::frames::frame_count;
use psound::classify::{classify_snapshot, Classifier, LinearClassifier};
use psound::config::{self, Config};
use psound::selection::{format_timestamp, ratio_to_column, time_label};
use psound::{
    decode_file, Analysis, PcmReader, PipelineEvent, SampleSource, Selection, Snapshot,
    StreamingPipeline, TrailingFrame, WindowKind,
};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    // Load config: explicit --config path, or auto-detect psound.toml / global config
    let config_path = cli.config.clone().or_else(|| {
        let local = PathBuf::from("psound.toml");
        if local.exists() {
            return Some(local);
        }
        if let Some(home) = dirs::home_dir() {
            let xdg = home.join(".config").join("psound").join("config.toml");
            if xdg.exists() {
                return Some(xdg);
            }
        }
        if let Some(config_dir) = dirs::config_dir() {
            let platform = config_dir.join("psound").join("config.toml");
            if platform.exists() {
                return Some(platform);
            }
        }
        None
    });
    let mut cfg = Config::default();
    if let Some(ref path) = config_path {
        if let Some(loaded) = config::load_config(path) {
            log::info!("Loaded config from {}", path.display());
            cfg = loaded;
        } else {
            log::warn!("Failed to load config from {}", path.display());
        }
    }

    // Merge: CLI values apply only when they differ from their defaults
    let analysis_cfg = &mut cfg.analysis;
    if cli.sample_rate != 44_100 { analysis_cfg.sample_rate = cli.sample_rate; }
    if cli.frame_size != 1024 { analysis_cfg.frame_size = cli.frame_size; }
    if cli.hop_size != 512 { analysis_cfg.hop_size = cli.hop_size; }
    if cli.max_columns != 500 { analysis_cfg.max_columns = cli.max_columns; }
    if cli.window != "hann" { analysis_cfg.window = parse_window(&cli.window)?; }
    if cli.drop_trailing { analysis_cfg.trailing = TrailingFrame::Drop; }
    if cli.parallel { analysis_cfg.parallel = true; }
    if cli.model.is_some() { cfg.classifier.model = cli.model.clone(); }

    if !cli.input.exists() {
        anyhow::bail!("Input file not found: {}", cli.input.display());
    }

    log::info!("psound - lung sound analysis");
    log::info!("Input: {}", cli.input.display());

    // 1. Acquire samples
    let (source, expected_samples): (Box<dyn SampleSource + Send>, usize) = if cli.pcm {
        let file = std::fs::File::open(&cli.input)
            .with_context(|| format!("Failed to open PCM file: {}", cli.input.display()))?;
        let bytes = file.metadata().map(|m| m.len() as usize).unwrap_or(0);
        let reader = PcmReader::new(BufReader::new(file), cfg.analysis.sample_rate);
        (Box::new(reader), bytes / 2)
    } else {
        log::info!("Decoding audio...");
        let decoded = decode_file(&cli.input)
            .with_context(|| format!("Failed to decode {}", cli.input.display()))?;
        let len = decoded.len();
        (Box::new(decoded), len)
    };
    let sample_rate = source.sample_rate();

    // 2. Analyze on a worker thread, follow progress here
    let pipeline = StreamingPipeline::new(cfg.analysis.clone()).context("Invalid analysis settings")?;
    let expected_frames = frame_count(
        expected_samples,
        cfg.analysis.frame_size,
        cfg.analysis.hop_size,
        cfg.analysis.trailing,
    );
    log::info!(
        "Analyzing: frame={} hop={} window={:?} (~{} frames)",
        cfg.analysis.frame_size,
        cfg.analysis.hop_size,
        cfg.analysis.window,
        expected_frames
    );

    let handle = psound::spawn(pipeline, source, Analysis::Both)?;

    let pb = ProgressBar::new(expected_frames as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} frames ({eta} remaining)")?
            .progress_chars("=>-"),
    );

    let mut report = None;
    for event in handle.events().iter() {
        match event {
            PipelineEvent::ColumnAdded { index } => pb.set_position(index as u64 + 1),
            PipelineEvent::Finished(r) => {
                report = Some(r);
                break;
            }
            PipelineEvent::Failed(e) => {
                pb.abandon();
                return Err(e).context("Analysis failed");
            }
            PipelineEvent::Cancelled { frames } => {
                pb.abandon();
                anyhow::bail!("Analysis cancelled after {} frames", frames);
            }
            PipelineEvent::Started | PipelineEvent::Amplitude { .. } => {}
        }
    }
    pb.finish_with_message("Analysis complete");

    let report = report.context("Analysis worker stopped without reporting")?;
    let mut pipeline = handle.join()?;
    let amplitudes = pipeline.take_amplitudes();
    let snapshot = pipeline.buffer().snapshot();

    // 3. Selection
    let mut selection = Selection::from_config(&cfg.selection);
    selection.drag(psound::selection::Handle::End, cli.end);
    selection.drag(psound::selection::Handle::Start, cli.start);
    let duration = if sample_rate == 0 {
        report.duration_secs
    } else {
        expected_samples as f32 / sample_rate as f32
    };
    let samples = selection.sample_range(expected_samples);
    let (play_start, play_length) = selection.playback_window(Duration::from_secs_f32(duration));

    // 4. Classification
    let classification = match cfg.classifier.model {
        Some(ref path) => {
            let model = LinearClassifier::load(path)?;
            if model.input_len() != cfg.classifier.feature_len {
                anyhow::bail!(
                    "Model expects {} features, config says {}",
                    model.input_len(),
                    cfg.classifier.feature_len
                );
            }
            let result = classify_snapshot(&model, &snapshot, cfg.classifier.features)?;
            log::info!("Classification: {}", result);
            Some(result)
        }
        None => None,
    };

    let amp_mean = if amplitudes.is_empty() {
        0.0
    } else {
        amplitudes.iter().sum::<f32>() / amplitudes.len() as f32
    };
    let amp_max = amplitudes.iter().copied().fold(0.0f32, f32::max);

    let summary = json!({
        "input": cli.input.display().to_string(),
        "sample_rate": sample_rate,
        "duration": format_timestamp(duration),
        "duration_secs": duration,
        "frames": report.frames,
        "padded_frames": report.padded_frames,
        "columns": report.columns,
        "bins": snapshot.bins(),
        "peak_frequency_hz": dominant_frequency(&snapshot, sample_rate),
        "amplitude": { "mean": amp_mean, "max": amp_max },
        "selection": {
            "start": time_label("Start", selection.start(), duration),
            "end": time_label("End", selection.end(), duration),
            "start_sample": samples.start,
            "end_sample": samples.end,
            "start_column": ratio_to_column(selection.start(), snapshot.len()),
            "end_column": ratio_to_column(selection.end(), snapshot.len()),
            "playback_start_ms": play_start.as_millis() as u64,
            "playback_length_ms": play_length.as_millis() as u64,
        },
        "classification": classification,
        "elapsed_ms": report.elapsed.as_secs_f64() * 1000.0,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}

fn parse_window(name: &str) -> Result<WindowKind> {
    match name.to_ascii_lowercase().as_str() {
        "hann" => Ok(WindowKind::Hann),
        "hamming" => Ok(WindowKind::Hamming),
        "blackman" => Ok(WindowKind::Blackman),
        "rectangular" | "none" => Ok(WindowKind::Rectangular),
        other => anyhow::bail!("Unknown window '{}'. Valid: hann, hamming, blackman, rectangular", other),
    }
}

/// Frequency of the strongest bin in the column-summed spectrogram.
fn dominant_frequency(snapshot: &Snapshot, sample_rate: u32) -> Option<f32> {
    let first = snapshot.first()?;
    let mut totals = vec![0.0f32; first.len()];
    for column in snapshot.iter() {
        for (t, &m) in totals.iter_mut().zip(column.iter()) {
            *t += m;
        }
    }
    let summed = psound::Spectrum::new(totals);
    summed
        .peak_bin()
        .map(|bin| summed.bin_frequency(bin, sample_rate))
}
