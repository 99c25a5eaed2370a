//! Streaming run: frames -> (amplitude, spectrum) -> sinks.
//!
//! A run moves `Idle -> Running -> Completed | Failed | Cancelled`. Frames
//! reach the sinks strictly in frame order, including in batched mode where
//! the spectra are computed on the rayon pool. Anything pushed before a
//! failure or cancellation stays in the sinks; there is no rollback.

use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::audio::analysis::{AmplitudeTracker, SpectralAnalyzer};
use crate::audio::decode::SampleSource;
use crate::audio::features::FrameResult;
use crate::audio::frames::{Frame, FrameSource};
use crate::config::AnalysisConfig;
use crate::error::{Error, Result};
use crate::spectrogram::SpectrogramBuffer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Running,
    Completed,
    Failed,
    Cancelled,
}

/// Which sinks a run feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Analysis {
    Waveform,
    Spectrogram,
    Both,
}

impl Analysis {
    pub fn waveform(self) -> bool {
        matches!(self, Analysis::Waveform | Analysis::Both)
    }

    pub fn spectrogram(self) -> bool {
        matches!(self, Analysis::Spectrogram | Analysis::Both)
    }
}

/// Shared flag polled between frames.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Clone, Debug)]
pub struct RunReport {
    pub frames: usize,
    /// Columns in the buffer when the run finished
    pub columns: usize,
    pub padded_frames: usize,
    /// Input samples covered by the emitted frames
    pub samples: usize,
    pub duration_secs: f32,
    pub elapsed: Duration,
}

#[derive(Debug)]
pub enum RunOutcome {
    Completed(RunReport),
    Cancelled { frames: usize },
}

impl RunOutcome {
    /// The report of a completed run, `Error::Cancelled` otherwise.
    pub fn into_report(self) -> Result<RunReport> {
        match self {
            RunOutcome::Completed(report) => Ok(report),
            RunOutcome::Cancelled { frames } => Err(Error::Cancelled { frames }),
        }
    }
}

/// Per-frame hook. Called on the thread running the pipeline.
pub trait FrameVisitor {
    fn on_frame(&mut self, result: &FrameResult);

    /// Called once, only when the run completes.
    fn on_finished(&mut self, _report: &RunReport) {}
}

impl FrameVisitor for () {
    fn on_frame(&mut self, _result: &FrameResult) {}
}

#[derive(Default)]
struct Progress {
    frames: usize,
    padded: usize,
    samples: usize,
    cancelled: bool,
}

impl Progress {
    fn record(&mut self, result: &FrameResult, frame_size: usize) {
        self.frames += 1;
        if result.padded > 0 {
            self.padded += 1;
        }
        self.samples = result.offset + frame_size - result.padded;
    }
}

pub struct StreamingPipeline {
    config: AnalysisConfig,
    analyzer: SpectralAnalyzer,
    buffer: Arc<SpectrogramBuffer>,
    amplitudes: Vec<f32>,
    state: PipelineState,
}

impl StreamingPipeline {
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        let buffer = Arc::new(SpectrogramBuffer::new(config.max_columns));
        Self::with_buffer(config, buffer)
    }

    /// Build a pipeline that feeds an existing buffer.
    pub fn with_buffer(config: AnalysisConfig, buffer: Arc<SpectrogramBuffer>) -> Result<Self> {
        config.validate()?;
        let analyzer = SpectralAnalyzer::new(config.frame_size, config.window)?;
        Ok(Self {
            config,
            analyzer,
            buffer,
            amplitudes: Vec::new(),
            state: PipelineState::Idle,
        })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn buffer(&self) -> &Arc<SpectrogramBuffer> {
        &self.buffer
    }

    /// Amplitudes of the latest run, one per frame.
    pub fn amplitudes(&self) -> &[f32] {
        &self.amplitudes
    }

    pub fn take_amplitudes(&mut self) -> Vec<f32> {
        std::mem::take(&mut self.amplitudes)
    }

    /// Empty both sinks.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.amplitudes.clear();
    }

    /// Run to the end without a visitor or cancellation.
    pub fn run_all<S: SampleSource>(&mut self, source: S, analysis: Analysis) -> Result<RunReport> {
        self.run(source, analysis, &CancelToken::new(), &mut ())?
            .into_report()
    }

    /// Stream `source` through the analyzers.
    ///
    /// The amplitude list is reset at the start of each run. The spectrogram
    /// buffer is not: without a `clear()` in between, a second run appends
    /// and evicts behind the first one.
    pub fn run<S: SampleSource>(
        &mut self,
        source: S,
        analysis: Analysis,
        cancel: &CancelToken,
        visitor: &mut dyn FrameVisitor,
    ) -> Result<RunOutcome> {
        self.state = PipelineState::Running;
        self.amplitudes.clear();
        let started = Instant::now();

        let sample_rate = source.sample_rate();
        if sample_rate != self.config.sample_rate {
            log::warn!(
                "Stream is {}Hz, configured for {}Hz; using the stream rate",
                sample_rate,
                self.config.sample_rate
            );
        }
        log::debug!(
            "Run: frame={} hop={} window={:?} trailing={:?} parallel={} analysis={:?}",
            self.config.frame_size,
            self.config.hop_size,
            self.config.window,
            self.config.trailing,
            self.config.parallel,
            analysis
        );

        let result = FrameSource::from_config(source, &self.config).and_then(|frames| {
            if self.config.parallel {
                self.drive_batched(frames, analysis, cancel, visitor)
            } else {
                self.drive(frames, analysis, cancel, visitor)
            }
        });

        let progress = match result {
            Ok(progress) => progress,
            Err(e) => {
                self.state = PipelineState::Failed;
                log::warn!("Analysis failed: {}", e);
                return Err(e);
            }
        };

        if progress.cancelled {
            self.state = PipelineState::Cancelled;
            log::info!("Analysis cancelled after {} frames", progress.frames);
            return Ok(RunOutcome::Cancelled {
                frames: progress.frames,
            });
        }

        let report = RunReport {
            frames: progress.frames,
            columns: self.buffer.len(),
            padded_frames: progress.padded,
            samples: progress.samples,
            duration_secs: if sample_rate == 0 {
                0.0
            } else {
                progress.samples as f32 / sample_rate as f32
            },
            elapsed: started.elapsed(),
        };
        self.state = PipelineState::Completed;
        log::info!(
            "Analysis finished: {} frames, {} columns, {:.2}s of audio in {:.1}ms",
            report.frames,
            report.columns,
            report.duration_secs,
            report.elapsed.as_secs_f64() * 1000.0
        );
        visitor.on_finished(&report);
        Ok(RunOutcome::Completed(report))
    }

    fn drive<S: SampleSource>(
        &mut self,
        mut frames: FrameSource<S>,
        analysis: Analysis,
        cancel: &CancelToken,
        visitor: &mut dyn FrameVisitor,
    ) -> Result<Progress> {
        let mut progress = Progress::default();
        loop {
            if cancel.is_cancelled() {
                progress.cancelled = true;
                break;
            }
            let Some(frame) = frames.next() else { break };
            let result = process_frame(&self.analyzer, &frame?, analysis)?;
            progress.record(&result, self.config.frame_size);
            self.emit(result, visitor);
        }
        Ok(progress)
    }

    fn drive_batched<S: SampleSource>(
        &mut self,
        mut frames: FrameSource<S>,
        analysis: Analysis,
        cancel: &CancelToken,
        visitor: &mut dyn FrameVisitor,
    ) -> Result<Progress> {
        let mut progress = Progress::default();
        let mut batch: Vec<Frame> = Vec::with_capacity(self.config.batch_size);
        loop {
            if cancel.is_cancelled() {
                progress.cancelled = true;
                break;
            }

            batch.clear();
            let mut pending = None;
            for item in frames.by_ref().take(self.config.batch_size) {
                match item {
                    Ok(frame) => batch.push(frame),
                    Err(e) => {
                        pending = Some(e);
                        break;
                    }
                }
            }
            if batch.is_empty() && pending.is_none() {
                break;
            }

            // collect() on an indexed parallel iterator keeps frame order
            let analyzer = &self.analyzer;
            let results: Vec<Result<FrameResult>> = batch
                .par_iter()
                .map(|frame| process_frame(analyzer, frame, analysis))
                .collect();

            for result in results {
                // Frames analysed after the cancel are discarded
                if cancel.is_cancelled() {
                    progress.cancelled = true;
                    break;
                }
                let result = result?;
                progress.record(&result, self.config.frame_size);
                self.emit(result, visitor);
            }
            if progress.cancelled {
                break;
            }
            if let Some(e) = pending {
                return Err(e);
            }
        }
        Ok(progress)
    }

    fn emit(&mut self, result: FrameResult, visitor: &mut dyn FrameVisitor) {
        if let Some(amplitude) = result.amplitude {
            self.amplitudes.push(amplitude);
        }
        if let Some(ref spectrum) = result.spectrum {
            self.buffer.add_spectrum(spectrum.clone());
        }
        visitor.on_frame(&result);
    }
}

fn process_frame(analyzer: &SpectralAnalyzer, frame: &Frame, analysis: Analysis) -> Result<FrameResult> {
    let amplitude = analysis.waveform().then(|| AmplitudeTracker::amplitude(&frame.samples));
    let spectrum = if analysis.spectrogram() {
        Some(analyzer.analyze_frame(frame)?)
    } else {
        None
    };
    Ok(FrameResult {
        index: frame.index,
        offset: frame.offset,
        padded: frame.padded,
        amplitude,
        spectrum,
    })
}

/// Notifications from a background run, in emission order.
#[derive(Debug)]
pub enum PipelineEvent {
    Started,
    Amplitude { index: usize, value: f32 },
    ColumnAdded { index: usize },
    Finished(RunReport),
    Failed(Error),
    Cancelled { frames: usize },
}

impl PipelineEvent {
    /// True for the last event a run sends.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PipelineEvent::Finished(_) | PipelineEvent::Failed(_) | PipelineEvent::Cancelled { .. }
        )
    }
}

struct ChannelVisitor {
    tx: Sender<PipelineEvent>,
}

impl FrameVisitor for ChannelVisitor {
    fn on_frame(&mut self, result: &FrameResult) {
        // A dropped receiver just means nobody is listening any more.
        if let Some(value) = result.amplitude {
            let _ = self.tx.send(PipelineEvent::Amplitude {
                index: result.index,
                value,
            });
        }
        if result.spectrum.is_some() {
            let _ = self.tx.send(PipelineEvent::ColumnAdded {
                index: result.index,
            });
        }
    }
}

/// Handle to a run on a worker thread.
///
/// The owning thread drains `events()`; the pipeline comes back from
/// `join()` with whatever the run pushed into its sinks.
pub struct RunHandle {
    events: Receiver<PipelineEvent>,
    cancel: CancelToken,
    worker: JoinHandle<StreamingPipeline>,
}

impl RunHandle {
    pub fn events(&self) -> &Receiver<PipelineEvent> {
        &self.events
    }

    pub fn try_event(&self) -> Option<PipelineEvent> {
        self.events.try_recv().ok()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn join(self) -> Result<StreamingPipeline> {
        self.worker
            .join()
            .map_err(|_| Error::Worker("analysis thread panicked".into()))
    }
}

/// Run `pipeline` over `source` on a new thread.
pub fn spawn<S>(pipeline: StreamingPipeline, source: S, analysis: Analysis) -> Result<RunHandle>
where
    S: SampleSource + Send + 'static,
{
    spawn_with_cancel(pipeline, source, analysis, CancelToken::new())
}

/// Like [`spawn`], polling a caller-owned `cancel` token.
pub fn spawn_with_cancel<S>(
    mut pipeline: StreamingPipeline,
    source: S,
    analysis: Analysis,
    cancel: CancelToken,
) -> Result<RunHandle>
where
    S: SampleSource + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    let token = cancel.clone();

    let worker = thread::Builder::new()
        .name("psound-analysis".into())
        .spawn(move || {
            let _ = tx.send(PipelineEvent::Started);
            let mut visitor = ChannelVisitor { tx: tx.clone() };
            let last = match pipeline.run(source, analysis, &token, &mut visitor) {
                Ok(RunOutcome::Completed(report)) => PipelineEvent::Finished(report),
                Ok(RunOutcome::Cancelled { frames }) => PipelineEvent::Cancelled { frames },
                Err(e) => PipelineEvent::Failed(e),
            };
            let _ = tx.send(last);
            pipeline
        })
        .map_err(|e| Error::Worker(e.to_string()))?;

    Ok(RunHandle {
        events: rx,
        cancel,
        worker,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::analysis::WindowKind;
    use crate::audio::decode::MemorySource;
    use crate::audio::frames::TrailingFrame;

    fn config(frame_size: usize, hop_size: usize) -> AnalysisConfig {
        AnalysisConfig {
            frame_size,
            hop_size,
            ..Default::default()
        }
    }

    fn noise(len: usize) -> MemorySource {
        // Deterministic LCG
        let mut state = 0x1234_5678u32;
        let samples = (0..len)
            .map(|_| {
                state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                (state >> 16) as i16
            })
            .collect();
        MemorySource::new(samples, 44_100)
    }

    #[derive(Default)]
    struct Recorder {
        indices: Vec<usize>,
        finished: usize,
        cancel_after: Option<(usize, CancelToken)>,
    }

    impl FrameVisitor for Recorder {
        fn on_frame(&mut self, result: &FrameResult) {
            self.indices.push(result.index);
            if let Some((n, ref token)) = self.cancel_after {
                if self.indices.len() == n {
                    token.cancel();
                }
            }
        }

        fn on_finished(&mut self, _report: &RunReport) {
            self.finished += 1;
        }
    }

    struct Truncated {
        inner: MemorySource,
    }

    impl SampleSource for Truncated {
        fn read_samples(&mut self, buf: &mut [i16]) -> std::io::Result<usize> {
            match self.inner.read_samples(buf)? {
                0 => Err(std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "stream cut")),
                n => Ok(n),
            }
        }

        fn sample_rate(&self) -> u32 {
            44_100
        }
    }

    #[test]
    fn completes_and_reports_once() {
        let mut pipeline = StreamingPipeline::new(config(256, 128)).unwrap();
        assert_eq!(pipeline.state(), PipelineState::Idle);

        let mut recorder = Recorder::default();
        let outcome = pipeline
            .run(noise(4096), Analysis::Both, &CancelToken::new(), &mut recorder)
            .unwrap();

        let RunOutcome::Completed(report) = outcome else { panic!("expected completion") };
        assert_eq!(pipeline.state(), PipelineState::Completed);
        assert_eq!(report.frames, 31);
        assert_eq!(report.columns, 31);
        assert_eq!(report.padded_frames, 0);
        assert_eq!(report.samples, 4096);
        assert_eq!(recorder.finished, 1);
        assert_eq!(recorder.indices, (0..31).collect::<Vec<_>>());
        assert_eq!(pipeline.amplitudes().len(), 31);
    }

    #[test]
    fn waveform_only_leaves_buffer_alone() {
        let mut pipeline = StreamingPipeline::new(config(256, 128)).unwrap();
        let report = pipeline.run_all(noise(1024), Analysis::Waveform).unwrap();
        assert_eq!(report.frames, 7);
        assert!(pipeline.buffer().is_empty());
        assert_eq!(pipeline.amplitudes().len(), 7);

        let report = pipeline.run_all(noise(1024), Analysis::Spectrogram).unwrap();
        assert_eq!(report.columns, 7);
        assert!(pipeline.amplitudes().is_empty());
    }

    #[test]
    fn repeated_runs_append_until_cleared() {
        let cfg = AnalysisConfig {
            max_columns: 10,
            ..config(256, 256)
        };
        let mut pipeline = StreamingPipeline::new(cfg).unwrap();
        pipeline.run_all(noise(256 * 6), Analysis::Spectrogram).unwrap();
        assert_eq!(pipeline.buffer().len(), 6);
        pipeline.run_all(noise(256 * 6), Analysis::Spectrogram).unwrap();
        assert_eq!(pipeline.buffer().len(), 10);

        pipeline.clear();
        pipeline.run_all(noise(256 * 3), Analysis::Spectrogram).unwrap();
        assert_eq!(pipeline.buffer().len(), 3);
    }

    #[test]
    fn cancellation_stops_between_frames() {
        let mut pipeline = StreamingPipeline::new(config(256, 128)).unwrap();
        let token = CancelToken::new();
        let mut recorder = Recorder {
            cancel_after: Some((5, token.clone())),
            ..Default::default()
        };

        let outcome = pipeline
            .run(noise(8192), Analysis::Both, &token, &mut recorder)
            .unwrap();
        assert!(matches!(outcome, RunOutcome::Cancelled { frames: 5 }));
        assert_eq!(pipeline.state(), PipelineState::Cancelled);
        assert_eq!(pipeline.buffer().len(), 5);
        assert_eq!(recorder.finished, 0);
    }

    #[test]
    fn failure_keeps_partial_results() {
        let mut pipeline = StreamingPipeline::new(config(256, 256)).unwrap();
        let source = Truncated { inner: noise(256 * 4) };
        let err = pipeline
            .run(source, Analysis::Both, &CancelToken::new(), &mut ())
            .unwrap_err();
        assert!(matches!(err, Error::Acquisition(_)));
        assert_eq!(pipeline.state(), PipelineState::Failed);
        assert_eq!(pipeline.buffer().len(), 4);
        assert_eq!(pipeline.amplitudes().len(), 4);
    }

    #[test]
    fn batched_matches_sequential() {
        let base = AnalysisConfig {
            window: WindowKind::Hann,
            trailing: TrailingFrame::ZeroPad,
            batch_size: 7,
            ..config(512, 200)
        };
        let mut sequential = StreamingPipeline::new(base.clone()).unwrap();
        let mut batched = StreamingPipeline::new(AnalysisConfig { parallel: true, ..base }).unwrap();

        let a = sequential.run_all(noise(20_000), Analysis::Both).unwrap();
        let b = batched.run_all(noise(20_000), Analysis::Both).unwrap();
        assert_eq!(a.frames, b.frames);
        assert_eq!(a.padded_frames, 1);
        assert_eq!(sequential.amplitudes(), batched.amplitudes());

        let left = sequential.buffer().snapshot();
        let right = batched.buffer().snapshot();
        assert_eq!(left.len(), right.len());
        for (x, y) in left.iter().zip(right.iter()) {
            assert_eq!(&x[..], &y[..]);
        }
    }

    #[test]
    fn batched_failure_flushes_good_frames() {
        let cfg = AnalysisConfig {
            parallel: true,
            batch_size: 16,
            ..config(256, 256)
        };
        let mut pipeline = StreamingPipeline::new(cfg).unwrap();
        let err = pipeline
            .run(Truncated { inner: noise(256 * 3) }, Analysis::Spectrogram, &CancelToken::new(), &mut ())
            .unwrap_err();
        assert!(matches!(err, Error::Acquisition(_)));
        assert_eq!(pipeline.buffer().len(), 3);
    }

    #[test]
    fn rejects_invalid_config() {
        assert!(matches!(
            StreamingPipeline::new(config(1000, 500)),
            Err(Error::InvalidFrameSize(1000))
        ));
    }

    #[test]
    fn background_run_marshals_events() {
        let pipeline = StreamingPipeline::new(config(256, 128)).unwrap();
        let buffer = Arc::clone(pipeline.buffer());
        let handle = spawn(pipeline, noise(2048), Analysis::Both).unwrap();

        let mut columns = Vec::new();
        let mut amplitudes = 0;
        let mut finished = None;
        for event in handle.events().iter() {
            let done = event.is_terminal();
            match event {
                PipelineEvent::Started => assert!(columns.is_empty()),
                PipelineEvent::ColumnAdded { index } => columns.push(index),
                PipelineEvent::Amplitude { .. } => amplitudes += 1,
                PipelineEvent::Finished(report) => finished = Some(report),
                other => panic!("unexpected event {other:?}"),
            }
            if done {
                break;
            }
        }

        let report = finished.expect("run should finish");
        assert_eq!(report.frames, 15);
        assert_eq!(columns, (0..15).collect::<Vec<_>>());
        assert_eq!(amplitudes, 15);

        let pipeline = handle.join().unwrap();
        assert_eq!(pipeline.state(), PipelineState::Completed);
        assert_eq!(buffer.snapshot().len(), 15);
    }

    #[test]
    fn batched_cancellation_stops_between_frames() {
        let cfg = AnalysisConfig {
            parallel: true,
            ..config(256, 128)
        };
        assert_eq!(cfg.batch_size, 64);
        let mut pipeline = StreamingPipeline::new(cfg).unwrap();
        let token = CancelToken::new();
        let mut recorder = Recorder {
            cancel_after: Some((5, token.clone())),
            ..Default::default()
        };

        let outcome = pipeline
            .run(noise(20_000), Analysis::Both, &token, &mut recorder)
            .unwrap();
        assert!(matches!(outcome, RunOutcome::Cancelled { frames: 5 }));
        assert_eq!(pipeline.state(), PipelineState::Cancelled);
        assert_eq!(pipeline.buffer().len(), 5);
        assert_eq!(pipeline.amplitudes().len(), 5);
        assert_eq!(recorder.indices, vec![0, 1, 2, 3, 4]);
        assert_eq!(recorder.finished, 0);
    }

    #[test]
    fn cancelled_outcome_has_no_report() {
        let err = RunOutcome::Cancelled { frames: 3 }.into_report().unwrap_err();
        assert!(matches!(err, Error::Cancelled { frames: 3 }));
    }

    /// Never runs dry; only cancellation ends a run over it.
    struct Endless;

    impl SampleSource for Endless {
        fn read_samples(&mut self, buf: &mut [i16]) -> std::io::Result<usize> {
            buf.fill(1000);
            Ok(buf.len())
        }

        fn sample_rate(&self) -> u32 {
            44_100
        }
    }

    #[test]
    fn background_run_can_be_cancelled() {
        let pipeline = StreamingPipeline::new(config(256, 128)).unwrap();
        let handle = spawn(pipeline, Endless, Analysis::Spectrogram).unwrap();

        // Wait for the run to get going before cancelling it
        let first = handle.events().iter().find(|e| matches!(e, PipelineEvent::ColumnAdded { .. }));
        assert!(first.is_some());
        assert!(!handle.cancel_token().is_cancelled());
        handle.cancel();
        assert!(handle.cancel_token().is_cancelled());

        let frames = match handle.events().iter().find(PipelineEvent::is_terminal) {
            Some(PipelineEvent::Cancelled { frames }) => frames,
            other => panic!("expected cancellation, got {other:?}"),
        };
        assert!(frames >= 1);
        assert!(handle.try_event().is_none());

        let pipeline = handle.join().unwrap();
        assert_eq!(pipeline.state(), PipelineState::Cancelled);
        assert_eq!(pipeline.buffer().len(), frames.min(pipeline.config().max_columns));
    }

    #[test]
    fn pre_cancelled_background_run_emits_nothing() {
        let pipeline = StreamingPipeline::new(config(256, 128)).unwrap();
        let token = CancelToken::new();
        token.cancel();
        let handle = spawn_with_cancel(pipeline, noise(4096), Analysis::Both, token).unwrap();

        let events: Vec<_> = handle.events().iter().collect();
        assert!(matches!(events[0], PipelineEvent::Started));
        assert!(matches!(events[1], PipelineEvent::Cancelled { frames: 0 }));
        assert_eq!(events.len(), 2);

        let pipeline = handle.join().unwrap();
        assert_eq!(pipeline.state(), PipelineState::Cancelled);
        assert!(pipeline.buffer().is_empty());
        assert!(pipeline.amplitudes().is_empty());
    }
}
