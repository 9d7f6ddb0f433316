//! Binary entry point: wires C1-C12 together and runs the pipeline
//! until interrupted (spec.md §5, SPEC_FULL.md §A "Graceful shutdown").

use clap::Parser;
use log::LevelFilter;
use tokio_util::sync::CancellationToken;
use voice_core::audio::{CaptureConfig, CaptureSource};
use voice_core::cloud::{CloudClient, CloudClientConfig};
use voice_core::config::{ApiConfig, PipelineConfig};
use voice_core::device_state::DeviceStateStore;
use voice_core::dsp::{DspConfig, DspFrontEnd};
use voice_core::dsp::vad::VadConfig;
use voice_core::led::{LedDriver, LedProjector, NullLedDriver};
use voice_core::metrics::Metrics;
use voice_core::playback::PlaybackDriver;
use voice_core::scheduler::{Scheduler, SchedulerConfig};
use voice_core::segment::{SegmentBatcher, SegmentBatcherConfig, UtteranceSink};
use voice_core::tools::ToolExecutor;
use voice_core::wake_sink::WakeSink;
use std::sync::Arc;

#[cfg(feature = "led_ring")]
fn build_led_driver() -> Box<dyn LedDriver + Send> {
    match voice_core::led::usb_ring::UsbLedRing::new() {
        Ok(driver) => Box::new(driver),
        Err(e) => {
            log::warn!("main: USB LED ring unavailable ({e}), using null driver");
            Box::new(NullLedDriver)
        }
    }
}

#[cfg(not(feature = "led_ring"))]
fn build_led_driver() -> Box<dyn LedDriver + Send> {
    Box::new(NullLedDriver)
}

impl LedDriver for Box<dyn LedDriver + Send> {
    fn show_pattern(&mut self, pattern: voice_core::led::LedPattern) -> Result<(), voice_core::led::LedError> {
        (**self).show_pattern(pattern)
    }
    fn flash(&mut self, pattern: voice_core::led::LedPattern) -> Result<(), voice_core::led::LedError> {
        (**self).flash(pattern)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = PipelineConfig::parse();

    let level = if config.verbose { LevelFilter::Debug } else { LevelFilter::Info };
    env_logger::Builder::new().filter_level(level).parse_default_env().init();

    if config.list_devices {
        for name in voice_core::audio::capture::list_input_devices()? {
            println!("{name}");
        }
        return Ok(());
    }

    if config.dump_device_state {
        let device_state = DeviceStateStore::new();
        println!("{}", device_state.canonical_string());
        return Ok(());
    }

    config.validate()?;

    if config.dev_mode {
        match voice_core::audio::capture::list_input_devices() {
            Ok(devices) => log::info!(
                "dev-mode: {} input device(s) available, using {:?}",
                devices.len(),
                config.device.clone().unwrap_or_else(|| "default".to_string())
            ),
            Err(e) => log::warn!("dev-mode: could not enumerate input devices: {e}"),
        }
    }

    let api = ApiConfig::load().map_err(|e| {
        log::error!("main: failed to load API credentials: {e}");
        e
    })?;

    let metrics = Arc::new(Metrics::new());
    let device_state = Arc::new(DeviceStateStore::new());
    let tools = Arc::new(ToolExecutor::new(device_state.clone()));
    let playback = Arc::new(PlaybackDriver::new());

    let cloud = Arc::new(CloudClient::new(
        CloudClientConfig::default(),
        api.stt_key().to_string(),
        api.llm_key().to_string(),
        api.tts_key().to_string(),
    ));

    let led_driver = build_led_driver();
    let led_projector = LedProjector::new(led_driver);

    let scheduler = Arc::new(Scheduler::new(
        SchedulerConfig {
            wake_word: config.wake_word.clone(),
            tts_voice: config.tts_voice.clone(),
        },
        cloud,
        tools,
        device_state,
        playback,
        led_projector,
        metrics.clone(),
    ));

    let (utterance_tx, utterance_rx) = tokio::sync::mpsc::channel(1);
    let (wake_tx, wake_rx) = tokio::sync::mpsc::channel(8);

    let shutdown = CancellationToken::new();

    let capture_task = spawn_capture_task(&config, utterance_tx, wake_tx, metrics.clone(), shutdown.clone());
    let scheduler_task = tokio::spawn(scheduler.run(utterance_rx, wake_rx, shutdown.clone()));
    let metrics_task = spawn_metrics_logger(metrics, config.metrics_interval(), shutdown.clone());

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            log::info!("main: received ctrl-c, shutting down");
            shutdown.cancel();
        }
        _ = shutdown.cancelled() => {}
    }

    let _ = tokio::join!(capture_task, scheduler_task, metrics_task);
    Ok(())
}

fn spawn_capture_task(
    config: &PipelineConfig,
    utterance_tx: tokio::sync::mpsc::Sender<voice_core::types::Utterance>,
    wake_tx: tokio::sync::mpsc::Sender<voice_core::wake_sink::WakeEvent>,
    metrics: Arc<Metrics>,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    let sample_rate = config.sample_rate_hz;
    let vad_threshold = config.vad_threshold;
    let wake_cooldown_ms = config.wake_cooldown_ms;
    let skip_wake_word = config.skip_wake_word;
    let enable_wakenet_local = config.enable_wakenet_local;
    let wakenet_model = config.wakenet_model.clone();
    let wakenet_threshold = config.wakenet_threshold;
    let device = config.device.clone();
    let min_samples = config.min_utterance_samples();
    let max_samples = config.max_utterance_samples();

    tokio::spawn(async move {
        let capture = match CaptureSource::start(CaptureConfig {
            device_name: device,
            sample_rate,
            channels: 1,
            frame_samples: 1_280,
            underflow_timeout: std::time::Duration::from_secs(2),
        }) {
            Ok(c) => c,
            Err(e) => {
                log::error!("capture/DSP task: fatal capture error: {e}");
                return;
            }
        };

        let mut dsp = match DspFrontEnd::new(DspConfig {
            channels: 1,
            sample_rate,
            feed_chunksize: 1_280,
            vad: VadConfig {
                energy_threshold: vad_threshold,
                ..VadConfig::default()
            },
            wake_cooldown_ms,
            wakeword_enabled: !skip_wake_word,
            wakeword_model_path: if enable_wakenet_local {
                Some(std::path::PathBuf::from(&wakenet_model))
            } else {
                None
            },
            wakeword_confidence_threshold: wakenet_threshold,
        }) {
            Ok(d) => d,
            Err(e) => {
                log::error!("capture/DSP task: fatal DSP config error: {e}");
                return;
            }
        };

        let mut batcher = SegmentBatcher::new(SegmentBatcherConfig {
            min_utterance_samples: min_samples,
            max_utterance_samples: max_samples,
        });
        let sink = UtteranceSink::new(utterance_tx, metrics.clone());
        let mut wake_sink = WakeSink::new(wake_cooldown_ms, wake_tx);

        // Busy/Underflow are transient (another reader mid-call, a
        // momentary stall); a run of consecutive DriverErrors means the
        // codec itself is gone, which is Fatal per spec.md §7 and must
        // kill this task and propagate shutdown rather than spin forever
        // logging warnings.
        const MAX_CONSECUTIVE_DRIVER_ERRORS: u32 = 5;
        let mut consecutive_driver_errors = 0u32;

        loop {
            if shutdown.is_cancelled() {
                break;
            }
            match capture.next_frame().await {
                Ok(frame) => {
                    consecutive_driver_errors = 0;
                    if dsp.feed(frame).is_err() {
                        continue;
                    }
                    while let Some(enhanced) = dsp.fetch() {
                        if let Some(index) = enhanced.wakeword_index {
                            wake_sink.notify(index);
                        }
                        if let Some(utterance) = batcher.push(&enhanced) {
                            sink.publish(utterance);
                        }
                    }
                }
                Err(e @ voice_core::audio::CaptureError::DriverError(_)) => {
                    consecutive_driver_errors += 1;
                    metrics.incr_capture_gaps();
                    if consecutive_driver_errors >= MAX_CONSECUTIVE_DRIVER_ERRORS {
                        log::error!(
                            "capture/DSP task: fatal capture error, {consecutive_driver_errors} consecutive failures: {e}"
                        );
                        shutdown.cancel();
                        break;
                    }
                    log::warn!("capture/DSP task: {e}");
                }
                Err(e) => {
                    consecutive_driver_errors = 0;
                    log::warn!("capture/DSP task: {e}");
                    metrics.incr_capture_gaps();
                }
            }
        }
    })
}

fn spawn_metrics_logger(
    metrics: Arc<Metrics>,
    interval: std::time::Duration,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let snapshot = metrics.snapshot();
                    log::info!("metrics: {}", serde_json::to_string(&snapshot).unwrap_or_default());
                }
            }
        }
    })
}
