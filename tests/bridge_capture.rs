mod common;

use std::sync::Arc;

use common::FakeTransport;
use framelink::transport::{CallbackStatus, Transport};
use framelink::types::{DEFAULT_FRAMES_PER_CALLBACK, DEFAULT_SAMPLE_RATE};
use framelink::{AudioBridge, Direction, StreamConfig, StreamState};

fn bridge_over(transport: &Arc<FakeTransport>) -> AudioBridge {
    AudioBridge::with_transport(Arc::clone(transport) as Arc<dyn Transport>)
}

/// One period of a recognizable pattern: sample k of period i is
/// (i * 10_000 + k) scaled down.
fn pattern(period: usize, samples: usize) -> Vec<f32> {
    (0..samples)
        .map(|k| (period * 10_000 + k) as f32 * 1e-6)
        .collect()
}

#[test]
fn ten_injected_periods_come_back_byte_for_byte() -> anyhow::Result<()> {
    common::init_tracing();
    let transport = FakeTransport::stereo_duplex();
    let mut bridge = bridge_over(&transport);

    let descriptor = bridge.input_devices()?[&0].clone();
    let mut config = StreamConfig::for_device(&descriptor, Direction::Capture);
    assert_eq!(config.sample_rate, DEFAULT_SAMPLE_RATE);
    assert_eq!(config.channels, 2);
    assert_eq!(config.frames_per_callback, DEFAULT_FRAMES_PER_CALLBACK);
    config.queue_capacity = 16;

    bridge.open_capture_stream_with(config.clone())?;
    bridge.start(Direction::Capture)?;

    let samples = config.samples_per_callback();
    for period in 0..10 {
        let status = transport.drive_capture(&pattern(period, samples));
        assert_eq!(status, CallbackStatus::Continue);
    }

    for period in 0..10 {
        let frame = bridge.poll_captured().expect("frame missing");
        assert_eq!(frame.samples(), &pattern(period, samples)[..]);
        bridge.release_captured(frame);
    }
    assert!(bridge.poll_captured().is_none());

    let metrics = bridge.metrics(Direction::Capture);
    assert_eq!(metrics.callbacks, 10);
    assert_eq!(metrics.overruns, 0);

    bridge.stop(Direction::Capture)?;
    bridge.close(Direction::Capture)?;
    Ok(())
}

#[test]
fn overflow_drops_newest_and_counts_each_rejection() {
    let transport = FakeTransport::stereo_duplex();
    let mut bridge = bridge_over(&transport);

    bridge.open_capture_stream(0).unwrap();
    bridge.start(Direction::Capture).unwrap();

    let capacity = bridge.config(Direction::Capture).unwrap().queue_capacity;
    let samples = bridge
        .config(Direction::Capture)
        .unwrap()
        .samples_per_callback();

    // Fill the queue, then keep going without the application draining.
    for period in 0..capacity + 3 {
        // Capture never self-terminates on backpressure.
        let status = transport.drive_capture(&pattern(period, samples));
        assert_eq!(status, CallbackStatus::Continue);
    }

    let metrics = bridge.metrics(Direction::Capture);
    assert_eq!(metrics.callbacks, (capacity + 3) as u64);
    assert_eq!(metrics.overruns, 3);

    // The oldest periods survived, in order.
    for period in 0..capacity {
        let frame = bridge.poll_captured().expect("frame missing");
        assert_eq!(frame.samples()[0], pattern(period, samples)[0]);
        bridge.release_captured(frame);
    }
    assert!(bridge.poll_captured().is_none());

    bridge.stop(Direction::Capture).unwrap();
    bridge.close(Direction::Capture).unwrap();
}

#[test]
fn close_releases_everything_still_queued() {
    let transport = FakeTransport::stereo_duplex();
    let mut bridge = bridge_over(&transport);

    bridge.open_capture_stream(0).unwrap();
    bridge.start(Direction::Capture).unwrap();

    let samples = bridge
        .config(Direction::Capture)
        .unwrap()
        .samples_per_callback();
    for period in 0..3 {
        transport.drive_capture(&pattern(period, samples));
    }

    bridge.stop(Direction::Capture).unwrap();
    bridge.close(Direction::Capture).unwrap();

    assert_eq!(bridge.state(Direction::Capture), StreamState::Closed);
    assert!(bridge.poll_captured().is_none());
    assert!(!transport.capture_open());

    // The slot is reusable after close.
    bridge.open_capture_stream(0).unwrap();
    bridge.start(Direction::Capture).unwrap();
    transport.drive_capture(&pattern(7, samples));
    let frame = bridge.poll_captured().expect("frame missing");
    assert_eq!(frame.samples()[0], pattern(7, samples)[0]);
    bridge.release_captured(frame);
    bridge.stop(Direction::Capture).unwrap();
    bridge.close(Direction::Capture).unwrap();
}

#[test]
fn dropping_frames_instead_of_releasing_starves_the_pool() {
    let transport = FakeTransport::stereo_duplex();
    let mut bridge = bridge_over(&transport);

    bridge.open_capture_stream(0).unwrap();
    bridge.start(Direction::Capture).unwrap();

    let capacity = bridge.config(Direction::Capture).unwrap().queue_capacity;
    let samples = bridge
        .config(Direction::Capture)
        .unwrap()
        .samples_per_callback();

    for period in 0..capacity {
        transport.drive_capture(&pattern(period, samples));
        // Dropped, never released back to the pool.
        drop(bridge.poll_captured().expect("frame missing"));
    }

    // Pool exhausted: every further period is an overrun.
    transport.drive_capture(&pattern(99, samples));
    assert_eq!(bridge.metrics(Direction::Capture).overruns, 1);

    bridge.stop(Direction::Capture).unwrap();
    bridge.close(Direction::Capture).unwrap();
}

#[test]
fn default_capture_device_resolution() {
    let transport = FakeTransport::new(vec![
        common::device(0, 0, 2),
        common::device(1, 2, 0),
    ]);
    let mut bridge = bridge_over(&transport);

    bridge.open_default_capture_stream().unwrap();
    assert_eq!(bridge.config(Direction::Capture).unwrap().device_id, 1);
    bridge.close(Direction::Capture).unwrap();
}
