use std::time::{Duration, Instant};

use touchlink::backends::virtual_input::{Step, VirtualProvider, VirtualTouch};
use touchlink::ipc::FrameReader;
use touchlink::{channel, Config, Poller, SampleReceiver, TouchSample};

/// Drain until `pred` holds for the newest sample or the deadline passes.
fn wait_for(rx: &mut SampleReceiver, pred: impl Fn(&TouchSample) -> bool) -> Option<TouchSample> {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if let Some(s) = rx.drain_latest() {
            if pred(&s) {
                return Some(s);
            }
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    None
}

#[test]
fn touch_reaches_consumer_and_unplug_releases() {
    let provider = VirtualProvider::new();
    provider.push(VirtualTouch::new(
        "/dev/input/event0",
        "Sony Wireless Controller",
        touchlink::Capabilities { multitouch: true, touch_button: true, abs_position: true },
    ));
    let panel = VirtualTouch::panel("/dev/input/event1", "Generic Touch Panel");
    let script = panel.script();
    script.touch(2048, 2048, true);
    provider.push(panel);

    let (tx, mut rx) = channel();
    let handle = Poller::new(&Config::default(), Box::new(provider.clone()), tx)
        .spawn()
        .unwrap();

    let pressed = wait_for(&mut rx, |s| s.pressed).expect("pressed sample");
    assert!((pressed.x - 512).abs() <= 1);
    assert!((pressed.y - 300).abs() <= 1);
    assert!(pressed.latency_ms >= 0.0);

    script.push(Step::Lost);
    let lost = wait_for(&mut rx, |s| s.is_sentinel()).expect("sentinel after unplug");
    assert!(!lost.pressed);
    assert_eq!(lost.latency_ms, -1.0);

    drop(rx);
    handle.join().unwrap().unwrap();
}

#[test]
fn poller_without_device_keeps_emitting_sentinels() {
    let provider = VirtualProvider::new();
    let mut cfg = Config::default();
    cfg.poll.idle_sleep_ms = 1;

    let (tx, mut rx) = channel();
    let handle = Poller::new(&cfg, Box::new(provider.clone()), tx).spawn().unwrap();

    for _ in 0..3 {
        let s = wait_for(&mut rx, |s| s.is_sentinel()).expect("sentinel");
        assert!(!s.pressed);
    }
    // Nothing plugged in: only the initial scan ran within the backoff window.
    assert_eq!(provider.scan_count(), 1);

    drop(rx);
    handle.join().unwrap().unwrap();
}

#[cfg(unix)]
#[test]
fn samples_cross_a_byte_stream() {
    use std::os::unix::net::UnixStream;
    use touchlink::ipc::FrameWriter;

    let (a, b) = UnixStream::pair().unwrap();
    b.set_nonblocking(true).unwrap();

    let provider = VirtualProvider::new();
    let panel = VirtualTouch::panel("/dev/input/event2", "USB Touchscreen");
    panel.script().touch(4095, 0, true);
    provider.push(panel);

    let mut poller = Poller::new(&Config::default(), Box::new(provider), FrameWriter::new(a));
    for _ in 0..10 {
        poller.step().unwrap();
    }

    let mut reader = FrameReader::new(b);
    let latest = reader.drain_latest().unwrap().expect("a frame");
    assert!(latest.pressed);
    assert_eq!((latest.x, latest.y), (1024, 0));
    assert!(reader.drain_latest().unwrap().is_none());
}
