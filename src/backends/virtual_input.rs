use crate::device::{Candidate, DeviceProvider, TouchDevice};
use crate::event::{
    Axis, AxisRange, Capabilities, RawEvent, ABS_MT_POSITION_X, ABS_MT_POSITION_Y, BTN_TOUCH,
    SYN_REPORT,
};
use std::collections::VecDeque;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// One scripted outcome of a `wait_readable` + `read_events` pair.
#[derive(Clone, Debug)]
pub enum Step {
    /// Nothing arrives before the timeout.
    Idle,
    /// These events are pending.
    Events(Vec<RawEvent>),
    /// The device is unplugged: the next read fails with `ENODEV`.
    Lost,
    /// The read fails with an unrelated error.
    Fail(io::ErrorKind),
}

type Script = Arc<Mutex<VecDeque<Step>>>;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|p| p.into_inner())
}

/// A scripted touch device.
///
/// Steps are consumed one per `wait_readable`; an exhausted script behaves as
/// an idle panel. Use [`VirtualTouch::script`] to keep feeding a device after
/// it has been handed to the poller.
pub struct VirtualTouch {
    path: String,
    name: String,
    caps: Capabilities,
    range: Option<AxisRange>,
    script: Script,
    current: Option<Step>,
    grab_error: bool,
    grabs: Arc<AtomicUsize>,
    realtime: bool,
}

impl VirtualTouch {
    pub fn new(path: &str, name: &str, caps: Capabilities) -> Self {
        Self {
            path: path.to_string(),
            name: name.to_string(),
            caps,
            range: Some(AxisRange { min: 0, max: 4095 }),
            script: Arc::new(Mutex::new(VecDeque::new())),
            current: None,
            grab_error: false,
            grabs: Arc::new(AtomicUsize::new(0)),
            realtime: false,
        }
    }

    /// A multitouch panel with the usual 12-bit range.
    pub fn panel(path: &str, name: &str) -> Self {
        let caps = Capabilities { multitouch: true, touch_button: true, abs_position: true };
        Self::new(path, name, caps)
    }

    pub fn with_range(mut self, range: Option<AxisRange>) -> Self {
        self.range = range;
        self
    }

    /// Make `grab()` fail with `EBUSY`.
    pub fn with_grab_error(mut self) -> Self {
        self.grab_error = true;
        self
    }

    /// Actually sleep through idle timeouts (for demos, not tests).
    pub fn with_realtime(mut self, realtime: bool) -> Self {
        self.realtime = realtime;
        self
    }

    /// Shared handle to the step queue and grab counter.
    pub fn script(&self) -> ScriptHandle {
        ScriptHandle {
            steps: Arc::clone(&self.script),
            grabs: Arc::clone(&self.grabs),
        }
    }

    pub fn push(&self, step: Step) {
        lock(&self.script).push_back(step);
    }
}

/// Feeds steps into a [`VirtualTouch`] it no longer owns.
#[derive(Clone)]
pub struct ScriptHandle {
    steps: Script,
    grabs: Arc<AtomicUsize>,
}

impl ScriptHandle {
    pub fn push(&self, step: Step) {
        lock(&self.steps).push_back(step);
    }

    /// Queue one complete report: position, touch state, `SYN_REPORT`.
    pub fn touch(&self, x: i32, y: i32, pressed: bool) {
        self.push(Step::Events(report(x, y, pressed)));
    }

    pub fn pending(&self) -> usize {
        lock(&self.steps).len()
    }

    /// Successful `grab()` calls on the device so far.
    pub fn grab_count(&self) -> usize {
        self.grabs.load(Ordering::SeqCst)
    }
}

/// Events for one complete multitouch report.
pub fn report(x: i32, y: i32, pressed: bool) -> Vec<RawEvent> {
    vec![
        RawEvent::Abs { code: ABS_MT_POSITION_X, value: x },
        RawEvent::Abs { code: ABS_MT_POSITION_Y, value: y },
        RawEvent::Key { code: BTN_TOUCH, value: i32::from(pressed) },
        RawEvent::Sync { code: SYN_REPORT },
    ]
}

impl TouchDevice for VirtualTouch {
    fn name(&self) -> &str {
        &self.name
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn capabilities(&self) -> Capabilities {
        self.caps
    }

    fn axis_range(&self, _axis: Axis) -> Option<AxisRange> {
        self.range
    }

    fn grab(&mut self) -> io::Result<()> {
        if self.grab_error {
            return Err(io::Error::from_raw_os_error(16));
        }
        self.grabs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn wait_readable(&mut self, timeout: Duration) -> io::Result<bool> {
        let step = lock(&self.script).pop_front().unwrap_or(Step::Idle);
        match step {
            Step::Idle => {
                if self.realtime {
                    std::thread::sleep(timeout);
                }
                Ok(false)
            }
            other => {
                self.current = Some(other);
                Ok(true)
            }
        }
    }

    fn read_events(&mut self) -> io::Result<Vec<RawEvent>> {
        match self.current.take() {
            Some(Step::Events(events)) => Ok(events),
            Some(Step::Lost) => Err(io::Error::from_raw_os_error(19)),
            Some(Step::Fail(kind)) => Err(io::Error::new(kind, "scripted failure")),
            Some(Step::Idle) | None => {
                Err(io::Error::new(io::ErrorKind::WouldBlock, "no pending events"))
            }
        }
    }
}

enum Slot {
    Device(VirtualTouch),
    Failure(PathBuf, io::ErrorKind),
}

#[derive(Default)]
struct ProviderState {
    slots: Vec<Slot>,
    scans: usize,
}

/// Hands out scripted devices.
///
/// Each pushed device is returned by exactly one `enumerate` call, which models
/// a panel being plugged in once. Clones share state, so a test can keep a
/// handle after moving the provider into a poller.
#[derive(Clone, Default)]
pub struct VirtualProvider {
    state: Arc<Mutex<ProviderState>>,
}

impl VirtualProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, device: VirtualTouch) {
        lock(&self.state).slots.push(Slot::Device(device));
    }

    /// A node that exists but fails to open.
    pub fn push_failure(&self, path: &str, kind: io::ErrorKind) {
        lock(&self.state).slots.push(Slot::Failure(PathBuf::from(path), kind));
    }

    /// Number of `enumerate` calls so far.
    pub fn scan_count(&self) -> usize {
        lock(&self.state).scans
    }
}

impl DeviceProvider for VirtualProvider {
    fn enumerate(&mut self) -> Vec<Candidate> {
        let mut state = lock(&self.state);
        state.scans += 1;
        state
            .slots
            .drain(..)
            .map(|slot| match slot {
                Slot::Device(dev) => Candidate {
                    path: PathBuf::from(&dev.path),
                    device: Ok(Box::new(dev) as Box<dyn TouchDevice>),
                },
                Slot::Failure(path, kind) => Candidate {
                    path,
                    device: Err(io::Error::new(kind, "open failed")),
                },
            })
            .collect()
    }
}

/// A provider with one realtime panel that traces a diagonal drag, then idles.
pub fn create_demo_provider() -> VirtualProvider {
    let dev = VirtualTouch::panel("virtual:0", "Virtual Touch Panel").with_realtime(true);
    let script = dev.script();
    for i in 0..=40 {
        script.touch(i * 100, i * 100, true);
        script.push(Step::Idle);
    }
    script.touch(4000, 4000, false);

    let provider = VirtualProvider::new();
    provider.push(dev);
    provider
}
