//! Scriptable fakes shared by the device and payment-flow tests.
use std::{
    io,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use crate::device::{DeviceError, DeviceHandle, DeviceLink, DeviceManager, LinkOpener};

#[derive(Debug, Default)]
pub(crate) struct LinkScript {
    pub fail_discovery: bool,
    pub fail_open: bool,
    pub fail_write: bool,
    pub fail_flush: bool,
}

/// A [`LinkOpener`] whose behaviour is driven by a shared [`LinkScript`], so tests can break the
/// link mid-run and watch the manager recover.
#[derive(Debug, Clone)]
pub(crate) struct ScriptedOpener {
    script: Arc<Mutex<LinkScript>>,
    writes: Arc<Mutex<Vec<Vec<u8>>>>,
    flushes: Arc<AtomicUsize>,
    opened: Arc<Mutex<Vec<String>>>,
}

impl ScriptedOpener {
    pub fn working() -> Self {
        Self {
            script: Arc::new(Mutex::new(LinkScript::default())),
            writes: Arc::new(Mutex::new(Vec::new())),
            flushes: Arc::new(AtomicUsize::new(0)),
            opened: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn no_device() -> Self {
        let opener = Self::working();
        opener.script.lock().unwrap().fail_discovery = true;
        opener
    }

    pub fn script(&self) -> Arc<Mutex<LinkScript>> {
        Arc::clone(&self.script)
    }

    pub fn writes(&self) -> Arc<Mutex<Vec<Vec<u8>>>> {
        Arc::clone(&self.writes)
    }

    pub fn flushes(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.flushes)
    }

    pub fn opened_paths(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.opened)
    }
}

impl LinkOpener for ScriptedOpener {
    type Link = ScriptedLink;

    fn discover(&self) -> Result<String, DeviceError> {
        if self.script.lock().unwrap().fail_discovery {
            Err(DeviceError::NoDeviceFound)
        } else {
            Ok("/dev/tty.usbmodem-sim".to_string())
        }
    }

    fn open(&self, path: &str) -> Result<Self::Link, DeviceError> {
        if self.script.lock().unwrap().fail_open {
            return Err(DeviceError::OpenFailed(path.to_string()));
        }
        self.opened.lock().unwrap().push(path.to_string());
        Ok(ScriptedLink {
            script: Arc::clone(&self.script),
            writes: Arc::clone(&self.writes),
            flushes: Arc::clone(&self.flushes),
        })
    }
}

#[derive(Debug)]
pub(crate) struct ScriptedLink {
    script: Arc<Mutex<LinkScript>>,
    writes: Arc<Mutex<Vec<Vec<u8>>>>,
    flushes: Arc<AtomicUsize>,
}

impl DeviceLink for ScriptedLink {
    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        if self.script.lock().unwrap().fail_write {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "scripted write failure"));
        }
        self.writes.lock().unwrap().push(data.to_vec());
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.script.lock().unwrap().fail_flush {
            return Err(io::Error::new(io::ErrorKind::Other, "scripted flush failure"));
        }
        self.flushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A working scripted device, spawned and ready: returns the handle and the captured writes
/// (which include the open-sequence test pulse).
pub(crate) fn spawn_device() -> (DeviceHandle, Arc<Mutex<Vec<Vec<u8>>>>) {
    let opener = ScriptedOpener::working();
    let writes = opener.writes();
    let (manager, handle) = DeviceManager::new(opener, None);
    manager
        .with_probe_interval(Duration::from_millis(10))
        .with_settle_delay(Duration::ZERO)
        .spawn();
    (handle, writes)
}

/// A device with no hardware attached; every payload fails with `NotConnected`.
pub(crate) fn spawn_dead_device() -> DeviceHandle {
    let (manager, handle) = DeviceManager::new(ScriptedOpener::no_device(), None);
    manager
        .with_probe_interval(Duration::from_millis(10))
        .with_settle_delay(Duration::ZERO)
        .spawn();
    handle
}
