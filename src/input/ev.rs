use crate::input::multitouch::{ContactTracker, TrackerOptions};
use crate::input::{InputEvent, RawEvent};

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{SendError, Sender};
use std::sync::Arc;

/// Feeds every event to the tracker and forwards what it produces over `tx`.
/// This is the only way decoded reports leave the reading thread.
pub fn pump<I>(
    events: I,
    tracker: &mut ContactTracker,
    tx: &Sender<InputEvent>,
) -> Result<(), SendError<InputEvent>>
where
    I: IntoIterator<Item = RawEvent>,
{
    for ev in events {
        if let Some(event) = tracker.feed(&ev) {
            tx.send(InputEvent::MultitouchEvent { event })?;
        }
    }
    Ok(())
}

/// Opens the evdev node, turning the common failures into messages a user can act on.
fn open_device(path: &Path) -> io::Result<evdev::Device> {
    // evdev's open error carries no io::ErrorKind, a plain open classifies the common failures
    if let Err(e) = std::fs::File::open(path) {
        return Err(match e.kind() {
            io::ErrorKind::PermissionDenied => io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!(
                    "cannot open device {}: insufficient permissions",
                    path.display()
                ),
            ),
            kind => io::Error::new(
                kind,
                format!("cannot open device {}: {}", path.display(), e),
            ),
        });
    }
    evdev::Device::open(&path).map_err(|e| {
        io::Error::new(
            io::ErrorKind::Other,
            format!("cannot open device {}: {}", path.display(), e),
        )
    })
}

pub struct EvDevContext {
    path: PathBuf,
    options: TrackerOptions,
    pub tx: Sender<InputEvent>,
    exit_requested: Arc<AtomicBool>,
    exited: Arc<AtomicBool>,
    started: Arc<AtomicBool>,
}

impl EvDevContext {
    pub fn started(&self) -> bool {
        self.started.load(Ordering::Relaxed)
    }

    pub fn exited(&self) -> bool {
        self.exited.load(Ordering::Relaxed)
    }

    /// After exit is requested, there will be one more event read from the device before
    /// it is closed.
    pub fn exit_requested(&self) -> bool {
        self.exit_requested.load(Ordering::Relaxed)
    }

    pub fn stop(&mut self) {
        self.exit_requested.store(true, Ordering::Relaxed);
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn new<P: AsRef<Path>>(
        path: P,
        options: TrackerOptions,
        tx: Sender<InputEvent>,
    ) -> EvDevContext {
        EvDevContext {
            path: path.as_ref().to_path_buf(),
            options,
            tx,
            started: Arc::new(AtomicBool::new(false)),
            exit_requested: Arc::new(AtomicBool::new(false)),
            exited: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Opens the device and spawns the reading thread, which owns its own
    /// `ContactTracker`. Failing to open the device is fatal and returned here;
    /// errors on the running thread end it and are only logged.
    pub fn start(&mut self) -> io::Result<()> {
        let mut dev = open_device(&self.path)?;

        let mut v = vec![epoll::Event {
            events: (epoll::Events::EPOLLET | epoll::Events::EPOLLIN | epoll::Events::EPOLLPRI)
                .bits(),
            data: 0,
        }];
        let epfd = epoll::create(false)?;
        if let Err(e) = epoll::ctl(epfd, epoll::ControlOptions::EPOLL_CTL_ADD, dev.fd(), v[0]) {
            if let Err(close_err) = epoll::close(epfd) {
                warn!("Failed to close epoll fd: {}", close_err);
            }
            return Err(e);
        }

        info!("Init complete for {:?}", self.path);

        self.started.store(true, Ordering::Relaxed);
        self.exited.store(false, Ordering::Relaxed);
        self.exit_requested.store(false, Ordering::Relaxed);

        let exit_req = Arc::clone(&self.exit_requested);
        let exited = Arc::clone(&self.exited);
        let path = self.path.clone();
        let options = self.options;
        let tx = self.tx.clone();
        let _ = std::thread::spawn(move || {
            let mut tracker = ContactTracker::new(options);
            while !exit_req.load(Ordering::Relaxed) {
                // -1 indefinite wait, stop() takes effect after the next batch
                let res = match epoll::wait(epfd, -1, &mut v[0..1]) {
                    Ok(res) => res,
                    Err(err) => {
                        warn!("epoll_wait failed: {}", err);
                        continue;
                    }
                };
                if res != 1 {
                    warn!("epoll_wait returned {0}", res);
                }

                let events = match dev.events_no_sync() {
                    Ok(events) => events,
                    Err(e) => {
                        error!("Error while reading events from {:?}: {}", path, e);
                        break;
                    }
                };

                start_bench!(stopwatch, decode_batch);
                let sent = pump(
                    events.into_iter().map(|ev| RawEvent::from(&ev)),
                    &mut tracker,
                    &tx,
                );
                end_bench!(decode_batch);

                if let Err(e) = sent {
                    error!("Failed to write InputEvent into the channel: {}", e);
                    break;
                }
            }

            if let Err(e) = epoll::close(epfd) {
                warn!("Failed to close epoll fd: {}", e);
            }
            if tx.send(InputEvent::Closed {}).is_err() {
                debug!("Consumer of {:?} is already gone", path);
            }
            exited.store(true, Ordering::Relaxed);
            info!("Stopped reading {:?}", path);
        });
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::input::ecodes::*;
    use crate::input::multitouch::{Finger, MultitouchEvent};
    use std::sync::mpsc::channel;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn pump_hands_reports_to_another_thread() {
        init_logger();
        let (tx, rx) = channel::<InputEvent>();
        let events = vec![
            RawEvent::abs(ABS_MT_SLOT, 0),
            RawEvent::abs(ABS_MT_TRACKING_ID, 5),
            RawEvent::abs(ABS_MT_POSITION_X, 100),
            RawEvent::abs(ABS_MT_POSITION_Y, 200),
            RawEvent::syn(SYN_REPORT),
            RawEvent::syn(SYN_DROPPED),
        ];
        let reader = std::thread::spawn(move || {
            let mut tracker = ContactTracker::default();
            pump(events, &mut tracker, &tx)
        });

        let received: Vec<InputEvent> = rx.iter().collect();
        assert!(reader.join().unwrap().is_ok());
        assert_eq!(
            received,
            vec![
                InputEvent::MultitouchEvent {
                    event: MultitouchEvent::Report {
                        fingers: vec![Finger {
                            id: 5,
                            x: 100,
                            y: 200,
                            dx: 0,
                            dy: 0,
                            pressure: 0,
                        }],
                    },
                },
                InputEvent::MultitouchEvent {
                    event: MultitouchEvent::Dropped,
                },
            ]
        );
    }

    #[test]
    fn pump_fails_once_the_consumer_is_gone() {
        init_logger();
        let (tx, rx) = channel::<InputEvent>();
        drop(rx);
        let mut tracker = ContactTracker::default();
        let events = vec![
            RawEvent::abs(ABS_MT_TRACKING_ID, 1),
            RawEvent::syn(SYN_REPORT),
        ];
        assert!(pump(events, &mut tracker, &tx).is_err());
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn missing_device_is_a_startup_error() {
        init_logger();
        let (tx, _rx) = channel::<InputEvent>();
        let mut ctx = EvDevContext::new(
            "/nonexistent/input/event99",
            TrackerOptions::default(),
            tx,
        );
        let err = ctx.start().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(err.to_string().starts_with("cannot open device"));
        assert!(!ctx.started());
        assert!(!ctx.exited());
    }

    #[test]
    fn unreadable_device_reports_insufficient_permissions() {
        use std::os::unix::fs::PermissionsExt;

        init_logger();
        let path = std::env::temp_dir().join(format!(
            "libfingertrack-unreadable-{}",
            std::process::id()
        ));
        std::fs::write(&path, b"").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o000)).unwrap();

        // Privileged users (root) can open it anyway
        if std::fs::File::open(&path).is_ok() {
            std::fs::remove_file(&path).unwrap();
            return;
        }

        let (tx, _rx) = channel::<InputEvent>();
        let mut ctx = EvDevContext::new(&path, TrackerOptions::default(), tx);
        let err = ctx.start().unwrap_err();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
        assert_eq!(
            err.to_string(),
            format!(
                "cannot open device {}: insufficient permissions",
                path.display()
            )
        );
        assert!(!ctx.started());
    }
}
