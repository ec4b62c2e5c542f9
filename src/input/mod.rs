/// Contains the epoll code to read from the device when the worker thread is woken up by the
/// kernel upon new data to consume
pub mod ev;

/// Event type and code numbers of the kernel input protocol
pub mod ecodes;

/// Contains the code to decode protocol B multitouch events into tracked contacts
pub mod multitouch;

use evdev::raw::input_event;

/// The closed set of event types the decoder distinguishes.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum EventType {
    Syn,
    Key,
    Rel,
    Abs,
    Other(u16),
}

impl From<u16> for EventType {
    fn from(raw: u16) -> EventType {
        match raw {
            ecodes::EV_SYN => EventType::Syn,
            ecodes::EV_KEY => EventType::Key,
            ecodes::EV_REL => EventType::Rel,
            ecodes::EV_ABS => EventType::Abs,
            other => EventType::Other(other),
        }
    }
}

impl EventType {
    pub fn raw(self) -> u16 {
        match self {
            EventType::Syn => ecodes::EV_SYN,
            EventType::Key => ecodes::EV_KEY,
            EventType::Rel => ecodes::EV_REL,
            EventType::Abs => ecodes::EV_ABS,
            EventType::Other(raw) => raw,
        }
    }
}

/// A single `(type, code, value)` record as read from an evdev node.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct RawEvent {
    pub kind: EventType,
    pub code: u16,
    pub value: i32,
}

impl RawEvent {
    pub fn new(kind: EventType, code: u16, value: i32) -> RawEvent {
        RawEvent { kind, code, value }
    }

    pub fn abs(code: u16, value: i32) -> RawEvent {
        RawEvent::new(EventType::Abs, code, value)
    }

    pub fn syn(code: u16) -> RawEvent {
        RawEvent::new(EventType::Syn, code, 0)
    }
}

impl<'a> From<&'a input_event> for RawEvent {
    fn from(ev: &'a input_event) -> RawEvent {
        RawEvent::new(EventType::from(ev._type), ev.code, ev.value)
    }
}

impl std::fmt::Display for RawEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[type: {0} code: {1} value: {2}]",
            self.kind.raw(),
            self.code,
            self.value
        )
    }
}

/// What the reader thread hands over to the consumer.
#[derive(Debug, PartialEq, Clone)]
pub enum InputEvent {
    MultitouchEvent { event: multitouch::MultitouchEvent },
    /// The event source ended; no further events follow.
    Closed {},
}
