use fxhash::FxHashMap;

use super::ecodes;
use super::{EventType, RawEvent};

/// Index of a hardware multitouch slot, as carried by `ABS_MT_SLOT`
pub type Slot = i32;

/// Kernel-assigned identity of one contact for its whole touch-down lifetime
pub type TrackingId = i32;

/// What to do when `ABS_MT_SLOT` selects a slot that has no tracking ID yet.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum UnresolvedSlot {
    /// Forget the current tracking ID. Position and pressure events are dropped
    /// until the next `ABS_MT_TRACKING_ID`.
    Reset,
    /// Keep routing events to the previously current tracking ID.
    Keep,
}

impl Default for UnresolvedSlot {
    fn default() -> Self {
        UnresolvedSlot::Reset
    }
}

#[derive(Debug, Default, PartialEq, Eq, Copy, Clone)]
pub struct TrackerOptions {
    pub unresolved_slot: UnresolvedSlot,
}

/// Last known state of a contact, in raw device units.
#[derive(Debug, Default, PartialEq, Eq, Copy, Clone)]
pub struct Contact {
    pub x: i32,
    pub y: i32,
    pub pressure: i32,
}

/// One entry of a report. `dx` and `dy` are always 0; velocity is not derived.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct Finger {
    pub id: TrackingId,
    pub x: i32,
    pub y: i32,
    pub dx: i32,
    pub dy: i32,
    pub pressure: i32,
}

#[derive(Debug, PartialEq, Clone)]
pub enum MultitouchEvent {
    /// All contacts down as of a `SYN_REPORT`, in no particular order
    Report { fingers: Vec<Finger> },
    /// The kernel reported `SYN_DROPPED`: events were lost and the tracked
    /// state may be stale until the contacts are reported again.
    Dropped,
}

/// The `(type, code)` pairs the tracker acts upon.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
enum Decoded {
    Slot(Slot),
    TrackingId(TrackingId),
    PositionX(i32),
    PositionY(i32),
    Pressure(i32),
    Report,
    Dropped,
    Ignored,
}

fn decode(ev: &RawEvent) -> Decoded {
    match (ev.kind, ev.code) {
        (EventType::Abs, ecodes::ABS_MT_SLOT) => Decoded::Slot(ev.value),
        (EventType::Abs, ecodes::ABS_MT_TRACKING_ID) => Decoded::TrackingId(ev.value),
        (EventType::Abs, ecodes::ABS_MT_POSITION_X) => Decoded::PositionX(ev.value),
        (EventType::Abs, ecodes::ABS_MT_POSITION_Y) => Decoded::PositionY(ev.value),
        (EventType::Abs, ecodes::ABS_PRESSURE) => Decoded::Pressure(ev.value),
        (EventType::Syn, ecodes::SYN_REPORT) => Decoded::Report,
        (EventType::Syn, ecodes::SYN_DROPPED) => Decoded::Dropped,
        _ => Decoded::Ignored,
    }
}

/// Follows the protocol B slot cursor and keeps one `Contact` per live tracking ID.
///
/// Within a report cycle the kernel sends, for each contact that changed, an
/// optional `ABS_MT_SLOT`, an optional `ABS_MT_TRACKING_ID` and then the changed
/// axes. Axis events always apply to the tracking ID currently selected.
/// Slot 0 is selected until the first `ABS_MT_SLOT` arrives.
pub struct ContactTracker {
    options: TrackerOptions,
    current_slot: Slot,
    current_tracking_id: Option<TrackingId>,
    slots: FxHashMap<Slot, TrackingId>,
    contacts: FxHashMap<TrackingId, Contact>,
}

impl ::std::default::Default for ContactTracker {
    fn default() -> Self {
        ContactTracker::new(TrackerOptions::default())
    }
}

impl ContactTracker {
    pub fn new(options: TrackerOptions) -> ContactTracker {
        ContactTracker {
            options,
            current_slot: 0,
            current_tracking_id: None,
            slots: FxHashMap::default(),
            contacts: FxHashMap::default(),
        }
    }

    pub fn options(&self) -> TrackerOptions {
        self.options
    }

    /// Consumes one event. Returns the report on `SYN_REPORT` and the overrun
    /// notice on `SYN_DROPPED`; every other event only updates the state.
    /// Malformed or out of order input is never an error.
    pub fn feed(&mut self, ev: &RawEvent) -> Option<MultitouchEvent> {
        trace!("{}", ev);
        match decode(ev) {
            Decoded::Slot(slot) => {
                self.select_slot(slot);
                None
            }
            Decoded::TrackingId(ecodes::TRACKING_ID_LIFTED) => {
                self.lift();
                None
            }
            Decoded::TrackingId(id) => {
                self.touch_down(id);
                None
            }
            Decoded::PositionX(x) => {
                if let Some(contact) = self.current_contact_mut() {
                    contact.x = x;
                }
                None
            }
            Decoded::PositionY(y) => {
                if let Some(contact) = self.current_contact_mut() {
                    contact.y = y;
                }
                None
            }
            // ABS_PRESSURE is not authoritative for liveness, 0 means nothing here
            Decoded::Pressure(0) => None,
            Decoded::Pressure(pressure) => {
                if let Some(contact) = self.current_contact_mut() {
                    contact.pressure = pressure;
                }
                None
            }
            Decoded::Report => Some(MultitouchEvent::Report {
                fingers: self.snapshot(),
            }),
            Decoded::Dropped => {
                warn!(
                    "SYN_DROPPED received with {} contact(s) down, state may be stale",
                    self.contacts.len()
                );
                Some(MultitouchEvent::Dropped)
            }
            Decoded::Ignored => None,
        }
    }

    fn select_slot(&mut self, slot: Slot) {
        self.current_slot = slot;
        match self.slots.get(&slot) {
            Some(&id) => self.current_tracking_id = Some(id),
            None => {
                debug!("slot {} has no tracking ID yet", slot);
                if self.options.unresolved_slot == UnresolvedSlot::Reset {
                    self.current_tracking_id = None;
                }
            }
        }
    }

    fn touch_down(&mut self, id: TrackingId) {
        self.current_tracking_id = Some(id);
        self.slots.insert(self.current_slot, id);
        self.contacts.entry(id).or_insert_with(Contact::default);
    }

    fn lift(&mut self) {
        if let Some(id) = self.current_tracking_id {
            self.contacts.remove(&id);
        }
        self.slots.remove(&self.current_slot);
    }

    fn current_contact_mut(&mut self) -> Option<&mut Contact> {
        let id = match self.current_tracking_id {
            Some(id) => id,
            None => {
                debug!("no tracking ID selected in slot {}", self.current_slot);
                return None;
            }
        };
        self.contacts.get_mut(&id).or_else(|| {
            debug!("tracking ID {} is already gone", id);
            None
        })
    }

    /// The contacts currently down, as they would be reported now.
    pub fn snapshot(&self) -> Vec<Finger> {
        self.contacts
            .iter()
            .map(|(&id, contact)| {
                debug!("Finger {} at {:?}", id, contact);
                Finger {
                    id,
                    x: contact.x,
                    y: contact.y,
                    dx: 0,
                    dy: 0,
                    pressure: contact.pressure,
                }
            })
            .collect()
    }

    pub fn current_slot(&self) -> Slot {
        self.current_slot
    }

    pub fn current_tracking_id(&self) -> Option<TrackingId> {
        self.current_tracking_id
    }

    pub fn tracking_id_for_slot(&self, slot: Slot) -> Option<TrackingId> {
        self.slots.get(&slot).copied()
    }

    pub fn contact(&self, id: TrackingId) -> Option<&Contact> {
        self.contacts.get(&id)
    }

    pub fn contacts(&self) -> impl Iterator<Item = (TrackingId, &Contact)> {
        self.contacts.iter().map(|(&id, contact)| (id, contact))
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    /// Forget every contact and go back to slot 0, keeping the options.
    pub fn reset(&mut self) {
        self.current_slot = 0;
        self.current_tracking_id = None;
        self.slots.clear();
        self.contacts.clear();
    }
}
