//! sub_master.rs — last-value-wins subscription map, one slot per topic
//!
//! Each tick `update()` drains whatever the source has buffered, overwrites
//! the matching slots and flags them fresh. Nothing blocks: a topic with no
//! new message simply stays stale.

use std::collections::BTreeMap;

use telemetry_types::{ControlsState, DeviceState, DriverStateV2, Message, ModelV2, RadarState, Topic, UiPlan};
use tokio::sync::mpsc;

// ── Message sources ───────────────────────────────────────────────────────────

/// Anything that can hand over the messages that arrived since the last poll.
pub trait MessageSource: Send {
    /// Must not block. Order within the batch is arrival order.
    fn poll(&mut self) -> Vec<Message>;
}

/// In-process transport: producers hold the paired `UnboundedSender`.
pub struct ChannelSource {
    rx: mpsc::UnboundedReceiver<Message>,
}

impl ChannelSource {
    pub fn new() -> (mpsc::UnboundedSender<Message>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { rx })
    }
}

impl MessageSource for ChannelSource {
    fn poll(&mut self) -> Vec<Message> {
        let mut out = Vec::new();
        while let Ok(msg) = self.rx.try_recv() {
            out.push(msg);
        }
        out
    }
}

/// Source with nothing to say. Used when the context is driven by `push()`.
#[derive(Debug, Default)]
pub struct NullSource;

impl MessageSource for NullSource {
    fn poll(&mut self) -> Vec<Message> {
        Vec::new()
    }
}

// ── Slots ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct TopicSlot {
    pub latest: Option<Message>,
    /// A message landed during the most recent `update()`
    pub updated: bool,
    /// Frame of the most recent message; 0 = never received
    pub rcv_frame: u64,
}

pub struct SubMaster {
    source: Box<dyn MessageSource>,
    slots: BTreeMap<Topic, TopicSlot>,
    pending: Vec<Message>,
    pub frame: u64,
}

impl SubMaster {
    pub fn new(source: Box<dyn MessageSource>) -> Self {
        let slots = Topic::ALL.iter().map(|t| (*t, TopicSlot::default())).collect();
        Self { source, slots, pending: Vec::new(), frame: 0 }
    }

    /// Queue a message for the next `update()`, bypassing the source.
    pub fn push(&mut self, msg: Message) {
        self.pending.push(msg);
    }

    /// Advance one frame and absorb everything that arrived since the last one.
    pub fn update(&mut self) {
        self.frame += 1;
        for slot in self.slots.values_mut() {
            slot.updated = false;
        }

        let mut incoming = std::mem::take(&mut self.pending);
        incoming.extend(self.source.poll());
        for msg in incoming {
            let slot = self.slots.entry(msg.topic()).or_default();
            slot.latest = Some(msg);
            slot.updated = true;
            slot.rcv_frame = self.frame;
        }
    }

    pub fn updated(&self, topic: Topic) -> bool {
        self.slots.get(&topic).is_some_and(|s| s.updated)
    }

    pub fn rcv_frame(&self, topic: Topic) -> u64 {
        self.slots.get(&topic).map_or(0, |s| s.rcv_frame)
    }

    /// Topics updated this frame, in `Topic` order.
    pub fn fresh(&self) -> impl Iterator<Item = (Topic, &Message)> + '_ {
        self.slots
            .iter()
            .filter(|(_, s)| s.updated)
            .filter_map(|(t, s)| s.latest.as_ref().map(|m| (*t, m)))
    }

    pub fn latest(&self, topic: Topic) -> Option<&Message> {
        self.slots.get(&topic).and_then(|s| s.latest.as_ref())
    }
}

macro_rules! typed_getters {
    ($($fn_name:ident => $variant:ident),* $(,)?) => {
        impl SubMaster {
            $(
                pub fn $fn_name(&self) -> Option<&$variant> {
                    match self.latest(Topic::$variant) {
                        Some(Message::$variant(m)) => Some(m),
                        _ => None,
                    }
                }
            )*
        }
    };
}

// topics read outside the sync pass; the rest are consumed through `fresh()`
typed_getters! {
    model_v2 => ModelV2,
    controls_state => ControlsState,
    radar_state => RadarState,
    device_state => DeviceState,
    driver_state_v2 => DriverStateV2,
    ui_plan => UiPlan,
}

#[cfg(test)]
mod tests {
    use super::*;
    use telemetry_types::{CarControl, CarParams};

    #[test]
    fn test_updated_flag_lasts_one_frame() {
        let mut sm = SubMaster::new(Box::new(NullSource));
        sm.push(Message::DeviceState(DeviceState { started: true }));
        sm.update();
        assert!(sm.updated(Topic::DeviceState));
        assert_eq!(sm.rcv_frame(Topic::DeviceState), 1);

        sm.update();
        assert!(!sm.updated(Topic::DeviceState));
        assert_eq!(sm.rcv_frame(Topic::DeviceState), 1);
        // snapshot survives
        assert_eq!(sm.device_state(), Some(&DeviceState { started: true }));
    }

    #[test]
    fn test_last_value_wins_within_a_frame() {
        let mut sm = SubMaster::new(Box::new(NullSource));
        sm.push(Message::DeviceState(DeviceState { started: true }));
        sm.push(Message::DeviceState(DeviceState { started: false }));
        sm.update();
        assert_eq!(sm.device_state(), Some(&DeviceState { started: false }));
        assert_eq!(sm.fresh().count(), 1);
    }

    #[test]
    fn test_fresh_iterates_in_topic_order() {
        let mut sm = SubMaster::new(Box::new(NullSource));
        sm.push(Message::CarControl(CarControl::default()));
        sm.push(Message::ControlsState(ControlsState::default()));
        sm.push(Message::CarParams(CarParams::default()));
        sm.update();
        let order: Vec<Topic> = sm.fresh().map(|(t, _)| t).collect();
        assert_eq!(order, vec![Topic::ControlsState, Topic::CarParams, Topic::CarControl]);
    }

    #[test]
    fn test_channel_source_drains_without_blocking() {
        let (tx, source) = ChannelSource::new();
        let mut sm = SubMaster::new(Box::new(source));
        sm.update();
        assert_eq!(sm.fresh().count(), 0);

        tx.send(Message::RadarState(RadarState::default())).unwrap();
        sm.update();
        assert!(sm.updated(Topic::RadarState));
        assert!(sm.model_v2().is_none());
    }
}
