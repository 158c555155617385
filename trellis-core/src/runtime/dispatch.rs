//! Event dispatch
//!
//! Events are taken off the queue one at a time. Each is resolved to its
//! device and listener, the listener's arguments are built from the
//! device's live state, and the script host runs the listener to
//! completion before the next event is looked at. Listeners get the
//! runtime back and may call any entry point, including ones that post
//! more events.

use crate::device::Listener;
use crate::driver::DriverRef;
use crate::event::{Event, EventKind};
use crate::stream::STREAM_BUFFER_SIZE;
use crate::value::Value;

use super::Runtime;

/// Largest map delivered as a `Data` payload
pub const MAX_MAP_SIZE: usize = 32;

/// The scripting environment listeners run in
pub trait ScriptHost {
    /// Run `listener` with `args`
    fn call(&mut self, runtime: &mut Runtime<'_>, listener: Listener, args: &[Value<'_>]);
}

impl Runtime<'_> {
    /// Deliver queued events to their listeners until the queue is empty
    ///
    /// Events posted by listeners during the call are delivered by the same
    /// call. Returns how many events were taken.
    pub fn dispatch<H: ScriptHost + ?Sized>(&mut self, host: &mut H) -> usize {
        let mut taken = 0;
        while let Some(event) = self.events.take() {
            taken += 1;
            self.deliver(event, host);
        }
        taken
    }

    /// One pass of the main loop: poll the hardware, then dispatch
    pub fn tick<H: ScriptHost + ?Sized>(&mut self, host: &mut H) -> usize {
        self.poll();
        self.dispatch(host)
    }

    fn deliver<H: ScriptHost + ?Sized>(&mut self, event: Event, host: &mut H) {
        let Ok(device) = self.pool.get(event.device) else {
            trace!("event {} for a released device", event.kind);
            return;
        };
        let Some(listener) = device.listener(event.kind) else {
            return;
        };

        match event.kind {
            EventKind::Error => {
                let code = device.error.unwrap_or(event.code);
                host.call(self, listener, &[Value::Int(i32::from(code))]);
            }
            EventKind::Data => match device.driver {
                DriverRef::Map(driver) => {
                    let instance = device.instance;
                    let full = driver.size(instance);
                    if full > MAX_MAP_SIZE {
                        warn!(
                            "map {} holds {} values, delivering {}",
                            event.device,
                            full,
                            MAX_MAP_SIZE
                        );
                    }
                    let size = full.min(MAX_MAP_SIZE);
                    let mut values = [Value::Null; MAX_MAP_SIZE];
                    for (offset, value) in values[..size].iter_mut().enumerate() {
                        *value = driver
                            .get(instance, offset)
                            .map_or(Value::Null, Value::Int);
                    }
                    host.call(self, listener, &[Value::Array(&values[..size])]);
                }
                DriverRef::Stream(_) => {
                    let Some(stream) = device.stream else {
                        return;
                    };
                    let mut buf = [0u8; STREAM_BUFFER_SIZE];
                    let taken = self.streams.drain_rx(stream, &mut buf, self.events);
                    self.flush_signals();
                    if taken > 0 {
                        host.call(self, listener, &[Value::Bytes(&buf[..taken])]);
                    }
                }
                DriverRef::Block(_) => {}
            },
            EventKind::Drain
            | EventKind::Ready
            | EventKind::Unpipe
            | EventKind::Finish
            | EventKind::End => host.call(self, listener, &[]),
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::vec::Vec;

    use crate::config::RuntimeConfig;
    use crate::device::{DeviceId, Listener};
    use crate::config::SlotValue;
    use crate::driver::{Category, DeviceDescriptor, DeviceDriver, DriverRef, MapDriver};
    use crate::event::{Event, EventKind, EventQueue};
    use crate::mock::{MockMap, MockStream};
    use crate::error::DeviceError;
    use crate::runtime::{Runtime, ScriptHost, MAX_MAP_SIZE};
    use crate::value::Value;

    static SERIAL: DeviceDescriptor = DeviceDescriptor::new("serial", 40, Category::Stream)
        .with_event_kinds(7)
        .with_buffer_size(8);
    static MAP: DeviceDescriptor = DeviceDescriptor::new("map", 41, Category::Map);

    const DATA: Listener = Listener(1);
    const DRAIN: Listener = Listener(2);
    const ERROR: Listener = Listener(3);

    #[derive(Debug, PartialEq)]
    enum Args {
        None,
        Code(i32),
        Bytes(Vec<u8>),
        Values(Vec<Option<i32>>),
    }

    #[derive(Default)]
    struct Recorder {
        calls: Vec<(Listener, Args)>,
        /// Bytes written back to the device on every Drain
        refill: Option<(DeviceId, &'static [u8])>,
    }

    impl ScriptHost for Recorder {
        fn call(&mut self, runtime: &mut Runtime<'_>, listener: Listener, args: &[Value<'_>]) {
            let args = match args {
                [] => Args::None,
                [Value::Int(code)] => Args::Code(*code),
                [Value::Bytes(bytes)] => Args::Bytes(bytes.to_vec()),
                [Value::Array(items)] => Args::Values(items.iter().map(Value::as_int).collect()),
                other => panic!("unexpected args {:?}", other),
            };
            if let (Args::None, Some((id, data))) = (&args, self.refill) {
                runtime.write(id, data).unwrap();
            }
            self.calls.push((listener, args));
        }
    }

    #[test]
    fn test_read_completion_delivers_bytes() {
        let events = EventQueue::new();
        let driver = MockStream::new();
        let mut rt = Runtime::new(&events, RuntimeConfig::default());
        rt.register(&SERIAL, DriverRef::Stream(&driver)).unwrap();
        let id = rt.request("serial".into(), 0).unwrap();
        rt.enable(id, None).unwrap();
        rt.listen(id, EventKind::Data, Some(DATA)).unwrap();

        let mut out = [0u8; 8];
        assert_eq!(rt.read(id, 5, &mut out), Ok(0));
        let mut host = Recorder::default();
        driver.feed(b"12345");
        rt.tick(&mut host);

        assert_eq!(host.calls, [(DATA, Args::Bytes(b"12345".to_vec()))]);
        assert_eq!(rt.stream_state(id).unwrap().rx_len, 0);
    }

    #[test]
    fn test_single_drain_after_short_write() {
        let events = EventQueue::new();
        let driver = MockStream::new();
        let mut rt = Runtime::new(&events, RuntimeConfig::default());
        rt.register(&SERIAL, DriverRef::Stream(&driver)).unwrap();
        let id = rt.request("serial".into(), 0).unwrap();
        rt.enable(id, None).unwrap();
        rt.listen(id, EventKind::Drain, Some(DRAIN)).unwrap();
        driver.send_limit.set(3);

        let accepted = rt.write(id, b"0123456789AB").unwrap();
        assert!(accepted < 12);
        assert!(rt.stream_state(id).unwrap().tx_blocked);

        let mut host = Recorder::default();
        for _ in 0..5 {
            rt.tick(&mut host);
        }
        assert_eq!(host.calls, [(DRAIN, Args::None)]);
        assert_eq!(driver.sent.borrow().as_slice(), b"01234567");
    }

    #[test]
    fn test_listener_can_write_back() {
        let events = EventQueue::new();
        let driver = MockStream::new();
        let mut rt = Runtime::new(&events, RuntimeConfig::default());
        rt.register(&SERIAL, DriverRef::Stream(&driver)).unwrap();
        let id = rt.request("serial".into(), 0).unwrap();
        rt.enable(id, None).unwrap();
        rt.listen(id, EventKind::Drain, Some(DRAIN)).unwrap();

        rt.write(id, b"abcdefghij").unwrap();
        let mut host = Recorder {
            refill: Some((id, b"xy")),
            ..Recorder::default()
        };
        rt.tick(&mut host);
        assert_eq!(host.calls.len(), 1);
        rt.tick(&mut host);
        assert_eq!(driver.sent.borrow().as_slice(), b"abcdefghxy");
    }

    #[test]
    fn test_map_data_carries_all_values() {
        let events = EventQueue::new();
        let driver = MockMap::new();
        let mut rt = Runtime::new(&events, RuntimeConfig::default());
        rt.register(&MAP, DriverRef::Map(&driver)).unwrap();
        let id = rt.request("map".into(), 0).unwrap();
        rt.enable(id, None).unwrap();
        rt.listen(id, EventKind::Data, Some(DATA)).unwrap();
        rt.map_set(id, 1, 5).unwrap();

        events.post(Event::data(id));
        let mut host = Recorder::default();
        assert_eq!(rt.dispatch(&mut host), 1);
        assert_eq!(
            host.calls,
            [(DATA, Args::Values([Some(0), Some(5), Some(0), Some(0)].to_vec()))]
        );
    }

    #[test]
    fn test_error_listener_gets_code() {
        let events = EventQueue::new();
        let driver = MockMap::new();
        let mut rt = Runtime::new(&events, RuntimeConfig::default());
        rt.register(&MAP, DriverRef::Map(&driver)).unwrap();
        let id = rt.request("map".into(), 0).unwrap();
        rt.enable(id, None).unwrap();
        rt.listen(id, EventKind::Error, Some(ERROR)).unwrap();

        driver.fault.set(Some(12));
        let mut host = Recorder::default();
        rt.tick(&mut host);
        assert_eq!(host.calls, [(ERROR, Args::Code(12))]);
    }

    #[test]
    fn test_stale_and_unlistened_events_dropped() {
        let events = EventQueue::new();
        let driver = MockMap::new();
        let mut rt = Runtime::new(&events, RuntimeConfig::default());
        rt.register(&MAP, DriverRef::Map(&driver)).unwrap();
        let id = rt.request("map".into(), 0).unwrap();
        rt.listen(id, EventKind::Data, Some(DATA)).unwrap();

        events.post(Event::new(EventKind::Drain, id, 0));
        rt.destroy(id).unwrap();
        events.post(Event::data(id));

        let mut host = Recorder::default();
        assert_eq!(rt.dispatch(&mut host), 2);
        assert!(host.calls.is_empty());
        assert!(events.is_empty());
    }

    /// Host whose Drain listener posts another Drain until `remaining` runs out
    struct Reposter {
        id: DeviceId,
        remaining: usize,
        calls: usize,
    }

    impl ScriptHost for Reposter {
        fn call(&mut self, runtime: &mut Runtime<'_>, _listener: Listener, _args: &[Value<'_>]) {
            self.calls += 1;
            if self.remaining > 0 {
                self.remaining -= 1;
                assert!(runtime.events.post(Event::new(EventKind::Drain, self.id, 0)));
            }
        }
    }

    #[test]
    fn test_dispatch_drains_reposted_events() {
        let events = EventQueue::new();
        let driver = MockMap::new();
        let mut rt = Runtime::new(&events, RuntimeConfig::default());
        rt.register(&MAP, DriverRef::Map(&driver)).unwrap();
        let id = rt.request("map".into(), 0).unwrap();
        rt.listen(id, EventKind::Drain, Some(DRAIN)).unwrap();

        for _ in 0..30 {
            events.post(Event::new(EventKind::Drain, id, 0));
        }
        let mut host = Reposter {
            id,
            remaining: 40,
            calls: 0,
        };
        assert_eq!(rt.dispatch(&mut host), 70);
        assert_eq!(host.calls, 70);
        assert!(events.is_empty());
    }

    #[test]
    fn test_latest_listener_fires() {
        let events = EventQueue::new();
        let driver = MockMap::new();
        let mut rt = Runtime::new(&events, RuntimeConfig::default());
        rt.register(&MAP, DriverRef::Map(&driver)).unwrap();
        let id = rt.request("map".into(), 0).unwrap();
        rt.enable(id, None).unwrap();

        let replacement = Listener(9);
        assert_eq!(rt.listen(id, EventKind::Data, Some(DATA)), Ok(None));
        assert_eq!(rt.listen(id, EventKind::Data, Some(replacement)), Ok(Some(DATA)));

        events.post(Event::data(id));
        let mut host = Recorder::default();
        rt.dispatch(&mut host);
        assert_eq!(host.calls.len(), 1);
        assert_eq!(host.calls[0].0, replacement);
    }

    /// Map wider than one `Data` payload; offset n reads n
    struct WideMap;

    impl DeviceDriver for WideMap {
        fn reset(&self, _instance: u8) {}

        fn commit(&self, _instance: u8, _slot: usize, _value: &SlotValue) -> Result<(), DeviceError> {
            Ok(())
        }
    }

    impl MapDriver for WideMap {
        fn get(&self, _instance: u8, offset: usize) -> Option<i32> {
            (offset < 40).then_some(offset as i32)
        }

        fn set(&self, _instance: u8, _offset: usize, _value: i32) -> bool {
            false
        }

        fn size(&self, _instance: u8) -> usize {
            40
        }
    }

    #[test]
    fn test_wide_map_payload_capped() {
        let events = EventQueue::new();
        let driver = WideMap;
        let mut rt = Runtime::new(&events, RuntimeConfig::default());
        rt.register(&MAP, DriverRef::Map(&driver)).unwrap();
        let id = rt.request("map".into(), 0).unwrap();
        rt.enable(id, None).unwrap();
        rt.listen(id, EventKind::Data, Some(DATA)).unwrap();

        events.post(Event::data(id));
        let mut host = Recorder::default();
        rt.dispatch(&mut host);
        let expected: Vec<Option<i32>> = (0..MAX_MAP_SIZE as i32).map(Some).collect();
        assert_eq!(host.calls, [(DATA, Args::Values(expected))]);
    }
}
