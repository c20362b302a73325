//! Transaction decoder tests
//!
//! Bus traffic is built from the same events the GPIO handlers produce and
//! checked against the exact record text.

use esp32_i2c_sniffer::decoder::{Decoder, Phase, TraceFormat};
use esp32_i2c_sniffer::event::{byte_bits, EdgeEvent};
use esp32_i2c_sniffer::trace::{Direction, TraceSink};

/// Collects emitted lines, split on the terminator.
#[derive(Default)]
struct LineSink {
    lines: Vec<String>,
    pending: String,
    raw_writes: usize,
}

impl TraceSink for LineSink {
    type Error = ();

    fn write_raw(&mut self, bytes: &[u8]) -> Result<(), ()> {
        self.raw_writes += 1;
        self.pending.push_str(std::str::from_utf8(bytes).map_err(|_| ())?);
        while let Some(pos) = self.pending.find('\n') {
            let line: String = self.pending.drain(..=pos).collect();
            self.lines.push(line.trim_end_matches('\n').to_string());
        }
        Ok(())
    }
}

/// Sink that rejects every write.
struct BrokenSink;

impl TraceSink for BrokenSink {
    type Error = &'static str;

    fn write_raw(&mut self, _bytes: &[u8]) -> Result<(), Self::Error> {
        Err("disconnected")
    }
}

/// Events for one byte followed by its acknowledge bit.
fn byte_with_ack(byte: u8, nak: bool) -> impl Iterator<Item = EdgeEvent> {
    byte_bits(byte).chain(std::iter::once(EdgeEvent::bit(nak)))
}

/// START, address byte + ACK, data bytes each ACKed, STOP.
fn transaction(address: u8, read: bool, data: &[u8]) -> Vec<EdgeEvent> {
    let mut events = vec![EdgeEvent::START];
    events.extend(byte_with_ack((address << 1) | read as u8, false));
    for &byte in data {
        events.extend(byte_with_ack(byte, false));
    }
    events.push(EdgeEvent::STOP);
    events
}

fn feed_all<const D: usize>(decoder: &mut Decoder<D>, sink: &mut LineSink, events: &[EdgeEvent]) {
    for &event in events {
        decoder.feed(event, sink);
    }
}

#[test]
fn test_address_read_ack_prefix() {
    let mut decoder: Decoder = Decoder::new();
    let mut sink = LineSink::default();

    decoder.feed(EdgeEvent::START, &mut sink);
    // 0b0101000 + R
    for event in byte_with_ack(0b0101_0001, false) {
        decoder.feed(event, &mut sink);
    }

    assert_eq!(decoder.line(), "S,0x28,R,A");
    assert_eq!(decoder.address(), Some(0x28));
    assert_eq!(decoder.direction(), Some(Direction::Read));
    assert!(sink.lines.is_empty());
}

#[test]
fn test_data_byte_nak_is_not_encoded() {
    let mut decoder: Decoder = Decoder::new();
    let mut sink = LineSink::default();

    decoder.feed(EdgeEvent::START, &mut sink);
    for event in byte_with_ack(0x50, false).chain(byte_with_ack(0b1100_1010, true)) {
        decoder.feed(event, &mut sink);
    }

    assert_eq!(decoder.line(), "S,0x28,W,A,0xCA");
    assert_eq!(decoder.data(), &[0xCA]);
    assert_eq!(decoder.phase(), Phase::Data);
}

#[test]
fn test_complete_transaction_single_record() {
    let mut decoder: Decoder = Decoder::new();
    let mut sink = LineSink::default();

    feed_all(&mut decoder, &mut sink, &transaction(0x3C, false, &[0x00, 0xAF, 0x01]));

    assert_eq!(sink.lines, ["S,0x3C,W,A,0x00,0xAF,0x01,P"]);
    assert!(decoder.is_idle());
    assert_eq!(decoder.line(), "");
    assert_eq!(decoder.stats().completed, 1);
}

#[test]
fn test_address_nak() {
    let mut decoder: Decoder = Decoder::new();
    let mut sink = LineSink::default();

    decoder.feed(EdgeEvent::START, &mut sink);
    for event in byte_with_ack(0x77 << 1, true) {
        decoder.feed(event, &mut sink);
    }
    decoder.feed(EdgeEvent::STOP, &mut sink);

    assert_eq!(sink.lines, ["S,0x77,W,N,P"]);
}

#[test]
fn test_same_sequence_twice_gives_identical_records() {
    let mut decoder: Decoder = Decoder::new();
    let mut sink = LineSink::default();
    let events = transaction(0x68, true, &[0x12, 0x34]);

    feed_all(&mut decoder, &mut sink, &events);
    feed_all(&mut decoder, &mut sink, &events);

    assert_eq!(sink.lines.len(), 2);
    assert_eq!(sink.lines[0], sink.lines[1]);
    assert_eq!(sink.lines[0], "S,0x68,R,A,0x12,0x34,P");
}

#[test]
fn test_repeated_start_flushes_partial() {
    let mut decoder: Decoder = Decoder::new();
    let mut sink = LineSink::default();

    // Write register pointer, then repeated START for the read
    decoder.feed(EdgeEvent::START, &mut sink);
    for event in byte_with_ack(0x68 << 1, false).chain(byte_with_ack(0x75, false)) {
        decoder.feed(event, &mut sink);
    }
    feed_all(&mut decoder, &mut sink, &transaction(0x68, true, &[0x71]));

    assert_eq!(sink.lines, ["S,0x68,W,A,0x75", "S,0x68,R,A,0x71,P"]);
    assert_eq!(decoder.stats().partial, 1);
    assert_eq!(decoder.stats().completed, 1);
}

#[test]
fn test_start_mid_address_restarts_cleanly() {
    let mut decoder: Decoder = Decoder::new();
    let mut sink = LineSink::default();

    // Glitch: START, 3 address bits, then a real transaction
    decoder.feed(EdgeEvent::START, &mut sink);
    for event in byte_bits(0xFF).take(3) {
        decoder.feed(event, &mut sink);
    }
    feed_all(&mut decoder, &mut sink, &transaction(0x10, false, &[]));

    assert_eq!(sink.lines, ["S", "S,0x10,W,A,P"]);
}

#[test]
fn test_start_then_stop() {
    let mut decoder: Decoder = Decoder::new();
    let mut sink = LineSink::default();

    decoder.feed(EdgeEvent::START, &mut sink);
    decoder.feed(EdgeEvent::STOP, &mut sink);

    assert_eq!(sink.lines, ["S,P"]);
}

#[test]
fn test_idle_ignores_bits_and_stop() {
    let mut decoder: Decoder = Decoder::new();
    let mut sink = LineSink::default();

    // Joined mid-transfer: tail of a byte and a STOP
    for event in byte_bits(0xA5) {
        decoder.feed(event, &mut sink);
    }
    decoder.feed(EdgeEvent::STOP, &mut sink);

    assert!(sink.lines.is_empty());
    assert_eq!(sink.raw_writes, 0);
    assert!(decoder.is_idle());
    assert_eq!(decoder.stats().ignored, 9);

    // Still decodes the next transaction
    feed_all(&mut decoder, &mut sink, &transaction(0x20, false, &[0x01]));
    assert_eq!(sink.lines, ["S,0x20,W,A,0x01,P"]);
}

#[test]
fn test_capture_depth_boundary() {
    let mut decoder: Decoder<4> = Decoder::new();
    let mut sink = LineSink::default();

    feed_all(&mut decoder, &mut sink, &transaction(0x50, false, &[1, 2, 3, 4, 5]));

    assert_eq!(sink.lines, ["S,0x50,W,A,0x01,0x02,0x03,0x04,P"]);
    assert_eq!(decoder.stats().bytes_dropped, 1);
    assert_eq!(decoder.capture_depth(), 4);
}

#[test]
fn test_alignment_survives_dropped_bytes() {
    let mut decoder: Decoder<2> = Decoder::new();
    let mut sink = LineSink::default();

    feed_all(&mut decoder, &mut sink, &transaction(0x50, false, &[0xAA, 0xBB, 0xCC, 0xDD]));
    feed_all(&mut decoder, &mut sink, &transaction(0x51, true, &[0xEE]));

    assert_eq!(
        sink.lines,
        ["S,0x50,W,A,0xAA,0xBB,P", "S,0x51,R,A,0xEE,P"]
    );
    assert_eq!(decoder.stats().bytes_dropped, 2);
}

#[test]
fn test_full_depth_record_fits_line() {
    let mut decoder: Decoder = Decoder::with_format(TraceFormat { data_acks: true });
    let mut sink = LineSink::default();
    let data: Vec<u8> = (0..64).collect();

    feed_all(&mut decoder, &mut sink, &transaction(0x7F, true, &data));

    let line = &sink.lines[0];
    assert!(line.starts_with("S,0x7F,R,A,0x00,A,0x01,A"));
    assert!(line.ends_with(",0x3F,A,P"));
    assert_eq!(line.matches(",0x").count(), 65);
}

#[test]
fn test_data_acks_format() {
    let mut decoder: Decoder = Decoder::with_format(TraceFormat { data_acks: true });
    let mut sink = LineSink::default();

    decoder.feed(EdgeEvent::START, &mut sink);
    for event in byte_with_ack(0x28 << 1 | 1, false)
        .chain(byte_with_ack(0xCA, false))
        .chain(byte_with_ack(0x05, true))
    {
        decoder.feed(event, &mut sink);
    }
    decoder.feed(EdgeEvent::STOP, &mut sink);

    assert_eq!(sink.lines, ["S,0x28,R,A,0xCA,A,0x05,N,P"]);
}

#[test]
fn test_data_acks_skip_dropped_bytes() {
    let mut decoder: Decoder<1> = Decoder::with_format(TraceFormat { data_acks: true });
    let mut sink = LineSink::default();

    feed_all(&mut decoder, &mut sink, &transaction(0x11, false, &[0x01, 0x02]));

    assert_eq!(sink.lines, ["S,0x11,W,A,0x01,A,P"]);
}

#[test]
fn test_format_change_applies_at_next_start() {
    let mut decoder: Decoder = Decoder::new();
    let mut sink = LineSink::default();

    decoder.feed(EdgeEvent::START, &mut sink);
    decoder.set_format(TraceFormat { data_acks: true });
    for event in byte_with_ack(0x22 << 1, false).chain(byte_with_ack(0x99, false)) {
        decoder.feed(event, &mut sink);
    }
    decoder.feed(EdgeEvent::STOP, &mut sink);
    feed_all(&mut decoder, &mut sink, &transaction(0x22, false, &[0x99]));

    assert_eq!(sink.lines, ["S,0x22,W,A,0x99,P", "S,0x22,W,A,0x99,A,P"]);
}

#[test]
fn test_flush_at_shutdown() {
    let mut decoder: Decoder = Decoder::new();
    let mut sink = LineSink::default();

    decoder.feed(EdgeEvent::START, &mut sink);
    for event in byte_with_ack(0x40 << 1, false).chain(byte_with_ack(0x10, false)) {
        decoder.feed(event, &mut sink);
    }
    decoder.flush(&mut sink);
    // Nothing left: second flush is a no-op
    decoder.flush(&mut sink);

    assert_eq!(sink.lines, ["S,0x40,W,A,0x10"]);
    assert!(decoder.is_idle());
    assert_eq!(decoder.stats().partial, 1);
}

#[test]
fn test_sink_errors_do_not_corrupt_state() {
    let mut decoder: Decoder = Decoder::new();
    let mut broken = BrokenSink;

    for event in transaction(0x33, false, &[0x01]) {
        decoder.feed(event, &mut broken);
    }
    assert_eq!(decoder.stats().sink_errors, 1);
    assert!(decoder.is_idle());

    // Same decoder, working sink
    let mut sink = LineSink::default();
    feed_all(&mut decoder, &mut sink, &transaction(0x33, false, &[0x02]));
    assert_eq!(sink.lines, ["S,0x33,W,A,0x02,P"]);
}

#[test]
fn test_every_event_in_every_phase_is_total() {
    let events = [EdgeEvent::START, EdgeEvent::STOP, EdgeEvent::bit(false), EdgeEvent::bit(true)];

    // Drive into each phase, then apply each event kind
    let bare = transaction(0x01, false, &[]);
    let with_data = transaction(0x01, false, &[0xFF]);
    let prefixes: [&[EdgeEvent]; 5] = [
        &[],
        &bare[..1],
        &bare[..9],
        &bare[..10],
        &with_data[..18],
    ];

    for prefix in prefixes {
        for event in events {
            let mut decoder: Decoder<2> = Decoder::new();
            let mut sink = LineSink::default();
            feed_all(&mut decoder, &mut sink, prefix);
            decoder.feed(event, &mut sink);

            // Idle iff the line is empty
            assert_eq!(decoder.is_idle(), decoder.line().is_empty());
        }
    }
}
