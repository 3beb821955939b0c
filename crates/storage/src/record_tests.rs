// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn encode_put_uses_tab_separated_fields() {
    let line = encode(&Event::put("a", "1").with_sequence(7)).unwrap();
    assert_eq!(line, "7\t2\ta\t1\n");
}

#[test]
fn encode_delete_leaves_value_empty() {
    let line = encode(&Event::delete("a").with_sequence(3)).unwrap();
    assert_eq!(line, "3\t1\ta\t\n");
}

#[test]
fn encode_refuses_embedded_separator() {
    let err = encode(&Event::put("k", "has\ttab").with_sequence(1)).unwrap_err();
    assert_eq!(err, EventError::ReservedInValue("k".to_string()));
}

#[test]
fn decode_reads_back_encoded_line() {
    let event = Event::put("key with spaces", "value with spaces").with_sequence(12);
    let line = encode(&event).unwrap();
    assert_eq!(decode(&line).unwrap(), event);
}

#[test]
fn decode_delete_with_empty_value() {
    let event = decode("9\t1\tgone\t\n").unwrap();
    assert_eq!(event, Event::delete("gone").with_sequence(9));
}

#[parameterized(
    torn_write = { "4\t2\tk\tv", "torn write" },
    empty_line = { "\n", "empty record" },
    too_few_fields = { "4\t2\tk\n", "expected 4 fields" },
    bad_sequence = { "x\t2\tk\tv\n", "invalid sequence" },
    zero_sequence = { "0\t2\tk\tv\n", "sequence 0" },
    zero_type = { "4\t0\tk\tv\n", "invalid event type" },
    unknown_type = { "4\t9\tk\tv\n", "invalid event type" },
    text_type = { "4\tput\tk\tv\n", "invalid event type" },
    extra_field = { "4\t2\tk\tv\textra\n", "too many fields" },
    empty_key = { "4\t2\t\tv\n", "key is empty" },
    delete_with_value = { "4\t1\tk\tv\n", "carries a value" },
)]
fn decode_rejects_malformed_line(line: &str, reason: &str) {
    let err = decode(line).unwrap_err();
    assert!(err.contains(reason), "expected {reason:?} in {err:?}");
}
