//! Protocol invariants checked over generated inputs.

use proptest::prelude::*;

use uci_core::buffer::Fp;
use uci_core::fira::anchor::AnchorLocation;
use uci_core::framing::{encode_packet, fragments, FrameDecoder, MessageType, Pbf};
use uci_core::registry::EnumMembers;
use uci_core::tlv::{tlvs_from_bytes, LengthPolicy, ParamTable, TlvValue};

fn any_mt() -> impl Strategy<Value = MessageType> {
    prop_oneof![
        Just(MessageType::Response),
        Just(MessageType::Notification),
    ]
}

proptest! {
    // Framing round-trip for any control packet that can lead a stream
    #[test]
    fn framing_round_trip(
        mt in any_mt(),
        gid in 0u8..=0x0F,
        oid in 0u8..=0x3F,
        payload in proptest::collection::vec(any::<u8>(), 0..=250),
    ) {
        let packet = encode_packet(mt, Pbf::Final, gid, oid, &payload).unwrap();
        let mut decoder = FrameDecoder::new();
        let decoded = decoder.push(&packet);
        prop_assert_eq!(decoded.len(), 1);
        let p = &decoded[0];
        prop_assert_eq!(p.mt, mt);
        prop_assert_eq!(p.pbf, Pbf::Final);
        prop_assert_eq!((p.gid, p.oid), (gid, oid));
        prop_assert_eq!(&p.payload, &payload);
    }

    // Fragment payloads concatenate back to the original, all but the last
    // flagged NotFinal
    #[test]
    fn fragmentation_preserves_payload(payload in proptest::collection::vec(any::<u8>(), 0..65536)) {
        let parts = fragments(&payload);
        let rebuilt: Vec<u8> = parts.iter().flat_map(|(_, chunk)| chunk.iter().copied()).collect();
        prop_assert_eq!(&rebuilt, &payload);
        for (i, (pbf, chunk)) in parts.iter().enumerate() {
            if i + 1 == parts.len() {
                prop_assert_eq!(*pbf, Pbf::Final);
            } else {
                prop_assert_eq!(*pbf, Pbf::NotFinal);
                prop_assert_eq!(chunk.len(), 250);
            }
        }
    }

    // A garbage prefix whose top nibbles avoid {4,5,6,7} never costs a packet
    #[test]
    fn resynchronization_drops_garbage_prefix(
        garbage in proptest::collection::vec(
            any::<u8>().prop_filter("not a sync nibble", |b| !matches!(b >> 4, 4..=7)),
            0..=16,
        ),
        payloads in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..16), 1..4),
    ) {
        let mut stream = garbage.clone();
        for payload in &payloads {
            stream.extend_from_slice(
                &encode_packet(MessageType::Response, Pbf::Final, 1, 2, payload).unwrap(),
            );
        }
        let mut decoder = FrameDecoder::new();
        let decoded = decoder.push(&stream);
        prop_assert_eq!(decoded.len(), payloads.len());
        for (packet, payload) in decoded.iter().zip(&payloads) {
            prop_assert_eq!(&packet.payload, payload);
        }
    }

    // Unknown tags never abort a TLV decode
    #[test]
    fn unknown_tags_are_preserved(
        items in proptest::collection::vec(
            (any::<u8>(), proptest::collection::vec(any::<u8>(), 1..8)),
            0..8,
        ),
    ) {
        // Empty table: every tag is unknown, every wire length is accepted
        let table = ParamTable::new("empty", &[]);
        let mut payload = vec![items.len() as u8];
        for (tag, value) in &items {
            payload.push(*tag);
            payload.push(value.len() as u8);
            payload.extend_from_slice(value);
        }
        let tlvs = tlvs_from_bytes(&table, &payload).unwrap();
        prop_assert_eq!(tlvs.len(), items.len());
        for (tlv, (tag, _)) in tlvs.iter().zip(&items) {
            prop_assert_eq!(tlv.tag, *tag);
            prop_assert!(!tlv.known);
        }
    }

    // A declared-length table still reports every item, flagging unknowns
    #[test]
    fn mixed_known_unknown_tags(unknown_tag in 0x80u8..=0xFF, value in any::<u16>()) {
        let table = ParamTable::new("one", &[(0x06, LengthPolicy::Fixed(2))]);
        let payload = vec![
            0x02,
            0x06, 0x02, (value & 0xFF) as u8, (value >> 8) as u8,
            unknown_tag, 0x01, 0x2A,
        ];
        let tlvs = tlvs_from_bytes(&table, &payload).unwrap();
        prop_assert_eq!(tlvs.len(), 2);
        prop_assert!(tlvs[0].known);
        prop_assert_eq!(tlvs[0].value.clone(), TlvValue::Uint(value as u64));
        prop_assert!(!tlvs[1].known);
    }

    // Once synchronized, command and data packets round-trip as well
    #[test]
    fn framing_round_trip_after_sync(
        mt in prop_oneof![Just(MessageType::Command), Just(MessageType::DataPacket)],
        gid in 0u8..=0x0F,
        oid in 0u8..=0x3F,
        payload in proptest::collection::vec(any::<u8>(), 0..=250),
    ) {
        let mut stream = encode_packet(MessageType::Response, Pbf::Final, 0, 0, &[]).unwrap();
        stream.extend_from_slice(&encode_packet(mt, Pbf::Final, gid, oid, &payload).unwrap());
        let mut decoder = FrameDecoder::new();
        let decoded = decoder.push(&stream);
        prop_assert_eq!(decoded.len(), 2);
        let p = &decoded[1];
        prop_assert_eq!(p.mt, mt);
        prop_assert_eq!((p.gid, p.oid), (gid, oid));
        prop_assert_eq!(&p.payload, &payload);
    }

    // Fixed-point round trip at the precisions the protocol uses. The
    // constructor bounds the natural value by the integer bits, so the
    // generated raw range stops at 255 * 128.
    #[test]
    fn fp_round_trip_q8_7(raw in -32768i32..=32640) {
        let v = raw as f64 / 128.0;
        let fp = Fp::from_float(v, true, 8, 7).unwrap();
        prop_assert_eq!(fp.as_float(), v);
    }

    #[test]
    fn fp_round_trip_q7_1(raw in any::<u8>()) {
        let v = raw as f64 / 2.0;
        let fp = Fp::from_float(v, false, 7, 1).unwrap();
        prop_assert_eq!(fp.as_float(), v);
    }

    #[test]
    fn fp_rejects_out_of_domain(v in 0.1f64..1e6) {
        // Negative input for an unsigned field
        prop_assert!(Fp::from_float(-v, false, 7, 1).is_err());
        // Magnitude beyond the integer bits
        prop_assert!(Fp::from_float(256.0 + v, true, 8, 7).is_err());
    }

    // Extending an open enum never disturbs existing members; duplicate
    // names and values are rejected
    #[test]
    fn enum_extension_is_conservative(
        base in proptest::collection::btree_map("[a-z]{3,8}", 0u8..=255, 1..6),
        extra_value in 0u8..=255,
    ) {
        let mut members = EnumMembers::default();
        let mut values_seen = std::collections::BTreeSet::new();
        let mut inserted = Vec::new();
        for (name, value) in &base {
            if values_seen.insert(*value) {
                members.extend_with("Test", name, *value).unwrap();
                inserted.push((name.clone(), *value));
            }
        }
        // Duplicate names and duplicate values are both rejected
        if let Some((name, value)) = inserted.first() {
            prop_assert!(members.extend_with("Test", name, extra_value).is_err());
            prop_assert!(members.extend_with("Test", "fresh_name", *value).is_err());
        }
        // Originals unchanged
        for (name, value) in &inserted {
            prop_assert_eq!(members.value_of(name), Some(*value));
            prop_assert_eq!(members.name_of(*value), Some(name.as_str()));
        }
    }

    // WGS-84 anchor encode/decode round trip within the Q-format precision
    #[test]
    fn wgs84_anchor_round_trip(
        lat in -90.0f64..=90.0,
        lon in -180.0f64..=180.0,
        alt in -256.0f64..=255.0,
    ) {
        let loc = AnchorLocation::Wgs84 {
            latitude: lat,
            longitude: lon,
            altitude: alt,
        };
        let bytes = loc.encode().unwrap();
        let AnchorLocation::Wgs84 { latitude, longitude, altitude } =
            AnchorLocation::decode_wgs84(&bytes).unwrap()
        else {
            return Err(TestCaseError::fail("wrong coordinate form"));
        };
        let eps_deg = 1.0 / (1u64 << 24) as f64;
        let eps_m = 1.0 / (1u64 << 21) as f64;
        prop_assert!((latitude - lat).abs() <= eps_deg);
        prop_assert!((longitude - lon).abs() <= eps_deg);
        prop_assert!((altitude - alt).abs() <= eps_m);
    }

    #[test]
    fn relative_anchor_round_trip(
        x in -(1i32 << 27)..(1i32 << 27),
        y in -(1i32 << 27)..(1i32 << 27),
        z in -(1i32 << 23)..(1i32 << 23),
    ) {
        let loc = AnchorLocation::Relative { x, y, z };
        let bytes = loc.encode().unwrap();
        prop_assert_eq!(AnchorLocation::decode_relative(&bytes).unwrap(), loc);
    }
}
