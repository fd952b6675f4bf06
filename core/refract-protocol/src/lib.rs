#![no_std] // Frames travel to consumers without std

extern crate alloc;

// `std` only adds `std::error::Error` for `CodecError`.
#[cfg(any(feature = "std", test))]
extern crate std;

pub mod codec;
pub mod ids;
pub mod model;

pub use codec::{decode_records, encode_records, CodecError};
pub use ids::{FrameId, SentenceId, TokenId};
pub use model::{Frame, FrameBatch, Slot};

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::{String, ToString};
    use alloc::vec;
    use alloc::vec::Vec;
    use proptest::prelude::*;
    use rkyv::{from_bytes, to_bytes};

    fn chase_frame() -> Frame {
        Frame::with_slots(
            FrameId(7),
            vec![
                Slot::new("VERB", "chase", false),
                Slot::new("SBJ", "cat", false),
                Slot::new("OBJ", "Rex", true),
            ],
        )
    }

    #[test]
    fn test_canonical_string() {
        let frame = chase_frame();
        assert_eq!(
            frame.to_string(),
            "{<VERB,\"chase\",N>\t<SBJ,\"cat\",N>\t<OBJ,\"Rex\",Y>}"
        );
        assert_eq!(frame.slot_values(), "chase cat Rex");
        assert_eq!(Frame::new(FrameId(1)).to_string(), "{}");
        assert_eq!(Frame::new(FrameId(1)).slot_values(), "");
    }

    #[test]
    fn test_codec_layout() {
        let frame = Frame::with_slots(FrameId(3), vec![Slot::new("A", "bc", true)]);
        let bytes = frame.encode().unwrap();
        assert_eq!(bytes, vec![0, 0, 0, 1, 0, 1, b'A', 0, 2, b'b', b'c', 1]);
    }

    #[test]
    fn test_codec_keeps_empty_strings() {
        let frame = Frame::with_slots(FrameId(3), vec![Slot::new("NMOD", "", false)]);
        let bytes = frame.encode().unwrap();
        let decoded = Frame::decode(FrameId(3), &bytes).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn test_decode_rejects_truncated_buffer() {
        let bytes = chase_frame().encode().unwrap();
        for cut in 0..bytes.len() {
            assert_eq!(
                Frame::decode(FrameId(7), &bytes[..cut]),
                Err(CodecError::Truncated),
                "cut at {}",
                cut
            );
        }
    }

    #[test]
    fn test_decode_rejects_bad_flag_and_trailing_bytes() {
        let mut bytes = Frame::with_slots(FrameId(1), vec![Slot::new("A", "b", false)])
            .encode()
            .unwrap();
        let last = bytes.len() - 1;
        bytes[last] = 2;
        assert_eq!(Frame::decode(FrameId(1), &bytes), Err(CodecError::InvalidFlag(2)));

        bytes[last] = 0;
        bytes.push(9);
        assert_eq!(Frame::decode(FrameId(1), &bytes), Err(CodecError::TrailingBytes(1)));
    }

    #[test]
    fn test_decode_rejects_invalid_utf8() {
        let bytes = [0, 0, 0, 1, 0, 1, 0xFF, 0, 0, 0];
        assert_eq!(Frame::decode(FrameId(1), &bytes), Err(CodecError::InvalidUtf8));
    }

    #[test]
    fn test_encode_rejects_oversized_string() {
        let long: String = core::iter::repeat('x').take(70_000).collect();
        let frame = Frame::with_slots(FrameId(1), vec![Slot::new("X", long, false)]);
        let mut out = vec![42u8];
        assert_eq!(frame.encode_into(&mut out), Err(CodecError::StringTooLong(70_000)));
        assert_eq!(out, vec![42u8]);
    }

    #[test]
    fn test_record_stream() {
        let frames = vec![chase_frame(), Frame::new(FrameId(u64::MAX))];
        let bytes = encode_records(&frames).unwrap();
        assert_eq!(decode_records(&bytes).unwrap(), frames);
        assert_eq!(decode_records(&bytes[..bytes.len() - 1]), Err(CodecError::Truncated));
        assert!(decode_records(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_batch_archive_round_trip() {
        let batch = FrameBatch::new(vec![chase_frame()]);

        let bytes = to_bytes::<_, 256>(&batch).expect("Failed to serialize FrameBatch");
        let deserialized: FrameBatch = from_bytes(&bytes).expect("Failed to deserialize FrameBatch");

        assert_eq!(deserialized, batch);
        assert_eq!(deserialized.version, FrameBatch::CURRENT_VERSION);
    }

    #[test]
    fn test_id_layout() {
        assert_eq!(core::mem::size_of::<FrameId>(), 8);
        assert_eq!(core::mem::size_of::<TokenId>(), 4);
        assert!(TokenId::ROOT.is_root());
    }

    fn arb_slot() -> impl Strategy<Value = Slot> {
        ("[A-Z_-]{1,12}", "\\PC{0,24}", any::<bool>())
            .prop_map(|(relation, value, flag)| Slot::new(relation, value, flag))
    }

    proptest! {
        #[test]
        fn test_codec_round_trip(id in any::<u64>(), slots in proptest::collection::vec(arb_slot(), 0..12)) {
            let frame = Frame::with_slots(FrameId(id), slots);
            let bytes = frame.encode().unwrap();
            let decoded = Frame::decode(FrameId(id), &bytes).unwrap();
            prop_assert_eq!(decoded.slots(), frame.slots());

            let stream: Vec<u8> = encode_records([&frame, &frame]).unwrap();
            prop_assert_eq!(decode_records(&stream).unwrap(), vec![frame.clone(), frame]);
        }
    }
}
