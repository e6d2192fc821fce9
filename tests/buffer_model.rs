//! Checks `ChunkedBuffer` against a plain `Vec<u8>` over random operation
//! sequences, with block sizes small enough that most operations cross a
//! block boundary.

use std::io::SeekFrom;

use memzip::{BufferOptions, ChunkedBuffer};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Seek(usize),
    Write(Vec<u8>),
    WriteByte(u8),
    SetLength(usize),
    Read(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0usize..160).prop_map(Op::Seek),
        prop::collection::vec(any::<u8>(), 0..48).prop_map(Op::Write),
        any::<u8>().prop_map(Op::WriteByte),
        (0usize..160).prop_map(Op::SetLength),
        (0usize..64).prop_map(Op::Read),
    ]
}

#[derive(Default)]
struct Model {
    data: Vec<u8>,
    position: usize,
}

impl Model {
    fn write(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        let end = self.position + bytes.len();
        if end > self.data.len() {
            self.data.resize(end, 0);
        }
        self.data[self.position..end].copy_from_slice(bytes);
        self.position = end;
    }

    fn read(&mut self, count: usize) -> Vec<u8> {
        let start = self.position.min(self.data.len());
        let end = (start + count).min(self.data.len());
        self.position += end - start;
        self.data[start..end].to_vec()
    }

    fn set_length(&mut self, length: usize) {
        self.data.resize(length, 0);
        self.position = self.position.min(length);
    }
}

fn apply(buffer: &mut ChunkedBuffer, model: &mut Model, op: &Op) -> Result<(), TestCaseError> {
    match op {
        Op::Seek(to) => {
            let at = buffer.seek(SeekFrom::Start(*to as u64)).unwrap();
            prop_assert_eq!(at, *to as u64);
            model.position = *to;
        }
        Op::Write(bytes) => {
            buffer.write_from(bytes, 0, bytes.len()).unwrap();
            model.write(bytes);
        }
        Op::WriteByte(byte) => {
            buffer.write_byte(*byte).unwrap();
            model.write(&[*byte]);
        }
        Op::SetLength(length) => {
            buffer.set_length(*length).unwrap();
            model.set_length(*length);
        }
        Op::Read(count) => {
            let mut dst = vec![0u8; *count];
            let n = buffer.read_into(&mut dst, 0, *count).unwrap();
            let expected = model.read(*count);
            prop_assert_eq!(&dst[..n], &expected[..]);
        }
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Content and cursor track the model after every operation.
    #[test]
    fn matches_vec_model(
        block_size in 1usize..16,
        ops in prop::collection::vec(op(), 1..64),
    ) {
        let mut buffer = ChunkedBuffer::open(BufferOptions::new().block_size(block_size)).unwrap();
        let mut model = Model::default();

        for op in &ops {
            apply(&mut buffer, &mut model, op)?;

            prop_assert_eq!(buffer.position().unwrap(), model.position);
            prop_assert_eq!(buffer.len().unwrap(), model.data.len());
            prop_assert!(buffer.capacity() >= model.data.len());
            prop_assert_eq!(buffer.to_vec().unwrap(), model.data.clone());
        }
    }

    /// Any in-bounds range copies out the same bytes as the model slice.
    #[test]
    fn ranges_match_model(
        block_size in 1usize..16,
        data in prop::collection::vec(any::<u8>(), 0..200),
        start in 0usize..200,
        count in 0usize..200,
    ) {
        let mut buffer = ChunkedBuffer::open(BufferOptions::new().block_size(block_size)).unwrap();
        buffer.write_from(&data, 0, data.len()).unwrap();

        let fits = start + count <= data.len();
        let range = buffer.to_vec_range(start, count);
        prop_assert_eq!(range.is_ok(), fits);
        if let Ok(bytes) = range {
            prop_assert_eq!(&bytes[..], &data[start..start + count]);
        }
        prop_assert_eq!(buffer.position().unwrap(), data.len());
    }

    /// The cursor's block and offset always agree with its position.
    #[test]
    fn locate_splits_position(block_size in 1usize..4096, position in 0usize..1_000_000) {
        let buffer = ChunkedBuffer::open(BufferOptions::new().block_size(block_size)).unwrap();
        let (block, offset) = buffer.locate(position);
        prop_assert!(offset < block_size);
        prop_assert_eq!(block * block_size + offset, position);
    }
}
