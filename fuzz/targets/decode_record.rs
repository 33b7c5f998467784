#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use cereal::{DataType, Reader, Settings, Value, Writer};

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    data: Vec<u8>,
    expected: u8,
    block_out_len: u16,
}

fuzz_target!(|input: FuzzInput| {
    let settings = Settings {
        max_payload_len: 1 << 16,
        ..Settings::default()
    };

    // неизвестный код превращаем в Any
    let expected = DataType::try_from(input.expected % 10).unwrap_or(DataType::Any);

    let mut r = Reader::with_settings(cereal::ByteSeeker::new(input.data.clone()), &settings);
    if let Ok((value, ty)) = r.read(expected) {
        assert_eq!(value.data_type(), ty);
        if expected != DataType::Any {
            assert_eq!(ty, expected);
        }
        reencode(&value);
    }

    // весь поток: decoder не должен паниковать ни на каких данных
    let mut r = Reader::with_settings(cereal::ByteSeeker::new(input.data.clone()), &settings);
    for record in r.records() {
        match record {
            Ok((_, value, _)) => reencode(&value),
            Err(_) => break,
        }
    }

    let mut r = Reader::with_settings(cereal::ByteSeeker::new(input.data), &settings);
    let mut out = vec![0u8; input.block_out_len as usize];
    let _ = r.read_compressed_block(&mut out);
});

/// Декодированное значение должно кодироваться обратно в то же значение.
fn reencode(value: &Value) {
    let mut w = Writer::from_buffer();
    w.write(value).expect("Encoding failed");
    let bytes = w.into_inner().expect("Flush failed");

    let mut r = Reader::from_buffer(bytes);
    let (again, _) = r.read(DataType::Any).expect("Re-decoding failed");
    if !has_nan(value) {
        assert_eq!(&again, value);
    }
}

fn has_nan(value: &Value) -> bool {
    match value {
        Value::Float(f) => f.is_nan(),
        Value::KeyValueMap(m) => m.values().any(has_nan),
        _ => false,
    }
}
