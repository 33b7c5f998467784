#![no_main]

use std::collections::HashMap;

use arbitrary::Unstructured;
use libfuzzer_sys::fuzz_target;

use cereal::{DataType, Reader, Value, Writer};

/// Произвольное Value из `Unstructured`, вложенность ограничена `depth`.
fn arb_value(
    u: &mut Unstructured<'_>,
    depth: usize,
) -> arbitrary::Result<Value> {
    let max = if depth == 0 { 7 } else { 8 };
    Ok(match u.int_in_range::<u8>(0..=max)? {
        0 => Value::Boolean(u.arbitrary()?),
        1 => Value::Integer(u.arbitrary()?),
        2 => Value::UnsignedInteger(u.arbitrary()?),
        3 => Value::Float(u.arbitrary()?),
        4 => Value::Bytes(u.arbitrary()?),
        5 => Value::String(u.arbitrary()?),
        6 => Value::StringSlice(u.arbitrary()?),
        7 => Value::Byte(u.arbitrary()?),
        _ => {
            let len = u.int_in_range::<u8>(0..=6)? as usize;
            let mut map = HashMap::with_capacity(len);
            for _ in 0..len {
                let key: String = u.arbitrary()?;
                map.insert(key, arb_value(u, depth - 1)?);
            }
            Value::KeyValueMap(map)
        }
    })
}

fn same(
    a: &Value,
    b: &Value,
) -> bool {
    match (a, b) {
        (Value::Float(x), Value::Float(y)) => x.to_bits() == y.to_bits(),
        (Value::KeyValueMap(x), Value::KeyValueMap(y)) => {
            x.len() == y.len()
                && x.iter().all(|(k, v)| y.get(k).is_some_and(|w| same(v, w)))
        }
        _ => a == b,
    }
}

fuzz_target!(|data: &[u8]| {
    let mut u = Unstructured::new(data);
    let mut values = Vec::new();
    while let Ok(v) = arb_value(&mut u, 3) {
        values.push(v);
        if values.len() == 16 {
            break;
        }
    }

    let mut w = Writer::from_buffer();
    let infos: Vec<_> = values
        .iter()
        .map(|v| w.write(v).expect("Encoding failed"))
        .collect();
    let crc = w.crc32();
    let bytes = w.into_inner().expect("Flush failed");
    assert_eq!(crc, crc32fast::hash(&bytes));

    let mut r = Reader::from_buffer(bytes);
    for (v, info) in values.iter().zip(&infos) {
        assert_eq!(r.position().unwrap(), info.offset);
        let (decoded, ty) = r.read(v.data_type()).expect("Decoding failed");
        assert_eq!(ty, v.data_type());
        assert!(same(v, &decoded), "{v:?} != {decoded:?}");
    }
    assert!(r.read(DataType::Any).is_err());
});
