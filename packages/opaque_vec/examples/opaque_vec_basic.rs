//! Basic usage example for `OpaqueVec` and `TypedVec`.
//!
//! This example stores sensor readings whose size is only known at runtime in an
//! `OpaqueVec`, then shows the same workflow with the typed variant.

use std::cmp::Ordering;

use opaque_vec::{Error, OpaqueVec, TypedVec};

/// Each record is a 2-byte sensor ID followed by a 4-byte reading, both little-endian.
const RECORD_SIZE: usize = 6;

fn record(sensor: u16, reading: u32) -> [u8; RECORD_SIZE] {
    let mut bytes = [0; RECORD_SIZE];
    bytes[..2].copy_from_slice(&sensor.to_le_bytes());
    bytes[2..].copy_from_slice(&reading.to_le_bytes());
    bytes
}

fn sensor_of(record: &[u8]) -> u16 {
    u16::from_le_bytes([record[0], record[1]])
}

fn by_sensor(a: &[u8], b: &[u8]) -> Ordering {
    sensor_of(a).cmp(&sensor_of(b))
}

fn main() -> Result<(), Error> {
    let mut records = OpaqueVec::builder().item_size(RECORD_SIZE).build()?;

    println!(
        "Created OpaqueVec with item size {} and capacity {}",
        records.item_size(),
        records.capacity()
    );

    for (sensor, reading) in [(7, 700), (3, 300), (9, 900), (3, 301), (1, 100)] {
        records.push_back(&record(sensor, reading))?;
        println!(
            "Appended sensor {sensor}: len {}, capacity {}",
            records.len(),
            records.capacity()
        );
    }

    // Equal sensor IDs keep their insertion order.
    records.sort_by(by_sensor)?;
    records.for_each(|item, index, len| {
        if let Some(item) = item {
            println!("  [{index}/{len}] sensor {}", sensor_of(item));
        }
    });

    let index = records.find(&record(9, 0), by_sensor)?;
    println!("Sensor 9 is at index {index}");

    records.remove_block(0, 3)?;
    println!(
        "After removing three records: len {}, capacity {}",
        records.len(),
        records.capacity()
    );

    match records.insert(records.len(), &record(10, 0)) {
        Err(Error::IndexOutOfRange { index, size, .. }) => {
            println!("Inserting at index {index} of a vector of size {size} is rejected");
        }
        other => println!("Unexpected result: {other:?}"),
    }

    let mut readings = TypedVec::<u32>::new()?;
    readings.push_back_slice(&[42, 7, 19, 3])?;
    readings.sort_by(u32::cmp)?;

    println!("Sorted readings: {:?}", readings.as_slice());
    println!("Smallest reading: {:?}", readings.pop_front());

    Ok(())
}
