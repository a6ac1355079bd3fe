//! Thread safety integration tests for `opaque_vec`.
//!
//! The vectors are thread-mobile but not thread-safe, so sharing one between threads
//! requires wrapping it in a lock.

use std::sync::{Arc, Mutex};
use std::thread;

use opaque_vec::{OpaqueVec, TypedVec};

#[test]
fn vector_can_be_moved_between_threads() {
    let mut vec = OpaqueVec::builder().item_size(2).build().unwrap();
    vec.push_back(&[1, 2]).unwrap();

    let handle = thread::spawn(move || {
        vec.push_back(&[3, 4]).unwrap();
        vec
    });

    let vec = handle.join().unwrap();
    assert_eq!(vec.as_bytes(), &[1, 2, 3, 4]);
}

#[test]
fn mutex_serializes_access_from_many_threads() {
    let shared = Arc::new(Mutex::new(TypedVec::<u32>::new().unwrap()));

    let handles = (0..4_u32)
        .map(|thread_index| {
            let shared = Arc::clone(&shared);

            thread::spawn(move || {
                for value in 0..250 {
                    shared
                        .lock()
                        .unwrap()
                        .push_back(thread_index * 1000 + value)
                        .unwrap();
                }
            })
        })
        .collect::<Vec<_>>();

    for handle in handles {
        handle.join().unwrap();
    }

    let mut vec = Arc::into_inner(shared).unwrap().into_inner().unwrap();
    assert_eq!(vec.len(), 1000);

    vec.sort_by(u32::cmp).unwrap();
    let expected = (0..4_u32)
        .flat_map(|thread_index| (0..250).map(move |value| thread_index * 1000 + value))
        .collect::<Vec<_>>();
    assert_eq!(vec.as_slice(), expected.as_slice());
}
