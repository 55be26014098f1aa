//! Test suite for the Web and headless browsers.

#![cfg(target_arch = "wasm32")]

extern crate wasm_bindgen_test;
use eventhub_frontend_rs::{JoinedSetTracker, KeyValueStorage, LocalStorage, TOKEN_KEY};
use std::rc::Rc;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

#[wasm_bindgen_test]
fn local_storage_round_trip() {
    let storage = LocalStorage::new().unwrap();
    storage.set_item(TOKEN_KEY, "a.b.c").unwrap();
    assert_eq!(storage.get_item(TOKEN_KEY).unwrap().as_deref(), Some("a.b.c"));
    storage.remove_item(TOKEN_KEY).unwrap();
    assert_eq!(storage.get_item(TOKEN_KEY).unwrap(), None);
}

#[wasm_bindgen_test]
fn joined_set_survives_a_new_tracker() {
    let storage: Rc<dyn KeyValueStorage> = Rc::new(LocalStorage::new().unwrap());
    let mut joined = JoinedSetTracker::load(storage.clone());
    joined.add("E42").unwrap();
    assert!(JoinedSetTracker::load(storage).has("E42"));
}
