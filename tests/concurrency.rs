//! Many threads reading and writing one tree at once.
#![allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]

mod common;

use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use rayon::prelude::*;
use serde_json::json;

use layered_opts::opts::{OptsView, RootRegistry};

/// Run `f` on its own thread and fail if it does not return within five seconds.
fn finishes_in_time(f: impl FnOnce() + Send + 'static) {
    let (done, finished) = mpsc::channel();
    thread::spawn(move || {
        f();
        let _ = done.send(());
    });
    let result = finished.recv_timeout(Duration::from_secs(5));
    assert_ne!(result, Err(RecvTimeoutError::Timeout), "view lock was never released");
    assert!(result.is_ok(), "worker thread panicked");
}

#[test]
fn parallel_children_stay_isolated() {
    let (source, root) = common::minion_root();
    let children: Vec<OptsView> = (0..32).map(|i| root.child(&format!("c{i}"))).collect();

    children.par_iter().enumerate().for_each(|(i, child)| {
        child.set("test", i);
        let mut grains = child.get("grains").unwrap().into_map().unwrap();
        grains.insert("worker", i).unwrap();
        let mut ext = child.get("ext_pillar").unwrap().into_list().unwrap();
        ext.push(json!({"worker": i})).unwrap();
    });

    for (i, child) in children.iter().enumerate() {
        assert_eq!(child.get("test").unwrap(), json!(i));
        assert_eq!(
            child.get_value("grains").unwrap()["worker"],
            json!(i),
            "child {i}"
        );
        assert_eq!(child.get_value("ext_pillar").unwrap().as_array().unwrap().len(), 2);
    }
    assert_eq!(root.get("test").unwrap(), json!(false));
    assert_eq!(root.get_value("grains").unwrap(), source["grains"]);
    assert!(root.get_local_keys().is_empty());
}

#[test]
fn parallel_writes_to_one_view_are_all_counted() {
    let (_source, root) = common::minion_root();
    let child = root.child("shared");

    (0..200).into_par_iter().for_each(|i| {
        child.set(format!("k{}", i % 10), i);
        let _ = child.get("grains").unwrap();
        let _ = child.keys();
    });

    assert_eq!(child.tracker().total_mutations(), 200);
    assert_eq!(child.get_local_keys().len(), 10);
    for (_, count) in child.get_hotspot_keys(1) {
        assert_eq!(count, 20);
    }
}

#[test]
fn parallel_proxy_edits_on_one_view_do_not_lose_updates() {
    let (_source, root) = common::minion_root();
    let child = root.child("shared");

    (0..64).into_par_iter().for_each(|i| {
        let mut list = child.get("ext_pillar").unwrap().into_list().unwrap();
        list.push(i).unwrap();
    });

    let list = child.get_value("ext_pillar").unwrap();
    assert_eq!(list.as_array().unwrap().len(), 65);
    assert_eq!(
        root.get_value("ext_pillar").unwrap(),
        json!([{"git": "repo"}])
    );
}

#[test]
fn parallel_safe_wrap_shares_one_root() {
    let registry = RootRegistry::default();
    let source = common::source_from(&common::minion_config());

    let views: Vec<OptsView> = (0..16)
        .into_par_iter()
        .map(|i| registry.safe_wrap(&source, Some(&format!("w{i}"))))
        .collect();

    let first = views[0].root();
    assert!(views.iter().all(|v| v.root().ptr_eq(first)));
    assert_eq!(registry.len(), 1);
}

#[test]
fn readers_see_root_writes_while_children_write() {
    let (_source, root) = common::minion_root();
    let child = root.child("reader");

    rayon::join(
        || {
            for i in 0..100 {
                root.set("log_level", format!("level{i}"));
            }
        },
        || {
            for _ in 0..100 {
                let v = child.get_value("log_level").unwrap();
                assert!(v.is_string());
            }
        },
    );
    assert_eq!(child.get("log_level").unwrap(), json!("level99"));
}

#[test]
fn proxy_callbacks_can_reenter_the_owning_view() {
    let (_source, root) = common::minion_root();
    let child = root.child("cli");

    let view = child.clone();
    finishes_in_time(move || {
        let mut grains = view.get("grains").unwrap().into_map().unwrap();
        grains
            .with_mut(|v| {
                v["level"] = view.get_value("log_level")?;
                view.set("test", true);
                Ok(())
            })
            .unwrap();
        grains
            .update(["test"].into_iter().map(|k| (k, view.get_value(k).unwrap())))
            .unwrap();
        let mut ext = view.get("ext_pillar").unwrap().into_list().unwrap();
        ext.extend(view.keys().into_iter().filter(|k| k.starts_with("file")))
            .unwrap();
    });

    assert_eq!(
        child.get_value("grains").unwrap(),
        json!({"os": "Linux", "cpu": {"cores": 4}, "level": "warning", "test": true})
    );
    assert_eq!(
        child.get_value("ext_pillar").unwrap(),
        json!([{"git": "repo"}, "file_roots"])
    );
    assert_eq!(root.get_value("test").unwrap(), json!(false));
}

#[test]
fn memory_stats_add_up_while_keys_come_and_go() {
    let (_source, root) = common::minion_root();
    let child = root.child("churn");

    rayon::join(
        || {
            for _ in 0..200 {
                for i in 0..50 {
                    child.set(format!("k{i}"), i);
                }
                for i in 0..50 {
                    child.delete(&format!("k{i}")).unwrap();
                }
            }
        },
        || {
            for _ in 0..2_000 {
                let stats = child.get_memory_stats();
                assert!(stats.local_keys <= stats.total_keys);
                assert_eq!(stats.local_keys + stats.shared_keys, stats.total_keys);
            }
        },
    );
    assert_eq!(child.get_memory_stats().local_keys, 0);
}
