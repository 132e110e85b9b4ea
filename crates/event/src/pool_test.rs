//! Tests for the event pool

use crate::{EventPool, Level, TagSet};

#[test]
fn test_acquire_and_release_recycles_storage() {
    let pool = EventPool::new(4);
    assert_eq!(pool.available(), 4);

    let event = pool.acquire();
    assert_eq!(pool.available(), 3);

    event.release();
    assert_eq!(pool.available(), 4);

    let m = pool.metrics();
    assert_eq!(m.acquired, 1);
    assert_eq!(m.released, 1);
    assert_eq!(m.in_flight(), 0);
}

#[test]
fn test_drop_counts_as_release() {
    let pool = EventPool::new(2);
    {
        let _event = pool.acquire();
    }
    assert_eq!(pool.metrics().in_flight(), 0);
}

#[test]
fn test_exhausted_pool_allocates() {
    let pool = EventPool::new(1);
    let a = pool.acquire();
    let b = pool.acquire();
    assert_eq!(pool.metrics().acquired, 2);
    a.release();
    b.release();
    assert_eq!(pool.metrics().in_flight(), 0);
}

#[test]
fn test_release_resets_payload() {
    let pool = EventPool::new(1);
    let mut event = pool.acquire();
    {
        let data = event.data_mut();
        data.level = Level::Fatal;
        data.tags = TagSet::register("pool-reset-probe");
        data.text.push_str("hello");
    }
    event.release();

    let recycled = pool.acquire();
    assert_eq!(recycled.data().level, Level::Trace);
    assert!(recycled.data().tags.is_empty());
    assert!(recycled.data().text.is_empty());
}
