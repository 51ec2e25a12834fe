use std::cell::RefCell;
use std::rc::Rc;

use treesync::{
    ChangeContext, ChangeContextType, FnObserver, NotificationHub, ObserverError, SharedObserver, ValueId,
};

type Log = Rc<RefCell<Vec<i32>>>;

fn recorder(priority: i32, log: &Log) -> SharedObserver<String> {
    let log = Rc::clone(log);
    Rc::new(FnObserver::new(
        priority,
        move |_: Option<&Rc<String>>, _: &ChangeContext<String>| log.borrow_mut().push(priority),
    ))
}

#[test]
fn observers_are_served_in_ascending_priority() {
    let hub = NotificationHub::<String>::new();
    let log: Log = Rc::default();
    for priority in [5, 1, 3] {
        hub.register_observer(Some(recorder(priority, &log))).unwrap();
    }

    let delivered = hub.notify_observers(Some(Rc::new("v".to_string())), &ChangeContext::basic(None));
    assert_eq!(delivered, 3);
    assert_eq!(*log.borrow(), vec![1, 3, 5]);
}

#[test]
fn registration_is_idempotent_by_identity() {
    let hub = NotificationHub::<String>::new();
    let log: Log = Rc::default();
    let observer = recorder(0, &log);

    hub.register_observer(Some(Rc::clone(&observer))).unwrap();
    hub.register_observer(Some(Rc::clone(&observer))).unwrap();
    assert_eq!(hub.observer_count(), 1);

    // Same behavior, different allocation: a distinct observer.
    hub.register_observer(Some(recorder(0, &log))).unwrap();
    assert_eq!(hub.observer_count(), 2);

    hub.notify_observers(None, &ChangeContext::basic(None));
    assert_eq!(log.borrow().len(), 2);
}

#[test]
fn registry_misuse_is_reported() {
    let hub = NotificationHub::<String>::new();
    let log: Log = Rc::default();
    let observer = recorder(0, &log);

    assert_eq!(hub.register_observer(None), Err(ObserverError::InvalidObserver));
    assert_eq!(hub.unregister_observer(None), Err(ObserverError::UnknownObserver));
    assert_eq!(hub.unregister_observer(Some(&observer)), Err(ObserverError::UnknownObserver));

    hub.register_observer(Some(Rc::clone(&observer))).unwrap();
    hub.unregister_observer(Some(&observer)).unwrap();
    assert_eq!(hub.unregister_observer(Some(&observer)), Err(ObserverError::UnknownObserver));
    assert_eq!(hub.notify_observers(None, &ChangeContext::basic(None)), 0);
    assert!(log.borrow().is_empty());
}

#[test]
fn complex_context_carries_original_and_key() {
    let hub = NotificationHub::<String>::new();
    let seen: Rc<RefCell<Vec<(ChangeContextType, Option<String>, Option<ValueId>)>>> = Rc::default();
    let sink = Rc::clone(&seen);
    let observer: SharedObserver<String> = Rc::new(FnObserver::new(
        0,
        move |_: Option<&Rc<String>>, ctx: &ChangeContext<String>| {
            sink.borrow_mut().push((
                ctx.context_type(),
                ctx.original_value().map(|v| v.to_string()),
                ctx.value_id().cloned(),
            ));
        },
    ));
    let _subscription = hub.subscribe(observer).unwrap();

    hub.notify_observers(
        Some(Rc::new("new".to_string())),
        &ChangeContext::complex(Some(Rc::new("old".to_string())), "Title"),
    );
    hub.notify_observers(None, &ChangeContext::complex(None, 4_usize));

    let seen = seen.borrow();
    assert_eq!(seen[0], (ChangeContextType::Complex, Some("old".to_string()), Some(ValueId::from("Title"))));
    assert_eq!(seen[1], (ChangeContextType::Complex, None, Some(ValueId::Index(4))));
}

#[test]
fn scoped_context_exposes_scope_only() {
    let ctx: ChangeContext<String, (u32, u32)> = ChangeContext::scoped((2, 7));
    assert_eq!(ctx.context_type(), ChangeContextType::Scoped);
    assert_eq!(ctx.scope().map(|s| **s), Some((2, 7)));
    assert!(ctx.original_value().is_none());
    assert!(ctx.value_id().is_none());
}

#[test]
fn subscription_guard_unregisters_on_drop() {
    let hub = NotificationHub::<String>::new();
    let log: Log = Rc::default();
    {
        let subscription = hub.subscribe(recorder(2, &log)).unwrap();
        assert!(subscription.observer().is_some());
        assert_eq!(hub.observer_count(), 1);
        hub.notify_observers(None, &ChangeContext::basic(None));
    }
    assert_eq!(hub.observer_count(), 0);
    hub.notify_observers(None, &ChangeContext::basic(None));
    assert_eq!(*log.borrow(), vec![2]);
}
