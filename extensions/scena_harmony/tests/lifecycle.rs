//! Integration tests for wrapper lifecycle and callback delivery
//!
//! These tests verify that:
//! - Platform events raised on foreign threads reach scripting callbacks on
//!   the owner thread
//! - Events for a finalized wrapper are dropped without calling scripting code
//! - Registration deduplicates callbacks and rejects bad input the way the
//!   scripting API expects

use scena_core::{MainEventRunner, MainThreadScheduler, SceneSessionEvent, WsErrorCode};
use scena_harmony::{
    export_scene_session_manager, JsRootSceneSession, JsSceneSession, JsSceneSessionManager,
    JsTaskScheduler,
};
use scena_platform::{SceneSession, SceneSessionManager, SessionInfo, SizeChangeReason, WsRect};
use scena_script::{JsEnv, JsFunction, JsObject, JsValue, ScriptError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(5);

struct Fixture {
    runner: Arc<MainEventRunner>,
    scheduler: Arc<JsTaskScheduler>,
    platform: Arc<SceneSessionManager>,
    manager: Arc<JsSceneSessionManager>,
    exports: JsObject,
}

impl Fixture {
    fn new(name: &str) -> Self {
        let runner = MainEventRunner::spawn(name).unwrap();
        let env = JsEnv::new(runner.thread_id());
        let scheduler = Arc::new(JsTaskScheduler::new(
            env,
            MainThreadScheduler::with_runner(Arc::clone(&runner)),
        ));
        let platform = Arc::new(SceneSessionManager::new());

        let export_platform = Arc::clone(&platform);
        let export_scheduler = Arc::clone(&scheduler);
        let (exports, manager) = on_owner(&scheduler, move |env| {
            export_scene_session_manager(env, export_platform, export_scheduler).unwrap()
        });

        Self {
            runner,
            scheduler,
            platform,
            manager,
            exports,
        }
    }

    /// Run `f` on the owner thread and wait for its result
    fn run<R, F>(&self, f: F) -> R
    where
        R: Send + 'static,
        F: FnOnce(&JsEnv) -> R + Send + 'static,
    {
        on_owner(&self.scheduler, f)
    }

    fn flush(&self) {
        assert!(self.runner.flush(WAIT));
    }

    fn new_session(&self, ability: &str) -> Arc<SceneSession> {
        self.platform
            .create_session(SessionInfo::new("com.example", "entry", ability))
            .unwrap()
    }

    /// Expose `session` to scripting code and return its object
    fn expose(&self, session: &Arc<SceneSession>) -> JsObject {
        let manager = Arc::clone(&self.manager);
        let session = Arc::clone(session);
        self.run(move |env| manager.create_session_object(env, &session).unwrap())
    }
}

fn on_owner<R, F>(scheduler: &JsTaskScheduler, f: F) -> R
where
    R: Send + 'static,
    F: FnOnce(&JsEnv) -> R + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    scheduler.post(
        move |env| {
            let _ = tx.send(f(env));
        },
        "test",
    );
    rx.recv_timeout(WAIT).unwrap()
}

/// Call `object.on(args...)`
fn call_on(env: &JsEnv, object: &JsObject, args: &[JsValue]) -> scena_script::Result<JsValue> {
    let on = object.get_named_property("on").unwrap_or_default();
    env.call_function(&JsValue::Object(object.clone()), &on, args)
}

fn counting_callback(hits: &Arc<AtomicUsize>) -> JsValue {
    let hits = Arc::clone(hits);
    JsValue::Function(JsFunction::new("counter", move |_, _| {
        hits.fetch_add(1, Ordering::SeqCst);
        JsValue::Undefined
    }))
}

fn recording_callback(sink: &Arc<Mutex<Vec<Vec<JsValue>>>>) -> JsValue {
    let sink = Arc::clone(sink);
    JsValue::Function(JsFunction::new("recorder", move |_, info| {
        sink.lock().unwrap().push(info.args().to_vec());
        JsValue::Undefined
    }))
}

fn number_property(value: &JsValue, name: &str) -> Option<f64> {
    match value.as_object()?.get_named_property(name)? {
        JsValue::Number(n) => Some(n),
        _ => None,
    }
}

#[test]
fn test_rect_change_from_foreign_thread_reaches_callback() {
    let fixture = Fixture::new("it-rect");
    let session = fixture.new_session("Main");
    let object = fixture.expose(&session);
    let calls = Arc::new(Mutex::new(Vec::new()));

    let callback = recording_callback(&calls);
    fixture.run(move |env| {
        call_on(env, &object, &["sessionRectChange".into(), callback]).unwrap();
    });

    let remote = Arc::clone(&session);
    thread::spawn(move || {
        assert!(remote.update_rect(WsRect::new(10, 20, 300, 400), SizeChangeReason::Move));
    })
    .join()
    .unwrap();
    fixture.flush();

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(number_property(&calls[0][0], "width_"), Some(300.0));
    assert!(calls[0][1].strict_equals(&JsValue::from(SizeChangeReason::Move.as_u32())));
}

#[test]
fn test_rect_change_after_wrapper_finalized_is_dropped() {
    let fixture = Fixture::new("it-finalized");
    let session = fixture.new_session("Main");
    let object = fixture.expose(&session);
    let hits = Arc::new(AtomicUsize::new(0));

    let callback = counting_callback(&hits);
    let registered = object.clone();
    fixture.run(move |env| {
        call_on(env, &registered, &["sessionRectChange".into(), callback]).unwrap();
    });

    fixture.run(move |_| {
        assert!(JsSceneSession::finalizer(&object));
    });
    assert!(!fixture.manager.registry().contains(session.persistent_id()));

    // The platform listener is still installed and still posts a task
    let remote = Arc::clone(&session);
    thread::spawn(move || {
        assert!(remote.update_rect(WsRect::new(0, 0, 50, 50), SizeChangeReason::Resize));
    })
    .join()
    .unwrap();
    fixture.flush();

    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[test]
fn test_task_queued_before_finalize_is_dropped() {
    let fixture = Fixture::new("it-queued");
    let session = fixture.new_session("Main");
    let object = fixture.expose(&session);
    let hits = Arc::new(AtomicUsize::new(0));

    let callback = counting_callback(&hits);
    let registered = object.clone();
    fixture.run(move |env| {
        call_on(env, &registered, &["sessionStateChange".into(), callback]).unwrap();
    });

    // Hold the owner thread; finalize only once the event task is queued behind us
    let (release_tx, release_rx) = mpsc::channel::<()>();
    fixture.scheduler.post(
        move |_| {
            let _ = release_rx.recv_timeout(WAIT);
            JsSceneSession::finalizer(&object);
        },
        "gate",
    );

    assert!(session.update_state(scena_platform::SessionState::Foreground));
    release_tx.send(()).unwrap();
    fixture.flush();

    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[test]
fn test_same_callback_registered_once() {
    let fixture = Fixture::new("it-dedup");
    let session = fixture.new_session("Main");
    let object = fixture.expose(&session);
    let hits = Arc::new(AtomicUsize::new(0));
    let callback = counting_callback(&hits);

    let registered = object.clone();
    fixture.run(move |env| {
        call_on(env, &registered, &["click".into(), callback.clone()]).unwrap();
        call_on(env, &registered, &["click".into(), callback.clone()]).unwrap();
        call_on(env, &registered, &["raiseToTop".into(), callback]).unwrap();
    });

    let wrapper = object.unwrap_native::<JsSceneSession>().unwrap();
    assert_eq!(wrapper.callback_count(), 2);
    assert!(wrapper.has_callback(SceneSessionEvent::Click));
    assert!(wrapper.has_callback(SceneSessionEvent::RaiseToTop));

    session.notify(scena_platform::SessionEventPayload::Click);
    fixture.flush();
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    session.notify(scena_platform::SessionEventPayload::RaiseToTop);
    fixture.flush();
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[test]
fn test_unknown_event_name_is_ignored() {
    let fixture = Fixture::new("it-unknown");
    let session = fixture.new_session("Main");
    let object = fixture.expose(&session);
    let hits = Arc::new(AtomicUsize::new(0));
    let callback = counting_callback(&hits);

    let registered = object.clone();
    let result = fixture.run(move |env| {
        let result = call_on(env, &registered, &["sessionRectChanged".into(), callback]);
        (result.map(|v| v.is_undefined()).ok(), env.is_exception_pending())
    });

    assert_eq!(result, (Some(true), false));
    let wrapper = object.unwrap_native::<JsSceneSession>().unwrap();
    assert_eq!(wrapper.callback_count(), 0);
}

#[test]
fn test_bad_arguments_throw_invalid_param() {
    let fixture = Fixture::new("it-badargs");
    let session = fixture.new_session("Main");
    let object = fixture.expose(&session);

    let codes = fixture.run(move |env| {
        let bad_calls = vec![
            vec![JsValue::from("click")],
            vec![JsValue::Number(1.0), JsValue::Null],
            vec![JsValue::from("click"), JsValue::from("not a function")],
        ];
        bad_calls
            .iter()
            .map(|args| match call_on(env, &object, args) {
                Err(ScriptError::Exception(error)) => number_property(&error, "code"),
                _ => None,
            })
            .collect::<Vec<_>>()
    });

    let expected = Some(f64::from(WsErrorCode::InvalidParam.code()));
    assert_eq!(codes, vec![expected; 3]);
}

#[test]
fn test_create_specific_session_delivers_session_object() {
    let fixture = Fixture::new("it-specific");
    let calls = Arc::new(Mutex::new(Vec::new()));
    let callback = recording_callback(&calls);
    let exports = fixture.exports.clone();
    fixture.run(move |env| {
        call_on(env, &exports, &["createSpecificSession".into(), callback]).unwrap();
    });

    let platform = Arc::clone(&fixture.platform);
    let id = thread::spawn(move || {
        platform
            .create_specific_session(SessionInfo::new("com.example", "entry", "Dialog"))
            .unwrap()
            .persistent_id()
    })
    .join()
    .unwrap();
    fixture.flush();

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(number_property(&calls[0][0], "persistentId"), Some(f64::from(id)));
    assert!(fixture.manager.session_object(id).is_some());
    assert!(fixture.manager.registry().contains(id));
}

#[test]
fn test_platform_destroy_finalizes_wrapper() {
    let fixture = Fixture::new("it-destroy");
    let session = fixture.new_session("Main");
    let id = session.persistent_id();
    let object = fixture.expose(&session);
    assert!(fixture.manager.registry().contains(id));

    fixture.platform.destroy_session(id).unwrap();
    fixture.flush();

    assert!(fixture.manager.session_object(id).is_none());
    assert!(!fixture.manager.registry().contains(id));
    assert!(object.unwrap_native::<JsSceneSession>().is_none());
}

#[test]
fn test_root_activation_creates_session() {
    let fixture = Fixture::new("it-root");
    let calls = Arc::new(Mutex::new(Vec::new()));
    let callback = recording_callback(&calls);
    let exports = fixture.exports.clone();

    let root = fixture.run(move |env| {
        let get_root = exports.get_named_property("getRootSceneSession").unwrap();
        let root = env
            .call_function(&JsValue::Object(exports.clone()), &get_root, &[])
            .unwrap();
        let root = root.as_object().cloned().unwrap();
        call_on(env, &root, &["pendingSceneSessionActivation".into(), callback]).unwrap();
        root
    });
    let wrapper = root.unwrap_native::<JsRootSceneSession>().unwrap();

    let info = SessionInfo::new("com.example", "entry", "Launched");
    assert!(wrapper.pending_session_activation(info, None).is_some());
    fixture.flush();

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(fixture.platform.session_count(), 1);
    let id = fixture.platform.session_ids()[0];
    assert_eq!(number_property(&calls[0][0], "persistentId"), Some(f64::from(id)));
    assert!(fixture.manager.session_object(id).is_some());
}

#[test]
fn test_exports_carry_enums() {
    let fixture = Fixture::new("it-exports");
    let states = fixture.exports.get_named_property("SessionState").unwrap();
    let gravity = fixture.exports.get_named_property("KeyboardGravity").unwrap();

    assert_eq!(number_property(&states, "STATE_ACTIVE"), Some(3.0));
    assert_eq!(number_property(&gravity, "GRAVITY_FLOAT"), Some(2.0));
}

#[test]
fn test_exports_wrap_the_returned_manager() {
    let fixture = Fixture::new("it-exports-wrap");
    let wrapped = fixture
        .exports
        .unwrap_native::<JsSceneSessionManager>()
        .unwrap();

    assert!(Arc::ptr_eq(&wrapped, &fixture.manager));
    assert!(Arc::ptr_eq(wrapped.manager(), &fixture.platform));
}
