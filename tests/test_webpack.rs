//! Integration tests for the registry scanner, subscriptions and lookup policy.

extern crate lazy_webpack;

use lazy_webpack::runner::ds::function_object::NativeFunctionObject;
use lazy_webpack::runner::ds::object_property::PropertyKey;
use lazy_webpack::runner::ds::operations::object::{create_object, get_v, set_v};
use lazy_webpack::runner::ds::value::JsValue;
use lazy_webpack::runner::webpack::config::{LookupMode, WebpackConfig};
use lazy_webpack::runner::webpack::context::{WaitOptions, WebpackContext};
use lazy_webpack::runner::webpack::error::WebpackError;
use lazy_webpack::runner::webpack::filters::Filter;
use lazy_webpack::runner::webpack::registry::{ModuleFactory, ModuleId, ModuleRegistry};
use pretty_assertions::assert_eq;
use std::cell::RefCell;
use std::rc::Rc;

fn key(k: &str) -> PropertyKey {
    PropertyKey::from(k)
}

fn setup(config: WebpackConfig) -> (WebpackContext, Rc<ModuleRegistry>) {
    let ctx = WebpackContext::new(config);
    let registry = ModuleRegistry::shared();
    ctx.init_webpack(registry.clone()).unwrap();
    (ctx, registry)
}

fn module(props: Vec<(&str, i32)>) -> JsValue {
    create_object(
        props
            .into_iter()
            .map(|(k, v)| (k, JsValue::from(v)))
            .collect(),
    )
}

fn store(name: &str) -> JsValue {
    create_object(vec![(
        "constructor",
        create_object(vec![("displayName", JsValue::from(name))]),
    )])
}

type Log = Rc<RefCell<Vec<String>>>;

fn log_into(log: &Log, label: &str) -> impl FnOnce(JsValue) + 'static {
    let log = log.clone();
    let label = label.to_string();
    move |m| {
        let value = get_v(&m, &key("v")).unwrap_or(JsValue::Undefined);
        log.borrow_mut().push(format!("{}:{}", label, value));
    }
}

// ============================================================================
// Subscriptions
// ============================================================================

#[test]
fn test_loaded_module_is_delivered_without_subscribing() {
    let (ctx, registry) = setup(WebpackConfig::default());
    registry.insert(1u64, module(vec![("foo", 1), ("v", 1)]));

    let log: Log = Rc::new(RefCell::new(vec![]));
    let before = ctx.pending_subscriptions();
    ctx.wait_for(Filter::by_props(&["foo"]), log_into(&log, "foo"));
    assert_eq!(*log.borrow(), vec!["foo:1".to_string()]);
    assert_eq!(ctx.pending_subscriptions(), before);
}

#[test]
fn test_subscription_fires_exactly_once() {
    let (ctx, registry) = setup(WebpackConfig::default());
    let log: Log = Rc::new(RefCell::new(vec![]));
    let filter = Filter::by_props(&["foo"]);
    ctx.wait_for(filter.clone(), log_into(&log, "foo"));
    assert!(ctx.is_waiting_for(&filter));

    for v in 1..=3 {
        registry.insert(v as u64, module(vec![("foo", 0), ("v", v)]));
    }
    assert_eq!(*log.borrow(), vec!["foo:1".to_string()]);
    assert!(!ctx.is_waiting_for(&filter));
}

#[test]
fn test_callbacks_fire_in_registration_order() {
    let (ctx, registry) = setup(WebpackConfig::default());
    let log: Log = Rc::new(RefCell::new(vec![]));
    ctx.wait_for(Filter::by_props(&["b"]), log_into(&log, "second"));
    ctx.wait_for(Filter::by_props(&["a"]), log_into(&log, "first"));
    ctx.wait_for(Filter::by_props(&["zzz"]), log_into(&log, "never"));

    registry.insert(1u64, module(vec![("a", 0), ("b", 0), ("v", 5)]));
    assert_eq!(
        *log.borrow(),
        vec!["second:5".to_string(), "first:5".to_string()]
    );
    assert_eq!(ctx.pending_subscriptions(), 1);
}

#[test]
fn test_equal_filters_subscribe_independently() {
    let (ctx, registry) = setup(WebpackConfig::default());
    let log: Log = Rc::new(RefCell::new(vec![]));
    ctx.wait_for(Filter::by_props(&["x"]), log_into(&log, "one"));
    ctx.wait_for(Filter::by_props(&["x"]), log_into(&log, "two"));
    assert_eq!(ctx.pending_subscriptions(), 2);

    registry.insert(1u64, module(vec![("x", 0), ("v", 1)]));
    assert_eq!(log.borrow().len(), 2);
}

#[test]
fn test_default_export_satisfies_subscription() {
    let (ctx, registry) = setup(WebpackConfig::default());
    let log: Log = Rc::new(RefCell::new(vec![]));
    ctx.wait_for(Filter::by_props(&["inner"]), log_into(&log, "d"));
    registry.insert(
        1u64,
        create_object(vec![("default", module(vec![("inner", 0), ("v", 3)]))]),
    );
    assert_eq!(*log.borrow(), vec!["d:3".to_string()]);
}

#[test]
fn test_subscriptions_made_before_the_handshake_are_kept() {
    let ctx = WebpackContext::default();
    let log: Log = Rc::new(RefCell::new(vec![]));
    ctx.wait_for(Filter::by_props(&["early"]), log_into(&log, "early"));
    assert_eq!(ctx.pending_subscriptions(), 1);

    let registry = ModuleRegistry::shared();
    ctx.init_webpack(registry.clone()).unwrap();
    registry.insert(1u64, module(vec![("early", 0), ("v", 9)]));
    assert_eq!(*log.borrow(), vec!["early:9".to_string()]);
}

#[test]
fn test_handshake_delivers_modules_already_loaded() {
    let ctx = WebpackContext::default();
    let log: Log = Rc::new(RefCell::new(vec![]));
    ctx.wait_for(Filter::by_props(&["early"]), log_into(&log, "early"));
    let early = ctx.wait_for_props_proxy(&["early"]);
    ctx.wait_for(Filter::by_props(&["late"]), log_into(&log, "late"));
    ctx.tasks().run_until_idle();

    let registry = ModuleRegistry::shared();
    registry.insert(1u64, module(vec![("early", 0), ("v", 9)]));
    ctx.init_webpack(registry.clone()).unwrap();

    assert_eq!(*log.borrow(), vec!["early:9".to_string()]);
    assert_eq!(ctx.pending_subscriptions(), 1);
    assert_eq!(get_v(&early, &key("v")).unwrap(), JsValue::from(9));

    registry.insert(2u64, module(vec![("late", 0), ("v", 3)]));
    assert_eq!(
        *log.borrow(),
        vec!["early:9".to_string(), "late:3".to_string()]
    );
}

#[test]
fn test_waiting_proxy_stands_for_the_transformed_module() {
    let (ctx, registry) = setup(WebpackConfig::default());
    let user = ctx.wait_for_proxy_with(Filter::by_props(&["currentUser"]), |m| {
        get_v(&m, &key("currentUser")).unwrap_or(JsValue::Undefined)
    });
    ctx.tasks().run_until_idle();

    registry.insert(
        1u64,
        create_object(vec![(
            "currentUser",
            create_object(vec![("id", JsValue::from(77))]),
        )]),
    );
    assert_eq!(get_v(&user, &key("id")).unwrap(), JsValue::from(77));
}

#[test]
fn test_indirect_waits_stay_out_of_the_history() {
    let (ctx, registry) = setup(WebpackConfig::default());
    let log: Log = Rc::new(RefCell::new(vec![]));
    let indirect = WaitOptions { is_indirect: true };
    ctx.wait_for_with(Filter::by_props(&["a"]), log_into(&log, "a"), indirect);
    let handle = ctx.wait_for_lazy_with(Filter::by_props(&["b"]), |m| m, indirect);
    assert!(ctx.search_history().is_empty());

    ctx.wait_for(Filter::by_props(&["c"]), |_| {});
    assert_eq!(ctx.search_history().len(), 1);

    registry.insert(1u64, module(vec![("a", 0), ("b", 0), ("v", 4)]));
    assert_eq!(*log.borrow(), vec!["a:4".to_string()]);
    assert_eq!(get_v(&handle.deferred_view(), &key("v")).unwrap(), JsValue::from(4));
}

#[test]
fn test_custom_filters_and_find_lazy() {
    let (ctx, registry) = setup(WebpackConfig::default());
    let answer = Filter::custom("answer is 42", |m| {
        get_v(m, &key("answer")).map_or(false, |v| v == JsValue::from(42))
    });
    let lazy = ctx.find_lazy(answer.clone());
    ctx.tasks().run_until_idle();

    registry.insert(1u64, module(vec![("answer", 41), ("v", 1)]));
    registry.insert(2u64, module(vec![("answer", 42), ("v", 2)]));
    assert_eq!(ctx.find(&answer).unwrap(), registry.exports(&ModuleId::Num(2)));
    assert_eq!(get_v(&lazy, &key("v")).unwrap(), JsValue::from(2));
    assert_eq!(ctx.search_history().len(), 1);
}

#[test]
fn test_listeners_run_before_subscriptions() {
    let (ctx, registry) = setup(WebpackConfig::default());
    let log: Log = Rc::new(RefCell::new(vec![]));
    let l = log.clone();
    ctx.add_listener(move |_, id| l.borrow_mut().push(format!("listener:{}", id)));
    ctx.wait_for(Filter::by_props(&["a"]), log_into(&log, "sub"));

    registry.insert(7u64, module(vec![("a", 0), ("v", 1)]));
    registry.insert("chunk", JsValue::Undefined);
    assert_eq!(
        *log.borrow(),
        vec![
            "listener:7".to_string(),
            "sub:1".to_string(),
            "listener:chunk".to_string()
        ]
    );
}

#[test]
fn test_required_module_resolves_waiting_proxy() {
    let (ctx, registry) = setup(WebpackConfig::default());
    registry.define_factory(
        5u64,
        ModuleFactory::new("function(e){e.getToken=function(){}}", |_, _, exports| {
            set_v(exports, key("getToken"), JsValue::from("token"))?;
            Ok(exports.clone())
        }),
    );
    let auth = ctx.wait_for_props_proxy(&["getToken"]);
    ctx.tasks().run_until_idle();

    registry.require(5u64).unwrap();
    assert_eq!(get_v(&auth, &key("getToken")).unwrap(), JsValue::from("token"));
    // Requiring again hits the cache and fires nothing.
    assert_eq!(registry.len(), 1);
    registry.require(5u64).unwrap();
    assert_eq!(registry.len(), 1);
}

// ============================================================================
// Eager lookups
// ============================================================================

#[test]
fn test_bulk_reports_partial_results_when_lenient() {
    let (ctx, registry) = setup(WebpackConfig::default());
    registry.insert(1u64, module(vec![("p1", 1)]));

    let bulk = ctx
        .find_bulk(&[Filter::by_props(&["p1"]), Filter::by_props(&["p2"])])
        .unwrap();
    assert_eq!((bulk.found, bulk.total), (1, 2));
    assert_eq!(bulk.results[0], registry.exports(&ModuleId::Num(1)));
    assert_eq!(bulk.results[1], None);
}

#[test]
fn test_bulk_policy_in_strict_mode() {
    let (ctx, registry) = setup(WebpackConfig::strict());
    registry.insert(1u64, module(vec![("p1", 1)]));

    match ctx.find_bulk(&[Filter::by_props(&["p1"]), Filter::by_props(&["p2"])]) {
        Err(WebpackError::BulkIncomplete { found, total }) => assert_eq!((found, total), (1, 2)),
        other => panic!("unexpected {:?}", other.map(|b| b.found)),
    }
    assert!(matches!(ctx.find_bulk(&[]), Err(WebpackError::InvalidBulk(_))));
    assert!(matches!(
        ctx.find_bulk(&[Filter::by_props(&["p1"])]),
        Err(WebpackError::InvalidBulk(_))
    ));

    ctx.set_devtools_open(true);
    assert_eq!(ctx.effective_mode(), LookupMode::Lenient);
    let single = ctx.find_bulk(&[Filter::by_props(&["p1"])]).unwrap();
    assert!(single.is_complete());
}

#[test]
fn test_finders() {
    let (ctx, registry) = setup(WebpackConfig::default());
    registry.insert(1u64, module(vec![("getUser", 1), ("getUsers", 2)]));
    registry.insert(2u64, store("UserStore"));
    registry.insert(
        3u64,
        NativeFunctionObject::from_source("Popout", "function Popout(){return renderPopout()}")
            .into_value(),
    );

    assert!(ctx.find_by_props(&["getUser", "getUsers"]).unwrap().is_some());
    assert_eq!(
        ctx.find_store("UserStore").unwrap(),
        registry.exports(&ModuleId::Num(2))
    );
    assert_eq!(
        ctx.find_by_code(&["renderPopout"]).unwrap(),
        registry.exports(&ModuleId::Num(3))
    );
    assert_eq!(ctx.find_all(&Filter::by_props(&["getUser"])).unwrap().len(), 1);
    assert_eq!(ctx.find_store("GuildStore").unwrap(), None);
}

#[test]
fn test_factory_source_lookups() {
    let (ctx, registry) = setup(WebpackConfig::strict());
    registry.define_factory(10u64, ModuleFactory::from_source("function(e,t,n){n.d(t,{Z:()=>Modal})}"));

    assert_eq!(ctx.find_module_id(&["Modal"]).unwrap(), Some(ModuleId::Num(10)));
    let factory = ctx.find_module_factory(&["n.d(t"]).unwrap().unwrap();
    assert!(factory.source().contains("Modal"));
    assert!(matches!(
        ctx.find_module_id(&["Tooltip"]),
        Err(WebpackError::LookupExhausted { .. })
    ));

    let extracted = ctx.extract(&ModuleId::Num(10)).unwrap();
    assert!(extracted.contains("0,function(e,t,n)"));
    assert!(matches!(
        ctx.extract(&ModuleId::Num(11)),
        Err(WebpackError::ModuleNotFound(ModuleId::Num(11)))
    ));
}

#[test]
fn test_lazy_find_in_strict_mode_fails_on_access() {
    let (ctx, _registry) = setup(WebpackConfig::strict());
    let missing = ctx.find_by_props_lazy(&["nothing"]);
    ctx.tasks().run_until_idle();
    assert!(get_v(&missing, &key("x")).is_err());
}
