//! End-to-end tests: a registry filled over time, lazy lookups made before the
//! modules exist, and the diagnostics run afterwards.

extern crate lazy_webpack;

use lazy_webpack::runner::ds::object_property::PropertyKey;
use lazy_webpack::runner::ds::operations::object::{create_object, get_v};
use lazy_webpack::runner::ds::value::JsValue;
use lazy_webpack::runner::lazy::handle::{is_lazy, unwrap_lazy};
use lazy_webpack::runner::webpack::config::{LookupMode, WebpackConfig};
use lazy_webpack::runner::webpack::context::WebpackContext;
use lazy_webpack::runner::webpack::error::WebpackError;
use lazy_webpack::runner::webpack::filters::Filter;
use lazy_webpack::runner::webpack::history::ReplayOutcome;
use lazy_webpack::runner::webpack::query::QueryResult;
use lazy_webpack::runner::webpack::registry::{ModuleId, ModuleRegistry};
use lazy_webpack::runner::webpack::snapshot::Snapshot;
use pretty_assertions::assert_eq;
use std::fs;
use std::rc::Rc;

fn key(k: &str) -> PropertyKey {
    PropertyKey::from(k)
}

fn setup() -> (WebpackContext, Rc<ModuleRegistry>) {
    let ctx = WebpackContext::default();
    let registry = ModuleRegistry::shared();
    ctx.init_webpack(registry.clone()).unwrap();
    (ctx, registry)
}

const SNAPSHOT: &str = r#"{
    "modules": {
        "100": { "getUser": { "$function": "function(e){return u[e]}", "name": "getUser" }, "getCurrentUser": 1 },
        "101": { "default": { "constructor": { "displayName": "GuildStore" }, "getGuild": 1 } },
        "102": { "$function": "function ContextMenu(e){return openContextMenu(e)}", "name": "ContextMenu" }
    },
    "factories": {
        "100": "function(e,t,n){n.d(t,{getUser:()=>r,getCurrentUser:()=>i})}",
        "102": "function(e,t,n){e.exports=function ContextMenu(e){return openContextMenu(e)}}"
    }
}"#;

#[test]
fn test_wait_for_proxy_end_to_end() {
    let (ctx, registry) = setup();
    assert!(registry.is_empty());

    let h = ctx.wait_for_proxy(Filter::by_props(&["foo"]));
    assert!(is_lazy(&h));

    registry.insert(1u64, create_object(vec![("foo", JsValue::from(1)), ("bar", JsValue::from(2))]));
    ctx.tasks().run_until_idle();

    assert_eq!(get_v(&h, &key("foo")).unwrap(), JsValue::from(1));
    assert_eq!(get_v(&h, &key("bar")).unwrap(), JsValue::from(2));
}

#[test]
fn test_module_scope_destructuring_before_load() {
    let (ctx, registry) = setup();

    // const { getUser, getCurrentUser } = findByPropsLazy("getUser", "getCurrentUser");
    let users = ctx.wait_for_props_proxy(&["getUser", "getCurrentUser"]);
    let get_user = get_v(&users, &key("getUser")).unwrap();
    let get_current_user = get_v(&users, &key("getCurrentUser")).unwrap();
    assert!(is_lazy(&get_user));
    assert!(is_lazy(&get_current_user));

    ctx.tasks().run_until_idle();
    Snapshot::parse(SNAPSHOT).unwrap().populate(&registry).unwrap();

    assert_eq!(unwrap_lazy(&get_current_user).unwrap(), JsValue::from(1));
    let resolved = unwrap_lazy(&get_user).unwrap();
    assert_eq!(
        get_v(&resolved, &key("name")).unwrap(),
        JsValue::from("getUser")
    );
}

#[test]
fn test_lazy_finders_resolve_on_first_use() {
    let (ctx, registry) = setup();
    let guilds = ctx.find_store_lazy("GuildStore");
    let menu = ctx.find_by_code_lazy(&["openContextMenu"]);
    ctx.tasks().run_until_idle();

    Snapshot::parse(SNAPSHOT).unwrap().populate(&registry).unwrap();
    assert_eq!(get_v(&guilds, &key("getGuild")).unwrap(), JsValue::from(1));
    assert_eq!(
        get_v(&menu, &key("name")).unwrap(),
        JsValue::from("ContextMenu")
    );
}

#[test]
fn test_search_history_replay() {
    let (ctx, registry) = setup();
    let _ = ctx.find_by_props_lazy(&["getUser"]);
    let _ = ctx.wait_for_store_proxy("GuildStore");
    let _ = ctx.wait_for_code_proxy(&["neverInTheBundle"]);
    let _ = ctx.proxy_lazy_webpack(|| Ok(JsValue::Undefined), Some(1), "settings store");
    ctx.wait_for(Filter::by_props(&["getCurrentUser"]), |_| {});

    Snapshot::parse(SNAPSHOT).unwrap().populate(&registry).unwrap();

    let queries: Vec<String> = ctx
        .search_history()
        .iter()
        .map(|r| r.to_string())
        .collect();
    assert_eq!(
        queries,
        vec![
            "findByProps(\"getUser\")",
            "waitForStore(\"GuildStore\")",
            "waitForCode(\"neverInTheBundle\")",
            "proxyLazyWebpack(<settings store>)",
            "waitFor(byProps(\"getCurrentUser\"))",
        ]
    );

    let outcomes: Vec<ReplayOutcome> = ctx
        .replay_search_history()
        .unwrap()
        .into_iter()
        .map(|r| r.outcome)
        .collect();
    assert_eq!(
        outcomes,
        vec![
            ReplayOutcome::Found,
            ReplayOutcome::Found,
            ReplayOutcome::Missing,
            ReplayOutcome::Skipped,
            ReplayOutcome::Found,
        ]
    );

    // Every recorded lookup renders as a query that runs.
    for query in &queries[..3] {
        assert!(ctx.run_query(query).is_ok(), "{} should parse", query);
    }
}

#[test]
fn test_queries_against_a_snapshot() {
    let (ctx, registry) = setup();
    Snapshot::parse(SNAPSHOT).unwrap().populate(&registry).unwrap();

    match ctx.run_query("findBulk(byProps(\"getUser\"), byStoreName(\"GuildStore\"))").unwrap() {
        QueryResult::Bulk(bulk) => assert!(bulk.is_complete()),
        other => panic!("unexpected {}", other),
    }
    match ctx.run_query("findModuleId(\"openContextMenu\")").unwrap() {
        QueryResult::ModuleId(id) => assert_eq!(id, Some(ModuleId::Num(102))),
        other => panic!("unexpected {}", other),
    }
    match ctx.run_query("search(/getCurrent\\w+/)").unwrap() {
        QueryResult::Sources(found) => {
            assert_eq!(found.keys().cloned().collect::<Vec<_>>(), vec![ModuleId::Num(100)])
        }
        other => panic!("unexpected {}", other),
    }
    match ctx.run_query("extract(100)").unwrap() {
        QueryResult::Source(Some(text)) => {
            assert!(text.starts_with("// [EXTRACTED] WebpackModule100"))
        }
        other => panic!("unexpected {}", other),
    }
    assert!(!ctx.run_query("findStore(\"ChannelStore\")").unwrap().is_found());
    assert!(matches!(
        ctx.run_query("findByProps(\"a\""),
        Err(WebpackError::InvalidQuery(_))
    ));

    // Queries never touch the history.
    assert!(ctx.search_history().is_empty());
}

#[test]
fn test_config_file_drives_lookup_policy() {
    let dir = std::env::temp_dir().join(format!("lazy-webpack-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join("lookup.toml");
    fs::write(&path, "[lookup]\nmode = \"strict\"\nmax_attempts = 2\n").unwrap();

    let config = WebpackConfig::load(&path).unwrap();
    assert_eq!(config.mode, LookupMode::Strict);
    assert_eq!(config.max_attempts, 2);

    let ctx = WebpackContext::new(config);
    ctx.init_webpack(ModuleRegistry::shared()).unwrap();
    assert!(matches!(
        ctx.find(&Filter::by_props(&["missing"])),
        Err(WebpackError::LookupExhausted { .. })
    ));

    assert!(matches!(
        WebpackConfig::load(&dir.join("absent.toml")),
        Err(WebpackError::Io { .. })
    ));
    let _ = fs::remove_dir_all(&dir);
}
