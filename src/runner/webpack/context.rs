//! The lookup service.
//!
//! A [`WebpackContext`] owns everything that used to be module-level state: the
//! registry reference handed over by the bootstrap handshake, the subscription
//! table, insertion listeners, the search history and the task queue that
//! decides when a proxy's same-tick window closes. It is cheap to clone; clones
//! share all of it.

use std::cell::{Cell, Ref, RefCell};
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use tracing::{debug, error, warn};

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::value::JsValue;
use crate::runner::lazy::handle::{self, LazyHandle, Resolver};
use crate::runner::lazy::scheduler::TaskQueue;
use crate::runner::webpack::config::{LookupMode, WebpackConfig};
use crate::runner::webpack::error::WebpackError;
use crate::runner::webpack::filters::{quote_all, Filter};
use crate::runner::webpack::history::{
    LookupMethod, ReplayOutcome, ReplayReport, SearchArgs, SearchHistory, SearchRecord,
};
use crate::runner::webpack::query::{Query, QueryResult};
use crate::runner::webpack::registry::{ModuleFactory, ModuleId, ModuleRegistry};
use crate::runner::webpack::scanner::{self, BulkMatches, SearchTerm};
use crate::runner::webpack::subscriptions::SubscriptionTable;

type Listener = Rc<dyn Fn(&JsValue, &ModuleId)>;

/// Options for the `wait_for` family.
#[derive(Clone, Copy, Debug, Default)]
pub struct WaitOptions {
    /// The lookup is made on behalf of another one that is already recorded, so
    /// it stays out of the search history.
    pub is_indirect: bool,
}

struct ContextInner {
    config: RefCell<WebpackConfig>,
    registry: RefCell<Option<Rc<ModuleRegistry>>>,
    subscriptions: RefCell<SubscriptionTable>,
    listeners: RefCell<Vec<Listener>>,
    history: RefCell<SearchHistory>,
    tasks: TaskQueue,
    devtools_open: Cell<bool>,
}

#[derive(Clone)]
pub struct WebpackContext {
    inner: Rc<ContextInner>,
}

impl Default for WebpackContext {
    fn default() -> Self {
        WebpackContext::new(WebpackConfig::default())
    }
}

impl WebpackContext {
    pub fn new(config: WebpackConfig) -> Self {
        WebpackContext {
            inner: Rc::new(ContextInner {
                config: RefCell::new(config),
                registry: RefCell::new(None),
                subscriptions: RefCell::new(SubscriptionTable::new()),
                listeners: RefCell::new(vec![]),
                history: RefCell::new(SearchHistory::new()),
                tasks: TaskQueue::new(),
                devtools_open: Cell::new(false),
            }),
        }
    }

    /// The bootstrap handshake. Hooks the context into the registry's insertions;
    /// a second call is a host integration bug and fails.
    ///
    /// Subscriptions made before the handshake are first checked against the
    /// modules the registry already holds, in registration order.
    pub fn init_webpack(&self, registry: Rc<ModuleRegistry>) -> Result<(), WebpackError> {
        if self.inner.registry.borrow().is_some() {
            error!(target: "webpack", "webpack registry handed over twice");
            return Err(WebpackError::AlreadyInitialized);
        }
        let weak: Weak<ContextInner> = Rc::downgrade(&self.inner);
        registry.add_hook(move |id, exports| {
            if let Some(inner) = weak.upgrade() {
                WebpackContext { inner }.on_module_inserted(exports, id);
            }
        });
        *self.inner.registry.borrow_mut() = Some(registry.clone());
        debug!(target: "webpack", "webpack registry initialised");

        let filters = self.inner.subscriptions.borrow().filters();
        for filter in filters {
            if let Some(m) = scanner::find_first_match(&registry, &filter) {
                self.fire(&filter, m, "module already loaded");
            }
        }
        Ok(())
    }

    /// Removes the subscription for `filter` and hands it `module`.
    fn fire(&self, filter: &Filter, module: JsValue, reason: &str) {
        let callback = self.inner.subscriptions.borrow_mut().remove(filter);
        if let Some(callback) = callback {
            debug!(target: "webpack", filter = %filter, reason, "subscription fired");
            callback(module);
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.registry.borrow().is_some()
    }

    pub fn registry(&self) -> Result<Rc<ModuleRegistry>, WebpackError> {
        self.inner
            .registry
            .borrow()
            .clone()
            .ok_or(WebpackError::RegistryUnavailable)
    }

    pub fn config(&self) -> Ref<'_, WebpackConfig> {
        self.inner.config.borrow()
    }

    pub fn set_config(&self, config: WebpackConfig) {
        *self.inner.config.borrow_mut() = config;
    }

    pub fn tasks(&self) -> &TaskQueue {
        &self.inner.tasks
    }

    /// Strict failures are suppressed while developer tools are open.
    pub fn set_devtools_open(&self, open: bool) {
        self.inner.devtools_open.set(open);
    }

    pub fn devtools_open(&self) -> bool {
        self.inner.devtools_open.get()
    }

    pub fn effective_mode(&self) -> LookupMode {
        if self.devtools_open() {
            LookupMode::Lenient
        } else {
            self.config().mode
        }
    }

    fn max_attempts(&self) -> u32 {
        self.config().max_attempts
    }

    fn handle_module_not_found(&self, method: &str, filter: &str) -> Result<(), WebpackError> {
        match self.effective_mode() {
            LookupMode::Strict => {
                error!(target: "webpack", method, filter, "module not found");
                Err(WebpackError::LookupExhausted {
                    method: method.to_string(),
                    filter: filter.to_string(),
                })
            }
            LookupMode::Lenient => {
                warn!(target: "webpack", method, filter, "module not found");
                Ok(())
            }
        }
    }

    fn record(&self, method: LookupMethod, args: SearchArgs) {
        if self.config().record_search_history {
            self.inner
                .history
                .borrow_mut()
                .push(SearchRecord::new(method, args));
        }
    }

    fn find_with(&self, method: LookupMethod, filter: &Filter) -> Result<Option<JsValue>, WebpackError> {
        let registry = self.registry()?;
        match scanner::find_first_match(&registry, filter) {
            Some(m) => Ok(Some(m)),
            None => {
                self.handle_module_not_found(method.name(), &filter.describe_args())?;
                Ok(None)
            }
        }
    }

    // Eager finders

    /// The first loaded module matching `filter`.
    pub fn find(&self, filter: &Filter) -> Result<Option<JsValue>, WebpackError> {
        self.find_with(LookupMethod::Find, filter)
    }

    pub fn find_all(&self, filter: &Filter) -> Result<Vec<JsValue>, WebpackError> {
        let registry = self.registry()?;
        Ok(scanner::find_all_matches(&registry, filter))
    }

    /// Finds several modules in one pass. Incomplete results are an error in
    /// strict mode and a warning otherwise; either way nothing is searched twice.
    pub fn find_bulk(&self, filters: &[Filter]) -> Result<BulkMatches, WebpackError> {
        match filters.len() {
            0 => Err(WebpackError::InvalidBulk(
                "findBulk called with no filters".to_string(),
            )),
            1 => match self.effective_mode() {
                LookupMode::Strict => Err(WebpackError::InvalidBulk(
                    "findBulk called with only one filter, use find".to_string(),
                )),
                LookupMode::Lenient => {
                    warn!(target: "webpack", "findBulk called with only one filter, using find");
                    let found = self.find(&filters[0])?;
                    Ok(BulkMatches {
                        found: found.is_some() as usize,
                        results: vec![found],
                        total: 1,
                    })
                }
            },
            _ => {
                let registry = self.registry()?;
                let matches = scanner::find_bulk(&registry, filters);
                if matches.is_complete() {
                    return Ok(matches);
                }
                match self.effective_mode() {
                    LookupMode::Strict => {
                        error!(target: "webpack", found = matches.found, total = matches.total,
                            "findBulk did not find every module");
                        Err(WebpackError::BulkIncomplete {
                            found: matches.found,
                            total: matches.total,
                        })
                    }
                    LookupMode::Lenient => {
                        warn!(target: "webpack", found = matches.found, total = matches.total,
                            "findBulk did not find every module");
                        Ok(matches)
                    }
                }
            }
        }
    }

    pub fn find_by_props<S: AsRef<str>>(&self, props: &[S]) -> Result<Option<JsValue>, WebpackError> {
        self.find_with(LookupMethod::FindByProps, &Filter::by_props(props))
    }

    pub fn find_by_code<S: AsRef<str>>(&self, code: &[S]) -> Result<Option<JsValue>, WebpackError> {
        self.find_with(LookupMethod::FindByCode, &Filter::by_code(code))
    }

    pub fn find_store(&self, name: &str) -> Result<Option<JsValue>, WebpackError> {
        self.find_with(LookupMethod::FindStore, &Filter::by_store_name(name))
    }

    // Lazy finders

    fn lazy_find(&self, method: LookupMethod, filter: Filter) -> JsValue {
        let ctx = self.clone();
        handle::proxy_lazy(
            self.tasks(),
            move || {
                ctx.find_with(method, &filter)
                    .map(|m| m.unwrap_or(JsValue::Undefined))
                    .map_err(JErrorType::from)
            },
            self.max_attempts(),
        )
    }

    pub fn find_lazy(&self, filter: Filter) -> JsValue {
        self.record(LookupMethod::Find, SearchArgs::Filter(filter.clone()));
        self.lazy_find(LookupMethod::Find, filter)
    }

    pub fn find_by_props_lazy<S: AsRef<str>>(&self, props: &[S]) -> JsValue {
        self.record(LookupMethod::FindByProps, SearchArgs::Text(to_strings(props)));
        self.lazy_find(LookupMethod::FindByProps, Filter::by_props(props))
    }

    pub fn find_by_code_lazy<S: AsRef<str>>(&self, code: &[S]) -> JsValue {
        self.record(LookupMethod::FindByCode, SearchArgs::Text(to_strings(code)));
        self.lazy_find(LookupMethod::FindByCode, Filter::by_code(code))
    }

    pub fn find_store_lazy(&self, name: &str) -> JsValue {
        self.record(LookupMethod::FindStore, SearchArgs::Text(vec![name.to_string()]));
        self.lazy_find(LookupMethod::FindStore, Filter::by_store_name(name))
    }

    /// A proxy over an arbitrary factory, recorded in the history as opaque.
    pub fn proxy_lazy_webpack<F>(&self, factory: F, attempts: Option<u32>, description: &str) -> JsValue
    where
        F: Fn() -> Result<JsValue, JErrorType> + 'static,
    {
        self.record(
            LookupMethod::ProxyLazyWebpack,
            SearchArgs::Factory(description.to_string()),
        );
        let attempts = attempts.unwrap_or_else(|| self.max_attempts());
        handle::lazy_handle(self.tasks(), factory, attempts).proxy()
    }

    /// A proxy plus its resolver, for targets found by other means.
    pub fn deferred_proxy(&self) -> (LazyHandle, Resolver) {
        handle::deferred_proxy(self.tasks())
    }

    // Waiting

    /// Delivers a match now if one is loaded, otherwise on the first matching insertion.
    fn subscribe(&self, filter: Filter, callback: Box<dyn FnOnce(JsValue)>) {
        let registry = self.inner.registry.borrow().clone();
        if let Some(registry) = registry {
            if let Some(m) = scanner::find_first_match(&registry, &filter) {
                debug!(target: "webpack", filter = %filter, "module already loaded");
                callback(m);
                return;
            }
        }
        self.inner
            .subscriptions
            .borrow_mut()
            .insert(filter, callback);
    }

    /// The proxy's target becomes `transform(module)` once a module matches.
    fn waiting_handle<T>(&self, filter: Filter, transform: T) -> LazyHandle
    where
        T: FnOnce(JsValue) -> JsValue + 'static,
    {
        let (handle, resolver) = self.deferred_proxy();
        self.subscribe(
            filter,
            Box::new(move |m| {
                resolver.set(transform(m));
            }),
        );
        handle
    }

    /// Calls `callback` exactly once with the first module matching `filter`.
    pub fn wait_for<F: FnOnce(JsValue) + 'static>(&self, filter: Filter, callback: F) {
        self.wait_for_with(filter, callback, WaitOptions::default())
    }

    pub fn wait_for_with<F: FnOnce(JsValue) + 'static>(
        &self,
        filter: Filter,
        callback: F,
        options: WaitOptions,
    ) {
        if !options.is_indirect {
            self.record(LookupMethod::WaitFor, SearchArgs::Filter(filter.clone()));
        }
        self.subscribe(filter, Box::new(callback));
    }

    pub fn wait_for_lazy(&self, filter: Filter) -> LazyHandle {
        self.wait_for_lazy_with(filter, |m| m, WaitOptions::default())
    }

    /// Like [`wait_for_lazy`](Self::wait_for_lazy), with the handle standing for
    /// `transform(module)` instead of the module itself.
    pub fn wait_for_lazy_with<T>(&self, filter: Filter, transform: T, options: WaitOptions) -> LazyHandle
    where
        T: FnOnce(JsValue) -> JsValue + 'static,
    {
        if !options.is_indirect {
            self.record(LookupMethod::WaitFor, SearchArgs::Filter(filter.clone()));
        }
        self.waiting_handle(filter, transform)
    }

    pub fn wait_for_proxy(&self, filter: Filter) -> JsValue {
        self.wait_for_lazy(filter).proxy()
    }

    pub fn wait_for_proxy_with<T>(&self, filter: Filter, transform: T) -> JsValue
    where
        T: FnOnce(JsValue) -> JsValue + 'static,
    {
        self.wait_for_lazy_with(filter, transform, WaitOptions::default())
            .proxy()
    }

    pub fn wait_for_props_proxy<S: AsRef<str>>(&self, props: &[S]) -> JsValue {
        self.record(LookupMethod::WaitForProps, SearchArgs::Text(to_strings(props)));
        self.waiting_handle(Filter::by_props(props), |m| m).proxy()
    }

    pub fn wait_for_code_proxy<S: AsRef<str>>(&self, code: &[S]) -> JsValue {
        self.record(LookupMethod::WaitForCode, SearchArgs::Text(to_strings(code)));
        self.waiting_handle(Filter::by_code(code), |m| m).proxy()
    }

    pub fn wait_for_store_proxy(&self, name: &str) -> JsValue {
        self.record(LookupMethod::WaitForStore, SearchArgs::Text(vec![name.to_string()]));
        self.waiting_handle(Filter::by_store_name(name), |m| m).proxy()
    }

    pub fn pending_subscriptions(&self) -> usize {
        self.inner.subscriptions.borrow().len()
    }

    pub fn is_waiting_for(&self, filter: &Filter) -> bool {
        self.inner.subscriptions.borrow().contains(filter)
    }

    /// Called with every module inserted from now on, before subscriptions are checked.
    pub fn add_listener<F: Fn(&JsValue, &ModuleId) + 'static>(&self, listener: F) {
        self.inner.listeners.borrow_mut().push(Rc::new(listener));
    }

    fn on_module_inserted(&self, exports: &JsValue, id: &ModuleId) {
        let listeners = self.inner.listeners.borrow().clone();
        for listener in listeners {
            listener(exports, id);
        }

        if exports.is_nullish() {
            return;
        }
        let filters = self.inner.subscriptions.borrow().filters();
        for filter in filters {
            if let Some(m) = scanner::match_exports(&filter, exports) {
                self.fire(&filter, m, &format!("module {} inserted", id));
            }
        }
    }

    // Factory source

    pub fn find_module_id<S: AsRef<str>>(&self, code: &[S]) -> Result<Option<ModuleId>, WebpackError> {
        let registry = self.registry()?;
        match scanner::find_module_id(&registry, code) {
            Some(id) => Ok(Some(id)),
            None => {
                self.handle_module_not_found("findModuleId", &quote_all(&to_strings(code)))?;
                Ok(None)
            }
        }
    }

    pub fn find_module_factory<S: AsRef<str>>(
        &self,
        code: &[S],
    ) -> Result<Option<ModuleFactory>, WebpackError> {
        let registry = self.registry()?;
        match scanner::find_module_id(&registry, code) {
            Some(id) => Ok(registry.factory(&id)),
            None => {
                self.handle_module_not_found("findModuleFactory", &quote_all(&to_strings(code)))?;
                Ok(None)
            }
        }
    }

    pub fn search(&self, terms: &[SearchTerm]) -> Result<IndexMap<ModuleId, String>, WebpackError> {
        let registry = self.registry()?;
        Ok(scanner::search(&registry, terms))
    }

    pub fn extract(&self, id: &ModuleId) -> Result<String, WebpackError> {
        let registry = self.registry()?;
        scanner::extract(&registry, id).ok_or_else(|| WebpackError::ModuleNotFound(id.clone()))
    }

    // Diagnostics

    pub fn search_history(&self) -> Vec<SearchRecord> {
        self.inner.history.borrow().records().to_vec()
    }

    /// Parses and runs one lookup query. Nothing is logged or recorded.
    pub fn run_query(&self, text: &str) -> Result<QueryResult, WebpackError> {
        let query = Query::parse(text)?;
        let registry = self.registry()?;
        Ok(query.run(&registry))
    }

    /// Re-runs every recorded lookup eagerly against the registry as it is now.
    pub fn replay_search_history(&self) -> Result<Vec<ReplayReport>, WebpackError> {
        let registry = self.registry()?;
        Ok(self
            .search_history()
            .into_iter()
            .map(|record| {
                let outcome = match Query::from_record(&record) {
                    Some(query) if query.run(&registry).is_found() => ReplayOutcome::Found,
                    Some(_) => ReplayOutcome::Missing,
                    None => ReplayOutcome::Skipped,
                };
                ReplayReport { record, outcome }
            })
            .collect())
    }
}

fn to_strings<S: AsRef<str>>(args: &[S]) -> Vec<String> {
    args.iter().map(|a| a.as_ref().to_string()).collect()
}
