//! The plugin runtime: caches, dynamic hooks and dispatch for one host
//!
//! All mutable state lives in a `Runtime`; independent runtimes never share
//! anything, so several can coexist in one process.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::commands::{self, CommandRegistrar, ExtensionSource};
use crate::config::RuntimeOptions;
use crate::hooks::loader::{self, HookFile};
use crate::hooks::{
    Collected, DetailedOutcome, DispatchNotice, DispatchOptions, Dispatcher, FnHandler,
    HandlerFailure, HookCallable, HookContext, HookName, HookRegistry, PendingHandler, ResolvedHook,
};
use crate::locator::{self, ModuleMap, NamePattern};
use crate::manifest::{CombinedConfig, Composer, Manifest};
use crate::module::Module;
use crate::{HookError, Result};

/// Located modules by name, in locator order
pub type ModuleSet = IndexMap<String, Arc<Module>>;

/// Plugin runtime for one host application
#[derive(Debug)]
pub struct Runtime {
    options: RuntimeOptions,
    pattern: NamePattern,
    composer: RwLock<Arc<Composer>>,
    host_name: RwLock<String>,
    modules: RwLock<Option<Arc<ModuleSet>>>,
    combined: RwLock<Option<Arc<CombinedConfig>>>,
    hook_files: RwLock<HashMap<PathBuf, Arc<HookFile>>>,
    registry: HookRegistry,
    dispatcher: Dispatcher,
    initialized: AtomicBool,
}

impl Runtime {
    /// Create a runtime
    ///
    /// Nothing is scanned until first use.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidPrefix` if the naming prefix is unusable, or
    /// `Error::Config` for an invalid custom pattern
    pub fn new(options: RuntimeOptions) -> Result<Self> {
        let pattern = match &options.patterns {
            Some(patterns) => NamePattern::with_patterns(&options.prefix, patterns)?,
            None => NamePattern::new(&options.prefix)?,
        };
        let composer = composer_for(&options, &options.project_dir);
        let host_name = locator::project_name(&options.project_dir);

        Ok(Self {
            options,
            pattern,
            composer: RwLock::new(Arc::new(composer)),
            host_name: RwLock::new(host_name),
            modules: RwLock::new(None),
            combined: RwLock::new(None),
            hook_files: RwLock::new(HashMap::new()),
            registry: HookRegistry::new(),
            dispatcher: Dispatcher::new(),
            initialized: AtomicBool::new(false),
        })
    }

    /// Options this runtime was built from
    #[must_use]
    pub const fn options(&self) -> &RuntimeOptions {
        &self.options
    }

    /// Name the host answers hooks under
    ///
    /// Read from the project's `Cargo.toml`, cached like the module scan.
    #[must_use]
    pub fn host_name(&self) -> String {
        if self.options.no_cache {
            return locator::project_name(&self.options.project_dir);
        }
        read(&self.host_name).clone()
    }

    /// Manifest composer; holds the host's package metadata once read
    fn composer(&self) -> Arc<Composer> {
        if self.options.no_cache {
            return Arc::new(composer_for(&self.options, &self.options.project_dir));
        }
        Arc::clone(&read(&self.composer))
    }

    /// Scan modules and build the combined config
    ///
    /// Idempotent until [`teardown`](Self::teardown).
    pub fn initialize(&self) {
        if self.initialized.swap(true, Ordering::SeqCst) {
            return;
        }
        let modules = self.modules();
        let _ = self.combined_config();
        let composer = self.composer();
        tracing::info!(
            project = %self.options.project_dir.display(),
            prefix = %self.pattern.prefix(),
            config = %composer.config_name(),
            env = ?composer.env(),
            modules = modules.len(),
            "plugin runtime initialized"
        );
    }

    /// Drop caches and dynamic hooks
    ///
    /// Idempotent until the next [`initialize`](Self::initialize).
    pub fn teardown(&self) {
        if !self.initialized.swap(false, Ordering::SeqCst) {
            return;
        }
        self.clear_cache();
        self.registry.clear();
        tracing::info!("plugin runtime torn down");
    }

    /// Located modules, name to path
    #[must_use]
    pub fn locate(&self) -> ModuleMap {
        self.modules()
            .iter()
            .map(|(name, module)| (name.clone(), module.path().to_path_buf()))
            .collect()
    }

    /// Forget located modules, composed manifests, host package metadata and
    /// loaded hook files
    pub fn clear_cache(&self) {
        *write(&self.modules) = None;
        *write(&self.combined) = None;
        write(&self.hook_files).clear();
        *write(&self.composer) = Arc::new(composer_for(&self.options, &self.options.project_dir));
        *write(&self.host_name) = locator::project_name(&self.options.project_dir);
        tracing::debug!("runtime caches cleared");
    }

    /// Located modules, scanning on first use (or every use without caching)
    #[must_use]
    pub fn modules(&self) -> Arc<ModuleSet> {
        let cached = if self.options.no_cache {
            None
        } else {
            read(&self.modules).clone()
        };
        if let Some(modules) = cached {
            return modules;
        }

        let modules = Arc::new(scan(&self.options, &self.pattern));
        if !self.options.no_cache {
            *write(&self.modules) = Some(Arc::clone(&modules));
        }
        modules
    }

    /// Combined configuration, built on first use
    #[must_use]
    pub fn combined_config(&self) -> Arc<CombinedConfig> {
        let cached = if self.options.no_cache {
            None
        } else {
            read(&self.combined).clone()
        };
        if let Some(combined) = cached {
            return combined;
        }

        let modules = self.modules();
        let combined = Arc::new(build_combined(
            &modules,
            &self.composer(),
            &self.options.project_dir,
            &self.options.app_name,
        ));
        if !self.options.no_cache {
            *write(&self.combined) = Some(Arc::clone(&combined));
        }
        combined
    }

    /// Combined configuration for another project directory
    ///
    /// Bypasses every cache and leaves them untouched.
    #[must_use]
    pub fn combined_config_for(&self, project_dir: &Path) -> CombinedConfig {
        let mut options = self.options.clone();
        options.project_dir = project_dir.to_path_buf();

        let modules = scan(&options, &self.pattern);
        let composer = composer_for(&options, project_dir);
        build_combined(&modules, &composer, project_dir, &options.app_name)
    }

    /// Register an in-memory handler
    ///
    /// A namespaced `name` (`ns:event`) only answers that namespace.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidHookName` for a malformed name
    pub fn add_hook(&self, name: &str, owner: &str, handler: Arc<dyn HookCallable>) -> Result<()> {
        let name = HookName::parse(name)?;
        self.registry.register(&name, owner, handler);
        tracing::debug!(
            hook = %name,
            handlers = self.registry.handler_count(name.event()),
            "dynamic handlers for event"
        );
        Ok(())
    }

    /// Register an async closure as a handler
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidHookName` for a malformed name
    pub fn add_fn_hook<F, Fut>(&self, name: &str, owner: &str, handler: F) -> Result<()>
    where
        F: Fn(HookContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<Value, HookError>> + Send + 'static,
    {
        self.add_hook(name, owner, Arc::new(FnHandler::new(handler)))
    }

    /// Remove in-memory handlers, returning how many were removed
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidHookName` for a malformed name
    pub fn remove_hook(&self, name: &str, owner: Option<&str>) -> Result<usize> {
        let name = HookName::parse(name)?;
        Ok(self.registry.remove(&name, owner))
    }

    /// Subscribe to dispatch lifecycle notices
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DispatchNotice> {
        self.dispatcher.subscribe()
    }

    /// Dispatch a hook and deserialize the merged result
    ///
    /// # Errors
    ///
    /// Returns error for an invalid hook name, a handler failure under
    /// `strict`, or a merged result that does not deserialize into `T`
    pub async fn invoke<T: DeserializeOwned>(&self, name: &str, options: &DispatchOptions) -> Result<T> {
        let value = self.invoke_value(name, options).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Dispatch a hook and return the merged result
    ///
    /// Handler failures are logged and left out of the merge unless
    /// `options.strict` is set.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidHookName` for a malformed name, or
    /// `Error::Handler` for the first failure under `strict`
    pub async fn invoke_value(&self, name: &str, options: &DispatchOptions) -> Result<Value> {
        let name = HookName::parse(name)?;
        self.dispatcher.notify(DispatchNotice::Before {
            hook: name.to_string(),
            mode: options.mode,
        });

        let collected = self.collect(&name, options);
        if options.strict {
            self.dispatcher.run_strict(&name, options, collected).await
        } else {
            Ok(self
                .dispatcher
                .run_settled(&name, options, collected)
                .await
                .result)
        }
    }

    /// Dispatch a hook, settling every handler and reporting each failure
    ///
    /// `options.strict` is ignored.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidHookName` for a malformed name
    pub async fn invoke_detailed(
        &self,
        name: &str,
        options: &DispatchOptions,
    ) -> Result<DetailedOutcome> {
        let name = HookName::parse(name)?;
        self.dispatcher.notify(DispatchNotice::Before {
            hook: name.to_string(),
            mode: options.mode,
        });

        let collected = self.collect(&name, options);
        Ok(self.dispatcher.run_settled(&name, options, collected).await)
    }

    /// Register every command directory contributing to `command_path`
    ///
    /// See [`commands::extend`] for the order.
    pub fn extend(
        &self,
        command_path: &str,
        namespace: &str,
        registrar: &mut dyn CommandRegistrar,
        base_path: &Path,
    ) -> Vec<PathBuf> {
        let modules = self.modules();
        let combined = self.combined_config();
        let composer = self.composer();
        let host_name = self.host_name();

        let sources: Vec<_> = modules
            .values()
            .map(|module| ExtensionSource {
                owner: module.name(),
                root: module.path(),
                manifest: module.manifest(&composer),
            })
            .collect();
        let host = ExtensionSource {
            owner: &host_name,
            root: &self.options.project_dir,
            manifest: &combined.host,
        };

        commands::extend(command_path, namespace, registrar, base_path, &sources, &host)
    }

    /// Gather file-based then dynamic handlers answering `name`
    fn collect(&self, name: &HookName, options: &DispatchOptions) -> Collected {
        let modules = self.modules();
        let combined = self.combined_config();
        let composer = self.composer();
        let host_name = self.host_name();
        let fallback = combined.get_str("hooks");

        // A self-matching project is already among the modules
        let host = (!modules.contains_key(&host_name)).then_some((
            host_name.as_str(),
            self.options.project_dir.as_path(),
            &combined.host,
        ));
        let sources = modules
            .values()
            .map(|module| (module.name(), module.path(), module.manifest(&composer)))
            .chain(host);

        let mut collected = Collected::default();
        for (owner, root, manifest) in sources {
            if !options.admits(owner) {
                continue;
            }

            let own = manifest.get("hooks").and_then(Value::as_str);
            let file = loader::resolve_hook_file(root, own, fallback);
            if !loader::probe(manifest, &file, name.event()) {
                continue;
            }

            match self.hook_file(&file, root) {
                Ok(Some(hooks)) => {
                    if let Some(hook) = hooks
                        .export(name.event())
                        .and_then(|value| value.resolve(name.namespace()))
                    {
                        collected.handlers.push(PendingHandler {
                            owner: owner.to_string(),
                            hook,
                        });
                    }
                }
                Ok(None) => {}
                Err(e) => collected.failures.push(HandlerFailure {
                    owner: owner.to_string(),
                    error: e.to_string(),
                }),
            }
        }

        for dynamic in self.registry.handlers_for(name) {
            if options.admits(&dynamic.owner) {
                collected.handlers.push(PendingHandler {
                    owner: dynamic.owner,
                    hook: ResolvedHook::Callable(dynamic.handler),
                });
            }
        }

        tracing::debug!(
            hook = %name,
            handlers = collected.handlers.len(),
            failures = collected.failures.len(),
            "collected hook handlers"
        );
        collected
    }

    /// Load (or reuse) the hook file at `path`; `None` if it does not exist
    ///
    /// Only successfully parsed files are cached.
    fn hook_file(&self, path: &Path, root: &Path) -> Result<Option<Arc<HookFile>>> {
        if let Some(file) = read(&self.hook_files).get(path) {
            return Ok(Some(Arc::clone(file)));
        }
        if !path.is_file() {
            return Ok(None);
        }

        let file = Arc::new(HookFile::load(path, root)?);
        if !self.options.no_cache {
            tracing::debug!(path = %file.path().display(), "caching hook file");
            write(&self.hook_files).insert(file.path().to_path_buf(), Arc::clone(&file));
        }
        Ok(Some(file))
    }
}

fn composer_for(options: &RuntimeOptions, project_dir: &Path) -> Composer {
    Composer::new(options.config_name(), options.env.clone(), project_dir)
}

fn scan(options: &RuntimeOptions, pattern: &NamePattern) -> ModuleSet {
    let roots = locator::roots_for(options);
    locator::locate(&roots, pattern)
        .into_iter()
        .map(|(name, path)| {
            let module = Arc::new(Module::new(name.clone(), path));
            (name, module)
        })
        .collect()
}

fn build_combined(modules: &ModuleSet, composer: &Composer, project_dir: &Path, app_name: &str) -> CombinedConfig {
    let host: Manifest = composer.compose(project_dir, app_name);
    CombinedConfig::build(
        modules
            .values()
            .map(|module| (module.name(), module.manifest(composer))),
        host,
    )
}

fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
