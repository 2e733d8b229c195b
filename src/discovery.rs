//! Cooperative scan of host feature modules for console commands and variables.
//!
//! Hosts describe their features through [`ConsoleModule`]: each module lists
//! its types, each type lists its members, and members that should show up in
//! the console carry an [`Annotation`]. Members are registered already bound to
//! their target (see [`CommandEntry::method`] and [`Accessor`]), so the scanner
//! never has to look for a live instance on its own.
//!
//! The scan runs as a [`DiscoveryTask`] that the host drives with
//! [`DiscoveryTask::step`]. Every step does a bounded amount of work and returns,
//! so it can be interleaved with a frame or event loop.

use crate::catalog::Catalog;
use crate::command::{CommandEntry, DEFAULT_CATEGORY};
use crate::config::{DiscoveryConfig, WarningPolicy};
use crate::error::ConsoleError;
use crate::sink::Severity;
use crate::variable::{Accessor, StorageKind, VariableEntry};
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};
use std::time::{Duration, Instant};
use thiserror::Error;

/// A whole module could not be enumerated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ModuleScanError(pub String);

/// One declared type of a module could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{type_name}: {message}")]
pub struct TypeLoadError {
    pub type_name: String,
    pub message: String,
}

impl TypeLoadError {
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            message: message.into(),
        }
    }
}

/// A unit of host code that may declare console entries.
pub trait ConsoleModule: Send {
    /// Module path, e.g. `game::player`. Used for exclusion and scan order.
    fn name(&self) -> &str;

    /// Every type the module declares.
    ///
    /// `Err` means the module could not be enumerated at all. Individual `Err`
    /// entries are types that failed to load; the rest are still scanned.
    fn declared_types(&self) -> Result<Vec<Result<TypeDescriptor, TypeLoadError>>, ModuleScanError>;
}

/// A module whose types are known up front.
#[derive(Debug, Clone)]
pub struct StaticModule {
    name: String,
    types: Vec<TypeDescriptor>,
}

impl StaticModule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            types: Vec::new(),
        }
    }

    pub fn with_type(mut self, ty: TypeDescriptor) -> Self {
        self.types.push(ty);
        self
    }
}

impl ConsoleModule for StaticModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn declared_types(&self) -> Result<Vec<Result<TypeDescriptor, TypeLoadError>>, ModuleScanError> {
        Ok(self.types.iter().cloned().map(Ok).collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TypeKind {
    #[default]
    Concrete,
    Interface,
    Abstract,
    GenericDefinition,
}

/// Name fragments the compiler uses for types nobody declared by hand.
const SYNTHESIZED_MARKERS: [&str; 3] = ["<>", "{{closure}}", "+<"];

#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    pub name: String,
    pub kind: TypeKind,
    /// Set for compiler-generated types.
    pub synthesized: bool,
    members: Vec<MemberDescriptor>,
}

impl TypeDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: TypeKind::Concrete,
            synthesized: false,
            members: Vec::new(),
        }
    }

    pub fn of_kind(mut self, kind: TypeKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn synthesized(mut self) -> Self {
        self.synthesized = true;
        self
    }

    pub fn member(mut self, member: MemberDescriptor) -> Self {
        self.members.push(member);
        self
    }

    /// Shorthand for an annotated method.
    pub fn command(self, attr: CommandAttr, entry: CommandEntry) -> Self {
        self.member(MemberDescriptor::method(entry).annotate(attr))
    }

    /// Shorthand for an annotated field or property, picked from the accessor.
    pub fn variable(self, attr: VariableAttr, accessor: Accessor) -> Self {
        let name = attr.name.clone();
        let member = match accessor.storage() {
            StorageKind::Field => MemberDescriptor::field(name, accessor),
            StorageKind::Property => MemberDescriptor::property(name, accessor),
        };
        self.member(member.annotate(attr))
    }

    pub fn members(&self) -> &[MemberDescriptor] {
        &self.members
    }

    fn skip_reason(&self) -> Option<&'static str> {
        match self.kind {
            TypeKind::Interface => Some("interface"),
            TypeKind::Abstract => Some("abstract"),
            TypeKind::GenericDefinition => Some("generic definition"),
            TypeKind::Concrete
                if self.synthesized
                    || SYNTHESIZED_MARKERS.iter().any(|m| self.name.contains(m)) =>
            {
                Some("synthesized")
            }
            TypeKind::Concrete => None,
        }
    }
}

#[derive(Clone)]
pub enum MemberBinding {
    Method(CommandEntry),
    Field(Accessor),
    Property(Accessor),
}

#[derive(Clone)]
pub struct MemberDescriptor {
    pub name: String,
    binding: MemberBinding,
    annotation: Option<Annotation>,
}

impl MemberDescriptor {
    pub fn method(entry: CommandEntry) -> Self {
        Self {
            name: entry.name.clone(),
            binding: MemberBinding::Method(entry),
            annotation: None,
        }
    }

    pub fn field(name: impl Into<String>, accessor: Accessor) -> Self {
        Self {
            name: name.into(),
            binding: MemberBinding::Field(accessor),
            annotation: None,
        }
    }

    pub fn property(name: impl Into<String>, accessor: Accessor) -> Self {
        Self {
            name: name.into(),
            binding: MemberBinding::Property(accessor),
            annotation: None,
        }
    }

    pub fn annotate(mut self, annotation: impl Into<Annotation>) -> Self {
        self.annotation = Some(annotation.into());
        self
    }

    pub fn is_annotated(&self) -> bool {
        self.annotation.is_some()
    }

    pub fn annotation(&self) -> Option<&Annotation> {
        self.annotation.as_ref()
    }

    pub fn binding(&self) -> &MemberBinding {
        &self.binding
    }
}

impl fmt::Debug for MemberDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let binding = match self.binding {
            MemberBinding::Method(_) => "method",
            MemberBinding::Field(_) => "field",
            MemberBinding::Property(_) => "property",
        };
        f.debug_struct("MemberDescriptor")
            .field("name", &self.name)
            .field("binding", &binding)
            .field("annotation", &self.annotation)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Annotation {
    Command(CommandAttr),
    Variable(VariableAttr),
}

/// Marks a method as a console command. An empty name means the member's name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandAttr {
    pub name: String,
    pub description: String,
    pub category: String,
}

impl CommandAttr {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            category: String::new(),
        }
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }
}

impl From<CommandAttr> for Annotation {
    fn from(attr: CommandAttr) -> Self {
        Annotation::Command(attr)
    }
}

/// Marks a field or property as a console variable.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VariableAttr {
    pub name: String,
    pub description: String,
    pub category: String,
    pub read_only: bool,
}

impl VariableAttr {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            ..Self::default()
        }
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }
}

impl From<VariableAttr> for Annotation {
    fn from(attr: VariableAttr) -> Self {
        Annotation::Variable(attr)
    }
}

/// Something the scan wants the console to print.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryEvent {
    pub text: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoverySummary {
    /// Registrations performed, collisions included.
    pub commands: usize,
    pub variables: usize,
    /// Modules skipped after a hard failure.
    pub failed_modules: usize,
    pub elapsed: Duration,
}

impl fmt::Display for DiscoverySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Console scan complete! Found {} commands and {} variables in {}ms",
            self.commands,
            self.variables,
            self.elapsed.as_millis()
        )
    }
}

/// Result of one [`DiscoveryTask::step`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// More work remains; call `step` again later.
    Yielded,
    Finished(DiscoverySummary),
    /// The session ended before the scan did. Nothing more will be registered.
    Abandoned,
}

enum Phase {
    Pending,
    Scanning,
    Finished(DiscoverySummary),
    Abandoned,
}

struct ModuleScan {
    name: String,
    types: std::vec::IntoIter<TypeDescriptor>,
}

/// Marker for "the session this task belongs to is over".
struct SessionGone;

/// Resumable discovery over a fixed set of modules.
///
/// Modules are visited in ascending name order; when two of them register the
/// same name, the one visited last wins. The task only holds a weak reference
/// to the catalog and re-checks the session flag under the catalog's write lock
/// before every registration, so it is safe to keep stepping it, even from
/// another thread, while the console tears the session down.
pub struct DiscoveryTask {
    catalog: Weak<RwLock<Catalog>>,
    session: Arc<AtomicBool>,
    batch_size: usize,
    warnings: WarningPolicy,
    modules: VecDeque<Box<dyn ConsoleModule>>,
    module_count: usize,
    current: Option<ModuleScan>,
    phase: Phase,
    summary: DiscoverySummary,
    started: Instant,
    events: Vec<DiscoveryEvent>,
}

impl DiscoveryTask {
    pub(crate) fn new(
        catalog: Weak<RwLock<Catalog>>,
        session: Arc<AtomicBool>,
        modules: Vec<Box<dyn ConsoleModule>>,
        config: &DiscoveryConfig,
    ) -> Result<Self, ConsoleError> {
        let exclude = config.filter.compile()?;
        let mut modules: Vec<_> = modules
            .into_iter()
            .filter(|module| match &exclude {
                Some(re) if re.is_match(module.name()) => {
                    log::debug!("skipping excluded module {}", module.name());
                    false
                }
                _ => true,
            })
            .collect();
        modules.sort_by(|a, b| a.name().cmp(b.name()));

        Ok(Self {
            catalog,
            session,
            batch_size: config.batch_size.max(1),
            warnings: config.warnings.clone(),
            module_count: modules.len(),
            modules: modules.into(),
            current: None,
            phase: Phase::Pending,
            summary: DiscoverySummary {
                commands: 0,
                variables: 0,
                failed_modules: 0,
                elapsed: Duration::ZERO,
            },
            started: Instant::now(),
            events: Vec::new(),
        })
    }

    /// Do at most one module's worth, or `batch_size` types, of work.
    pub fn step(&mut self) -> Step {
        match &self.phase {
            Phase::Finished(summary) => return Step::Finished(summary.clone()),
            Phase::Abandoned => return Step::Abandoned,
            Phase::Pending => {
                self.started = Instant::now();
                self.emit(
                    format!("Scanning {} modules for console commands...", self.module_count),
                    Severity::Info,
                );
                self.phase = Phase::Scanning;
            }
            Phase::Scanning => {}
        }

        if !self.session_alive() {
            return self.abandon();
        }

        let mut scan = match self.current.take() {
            Some(scan) => scan,
            None => match self.modules.pop_front() {
                Some(module) => match self.open(module.as_ref()) {
                    Some(scan) => scan,
                    None => return Step::Yielded,
                },
                None => return self.finish(),
            },
        };

        for _ in 0..self.batch_size {
            let Some(ty) = scan.types.next() else {
                log::debug!("finished module {}", scan.name);
                return Step::Yielded;
            };
            if self.scan_type(&ty).is_err() {
                return self.abandon();
            }
        }
        self.current = Some(scan);
        Step::Yielded
    }

    /// Step until the task finishes or is abandoned.
    pub fn run(&mut self) -> Step {
        loop {
            match self.step() {
                Step::Yielded => continue,
                done => return done,
            }
        }
    }

    /// Drain the messages produced since the last call.
    pub fn take_events(&mut self) -> Vec<DiscoveryEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn is_done(&self) -> bool {
        matches!(self.phase, Phase::Finished(_) | Phase::Abandoned)
    }

    fn session_alive(&self) -> bool {
        self.session.load(Ordering::Acquire) && self.catalog.strong_count() > 0
    }

    fn open(&mut self, module: &dyn ConsoleModule) -> Option<ModuleScan> {
        let name = module.name().to_string();
        log::debug!("scanning module {}", name);

        let declared = match module.declared_types() {
            Ok(declared) => declared,
            Err(err) => {
                let err = ConsoleError::ModuleScanFailure {
                    module: name,
                    message: err.to_string(),
                };
                self.emit(err.to_string(), Severity::Warning);
                self.summary.failed_modules += 1;
                return None;
            }
        };

        let mut types = Vec::with_capacity(declared.len());
        let mut failures = Vec::new();
        for entry in declared {
            match entry {
                Ok(ty) => types.push(ty),
                Err(err) => failures.push(err.to_string()),
            }
        }
        if !failures.is_empty() {
            let err = ConsoleError::PartialDiscoveryFailure {
                module: name.clone(),
                message: failures.join("; "),
            };
            self.emit(err.to_string(), Severity::Warning);
        }

        Some(ModuleScan {
            name,
            types: types.into_iter(),
        })
    }

    fn scan_type(&mut self, ty: &TypeDescriptor) -> Result<(), SessionGone> {
        if let Some(reason) = ty.skip_reason() {
            log::trace!("skipping {} type {}", reason, ty.name);
            return Ok(());
        }

        for member in ty.members() {
            if !member.is_annotated() {
                continue;
            }
            match (member.binding(), member.annotation()) {
                (MemberBinding::Method(entry), Some(Annotation::Command(attr))) => {
                    let mut entry = entry.clone();
                    if !attr.name.is_empty() {
                        entry.name = attr.name.clone();
                    }
                    let entry = entry
                        .with_description(attr.description.clone())
                        .with_category(attr.category.clone())
                        .or_category(DEFAULT_CATEGORY);

                    if entry.target_alive() == Some(false) {
                        self.missing_instance("command", &entry.name, &ty.name);
                        continue;
                    }
                    self.register(|catalog| {
                        catalog.register_command(entry);
                    })?;
                    self.summary.commands += 1;
                }
                (
                    MemberBinding::Field(accessor) | MemberBinding::Property(accessor),
                    Some(Annotation::Variable(attr)),
                ) => {
                    let name = if attr.name.is_empty() { &member.name } else { &attr.name };
                    let entry = VariableEntry::new(name.clone(), accessor.clone())
                        .with_description(attr.description.clone())
                        .with_category(attr.category.clone())
                        .read_only(attr.read_only);

                    if entry.target_alive() == Some(false) {
                        self.missing_instance("variable", &entry.name, &ty.name);
                        continue;
                    }
                    self.register(|catalog| {
                        catalog.register_variable(entry);
                    })?;
                    self.summary.variables += 1;
                }
                _ => log::debug!(
                    "ignoring annotation of the wrong kind on {}::{}",
                    ty.name,
                    member.name
                ),
            }
        }
        Ok(())
    }

    fn register(&self, apply: impl FnOnce(&mut Catalog)) -> Result<(), SessionGone> {
        let catalog = self.catalog.upgrade().ok_or(SessionGone)?;
        let mut catalog = catalog.write().unwrap_or_else(PoisonError::into_inner);
        // Checked under the lock: teardown flips the flag before touching the catalog.
        if !self.session.load(Ordering::Acquire) {
            return Err(SessionGone);
        }
        apply(&mut catalog);
        Ok(())
    }

    fn missing_instance(&mut self, what: &str, name: &str, type_name: &str) {
        log::debug!("no live instance of {} for {} {}", type_name, what, name);
        if self.warnings.should_warn(type_name) {
            self.emit(
                format!("No instance found for {} '{}' in type {}", what, name, type_name),
                Severity::Warning,
            );
        }
    }

    fn finish(&mut self) -> Step {
        self.summary.elapsed = self.started.elapsed();
        let summary = self.summary.clone();
        self.emit(summary.to_string(), Severity::Info);
        self.phase = Phase::Finished(summary.clone());
        Step::Finished(summary)
    }

    fn abandon(&mut self) -> Step {
        log::debug!("discovery abandoned, session ended");
        self.current = None;
        self.modules.clear();
        self.phase = Phase::Abandoned;
        Step::Abandoned
    }

    fn emit(&mut self, text: String, severity: Severity) {
        self.events.push(DiscoveryEvent { text, severity });
    }
}
