use crate::command::{Liveness, upgrade};
use crate::value::{ConsoleValue, ParamKind, Value};
use anyhow::{Result, anyhow};
use std::any::type_name;
use std::fmt;
use std::sync::{Arc, Mutex};

/// Category given to variables that don't name one.
pub const DEFAULT_VARIABLE_CATEGORY: &str = "Variables";

/// How the variable's storage is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    /// Plain storage read and written directly.
    Field,
    /// Getter with an optional setter.
    Property,
}

type Getter = Arc<dyn Fn() -> Result<Value> + Send + Sync>;
type Setter = Arc<dyn Fn(&Value) -> Result<()> + Send + Sync>;

/// Type-erased read/write access to a variable's storage.
#[derive(Clone)]
pub struct Accessor {
    kind: ParamKind,
    storage: StorageKind,
    get: Getter,
    set: Option<Setter>,
    liveness: Option<Liveness>,
}

fn lock<T>(cell: &Mutex<T>) -> Result<std::sync::MutexGuard<'_, T>> {
    cell.lock()
        .map_err(|_| anyhow!("{} is poisoned", type_name::<T>()))
}

impl Accessor {
    /// Field over shared storage owned by the host.
    pub fn field<V>(cell: &Arc<Mutex<V>>) -> Self
    where
        V: ConsoleValue,
    {
        let weak_get = Arc::downgrade(cell);
        let weak_set = Arc::downgrade(cell);
        Self {
            kind: V::kind(),
            storage: StorageKind::Field,
            get: Arc::new(move || Ok(lock(&*upgrade(&weak_get)?)?.to_value())),
            set: Some(Arc::new(move |value: &Value| {
                let new = V::from_value_checked(value)?;
                *lock(&*upgrade(&weak_set)?)? = new;
                Ok(())
            })),
            liveness: Some(Liveness::of(cell)),
        }
    }

    /// Field of one instance of `T`, projected with plain function pointers.
    pub fn instance_field<T, V>(target: &Arc<Mutex<T>>, get: fn(&T) -> V, set: fn(&mut T, V)) -> Self
    where
        T: Send + 'static,
        V: ConsoleValue,
    {
        let weak_get = Arc::downgrade(target);
        let weak_set = Arc::downgrade(target);
        Self {
            kind: V::kind(),
            storage: StorageKind::Field,
            get: Arc::new(move || Ok(get(&*lock(&*upgrade(&weak_get)?)?).to_value())),
            set: Some(Arc::new(move |value: &Value| {
                let new = V::from_value_checked(value)?;
                set(&mut *lock(&*upgrade(&weak_set)?)?, new);
                Ok(())
            })),
            liveness: Some(Liveness::of(target)),
        }
    }

    /// Read-only property computed by a closure.
    pub fn property<V, G>(get: G) -> Self
    where
        V: ConsoleValue,
        G: Fn() -> V + Send + Sync + 'static,
    {
        Self {
            kind: V::kind(),
            storage: StorageKind::Property,
            get: Arc::new(move || Ok(get().to_value())),
            set: None,
            liveness: None,
        }
    }

    /// Property with both a getter and a setter.
    pub fn property_with_setter<V, G, S>(get: G, set: S) -> Self
    where
        V: ConsoleValue,
        G: Fn() -> V + Send + Sync + 'static,
        S: Fn(V) + Send + Sync + 'static,
    {
        Self {
            set: Some(Arc::new(move |value: &Value| {
                set(V::from_value_checked(value)?);
                Ok(())
            })),
            ..Self::property(get)
        }
    }

    /// Property of one instance of `T`; `set: None` makes it read-only.
    pub fn instance_property<T, V>(
        target: &Arc<Mutex<T>>,
        get: fn(&T) -> V,
        set: Option<fn(&mut T, V)>,
    ) -> Self
    where
        T: Send + 'static,
        V: ConsoleValue,
    {
        let weak_get = Arc::downgrade(target);
        let weak_set = Arc::downgrade(target);
        let set = set.map(|set| -> Setter {
            Arc::new(move |value: &Value| {
                let new = V::from_value_checked(value)?;
                set(&mut *lock(&*upgrade(&weak_set)?)?, new);
                Ok(())
            })
        });
        Self {
            kind: V::kind(),
            storage: StorageKind::Property,
            get: Arc::new(move || Ok(get(&*lock(&*upgrade(&weak_get)?)?).to_value())),
            set,
            liveness: Some(Liveness::of(target)),
        }
    }

    pub fn kind(&self) -> ParamKind {
        self.kind
    }

    pub fn storage(&self) -> StorageKind {
        self.storage
    }

    pub fn has_setter(&self) -> bool {
        self.set.is_some()
    }

    pub fn get(&self) -> Result<Value> {
        (self.get)()
    }

    pub fn set(&self, value: &Value) -> Result<()> {
        match &self.set {
            Some(set) => set(value),
            None => Err(anyhow!("no setter")),
        }
    }

    pub(crate) fn target_alive(&self) -> Option<bool> {
        self.liveness.as_ref().map(Liveness::is_alive)
    }
}

/// A registered console variable.
#[derive(Clone)]
pub struct VariableEntry {
    pub name: String,
    pub description: String,
    pub category: String,
    read_only: bool,
    accessor: Accessor,
}

impl VariableEntry {
    pub fn new(name: impl Into<String>, accessor: Accessor) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            category: DEFAULT_VARIABLE_CATEGORY.to_string(),
            read_only: !accessor.has_setter(),
            accessor,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        let category = category.into();
        if !category.is_empty() {
            self.category = category;
        }
        self
    }

    /// Mark read-only. A variable without a setter stays read-only regardless.
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only || !self.accessor.has_setter();
        self
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn accessor(&self) -> &Accessor {
        &self.accessor
    }

    pub fn kind(&self) -> ParamKind {
        self.accessor.kind
    }

    /// `None` for static storage, otherwise whether the bound instance is still alive.
    pub fn target_alive(&self) -> Option<bool> {
        self.accessor.target_alive()
    }
}

impl fmt::Debug for VariableEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VariableEntry")
            .field("name", &self.name)
            .field("category", &self.category)
            .field("kind", &self.accessor.kind)
            .field("storage", &self.accessor.storage)
            .field("read_only", &self.read_only)
            .finish()
    }
}
