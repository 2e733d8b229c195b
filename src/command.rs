use crate::builtin::Builtin;
use crate::error::CoercionError;
use crate::value::{ConsoleValue, ParamKind, Value};
use anyhow::{Result, anyhow};
use std::any::type_name;
use std::fmt;
use std::sync::{Arc, Mutex, Weak};

/// Category given to explicitly registered commands that don't name one.
pub const BUILTIN_CATEGORY: &str = "Built-in";

/// Category given to discovered commands that don't name one.
pub const DEFAULT_CATEGORY: &str = "General";

/// Type-erased command body. Receives already coerced arguments, one per
/// declared parameter.
pub type Handler = Arc<dyn Fn(&[Value]) -> Result<Option<String>> + Send + Sync>;

/// What runs when a command is invoked.
#[derive(Clone)]
pub enum Callable {
    /// Engine-provided command that needs access to the console itself.
    Builtin(Builtin),
    /// Host closure, possibly bound to an owning instance.
    Bound(Handler),
}

/// A registered console command.
///
/// `category` stays empty until registration picks a default for it.
///
/// Entries are immutable once built; the catalog clones them out before
/// invoking so no lock is held while host code runs.
#[derive(Clone)]
pub struct CommandEntry {
    pub name: String,
    pub description: String,
    pub category: String,
    params: Vec<ParamKind>,
    callable: Callable,
    liveness: Option<Liveness>,
}

impl CommandEntry {
    /// Command backed by a free function or a closure that owns its state.
    ///
    /// ```
    /// use dev_console::CommandEntry;
    /// let cmd = CommandEntry::function("heal", |amount: f32| format!("healed {amount}"));
    /// assert_eq!(cmd.usage(), "heal <float>");
    /// ```
    pub fn function<Args, F>(name: impl Into<String>, f: F) -> Self
    where
        F: IntoHandler<Args>,
    {
        let f = Arc::new(f);
        Self {
            name: name.into(),
            description: String::new(),
            category: String::new(),
            params: F::params(),
            callable: Callable::Bound(Arc::new(move |args: &[Value]| f.call(args))),
            liveness: None,
        }
    }

    /// Command bound to one instance of `T`.
    ///
    /// The entry keeps only a weak reference: once every `Arc` of the target is
    /// gone, invoking the command fails instead of keeping the target alive.
    pub fn method<T, Args, F>(name: impl Into<String>, target: &Arc<Mutex<T>>, f: F) -> Self
    where
        T: Send + 'static,
        F: IntoMethod<T, Args>,
    {
        let weak = Arc::downgrade(target);
        let handler: Handler = Arc::new(move |args: &[Value]| {
            let strong = upgrade(&weak)?;
            let mut guard = strong
                .lock()
                .map_err(|_| anyhow!("{} is poisoned", type_name::<T>()))?;
            f.call(&mut guard, args)
        });
        Self {
            name: name.into(),
            description: String::new(),
            category: String::new(),
            params: F::params(),
            callable: Callable::Bound(handler),
            liveness: Some(Liveness::of(target)),
        }
    }

    pub(crate) fn builtin(builtin: Builtin) -> Self {
        Self {
            name: builtin.name().to_string(),
            description: builtin.description().to_string(),
            category: BUILTIN_CATEGORY.to_string(),
            params: Vec::new(),
            callable: Callable::Builtin(builtin),
            liveness: None,
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

    /// Fill in `category` if none was given.
    pub(crate) fn or_category(mut self, category: &str) -> Self {
        if self.category.is_empty() {
            self.category = category.to_string();
        }
        self
    }

    pub fn params(&self) -> &[ParamKind] {
        &self.params
    }

    pub fn callable(&self) -> &Callable {
        &self.callable
    }

    /// `None` for static commands, otherwise whether the bound instance is still alive.
    pub fn target_alive(&self) -> Option<bool> {
        self.liveness.as_ref().map(Liveness::is_alive)
    }

    /// One-line usage, e.g. `spawnEnemy <string> <float> <float> <float>`.
    pub fn usage(&self) -> String {
        let mut usage = self.name.clone();
        for param in &self.params {
            usage.push_str(&format!(" <{}>", param));
        }
        usage
    }
}

impl fmt::Debug for CommandEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandEntry")
            .field("name", &self.name)
            .field("category", &self.category)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// Cheap check whether a bound instance still exists, without upgrading it.
#[derive(Clone)]
pub(crate) struct Liveness(Arc<dyn Fn() -> bool + Send + Sync>);

impl Liveness {
    pub(crate) fn of<T: Send + 'static>(target: &Arc<Mutex<T>>) -> Self {
        let weak = Arc::downgrade(target);
        Self(Arc::new(move || weak.strong_count() > 0))
    }

    pub(crate) fn is_alive(&self) -> bool {
        (self.0)()
    }
}

pub(crate) fn upgrade<T>(weak: &Weak<Mutex<T>>) -> Result<Arc<Mutex<T>>> {
    weak.upgrade()
        .ok_or_else(|| anyhow!("instance of {} no longer exists", type_name::<T>()))
}

/// Conversion of a command's return value into optional console output.
pub trait IntoOutput {
    fn into_output(self) -> Result<Option<String>>;
}

impl IntoOutput for () {
    fn into_output(self) -> Result<Option<String>> {
        Ok(None)
    }
}

impl IntoOutput for String {
    fn into_output(self) -> Result<Option<String>> {
        Ok(Some(self))
    }
}

impl<T: IntoOutput> IntoOutput for Result<T> {
    fn into_output(self) -> Result<Option<String>> {
        self.and_then(IntoOutput::into_output)
    }
}

/// Free functions and closures usable as a command body.
///
/// Implemented for `Fn(A, B, ...) -> R` up to six parameters, where every
/// parameter is a [`ConsoleValue`] and `R` is an [`IntoOutput`].
pub trait IntoHandler<Args>: Send + Sync + 'static {
    fn params() -> Vec<ParamKind>;
    fn call(&self, args: &[Value]) -> Result<Option<String>>;
}

/// Like [`IntoHandler`] for functions whose first parameter is `&mut T`.
pub trait IntoMethod<T, Args>: Send + Sync + 'static {
    fn params() -> Vec<ParamKind>;
    fn call(&self, target: &mut T, args: &[Value]) -> Result<Option<String>>;
}

fn next_arg<'a, A: ConsoleValue>(args: &mut impl Iterator<Item = &'a Value>) -> Result<A> {
    let value = args
        .next()
        .ok_or_else(|| anyhow!("missing argument of kind {}", A::kind()))?;
    // Narrowing failures surface as CoercionError so the engine can report them as such.
    A::from_value_checked(value).map_err(|e: CoercionError| e.into())
}

macro_rules! impl_handlers {
    ($($arg:ident),*) => {
        impl<F, R, $($arg,)*> IntoHandler<($($arg,)*)> for F
        where
            F: Fn($($arg),*) -> R + Send + Sync + 'static,
            R: IntoOutput,
            $($arg: ConsoleValue,)*
        {
            fn params() -> Vec<ParamKind> {
                vec![$($arg::kind()),*]
            }

            #[allow(non_snake_case, unused_mut, unused_variables)]
            fn call(&self, args: &[Value]) -> Result<Option<String>> {
                let mut args = args.iter();
                $(let $arg = next_arg::<$arg>(&mut args)?;)*
                (self)($($arg),*).into_output()
            }
        }

        impl<T, F, R, $($arg,)*> IntoMethod<T, ($($arg,)*)> for F
        where
            F: Fn(&mut T, $($arg),*) -> R + Send + Sync + 'static,
            R: IntoOutput,
            $($arg: ConsoleValue,)*
        {
            fn params() -> Vec<ParamKind> {
                vec![$($arg::kind()),*]
            }

            #[allow(non_snake_case, unused_mut, unused_variables)]
            fn call(&self, target: &mut T, args: &[Value]) -> Result<Option<String>> {
                let mut args = args.iter();
                $(let $arg = next_arg::<$arg>(&mut args)?;)*
                (self)(target, $($arg),*).into_output()
            }
        }
    };
}

impl_handlers!();
impl_handlers!(A);
impl_handlers!(A, B);
impl_handlers!(A, B, C);
impl_handlers!(A, B, C, D);
impl_handlers!(A, B, C, D, E);
impl_handlers!(A, B, C, D, E, G);
