//! Behavior Nodes
//!
//! Immutable description of one chain position: which behavior, with which
//! subjects, and an optional child. Nodes are rebuilt from scratch by the tree
//! builder on every cycle; the runner moves live instances from the previous
//! chain into the new one wherever a node is unchanged.

use std::any::{Any, TypeId};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::behavior::{Behavior, BehaviorImpl};
use crate::error::{CoreError, Result};

/// A single constructor argument of a behavior
///
/// Equality is shallow: values compare by value, `Opaque` compares by
/// pointer identity.
#[derive(Clone)]
pub enum Subject {
    Str(Rc<str>),
    Int(i64),
    Bool(bool),
    Opaque(Rc<dyn Any>),
}

impl PartialEq for Subject {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Subject::Str(a), Subject::Str(b)) => a == b,
            (Subject::Int(a), Subject::Int(b)) => a == b,
            (Subject::Bool(a), Subject::Bool(b)) => a == b,
            (Subject::Opaque(a), Subject::Opaque(b)) => {
                std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
            }
            _ => false,
        }
    }
}

impl Eq for Subject {}

impl fmt::Debug for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::Str(s) => write!(f, "{s:?}"),
            Subject::Int(i) => write!(f, "{i}"),
            Subject::Bool(b) => write!(f, "{b}"),
            Subject::Opaque(rc) => write!(f, "<opaque {:p}>", Rc::as_ptr(rc)),
        }
    }
}

impl From<&str> for Subject {
    fn from(value: &str) -> Self {
        Subject::Str(Rc::from(value))
    }
}

impl From<String> for Subject {
    fn from(value: String) -> Self {
        Subject::Str(Rc::from(value))
    }
}

impl From<&String> for Subject {
    fn from(value: &String) -> Self {
        Subject::Str(Rc::from(value.as_str()))
    }
}

impl From<i64> for Subject {
    fn from(value: i64) -> Self {
        Subject::Int(value)
    }
}

impl From<u32> for Subject {
    fn from(value: u32) -> Self {
        Subject::Int(i64::from(value))
    }
}

impl From<bool> for Subject {
    fn from(value: bool) -> Self {
        Subject::Bool(value)
    }
}

impl From<Rc<dyn Any>> for Subject {
    fn from(value: Rc<dyn Any>) -> Self {
        Subject::Opaque(value)
    }
}

/// Ordered, fixed-arity subject list of a node
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Subjects(Vec<Subject>);

impl Subjects {
    pub fn new(values: Vec<Subject>) -> Self {
        Self(values)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Subject> {
        self.0.get(index)
    }

    /// String subject at `index`
    pub fn str(&self, index: usize) -> Result<&str> {
        match self.0.get(index) {
            Some(Subject::Str(s)) => Ok(&**s),
            _ => Err(CoreError::InvalidSubject { index, expected: "string" }),
        }
    }

    /// Integer subject at `index`
    pub fn int(&self, index: usize) -> Result<i64> {
        match self.0.get(index) {
            Some(Subject::Int(i)) => Ok(*i),
            _ => Err(CoreError::InvalidSubject { index, expected: "integer" }),
        }
    }

    /// Boolean subject at `index`
    pub fn bool(&self, index: usize) -> Result<bool> {
        match self.0.get(index) {
            Some(Subject::Bool(b)) => Ok(*b),
            _ => Err(CoreError::InvalidSubject { index, expected: "bool" }),
        }
    }

    /// Opaque subject at `index`, downcast to `T`
    pub fn opaque<T: Any>(&self, index: usize) -> Result<Rc<T>> {
        match self.0.get(index) {
            Some(Subject::Opaque(rc)) => rc
                .clone()
                .downcast::<T>()
                .map_err(|_| CoreError::InvalidSubject { index, expected: std::any::type_name::<T>() }),
            _ => Err(CoreError::InvalidSubject { index, expected: "opaque" }),
        }
    }
}

/// Build a [`Subjects`] list from values convertible into [`Subject`]
#[macro_export]
macro_rules! subjects {
    () => {
        $crate::node::Subjects::default()
    };
    ($($value:expr),+ $(,)?) => {
        $crate::node::Subjects::new(vec![$($crate::node::Subject::from($value)),+])
    };
}

/// Live behavior held by an entered node
pub(crate) struct Instance {
    pub(crate) behavior: Rc<dyn Behavior>,
    any: Rc<dyn Any>,
    entered: Cell<bool>,
    exited: Cell<bool>,
}

impl Instance {
    fn new<T: Behavior>(behavior: T) -> Self {
        let rc = Rc::new(behavior);
        Self {
            behavior: rc.clone(),
            any: rc,
            entered: Cell::new(false),
            exited: Cell::new(false),
        }
    }

    /// Whether `enter()` has been called (it may still be running)
    pub(crate) fn has_entered(&self) -> bool {
        self.entered.get()
    }

    pub(crate) fn mark_entered(&self) {
        self.entered.set(true);
    }

    pub(crate) fn is_exited(&self) -> bool {
        self.exited.get()
    }

    pub(crate) fn mark_exited(&self) {
        self.exited.set(true);
    }

    pub(crate) fn downcast<T: Any>(&self) -> Option<Rc<T>> {
        self.any.clone().downcast::<T>().ok()
    }
}

type Construct<C> = fn(&C, &Subjects) -> Result<Instance>;

fn construct_instance<C, T: BehaviorImpl<C>>(ctx: &C, subjects: &Subjects) -> Result<Instance> {
    T::construct(ctx, subjects).map(Instance::new)
}

/// One position in the behavior chain
pub struct BehaviorNode<C> {
    type_id: TypeId,
    name: &'static str,
    construct: Construct<C>,
    subjects: Subjects,
    child: RefCell<Option<Rc<BehaviorNode<C>>>>,
    instance: RefCell<Option<Rc<Instance>>>,
}

impl<C> BehaviorNode<C> {
    /// Create a childless node for behavior `T`
    pub fn new<T: BehaviorImpl<C>>(subjects: Subjects) -> Rc<Self> {
        Self::with_child::<T>(subjects, None)
    }

    /// Create a node for behavior `T` owning `child`
    pub fn with_child<T: BehaviorImpl<C>>(
        subjects: Subjects,
        child: Option<Rc<BehaviorNode<C>>>,
    ) -> Rc<Self> {
        Rc::new(Self {
            type_id: TypeId::of::<T>(),
            name: T::NAME,
            construct: construct_instance::<C, T>,
            subjects,
            child: RefCell::new(child),
            instance: RefCell::new(None),
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn subjects(&self) -> &Subjects {
        &self.subjects
    }

    /// Whether this node's behavior kind is `T`
    pub fn is<T: Any>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    pub fn child(&self) -> Option<Rc<BehaviorNode<C>>> {
        self.child.borrow().clone()
    }

    /// Replace the child link
    pub fn set_child(&self, child: Option<Rc<BehaviorNode<C>>>) {
        *self.child.borrow_mut() = child;
    }

    /// Whether the node currently holds a live instance
    pub fn is_entered(&self) -> bool {
        self.instance.borrow().is_some()
    }

    /// Live instance as its concrete type
    pub fn instance<T: Any>(&self) -> Option<Rc<T>> {
        self.instance.borrow().as_ref().and_then(|inst| inst.downcast::<T>())
    }

    /// Same kind and shallow-equal subjects
    pub fn same_as(&self, other: &BehaviorNode<C>) -> bool {
        self.type_id == other.type_id && self.subjects == other.subjects
    }

    pub(crate) fn construct(&self, ctx: &C) -> Result<Rc<Instance>> {
        (self.construct)(ctx, &self.subjects).map(Rc::new)
    }

    pub(crate) fn live(&self) -> Option<Rc<Instance>> {
        self.instance.borrow().clone()
    }

    pub(crate) fn put_instance(&self, instance: Option<Rc<Instance>>) {
        *self.instance.borrow_mut() = instance;
    }

    pub(crate) fn take_instance(&self) -> Option<Rc<Instance>> {
        self.instance.borrow_mut().take()
    }
}

impl<C> fmt::Debug for BehaviorNode<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The child is printed by name only so a cyclic chain cannot recurse.
        f.debug_struct("BehaviorNode")
            .field("impl", &self.name)
            .field("subjects", &self.subjects)
            .field("child", &self.child.borrow().as_ref().map(|c| c.name))
            .field("entered", &self.is_entered())
            .finish()
    }
}
