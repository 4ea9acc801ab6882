#![forbid(unsafe_code)]

//! Declarative guard expressions.
//!
//! A [`GuardExpr`] is an unevaluated description of a boolean guard. The
//! runtime never interprets arbitrary expressions: it only recognises the
//! shape `owner.property`, a read of one instance property on one captured
//! object, and compiles that shape into a callable. Every other node kind
//! exists so that callers can describe what they wrote and receive a precise
//! [`ExpressionError`](crate::ExpressionError) back.
//!
//! ```
//! use std::rc::Rc;
//! use bindcmd_core::Bindable;
//! use bindcmd_runtime::{GuardExpr, Property};
//!
//! struct Editor { dirty: bool }
//! impl Bindable for Editor {}
//!
//! let editor = Rc::new(Editor { dirty: true });
//! let guard = GuardExpr::constant(&editor)
//!     .read(Property::instance("dirty", |e: &Editor| e.dirty));
//! assert!(guard.to_string().ends_with("Editor>.dirty"));
//! ```

use std::any::{Any, TypeId};
use std::borrow::Cow;
use std::fmt;
use std::ops;
use std::rc::Rc;

use bindcmd_core::Bindable;

/// Result of reading a property.
#[derive(Clone)]
pub enum Value {
    Bool(bool),
    Object(Rc<dyn Bindable>),
}

impl Value {
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Bool(_) => ValueKind::Bool,
            Self::Object(_) => ValueKind::Object,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Object(_) => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Self::Object(owner) => f.debug_tuple("Object").field(&owner.type_name()).finish(),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl<T: Bindable> From<Rc<T>> for Value {
    fn from(value: Rc<T>) -> Self {
        Self::Object(value)
    }
}

/// Declared kind of a property's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Bool,
    Object,
}

/// Types a property accessor may return.
pub trait PropertyValue: Into<Value> + 'static {
    const KIND: ValueKind;
}

impl PropertyValue for bool {
    const KIND: ValueKind = ValueKind::Bool;
}

impl<T: Bindable> PropertyValue for Rc<T> {
    const KIND: ValueKind = ValueKind::Object;
}

type InstanceReader = Rc<dyn Fn(&dyn Any) -> Option<Value>>;

#[derive(Clone)]
pub(crate) enum Accessor {
    Instance {
        owner_type: TypeId,
        owner_type_name: &'static str,
        read: InstanceReader,
    },
    Static,
}

/// A named property together with its accessor.
#[derive(Clone)]
pub struct Property {
    name: Cow<'static, str>,
    kind: ValueKind,
    pub(crate) accessor: Accessor,
}

impl Property {
    /// An instance property of `T`, read through `read`.
    pub fn instance<T, R>(
        name: impl Into<Cow<'static, str>>,
        read: impl Fn(&T) -> R + 'static,
    ) -> Self
    where
        T: Bindable,
        R: PropertyValue,
    {
        let reader: InstanceReader =
            Rc::new(move |owner: &dyn Any| owner.downcast_ref::<T>().map(|t| read(t).into()));
        Self {
            name: name.into(),
            kind: R::KIND,
            accessor: Accessor::Instance {
                owner_type: TypeId::of::<T>(),
                owner_type_name: std::any::type_name::<T>(),
                read: reader,
            },
        }
    }

    /// A static (type-level) property. Guards cannot depend on one, so only
    /// its name and kind are recorded.
    pub fn static_member(name: impl Into<Cow<'static, str>>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            kind,
            accessor: Accessor::Static,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn name_cow(&self) -> Cow<'static, str> {
        self.name.clone()
    }

    #[must_use]
    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    #[must_use]
    pub fn is_static(&self) -> bool {
        matches!(self.accessor, Accessor::Static)
    }
}

impl fmt::Debug for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("static", &self.is_static())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    And,
    Or,
}

/// An unevaluated guard expression.
#[derive(Clone)]
pub enum GuardExpr {
    /// The guard's own formal argument.
    Parameter,
    /// An object instance captured when the expression was built.
    Constant(Rc<dyn Bindable>),
    Literal(bool),
    /// A property read; `base` is `None` for static members.
    Property {
        base: Option<Box<GuardExpr>>,
        property: Property,
    },
    /// A method call on `receiver` (or a free function when `None`).
    Call {
        receiver: Option<Box<GuardExpr>>,
        method: Cow<'static, str>,
    },
    Not(Box<GuardExpr>),
    Binary {
        op: BinaryOp,
        lhs: Box<GuardExpr>,
        rhs: Box<GuardExpr>,
    },
}

impl GuardExpr {
    /// Capture `owner` as a constant.
    pub fn constant<T: Bindable>(owner: &Rc<T>) -> Self {
        Self::Constant(Rc::clone(owner) as Rc<dyn Bindable>)
    }

    /// `owner.name`, the shape dependency extraction accepts.
    pub fn property<T: Bindable>(
        owner: &Rc<T>,
        name: impl Into<Cow<'static, str>>,
        read: impl Fn(&T) -> bool + 'static,
    ) -> Self {
        Self::constant(owner).read(Property::instance(name, read))
    }

    /// Read `property` on the value of this expression.
    #[must_use]
    pub fn read(self, property: Property) -> Self {
        Self::Property {
            base: Some(Box::new(self)),
            property,
        }
    }

    /// Read a static property.
    pub fn read_static(property: Property) -> Self {
        Self::Property {
            base: None,
            property,
        }
    }

    /// Call `method` on the value of this expression.
    #[must_use]
    pub fn call(self, method: impl Into<Cow<'static, str>>) -> Self {
        Self::Call {
            receiver: Some(Box::new(self)),
            method: method.into(),
        }
    }

    /// Call a free function.
    pub fn call_free(function: impl Into<Cow<'static, str>>) -> Self {
        Self::Call {
            receiver: None,
            method: function.into(),
        }
    }

    #[must_use]
    pub fn and(self, rhs: Self) -> Self {
        Self::Binary {
            op: BinaryOp::And,
            lhs: Box::new(self),
            rhs: Box::new(rhs),
        }
    }

    #[must_use]
    pub fn or(self, rhs: Self) -> Self {
        Self::Binary {
            op: BinaryOp::Or,
            lhs: Box::new(self),
            rhs: Box::new(rhs),
        }
    }

    /// Short name of the node kind, used in error messages.
    #[must_use]
    pub fn node_name(&self) -> &'static str {
        match self {
            Self::Parameter => "the guard parameter",
            Self::Constant(_) => "a constant",
            Self::Literal(_) => "a literal",
            Self::Property { base: None, .. } => "a static property",
            Self::Property { .. } => "a property read",
            Self::Call { .. } => "a method call",
            Self::Not(_) => "a negation",
            Self::Binary { .. } => "a binary operation",
        }
    }
}

impl ops::Not for GuardExpr {
    type Output = Self;

    fn not(self) -> Self {
        Self::Not(Box::new(self))
    }
}

impl fmt::Display for GuardExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parameter => f.write_str("arg"),
            Self::Constant(owner) => write!(f, "<{}>", owner.type_name()),
            Self::Literal(b) => write!(f, "{b}"),
            Self::Property {
                base: Some(base),
                property,
            } => write!(f, "{base}.{}", property.name()),
            Self::Property {
                base: None,
                property,
            } => write!(f, "static::{}", property.name()),
            Self::Call {
                receiver: Some(receiver),
                method,
            } => write!(f, "{receiver}.{method}()"),
            Self::Call {
                receiver: None,
                method,
            } => write!(f, "{method}()"),
            Self::Not(inner) => write!(f, "!{inner}"),
            Self::Binary { op, lhs, rhs } => {
                let op = match op {
                    BinaryOp::And => "&&",
                    BinaryOp::Or => "||",
                };
                write!(f, "({lhs} {op} {rhs})")
            }
        }
    }
}

impl fmt::Debug for GuardExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GuardExpr({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Panel {
        visible: bool,
    }

    impl Bindable for Panel {}

    #[test]
    fn property_shorthand_builds_read_on_constant() {
        let panel = Rc::new(Panel { visible: true });
        let expr = GuardExpr::property(&panel, "visible", |p| p.visible);
        match &expr {
            GuardExpr::Property {
                base: Some(base),
                property,
            } => {
                assert!(matches!(**base, GuardExpr::Constant(_)));
                assert_eq!(property.name(), "visible");
                assert_eq!(property.kind(), ValueKind::Bool);
                assert!(!property.is_static());
            }
            other => panic!("unexpected shape {other}"),
        }
    }

    #[test]
    fn display_renders_structure() {
        let panel = Rc::new(Panel { visible: false });
        let a = GuardExpr::property(&panel, "visible", |p| p.visible);
        let b = GuardExpr::Parameter.call("is_empty");
        let text = (!a.and(b)).to_string();
        assert!(text.starts_with("!(<"));
        assert!(text.contains("Panel>.visible && arg.is_empty())"));

        let s = GuardExpr::read_static(Property::static_member("ENABLED", ValueKind::Bool));
        assert_eq!(s.to_string(), "static::ENABLED");
        assert_eq!(GuardExpr::call_free("compute").to_string(), "compute()");
    }

    #[test]
    fn instance_reader_downcasts() {
        let panel = Panel { visible: true };
        let property = Property::instance("visible", |p: &Panel| p.visible);
        let Accessor::Instance { read, .. } = &property.accessor else {
            panic!("expected instance accessor");
        };
        assert_eq!(read(&panel).and_then(|v| v.as_bool()), Some(true));
        assert!(read(&42u8).is_none());
    }

    #[test]
    fn object_valued_property_kind() {
        struct Window {
            panel: Rc<Panel>,
        }
        impl Bindable for Window {}

        let property = Property::instance("panel", |w: &Window| Rc::clone(&w.panel));
        assert_eq!(property.kind(), ValueKind::Object);
        let value: Value = Rc::new(Panel { visible: true }).into();
        assert_eq!(value.kind(), ValueKind::Object);
        assert!(value.as_bool().is_none());
        assert!(format!("{value:?}").contains("Panel"));
    }

    #[test]
    fn node_names() {
        assert_eq!(GuardExpr::Parameter.node_name(), "the guard parameter");
        assert_eq!(GuardExpr::Literal(true).node_name(), "a literal");
        assert_eq!(
            GuardExpr::Literal(true).or(GuardExpr::Literal(false)).node_name(),
            "a binary operation"
        );
    }
}
