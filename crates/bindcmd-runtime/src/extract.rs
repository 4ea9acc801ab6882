#![forbid(unsafe_code)]

//! Static analysis of guard expressions into dependency descriptors.
//!
//! # Accepted Shape
//!
//! Exactly one instance-property read on one captured object:
//! `Property { base: Some(Constant(owner)), property }` where the property
//! yields a boolean and is declared on the owner's concrete type.
//!
//! # Rejections, in check order
//!
//! 1. Body is not a property read → [`InvalidExpressionShape`].
//! 2. Property is static → [`NotAnInstanceMember`].
//! 3. Base is not a captured instance (missing, the guard parameter, a
//!    nested read, a call) → [`UnsupportedExpressionBase`].
//! 4. Owner type differs from the declaring type → [`OwnerTypeMismatch`].
//! 5. Property is not boolean → [`InvalidExpressionShape`].
//!
//! [`InvalidExpressionShape`]: ExpressionError::InvalidExpressionShape
//! [`NotAnInstanceMember`]: ExpressionError::NotAnInstanceMember
//! [`UnsupportedExpressionBase`]: ExpressionError::UnsupportedExpressionBase
//! [`OwnerTypeMismatch`]: ExpressionError::OwnerTypeMismatch

use std::any::Any;
use std::borrow::Cow;
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use bindcmd_core::{Bindable, OwnerId};

use crate::error::ExpressionError;
use crate::expr::{Accessor, GuardExpr, Value, ValueKind};

type Predicate<P> = Rc<dyn Fn(&P) -> bool>;

/// The property a guard depends on, its owner, and the compiled guard.
pub struct DependencyDescriptor<P> {
    property: Cow<'static, str>,
    owner: Rc<dyn Bindable>,
    predicate: Predicate<P>,
}

impl<P> Clone for DependencyDescriptor<P> {
    fn clone(&self) -> Self {
        Self {
            property: self.property.clone(),
            owner: Rc::clone(&self.owner),
            predicate: Rc::clone(&self.predicate),
        }
    }
}

impl<P> fmt::Debug for DependencyDescriptor<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencyDescriptor")
            .field("property", &self.property)
            .field("owner", &self.owner.type_name())
            .finish()
    }
}

impl<P: 'static> DependencyDescriptor<P> {
    /// Declare a dependency directly: `predicate` reads `owner`, and
    /// `property` names what it reads.
    pub fn explicit<T: Bindable>(
        owner: &Rc<T>,
        property: impl Into<Cow<'static, str>>,
        predicate: impl Fn(&T, &P) -> bool + 'static,
    ) -> Self {
        let captured = Rc::clone(owner);
        Self {
            property: property.into(),
            owner: Rc::clone(owner) as Rc<dyn Bindable>,
            predicate: Rc::new(move |parameter: &P| predicate(&captured, parameter)),
        }
    }
}

impl<P> DependencyDescriptor<P> {
    #[must_use]
    pub fn property_name(&self) -> &str {
        &self.property
    }

    #[must_use]
    pub fn owner(&self) -> &Rc<dyn Bindable> {
        &self.owner
    }

    #[must_use]
    pub fn owner_id(&self) -> OwnerId {
        OwnerId::of(&self.owner)
    }

    /// Evaluate the compiled guard.
    pub fn evaluate(&self, parameter: &P) -> bool {
        (self.predicate)(parameter)
    }

    /// Shared handle to the compiled guard.
    #[must_use]
    pub fn predicate(&self) -> Rc<dyn Fn(&P) -> bool> {
        Rc::clone(&self.predicate)
    }
}

/// Turns guard expressions into [`DependencyDescriptor`]s.
///
/// Extraction is a pure read of the expression; the only state kept is an
/// invocation counter for diagnostics.
#[derive(Debug, Default)]
pub struct DependencyExtractor {
    invocations: Cell<u64>,
}

impl DependencyExtractor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Analyse `expr` and compile it into a guard over `P`.
    ///
    /// The compiled guard ignores its parameter: the accepted shape reads a
    /// captured owner only.
    pub fn extract<P: 'static>(
        &self,
        expr: &GuardExpr,
    ) -> Result<DependencyDescriptor<P>, ExpressionError> {
        self.invocations.set(self.invocations.get() + 1);

        let GuardExpr::Property { base, property } = expr else {
            return Err(ExpressionError::InvalidExpressionShape {
                found: expr.node_name(),
                expression: expr.to_string(),
            });
        };

        let (owner_type, owner_type_name, read) = match &property.accessor {
            Accessor::Static => {
                return Err(ExpressionError::NotAnInstanceMember {
                    property: property.name().to_owned(),
                });
            }
            Accessor::Instance {
                owner_type,
                owner_type_name,
                read,
            } => (*owner_type, *owner_type_name, Rc::clone(read)),
        };

        let owner = match base.as_deref() {
            Some(GuardExpr::Constant(owner)) => Rc::clone(owner),
            other => {
                return Err(ExpressionError::UnsupportedExpressionBase {
                    property: property.name().to_owned(),
                    base: other.map_or("nothing", GuardExpr::node_name),
                });
            }
        };

        let erased: &dyn Any = &*owner;
        if Any::type_id(erased) != owner_type {
            return Err(ExpressionError::OwnerTypeMismatch {
                property: property.name().to_owned(),
                expected: owner_type_name,
                found: owner.type_name(),
            });
        }

        if property.kind() != ValueKind::Bool {
            return Err(ExpressionError::InvalidExpressionShape {
                found: "a non-boolean property",
                expression: expr.to_string(),
            });
        }

        let captured = Rc::clone(&owner);
        let predicate: Predicate<P> = Rc::new(move |_: &P| {
            let erased: &dyn Any = &*captured;
            matches!(read(erased), Some(Value::Bool(true)))
        });

        Ok(DependencyDescriptor {
            property: property.name_cow(),
            owner,
            predicate,
        })
    }

    /// Number of times [`extract`](Self::extract) has run.
    #[must_use]
    pub fn invocations(&self) -> u64 {
        self.invocations.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Property;
    use std::cell::RefCell;

    struct Session {
        ready: RefCell<bool>,
        parent: Option<Rc<Session>>,
    }

    impl Bindable for Session {}

    struct Other;

    impl Bindable for Other {}

    fn session(ready: bool) -> Rc<Session> {
        Rc::new(Session {
            ready: RefCell::new(ready),
            parent: None,
        })
    }

    fn ready() -> Property {
        Property::instance("ready", |s: &Session| *s.ready.borrow())
    }

    #[test]
    fn extracts_property_and_owner() {
        let owner = session(false);
        let extractor = DependencyExtractor::new();
        let expr = GuardExpr::constant(&owner).read(ready());

        let descriptor = extractor.extract::<()>(&expr).expect("valid guard");
        assert_eq!(descriptor.property_name(), "ready");
        assert_eq!(descriptor.owner_id(), OwnerId::of(&owner));
        assert_eq!(extractor.invocations(), 1);
    }

    #[test]
    fn compiled_guard_reads_live_state() {
        let owner = session(false);
        let descriptor = DependencyExtractor::new()
            .extract::<u32>(&GuardExpr::constant(&owner).read(ready()))
            .expect("valid guard");

        assert!(!descriptor.evaluate(&7));
        *owner.ready.borrow_mut() = true;
        assert!(descriptor.evaluate(&7));
        assert!((descriptor.predicate())(&0));
    }

    #[test]
    fn rejects_non_property_bodies() {
        let owner = session(true);
        let extractor = DependencyExtractor::new();
        let read = || GuardExpr::constant(&owner).read(ready());

        for expr in [
            read().and(read()),
            !read(),
            GuardExpr::call_free("compute"),
            GuardExpr::constant(&owner).call("is_ready"),
            GuardExpr::Literal(true),
            GuardExpr::Parameter,
        ] {
            let err = extractor.extract::<()>(&expr).expect_err("must be rejected");
            assert!(
                matches!(err, ExpressionError::InvalidExpressionShape { .. }),
                "{expr}: {err}"
            );
        }
    }

    #[test]
    fn rejects_static_members() {
        let static_read =
            GuardExpr::read_static(Property::static_member("ENABLED", ValueKind::Bool));
        let err = DependencyExtractor::new()
            .extract::<()>(&static_read)
            .expect_err("static");
        assert_eq!(
            err,
            ExpressionError::NotAnInstanceMember {
                property: "ENABLED".into()
            }
        );

        // Static accessor wins even when a base is present.
        let owner = session(true);
        let on_owner = GuardExpr::constant(&owner)
            .read(Property::static_member("ENABLED", ValueKind::Bool));
        assert!(matches!(
            DependencyExtractor::new().extract::<()>(&on_owner),
            Err(ExpressionError::NotAnInstanceMember { .. })
        ));
    }

    #[test]
    fn rejects_unsupported_bases() {
        let parent = session(true);
        let owner = Rc::new(Session {
            ready: RefCell::new(false),
            parent: Some(Rc::clone(&parent)),
        });
        let parent_of = Property::instance("parent", |s: &Session| {
            s.parent.clone().unwrap_or_else(|| session(false))
        });

        let cases = [
            (GuardExpr::Parameter.read(ready()), "the guard parameter"),
            (
                GuardExpr::constant(&owner).read(parent_of).read(ready()),
                "a property read",
            ),
            (
                GuardExpr::constant(&owner).call("parent").read(ready()),
                "a method call",
            ),
            (
                GuardExpr::Property {
                    base: None,
                    property: ready(),
                },
                "nothing",
            ),
        ];

        for (expr, expected_base) in cases {
            match DependencyExtractor::new().extract::<()>(&expr) {
                Err(ExpressionError::UnsupportedExpressionBase { property, base }) => {
                    assert_eq!(property, "ready");
                    assert_eq!(base, expected_base);
                }
                other => panic!("{expr}: unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn rejects_owner_of_wrong_type() {
        let other = Rc::new(Other);
        let expr = GuardExpr::constant(&other).read(ready());
        match DependencyExtractor::new().extract::<()>(&expr) {
            Err(ExpressionError::OwnerTypeMismatch {
                property,
                expected,
                found,
            }) => {
                assert_eq!(property, "ready");
                assert!(expected.ends_with("Session"));
                assert!(found.ends_with("Other"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn rejects_non_boolean_property() {
        let owner = session(true);
        let expr = GuardExpr::constant(&owner).read(Property::instance(
            "itself",
            |s: &Session| s.parent.clone().unwrap_or_else(|| session(true)),
        ));
        assert!(matches!(
            DependencyExtractor::new().extract::<()>(&expr),
            Err(ExpressionError::InvalidExpressionShape {
                found: "a non-boolean property",
                ..
            })
        ));
    }

    #[test]
    fn explicit_descriptor_passes_parameter() {
        let owner = session(true);
        let descriptor =
            DependencyDescriptor::explicit(&owner, "ready", |s: &Session, limit: &u32| {
                *s.ready.borrow() && *limit > 3
            });
        assert_eq!(descriptor.property_name(), "ready");
        assert!(descriptor.evaluate(&4));
        assert!(!descriptor.evaluate(&2));
        assert!(format!("{descriptor:?}").contains("ready"));

        let copy = descriptor.clone();
        assert_eq!(copy.owner_id(), descriptor.owner_id());
    }

    #[test]
    fn every_call_is_counted() {
        let extractor = DependencyExtractor::new();
        let _ = extractor.extract::<()>(&GuardExpr::Literal(false));
        let _ = extractor.extract::<()>(&GuardExpr::Parameter);
        assert_eq!(extractor.invocations(), 2);
    }
}
