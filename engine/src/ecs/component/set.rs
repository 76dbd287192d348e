use crate::{all_tuples, ecs::component::Component};

/// Receiver for the values of a [`Set`].
pub trait Target {
    /// Accept one component value.
    fn add<C: Component + Clone>(&mut self, value: C);
}

/// A set of component values staged together for one entity range.
///
/// A set is a single component or a tuple of components. Values are cloned once per entity
/// when the pool commits, so every member must be `Clone`.
pub trait Set: Sized + Send + 'static {
    /// Hand each value in this set to the target. This takes ownership of self.
    fn apply<T: Target>(self, target: &mut T);
}

/// Implement Set for single component types.
impl<C: Component + Clone> Set for C {
    fn apply<T: Target>(self, target: &mut T) {
        target.add::<C>(self);
    }
}

/// Receiver for the member types of a [`Types`] list.
pub trait TypeVisitor {
    /// Visit one component type.
    fn visit<C: Component>(&mut self);
}

/// A list of component types, used to remove several components at once.
pub trait Types: 'static {
    /// Visit every type in the list.
    fn visit<V: TypeVisitor>(visitor: &mut V);
}

impl<C: Component> Types for C {
    fn visit<V: TypeVisitor>(visitor: &mut V) {
        visitor.visit::<C>();
    }
}

macro_rules! tuple_set {
    ($($name: ident),*) => {
        impl<$($name: Set),*> Set for ($($name,)*) {
            fn apply<CT: Target>(self, target: &mut CT) {
                #[allow(non_snake_case)]
                let ( $($name,)* ) = self;
                $(<$name as Set>::apply($name, target);)*
            }
        }

        impl<$($name: Types),*> Types for ($($name,)*) {
            fn visit<CV: TypeVisitor>(visitor: &mut CV) {
                $(<$name as Types>::visit(visitor);)*
            }
        }
    }
}

all_tuples!(tuple_set);

#[cfg(test)]
mod tests {
    use std::any::{Any, TypeId, type_name};

    use crate::ecs::component::Mutable;

    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Comp1(u32);
    impl Component for Comp1 {
        type Mutability = Mutable;
    }

    #[derive(Clone, Debug, PartialEq)]
    struct Comp2(&'static str);
    impl Component for Comp2 {
        type Mutability = Mutable;
    }

    #[derive(Default)]
    struct MockTarget {
        vals: Vec<Box<dyn Any>>,
    }

    impl Target for MockTarget {
        fn add<C: Component + Clone>(&mut self, value: C) {
            self.vals.push(Box::new(value));
        }
    }

    #[derive(Default)]
    struct MockVisitor {
        types: Vec<TypeId>,
        names: Vec<&'static str>,
    }

    impl TypeVisitor for MockVisitor {
        fn visit<C: Component>(&mut self) {
            self.types.push(TypeId::of::<C>());
            self.names.push(type_name::<C>());
        }
    }

    #[test]
    fn single_component_set() {
        // Given
        let mut target = MockTarget::default();

        // When
        Comp1(42).apply(&mut target);

        // Then
        assert_eq!(target.vals.len(), 1);
        assert_eq!(target.vals[0].downcast_ref::<Comp1>(), Some(&Comp1(42)));
    }

    #[test]
    fn tuple_component_set_keeps_order() {
        // Given
        let mut target = MockTarget::default();

        // When
        (Comp2("a"), Comp1(7)).apply(&mut target);

        // Then
        assert_eq!(target.vals.len(), 2);
        assert_eq!(target.vals[0].downcast_ref::<Comp2>(), Some(&Comp2("a")));
        assert_eq!(target.vals[1].downcast_ref::<Comp1>(), Some(&Comp1(7)));
    }

    #[test]
    fn type_lists_visit_every_member() {
        // Given
        let mut visitor = MockVisitor::default();

        // When
        <(Comp1, Comp2)>::visit(&mut visitor);

        // Then
        assert_eq!(visitor.types, vec![TypeId::of::<Comp1>(), TypeId::of::<Comp2>()]);
        assert!(visitor.names[0].ends_with("Comp1"));
    }
}
