mod component;

use proc_macro::TokenStream;

/// Implement `strata::ecs::Component`.
///
/// Storage options are set with `#[component(...)]`:
///
/// - `tag`, `shared` or `global` select the storage shape (at most one);
/// - `transient` clears the component at the end of each run (not with `global`);
/// - `immutable` forbids `&mut` parameters;
/// - `variant_of = T` makes the type mutually exclusive with `T` on an entity.
///
/// `shared` and `global` types must implement `PartialEq`; `global` types must also implement
/// `Default`, which provides the initial value.
#[proc_macro_derive(Component, attributes(component))]
pub fn derive_component(item: TokenStream) -> TokenStream {
    component::derive_component(item)
}
