use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::{DeriveInput, Error, Path, parse_macro_input, spanned::Spanned};

/// Options collected from `#[component(...)]` attributes.
#[derive(Default)]
struct Options {
    tag: bool,
    shared: bool,
    global: bool,
    transient: bool,
    immutable: bool,
    variant_of: Option<Path>,
}

impl Options {
    fn parse(ast: &DeriveInput) -> syn::Result<Self> {
        let mut options = Options::default();
        for attr in ast.attrs.iter().filter(|a| a.path().is_ident("component")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("tag") {
                    options.tag = true;
                } else if meta.path.is_ident("shared") {
                    options.shared = true;
                } else if meta.path.is_ident("global") {
                    options.global = true;
                } else if meta.path.is_ident("transient") {
                    options.transient = true;
                } else if meta.path.is_ident("immutable") {
                    options.immutable = true;
                } else if meta.path.is_ident("variant_of") {
                    options.variant_of = Some(meta.value()?.parse()?);
                } else {
                    return Err(meta.error(
                        "expected one of: tag, shared, global, transient, immutable, variant_of",
                    ));
                }
                Ok(())
            })?;
        }
        Ok(options)
    }

    fn validate(&self, span: Span) -> syn::Result<()> {
        let shapes = [self.tag, self.shared, self.global]
            .iter()
            .filter(|set| **set)
            .count();
        if shapes > 1 {
            return Err(Error::new(
                span,
                "a component can only be one of `tag`, `shared` or `global`",
            ));
        }
        if self.transient && self.global {
            return Err(Error::new(span, "a `global` component can not be `transient`"));
        }
        if self.global && self.variant_of.is_some() {
            return Err(Error::new(span, "a `global` component can not have variants"));
        }
        Ok(())
    }
}

pub fn derive_component(input: TokenStream) -> TokenStream {
    // Parse the input tokens into a syntax tree
    let ast = parse_macro_input!(input as DeriveInput);

    let options = match Options::parse(&ast).and_then(|o| o.validate(ast.span()).map(|_| o)) {
        Ok(options) => options,
        Err(error) => return error.to_compile_error().into(),
    };

    TokenStream::from(expand(&ast, &options))
}

fn expand(ast: &DeriveInput, options: &Options) -> TokenStream2 {
    let struct_name = &ast.ident;
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();

    // `::strata` resolves inside the crate through `extern crate self as strata;` in lib.rs.
    let flags = [
        (options.tag, quote!(TAG)),
        (options.shared, quote!(SHARED)),
        (options.global, quote!(GLOBAL)),
        (options.transient, quote!(TRANSIENT)),
        (options.immutable, quote!(IMMUTABLE)),
    ]
    .into_iter()
    .filter(|(set, _)| *set)
    .map(|(_, name)| quote!(.with(::strata::ecs::component::Flags::#name)));

    let mutability = if options.immutable || options.tag {
        quote!(::strata::ecs::component::Immutable)
    } else {
        quote!(::strata::ecs::component::Mutable)
    };

    let variant_of = options.variant_of.as_ref().map(|target| {
        quote! {
            fn variant_of(
                types: &::strata::ecs::world::TypeRegistry,
            ) -> ::core::option::Option<::strata::ecs::world::TypeId> {
                ::core::option::Option::Some(types.register::<#target>())
            }
        }
    });

    let same_value = (options.shared || options.global).then(|| {
        quote! {
            fn same_value(&self, other: &Self) -> bool {
                self == other
            }
        }
    });

    let global_default = options.global.then(|| {
        quote! {
            fn global_default() -> ::core::option::Option<Self> {
                ::core::option::Option::Some(<Self as ::core::default::Default>::default())
            }
        }
    });

    quote! {
        impl #impl_generics ::strata::ecs::Component for #struct_name #ty_generics #where_clause {
            const FLAGS: ::strata::ecs::component::Flags =
                ::strata::ecs::component::Flags::NONE #(#flags)*;

            type Mutability = #mutability;

            #variant_of
            #same_value
            #global_default
        }
    }
}
