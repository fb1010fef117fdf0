//! Standin Derive Macros: Proxy Generation for Traits
//!
//! `#[mockable]` turns a trait into something `DynamicMock` can stand in for.
//! The trait itself is kept as written; next to it the macro emits:
//!
//! - a proxy struct (`Mock<Trait>` unless renamed) that implements the trait
//!   by forwarding every call through a `Dispatcher`
//! - a `Mockable` impl describing each method: parameter and return type
//!   names, `&mut` parameters as read/write, and whether a default body exists
//! - a hidden fallback trait carrying the default bodies, so `ignore`d
//!   methods still run the trait's own implementation
//!
//! # Example
//!
//! ```ignore
//! use standin::{args, mockable, DynamicMock};
//!
//! #[mockable]
//! pub trait Inventory {
//!     fn stock(&self, sku: &str) -> u32;
//!
//!     fn in_stock(&self, sku: &str) -> bool {
//!         self.stock(sku) > 0
//!     }
//! }
//!
//! let inventory = DynamicMock::<MockInventory>::new();
//! inventory.expect_and_return("stock", 3, args!["A-1"])?;
//! inventory.ignore("in_stock")?;
//! assert!(inventory.mock_instance()?.in_stock("A-1"));
//! inventory.verify()?;
//! ```
//!
//! # Attributes
//!
//! - `#[mockable(name = "FakeInventory")]` - Override the proxy struct name
//! - `#[mockable(bases(Catalog))]` - Supertraits the proxy also implements.
//!   Each must itself be `#[mockable]`, declared at module level in the same
//!   crate, with its signature types in scope where the subtrait is declared.
//!
//! # Limitations
//!
//! Arguments must implement `serde::Serialize` and return values
//! `serde::de::DeserializeOwned`. Generic traits, associated types, async
//! methods, methods without a `self` receiver and methods returning
//! references are rejected at compile time. Supertraits other than `Debug`
//! must be listed in `bases`.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote, ToTokens};
use syn::{
    parse_macro_input, parse_quote, FnArg, GenericArgument, Ident, ItemTrait, LitStr, Path,
    PathArguments, PathSegment, ReturnType, TraitBoundModifier, TraitItem, TraitItemFn, Type,
    TypeParamBound,
};

/// Attribute macro generating a dynamic proxy for a trait.
///
/// # Attributes
///
/// - `name = "..."` - Proxy struct name (defaults to `Mock` + trait name)
/// - `bases(A, B)` - `#[mockable]` supertraits forwarded through the same proxy
///
/// # Example
///
/// ```ignore
/// #[mockable(name = "FakeClock")]
/// trait Clock {
///     fn now(&self) -> u64;
/// }
///
/// let clock = DynamicMock::<FakeClock>::new();
///
/// #[mockable]
/// trait Named {
///     fn name(&self) -> String;
/// }
///
/// #[mockable(bases(Named))]
/// trait Employee: Named {
///     fn badge(&self) -> u64;
/// }
/// ```
#[proc_macro_attribute]
pub fn mockable(attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut options = Options::default();
    let parser = syn::meta::parser(|meta| {
        if meta.path.is_ident("name") {
            let lit: LitStr = meta.value()?.parse()?;
            options.name = Some(lit.parse()?);
            Ok(())
        } else if meta.path.is_ident("bases") {
            meta.parse_nested_meta(|base| {
                options.bases.push(base.path.clone());
                Ok(())
            })
        } else {
            Err(meta.error(
                "unsupported mockable option, expected `name = \"...\"` or `bases(...)`",
            ))
        }
    });
    parse_macro_input!(attr with parser);
    let item_trait = parse_macro_input!(item as ItemTrait);

    match expand(&item_trait, options) {
        Ok(expanded) => TokenStream::from(expanded),
        Err(err) => {
            let err = err.to_compile_error();
            TokenStream::from(quote! {
                #item_trait
                #err
            })
        }
    }
}

// ============================================================================
// Expansion
// ============================================================================

#[derive(Default)]
struct Options {
    name: Option<Ident>,
    bases: Vec<Path>,
}

/// One trait method as the proxy sees it
struct Method<'a> {
    item: &'a TraitItemFn,
    params: Vec<Param<'a>>,
}

struct Param<'a> {
    binding: Ident,
    ty: &'a Type,
    writeback: bool,
}

fn expand(item: &ItemTrait, options: Options) -> syn::Result<TokenStream2> {
    if !item.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &item.generics,
            "#[mockable] does not support generic traits",
        ));
    }
    check_supertraits(item, &options.bases)?;

    let methods = collect_methods(item)?;
    let trait_ident = &item.ident;
    let trait_name = trait_ident.to_string();
    let proxy = options
        .name
        .unwrap_or_else(|| format_ident!("Mock{}", trait_ident));
    let proxy_name = proxy.to_string();
    let fallback = fallback_ident(trait_ident);
    let forward = forward_ident(trait_ident);
    let vis = &item.vis;
    let unsafety = &item.unsafety;
    let doc = format!("Stand-in for [`{trait_name}`] generated by `#[mockable]`");

    let members = methods.iter().map(member_descriptor);
    let base_bodies = methods.iter().filter_map(fallback_method);
    let forwarders = methods.iter().map(|m| forwarding_method(m, &quote!(#fallback)));
    let forwarders_for_subtraits = methods.iter().map(|m| forwarding_method(m, &quote!($fallback)));

    let base_descriptors = options.bases.iter().map(|base| {
        let base_fallback = sibling_path(base, fallback_ident(&last_ident(base)));
        quote!(.base(<Self as #base_fallback>::__standin_descriptor()))
    });
    let base_impls = options.bases.iter().map(|base| {
        let ident = last_ident(base);
        let base_fallback = sibling_path(base, fallback_ident(&ident));
        let mut forward_path = sibling_path(base, forward_ident(&ident));
        if forward_path.leading_colon.is_none() && forward_path.segments.len() == 1 {
            forward_path = parse_quote!(self::#forward_path);
        }
        quote! {
            #forward_path!(#proxy, #base, #base_fallback);
        }
    });

    Ok(quote! {
        #item

        #[doc = #doc]
        #vis struct #proxy {
            dispatcher: ::standin::Dispatcher,
        }

        impl ::core::fmt::Debug for #proxy {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.debug_struct(#proxy_name)
                    .field("dispatcher", &self.dispatcher)
                    .finish()
            }
        }

        #[automatically_derived]
        impl ::standin::Mockable for #proxy {
            fn descriptor() -> ::standin::TypeDescriptor {
                ::standin::TypeDescriptor::interface(#trait_name)
                    #(.member(#members))*
                    #(#base_descriptors)*
            }

            fn instantiate(dispatcher: ::standin::Dispatcher) -> Self {
                Self { dispatcher }
            }
        }

        #[doc(hidden)]
        #[allow(dead_code)]
        #vis #unsafety trait #fallback: #trait_ident {
            #[doc(hidden)]
            fn __standin_descriptor() -> ::standin::TypeDescriptor
            where
                Self: Sized,
            {
                <#proxy as ::standin::Mockable>::descriptor()
            }

            #(#base_bodies)*
        }

        #[automatically_derived]
        #unsafety impl #fallback for #proxy {}

        #[automatically_derived]
        #unsafety impl #trait_ident for #proxy {
            #(#forwarders)*
        }

        #(#base_impls)*

        // Lets subtraits naming this trait in `bases(...)` implement it on
        // their own proxy through the same dispatcher
        #[doc(hidden)]
        #[allow(unused_macros)]
        macro_rules! #forward {
            ($target:ty, $base:path, $fallback:path) => {
                #[automatically_derived]
                #unsafety impl $fallback for $target {}

                #[automatically_derived]
                #unsafety impl $base for $target {
                    #(#forwarders_for_subtraits)*
                }
            };
        }

        #[doc(hidden)]
        #[allow(unused_imports)]
        pub(crate) use #forward;
    })
}

fn fallback_ident(trait_ident: &Ident) -> Ident {
    format_ident!("__Standin{}Fallback", trait_ident)
}

fn forward_ident(trait_ident: &Ident) -> Ident {
    format_ident!("__standin_forward_{}", trait_ident)
}

fn last_ident(path: &Path) -> Ident {
    path.segments
        .last()
        .map_or_else(|| format_ident!("_"), |segment| segment.ident.clone())
}

/// `path` with its last segment replaced by `ident`
fn sibling_path(path: &Path, ident: Ident) -> Path {
    let mut sibling = path.clone();
    if let Some(last) = sibling.segments.last_mut() {
        *last = PathSegment::from(ident);
    }
    sibling
}

fn path_text(path: &Path) -> String {
    path.to_token_stream().to_string()
}

/// Every supertrait is either a listed base or `Debug`, and every base is a
/// declared supertrait
fn check_supertraits(item: &ItemTrait, bases: &[Path]) -> syn::Result<()> {
    let declared: Vec<&Path> = item
        .supertraits
        .iter()
        .filter_map(|bound| match bound {
            TypeParamBound::Trait(bound) if !matches!(bound.modifier, TraitBoundModifier::Maybe(_)) => {
                Some(&bound.path)
            }
            _ => None,
        })
        .collect();

    for path in &declared {
        let is_debug = path.segments.last().is_some_and(|s| s.ident == "Debug");
        if !is_debug && !bases.iter().any(|base| path_text(base) == path_text(path)) {
            return Err(syn::Error::new_spanned(
                path,
                format!(
                    "supertrait `{}` must be #[mockable] and listed in #[mockable(bases(...))]",
                    path_text(path)
                ),
            ));
        }
    }
    for base in bases {
        if !declared.iter().any(|path| path_text(path) == path_text(base)) {
            return Err(syn::Error::new_spanned(
                base,
                format!("`{}` is not a supertrait of `{}`", path_text(base), item.ident),
            ));
        }
    }
    Ok(())
}

fn collect_methods(item: &ItemTrait) -> syn::Result<Vec<Method<'_>>> {
    let mut methods = Vec::new();
    for trait_item in &item.items {
        match trait_item {
            TraitItem::Fn(method) => methods.push(inspect_method(method)?),
            TraitItem::Type(assoc) => {
                return Err(syn::Error::new_spanned(
                    assoc,
                    "#[mockable] does not support associated types",
                ))
            }
            TraitItem::Const(constant) if constant.default.is_none() => {
                return Err(syn::Error::new_spanned(
                    constant,
                    "#[mockable] needs a default value for associated constants",
                ))
            }
            TraitItem::Macro(mac) => {
                return Err(syn::Error::new_spanned(
                    mac,
                    "#[mockable] cannot see through macro invocations in traits",
                ))
            }
            _ => {}
        }
    }
    Ok(methods)
}

fn inspect_method(item: &TraitItemFn) -> syn::Result<Method<'_>> {
    let sig = &item.sig;
    if let Some(asyncness) = &sig.asyncness {
        return Err(syn::Error::new_spanned(
            asyncness,
            "#[mockable] does not support async methods",
        ));
    }
    if sig.receiver().is_none() {
        return Err(syn::Error::new_spanned(
            sig,
            "#[mockable] methods need a `self` receiver",
        ));
    }
    if let ReturnType::Type(_, ty) = &sig.output {
        if matches!(**ty, Type::Reference(_) | Type::ImplTrait(_)) {
            return Err(syn::Error::new_spanned(
                ty,
                "#[mockable] methods cannot return references or `impl Trait`",
            ));
        }
    }

    let params = sig
        .inputs
        .iter()
        .filter_map(|input| match input {
            FnArg::Typed(typed) => Some(&*typed.ty),
            FnArg::Receiver(_) => None,
        })
        .enumerate()
        .map(|(index, ty)| Param {
            binding: format_ident!("__standin_arg{}", index),
            ty,
            writeback: is_sized_mut_ref(ty),
        })
        .collect();

    Ok(Method { item, params })
}

/// `&mut T` with a sized `T` the proxy can assign through
fn is_sized_mut_ref(ty: &Type) -> bool {
    match ty {
        Type::Reference(reference) if reference.mutability.is_some() => !matches!(
            &*reference.elem,
            Type::Slice(_) | Type::TraitObject(_)
        ) && !is_path_ident(&reference.elem, "str"),
        _ => false,
    }
}

fn is_path_ident(ty: &Type, ident: &str) -> bool {
    matches!(ty, Type::Path(path) if path.qself.is_none() && path.path.is_ident(ident))
}

/// `Result<T, E>` spelled with both arguments
fn is_result_type(ty: &Type) -> bool {
    let Type::Path(path) = ty else {
        return false;
    };
    let Some(last) = path.path.segments.last() else {
        return false;
    };
    if last.ident != "Result" {
        return false;
    }
    match &last.arguments {
        PathArguments::AngleBracketed(args) => {
            args.args
                .iter()
                .filter(|arg| matches!(arg, GenericArgument::Type(_)))
                .count()
                == 2
        }
        _ => false,
    }
}

fn type_text(ty: &Type) -> String {
    ty.to_token_stream().to_string()
}

fn member_descriptor(method: &Method<'_>) -> TokenStream2 {
    let name = method.item.sig.ident.to_string();
    let params = method.params.iter().map(|param| {
        let text = type_text(param.ty);
        if param.writeback {
            quote!(.param(::standin::ParamInfo::new(#text).by_ref()))
        } else {
            quote!(.param(::standin::ParamInfo::new(#text)))
        }
    });
    let returns = match &method.item.sig.output {
        ReturnType::Default => quote!(),
        ReturnType::Type(_, ty) => {
            let text = type_text(ty);
            quote!(.returns(#text))
        }
    };
    let base = method
        .item
        .default
        .as_ref()
        .map(|_| quote!(.with_base()));
    quote! {
        ::standin::MemberInfo::method(#name) #(#params)* #returns #base
    }
}

fn base_ident(method: &Method<'_>) -> Ident {
    format_ident!("__standin_base_{}", method.item.sig.ident)
}

fn fallback_method(method: &Method<'_>) -> Option<TokenStream2> {
    let body = method.item.default.as_ref()?;
    let mut sig = method.item.sig.clone();
    sig.ident = base_ident(method);
    Some(quote! {
        #[doc(hidden)]
        #sig #body
    })
}

/// `fallback` names the trait carrying base bodies; inside the forwarding
/// macro it is the `$fallback` metavariable
fn forwarding_method(method: &Method<'_>, fallback: &TokenStream2) -> TokenStream2 {
    let name = method.item.sig.ident.to_string();
    let mut sig = method.item.sig.clone();
    let mut bindings = method.params.iter().map(|p| &p.binding);
    for input in &mut sig.inputs {
        if let FnArg::Typed(typed) = input {
            if let Some(binding) = bindings.next() {
                typed.pat = Box::new(parse_quote!(#binding));
            }
        }
    }

    let all_bindings: Vec<&Ident> = method.params.iter().map(|p| &p.binding).collect();
    let fall_through = method.item.default.as_ref().map(|_| {
        let base = base_ident(method);
        quote! {
            if self.dispatcher.is_ignored(#name) {
                return <Self as #fallback>::#base(self #(, #all_bindings)*);
            }
        }
    });

    let encoded = method.params.iter().map(|param| {
        let binding = &param.binding;
        if param.writeback {
            quote!(::standin::__private::encode(&*#binding))
        } else {
            quote!(::standin::__private::encode(&#binding))
        }
    });

    let writebacks = method
        .params
        .iter()
        .enumerate()
        .filter(|(_, param)| param.writeback)
        .map(|(index, param)| {
            let binding = &param.binding;
            quote! {
                *#binding = ::standin::__private::decode(
                    ::core::mem::take(&mut __standin_args[#index]),
                );
            }
        });
    let writebacks: Vec<TokenStream2> = writebacks.collect();
    let writeback_block = if writebacks.is_empty() {
        quote!()
    } else {
        quote! {
            if __standin_result.is_ok() {
                #(#writebacks)*
            }
        }
    };

    let answer = match &method.item.sig.output {
        ReturnType::Default => quote!(::standin::__private::completed(__standin_result)),
        ReturnType::Type(_, ty) if is_result_type(ty) => {
            quote!(::standin::__private::returned_result(__standin_result))
        }
        ReturnType::Type(..) => quote!(::standin::__private::returned(__standin_result)),
    };

    quote! {
        #sig {
            #fall_through
            let mut __standin_args: ::std::vec::Vec<::standin::Value> =
                ::std::vec![#(#encoded),*];
            let __standin_result = self.dispatcher.dispatch(#name, &mut __standin_args);
            #writeback_block
            #answer
        }
    }
}
