//! Procedural macros for `bevy_ldtkmap`.
//!
//! This crate provides the `LdtkInjectable` derive macro, which lists the members of a
//! component that are filled from LDtk fields, and the `LdtkEnum` derive macro, which maps
//! LDtk enum value names onto unit variants.

use std::collections::HashSet;

use proc_macro::TokenStream;
use proc_macro_crate::{FoundCrate, crate_name};
use quote::{format_ident, quote};
use syn::{Attribute, Data, DeriveInput, Fields, LitStr, Meta, Type, parse_macro_input};

/// Get the path tokens of the core crate, through the umbrella crate when it is a
/// dependency.
fn core_path() -> proc_macro2::TokenStream {
    match crate_name("bevy_ldtkmap") {
        Ok(FoundCrate::Name(name)) => {
            let ident = format_ident!("{name}");
            quote!(::#ident::core)
        }
        // Examples and tests of the umbrella crate refer to it by name
        Ok(FoundCrate::Itself) => quote!(::bevy_ldtkmap::core),
        Err(_) => match crate_name("bevy_ldtkmap_core") {
            Ok(FoundCrate::Name(name)) => {
                let ident = format_ident!("{name}");
                quote!(::#ident)
            }
            // The core crate names itself through `extern crate self`
            Ok(FoundCrate::Itself) | Err(_) => quote!(::bevy_ldtkmap_core),
        },
    }
}

/// Derive macro for filling a component from LDtk field values.
///
/// This macro generates:
/// - An `LdtkInjectable` impl listing every member marked `#[ldtk]`, with a typed setter
///   and a reset to the member's `Default` value
/// - With a target attribute, an inventory submission so the component is inserted on every
///   matching node during a build
///
/// # Example
///
/// ```ignore
/// use bevy::prelude::*;
/// use bevy_ldtkmap::prelude::*;
///
/// #[derive(Component, Default, LdtkInjectable)]
/// #[ldtk(entity = "Door")]
/// struct Door {
///     #[ldtk]
///     locked: bool,
///     #[ldtk(name = "key")]
///     key_id: Option<u32>,
///     // Not injected, keeps its default
///     open_time: f32,
/// }
/// ```
///
/// # Attributes
///
/// - `#[ldtk(entity = "...")]` - Insert on entities with this LDtk identifier (struct-level)
/// - `#[ldtk(level)]` - Insert on every level node (struct-level)
/// - `#[ldtk]` - Inject this member from the field of the same name (field-level)
/// - `#[ldtk(name = "...")]` - Inject this member from the named field (field-level)
///
/// `Option<T>` members accept null values and `Vec<T>` members take array fields.
#[proc_macro_derive(LdtkInjectable, attributes(ldtk))]
pub fn derive_ldtk_injectable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match derive_injectable_impl(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

/// Derive macro for Rust enums mirroring an LDtk enum definition.
///
/// # Example
///
/// ```ignore
/// use bevy_ldtkmap::prelude::*;
///
/// #[derive(Default, LdtkEnum)]
/// #[ldtk(name = "Item")]
/// enum Item {
///     #[default]
///     Key,
///     #[ldtk(rename = "Health Potion")]
///     Potion,
/// }
/// ```
///
/// # Attributes
///
/// - `#[ldtk(name = "...")]` - LDtk enum identifier, defaults to the Rust name (enum-level)
/// - `#[ldtk(rename = "...")]` - LDtk value name, defaults to the variant name (variant-level)
#[proc_macro_derive(LdtkEnum, attributes(ldtk))]
pub fn derive_ldtk_enum(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match derive_enum_impl(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

/// Where an injectable component is inserted during a build.
enum Target {
    None,
    Entity(LitStr),
    Level,
}

fn derive_injectable_impl(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let type_name = &input.ident;
    let core = core_path();

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "LdtkInjectable does not support generic types",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            Fields::Unit => return Err(syn::Error::new_spanned(type_name, "LdtkInjectable needs named fields")),
            Fields::Unnamed(_) => {
                return Err(syn::Error::new_spanned(
                    type_name,
                    "LdtkInjectable does not support tuple structs",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                type_name,
                "LdtkInjectable can only be derived for structs",
            ));
        }
    };

    let mut members = Vec::new();
    let mut seen = HashSet::new();
    for field in fields {
        let Some(field_ident) = &field.ident else {
            continue;
        };
        let Some(ldtk_name) = parse_member_attr(&field.attrs, field_ident)? else {
            continue;
        };
        if !seen.insert(ldtk_name.clone()) {
            return Err(syn::Error::new_spanned(
                field_ident,
                format!("LDtk field '{ldtk_name}' is injected into more than one member"),
            ));
        }

        let (shape, element) = member_shape(&field.ty);
        let into = match shape {
            "Optional" => format_ident!("into_optional"),
            "Array" => format_ident!("into_array"),
            _ => format_ident!("into_single"),
        };
        let shape = format_ident!("{shape}");

        members.push(quote! {
            #core::fields::LdtkMember {
                name: #ldtk_name,
                element: #core::fields::MemberType::of::<#element>(),
                shape: #core::fields::MemberShape::#shape,
                assign: |target: &mut #type_name, payload: #core::fields::FieldPayload| -> bool {
                    match payload.#into::<#element>() {
                        ::std::option::Option::Some(value) => {
                            target.#field_ident = value;
                            true
                        }
                        ::std::option::Option::None => false,
                    }
                },
                reset: |target: &mut #type_name| {
                    target.#field_ident = <#type_name as ::std::default::Default>::default().#field_ident;
                },
            }
        });
    }

    let registration = match parse_target_attr(&input.attrs)? {
        Target::None => quote!(),
        Target::Entity(identifier) => target_submission(&core, type_name, quote!(Entity(#identifier))),
        Target::Level => target_submission(&core, type_name, quote!(Level)),
    };

    Ok(quote! {
        impl #core::fields::LdtkInjectable for #type_name {
            fn members() -> &'static [#core::fields::LdtkMember<Self>] {
                static MEMBERS: &[#core::fields::LdtkMember<#type_name>] = &[
                    #(#members),*
                ];
                MEMBERS
            }
        }

        #registration
    })
}

/// Submit the component to inventory for compile-time registration.
fn target_submission(
    core: &proc_macro2::TokenStream,
    type_name: &syn::Ident,
    target: proc_macro2::TokenStream,
) -> proc_macro2::TokenStream {
    let type_name_str = type_name.to_string();
    quote! {
        #core::inventory::submit! {
            #core::fields::LdtkTargetInfo {
                target: #core::fields::LdtkTarget::#target,
                type_name: #type_name_str,
                insert: #core::fields::insert_injected::<#type_name>,
            }
        }
    }
}

fn derive_enum_impl(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let enum_name = &input.ident;
    let core = core_path();

    let Data::Enum(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            enum_name,
            "LdtkEnum can only be derived for enums",
        ));
    };
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "LdtkEnum does not support generic types",
        ));
    }
    if data.variants.is_empty() {
        return Err(syn::Error::new_spanned(enum_name, "LdtkEnum needs at least one variant"));
    }

    let ldtk_name = parse_string_attr(&input.attrs, "name")?.unwrap_or_else(|| enum_name.to_string());

    let mut variant_idents = Vec::new();
    let mut names = Vec::new();
    let mut keys = Vec::new();
    let mut seen = HashSet::new();
    for variant in &data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new_spanned(
                variant,
                "LdtkEnum only supports unit variants",
            ));
        }
        let name = parse_string_attr(&variant.attrs, "rename")?.unwrap_or_else(|| variant.ident.to_string());
        // Raw names are normalized before lookup, so match on the normalized form
        let key = name.trim().replace(' ', "_");
        if !seen.insert(key.clone()) {
            return Err(syn::Error::new_spanned(
                variant,
                format!("LDtk value '{name}' is mapped to more than one variant"),
            ));
        }
        variant_idents.push(&variant.ident);
        names.push(name);
        keys.push(key);
    }

    Ok(quote! {
        impl #core::fields::LdtkEnum for #enum_name {
            const VARIANTS: &'static [&'static str] = &[#(#names),*];

            fn from_variant(name: &str) -> ::std::option::Option<Self> {
                match name {
                    #(#keys => ::std::option::Option::Some(Self::#variant_idents),)*
                    _ => ::std::option::Option::None,
                }
            }

            fn variant_name(&self) -> &'static str {
                match self {
                    #(Self::#variant_idents => #names,)*
                }
            }
        }

        #core::inventory::submit! {
            #core::fields::LdtkEnumInfo {
                type_id: ::std::any::TypeId::of::<#enum_name>,
                name: #ldtk_name,
                variants: <#enum_name as #core::fields::LdtkEnum>::VARIANTS,
                from_variant: #core::fields::enums::boxed_variant::<#enum_name>,
            }
        }
    })
}

fn parse_target_attr(attrs: &[Attribute]) -> syn::Result<Target> {
    let mut target = Target::None;
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("ldtk")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("entity") {
                target = Target::Entity(meta.value()?.parse()?);
                Ok(())
            } else if meta.path.is_ident("level") {
                target = Target::Level;
                Ok(())
            } else {
                Err(meta.error("expected `entity = \"...\"` or `level`"))
            }
        })?;
    }
    Ok(target)
}

/// LDtk field name of a member, or `None` when the member is not injected.
fn parse_member_attr(attrs: &[Attribute], field_ident: &syn::Ident) -> syn::Result<Option<String>> {
    let mut name = None;
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("ldtk")) {
        if let Meta::Path(_) = attr.meta {
            name = Some(field_ident.to_string());
            continue;
        }
        let mut explicit = None;
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let lit: LitStr = meta.value()?.parse()?;
                explicit = Some(lit.value());
                Ok(())
            } else {
                Err(meta.error("expected `name = \"...\"`"))
            }
        })?;
        name = Some(explicit.unwrap_or_else(|| field_ident.to_string()));
    }
    Ok(name)
}

/// Value of `#[ldtk(<key> = "...")]`, if present.
fn parse_string_attr(attrs: &[Attribute], key: &str) -> syn::Result<Option<String>> {
    let mut value = None;
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("ldtk")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident(key) {
                let lit: LitStr = meta.value()?.parse()?;
                value = Some(lit.value());
                Ok(())
            } else {
                Err(meta.error(format!("expected `{key} = \"...\"`")))
            }
        })?;
    }
    Ok(value)
}

/// Shape of a member and the element type its parser produces.
fn member_shape(ty: &Type) -> (&'static str, &Type) {
    if let Some(inner) = extract_inner_type(ty, "Option") {
        ("Optional", inner)
    } else if let Some(inner) = extract_inner_type(ty, "Vec") {
        ("Array", inner)
    } else {
        ("Single", ty)
    }
}

fn extract_inner_type<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    if let Type::Path(type_path) = ty
        && let Some(segment) = type_path.path.segments.last()
        && segment.ident == wrapper
        && let syn::PathArguments::AngleBracketed(args) = &segment.arguments
        && let Some(syn::GenericArgument::Type(inner_ty)) = args.args.first()
    {
        return Some(inner_ty);
    }
    None
}
