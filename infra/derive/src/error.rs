use fxhash::FxHashSet;
use proc_macro2::{Span, TokenStream};
use quote::{format_ident, quote};
use syn::{Attribute, Data, DeriveInput, Fields, Ident, LitStr, Type, Variant};

struct VariantMeta {
    ident: Ident,
    source_ty: Option<Type>,
    source_field: Option<Ident>,
    has_context: bool,
    environment_fault: bool,
    cfg_attrs: Vec<Attribute>,
}

pub fn expand(mut input: DeriveInput) -> TokenStream {
    let name = input.ident.clone();
    let vis = input.vis.clone();
    let ext_name = format_ident!("{}Ext", name);
    let kind_name = format_ident!("{}Kind", name);

    let Data::Enum(data) = &mut input.data else {
        return quote! { compile_error!("sluice_error can only be applied to enums"); };
    };

    let mut variants = Vec::with_capacity(data.variants.len());
    for variant in &mut data.variants {
        match inspect_variant(variant) {
            Ok(meta) => variants.push(meta),
            Err(err) => return err.to_compile_error(),
        }
    }

    let derived = derived_trait_names(&input.attrs);
    let mut derives = Vec::new();
    if !derived.contains("Debug") {
        derives.push(quote! { Debug });
    }
    if !derived.contains("Error") {
        derives.push(quote! { ::thiserror::Error });
    }
    let derive_attr =
        if derives.is_empty() { quote! {} } else { quote! { #[derive(#(#derives),*)] } };

    let ext_trait = context_trait(&name, &ext_name, &variants);
    let from_impls = variants.iter().filter_map(|v| source_impls(&name, &ext_name, v));
    let internal = internal_impls(&name, &variants);
    let kind = kind_enum(&name, &vis, &kind_name, &variants);

    quote! {
        #[allow(non_shorthand_field_patterns)]
        #derive_attr
        #input

        #ext_trait
        #(#from_impls)*
        #internal
        #kind

        #[allow(dead_code)]
        fn format_context(context: &Option<std::borrow::Cow<'static, str>>) -> std::borrow::Cow<'static, str> {
            context.as_ref().map_or(std::borrow::Cow::Borrowed(""), |c| std::borrow::Cow::Owned(format!(" ({c})")))
        }
    }
}

fn inspect_variant(variant: &mut Variant) -> syn::Result<VariantMeta> {
    let environment_fault = take_fault(variant)?;

    let Fields::Named(fields) = &variant.fields else {
        return Err(syn::Error::new_spanned(
            &*variant,
            "sluice_error requires named fields for source/context handling",
        ));
    };

    let context = fields.named.iter().find(|f| f.ident.as_ref().is_some_and(|i| i == "context"));
    if let Some(field) = context
        && !is_context_type(&field.ty)
    {
        return Err(syn::Error::new_spanned(
            &field.ty,
            "context field must be Option<Cow<'static, str>>",
        ));
    }

    let source = fields.named.iter().find(|field| {
        field.ident.as_ref().is_some_and(|i| i == "source")
            || has_attr(&field.attrs, "source")
            || has_attr(&field.attrs, "from")
    });
    if source.is_some() && context.is_none() {
        return Err(syn::Error::new_spanned(
            &variant.ident,
            "sluice_error requires `context: Option<Cow<'static, str>>` for variants with a source",
        ));
    }

    Ok(VariantMeta {
        ident: variant.ident.clone(),
        source_ty: source.map(|f| f.ty.clone()),
        source_field: source.and_then(|f| f.ident.clone()),
        has_context: context.is_some(),
        environment_fault,
        cfg_attrs: variant.attrs.iter().filter(|a| a.path().is_ident("cfg")).cloned().collect(),
    })
}

/// Reads and strips the `#[fault(..)]` marker, which is not a real attribute.
fn take_fault(variant: &mut Variant) -> syn::Result<bool> {
    let mut environment = false;
    for attr in variant.attrs.iter().filter(|a| a.path().is_ident("fault")) {
        let class: Ident = attr.parse_args()?;
        match class.to_string().as_str() {
            "environment" => environment = true,
            "input" => {},
            _ => {
                return Err(syn::Error::new_spanned(
                    class,
                    "expected #[fault(environment)] or #[fault(input)]",
                ));
            },
        }
    }
    variant.attrs.retain(|a| !a.path().is_ident("fault"));
    Ok(environment)
}

fn context_trait(name: &Ident, ext_name: &Ident, variants: &[VariantMeta]) -> TokenStream {
    let arms = variants.iter().filter(|v| v.has_context).map(|v| {
        let cfg = &v.cfg_attrs;
        let ident = &v.ident;
        quote! { #(#cfg)* #name::#ident { context: c, .. } => *c = Some(context.into()), }
    });

    quote! {
        pub trait #ext_name<T> {
            fn context(self, context: impl Into<std::borrow::Cow<'static, str>>) -> Result<T, #name>;
        }

        #[automatically_derived]
        impl<T> #ext_name<T> for Result<T, #name> {
            #[inline]
            fn context(self, context: impl Into<std::borrow::Cow<'static, str>>) -> Self {
                self.map_err(|mut e| {
                    match &mut e {
                        #(#arms)*
                        _ => {}
                    }
                    e
                })
            }
        }
    }
}

fn source_impls(name: &Ident, ext_name: &Ident, v: &VariantMeta) -> Option<TokenStream> {
    if v.ident == "Internal" {
        return None;
    }
    let source_ty = v.source_ty.as_ref()?;
    let field = v.source_field.as_ref()?;
    let ident = &v.ident;
    let cfg = &v.cfg_attrs;

    Some(quote! {
        #(#cfg)*
        #[automatically_derived]
        impl From<#source_ty> for #name {
            #[inline]
            fn from(#field: #source_ty) -> Self { Self::#ident { #field, context: None } }
        }

        #(#cfg)*
        impl<T> #ext_name<T> for std::result::Result<T, #source_ty> {
            #[inline]
            fn context(self, context: impl Into<std::borrow::Cow<'static, str>>) -> std::result::Result<T, #name> {
                self.map_err(|#field| #name::#ident { #field, context: Some(context.into()) })
            }
        }
    })
}

fn internal_impls(name: &Ident, variants: &[VariantMeta]) -> TokenStream {
    let Some(internal) = variants.iter().find(|v| v.ident == "Internal") else {
        return quote!();
    };
    let cfg = &internal.cfg_attrs;

    quote! {
        #(#cfg)*
        impl From<&'static str> for #name {
            #[inline]
            fn from(s: &'static str) -> Self { Self::Internal { message: std::borrow::Cow::Borrowed(s), context: None } }
        }
        #(#cfg)*
        impl From<String> for #name {
            #[inline]
            fn from(s: String) -> Self { Self::Internal { message: std::borrow::Cow::Owned(s), context: None } }
        }
    }
}

fn kind_enum(
    name: &Ident,
    vis: &syn::Visibility,
    kind_name: &Ident,
    variants: &[VariantMeta],
) -> TokenStream {
    let decls = variants.iter().map(|v| {
        let cfg = &v.cfg_attrs;
        let ident = &v.ident;
        quote! { #(#cfg)* #ident, }
    });
    let kind_arms = variants.iter().map(|v| {
        let cfg = &v.cfg_attrs;
        let ident = &v.ident;
        quote! { #(#cfg)* Self::#ident { .. } => #kind_name::#ident, }
    });
    let fault_arms = variants.iter().map(|v| {
        let cfg = &v.cfg_attrs;
        let ident = &v.ident;
        let env = v.environment_fault;
        quote! { #(#cfg)* Self::#ident { .. } => #env, }
    });
    let code_arms = variants.iter().map(|v| {
        let cfg = &v.cfg_attrs;
        let ident = &v.ident;
        let code = LitStr::new(&snake_case(ident), Span::call_site());
        quote! { #(#cfg)* Self::#ident => #code, }
    });
    let doc = format!("Fieldless classification of [`{name}`] variants.");

    quote! {
        #[doc = #doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #vis enum #kind_name {
            #(#decls)*
        }

        #[automatically_derived]
        impl #kind_name {
            /// Stable `snake_case` code for this kind.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    #(#code_arms)*
                }
            }
        }

        #[automatically_derived]
        impl ::core::fmt::Display for #kind_name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        #[automatically_derived]
        impl #name {
            /// Returns the fieldless kind of this error.
            #[must_use]
            pub const fn kind(&self) -> #kind_name {
                match self {
                    #(#kind_arms)*
                }
            }

            /// `true` when the error stems from the environment rather than from the input.
            #[must_use]
            pub const fn is_environment_fault(&self) -> bool {
                match self {
                    #(#fault_arms)*
                }
            }
        }
    }
}

fn snake_case(ident: &Ident) -> String {
    let raw = ident.to_string();
    let mut out = String::with_capacity(raw.len() + 4);
    for (i, ch) in raw.char_indices() {
        if ch.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

fn has_attr(attrs: &[Attribute], name: &str) -> bool {
    attrs.iter().any(|attr| attr.path().is_ident(name))
}

fn derived_trait_names(attrs: &[Attribute]) -> FxHashSet<String> {
    let mut traits = FxHashSet::default();

    for attr in attrs.iter().filter(|a| a.path().is_ident("derive")) {
        let _ = attr.parse_nested_meta(|meta| {
            if let Some(last) = meta.path.segments.last() {
                traits.insert(last.ident.to_string());
            }
            Ok(())
        });
    }

    traits
}

/// Matches `Option<Cow<'static, str>>`, with or without path prefixes.
fn is_context_type(ty: &Type) -> bool {
    let Some(option) = last_segment(ty).filter(|s| s.ident == "Option") else {
        return false;
    };
    let Some(syn::GenericArgument::Type(inner)) = first_generic(option) else {
        return false;
    };
    let Some(cow) = last_segment(inner).filter(|s| s.ident == "Cow") else {
        return false;
    };
    let syn::PathArguments::AngleBracketed(args) = &cow.arguments else {
        return false;
    };
    let mut args = args.args.iter();
    let Some(syn::GenericArgument::Lifetime(lt)) = args.next() else {
        return false;
    };
    let Some(syn::GenericArgument::Type(str_ty)) = args.next() else {
        return false;
    };
    lt.ident == "static" && last_segment(str_ty).is_some_and(|s| s.ident == "str")
}

fn last_segment(ty: &Type) -> Option<&syn::PathSegment> {
    let Type::Path(path) = ty else {
        return None;
    };
    path.path.segments.last()
}

fn first_generic(segment: &syn::PathSegment) -> Option<&syn::GenericArgument> {
    let syn::PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    args.args.first()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snake_case_codes() {
        let ident = |s: &str| Ident::new(s, Span::call_site());
        assert_eq!(snake_case(&ident("TooLarge")), "too_large");
        assert_eq!(snake_case(&ident("WriteFailed")), "write_failed");
        assert_eq!(snake_case(&ident("Internal")), "internal");
    }

    #[test]
    fn context_type_detection() {
        let ok: Type = syn::parse_quote!(Option<std::borrow::Cow<'static, str>>);
        let bad: Type = syn::parse_quote!(Option<String>);
        let short_lived: Type = syn::parse_quote!(Option<Cow<'a, str>>);
        assert!(is_context_type(&ok));
        assert!(!is_context_type(&bad));
        assert!(!is_context_type(&short_lived));
    }
}
