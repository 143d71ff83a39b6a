use proc_macro2::{TokenStream, Span};
use syn::{Attribute, Ident, Meta, MetaList, NestedMeta, Lit, spanned::Spanned};
use synstructure::{BindingInfo, Structure, VariantInfo};

#[derive(Debug)]
struct Error(TokenStream);

impl Error {
    fn new(span: Span, message: &str) -> Error {
        Error(quote_spanned! { span =>
            compile_error!(#message);
        })
    }

    fn into_tokens(self) -> TokenStream {
        self.0
    }
}

pub fn derive_error(s: Structure) -> TokenStream {
    let kinds = s.each_variant(|v| match find_kind(v) {
        Ok(v) => v,
        Err(e) => e.into_tokens(),
    });

    let codes = s.each_variant(|v| match find_code(v) {
        Ok(v) => v,
        Err(e) => e.into_tokens(),
    });

    s.gen_impl(quote! {
        use std::borrow::Cow;
        use crate::error::{DomainError, ErrorKind};

        gen impl DomainError for @Self {
            fn kind(&self) -> ErrorKind {
                match *self { #kinds }
            }

            fn code(&self) -> Option<Cow<str>> {
                match *self { #codes }
            }
        }
    })
}

/// Arguments of a `#[domain(...)]` attribute.
#[derive(Default)]
struct Args {
    internal: Option<NestedMeta>,
    kind: Option<Ident>,
    code: Option<Lit>,
}

/// Given a list of attributes find `#[domain(...)]`, and ensure there is only
/// one of them.
fn find_domain(attrs: &[Attribute]) -> Result<Option<MetaList>, Error> {
    let mut attrs = attrs.iter()
        .filter_map(|attr| attr.parse_meta().ok())
        .filter(|meta| meta.path().is_ident("domain"));

    let meta = match attrs.next() {
        Some(meta) => meta,
        None => return Ok(None),
    };

    let meta = match meta {
        Meta::List(meta) => meta,
        _ => return Err(Error::new(
            meta.span(),
            "domain attribute must take a list in parentheses",
        ))
    };

    if meta.nested.is_empty() {
        return Err(Error::new(
            meta.span(),
            "domain attribute requires at least one argument",
        ));
    }

    if let Some(meta) = attrs.next() {
        return Err(Error::new(
            meta.span(),
            "domain attribute must be used exactly once",
        ));
    }

    Ok(Some(meta))
}

fn parse_args(meta: MetaList) -> Result<Args, Error> {
    let mut args = Args::default();

    for item in meta.nested {
        match item {
            NestedMeta::Meta(Meta::Path(ref path)) if path.is_ident("internal") =>
                args.internal = Some(item.clone()),
            NestedMeta::Meta(Meta::NameValue(ref nv)) if nv.path.is_ident("code") =>
                args.code = Some(nv.lit.clone()),
            NestedMeta::Meta(Meta::NameValue(ref nv)) if nv.path.is_ident("kind") =>
                args.kind = Some(match nv.lit {
                    Lit::Str(ref s) => Ident::new(&s.value(), s.span()),
                    _ => return Err(Error::new(
                        nv.lit.span(),
                        "expected a string",
                    )),
                }),
            _ => return Err(Error::new(
                item.span(),
                "expected one of: internal, code, kind",
            )),
        }
    }

    if let Some(ref item) = args.internal {
        if args.kind.is_some() {
            return Err(Error::new(item.span(), "internal errors can't have kinds"));
        }
        if args.code.is_some() {
            return Err(Error::new(item.span(), "internal errors can't have codes"));
        }
    } else if args.kind.is_none() {
        return Err(Error::new(
            meta_span(&args),
            "non-internal errors must specify a kind",
        ));
    }

    Ok(args)
}

fn meta_span(args: &Args) -> Span {
    args.code.as_ref().map_or_else(Span::call_site, Spanned::span)
}

/// Find value of `DomainError::kind()` for a variant.
fn find_kind(v: &VariantInfo) -> Result<TokenStream, Error> {
    let meta = match find_domain(v.ast().attrs)? {
        Some(meta) => meta,
        None => return v.bindings()
            .iter()
            .find(is_cause)
            .map(|cause| quote!(#cause.kind()))
            .ok_or_else(|| Error::new(
                v.ast().ident.span(),
                "each variant must be #[domain]-annotated or have a #[cause]",
            )),
    };

    match parse_args(meta)?.kind {
        Some(kind) => Ok(quote!(ErrorKind::#kind)),
        None => Ok(quote!(ErrorKind::Internal)),
    }
}

/// Find value of `DomainError::code()` for a variant.
fn find_code(v: &VariantInfo) -> Result<TokenStream, Error> {
    let meta = match find_domain(v.ast().attrs)? {
        Some(meta) => meta,
        None => return v.bindings()
            .iter()
            .find(is_cause)
            .map(|cause| quote!(#cause.code()))
            .ok_or_else(|| Error::new(
                v.ast().ident.span(),
                "each variant must be #[domain]-annotated or have a #[cause]",
            )),
    };

    match parse_args(meta)?.code {
        Some(code) => Ok(quote!(Some(Cow::Borrowed(#code)))),
        None => Ok(quote!(None)),
    }
}

fn is_cause(bi: &&BindingInfo) -> bool {
    bi.ast()
        .attrs
        .iter()
        .filter_map(|attr| attr.parse_meta().ok())
        .any(|meta| meta.path().is_ident("cause"))
}
