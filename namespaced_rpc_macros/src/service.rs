use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{
    ext::IdentExt, spanned::Spanned, Attribute, FnArg, ImplItem, ImplItemFn, ItemImpl, LitStr, ReturnType,
    Type, Visibility,
};

const NAMESPACE_HOOK: &str = "rpc_namespace";
const EXCLUDE_HOOK: &str = "excluded_methods";
const CONSTRUCTOR_HOOK: &str = "constructor";

pub fn expand(attr: TokenStream, item: TokenStream) -> TokenStream {
    if !attr.is_empty() {
        let err = syn::Error::new(
            TokenStream2::from(attr).span(),
            "#[rpc_service] takes no arguments",
        );
        return err.to_compile_error().into();
    }

    let mut item = syn::parse_macro_input!(item as ItemImpl);
    match expand_impl(&mut item) {
        Ok(service_impl) => TokenStream::from(quote! {
            #item
            #service_impl
        }),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand_impl(item: &mut ItemImpl) -> syn::Result<TokenStream2> {
    if let Some((_, path, _)) = &item.trait_ {
        return Err(syn::Error::new(
            path.span(),
            "#[rpc_service] goes on an inherent impl block",
        ));
    }

    let self_ty = item.self_ty.clone();
    let type_name = type_name(&self_ty);

    let mut plans = Vec::new();
    let mut has_namespace = false;
    let mut has_excludes = false;
    let mut has_constructor = false;

    for impl_item in item.items.iter_mut() {
        let ImplItem::Fn(method) = impl_item else {
            continue;
        };

        // `#[rpc(..)]` is consumed here and must not reach the compiler.
        let options = take_rpc_options(&mut method.attrs)?;

        let ident = method.sig.ident.to_string();
        match ident.as_str() {
            NAMESPACE_HOOK => has_namespace = true,
            EXCLUDE_HOOK => has_excludes = true,
            CONSTRUCTOR_HOOK => has_constructor = true,
            _ => {
                if !options.skip {
                    if let Some(plan) = method_plan(method, options.name) {
                        plans.push(plan);
                    }
                }
            }
        }
    }

    let namespace_fn = has_namespace.then(|| {
        quote! {
            fn namespace(&self) -> Option<String> {
                Some(Self::rpc_namespace(self).into())
            }
        }
    });
    let excluded_fn = has_excludes.then(|| {
        quote! {
            fn excluded(&self) -> Vec<String> {
                Self::excluded_methods(self).into_iter().map(Into::into).collect()
            }
        }
    });
    let initialize_fn = has_constructor.then(|| {
        quote! {
            fn initialize(&mut self) {
                Self::constructor(self)
            }
        }
    });

    let (impl_generics, _, where_clause) = item.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics namespaced_rpc::RpcService for #self_ty #where_clause {
            const TYPE_NAME: &'static str = #type_name;

            #namespace_fn
            #excluded_fn
            #initialize_fn

            #[allow(unused_variables)]
            fn methods(service: &::std::sync::Arc<Self>) -> Vec<namespaced_rpc::CallablePlan> {
                vec![#(#plans),*]
            }
        }
    })
}

#[derive(Default)]
struct RpcOptions {
    skip: bool,
    name: Option<LitStr>,
}

fn take_rpc_options(attrs: &mut Vec<Attribute>) -> syn::Result<RpcOptions> {
    let mut options = RpcOptions::default();
    let mut result = Ok(());
    attrs.retain(|attr| {
        if !attr.path().is_ident("rpc") {
            return true;
        }
        let parsed = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                options.skip = true;
                Ok(())
            } else if meta.path.is_ident("name") {
                options.name = Some(meta.value()?.parse()?);
                Ok(())
            } else {
                Err(meta.error("expected `skip` or `name = \"...\"`"))
            }
        });
        if let Err(err) = parsed {
            result = Err(err);
        }
        false
    });
    result.map(|()| options)
}

/// Build the `CallablePlan` expression for `method`, or `None` when the
/// method cannot be exposed.
fn method_plan(method: &ImplItemFn, rename: Option<LitStr>) -> Option<TokenStream2> {
    let sig = &method.sig;

    if !matches!(method.vis, Visibility::Public(_))
        || sig.asyncness.is_some()
        || sig.unsafety.is_some()
        || sig.variadic.is_some()
        || !sig.generics.params.is_empty()
    {
        return None;
    }

    let shape = return_shape(&sig.output)?;

    let mut inputs = sig.inputs.iter();
    match inputs.next() {
        Some(FnArg::Receiver(receiver)) if is_shared_ref(&receiver.ty) => {}
        _ => return None,
    }

    let mut has_context = false;
    let mut arg_types = Vec::new();
    for (position, input) in inputs.enumerate() {
        let FnArg::Typed(pat_type) = input else {
            return None;
        };
        let ty = &*pat_type.ty;
        if position == 0 && is_context(ty) {
            has_context = true;
            continue;
        }
        if matches!(ty, Type::Reference(_) | Type::ImplTrait(_)) {
            return None;
        }
        arg_types.push(ty.clone());
    }

    let ident = &sig.ident;
    let name = rename.unwrap_or_else(|| LitStr::new(&ident.unraw().to_string(), ident.span()));
    let args: Vec<_> = (0..arg_types.len())
        .map(|i| format_ident!("__arg{}", i))
        .collect();

    let call = if has_context {
        quote!(__service.#ident(__ctx, #(#args),*))
    } else {
        quote!(__service.#ident(#(#args),*))
    };
    let body = match shape {
        ReturnShape::Outcome => call,
        ReturnShape::Payload => quote!(namespaced_rpc::Json(#call)),
    };

    let closure = if has_context {
        quote! {
            move |__ctx: &namespaced_rpc::RequestContext, #(#args: #arg_types),*| #body
        }
    } else {
        quote! {
            move |#(#args: #arg_types),*| #body
        }
    };

    Some(quote! {
        {
            let __service = ::std::sync::Arc::clone(service);
            namespaced_rpc::CallablePlan::analyze(#name, #closure)
        }
    })
}

fn type_name(ty: &Type) -> String {
    match ty {
        Type::Path(path) => path
            .path
            .segments
            .last()
            .map(|segment| segment.ident.to_string())
            .unwrap_or_default(),
        other => quote!(#other).to_string(),
    }
}

fn is_shared_ref(ty: &Type) -> bool {
    matches!(ty, Type::Reference(reference) if reference.mutability.is_none())
}

/// `&RequestContext`, under any path prefix.
fn is_context(ty: &Type) -> bool {
    let Type::Reference(reference) = ty else {
        return false;
    };
    if reference.mutability.is_some() {
        return false;
    }
    match &*reference.elem {
        Type::Path(path) => path
            .path
            .segments
            .last()
            .is_some_and(|segment| segment.ident == "RequestContext"),
        _ => false,
    }
}

/// How a method's return value reaches the wire.
enum ReturnShape {
    /// `()`, `Result<..>` and `Json<..>` already describe their outcome.
    Outcome,
    /// Any other value is the payload and is wrapped in `Json`.
    Payload,
}

/// `None` for returns that cannot be exposed, such as tuples, `!`,
/// `impl Trait` or a reference that may borrow from `self`.
fn return_shape(output: &ReturnType) -> Option<ReturnShape> {
    let ReturnType::Type(_, ty) = output else {
        return Some(ReturnShape::Outcome);
    };
    classify(ty)
}

fn classify(ty: &Type) -> Option<ReturnShape> {
    match ty {
        Type::Paren(inner) => classify(&inner.elem),
        Type::Group(inner) => classify(&inner.elem),
        Type::Tuple(tuple) if tuple.elems.is_empty() => Some(ReturnShape::Outcome),
        Type::Tuple(_)
        | Type::Never(_)
        | Type::ImplTrait(_)
        | Type::TraitObject(_)
        | Type::Ptr(_)
        | Type::BareFn(_) => None,
        Type::Reference(reference) => reference
            .lifetime
            .as_ref()
            .is_some_and(|lifetime| lifetime.ident == "static")
            .then_some(ReturnShape::Payload),
        Type::Path(path) => {
            let outcome = path
                .path
                .segments
                .last()
                .is_some_and(|segment| segment.ident == "Result" || segment.ident == "Json");
            Some(if outcome {
                ReturnShape::Outcome
            } else {
                ReturnShape::Payload
            })
        }
        _ => Some(ReturnShape::Payload),
    }
}
