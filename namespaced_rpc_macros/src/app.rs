use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse::Parse, Data, DeriveInput, Fields, LitStr, Member, Token};

pub fn derive_rpc_app(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => TokenStream::from(tokens),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let excludes = extract_excludes(input)?;
    let registrations = extract_services(input)?;

    let excluded_fn = (!excludes.is_empty()).then(|| {
        quote! {
            fn excluded_methods(&self) -> Vec<String> {
                vec![#(#excludes.to_string()),*]
            }
        }
    });

    Ok(quote! {
        impl #impl_generics namespaced_rpc::RpcApp for #name #ty_generics #where_clause {
            #excluded_fn

            fn register_services(
                self,
                server: &mut namespaced_rpc::Server,
            ) -> Result<(), namespaced_rpc::RegistryError> {
                #(#registrations)*
                Ok(())
            }
        }
    })
}

/// `#[rpc_app(exclude("a", "b"))]` on the struct.
fn extract_excludes(input: &DeriveInput) -> syn::Result<Vec<LitStr>> {
    let mut excludes = Vec::new();
    for attr in &input.attrs {
        if !attr.path().is_ident("rpc_app") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("exclude") {
                let content;
                syn::parenthesized!(content in meta.input);
                let names = content.parse_terminated(<LitStr as Parse>::parse, Token![,])?;
                excludes.extend(names);
                Ok(())
            } else {
                Err(meta.error("expected `exclude(\"...\")`"))
            }
        })?;
    }
    Ok(excludes)
}

/// One registration statement per field marked `#[rpc]` or
/// `#[rpc(name = "...")]`, in declaration order.
fn extract_services(input: &DeriveInput) -> syn::Result<Vec<TokenStream2>> {
    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new(
            input.ident.span(),
            "RpcApp can only be derived for structs",
        ));
    };

    let fields: Vec<_> = match &data.fields {
        Fields::Named(named) => named.named.iter().collect(),
        Fields::Unnamed(unnamed) => unnamed.unnamed.iter().collect(),
        Fields::Unit => Vec::new(),
    };

    let mut registrations = Vec::new();
    for (index, field) in fields.into_iter().enumerate() {
        let member = match &field.ident {
            Some(ident) => Member::Named(ident.clone()),
            None => Member::Unnamed(index.into()),
        };

        for attr in &field.attrs {
            if !attr.path().is_ident("rpc") {
                continue;
            }
            let mut rename: Option<LitStr> = None;
            if !matches!(attr.meta, syn::Meta::Path(_)) {
                attr.parse_nested_meta(|meta| {
                    if meta.path.is_ident("name") {
                        rename = Some(meta.value()?.parse()?);
                        Ok(())
                    } else {
                        Err(meta.error("expected `name = \"...\"`"))
                    }
                })?;
            }
            registrations.push(match rename {
                Some(name) => quote! { server.try_register_named(self.#member, #name)?; },
                None => quote! { server.try_register(self.#member)?; },
            });
        }
    }
    Ok(registrations)
}
