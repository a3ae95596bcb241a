extern crate proc_macro;

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, FnArg, ItemFn, PatType};

/// Wraps an async method in a mongo transaction on its `session` argument:
/// the body moves into a `__tx_*` sibling, the original name starts the
/// transaction, awaits the body and commits, or aborts on error.
#[proc_macro_attribute]
pub fn tx(_args: TokenStream, input: TokenStream) -> TokenStream {
    let func = parse_macro_input!(input as ItemFn);
    let vis = &func.vis;
    let sig_ident = &func.sig.ident;
    let inputs = &func.sig.inputs;
    let output = &func.sig.output;
    let body = &func.block;

    let body_ident = quote::format_ident!("__tx_{}", sig_ident);

    let forwarded: Vec<_> = inputs
        .iter()
        .map(|input| match input {
            FnArg::Typed(PatType { pat, .. }) => quote! { #pat },
            // the receiver binding already has the declared type
            FnArg::Receiver(_) => quote!(self),
        })
        .collect();

    let expanded = quote! {
        #vis async fn #body_ident(#inputs) #output {
            #body
        }

        #vis async fn #sig_ident(#inputs) #output {
            session.start_transaction().await?;
            let result = Self::#body_ident(#(#forwarded),*).await;
            match result {
                Ok(value) => {
                    session.commit_transaction().await?;
                    Ok(value)
                }
                Err(err) => {
                    session.abort_transaction().await?;
                    Err(err)
                }
            }
        }
    };

    TokenStream::from(expanded)
}
